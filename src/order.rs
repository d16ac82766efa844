use std::collections::HashMap;

use crate::case::{Branch, Bus, BusType, Case, Gen, Order};
use crate::network::Network;
use crate::topology;

/// Converts a network into one internal case per connected component.
///
/// Buses joined by closed switches become a single internal bus. Only
/// connected generators and loads and branches closed at both ends are
/// kept. Cases are ordered by component number.
pub(crate) fn ext2int(network: &Network) -> Vec<Case> {
    let (node, _) = topology::electrical_nodes(network);
    let nc = network.component_count();

    let mut cases: Vec<Case> = (0..nc)
        .map(|c| Case {
            component_num: c,
            base_mva: network.base_mva(),
            bus: Vec::new(),
            gen: Vec::new(),
            branch: Vec::new(),
            order: Order::default(),
        })
        .collect();

    // network bus -> (case, internal bus)
    let mut e2i: Vec<(usize, usize)> = Vec::with_capacity(network.buses.len());
    let mut node_e2i: HashMap<usize, usize> = HashMap::new();
    for (k, b) in network.buses.iter().enumerate() {
        let case = &mut cases[b.component_num];
        let i = *node_e2i.entry(node[k]).or_insert_with(|| {
            let i = case.bus.len();
            case.bus.push(Bus {
                i,
                bus_type: BusType::PQ,
                pd: 0.0,
                qd: 0.0,
                gs: 0.0,
                bs: 0.0,
                vm: b.v_magnitude,
                va: b.v_angle,
                base_kv: b.nominal_v,
            });
            case.order.bus_i2e.push(Vec::new());
            i
        });
        case.bus[i].gs += b.gs;
        case.bus[i].bs += b.bs;
        case.order.bus_i2e[i].push(k);
        case.order.bus_e2i.insert(k, i);
        e2i.push((b.component_num, i));
    }

    for (k, l) in network.loads.iter().enumerate().filter(|(_, l)| l.connected) {
        let (c, i) = e2i[l.bus];
        let case = &mut cases[c];
        case.bus[i].pd += l.p0;
        case.bus[i].qd += l.q0;
        case.order.load_i2e.push((k, i));
    }

    for (k, g) in network.generators.iter().enumerate().filter(|(_, g)| g.connected) {
        let (c, i) = e2i[g.bus];
        let case = &mut cases[c];
        case.gen.push(Gen {
            bus: i,
            pg: g.target_p,
            qg: g.target_q,
            vg: g.target_v,
            pmax: g.max_p,
            pmin: g.min_p,
            regulating: g.voltage_regulator_on,
        });
        case.order.gen_i2e.push(k);
    }

    for (k, br) in network.branches.iter().enumerate().filter(|(_, br)| br.is_connected()) {
        let (c, f) = e2i[br.bus1];
        let (_, t) = e2i[br.bus2];
        if f == t {
            log::trace!("branch {} is short-circuited by a switch", br.id);
            continue;
        }
        let case = &mut cases[c];
        case.branch.push(Branch {
            f_bus: f,
            t_bus: t,
            r: br.r,
            x: br.x,
            b: br.b,
            tap: br.tap,
            shift: br.shift,
        });
        case.order.branch_i2e.push(k);
    }

    cases
}
