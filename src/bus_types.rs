use std::collections::HashSet;

use crate::case::{Bus, BusType, Case, Gen};
use crate::network::Network;
use crate::parameters::SlackBusSelection;

/// Assigns bus types and selects the reference bus of a case.
///
/// Buses with a connected voltage regulating generator are PV. In DC mode
/// every generator qualifies. A named slack bus is used where it holds such
/// a generator. Returns false, leaving all buses PQ, when no
/// generator can hold the reference.
pub(crate) fn set_bus_types(
    case: &mut Case,
    network: &Network,
    selection: &SlackBusSelection,
    dc: bool,
) -> bool {
    let candidates: Vec<usize> = (0..case.gen.len())
        .filter(|&k| dc || case.gen[k].regulating)
        .collect();

    for b in case.bus.iter_mut() {
        b.bus_type = BusType::PQ;
    }
    if candidates.is_empty() {
        return false;
    }
    for &k in &candidates {
        let bus = case.gen[k].bus;
        case.bus[bus].bus_type = BusType::PV;
    }

    let named = match selection {
        SlackBusSelection::Name(name) => network
            .buses
            .iter()
            .position(|b| &b.id == name)
            .and_then(|k| case.order.bus_e2i.get(&k).copied()),
        SlackBusSelection::LargestGenerator => None,
    }
    .filter(|&i| case.bus[i].bus_type == BusType::PV);

    let ref_bus = named.unwrap_or_else(|| {
        // largest generator, first one on ties
        let mut best = candidates[0];
        for &k in &candidates[1..] {
            if case.gen[k].pmax > case.gen[best].pmax {
                best = k;
            }
        }
        case.gen[best].bus
    });
    case.bus[ref_bus].bus_type = BusType::REF;
    true
}

/// Builds index lists for each type of bus (REF, PV, PQ).
///
/// In AC mode, PV and REF buses without a connected voltage regulating
/// generator are treated as PQ buses. Expects buses in internal
/// consecutive numbering.
pub(crate) fn bus_types(bus: &[Bus], gen: &[Gen], dc: bool) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let bus_gen_status = gen
        .iter()
        .filter(|g| dc || g.regulating)
        .map(|g| g.bus)
        .collect::<HashSet<usize>>();

    let refbus = bus
        .iter()
        .filter(|b| b.is_ref() && bus_gen_status.contains(&b.i))
        .map(|b| b.i)
        .collect::<Vec<usize>>();
    let pv = bus
        .iter()
        .filter(|b| b.is_pv() && bus_gen_status.contains(&b.i))
        .map(|b| b.i)
        .collect::<Vec<usize>>();
    let pq = bus
        .iter()
        .filter(|b| b.is_pq() || !bus_gen_status.contains(&b.i))
        .map(|b| b.i)
        .collect::<Vec<usize>>();

    (refbus, pv, pq)
}
