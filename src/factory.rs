//! Reference networks.

use crate::error::Result;
use crate::network::{BranchBuilder, BusBuilder, GeneratorBuilder, LoadBuilder, Network};

/// Bus voltages of the solved IEEE 14 bus case (p.u., degrees).
const IEEE14_BUS: [(f64, f64); 14] = [
    (1.06, 0.0),
    (1.045, -4.98),
    (1.01, -12.72),
    (1.019, -10.33),
    (1.02, -8.78),
    (1.07, -14.22),
    (1.062, -13.37),
    (1.09, -13.36),
    (1.056, -14.94),
    (1.051, -15.1),
    (1.057, -14.79),
    (1.055, -15.07),
    (1.05, -15.16),
    (1.036, -16.04),
];

/// bus, pg, qg, vg
const IEEE14_GEN: [(usize, f64, f64, f64); 5] = [
    (1, 232.4, -16.9, 1.06),
    (2, 40.0, 42.4, 1.045),
    (3, 0.0, 23.4, 1.01),
    (6, 0.0, 12.2, 1.07),
    (8, 0.0, 17.4, 1.09),
];

/// bus, pd, qd
const IEEE14_LOAD: [(usize, f64, f64); 11] = [
    (2, 21.7, 12.7),
    (3, 94.2, 19.0),
    (4, 47.8, -3.9),
    (5, 7.6, 1.6),
    (6, 11.2, 7.5),
    (9, 29.5, 16.6),
    (10, 9.0, 5.8),
    (11, 3.5, 1.8),
    (12, 6.1, 1.6),
    (13, 13.5, 5.8),
    (14, 14.9, 5.0),
];

/// from, to, r, x, b, tap (0 for lines)
const IEEE14_BRANCH: [(usize, usize, f64, f64, f64, f64); 20] = [
    (1, 2, 0.01938, 0.05917, 0.0528, 0.0),
    (1, 5, 0.05403, 0.22304, 0.0492, 0.0),
    (2, 3, 0.04699, 0.19797, 0.0438, 0.0),
    (2, 4, 0.05811, 0.17632, 0.034, 0.0),
    (2, 5, 0.05695, 0.17388, 0.0346, 0.0),
    (3, 4, 0.06701, 0.17103, 0.0128, 0.0),
    (4, 5, 0.01335, 0.04211, 0.0, 0.0),
    (4, 7, 0.0, 0.20912, 0.0, 0.978),
    (4, 9, 0.0, 0.55618, 0.0, 0.969),
    (5, 6, 0.0, 0.25202, 0.0, 0.932),
    (6, 11, 0.09498, 0.1989, 0.0, 0.0),
    (6, 12, 0.12291, 0.25581, 0.0, 0.0),
    (6, 13, 0.06615, 0.13027, 0.0, 0.0),
    (7, 8, 0.0, 0.17615, 0.0, 0.0),
    (7, 9, 0.0, 0.11001, 0.0, 0.0),
    (9, 10, 0.03181, 0.0845, 0.0, 0.0),
    (9, 14, 0.12711, 0.27038, 0.0, 0.0),
    (10, 11, 0.08205, 0.19207, 0.0, 0.0),
    (12, 13, 0.22092, 0.19988, 0.0, 0.0),
    (13, 14, 0.17093, 0.34802, 0.0, 0.0),
];

fn ieee14_bus_id(n: usize) -> String {
    format!("VL{}_0", n)
}

/// IEEE 14 bus test case.
///
/// Buses are named `VL{n}_0`, generators `B{n}-G`, loads `B{n}-L`, lines
/// `L{from}-{to}-1` and transformers `T{from}-{to}-1`. Bus voltages hold
/// the published solution.
pub fn ieee14() -> Result<Network> {
    let mut net = Network::new("ieee14cdf");

    for (k, &(vm, va)) in IEEE14_BUS.iter().enumerate() {
        let n = k + 1;
        let mut bus = BusBuilder::default();
        bus.id(ieee14_bus_id(n))
            .nominal_v(1.0)
            .v_magnitude(vm)
            .v_angle(va);
        if n == 9 {
            bus.bs(19.0);
        }
        net.add_bus(bus.build()?)?;
    }

    for &(n, pg, qg, vg) in &IEEE14_GEN {
        let gen = GeneratorBuilder::default()
            .id(format!("B{}-G", n))
            .target_p(pg)
            .target_q(qg)
            .target_v(vg)
            .min_p(-9999.0)
            .max_p(9999.0)
            .build()?;
        net.add_generator(&ieee14_bus_id(n), gen)?;
    }

    for &(n, pd, qd) in &IEEE14_LOAD {
        let load = LoadBuilder::default()
            .id(format!("B{}-L", n))
            .p0(pd)
            .q0(qd)
            .build()?;
        net.add_load(&ieee14_bus_id(n), load)?;
    }

    for &(f, t, r, x, b, tap) in &IEEE14_BRANCH {
        let (bus1, bus2) = (ieee14_bus_id(f), ieee14_bus_id(t));
        if tap == 0.0 {
            let line = BranchBuilder::default()
                .id(format!("L{}-{}-1", f, t))
                .r(r)
                .x(x)
                .b(b)
                .build()?;
            net.add_line(&bus1, &bus2, line)?;
        } else {
            let transformer = BranchBuilder::default()
                .id(format!("T{}-{}-1", f, t))
                .r(r)
                .x(x)
                .b(b)
                .tap(tap)
                .build()?;
            net.add_transformer(&bus1, &bus2, transformer)?;
        }
    }

    Ok(net)
}

/// Four bus tutorial network: a generator feeding a load through a step-up
/// transformer, two parallel 380 kV lines limited to 500 A and a step-down
/// transformer.
pub fn eurostag_tutorial_example1() -> Result<Network> {
    let mut net = Network::new("sim1");

    for (id, nominal_v) in [("NGEN", 24.0), ("NHV1", 380.0), ("NHV2", 380.0), ("NLOAD", 150.0)] {
        let bus = BusBuilder::default()
            .id(id)
            .nominal_v(nominal_v)
            .country("FR")
            .build()?;
        net.add_bus(bus)?;
    }

    let gen = GeneratorBuilder::default()
        .id("GEN")
        .target_p(607.0)
        .target_q(301.0)
        .target_v(24.5 / 24.0)
        .min_p(-9999.99)
        .max_p(9999.99)
        .build()?;
    net.add_generator("NGEN", gen)?;

    let load = LoadBuilder::default()
        .id("LOAD")
        .p0(600.0)
        .q0(200.0)
        .build()?;
    net.add_load("NLOAD", load)?;

    // impedances in p.u. on 100 MVA, 380 kV lines on Zb = 1444 ohm
    let step_up = BranchBuilder::default()
        .id("NGEN_NHV1")
        .r(0.24 / 1300.0)
        .x((100.0f64 - 0.0576).sqrt() / 1300.0)
        .tap(0.95)
        .build()?;
    net.add_transformer("NGEN", "NHV1", step_up)?;

    for id in ["NHV1_NHV2_1", "NHV1_NHV2_2"] {
        let line = BranchBuilder::default()
            .id(id)
            .r(3.0 / 1444.0)
            .x(33.0 / 1444.0)
            .b(386e-6 * 1444.0)
            .permanent_limit(500.0)
            .build()?;
        net.add_line("NHV1", "NHV2", line)?;
    }

    let step_down = BranchBuilder::default()
        .id("NHV2_NLOAD")
        .r(0.00021)
        .x((324.0f64 - 0.0441).sqrt() / 1000.0)
        .tap(1.0 / (158.0 / 400.0 * 380.0 / 150.0))
        .build()?;
    net.add_transformer("NHV2", "NLOAD", step_down)?;

    Ok(net)
}
