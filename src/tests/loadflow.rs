use approx::assert_abs_diff_eq;

use crate::factory::{eurostag_tutorial_example1, ieee14};
use crate::tests::init;
use crate::*;

const IEEE14_VM: [f64; 14] = [
    1.06, 1.045, 1.01, 1.01767, 1.01951, 1.07, 1.06152, 1.09, 1.05593, 1.05098, 1.05691, 1.05519,
    1.05038, 1.03553,
];

#[test]
fn ieee14_ac() {
    init();
    let net = ieee14().unwrap();

    let result = run_ac(&net, &Parameters::default()).unwrap();

    assert!(result.is_ok());
    assert_eq!(result.len(), 1);
    let comp = result.component(0).unwrap();
    assert_eq!(comp.status, ComponentStatus::Converged);
    assert!((3..=5).contains(&comp.iteration_count));
    assert_eq!(comp.slack_bus_id.as_deref(), Some("VL1_0"));
    assert!(comp.slack_bus_active_power_mismatch.abs() < 1.0);
    // converged without distributing
    assert_abs_diff_eq!(comp.distributed_active_power, 0.0);

    for (k, &vm) in IEEE14_VM.iter().enumerate() {
        let bus = result.bus(&format!("VL{}_0", k + 1)).unwrap();
        assert_abs_diff_eq!(bus.v_magnitude, vm, epsilon = 1e-5);
    }
    assert_abs_diff_eq!(result.bus("VL1_0").unwrap().v_angle, 0.0);

    assert_abs_diff_eq!(result.branch("L1-2-1").unwrap().p1, 156.88, epsilon = 1e-2);
    assert_abs_diff_eq!(result.branch("L1-5-1").unwrap().p1, 75.51, epsilon = 1e-2);

    let b1 = result.generator("B1-G").unwrap();
    assert_abs_diff_eq!(b1.p, 232.39, epsilon = 1e-2);
    assert!(b1.q.is_some());
    assert_abs_diff_eq!(result.generator("B2-G").unwrap().p, 40.0);
}

#[test]
fn ieee14_ac_from_dc_angles() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default()
        .voltage_init_mode(VoltageInitMode::DcValues)
        .build()
        .unwrap();

    let result = run_ac(&net, &params).unwrap();

    assert!(result.is_ok());
    let vm = result.bus("VL14_0").unwrap().v_magnitude;
    assert_abs_diff_eq!(vm, IEEE14_VM[13], epsilon = 1e-5);
}

#[test]
fn ieee14_ac_from_previous_values() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default()
        .voltage_init_mode(VoltageInitMode::PreviousValues)
        .build()
        .unwrap();

    let result = run_ac(&net, &params).unwrap();

    assert!(result.is_ok());
    let comp = result.component(0).unwrap();
    // the stored voltages are already close to the solution
    assert!(comp.iteration_count <= 4);
    assert_abs_diff_eq!(result.bus("VL4_0").unwrap().v_magnitude, IEEE14_VM[3], epsilon = 1e-5);
}

#[test]
fn ieee14_dc() {
    init();
    let net = ieee14().unwrap();

    let result = run_dc(&net, &Parameters::default()).unwrap();

    assert!(result.is_ok());
    let comp = result.component(0).unwrap();
    assert_eq!(comp.status, ComponentStatus::Converged);
    // 259 MW of load against 272.4 MW of generation, shared by B1-G and B2-G
    assert_abs_diff_eq!(comp.distributed_active_power, -13.4, epsilon = 1e-9);

    assert_abs_diff_eq!(result.branch("L1-5-1").unwrap().p1, 72.24667948865367, epsilon = 1e-6);
    assert_abs_diff_eq!(result.branch("L2-3-1").unwrap().p1, 69.83139138110104, epsilon = 1e-6);
    let flow = result.branch("L1-2-1").unwrap();
    assert_abs_diff_eq!(flow.p2, -flow.p1);
    assert_abs_diff_eq!(flow.q1, 0.0);

    let b1 = result.generator("B1-G").unwrap();
    assert_abs_diff_eq!(b1.p, 225.7, epsilon = 1e-6);
    assert!(b1.q.is_none());
    assert_abs_diff_eq!(result.generator("B2-G").unwrap().p, 33.3, epsilon = 1e-6);
    assert_abs_diff_eq!(result.generator("B3-G").unwrap().p, 0.0);

    assert_abs_diff_eq!(result.bus("VL5_0").unwrap().v_magnitude, 1.0);
}

#[test]
fn dc_slack_bus_takes_the_imbalance() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default()
        .distributed_slack(false)
        .dc(true)
        .build()
        .unwrap();

    let result = run(&net, &params).unwrap();

    assert!(result.is_ok());
    assert_abs_diff_eq!(result.generator("B1-G").unwrap().p, 219.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.generator("B2-G").unwrap().p, 40.0);
    assert_abs_diff_eq!(
        result.component(0).unwrap().slack_bus_active_power_mismatch,
        -13.4,
        epsilon = 1e-6
    );
}

#[test]
fn dc_proportional_to_setpoint() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default()
        .balance_type(BalanceType::ProportionalToGenerationP)
        .build()
        .unwrap();

    let result = run_dc(&net, &params).unwrap();

    let b1 = result.generator("B1-G").unwrap().p;
    let b2 = result.generator("B2-G").unwrap().p;
    assert_abs_diff_eq!(b1 + b2, 259.0, epsilon = 1e-6);
    assert_abs_diff_eq!(b1 / b2, 232.4 / 40.0, epsilon = 1e-9);
}

#[test]
fn named_slack_bus() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default()
        .slack_bus_selection(SlackBusSelection::Name("VL2_0".to_string()))
        .build()
        .unwrap();

    let result = run_dc(&net, &params).unwrap();

    assert_eq!(
        result.component(0).unwrap().slack_bus_id.as_deref(),
        Some("VL2_0")
    );
    // flows do not depend on the reference
    assert_abs_diff_eq!(result.branch("L1-5-1").unwrap().p1, 72.24667948865367, epsilon = 1e-6);
}

#[test]
fn eurostag_ac() {
    init();
    let net = eurostag_tutorial_example1().unwrap();

    let result = run_ac(&net, &Parameters::default()).unwrap();

    assert!(result.is_ok());
    let comp = result.component(0).unwrap();
    assert_eq!(comp.slack_bus_id.as_deref(), Some("NGEN"));
    // losses are picked up by a distribution round
    assert!(comp.distributed_active_power < -1.0);

    assert_abs_diff_eq!(result.generator("GEN").unwrap().p, 605.558, epsilon = 1e-2);
    for (id, vm) in [
        ("NGEN", 1.02083),
        ("NHV1", 1.05826),
        ("NHV2", 1.02617),
        ("NLOAD", 0.98311),
    ] {
        assert_abs_diff_eq!(result.bus(id).unwrap().v_magnitude, vm, epsilon = 1e-4);
    }

    for id in ["NHV1_NHV2_1", "NHV1_NHV2_2"] {
        let flow = result.branch(id).unwrap();
        assert_abs_diff_eq!(flow.p1, 302.445, epsilon = 1e-2);
        assert_abs_diff_eq!(flow.q1, 98.80, epsilon = 1e-2);
        assert_abs_diff_eq!(flow.p2, -300.435, epsilon = 1e-2);
        assert_abs_diff_eq!(flow.q2, -137.245, epsilon = 1e-2);
        assert_abs_diff_eq!(flow.i1, 456.8, epsilon = 0.1);
        assert_abs_diff_eq!(flow.i2, 489.0, epsilon = 0.1);
    }

    let load = result.load("LOAD").unwrap();
    assert_abs_diff_eq!(load.p, 600.0);
    assert_eq!(load.q, Some(200.0));
}

#[test]
fn results_are_written_back() {
    init();
    let mut net = eurostag_tutorial_example1().unwrap();

    let result = run_ac(&net, &Parameters::default()).unwrap();
    result.apply(&mut net);

    let line = net.branch("NHV1_NHV2_1").unwrap();
    assert_abs_diff_eq!(line.p1.unwrap(), 302.445, epsilon = 1e-2);
    assert_abs_diff_eq!(net.bus("NHV1").unwrap().v_magnitude, 1.05826, epsilon = 1e-4);
    assert!(net.generator("GEN").unwrap().q.is_some());

    // a DC run clears reactive values
    let result = run_dc(&net, &Parameters::default()).unwrap();
    result.apply(&mut net);
    assert!(net.generator("GEN").unwrap().q.is_none());
    assert_eq!(net.branch("NHV1_NHV2_1").unwrap().q1, Some(0.0));
}

#[test]
fn component_without_generator_is_not_calculated() {
    init();
    let mut net = eurostag_tutorial_example1().unwrap();
    net.disconnect("NGEN_NHV1");

    let result = run_dc(&net, &Parameters::default()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.component(0).unwrap().status, ComponentStatus::NoCalculation);
    assert_eq!(result.component(1).unwrap().status, ComponentStatus::Converged);
    assert!(result.is_ok());
    assert!(result.branch("NHV1_NHV2_1").is_none());
    assert!(result.load("LOAD").is_none());
    // the islanded generator has nothing to feed
    assert_abs_diff_eq!(result.generator("GEN").unwrap().p, 0.0, epsilon = 1e-9);
}

#[test]
fn iteration_limit() {
    init();
    let net = ieee14().unwrap();
    let params = ParametersBuilder::default().max_iterations(1).build().unwrap();

    let result = run_ac(&net, &params).unwrap();

    assert!(!result.is_ok());
    assert_eq!(
        result.component(0).unwrap().status,
        ComponentStatus::MaxIterationReached
    );
    assert!(result.branches().is_empty());
}

#[test]
fn invalid_parameters() {
    let built = ParametersBuilder::default().max_iterations(0).build();
    assert!(matches!(built, Err(Error::InvalidConfiguration(_))));

    let built = ParametersBuilder::default()
        .convergence_tolerance(-1.0)
        .build();
    assert!(matches!(built, Err(Error::InvalidConfiguration(_))));

    let net = ieee14().unwrap();
    let params = Parameters {
        slack_bus_p_max_mismatch: 0.0,
        ..Parameters::default()
    };
    assert!(matches!(
        run_ac(&net, &params),
        Err(Error::InvalidConfiguration(_))
    ));
}
