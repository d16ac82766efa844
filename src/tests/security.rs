use approx::assert_abs_diff_eq;

use crate::factory::{eurostag_tutorial_example1, ieee14};
use crate::tests::init;
use crate::*;

#[test]
fn eurostag_line_outage_overloads_the_parallel_line() {
    init();
    let net = eurostag_tutorial_example1().unwrap();
    let mut sa = SecurityAnalysis::new();
    sa.add_single_element_contingency("NHV1_NHV2_1", None).unwrap();
    sa.add_single_element_contingency("NHV1_NHV2_2", Some("second line"))
        .unwrap();

    let result = sa.run_ac(&net, &Parameters::default()).unwrap();

    assert!(result.pre_contingency_result().is_ok());
    assert!(result.pre_contingency_violations().is_empty());

    let post = result.post_contingency_results();
    assert_eq!(post.len(), 2);
    assert_eq!(post[0].contingency_id, "NHV1_NHV2_1");
    assert_eq!(post[1].label.as_deref(), Some("second line"));

    let res = result.post_contingency_result("NHV1_NHV2_1").unwrap();
    assert_eq!(res.status, PostContingencyStatus::Converged);
    assert_eq!(res.limit_violations.len(), 2);

    let side1 = &res.limit_violations[0];
    assert_eq!(side1.subject_id, "NHV1_NHV2_2");
    assert_eq!(side1.side, Side::One);
    assert_abs_diff_eq!(side1.limit, 500.0);
    assert_abs_diff_eq!(side1.value, 1009.1, epsilon = 0.1);

    let side2 = &res.limit_violations[1];
    assert_eq!(side2.subject_id, "NHV1_NHV2_2");
    assert_eq!(side2.side, Side::Two);
    assert_abs_diff_eq!(side2.value, 1048.0, epsilon = 0.1);

    let lf = &res.load_flow;
    assert!(lf.branch("NHV1_NHV2_1").is_none());
    let flow = lf.branch("NHV1_NHV2_2").unwrap();
    assert_abs_diff_eq!(flow.p1, 610.566, epsilon = 1e-2);
    assert_abs_diff_eq!(flow.q1, 334.228, epsilon = 1e-2);
    assert_abs_diff_eq!(lf.generator("GEN").unwrap().p, 611.38, epsilon = 1e-2);

    assert!(result.post_contingency_result("unknown").is_none());
}

#[test]
fn eurostag_dc() {
    init();
    let net = eurostag_tutorial_example1().unwrap();
    let mut sa = SecurityAnalysis::new();
    sa.add_single_element_contingency("NHV1_NHV2_1", None).unwrap();

    let result = sa.run_dc(&net, &Parameters::default()).unwrap();

    let base = result.pre_contingency_result();
    assert_abs_diff_eq!(base.branch("NHV1_NHV2_1").unwrap().p1, 300.0, epsilon = 1e-6);
    assert!(result.pre_contingency_violations().is_empty());

    let res = result.post_contingency_result("NHV1_NHV2_1").unwrap();
    assert_abs_diff_eq!(
        res.load_flow.branch("NHV1_NHV2_2").unwrap().p1,
        600.0,
        epsilon = 1e-6
    );
    // 600 MW at 380 kV
    let current = 600.0 * 1000.0 / (3f64.sqrt() * 380.0);
    assert_eq!(res.limit_violations.len(), 2);
    for v in &res.limit_violations {
        assert_abs_diff_eq!(v.value, current, epsilon = 1e-6);
    }
}

#[test]
fn ieee14_n_minus_1() {
    init();
    let net = ieee14().unwrap();
    let mut sa = SecurityAnalysis::new();
    for id in net.element_ids(ElementType::Line, &[], &[]) {
        sa.add_single_element_contingency(&id, None).unwrap();
    }
    assert_eq!(sa.contingencies().len(), 17);

    let result = sa.run_ac(&net, &Parameters::default()).unwrap();

    assert_eq!(result.post_contingency_results().len(), 17);
    // no limits on the case
    assert!(result
        .post_contingency_results()
        .iter()
        .all(|r| r.limit_violations.is_empty()));

    let res = result.post_contingency_result("L1-2-1").unwrap();
    assert_eq!(res.status, PostContingencyStatus::Converged);
    let lf = &res.load_flow;
    // bus 1 has no load and L1-5-1 is its only remaining branch
    let b1 = lf.generator("B1-G").unwrap().p;
    assert_abs_diff_eq!(b1, lf.branch("L1-5-1").unwrap().p1, epsilon = 1e-6);
    assert_abs_diff_eq!(b1, 243.89, epsilon = 1e-2);
    assert_abs_diff_eq!(lf.generator("B2-G").unwrap().p, 51.77, epsilon = 1e-2);

    let comp = lf.component(0).unwrap();
    assert!(comp.slack_bus_active_power_mismatch.abs() < 1.0);
    // the added losses are shared by B1-G and B2-G
    assert!(comp.distributed_active_power > 20.0);
}

#[test]
fn contingency_with_several_elements() {
    init();
    let net = eurostag_tutorial_example1().unwrap();
    let mut sa = SecurityAnalysis::new();
    sa.add_contingency(Contingency::new(
        "both lines",
        vec!["NHV1_NHV2_1".to_string(), "NHV1_NHV2_2".to_string()],
    ))
    .unwrap();

    let result = sa.run_dc(&net, &Parameters::default()).unwrap();

    let res = result.post_contingency_result("both lines").unwrap();
    // the load side has no generator left; equal sizes, numbered from the
    // generator side
    let lf = &res.load_flow;
    assert_eq!(lf.len(), 2);
    assert_eq!(lf.component(0).unwrap().status, ComponentStatus::Converged);
    assert_eq!(
        lf.component(1).unwrap().status,
        ComponentStatus::NoCalculation
    );
    assert!(lf.load("LOAD").is_none());
    assert!(res.limit_violations.is_empty());
}

#[test]
fn contingency_errors() {
    let net = eurostag_tutorial_example1().unwrap();

    let mut sa = SecurityAnalysis::new();
    sa.add_single_element_contingency("NHV1_NHV2_1", None).unwrap();
    assert!(matches!(
        sa.add_single_element_contingency("NHV1_NHV2_1", None),
        Err(Error::DuplicateId(_))
    ));

    sa.add_single_element_contingency("XX", None).unwrap();
    let err = sa.run_ac(&net, &Parameters::default()).unwrap_err();
    assert_eq!(err.to_string(), "Element 'XX' not found");

    let mut sa = SecurityAnalysis::new();
    sa.add_single_element_contingency("NHV1", None).unwrap();
    assert!(matches!(
        sa.run_dc(&net, &Parameters::default()),
        Err(Error::InvalidContingency(_))
    ));

    let mut sa = SecurityAnalysis::new();
    sa.add_contingency(Contingency::new("empty", Vec::new())).unwrap();
    assert!(matches!(
        sa.run_dc(&net, &Parameters::default()),
        Err(Error::InvalidContingency(_))
    ));
}

#[test]
fn switch_contingency() {
    init();
    let mut net = eurostag_tutorial_example1().unwrap();
    let bus = BusBuilder::default()
        .id("NLOAD_B")
        .nominal_v(150.0)
        .country("FR")
        .build()
        .unwrap();
    net.add_bus(bus).unwrap();
    net.add_switch("BREAKER", "NLOAD", "NLOAD_B", false).unwrap();
    let load = LoadBuilder::default().id("LOAD_B").p0(10.0).build().unwrap();
    net.add_load("NLOAD_B", load).unwrap();

    let mut sa = SecurityAnalysis::new();
    sa.add_single_element_contingency("BREAKER", None).unwrap();

    let result = sa.run_dc(&net, &Parameters::default()).unwrap();

    let base = result.pre_contingency_result();
    assert_abs_diff_eq!(base.branch("NHV1_NHV2_1").unwrap().p1, 305.0, epsilon = 1e-6);
    assert!(base.load("LOAD_B").is_some());

    let res = result.post_contingency_result("BREAKER").unwrap();
    let lf = &res.load_flow;
    assert!(lf.load("LOAD_B").is_none());
    assert_abs_diff_eq!(lf.branch("NHV1_NHV2_1").unwrap().p1, 300.0, epsilon = 1e-6);
    // the input network is untouched
    assert!(!net.switch("BREAKER").unwrap().is_open());
}
