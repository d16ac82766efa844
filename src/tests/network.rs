use std::path::Path;

use approx::assert_abs_diff_eq;

use crate::factory::{eurostag_tutorial_example1, ieee14};
use crate::*;

fn bus(id: &str) -> Bus {
    BusBuilder::default().id(id).nominal_v(20.0).build().unwrap()
}

fn line(id: &str) -> Branch {
    BranchBuilder::default().id(id).x(0.1).build().unwrap()
}

#[test]
fn ieee14_contents() {
    let net = ieee14().unwrap();

    assert_eq!(net.name(), "ieee14cdf");
    assert_eq!(net.buses().len(), 14);
    assert_eq!(net.branches().len(), 20);
    assert_eq!(net.generators().count(), 5);
    assert_eq!(net.loads().count(), 11);
    assert_eq!(net.component_count(), 1);

    let first = &net.buses()[0];
    assert_eq!(first.id, "VL1_0");
    assert_abs_diff_eq!(first.v_magnitude, 1.06);

    assert_eq!(net.element_type("T4-7-1"), Some(ElementType::TwoWindingsTransformer));
    assert_eq!(net.element_type("L1-2-1"), Some(ElementType::Line));
    assert_eq!(net.element_type("B3-G"), Some(ElementType::Generator));
    assert_eq!(net.element_type("nope"), None);
}

#[test]
fn injections_expose_their_bus() {
    let net = eurostag_tutorial_example1().unwrap();

    let gen = net.generator("GEN").unwrap();
    assert_eq!(gen.bus_id(), "NGEN");
    assert_abs_diff_eq!(gen.nominal_voltage(), 24.0);
    assert_eq!(gen.country(), Some("FR"));
    assert_abs_diff_eq!(gen.target_p, 607.0);
    assert_eq!(gen.energy_source, EnergySource::Other);

    let load = net.load("LOAD").unwrap();
    assert_eq!(load.bus_id(), "NLOAD");
    assert!(load.is_connected());
}

#[test]
fn generator_energy_source() {
    let mut net = Network::new("sources");
    net.add_bus(bus("A")).unwrap();
    let hydro = GeneratorBuilder::default()
        .id("G1")
        .target_p(10.0)
        .min_p(0.0)
        .max_p(20.0)
        .energy_source(EnergySource::Hydro)
        .build()
        .unwrap();
    net.add_generator("A", hydro).unwrap();

    assert_eq!(net.generator("G1").unwrap().energy_source, EnergySource::Hydro);
}

#[test]
fn element_ids_filter_on_voltage_and_country() {
    let net = eurostag_tutorial_example1().unwrap();

    assert_eq!(
        net.element_ids(ElementType::Line, &[380.0], &[]),
        vec!["NHV1_NHV2_1", "NHV1_NHV2_2"]
    );
    // a transformer matches on either side
    assert_eq!(
        net.element_ids(ElementType::TwoWindingsTransformer, &[24.0], &[]),
        vec!["NGEN_NHV1"]
    );
    assert_eq!(
        net.element_ids(ElementType::TwoWindingsTransformer, &[380.0], &["FR"]),
        vec!["NGEN_NHV1", "NHV2_NLOAD"]
    );
    assert_eq!(net.element_ids(ElementType::Bus, &[], &["FR"]).len(), 4);
    assert!(net.element_ids(ElementType::Bus, &[], &["BE"]).is_empty());
    assert!(net.element_ids(ElementType::Generator, &[225.0], &[]).is_empty());
    assert_eq!(net.element_ids(ElementType::Load, &[], &[]), vec!["LOAD"]);
}

#[test]
fn unknown_switch() {
    let mut net = ieee14().unwrap();

    let err = net.open_switch("aa").unwrap_err();
    assert_eq!(err.to_string(), "Switch 'aa' not found");
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut net = Network::new("dup");
    net.add_bus(bus("A")).unwrap();

    assert!(matches!(net.add_bus(bus("A")), Err(Error::DuplicateId(id)) if id == "A"));
    assert!(matches!(
        net.add_line("A", "A", line("A")),
        Err(Error::DuplicateId(_))
    ));
    assert!(matches!(
        net.add_line("A", "B", line("L")),
        Err(Error::ElementNotFound { kind: "Bus", .. })
    ));
}

#[test]
fn builders_validate() {
    let missing = BusBuilder::default().id("A").build();
    assert!(matches!(missing, Err(Error::InvalidConfiguration(_))));

    let negative = BusBuilder::default().id("A").nominal_v(-1.0).build();
    assert!(matches!(negative, Err(Error::InvalidConfiguration(_))));

    let reversed = GeneratorBuilder::default()
        .id("G")
        .target_p(0.0)
        .min_p(10.0)
        .max_p(5.0)
        .build();
    assert!(matches!(reversed, Err(Error::InvalidConfiguration(_))));

    let short = BranchBuilder::default().id("L").r(0.0).x(0.0).build();
    assert!(matches!(short, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn switches_merge_buses() {
    let mut net = Network::new("switches");
    for id in ["A", "B", "C"] {
        net.add_bus(bus(id)).unwrap();
    }
    net.add_line("A", "B", line("L")).unwrap();
    assert_eq!(net.component_count(), 2);

    net.add_switch("S", "B", "C", false).unwrap();
    assert_eq!(net.component_count(), 1);

    assert!(net.open_switch("S").unwrap());
    assert!(!net.open_switch("S").unwrap());
    assert!(net.switch("S").unwrap().is_open());
    assert_eq!(net.component_count(), 2);
    // largest component first
    assert_eq!(net.bus("A").unwrap().component_num(), 0);
    assert_eq!(net.bus("C").unwrap().component_num(), 1);

    assert!(net.close_switch("S").unwrap());
    assert_eq!(net.component_count(), 1);
}

#[test]
fn disconnecting_a_radial_branch_splits_the_network() {
    let mut net = eurostag_tutorial_example1().unwrap();

    assert!(net.disconnect("NHV1_NHV2_1"));
    assert_eq!(net.component_count(), 1);

    assert!(net.disconnect("NGEN_NHV1"));
    assert_eq!(net.component_count(), 2);
    assert_eq!(net.bus("NGEN").unwrap().component_num(), 1);
    let br = net.branch("NGEN_NHV1").unwrap();
    assert!(!br.is_connected1() && !br.is_connected2());

    assert!(net.connect("NGEN_NHV1"));
    assert_eq!(net.component_count(), 1);

    assert!(!net.disconnect("NGEN"));
    assert!(net.disconnect("LOAD"));
    assert!(!net.load("LOAD").unwrap().is_connected());
}

#[test]
fn ieee14_branch_reconnection_restores_topology() {
    let mut net = ieee14().unwrap();
    let components: Vec<usize> = net.buses().iter().map(|b| b.component_num()).collect();

    assert!(net.disconnect("L1-2-1"));
    let br = net.branch("L1-2-1").unwrap();
    assert!(!br.is_connected1() && !br.is_connected2());
    // meshed, so the network stays in one piece
    assert_eq!(net.component_count(), 1);

    assert!(net.connect("L1-2-1"));
    let br = net.branch("L1-2-1").unwrap();
    assert!(br.is_connected1() && br.is_connected2());
    assert_eq!(net.component_count(), 1);
    let restored: Vec<usize> = net.buses().iter().map(|b| b.component_num()).collect();
    assert_eq!(restored, components);
    assert!(net.switches().iter().all(|s| !s.is_open()));
}

struct FactoryImporter;

impl Importer for FactoryImporter {
    fn import(&self, path: &Path) -> anyhow::Result<Network> {
        match path.file_stem().and_then(|s| s.to_str()) {
            Some("ieee14") => Ok(ieee14()?),
            Some(other) => anyhow::bail!("no case named {}", other),
            None => anyhow::bail!("missing file name"),
        }
    }
}

#[test]
fn load_network_with_importer() {
    let dir = std::env::temp_dir().join("powergrid-load-network");
    std::fs::create_dir_all(&dir).unwrap();
    for name in ["ieee14.case", "ieee30.case"] {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    let net = load_network(&dir.join("ieee14.case"), &FactoryImporter).unwrap();
    assert_eq!(net.buses().len(), 14);

    let err = load_network(&dir.join("ieee30.case"), &FactoryImporter).unwrap_err();
    assert!(matches!(err, Error::Import(msg) if msg.contains("no case named ieee30")));

    let err = load_network(&dir.join("ieee57.case"), &FactoryImporter).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
