use std::collections::HashMap;

use num_complex::Complex64;

/// Case is one energized connected component of a network, converted to
/// consecutive internal bus numbering and ready for the solvers.
#[derive(Clone)]
pub(crate) struct Case {
    pub component_num: usize,

    /// System MVA base used for converting power into per-unit quantities.
    pub base_mva: f64,

    /// Electrical nodes, with aggregated loads and shunts.
    pub bus: Vec<Bus>,

    /// Connected generators.
    pub gen: Vec<Gen>,

    /// Branches closed at both ends.
    pub branch: Vec<Branch>,

    /// Mapping back to network element indices.
    pub order: Order,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub(crate) enum BusType {
    /// Fixed active and reactive power.
    PQ,
    /// Fixed voltage magnitude and active power.
    PV,
    /// Reference voltage angle. Slack active and reactive power.
    REF,
}

#[derive(Clone)]
pub(crate) struct Bus {
    /// Internal bus number.
    pub i: usize,

    pub bus_type: BusType,

    /// Real power demand (MW).
    pub pd: f64,

    /// Reactive power demand (MVAr).
    pub qd: f64,

    /// Shunt conductance (MW at V = 1.0 p.u.).
    pub gs: f64,

    /// Shunt susceptance (MVAr at V = 1.0 p.u.).
    pub bs: f64,

    /// Voltage magnitude (p.u.).
    pub vm: f64,

    /// Voltage angle (degrees).
    pub va: f64,

    /// Nominal voltage (kV).
    pub base_kv: f64,
}

impl Bus {
    pub(crate) fn is_ref(&self) -> bool {
        self.bus_type == BusType::REF
    }

    pub(crate) fn is_pv(&self) -> bool {
        self.bus_type == BusType::PV
    }

    pub(crate) fn is_pq(&self) -> bool {
        self.bus_type == BusType::PQ
    }
}

#[derive(Clone)]
pub(crate) struct Gen {
    /// Internal bus number.
    pub bus: usize,

    /// Real power output (MW).
    pub pg: f64,

    /// Reactive power output (MVAr).
    pub qg: f64,

    /// Voltage magnitude setpoint (p.u.).
    pub vg: f64,

    pub pmax: f64,
    pub pmin: f64,

    /// Holds its bus voltage at `vg`.
    pub regulating: bool,
}

#[derive(Clone)]
pub(crate) struct Branch {
    pub f_bus: usize,
    pub t_bus: usize,

    /// Resistance (p.u.).
    pub r: f64,
    /// Reactance (p.u.).
    pub x: f64,
    /// Total line charging susceptance (p.u.).
    pub b: f64,

    /// Transformer off nominal turns ratio.
    pub tap: f64,
    /// Transformer phase shift angle (degrees).
    pub shift: f64,
}

impl Branch {
    pub(crate) fn y_s(&self) -> Complex64 {
        Complex64::new(1.0, 0.0) / Complex64::new(self.r, self.x)
    }

    /// Off-nominal turns ratio with the zero default applied.
    pub(crate) fn ratio(&self) -> f64 {
        if self.tap == 0.0 {
            1.0
        } else {
            self.tap
        }
    }
}

/// Internal to network index mappings.
#[derive(Clone, Default)]
pub(crate) struct Order {
    /// Network buses merged into each internal bus.
    pub bus_i2e: Vec<Vec<usize>>,
    /// Internal bus of each network bus of the component.
    pub bus_e2i: HashMap<usize, usize>,
    /// Network index of each generator.
    pub gen_i2e: Vec<usize>,
    /// Network index of each branch.
    pub branch_i2e: Vec<usize>,
    /// Network index and internal bus of each connected load.
    pub load_i2e: Vec<(usize, usize)>,
}
