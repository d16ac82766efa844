use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use derive_builder::Builder;

use crate::error::{Error, Result};
use crate::topology;

/// Kind of network element, as used by identifier queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bus,
    Line,
    TwoWindingsTransformer,
    Generator,
    Load,
    Switch,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Bus => "Bus",
            ElementType::Line => "Line",
            ElementType::TwoWindingsTransformer => "Two windings transformer",
            ElementType::Generator => "Generator",
            ElementType::Load => "Load",
            ElementType::Switch => "Switch",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Line,
    TwoWindingsTransformer,
}

impl BranchKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            BranchKind::Line => ElementType::Line,
            BranchKind::TwoWindingsTransformer => ElementType::TwoWindingsTransformer,
        }
    }
}

/// Position of an element in the network tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementRef {
    Bus(usize),
    Branch(usize),
    Generator(usize),
    Load(usize),
    Switch(usize),
}

impl ElementRef {
    pub(crate) fn element_type(&self, network: &Network) -> ElementType {
        match *self {
            ElementRef::Bus(_) => ElementType::Bus,
            ElementRef::Branch(i) => network.branches[i].kind.element_type(),
            ElementRef::Generator(_) => ElementType::Generator,
            ElementRef::Load(_) => ElementType::Load,
            ElementRef::Switch(_) => ElementType::Switch,
        }
    }
}

/// Bus is a node of the network graph.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = "crate::Error", validate = "Self::validate"))]
pub struct Bus {
    #[builder(setter(into))]
    pub id: String,

    /// Nominal voltage (kV).
    pub nominal_v: f64,

    /// ISO country code of the substation, if known.
    #[builder(default, setter(into, strip_option))]
    pub country: Option<String>,

    /// Voltage magnitude (p.u.).
    #[builder(default = "1.0")]
    pub v_magnitude: f64,

    /// Voltage angle (degrees).
    #[builder(default)]
    pub v_angle: f64,

    /// Shunt conductance (MW at V = 1.0 p.u.).
    #[builder(default)]
    pub gs: f64,

    /// Shunt susceptance (MVAr at V = 1.0 p.u.).
    #[builder(default)]
    pub bs: f64,

    #[builder(setter(skip))]
    pub(crate) component_num: usize,
}

impl BusBuilder {
    fn validate(&self) -> Result<()> {
        if let Some(v) = self.nominal_v {
            if !(v > 0.0) {
                return Err(Error::InvalidConfiguration(format!(
                    "nominal voltage must be positive: {}",
                    v
                )));
            }
        }
        Ok(())
    }
}

impl Bus {
    /// Number of the connected component this bus belongs to. The largest
    /// component is number 0.
    pub fn component_num(&self) -> usize {
        self.component_num
    }
}

/// Primary energy of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnergySource {
    Hydro,
    Nuclear,
    Wind,
    Thermal,
    Solar,
    #[default]
    Other,
}

/// Generator connected to a single bus.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = "crate::Error", validate = "Self::validate"))]
pub struct Generator {
    #[builder(setter(into))]
    pub id: String,

    /// Active power setpoint (MW).
    pub target_p: f64,

    /// Minimum active power output (MW).
    pub min_p: f64,

    /// Maximum active power output (MW).
    pub max_p: f64,

    /// Reactive power setpoint (MVAr), used when not regulating voltage.
    #[builder(default)]
    pub target_q: f64,

    /// Voltage magnitude setpoint (p.u.).
    #[builder(default = "1.0")]
    pub target_v: f64,

    #[builder(default = "true")]
    pub voltage_regulator_on: bool,

    #[builder(default)]
    pub energy_source: EnergySource,

    #[builder(default = "true", setter(skip))]
    pub(crate) connected: bool,

    #[builder(setter(skip))]
    pub(crate) bus: usize,

    /// Solved active power output (MW).
    #[builder(setter(skip))]
    pub p: Option<f64>,

    /// Solved reactive power output (MVAr).
    #[builder(setter(skip))]
    pub q: Option<f64>,
}

impl GeneratorBuilder {
    fn validate(&self) -> Result<()> {
        if let (Some(min_p), Some(max_p)) = (self.min_p, self.max_p) {
            if min_p > max_p {
                return Err(Error::InvalidConfiguration(format!(
                    "min_p ({}) greater than max_p ({})",
                    min_p, max_p
                )));
            }
        }
        Ok(())
    }
}

impl Generator {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Index of the bus in [`Network::buses`].
    pub fn bus(&self) -> usize {
        self.bus
    }
}

/// Constant power load.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = "crate::Error"))]
pub struct Load {
    #[builder(setter(into))]
    pub id: String,

    /// Active power consumption (MW).
    pub p0: f64,

    /// Reactive power consumption (MVAr).
    #[builder(default)]
    pub q0: f64,

    #[builder(default = "true", setter(skip))]
    pub(crate) connected: bool,

    #[builder(setter(skip))]
    pub(crate) bus: usize,

    #[builder(setter(skip))]
    pub p: Option<f64>,

    #[builder(setter(skip))]
    pub q: Option<f64>,
}

impl Load {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bus(&self) -> usize {
        self.bus
    }
}

/// Line or two-winding transformer, modelled as a π-equivalent with an
/// ideal transformer at the first terminal.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = "crate::Error", validate = "Self::validate"))]
pub struct Branch {
    #[builder(setter(into))]
    pub id: String,

    #[builder(default = "BranchKind::Line", setter(skip))]
    pub(crate) kind: BranchKind,

    /// Resistance (p.u.).
    #[builder(default)]
    pub r: f64,

    /// Reactance (p.u.).
    pub x: f64,

    /// Total line charging susceptance (p.u.).
    #[builder(default)]
    pub b: f64,

    /// Off-nominal turns ratio. Zero is read as 1.
    #[builder(default = "1.0")]
    pub tap: f64,

    /// Phase shift angle (degrees).
    #[builder(default)]
    pub shift: f64,

    /// Permanent current limit (A), applied on both sides.
    #[builder(default, setter(strip_option))]
    pub permanent_limit: Option<f64>,

    #[builder(setter(skip))]
    pub(crate) bus1: usize,
    #[builder(setter(skip))]
    pub(crate) bus2: usize,

    #[builder(default = "true", setter(skip))]
    pub(crate) connected1: bool,
    #[builder(default = "true", setter(skip))]
    pub(crate) connected2: bool,

    /// Solved flows (MW, MVAr) entering the branch at each side.
    #[builder(setter(skip))]
    pub p1: Option<f64>,
    #[builder(setter(skip))]
    pub q1: Option<f64>,
    #[builder(setter(skip))]
    pub p2: Option<f64>,
    #[builder(setter(skip))]
    pub q2: Option<f64>,
}

impl BranchBuilder {
    fn validate(&self) -> Result<()> {
        if self.x == Some(0.0) && self.r.unwrap_or(0.0) == 0.0 {
            return Err(Error::InvalidConfiguration(
                "branch impedance must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Branch {
    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    pub fn bus1(&self) -> usize {
        self.bus1
    }

    pub fn bus2(&self) -> usize {
        self.bus2
    }

    pub fn is_connected1(&self) -> bool {
        self.connected1
    }

    pub fn is_connected2(&self) -> bool {
        self.connected2
    }

    /// A branch carries flow only when both terminals are closed.
    pub fn is_connected(&self) -> bool {
        self.connected1 && self.connected2
    }
}

/// Switch between two buses. A closed switch merges them into one
/// electrical node.
#[derive(Debug, Clone)]
pub struct Switch {
    pub id: String,
    pub(crate) bus1: usize,
    pub(crate) bus2: usize,
    pub(crate) open: bool,
}

impl Switch {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn bus1(&self) -> usize {
        self.bus1
    }

    pub fn bus2(&self) -> usize {
        self.bus2
    }
}

/// An injection viewed together with the bus it is connected to.
pub struct Connected<'a, T> {
    element: &'a T,
    bus: &'a Bus,
}

impl<'a, T> Connected<'a, T> {
    pub fn bus(&self) -> &'a Bus {
        self.bus
    }

    pub fn bus_id(&self) -> &'a str {
        &self.bus.id
    }

    pub fn nominal_voltage(&self) -> f64 {
        self.bus.nominal_v
    }

    pub fn country(&self) -> Option<&'a str> {
        self.bus.country.as_deref()
    }
}

impl<'a, T> Deref for Connected<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.element
    }
}

/// Network is an arena of buses, branches, injections and switches. Elements
/// refer to each other by index and are looked up by identifier through a
/// single registry.
#[derive(Debug, Clone)]
pub struct Network {
    name: String,

    /// System MVA base used for converting power into per-unit quantities.
    base_mva: f64,

    pub(crate) buses: Vec<Bus>,
    pub(crate) generators: Vec<Generator>,
    pub(crate) loads: Vec<Load>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) switches: Vec<Switch>,

    index: HashMap<String, ElementRef>,
}

impl Network {
    /// Creates an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_mva: 100.0,
            buses: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            branches: Vec::new(),
            switches: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    pub fn generators(&self) -> impl Iterator<Item = Connected<'_, Generator>> + '_ {
        self.generators.iter().map(move |g| Connected {
            element: g,
            bus: &self.buses[g.bus],
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = Connected<'_, Load>> + '_ {
        self.loads.iter().map(move |l| Connected {
            element: l,
            bus: &self.buses[l.bus],
        })
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<ElementRef> {
        self.index.get(id).copied()
    }

    pub fn element_type(&self, id: &str) -> Option<ElementType> {
        self.lookup(id).map(|r| r.element_type(self))
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        match self.lookup(id)? {
            ElementRef::Bus(i) => Some(&self.buses[i]),
            _ => None,
        }
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        match self.lookup(id)? {
            ElementRef::Branch(i) => Some(&self.branches[i]),
            _ => None,
        }
    }

    pub fn generator(&self, id: &str) -> Option<Connected<'_, Generator>> {
        match self.lookup(id)? {
            ElementRef::Generator(i) => {
                let g = &self.generators[i];
                Some(Connected {
                    element: g,
                    bus: &self.buses[g.bus],
                })
            }
            _ => None,
        }
    }

    pub fn load(&self, id: &str) -> Option<Connected<'_, Load>> {
        match self.lookup(id)? {
            ElementRef::Load(i) => {
                let l = &self.loads[i];
                Some(Connected {
                    element: l,
                    bus: &self.buses[l.bus],
                })
            }
            _ => None,
        }
    }

    pub fn switch(&self, id: &str) -> Option<&Switch> {
        match self.lookup(id)? {
            ElementRef::Switch(i) => Some(&self.switches[i]),
            _ => None,
        }
    }

    pub fn generator_mut(&mut self, id: &str) -> Option<&mut Generator> {
        match self.lookup(id)? {
            ElementRef::Generator(i) => Some(&mut self.generators[i]),
            _ => None,
        }
    }

    pub fn load_mut(&mut self, id: &str) -> Option<&mut Load> {
        match self.lookup(id)? {
            ElementRef::Load(i) => Some(&mut self.loads[i]),
            _ => None,
        }
    }

    fn register(&mut self, id: &str, element: ElementRef) -> Result<()> {
        if self.index.contains_key(id) {
            return Err(Error::DuplicateId(id.to_string()));
        }
        self.index.insert(id.to_string(), element);
        Ok(())
    }

    fn bus_index(&self, id: &str) -> Result<usize> {
        match self.lookup(id) {
            Some(ElementRef::Bus(i)) => Ok(i),
            _ => Err(Error::not_found("Bus", id)),
        }
    }

    /// Adds a bus and returns its index.
    pub fn add_bus(&mut self, bus: Bus) -> Result<usize> {
        let i = self.buses.len();
        self.register(&bus.id, ElementRef::Bus(i))?;
        self.buses.push(bus);
        self.update_components();
        Ok(i)
    }

    pub fn add_generator(&mut self, bus_id: &str, mut generator: Generator) -> Result<()> {
        generator.bus = self.bus_index(bus_id)?;
        self.register(&generator.id, ElementRef::Generator(self.generators.len()))?;
        self.generators.push(generator);
        Ok(())
    }

    pub fn add_load(&mut self, bus_id: &str, mut load: Load) -> Result<()> {
        load.bus = self.bus_index(bus_id)?;
        self.register(&load.id, ElementRef::Load(self.loads.len()))?;
        self.loads.push(load);
        Ok(())
    }

    pub fn add_line(&mut self, bus1: &str, bus2: &str, line: Branch) -> Result<()> {
        self.add_branch(bus1, bus2, line, BranchKind::Line)
    }

    /// Adds a two-winding transformer. The ratio and phase shift apply at
    /// the `bus1` side.
    pub fn add_transformer(&mut self, bus1: &str, bus2: &str, transformer: Branch) -> Result<()> {
        self.add_branch(bus1, bus2, transformer, BranchKind::TwoWindingsTransformer)
    }

    fn add_branch(
        &mut self,
        bus1: &str,
        bus2: &str,
        mut branch: Branch,
        kind: BranchKind,
    ) -> Result<()> {
        branch.bus1 = self.bus_index(bus1)?;
        branch.bus2 = self.bus_index(bus2)?;
        branch.kind = kind;
        self.register(&branch.id, ElementRef::Branch(self.branches.len()))?;
        self.branches.push(branch);
        self.update_components();
        Ok(())
    }

    pub fn add_switch(&mut self, id: &str, bus1: &str, bus2: &str, open: bool) -> Result<()> {
        let sw = Switch {
            id: id.to_string(),
            bus1: self.bus_index(bus1)?,
            bus2: self.bus_index(bus2)?,
            open,
        };
        self.register(id, ElementRef::Switch(self.switches.len()))?;
        self.switches.push(sw);
        self.update_components();
        Ok(())
    }

    /// Connects both terminals of a branch, or an injection, to their buses.
    ///
    /// Returns false if no branch or injection has the given identifier.
    pub fn connect(&mut self, id: &str) -> bool {
        self.set_connected(id, true)
    }

    /// Disconnects both terminals of a branch, or an injection.
    ///
    /// Returns false if no branch or injection has the given identifier.
    pub fn disconnect(&mut self, id: &str) -> bool {
        self.set_connected(id, false)
    }

    fn set_connected(&mut self, id: &str, connected: bool) -> bool {
        match self.lookup(id) {
            Some(ElementRef::Branch(i)) => {
                let br = &mut self.branches[i];
                br.connected1 = connected;
                br.connected2 = connected;
                self.update_components();
                true
            }
            Some(ElementRef::Generator(i)) => {
                self.generators[i].connected = connected;
                true
            }
            Some(ElementRef::Load(i)) => {
                self.loads[i].connected = connected;
                true
            }
            _ => false,
        }
    }

    /// Opens a switch. Returns true if the switch was closed.
    pub fn open_switch(&mut self, id: &str) -> Result<bool> {
        self.set_switch(id, true)
    }

    /// Closes a switch. Returns true if the switch was open.
    pub fn close_switch(&mut self, id: &str) -> Result<bool> {
        self.set_switch(id, false)
    }

    fn set_switch(&mut self, id: &str, open: bool) -> Result<bool> {
        let i = match self.lookup(id) {
            Some(ElementRef::Switch(i)) => i,
            _ => return Err(Error::not_found("Switch", id)),
        };
        let changed = self.switches[i].open != open;
        if changed {
            self.switches[i].open = open;
            self.update_components();
        }
        Ok(changed)
    }

    /// Lists the identifiers of all elements of a type, in insertion order.
    ///
    /// An element is kept if its bus (either bus for two-terminal elements)
    /// has a nominal voltage in `nominal_voltages` and a country in
    /// `countries`. An empty filter does not restrict.
    pub fn element_ids(
        &self,
        element_type: ElementType,
        nominal_voltages: &[f64],
        countries: &[&str],
    ) -> Vec<String> {
        let matches = |bus: usize| {
            let bus = &self.buses[bus];
            (nominal_voltages.is_empty() || nominal_voltages.contains(&bus.nominal_v))
                && (countries.is_empty()
                    || bus
                        .country
                        .as_deref()
                        .map_or(false, |c| countries.contains(&c)))
        };

        match element_type {
            ElementType::Bus => (0..self.buses.len())
                .filter(|&i| matches(i))
                .map(|i| self.buses[i].id.clone())
                .collect(),
            ElementType::Line | ElementType::TwoWindingsTransformer => self
                .branches
                .iter()
                .filter(|br| br.kind.element_type() == element_type)
                .filter(|br| matches(br.bus1) || matches(br.bus2))
                .map(|br| br.id.clone())
                .collect(),
            ElementType::Generator => self
                .generators
                .iter()
                .filter(|g| matches(g.bus))
                .map(|g| g.id.clone())
                .collect(),
            ElementType::Load => self
                .loads
                .iter()
                .filter(|l| matches(l.bus))
                .map(|l| l.id.clone())
                .collect(),
            ElementType::Switch => self
                .switches
                .iter()
                .filter(|sw| matches(sw.bus1) || matches(sw.bus2))
                .map(|sw| sw.id.clone())
                .collect(),
        }
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        self.buses
            .iter()
            .map(|b| b.component_num + 1)
            .max()
            .unwrap_or(0)
    }

    fn update_components(&mut self) {
        let numbers = topology::components(self);
        for (bus, num) in self.buses.iter_mut().zip(numbers) {
            bus.component_num = num;
        }
    }
}
