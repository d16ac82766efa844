use crate::network::Network;

/// Outcome of the load flow of one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Converged,
    /// The slack power could not be distributed.
    Failed,
    MaxIterationReached,
    /// A linear solve was singular or the solution diverged.
    SolverFailed,
    /// No generator can hold the reference of the component.
    NoCalculation,
}

#[derive(Debug, Clone)]
pub struct ComponentResult {
    pub component_num: usize,
    pub status: ComponentStatus,
    /// Total Newton iterations, over all slack distribution rounds.
    pub iteration_count: usize,
    pub slack_bus_id: Option<String>,
    /// Active power (MW) left at the slack bus.
    pub slack_bus_active_power_mismatch: f64,
    /// Active power (MW) shared between participating generators.
    pub distributed_active_power: f64,
}

impl ComponentResult {
    pub(crate) fn new(component_num: usize, status: ComponentStatus) -> Self {
        Self {
            component_num,
            status,
            iteration_count: 0,
            slack_bus_id: None,
            slack_bus_active_power_mismatch: 0.0,
            distributed_active_power: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BusState {
    pub id: String,
    pub(crate) index: usize,
    /// Voltage magnitude (p.u.).
    pub v_magnitude: f64,
    /// Voltage angle (degrees).
    pub v_angle: f64,
}

/// Flows entering a branch at each side (MW, MVAr) and the terminal
/// currents (A).
#[derive(Debug, Clone)]
pub struct BranchFlow {
    pub id: String,
    pub(crate) index: usize,
    pub p1: f64,
    pub q1: f64,
    pub p2: f64,
    pub q2: f64,
    pub i1: f64,
    pub i2: f64,
}

#[derive(Debug, Clone)]
pub struct InjectionState {
    pub id: String,
    pub(crate) index: usize,
    /// Active power (MW).
    pub p: f64,
    /// Reactive power (MVAr), not computed in DC.
    pub q: Option<f64>,
}

/// Result of an AC or DC load flow.
///
/// Holds one entry per connected component, ordered by component number,
/// and the solved state of the elements of converged components.
#[derive(Debug, Clone, Default)]
pub struct LoadFlowResult {
    pub(crate) components: Vec<ComponentResult>,
    pub(crate) buses: Vec<BusState>,
    pub(crate) branches: Vec<BranchFlow>,
    pub(crate) generators: Vec<InjectionState>,
    pub(crate) loads: Vec<InjectionState>,
}

impl LoadFlowResult {
    pub fn components(&self) -> &[ComponentResult] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, component_num: usize) -> Option<&ComponentResult> {
        self.components
            .iter()
            .find(|c| c.component_num == component_num)
    }

    /// True when every component that could be calculated converged and
    /// at least one was calculated.
    pub fn is_ok(&self) -> bool {
        let calculated = self
            .components
            .iter()
            .filter(|c| c.status != ComponentStatus::NoCalculation);
        let mut any = false;
        for c in calculated {
            if c.status != ComponentStatus::Converged {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn buses(&self) -> &[BusState] {
        &self.buses
    }

    pub fn branches(&self) -> &[BranchFlow] {
        &self.branches
    }

    pub fn bus(&self, id: &str) -> Option<&BusState> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn branch(&self, id: &str) -> Option<&BranchFlow> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn generator(&self, id: &str) -> Option<&InjectionState> {
        self.generators.iter().find(|g| g.id == id)
    }

    pub fn load(&self, id: &str) -> Option<&InjectionState> {
        self.loads.iter().find(|l| l.id == id)
    }

    /// Writes the solved state onto the network it was computed from.
    ///
    /// Flows and injections of elements outside converged components are
    /// cleared; bus voltages outside them are left unchanged.
    pub fn apply(&self, network: &mut Network) {
        for br in network.branches.iter_mut() {
            br.p1 = None;
            br.q1 = None;
            br.p2 = None;
            br.q2 = None;
        }
        for g in network.generators.iter_mut() {
            g.p = None;
            g.q = None;
        }
        for l in network.loads.iter_mut() {
            l.p = None;
            l.q = None;
        }

        for b in &self.buses {
            let bus = &mut network.buses[b.index];
            bus.v_magnitude = b.v_magnitude;
            bus.v_angle = b.v_angle;
        }
        for f in &self.branches {
            let br = &mut network.branches[f.index];
            br.p1 = Some(f.p1);
            br.q1 = Some(f.q1);
            br.p2 = Some(f.p2);
            br.q2 = Some(f.q2);
        }
        for s in &self.generators {
            let g = &mut network.generators[s.index];
            g.p = Some(s.p);
            g.q = s.q;
        }
        for s in &self.loads {
            let l = &mut network.loads[s.index];
            l.p = Some(s.p);
            l.q = s.q;
        }
    }
}
