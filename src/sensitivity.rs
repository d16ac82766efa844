use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bus_types::{bus_types, set_bus_types};
use crate::case::Case;
use crate::contingency::{Contingency, ContingencyList, Outage};
use crate::error::{Error, Result};
use crate::network::{ElementRef, Network};
use crate::order::ext2int;
use crate::parameters::Parameters;
use crate::pf::runpf;
use crate::ptdf::{make_lodf, make_ptdf, DcModel, PTDFSlack};
use crate::results::LoadFlowResult;
use crate::slack;
use crate::traits::SparseLU;

/// Row label of the reference flow matrices.
pub const REFERENCE_FLOWS: &str = "reference_flows";

/// Dense matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledMatrix {
    rows: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl LabelledMatrix {
    /// Number of rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn row_ids(&self) -> &[String] {
        &self.rows
    }

    pub fn column_ids(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn row(&self, row_id: &str) -> Option<&[f64]> {
        let r = self.rows.iter().position(|id| id == row_id)?;
        Some(&self.values[r])
    }

    pub fn get(&self, row_id: &str, column_id: &str) -> Option<f64> {
        let c = self.columns.iter().position(|id| id == column_id)?;
        self.row(row_id).map(|row| row[c])
    }
}

#[derive(Debug, Clone)]
pub struct SensitivityAnalysisResult {
    sensitivity: LabelledMatrix,
    reference_flows: LabelledMatrix,
    post_contingency: Vec<(String, LabelledMatrix, LabelledMatrix)>,
}

impl SensitivityAnalysisResult {
    /// Base case sensitivities (MW/MW) of branch flows (rows) to
    /// injections (columns).
    pub fn sensitivity_matrix(&self) -> &LabelledMatrix {
        &self.sensitivity
    }

    /// Base case branch flows (MW) as a single row.
    pub fn reference_flows(&self) -> &LabelledMatrix {
        &self.reference_flows
    }

    pub fn post_contingency_sensitivity_matrix(&self, contingency_id: &str) -> Option<&LabelledMatrix> {
        self.post_contingency
            .iter()
            .find(|(id, _, _)| id == contingency_id)
            .map(|(_, s, _)| s)
    }

    pub fn post_contingency_reference_flows(&self, contingency_id: &str) -> Option<&LabelledMatrix> {
        self.post_contingency
            .iter()
            .find(|(id, _, _)| id == contingency_id)
            .map(|(_, _, f)| f)
    }
}

/// DC sensitivity analysis of branch flows to injections, on the base case
/// and under contingencies.
#[derive(Debug, Clone, Default)]
pub struct SensitivityAnalysis {
    contingencies: ContingencyList,
    branch_ids: Vec<String>,
    injection_ids: Vec<String>,
}

#[derive(Clone, Copy)]
enum Injection {
    Generator(usize),
    Load(usize),
}

/// Linearized state of a network shared by the base case and the
/// contingencies solved by rank-one updates.
struct DcState {
    /// Per case: DC model and slack handling, when the case has a slack.
    models: Vec<Option<(DcModel, PTDFSlack)>>,
    /// Case and internal index of each connected network branch.
    branch_loc: HashMap<usize, (usize, usize)>,
    /// Case and internal index of each network bus.
    bus_loc: Vec<(usize, usize)>,
    /// PTDF column of each factor injection bus, keyed by (case, bus).
    columns: HashMap<(usize, usize), Vec<f64>>,
    load_flow: LoadFlowResult,
}

impl SensitivityAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a contingency tripping one element, identified by the
    /// element identifier.
    pub fn add_single_element_contingency(&mut self, element_id: &str) -> Result<()> {
        self.contingencies
            .add(Contingency::single_element(element_id, None))
    }

    pub fn add_contingency(&mut self, contingency: Contingency) -> Result<()> {
        self.contingencies.add(contingency)
    }

    /// Sets the monitored branches (matrix rows) and the injections
    /// (matrix columns).
    pub fn set_factor_matrix(&mut self, branch_ids: &[&str], injection_ids: &[&str]) {
        self.branch_ids = branch_ids.iter().map(|s| s.to_string()).collect();
        self.injection_ids = injection_ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn run_dc(&self, network: &Network, params: &Parameters) -> Result<SensitivityAnalysisResult> {
        params.validate()?;
        let branches = self.resolve_branches(network)?;
        let injections = self.resolve_injections(network)?;
        let outages = self.contingencies.resolve(network)?;

        let base = DcState::new(network, params, &injections)?;
        let sensitivity = base.sensitivities(network, &branches, &injections);
        let flows = base.flows(network, &branches);

        let run_one = |(c, outages): (&Contingency, &Vec<Outage>)| -> Result<_> {
            let (s, f) = match self.rank_one_update(network, &base, outages, &branches, &injections, &sensitivity, &flows) {
                Some(update) => update,
                None => {
                    log::debug!("contingency {}: full recomputation", c.id);
                    let working = c.apply_to(network)?;
                    let state = DcState::new(&working, params, &injections)?;
                    (
                        state.sensitivities(&working, &branches, &injections),
                        state.flows(&working, &branches),
                    )
                }
            };
            Ok((c.id.clone(), self.sensitivity_matrix(s), self.flow_matrix(f)))
        };

        let contingencies = self.contingencies.as_slice();
        #[cfg(feature = "parallel")]
        let post_contingency = contingencies
            .par_iter()
            .zip(outages.par_iter())
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let post_contingency = contingencies
            .iter()
            .zip(outages.iter())
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;

        Ok(SensitivityAnalysisResult {
            sensitivity: self.sensitivity_matrix(sensitivity),
            reference_flows: self.flow_matrix(flows),
            post_contingency,
        })
    }

    fn resolve_branches(&self, network: &Network) -> Result<Vec<usize>> {
        self.branch_ids
            .iter()
            .map(|id| match network.lookup(id) {
                Some(ElementRef::Branch(i)) => Ok(i),
                _ => Err(Error::not_found("Branch", id)),
            })
            .collect()
    }

    fn resolve_injections(&self, network: &Network) -> Result<Vec<Injection>> {
        self.injection_ids
            .iter()
            .map(|id| match network.lookup(id) {
                Some(ElementRef::Generator(i)) => Ok(Injection::Generator(i)),
                Some(ElementRef::Load(i)) => Ok(Injection::Load(i)),
                _ => Err(Error::not_found("Injection", id)),
            })
            .collect()
    }

    fn sensitivity_matrix(&self, values: Vec<Vec<f64>>) -> LabelledMatrix {
        LabelledMatrix {
            rows: self.branch_ids.clone(),
            columns: self.injection_ids.clone(),
            values,
        }
    }

    fn flow_matrix(&self, flows: Vec<f64>) -> LabelledMatrix {
        LabelledMatrix {
            rows: vec![REFERENCE_FLOWS.to_string()],
            columns: self.branch_ids.clone(),
            values: vec![flows],
        }
    }

    /// Post-outage sensitivities and flows of a single branch outage
    /// derived from the base case:
    ///
    ///   s'_l = s_l + LODF_lm * s_m,  F'_l = F_l + LODF_lm * F_m
    ///
    /// Returns `None` when the outage needs a full recomputation.
    #[allow(clippy::too_many_arguments)]
    fn rank_one_update(
        &self,
        network: &Network,
        base: &DcState,
        outages: &[Outage],
        branches: &[usize],
        injections: &[Injection],
        sensitivity: &[Vec<f64>],
        flows: &[f64],
    ) -> Option<(Vec<Vec<f64>>, Vec<f64>)> {
        let m_net = match outages {
            [Outage::Branch(m)] => *m,
            _ => return None,
        };
        if !network.branches[m_net].is_connected() {
            return Some((sensitivity.to_vec(), flows.to_vec()));
        }
        let (c, m) = *base.branch_loc.get(&m_net)?;
        let (model, _) = base.models[c].as_ref()?;
        let lodf = match make_lodf(model, m) {
            Ok(Some(lodf)) => lodf,
            Ok(None) => return None,
            Err(err) => {
                log::debug!("LODF of branch {} failed: {}", network.branches[m_net].id, err);
                return None;
            }
        };

        let flow_m = base.flow(network, m_net);
        if !flow_m.is_finite() {
            return None;
        }
        let s_m: Vec<f64> = injections
            .iter()
            .map(|inj| match base.injection_column(network, *inj) {
                Some((ck, col)) if ck == c => col[m],
                _ => 0.0,
            })
            .collect();

        let mut post_s = sensitivity.to_vec();
        let mut post_f = flows.to_vec();
        for (l, &l_net) in branches.iter().enumerate() {
            if let Some(&(cl, il)) = base.branch_loc.get(&l_net) {
                if cl == c {
                    for (k, s) in post_s[l].iter_mut().enumerate() {
                        *s += lodf[il] * s_m[k];
                    }
                    post_f[l] += lodf[il] * flow_m;
                }
            }
        }
        Some((post_s, post_f))
    }
}

fn injection_bus(network: &Network, inj: Injection) -> Option<usize> {
    match inj {
        Injection::Generator(i) => {
            let g = &network.generators[i];
            g.connected.then_some(g.bus)
        }
        Injection::Load(i) => {
            let l = &network.loads[i];
            l.connected.then_some(l.bus)
        }
    }
}

/// Case and internal bus of a connected injection.
fn injection_location(network: &Network, cases: &[Case], inj: Injection) -> Option<(usize, usize)> {
    let bus = injection_bus(network, inj)?;
    let c = network.buses[bus].component_num;
    cases[c].order.bus_e2i.get(&bus).map(|&i| (c, i))
}

impl DcState {
    fn new(network: &Network, params: &Parameters, injections: &[Injection]) -> Result<Self> {
        let mut cases = ext2int(network);

        let mut models = Vec::with_capacity(cases.len());
        let mut branch_loc = HashMap::new();
        for (c, case) in cases.iter_mut().enumerate() {
            for (i, &e) in case.order.branch_i2e.iter().enumerate() {
                branch_loc.insert(e, (c, i));
            }
            if !set_bus_types(case, network, &params.slack_bus_selection, true) {
                models.push(None);
                continue;
            }
            let (ref_, _, _) = bus_types(&case.bus, &case.gen, true);
            let slack = ref_[0];
            match DcModel::new(case, slack, params.dc_use_transformer_ratio) {
                Ok(model) => models.push(Some((model, slack_handling(case, params, slack)))),
                Err(err) => {
                    log::warn!("component {}: {}", case.component_num, err);
                    models.push(None);
                }
            }
        }

        // PTDF columns of the factor injections, one solve per bus
        let mut buses: Vec<Vec<usize>> = vec![Vec::new(); cases.len()];
        for inj in injections {
            if let Some((c, b)) = injection_location(network, &cases, *inj) {
                if !buses[c].contains(&b) {
                    buses[c].push(b);
                }
            }
        }
        let mut columns = HashMap::new();
        for (c, bus_idx) in buses.iter().enumerate() {
            if let Some((model, slack)) = &models[c] {
                let h = make_ptdf(model, slack, bus_idx).unwrap_or_else(|err| {
                    log::warn!("component {}: {}", c, err);
                    vec![vec![f64::NAN; model.branch_count()]; bus_idx.len()]
                });
                for (&b, col) in bus_idx.iter().zip(h) {
                    columns.insert((c, b), col);
                }
            }
        }

        let load_flow = runpf(network, params, true, &SparseLU)?;

        let bus_loc = network
            .buses
            .iter()
            .enumerate()
            .map(|(k, b)| (b.component_num, cases[b.component_num].order.bus_e2i[&k]))
            .collect();

        Ok(Self {
            models,
            branch_loc,
            bus_loc,
            columns,
            load_flow,
        })
    }

    /// Component and PTDF column of a connected injection.
    fn injection_column(&self, network: &Network, inj: Injection) -> Option<(usize, &[f64])> {
        let bus = injection_bus(network, inj)?;
        let (c, b) = self.bus_loc[bus];
        self.columns.get(&(c, b)).map(|col| (c, col.as_slice()))
    }

    /// Flow (MW) of a network branch: zero when disconnected, NaN when its
    /// component was not solved.
    fn flow(&self, network: &Network, branch: usize) -> f64 {
        let br = &network.branches[branch];
        if !self.branch_loc.contains_key(&branch) {
            return 0.0;
        }
        self.load_flow
            .branch(&br.id)
            .map_or(f64::NAN, |f| f.p1)
    }

    fn flows(&self, network: &Network, branches: &[usize]) -> Vec<f64> {
        branches.iter().map(|&l| self.flow(network, l)).collect()
    }

    fn sensitivities(&self, network: &Network, branches: &[usize], injections: &[Injection]) -> Vec<Vec<f64>> {
        let columns: Vec<Option<(usize, &[f64])>> = injections
            .iter()
            .map(|inj| self.injection_column(network, *inj))
            .collect();

        branches
            .iter()
            .map(|l| {
                let loc = self.branch_loc.get(l);
                columns
                    .iter()
                    .map(|col| match (loc, col) {
                        (Some(&(cl, il)), Some((ck, h))) if cl == *ck => h[il],
                        (Some(&(cl, _)), _) if self.models[cl].is_none() => f64::NAN,
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect()
    }
}

/// Slack handling of the sensitivities of a case: the participation
/// weights of its generators when the slack is distributed.
fn slack_handling(case: &Case, params: &Parameters, slack: usize) -> PTDFSlack {
    if !params.distributed_slack {
        return PTDFSlack::Single(slack);
    }
    let w = slack::weights(&case.gen, params.balance_type);
    if w.iter().all(|&w| w == 0.0) {
        return PTDFSlack::Single(slack);
    }
    let mut bus_w = vec![0.0; case.bus.len()];
    for (g, w) in case.gen.iter().zip(w) {
        bus_w[g.bus] += w;
    }
    PTDFSlack::Weights(bus_w)
}
