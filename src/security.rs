#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::contingency::{Contingency, ContingencyList};
use crate::error::Result;
use crate::network::Network;
use crate::parameters::Parameters;
use crate::pf::runpf;
use crate::results::LoadFlowResult;
use crate::traits::SparseLU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

/// A branch current above its permanent limit.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitViolation {
    pub subject_id: String,
    pub side: Side,
    /// Permanent current limit (A).
    pub limit: f64,
    /// Current (A).
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostContingencyStatus {
    Converged,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PostContingencyResult {
    pub contingency_id: String,
    pub label: Option<String>,
    pub status: PostContingencyStatus,
    pub limit_violations: Vec<LimitViolation>,
    pub load_flow: LoadFlowResult,
}

#[derive(Debug, Clone)]
pub struct SecurityAnalysisResult {
    pre_contingency: LoadFlowResult,
    pre_contingency_violations: Vec<LimitViolation>,
    post_contingency: Vec<PostContingencyResult>,
}

impl SecurityAnalysisResult {
    pub fn pre_contingency_result(&self) -> &LoadFlowResult {
        &self.pre_contingency
    }

    pub fn pre_contingency_violations(&self) -> &[LimitViolation] {
        &self.pre_contingency_violations
    }

    /// Results in contingency registration order.
    pub fn post_contingency_results(&self) -> &[PostContingencyResult] {
        &self.post_contingency
    }

    /// Result of a contingency, or `None` if no such contingency was run.
    pub fn post_contingency_result(&self, contingency_id: &str) -> Option<&PostContingencyResult> {
        self.post_contingency
            .iter()
            .find(|r| r.contingency_id == contingency_id)
    }
}

/// Runs a load flow on the base case and on each registered contingency.
#[derive(Debug, Clone, Default)]
pub struct SecurityAnalysis {
    contingencies: ContingencyList,
}

impl SecurityAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a contingency tripping one element. The contingency is
    /// identified by the element identifier.
    pub fn add_single_element_contingency(
        &mut self,
        element_id: &str,
        label: Option<&str>,
    ) -> Result<()> {
        self.contingencies
            .add(Contingency::single_element(element_id, label))
    }

    pub fn add_contingency(&mut self, contingency: Contingency) -> Result<()> {
        self.contingencies.add(contingency)
    }

    pub fn contingencies(&self) -> &[Contingency] {
        self.contingencies.as_slice()
    }

    pub fn run_ac(&self, network: &Network, params: &Parameters) -> Result<SecurityAnalysisResult> {
        self.run(network, params, false)
    }

    pub fn run_dc(&self, network: &Network, params: &Parameters) -> Result<SecurityAnalysisResult> {
        self.run(network, params, true)
    }

    fn run(&self, network: &Network, params: &Parameters, dc: bool) -> Result<SecurityAnalysisResult> {
        params.validate()?;
        self.contingencies.resolve(network)?;

        let pre_contingency = runpf(network, params, dc, &SparseLU)?;
        let pre_contingency_violations = if pre_contingency.is_ok() {
            check_limits(network, &pre_contingency)
        } else {
            log::warn!("pre-contingency load flow failed");
            Vec::new()
        };

        let run_one = |c: &Contingency| -> Result<PostContingencyResult> {
            let working = c.apply_to(network)?;
            let load_flow = runpf(&working, params, dc, &SparseLU)?;
            let (status, limit_violations) = if load_flow.is_ok() {
                (
                    PostContingencyStatus::Converged,
                    check_limits(&working, &load_flow),
                )
            } else {
                (PostContingencyStatus::Failed, Vec::new())
            };
            log::debug!(
                "contingency {}: {:?}, {} violations",
                c.id,
                status,
                limit_violations.len()
            );
            Ok(PostContingencyResult {
                contingency_id: c.id.clone(),
                label: c.label.clone(),
                status,
                limit_violations,
                load_flow,
            })
        };

        #[cfg(feature = "parallel")]
        let post_contingency = self
            .contingencies()
            .par_iter()
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let post_contingency = self
            .contingencies()
            .iter()
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;

        Ok(SecurityAnalysisResult {
            pre_contingency,
            pre_contingency_violations,
            post_contingency,
        })
    }
}

/// Compares terminal currents with the permanent limits of the branches.
pub(crate) fn check_limits(network: &Network, result: &LoadFlowResult) -> Vec<LimitViolation> {
    let mut violations = Vec::new();
    for flow in result.branches() {
        let limit = match network.branches[flow.index].permanent_limit {
            Some(limit) => limit,
            None => continue,
        };
        for (side, value) in [(Side::One, flow.i1), (Side::Two, flow.i2)] {
            if value > limit {
                violations.push(LimitViolation {
                    subject_id: flow.id.clone(),
                    side,
                    limit,
                    value,
                });
            }
        }
    }
    violations
}
