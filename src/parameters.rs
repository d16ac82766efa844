use derive_builder::Builder;

use crate::error::{Error, Result};

/// Initial bus voltages of the AC Newton iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltageInitMode {
    /// Flat start: 1 p.u. and 0 degrees, regulated buses at their setpoint.
    #[default]
    UniformValues,
    /// Voltages currently stored on the network buses.
    PreviousValues,
    /// Angles from a DC load flow, magnitudes as for a flat start.
    DcValues,
}

/// How active power imbalance is shared between generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceType {
    /// Proportional to maximum active power.
    #[default]
    ProportionalToGenerationPMax,
    /// Proportional to the active power setpoint.
    ProportionalToGenerationP,
    /// Proportional to the margin between setpoint and maximum power.
    ProportionalToGenerationRemainingMargin,
}

/// Choice of the reference bus of each component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlackBusSelection {
    /// Bus of the generator with the largest maximum active power.
    #[default]
    LargestGenerator,
    /// Named bus, where it holds a suitable generator.
    Name(String),
}

/// Load flow options.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    default,
    build_fn(error = "crate::Error", validate = "Self::validate")
)]
pub struct Parameters {
    /// Share the slack active power between participating generators.
    pub distributed_slack: bool,

    /// Linearized DC power flow that assumes lossless branches,
    /// 1pu voltages and small voltage angle differences.
    pub dc: bool,

    pub voltage_init_mode: VoltageInitMode,

    pub balance_type: BalanceType,

    #[builder(setter(into))]
    pub slack_bus_selection: SlackBusSelection,

    /// Maximum number of Newton iterations. Default value is 20.
    pub max_iterations: usize,

    /// Termination tolerance on per unit P & Q mismatch. Default value is 1e-8.
    pub convergence_tolerance: f64,

    /// Maximum number of slack distribution rounds. Default value is 20.
    pub max_outer_iterations: usize,

    /// Slack bus active power mismatch (MW) below which the distribution
    /// stops. Default value is 1.
    pub slack_bus_p_max_mismatch: f64,

    /// Include transformer ratios in the DC susceptances.
    pub dc_use_transformer_ratio: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            distributed_slack: true,
            dc: false,
            voltage_init_mode: VoltageInitMode::default(),
            balance_type: BalanceType::default(),
            slack_bus_selection: SlackBusSelection::default(),
            max_iterations: 20,
            convergence_tolerance: 1e-8,
            max_outer_iterations: 20,
            slack_bus_p_max_mismatch: 1.0,
            dc_use_transformer_ratio: true,
        }
    }
}

impl ParametersBuilder {
    fn validate(&self) -> Result<()> {
        let defaults = Parameters::default();
        let params = Parameters {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            convergence_tolerance: self
                .convergence_tolerance
                .unwrap_or(defaults.convergence_tolerance),
            max_outer_iterations: self
                .max_outer_iterations
                .unwrap_or(defaults.max_outer_iterations),
            slack_bus_p_max_mismatch: self
                .slack_bus_p_max_mismatch
                .unwrap_or(defaults.slack_bus_p_max_mismatch),
            ..defaults
        };
        params.validate()
    }
}

impl Parameters {
    /// Checks option values. Called by the builder and by every analysis
    /// entry point before any computation.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_outer_iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "max_outer_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.convergence_tolerance.is_finite() && self.convergence_tolerance > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "convergence_tolerance must be positive: {}",
                self.convergence_tolerance
            )));
        }
        if !(self.slack_bus_p_max_mismatch.is_finite() && self.slack_bus_p_max_mismatch > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "slack_bus_p_max_mismatch must be positive: {}",
                self.slack_bus_p_max_mismatch
            )));
        }
        if let SlackBusSelection::Name(name) = &self.slack_bus_selection {
            if name.is_empty() {
                return Err(Error::InvalidConfiguration(
                    "slack bus name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
