//! Scenario execution: builds the devices, runs the selected policy and
//! checks the outcome.

use thiserror::Error;
use tracing::error;

use crate::config::{ConfigError, ScenarioConfig, Strategy};
use crate::error::{InputError, ModelError};
use crate::sim::controller::{Controller, CostController, PriorityController, PriorityMode};
use crate::sim::engine::Engine;
use crate::sim::kpi::EnergyReport;
use crate::sim::microgrid::Microgrid;
use crate::sim::series::TimeSeries;
use crate::sim::types::StepResult;
use crate::sim::validate::{ValidationBounds, ValidationError, validate_results};

/// Reasons a scenario cannot be run to a valid result.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid scenario: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Config(Vec<ConfigError>),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("result check failed: {0}")]
    Validation(#[from] ValidationError),
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(vec![e])
    }
}

/// Outcome of a scenario run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub strategy: Strategy,
    pub results: Vec<StepResult>,
    pub report: EnergyReport,
    /// Devices in their end-of-run state.
    pub microgrid: Microgrid,
}

/// Runs `controller` over `series` and returns the step records with the
/// devices' final state.
///
/// # Errors
///
/// Returns `ModelError::AvailabilityLength` if the grid does not cover the series.
pub fn run_engine<C: Controller>(
    microgrid: Microgrid,
    series: TimeSeries,
    controller: C,
) -> Result<(Vec<StepResult>, Microgrid), ModelError> {
    let mut engine = Engine::new(microgrid, series, controller)?;
    let results = engine.run();
    Ok((results, engine.microgrid().clone()))
}

/// Validates, builds and runs a scenario, then checks its results.
///
/// # Errors
///
/// Returns a `RunError` listing every configuration problem, or the first
/// input, model or result-check failure.
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<RunOutput, RunError> {
    let errors = cfg.validate();
    if !errors.is_empty() {
        return Err(RunError::Config(errors));
    }

    let series = cfg.load_series()?;
    let microgrid = cfg.build_microgrid(&series)?;
    let bounds = ValidationBounds::from_microgrid(&microgrid);
    let dt_hours = series.dt_hours();
    let tank_l = microgrid.diesel.tank_l;

    let sim = &cfg.simulation;
    let horizon = sim.horizon_h();
    let (results, microgrid) = match sim.strategy {
        Strategy::LoadFollowing => run_engine(
            microgrid,
            series,
            PriorityController::new(PriorityMode::LoadFollowing, horizon, sim.soc_lim),
        )?,
        Strategy::CycleCharging => run_engine(
            microgrid,
            series,
            PriorityController::new(PriorityMode::CycleCharging, horizon, sim.soc_lim),
        )?,
        Strategy::Cost => run_engine(
            microgrid,
            series,
            CostController::new(sim.charge_using_grid_cost, horizon),
        )?,
    };

    if let Err(e) = validate_results(&results, &bounds) {
        error!(%e, "results violate an invariant");
        return Err(e.into());
    }

    Ok(RunOutput {
        strategy: sim.strategy,
        report: EnergyReport::from_results(&results, dt_hours, tank_l),
        results,
        microgrid,
    })
}
