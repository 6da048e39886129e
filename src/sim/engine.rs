//! Simulation engine that feeds the time series through a controller.

use tracing::{debug, info, warn};

use super::controller::Controller;
use super::microgrid::Microgrid;
use super::series::TimeSeries;
use super::types::{CostSignals, StepResult};
use crate::devices::SocKind;
use crate::error::ModelError;

/// Simulation engine owning the devices, the input series and the controller.
///
/// Generic over `C: Controller` for static dispatch.
pub struct Engine<C: Controller> {
    microgrid: Microgrid,
    series: TimeSeries,
    controller: C,
}

impl<C: Controller> Engine<C> {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `microgrid` - Devices to dispatch; its step must match the series
    /// * `series` - Input samples
    /// * `controller` - Dispatch policy
    ///
    /// # Errors
    ///
    /// Returns `ModelError::AvailabilityLength` if the grid availability does
    /// not cover every step of the series.
    pub fn new(
        microgrid: Microgrid,
        series: TimeSeries,
        controller: C,
    ) -> Result<Self, ModelError> {
        let availability = microgrid.grid.availability().len();
        if availability != series.len() {
            return Err(ModelError::AvailabilityLength {
                availability,
                steps: series.len(),
            });
        }
        Ok(Self {
            microgrid,
            series,
            controller,
        })
    }

    /// Executes one step and returns its record.
    ///
    /// Device states are snapshotted before dispatch; the controller then
    /// mutates them for the next step.
    ///
    /// # Panics
    ///
    /// Panics if `t` is past the end of the series.
    pub fn step(&mut self, t: usize) -> StepResult {
        let input = self
            .series
            .input(t)
            .unwrap_or_else(|| panic!("step {t} is past the end of the series"));
        let mg = &mut self.microgrid;
        let active = mg.active;

        let soc = mg.batteries.soc(SocKind::Current);
        let battery_socs = mg.batteries.socs();
        let fuel_rate = mg.diesel.fuel_rate();
        let diesel_runtime_h = mg.diesel.runtime_h();

        let dispatch = self.controller.dispatch(&input, mg);

        let supply = input.green_kw + dispatch.grid_kw + dispatch.battery_kw + dispatch.diesel_kw;
        let p_resistor = (supply - dispatch.load_served_kw).max(0.0);
        if dispatch.load_served_kw < input.load_kw {
            warn!(
                step = t,
                load_kw = input.load_kw,
                served_kw = dispatch.load_served_kw,
                "load clipped"
            );
        }
        debug!(step = t, branch = %dispatch.branch, net_kw = input.net_kw(), "dispatched");

        let costs = dispatch.costs.map(|c| CostSignals {
            grid_sale: if active.grid { c.grid_sale } else { 0.0 },
            grid_purchase: if active.grid { c.grid_purchase } else { 0.0 },
            battery_charge: if active.batteries {
                c.battery_charge
            } else {
                0.0
            },
            battery_discharge: if active.batteries {
                c.battery_discharge
            } else {
                0.0
            },
            diesel_use: if active.diesel { c.diesel_use } else { 0.0 },
        });

        StepResult {
            step: t,
            time: input.time,
            p_load: input.load_kw,
            p_load_served: dispatch.load_served_kw,
            p_green: input.green_kw,
            p_grid: if active.grid { dispatch.grid_kw } else { 0.0 },
            p_bat: if active.batteries {
                dispatch.battery_kw
            } else {
                0.0
            },
            p_diesel: if active.diesel {
                dispatch.diesel_kw
            } else {
                0.0
            },
            p_resistor,
            p_diff: supply - input.load_kw,
            soc: if active.batteries { soc } else { 0.0 },
            battery_socs: if active.batteries {
                battery_socs
            } else {
                Vec::new()
            },
            fuel_rate: if active.diesel { fuel_rate } else { 0.0 },
            diesel_runtime_h: if active.diesel {
                diesel_runtime_h
            } else {
                0.0
            },
            branch: dispatch.branch,
            costs,
        }
    }

    /// Executes all steps in order and returns one record per sample.
    pub fn run(&mut self) -> Vec<StepResult> {
        let total = self.series.len();
        info!(
            controller = self.controller.name(),
            steps = total,
            dt_hours = self.microgrid.dt_hours,
            devices = %self.microgrid.active.tag(),
            "simulation started"
        );
        let results: Vec<StepResult> = (0..total).map(|t| self.step(t)).collect();
        let clipped = results.iter().filter(|r| r.unserved_kw() > 0.0).count();
        info!(steps = results.len(), clipped, "simulation finished");
        results
    }

    /// Returns the devices (for end-of-run state queries).
    pub fn microgrid(&self) -> &Microgrid {
        &self.microgrid
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }
}
