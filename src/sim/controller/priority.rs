use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Controller;
use crate::devices::{Direction, SocKind};
use crate::sim::microgrid::Microgrid;
use crate::sim::types::{Branch, StepDispatch, StepInput};

/// What the generator is asked for when it has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    /// Generator follows the deficit.
    LoadFollowing,
    /// Generator runs at nominal power; the excess charges the batteries.
    CycleCharging,
}

/// Fixed-priority dispatch: batteries absorb surplus, then the grid, then
/// the batteries, then the generator cover deficits.
///
/// # Examples
///
/// ```
/// use microgrid_dispatch::sim::controller::{PriorityController, PriorityMode};
///
/// let ctrl = PriorityController::new(PriorityMode::LoadFollowing, Some(24.0), 0.5);
/// assert_eq!(ctrl.mode(), PriorityMode::LoadFollowing);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityController {
    mode: PriorityMode,
    lookahead_h: Option<f64>,
    soc_lim: f64,
}

impl PriorityController {
    /// Creates a controller.
    ///
    /// # Arguments
    ///
    /// * `mode` - Generator operating mode
    /// * `lookahead_h` - Grid availability horizon (h); `None` disables
    ///   charging the batteries from the grid
    /// * `soc_lim` - Below this aggregate SOC the batteries charge from the
    ///   grid whenever look-ahead is enabled (0 disables)
    pub fn new(mode: PriorityMode, lookahead_h: Option<f64>, soc_lim: f64) -> Self {
        Self {
            mode,
            lookahead_h,
            soc_lim,
        }
    }

    pub fn mode(&self) -> PriorityMode {
        self.mode
    }

    fn wants_grid_charging(&self, step: usize, mg: &Microgrid) -> bool {
        let Some(horizon_h) = self.lookahead_h else {
            return false;
        };
        if !mg.active.batteries {
            return false;
        }
        let steps = (horizon_h / mg.dt_hours).floor() as usize;
        mg.batteries.soc(SocKind::Current) < self.soc_lim || mg.grid.outage_ahead(step, steps)
    }

    fn absorb_surplus(&self, input: &StepInput, mg: &mut Microgrid) -> StepDispatch {
        let surplus = input.net_kw();
        mg.diesel.stop();
        let mut out = StepDispatch::idle(input.load_kw, Branch::DumpSurplus);
        if mg.active.batteries
            && mg.batteries.soc(SocKind::Current) < mg.batteries.soc(SocKind::Max)
        {
            out.battery_kw = -mg.batteries.charge(surplus, mg.dt_hours);
            out.branch = Branch::ChargeSurplus;
        } else if mg.grid_up(input.step) {
            out.grid_kw = -surplus;
            out.branch = Branch::SellSurplus;
        }
        out
    }

    fn cover_deficit(&self, input: &StepInput, mg: &mut Microgrid) -> StepDispatch {
        let deficit = -input.net_kw();
        let dt = mg.dt_hours;
        let locked_on = mg.diesel_locked_on();
        let grid_up = mg.grid_up(input.step);

        if grid_up && !locked_on {
            mg.diesel.stop();
            let mut out = StepDispatch::idle(input.load_kw, Branch::GridSupply);
            out.grid_kw = deficit;
            if self.wants_grid_charging(input.step, mg) {
                let max_charge = mg.batteries.max_power(dt, Direction::Charge);
                let charged = mg.batteries.charge(max_charge, dt);
                out.grid_kw += charged;
                out.battery_kw = -charged;
                out.branch = Branch::GridSupplyCharging;
            }
            return out;
        }

        if mg.active.batteries
            && !locked_on
            && deficit <= mg.batteries.max_power(dt, Direction::Discharge)
        {
            mg.diesel.stop();
            let discharged = mg.batteries.discharge(deficit, dt);
            let mut out = StepDispatch::idle(input.load_kw, Branch::BatterySupply);
            out.battery_kw = discharged;
            if grid_up {
                out.grid_kw = deficit - discharged;
            } else {
                out.load_served_kw = input.green_kw + discharged;
            }
            return out;
        }

        let requested = match self.mode {
            PriorityMode::LoadFollowing => deficit,
            PriorityMode::CycleCharging => mg.diesel.p_nom_kw,
        };
        let run = mg.diesel.run(requested, dt, mg.active.diesel);
        mg.diesel.commit(&run, dt);
        let delivered = run.power_kw;

        let mut out = StepDispatch::idle(input.load_kw, Branch::DieselSurplus);
        out.diesel_kw = delivered;
        if delivered < deficit {
            let discharged = if mg.active.batteries {
                mg.batteries.discharge(deficit - delivered, dt)
            } else {
                0.0
            };
            out.battery_kw = discharged;
            out.load_served_kw = input.green_kw + delivered + discharged;
            out.branch = Branch::DieselShort;
        } else if mg.active.batteries {
            out.battery_kw = -mg.batteries.charge(delivered - deficit, dt);
        }
        out
    }
}

impl Controller for PriorityController {
    fn dispatch(&mut self, input: &StepInput, mg: &mut Microgrid) -> StepDispatch {
        let out = if input.net_kw() >= 0.0 {
            self.absorb_surplus(input, mg)
        } else {
            self.cover_deficit(input, mg)
        };
        trace!(step = input.step, branch = %out.branch, "priority dispatch");
        out
    }

    fn name(&self) -> &'static str {
        match self.mode {
            PriorityMode::LoadFollowing => "load_following",
            PriorityMode::CycleCharging => "cycle_charging",
        }
    }
}
