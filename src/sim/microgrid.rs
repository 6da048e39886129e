//! The set of devices a controller dispatches.

use crate::devices::{ActiveDevices, BatteryStock, DieselGenerator, Grid};

/// Devices of one microgrid, owned by the engine and lent to the controller
/// once per step.
#[derive(Debug, Clone)]
pub struct Microgrid {
    pub grid: Grid,
    pub batteries: BatteryStock,
    pub diesel: DieselGenerator,
    pub active: ActiveDevices,
    /// Duration of one step (h).
    pub dt_hours: f64,
}

impl Microgrid {
    /// Bundles devices for a run.
    ///
    /// Disabled devices are replaced by inert placeholders: a grid that is
    /// never available, an empty battery stock and a generator with no fuel.
    ///
    /// # Panics
    ///
    /// Panics if `dt_hours` is not positive.
    pub fn new(
        grid: Grid,
        batteries: BatteryStock,
        diesel: DieselGenerator,
        active: ActiveDevices,
        dt_hours: f64,
    ) -> Self {
        assert!(dt_hours > 0.0, "dt_hours must be > 0, got {dt_hours}");
        let grid = if active.grid {
            grid
        } else {
            Grid::disconnected(grid.availability().len())
        };
        let batteries = if active.batteries {
            batteries
        } else {
            BatteryStock::default()
        };
        let diesel = if active.diesel {
            diesel
        } else {
            DieselGenerator::disabled()
        };
        Self {
            grid,
            batteries,
            diesel,
            active,
            dt_hours,
        }
    }

    /// Whether power can be exchanged with the grid at `step`.
    pub fn grid_up(&self, step: usize) -> bool {
        self.active.grid && self.grid.is_available(step)
    }

    /// Whether the generator must keep running this step.
    pub fn diesel_locked_on(&self) -> bool {
        self.active.diesel && self.diesel.in_mandatory_run()
    }
}
