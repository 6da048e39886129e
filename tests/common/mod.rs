//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use microgrid_dispatch::config::{ScenarioConfig, Strategy};
use microgrid_dispatch::devices::ActiveDevices;
use microgrid_dispatch::sim::profile::OutageWindow;

/// Two days at 15 minutes with the grid down for the middle twelve hours.
pub const STEPS: usize = 192;

/// Baseline scenario shortened to [`STEPS`] samples.
pub fn short_scenario(strategy: Strategy) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.strategy = strategy;
    cfg.input.synthetic.steps = STEPS;
    cfg.input.synthetic.noise_std_kw = 8.0;
    cfg.input.synthetic.outage = Some(OutageWindow {
        start_step: 72,
        steps: 48,
    });
    cfg
}

/// Every combination of enabled devices.
pub fn device_combinations() -> Vec<ActiveDevices> {
    let mut combos = Vec::with_capacity(8);
    for grid in [true, false] {
        for batteries in [true, false] {
            for diesel in [true, false] {
                combos.push(ActiveDevices {
                    grid,
                    batteries,
                    diesel,
                });
            }
        }
    }
    combos
}

pub const STRATEGIES: [Strategy; 3] = [
    Strategy::LoadFollowing,
    Strategy::CycleCharging,
    Strategy::Cost,
];

/// Path of a file under `tests/data`.
pub fn data_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}
