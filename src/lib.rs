//! Microgrid dispatch simulator: renewable production, a grid connection,
//! batteries and a diesel generator dispatched step by step under a
//! priority or cost-comparison policy.

/// TOML scenarios and presets.
pub mod config;
pub mod devices;
pub mod error;
/// Input reading and result export.
pub mod io;
pub mod logging;
pub mod runner;
/// Simulation engine, controllers, validation and energy accounting.
pub mod sim;
