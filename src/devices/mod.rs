//! Physical device models of the microgrid.

/// Single battery storage unit.
pub mod battery;
/// Battery collection operated as one unit.
pub mod battery_stock;
/// Diesel generator with fuel law and runtime hysteresis.
pub mod diesel;
/// Reference fuel consumption data.
pub mod fuel_table;
/// Utility grid connection and tariff.
pub mod grid;
pub mod types;

// Re-export the main types for convenience
pub use battery::{Battery, BatteryParams};
pub use battery_stock::BatteryStock;
pub use diesel::{DieselGenerator, DieselParams, DieselRun};
pub use fuel_table::FuelConsumptionTable;
pub use grid::{Grid, TariffTable, TariffTier, TierPrice};
pub use types::{ActiveDevices, Direction, INFEASIBLE_COST, SocKind};
