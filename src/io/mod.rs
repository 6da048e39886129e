/// CSV and JSON export of simulation results.
pub mod export;
/// CSV input reading.
pub mod input;
