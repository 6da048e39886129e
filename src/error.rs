//! Error types shared by device construction and input reading.

use thiserror::Error;

/// A device parameter set that violates a physical constraint.
///
/// Returned by device constructors; never produced once a simulation is running.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("{device}: {field} must be {constraint}, got {value}")]
    OutOfRange {
        device: &'static str,
        field: &'static str,
        constraint: &'static str,
        value: f64,
    },
    #[error("{device}: expected {expected}, got {found}")]
    Ordering {
        device: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("grid availability covers {availability} steps but the series has {steps}")]
    AvailabilityLength { availability: usize, steps: usize },
    #[error("tariff schedule entry at hour {hour}, month {month} is {tier}, expected 1, 2 or 3")]
    UnknownTier { hour: usize, month: usize, tier: u8 },
}

/// Failure while reading or assembling the input time series.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: cannot parse timestamp \"{value}\"")]
    Timestamp { row: usize, value: String },
    #[error("row {row}: {field} must be >= 0, got {value}")]
    Negative {
        row: usize,
        field: &'static str,
        value: f64,
    },
    #[error("row {row}: grid_available must be 0 or 1, got {value}")]
    Availability { row: usize, value: u8 },
    #[error("row {row}: expected {expected} columns, got {found}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("fuel table lists generator size {size_kw} kW more than once")]
    DuplicateSize { size_kw: f64 },
    #[error("time series needs at least 2 samples, got {0}")]
    TooShort(usize),
    #[error("row {row}: time step is {found_h} h, expected {expected_h} h")]
    NonUniformStep {
        row: usize,
        expected_h: f64,
        found_h: f64,
    },
}

/// Shorthand for a positive/zero range check in constructors.
pub(crate) fn ensure(
    ok: bool,
    device: &'static str,
    field: &'static str,
    constraint: &'static str,
    value: f64,
) -> Result<(), ModelError> {
    if ok {
        Ok(())
    } else {
        Err(ModelError::OutOfRange {
            device,
            field,
            constraint,
            value,
        })
    }
}
