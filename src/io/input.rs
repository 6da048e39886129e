//! Reading measured load and production series from CSV.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::InputError;
use crate::sim::series::{Sample, TimeSeries};

/// Accepted timestamp layouts, tried in order.
const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Deserialize)]
struct Row {
    time: String,
    load_kw: f64,
    green_kw: f64,
    grid_available: u8,
}

fn parse_time(row: usize, value: &str) -> Result<NaiveDateTime, InputError> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| InputError::Timestamp {
            row,
            value: value.to_string(),
        })
}

/// Reads a series with header `time,load_kw,green_kw,grid_available`.
///
/// Rows are numbered from 0, the first data row after the header.
///
/// # Errors
///
/// Returns an `InputError` on malformed CSV, an unparseable timestamp, an
/// availability flag other than 0 or 1, or any check of
/// [`TimeSeries::from_samples`].
pub fn read_series<R: Read>(reader: R) -> Result<TimeSeries, InputError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for (row, record) in rdr.deserialize::<Row>().enumerate() {
        let r = record?;
        let grid_available = match r.grid_available {
            0 => false,
            1 => true,
            value => return Err(InputError::Availability { row, value }),
        };
        samples.push(Sample {
            time: parse_time(row, &r.time)?,
            load_kw: r.load_kw,
            green_kw: r.green_kw,
            grid_available,
        });
    }
    TimeSeries::from_samples(&samples)
}

/// Reads a series from a CSV file.
///
/// # Errors
///
/// Returns `InputError::Io` if the file cannot be opened, otherwise as
/// [`read_series`].
pub fn read_series_file(path: &Path) -> Result<TimeSeries, InputError> {
    let file = File::open(path)?;
    read_series(BufReader::new(file))
}
