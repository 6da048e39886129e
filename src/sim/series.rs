//! Uniformly sampled input time series.

use chrono::NaiveDateTime;

use super::types::StepInput;
use crate::error::InputError;

/// Tolerance on the sampling step, in hours (about 4 ms).
const DT_TOLERANCE_H: f64 = 1e-6;

/// Load, production and grid availability sampled at a uniform step.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    times: Vec<NaiveDateTime>,
    load_kw: Vec<f64>,
    green_kw: Vec<f64>,
    grid_available: Vec<bool>,
    dt_hours: f64,
}

/// One raw sample, as read from an input file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: NaiveDateTime,
    pub load_kw: f64,
    pub green_kw: f64,
    pub grid_available: bool,
}

impl TimeSeries {
    /// Builds a series from samples in time order.
    ///
    /// # Errors
    ///
    /// Returns an `InputError` with fewer than two samples, a negative or
    /// non-finite power, or a step that is not positive and uniform.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, InputError> {
        if samples.len() < 2 {
            return Err(InputError::TooShort(samples.len()));
        }

        let dt_hours = hours_between(samples[0].time, samples[1].time);
        for (row, pair) in samples.windows(2).enumerate() {
            let found_h = hours_between(pair[0].time, pair[1].time);
            if dt_hours <= 0.0 || (found_h - dt_hours).abs() > DT_TOLERANCE_H {
                return Err(InputError::NonUniformStep {
                    row: row + 1,
                    expected_h: dt_hours,
                    found_h,
                });
            }
        }

        for (row, s) in samples.iter().enumerate() {
            if !(s.load_kw >= 0.0 && s.load_kw.is_finite()) {
                return Err(InputError::Negative {
                    row,
                    field: "load_kw",
                    value: s.load_kw,
                });
            }
            if !(s.green_kw >= 0.0 && s.green_kw.is_finite()) {
                return Err(InputError::Negative {
                    row,
                    field: "green_kw",
                    value: s.green_kw,
                });
            }
        }

        Ok(Self {
            times: samples.iter().map(|s| s.time).collect(),
            load_kw: samples.iter().map(|s| s.load_kw).collect(),
            green_kw: samples.iter().map(|s| s.green_kw).collect(),
            grid_available: samples.iter().map(|s| s.grid_available).collect(),
            dt_hours,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sampling step (h).
    pub fn dt_hours(&self) -> f64 {
        self.dt_hours
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn grid_available(&self) -> &[bool] {
        &self.grid_available
    }

    /// Controller input for `step`, or `None` past the end.
    pub fn input(&self, step: usize) -> Option<StepInput> {
        Some(StepInput {
            step,
            time: *self.times.get(step)?,
            load_kw: *self.load_kw.get(step)?,
            green_kw: *self.green_kw.get(step)?,
        })
    }
}

fn hours_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (b - a).num_milliseconds() as f64 / 3_600_000.0
}
