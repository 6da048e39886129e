//! Post-run checks of the conservation and bound invariants.

use thiserror::Error;

use super::microgrid::Microgrid;
use super::types::StepResult;
use crate::devices::SocKind;

/// Relative tolerance of the per-step power balance.
pub const BALANCE_TOLERANCE: f64 = 1e-12;

const BOUND_TOLERANCE: f64 = 1e-12;

/// First invariant violation found in a result series.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("step {step}: power balance off by {residual_kw} kW")]
    Imbalance { step: usize, residual_kw: f64 },
    #[error("step {step}: aggregate SOC {soc} outside [{min}, {max}]")]
    Soc {
        step: usize,
        soc: f64,
        min: f64,
        max: f64,
    },
    #[error("step {step}: battery {battery} SOC {soc} outside [{min}, {max}]")]
    BatterySoc {
        step: usize,
        battery: usize,
        soc: f64,
        min: f64,
        max: f64,
    },
    #[error("step {step}: fuel rate {fuel_rate} outside [{min}, 1]")]
    FuelRate {
        step: usize,
        fuel_rate: f64,
        min: f64,
    },
    #[error("step {step}: {field} must be >= 0, got {value}")]
    Negative {
        step: usize,
        field: &'static str,
        value: f64,
    },
}

/// Bounds the state snapshots must respect.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationBounds {
    pub soc_min: f64,
    pub soc_max: f64,
    /// Per-battery `(min, max)` in configuration order.
    pub battery_soc: Vec<(f64, f64)>,
    pub fuel_rate_min: f64,
}

impl ValidationBounds {
    /// Bounds of the devices of `mg`.
    pub fn from_microgrid(mg: &Microgrid) -> Self {
        Self {
            soc_min: mg.batteries.soc(SocKind::Min),
            soc_max: mg.batteries.soc(SocKind::Max),
            battery_soc: mg
                .batteries
                .batteries()
                .iter()
                .map(|b| (b.soc_min, b.soc_max))
                .collect(),
            fuel_rate_min: if mg.active.diesel {
                mg.diesel.fuel_rate_min
            } else {
                0.0
            },
        }
    }
}

/// Checks every step of a run.
///
/// # Errors
///
/// Returns the first violation of: per-step power balance (within
/// [`BALANCE_TOLERANCE`] relative to the largest flow), SOC bounds, fuel
/// bounds, or non-negativity of served load, dissipation and generator
/// output.
pub fn validate_results(
    results: &[StepResult],
    bounds: &ValidationBounds,
) -> Result<(), ValidationError> {
    for r in results {
        let step = r.step;
        let scale = [
            r.p_green,
            r.p_grid,
            r.p_bat,
            r.p_diesel,
            r.p_load_served,
            r.p_resistor,
        ]
        .iter()
        .fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let residual_kw = r.imbalance_kw();
        if residual_kw.abs() > BALANCE_TOLERANCE * scale {
            return Err(ValidationError::Imbalance { step, residual_kw });
        }

        for (field, value) in [
            ("p_load_served", r.p_load_served),
            ("p_resistor", r.p_resistor),
            ("p_diesel", r.p_diesel),
        ] {
            if value < 0.0 {
                return Err(ValidationError::Negative { step, field, value });
            }
        }

        if r.soc < bounds.soc_min - BOUND_TOLERANCE || r.soc > bounds.soc_max + BOUND_TOLERANCE {
            return Err(ValidationError::Soc {
                step,
                soc: r.soc,
                min: bounds.soc_min,
                max: bounds.soc_max,
            });
        }
        for (battery, (&soc, &(min, max))) in
            r.battery_socs.iter().zip(&bounds.battery_soc).enumerate()
        {
            if soc < min - BOUND_TOLERANCE || soc > max + BOUND_TOLERANCE {
                return Err(ValidationError::BatterySoc {
                    step,
                    battery,
                    soc,
                    min,
                    max,
                });
            }
        }

        if r.fuel_rate < bounds.fuel_rate_min - BOUND_TOLERANCE
            || r.fuel_rate > 1.0 + BOUND_TOLERANCE
        {
            return Err(ValidationError::FuelRate {
                step,
                fuel_rate: r.fuel_rate,
                min: bounds.fuel_rate_min,
            });
        }
    }
    Ok(())
}
