//! Common types shared by the device models and the dispatch policies.

use serde::{Deserialize, Serialize};

/// Decision cost standing in for "possible but should be avoided".
///
/// Large and finite so it still orders against real costs (and against
/// `f64::INFINITY`, which marks an unavailable device).
pub const INFEASIBLE_COST: f64 = 1e11;

/// Which state-of-charge figure to aggregate over a battery stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocKind {
    /// Current state of charge.
    Current,
    /// Lower operating bound.
    Min,
    /// Upper operating bound.
    Max,
}

/// Direction of a battery power limit query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Charge,
    Discharge,
}

/// Which devices take part in a simulation run.
///
/// A disabled device is never asked for power and reports all-zero columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActiveDevices {
    pub grid: bool,
    pub batteries: bool,
    pub diesel: bool,
}

impl Default for ActiveDevices {
    fn default() -> Self {
        Self {
            grid: true,
            batteries: true,
            diesel: true,
        }
    }
}

impl ActiveDevices {
    /// Short tag such as `GB-` used in output file names.
    pub fn tag(&self) -> String {
        format!(
            "{}{}{}",
            if self.grid { 'G' } else { '-' },
            if self.batteries { 'B' } else { '-' },
            if self.diesel { 'D' } else { '-' },
        )
    }
}
