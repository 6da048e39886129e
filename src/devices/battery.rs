use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ensure};

/// SOC values this close to a bound are snapped onto it.
const SOC_SNAP: f64 = 1e-14;

/// Configuration of a single battery, as read from a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryParams {
    /// Storage capacity (kWh, > 0).
    pub capacity_kwh: f64,
    /// Initial state of charge (SOCmin..=SOCmax).
    pub soc: f64,
    /// Lower state-of-charge bound (0..=1).
    pub soc_min: f64,
    /// Upper state-of-charge bound (0..=1).
    pub soc_max: f64,
    /// Efficiency applied on discharge only (0..=1).
    pub eta: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Expected energy throughput over the battery life (kWh).
    pub lifetime_kwh: f64,
    /// Replacement cost (currency).
    pub replacement_cost: f64,
    /// Maintenance cost (currency/kWh).
    pub maintenance_cost: f64,
}

/// A battery storage unit with an operating SOC window.
///
/// Charging is lossless; the efficiency `eta` is applied when discharging, so a
/// charge/discharge round trip returns less energy than was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,
    /// Lower state-of-charge bound.
    pub soc_min: f64,
    /// Upper state-of-charge bound.
    pub soc_max: f64,
    /// Discharge efficiency (0..=1).
    pub eta: f64,
    /// Maximum charge power in kilowatts.
    pub max_charge_kw: f64,
    /// Maximum discharge power in kilowatts.
    pub max_discharge_kw: f64,
    /// Lifetime energy throughput in kWh.
    pub lifetime_kwh: f64,
    pub replacement_cost: f64,
    pub maintenance_cost: f64,

    soc: f64,
}

impl Battery {
    /// Creates a battery from its parameters.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if the capacity is not positive, the SOC window is
    /// not ordered inside `[0, 1]`, the efficiency is outside `[0, 1]`, or any
    /// power limit or cost is negative.
    pub fn new(params: &BatteryParams) -> Result<Self, ModelError> {
        const DEV: &str = "battery";
        ensure(params.capacity_kwh > 0.0, DEV, "capacity_kwh", "> 0", params.capacity_kwh)?;
        ensure((0.0..=1.0).contains(&params.eta), DEV, "eta", "in [0, 1]", params.eta)?;
        ensure(params.max_charge_kw >= 0.0, DEV, "max_charge_kw", ">= 0", params.max_charge_kw)?;
        ensure(
            params.max_discharge_kw >= 0.0,
            DEV,
            "max_discharge_kw",
            ">= 0",
            params.max_discharge_kw,
        )?;
        ensure(params.lifetime_kwh >= 0.0, DEV, "lifetime_kwh", ">= 0", params.lifetime_kwh)?;
        ensure(
            params.replacement_cost >= 0.0,
            DEV,
            "replacement_cost",
            ">= 0",
            params.replacement_cost,
        )?;
        ensure(
            params.maintenance_cost >= 0.0,
            DEV,
            "maintenance_cost",
            ">= 0",
            params.maintenance_cost,
        )?;

        let ordered = 0.0 <= params.soc_min
            && params.soc_min <= params.soc
            && params.soc <= params.soc_max
            && params.soc_max <= 1.0;
        if !ordered {
            return Err(ModelError::Ordering {
                device: DEV,
                expected: "0 <= soc_min <= soc <= soc_max <= 1",
                found: format!(
                    "soc_min={}, soc={}, soc_max={}",
                    params.soc_min, params.soc, params.soc_max
                ),
            });
        }

        Ok(Self {
            capacity_kwh: params.capacity_kwh,
            soc_min: params.soc_min,
            soc_max: params.soc_max,
            eta: params.eta,
            max_charge_kw: params.max_charge_kw,
            max_discharge_kw: params.max_discharge_kw,
            lifetime_kwh: params.lifetime_kwh,
            replacement_cost: params.replacement_cost,
            maintenance_cost: params.maintenance_cost,
            soc: params.soc,
        })
    }

    /// Current state of charge.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Charges the battery with up to `power_kw` for `dt_hours`.
    ///
    /// The accepted power is limited by `max_charge_kw` and by the energy
    /// headroom left below `soc_max`.
    ///
    /// # Returns
    ///
    /// The power actually absorbed (kW, >= 0).
    ///
    /// # Panics
    ///
    /// Panics if `power_kw` is negative.
    pub fn charge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        assert!(power_kw >= 0.0, "charge power must be >= 0, got {power_kw}");
        if self.soc >= self.soc_max {
            return 0.0;
        }

        let headroom_kwh = (self.soc_max - self.soc) * self.capacity_kwh;
        let accepted_kw = power_kw
            .min(self.max_charge_kw)
            .min(headroom_kwh / dt_hours);
        if accepted_kw <= 0.0 {
            return 0.0;
        }

        self.set_soc(self.soc + accepted_kw * dt_hours / self.capacity_kwh);
        accepted_kw
    }

    /// Discharges the battery to supply up to `power_kw` for `dt_hours`.
    ///
    /// Limited by `max_discharge_kw` and by the usable energy above
    /// `soc_min`, after efficiency losses.
    ///
    /// # Returns
    ///
    /// The power actually supplied (kW, >= 0).
    ///
    /// # Panics
    ///
    /// Panics if `power_kw` is negative.
    pub fn discharge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        assert!(power_kw >= 0.0, "discharge power must be >= 0, got {power_kw}");
        if self.soc <= self.soc_min {
            return 0.0;
        }

        let usable_kwh = self.usable_energy_kwh();
        let supplied_kw = power_kw
            .min(self.max_discharge_kw)
            .min(usable_kwh / dt_hours);
        if supplied_kw <= 0.0 {
            return 0.0;
        }

        self.set_soc(self.soc - supplied_kw * dt_hours / (self.capacity_kwh * self.eta));
        supplied_kw
    }

    /// Energy that can still be stored before reaching `soc_max` (kWh).
    pub fn headroom_kwh(&self) -> f64 {
        (self.soc_max - self.soc) * self.capacity_kwh
    }

    /// Energy that can still be delivered before reaching `soc_min`, net of
    /// discharge losses (kWh).
    pub fn usable_energy_kwh(&self) -> f64 {
        (self.soc - self.soc_min) * self.capacity_kwh * self.eta
    }

    /// Energy window between the SOC bounds as seen from the load (kWh).
    pub fn window_kwh(&self) -> f64 {
        self.capacity_kwh * self.eta * (self.soc_max - self.soc_min)
    }

    fn set_soc(&mut self, soc: f64) {
        let mut soc = soc.clamp(self.soc_min, self.soc_max);
        if soc - self.soc_min < SOC_SNAP {
            soc = self.soc_min;
        } else if self.soc_max - soc < SOC_SNAP {
            soc = self.soc_max;
        }
        self.soc = soc;
    }
}
