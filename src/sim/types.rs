//! Core simulation types: step inputs, dispatch decisions and step records.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// One input sample fed to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    /// Step index in the time series.
    pub step: usize,
    /// Timestamp of the sample.
    pub time: NaiveDateTime,
    /// Requested load (kW, >= 0).
    pub load_kw: f64,
    /// Renewable production (kW, >= 0).
    pub green_kw: f64,
}

impl StepInput {
    /// Production minus load: positive is a surplus, negative a deficit.
    pub fn net_kw(&self) -> f64 {
        self.green_kw - self.load_kw
    }
}

/// Which decision a controller took in a step. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Production equals load.
    Balanced,
    /// Surplus stored in the batteries.
    ChargeSurplus,
    /// Surplus sold to the grid.
    SellSurplus,
    /// Surplus dissipated.
    DumpSurplus,
    /// Grid covers the deficit.
    GridSupply,
    /// Grid covers the deficit and charges the batteries.
    GridSupplyCharging,
    /// Batteries cover the deficit, topped up by the grid when available.
    BatterySupply,
    /// Generator output falls short; batteries discharge, load may be clipped.
    DieselShort,
    /// Generator covers the deficit; the excess charges the batteries.
    DieselSurplus,
    /// Generator excess sold to the grid.
    DieselSellExcess,
    /// Generator excess stored in the batteries.
    DieselChargeExcess,
    /// Generator shortfall bought from the grid.
    DieselGridTopUp,
    /// Generator shortfall taken from the batteries.
    DieselBatteryTopUp,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::ChargeSurplus => "charge_surplus",
            Self::SellSurplus => "sell_surplus",
            Self::DumpSurplus => "dump_surplus",
            Self::GridSupply => "grid_supply",
            Self::GridSupplyCharging => "grid_supply_charging",
            Self::BatterySupply => "battery_supply",
            Self::DieselShort => "diesel_short",
            Self::DieselSurplus => "diesel_surplus",
            Self::DieselSellExcess => "diesel_sell_excess",
            Self::DieselChargeExcess => "diesel_charge_excess",
            Self::DieselGridTopUp => "diesel_grid_top_up",
            Self::DieselBatteryTopUp => "diesel_battery_top_up",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision costs computed by the cost-comparison controller (currency/kWh).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostSignals {
    pub grid_sale: f64,
    pub grid_purchase: f64,
    pub battery_charge: f64,
    pub battery_discharge: f64,
    pub diesel_use: f64,
}

/// Flows decided by a controller for one step.
///
/// Signs follow the output convention: positive supplies the load, negative
/// absorbs power (battery charging, selling to the grid).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDispatch {
    /// Load actually served (kW).
    pub load_served_kw: f64,
    pub grid_kw: f64,
    pub battery_kw: f64,
    pub diesel_kw: f64,
    pub branch: Branch,
    pub costs: Option<CostSignals>,
}

impl StepDispatch {
    /// A dispatch serving `load_served_kw` with no device flows.
    pub fn idle(load_served_kw: f64, branch: Branch) -> Self {
        Self {
            load_served_kw,
            grid_kw: 0.0,
            battery_kw: 0.0,
            diesel_kw: 0.0,
            branch,
            costs: None,
        }
    }
}

/// Complete record of one simulation step.
///
/// State snapshots (`soc`, `battery_socs`, `fuel_rate`, `diesel_runtime_h`)
/// are taken before the controller runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub time: NaiveDateTime,
    /// Requested load (kW).
    pub p_load: f64,
    /// Load actually served (kW).
    pub p_load_served: f64,
    /// Renewable production (kW).
    pub p_green: f64,
    /// Grid flow (kW; positive buying, negative selling).
    pub p_grid: f64,
    /// Battery flow (kW; positive discharging, negative charging).
    pub p_bat: f64,
    /// Generator output (kW, >= 0).
    pub p_diesel: f64,
    /// Surplus dissipated in the dump load (kW, >= 0).
    pub p_resistor: f64,
    /// Total supply minus requested load (kW).
    pub p_diff: f64,
    /// Aggregate battery SOC.
    pub soc: f64,
    /// Per-battery SOC in configuration order.
    pub battery_socs: Vec<f64>,
    /// Tank fill fraction.
    pub fuel_rate: f64,
    /// Generator continuous runtime (h).
    pub diesel_runtime_h: f64,
    pub branch: Branch,
    pub costs: Option<CostSignals>,
}

impl StepResult {
    /// Supply minus served load minus dissipation; zero for a balanced step.
    pub fn imbalance_kw(&self) -> f64 {
        self.p_green + self.p_grid + self.p_bat + self.p_diesel
            - self.p_load_served
            - self.p_resistor
    }

    /// Requested load that was not served (kW).
    pub fn unserved_kw(&self) -> f64 {
        (self.p_load - self.p_load_served).max(0.0)
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({}) | load={:>7.2}/{:>7.2} kW  green={:>7.2} | grid={:>7.2}  \
             bat={:>7.2} (SoC={:.1}%)  diesel={:>7.2} (fuel={:.1}%)  dump={:>6.2} | {}",
            self.step,
            self.time.format("%Y-%m-%d %H:%M"),
            self.p_load_served,
            self.p_load,
            self.p_green,
            self.p_grid,
            self.p_bat,
            self.soc * 100.0,
            self.p_diesel,
            self.fuel_rate * 100.0,
            self.p_resistor,
            self.branch,
        )
    }
}
