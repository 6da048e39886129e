//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::devices::{
    ActiveDevices, Battery, BatteryParams, BatteryStock, DieselGenerator, DieselParams,
    FuelConsumptionTable, Grid, TariffTable, fuel_table::REFERENCE_LOAD_FRACTIONS,
};
use crate::error::InputError;
use crate::io::input::read_series_file;
use crate::sim::microgrid::Microgrid;
use crate::sim::profile::SyntheticSeries;
use crate::sim::series::TimeSeries;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Dispatch policy and its parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Which devices take part.
    #[serde(default)]
    pub devices: ActiveDevices,
    /// Where the load and production series come from.
    #[serde(default)]
    pub input: InputConfig,
    /// Grid time-of-use tariff.
    #[serde(default)]
    pub tariff: TariffTable,
    /// Battery units, in allocation tie-break order.
    #[serde(default = "default_batteries")]
    pub batteries: Vec<BatteryParams>,
    /// Diesel generator; `a` and `b` are fitted when omitted.
    #[serde(default)]
    pub diesel: DieselParams,
}

/// Dispatch policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Priority order, generator following the deficit.
    #[serde(alias = "lfe")]
    LoadFollowing,
    /// Priority order, generator at nominal power charging the batteries.
    #[serde(alias = "cce")]
    CycleCharging,
    /// Cheapest quoted source each step.
    #[serde(alias = "cost_strat")]
    Cost,
}

impl Strategy {
    pub const NAMES: &[&str] = &["load_following", "cycle_charging", "cost"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadFollowing => "load_following",
            Self::CycleCharging => "cycle_charging",
            Self::Cost => "cost",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load_following" | "lfe" => Ok(Self::LoadFollowing),
            "cycle_charging" | "cce" => Ok(Self::CycleCharging),
            "cost" | "cost_strat" => Ok(Self::Cost),
            _ => Err(ConfigError {
                field: "simulation.strategy".into(),
                message: format!(
                    "unknown strategy \"{s}\", available: {}",
                    Self::NAMES.join(", ")
                ),
            }),
        }
    }
}

/// Dispatch policy and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub strategy: Strategy,
    /// Whether grid availability ahead is taken into account.
    pub lookahead: bool,
    /// Look-ahead horizon (h, > 0 when enabled).
    pub lookahead_h: f64,
    /// Priority policies charge from the grid below this aggregate SOC.
    pub soc_lim: f64,
    /// Cost policy charges from the grid while the purchase price is below
    /// this (0 disables).
    pub charge_using_grid_cost: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::LoadFollowing,
            lookahead: false,
            lookahead_h: 24.0,
            soc_lim: 0.0,
            charge_using_grid_cost: 0.0,
        }
    }
}

impl SimulationConfig {
    /// Horizon handed to the controllers, `None` when look-ahead is off.
    pub fn horizon_h(&self) -> Option<f64> {
        self.lookahead.then_some(self.lookahead_h)
    }
}

/// Source of the input series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// CSV file with `time,load_kw,green_kw,grid_available`; when absent the
    /// synthetic profile is used.
    pub csv: Option<PathBuf>,
    /// Fuel consumption table used to fit the generator; the built-in
    /// reference table when absent.
    pub fuel_table: Option<PathBuf>,
    pub synthetic: SyntheticSeries,
}

fn default_batteries() -> Vec<BatteryParams> {
    vec![
        BatteryParams {
            capacity_kwh: 500.0,
            soc: 0.5,
            soc_min: 0.2,
            soc_max: 0.95,
            eta: 0.9,
            max_charge_kw: 100.0,
            max_discharge_kw: 100.0,
            lifetime_kwh: 1_500_000.0,
            replacement_cost: 150_000.0,
            maintenance_cost: 0.01,
        },
        BatteryParams {
            capacity_kwh: 300.0,
            soc: 0.8,
            soc_min: 0.2,
            soc_max: 0.95,
            eta: 0.85,
            max_charge_kw: 60.0,
            max_discharge_kw: 60.0,
            lifetime_kwh: 900_000.0,
            replacement_cost: 90_000.0,
            maintenance_cost: 0.01,
        },
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.lookahead_h"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            field: field.into(),
            message: message.to_string(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioConfig {
    /// Grid, two batteries and a generator on the default synthetic series.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            devices: ActiveDevices::default(),
            input: InputConfig::default(),
            tariff: TariffTable::default(),
            batteries: default_batteries(),
            diesel: DieselParams::default(),
        }
    }

    /// Baseline without a grid connection.
    pub fn islanded() -> Self {
        Self {
            devices: ActiveDevices {
                grid: false,
                ..ActiveDevices::default()
            },
            ..Self::baseline()
        }
    }

    /// Baseline without batteries.
    pub fn no_storage() -> Self {
        Self {
            devices: ActiveDevices {
                batteries: false,
                ..ActiveDevices::default()
            },
            ..Self::baseline()
        }
    }

    /// Renewable production and batteries only.
    pub fn renewables_only() -> Self {
        Self {
            devices: ActiveDevices {
                grid: false,
                batteries: true,
                diesel: false,
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "islanded", "no_storage", "renewables_only"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "islanded" => Ok(Self::islanded()),
            "no_storage" => Ok(Self::no_storage()),
            "renewables_only" => Ok(Self::renewables_only()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// Relative input paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            for p in [&mut cfg.input.csv, &mut cfg.input.fuel_table]
                .into_iter()
                .flatten()
            {
                if p.is_relative() {
                    *p = dir.join(&*p);
                }
            }
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Device parameters are checked by the device constructors; disabled
    /// devices are not checked. Returns an empty vector if the configuration
    /// is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.lookahead && !(s.lookahead_h > 0.0 && s.lookahead_h.is_finite()) {
            errors.push(ConfigError::new(
                "simulation.lookahead_h",
                format!("must be > 0 when lookahead is on, got {}", s.lookahead_h),
            ));
        }
        if !(0.0..=1.0).contains(&s.soc_lim) {
            errors.push(ConfigError::new(
                "simulation.soc_lim",
                format!("must be in [0, 1], got {}", s.soc_lim),
            ));
        }
        if !(s.charge_using_grid_cost >= 0.0 && s.charge_using_grid_cost.is_finite()) {
            errors.push(ConfigError::new(
                "simulation.charge_using_grid_cost",
                format!("must be >= 0, got {}", s.charge_using_grid_cost),
            ));
        }

        if self.input.csv.is_none() {
            let syn = &self.input.synthetic;
            if !(syn.dt_hours > 0.0) {
                errors.push(ConfigError::new(
                    "input.synthetic.dt_hours",
                    format!("must be > 0, got {}", syn.dt_hours),
                ));
            }
            if syn.steps < 2 {
                errors.push(ConfigError::new(
                    "input.synthetic.steps",
                    format!("must be >= 2, got {}", syn.steps),
                ));
            }
            if syn.noise_std_kw < 0.0 {
                errors.push(ConfigError::new(
                    "input.synthetic.noise_std_kw",
                    format!("must be >= 0, got {}", syn.noise_std_kw),
                ));
            }
        }

        if self.devices.grid {
            if let Err(e) = self.tariff.check() {
                errors.push(ConfigError::new("tariff", e));
            }
        }

        if self.devices.batteries {
            for (i, params) in self.batteries.iter().enumerate() {
                if let Err(e) = Battery::new(params) {
                    errors.push(ConfigError::new(format!("batteries[{i}]"), e));
                }
            }
        }

        if self.devices.diesel {
            if self.diesel.a.is_some() != self.diesel.b.is_some() {
                errors.push(ConfigError::new(
                    "diesel.a",
                    "a and b must be given together",
                ));
            }
            if let Err(e) = DieselGenerator::new(&self.diesel) {
                errors.push(ConfigError::new("diesel", e));
            }
        }

        errors
    }

    /// Reads or generates the input series.
    ///
    /// # Errors
    ///
    /// Returns an `InputError` if the CSV cannot be read or the samples do
    /// not form a valid series.
    pub fn load_series(&self) -> Result<TimeSeries, InputError> {
        match &self.input.csv {
            Some(path) => read_series_file(path),
            None => self.input.synthetic.generate(),
        }
    }

    /// Builds the devices for a run over `series`.
    ///
    /// The grid takes its availability from the series. When `a` and `b` are
    /// not given, the generator's fuel law is fitted from the fuel table.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a device rejects its parameters, the fuel
    /// table cannot be read, or the fuel law cannot be fitted.
    pub fn build_microgrid(&self, series: &TimeSeries) -> Result<Microgrid, ConfigError> {
        let grid = Grid::new(series.grid_available().to_vec(), self.tariff.clone())
            .map_err(|e| ConfigError::new("tariff", e))?;

        let batteries = if self.devices.batteries {
            let units = self
                .batteries
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    Battery::new(p).map_err(|e| ConfigError::new(format!("batteries[{i}]"), e))
                })
                .collect::<Result<Vec<_>, _>>()?;
            BatteryStock::new(units)
        } else {
            BatteryStock::default()
        };

        let diesel = if self.devices.diesel {
            self.build_diesel()?
        } else {
            DieselGenerator::disabled()
        };

        Ok(Microgrid::new(
            grid,
            batteries,
            diesel,
            self.devices,
            series.dt_hours(),
        ))
    }

    fn build_diesel(&self) -> Result<DieselGenerator, ConfigError> {
        let mut diesel =
            DieselGenerator::new(&self.diesel).map_err(|e| ConfigError::new("diesel", e))?;
        if self.diesel.a.is_some() && self.diesel.b.is_some() {
            return Ok(diesel);
        }

        let table = match &self.input.fuel_table {
            Some(path) => {
                let file = File::open(path).map_err(|e| {
                    ConfigError::new(
                        "input.fuel_table",
                        format!("cannot read \"{}\": {e}", path.display()),
                    )
                })?;
                FuelConsumptionTable::from_csv_reader(BufReader::new(file))
                    .map_err(|e| ConfigError::new("input.fuel_table", e))?
            }
            None => FuelConsumptionTable::reference(),
        };
        if !diesel.fit_consumption_curve(&table, &REFERENCE_LOAD_FRACTIONS) {
            return Err(ConfigError::new(
                "diesel",
                format!(
                    "cannot fit the fuel law for p_nom_kw = {}; set a and b",
                    self.diesel.p_nom_kw
                ),
            ));
        }
        let (a, b) = diesel.coefficients();
        info!(a, b, p_nom_kw = self.diesel.p_nom_kw, "fitted fuel law");
        Ok(diesel)
    }
}
