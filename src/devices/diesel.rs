use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fuel_table::{FuelConsumptionTable, linear_fit};
use super::types::INFEASIBLE_COST;
use crate::error::{ModelError, ensure};

/// Configuration of the diesel generator.
///
/// Fuel consumption follows `A * P + B` (L/h). When `a`/`b` are omitted the
/// coefficients are fitted from the reference consumption table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DieselParams {
    pub p_max_kw: f64,
    pub p_nom_kw: f64,
    pub p_min_kw: f64,
    /// Tank volume (L).
    pub tank_l: f64,
    /// Initial tank fill fraction.
    pub fuel_rate: f64,
    /// Fill fraction below which the generator must not draw fuel.
    pub fuel_rate_min: f64,
    /// Rated lifetime (kWh).
    pub lifetime_kwh: f64,
    pub replacement_cost: f64,
    /// Maintenance cost (currency/kWh).
    pub maintenance_cost: f64,
    /// Fuel price (currency/L).
    pub fuel_price: f64,
    /// Once started, the generator is favoured until it has run this long (h).
    pub minimum_runtime_h: f64,
    /// Continuous runtime at the start of the simulation (h).
    pub runtime_h: f64,
    /// Fuel per kWh delivered (L/kWh).
    pub a: Option<f64>,
    /// No-load fuel consumption (L/h).
    pub b: Option<f64>,
}

impl Default for DieselParams {
    fn default() -> Self {
        Self {
            p_max_kw: 400.0,
            p_nom_kw: 380.0,
            p_min_kw: 100.0,
            tank_l: 2000.0,
            fuel_rate: 1.0,
            fuel_rate_min: 0.1,
            lifetime_kwh: 200_000.0,
            replacement_cost: 10_000.0,
            maintenance_cost: 0.08,
            fuel_price: 1.5,
            minimum_runtime_h: 0.0,
            runtime_h: 0.0,
            a: None,
            b: None,
        }
    }
}

/// Outcome of a generator trial: what it would burn and deliver this step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DieselRun {
    /// Fuel consumption (L/h).
    pub fuel_l_per_h: f64,
    /// Power delivered (kW).
    pub power_kw: f64,
}

/// Which term limits the generator output in a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Demand,
    Fuel,
    Rating,
}

/// Diesel generator with a linear fuel law, a finite tank and a
/// minimum-runtime hysteresis.
#[derive(Debug, Clone, PartialEq)]
pub struct DieselGenerator {
    pub p_max_kw: f64,
    pub p_nom_kw: f64,
    pub p_min_kw: f64,
    pub tank_l: f64,
    pub fuel_rate_min: f64,
    pub lifetime_kwh: f64,
    pub replacement_cost: f64,
    pub maintenance_cost: f64,
    pub fuel_price: f64,
    pub minimum_runtime_h: f64,

    a: f64,
    b: f64,
    fuel_rate: f64,
    runtime_h: f64,
}

impl DieselGenerator {
    /// Creates a generator. Missing fuel-law coefficients are set to 0 and
    /// must be fitted with [`fit_consumption_curve`](Self::fit_consumption_curve).
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` when the power bounds are not ordered, the fuel
    /// fractions are not ordered inside `[0, 1]`, the tank or lifetime is not
    /// positive, or any cost, runtime or coefficient is negative.
    pub fn new(params: &DieselParams) -> Result<Self, ModelError> {
        const DEV: &str = "diesel";
        ensure(params.tank_l > 0.0, DEV, "tank_l", "> 0", params.tank_l)?;
        ensure(params.lifetime_kwh > 0.0, DEV, "lifetime_kwh", "> 0", params.lifetime_kwh)?;
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
        ensure(params.fuel_price >= 0.0, DEV, "fuel_price", ">= 0", params.fuel_price)?;
        ensure(
            params.minimum_runtime_h >= 0.0,
            DEV,
            "minimum_runtime_h",
            ">= 0",
            params.minimum_runtime_h,
        )?;
        ensure(params.runtime_h >= 0.0, DEV, "runtime_h", ">= 0", params.runtime_h)?;
        let a = params.a.unwrap_or(0.0);
        let b = params.b.unwrap_or(0.0);
        ensure(a >= 0.0, DEV, "a", ">= 0", a)?;
        ensure(b >= 0.0, DEV, "b", ">= 0", b)?;

        if !(0.0 <= params.p_min_kw
            && params.p_min_kw <= params.p_nom_kw
            && params.p_nom_kw <= params.p_max_kw)
        {
            return Err(ModelError::Ordering {
                device: DEV,
                expected: "0 <= p_min_kw <= p_nom_kw <= p_max_kw",
                found: format!(
                    "p_min_kw={}, p_nom_kw={}, p_max_kw={}",
                    params.p_min_kw, params.p_nom_kw, params.p_max_kw
                ),
            });
        }
        if !(0.0 <= params.fuel_rate_min
            && params.fuel_rate_min <= params.fuel_rate
            && params.fuel_rate <= 1.0)
        {
            return Err(ModelError::Ordering {
                device: DEV,
                expected: "0 <= fuel_rate_min <= fuel_rate <= 1",
                found: format!(
                    "fuel_rate_min={}, fuel_rate={}",
                    params.fuel_rate_min, params.fuel_rate
                ),
            });
        }

        Ok(Self {
            p_max_kw: params.p_max_kw,
            p_nom_kw: params.p_nom_kw,
            p_min_kw: params.p_min_kw,
            tank_l: params.tank_l,
            fuel_rate_min: params.fuel_rate_min,
            lifetime_kwh: params.lifetime_kwh,
            replacement_cost: params.replacement_cost,
            maintenance_cost: params.maintenance_cost,
            fuel_price: params.fuel_price,
            minimum_runtime_h: params.minimum_runtime_h,
            a,
            b,
            fuel_rate: params.fuel_rate,
            runtime_h: params.runtime_h,
        })
    }

    /// Placeholder for a disabled generator: no fuel, never runs.
    pub fn disabled() -> Self {
        Self {
            p_max_kw: 1.0,
            p_nom_kw: 1.0,
            p_min_kw: 0.0,
            tank_l: 1.0,
            fuel_rate_min: 0.0,
            lifetime_kwh: 1.0,
            replacement_cost: 0.0,
            maintenance_cost: 0.0,
            fuel_price: 0.0,
            minimum_runtime_h: 0.0,
            a: 0.0,
            b: 0.0,
            fuel_rate: 0.0,
            runtime_h: 0.0,
        }
    }

    /// Fuel-law coefficients `(A, B)`.
    pub fn coefficients(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    /// Current tank fill fraction.
    pub fn fuel_rate(&self) -> f64 {
        self.fuel_rate
    }

    /// Current continuous runtime (h).
    pub fn runtime_h(&self) -> f64 {
        self.runtime_h
    }

    /// Fuel that can still be drawn before reaching `fuel_rate_min` (L).
    pub fn available_fuel_l(&self) -> f64 {
        (self.fuel_rate - self.fuel_rate_min) * self.tank_l
    }

    /// Whether the generator started and has not yet completed its minimum
    /// runtime.
    pub fn in_mandatory_run(&self) -> bool {
        0.0 < self.runtime_h && self.runtime_h < self.minimum_runtime_h
    }

    /// Probes the generator for a request of `power_kw` over `dt_hours`.
    ///
    /// Does not touch the tank or the runtime counter; pass the result to
    /// [`commit`](Self::commit) to apply it.
    ///
    /// Output is the request raised to `p_min_kw` when enough fuel is left for
    /// it, nothing when fuel is the limit, and the rated output when the
    /// request exceeds `p_max_kw`.
    pub fn run(&self, power_kw: f64, dt_hours: f64, active: bool) -> DieselRun {
        if !active || self.available_fuel_l() <= 0.0 {
            return DieselRun::default();
        }
        let fuel_per_h = self.available_fuel_l() / dt_hours;
        let ceiling = if self.a > 0.0 {
            (fuel_per_h - self.b) / self.a
        } else if fuel_per_h >= self.b {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        let allowed = self.p_min_kw.max(power_kw.min(ceiling).min(self.p_max_kw));

        let binding = if allowed == power_kw || allowed == self.p_min_kw {
            Binding::Demand
        } else if allowed == ceiling {
            Binding::Fuel
        } else {
            Binding::Rating
        };

        let delivered = match binding {
            Binding::Demand => {
                let target = power_kw.max(self.p_min_kw);
                if fuel_per_h < self.a * target + self.b {
                    0.0
                } else {
                    target
                }
            }
            Binding::Fuel => 0.0,
            Binding::Rating if self.p_min_kw <= allowed && allowed < self.p_max_kw => allowed,
            Binding::Rating => self.p_nom_kw,
        };

        if delivered > 0.0 {
            DieselRun {
                fuel_l_per_h: self.a * delivered + self.b,
                power_kw: delivered,
            }
        } else {
            DieselRun::default()
        }
    }

    /// Applies a trial result: burns its fuel and advances the runtime counter.
    pub fn commit(&mut self, run: &DieselRun, dt_hours: f64) {
        let burnt = run.fuel_l_per_h * dt_hours / self.tank_l;
        self.fuel_rate = (self.fuel_rate - burnt).max(self.fuel_rate_min);
        self.runtime_h = if run.power_kw > 0.0 {
            self.runtime_h + dt_hours
        } else {
            0.0
        };
    }

    /// Marks the generator as off for this step.
    pub fn stop(&mut self) {
        self.runtime_h = 0.0;
    }

    /// Decision cost of covering `requested_kw` with the trial `run`.
    ///
    /// Infinite when inactive; the sentinel cost when there is no usable
    /// fuel or the run falls short of the request; zero during a mandatory run;
    /// otherwise fuel plus wear plus maintenance per kWh.
    pub fn use_cost(&self, run: &DieselRun, requested_kw: f64, active: bool) -> f64 {
        if !active {
            return f64::INFINITY;
        }
        if self.available_fuel_l() <= 0.0 || run.fuel_l_per_h == 0.0 || run.power_kw < requested_kw
        {
            return INFEASIBLE_COST;
        }
        if self.in_mandatory_run() {
            return 0.0;
        }
        run.fuel_l_per_h * self.fuel_price / run.power_kw
            + self.replacement_cost / self.lifetime_kwh
            + self.maintenance_cost
    }

    /// Fits `A` and `B` from a reference consumption table.
    ///
    /// Consumption of a generator of size `p_nom_kw` is interpolated from the
    /// table, then a least-squares line is fitted through
    /// `(fraction * p_nom_kw, consumption)` for each load fraction.
    ///
    /// # Returns
    ///
    /// `false`, leaving the coefficients untouched, when the generator is too
    /// far beyond the table or the data cannot be fitted.
    pub fn fit_consumption_curve(
        &mut self,
        table: &FuelConsumptionTable,
        load_fractions: &[f64],
    ) -> bool {
        if table.columns() != load_fractions.len() {
            warn!(
                columns = table.columns(),
                fractions = load_fractions.len(),
                "fuel table does not match load fractions"
            );
            return false;
        }
        let Some(consumption) = table.interpolate(self.p_nom_kw) else {
            warn!(
                p_nom_kw = self.p_nom_kw,
                "generator too large for the fuel table; set a and b explicitly"
            );
            return false;
        };
        let loads: Vec<f64> = load_fractions.iter().map(|f| f * self.p_nom_kw).collect();
        match linear_fit(&loads, &consumption) {
            Some((a, b)) => {
                self.a = a;
                self.b = b;
                true
            }
            None => {
                warn!(p_nom_kw = self.p_nom_kw, "cannot fit fuel consumption curve");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::fuel_table::REFERENCE_LOAD_FRACTIONS;

    fn params() -> DieselParams {
        DieselParams {
            p_max_kw: 400.0,
            p_nom_kw: 380.0,
            p_min_kw: 370.0,
            tank_l: 2000.0,
            fuel_rate: 1.0,
            fuel_rate_min: 0.1,
            a: Some(0.25),
            b: Some(8.0),
            ..DieselParams::default()
        }
    }

    fn generator() -> DieselGenerator {
        DieselGenerator::new(&params()).unwrap()
    }

    #[test]
    fn test_new_generator() {
        let dg = generator();
        assert_eq!(dg.fuel_rate(), 1.0);
        assert_eq!(dg.runtime_h(), 0.0);
        assert_eq!(dg.coefficients(), (0.25, 8.0));
        assert!((dg.available_fuel_l() - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn test_unordered_power_bounds_rejected() {
        let p = DieselParams {
            p_min_kw: 390.0,
            ..params()
        };
        assert!(matches!(
            DieselGenerator::new(&p),
            Err(ModelError::Ordering { .. })
        ));
    }

    #[test]
    fn test_fuel_below_minimum_rejected() {
        let p = DieselParams {
            fuel_rate: 0.05,
            ..params()
        };
        assert!(DieselGenerator::new(&p).is_err());
    }

    #[test]
    fn test_zero_tank_rejected() {
        let p = DieselParams {
            tank_l: 0.0,
            ..params()
        };
        assert!(matches!(
            DieselGenerator::new(&p),
            Err(ModelError::OutOfRange { field: "tank_l", .. })
        ));
    }

    #[test]
    fn test_inactive_run_is_idle() {
        let run = generator().run(380.0, 1.0, false);
        assert_eq!(run, DieselRun::default());
    }

    #[test]
    fn test_empty_tank_delivers_nothing() {
        let dg = DieselGenerator::new(&DieselParams {
            fuel_rate: 0.1,
            ..params()
        })
        .unwrap();
        let run = dg.run(380.0, 1.0, true);
        assert_eq!(run.power_kw, 0.0);
        assert_eq!(run.fuel_l_per_h, 0.0);
    }

    #[test]
    fn test_low_request_raised_to_minimum() {
        let run = generator().run(100.0, 1.0, true);
        assert_eq!(run.power_kw, 370.0);
        assert!((run.fuel_l_per_h - (0.25 * 370.0 + 8.0)).abs() < 1e-12);
    }

    #[test]
    fn test_request_within_bounds_is_met() {
        let run = generator().run(390.0, 1.0, true);
        assert_eq!(run.power_kw, 390.0);
    }

    #[test]
    fn test_request_above_rating_gets_nominal() {
        let run = generator().run(500.0, 1.0, true);
        assert_eq!(run.power_kw, 380.0);
    }

    #[test]
    fn test_fuel_limited_request_delivers_nothing() {
        // 50 L available: ceiling (50 - 8) / 0.25 = 168 kW, between p_min 0 and the request
        let dg = DieselGenerator::new(&DieselParams {
            p_min_kw: 0.0,
            fuel_rate: 0.125,
            ..params()
        })
        .unwrap();
        let run = dg.run(300.0, 1.0, true);
        assert_eq!(run.power_kw, 0.0);
    }

    #[test]
    fn test_trial_run_does_not_mutate() {
        let dg = generator();
        let before = dg.clone();
        let _ = dg.run(380.0, 1.0, true);
        assert_eq!(dg, before);
    }

    #[test]
    fn test_commit_burns_fuel_and_counts_runtime() {
        let mut dg = generator();
        let run = dg.run(380.0, 0.5, true);
        dg.commit(&run, 0.5);
        let burnt = (0.25 * 380.0 + 8.0) * 0.5 / 2000.0;
        assert!((dg.fuel_rate() - (1.0 - burnt)).abs() < 1e-12);
        assert_eq!(dg.runtime_h(), 0.5);

        dg.commit(&DieselRun::default(), 0.5);
        assert_eq!(dg.runtime_h(), 0.0);
    }

    #[test]
    fn test_commit_never_goes_below_minimum_fuel() {
        let mut dg = generator();
        let run = DieselRun {
            fuel_l_per_h: 10_000.0,
            power_kw: 380.0,
        };
        dg.commit(&run, 1.0);
        assert_eq!(dg.fuel_rate(), 0.1);
    }

    #[test]
    fn test_stop_resets_runtime() {
        let mut dg = generator();
        let run = dg.run(380.0, 1.0, true);
        dg.commit(&run, 1.0);
        dg.stop();
        assert_eq!(dg.runtime_h(), 0.0);
    }

    #[test]
    fn test_use_cost() {
        let dg = generator();
        let run = dg.run(380.0, 1.0, true);
        let expected = (0.25 * 380.0 + 8.0) * 1.5 / 380.0 + 10_000.0 / 200_000.0 + 0.08;
        assert!((dg.use_cost(&run, 380.0, true) - expected).abs() < 1e-12);
        assert_eq!(dg.use_cost(&run, 380.0, false), f64::INFINITY);
    }

    #[test]
    fn test_use_cost_when_short() {
        let dg = generator();
        let run = dg.run(500.0, 1.0, true);
        assert_eq!(dg.use_cost(&run, 500.0, true), INFEASIBLE_COST);
    }

    #[test]
    fn test_use_cost_is_zero_during_mandatory_run() {
        let mut dg = DieselGenerator::new(&DieselParams {
            minimum_runtime_h: 2.0,
            ..params()
        })
        .unwrap();
        let run = dg.run(380.0, 1.0, true);
        dg.commit(&run, 1.0);
        assert!(dg.in_mandatory_run());
        assert_eq!(dg.use_cost(&run, 380.0, true), 0.0);

        dg.commit(&run, 1.0);
        assert!(!dg.in_mandatory_run());
        assert!(dg.use_cost(&run, 380.0, true) > 0.0);
    }

    #[test]
    fn test_fit_reference_generator() {
        let mut dg = DieselGenerator::new(&DieselParams {
            a: None,
            b: None,
            ..params()
        })
        .unwrap();
        assert!(dg.fit_consumption_curve(
            &FuelConsumptionTable::reference(),
            &REFERENCE_LOAD_FRACTIONS
        ));
        let (a, b) = dg.coefficients();
        assert!((a - 0.24776).abs() < 1e-4);
        assert!((b - 7.5329).abs() < 1e-3);
    }

    #[test]
    fn test_fit_keeps_no_load_ratio_plausible() {
        let table = FuelConsumptionTable::reference();
        for p_nom in [5.0, 20.0, 60.0, 135.0, 230.0, 600.0, 1500.0, 2250.0, 2500.0] {
            let mut dg = DieselGenerator::new(&DieselParams {
                p_max_kw: 1.1 * p_nom,
                p_nom_kw: p_nom,
                p_min_kw: 0.9 * p_nom,
                a: None,
                b: None,
                ..params()
            })
            .unwrap();
            assert!(dg.fit_consumption_curve(&table, &REFERENCE_LOAD_FRACTIONS));
            let (_, b) = dg.coefficients();
            let ratio = b / p_nom;
            assert!((0.01..=0.5).contains(&ratio), "p_nom {p_nom}: B/Pnom = {ratio}");
        }
    }

    #[test]
    fn test_fit_fails_for_huge_generator() {
        let mut dg = DieselGenerator::new(&DieselParams {
            p_max_kw: 3000.0,
            p_nom_kw: 3000.0,
            p_min_kw: 1000.0,
            ..params()
        })
        .unwrap();
        assert!(!dg.fit_consumption_curve(
            &FuelConsumptionTable::reference(),
            &REFERENCE_LOAD_FRACTIONS
        ));
        assert_eq!(dg.coefficients(), (0.25, 8.0));
    }

    #[test]
    fn test_disabled_generator_never_runs() {
        let dg = DieselGenerator::disabled();
        assert_eq!(dg.run(10.0, 1.0, true).power_kw, 0.0);
        assert_eq!(dg.fuel_rate(), 0.0);
    }
}
