//! Post-hoc energy accounting from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Energy totals of a complete run.
///
/// Powers are integrated with the trapezoidal rule over the uniform step, so
/// a run of `n` samples covers `(n - 1) * dt` hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    /// Energy requested by the load (kWh).
    pub load_kwh: f64,
    /// Renewable energy produced (kWh).
    pub green_kwh: f64,
    /// Energy sold to the grid (kWh).
    pub sold_kwh: f64,
    /// Energy bought from the grid (kWh).
    pub bought_kwh: f64,
    /// Requested energy that could not be supplied (kWh).
    pub lack_kwh: f64,
    /// Energy dissipated in the dump load (kWh).
    pub unused_kwh: f64,
    /// Energy supplied by the batteries (kWh).
    pub battery_kwh: f64,
    /// Energy produced by the generator (kWh).
    pub diesel_kwh: f64,
    /// Fuel drawn from the tank between the first and last snapshot (L).
    pub fuel_l: f64,
}

fn trapezoid(results: &[StepResult], dt_hours: f64, f: impl Fn(&StepResult) -> f64) -> f64 {
    results
        .windows(2)
        .map(|w| (f(&w[0]) + f(&w[1])) * 0.5 * dt_hours)
        .sum()
}

impl EnergyReport {
    /// Integrates a run.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `dt_hours` - Timestep duration in hours
    /// * `tank_l` - Generator tank volume, to turn fill fractions into litres
    pub fn from_results(results: &[StepResult], dt_hours: f64, tank_l: f64) -> Self {
        let fuel_l = match (results.first(), results.last()) {
            (Some(first), Some(last)) => (first.fuel_rate - last.fuel_rate) * tank_l,
            _ => 0.0,
        };
        Self {
            load_kwh: trapezoid(results, dt_hours, |r| r.p_load),
            green_kwh: trapezoid(results, dt_hours, |r| r.p_green),
            sold_kwh: trapezoid(results, dt_hours, |r| (-r.p_grid).max(0.0)),
            bought_kwh: trapezoid(results, dt_hours, |r| r.p_grid.max(0.0)),
            lack_kwh: trapezoid(results, dt_hours, |r| (-r.p_diff).max(0.0)),
            unused_kwh: trapezoid(results, dt_hours, |r| r.p_resistor),
            battery_kwh: trapezoid(results, dt_hours, |r| r.p_bat.max(0.0)),
            diesel_kwh: trapezoid(results, dt_hours, |r| r.p_diesel),
            fuel_l,
        }
    }

    /// Share of requested energy that was served (1 when nothing was requested).
    pub fn served_fraction(&self) -> f64 {
        if self.load_kwh > 0.0 {
            1.0 - self.lack_kwh / self.load_kwh
        } else {
            1.0
        }
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Report ---")?;
        writeln!(f, "Load consumption:   {:.3} kWh", self.load_kwh)?;
        writeln!(f, "Renewable prod:     {:.3} kWh", self.green_kwh)?;
        writeln!(f, "Sales:              {:.3} kWh", self.sold_kwh)?;
        writeln!(f, "Purchases:          {:.3} kWh", self.bought_kwh)?;
        writeln!(
            f,
            "Lack:               {:.3} kWh ({:.1}% served)",
            self.lack_kwh,
            self.served_fraction() * 100.0
        )?;
        writeln!(f, "Unused:             {:.3} kWh", self.unused_kwh)?;
        writeln!(f, "Battery supply:     {:.3} kWh", self.battery_kwh)?;
        writeln!(f, "Diesel:             {:.3} kWh", self.diesel_kwh)?;
        write!(f, "Fuel consumed:      {:.3} L", self.fuel_l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::Branch;
    use chrono::NaiveDate;

    fn make_result(p_grid: f64, p_bat: f64, p_diff: f64, fuel_rate: f64) -> StepResult {
        StepResult {
            step: 0,
            time: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            p_load: 10.0,
            p_load_served: 10.0,
            p_green: 4.0,
            p_grid,
            p_bat,
            p_diesel: 0.0,
            p_resistor: 0.0,
            p_diff,
            soc: 0.5,
            battery_socs: vec![0.5],
            fuel_rate,
            diesel_runtime_h: 0.0,
            branch: Branch::GridSupply,
            costs: None,
        }
    }

    #[test]
    fn constant_load_integrates_over_intervals() {
        let results = vec![make_result(0.0, 0.0, 0.0, 1.0); 5];
        let report = EnergyReport::from_results(&results, 0.5, 100.0);
        // 4 intervals of 0.5 h at 10 kW
        assert!((report.load_kwh - 20.0).abs() < 1e-12);
        assert!((report.green_kwh - 8.0).abs() < 1e-12);
    }

    #[test]
    fn grid_flows_split_into_sales_and_purchases() {
        let results: Vec<StepResult> = [4.0, -4.0, 4.0]
            .iter()
            .map(|&g| make_result(g, 0.0, 0.0, 1.0))
            .collect();
        let report = EnergyReport::from_results(&results, 1.0, 100.0);
        assert!((report.bought_kwh - 4.0).abs() < 1e-12);
        assert!((report.sold_kwh - 4.0).abs() < 1e-12);
    }

    #[test]
    fn lack_and_battery_supply() {
        let results: Vec<StepResult> = [(2.0, -3.0), (-2.0, -1.0)]
            .iter()
            .map(|&(b, d)| make_result(0.0, b, d, 1.0))
            .collect();
        let report = EnergyReport::from_results(&results, 1.0, 100.0);
        assert!((report.battery_kwh - 1.0).abs() < 1e-12);
        assert!((report.lack_kwh - 2.0).abs() < 1e-12);
        assert!((report.served_fraction() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn fuel_from_snapshots() {
        let results = vec![
            make_result(0.0, 0.0, 0.0, 0.9),
            make_result(0.0, 0.0, 0.0, 0.7),
        ];
        let report = EnergyReport::from_results(&results, 1.0, 2000.0);
        assert!((report.fuel_l - 400.0).abs() < 1e-9);
    }

    #[test]
    fn empty_results() {
        let report = EnergyReport::from_results(&[], 1.0, 100.0);
        assert_eq!(report.load_kwh, 0.0);
        assert_eq!(report.fuel_l, 0.0);
        assert_eq!(report.served_fraction(), 1.0);
    }

    #[test]
    fn serializes_to_json() {
        let report = EnergyReport::from_results(&[], 1.0, 100.0);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"load_kwh\":0.0"));
    }
}
