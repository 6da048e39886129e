//! CSV export of step results and JSON export of the energy report.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::kpi::EnergyReport;
use crate::sim::types::StepResult;

/// Columns written for every run.
const HEADER: &str = "time,p_load,p_load_served,p_green,p_grid,p_bat,p_diesel,\
                      p_resistor,soc,fuel_rate,diesel_runtime_h,branch";

/// Extra columns written when the results carry cost signals.
const COST_HEADER: &str = "grid_sale_cost,grid_purchase_cost,battery_charge_cost,\
                           battery_discharge_cost,diesel_use_cost";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exports simulation results to a CSV file at the given path.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// Cost columns are appended when any row carries cost signals; an infinite
/// cost is written as `inf`. Output is deterministic for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let with_costs = results.iter().any(|r| r.costs.is_some());
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<&str> = HEADER.split(',').map(str::trim).collect();
    if with_costs {
        header.extend(COST_HEADER.split(',').map(str::trim));
    }
    wtr.write_record(&header)?;

    for r in results {
        let mut row = vec![
            r.time.format(TIME_FORMAT).to_string(),
            format!("{:.4}", r.p_load),
            format!("{:.4}", r.p_load_served),
            format!("{:.4}", r.p_green),
            format!("{:.4}", r.p_grid),
            format!("{:.4}", r.p_bat),
            format!("{:.4}", r.p_diesel),
            format!("{:.4}", r.p_resistor),
            format!("{:.6}", r.soc),
            format!("{:.6}", r.fuel_rate),
            format!("{:.4}", r.diesel_runtime_h),
            r.branch.as_str().to_string(),
        ];
        if with_costs {
            match &r.costs {
                Some(c) => row.extend(
                    [
                        c.grid_sale,
                        c.grid_purchase,
                        c.battery_charge,
                        c.battery_discharge,
                        c.diesel_use,
                    ]
                    .iter()
                    .map(|v| format!("{v:.6}")),
                ),
                None => row.extend(std::iter::repeat_n(String::new(), 5)),
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the energy report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_report_json(report: &EnergyReport, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()
}

/// Exports the energy report to a JSON file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_report_json(report: &EnergyReport, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_report_json(report, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::{Branch, CostSignals};
    use chrono::{Duration, NaiveDate};

    fn make_step(t: usize, costs: Option<CostSignals>) -> StepResult {
        StepResult {
            step: t,
            time: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::minutes(15 * t as i64),
            p_load: 100.0,
            p_load_served: 100.0,
            p_green: 40.0,
            p_grid: 60.0,
            p_bat: 0.0,
            p_diesel: 0.0,
            p_resistor: 0.0,
            p_diff: 0.0,
            soc: 0.5,
            battery_socs: vec![0.5],
            fuel_rate: 1.0,
            diesel_runtime_h: 0.0,
            branch: Branch::GridSupply,
            costs,
        }
    }

    fn costs() -> CostSignals {
        CostSignals {
            grid_sale: 0.07,
            grid_purchase: 0.18,
            battery_charge: 0.27,
            battery_discharge: 0.47,
            diesel_use: f64::INFINITY,
        }
    }

    fn to_string(results: &[StepResult]) -> String {
        let mut buf = Vec::new();
        write_csv(results, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_without_costs() {
        let out = to_string(&[make_step(0, None)]);
        assert_eq!(
            out.lines().next(),
            Some(
                "time,p_load,p_load_served,p_green,p_grid,p_bat,p_diesel,\
                 p_resistor,soc,fuel_rate,diesel_runtime_h,branch"
            )
        );
    }

    #[test]
    fn cost_columns_appended() {
        let out = to_string(&[make_step(0, Some(costs()))]);
        let mut lines = out.lines();
        let header = lines.next().unwrap();
        assert!(header.ends_with(
            "branch,grid_sale_cost,grid_purchase_cost,battery_charge_cost,\
             battery_discharge_cost,diesel_use_cost"
        ));
        let row = lines.next().unwrap();
        assert!(row.starts_with("2025-01-01 00:00:00,100.0000,"));
        assert!(row.contains(",grid_supply,"));
        assert!(row.ends_with(",inf"));
    }

    #[test]
    fn row_count_matches_step_count() {
        let results: Vec<StepResult> = (0..24).map(|t| make_step(t, None)).collect();
        // 1 header + 24 data rows
        assert_eq!(to_string(&results).lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(|t| make_step(t, Some(costs()))).collect();
        assert_eq!(to_string(&results), to_string(&results));
    }

    #[test]
    fn parseable_by_csv_reader() {
        let results: Vec<StepResult> = (0..3).map(|t| make_step(t, Some(costs()))).collect();
        let out = to_string(&results);
        let mut rdr = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        assert_eq!(rdr.headers().unwrap().len(), 17);
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            for i in 1..11 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse");
            }
            let diesel: f64 = rec[16].parse().unwrap();
            assert!(diesel.is_infinite());
            rows += 1;
        }
        assert_eq!(rows, 3);
    }

    #[test]
    fn report_json_has_all_totals() {
        let results: Vec<StepResult> = (0..3).map(|t| make_step(t, None)).collect();
        let report = EnergyReport::from_results(&results, 0.25, 2000.0);
        let mut buf = Vec::new();
        write_report_json(&report, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["load_kwh"], 50.0);
        assert_eq!(value["bought_kwh"], 30.0);
        assert_eq!(value["fuel_l"], 0.0);
    }
}
