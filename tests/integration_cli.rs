//! End-to-end runs of the binary.

mod common;

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_microgrid-dispatch"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(args)
        .output()
        .expect("microgrid-dispatch process should run")
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("microgrid-dispatch-{}-{name}", std::process::id()))
}

#[test]
fn scenario_run_writes_csv_and_json() {
    let csv_path = temp_path("steps.csv");
    let json_path = temp_path("report.json");
    let output = run(&[
        "--scenario",
        "scenarios/cost_lookahead.toml",
        "--telemetry-out",
        csv_path.to_str().unwrap(),
        "--report-json",
        json_path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--- Energy Report ---"));
    assert!(stdout.contains("Strategy: cost"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 49);
    assert!(csv.lines().next().unwrap().ends_with("diesel_use_cost"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert!(json["load_kwh"].as_f64().unwrap() > 0.0);

    let _ = std::fs::remove_file(csv_path);
    let _ = std::fs::remove_file(json_path);
}

#[test]
fn preset_and_strategy_override() {
    let input = common::data_path("day_series.csv");
    let output = run(&[
        "--preset",
        "islanded",
        "--strategy",
        "cce",
        "--input",
        input.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Strategy: cycle_charging (devices -BD)"));
}

#[test]
fn unknown_preset_fails() {
    let output = run(&["--preset", "nonexistent"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown preset"));
}

#[test]
fn unknown_strategy_fails() {
    let output = run(&["--strategy", "greedy"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown strategy"));
}

#[test]
fn invalid_scenario_lists_errors() {
    let path = temp_path("bad.toml");
    std::fs::write(
        &path,
        "[simulation]\nsoc_lim = 3.0\nlookahead = true\nlookahead_h = -1.0\n",
    )
    .unwrap();
    let output = run(&["--scenario", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("simulation.soc_lim"));
    assert!(stderr.contains("simulation.lookahead_h"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_flag_value_fails() {
    let output = run(&["--telemetry-out"]);
    assert!(!output.status.success());
}
