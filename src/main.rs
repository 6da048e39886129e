//! Microgrid dispatch simulator entry point: CLI wiring and scenario execution.

use std::path::{Path, PathBuf};
use std::process;

use microgrid_dispatch::config::{ScenarioConfig, Strategy};
use microgrid_dispatch::io::export::{export_csv, export_report_json};
use microgrid_dispatch::logging::init_tracing;
use microgrid_dispatch::runner::{RunError, run_scenario};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    input: Option<String>,
    strategy: Option<Strategy>,
    telemetry_out: Option<String>,
    report_json: Option<String>,
}

fn print_help() {
    eprintln!("microgrid-dispatch: step-by-step microgrid dispatch simulator");
    eprintln!();
    eprintln!("Usage: microgrid-dispatch [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --input <path>           Read load/production series from CSV");
    eprintln!(
        "  --strategy <name>        Override the dispatch policy ({})",
        Strategy::NAMES.join(", ")
    );
    eprintln!("  --telemetry-out <path>   Export step results to CSV");
    eprintln!("  --report-json <path>     Export the energy report to JSON");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following flag `args[*i]`, advancing `i`.
fn flag_value(args: &[String], i: &mut usize, what: &str) -> String {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {what} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        input: None,
        strategy: None,
        telemetry_out: None,
        report_json: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(flag_value(&args, &mut i, "path")),
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "name")),
            "--input" => cli.input = Some(flag_value(&args, &mut i, "path")),
            "--strategy" => {
                let name = flag_value(&args, &mut i, "name");
                match name.parse::<Strategy>() {
                    Ok(s) => cli.strategy = Some(s),
                    Err(e) => {
                        eprintln!("error: {}", e.message);
                        process::exit(1);
                    }
                }
            }
            "--telemetry-out" => cli.telemetry_out = Some(flag_value(&args, &mut i, "path")),
            "--report-json" => cli.report_json = Some(flag_value(&args, &mut i, "path")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn main() {
    init_tracing();
    let cli = parse_args();

    // Load config: --scenario, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(path) = cli.input {
        scenario.input.csv = Some(PathBuf::from(path));
    }
    if let Some(strategy) = cli.strategy {
        scenario.simulation.strategy = strategy;
    }

    let output = match run_scenario(&scenario) {
        Ok(out) => out,
        Err(RunError::Config(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for r in &output.results {
        println!("{r}");
    }
    println!(
        "\nStrategy: {} (devices {})",
        output.strategy,
        scenario.devices.tag()
    );
    println!("{}", output.report);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&output.results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }

    if let Some(ref path) = cli.report_json {
        if let Err(e) = export_report_json(&output.report, Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        eprintln!("Energy report written to {path}");
    }
}
