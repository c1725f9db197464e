//! Command-line runner for semisim scenarios.
//!
//! Wires configuration, the scenario file, the standard semiconductor
//! module list, and result export into a single run.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `semisim.yaml` (defaults if absent) and apply
//!    environment overrides; the first CLI argument, if any, names the
//!    scenario
//! 2. Initialize structured logging (tracing)
//! 3. Write the built-in test scenario if the scenario file is missing
//! 4. Load the scenario and register the standard modules
//! 5. Initialize modules and run every year
//! 6. Export yearly results and trajectories
//! 7. Log a run summary

mod bootstrap;
mod error;
mod export;

use std::path::Path;

use chrono::Utc;
use semisim_core::{EngineConfig, LoggingConfig, ScenarioDocument, SimulationManager};
use semisim_types::SimulationResults;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "semisim.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, scenario loading, the simulation, or
/// result export fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let mut config = load_config(Path::new(CONFIG_FILE))?;
    if let Some(scenario) = std::env::args().nth(1) {
        config.run.scenario = scenario;
    }

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        scenario = config.run.scenario,
        scenarios_dir = %config.run.scenarios_dir.display(),
        results_dir = %config.run.results_dir.display(),
        export_format = config.run.export_format.extension(),
        "semisim-engine starting"
    );

    run(&config)?;
    Ok(())
}

/// Bootstrap, load, run, and export the configured scenario.
fn run(config: &EngineConfig) -> Result<(), EngineError> {
    // 3. Make sure the scenario file exists.
    let scenario_path = config.scenario_path();
    bootstrap::ensure_scenario(&scenario_path, config.run.bootstrap_missing_scenario)?;

    // 4-5. Load, initialize, run.
    let doc = ScenarioDocument::from_file(&scenario_path)?;
    let mut manager =
        SimulationManager::new(config.run.scenario.clone(), semisim_modules::standard_modules());
    let report = manager.load_scenario(&doc)?;
    if !report.is_clean() {
        warn!(
            skipped = report.diagnostics.len(),
            "Scenario loaded with diagnostics, affected records were skipped"
        );
    }
    manager.initialize_modules()?;
    info!(modules = ?manager.module_ids(), "Modules initialized");
    manager.run()?;

    // 6. Export.
    let results = manager.results();
    let trajectories = manager.trajectories();
    export::write_all(
        &config.run.results_dir,
        manager.scenario_name(),
        config.run.export_format,
        Utc::now(),
        results,
        &trajectories,
    )?;

    // 7. Summary.
    log_summary(results);
    info!(phase = %manager.phase(), "semisim-engine finished");
    Ok(())
}

/// Load `semisim.yaml` if present, otherwise defaults. Environment
/// overrides apply in both cases.
fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log one line per simulated year with the record count of each category.
fn log_summary(results: &SimulationResults) {
    for (year, snapshot) in results {
        let counts: Vec<String> = snapshot
            .iter()
            .map(|(category, records)| format!("{category}={}", records.len()))
            .collect();
        info!(year, entities = counts.join(" "), "Year summary");
    }
    info!(years = results.len(), "Simulation complete");
}
