//! Entry point: one full rendering pass against the hydromet platform.
//!
//! Usage:
//!   acuimon_service [config.toml]
//!
//! Exits 0 when the run completed (even with per-unit failures — those
//! are listed in the manifest), 1 on a fatal run-level failure.

use std::path::Path;
use std::process::ExitCode;

use acuimon_service::config::Config;
use acuimon_service::ingest::HttpDataService;
use acuimon_service::logging::{self, DataSource, LogLevel};
use acuimon_service::pipeline::{Pipeline, RunManifest, UnitStatus};
use acuimon_service::render::ChartRenderer;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "acuimon.toml".to_string());
    let config = match Config::load(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(LogLevel::Info, Some("acuimon.log"));
    logging::info(
        DataSource::System,
        None,
        &format!("Starting run against {}", config.api.base_url),
    );

    let data = match HttpDataService::new(&config.api.base_url, config.timeout()) {
        Ok(data) => data,
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let sink = match ChartRenderer::new(&config.output.dir) {
        Ok(sink) => sink,
        Err(e) => {
            logging::error(
                DataSource::System,
                None,
                &format!("Cannot prepare output directory '{}': {}", config.output.dir, e),
            );
            return ExitCode::FAILURE;
        }
    };

    let pipeline = Pipeline::new(&data, &sink, config.wells.featured.clone());
    match pipeline.run() {
        Ok(manifest) => {
            print_manifest(&manifest);
            logging::log_run_summary(
                manifest.outcomes.len(),
                manifest.successes(),
                manifest.failures(),
                manifest.artifact_count(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            eprintln!("\n✗ Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_manifest(manifest: &RunManifest) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("Run manifest");
    println!("═══════════════════════════════════════════════════════════");

    for outcome in &manifest.outcomes {
        match &outcome.status {
            UnitStatus::Success { artifacts } => {
                println!(
                    "  ✓ {:<12} {:<30} {} artifact(s)",
                    outcome.kind.to_string(),
                    outcome.unit_id,
                    artifacts.len()
                );
            }
            UnitStatus::Failed { failure, detail } => {
                println!(
                    "  ✗ {:<12} {:<30} {} failure: {}",
                    outcome.kind.to_string(),
                    outcome.unit_id,
                    failure,
                    detail
                );
            }
        }
    }

    println!("═══════════════════════════════════════════════════════════");
    println!(
        "Summary: {}/{} units successful, {} failed, {} artifacts",
        manifest.successes(),
        manifest.outcomes.len(),
        manifest.failures(),
        manifest.artifact_count()
    );
    println!("═══════════════════════════════════════════════════════════\n");
}
