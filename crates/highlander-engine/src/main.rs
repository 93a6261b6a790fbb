//! Highlander simulator binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `highlander-config.yaml` (or the path given
//!    as the first argument), falling back to defaults
//! 2. Initialize structured logging (tracing)
//! 3. Build the operator API state
//! 4. Start a run immediately if `simulation.autostart` is set
//! 5. Serve the operator API until `Ctrl-C`
//! 6. Stop the current run and log what happened to its workers

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use highlander_core::HighlanderConfig;
use highlander_core::config::LoggingSection;
use highlander_observer::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "highlander-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the autostarted run
/// is rejected, or the operator API cannot bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        count = config.simulation.count,
        strategy = %config.simulation.strategy,
        initial_health = config.simulation.initial_health,
        damage = config.simulation.damage,
        port = config.server.port,
        "highlander-engine starting"
    );

    // 3. Operator state.
    let state = Arc::new(AppState::new(&config));

    // 4. Optional autostart.
    if config.simulation.autostart {
        let manager = state
            .restart(config.simulation.params())
            .await
            .map_err(EngineError::from)?;
        info!(run_id = %manager.run_id(), "Simulation autostarted");
    }

    // 5. Serve until Ctrl-C.
    let server_config = ServerConfig::from(&config.server);
    start_server(&server_config, Arc::clone(&state), shutdown_signal())
        .await
        .map_err(EngineError::from)?;

    // 6. Stop the current run.
    if let Some(report) = state.shutdown().await {
        if report.stalled > 0 {
            warn!(stalled = report.stalled, "Exiting with stalled workers");
        }
        info!(finished = report.finished.len(), "Simulation stopped on shutdown");
    }

    info!("highlander-engine exiting");
    Ok(())
}

/// Load configuration from the first CLI argument or the default path.
///
/// When no file exists, defaults are used and environment overrides still
/// apply.
fn load_config() -> Result<HighlanderConfig, EngineError> {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(HighlanderConfig::from_file(&path)?)
    } else {
        let mut config = HighlanderConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingSection) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
