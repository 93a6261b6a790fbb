//! Shared application state for the operator API.
//!
//! [`AppState`] owns the current [`SimulationManager`] (if any) together
//! with the configuration the handlers need: default start parameters,
//! worker pacing, operator timeouts, and the invariant tolerance.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use highlander_core::config::OperatorSection;
use highlander_core::{
    HighlanderConfig, ManagerError, SimulationManager, StopReport, TolerancePolicy, WorkerPacing,
};
use highlander_types::SimulationParams;

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    simulation: RwLock<Option<Arc<SimulationManager>>>,
    /// Parameters used for any field a start request leaves out.
    pub defaults: SimulationParams,
    /// Pacing for every worker started through the API.
    pub pacing: WorkerPacing,
    /// Settle, stop, and report timeouts.
    pub operator: OperatorSection,
    /// Tolerance applied by check and report.
    pub tolerance: TolerancePolicy,
}

impl AppState {
    /// Build state from loaded configuration. No simulation is running.
    pub fn new(config: &HighlanderConfig) -> Self {
        Self {
            simulation: RwLock::new(None),
            defaults: config.simulation.params(),
            pacing: config.worker.pacing(),
            operator: config.operator.clone(),
            tolerance: config.audit.policy(),
        }
    }

    /// The current run, stopped or not.
    pub async fn current(&self) -> Option<Arc<SimulationManager>> {
        self.simulation.read().await.clone()
    }

    /// Stop any previous run and start a new one with `params`.
    ///
    /// The slot stays write-locked for the whole swap, so concurrent
    /// starts are serialized.
    ///
    /// # Errors
    ///
    /// Propagates [`ManagerError`] from [`SimulationManager::start`]. The
    /// previous run is stopped even when the new one fails to start.
    pub async fn restart(
        &self,
        params: SimulationParams,
    ) -> Result<Arc<SimulationManager>, ManagerError> {
        let mut slot = self.simulation.write().await;
        if let Some(previous) = slot.take() {
            let report = previous.stop(self.operator.stop_grace()).await;
            info!(
                run_id = %previous.run_id(),
                stalled = report.stalled,
                "Previous simulation replaced"
            );
        }
        let manager = Arc::new(SimulationManager::start(params, self.pacing)?);
        *slot = Some(Arc::clone(&manager));
        Ok(manager)
    }

    /// Stop the current run, if any. Used on process shutdown.
    pub async fn shutdown(&self) -> Option<StopReport> {
        let current = self.current().await?;
        Some(current.stop(self.operator.stop_grace()).await)
    }
}
