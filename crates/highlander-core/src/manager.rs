//! Simulation lifecycle orchestration.
//!
//! [`SimulationManager::start`] builds the population, scoreboard, and pause
//! gate, then spawns one worker task per immortal. Every other operation
//! either flips the gate or reads shared state. Reads of health are meant
//! to happen after [`pause`](SimulationManager::pause) and
//! [`quiesce`](SimulationManager::quiesce); nothing enforces that.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use highlander_types::{
    ImmortalName, ImmortalSnapshot, RunId, SimulationParams, SimulationStatus,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gate::PauseGate;
use crate::immortal::Immortal;
use crate::population::Population;
use crate::scoreboard::ScoreBoard;
use crate::worker::{Worker, WorkerPacing, WorkerSummary};

/// Minimum population for a run.
pub const MIN_IMMORTALS: usize = 2;

/// Poll interval used while waiting for workers to park.
const QUIESCE_POLL: Duration = Duration::from_millis(1);

/// Errors surfaced by [`SimulationManager::start`].
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The start parameters are out of range.
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    /// No Tokio runtime is available to host the worker tasks.
    #[error("no async runtime available to spawn workers: {0}")]
    NoRuntime(String),
}

/// Result of [`SimulationManager::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Whether this call performed the stop (`false` if already stopped).
    pub first_stop: bool,
    /// Summaries of workers that exited within the grace period.
    pub finished: Vec<WorkerSummary>,
    /// Workers that did not return in time and were left detached.
    pub stalled: usize,
}

/// Owns one simulation run.
#[derive(Debug)]
pub struct SimulationManager {
    run_id: RunId,
    params: SimulationParams,
    population: Arc<Population>,
    gate: Arc<PauseGate>,
    scoreboard: Arc<ScoreBoard>,
    roster: Vec<Arc<Immortal>>,
    workers: Mutex<Vec<JoinHandle<WorkerSummary>>>,
    stopped: AtomicBool,
    started_at: DateTime<Utc>,
}

impl SimulationManager {
    /// Build the population and spawn one worker per immortal.
    ///
    /// Must be called from within a Tokio runtime; use a multi-threaded
    /// runtime so workers actually run in parallel.
    ///
    /// # Errors
    ///
    /// [`ManagerError::InvalidParams`] when `count < 2`, or health or
    /// damage is not positive. [`ManagerError::NoRuntime`] outside a
    /// runtime.
    pub fn start(params: SimulationParams, pacing: WorkerPacing) -> Result<Self, ManagerError> {
        validate(&params)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ManagerError::NoRuntime(e.to_string()))?;

        let run_id = RunId::new();
        let roster: Vec<Arc<Immortal>> = (0..params.count)
            .map(|i| {
                Arc::new(Immortal::new(
                    ImmortalName::numbered(i, params.count),
                    params.initial_health,
                    params.damage,
                ))
            })
            .collect();

        let population = Arc::new(Population::new(roster.clone()));
        let gate = Arc::new(PauseGate::new());
        let scoreboard = Arc::new(ScoreBoard::new());

        let workers = roster
            .iter()
            .map(|immortal| {
                let worker = Worker::new(
                    Arc::clone(immortal),
                    Arc::clone(&population),
                    Arc::clone(&gate),
                    Arc::clone(&scoreboard),
                    params.strategy,
                    pacing,
                );
                runtime.spawn(worker.run())
            })
            .collect();

        info!(
            %run_id,
            count = params.count,
            strategy = %params.strategy,
            initial_health = params.initial_health,
            damage = params.damage,
            yield_ms = u64::try_from(pacing.yield_interval.as_millis()).unwrap_or(u64::MAX),
            lock_handoff = ?pacing.lock_handoff,
            "Simulation started"
        );

        Ok(Self {
            run_id,
            params,
            population,
            gate,
            scoreboard,
            roster,
            workers: Mutex::new(workers),
            stopped: AtomicBool::new(false),
            started_at: Utc::now(),
        })
    }

    /// Identifier of this run.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Parameters the run was started with.
    pub const fn params(&self) -> &SimulationParams {
        &self.params
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Close the pause gate. Idempotent.
    pub fn pause(&self) {
        if self.gate.pause() {
            info!(run_id = %self.run_id, "Simulation paused");
        }
    }

    /// Open the pause gate and release every parked worker. Idempotent.
    pub fn resume(&self) {
        if self.gate.resume() {
            info!(run_id = %self.run_id, "Simulation resumed");
        }
    }

    /// Whether the pause gate is closed.
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Wait until every live worker is parked on the gate.
    ///
    /// Call after [`pause`](Self::pause). Returns `true` once all workers
    /// still running are parked, `false` if `timeout` elapsed first or
    /// the gate is open. A timeout under the naive strategy usually means
    /// some workers are stuck in a lock cycle.
    pub async fn quiesce(&self, timeout: Duration) -> bool {
        if !self.gate.is_paused() {
            return false;
        }
        let settled = tokio::time::timeout(timeout, async {
            loop {
                let active = self.active_workers().await;
                if self.gate.parked() >= active {
                    return;
                }
                tokio::time::sleep(QUIESCE_POLL).await;
            }
        })
        .await
        .is_ok();

        if !settled {
            let active = self.active_workers().await;
            warn!(
                run_id = %self.run_id,
                parked = self.gate.parked(),
                active,
                "Workers did not settle after pause"
            );
        }
        settled
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask every worker to stop and wait up to `grace` for each to return.
    ///
    /// Safe to call more than once; later calls return an empty report.
    /// Workers that do not return in time are detached, not aborted.
    pub async fn stop(&self, grace: Duration) -> StopReport {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return StopReport::default();
        }

        for immortal in &self.roster {
            immortal.request_stop();
        }

        let handles = std::mem::take(&mut *self.workers.lock().await);
        let results = join_all(
            handles
                .into_iter()
                .map(|handle| tokio::time::timeout(grace, handle)),
        )
        .await;

        let mut report = StopReport {
            first_stop: true,
            ..StopReport::default()
        };
        for result in results {
            match result {
                Ok(Ok(summary)) => report.finished.push(summary),
                Ok(Err(e)) => {
                    warn!(run_id = %self.run_id, error = %e, "Worker task failed");
                    report.stalled = report.stalled.saturating_add(1);
                }
                Err(_) => report.stalled = report.stalled.saturating_add(1),
            }
        }

        if report.stalled > 0 {
            warn!(
                run_id = %self.run_id,
                stalled = report.stalled,
                "Workers did not stop within grace period; likely blocked in a lock cycle"
            );
        }
        info!(
            run_id = %self.run_id,
            finished = report.finished.len(),
            stalled = report.stalled,
            total_fights = self.scoreboard.total_fights(),
            "Simulation stopped"
        );
        report
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// `(name, health)` of every member, in population order.
    pub async fn population_snapshot(&self) -> Vec<ImmortalSnapshot> {
        let members = self.population.snapshot().await;
        let mut snapshots = Vec::with_capacity(members.len());
        for member in members {
            snapshots.push(member.snapshot().await);
        }
        snapshots
    }

    /// Current population size.
    pub async fn population_size(&self) -> usize {
        self.population.size().await
    }

    /// Members currently alive.
    pub async fn alive_count(&self) -> usize {
        self.population.alive_count().await
    }

    /// Fights completed so far.
    pub fn score_board_total(&self) -> u64 {
        self.scoreboard.total_fights()
    }

    /// Remove dead immortals and retire their workers.
    ///
    /// Pause and quiesce first. Returns the number removed.
    pub async fn remove_dead_immortals(&self) -> usize {
        if !self.gate.is_paused() {
            warn!(run_id = %self.run_id, "remove_dead called while running");
        }
        let removed = self.population.remove_dead().await;
        info!(run_id = %self.run_id, removed = removed.len(), "Dead immortals removed");
        removed.len()
    }

    /// Workers whose task has not returned.
    pub async fn active_workers(&self) -> usize {
        self.workers
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Operator-facing status.
    pub async fn status(&self) -> SimulationStatus {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        SimulationStatus {
            run_id: self.run_id,
            params: self.params,
            paused: self.gate.is_paused(),
            stopped: self.is_stopped(),
            population_size: self.population.size().await,
            alive: self.population.alive_count().await,
            total_fights: self.scoreboard.total_fights(),
            parked_workers: self.gate.parked(),
            active_workers: self.active_workers().await,
            started_at: self.started_at,
            elapsed_seconds: u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX),
        }
    }
}

impl Drop for SimulationManager {
    fn drop(&mut self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!(run_id = %self.run_id, "Manager dropped without stop; signalling workers");
            for immortal in &self.roster {
                immortal.request_stop();
            }
        }
    }
}

fn validate(params: &SimulationParams) -> Result<(), ManagerError> {
    if params.count < MIN_IMMORTALS {
        return Err(ManagerError::InvalidParams(format!(
            "count must be at least {MIN_IMMORTALS}, got {}",
            params.count
        )));
    }
    if params.initial_health <= 0 {
        return Err(ManagerError::InvalidParams(format!(
            "initial_health must be positive, got {}",
            params.initial_health
        )));
    }
    if params.damage <= 0 {
        return Err(ManagerError::InvalidParams(format!(
            "damage must be positive, got {}",
            params.damage
        )));
    }
    Ok(())
}
