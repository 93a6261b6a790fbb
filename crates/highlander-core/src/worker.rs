//! Per-immortal execution loop.
//!
//! ```text
//! Active --pause--> Paused --resume--> Active
//!    |                 |
//!    +------stop-------+----> Stopped
//! ```
//!
//! A worker only observes a stop request at a checkpoint: before waiting
//! on the gate, while parked on it, or after a fight. It never abandons a
//! fight half way. A worker caught in a naive lock cycle never reaches a
//! checkpoint again.

use std::sync::Arc;
use std::time::Duration;

use highlander_types::{FightStrategy, ImmortalName};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, trace};

use crate::fight::{self, FightOutcome};
use crate::gate::PauseGate;
use crate::immortal::Immortal;
use crate::population::Population;
use crate::scoreboard::ScoreBoard;

/// Timing knobs shared by every worker in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPacing {
    /// Cooperative yield after every iteration.
    pub yield_interval: Duration,
    /// Optional sleep between taking the first and the second lock.
    pub lock_handoff: Option<Duration>,
}

impl Default for WorkerPacing {
    fn default() -> Self {
        Self {
            yield_interval: Duration::from_millis(2),
            lock_handoff: None,
        }
    }
}

/// What a worker did before it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    /// The immortal this worker ran.
    pub name: ImmortalName,
    /// Fights this worker landed as attacker.
    pub fights_landed: u64,
    /// Iterations that found no live opponent.
    pub idle_iterations: u64,
}

/// The loop that drives one immortal.
///
/// The strategy is fixed when the worker is built; nothing read at fight
/// time can make the two sides of one fight disagree on lock order.
#[derive(Debug)]
pub struct Worker {
    immortal: Arc<Immortal>,
    population: Arc<Population>,
    gate: Arc<PauseGate>,
    scoreboard: Arc<ScoreBoard>,
    strategy: FightStrategy,
    pacing: WorkerPacing,
    rng: SmallRng,
}

impl Worker {
    /// Bind a worker to its immortal and the shared run state.
    pub fn new(
        immortal: Arc<Immortal>,
        population: Arc<Population>,
        gate: Arc<PauseGate>,
        scoreboard: Arc<ScoreBoard>,
        strategy: FightStrategy,
        pacing: WorkerPacing,
    ) -> Self {
        Self {
            immortal,
            population,
            gate,
            scoreboard,
            strategy,
            pacing,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    /// Run until the immortal is asked to stop.
    pub async fn run(mut self) -> WorkerSummary {
        let mut fights_landed: u64 = 0;
        let mut idle_iterations: u64 = 0;

        while self.immortal.is_running() {
            tokio::select! {
                biased;
                () = self.immortal.stopped() => break,
                () = self.gate.await_if_paused() => {}
            }
            // A stop may have landed while we were parked.
            if !self.immortal.is_running() {
                break;
            }

            match self
                .population
                .sample_opponent(&self.immortal, &mut self.rng)
                .await
            {
                Some(opponent) => {
                    let outcome = fight::fight(
                        self.strategy,
                        &self.immortal,
                        &opponent,
                        &self.scoreboard,
                        self.pacing.lock_handoff,
                    )
                    .await;
                    if outcome == FightOutcome::Landed {
                        fights_landed = fights_landed.saturating_add(1);
                    }
                    trace!(
                        attacker = %self.immortal.name(),
                        defender = %opponent.name(),
                        ?outcome,
                        "fight attempted"
                    );
                }
                None => {
                    idle_iterations = idle_iterations.saturating_add(1);
                }
            }

            tokio::time::sleep(self.pacing.yield_interval).await;
        }

        debug!(
            immortal = %self.immortal.name(),
            fights_landed,
            idle_iterations,
            "worker stopped"
        );
        WorkerSummary {
            name: self.immortal.name().clone(),
            fights_landed,
            idle_iterations,
        }
    }
}
