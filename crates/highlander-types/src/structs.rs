//! Core data structures exchanged between the engine and the operator API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::FightStrategy;
use crate::ids::{ImmortalName, RunId};

/// A point-in-time view of one immortal.
///
/// Health is read under the immortal's own lock, so a snapshot never
/// shows a value torn mid-fight. A population snapshot taken while the
/// simulation is running is still not a consistent cut across immortals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmortalSnapshot {
    /// The immortal's name.
    pub name: ImmortalName,
    /// Health at the time of the snapshot.
    pub health: i64,
    /// Damage dealt per landed hit.
    pub damage: i64,
    /// `health > 0` and the immortal's worker has not been asked to stop.
    pub alive: bool,
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Number of immortals (at least 2).
    pub count: usize,
    /// Lock-acquisition strategy every worker uses.
    pub strategy: FightStrategy,
    /// Starting health of every immortal (positive).
    pub initial_health: i64,
    /// Damage per landed hit (positive).
    pub damage: i64,
}

impl SimulationParams {
    /// Sum of every immortal's starting health.
    pub fn initial_total_health(&self) -> i64 {
        i64::try_from(self.count)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.initial_health)
    }

    /// Health the attacker regains per landed hit: `floor(damage / 2)`.
    pub const fn heal_per_fight(&self) -> i64 {
        self.damage / 2
    }

    /// Drop in total health per landed hit: `damage - floor(damage / 2)`.
    ///
    /// Equals the heal only for even damage; odd damage loses one more.
    pub const fn net_loss_per_fight(&self) -> i64 {
        self.damage.saturating_sub(self.heal_per_fight())
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            count: 8,
            strategy: FightStrategy::Ordered,
            initial_health: 100,
            damage: 10,
        }
    }
}

/// JSON-serializable status of the running simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Parameters the run was started with.
    pub params: SimulationParams,
    /// Whether the pause gate is closed.
    pub paused: bool,
    /// Whether `stop` has been called.
    pub stopped: bool,
    /// Current population size.
    pub population_size: usize,
    /// Immortals currently alive.
    pub alive: usize,
    /// Fights completed so far.
    pub total_fights: u64,
    /// Workers currently suspended on the pause gate.
    pub parked_workers: usize,
    /// Workers whose task has not returned yet.
    pub active_workers: usize,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Seconds elapsed since start.
    pub elapsed_seconds: u64,
}
