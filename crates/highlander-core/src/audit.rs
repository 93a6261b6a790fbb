//! Total-health invariant check.
//!
//! Every landed fight removes `damage` from the defender and returns
//! `floor(damage / 2)` to the attacker, a net loss of
//! `damage - floor(damage / 2)`. At any quiescent point:
//!
//! ```text
//! sum(health) == count * initial_health - total_fights * (damage - floor(damage / 2))
//! ```
//!
//! Reads taken while workers are still fighting are not a consistent cut,
//! so the audit compares against a tolerance instead of demanding equality.
//! After a full quiesce the difference is exactly zero.

use serde::{Deserialize, Serialize};

use highlander_types::{ImmortalName, ImmortalSnapshot, InvariantStatus, SimulationParams};

/// How far the observed total may drift from the expected total.
///
/// `tolerance = max(damage * damage_multiplier, count / population_divisor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TolerancePolicy {
    /// Multiplier applied to the per-hit damage.
    pub damage_multiplier: i64,
    /// Divisor applied to the initial population size.
    pub population_divisor: i64,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            damage_multiplier: 2,
            population_divisor: 10,
        }
    }
}

impl TolerancePolicy {
    /// Allowed absolute difference for a run with `params`.
    pub fn tolerance(&self, params: &SimulationParams) -> i64 {
        let by_damage = params.damage.saturating_mul(self.damage_multiplier);
        let count = i64::try_from(params.count).unwrap_or(i64::MAX);
        let by_population = count.checked_div(self.population_divisor).unwrap_or(0);
        by_damage.max(by_population)
    }
}

/// An immortal whose health went further below zero than one hit allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overshoot {
    /// The immortal's name.
    pub name: ImmortalName,
    /// Its observed health.
    pub health: i64,
}

/// Result of auditing a population snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthAudit {
    /// Members in the snapshot.
    pub population_size: usize,
    /// Members with `health > 0` that are still running.
    pub alive: usize,
    /// Members with `health < 0`.
    pub negative_health: usize,
    /// Members with `health < -(damage - 1)`.
    pub overshoots: Vec<Overshoot>,
    /// Fights recorded on the scoreboard.
    pub total_fights: u64,
    /// Sum of observed health.
    pub current_total: i64,
    /// `count * initial_health`.
    pub initial_total: i64,
    /// `initial_total - total_fights * (damage - floor(damage / 2))`.
    pub expected_total: i64,
    /// `current_total - expected_total`.
    pub difference: i64,
    /// Allowed absolute difference.
    pub tolerance: i64,
    /// `Ok` when `|difference| <= tolerance`.
    pub status: InvariantStatus,
}

impl HealthAudit {
    /// Whether the invariant held within tolerance.
    pub const fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Audit `snapshot` against the totals implied by `params` and `total_fights`.
pub fn audit_population(
    params: &SimulationParams,
    snapshot: &[ImmortalSnapshot],
    total_fights: u64,
    policy: &TolerancePolicy,
) -> HealthAudit {
    let overshoot_floor = params.damage.saturating_sub(1).saturating_neg();

    let mut current_total: i64 = 0;
    let mut alive = 0_usize;
    let mut negative_health = 0_usize;
    let mut overshoots = Vec::new();
    for entry in snapshot {
        current_total = current_total.saturating_add(entry.health);
        if entry.alive {
            alive = alive.saturating_add(1);
        }
        if entry.health < 0 {
            negative_health = negative_health.saturating_add(1);
        }
        if entry.health < overshoot_floor {
            overshoots.push(Overshoot {
                name: entry.name.clone(),
                health: entry.health,
            });
        }
    }

    let initial_total = params.initial_total_health();
    let fights = i64::try_from(total_fights).unwrap_or(i64::MAX);
    let expected_total =
        initial_total.saturating_sub(fights.saturating_mul(params.net_loss_per_fight()));
    let difference = current_total.saturating_sub(expected_total);
    let tolerance = policy.tolerance(params);

    let status = if difference.saturating_abs() <= tolerance {
        InvariantStatus::Ok
    } else {
        InvariantStatus::Violated
    };

    HealthAudit {
        population_size: snapshot.len(),
        alive,
        negative_health,
        overshoots,
        total_fights,
        current_total,
        initial_total,
        expected_total,
        difference,
        tolerance,
        status,
    }
}
