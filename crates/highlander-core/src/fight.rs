//! Pairwise fight protocol.
//!
//! Both strategies apply the same rule once both health locks are held:
//!
//! 1. If either combatant has `health <= 0`, skip.
//! 2. If the defender has less health than the attacker's damage, skip.
//! 3. Otherwise the defender loses `damage`, the attacker regains
//!    `damage / 2`, and the scoreboard records one fight.
//!
//! They differ only in lock order:
//!
//! - [`FightStrategy::Ordered`] locks the combatant with the smaller name
//!   first. Every fight in the system takes locks in the same global order,
//!   so no cycle of waiters can form.
//! - [`FightStrategy::Naive`] locks the attacker first. Two immortals that
//!   attack each other at the same time each hold their own lock and wait
//!   for the other's. That cycle never resolves; it is kept on purpose.

use std::time::Duration;

use highlander_types::FightStrategy;
use tracing::trace;

use crate::immortal::Immortal;
use crate::scoreboard::ScoreBoard;

/// Why a fight was skipped without changing any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The attacker or the defender has no health left.
    CombatantDown,
    /// The hit would take the defender below zero.
    WouldOverkill,
    /// Attacker and defender are the same immortal.
    SelfTarget,
}

/// Result of one fight attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FightOutcome {
    /// Damage and healing were applied and the fight was counted.
    Landed,
    /// Nothing changed.
    Skipped(SkipReason),
}

impl FightOutcome {
    /// Whether the fight was counted.
    pub const fn landed(self) -> bool {
        matches!(self, Self::Landed)
    }
}

/// Run one fight between `attacker` and `defender` using `strategy`.
///
/// `lock_handoff`, when set, sleeps between taking the first and the
/// second lock. The acquisition order is unchanged.
pub async fn fight(
    strategy: FightStrategy,
    attacker: &Immortal,
    defender: &Immortal,
    scoreboard: &ScoreBoard,
    lock_handoff: Option<Duration>,
) -> FightOutcome {
    if std::ptr::eq(attacker, defender) {
        // The health mutex is not reentrant.
        return FightOutcome::Skipped(SkipReason::SelfTarget);
    }

    match strategy {
        FightStrategy::Ordered => fight_ordered(attacker, defender, scoreboard, lock_handoff).await,
        FightStrategy::Naive => fight_naive(attacker, defender, scoreboard, lock_handoff).await,
    }
}

async fn fight_naive(
    attacker: &Immortal,
    defender: &Immortal,
    scoreboard: &ScoreBoard,
    lock_handoff: Option<Duration>,
) -> FightOutcome {
    let mut attacker_hp = attacker.lock_health().await;
    handoff(lock_handoff).await;
    let mut defender_hp = defender.lock_health().await;

    apply_rule(&mut attacker_hp, &mut defender_hp, attacker.damage(), scoreboard)
}

async fn fight_ordered(
    attacker: &Immortal,
    defender: &Immortal,
    scoreboard: &ScoreBoard,
    lock_handoff: Option<Duration>,
) -> FightOutcome {
    if attacker.name() < defender.name() {
        let mut attacker_hp = attacker.lock_health().await;
        handoff(lock_handoff).await;
        let mut defender_hp = defender.lock_health().await;
        apply_rule(&mut attacker_hp, &mut defender_hp, attacker.damage(), scoreboard)
    } else {
        let mut defender_hp = defender.lock_health().await;
        handoff(lock_handoff).await;
        let mut attacker_hp = attacker.lock_health().await;
        apply_rule(&mut attacker_hp, &mut defender_hp, attacker.damage(), scoreboard)
    }
}

async fn handoff(lock_handoff: Option<Duration>) {
    if let Some(delay) = lock_handoff {
        tokio::time::sleep(delay).await;
    }
}

/// Apply the fight rule to two locked health values.
fn apply_rule(
    attacker_hp: &mut i64,
    defender_hp: &mut i64,
    damage: i64,
    scoreboard: &ScoreBoard,
) -> FightOutcome {
    if *attacker_hp <= 0 || *defender_hp <= 0 {
        return FightOutcome::Skipped(SkipReason::CombatantDown);
    }
    if *defender_hp < damage {
        return FightOutcome::Skipped(SkipReason::WouldOverkill);
    }

    *defender_hp = defender_hp.saturating_sub(damage);
    *attacker_hp = attacker_hp.saturating_add(damage / 2);
    scoreboard.record_fight();
    trace!(
        attacker_hp = *attacker_hp,
        defender_hp = *defender_hp,
        "fight landed"
    );
    FightOutcome::Landed
}
