//! The shared collection of immortals.
//!
//! Membership only changes while the simulation is paused: creation at
//! start and compaction in [`Population::remove_dead`]. The member list
//! still sits behind an async [`RwLock`] so the type is sound, but no
//! caller holds it across an immortal's health lock. Sampling clones the
//! chosen `Arc`, releases the list, and only then checks liveness.
//!
//! Sampling never waits on a health lock. A candidate whose lock is held is
//! mid-fight and is treated as alive; the fight rule re-reads its health
//! under the lock and skips the fight if it has died since.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;
use tracing::debug;

use crate::immortal::Immortal;

/// Upper bound on random probes before falling back to a linear scan.
pub const MAX_RANDOM_PROBES: usize = 10;

/// Ordered collection of immortals; insertion order is creation order.
#[derive(Debug, Default)]
pub struct Population {
    members: RwLock<Vec<Arc<Immortal>>>,
}

impl Population {
    /// Create a population from already-built immortals.
    pub fn new(members: Vec<Arc<Immortal>>) -> Self {
        Self {
            members: RwLock::new(members),
        }
    }

    /// Pick a live opponent for `me`.
    ///
    /// Tries up to `min(10, 2 * size)` random indices, then scans the whole
    /// list in order. Returns `None` when no other immortal is alive.
    /// Does not block on any immortal's health lock.
    pub async fn sample_opponent<R: Rng>(
        &self,
        me: &Immortal,
        rng: &mut R,
    ) -> Option<Arc<Immortal>> {
        let mut size = self.size().await;
        if size <= 1 {
            return None;
        }

        let max_probes = size.saturating_mul(2).min(MAX_RANDOM_PROBES);
        for _ in 0..max_probes {
            let index = rng.random_range(0..size);
            let probed = self.members.read().await.get(index).cloned();
            let Some(candidate) = probed else {
                // The list shrank under us; re-read its size.
                size = self.size().await;
                if size <= 1 {
                    return None;
                }
                continue;
            };
            if candidate.name() != me.name() && looks_alive(&candidate) {
                return Some(candidate);
            }
        }

        self.snapshot()
            .await
            .into_iter()
            .find(|candidate| candidate.name() != me.name() && looks_alive(candidate))
    }

    /// Independent copy of the current member references.
    pub async fn snapshot(&self) -> Vec<Arc<Immortal>> {
        self.members.read().await.clone()
    }

    /// Remove every immortal with `health <= 0` and ask its worker to stop.
    ///
    /// Only call this while the simulation is paused. Returns the removed
    /// immortals in their original order.
    pub async fn remove_dead(&self) -> Vec<Arc<Immortal>> {
        // Read health without holding the member list.
        let mut dead = Vec::new();
        for member in self.snapshot().await {
            if member.health().await <= 0 {
                dead.push(member);
            }
        }
        if dead.is_empty() {
            return dead;
        }

        {
            let mut members = self.members.write().await;
            members.retain(|m| !dead.iter().any(|d| Arc::ptr_eq(m, d)));
        }
        for removed in &dead {
            removed.request_stop();
            debug!(immortal = %removed.name(), "removed dead immortal");
        }
        dead
    }

    /// Number of members, dead or alive.
    pub async fn size(&self) -> usize {
        self.members.read().await.len()
    }

    /// Number of members that are currently alive.
    pub async fn alive_count(&self) -> usize {
        let mut alive = 0_usize;
        for member in self.snapshot().await {
            if member.is_alive().await {
                alive = alive.saturating_add(1);
            }
        }
        alive
    }
}

/// Running, and either healthy or currently locked by a fight.
fn looks_alive(candidate: &Immortal) -> bool {
    candidate.is_running() && candidate.try_health().is_none_or(|health| health > 0)
}
