//! One simulated combatant.
//!
//! Health lives behind the immortal's own async mutex. The fight protocol
//! is the only code that writes it, and only while holding the locks of
//! both combatants. The `running` flag is an independent concern: it is
//! read and written without touching the health lock.

use std::sync::atomic::{AtomicBool, Ordering};

use highlander_types::{ImmortalName, ImmortalSnapshot};
use tokio::sync::{Mutex, MutexGuard, Notify};

/// A single immortal: identity, lock-guarded health, fixed damage.
#[derive(Debug)]
pub struct Immortal {
    name: ImmortalName,
    damage: i64,
    health: Mutex<i64>,
    running: AtomicBool,
    stop_notify: Notify,
}

impl Immortal {
    /// Create a running immortal.
    pub fn new(name: ImmortalName, health: i64, damage: i64) -> Self {
        Self {
            name,
            damage,
            health: Mutex::new(health),
            running: AtomicBool::new(true),
            stop_notify: Notify::new(),
        }
    }

    /// The immortal's name.
    pub const fn name(&self) -> &ImmortalName {
        &self.name
    }

    /// Damage dealt per landed hit.
    pub const fn damage(&self) -> i64 {
        self.damage
    }

    /// Current health, read under the health lock.
    pub async fn health(&self) -> i64 {
        *self.health.lock().await
    }

    /// Current health if the lock is free right now, `None` while someone
    /// holds it (typically a fight in progress).
    pub fn try_health(&self) -> Option<i64> {
        self.health.try_lock().ok().map(|health| *health)
    }

    /// `health > 0` and not stopped.
    pub async fn is_alive(&self) -> bool {
        self.health().await > 0 && self.is_running()
    }

    /// Whether the immortal's worker should keep going.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the owning worker to stop at its next checkpoint. Idempotent.
    pub fn request_stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.stop_notify.notify_waiters();
        }
    }

    /// Resolve once [`request_stop`](Self::request_stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            tokio::pin!(notified);
            // Register interest before checking the flag so a stop that
            // lands in between still wakes us.
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    /// Point-in-time view of this immortal.
    pub async fn snapshot(&self) -> ImmortalSnapshot {
        let health = self.health().await;
        ImmortalSnapshot {
            name: self.name.clone(),
            health,
            damage: self.damage,
            alive: health > 0 && self.is_running(),
        }
    }

    /// Acquire the health lock. Used by the fight protocol.
    pub(crate) async fn lock_health(&self) -> MutexGuard<'_, i64> {
        self.health.lock().await
    }
}
