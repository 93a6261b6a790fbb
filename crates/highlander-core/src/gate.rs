//! Pause/resume coordination barrier shared by every worker.
//!
//! The gate is a [`tokio::sync::watch`] channel holding a [`GateState`].
//! Waiters subscribe and wait for the value to become
//! [`GateState::Running`]; `wait_for` checks the current value before
//! sleeping and again on every change, so a resume can neither be lost
//! between the check and the wait nor mistaken for a spurious wakeup.
//! `resume` wakes every waiter at once.

use std::sync::atomic::{AtomicUsize, Ordering};

use highlander_types::GateState;
use tokio::sync::watch;
use tracing::debug;

/// Two-state barrier that suspends workers while paused.
#[derive(Debug)]
pub struct PauseGate {
    state: watch::Sender<GateState>,
    parked: AtomicUsize,
}

impl PauseGate {
    /// Create an open (running) gate.
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Running);
        Self {
            state,
            parked: AtomicUsize::new(0),
        }
    }

    /// Current gate state.
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Whether the gate is closed.
    pub fn is_paused(&self) -> bool {
        self.state() == GateState::Paused
    }

    /// Close the gate. Returns `false` if it was already closed.
    pub fn pause(&self) -> bool {
        self.transition(GateState::Paused)
    }

    /// Open the gate and release every waiter. Returns `false` if it was
    /// already open.
    pub fn resume(&self) -> bool {
        self.transition(GateState::Running)
    }

    /// Number of callers currently suspended in [`await_if_paused`].
    ///
    /// [`await_if_paused`]: Self::await_if_paused
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::Acquire)
    }

    /// Return immediately if the gate is open; otherwise suspend until
    /// [`resume`](Self::resume) is called.
    ///
    /// Dropping the returned future while it waits (for example from a
    /// `select!` branch) un-parks the caller cleanly.
    pub async fn await_if_paused(&self) {
        let mut rx = self.state.subscribe();
        if *rx.borrow_and_update() == GateState::Running {
            return;
        }

        let _parked = ParkedGuard::enter(&self.parked);
        // The sender lives in `self`, so the channel cannot close while we
        // hold a borrow of it.
        if rx.wait_for(|s| *s == GateState::Running).await.is_err() {
            debug!("pause gate channel closed while parked");
        }
    }

    fn transition(&self, next: GateState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the parked counter accurate even when the wait is cancelled.
struct ParkedGuard<'a>(&'a AtomicUsize);

impl<'a> ParkedGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for ParkedGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn initial_state_is_running() {
        let gate = PauseGate::new();
        assert_eq!(gate.state(), GateState::Running);
        assert!(!gate.is_paused());
        assert_eq!(gate.parked(), 0);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let gate = PauseGate::new();
        assert!(!gate.resume());
        assert!(gate.pause());
        assert!(!gate.pause());
        assert!(gate.is_paused());
        assert!(gate.resume());
        assert!(!gate.resume());
        assert!(!gate.is_paused());
    }

    #[tokio::test]
    async fn open_gate_returns_immediately() {
        let gate = PauseGate::new();
        let waited = tokio::time::timeout(Duration::from_millis(100), gate.await_if_paused()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resume_releases_every_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let mut waiters = Vec::new();
        for _ in 0..5 {
            let gate = Arc::clone(&gate);
            waiters.push(tokio::spawn(async move { gate.await_if_paused().await }));
        }

        // All five park before the gate opens.
        let parked = tokio::time::timeout(Duration::from_secs(2), async {
            while gate.parked() < 5 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(parked.is_ok());
        assert!(waiters.iter().all(|w| !w.is_finished()));

        gate.resume();
        for waiter in waiters {
            let joined = tokio::time::timeout(Duration::from_secs(2), waiter).await;
            assert!(matches!(joined, Ok(Ok(()))));
        }
        assert_eq!(gate.parked(), 0);
    }

    #[tokio::test]
    async fn cancelled_wait_unparks() {
        let gate = PauseGate::new();
        gate.pause();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), gate.await_if_paused()).await;
        assert!(timed_out.is_err());
        assert_eq!(gate.parked(), 0);
    }
}
