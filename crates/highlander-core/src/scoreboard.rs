//! Shared count of completed fights.

use std::sync::atomic::{AtomicU64, Ordering};

/// Concurrency-safe, monotonically increasing fight counter.
///
/// Incremented exactly once per landed fight while both combatants' locks
/// are still held, so a reader that has paused the simulation and waited
/// for it to settle sees a count consistent with the observed health.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    total_fights: AtomicU64,
}

impl ScoreBoard {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self {
            total_fights: AtomicU64::new(0),
        }
    }

    /// Record one completed fight.
    pub fn record_fight(&self) {
        self.total_fights.fetch_add(1, Ordering::AcqRel);
    }

    /// Total fights recorded so far.
    pub fn total_fights(&self) -> u64 {
        self.total_fights.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(ScoreBoard::new().total_fights(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let board = Arc::new(ScoreBoard::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let board = Arc::clone(&board);
            handles.push(tokio::spawn(async move {
                for _ in 0..1_000 {
                    board.record_fight();
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }
        assert_eq!(board.total_fights(), 8_000);
    }
}
