//! Lock-free streaming counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by [`QuadTreeTileLoader`](super::QuadTreeTileLoader).
///
/// Shared behind an `Arc` so other threads can poll them while the loader
/// runs.
#[derive(Debug, Default)]
pub struct StreamingStats {
    requested: AtomicU64,
    loaded: AtomicU64,
    canceled: AtomicU64,
}

/// Point-in-time copy of [`StreamingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStatsSnapshot {
    pub requested: u64,
    pub loaded: u64,
    pub canceled: u64,
}

impl StreamingStatsSnapshot {
    /// Requests neither loaded nor cancelled yet.
    pub fn in_flight(&self) -> u64 {
        self.requested
            .saturating_sub(self.loaded)
            .saturating_sub(self.canceled)
    }
}

impl StreamingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_requested(&self) {
        self.requested.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_loaded(&self) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_canceled(&self, count: u64) {
        self.canceled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamingStatsSnapshot {
        StreamingStatsSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(StreamingStats::new().snapshot(), StreamingStatsSnapshot::default());
    }

    #[test]
    fn test_in_flight() {
        let stats = StreamingStats::new();
        for _ in 0..5 {
            stats.record_requested();
        }
        stats.record_loaded();
        stats.record_canceled(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requested, 5);
        assert_eq!(snapshot.in_flight(), 2);
    }

    #[test]
    fn test_thread_safe_counting() {
        let stats = Arc::new(StreamingStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_requested();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().requested, 800);
    }
}
