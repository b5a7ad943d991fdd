//! Per-dataset fetch statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for where block reads were satisfied.
///
/// Shared by every band and overview of one dataset; all counters are
/// lock-free and count coordinates, not bytes.
#[derive(Debug, Default)]
pub struct FetchStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    fetches: AtomicU64,
    zero_fills: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Blocks served straight from the in-memory cache
    pub memory_hits: u64,
    /// Tiles decoded from the persistent cache
    pub disk_hits: u64,
    /// Tiles retrieved over the network
    pub fetches: u64,
    /// Coordinates answered with a zero block
    pub zero_fills: u64,
    /// Coordinates that ended in a recorded failure
    pub failures: u64,
}

impl StatsSnapshot {
    /// Fraction of non-failed reads that avoided the network.
    pub fn cache_rate(&self) -> f64 {
        let cached = self.memory_hits + self.disk_hits;
        let total = cached + self.fetches;
        if total == 0 {
            0.0
        } else {
            cached as f64 / total as f64
        }
    }
}

impl FetchStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_zero_fill(&self) {
        self.zero_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            zero_fills: self.zero_fills.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
