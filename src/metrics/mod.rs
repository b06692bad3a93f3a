//! Operation Metrics Module
//!
//! Per-container counters for the concurrent map: how often it is read and written, how many
//! lookups miss, how often a lock acquisition had to wait, and how long operations take.
//! Counters are relaxed atomics and never take the container's lock.
//!
//! With the `metrics` feature disabled the same API is available but records nothing and
//! reports zeros.

#[cfg(feature = "metrics")]
use core::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of a container's operation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapMetrics {
    /// Operations that took the lock in shared mode
    pub reads: u64,
    /// Operations that took the lock in exclusive mode
    pub writes: u64,
    /// Single-key lookups that found no entry
    pub misses: u64,
    /// Lock acquisitions that could not be granted immediately
    pub contended: u64,
    /// Average operation time in nanoseconds
    pub avg_operation_time_ns: u64,
    /// Maximum operation time in nanoseconds
    pub max_operation_time_ns: u64,
}

impl MapMetrics {
    /// Total number of recorded operations
    pub fn total_operations(&self) -> u64 {
        self.reads + self.writes
    }

    /// Share of reads that did not miss, as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            (self.reads.saturating_sub(self.misses) as f64 / self.reads as f64) * 100.0
        }
    }

    /// Share of operations that waited on the lock, as a percentage
    pub fn contention_rate(&self) -> f64 {
        let total = self.total_operations();
        if total == 0 {
            0.0
        } else {
            (self.contended as f64 / total as f64) * 100.0
        }
    }

    /// Get average operation time as Duration
    pub fn avg_operation_time(&self) -> Duration {
        Duration::from_nanos(self.avg_operation_time_ns)
    }

    /// Get maximum operation time as Duration
    pub fn max_operation_time(&self) -> Duration {
        Duration::from_nanos(self.max_operation_time_ns)
    }
}

/// Internal atomic metrics collection
#[cfg(feature = "metrics")]
#[cfg_attr(feature = "unstable", doc(cfg(feature = "metrics")))]
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    reads: AtomicU64,
    writes: AtomicU64,
    misses: AtomicU64,
    contended: AtomicU64,
    total_time_ns: AtomicU64,
    max_time_ns: AtomicU64,
}

#[cfg(feature = "metrics")]
impl AtomicMetrics {
    /// Record a shared-mode operation with its duration
    pub fn record_read(&self, duration: Duration) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    /// Record an exclusive-mode operation with its duration
    pub fn record_write(&self, duration: Duration) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    /// Record a lookup that found no entry
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lock acquisition that had to wait
    pub fn record_contention(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    fn record_time(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        self.max_time_ns.fetch_max(duration_ns, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MapMetrics {
        let reads = self.reads.load(Ordering::Relaxed);
        let writes = self.writes.load(Ordering::Relaxed);
        let total_ops = reads + writes;
        let total_time = self.total_time_ns.load(Ordering::Relaxed);

        MapMetrics {
            reads,
            writes,
            misses: self.misses.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            avg_operation_time_ns: if total_ops > 0 { total_time / total_ops } else { 0 },
            max_operation_time_ns: self.max_time_ns.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.contended.store(0, Ordering::Relaxed);
        self.total_time_ns.store(0, Ordering::Relaxed);
        self.max_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Internal atomic metrics collection (disabled)
#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct AtomicMetrics;

#[cfg(not(feature = "metrics"))]
impl AtomicMetrics {
    /// Does nothing without the `metrics` feature
    pub fn record_read(&self, _duration: Duration) {}
    /// Does nothing without the `metrics` feature
    pub fn record_write(&self, _duration: Duration) {}
    /// Does nothing without the `metrics` feature
    pub fn record_miss(&self) {}
    /// Does nothing without the `metrics` feature
    pub fn record_contention(&self) {}
    /// Always all zeros without the `metrics` feature
    pub fn snapshot(&self) -> MapMetrics {
        MapMetrics::default()
    }
    /// Does nothing without the `metrics` feature
    pub fn reset(&self) {}
}

/// Trait for data structures that support performance metrics
pub trait MetricsCollector {
    /// Get current performance metrics
    fn metrics(&self) -> MapMetrics;

    /// Reset all metrics
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
