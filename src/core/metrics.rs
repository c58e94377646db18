//! Dispatch metrics for observability
//!
//! Counters for monitoring dispatcher health. Queue overflow is counted
//! here and never raised back to producers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one dispatcher
///
/// # Example
///
/// ```
/// use multilog_system::DispatchMetrics;
///
/// let metrics = DispatchMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_dropped();
/// assert_eq!(metrics.dispatched_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Records accepted and fanned out to at least zero backends
    dispatched_count: AtomicU64,

    /// Records dropped because a backend queue stayed full past the bounded
    /// wait, or because a backend worker had died
    dropped_count: AtomicU64,

    /// Number of times a backend queue was observed full
    queue_full_events: AtomicU64,
}

impl DispatchMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop rate as a percentage (0.0 - 100.0); 0.0 before any traffic.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.dispatched_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.dispatched_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DispatchMetrics {
    /// Snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            dispatched_count: AtomicU64::new(self.dispatched_count()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = DispatchMetrics::new();
        assert_eq!(metrics.dispatched_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.queue_full_events(), 0);
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = DispatchMetrics::new();
        metrics.record_dispatched();
        metrics.record_dispatched();
        metrics.record_dropped();
        metrics.record_queue_full();
        assert_eq!(metrics.dispatched_count(), 2);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.queue_full_events(), 1);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let metrics = DispatchMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_dispatched();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "drop rate was {}", rate);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = DispatchMetrics::new();
        metrics.record_dispatched();
        metrics.record_dropped();
        metrics.reset();
        assert_eq!(metrics.dispatched_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = DispatchMetrics::new();
        metrics.record_dropped();
        let snapshot = metrics.clone();
        metrics.record_dropped();
        assert_eq!(snapshot.dropped_count(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }
}
