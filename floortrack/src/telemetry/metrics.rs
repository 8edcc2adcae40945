//! Lock-free pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::snapshot::TelemetrySnapshot;

/// Metrics for the ingestion pipeline.
///
/// All counters are relaxed atomics: instrumentation must never contend
/// with the pipeline itself.
#[derive(Debug)]
pub struct PipelineMetrics {
    started_at: Instant,
    updates_received: AtomicU64,
    updates_normalized: AtomicU64,
    transform_failures: AtomicU64,
    entities_auto_created: AtomicU64,
    events_emitted: AtomicU64,
    broadcasts_sent: AtomicU64,
    broadcast_failures: AtomicU64,
    subscribers_connected: AtomicU64,
    subscribers_dropped: AtomicU64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            updates_received: AtomicU64::new(0),
            updates_normalized: AtomicU64::new(0),
            transform_failures: AtomicU64::new(0),
            entities_auto_created: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            broadcasts_sent: AtomicU64::new(0),
            broadcast_failures: AtomicU64::new(0),
            subscribers_connected: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
        }
    }

    pub fn update_received(&self) {
        self.updates_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A WGS84 location was transformed into the local frame.
    pub fn update_normalized(&self) {
        self.updates_normalized.fetch_add(1, Ordering::Relaxed);
    }

    /// A transform failed and the location was passed through unchanged.
    pub fn transform_failed(&self) {
        self.transform_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entity_auto_created(&self) {
        self.entities_auto_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_emitted(&self, count: u64) {
        self.events_emitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn broadcast_sent(&self) {
        self.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcast_failed(&self) {
        self.broadcast_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_connected(&self) {
        self.subscribers_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started_at.elapsed(),
            updates_received: self.updates_received.load(Ordering::Relaxed),
            updates_normalized: self.updates_normalized.load(Ordering::Relaxed),
            transform_failures: self.transform_failures.load(Ordering::Relaxed),
            entities_auto_created: self.entities_auto_created.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            broadcasts_sent: self.broadcasts_sent.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
            subscribers_connected: self.subscribers_connected.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.update_received();
        metrics.update_received();
        metrics.events_emitted(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.updates_received, 2);
        assert_eq!(snapshot.events_emitted, 3);
        assert_eq!(snapshot.broadcasts_sent, 0);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let metrics = PipelineMetrics::new();
        metrics.broadcast_sent();
        let snapshot = metrics.snapshot();
        metrics.broadcast_sent();
        assert_eq!(snapshot.broadcasts_sent, 1);
    }
}
