//! Read-only engine counters polled by external reporting.
//!
//! All counters are atomics, so readers never contend with the dispatch
//! loop and the loop never blocks on a reader.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use courier_common::types::{DispatchOutcome, TickSummary};

#[derive(Debug, Default)]
pub struct DispatchStats {
    items_delivered: AtomicU64,
    transport_failures: AtomicU64,
    items_skipped: AtomicU64,
    ticks_completed: AtomicU64,
    ticks_failed: AtomicU64,
    /// Gauge, overwritten each pass.
    active_subscriptions: AtomicU64,
    /// Unix seconds of the last completed pass; 0 = never.
    last_tick_unix: AtomicI64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub items_delivered: u64,
    pub transport_failures: u64,
    pub items_skipped: u64,
    pub ticks_completed: u64,
    pub ticks_failed: u64,
    pub active_subscriptions: u64,
    pub last_successful_tick: Option<DateTime<Utc>>,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Delivered => &self.items_delivered,
            DispatchOutcome::TransportFailed => &self.transport_failures,
            DispatchOutcome::Skipped(_) => &self.items_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self, summary: &TickSummary, completed_at: DateTime<Utc>) {
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
        self.active_subscriptions
            .store(summary.subscriptions, Ordering::Relaxed);
        self.last_tick_unix
            .store(completed_at.timestamp(), Ordering::Relaxed);
    }

    pub fn record_tick_failure(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_unix = self.last_tick_unix.load(Ordering::Relaxed);

        StatsSnapshot {
            items_delivered: self.items_delivered.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            ticks_completed: self.ticks_completed.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
            last_successful_tick: (last_unix > 0)
                .then(|| Utc.timestamp_opt(last_unix, 0).single())
                .flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_common::types::SkipReason;

    #[test]
    fn test_snapshot_reflects_outcomes() {
        let stats = DispatchStats::new();
        stats.record_outcome(DispatchOutcome::Delivered);
        stats.record_outcome(DispatchOutcome::Delivered);
        stats.record_outcome(DispatchOutcome::TransportFailed);
        stats.record_outcome(DispatchOutcome::Skipped(SkipReason::ShuttingDown));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.items_delivered, 2);
        assert_eq!(snapshot.transport_failures, 1);
        assert_eq!(snapshot.items_skipped, 1);
    }

    #[test]
    fn test_last_tick_starts_empty() {
        let stats = DispatchStats::new();
        assert!(stats.snapshot().last_successful_tick.is_none());
    }

    #[test]
    fn test_record_tick_sets_gauge_and_timestamp() {
        let stats = DispatchStats::new();
        let summary = TickSummary {
            subscriptions: 3,
            delivered: 5,
            ..Default::default()
        };
        let now = Utc::now();
        stats.record_tick(&summary, now);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.ticks_completed, 1);
        assert_eq!(snapshot.active_subscriptions, 3);
        assert_eq!(
            snapshot.last_successful_tick.unwrap().timestamp(),
            now.timestamp()
        );
    }
}
