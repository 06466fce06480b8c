use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A crawled content item, ready for delivery.
///
/// The feed is append-only: ids are assigned by a monotonic sequence and
/// rows are never mutated after insert. The dispatcher only reads this.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: i64,
    pub title: Option<String>,
    pub body: String,
    /// Media references (array of URLs) attached to the item.
    pub media: serde_json::Value,
    /// Comma-separated tag string as produced by the crawler.
    pub tags: String,
    pub source_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A chat's subscription to a content tag, with delivery progress.
///
/// Identity is the `(chat_id, tag)` pair. Invariant: every item with
/// `id <= last_delivered_id` matching `tag` has been delivered to
/// `chat_id`; everything above it has not been confirmed yet.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub chat_id: i64,
    pub tag: String,
    pub last_delivered_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why an item was passed over without a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The subscription disappeared or was deactivated mid-pass.
    SubscriptionGone,
    /// Shutdown was signalled before the item was attempted.
    ShuttingDown,
}

/// Outcome of a single item delivery attempt.
///
/// Ephemeral — folded into counters, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    TransportFailed,
    Skipped(SkipReason),
}

/// Aggregate counts for one full dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub subscriptions: u64,
    pub delivered: u64,
    pub transport_failures: u64,
    pub skipped: u64,
}

impl TickSummary {
    pub fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered => self.delivered += 1,
            DispatchOutcome::TransportFailed => self.transport_failures += 1,
            DispatchOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::SubscriptionGone => write!(f, "subscription_gone"),
            SkipReason::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_summary_records_outcomes() {
        let mut summary = TickSummary::default();
        summary.record(DispatchOutcome::Delivered);
        summary.record(DispatchOutcome::Delivered);
        summary.record(DispatchOutcome::TransportFailed);
        summary.record(DispatchOutcome::Skipped(SkipReason::SubscriptionGone));

        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.transport_failures, 1);
        assert_eq!(summary.skipped, 1);
    }
}
