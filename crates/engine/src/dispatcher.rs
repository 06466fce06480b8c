//! The dispatch pipeline.
//!
//! One tick converts every active subscription's backlog into delivered
//! messages:
//! 1. Load the active subscriptions (a read failure aborts the tick)
//! 2. Per subscription, fetch up to `batch_size` unseen items ascending
//! 3. Render and send each item oldest-first
//! 4. After every confirmed send, durably advance `last_delivered_id`
//!
//! Progress commits one item at a time, not per batch, so a failure
//! partway through leaves `last_delivered_id` at the last confirmed item.
//! Combined with the halt-on-failure rule this gives at-least-once
//! delivery: the only possible duplicate is the item in flight when the
//! process dies between its send and its commit.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use courier_common::error::DispatchError;
use courier_common::types::{DispatchOutcome, SkipReason, Subscription, TickSummary};
use courier_transport::{Transport, format};

use crate::registry::SubscriptionRegistry;
use crate::settings::SettingsStore;
use crate::source::ContentSource;
use crate::stats::DispatchStats;

pub struct DispatchEngine<T: Transport> {
    pool: PgPool,
    transport: T,
    settings: SettingsStore,
    batch_size: i64,
    stats: Arc<DispatchStats>,
}

impl<T: Transport> DispatchEngine<T> {
    pub fn new(pool: PgPool, transport: T, batch_size: i64, stats: Arc<DispatchStats>) -> Self {
        Self {
            settings: SettingsStore::new(pool.clone()),
            pool,
            transport,
            batch_size,
            stats,
        }
    }

    /// Run one full dispatch pass over all active subscriptions.
    ///
    /// Per-subscription failures are contained; only a content source or
    /// registry read failure aborts the pass, and the next tick retries it.
    pub async fn run_tick(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<TickSummary, DispatchError> {
        match self.dispatch_all(shutdown).await {
            Ok(summary) => {
                self.stats.record_tick(&summary, Utc::now());
                tracing::info!(
                    subscriptions = summary.subscriptions,
                    delivered = summary.delivered,
                    transport_failures = summary.transport_failures,
                    skipped = summary.skipped,
                    "Dispatch pass complete"
                );
                Ok(summary)
            }
            Err(e) => {
                self.stats.record_tick_failure();
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    async fn dispatch_all(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<TickSummary, DispatchError> {
        let subscriptions = SubscriptionRegistry::list_active(&self.pool).await?;
        let footer = self.broadcast_footer().await;

        let mut summary = TickSummary {
            subscriptions: subscriptions.len() as u64,
            ..Default::default()
        };

        for sub in &subscriptions {
            if shutdown.is_cancelled() {
                tracing::info!("Shutdown signalled, ending dispatch pass early");
                break;
            }

            self.dispatch_subscription(sub, footer.as_deref(), shutdown, &mut summary)
                .await?;
        }

        Ok(summary)
    }

    /// Deliver one subscription's pending items oldest-first, committing
    /// progress after each confirmed send.
    ///
    /// Items must arrive in id order, so the first transport failure ends
    /// this subscription's pass: nothing after the failed item may be
    /// attempted, and the next tick re-fetches from the same unconfirmed id.
    async fn dispatch_subscription(
        &self,
        sub: &Subscription,
        footer: Option<&str>,
        shutdown: &CancellationToken,
        summary: &mut TickSummary,
    ) -> Result<(), DispatchError> {
        let pending = ContentSource::fetch_after(
            &self.pool,
            &sub.tag,
            sub.last_delivered_id,
            self.batch_size,
        )
        .await?;

        if pending.is_empty() {
            tracing::debug!(chat_id = sub.chat_id, tag = %sub.tag, "No new items");
            return Ok(());
        }

        tracing::info!(
            chat_id = sub.chat_id,
            tag = %sub.tag,
            pending = pending.len(),
            "Dispatching new items"
        );

        for (idx, item) in pending.iter().enumerate() {
            // Cancellation is honored between items only, never between a
            // send and its progress commit. Every remaining fetched item is
            // counted as deferred, not just the first.
            if shutdown.is_cancelled() {
                for _ in idx..pending.len() {
                    self.record(summary, DispatchOutcome::Skipped(SkipReason::ShuttingDown));
                }
                break;
            }

            let text = format::render(item, footer);
            if let Err(e) = self.transport.send(sub.chat_id, &text).await {
                tracing::warn!(
                    chat_id = sub.chat_id,
                    tag = %sub.tag,
                    item_id = item.id,
                    error = %e,
                    "Delivery failed, deferring rest of backlog to next tick"
                );
                self.record(summary, DispatchOutcome::TransportFailed);
                break;
            }

            match SubscriptionRegistry::advance(&self.pool, sub.chat_id, &sub.tag, item.id).await {
                Ok(()) => self.record(summary, DispatchOutcome::Delivered),
                Err(DispatchError::SubscriptionGone { .. }) => {
                    tracing::warn!(
                        chat_id = sub.chat_id,
                        tag = %sub.tag,
                        item_id = item.id,
                        "Subscription vanished mid-pass, skipping remainder"
                    );
                    self.record(summary, DispatchOutcome::Skipped(SkipReason::SubscriptionGone));
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn record(&self, summary: &mut TickSummary, outcome: DispatchOutcome) {
        summary.record(outcome);
        self.stats.record_outcome(outcome);
    }

    /// Enabled broadcast lines joined into a single footer. A settings
    /// read failure mid-run is not worth losing a pass over: log it and
    /// dispatch without the footer.
    async fn broadcast_footer(&self) -> Option<String> {
        match self.settings.broadcast_rules().await {
            Ok(rules) if !rules.is_empty() => Some(
                rules
                    .iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load broadcast rules, dispatching without footer");
                None
            }
        }
    }
}
