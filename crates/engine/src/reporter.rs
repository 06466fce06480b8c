//! Periodic status report to operators.
//!
//! Reads the engine's counters plus the settings table, formats a short
//! plain-text summary, and delivers it over the same transport kind the
//! dispatcher uses. Entirely best-effort: failures are logged and the
//! next cycle tries again. The dispatch loop never waits on anything here.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use courier_common::error::DispatchError;
use courier_transport::Transport;

use crate::settings::SettingsStore;
use crate::stats::{DispatchStats, StatsSnapshot};

pub struct StatusReporter<T: Transport> {
    transport: T,
    settings: SettingsStore,
    stats: Arc<DispatchStats>,
    interval: Duration,
}

impl<T: Transport> StatusReporter<T> {
    pub fn new(
        transport: T,
        settings: SettingsStore,
        stats: Arc<DispatchStats>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            settings,
            stats,
            interval,
        }
    }

    /// Report on a fixed cycle until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Swallow the immediate first tick so a fresh process does not
        // report a screen of zeros.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Status reporter stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.send_report().await {
                tracing::warn!(error = %e, "Status report failed");
            }
        }
    }

    /// Build and deliver one status report immediately.
    pub async fn send_report(&self) -> Result<(), DispatchError> {
        let snapshot = self.stats.snapshot();
        let text = Self::format_report(&snapshot);

        // A malformed report setting mid-run must not cost the cycle:
        // treat it as unset and fall through to the admin chats.
        let report_chat = match self.settings.report_chat_id().await {
            Ok(chat) => chat,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load report chat, falling back to admin chats");
                None
            }
        };

        let targets = match report_chat {
            Some(chat_id) => vec![chat_id],
            None => self.settings.admin_chat_ids().await?,
        };

        if targets.is_empty() {
            tracing::debug!("No report chat or admins configured, skipping status report");
            return Ok(());
        }

        let mut last_error = None;
        let mut delivered = 0usize;
        for chat_id in &targets {
            match self.transport.send(*chat_id, &text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(chat_id, error = %e, "Failed to deliver status report");
                    last_error = Some(e);
                }
            }
        }

        if delivered == 0 {
            if let Some(e) = last_error {
                return Err(DispatchError::Transport(e.to_string()));
            }
        }

        tracing::info!(delivered, targets = targets.len(), "Status report sent");
        Ok(())
    }

    fn format_report(snapshot: &StatsSnapshot) -> String {
        let last_tick = snapshot
            .last_successful_tick
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "📊 Courier status report\n\
             Active subscriptions: {}\n\
             Items delivered: {}\n\
             Transport failures: {}\n\
             Items skipped: {}\n\
             Passes completed: {} ({} failed)\n\
             Last successful pass: {}",
            snapshot.active_subscriptions,
            snapshot.items_delivered,
            snapshot.transport_failures,
            snapshot.items_skipped,
            snapshot.ticks_completed,
            snapshot.ticks_failed,
            last_tick,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            items_delivered: 42,
            transport_failures: 3,
            items_skipped: 1,
            ticks_completed: 10,
            ticks_failed: 2,
            active_subscriptions: 7,
            last_successful_tick: Some(Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_report_contains_all_counters() {
        let text = StatusReporter::<courier_transport::TelegramTransport>::format_report(
            &snapshot(),
        );
        assert!(text.contains("Active subscriptions: 7"));
        assert!(text.contains("Items delivered: 42"));
        assert!(text.contains("Transport failures: 3"));
        assert!(text.contains("10 (2 failed)"));
        assert!(text.contains("2024-06-01 02:00:00 UTC"));
    }

    #[test]
    fn test_report_handles_never_ticked() {
        let mut s = snapshot();
        s.last_successful_tick = None;
        let text = StatusReporter::<courier_transport::TelegramTransport>::format_report(&s);
        assert!(text.contains("Last successful pass: never"));
    }
}
