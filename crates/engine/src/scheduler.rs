//! Periodic driver for the dispatch engine.
//!
//! One tokio interval fires the full pass. A pass still running when the
//! next tick lands causes that tick to be dropped, so passes never
//! overlap. Shutdown is cooperative: the in-flight pass drains its current
//! subscription before the loop exits.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use courier_common::error::DispatchError;
use courier_common::types::TickSummary;
use courier_transport::Transport;

use crate::dispatcher::DispatchEngine;

/// One schedulable unit of dispatch work.
///
/// Implemented by [`DispatchEngine`]; tests substitute a scripted driver
/// so scheduling behavior is checked against a paused clock without a
/// database.
pub trait TickDriver: Send + Sync {
    fn run_tick(
        &self,
        shutdown: &CancellationToken,
    ) -> impl Future<Output = Result<TickSummary, DispatchError>> + Send;
}

impl<T: Transport> TickDriver for DispatchEngine<T> {
    async fn run_tick(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<TickSummary, DispatchError> {
        DispatchEngine::run_tick(self, shutdown).await
    }
}

pub struct Scheduler<D: TickDriver> {
    driver: D,
    interval: Duration,
}

impl<D: TickDriver> Scheduler<D> {
    pub fn new(driver: D, interval: Duration) -> Self {
        Self { driver, interval }
    }

    /// Drive ticks until `shutdown` is cancelled.
    ///
    /// Tick errors never end the loop; they are logged and the next tick
    /// retries. Cancellation observed while a pass is in flight lets the
    /// pass finish before the loop returns.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        loop {
            // Biased so a pending shutdown always wins over a due tick;
            // no new pass starts once cancellation is observed.
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.driver.run_tick(&shutdown).await {
                tracing::error!(error = %e, "Dispatch pass failed, will retry on next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Scripted driver: counts invocations, tracks concurrent entries, and
    /// optionally stays busy for a fixed virtual duration.
    struct ScriptedDriver {
        started: Arc<AtomicU64>,
        completed: Arc<AtomicU64>,
        in_flight: Arc<AtomicU64>,
        max_in_flight: Arc<AtomicU64>,
        busy: Duration,
    }

    impl ScriptedDriver {
        fn new(busy: Duration) -> Self {
            Self {
                started: Arc::new(AtomicU64::new(0)),
                completed: Arc::new(AtomicU64::new(0)),
                in_flight: Arc::new(AtomicU64::new(0)),
                max_in_flight: Arc::new(AtomicU64::new(0)),
                busy,
            }
        }
    }

    impl TickDriver for ScriptedDriver {
        async fn run_tick(
            &self,
            _shutdown: &CancellationToken,
        ) -> Result<TickSummary, DispatchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.busy.is_zero() {
                time::sleep(self.busy).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(TickSummary::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_fire_at_fixed_cadence() {
        let driver = ScriptedDriver::new(Duration::ZERO);
        let started = driver.started.clone();
        let scheduler = Scheduler::new(driver, Duration::from_secs(10));

        let shutdown = CancellationToken::new();
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        // First tick fires immediately, then every 10s: t=0, 10, 20, 30.
        time::sleep(Duration::from_secs(35)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_passes_never_overlap_and_late_ticks_are_skipped() {
        // Each pass takes 25s against a 10s interval: passes at t=0..25
        // and t=30..55, with the t=10 and t=20 ticks dropped.
        let driver = ScriptedDriver::new(Duration::from_secs(25));
        let started = driver.started.clone();
        let max_in_flight = driver.max_in_flight.clone();
        let scheduler = Scheduler::new(driver, Duration::from_secs(10));

        let shutdown = CancellationToken::new();
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        time::sleep(Duration::from_secs(56)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1, "passes overlapped");
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_pass() {
        let driver = ScriptedDriver::new(Duration::from_secs(30));
        let started = driver.started.clone();
        let completed = driver.completed.clone();
        let scheduler = Scheduler::new(driver, Duration::from_secs(10));

        let shutdown = CancellationToken::new();
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        // Cancel while the first pass is mid-flight.
        time::sleep(Duration::from_secs(5)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(
            completed.load(Ordering::SeqCst),
            1,
            "in-flight pass was aborted instead of drained"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_errors_do_not_stop_the_loop() {
        struct FailingDriver {
            attempts: Arc<AtomicU64>,
        }

        impl TickDriver for FailingDriver {
            async fn run_tick(
                &self,
                _shutdown: &CancellationToken,
            ) -> Result<TickSummary, DispatchError> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(DispatchError::Config("scripted".to_string()))
            }
        }

        let attempts = Arc::new(AtomicU64::new(0));
        let scheduler = Scheduler::new(
            FailingDriver {
                attempts: attempts.clone(),
            },
            Duration::from_secs(10),
        );

        let shutdown = CancellationToken::new();
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
