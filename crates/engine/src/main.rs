use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_engine::dispatcher::DispatchEngine;
use courier_engine::reporter::StatusReporter;
use courier_engine::scheduler::Scheduler;
use courier_engine::settings::SettingsStore;
use courier_engine::stats::DispatchStats;
use courier_transport::TelegramTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_engine=info,courier_transport=info".into()),
        )
        .json()
        .init();

    tracing::info!("Courier dispatcher starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Operator overrides from the settings table win over env defaults.
    // Malformed settings are fatal here, never mid-run.
    let settings = SettingsStore::new(pool.clone());
    let overrides = settings.dispatch_overrides().await?;
    let batch_size = overrides.batch_size.unwrap_or(config.batch_size);
    let tick_interval =
        Duration::from_secs(overrides.tick_interval_secs.unwrap_or(config.tick_interval_secs));

    let stats = Arc::new(DispatchStats::new());

    let engine = DispatchEngine::new(
        pool.clone(),
        TelegramTransport::new(&config.telegram_bot_token),
        batch_size,
        Arc::clone(&stats),
    );
    let scheduler = Scheduler::new(engine, tick_interval);

    let reporter = StatusReporter::new(
        TelegramTransport::new(&config.telegram_bot_token),
        SettingsStore::new(pool.clone()),
        Arc::clone(&stats),
        Duration::from_secs(config.report_interval_secs),
    );

    // Graceful shutdown: Ctrl+C cancels the token; in-flight work drains
    // before either loop exits.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal, finishing in-flight work...");
            signal_token.cancel();
        }
    });

    let reporter_shutdown = shutdown.clone();
    let reporter_task = tokio::spawn(async move { reporter.run(reporter_shutdown).await });

    scheduler.run(shutdown).await;
    reporter_task.await?;

    tracing::info!("Courier dispatcher stopped.");
    Ok(())
}
