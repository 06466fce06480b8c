use serde::Deserialize;

/// Global dispatcher configuration loaded from environment variables.
///
/// Operator-level overrides for `batch_size` and `tick_interval_secs` may
/// additionally live in the settings table; those are merged over these
/// defaults at startup by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Telegram bot token used by the delivery transport
    pub telegram_bot_token: String,

    /// Dispatch pass interval in seconds (default: 300)
    pub tick_interval_secs: u64,

    /// Maximum items delivered per subscription per pass (default: 10)
    pub batch_size: i64,

    /// Status report interval in seconds (default: 86400 = daily)
    pub report_interval_secs: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Seconds to wait for a free pool connection before failing (default: 5)
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
                anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable is required")
            })?,
            tick_interval_secs: std::env::var("TICK_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TICK_INTERVAL_SECS must be a valid u64"))?,
            batch_size: std::env::var("DISPATCH_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_BATCH_SIZE must be a valid i64"))?,
            report_interval_secs: std::env::var("REPORT_INTERVAL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REPORT_INTERVAL_SECS must be a valid u64"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            db_acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_ACQUIRE_TIMEOUT_SECS must be a valid u64"))?,
        };

        if config.batch_size < 1 {
            anyhow::bail!("DISPATCH_BATCH_SIZE must be at least 1");
        }
        if config.tick_interval_secs == 0 {
            anyhow::bail!("TICK_INTERVAL_SECS must be at least 1");
        }

        Ok(config)
    }
}
