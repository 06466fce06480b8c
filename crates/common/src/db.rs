use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Build the PostgreSQL pool from the dispatcher's configuration.
///
/// Pool sizing and the acquire timeout come from [`AppConfig`], so a
/// deployment tunes them through the environment rather than code.
pub async fn create_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(config).connect(&config.database_url).await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        acquire_timeout_secs = config.db_acquire_timeout_secs,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

fn pool_options(config: &AppConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_follow_config() {
        let config = AppConfig {
            database_url: "postgres://localhost/courier".to_string(),
            telegram_bot_token: "token".to_string(),
            tick_interval_secs: 300,
            batch_size: 10,
            report_interval_secs: 86400,
            db_max_connections: 7,
            db_acquire_timeout_secs: 3,
        };

        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(3));
    }
}
