//! Subscription registry — the durable `(chat, tag)` → progress mapping.
//!
//! This is a pure persistence boundary: no network I/O happens here, so it
//! can be exercised against a bare database with no transport wired up.
//! The dispatcher is the only writer of `last_delivered_id`; creation and
//! deactivation belong to the external administrative surface.

use sqlx::PgPool;

use courier_common::error::DispatchError;
use courier_common::types::Subscription;

use crate::source::ContentSource;

pub struct SubscriptionRegistry;

impl SubscriptionRegistry {
    /// List all active subscriptions, ordered by id.
    ///
    /// The ordering itself carries no meaning, but it is stable, so one
    /// dispatch pass visits every subscription exactly once.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Subscription>, DispatchError> {
        let subs: Vec<Subscription> =
            sqlx::query_as("SELECT * FROM subscriptions WHERE active = TRUE ORDER BY id")
                .fetch_all(pool)
                .await?;

        Ok(subs)
    }

    /// Advance delivery progress after a confirmed send.
    ///
    /// The update is guarded by `last_delivered_id < $3`, so a delayed or
    /// duplicate commit can never move progress backward. A stale commit
    /// against a live subscription is a logged no-op; a missing or
    /// deactivated subscription is reported as [`DispatchError::SubscriptionGone`].
    pub async fn advance(
        pool: &PgPool,
        chat_id: i64,
        tag: &str,
        new_last_id: i64,
    ) -> Result<(), DispatchError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET last_delivered_id = $3, updated_at = NOW()
            WHERE chat_id = $1 AND tag = $2 AND active = TRUE AND last_delivered_id < $3
            "#,
        )
        .bind(chat_id)
        .bind(tag)
        .bind(new_last_id)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(chat_id, tag, new_last_id, "Delivery progress advanced");
            return Ok(());
        }

        // No row updated: either the commit is stale or the subscription
        // is gone. Only the latter is an error for the caller.
        let current: Option<(i64,)> = sqlx::query_as(
            "SELECT last_delivered_id FROM subscriptions WHERE chat_id = $1 AND tag = $2 AND active = TRUE",
        )
        .bind(chat_id)
        .bind(tag)
        .fetch_optional(pool)
        .await?;

        match current {
            Some((last,)) => {
                tracing::warn!(
                    chat_id,
                    tag,
                    new_last_id,
                    current = last,
                    "Stale progress commit ignored"
                );
                Ok(())
            }
            None => Err(DispatchError::SubscriptionGone {
                chat_id,
                tag: tag.to_string(),
            }),
        }
    }

    /// Create a subscription.
    ///
    /// With `start_from_latest`, progress starts at the newest existing
    /// item id so only future content is delivered; otherwise the whole
    /// backlog is delivered from the beginning.
    pub async fn create(
        pool: &PgPool,
        chat_id: i64,
        tag: &str,
        start_from_latest: bool,
    ) -> Result<Subscription, DispatchError> {
        let start_id = if start_from_latest {
            ContentSource::latest_id(pool).await?
        } else {
            0
        };

        let sub: Subscription = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (chat_id, tag, last_delivered_id, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .bind(tag)
        .bind(start_id)
        .fetch_one(pool)
        .await?;

        tracing::info!(chat_id, tag, start_id, "Subscription created");
        Ok(sub)
    }

    /// Toggle a subscription's active flag. Returns true if a row changed.
    pub async fn set_active(
        pool: &PgPool,
        chat_id: i64,
        tag: &str,
        active: bool,
    ) -> Result<bool, DispatchError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET active = $3, updated_at = NOW() WHERE chat_id = $1 AND tag = $2",
        )
        .bind(chat_id)
        .bind(tag)
        .bind(active)
        .execute(pool)
        .await?;

        let changed = result.rows_affected() > 0;
        if changed {
            tracing::info!(chat_id, tag, active, "Subscription toggled");
        }

        Ok(changed)
    }
}
