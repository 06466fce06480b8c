//! Read-only view of the crawled content feed.
//!
//! Ids come from an append-only sequence, so `id > after_id` with an
//! ascending sort is a consistent snapshot: a later fetch can never
//! surface an id below one already returned.

use sqlx::PgPool;

use courier_common::error::DispatchError;
use courier_common::types::ContentItem;

pub struct ContentSource;

impl ContentSource {
    /// Fetch up to `limit` items tagged with `tag`, strictly after
    /// `after_id`, ascending by id.
    ///
    /// Tag matching is a substring match against the crawler's
    /// comma-separated tag column.
    pub async fn fetch_after(
        pool: &PgPool,
        tag: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ContentItem>, DispatchError> {
        let pattern = format!("%{}%", tag);

        let items: Vec<ContentItem> = sqlx::query_as(
            r#"
            SELECT * FROM content_items
            WHERE id > $1 AND tags LIKE $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(after_id)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(DispatchError::SourceUnavailable)?;

        Ok(items)
    }

    /// Highest item id currently in the feed, or 0 when empty.
    pub async fn latest_id(pool: &PgPool) -> Result<i64, DispatchError> {
        let (max,): (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM content_items")
            .fetch_one(pool)
            .await
            .map_err(DispatchError::SourceUnavailable)?;

        Ok(max.unwrap_or(0))
    }
}
