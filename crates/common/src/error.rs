use thiserror::Error;

/// Error taxonomy for the dispatch pipeline.
///
/// Containment policy: `Transport` and `SubscriptionGone` are scoped to a
/// single subscription's pass and never abort the tick. `SourceUnavailable`
/// aborts the whole tick and is retried on the next one rather than
/// in-cycle. `Config` is fatal at startup only, never mid-run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("content source unavailable: {0}")]
    SourceUnavailable(#[source] sqlx::Error),

    #[error("transport delivery failed: {0}")]
    Transport(String),

    #[error("subscription not found or inactive: chat_id={chat_id}, tag='{tag}'")]
    SubscriptionGone { chat_id: i64, tag: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
