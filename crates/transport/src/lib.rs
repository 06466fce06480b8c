//! Delivery transport for rendered messages.
//!
//! The engine is generic over [`Transport`], so tests can substitute an
//! in-memory double. The production implementation is
//! [`TelegramTransport`], which calls the Bot API over HTTPS.

use std::future::Future;

use thiserror::Error;

pub mod format;
pub mod telegram;

pub use telegram::TelegramTransport;

/// Delivery failure. The reasons are opaque to the engine: every variant
/// means "stop this subscription's pass and retry on the next tick".
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// A channel that can push a rendered message to a chat.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
