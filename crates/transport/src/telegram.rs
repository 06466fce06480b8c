//! Telegram Bot API transport.

use std::time::Duration;

use serde::Deserialize;

use crate::{Transport, TransportError};

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramTransport {
    client: reqwest::Client,
    send_message_url: String,
}

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramTransport {
    pub fn new(bot_token: &str) -> Self {
        Self::with_base_url(API_BASE, bot_token)
    }

    /// Point the transport at a different API host (self-hosted Bot API
    /// servers, or a stub in tests).
    pub fn with_base_url(base_url: &str, bot_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            send_message_url: format!(
                "{}/bot{}/sendMessage",
                base_url.trim_end_matches('/'),
                bot_token
            ),
        }
    }
}

impl Transport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.send_message_url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{status}: {detail}")));
        }

        let body: ApiResponse = response.json().await?;
        if !body.ok {
            return Err(TransportError::Rejected(
                body.description
                    .unwrap_or_else(|| "unknown API error".to_string()),
            ));
        }

        tracing::debug!(chat_id, "Message delivered");
        Ok(())
    }
}
