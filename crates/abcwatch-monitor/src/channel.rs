//! Outbound delivery channel boundary.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
}

/// Where notification messages go.
///
/// Failures are per-recipient: the scheduler catches a send error for one
/// subscriber and keeps processing the rest.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), DeliveryError>;
}

/// Telegram Bot API adapter: `sendMessage` with MarkdownV2 bodies.
pub struct TelegramChannel {
    client: reqwest::Client,
    // Full sendMessage URL; contains the bot token, so it must never be logged.
    send_url: String,
}

impl TelegramChannel {
    /// # Errors
    ///
    /// Returns [`DeliveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_base: &str, bot_token: &str, timeout_secs: u64) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            send_url: format!(
                "{}/bot{bot_token}/sendMessage",
                api_base.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&serde_json::json!({
                "chat_id": recipient_id,
                "text": text,
                "parse_mode": "MarkdownV2",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description,
            });
        }
        Ok(())
    }
}
