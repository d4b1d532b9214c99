//! Channel senders: the delivery seam between the dispatcher and the outside
//! world.
//!
//! The webhook and Telegram senders are implemented here over the pooled,
//! retrying HTTP client; an email sender is wired in by the host process
//! through the same trait.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use thiserror::Error;

/// Errors a channel sender can report. The dispatcher decides retry policy
/// from these; senders never retry beyond their own transport middleware.
#[derive(Debug, Error)]
pub enum SendError {
    /// The destination address could not be used for this channel.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The request could not be delivered.
    #[error("Request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The remote endpoint answered with a non-success status.
    #[error("Endpoint returned status {0}")]
    Status(u16),
}

/// Delivers one rendered message to one address on one channel.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Sends `subject`/`body` to `address`.
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

/// Sends generic webhook notifications: a JSON `{title, body}` POST to the
/// recipient's URL.
pub struct WebhookSender {
    http_client: Arc<ClientWithMiddleware>,
}

impl WebhookSender {
    /// Creates a sender over a pooled HTTP client.
    pub fn new(http_client: Arc<ClientWithMiddleware>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let url: url::Url = address
            .parse()
            .map_err(|_| SendError::InvalidAddress(address.to_string()))?;

        let payload = json!({
            "title": subject,
            "body": body,
        });

        let response = self.http_client.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Sends Telegram messages through the bot API. The recipient address is the
/// chat id.
pub struct TelegramSender {
    token: String,
    http_client: Arc<ClientWithMiddleware>,
    /// Base URL override for tests; the bot API in production.
    api_base: String,
}

impl TelegramSender {
    /// Creates a sender for the given bot token.
    pub fn new(token: String, http_client: Arc<ClientWithMiddleware>) -> Self {
        Self {
            token,
            http_client,
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    /// Points the sender at a different API base.
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError> {
        if address.trim().is_empty() {
            return Err(SendError::InvalidAddress("empty chat id".to_string()));
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = json!({
            "chat_id": address,
            "text": format!("*{}*\n\n{}", subject, body),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response = self.http_client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status.as_u16()));
        }
        Ok(())
    }
}
