//! Outbound notification messages and their status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    alert::{Alert, AlertCategory, AlertSeverity},
    recipient::{NotificationChannel, NotificationRecipient},
};

/// Delivery status of a notification message.
///
/// Transitions: `Pending → Sending → {Sent | Failed}`; a `Failed` message
/// below the retry cap goes back through `Sending`; `Skipped` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Created, not yet attempted (or deferred by a rate limit).
    Pending,
    /// A send attempt is in flight.
    Sending,
    /// Delivered successfully.
    Sent,
    /// The last attempt failed; may retry if below the cap.
    Failed,
    /// Suppressed by quiet hours; never sent, never retried.
    Skipped,
    /// Withdrawn before delivery.
    Cancelled,
}

/// A rendered notification bound to one alert and one recipient.
///
/// Alert context (device, site, severity, category) is denormalized onto the
/// message so retry sweeps and history logging work after the alert itself
/// has moved on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// The alert this message reports.
    pub alert_id: Uuid,
    /// The device the alert belongs to.
    pub device_id: String,
    /// Site of the device, for quiet-hours fallback.
    pub site: Option<String>,
    /// Alert severity at render time.
    pub severity: AlertSeverity,
    /// Alert category.
    pub category: AlertCategory,
    /// The recipient this message is addressed to.
    pub recipient_id: String,
    /// Delivery channel.
    pub channel: NotificationChannel,
    /// Channel-specific destination address.
    pub address: String,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Current delivery status.
    pub status: MessageStatus,
    /// Number of failed send attempts so far.
    pub retry_count: u32,
    /// Earliest time the next retry may run, when status is `Failed`.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// When the message was delivered, if it was.
    pub sent_at: Option<DateTime<Utc>>,
    /// The error from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl NotificationMessage {
    /// Creates a new `Pending` message for an alert/recipient pair.
    pub fn new(
        alert: &Alert,
        recipient: &NotificationRecipient,
        subject: String,
        body: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id: alert.id,
            device_id: alert.key.device_id.clone(),
            site: alert.site.clone(),
            severity: alert.severity,
            category: alert.key.category,
            recipient_id: recipient.id.clone(),
            channel: recipient.channel,
            address: recipient.address.clone(),
            subject,
            body,
            status: MessageStatus::Pending,
            retry_count: 0,
            next_retry_at: None,
            created_at: Utc::now(),
            sent_at: None,
            last_error: None,
        }
    }

    /// The rate-limit tracking key for this message's recipient/channel pair.
    pub fn rate_limit_key(&self) -> String {
        format!("{}_{}", self.recipient_id, self.channel)
    }

    /// Whether the message has reached a state the dispatcher will not act on
    /// again.
    pub fn is_terminal(&self, max_retries: u32) -> bool {
        match self.status {
            MessageStatus::Sent | MessageStatus::Skipped | MessageStatus::Cancelled => true,
            MessageStatus::Failed => self.retry_count >= max_retries,
            MessageStatus::Pending | MessageStatus::Sending => false,
        }
    }
}
