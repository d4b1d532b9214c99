//! Notification recipients and channels.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::alert::{AlertCategory, AlertSeverity};

/// A delivery channel for notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    /// Email delivery.
    Email,
    /// Telegram bot message.
    Telegram,
    /// Generic HTTP webhook.
    Webhook,
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Telegram => "telegram",
            NotificationChannel::Webhook => "webhook",
        };
        write!(f, "{}", name)
    }
}

fn default_enabled() -> bool {
    true
}

/// Someone (or something) that receives notifications for matching alerts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecipient {
    /// Unique recipient identifier.
    pub id: String,
    /// The channel messages are delivered on.
    pub channel: NotificationChannel,
    /// Channel-specific address: email address, chat id or webhook URL.
    pub address: String,
    /// Restricts delivery to alerts from one site; `None` matches any.
    #[serde(default)]
    pub site: Option<String>,
    /// Minimum severity the recipient wants to hear about.
    #[serde(default)]
    pub min_severity: Option<AlertSeverity>,
    /// Categories the recipient wants to hear about; `None` matches any.
    #[serde(default)]
    pub categories: Option<Vec<AlertCategory>>,
    /// Start of the recipient's quiet-hours window.
    #[serde(default)]
    pub quiet_start: Option<NaiveTime>,
    /// End of the recipient's quiet-hours window.
    #[serde(default)]
    pub quiet_end: Option<NaiveTime>,
    /// Weekdays the recipient is active on; `None` means every day.
    #[serde(default)]
    pub active_weekdays: Option<Vec<Weekday>>,
    /// Whether the recipient currently receives notifications.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl NotificationRecipient {
    /// The rate-limit tracking key for this recipient.
    pub fn rate_limit_key(&self) -> String {
        format!("{}_{}", self.id, self.channel)
    }
}
