//! Notification message templates.

use serde::{Deserialize, Serialize};

use super::{
    alert::{AlertCategory, AlertSeverity},
    recipient::NotificationChannel,
};

fn default_enabled() -> bool {
    true
}

/// A subject/body template for one notification channel.
///
/// Subject and body may reference the fixed token set: `{{alert.title}}`,
/// `{{alert.description}}`, `{{alert.severity}}`, `{{device.name}}`,
/// `{{device.location}}`, `{{device.ip}}`, `{{supply.kind}}`,
/// `{{supply.level}}`, `{{threshold}}`, `{{timestamp}}` and `{{count}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    /// Unique template name.
    pub name: String,
    /// The channel this template renders for.
    pub channel: NotificationChannel,
    /// Restricts the template to one category; `None` matches any.
    #[serde(default)]
    pub category: Option<AlertCategory>,
    /// Minimum severity this template applies to.
    #[serde(default)]
    pub min_severity: Option<AlertSeverity>,
    /// Subject line with token placeholders.
    pub subject: String,
    /// Body with token placeholders.
    pub body: String,
    /// Whether the template participates in selection.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}
