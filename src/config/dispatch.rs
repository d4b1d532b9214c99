use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use super::deserialize_duration_from_seconds;

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_rate_limit_window() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_notifications_per_window() -> u32 {
    10
}

fn default_queue_sweep_interval() -> Duration {
    Duration::from_secs(30)
}

/// Settings governing notification dispatch: retry policy, rate limiting and
/// site-level quiet hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Maximum number of send retries before a message fails permanently.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in seconds.
    #[serde(
        default = "default_retry_delay",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub retry_delay: Duration,

    /// Width of the sliding rate-limit window, in seconds.
    #[serde(
        default = "default_rate_limit_window",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub rate_limit_window: Duration,

    /// Maximum successful sends per recipient/channel within the window.
    #[serde(default = "default_max_notifications_per_window")]
    pub max_notifications_per_window: u32,

    /// How often the pending-message queue is swept, in seconds.
    #[serde(
        default = "default_queue_sweep_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub queue_sweep_interval: Duration,

    /// Per-site quiet-hours configuration. Values are JSON-encoded lists of
    /// weekday-scoped time ranges, e.g.
    /// `[{"weekdays":["Sat","Sun"],"start":"00:00:00","end":"23:59:00","enabled":true}]`.
    #[serde(default)]
    pub site_quiet_hours: HashMap<String, String>,

    /// Telegram bot token used by the built-in Telegram sender, if any.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            rate_limit_window: default_rate_limit_window(),
            max_notifications_per_window: default_max_notifications_per_window(),
            queue_sweep_interval: default_queue_sweep_interval(),
            site_quiet_hours: HashMap::new(),
            telegram_bot_token: None,
        }
    }
}
