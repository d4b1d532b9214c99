use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_poll_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_timeout() -> Duration {
    Duration::from_millis(10_000)
}

/// Settings for the supply polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// How often devices are polled for supply levels, in seconds.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub poll_interval: Duration,

    /// Timeout for a single device poll, in milliseconds.
    #[serde(
        default = "default_poll_timeout",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub poll_timeout: Duration,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            poll_timeout: default_poll_timeout(),
        }
    }
}
