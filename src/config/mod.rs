//! Configuration module for printwatch.

mod app_config;
mod discovery;
mod dispatch;
mod forecast;
mod helpers;
mod http_retry;
pub mod loader;
mod monitoring;

pub use app_config::AppConfig;
pub use discovery::DiscoverySettings;
pub use dispatch::DispatchSettings;
pub use forecast::ForecastSettings;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use monitoring::MonitoringSettings;
