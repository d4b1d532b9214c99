use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    deserialize_duration_from_seconds, DiscoverySettings, DispatchSettings, ForecastSettings,
    HttpRetryConfig, MonitoringSettings,
};

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_event_channel_capacity() -> u32 {
    1024
}

/// Application configuration for printwatch.
///
/// Loaded from `app.yaml` in the configuration directory, with environment
/// overrides under the `PRINTWATCH` prefix. Rule, recipient and template
/// collections live in sibling YAML files whose paths are derived from the
/// same directory.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Network discovery settings.
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Supply polling settings.
    #[serde(default)]
    pub monitoring: MonitoringSettings,

    /// Notification dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Depletion forecast settings.
    #[serde(default)]
    pub forecast: ForecastSettings,

    /// Retry policy for outbound HTTP senders.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// Capacity of the monitor-event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: u32,

    /// Path to the alert-rule configuration file.
    #[serde(skip_deserializing)]
    pub rule_config_path: PathBuf,

    /// Path to the notification-recipient configuration file.
    #[serde(skip_deserializing)]
    pub recipient_config_path: PathBuf,

    /// Path to the notification-template configuration file.
    #[serde(skip_deserializing)]
    pub template_config_path: PathBuf,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("PRINTWATCH").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;

        let config_path = Path::new(config_dir_str);
        config.rule_config_path = config_path.join("rules.yaml");
        config.recipient_config_path = config_path.join("recipients.yaml");
        config.template_config_path = config_path.join("templates.yaml");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, content: &str) {
        let path = dir.path().join("app.yaml");
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn loads_defaults_from_minimal_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
discovery:
  ip_range: "192.168.1.0/24"
"#,
        );

        let config = AppConfig::new(dir.path().to_str()).unwrap();

        assert_eq!(config.discovery.ip_range, "192.168.1.0/24");
        assert_eq!(config.discovery.max_concurrent_scans, 50);
        assert_eq!(config.monitoring.poll_interval, Duration::from_secs(300));
        assert_eq!(config.dispatch.max_retries, 3);
        assert_eq!(config.forecast.ewma_alpha, 0.3);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.rule_config_path.ends_with("rules.yaml"));
    }

    #[test]
    fn overrides_nested_settings() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
discovery:
  ip_range: "10.0.0.1-20"
  scan_timeout: 1500
  max_concurrent_scans: 8
dispatch:
  max_retries: 5
  retry_delay: 1
forecast:
  confidence_level: 0.99
"#,
        );

        let config = AppConfig::new(dir.path().to_str()).unwrap();

        assert_eq!(config.discovery.scan_timeout, Duration::from_millis(1500));
        assert_eq!(config.discovery.max_concurrent_scans, 8);
        assert_eq!(config.dispatch.max_retries, 5);
        assert_eq!(config.dispatch.retry_delay, Duration::from_secs(1));
        assert_eq!(config.forecast.confidence_level, 0.99);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = AppConfig::new(Some("/nonexistent/config/dir"));
        assert!(result.is_err());
    }
}
