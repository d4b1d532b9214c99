//! Generic configuration loader for loading items from a YAML file.

use std::{collections::HashSet, fs, path::PathBuf};

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{AlertRule, NotificationRecipient, NotificationTemplate};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Error when reading the configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when parsing the configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// Error when the configuration file format is unsupported.
    #[error("Unsupported configuration format")]
    UnsupportedFormat,

    /// Error when loaded items fail validation.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A generic loader for YAML collection files.
///
/// The `key` passed to [`ConfigLoader::load`] names the top-level key holding
/// the list of items (e.g. `rules`, `recipients`, `templates`).
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new `ConfigLoader`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads a vector of items from the YAML file.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, LoaderError> {
        if !self.is_yaml_file() {
            return Err(LoaderError::UnsupportedFormat);
        }

        let config_str = fs::read_to_string(&self.path)?;

        let config = Config::builder()
            .add_source(File::from_str(&config_str, FileFormat::Yaml))
            .build()?;

        let items = config.get(key)?;

        Ok(items)
    }

    fn is_yaml_file(&self) -> bool {
        matches!(
            self.path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        )
    }
}

/// Loads and validates alert rules from a YAML file.
pub fn load_rules(path: PathBuf) -> Result<Vec<AlertRule>, LoaderError> {
    let rules: Vec<AlertRule> = ConfigLoader::new(path).load("rules")?;

    let mut seen = HashSet::new();
    for rule in &rules {
        if !seen.insert(rule.name.clone()) {
            return Err(LoaderError::ValidationError(format!(
                "Duplicate rule name '{}'",
                rule.name
            )));
        }
        if let (Some(warn), Some(crit)) = (rule.warning_threshold, rule.critical_threshold) {
            if crit > warn {
                return Err(LoaderError::ValidationError(format!(
                    "Rule '{}': critical threshold {} exceeds warning threshold {}",
                    rule.name, crit, warn
                )));
            }
        }
    }

    Ok(rules)
}

/// Loads and validates notification recipients from a YAML file.
pub fn load_recipients(path: PathBuf) -> Result<Vec<NotificationRecipient>, LoaderError> {
    let recipients: Vec<NotificationRecipient> = ConfigLoader::new(path).load("recipients")?;

    for recipient in &recipients {
        if recipient.address.trim().is_empty() {
            return Err(LoaderError::ValidationError(format!(
                "Recipient '{}' has an empty address",
                recipient.id
            )));
        }
    }

    Ok(recipients)
}

/// Loads notification templates from a YAML file.
pub fn load_templates(path: PathBuf) -> Result<Vec<NotificationTemplate>, LoaderError> {
    ConfigLoader::new(path).load("templates")
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::TempDir;

    use super::*;

    fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
        let path = dir.path().join(filename);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn load_rules_success() {
        let dir = TempDir::new().unwrap();
        let content = r#"
rules:
  - name: "toner-low"
    category: supply_low
    severity: warning
    warning_threshold: 25.0
    critical_threshold: 10.0
  - name: "black-toner"
    category: supply_low
    severity: critical
    supply_kind: black
    device_id: "printer-7"
"#;
        let path = create_test_file(&dir, "rules.yaml", content);
        let rules = load_rules(path).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "toner-low");
        assert_eq!(rules[1].device_id.as_deref(), Some("printer-7"));
    }

    #[test]
    fn load_rules_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let content = r#"
rules:
  - name: "toner-low"
    category: supply_low
    severity: warning
  - name: "toner-low"
    category: supply_low
    severity: critical
"#;
        let path = create_test_file(&dir, "rules.yaml", content);
        let result = load_rules(path);

        assert!(matches!(result, Err(LoaderError::ValidationError(_))));
    }

    #[test]
    fn load_rules_rejects_inverted_thresholds() {
        let dir = TempDir::new().unwrap();
        let content = r#"
rules:
  - name: "inverted"
    category: supply_low
    severity: warning
    warning_threshold: 10.0
    critical_threshold: 25.0
"#;
        let path = create_test_file(&dir, "rules.yaml", content);
        let result = load_rules(path);

        assert!(matches!(result, Err(LoaderError::ValidationError(_))));
    }

    #[test]
    fn load_recipients_rejects_empty_address() {
        let dir = TempDir::new().unwrap();
        let content = r#"
recipients:
  - id: "ops"
    channel: email
    address: "  "
"#;
        let path = create_test_file(&dir, "recipients.yaml", content);
        let result = load_recipients(path);

        assert!(matches!(result, Err(LoaderError::ValidationError(_))));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "rules.json", "{}");
        let result = load_rules(path);

        assert!(matches!(result, Err(LoaderError::UnsupportedFormat)));
    }
}
