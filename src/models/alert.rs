//! Alerts, alert rules and the composite key that deduplicates them.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supply::SupplyKind;
use crate::config::{deserialize_duration_from_seconds, serialize_duration_to_seconds};

/// Alert severity, ordered so that escalation can be expressed as `>`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational, no action required.
    Info,
    /// A supply or device needs attention soon.
    Warning,
    /// A supply or device needs immediate attention.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// The category of condition an alert reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// A consumable supply dropped below a threshold.
    SupplyLow,
    /// The device did not respond to a poll.
    DeviceOffline,
    /// The device reported an error condition.
    DeviceError,
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertCategory::SupplyLow => "supply_low",
            AlertCategory::DeviceOffline => "device_offline",
            AlertCategory::DeviceError => "device_error",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle status of an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Raised and not yet handled.
    Active,
    /// Seen by an operator; persists until explicitly resolved.
    Acknowledged,
    /// Closed; a later match starts a new occurrence chain.
    Resolved,
}

/// Composite key identifying the condition an alert tracks.
///
/// At most one Active/Acknowledged alert exists per key at any time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AlertKey {
    /// The device the alert belongs to.
    pub device_id: String,
    /// The condition category.
    pub category: AlertCategory,
    /// The supply kind, for supply-level alerts.
    pub supply_kind: Option<SupplyKind>,
}

impl AlertKey {
    /// Builds a key for a supply-level condition.
    pub fn supply(device_id: impl Into<String>, kind: SupplyKind) -> Self {
        Self {
            device_id: device_id.into(),
            category: AlertCategory::SupplyLow,
            supply_kind: Some(kind),
        }
    }

    /// Builds a key for a device-level condition.
    pub fn device(device_id: impl Into<String>, category: AlertCategory) -> Self {
        Self {
            device_id: device_id.into(),
            category,
            supply_kind: None,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.supply_kind {
            Some(kind) => write!(f, "{}_{}_{}", self.device_id, self.category, kind),
            None => write!(f, "{}_{}", self.device_id, self.category),
        }
    }
}

/// An alert raised by the evaluation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// Unique identifier for this occurrence chain.
    pub id: Uuid,
    /// The deduplication key.
    pub key: AlertKey,
    /// Severity at the most recent occurrence.
    pub severity: AlertSeverity,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Short human-readable title.
    pub title: String,
    /// Longer description of the condition.
    pub description: String,
    /// Site of the device, for recipient scoping.
    pub site: Option<String>,
    /// Supply level at the most recent occurrence, if applicable.
    pub current_level: Option<f64>,
    /// The threshold that triggered the alert, if applicable.
    pub threshold: Option<f64>,
    /// When the condition was first observed.
    pub first_occurrence: DateTime<Utc>,
    /// When the condition was most recently observed.
    pub last_occurrence: DateTime<Utc>,
    /// How many times the condition matched while deduplicated.
    pub occurrence_count: u32,
    /// Who acknowledged the alert, if anyone.
    pub acknowledged_by: Option<String>,
    /// Who resolved the alert, if anyone.
    pub resolved_by: Option<String>,
}

impl Alert {
    /// Creates a fresh Active alert with a single occurrence.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: AlertKey,
        severity: AlertSeverity,
        title: String,
        description: String,
        site: Option<String>,
        current_level: Option<f64>,
        threshold: Option<f64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            severity,
            status: AlertStatus::Active,
            title,
            description,
            site,
            current_level,
            threshold,
            first_occurrence: now,
            last_occurrence: now,
            occurrence_count: 1,
            acknowledged_by: None,
            resolved_by: None,
        }
    }
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_enabled() -> bool {
    true
}

/// A rule the evaluation engine matches supply readings and device states
/// against.
///
/// Device-specific rules take priority over general rules for the same supply
/// kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    /// Unique rule name.
    pub name: String,
    /// The condition category this rule detects.
    pub category: AlertCategory,
    /// Severity assigned when thresholds are not the deciding factor.
    pub severity: AlertSeverity,
    /// Restricts the rule to one supply kind; `None` matches any.
    #[serde(default)]
    pub supply_kind: Option<SupplyKind>,
    /// Level at or below which a Warning is raised.
    #[serde(default)]
    pub warning_threshold: Option<f64>,
    /// Level at or below which a Critical is raised.
    #[serde(default)]
    pub critical_threshold: Option<f64>,
    /// Margin applied to thresholds to dampen flapping near a boundary.
    #[serde(default)]
    pub hysteresis: Option<f64>,
    /// Matches within this window update the existing alert instead of
    /// creating a new one. Seconds.
    #[serde(
        default = "default_dedup_window",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub dedup_window: Duration,
    /// Restricts the rule to one device; `None` matches any.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Restricts the rule to one site; `None` matches any.
    #[serde(default)]
    pub site: Option<String>,
    /// Whether the rule participates in evaluation.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AlertRule {
    /// Default warning threshold when a rule does not set one.
    pub const DEFAULT_WARNING: f64 = 25.0;
    /// Default critical threshold when a rule does not set one.
    pub const DEFAULT_CRITICAL: f64 = 10.0;
    /// Default hysteresis margin when a rule does not set one.
    pub const DEFAULT_HYSTERESIS: f64 = 2.0;
}
