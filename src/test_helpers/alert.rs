use chrono::Utc;

use crate::models::{Alert, AlertCategory, AlertKey, AlertSeverity, SupplyKind};

/// Builder for [`Alert`] fixtures.
pub struct AlertBuilder {
    alert: Alert,
}

impl AlertBuilder {
    /// Creates a builder for a supply-low alert on a device.
    pub fn new(device_id: &str, kind: SupplyKind) -> Self {
        Self {
            alert: Alert::new(
                AlertKey::supply(device_id, kind),
                AlertSeverity::Warning,
                format!("{} supply low on {}", kind, device_id),
                format!("{} level is low", kind),
                None,
                Some(15.0),
                Some(25.0),
                Utc::now(),
            ),
        }
    }

    /// Creates a builder for a device-offline alert.
    pub fn offline(device_id: &str) -> Self {
        Self {
            alert: Alert::new(
                AlertKey::device(device_id, AlertCategory::DeviceOffline),
                AlertSeverity::Critical,
                format!("{} is offline", device_id),
                "Device did not respond to a supply poll".to_string(),
                None,
                None,
                None,
                Utc::now(),
            ),
        }
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: AlertSeverity) -> Self {
        self.alert.severity = severity;
        self
    }

    /// Sets the site.
    pub fn site(mut self, site: &str) -> Self {
        self.alert.site = Some(site.to_string());
        self
    }

    /// Sets the current level and triggering threshold.
    pub fn level(mut self, current: f64, threshold: f64) -> Self {
        self.alert.current_level = Some(current);
        self.alert.threshold = Some(threshold);
        self
    }

    /// Sets the occurrence count.
    pub fn occurrences(mut self, count: u32) -> Self {
        self.alert.occurrence_count = count;
        self
    }

    /// Builds the alert.
    pub fn build(self) -> Alert {
        self.alert
    }
}
