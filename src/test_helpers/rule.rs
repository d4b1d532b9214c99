use std::time::Duration;

use crate::models::{AlertCategory, AlertRule, AlertSeverity, SupplyKind};

/// Builder for [`AlertRule`] fixtures.
pub struct RuleBuilder {
    rule: AlertRule,
}

impl RuleBuilder {
    /// Creates a builder for an enabled supply-low rule with no thresholds
    /// set (the evaluator defaults apply).
    pub fn new(name: &str) -> Self {
        Self {
            rule: AlertRule {
                name: name.to_string(),
                category: AlertCategory::SupplyLow,
                severity: AlertSeverity::Warning,
                supply_kind: None,
                warning_threshold: None,
                critical_threshold: None,
                hysteresis: None,
                dedup_window: Duration::from_secs(30 * 60),
                device_id: None,
                site: None,
                enabled: true,
            },
        }
    }

    /// Sets both thresholds.
    pub fn thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.rule.warning_threshold = Some(warning);
        self.rule.critical_threshold = Some(critical);
        self
    }

    /// Sets the hysteresis margin.
    pub fn hysteresis(mut self, margin: f64) -> Self {
        self.rule.hysteresis = Some(margin);
        self
    }

    /// Scopes the rule to one supply kind.
    pub fn supply_kind(mut self, kind: SupplyKind) -> Self {
        self.rule.supply_kind = Some(kind);
        self
    }

    /// Scopes the rule to one device.
    pub fn device(mut self, device_id: &str) -> Self {
        self.rule.device_id = Some(device_id.to_string());
        self
    }

    /// Scopes the rule to one site.
    pub fn site(mut self, site: &str) -> Self {
        self.rule.site = Some(site.to_string());
        self
    }

    /// Sets the rule category.
    pub fn category(mut self, category: AlertCategory) -> Self {
        self.rule.category = category;
        self
    }

    /// Sets the default severity.
    pub fn severity(mut self, severity: AlertSeverity) -> Self {
        self.rule.severity = severity;
        self
    }

    /// Sets the deduplication window.
    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.rule.dedup_window = window;
        self
    }

    /// Disables the rule.
    pub fn disabled(mut self) -> Self {
        self.rule.enabled = false;
        self
    }

    /// Builds the rule.
    pub fn build(self) -> AlertRule {
        self.rule
    }
}
