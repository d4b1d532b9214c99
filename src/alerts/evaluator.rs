//! The alert evaluation engine: rule selection, threshold evaluation with
//! hysteresis, and the deduplication state machine.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::AlertStore;
use crate::models::{
    Alert, AlertCategory, AlertKey, AlertRule, AlertSeverity, AlertStatus, MonitoredDevice,
    SupplyReading,
};

/// Whether an evaluation raised a fresh alert or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventKind {
    /// A new alert (fresh occurrence chain) was created.
    Raised,
    /// An existing alert was updated within its deduplication window.
    Updated,
}

/// The outcome of an evaluation that matched a rule.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// The alert after the evaluation was applied.
    pub alert: Alert,
    /// Whether the alert is new or an update.
    pub kind: AlertEventKind,
}

/// The inputs for evaluating one supply reading.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    /// The device the reading came from.
    pub device: &'a MonitoredDevice,
    /// The current reading.
    pub reading: &'a SupplyReading,
    /// The previous reading's percent level, if one exists.
    pub previous_percent: Option<f64>,
}

/// Filters for querying the active-alert set.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Restrict to alerts from devices at this site.
    pub site: Option<String>,
    /// Restrict to alerts from this device.
    pub device_id: Option<String>,
    /// Restrict to alerts at or above this severity.
    pub min_severity: Option<AlertSeverity>,
}

/// Evaluates supply readings and device states against the rule set, owning
/// the deduplication state machine.
///
/// All mutations for one [`AlertKey`] are serialized through a per-key lock,
/// so devices can be evaluated concurrently within an orchestrator tick.
pub struct AlertEvaluator<S: AlertStore> {
    store: Arc<S>,
    rules: ArcSwap<Vec<AlertRule>>,
    key_locks: DashMap<AlertKey, Arc<Mutex<()>>>,
}

impl<S: AlertStore> AlertEvaluator<S> {
    /// Creates an evaluator over `store` with an initial rule set.
    pub fn new(store: Arc<S>, rules: Vec<AlertRule>) -> Self {
        Self {
            store,
            rules: ArcSwap::from_pointee(rules),
            key_locks: DashMap::new(),
        }
    }

    /// Replaces the entire rule set atomically.
    pub fn update_rules(&self, rules: Vec<AlertRule>) {
        self.rules.store(Arc::new(rules));
    }

    /// Inserts or replaces one rule by name.
    pub fn upsert_rule(&self, rule: AlertRule) {
        let mut rules: Vec<AlertRule> = self.rules.load().as_ref().clone();
        match rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        self.rules.store(Arc::new(rules));
    }

    /// Removes one rule by name. Returns whether it existed.
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules: Vec<AlertRule> = self.rules.load().as_ref().clone();
        let before = rules.len();
        rules.retain(|r| r.name != name);
        let removed = rules.len() != before;
        if removed {
            self.rules.store(Arc::new(rules));
        }
        removed
    }

    /// Returns the current rule set.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.load().as_ref().clone()
    }

    /// Evaluates one supply reading, returning zero or one alert event.
    ///
    /// Readings without a normalized percent are skipped: there is nothing to
    /// compare against a threshold.
    pub async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<AlertEvent> {
        let percent = ctx.reading.percent?;

        let rule = self.select_supply_rule(ctx.device, ctx.reading)?;

        let mut warn = rule.warning_threshold.unwrap_or(AlertRule::DEFAULT_WARNING);
        let mut crit = rule.critical_threshold.unwrap_or(AlertRule::DEFAULT_CRITICAL);
        let hysteresis = rule.hysteresis.unwrap_or(AlertRule::DEFAULT_HYSTERESIS);

        // Thresholds widen while the level is trending down. This advances
        // alert onset rather than damping recovery flapping; kept as observed
        // behavior pending product-owner confirmation.
        if let Some(previous) = ctx.previous_percent {
            if previous > percent {
                warn += hysteresis;
                crit += hysteresis;
            }
        }

        let (severity, threshold) = if percent <= crit {
            (AlertSeverity::Critical, crit)
        } else if percent <= warn {
            (AlertSeverity::Warning, warn)
        } else {
            return None;
        };

        let key = AlertKey::supply(&ctx.device.id, ctx.reading.kind);
        let title = format!("{} supply low on {}", ctx.reading.kind, ctx.device.name);
        let description = format!(
            "{} level on {} is {:.1}% (threshold {:.1}%)",
            ctx.reading.kind, ctx.device.name, percent, threshold
        );

        let event = self
            .apply_match(
                key,
                &rule,
                severity,
                title,
                description,
                ctx.device.site.clone(),
                Some(percent),
                Some(threshold),
            )
            .await;
        Some(event)
    }

    /// Evaluates a device-level condition (offline/error) against the rule
    /// set, using the same deduplication mechanics without a supply context.
    pub async fn evaluate_device(
        &self,
        device: &MonitoredDevice,
        category: AlertCategory,
        description: &str,
    ) -> Option<AlertEvent> {
        let rule = self.select_device_rule(device, category)?;

        let key = AlertKey::device(&device.id, category);
        let title = match category {
            AlertCategory::DeviceOffline => format!("{} is offline", device.name),
            AlertCategory::DeviceError => format!("{} reported an error", device.name),
            AlertCategory::SupplyLow => return None,
        };

        let event = self
            .apply_match(
                key,
                &rule,
                rule.severity,
                title,
                description.to_string(),
                device.site.clone(),
                None,
                None,
            )
            .await;
        Some(event)
    }

    /// Transitions an Active alert to Acknowledged. No-op for any other
    /// status. Returns whether the transition happened.
    pub async fn acknowledge(&self, alert_id: Uuid, who: &str) -> bool {
        let Some(alert) = self.store.get_by_id(alert_id).await else {
            return false;
        };

        let lock = self.key_lock(&alert.key);
        let _guard = lock.lock().await;

        // Re-read under the lock; the alert may have changed.
        let Some(mut alert) = self.store.get_by_id(alert_id).await else {
            return false;
        };
        if alert.status != AlertStatus::Active {
            return false;
        }

        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged_by = Some(who.to_string());
        tracing::info!(alert = %alert.key, by = who, "Alert acknowledged.");
        self.store.upsert(alert).await;
        true
    }

    /// Transitions any non-Resolved alert to Resolved and removes it from the
    /// active set, so a later match starts a new occurrence chain.
    pub async fn resolve(&self, alert_id: Uuid, who: &str) -> Option<Alert> {
        let alert = self.store.get_by_id(alert_id).await?;

        let lock = self.key_lock(&alert.key);
        let _guard = lock.lock().await;

        let mut alert = self.store.remove(&alert.key).await?;
        alert.status = AlertStatus::Resolved;
        alert.resolved_by = Some(who.to_string());
        tracing::info!(alert = %alert.key, by = who, "Alert resolved.");
        Some(alert)
    }

    /// Returns active and acknowledged alerts matching the query.
    pub async fn active_alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .store
            .all()
            .await
            .into_iter()
            .filter(|alert| {
                query
                    .site
                    .as_ref()
                    .map(|site| alert.site.as_ref() == Some(site))
                    .unwrap_or(true)
                    && query
                        .device_id
                        .as_ref()
                        .map(|id| &alert.key.device_id == id)
                        .unwrap_or(true)
                    && query
                        .min_severity
                        .map(|min| alert.severity >= min)
                        .unwrap_or(true)
            })
            .collect();
        alerts.sort_by(|a, b| b.last_occurrence.cmp(&a.last_occurrence));
        alerts
    }

    /// Selects the rule governing a supply reading: device-specific rules
    /// take priority over site/global rules for the same supply kind.
    fn select_supply_rule(
        &self,
        device: &MonitoredDevice,
        reading: &SupplyReading,
    ) -> Option<AlertRule> {
        let rules = self.rules.load();
        let mut candidates: Vec<&AlertRule> = rules
            .iter()
            .filter(|rule| {
                rule.enabled
                    && rule.category == AlertCategory::SupplyLow
                    && rule
                        .supply_kind
                        .map(|kind| kind == reading.kind)
                        .unwrap_or(true)
                    && rule
                        .device_id
                        .as_ref()
                        .map(|id| id == &device.id)
                        .unwrap_or(true)
                    && rule
                        .site
                        .as_ref()
                        .map(|site| device.site.as_ref() == Some(site))
                        .unwrap_or(true)
            })
            .collect();

        candidates.sort_by_key(|rule| match (&rule.device_id, &rule.site) {
            (Some(_), _) => 0,
            (None, Some(_)) => 1,
            (None, None) => 2,
        });
        candidates.first().map(|rule| (*rule).clone())
    }

    fn select_device_rule(
        &self,
        device: &MonitoredDevice,
        category: AlertCategory,
    ) -> Option<AlertRule> {
        let rules = self.rules.load();
        let mut candidates: Vec<&AlertRule> = rules
            .iter()
            .filter(|rule| {
                rule.enabled
                    && rule.category == category
                    && rule
                        .device_id
                        .as_ref()
                        .map(|id| id == &device.id)
                        .unwrap_or(true)
                    && rule
                        .site
                        .as_ref()
                        .map(|site| device.site.as_ref() == Some(site))
                        .unwrap_or(true)
            })
            .collect();

        candidates.sort_by_key(|rule| match (&rule.device_id, &rule.site) {
            (Some(_), _) => 0,
            (None, Some(_)) => 1,
            (None, None) => 2,
        });
        candidates.first().map(|rule| (*rule).clone())
    }

    /// Applies a rule match to the deduplication state machine.
    ///
    /// Within the rule's window an existing alert is updated in place:
    /// occurrence count bumped, level and timestamp refreshed, severity
    /// allowed to escalate but never de-escalate. Outside the window the old
    /// alert is discarded and a fresh one created. Acknowledged alerts are
    /// always updated in place; they persist until explicitly resolved.
    #[allow(clippy::too_many_arguments)]
    async fn apply_match(
        &self,
        key: AlertKey,
        rule: &AlertRule,
        severity: AlertSeverity,
        title: String,
        description: String,
        site: Option<String>,
        current_level: Option<f64>,
        threshold: Option<f64>,
    ) -> AlertEvent {
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let now = Utc::now();

        if let Some(mut existing) = self.store.get(&key).await {
            let within_window = now
                .signed_duration_since(existing.last_occurrence)
                .to_std()
                .map(|elapsed| elapsed < rule.dedup_window)
                .unwrap_or(true);

            if within_window || existing.status == AlertStatus::Acknowledged {
                existing.occurrence_count += 1;
                existing.last_occurrence = now;
                existing.current_level = current_level;
                existing.threshold = threshold;
                existing.description = description;
                if severity > existing.severity {
                    existing.severity = severity;
                }

                tracing::debug!(
                    alert = %key,
                    occurrences = existing.occurrence_count,
                    "Updated existing alert within deduplication window."
                );
                self.store.upsert(existing.clone()).await;
                return AlertEvent {
                    alert: existing,
                    kind: AlertEventKind::Updated,
                };
            }

            // Window expired: the old occurrence chain ends here.
            self.store.remove(&key).await;
        }

        let alert = Alert::new(
            key.clone(),
            severity,
            title,
            description,
            site,
            current_level,
            threshold,
            now,
        );
        tracing::info!(alert = %key, severity = %severity, "Raised alert.");
        self.store.upsert(alert.clone()).await;

        AlertEvent {
            alert,
            kind: AlertEventKind::Raised,
        }
    }

    fn key_lock(&self, key: &AlertKey) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
