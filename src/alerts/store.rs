//! Storage for the active-alert set.
//!
//! The store owns the `AlertKey -> Alert` invariant: at most one
//! Active/Acknowledged alert per key. It is deliberately dumb; the evaluator
//! owns all state-machine decisions and serializes writers per key.

use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::models::{Alert, AlertKey};

/// Storage interface for active alerts, injected into the evaluation engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Returns the alert for a key, if one is active or acknowledged.
    async fn get(&self, key: &AlertKey) -> Option<Alert>;

    /// Returns the alert with the given id, if present.
    async fn get_by_id(&self, id: Uuid) -> Option<Alert>;

    /// Inserts or replaces the alert for its key.
    async fn upsert(&self, alert: Alert);

    /// Removes and returns the alert for a key.
    async fn remove(&self, key: &AlertKey) -> Option<Alert>;

    /// Returns all stored alerts.
    async fn all(&self) -> Vec<Alert>;
}

/// In-memory alert store on a concurrent map.
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: DashMap<AlertKey, Alert>,
}

impl InMemoryAlertStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn get(&self, key: &AlertKey) -> Option<Alert> {
        self.alerts.get(key).map(|entry| entry.value().clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Option<Alert> {
        self.alerts
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone())
    }

    async fn upsert(&self, alert: Alert) {
        self.alerts.insert(alert.key.clone(), alert);
    }

    async fn remove(&self, key: &AlertKey) -> Option<Alert> {
        self.alerts.remove(key).map(|(_, alert)| alert)
    }

    async fn all(&self) -> Vec<Alert> {
        self.alerts.iter().map(|entry| entry.value().clone()).collect()
    }
}
