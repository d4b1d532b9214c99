//! Renders notification subject/body templates against the fixed token set.

use minijinja::Environment;
use serde_json::json;
use thiserror::Error;

use crate::models::{Alert, MonitoredDevice};

/// A service for rendering notification templates.
///
/// Undefined variables are strict errors: a template referencing a token the
/// context does not carry fails to render rather than emitting an empty
/// string.
pub struct TemplateService {
    env: Environment<'static>,
}

/// Error type for the TemplateService.
#[derive(Debug, Error)]
pub enum TemplateServiceError {
    /// An error occurred while rendering the template.
    #[error("Failed to render template")]
    RenderError(#[from] minijinja::Error),
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateService {
    /// Creates a new instance with a strict environment.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        Self { env }
    }

    /// Renders a template with the given context.
    pub fn render(
        &self,
        template_str: &str,
        context: serde_json::Value,
    ) -> Result<String, TemplateServiceError> {
        match self.env.render_str(template_str, context) {
            Ok(rendered) => Ok(rendered),
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}", template_str, e);
                Err(TemplateServiceError::RenderError(e))
            }
        }
    }
}

/// Builds the render context for an alert/device pair.
///
/// Numeric levels are pre-formatted to one decimal and the timestamp to
/// `yyyy-MM-dd HH:mm:ss`, so templates substitute tokens literally without
/// formatting filters.
pub fn message_context(alert: &Alert, device: &MonitoredDevice) -> serde_json::Value {
    let mut context = json!({
        "alert": {
            "title": alert.title,
            "description": alert.description,
            "severity": alert.severity.to_string(),
        },
        "device": {
            "name": device.name,
            "location": device.location.clone().unwrap_or_default(),
            "ip": device.address.to_string(),
        },
        "threshold": alert
            .threshold
            .map(|t| format!("{:.1}", t))
            .unwrap_or_default(),
        "timestamp": alert.last_occurrence.format("%Y-%m-%d %H:%M:%S").to_string(),
        "count": alert.occurrence_count,
    });

    if let Some(kind) = alert.key.supply_kind {
        context["supply"] = json!({
            "kind": kind.to_string(),
            "level": alert
                .current_level
                .map(|level| format!("{:.1}", level))
                .unwrap_or_default(),
        });
    }

    context
}
