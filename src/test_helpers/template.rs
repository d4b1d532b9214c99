use crate::models::{AlertCategory, AlertSeverity, NotificationChannel, NotificationTemplate};

/// Builder for [`NotificationTemplate`] fixtures.
pub struct TemplateBuilder {
    template: NotificationTemplate,
}

impl TemplateBuilder {
    /// Creates a builder for an enabled template with token-passthrough
    /// subject and body.
    pub fn new(name: &str, channel: NotificationChannel) -> Self {
        Self {
            template: NotificationTemplate {
                name: name.to_string(),
                channel,
                category: None,
                min_severity: None,
                subject: "{{alert.title}}".to_string(),
                body: "{{alert.description}}".to_string(),
                enabled: true,
            },
        }
    }

    /// Restricts the template to one category.
    pub fn category(mut self, category: AlertCategory) -> Self {
        self.template.category = Some(category);
        self
    }

    /// Sets the minimum severity filter.
    pub fn min_severity(mut self, severity: AlertSeverity) -> Self {
        self.template.min_severity = Some(severity);
        self
    }

    /// Sets the subject template.
    pub fn subject(mut self, subject: &str) -> Self {
        self.template.subject = subject.to_string();
        self
    }

    /// Sets the body template.
    pub fn body(mut self, body: &str) -> Self {
        self.template.body = body.to_string();
        self
    }

    /// Disables the template.
    pub fn disabled(mut self) -> Self {
        self.template.enabled = false;
        self
    }

    /// Builds the template.
    pub fn build(self) -> NotificationTemplate {
        self.template
    }
}
