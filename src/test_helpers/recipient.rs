use chrono::{NaiveTime, Weekday};

use crate::models::{AlertCategory, AlertSeverity, NotificationChannel, NotificationRecipient};

/// Builder for [`NotificationRecipient`] fixtures.
pub struct RecipientBuilder {
    recipient: NotificationRecipient,
}

impl RecipientBuilder {
    /// Creates a builder for an enabled, unfiltered email recipient.
    pub fn new(id: &str) -> Self {
        Self {
            recipient: NotificationRecipient {
                id: id.to_string(),
                channel: NotificationChannel::Email,
                address: format!("{}@example.com", id),
                site: None,
                min_severity: None,
                categories: None,
                quiet_start: None,
                quiet_end: None,
                active_weekdays: None,
                enabled: true,
            },
        }
    }

    /// Sets the channel.
    pub fn channel(mut self, channel: NotificationChannel) -> Self {
        self.recipient.channel = channel;
        self
    }

    /// Sets the address.
    pub fn address(mut self, address: &str) -> Self {
        self.recipient.address = address.to_string();
        self
    }

    /// Restricts the recipient to one site.
    pub fn site(mut self, site: &str) -> Self {
        self.recipient.site = Some(site.to_string());
        self
    }

    /// Sets the minimum severity filter.
    pub fn min_severity(mut self, severity: AlertSeverity) -> Self {
        self.recipient.min_severity = Some(severity);
        self
    }

    /// Sets the category filter.
    pub fn categories(mut self, categories: Vec<AlertCategory>) -> Self {
        self.recipient.categories = Some(categories);
        self
    }

    /// Sets the quiet-hours window from (hour, minute) pairs.
    pub fn quiet_hours(mut self, start: (u32, u32), end: (u32, u32)) -> Self {
        self.recipient.quiet_start = NaiveTime::from_hms_opt(start.0, start.1, 0);
        self.recipient.quiet_end = NaiveTime::from_hms_opt(end.0, end.1, 0);
        self
    }

    /// Restricts the recipient to certain weekdays.
    pub fn weekdays(mut self, weekdays: Vec<Weekday>) -> Self {
        self.recipient.active_weekdays = Some(weekdays);
        self
    }

    /// Disables the recipient.
    pub fn disabled(mut self) -> Self {
        self.recipient.enabled = false;
        self
    }

    /// Builds the recipient.
    pub fn build(self) -> NotificationRecipient {
        self.recipient
    }
}
