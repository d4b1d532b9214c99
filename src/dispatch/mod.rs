//! # Notification Dispatch Engine
//!
//! Consumes raised alerts, selects eligible recipients and templates, renders
//! messages and delivers them through channel senders, honoring quiet hours,
//! rate limits and an exponential-backoff retry policy.
//!
//! ## Workflow
//!
//! 1. `process_alert` fans an alert out to every eligible recipient. Each
//!    recipient gets the first enabled template matching its channel and the
//!    alert's category/severity; recipients without one are logged and
//!    skipped.
//! 2. Rendered messages enter the pending queue and are attempted
//!    immediately. Quiet hours mark a message `Skipped` (terminal, not rate
//!    counted); a full rate-limit window leaves it `Pending` for a later
//!    sweep.
//! 3. Failed sends back off exponentially until the retry cap, after which
//!    the message stays `Failed` permanently.
//! 4. `process_pending` re-attempts due messages and purges terminal ones.
//!    Sweeps are serialized; claiming a message flips it to `Sending` so
//!    concurrent paths cannot double-send it.

pub mod quiet_hours;
pub mod rate_limit;
pub mod senders;
pub mod template;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{Local, Utc};
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

pub use rate_limit::RateLimitTracker;
pub use senders::{ChannelSender, SendError, TelegramSender, WebhookSender};
pub use template::{TemplateService, TemplateServiceError};

use quiet_hours::SiteQuietWindow;

use crate::config::DispatchSettings;
use crate::models::{
    Alert, MessageStatus, MonitorEvent, MonitoredDevice, NotificationChannel, NotificationMessage,
    NotificationRecipient, NotificationTemplate,
};
use crate::persistence::HistoryLog;

/// Dispatches notifications for raised alerts. See the module documentation.
pub struct NotificationDispatcher {
    settings: ArcSwap<DispatchSettings>,
    site_windows: ArcSwap<HashMap<String, Vec<SiteQuietWindow>>>,
    recipients: ArcSwap<Vec<NotificationRecipient>>,
    templates: ArcSwap<Vec<NotificationTemplate>>,
    senders: HashMap<NotificationChannel, Arc<dyn ChannelSender>>,
    rate_limiter: RateLimitTracker,
    template_service: TemplateService,
    history: Arc<dyn HistoryLog>,
    queue: DashMap<Uuid, NotificationMessage>,
    sweep_lock: Mutex<()>,
    events: Option<mpsc::Sender<MonitorEvent>>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher.
    pub fn new(
        settings: DispatchSettings,
        recipients: Vec<NotificationRecipient>,
        templates: Vec<NotificationTemplate>,
        senders: HashMap<NotificationChannel, Arc<dyn ChannelSender>>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        let site_windows = parse_all_site_windows(&settings);
        Self {
            settings: ArcSwap::from_pointee(settings),
            site_windows: ArcSwap::from_pointee(site_windows),
            recipients: ArcSwap::from_pointee(recipients),
            templates: ArcSwap::from_pointee(templates),
            senders,
            rate_limiter: RateLimitTracker::new(),
            template_service: TemplateService::new(),
            history,
            queue: DashMap::new(),
            sweep_lock: Mutex::new(()),
            events: None,
        }
    }

    /// Attaches an event channel; terminal message transitions are published
    /// to it.
    pub fn with_events(mut self, events: mpsc::Sender<MonitorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replaces the dispatch settings atomically.
    pub fn update_settings(&self, settings: DispatchSettings) {
        self.site_windows
            .store(Arc::new(parse_all_site_windows(&settings)));
        self.settings.store(Arc::new(settings));
    }

    /// Replaces the recipient list atomically.
    pub fn update_recipients(&self, recipients: Vec<NotificationRecipient>) {
        self.recipients.store(Arc::new(recipients));
    }

    /// Replaces the template list atomically.
    pub fn update_templates(&self, templates: Vec<NotificationTemplate>) {
        self.templates.store(Arc::new(templates));
    }

    /// Returns a message by id, if it is still in the queue.
    pub fn message(&self, id: Uuid) -> Option<NotificationMessage> {
        self.queue.get(&id).map(|entry| entry.value().clone())
    }

    /// Returns a snapshot of all queued messages.
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.queue.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Fans an alert out to all eligible recipients and attempts the sends.
    /// Returns the ids of the messages that were created.
    pub async fn process_alert(&self, alert: &Alert, device: &MonitoredDevice) -> Vec<Uuid> {
        let settings = self.settings.load_full();
        let recipients = self.recipients.load_full();
        let templates = self.templates.load_full();

        let mut created = Vec::new();
        for recipient in recipients.iter().filter(|r| recipient_eligible(r, alert)) {
            let Some(template) = select_template(&templates, recipient.channel, alert) else {
                tracing::warn!(
                    recipient = %recipient.id,
                    channel = %recipient.channel,
                    alert = %alert.key,
                    "No template matches; no message created."
                );
                continue;
            };

            let context = template::message_context(alert, device);
            let subject = match self.template_service.render(&template.subject, context.clone()) {
                Ok(subject) => subject,
                Err(_) => continue,
            };
            let body = match self.template_service.render(&template.body, context) {
                Ok(body) => body,
                Err(_) => continue,
            };

            let message = NotificationMessage::new(alert, recipient, subject, body);
            let id = message.id;
            self.queue.insert(id, message);
            created.push(id);

            self.attempt_send(id, &settings).await;
        }

        created
    }

    /// Re-attempts every due message, then purges terminal ones.
    ///
    /// Only one sweep runs at a time; a second caller waits for the first to
    /// finish rather than racing it.
    pub async fn process_pending(&self) {
        let _guard = self.sweep_lock.lock().await;
        let settings = self.settings.load_full();
        let now = Utc::now();

        let due: Vec<Uuid> = self
            .queue
            .iter()
            .filter_map(|entry| {
                let message = entry.value();
                let due = match message.status {
                    MessageStatus::Pending => true,
                    MessageStatus::Failed => {
                        message.retry_count < settings.max_retries
                            && message
                                .next_retry_at
                                .map(|at| at <= now)
                                .unwrap_or(false)
                    }
                    _ => false,
                };
                due.then_some(message.id)
            })
            .collect();

        for id in due {
            self.attempt_send(id, &settings).await;
        }

        self.queue.retain(|_, message| {
            let terminal = message.is_terminal(settings.max_retries);
            if terminal {
                if let Some(events) = &self.events {
                    let _ = events.try_send(MonitorEvent::NotificationFinished(message.clone()));
                }
            }
            !terminal
        });
    }

    /// Atomically claims a message for sending. Returns `None` when another
    /// path already owns it or it is terminal.
    fn claim(&self, id: Uuid) -> Option<NotificationMessage> {
        let mut entry = self.queue.get_mut(&id)?;
        match entry.status {
            MessageStatus::Pending | MessageStatus::Failed => {
                entry.status = MessageStatus::Sending;
                Some(entry.value().clone())
            }
            _ => None,
        }
    }

    fn update_message<F>(&self, id: Uuid, f: F)
    where
        F: FnOnce(&mut NotificationMessage),
    {
        if let Some(mut entry) = self.queue.get_mut(&id) {
            f(&mut entry);
        }
    }

    async fn attempt_send(&self, id: Uuid, settings: &DispatchSettings) {
        let Some(message) = self.claim(id) else {
            return;
        };

        if self.is_quiet(&message) {
            tracing::info!(
                message = %id,
                recipient = %message.recipient_id,
                "Quiet hours in effect; message skipped."
            );
            self.update_message(id, |m| m.status = MessageStatus::Skipped);
            return;
        }

        let now = Utc::now();
        let rate_key = message.rate_limit_key();
        if !self.rate_limiter.check_allowed(
            &rate_key,
            settings.rate_limit_window,
            settings.max_notifications_per_window,
            now,
        ) {
            tracing::debug!(
                message = %id,
                recipient = %message.recipient_id,
                "Rate limit reached; message stays pending."
            );
            self.update_message(id, |m| m.status = MessageStatus::Pending);
            return;
        }

        let Some(sender) = self.senders.get(&message.channel) else {
            tracing::warn!(
                channel = %message.channel,
                message = %id,
                "No sender configured for channel; message cancelled."
            );
            self.update_message(id, |m| m.status = MessageStatus::Cancelled);
            return;
        };

        match sender
            .send(&message.address, &message.subject, &message.body)
            .await
        {
            Ok(()) => {
                let now = Utc::now();
                self.rate_limiter.record_send(&rate_key, now);
                self.update_message(id, |m| {
                    m.status = MessageStatus::Sent;
                    m.sent_at = Some(now);
                    m.last_error = None;
                });

                if let Err(e) = self
                    .history
                    .append(
                        &message.device_id,
                        &message.subject,
                        &message.body,
                        message.severity,
                        message.category,
                    )
                    .await
                {
                    tracing::error!(error = %e, "Failed to append notification history.");
                }
            }
            Err(e) => {
                let now = Utc::now();
                let retry_count = message.retry_count + 1;
                let next_retry_at = if retry_count < settings.max_retries {
                    let delay = settings.retry_delay * 2u32.saturating_pow(retry_count - 1);
                    tracing::warn!(
                        message = %id,
                        attempt = retry_count,
                        retry_in = ?delay,
                        error = %e,
                        "Send failed; retry scheduled."
                    );
                    chrono::Duration::from_std(delay).ok().map(|d| now + d)
                } else {
                    tracing::error!(
                        message = %id,
                        attempts = retry_count,
                        error = %e,
                        "Send failed permanently; retry cap reached."
                    );
                    None
                };

                self.update_message(id, |m| {
                    m.status = MessageStatus::Failed;
                    m.retry_count = retry_count;
                    m.next_retry_at = next_retry_at;
                    m.last_error = Some(e.to_string());
                });
            }
        }
    }

    /// Quiet-hours check: the recipient's own window when both bounds are
    /// set, the site configuration otherwise.
    fn is_quiet(&self, message: &NotificationMessage) -> bool {
        let now = Local::now().naive_local();

        let recipients = self.recipients.load();
        if let Some(recipient) = recipients.iter().find(|r| r.id == message.recipient_id) {
            if quiet_hours::recipient_quiet(recipient, now) {
                return true;
            }
            if recipient.quiet_start.is_some() && recipient.quiet_end.is_some() {
                return false;
            }
        }

        let windows = self.site_windows.load();
        message
            .site
            .as_ref()
            .and_then(|site| windows.get(site))
            .map(|site_windows| quiet_hours::site_quiet(site_windows, now))
            .unwrap_or(false)
    }
}

fn parse_all_site_windows(settings: &DispatchSettings) -> HashMap<String, Vec<SiteQuietWindow>> {
    settings
        .site_quiet_hours
        .iter()
        .map(|(site, raw)| (site.clone(), quiet_hours::parse_site_windows(raw)))
        .collect()
}

/// A recipient is eligible when enabled and every set filter matches the
/// alert.
fn recipient_eligible(recipient: &NotificationRecipient, alert: &Alert) -> bool {
    recipient.enabled
        && recipient
            .site
            .as_ref()
            .map(|site| alert.site.as_ref() == Some(site))
            .unwrap_or(true)
        && recipient
            .min_severity
            .map(|min| alert.severity >= min)
            .unwrap_or(true)
        && recipient
            .categories
            .as_ref()
            .map(|categories| categories.contains(&alert.key.category))
            .unwrap_or(true)
}

/// The first enabled template matching the channel and the alert's
/// category/severity.
fn select_template<'a>(
    templates: &'a [NotificationTemplate],
    channel: NotificationChannel,
    alert: &Alert,
) -> Option<&'a NotificationTemplate> {
    templates.iter().find(|template| {
        template.enabled
            && template.channel == channel
            && template
                .category
                .map(|category| category == alert.key.category)
                .unwrap_or(true)
            && template
                .min_severity
                .map(|min| alert.severity >= min)
                .unwrap_or(true)
    })
}
