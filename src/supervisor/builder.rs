//! Assembles and wires the supervisor's components.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::alerts::{AlertEvaluator, AlertStore};
use crate::config::AppConfig;
use crate::discovery::DiscoveryEngine;
use crate::dispatch::{NotificationDispatcher, TelegramSender, WebhookSender};
use crate::forecast::ForecastEngine;
use crate::http_client::HttpClientPool;
use crate::models::{
    AlertRule, NotificationChannel, NotificationRecipient, NotificationTemplate,
};
use crate::persistence::{DeviceRepository, HistoryLog};
use crate::providers::{
    DirectoryDiscovery, ManagementInstrumentationDiscovery, NetworkProber, ProtocolAdapter,
};

/// Builds a [`Supervisor`], wiring engines to their injected collaborators.
///
/// The webhook sender is always available; a Telegram sender is added when
/// the configuration carries a bot token. Explicitly registered senders take
/// precedence over the built-in ones, which is how a host process plugs in
/// email delivery.
pub struct SupervisorBuilder<S: AlertStore, R: DeviceRepository> {
    config: Option<AppConfig>,
    prober: Option<Arc<dyn NetworkProber>>,
    adapter: Option<Arc<dyn ProtocolAdapter>>,
    directory: Option<Arc<dyn DirectoryDiscovery>>,
    instrumentation: Option<Arc<dyn ManagementInstrumentationDiscovery>>,
    repository: Option<Arc<R>>,
    history: Option<Arc<dyn HistoryLog>>,
    alert_store: Option<Arc<S>>,
    senders: HashMap<NotificationChannel, Arc<dyn crate::dispatch::ChannelSender>>,
    rules: Vec<AlertRule>,
    recipients: Vec<NotificationRecipient>,
    templates: Vec<NotificationTemplate>,
}

impl<S: AlertStore + 'static, R: DeviceRepository + 'static> SupervisorBuilder<S, R> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            config: None,
            prober: None,
            adapter: None,
            directory: None,
            instrumentation: None,
            repository: None,
            history: None,
            alert_store: None,
            senders: HashMap::new(),
            rules: Vec::new(),
            recipients: Vec::new(),
            templates: Vec::new(),
        }
    }

    /// Sets the application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the network prober used by discovery.
    pub fn prober(mut self, prober: Arc<dyn NetworkProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Sets the protocol adapter used for polling and fingerprinting.
    pub fn adapter(mut self, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Sets the optional directory discovery source.
    pub fn directory(mut self, directory: Arc<dyn DirectoryDiscovery>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the optional management-instrumentation discovery source.
    pub fn instrumentation(
        mut self,
        instrumentation: Arc<dyn ManagementInstrumentationDiscovery>,
    ) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    /// Sets the device/snapshot repository.
    pub fn repository(mut self, repository: Arc<R>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Sets the notification-history log.
    pub fn history(mut self, history: Arc<dyn HistoryLog>) -> Self {
        self.history = Some(history);
        self
    }

    /// Sets the active-alert store.
    pub fn alert_store(mut self, store: Arc<S>) -> Self {
        self.alert_store = Some(store);
        self
    }

    /// Registers a channel sender, overriding any built-in one.
    pub fn sender(
        mut self,
        channel: NotificationChannel,
        sender: Arc<dyn crate::dispatch::ChannelSender>,
    ) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    /// Sets the initial alert rules.
    pub fn rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the initial notification recipients.
    pub fn recipients(mut self, recipients: Vec<NotificationRecipient>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Sets the initial notification templates.
    pub fn templates(mut self, templates: Vec<NotificationTemplate>) -> Self {
        self.templates = templates;
        self
    }

    /// Builds the supervisor.
    pub async fn build(self) -> Result<Supervisor<S, R>, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let prober = self.prober.ok_or(SupervisorError::MissingProber)?;
        let adapter = self.adapter.ok_or(SupervisorError::MissingAdapter)?;
        let repository = self.repository.ok_or(SupervisorError::MissingRepository)?;
        let history = self.history.ok_or(SupervisorError::MissingHistory)?;
        let alert_store = self.alert_store.ok_or(SupervisorError::MissingAlertStore)?;

        let mut discovery = DiscoveryEngine::new(prober).with_adapter(Arc::clone(&adapter));
        if let Some(directory) = self.directory {
            discovery = discovery.with_directory(directory);
        }
        if let Some(instrumentation) = self.instrumentation {
            discovery = discovery.with_instrumentation(instrumentation);
        }

        let client_pool = HttpClientPool::new();
        let http_client = client_pool.get_or_create(&config.http_retry).await?;

        let mut senders = self.senders;
        senders
            .entry(NotificationChannel::Webhook)
            .or_insert_with(|| Arc::new(WebhookSender::new(Arc::clone(&http_client))));
        if let Some(token) = &config.dispatch.telegram_bot_token {
            senders
                .entry(NotificationChannel::Telegram)
                .or_insert_with(|| {
                    Arc::new(TelegramSender::new(token.clone(), Arc::clone(&http_client)))
                });
        }

        let (events_tx, events_rx) =
            mpsc::channel(config.event_channel_capacity.max(1) as usize);

        let evaluator = AlertEvaluator::new(alert_store, self.rules);
        let dispatcher = NotificationDispatcher::new(
            config.dispatch.clone(),
            self.recipients,
            self.templates,
            senders,
            history,
        )
        .with_events(events_tx.clone());

        let forecast = ForecastEngine::new(Arc::clone(&repository));

        Ok(Supervisor {
            config: Arc::new(arc_swap::ArcSwap::from_pointee(config)),
            discovery: Arc::new(discovery),
            evaluator: Arc::new(evaluator),
            dispatcher: Arc::new(dispatcher),
            forecast: Arc::new(forecast),
            repository,
            adapter,
            roster: Arc::new(dashmap::DashMap::new()),
            last_levels: Arc::new(dashmap::DashMap::new()),
            events_tx,
            events_rx: Some(events_rx),
            cancellation_token: CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        })
    }
}

impl<S: AlertStore + 'static, R: DeviceRepository + 'static> Default for SupervisorBuilder<S, R> {
    fn default() -> Self {
        Self::new()
    }
}
