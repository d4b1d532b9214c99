//! The Monitoring Orchestrator.
//!
//! Owns all engines and runs the periodic control loops: discovery, supply
//! polling, forecasting and the notification-queue sweep. Each loop reads one
//! consistent settings snapshot at the start of every tick, honors the shared
//! cancellation token, and isolates per-item failures so one bad device or
//! recipient cannot halt the pipeline.

mod builder;

use std::sync::Arc;

use arc_swap::ArcSwap;
pub use builder::SupervisorBuilder;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::alerts::{AlertEvaluator, AlertEventKind, AlertStore, EvaluationContext};
use crate::config::AppConfig;
use crate::discovery::DiscoveryEngine;
use crate::dispatch::NotificationDispatcher;
use crate::forecast::ForecastEngine;
use crate::http_client::HttpClientPoolError;
use crate::models::{
    AlertCategory, Credential, DiscoveredDevice, MonitorEvent, MonitoredDevice, SupplyKind,
};
use crate::persistence::DeviceRepository;
use crate::providers::ProtocolAdapter;

/// Errors that can occur while assembling or running the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the builder.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A network prober was not provided to the builder.
    #[error("Missing network prober for Supervisor")]
    MissingProber,

    /// A protocol adapter was not provided to the builder.
    #[error("Missing protocol adapter for Supervisor")]
    MissingAdapter,

    /// A device repository was not provided to the builder.
    #[error("Missing device repository for Supervisor")]
    MissingRepository,

    /// A history log was not provided to the builder.
    #[error("Missing history log for Supervisor")]
    MissingHistory,

    /// An alert store was not provided to the builder.
    #[error("Missing alert store for Supervisor")]
    MissingAlertStore,

    /// The HTTP client for the built-in senders could not be created.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
}

/// The primary runtime manager: owns the engines, their timers and graceful
/// shutdown.
pub struct Supervisor<S: AlertStore, R: DeviceRepository> {
    pub(crate) config: Arc<ArcSwap<AppConfig>>,
    pub(crate) discovery: Arc<DiscoveryEngine>,
    pub(crate) evaluator: Arc<AlertEvaluator<S>>,
    pub(crate) dispatcher: Arc<NotificationDispatcher>,
    pub(crate) forecast: Arc<ForecastEngine<R>>,
    pub(crate) repository: Arc<R>,
    pub(crate) adapter: Arc<dyn ProtocolAdapter>,
    pub(crate) roster: Arc<DashMap<String, MonitoredDevice>>,
    pub(crate) last_levels: Arc<DashMap<(String, SupplyKind), f64>>,
    pub(crate) events_tx: mpsc::Sender<MonitorEvent>,
    pub(crate) events_rx: Option<mpsc::Receiver<MonitorEvent>>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) join_set: JoinSet<()>,
}

impl<S: AlertStore + 'static, R: DeviceRepository + 'static> Supervisor<S, R> {
    /// Returns a new builder; the public entry point for creating a
    /// supervisor.
    pub fn builder() -> SupervisorBuilder<S, R> {
        SupervisorBuilder::new()
    }

    /// Takes the monitor-event receiver. Call once before `run`.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<MonitorEvent>> {
        self.events_rx.take()
    }

    /// The alert evaluator, for acknowledge/resolve and rule CRUD.
    pub fn evaluator(&self) -> Arc<AlertEvaluator<S>> {
        Arc::clone(&self.evaluator)
    }

    /// The notification dispatcher, for recipient/template CRUD.
    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// A handle that cancels the supervisor when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Replaces the application settings; loops pick the new snapshot up at
    /// their next tick.
    pub fn update_settings(&self, config: AppConfig) {
        self.dispatcher.update_settings(config.dispatch.clone());
        self.config.store(Arc::new(config));
    }

    /// Adds or replaces devices on the monitored roster.
    pub fn update_devices(&self, devices: Vec<MonitoredDevice>) {
        for device in devices {
            self.roster.insert(device.id.clone(), device);
        }
    }

    /// Starts all service loops and blocks until shutdown.
    ///
    /// Listens for SIGINT/SIGTERM, supervises the spawned loops, and on
    /// shutdown drains the notification queue within the configured timeout.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {}
            }

            cancellation_token.cancel();
        });

        // -- Service loops --

        self.join_set.spawn(discovery_loop(
            Arc::clone(&self.config),
            Arc::clone(&self.discovery),
            Arc::clone(&self.repository),
            Arc::clone(&self.roster),
            self.events_tx.clone(),
            self.cancellation_token.clone(),
        ));

        self.join_set.spawn(poll_loop(
            Arc::clone(&self.config),
            Arc::clone(&self.adapter),
            Arc::clone(&self.evaluator),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.repository),
            Arc::clone(&self.roster),
            Arc::clone(&self.last_levels),
            self.events_tx.clone(),
            self.cancellation_token.clone(),
        ));

        self.join_set.spawn(forecast_loop(
            Arc::clone(&self.config),
            Arc::clone(&self.forecast),
            Arc::clone(&self.last_levels),
            self.cancellation_token.clone(),
        ));

        self.join_set.spawn(sweep_loop(
            Arc::clone(&self.config),
            Arc::clone(&self.dispatcher),
            self.cancellation_token.clone(),
        ));

        // -- Supervision loop --

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        self.join_set.shutdown().await;
        tracing::info!("All supervised tasks have completed.");

        // Final cleanup: one last queue sweep, bounded by the shutdown
        // timeout.
        let shutdown_timeout = self.config.load().shutdown_timeout;
        let dispatcher = Arc::clone(&self.dispatcher);
        if tokio::time::timeout(shutdown_timeout, dispatcher.process_pending())
            .await
            .is_err()
        {
            tracing::warn!(
                "Final queue sweep did not complete within {:?}. Continuing shutdown.",
                shutdown_timeout
            );
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}

/// Periodically runs discovery and feeds new devices onto the roster.
async fn discovery_loop<R: DeviceRepository>(
    config: Arc<ArcSwap<AppConfig>>,
    discovery: Arc<DiscoveryEngine>,
    repository: Arc<R>,
    roster: Arc<DashMap<String, MonitoredDevice>>,
    events: mpsc::Sender<MonitorEvent>,
    cancel: CancellationToken,
) {
    loop {
        let settings = config.load_full();
        let delay = tokio::time::sleep(settings.discovery.interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = delay => {
                if settings.discovery.ip_range.is_empty() {
                    tracing::debug!("No discovery range configured; skipping tick.");
                    continue;
                }
                match discovery.discover(&settings.discovery, &cancel).await {
                    Ok(devices) => {
                        for device in devices {
                            if let Err(e) = repository.save_device(&device).await {
                                tracing::error!(address = %device.address, error = %e, "Failed to persist discovered device.");
                            }
                            let monitored = monitored_from_discovered(&device);
                            roster.entry(monitored.id.clone()).or_insert(monitored);
                            let _ = events.try_send(MonitorEvent::DeviceDiscovered(device));
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Discovery cycle failed.");
                    }
                }
            }
        }
    }
    tracing::info!("Discovery loop has shut down.");
}

/// Periodically polls every roster device for supply levels and feeds the
/// readings through alert evaluation and dispatch.
#[allow(clippy::too_many_arguments)]
async fn poll_loop<S: AlertStore + 'static, R: DeviceRepository>(
    config: Arc<ArcSwap<AppConfig>>,
    adapter: Arc<dyn ProtocolAdapter>,
    evaluator: Arc<AlertEvaluator<S>>,
    dispatcher: Arc<NotificationDispatcher>,
    repository: Arc<R>,
    roster: Arc<DashMap<String, MonitoredDevice>>,
    last_levels: Arc<DashMap<(String, SupplyKind), f64>>,
    events: mpsc::Sender<MonitorEvent>,
    cancel: CancellationToken,
) {
    loop {
        let settings = config.load_full();
        let delay = tokio::time::sleep(settings.monitoring.poll_interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = delay => {
                let devices: Vec<MonitoredDevice> =
                    roster.iter().map(|entry| entry.value().clone()).collect();
                for device in devices {
                    if cancel.is_cancelled() {
                        break;
                    }
                    poll_device(
                        &settings,
                        adapter.as_ref(),
                        &evaluator,
                        &dispatcher,
                        repository.as_ref(),
                        &last_levels,
                        &events,
                        &device,
                    )
                    .await;
                }
            }
        }
    }
    tracing::info!("Poll loop has shut down.");
}

/// Polls one device; adapter errors mark the device unreachable for this
/// cycle and never abort the batch.
#[allow(clippy::too_many_arguments)]
async fn poll_device<S: AlertStore + 'static, R: DeviceRepository>(
    settings: &AppConfig,
    adapter: &dyn ProtocolAdapter,
    evaluator: &AlertEvaluator<S>,
    dispatcher: &NotificationDispatcher,
    repository: &R,
    last_levels: &DashMap<(String, SupplyKind), f64>,
    events: &mpsc::Sender<MonitorEvent>,
    device: &MonitoredDevice,
) {
    let poll = adapter.get_supply_levels(device.address, &device.credential);
    let readings = match tokio::time::timeout(settings.monitoring.poll_timeout, poll).await {
        Ok(Ok(readings)) => readings,
        Ok(Err(e)) => {
            tracing::warn!(device = %device.id, error = %e, "Device poll failed.");
            mark_unreachable(evaluator, dispatcher, events, device).await;
            return;
        }
        Err(_) => {
            tracing::warn!(device = %device.id, "Device poll timed out.");
            mark_unreachable(evaluator, dispatcher, events, device).await;
            return;
        }
    };

    let _ = events.try_send(MonitorEvent::DevicePolled {
        device_id: device.id.clone(),
        reading_count: readings.len(),
    });

    if let Err(e) = repository.save_supply_readings(&device.id, &readings).await {
        tracing::error!(device = %device.id, error = %e, "Failed to persist supply readings.");
    }

    for reading in &readings {
        let level_key = (device.id.clone(), reading.kind);
        let previous_percent = last_levels.get(&level_key).map(|entry| *entry);

        let context = EvaluationContext {
            device,
            reading,
            previous_percent,
        };
        if let Some(event) = evaluator.evaluate(&context).await {
            let monitor_event = match event.kind {
                AlertEventKind::Raised => MonitorEvent::AlertRaised(event.alert.clone()),
                AlertEventKind::Updated => MonitorEvent::AlertUpdated(event.alert.clone()),
            };
            let _ = events.try_send(monitor_event);

            // Only fresh alerts fan out to recipients; in-window updates
            // would flood them.
            if event.kind == AlertEventKind::Raised {
                dispatcher.process_alert(&event.alert, device).await;
            }
        }

        if let Some(percent) = reading.percent {
            last_levels.insert(level_key, percent);
        }
    }
}

async fn mark_unreachable<S: AlertStore + 'static>(
    evaluator: &AlertEvaluator<S>,
    dispatcher: &NotificationDispatcher,
    events: &mpsc::Sender<MonitorEvent>,
    device: &MonitoredDevice,
) {
    let _ = events.try_send(MonitorEvent::DeviceUnreachable {
        device_id: device.id.clone(),
    });

    if let Some(event) = evaluator
        .evaluate_device(
            device,
            AlertCategory::DeviceOffline,
            "Device did not respond to a supply poll",
        )
        .await
    {
        let _ = events.try_send(match event.kind {
            AlertEventKind::Raised => MonitorEvent::AlertRaised(event.alert.clone()),
            AlertEventKind::Updated => MonitorEvent::AlertUpdated(event.alert.clone()),
        });
        if event.kind == AlertEventKind::Raised {
            dispatcher.process_alert(&event.alert, device).await;
        }
    }
}

/// Periodically recomputes forecasts for every device/supply pair seen by the
/// poll loop.
async fn forecast_loop<R: DeviceRepository>(
    config: Arc<ArcSwap<AppConfig>>,
    forecast: Arc<ForecastEngine<R>>,
    last_levels: Arc<DashMap<(String, SupplyKind), f64>>,
    cancel: CancellationToken,
) {
    loop {
        let settings = config.load_full();
        let delay = tokio::time::sleep(settings.forecast.interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = delay => {
                let pairs: Vec<((String, SupplyKind), f64)> = last_levels
                    .iter()
                    .map(|entry| (entry.key().clone(), *entry.value()))
                    .collect();
                for ((device_id, kind), percent) in pairs {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(e) = forecast
                        .forecast(&device_id, kind, percent, &settings.forecast)
                        .await
                    {
                        tracing::error!(
                            device = %device_id,
                            supply = %kind,
                            error = %e,
                            "Forecast failed."
                        );
                    }
                }
            }
        }
    }
    tracing::info!("Forecast loop has shut down.");
}

/// Periodically sweeps the pending-notification queue.
async fn sweep_loop(
    config: Arc<ArcSwap<AppConfig>>,
    dispatcher: Arc<NotificationDispatcher>,
    cancel: CancellationToken,
) {
    loop {
        let settings = config.load_full();
        let delay = tokio::time::sleep(settings.dispatch.queue_sweep_interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = delay => dispatcher.process_pending().await,
        }
    }
    tracing::info!("Queue sweep loop has shut down.");
}

/// Seeds a roster entry from a discovery record. The address doubles as the
/// id until persistence assigns one.
fn monitored_from_discovered(device: &DiscoveredDevice) -> MonitoredDevice {
    let name = device
        .hostname
        .clone()
        .or_else(|| device.model.clone())
        .unwrap_or_else(|| device.address.to_string());
    MonitoredDevice {
        id: device.address.to_string(),
        name,
        address: device.address,
        location: None,
        site: None,
        credential: Credential::default(),
    }
}
