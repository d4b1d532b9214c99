//! Events published by the monitoring orchestrator.

use super::{alert::Alert, device::DiscoveredDevice, message::NotificationMessage};

/// An observable event emitted over the orchestrator's event channel.
///
/// Consumers (a UI adapter, a log sink) subscribe to the channel; the core
/// never depends on what is listening.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A discovery run produced a device record.
    DeviceDiscovered(DiscoveredDevice),
    /// A device on the roster was polled successfully.
    DevicePolled {
        /// The polled device's identifier.
        device_id: String,
        /// Number of supply readings returned.
        reading_count: usize,
    },
    /// A device on the roster could not be reached.
    DeviceUnreachable {
        /// The unreachable device's identifier.
        device_id: String,
    },
    /// A new alert was raised.
    AlertRaised(Alert),
    /// An existing alert was updated within its deduplication window.
    AlertUpdated(Alert),
    /// A notification reached a terminal state.
    NotificationFinished(NotificationMessage),
}
