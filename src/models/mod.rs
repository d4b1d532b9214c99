//! This module contains the data models for printwatch.

pub mod alert;
pub mod device;
pub mod event;
pub mod forecast;
pub mod message;
pub mod recipient;
pub mod supply;
pub mod template;

pub use alert::{Alert, AlertCategory, AlertKey, AlertRule, AlertSeverity, AlertStatus};
pub use device::{
    Credential, DeviceInfo, DeviceType, DiscoveredDevice, DiscoveryMethod, MonitoredDevice,
    ScanTarget,
};
pub use event::MonitorEvent;
pub use forecast::{ForecastSnapshot, FORECAST_MODEL_EWMA};
pub use message::{MessageStatus, NotificationMessage};
pub use recipient::{NotificationChannel, NotificationRecipient};
pub use supply::{SupplyKind, SupplyReading};
pub use template::NotificationTemplate;
