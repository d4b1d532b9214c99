//! Persistence contracts consumed by the monitoring core.

pub mod error;
pub mod traits;

pub use error::PersistenceError;
pub use traits::{DeviceRepository, HistoryLog};
