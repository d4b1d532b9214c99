//! A set of helpers for testing.

mod alert;
mod device;
mod doubles;
mod reading;
mod recipient;
mod rule;
mod snapshot;
mod template;

pub use alert::AlertBuilder;
pub use device::DeviceBuilder;
pub use doubles::{
    FakeHost, FakeProber, HistoryEntry, InMemoryRepository, RecordingHistory, RecordingSender,
};
pub use reading::ReadingBuilder;
pub use recipient::RecipientBuilder;
pub use rule::RuleBuilder;
pub use snapshot::SnapshotBuilder;
pub use template::TemplateBuilder;
