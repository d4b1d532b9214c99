//! External collaborator contracts and their system-level implementations.

pub mod prober;
pub mod traits;

pub use prober::SystemProber;
pub use traits::{
    AdapterError, DirectoryDiscovery, ManagementInstrumentationDiscovery, NetworkProber,
    ProtocolAdapter,
};
