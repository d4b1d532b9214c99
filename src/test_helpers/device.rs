use std::net::{IpAddr, Ipv4Addr};

use crate::models::{Credential, MonitoredDevice};

/// Builder for [`MonitoredDevice`] fixtures.
pub struct DeviceBuilder {
    device: MonitoredDevice,
}

impl DeviceBuilder {
    /// Creates a builder for a device with the given id.
    pub fn new(id: &str) -> Self {
        Self {
            device: MonitoredDevice {
                id: id.to_string(),
                name: id.to_string(),
                address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                location: None,
                site: None,
                credential: Credential::default(),
            },
        }
    }

    /// Sets the display name.
    pub fn name(mut self, name: &str) -> Self {
        self.device.name = name.to_string();
        self
    }

    /// Sets the network address.
    pub fn address(mut self, address: IpAddr) -> Self {
        self.device.address = address;
        self
    }

    /// Sets the location.
    pub fn location(mut self, location: &str) -> Self {
        self.device.location = Some(location.to_string());
        self
    }

    /// Sets the site.
    pub fn site(mut self, site: &str) -> Self {
        self.device.site = Some(site.to_string());
        self
    }

    /// Builds the device.
    pub fn build(self) -> MonitoredDevice {
        self.device
    }
}
