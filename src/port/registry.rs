//! Port discovery.

use super::descriptor::PortDescriptor;
use super::handle::PortHandle;
use super::sync_port::SystemDriver;
use super::traits::SerialDriver;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lists the devices a driver can see and hands out handles for them.
///
/// Enumeration is a snapshot: each call asks the driver again and returns
/// fresh, unopened handles in the driver's order.
#[derive(Debug, Clone)]
pub struct Registry {
    driver: Arc<dyn SerialDriver>,
}

impl Registry {
    pub fn new(driver: Arc<dyn SerialDriver>) -> Self {
        Self { driver }
    }

    /// A registry over the host's real serial ports.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemDriver::new()))
    }

    pub fn driver(&self) -> &Arc<dyn SerialDriver> {
        &self.driver
    }

    /// Identities of the ports currently present.
    ///
    /// An unreadable device list yields an empty result rather than an error.
    pub fn descriptors(&self) -> Vec<PortDescriptor> {
        match self.driver.enumerate() {
            Ok(descriptors) => {
                debug!(count = descriptors.len(), "enumerated serial ports");
                descriptors
            }
            Err(err) => {
                warn!(error = %err, "port enumeration unavailable");
                Vec::new()
            }
        }
    }

    /// One unopened handle per port currently present.
    pub fn enumerate(&self) -> Vec<PortHandle> {
        self.descriptors()
            .into_iter()
            .map(|descriptor| PortHandle::new(descriptor, Arc::clone(&self.driver)))
            .collect()
    }

    /// A handle for `name`, given as a system name or a device path.
    ///
    /// A name the driver does not list still gets a handle; whether it exists
    /// is only known once `open` is attempted.
    pub fn handle_for(&self, name: &str) -> PortHandle {
        let descriptor = self
            .descriptors()
            .into_iter()
            .find(|descriptor| descriptor.matches(name))
            .unwrap_or_else(|| PortDescriptor::with_flavor(name, "", self.driver.flavor()));
        PortHandle::new(descriptor, Arc::clone(&self.driver))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::system()
    }
}
