//! The driver surface the engine is built on.
//!
//! A `SerialDriver` knows how to list devices and open one; the resulting
//! `DriverPort` is an opaque OS handle with timed read/write. The engine never
//! looks inside a handle beyond "the call succeeded" or "it failed". Both the
//! system driver and the mock driver implement these traits, so every
//! lifecycle rule can be exercised without hardware.

use super::config::PortConfig;
use super::descriptor::{PathFlavor, PortDescriptor};
use super::error::PortError;
use std::io;
use std::time::Duration;

/// Enumerate and open devices.
pub trait SerialDriver: Send + Sync + std::fmt::Debug {
    /// List the ports the OS currently exposes, in enumeration order.
    fn enumerate(&self) -> Result<Vec<PortDescriptor>, PortError>;

    /// Open the device at `device_path` with `config` already applied.
    ///
    /// The returned handle is exclusively owned; dropping it closes the
    /// device.
    fn open(&self, device_path: &str, config: &PortConfig) -> Result<Box<dyn DriverPort>, PortError>;

    /// Naming rules used to build descriptors for this driver.
    fn flavor(&self) -> PathFlavor {
        PathFlavor::native()
    }
}

/// An open OS handle.
pub trait DriverPort: Send + std::fmt::Debug {
    /// Push line parameters to the device. Timeout fields are ignored here;
    /// waits are passed per call.
    fn apply_config(&mut self, config: &PortConfig) -> Result<(), PortError>;

    /// Read whatever is available into `buffer`, waiting at most `wait` for
    /// the first byte.
    ///
    /// Returns `Ok(0)` only after `wait` has elapsed with nothing to read. An
    /// `Err` means the device is unusable.
    fn read(&mut self, buffer: &mut [u8], wait: Duration) -> io::Result<usize>;

    /// Hand as much of `data` to the OS as it accepts within `wait`.
    ///
    /// Returns `Ok(0)` only after `wait` has elapsed without progress.
    fn write(&mut self, data: &[u8], wait: Duration) -> io::Result<usize>;

    /// Block until queued output has left the device.
    fn drain(&mut self) -> io::Result<()>;

    /// Bytes waiting in the receive queue, if the OS reports it.
    fn bytes_available(&self) -> Option<usize> {
        None
    }

    /// Duplicate the OS handle so reads and writes can proceed on
    /// independent channels.
    fn try_clone(&self) -> Result<Box<dyn DriverPort>, PortError>;
}
