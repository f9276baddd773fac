//! In-memory serial driver for testing.
//!
//! `MockDriver` implements [`SerialDriver`] over a set of `MockDevice`s. A
//! device is a shared handle to simulated hardware: tests keep a clone to feed
//! received bytes, inspect what was written, stall the transmitter, or pull
//! the plug, while the engine talks to the same device through the driver.
//!
//! # Example
//! ```
//! use serial_comm::port::{MockDevice, MockDriver, PortConfig, Registry};
//! use std::sync::Arc;
//!
//! let device = MockDevice::new("ttyMOCK0", "Mock Modem");
//! let registry = Registry::new(Arc::new(MockDriver::new().with_device(device.clone())));
//!
//! let port = registry.handle_for("ttyMOCK0");
//! port.configure(PortConfig::default().with_timeouts(10, 0)).unwrap();
//! assert!(port.open());
//!
//! device.enqueue_read(b"OK");
//! let mut buf = [0u8; 2];
//! assert_eq!(port.read_bytes(&mut buf, 2).unwrap(), 2);
//!
//! port.write_bytes(b"AT", 2).unwrap();
//! assert_eq!(device.get_write_log(), b"AT".to_vec());
//! ```

use super::config::PortConfig;
use super::descriptor::{PathFlavor, PortDescriptor};
use super::error::PortError;
use super::traits::{DriverPort, SerialDriver};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Simulated hardware state, shared by every clone of a `MockDevice`.
#[derive(Debug)]
struct DeviceState {
    /// Bytes the device has "received", waiting to be read.
    rx_queue: VecDeque<u8>,
    /// Every byte the engine wrote, in order.
    write_log: Vec<u8>,
    /// Bytes the transmitter accepts before stalling; `None` is unlimited.
    tx_capacity: Option<usize>,
    present: bool,
    /// Held by some other process.
    claimed: bool,
    /// Held by us; the device allows one open at a time.
    open: bool,
    open_handles: usize,
    open_count: usize,
    applied_configs: Vec<PortConfig>,
    drain_count: usize,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            rx_queue: VecDeque::new(),
            write_log: Vec::new(),
            tx_capacity: None,
            present: true,
            claimed: false,
            open: false,
            open_handles: 0,
            open_count: 0,
            applied_configs: Vec::new(),
            drain_count: 0,
        }
    }
}

type SharedDevice = Arc<(Mutex<DeviceState>, Condvar)>;

fn removed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "device removed")
}

/// A simulated serial device.
#[derive(Clone)]
pub struct MockDevice {
    name: String,
    description: String,
    flavor: PathFlavor,
    state: SharedDevice,
}

impl MockDevice {
    /// Create a present, idle device with POSIX naming.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flavor: PathFlavor::Posix,
            state: Arc::new((Mutex::new(DeviceState::default()), Condvar::new())),
        }
    }

    /// Use another platform's naming rules for this device.
    pub fn with_flavor(mut self, flavor: PathFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// The raw OS name the device was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> PortDescriptor {
        PortDescriptor::with_flavor(&self.name, &self.description, self.flavor)
    }

    pub fn device_path(&self) -> String {
        self.flavor.device_path(&self.name)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        let result = f(&mut state);
        drop(state);
        cvar.notify_all();
        result
    }

    /// Make `data` available to subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.with_state(|state| state.rx_queue.extend(data));
    }

    /// Bytes received but not yet read.
    pub fn pending_reads(&self) -> usize {
        self.with_state(|state| state.rx_queue.len())
    }

    /// Every byte written to the device so far.
    pub fn get_write_log(&self) -> Vec<u8> {
        self.with_state(|state| state.write_log.clone())
    }

    pub fn clear_write_log(&self) {
        self.with_state(|state| state.write_log.clear());
    }

    /// Limit how many more bytes the transmitter accepts. `Some(0)` stalls it;
    /// `None` removes the limit.
    pub fn set_tx_capacity(&self, capacity: Option<usize>) {
        self.with_state(|state| state.tx_capacity = capacity);
    }

    /// Pretend another process holds the device.
    pub fn set_claimed(&self, claimed: bool) {
        self.with_state(|state| state.claimed = claimed);
    }

    /// Remove the device. Blocked and future I/O fails, and it disappears
    /// from enumeration.
    pub fn unplug(&self) {
        self.with_state(|state| state.present = false);
    }

    /// Put a removed device back. Handles that failed stay failed.
    pub fn replug(&self) {
        self.with_state(|state| state.present = true);
    }

    pub fn is_present(&self) -> bool {
        self.with_state(|state| state.present)
    }

    /// OS handles currently open on the device, duplicates included.
    pub fn open_handles(&self) -> usize {
        self.with_state(|state| state.open_handles)
    }

    /// How many times the device has been opened.
    pub fn open_count(&self) -> usize {
        self.with_state(|state| state.open_count)
    }

    /// Line configurations pushed to the device, oldest first.
    pub fn applied_configs(&self) -> Vec<PortConfig> {
        self.with_state(|state| state.applied_configs.clone())
    }

    /// How many times queued output was drained.
    pub fn drain_count(&self) -> usize {
        self.with_state(|state| state.drain_count)
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// An open handle on a `MockDevice`.
#[derive(Debug)]
struct MockPort {
    device: MockDevice,
}

impl DriverPort for MockPort {
    fn apply_config(&mut self, config: &PortConfig) -> Result<(), PortError> {
        self.device.with_state(|state| {
            if !state.present {
                return Err(PortError::Io(removed()));
            }
            state.applied_configs.push(*config);
            Ok(())
        })
    }

    fn read(&mut self, buffer: &mut [u8], wait: Duration) -> io::Result<usize> {
        let (lock, cvar) = &*self.device.state;
        let deadline = Instant::now() + wait;
        let mut state = lock.lock();
        loop {
            if !state.present {
                return Err(removed());
            }
            if !state.rx_queue.is_empty() || buffer.is_empty() {
                let n = buffer.len().min(state.rx_queue.len());
                for (slot, byte) in buffer.iter_mut().zip(state.rx_queue.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if Instant::now() >= deadline {
                return Ok(0);
            }
            cvar.wait_until(&mut state, deadline);
        }
    }

    fn write(&mut self, data: &[u8], wait: Duration) -> io::Result<usize> {
        let (lock, cvar) = &*self.device.state;
        let deadline = Instant::now() + wait;
        let mut state = lock.lock();
        loop {
            if !state.present {
                return Err(removed());
            }
            let accept = data.len().min(state.tx_capacity.unwrap_or(usize::MAX));
            if accept > 0 || data.is_empty() {
                state.write_log.extend_from_slice(&data[..accept]);
                if let Some(capacity) = state.tx_capacity.as_mut() {
                    *capacity -= accept;
                }
                return Ok(accept);
            }
            if Instant::now() >= deadline {
                return Ok(0);
            }
            cvar.wait_until(&mut state, deadline);
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        self.device.with_state(|state| {
            if !state.present {
                return Err(removed());
            }
            state.drain_count += 1;
            Ok(())
        })
    }

    fn bytes_available(&self) -> Option<usize> {
        Some(self.device.pending_reads())
    }

    fn try_clone(&self) -> Result<Box<dyn DriverPort>, PortError> {
        self.device.with_state(|state| {
            if !state.present {
                return Err(PortError::Io(removed()));
            }
            state.open_handles += 1;
            Ok(())
        })?;
        Ok(Box::new(MockPort {
            device: self.device.clone(),
        }))
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.device.with_state(|state| {
            state.open_handles = state.open_handles.saturating_sub(1);
            if state.open_handles == 0 {
                state.open = false;
            }
        });
    }
}

/// A `SerialDriver` over simulated devices.
#[derive(Debug)]
pub struct MockDriver {
    flavor: PathFlavor,
    devices: Mutex<Vec<MockDevice>>,
    enumeration_fails: AtomicBool,
}

impl MockDriver {
    /// An empty driver with POSIX naming.
    pub fn new() -> Self {
        Self {
            flavor: PathFlavor::Posix,
            devices: Mutex::new(Vec::new()),
            enumeration_fails: AtomicBool::new(false),
        }
    }

    pub fn with_flavor(mut self, flavor: PathFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_device(self, device: MockDevice) -> Self {
        self.add_device(device);
        self
    }

    pub fn add_device(&self, device: MockDevice) {
        self.devices.lock().push(device);
    }

    /// Forget the device at `device_path`; open handles keep working.
    pub fn remove_device(&self, device_path: &str) -> Option<MockDevice> {
        let mut devices = self.devices.lock();
        let idx = devices.iter().position(|d| d.device_path() == device_path)?;
        Some(devices.remove(idx))
    }

    /// Make `enumerate` fail, as when the OS device database is unreadable.
    pub fn set_enumeration_fails(&self, fails: bool) {
        self.enumeration_fails.store(fails, Ordering::Relaxed);
    }

    fn find(&self, device_path: &str) -> Option<MockDevice> {
        self.devices
            .lock()
            .iter()
            .find(|d| d.device_path() == device_path)
            .cloned()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialDriver for MockDriver {
    fn enumerate(&self) -> Result<Vec<PortDescriptor>, PortError> {
        if self.enumeration_fails.load(Ordering::Relaxed) {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "device list unavailable",
            )));
        }
        Ok(self
            .devices
            .lock()
            .iter()
            .filter(|d| d.is_present())
            .map(MockDevice::descriptor)
            .collect())
    }

    fn open(&self, device_path: &str, config: &PortConfig) -> Result<Box<dyn DriverPort>, PortError> {
        let device = self
            .find(device_path)
            .ok_or_else(|| PortError::not_found(device_path))?;
        device.with_state(|state| {
            if !state.present {
                return Err(PortError::not_found(device_path));
            }
            if state.claimed || state.open {
                return Err(PortError::busy(device_path));
            }
            state.open = true;
            state.open_handles += 1;
            state.open_count += 1;
            state.applied_configs.push(*config);
            Ok(())
        })?;
        Ok(Box::new(MockPort { device }))
    }

    fn flavor(&self) -> PathFlavor {
        self.flavor
    }
}
