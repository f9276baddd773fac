//! The port handle: one device, one owner, one lifecycle.
//!
//! A handle owns the OS resources for a single device, split into an RX and
//! a TX channel so a reader and a writer never wait on each other. Three
//! locks keep it honest:
//!
//! - `control` (RwLock): transfers hold it shared for one driver call at a
//!   time; `open` and `apply` hold it exclusively, so a parameter change is
//!   never observed halfway through a driver call.
//! - `rx` / `tx` (Mutex): the channel itself. Transfers lock one per driver
//!   call; `close` empties both.
//! - `settings` (Mutex): staged and applied configuration.
//!
//! `close` never takes `control`. It flips the state first, so no new driver
//! call can start, then releases whichever channels are idle. A busy channel
//! is released by the transfer holding it as soon as its current wait ends,
//! which is at most one `POLL_SLICE`.

use super::config::PortConfig;
use super::descriptor::PortDescriptor;
use super::error::{PortError, TransferError};
use super::state::{AtomicState, PortState};
use super::stream::{PortReader, PortWriter};
use super::timeout::{Blocking, TimeoutPolicy};
use super::traits::{DriverPort, SerialDriver};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type Channel = Mutex<Option<Box<dyn DriverPort>>>;

/// How long `close` waits for a busy channel before leaving it to the
/// transfer that holds it.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Rx,
    Tx,
}

#[derive(Debug)]
struct Settings {
    staged: PortConfig,
    /// What the live handle currently runs with; `None` until opened.
    applied: Option<PortConfig>,
}

/// State shared between a handle and its stream adapters.
#[derive(Debug)]
pub(crate) struct PortShared {
    device_path: String,
    state: AtomicState,
    control: RwLock<()>,
    settings: Mutex<Settings>,
    rx: Channel,
    tx: Channel,
}

impl PortShared {
    fn new(device_path: String, config: PortConfig) -> Self {
        Self {
            device_path,
            state: AtomicState::default(),
            control: RwLock::new(()),
            settings: Mutex::new(Settings {
                staged: config,
                applied: None,
            }),
            rx: Mutex::new(None),
            tx: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> PortState {
        self.state.load()
    }

    pub(crate) fn is_opened(&self) -> bool {
        self.state.is_opened()
    }

    fn channel(&self, direction: Direction) -> &Channel {
        match direction {
            Direction::Rx => &self.rx,
            Direction::Tx => &self.tx,
        }
    }

    fn open(&self, driver: &dyn SerialDriver) -> Result<(), PortError> {
        let _control = self.control.write();
        match self.state.load() {
            PortState::Opened => return Ok(()),
            PortState::Closed => return Err(PortError::Closed),
            PortState::Unopened => {}
        }

        let config = self.settings.lock().staged;
        config.validate()?;

        let primary = driver.open(&self.device_path, &config)?;
        let secondary = primary.try_clone()?;
        *self.tx.lock() = Some(primary);
        *self.rx.lock() = Some(secondary);
        self.settings.lock().applied = Some(config);

        // Last, so nothing observes the handle before its parameters are live.
        self.state.store(PortState::Opened);
        info!(port = %self.device_path, baud = config.baud_rate, "port opened");
        Ok(())
    }

    fn close(&self) -> bool {
        if !self.state.transition(PortState::Opened, PortState::Closed) {
            return false;
        }
        self.release_channels();
        info!(port = %self.device_path, "port closed");
        true
    }

    fn release_channels(&self) {
        for direction in [Direction::Rx, Direction::Tx] {
            match self.channel(direction).try_lock_for(CLOSE_GRACE) {
                Some(mut channel) => {
                    channel.take();
                }
                None => debug!(
                    port = %self.device_path,
                    ?direction,
                    "channel busy, in-flight transfer will release it"
                ),
            }
        }
    }

    fn config(&self) -> PortConfig {
        self.settings.lock().staged
    }

    fn stage(&self, update: impl FnOnce(&mut PortConfig)) -> Result<(), PortError> {
        if self.state.load() == PortState::Closed {
            return Err(PortError::Closed);
        }
        let mut settings = self.settings.lock();
        let mut candidate = settings.staged;
        update(&mut candidate);
        candidate.validate()?;
        settings.staged = candidate;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        let settings = self.settings.lock();
        settings
            .applied
            .map_or(false, |applied| applied != settings.staged)
    }

    fn apply(&self) -> Result<(), PortError> {
        let _control = self.control.write();
        match self.state.load() {
            PortState::Unopened => return Ok(()),
            PortState::Closed => return Err(PortError::Closed),
            PortState::Opened => {}
        }

        let mut settings = self.settings.lock();
        let staged = settings.staged;
        let line_changed = settings
            .applied
            .map_or(true, |applied| !applied.same_line_parameters(&staged));

        if line_changed {
            let mut tx = self.tx.lock();
            let port = tx.as_mut().ok_or(PortError::NotOpen)?;
            // Queued output was framed with the old parameters.
            port.drain()?;
            port.apply_config(&staged)?;
        }
        settings.applied = Some(staged);
        drop(settings);
        debug!(port = %self.device_path, line_changed, "configuration applied");

        // A close that raced with us could not release the channels.
        if !self.state.is_opened() {
            self.release_channels();
        }
        Ok(())
    }

    fn active_policy(&self) -> Result<TimeoutPolicy, TransferError> {
        if !self.state.is_opened() {
            return Err(TransferError::NotOpen);
        }
        self.settings
            .lock()
            .applied
            .map(|config| config.timeout_policy())
            .ok_or(TransferError::NotOpen)
    }

    /// Run one driver call on one channel.
    fn slice<F>(&self, direction: Direction, op: F) -> Result<usize, TransferError>
    where
        F: FnOnce(&mut dyn DriverPort) -> io::Result<usize>,
    {
        let _control = self.control.read();
        let mut channel = self.channel(direction).lock();
        if !self.state.is_opened() {
            channel.take();
            return Err(TransferError::NotOpen);
        }
        let port = match channel.as_mut() {
            Some(port) => port,
            None => return Err(TransferError::NotOpen),
        };

        match op(&mut **port) {
            Ok(n) => Ok(n),
            Err(err) => {
                warn!(
                    port = %self.device_path,
                    ?direction,
                    error = %err,
                    "device failure, releasing handle"
                );
                channel.take();
                drop(channel);
                self.state.store(PortState::Closed);
                self.release_channels();
                Err(TransferError::DeviceFailure)
            }
        }
    }

    pub(crate) fn read_bytes(
        &self,
        buffer: &mut [u8],
        max_count: usize,
    ) -> Result<usize, TransferError> {
        let policy = self.active_policy()?;
        let limit = max_count.min(buffer.len());
        let buffer = &mut buffer[..limit];
        if buffer.is_empty() {
            return Ok(0);
        }

        let blocking = policy.read();
        let deadline = blocking.start();
        let mut filled = 0;
        while let Some(wait) = deadline.next_wait() {
            let target = &mut buffer[filled..];
            match self.slice(Direction::Rx, |port| port.read(target, wait)) {
                Ok(n) => filled += n,
                // Closed under us; keep what already left the device.
                Err(TransferError::NotOpen) if filled > 0 => break,
                Err(err) => return Err(err),
            }
            let satisfied = match blocking {
                Blocking::Indefinite => filled > 0,
                Blocking::Within(_) => filled == buffer.len(),
            };
            if satisfied {
                break;
            }
        }
        Ok(filled)
    }

    pub(crate) fn write_bytes(&self, buffer: &[u8], count: usize) -> Result<usize, TransferError> {
        let policy = self.active_policy()?;
        let data = &buffer[..count.min(buffer.len())];
        if data.is_empty() {
            return Ok(0);
        }

        let deadline = policy.write().start();
        let mut written = 0;
        while written < data.len() {
            let Some(wait) = deadline.next_wait() else {
                break;
            };
            let pending = &data[written..];
            match self.slice(Direction::Tx, |port| port.write(pending, wait)) {
                Ok(n) => written += n,
                Err(TransferError::NotOpen) if written > 0 => break,
                Err(err) => return Err(err),
            }
        }
        Ok(written)
    }

    fn bytes_available(&self) -> Result<usize, PortError> {
        let _control = self.control.read();
        let channel = self.rx.lock();
        if !self.state.is_opened() {
            return Err(PortError::NotOpen);
        }
        channel
            .as_ref()
            .ok_or(PortError::NotOpen)?
            .bytes_available()
            .ok_or_else(|| PortError::unsupported("driver does not report pending bytes"))
    }
}

/// A single serial device and its open/configure/close lifecycle.
///
/// Handles come from a [`Registry`](super::Registry). All methods take
/// `&self`, so a handle can be shared across threads behind an `Arc`; a
/// reader thread and a writer thread proceed independently.
///
/// # Example
/// ```no_run
/// use serial_comm::port::Registry;
///
/// let registry = Registry::system();
/// for port in registry.enumerate() {
///     println!("{}: {}", port.system_name(), port.descriptive_name());
/// }
/// ```
pub struct PortHandle {
    descriptor: PortDescriptor,
    driver: Arc<dyn SerialDriver>,
    shared: Arc<PortShared>,
    reader: OnceCell<PortReader>,
    writer: OnceCell<PortWriter>,
}

impl PortHandle {
    pub(crate) fn new(descriptor: PortDescriptor, driver: Arc<dyn SerialDriver>) -> Self {
        let shared = Arc::new(PortShared::new(
            descriptor.device_path().to_string(),
            PortConfig::default(),
        ));
        Self {
            descriptor,
            driver,
            shared,
            reader: OnceCell::new(),
            writer: OnceCell::new(),
        }
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn system_name(&self) -> &str {
        self.descriptor.system_name()
    }

    pub fn descriptive_name(&self) -> &str {
        self.descriptor.descriptive_name()
    }

    pub fn device_path(&self) -> &str {
        self.descriptor.device_path()
    }

    pub fn state(&self) -> PortState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_opened()
    }

    /// Open the device with the staged configuration.
    ///
    /// Returns `false` if the device is missing, busy, or refuses the
    /// configuration; the handle stays unopened and the call may be retried.
    /// On an already open handle this is a no-op returning `true`; on a
    /// closed handle it returns `false`.
    pub fn open(&self) -> bool {
        match self.try_open() {
            Ok(()) => true,
            Err(err) => {
                warn!(port = %self.device_path(), error = %err, "open failed");
                false
            }
        }
    }

    /// Like [`open`](Self::open), but reports why opening failed.
    pub fn try_open(&self) -> Result<(), PortError> {
        self.shared.open(self.driver.as_ref())
    }

    /// Release the OS handle and move to `Closed`.
    ///
    /// Safe from any state. Returns `true` only for the call that actually
    /// released an open handle; every other call is a no-op.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// The staged configuration.
    pub fn config(&self) -> PortConfig {
        self.shared.config()
    }

    /// Stage `config` and, if the port is open, apply it to the device.
    pub fn configure(&self, config: PortConfig) -> Result<(), PortError> {
        self.stage_config(config)?;
        self.apply()
    }

    /// Stage new timeouts and, if the port is open, make them live. Line
    /// parameters are not touched.
    pub fn configure_timeouts(
        &self,
        read_timeout_ms: u32,
        write_timeout_ms: u32,
    ) -> Result<(), PortError> {
        self.stage_timeouts(read_timeout_ms, write_timeout_ms)?;
        self.apply()
    }

    /// Replace the staged configuration without touching the device.
    pub fn stage_config(&self, config: PortConfig) -> Result<(), PortError> {
        self.shared.stage(|staged| *staged = config)
    }

    /// Replace the staged timeouts without touching the device.
    pub fn stage_timeouts(&self, read_timeout_ms: u32, write_timeout_ms: u32) -> Result<(), PortError> {
        self.shared.stage(|staged| {
            staged.read_timeout_ms = read_timeout_ms;
            staged.write_timeout_ms = write_timeout_ms;
        })
    }

    /// Push staged values to the live handle.
    ///
    /// Output queued under the old line parameters is drained first. A no-op
    /// on an unopened handle, since `open` applies the staged values anyway.
    pub fn apply(&self) -> Result<(), PortError> {
        self.shared.apply()
    }

    /// True while the port is open and staged values differ from what the
    /// device runs with.
    pub fn is_dirty(&self) -> bool {
        self.shared.is_dirty()
    }

    /// Read at most `max_count` bytes into `buffer` under the active timeout
    /// policy.
    ///
    /// `Ok(0)` means the read timed out with no data. Bytes past
    /// `min(max_count, buffer.len())` are never touched.
    pub fn read_bytes(&self, buffer: &mut [u8], max_count: usize) -> Result<usize, TransferError> {
        self.shared.read_bytes(buffer, max_count)
    }

    /// Write up to `count` bytes from `buffer` under the active timeout
    /// policy.
    ///
    /// Fewer than `count` is a short write, not an error; resubmit the rest.
    pub fn write_bytes(&self, buffer: &[u8], count: usize) -> Result<usize, TransferError> {
        self.shared.write_bytes(buffer, count)
    }

    /// Exact count of received bytes waiting in the OS queue.
    pub fn bytes_available(&self) -> Result<usize, PortError> {
        self.shared.bytes_available()
    }

    /// The byte-stream reader for this port, created on first use.
    pub fn reader(&self) -> &PortReader {
        self.reader
            .get_or_init(|| PortReader::new(Arc::downgrade(&self.shared)))
    }

    /// The byte-stream writer for this port, created on first use.
    pub fn writer(&self) -> &PortWriter {
        self.writer
            .get_or_init(|| PortWriter::new(Arc::downgrade(&self.shared)))
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        if self.shared.close() {
            debug!(port = %self.device_path(), "closed on drop");
        }
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("system_name", &self.system_name())
            .field("device_path", &self.device_path())
            .field("state", &self.state())
            .finish()
    }
}
