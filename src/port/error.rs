//! Port-specific error types.
//!
//! `PortError` covers lifecycle and configuration failures. Raw transfers use
//! the much smaller `TransferError`, which is `Copy` so the hot path never
//! allocates when reporting a failure.

use std::io;
use thiserror::Error;

/// Message carried by every disconnected-port failure.
pub const DISCONNECTED_MESSAGE: &str = "This port appears to have been shut down or disconnected.";

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The device exists but another process holds it.
    #[error("Serial port is busy: {0}")]
    Busy(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The driver cannot express the requested setting on this platform.
    #[error("Unsupported setting: {0}")]
    Unsupported(String),

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// The handle reached its terminal state; obtain a fresh one from the registry.
    #[error("Port has been closed")]
    Closed,

    /// The port was shut down or the device vanished.
    #[error("{}", DISCONNECTED_MESSAGE)]
    Disconnected,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Busy error from a port name.
    pub fn busy(port_name: impl Into<String>) -> Self {
        Self::Busy(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Unsupported error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

/// Failure of a raw `read_bytes` / `write_bytes` call.
///
/// A short transfer is not represented here: it is an `Ok` with a count
/// smaller than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The handle is unopened or closed; nothing was dispatched to the OS.
    #[error("Port is not open")]
    NotOpen,

    /// The device failed while the transfer was in flight. The handle has
    /// been released and is now closed.
    #[error("Device failure during transfer")]
    DeviceFailure,
}

impl From<TransferError> for PortError {
    fn from(_: TransferError) -> Self {
        PortError::Disconnected
    }
}

impl From<TransferError> for io::Error {
    fn from(_: TransferError) -> Self {
        disconnected()
    }
}

/// The stream-level failure for any operation on a port that is not open.
pub(crate) fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, PortError::Disconnected)
}
