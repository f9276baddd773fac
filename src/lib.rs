//! Serial Comm Library
//!
//! A blocking, cross-platform serial port engine: enumerate ports, open one,
//! configure its line parameters and timeouts, and move bytes through raw
//! transfers or `std::io` streams.
//!
//! # Modules
//!
//! - `port`: the engine (registry, handles, timeouts, stream adapters, drivers)
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup for the binary
//! - `error`: error type of the command-line tool
//!
//! # Example
//!
//! ```
//! use serial_comm::{MockDevice, MockDriver, PortConfig, Registry};
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//!
//! let device = MockDevice::new("ttyUSB0", "USB Modem");
//! let registry = Registry::new(Arc::new(MockDriver::new().with_device(device.clone())));
//!
//! let port = registry.handle_for("ttyUSB0");
//! port.configure(PortConfig::default().with_baud_rate(115200).with_timeouts(20, 0))
//!     .unwrap();
//! assert!(port.open());
//!
//! port.writer().write_all(b"ATZ\r").unwrap();
//! device.enqueue_read(b"OK\r\n");
//!
//! let mut reply = [0u8; 4];
//! port.reader().read_exact(&mut reply).unwrap();
//! assert_eq!(&reply, b"OK\r\n");
//! assert!(port.close());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod port;

pub use error::{AppError, AppResult};
pub use port::{
    DataBits, FlowControl, MockDevice, MockDriver, Parity, PortConfig, PortDescriptor, PortError,
    PortHandle, PortReader, PortState, PortWriter, Registry, StopBits, SystemDriver,
    TransferError,
};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
