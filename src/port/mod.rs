//! The serial port engine.
//!
//! [`Registry`] lists devices and hands out [`PortHandle`]s. A handle owns
//! one device through its `Unopened -> Opened -> Closed` lifecycle, does raw
//! timed transfers, and exposes [`PortReader`] / [`PortWriter`] stream views.
//! Everything below the handle goes through the [`SerialDriver`] trait:
//! [`SystemDriver`] for real hardware, [`MockDriver`] for tests.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod mock;
mod platform;
pub mod registry;
pub mod state;
pub mod stream;
pub mod sync_port;
pub mod timeout;
pub mod traits;

pub use config::{DataBits, FlowControl, Parity, PortConfig, StopBits, DEFAULT_BAUD_RATE};
pub use descriptor::{PathFlavor, PortDescriptor};
pub use error::{PortError, TransferError, DISCONNECTED_MESSAGE};
pub use handle::PortHandle;
pub use mock::{MockDevice, MockDriver};
pub use registry::Registry;
pub use state::PortState;
pub use stream::{PortReader, PortWriter};
pub use sync_port::SystemDriver;
pub use timeout::{Blocking, Deadline, TimeoutPolicy, POLL_SLICE};
pub use traits::{DriverPort, SerialDriver};
