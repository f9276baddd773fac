//! Configuration for the `serial-comm` tool.
//!
//! TOML file with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `SERIAL_COMM_CONFIG` environment variable (explicit path)
//! 2. `./serial-comm.toml` (current directory)
//! 3. `serial-comm.toml` in the platform config directory
//!    (`~/.config/serial-comm/` on Linux, `%APPDATA%\serial-comm\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERIAL_COMM_<SECTION>_<KEY>`:
//! - `SERIAL_COMM_SERIAL_BAUD_RATE=115200`
//! - `SERIAL_COMM_SERIAL_READ_TIMEOUT_MS=50`
//! - `SERIAL_COMM_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! baud_rate = 115200
//! parity = "none"
//! read_timeout_ms = 50
//!
//! [serial.port_aliases]
//! gps = "/dev/ttyUSB1"
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    default_config_path, resolve_config_path, ConfigLoader, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
    ENV_PREFIX,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
