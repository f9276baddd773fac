use crate::config::ConfigError;
use crate::port::{PortError, TransferError};
use std::fmt;

/// A specialized `Result` type for the command-line tool.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the `serial-comm` tool.
///
/// The engine reports open failures as a plain `false`; the tool re-asks
/// with `try_open` so it can say why.
#[derive(Debug)]
pub enum AppError {
    PortNotFound(String),
    OpenFailed { port: String, source: PortError },
    Port(PortError),
    Transfer(TransferError),
    Config(ConfigError),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortNotFound(name) => write!(f, "No serial port named '{name}' is present."),
            Self::OpenFailed { port, source } => write!(f, "Could not open {port}: {source}"),
            Self::Port(e) => write!(f, "A serial port error occurred: {e}"),
            Self::Transfer(e) => write!(f, "Transfer failed: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io(e) => write!(f, "An I/O error occurred: {e}"),
            Self::Serde(e) => write!(f, "A serialization error occurred: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PortNotFound(_) => None,
            Self::OpenFailed { source, .. } => Some(source),
            Self::Port(e) => Some(e),
            Self::Transfer(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Serde(e) => Some(e),
        }
    }
}

// `From` conversions so `?` works across layers.
impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        AppError::Port(err)
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        AppError::Transfer(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serde(err)
    }
}
