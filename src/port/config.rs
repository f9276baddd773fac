//! Line parameters and timeouts for a serial port.
//!
//! `PortConfig` is the value a caller stages on a `PortHandle`. It carries no
//! OS state; pushing it to the device is the handle's job.

use super::error::PortError;
use super::timeout::TimeoutPolicy;
use serde::{Deserialize, Serialize};

/// Default baud rate for freshly enumerated ports.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Baud rate (bits per second). Must be positive.
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Read timeout in milliseconds; `0` blocks until data arrives.
    pub read_timeout_ms: u32,

    /// Write timeout in milliseconds; `0` blocks until everything is accepted.
    pub write_timeout_ms: u32,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl PortConfig {
    /// Check the invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }
        Ok(())
    }

    /// The blocking behavior implied by the two timeout fields.
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::from_millis(self.read_timeout_ms, self.write_timeout_ms)
    }

    /// True when both configs frame bytes identically on the wire.
    pub fn same_line_parameters(&self, other: &PortConfig) -> bool {
        self.baud_rate == other.baud_rate
            && self.data_bits == other.data_bits
            && self.stop_bits == other.stop_bits
            && self.parity == other.parity
            && self.flow_control == other.flow_control
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    pub fn with_timeouts(mut self, read_timeout_ms: u32, write_timeout_ms: u32) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self.write_timeout_ms = write_timeout_ms;
        self
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    /// The bit count as a plain number.
    pub fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(PortError::config(format!(
                "byte size must be between 5 and 8, got {other}"
            ))),
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
    /// Parity bit always set.
    Mark,
    /// Parity bit always clear.
    Space,
}

impl Parity {
    /// True for the two "stick" parities that need a platform hook.
    pub fn is_stick(self) -> bool {
        matches!(self, Parity::Mark | Parity::Space)
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}
