//! The system driver, backed by the `serialport` crate.

use super::config::{Parity, PortConfig, StopBits};
use super::descriptor::{PathFlavor, PortDescriptor};
use super::error::PortError;
use super::platform::{self, NativeHandle};
use super::traits::{DriverPort, SerialDriver};
use serialport::{SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::debug;

/// Enumerates and opens the serial ports of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDriver;

impl SystemDriver {
    pub fn new() -> Self {
        Self
    }
}

fn describe(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_default(),
        SerialPortType::BluetoothPort => "Bluetooth Serial Port".to_string(),
        SerialPortType::PciPort => "PCI Serial Port".to_string(),
        SerialPortType::Unknown => String::new(),
    }
}

fn base_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
        // Stick parity is applied by the platform hook.
        Parity::None | Parity::Mark | Parity::Space => serialport::Parity::None,
    }
}

fn base_stop_bits(stop_bits: StopBits) -> serialport::StopBits {
    match stop_bits {
        // POSIX has no 1.5; Windows gets it from the platform hook.
        StopBits::One | StopBits::OnePointFive => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

/// The name `serialport` expects. It adds the Win32 namespace prefix itself.
fn open_name(device_path: &str) -> &str {
    if cfg!(windows) {
        device_path.strip_prefix(r"\\.\").unwrap_or(device_path)
    } else {
        device_path
    }
}

fn map_open_error(device_path: &str, err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::NoDevice => PortError::not_found(device_path),
        serialport::ErrorKind::InvalidInput => PortError::config(err.to_string()),
        _ => PortError::Serial(err),
    }
}

impl SerialDriver for SystemDriver {
    fn enumerate(&self) -> Result<Vec<PortDescriptor>, PortError> {
        let ports = serialport::available_ports()?;
        let flavor = PathFlavor::native();
        Ok(ports
            .iter()
            .map(|info| PortDescriptor::with_flavor(&info.port_name, &describe(info), flavor))
            .collect())
    }

    fn open(&self, device_path: &str, config: &PortConfig) -> Result<Box<dyn DriverPort>, PortError> {
        let native = serialport::new(open_name(device_path), config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(base_parity(config.parity))
            .stop_bits(base_stop_bits(config.stop_bits))
            .open_native()
            .map_err(|e| map_open_error(device_path, e))?;

        let handle = NativeHandle::of(&native);
        if platform::needs_hook(config) {
            platform::apply_extras(handle, config)?;
        }
        debug!(port = device_path, "system port opened");

        Ok(Box::new(SystemPort {
            port: Box::new(native),
            native: Some(handle),
            timeout: None,
        }))
    }
}

/// An open OS handle from the system driver.
struct SystemPort {
    port: Box<dyn serialport::SerialPort>,
    /// Present on the primary handle only; duplicates never reconfigure.
    native: Option<NativeHandle>,
    /// Last timeout pushed to `port`.
    timeout: Option<Duration>,
}

impl SystemPort {
    fn set_wait(&mut self, wait: Duration) -> io::Result<()> {
        if self.timeout != Some(wait) {
            self.port.set_timeout(wait)?;
            self.timeout = Some(wait);
        }
        Ok(())
    }
}

fn timed_out(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        other => other,
    }
}

impl DriverPort for SystemPort {
    fn apply_config(&mut self, config: &PortConfig) -> Result<(), PortError> {
        self.port.set_baud_rate(config.baud_rate)?;
        self.port.set_data_bits(config.data_bits.into())?;
        self.port.set_parity(base_parity(config.parity))?;
        self.port.set_stop_bits(base_stop_bits(config.stop_bits))?;
        self.port.set_flow_control(config.flow_control.into())?;
        if platform::needs_hook(config) {
            let handle = self
                .native
                .ok_or_else(|| PortError::unsupported("reconfiguring a duplicated handle"))?;
            platform::apply_extras(handle, config)?;
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8], wait: Duration) -> io::Result<usize> {
        self.set_wait(wait)?;
        timed_out(self.port.read(buffer))
    }

    fn write(&mut self, data: &[u8], wait: Duration) -> io::Result<usize> {
        self.set_wait(wait)?;
        timed_out(self.port.write(data))
    }

    fn drain(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn bytes_available(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }

    fn try_clone(&self) -> Result<Box<dyn DriverPort>, PortError> {
        Ok(Box::new(SystemPort {
            port: self.port.try_clone()?,
            native: None,
            timeout: None,
        }))
    }
}

impl std::fmt::Debug for SystemPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPort")
            .field("name", &self.port.name())
            .field("baud_rate", &self.port.baud_rate().ok())
            .field("primary", &self.native.is_some())
            .finish()
    }
}
