//! Line settings `serialport` has no vocabulary for.
//!
//! `serialport` knows odd/even parity and one or two stop bits. Mark and space
//! parity, and 1.5 stop bits on Windows, are set here directly on the OS
//! handle after the portable settings have been applied.

use super::config::PortConfig;
use super::error::PortError;

/// Raw OS handle of an open port, kept for the platform hook.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeHandle(std::os::unix::io::RawFd);

#[cfg(unix)]
impl NativeHandle {
    pub(crate) fn of(port: &impl std::os::unix::io::AsRawFd) -> Self {
        Self(port.as_raw_fd())
    }
}

/// Raw OS handle of an open port, kept for the platform hook.
#[cfg(windows)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeHandle(usize);

#[cfg(windows)]
impl NativeHandle {
    pub(crate) fn of(port: &impl std::os::windows::io::AsRawHandle) -> Self {
        Self(port.as_raw_handle() as usize)
    }
}

/// True if `config` needs more than the portable settings.
pub(crate) fn needs_hook(config: &PortConfig) -> bool {
    config.parity.is_stick() || (cfg!(windows) && config.stop_bits == super::config::StopBits::OnePointFive)
}

/// Apply mark/space parity via `CMSPAR`.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn apply_extras(handle: NativeHandle, config: &PortConfig) -> Result<(), PortError> {
    use super::config::Parity;
    use std::io;
    use std::mem::MaybeUninit;

    if !config.parity.is_stick() {
        return Ok(());
    }

    let fd = handle.0;
    let mut raw = MaybeUninit::<libc::termios>::uninit();
    // SAFETY: `fd` belongs to a port that outlives this call; tcgetattr fully
    // initializes the struct when it returns 0.
    let mut termios = unsafe {
        if libc::tcgetattr(fd, raw.as_mut_ptr()) != 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }
        raw.assume_init()
    };

    termios.c_cflag |= libc::PARENB | libc::CMSPAR;
    if config.parity == Parity::Mark {
        termios.c_cflag |= libc::PARODD;
    } else {
        termios.c_cflag &= !libc::PARODD;
    }
    termios.c_iflag |= libc::INPCK;
    termios.c_iflag &= !libc::IGNPAR;

    // SAFETY: as above; `termios` is a valid, initialized struct.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(PortError::Io(io::Error::last_os_error()));
    }
    Ok(())
}

/// Other POSIX systems have no portable stick parity.
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub(crate) fn apply_extras(_handle: NativeHandle, config: &PortConfig) -> Result<(), PortError> {
    if config.parity.is_stick() {
        return Err(PortError::unsupported(format!(
            "{:?} parity is not available on this platform",
            config.parity
        )));
    }
    Ok(())
}

/// Apply mark/space parity and 1.5 stop bits through the device control block.
#[cfg(windows)]
pub(crate) fn apply_extras(handle: NativeHandle, config: &PortConfig) -> Result<(), PortError> {
    use super::config::{Parity, StopBits};
    use std::io;
    use winapi::um::commapi::{GetCommState, SetCommState};
    use winapi::um::winbase::{DCB, MARKPARITY, ONE5STOPBITS, SPACEPARITY};
    use winapi::um::winnt::HANDLE;

    let handle = handle.0 as HANDLE;
    // SAFETY: DCB is plain data; all-zero is a valid starting value.
    let mut dcb: DCB = unsafe { std::mem::zeroed() };
    dcb.DCBlength = std::mem::size_of::<DCB>() as u32;

    // SAFETY: `handle` belongs to a port that outlives this call.
    if unsafe { GetCommState(handle, &mut dcb) } == 0 {
        return Err(PortError::Io(io::Error::last_os_error()));
    }

    match config.parity {
        Parity::Mark => {
            dcb.Parity = MARKPARITY as u8;
            dcb.set_fParity(1);
        }
        Parity::Space => {
            dcb.Parity = SPACEPARITY as u8;
            dcb.set_fParity(1);
        }
        _ => {}
    }
    if config.stop_bits == StopBits::OnePointFive {
        dcb.StopBits = ONE5STOPBITS as u8;
    }

    // SAFETY: as above; `dcb` was filled by GetCommState.
    if unsafe { SetCommState(handle, &mut dcb) } == 0 {
        return Err(PortError::Io(io::Error::last_os_error()));
    }
    Ok(())
}
