//! Byte-stream views over a port handle.
//!
//! The adapters hold a weak reference to their handle's shared state: they
//! never keep a port alive and never outlive its usefulness. Every call checks
//! that the port is still open before touching the device and otherwise fails
//! with `io::ErrorKind::NotConnected`.

use super::error::disconnected;
use super::handle::PortShared;
use std::io::{self, Read, Write};
use std::sync::{Arc, Weak};

/// Largest chunk `skip` discards in one call.
const SKIP_CHUNK: usize = 8192;

fn live(shared: &Weak<PortShared>) -> io::Result<Arc<PortShared>> {
    match shared.upgrade() {
        Some(shared) if shared.is_opened() => Ok(shared),
        _ => Err(disconnected()),
    }
}

/// Read side of a port as a byte stream.
///
/// A read that times out with nothing received returns `Ok(0)`, which
/// `io::Read` consumers treat as end of stream. Use a read timeout of `0` for
/// a stream that only ends when the port does.
#[derive(Debug)]
pub struct PortReader {
    shared: Weak<PortShared>,
}

impl PortReader {
    pub(crate) fn new(shared: Weak<PortShared>) -> Self {
        Self { shared }
    }

    /// Read one byte; `None` when the read timed out empty.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let shared = live(&self.shared)?;
        let mut byte = [0u8; 1];
        match shared.read_bytes(&mut byte, 1)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Bytes that can be read without blocking, as far as this adapter
    /// promises: always `1` while open. Use
    /// [`PortHandle::bytes_available`](super::PortHandle::bytes_available) for
    /// the exact OS count.
    pub fn available(&self) -> io::Result<usize> {
        live(&self.shared).map(|_| 1)
    }

    /// Read and discard up to `n` bytes, returning how many were consumed.
    pub fn skip(&self, n: u64) -> io::Result<u64> {
        let shared = live(&self.shared)?;
        if n == 0 {
            return Ok(0);
        }
        let len = usize::try_from(n).map_or(SKIP_CHUNK, |n| n.min(SKIP_CHUNK));
        let mut scratch = vec![0u8; len];
        let consumed = shared.read_bytes(&mut scratch, len)?;
        Ok(consumed as u64)
    }

    fn read_into(&self, buf: &mut [u8]) -> io::Result<usize> {
        let shared = live(&self.shared)?;
        let len = buf.len();
        Ok(shared.read_bytes(buf, len)?)
    }
}

impl Read for PortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf)
    }
}

impl Read for &PortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf)
    }
}

/// Write side of a port as a byte stream.
#[derive(Debug)]
pub struct PortWriter {
    shared: Weak<PortShared>,
}

impl PortWriter {
    pub(crate) fn new(shared: Weak<PortShared>) -> Self {
        Self { shared }
    }

    /// Write the low 8 bits of `value`. Returns the number of bytes the
    /// device accepted; `0` means the write timed out.
    pub fn write_byte(&self, value: u32) -> io::Result<usize> {
        let shared = live(&self.shared)?;
        let byte = [(value & 0xFF) as u8];
        Ok(shared.write_bytes(&byte, 1)?)
    }

    fn write_from(&self, buf: &[u8]) -> io::Result<usize> {
        let shared = live(&self.shared)?;
        Ok(shared.write_bytes(buf, buf.len())?)
    }

    // Bytes go straight to the OS, nothing is buffered here.
    fn check_flush(&self) -> io::Result<()> {
        live(&self.shared).map(|_| ())
    }
}

impl Write for PortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_from(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_flush()
    }
}

impl Write for &PortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_from(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_flush()
    }
}
