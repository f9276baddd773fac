//! `std::io` behavior of the stream adapters.

mod common;

use common::open_mock;
use serial_comm::port::{PortConfig, DISCONNECTED_MESSAGE};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;
use std::time::Duration;

fn assert_disconnected<T: std::fmt::Debug>(result: io::Result<T>) {
    let err = result.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    assert_eq!(err.to_string(), DISCONNECTED_MESSAGE);
}

#[test]
fn test_line_oriented_exchange() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(50, 0));

    writeln!(handle.writer(), "AT+GMI").unwrap();
    assert_eq!(device.get_write_log(), b"AT+GMI\n".to_vec());

    device.enqueue_read(b"ACME Radio\nOK\n");
    let mut lines = BufReader::new(handle.reader());
    let mut line = String::new();
    lines.read_line(&mut line).unwrap();
    assert_eq!(line, "ACME Radio\n");
    line.clear();
    lines.read_line(&mut line).unwrap();
    assert_eq!(line, "OK\n");
}

#[test]
fn test_read_timeout_looks_like_end_of_stream() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(20, 0));
    device.enqueue_read(b"tail");

    let mut collected = Vec::new();
    handle.reader().read_to_end(&mut collected).unwrap();
    assert_eq!(collected, b"tail".to_vec());
}

#[test]
fn test_write_all_over_short_writes() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(0, 30));
    device.set_tx_capacity(Some(3));
    let releaser = {
        let device = device.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            device.set_tx_capacity(None);
        })
    };

    handle.writer().write_all(b"0123456789").unwrap();
    releaser.join().unwrap();
    assert_eq!(device.get_write_log(), b"0123456789".to_vec());
}

#[test]
fn test_write_all_on_stalled_device_fails_with_write_zero() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(0, 20));
    device.set_tx_capacity(Some(0));
    let err = handle.writer().write_all(b"stuck").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    // A timeout is not a failure; the port stays usable.
    assert!(handle.is_open());
}

#[test]
fn test_adapters_fail_after_device_loss() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(20, 20));
    let reader = handle.reader();
    let writer = handle.writer();

    device.unplug();
    assert_disconnected(reader.read_byte());
    assert!(!handle.is_open());
    assert_disconnected(writer.write_byte(0x41));
    assert_disconnected(reader.available());
    let mut writer = writer;
    assert_disconnected(writer.flush());
}

#[test]
fn test_adapters_fail_after_close() {
    let (handle, _device) = open_mock(PortConfig::default());
    let mut reader = handle.reader();
    let mut writer = handle.writer();
    handle.close();

    let mut buf = [0u8; 4];
    assert_disconnected(reader.read(&mut buf));
    assert_disconnected(writer.write(b"late"));
    assert_disconnected(reader.skip(10));
}
