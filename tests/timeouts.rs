//! Timing behavior of raw transfers under each timeout policy.

mod common;

use common::{open_mock, timed, SLACK};
use serial_comm::port::PortConfig;
use std::thread;
use std::time::Duration;

const T: Duration = Duration::from_millis(80);

fn bounded(read_ms: u32, write_ms: u32) -> PortConfig {
    PortConfig::default().with_timeouts(read_ms, write_ms)
}

#[test]
fn test_bounded_read_with_no_data_returns_zero_after_timeout() {
    let (handle, _device) = open_mock(bounded(80, 0));
    let mut buf = [0u8; 32];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 32));
    assert_eq!(n, Ok(0));
    assert!(elapsed >= T, "returned early: {elapsed:?}");
    assert!(elapsed < T + SLACK, "returned late: {elapsed:?}");
}

#[test]
fn test_bounded_read_returns_partial_data_at_timeout() {
    let (handle, device) = open_mock(bounded(80, 0));
    device.enqueue_read(b"abc");

    let mut buf = [0u8; 10];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 10));
    assert_eq!(n, Ok(3));
    assert_eq!(&buf[..3], b"abc");
    assert!(elapsed >= T);
}

#[test]
fn test_bounded_read_returns_early_once_full() {
    let (handle, device) = open_mock(bounded(5_000, 0));
    device.enqueue_read(b"0123456789");

    let mut buf = [0u8; 4];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 4));
    assert_eq!(n, Ok(4));
    assert!(elapsed < SLACK);
    assert_eq!(device.pending_reads(), 6);
}

#[test]
fn test_bounded_read_gathers_bytes_arriving_in_pieces() {
    let (handle, device) = open_mock(bounded(2_000, 0));
    let feeder = {
        let device = device.clone();
        thread::spawn(move || {
            for chunk in [b"he".as_slice(), b"ll", b"o!"] {
                thread::sleep(Duration::from_millis(20));
                device.enqueue_read(chunk);
            }
        })
    };

    let mut buf = [0u8; 6];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 6));
    feeder.join().unwrap();
    assert_eq!(n, Ok(6));
    assert_eq!(&buf, b"hello!");
    assert!(elapsed < Duration::from_millis(2_000));
}

#[test]
fn test_indefinite_read_returns_on_first_bytes() {
    let (handle, device) = open_mock(bounded(0, 0));
    let feeder = {
        let device = device.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            device.enqueue_read(b"x");
        })
    };

    let mut buf = [0u8; 64];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 64));
    feeder.join().unwrap();
    assert_eq!(n, Ok(1));
    // Outlives several poll slices without giving up.
    assert!(elapsed >= Duration::from_millis(250));
}

#[test]
fn test_bounded_write_times_out_on_stalled_device() {
    let (handle, device) = open_mock(bounded(0, 80));
    device.set_tx_capacity(Some(0));

    let (n, elapsed) = timed(|| handle.write_bytes(b"stalled", 7));
    assert_eq!(n, Ok(0));
    assert!(elapsed >= T);
    assert!(elapsed < T + SLACK);
}

#[test]
fn test_bounded_write_reports_short_transfer() {
    let (handle, device) = open_mock(bounded(0, 80));
    device.set_tx_capacity(Some(4));

    assert_eq!(handle.write_bytes(b"0123456789", 10), Ok(4));
    assert_eq!(device.get_write_log(), b"0123".to_vec());
}

#[test]
fn test_indefinite_write_waits_for_capacity() {
    let (handle, device) = open_mock(bounded(0, 0));
    device.set_tx_capacity(Some(2));
    let releaser = {
        let device = device.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            device.set_tx_capacity(None);
        })
    };

    let (n, elapsed) = timed(|| handle.write_bytes(b"complete", 8));
    releaser.join().unwrap();
    assert_eq!(n, Ok(8));
    assert!(elapsed >= Duration::from_millis(150));
    assert_eq!(device.get_write_log(), b"complete".to_vec());
}

#[test]
fn test_timeout_change_applies_to_next_call() {
    let (handle, device) = open_mock(bounded(0, 0));

    handle.configure_timeouts(30, 0).unwrap();
    let mut buf = [0u8; 4];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 4));
    assert_eq!(n, Ok(0));
    assert!(elapsed < SLACK);
    // Timeouts alone never touch the line parameters.
    assert_eq!(device.applied_configs().len(), 1);
    assert_eq!(device.drain_count(), 0);
}

#[test]
fn test_zero_length_transfers_do_not_wait() {
    let (handle, _device) = open_mock(bounded(0, 0));
    let mut buf = [0u8; 4];
    let (n, elapsed) = timed(|| handle.read_bytes(&mut buf, 0));
    assert_eq!(n, Ok(0));
    assert!(elapsed < SLACK);
    assert_eq!(handle.write_bytes(b"", 0), Ok(0));
}
