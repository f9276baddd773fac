//! Open / configure / close lifecycle against the mock driver.

mod common;

use common::{mock_registry, open_mock, timed, MOCK_PORT, SLACK};
use serial_comm::port::{
    MockDevice, Parity, PortConfig, PortError, PortState, StopBits, TransferError,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_open_then_close() {
    let (handle, device) = open_mock(PortConfig::default());
    assert_eq!(handle.state(), PortState::Opened);
    assert!(handle.is_open());
    assert_eq!(device.open_handles(), 2);

    assert!(handle.close());
    assert_eq!(handle.state(), PortState::Closed);
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_io_rejected_unless_opened() {
    let device = MockDevice::new(MOCK_PORT, "Mock Serial");
    let (registry, _) = mock_registry(&[device.clone()]);
    let handle = registry.handle_for(MOCK_PORT);

    let mut buf = [0u8; 4];
    assert_eq!(handle.read_bytes(&mut buf, 4), Err(TransferError::NotOpen));
    assert_eq!(handle.write_bytes(b"data", 4), Err(TransferError::NotOpen));

    assert!(handle.open());
    handle.close();
    assert_eq!(handle.read_bytes(&mut buf, 4), Err(TransferError::NotOpen));
    assert_eq!(handle.write_bytes(b"data", 4), Err(TransferError::NotOpen));
    assert!(device.get_write_log().is_empty());
}

#[test]
fn test_failed_open_leaves_handle_retryable() {
    let device = MockDevice::new(MOCK_PORT, "Mock Serial");
    let (registry, _) = mock_registry(&[device.clone()]);
    let handle = registry.handle_for(MOCK_PORT);

    device.set_claimed(true);
    assert!(!handle.open());
    assert_eq!(handle.state(), PortState::Unopened);
    assert!(matches!(handle.try_open(), Err(PortError::Busy(_))));

    device.set_claimed(false);
    assert!(handle.open());
}

#[test]
fn test_second_handle_cannot_open_same_device() {
    let device = MockDevice::new(MOCK_PORT, "Mock Serial");
    let (registry, _) = mock_registry(&[device.clone()]);
    let first = registry.handle_for(MOCK_PORT);
    let second = registry.handle_for(MOCK_PORT);

    assert!(first.open());
    assert!(!second.open());
    first.close();
    assert!(second.open());
}

#[test]
fn test_open_missing_device() {
    let (registry, _) = mock_registry(&[]);
    let handle = registry.handle_for("ttyGONE");
    assert!(!handle.open());
    assert!(matches!(handle.try_open(), Err(PortError::NotFound(_))));
}

#[test]
fn test_reconfigure_while_open_drains_then_applies() {
    let (handle, device) = open_mock(PortConfig::default());
    let faster = PortConfig::default()
        .with_baud_rate(115200)
        .with_parity(Parity::Space)
        .with_stop_bits(StopBits::OnePointFive);

    handle.configure(faster).unwrap();
    assert_eq!(device.drain_count(), 1);
    assert_eq!(device.applied_configs().last(), Some(&faster));
    assert_eq!(handle.config(), faster);
    assert!(!handle.is_dirty());
}

#[test]
fn test_staged_values_wait_for_apply() {
    let (handle, device) = open_mock(PortConfig::default());
    handle
        .stage_config(PortConfig::default().with_baud_rate(38400))
        .unwrap();
    assert!(handle.is_dirty());
    assert_eq!(device.applied_configs().len(), 1);

    handle.apply().unwrap();
    assert!(!handle.is_dirty());
    assert_eq!(device.applied_configs().last().unwrap().baud_rate, 38400);
}

#[test]
fn test_close_unblocks_indefinite_read() {
    let (handle, _device) = open_mock(PortConfig::default());
    let handle = Arc::new(handle);

    let reader = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            let mut buf = [0u8; 8];
            timed(|| handle.read_bytes(&mut buf, 8))
        })
    };

    thread::sleep(Duration::from_millis(50));
    let (closed, close_time) = timed(|| handle.close());
    assert!(closed);
    assert!(close_time < SLACK);

    let (result, _) = reader.join().unwrap();
    assert_eq!(result, Err(TransferError::NotOpen));
}

#[test]
fn test_device_failure_closes_handle() {
    let (handle, device) = open_mock(PortConfig::default().with_timeouts(1000, 0));

    let unplugger = {
        let device = device.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            device.unplug();
        })
    };

    let mut buf = [0u8; 4];
    assert_eq!(handle.read_bytes(&mut buf, 4), Err(TransferError::DeviceFailure));
    unplugger.join().unwrap();

    assert_eq!(handle.state(), PortState::Closed);
    assert_eq!(device.open_handles(), 0);
    assert!(!handle.close());

    // Even with the device back, this handle stays closed.
    device.replug();
    assert!(!handle.open());
    assert_eq!(handle.write_bytes(b"x", 1), Err(TransferError::NotOpen));
}

#[test]
fn test_reader_and_writer_do_not_block_each_other() {
    let (handle, device) = open_mock(PortConfig::default());
    let handle = Arc::new(handle);

    let reader = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            let mut buf = [0u8; 16];
            let n = handle.read_bytes(&mut buf, 16).unwrap();
            buf[..n].to_vec()
        })
    };

    thread::sleep(Duration::from_millis(30));
    let (written, elapsed) = timed(|| handle.write_bytes(b"ping", 4));
    assert_eq!(written, Ok(4));
    assert!(elapsed < SLACK);

    device.enqueue_read(b"pong");
    assert_eq!(reader.join().unwrap(), b"pong".to_vec());
    assert_eq!(device.get_write_log(), b"ping".to_vec());
}

#[test]
fn test_concurrent_close_releases_exactly_once() {
    let (handle, device) = open_mock(PortConfig::default());
    let handle = Arc::new(handle);

    let closers: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.close())
        })
        .collect();
    let released = closers
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|&released| released)
        .count();

    assert_eq!(released, 1);
    assert_eq!(device.open_handles(), 0);
}
