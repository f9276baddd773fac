//! Shared test utilities.
//!
//! Every integration test talks to the engine through a `MockDriver`, so the
//! whole suite runs without serial hardware.

#![allow(dead_code)]

use serial_comm::port::{MockDevice, MockDriver, PortConfig, PortHandle, Registry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name of the single device created by [`open_mock`].
pub const MOCK_PORT: &str = "ttyMOCK0";

/// A registry over `devices`, plus the driver for failure injection.
pub fn mock_registry(devices: &[MockDevice]) -> (Registry, Arc<MockDriver>) {
    let driver = MockDriver::new();
    for device in devices {
        driver.add_device(device.clone());
    }
    let driver = Arc::new(driver);
    (Registry::new(driver.clone()), driver)
}

/// One device, its handle configured with `config` and opened.
pub fn open_mock(config: PortConfig) -> (PortHandle, MockDevice) {
    let device = MockDevice::new(MOCK_PORT, "Mock Serial");
    let (registry, _) = mock_registry(&[device.clone()]);
    let handle = registry.handle_for(MOCK_PORT);
    handle.configure(config).expect("configure mock port");
    assert!(handle.open(), "mock port should open");
    (handle, device)
}

/// Run `f` and return its result with the wall time it took.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Slack allowed on top of a timeout before a test calls it late.
pub const SLACK: Duration = Duration::from_millis(400);
