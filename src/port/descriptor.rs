//! Port identity and device-path normalization.
//!
//! Enumeration hands back names in whatever form the OS keeps them: `COM3`
//! or `\\.\COM3` on Windows, `ttyUSB0` or `/dev/ttyUSB0` elsewhere. The
//! functions here turn those into the user-facing system name and the path
//! the driver actually opens. They are pure.

use serde::{Deserialize, Serialize};

/// Namespace marker Windows requires in front of a COM device name.
const WIN32_DEVICE_PREFIX: &str = r"\\.\";

/// Directory bare POSIX device names live in.
const POSIX_DEVICE_DIR: &str = "/dev/";

/// Naming rules of a platform's device namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathFlavor {
    Windows,
    Posix,
}

impl PathFlavor {
    /// The flavor of the platform this crate was compiled for.
    pub const fn native() -> Self {
        if cfg!(windows) {
            PathFlavor::Windows
        } else {
            PathFlavor::Posix
        }
    }

    /// The path to hand to the OS when opening `name`.
    pub fn device_path(self, name: &str) -> String {
        let name = name.trim();
        match self {
            PathFlavor::Windows if name.starts_with('\\') => name.to_string(),
            PathFlavor::Windows => format!("{WIN32_DEVICE_PREFIX}{name}"),
            PathFlavor::Posix if name.contains('/') => name.to_string(),
            PathFlavor::Posix => format!("{POSIX_DEVICE_DIR}{name}"),
        }
    }

    /// The short, user-facing name for a device path or raw OS name.
    pub fn system_name(self, raw: &str) -> String {
        let raw = raw.trim();
        match self {
            PathFlavor::Windows => after_last_backslash(raw).to_string(),
            PathFlavor::Posix => raw.to_string(),
        }
    }
}

impl Default for PathFlavor {
    fn default() -> Self {
        Self::native()
    }
}

/// Clean up a human-readable label as reported by the OS.
///
/// Registry-style labels (`\Device\Serial0`) keep only their last segment.
pub fn descriptive_label(raw: &str) -> String {
    after_last_backslash(raw.trim()).trim().to_string()
}

fn after_last_backslash(s: &str) -> &str {
    match s.rfind('\\') {
        Some(idx) => &s[idx + 1..],
        None => s,
    }
}

/// Immutable identity of one discoverable serial device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDescriptor {
    system_name: String,
    descriptive_name: String,
    device_path: String,
}

impl PortDescriptor {
    /// Build a descriptor using the naming rules of the current platform.
    pub fn new(raw_name: &str, raw_description: &str) -> Self {
        Self::with_flavor(raw_name, raw_description, PathFlavor::native())
    }

    /// Build a descriptor using explicit naming rules.
    pub fn with_flavor(raw_name: &str, raw_description: &str, flavor: PathFlavor) -> Self {
        let system_name = flavor.system_name(raw_name);
        let mut descriptive_name = descriptive_label(raw_description);
        if descriptive_name.is_empty() {
            descriptive_name = system_name.clone();
        }
        Self {
            device_path: flavor.device_path(raw_name),
            system_name,
            descriptive_name,
        }
    }

    /// Short OS name, e.g. `COM3` or `/dev/ttyUSB0`.
    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Human-readable label, e.g. `USB Modem`.
    pub fn descriptive_name(&self) -> &str {
        &self.descriptive_name
    }

    /// Canonical path the driver opens.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// True if `name` refers to this device by system name or device path.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        name == self.system_name || name == self.device_path
    }
}

impl std::fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.system_name, self.descriptive_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_windows_device_path_gets_namespace_prefix() {
        assert_eq!(PathFlavor::Windows.device_path("COM3"), r"\\.\COM3");
        assert_eq!(PathFlavor::Windows.device_path(r"\\.\COM3"), r"\\.\COM3");
        assert_eq!(
            PathFlavor::Windows.device_path(r"\\?\usb#vid_0403"),
            r"\\?\usb#vid_0403"
        );
    }

    #[test]
    fn test_windows_system_name_strips_namespace() {
        assert_eq!(PathFlavor::Windows.system_name(r"\\.\COM12"), "COM12");
        assert_eq!(PathFlavor::Windows.system_name("COM5"), "COM5");
    }

    #[test]
    fn test_posix_paths() {
        assert_eq!(PathFlavor::Posix.device_path("ttyUSB0"), "/dev/ttyUSB0");
        assert_eq!(PathFlavor::Posix.device_path("/dev/ttyS1"), "/dev/ttyS1");
        assert_eq!(
            PathFlavor::Posix.device_path("/dev/serial/by-id/usb-FTDI"),
            "/dev/serial/by-id/usb-FTDI"
        );
        assert_eq!(PathFlavor::Posix.system_name(" /dev/ttyACM0 "), "/dev/ttyACM0");
    }

    #[test]
    fn test_descriptive_label() {
        assert_eq!(descriptive_label(r"\Device\Serial0"), "Serial0");
        assert_eq!(descriptive_label("  GPS Receiver "), "GPS Receiver");
    }

    #[test]
    fn test_descriptor_fields() {
        let d = PortDescriptor::with_flavor("COM3", "USB Modem", PathFlavor::Windows);
        assert_eq!(d.system_name(), "COM3");
        assert_eq!(d.descriptive_name(), "USB Modem");
        assert_eq!(d.device_path(), r"\\.\COM3");
        assert!(d.matches("COM3"));
        assert!(d.matches(r"\\.\COM3"));
        assert!(!d.matches("COM4"));
        assert_eq!(d.to_string(), "COM3: USB Modem");
    }

    #[test]
    fn test_empty_description_falls_back_to_system_name() {
        let d = PortDescriptor::with_flavor("/dev/ttyS0", "   ", PathFlavor::Posix);
        assert_eq!(d.descriptive_name(), "/dev/ttyS0");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for flavor in [PathFlavor::Windows, PathFlavor::Posix] {
            for name in ["COM1", "ttyUSB3", "/dev/ttyS0", r"\\.\COM9"] {
                let once = flavor.device_path(name);
                assert_eq!(flavor.device_path(&once), once);
            }
        }
    }
}
