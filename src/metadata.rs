//! What is known about a tracked device beyond its identity.
//!
//! Backends fill [`DeviceMeta`] at enumeration time from whatever the platform
//! reports (evdev `EVIOCGID`/`EVIOCGNAME`, XInput slot, Raw Input interface
//! path). Fields the platform does not report stay `None`. `bus` is a short tag
//! such as `"usb"`, `"bluetooth"`, `"xinput"`, `"rawinput"` or `"virtual"`.
//!
//! [`DeviceInfo`] is the serializable listing record returned by
//! [`AxisManager::devices`](crate::manager::AxisManager::devices). It carries no
//! OS handle; the engine keeps sole ownership of those.
//!
//! # Example
//! ```no_run
//! use axisdelta::{AxisManager, DeviceFlags, ManagerConfig};
//!
//! let mut manager = AxisManager::new(ManagerConfig::default());
//! manager.init(DeviceFlags::all());
//! for info in manager.devices() {
//!     println!("{} [{}]: {:?}", info.name, info.class, info.meta);
//! }
//! ```

use crate::device::DeviceId;
use crate::flags::DeviceClass;
use serde::{Deserialize, Serialize};

/// Snapshot of metadata describing a single device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// High-level bus classification (e.g., `"usb"`, `"bluetooth"`, `"xinput"`).
    pub bus: Option<String>,

    /// USB Vendor ID (VID), if known.
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    pub pid: Option<u16>,

    /// Human-readable product name from the driver/firmware.
    pub product_string: Option<String>,

    /// OS/topological path to the device.
    ///
    /// Format is platform-specific and should be treated as opaque.
    pub path: Option<String>,
}

impl DeviceMeta {
    /// Map a Linux `input_id.bustype` (`BUS_*`) to a short bus hint.
    pub fn bus_name(bustype: u16) -> Option<&'static str> {
        match bustype {
            0x03 => Some("usb"),
            0x05 => Some("bluetooth"),
            0x06 => Some("virtual"),
            0x11 => Some("i8042"),
            0x18 => Some("i2c"),
            _ => None,
        }
    }
}

/// Serializable listing record for one tracked device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub class: DeviceClass,
    pub meta: DeviceMeta,
}
