//! Backend contract: how OS-specific code hands raw data to the tracking engine.
//!
//! A [`Backend`] serves one [`DeviceClass`]. It lists [`Candidate`]s, opens them
//! into [`Device`] handles, and tears itself down. A [`Device`] yields raw
//! samples on [`poll`](Device::poll), answers a cheap liveness
//! [`probe`](Device::probe), and releases its OS resource on
//! [`close`](Device::close).
//!
//! Backends that are callback- or event-queue-driven stage their data internally
//! and hand it out on the next `poll`; the engine only ever pulls.
//!
//! ## Identity
//! [`DeviceId`] must be stable for the lifetime of the physical connection and
//! unique among devices of the same class (an evdev node path, an XInput slot,
//! a Raw Input device interface path). The engine uses it to avoid opening the
//! same device twice.

use crate::axis::{AxisCode, AxisLayout};
use crate::error::Result;
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a physical device within its class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One raw reading produced since the previous poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawSample {
    /// Absolute axis position in the device's native units.
    Absolute { code: AxisCode, value: i32 },
    /// Relative motion (raw counts), already summed by the backend if it likes.
    Relative { dx: f64, dy: f64 },
}

/// Raw capabilities a candidate reports before it is opened.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capabilities {
    /// Absolute axes the device exposes, mapped onto logical axes.
    pub axes: AxisLayout,
    /// Whether the device reports any absolute axis at all, mapped or not.
    pub absolute: bool,
    pub relative_x: bool,
    pub relative_y: bool,
}

impl Capabilities {
    /// Capabilities of a positional device with the given layout.
    pub fn absolute(axes: AxisLayout) -> Self {
        Self {
            axes,
            absolute: true,
            ..Self::default()
        }
    }

    /// Capabilities of a pointer reporting relative X and Y.
    pub fn relative() -> Self {
        Self {
            relative_x: true,
            relative_y: true,
            ..Self::default()
        }
    }

    /// Does this satisfy the minimum raw capability of `class`?
    ///
    /// Joystick-class needs absolute positional axes; mouse-class needs both
    /// relative X and Y.
    pub fn satisfies(&self, class: DeviceClass) -> bool {
        match class {
            DeviceClass::Joystick => self.absolute,
            DeviceClass::Mouse => self.relative_x && self.relative_y,
        }
    }
}

/// A device the backend can see but the engine has not opened yet.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub id: DeviceId,
    pub name: String,
    pub caps: Capabilities,
    pub meta: DeviceMeta,
}

impl Candidate {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, caps: Capabilities) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            caps,
            meta: DeviceMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: DeviceMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// An open device handle owned by the engine.
pub trait Device: Send {
    fn id(&self) -> &DeviceId;

    fn name(&self) -> &str;

    fn meta(&self) -> DeviceMeta {
        DeviceMeta::default()
    }

    /// Drain every raw sample produced since the previous poll. Never blocks.
    ///
    /// An `Err` is treated as a disconnection.
    fn poll(&mut self) -> Result<Vec<RawSample>>;

    /// Cheap liveness check used during rescans. `false` means the device is gone.
    fn probe(&mut self) -> bool;

    /// Release the OS resource. Called exactly once, before the handle is dropped.
    fn close(&mut self) {}
}

/// Per-class source of devices for one platform.
pub trait Backend: Send {
    fn class(&self) -> DeviceClass;

    /// Class-wide setup (open a subsystem, register for input). An `Err` keeps
    /// the class uninitialized.
    fn bring_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// List the devices currently visible. May include devices already open;
    /// the engine filters those by [`DeviceId`].
    fn enumerate(&mut self) -> Vec<Candidate>;

    /// Open a candidate. An `Err` means "skip it", not a failure of the class.
    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>>;

    /// Tear down class-wide state. Every device has already been closed.
    fn shut_down(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Axis, AxisRange};

    #[test]
    fn joystick_needs_absolute_axes() {
        let caps = Capabilities::absolute(AxisLayout::new().with(0, Axis::StickX, AxisRange::U8));
        assert!(caps.satisfies(DeviceClass::Joystick));
        assert!(!caps.satisfies(DeviceClass::Mouse));
        assert!(!Capabilities::default().satisfies(DeviceClass::Joystick));
    }

    #[test]
    fn mouse_needs_both_relative_axes() {
        assert!(Capabilities::relative().satisfies(DeviceClass::Mouse));
        let only_x = Capabilities {
            relative_x: true,
            ..Capabilities::default()
        };
        assert!(!only_x.satisfies(DeviceClass::Mouse));
        assert!(!Capabilities::relative().satisfies(DeviceClass::Joystick));
    }

    #[test]
    fn device_id_displays_verbatim() {
        let id = DeviceId::from("/dev/input/event3");
        assert_eq!(id.to_string(), "/dev/input/event3");
        assert_eq!(id.as_str(), "/dev/input/event3");
    }
}
