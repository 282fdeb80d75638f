//! Per-frame analog axis deltas from joysticks and mice.
//!
//! Call [`AxisManager::update`] once per frame, then read the motion since the
//! previous frame with [`AxisManager::axis_deltas`] for one of three
//! [`InputMode`] channels: the analog stick, the two sliders, or the mouse.
//! Positional axes are normalized to `[0, 1]` and differenced with wrap-around
//! correction, so spinner-style controllers that roll over from max to min read
//! as small steps instead of full-range jumps. Devices are discovered and
//! dropped while running, at most once per rescan interval.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod axis;
pub mod backends;
pub mod clock;
pub mod config;
pub mod device;
pub mod device_set;
pub mod error;
pub mod flags;
pub mod manager;
pub mod metadata;

pub use axis::{normalize, wrap_delta, Axis, AxisCode, AxisLayout, AxisRange, AxisValues, InputMode};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::ManagerConfig;
pub use device::*;
pub use device_set::DeviceSet;
pub use error::{Error, Result};
pub use flags::{DeviceClass, DeviceFlags};
pub use manager::*;
pub use metadata::{DeviceInfo, DeviceMeta};
