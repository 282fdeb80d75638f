//! Input backends for `axisdelta`.
//!
//! Implementations of [`Backend`](crate::device::Backend) and
//! [`Device`](crate::device::Device) for platform-specific input sources.
//!
//! - **Linux**: evdev nodes under `/dev/input` for both joystick-class
//!   (absolute axes) and mouse-class (relative X/Y) devices.
//! - **Windows**: HID game controllers and XInput slots for joystick-class
//!   devices, and a Raw Input feed (forwarded `WM_INPUT` messages) for
//!   mouse-class devices.
//! - Other platforms have no default backend; register one with
//!   [`AxisManager::set_backend`](crate::manager::AxisManager::set_backend).
//! - **`virtual`** feature: an in-memory backend for tests and simulations.
//!
//! Backends only read from devices; nothing here writes to or grabs them.

use crate::config::ManagerConfig;
use crate::device::Backend;
use crate::flags::DeviceClass;

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod linux;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

#[cfg(feature = "virtual")]
#[cfg_attr(docsrs, doc(cfg(feature = "virtual")))]
pub mod virtual_input;

pub mod hid_usage;

/// The platform's default backend for `class`, if there is one.
///
/// On Windows the mouse backend needs a host window before it can come up; build
/// a `RawInputMouseBackend` over an attached `RawInputFeed` and register it on
/// the manager yourself.
#[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
pub fn default_backend(class: DeviceClass, config: &ManagerConfig) -> Option<Box<dyn Backend>> {
    #[cfg(target_os = "linux")]
    let backend: Option<Box<dyn Backend>> =
        Some(Box::new(linux::EvdevBackend::new(class, &config.input_dir)));

    #[cfg(target_os = "windows")]
    let backend: Option<Box<dyn Backend>> = match class {
        DeviceClass::Joystick => Some(Box::new(windows::JoystickBackend::new())),
        DeviceClass::Mouse => Some(Box::new(windows::RawInputMouseBackend::new(
            windows::RawInputFeed::new(),
        ))),
    };

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    let backend: Option<Box<dyn Backend>> = None;

    backend
}
