//! Windows input backends.
//!
//! - **HID + XInput** serve the joystick class through [`JoystickBackend`].
//!   HID game controllers report X/Y on the stick and their sliders and dials
//!   on the slider pair; XInput pads report their left stick.
//! - **Raw Input** serves the mouse class. It needs a host window: attach one
//!   to a [`RawInputFeed`] and forward `WM_INPUT` messages into it.
//!
//! [`default_backend`](crate::backends::default_backend) builds the mouse side
//! with a fresh, unattached feed, so the mouse class fails to come up until the
//! host installs its own backend via
//! [`AxisManager::set_backend`](crate::manager::AxisManager::set_backend):
//!
//! ```no_run
//! # #[cfg(windows)] {
//! use axisdelta::backends::windows::{RawInputFeed, RawInputMouseBackend};
//! use axisdelta::{AxisManager, DeviceFlags, ManagerConfig};
//!
//! # let hwnd: isize = 0;
//! let feed = RawInputFeed::new();
//! feed.attach_window(hwnd);
//! let mut manager = AxisManager::new(ManagerConfig::default());
//! manager.set_backend(Box::new(RawInputMouseBackend::new(feed.clone())));
//! manager.init(DeviceFlags::all());
//! // in the window procedure: feed.handle_wm_input(lparam);
//! # }
//! ```

pub mod hid_device;
pub mod hid_discovery;
mod hidp_parser;
pub mod joystick;
pub mod raw_input;
pub mod xinput;

pub use hid_device::HidJoystickDevice;
pub use hid_discovery::HidJoystickBackend;
pub use joystick::JoystickBackend;
pub use raw_input::{RawInputFeed, RawInputMouseBackend, RawInputMouseDevice, UNATTRIBUTED_ID};
pub use xinput::{XInputBackend, XInputDevice};
