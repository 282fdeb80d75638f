//! The Windows joystick class: HID game controllers plus XInput pads.
//!
//! HID interfaces carry sticks, sliders and dials; XInput-compatible pads are
//! skipped there (`IG_` paths) and served by XInput instead, so nothing is
//! counted twice. HID failing to come up only loses HID devices.

use super::hid_discovery::HidJoystickBackend;
use super::xinput::{XInputBackend, XINPUT_ID_PREFIX};
use crate::device::{Backend, Candidate, Device};
use crate::error::Result;
use crate::flags::DeviceClass;
use tracing::warn;

#[derive(Default)]
pub struct JoystickBackend {
    hid: HidJoystickBackend,
    xinput: XInputBackend,
    hid_up: bool,
}

impl JoystickBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for JoystickBackend {
    fn class(&self) -> DeviceClass {
        DeviceClass::Joystick
    }

    fn bring_up(&mut self) -> Result<()> {
        self.xinput.bring_up()?;
        self.hid_up = match self.hid.bring_up() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "HID joysticks unavailable, continuing with XInput only");
                false
            }
        };
        Ok(())
    }

    fn enumerate(&mut self) -> Vec<Candidate> {
        let mut candidates = if self.hid_up {
            self.hid.enumerate()
        } else {
            Vec::new()
        };
        candidates.extend(self.xinput.enumerate());
        candidates
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        if candidate.id.as_str().starts_with(XINPUT_ID_PREFIX) {
            self.xinput.open(candidate)
        } else {
            self.hid.open(candidate)
        }
    }

    fn shut_down(&mut self) {
        self.hid.shut_down();
        self.xinput.shut_down();
        self.hid_up = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Capabilities;
    use crate::error::Error;

    #[test]
    fn xinput_ids_go_to_xinput() {
        let mut backend = JoystickBackend::new();
        let candidate = Candidate::new("xinput:9", "ghost", Capabilities::default());
        assert!(matches!(backend.open(&candidate), Err(Error::Rejected { .. })));
    }

    #[test]
    fn other_ids_go_to_hid() {
        // HID was never brought up, so the HID side refuses.
        let mut backend = JoystickBackend::new();
        let candidate = Candidate::new(r"\\?\HID#VID_1234&PID_5678#1", "knobs", Capabilities::default());
        assert!(matches!(
            backend.open(&candidate),
            Err(Error::BackendUnavailable { .. })
        ));
    }
}
