//! XInput pads for the joystick class.
//!
//! Controllers are addressed by slot (`0..4`). Each connected slot becomes a
//! candidate with id `xinput:{slot}` exposing the left stick as
//! [`Axis::StickX`]/[`Axis::StickY`] over the full `i16` range. XInput has no
//! slider axes; knob controllers come in through the HID side of
//! [`JoystickBackend`](super::JoystickBackend).

use crate::axis::{Axis, AxisCode, AxisLayout, AxisRange};
use crate::device::{Backend, Candidate, Capabilities, Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use windows_sys::Win32::UI::Input::XboxController::{XInputGetState, XINPUT_STATE};

const SLOTS: u32 = 4;

/// Prefix of every id this backend hands out.
pub const XINPUT_ID_PREFIX: &str = "xinput:";

/// Sample codes emitted by [`XInputDevice`].
const CODE_LX: AxisCode = 0;
const CODE_LY: AxisCode = 1;

fn read_state(slot: u32) -> Option<XINPUT_STATE> {
    // SAFETY: XINPUT_STATE is plain old data; all-zero is a valid value.
    let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
    // SAFETY: `state` is a valid, writable XINPUT_STATE for the duration of the call.
    let res = unsafe { XInputGetState(slot, &mut state) };
    (res == 0).then_some(state)
}

fn layout() -> AxisLayout {
    AxisLayout::new()
        .with(CODE_LX, Axis::StickX, AxisRange::I16)
        .with(CODE_LY, Axis::StickY, AxisRange::I16)
}

fn slot_id(slot: u32) -> DeviceId {
    DeviceId::new(format!("{XINPUT_ID_PREFIX}{slot}"))
}

#[derive(Default)]
pub struct XInputBackend {
    open_slots: Arc<Mutex<[bool; SLOTS as usize]>>,
}

impl XInputBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for XInputBackend {
    fn class(&self) -> DeviceClass {
        DeviceClass::Joystick
    }

    fn enumerate(&mut self) -> Vec<Candidate> {
        let open = *self.open_slots.lock();
        (0..SLOTS)
            .filter(|&slot| !open[slot as usize])
            .filter(|&slot| read_state(slot).is_some())
            .map(|slot| {
                let meta = DeviceMeta {
                    bus: Some("xinput".into()),
                    path: Some(format!("xinput:{slot}")),
                    ..DeviceMeta::default()
                };
                Candidate::new(
                    slot_id(slot),
                    format!("XInput Controller {slot}"),
                    Capabilities::absolute(layout()),
                )
                .with_meta(meta)
            })
            .collect()
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        let slot = (0..SLOTS)
            .find(|&slot| slot_id(slot) == candidate.id)
            .ok_or_else(|| Error::rejected(&candidate.id, "not an XInput slot"))?;
        if read_state(slot).is_none() {
            return Err(Error::rejected(&candidate.id, "slot is empty"));
        }
        self.open_slots.lock()[slot as usize] = true;
        debug!(slot, "opened XInput slot");
        Ok(Box::new(XInputDevice {
            slot,
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            meta: candidate.meta.clone(),
            last_packet: None,
            open_slots: Arc::clone(&self.open_slots),
        }))
    }

    fn shut_down(&mut self) {
        *self.open_slots.lock() = [false; SLOTS as usize];
    }
}

/// One XInput slot.
pub struct XInputDevice {
    slot: u32,
    id: DeviceId,
    name: String,
    meta: DeviceMeta,
    last_packet: Option<u32>,
    open_slots: Arc<Mutex<[bool; SLOTS as usize]>>,
}

impl Device for XInputDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> DeviceMeta {
        self.meta.clone()
    }

    /// Current stick position. An empty slot is reported as a disconnect.
    fn poll(&mut self) -> Result<Vec<RawSample>> {
        let state = read_state(self.slot).ok_or_else(|| Error::Disconnected(self.id.clone()))?;
        if self.last_packet == Some(state.dwPacketNumber) {
            return Ok(Vec::new());
        }
        self.last_packet = Some(state.dwPacketNumber);
        let pad = state.Gamepad;
        Ok(vec![
            RawSample::Absolute {
                code: CODE_LX,
                value: i32::from(pad.sThumbLX),
            },
            RawSample::Absolute {
                code: CODE_LY,
                value: i32::from(pad.sThumbLY),
            },
        ])
    }

    fn probe(&mut self) -> bool {
        read_state(self.slot).is_some()
    }

    fn close(&mut self) {
        self.open_slots.lock()[self.slot as usize] = false;
    }
}

impl Drop for XInputDevice {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_layout_spans_i16() {
        let layout = layout();
        assert_eq!(layout.resolve(CODE_LX, -32768), Some((Axis::StickX, 0.0)));
        assert_eq!(layout.resolve(CODE_LY, 32767), Some((Axis::StickY, 1.0)));
        assert!(!layout.provides(Axis::Slider0));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut backend = XInputBackend::new();
        let candidate = Candidate::new("xinput:9", "ghost", Capabilities::absolute(layout()));
        assert!(matches!(backend.open(&candidate), Err(Error::Rejected { .. })));
    }
}
