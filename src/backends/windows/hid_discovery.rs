//! HID joystick discovery and the HID joystick-class backend.
//!
//! Interfaces are enumerated with `hidapi`. An interface is a candidate when
//! its top-level collection is a joystick, gamepad or multi-axis controller
//! and it is not the HID face of an XInput pad (`IG_` in the path), which the
//! XInput backend already serves. Its value fields are read through HidP and
//! mapped onto logical axes with [`hid_usage::assign_axes`]: X/Y feed the stick,
//! sliders and dials feed the slider pair in DirectInput slider order.

use super::hid_device::{HidJoystickDevice, OpenPaths};
use super::hidp_parser::{ValueField, ValueReader};
use crate::axis::{AxisCode, AxisLayout};
use crate::backends::hid_usage;
use crate::device::{Backend, Candidate, Capabilities, Device};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use hidapi::{DeviceInfo, HidApi};
use std::ffi::CString;
use std::sync::Arc;
use tracing::{debug, trace};

/// `true` for interfaces this backend should look at.
pub(crate) fn accept_device(usage_page: u16, usage: u16, path: &str) -> bool {
    hid_usage::is_game_controller(usage_page, usage) && !path.contains("IG_")
}

/// Axis layout for a device's value fields; codes are positions in `fields`.
pub(crate) fn layout_for(fields: &[ValueField]) -> AxisLayout {
    let usages: Vec<(u16, u16)> = fields.iter().map(|f| (f.usage_page, f.usage)).collect();
    let mut layout = AxisLayout::new();
    for (index, (field, axis)) in fields.iter().zip(hid_usage::assign_axes(&usages)).enumerate() {
        let (Some(axis), Ok(code)) = (axis, AxisCode::try_from(index)) else {
            continue;
        };
        layout.insert(code, axis, field.range());
    }
    layout
}

fn meta(info: &DeviceInfo) -> DeviceMeta {
    DeviceMeta {
        bus: Some("hid".into()),
        vid: Some(info.vendor_id()),
        pid: Some(info.product_id()),
        product_string: info.product_string().map(str::to_owned),
        path: Some(info.path().to_string_lossy().into_owned()),
    }
}

fn describe(info: &DeviceInfo) -> std::io::Result<Candidate> {
    let path = info.path().to_string_lossy().into_owned();
    let reader = ValueReader::open(&path)?;
    let name = info
        .product_string()
        .filter(|s| !s.is_empty())
        .unwrap_or("HID Joystick")
        .to_string();
    Ok(Candidate::new(path, name, Capabilities::absolute(layout_for(reader.fields()))).with_meta(meta(info)))
}

/// Joystick-class [`Backend`] over HID game controllers.
#[derive(Default)]
pub struct HidJoystickBackend {
    api: Option<HidApi>,
    open_paths: OpenPaths,
}

impl HidJoystickBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for HidJoystickBackend {
    fn class(&self) -> DeviceClass {
        DeviceClass::Joystick
    }

    fn bring_up(&mut self) -> Result<()> {
        if self.api.is_none() {
            let api = HidApi::new()
                .map_err(|e| Error::unavailable(DeviceClass::Joystick, format!("hidapi: {e}")))?;
            self.api = Some(api);
        }
        Ok(())
    }

    fn enumerate(&mut self) -> Vec<Candidate> {
        let Some(api) = self.api.as_mut() else {
            return Vec::new();
        };
        if let Err(e) = api.refresh_devices() {
            trace!(error = %e, "hidapi refresh failed");
            return Vec::new();
        }

        let held = self.open_paths.lock().clone();
        api.device_list()
            .filter(|info| {
                let path = info.path().to_string_lossy();
                accept_device(info.usage_page(), info.usage(), &path) && !held.contains(&*path)
            })
            .filter_map(|info| {
                describe(info)
                    .map_err(|e| trace!(path = ?info.path(), error = %e, "cannot read HID descriptor"))
                    .ok()
            })
            .collect()
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| Error::unavailable(DeviceClass::Joystick, "hidapi not initialized"))?;
        let path = CString::new(candidate.id.as_str())
            .map_err(|_| Error::rejected(&candidate.id, "path contains NUL"))?;
        let raw = api
            .open_path(&path)
            .map_err(|e| Error::rejected(&candidate.id, e.to_string()))?;
        if let Err(e) = raw.set_blocking_mode(false) {
            debug!(id = %candidate.id, error = %e, "cannot switch to non-blocking reads");
        }
        let reader = ValueReader::open(candidate.id.as_str())
            .map_err(|e| Error::rejected(&candidate.id, e.to_string()))?;

        let mapped: Vec<(AxisCode, ValueField)> = reader
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(index, field)| {
                let code = AxisCode::try_from(index).ok()?;
                candidate.caps.axes.get(code).map(|_| (code, *field))
            })
            .collect();
        if mapped.is_empty() {
            return Err(Error::rejected(&candidate.id, "no stick, slider or dial values"));
        }

        debug!(id = %candidate.id, axes = mapped.len(), "opened HID joystick");
        Ok(Box::new(HidJoystickDevice::new(
            candidate.id.clone(),
            candidate.name.clone(),
            candidate.meta.clone(),
            raw,
            reader,
            mapped,
            Arc::clone(&self.open_paths),
        )))
    }

    fn shut_down(&mut self) {
        self.open_paths.lock().clear();
        self.api = None;
    }
}
