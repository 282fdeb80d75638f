//! Open HID joystick implementing [`Device`].
//!
//! Reads are non-blocking. Each poll drains up to [`MAX_REPORTS_PER_POLL`]
//! input reports and turns every mapped value field in them into a raw
//! absolute sample keyed by the field's position in the descriptor.

use super::hidp_parser::{ValueField, ValueReader};
use crate::axis::AxisCode;
use crate::device::{Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::metadata::DeviceMeta;
use hidapi::HidDevice;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on reports drained per poll, so a chatty device cannot stall a frame.
pub const MAX_REPORTS_PER_POLL: usize = 32;

/// Interface paths currently held open by the HID backend.
pub(crate) type OpenPaths = Arc<Mutex<HashSet<String>>>;

pub struct HidJoystickDevice {
    id: DeviceId,
    name: String,
    meta: DeviceMeta,
    raw: HidDevice,
    reader: ValueReader,
    /// `(code, field)` for every field that feeds an axis.
    mapped: Vec<(AxisCode, ValueField)>,
    buf: Vec<u8>,
    open_paths: OpenPaths,
}

impl HidJoystickDevice {
    pub(crate) fn new(
        id: DeviceId,
        name: String,
        meta: DeviceMeta,
        raw: HidDevice,
        reader: ValueReader,
        mapped: Vec<(AxisCode, ValueField)>,
        open_paths: OpenPaths,
    ) -> Self {
        open_paths.lock().insert(id.as_str().to_string());
        let buf = vec![0u8; reader.report_len().max(1)];
        Self {
            id,
            name,
            meta,
            raw,
            reader,
            mapped,
            buf,
            open_paths,
        }
    }
}

impl Device for HidJoystickDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> DeviceMeta {
        self.meta.clone()
    }

    fn poll(&mut self) -> Result<Vec<RawSample>> {
        let mut samples = Vec::new();
        for _ in 0..MAX_REPORTS_PER_POLL {
            let n = self.raw.read(&mut self.buf).map_err(|e| {
                debug!(id = %self.id, error = %e, "HID read failed");
                Error::Disconnected(self.id.clone())
            })?;
            if n == 0 {
                break;
            }
            // HidP wants the full report length; clear whatever a short read left behind.
            if let Some(tail) = self.buf.get_mut(n..) {
                tail.fill(0);
            }
            for (code, field) in &self.mapped {
                if let Some(value) = self.reader.value(field, &mut self.buf) {
                    samples.push(RawSample::Absolute { code: *code, value });
                }
            }
        }
        Ok(samples)
    }

    /// A string query fails once the interface is gone.
    fn probe(&mut self) -> bool {
        self.raw.get_product_string().is_ok()
    }

    fn close(&mut self) {
        self.open_paths.lock().remove(self.id.as_str());
    }
}

impl Drop for HidJoystickDevice {
    fn drop(&mut self) {
        self.close();
    }
}
