//! evdev node discovery.
//!
//! Lists `event*` nodes in the input directory, opens each one read-only and
//! non-blocking, and reads its capability bitmaps into a [`Candidate`].
//! Nodes that cannot be opened (permissions, races with removal) are skipped.

use super::evdev_sys::{self, ABS_MISC, ABS_RUDDER, ABS_THROTTLE, ABS_X, ABS_Y, EV_ABS, EV_REL, REL_X, REL_Y};
use crate::axis::{Axis, AxisCode, AxisLayout, AxisRange};
use crate::device::{Candidate, Capabilities, DeviceId, RawSample};
use crate::metadata::DeviceMeta;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Absolute codes that feed a logical axis.
pub(crate) const ABS_AXIS_MAP: [(AxisCode, Axis); 5] = [
    (ABS_X, Axis::StickX),
    (ABS_Y, Axis::StickY),
    (ABS_THROTTLE, Axis::Slider0),
    (ABS_MISC, Axis::Slider0),
    (ABS_RUDDER, Axis::Slider1),
];

/// Where each mapped axis rests right now, as raw samples.
///
/// Axes whose state cannot be read are left out; their first event becomes the
/// baseline instead.
pub(crate) fn resting_samples(file: &File, layout: &AxisLayout) -> Vec<RawSample> {
    let fd = file.as_fd();
    ABS_AXIS_MAP
        .iter()
        .filter(|(code, _)| layout.get(*code).is_some())
        .filter_map(|&(code, _)| {
            let info = evdev_sys::abs_info(fd, code).ok()?;
            Some(RawSample::Absolute {
                code,
                value: info.value,
            })
        })
        .collect()
}

pub(crate) fn open_node(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// `event*` nodes in `dir`, sorted by name.
pub(crate) fn event_nodes(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut nodes: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("event"))
        .map(|entry| entry.path())
        .collect();
    nodes.sort();
    Ok(nodes)
}

/// Read everything the engine needs to know about an open node.
pub(crate) fn describe(path: &Path, file: &File) -> io::Result<Candidate> {
    let fd = file.as_fd();
    let types = evdev_sys::event_types(fd)?;

    let mut caps = Capabilities::default();

    if types.contains(EV_ABS) {
        caps.absolute = true;
        let codes = evdev_sys::abs_codes(fd)?;
        let mut layout = AxisLayout::new();
        for (code, axis) in ABS_AXIS_MAP {
            if !codes.contains(code) {
                continue;
            }
            match evdev_sys::abs_info(fd, code) {
                Ok(info) => layout.insert(code, axis, AxisRange::new(info.minimum, info.maximum)),
                Err(e) => trace!(path = %path.display(), code, error = %e, "EVIOCGABS failed"),
            }
        }
        caps.axes = layout;
    }

    if types.contains(EV_REL) {
        let codes = evdev_sys::rel_codes(fd)?;
        caps.relative_x = codes.contains(REL_X);
        caps.relative_y = codes.contains(REL_Y);
    }

    let name = evdev_sys::device_name(fd).unwrap_or_default();
    let mut meta = DeviceMeta {
        product_string: (!name.is_empty()).then(|| name.clone()),
        path: Some(path.display().to_string()),
        ..DeviceMeta::default()
    };
    if let Ok(id) = evdev_sys::device_id(fd) {
        meta.bus = DeviceMeta::bus_name(id.bustype).map(str::to_owned);
        meta.vid = Some(id.vendor);
        meta.pid = Some(id.product);
    }

    let name = if name.is_empty() {
        "Unknown Device".to_string()
    } else {
        name
    };

    Ok(Candidate::new(DeviceId::new(path.display().to_string()), name, caps).with_meta(meta))
}
