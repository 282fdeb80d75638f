//! Open evdev node implementing [`Device`].
//!
//! Reads are non-blocking: [`poll`](Device::poll) drains whole `input_event`
//! records until the kernel reports `EAGAIN`. Joystick-class nodes report every
//! `EV_ABS` event as a raw sample, preceded on the first poll by the positions
//! the kernel held when the node was opened. Mouse-class nodes sum
//! `REL_X`/`REL_Y` into a single relative sample per poll.

use super::evdev_sys::{self, EVENT_SIZE, EV_ABS, EV_REL, REL_X, REL_Y};
use super::OpenPaths;
use crate::device::{Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::path::PathBuf;

/// Events read per `read(2)` call.
const EVENTS_PER_READ: usize = 64;

pub struct EvdevDevice {
    id: DeviceId,
    name: String,
    meta: DeviceMeta,
    class: DeviceClass,
    path: PathBuf,
    file: Option<File>,
    /// Axis positions read at open time, handed out by the first poll.
    resting: Vec<RawSample>,
    open_paths: OpenPaths,
}

impl EvdevDevice {
    pub(crate) fn new(
        id: DeviceId,
        name: String,
        meta: DeviceMeta,
        class: DeviceClass,
        path: PathBuf,
        file: File,
        resting: Vec<RawSample>,
        open_paths: OpenPaths,
    ) -> Self {
        open_paths.lock().insert(path.clone());
        Self {
            id,
            name,
            meta,
            class,
            path,
            file: Some(file),
            resting,
            open_paths,
        }
    }

    fn read_events(&mut self) -> Result<Vec<(u16, u16, i32)>> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Disconnected(self.id.clone()))?;

        let mut events = Vec::new();
        let mut buf = vec![0u8; EVENT_SIZE * EVENTS_PER_READ];
        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let filled = buf.get(..n).unwrap_or_default();
                    events.extend(filled.chunks_exact(EVENT_SIZE).filter_map(evdev_sys::decode_event));
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(events)
    }
}

impl Device for EvdevDevice {
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
        let events = self.read_events()?;
        let samples = match self.class {
            DeviceClass::Joystick => std::mem::take(&mut self.resting)
                .into_iter()
                .chain(
                    events
                        .into_iter()
                        .filter(|(ty, _, _)| *ty == EV_ABS)
                        .map(|(_, code, value)| RawSample::Absolute { code, value }),
                )
                .collect(),
            DeviceClass::Mouse => {
                let (mut dx, mut dy) = (0.0, 0.0);
                for (ty, code, value) in events {
                    if ty != EV_REL {
                        continue;
                    }
                    match code {
                        REL_X => dx += f64::from(value),
                        REL_Y => dy += f64::from(value),
                        _ => {}
                    }
                }
                vec![RawSample::Relative { dx, dy }]
            }
        };
        Ok(samples)
    }

    fn probe(&mut self) -> bool {
        self.file
            .as_ref()
            .is_some_and(|file| evdev_sys::device_id(file.as_fd()).is_ok())
    }

    fn close(&mut self) {
        self.file = None;
        self.open_paths.lock().remove(&self.path);
    }
}

impl Drop for EvdevDevice {
    fn drop(&mut self) {
        self.close();
    }
}
