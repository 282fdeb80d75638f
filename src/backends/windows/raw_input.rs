//! Raw Input mouse-class backend.
//!
//! Raw Input is message-driven: Windows delivers `WM_INPUT` to a window the
//! host owns. The host attaches that window to a [`RawInputFeed`] and forwards
//! every `WM_INPUT` `lparam` to [`RawInputFeed::handle_wm_input`]; the feed
//! accumulates relative motion per physical mouse until the next update drains it.
//!
//! ## Conventions
//! - Deltas are raw OS counts, not normalized.
//! - Packets flagged `MOUSE_MOVE_ABSOLUTE` (tablets, remote desktop) are ignored.
//! - Packets with a null `hDevice` (injected or synthesized input) belong to
//!   no physical mouse. They are collected by an always-present pseudo-device
//!   with id [`UNATTRIBUTED_ID`] so they still count toward the mouse channel.
//! - Bring-up fails when no window is attached. Shut-down removes the
//!   registration again.

use crate::device::{Backend, Candidate, Capabilities, Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use core::ffi::c_void;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};
use windows_sys::Win32::UI::Input::*;

// Local constants (avoid relying on module exports that vary by windows-sys version)
const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;
const RIDEV_REMOVE: u32 = 0x0000_0001;
const RIDEV_INPUTSINK: u32 = 0x0000_0100;
const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;

/// `hDevice` of packets that no physical mouse produced.
const UNATTRIBUTED: isize = 0;

/// Device id of the pseudo-device that collects motion with a null `hDevice`.
pub const UNATTRIBUTED_ID: &str = "rawinput:unattributed";

/// One relative packet pulled out of `WM_INPUT`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RawMousePacket {
    /// Raw Input device handle, as an integer so it can cross threads.
    pub device: isize,
    pub dx: i32,
    pub dy: i32,
    /// `RAWMOUSE::usFlags` (`MOUSE_MOVE_*`).
    pub flags: u16,
}

impl RawMousePacket {
    fn is_relative(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE == 0
    }
}

/// Parse a `WM_INPUT` lparam into a mouse packet (if it is one).
pub(crate) fn read_wm_input(lparam: isize) -> Option<RawMousePacket> {
    let header_size = core::mem::size_of::<RAWINPUTHEADER>() as u32;
    let mut size: u32 = 0;
    // SAFETY: a null buffer asks only for the required size.
    let r0 = unsafe {
        GetRawInputData(lparam as _, RID_INPUT, core::ptr::null_mut(), &mut size, header_size)
    };
    if r0 == u32::MAX || size == 0 {
        return None;
    }

    let mut buf = vec![0u8; size as usize];
    // SAFETY: `buf` holds exactly `size` bytes as reported by the previous call.
    let r1 = unsafe {
        GetRawInputData(
            lparam as _,
            RID_INPUT,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            header_size,
        )
    };
    if r1 == u32::MAX {
        return None;
    }
    read_raw_mouse_bytes(&buf)
}

/// Parse a `RID_INPUT` payload into a mouse packet.
pub(crate) fn read_raw_mouse_bytes(buf: &[u8]) -> Option<RawMousePacket> {
    let header_size = core::mem::size_of::<RAWINPUTHEADER>();
    if buf.len() < header_size + core::mem::size_of::<RAWMOUSE>() {
        return None;
    }
    // SAFETY: the length check above covers the header and a RAWMOUSE body;
    // both are read unaligned from the byte buffer.
    unsafe {
        let header: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        if header.dwType != RIM_TYPEMOUSE {
            return None;
        }
        let mouse: RAWMOUSE =
            core::ptr::read_unaligned(buf.as_ptr().add(header_size) as *const RAWMOUSE);
        Some(RawMousePacket {
            device: header.hDevice as isize,
            dx: mouse.lLastX,
            dy: mouse.lLastY,
            flags: mouse.usFlags,
        })
    }
}

/// RawInput device interface path for a given handle (`RIDI_DEVICENAME`).
pub(crate) fn device_name(device: isize) -> Option<String> {
    let handle = device as *mut c_void;
    let mut size: u32 = 0;
    // SAFETY: a null buffer asks only for the required size in WCHARs.
    let r0 = unsafe { GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size) };
    if r0 == u32::MAX || size == 0 {
        return None;
    }

    let mut wide: Vec<u16> = vec![0u16; size as usize];
    // SAFETY: `wide` holds `size` WCHARs as requested.
    let r1 = unsafe {
        GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, wide.as_mut_ptr() as *mut c_void, &mut size)
    };
    if r1 == u32::MAX {
        return None;
    }
    while wide.last() == Some(&0) {
        wide.pop();
    }
    Some(String::from_utf16_lossy(&wide))
}

/// Handles of every mouse Windows currently knows about.
fn list_mice() -> Vec<isize> {
    let entry_size = core::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
    let mut count: u32 = 0;
    // SAFETY: a null list asks only for the device count.
    let r0 = unsafe { GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry_size) };
    if r0 == u32::MAX || count == 0 {
        return Vec::new();
    }

    // SAFETY: RAWINPUTDEVICELIST is plain old data; all-zero is a valid value.
    let mut list: Vec<RAWINPUTDEVICELIST> = vec![unsafe { std::mem::zeroed() }; count as usize];
    // SAFETY: `list` holds `count` entries as requested.
    let written = unsafe { GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry_size) };
    if written == u32::MAX {
        return Vec::new();
    }
    list.truncate(written as usize);
    list.into_iter()
        .filter(|entry| entry.dwType == RIM_TYPEMOUSE)
        .map(|entry| entry.hDevice as isize)
        .collect()
}

#[derive(Default)]
struct FeedState {
    window: Option<isize>,
    registered: bool,
    pending: HashMap<isize, (f64, f64)>,
}

/// Shared sink for `WM_INPUT` mouse motion.
///
/// Cloning is cheap; every clone refers to the same accumulator.
#[derive(Clone, Default)]
pub struct RawInputFeed {
    state: Arc<Mutex<FeedState>>,
}

impl RawInputFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target window for Raw Input registration (an `HWND` as integer).
    pub fn attach_window(&self, hwnd: isize) {
        let mut state = self.state.lock();
        state.window = Some(hwnd);
        state.registered = false;
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().window.is_some()
    }

    /// Feed one `WM_INPUT` message. Returns `true` if it carried relative mouse motion.
    pub fn handle_wm_input(&self, lparam: isize) -> bool {
        match read_wm_input(lparam) {
            Some(packet) if packet.is_relative() => {
                self.record(packet.device, f64::from(packet.dx), f64::from(packet.dy));
                true
            }
            Some(packet) => {
                trace!(device = packet.device, "ignoring absolute mouse packet");
                false
            }
            None => false,
        }
    }

    /// Add motion for one device handle.
    pub fn record(&self, device: isize, dx: f64, dy: f64) {
        let mut state = self.state.lock();
        let entry = state.pending.entry(device).or_insert((0.0, 0.0));
        entry.0 += dx;
        entry.1 += dy;
    }

    fn take(&self, device: isize) -> (f64, f64) {
        self.state.lock().pending.remove(&device).unwrap_or((0.0, 0.0))
    }

    fn register(&self) -> Result<()> {
        let mut state = self.state.lock();
        let window = state.window.ok_or_else(|| {
            Error::unavailable(
                DeviceClass::Mouse,
                "no window attached; call RawInputFeed::attach_window first",
            )
        })?;
        if state.registered {
            return Ok(());
        }

        let rid = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_MOUSE,
            dwFlags: RIDEV_INPUTSINK,
            hwndTarget: window as *mut c_void,
        };
        // SAFETY: `rid` is a single valid RAWINPUTDEVICE for the duration of the call.
        let ok = unsafe {
            RegisterRawInputDevices(&rid, 1, core::mem::size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            return Err(Error::unavailable(
                DeviceClass::Mouse,
                format!("RegisterRawInputDevices failed: {}", std::io::Error::last_os_error()),
            ));
        }
        state.registered = true;
        state.pending.clear();
        Ok(())
    }

    /// Drop the mouse registration made by bring-up and forget pending motion.
    fn unregister(&self) {
        let mut state = self.state.lock();
        if !state.registered {
            return;
        }
        let rid = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_MOUSE,
            dwFlags: RIDEV_REMOVE,
            hwndTarget: core::ptr::null_mut(),
        };
        // SAFETY: `rid` is a single valid RAWINPUTDEVICE for the duration of the call.
        let ok = unsafe {
            RegisterRawInputDevices(&rid, 1, core::mem::size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            debug!(error = %std::io::Error::last_os_error(), "RIDEV_REMOVE failed");
        }
        state.registered = false;
        state.pending.clear();
    }
}

fn candidate_id(handle: isize) -> String {
    if handle == UNATTRIBUTED {
        return UNATTRIBUTED_ID.to_string();
    }
    device_name(handle).unwrap_or_else(|| format!("rawinput:{handle:#x}"))
}

/// Mouse-class [`Backend`] fed by a [`RawInputFeed`].
pub struct RawInputMouseBackend {
    feed: RawInputFeed,
    open: Arc<Mutex<HashSet<isize>>>,
}

impl RawInputMouseBackend {
    pub fn new(feed: RawInputFeed) -> Self {
        Self {
            feed,
            open: Arc::default(),
        }
    }
}

impl Backend for RawInputMouseBackend {
    fn class(&self) -> DeviceClass {
        DeviceClass::Mouse
    }

    fn bring_up(&mut self) -> Result<()> {
        self.feed.register()
    }

    /// Every listed mouse not already open, plus the unattributed pseudo-device.
    fn enumerate(&mut self) -> Vec<Candidate> {
        let open = self.open.lock().clone();
        std::iter::once(UNATTRIBUTED)
            .chain(list_mice())
            .filter(|handle| !open.contains(handle))
            .map(|handle| {
                let (name, path) = if handle == UNATTRIBUTED {
                    ("Unattributed Raw Input", None)
                } else {
                    ("Raw Input Mouse", device_name(handle))
                };
                let meta = DeviceMeta {
                    bus: Some("rawinput".into()),
                    path,
                    ..DeviceMeta::default()
                };
                Candidate::new(candidate_id(handle), name, Capabilities::relative()).with_meta(meta)
            })
            .collect()
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        let handle = std::iter::once(UNATTRIBUTED)
            .chain(list_mice())
            .find(|&handle| candidate_id(handle) == candidate.id.as_str())
            .ok_or_else(|| Error::rejected(&candidate.id, "mouse is no longer listed"))?;
        self.open.lock().insert(handle);
        // Discard motion recorded before the device was tracked.
        self.feed.take(handle);
        debug!(handle, id = %candidate.id, "opened Raw Input mouse");
        Ok(Box::new(RawInputMouseDevice {
            handle,
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            meta: candidate.meta.clone(),
            feed: self.feed.clone(),
            open: Arc::clone(&self.open),
        }))
    }

    fn shut_down(&mut self) {
        self.open.lock().clear();
        self.feed.unregister();
    }
}

pub struct RawInputMouseDevice {
    handle: isize,
    id: DeviceId,
    name: String,
    meta: DeviceMeta,
    feed: RawInputFeed,
    open: Arc<Mutex<HashSet<isize>>>,
}

impl Device for RawInputMouseDevice {
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
        let (dx, dy) = self.feed.take(self.handle);
        Ok(vec![RawSample::Relative { dx, dy }])
    }

    fn probe(&mut self) -> bool {
        self.handle == UNATTRIBUTED || list_mice().contains(&self.handle)
    }

    fn close(&mut self) {
        self.open.lock().remove(&self.handle);
    }
}

impl Drop for RawInputMouseDevice {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bring_up_requires_a_window() {
        let mut backend = RawInputMouseBackend::new(RawInputFeed::new());
        assert!(matches!(
            backend.bring_up(),
            Err(Error::BackendUnavailable {
                class: DeviceClass::Mouse,
                ..
            })
        ));
    }

    #[test]
    fn feed_accumulates_per_device() {
        let feed = RawInputFeed::new();
        feed.record(1, 3.0, -1.0);
        feed.record(1, 2.0, -1.0);
        feed.record(2, 7.0, 0.0);
        assert_eq!(feed.take(1), (5.0, -2.0));
        assert_eq!(feed.take(1), (0.0, 0.0));
        assert_eq!(feed.take(2), (7.0, 0.0));
    }

    #[test]
    fn absolute_packets_are_not_relative() {
        let packet = RawMousePacket {
            device: 0,
            dx: 100,
            dy: 100,
            flags: MOUSE_MOVE_ABSOLUTE,
        };
        assert!(!packet.is_relative());
        assert!(RawMousePacket { flags: 0, ..packet }.is_relative());
    }

    #[test]
    fn unattributed_motion_has_its_own_device() -> Result<()> {
        let feed = RawInputFeed::new();
        let mut backend = RawInputMouseBackend::new(feed.clone());
        let candidate = backend
            .enumerate()
            .into_iter()
            .find(|c| c.id.as_str() == UNATTRIBUTED_ID)
            .ok_or_else(|| Error::Disconnected(DeviceId::new(UNATTRIBUTED_ID)))?;
        let mut device = backend.open(&candidate)?;

        feed.record(UNATTRIBUTED, 2.0, -3.0);
        feed.record(UNATTRIBUTED, 1.0, 0.0);
        assert_eq!(device.poll()?, vec![RawSample::Relative { dx: 3.0, dy: -3.0 }]);
        assert!(device.probe());
        assert!(backend.enumerate().iter().all(|c| c.id.as_str() != UNATTRIBUTED_ID));

        device.close();
        assert!(backend.enumerate().iter().any(|c| c.id.as_str() == UNATTRIBUTED_ID));
        Ok(())
    }

    #[test]
    fn shut_down_drops_the_registration() {
        let feed = RawInputFeed::new();
        feed.attach_window(0x1234);
        {
            let mut state = feed.state.lock();
            state.registered = true;
            state.pending.insert(7, (1.0, 1.0));
        }
        let mut backend = RawInputMouseBackend::new(feed.clone());
        backend.shut_down();

        let state = feed.state.lock();
        assert!(!state.registered);
        assert!(state.pending.is_empty());
        assert_eq!(state.window, Some(0x1234));
    }

    #[test]
    fn short_payloads_are_rejected() {
        assert_eq!(read_raw_mouse_bytes(&[0u8; 4]), None);
    }
}
