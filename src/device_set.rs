//! Device Set Manager: the open devices of one class.
//!
//! A [`DeviceSet`] owns every [`Device`] handle it opens and is the only place
//! they are closed. It never holds two devices with the same [`DeviceId`].
//!
//! - [`scan`](DeviceSet::scan) asks the backend for candidates, skips those
//!   already tracked, drops those lacking the class's minimum raw capability,
//!   and opens the rest. Rejections and open failures are expected (most
//!   enumerated nodes are not usable input devices) and only logged at `debug`.
//! - [`prune_disconnected`](DeviceSet::prune_disconnected) probes every device
//!   and closes the ones that fail.
//! - [`close_all`](DeviceSet::close_all) releases everything on teardown.
//!
//! Throttling of rescans is the manager's business, not this module's.

use crate::axis::{wrap_delta, Axis, AxisLayout, AxisValues};
use crate::device::{Backend, Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceInfo;
use tracing::{debug, info, warn};

/// One open device plus its per-frame tracking state.
pub(crate) struct TrackedDevice {
    handle: Box<dyn Device>,
    class: DeviceClass,
    layout: AxisLayout,
    /// Latest normalized value per [`Axis`] (joystick-class).
    current: [f64; Axis::COUNT],
    /// Values at the end of the previous frame (joystick-class).
    previous: [f64; Axis::COUNT],
    /// Axes that have reported at least once since the device was opened.
    seen: [bool; Axis::COUNT],
    /// Relative motion drained this frame (mouse-class).
    motion: AxisValues,
    /// Set when a poll failed; the device is removed at the end of the frame.
    failed: bool,
}

impl TrackedDevice {
    fn new(handle: Box<dyn Device>, class: DeviceClass, layout: AxisLayout) -> Self {
        Self {
            handle,
            class,
            layout,
            current: [0.0; Axis::COUNT],
            previous: [0.0; Axis::COUNT],
            seen: [false; Axis::COUNT],
            motion: [0.0; 2],
            failed: false,
        }
    }

    pub(crate) fn id(&self) -> &DeviceId {
        self.handle.id()
    }

    /// Pull every pending raw sample into the tracking state.
    ///
    /// Later samples for the same axis overwrite earlier ones. The first sample an
    /// axis ever reports also becomes its baseline, so a device opened mid-session
    /// does not read as a jump from zero. Samples that do not belong to this
    /// device's class, or codes absent from its layout, are ignored.
    pub(crate) fn drain(&mut self) -> Result<()> {
        let samples = self.handle.poll()?;
        for sample in samples {
            match (self.class, sample) {
                (DeviceClass::Joystick, RawSample::Absolute { code, value }) => {
                    if let Some((axis, normalized)) = self.layout.resolve(code, value) {
                        let i = axis.index();
                        if !self.seen[i] {
                            self.seen[i] = true;
                            self.previous[i] = normalized;
                        }
                        self.current[i] = normalized;
                    }
                }
                (DeviceClass::Mouse, RawSample::Relative { dx, dy }) => {
                    self.motion[0] += dx;
                    self.motion[1] += dy;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Wrap-corrected `current - previous` for every axis.
    pub(crate) fn axis_deltas(&self) -> [(Axis, f64); Axis::COUNT] {
        Axis::ALL.map(|axis| {
            let i = axis.index();
            (axis, wrap_delta(self.current[i], self.previous[i]))
        })
    }

    /// Make this frame's values next frame's baseline.
    pub(crate) fn roll_forward(&mut self) {
        self.previous = self.current;
    }

    /// Hand out this frame's relative motion and reset the accumulator.
    pub(crate) fn take_motion(&mut self) -> AxisValues {
        std::mem::take(&mut self.motion)
    }

    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.handle.id().clone(),
            name: self.handle.name().to_string(),
            class: self.class,
            meta: self.handle.meta(),
        }
    }

    fn close(mut self) {
        self.handle.close();
    }
}

/// Open devices of a single class, keyed by identity.
pub struct DeviceSet {
    class: DeviceClass,
    devices: Vec<TrackedDevice>,
}

impl DeviceSet {
    pub fn new(class: DeviceClass) -> Self {
        Self {
            class,
            devices: Vec::new(),
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| d.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter().map(TrackedDevice::id)
    }

    pub fn infos(&self) -> impl Iterator<Item = DeviceInfo> + '_ {
        self.devices.iter().map(TrackedDevice::info)
    }

    /// Open every newly visible device that meets the class's requirements.
    ///
    /// Returns how many devices were added.
    pub fn scan(&mut self, backend: &mut dyn Backend) -> usize {
        let mut added = 0;

        for candidate in backend.enumerate() {
            if self.contains(&candidate.id) {
                continue;
            }

            if !candidate.caps.satisfies(self.class) {
                debug!(
                    class = %self.class,
                    id = %candidate.id,
                    "skipping candidate without required raw capability"
                );
                continue;
            }

            match backend.open(&candidate) {
                Ok(mut handle) => {
                    // A backend may hand back a different id than it enumerated.
                    if self.contains(handle.id()) {
                        handle.close();
                        continue;
                    }
                    info!(
                        class = %self.class,
                        id = %handle.id(),
                        name = handle.name(),
                        "device opened"
                    );
                    let layout = candidate.caps.axes.clone();
                    self.devices
                        .push(TrackedDevice::new(handle, self.class, layout));
                    added += 1;
                }
                Err(e) => {
                    debug!(class = %self.class, id = %candidate.id, error = %e, "open failed, skipping");
                }
            }
        }

        added
    }

    /// Close and drop every device whose liveness probe fails.
    ///
    /// Returns how many devices were removed.
    pub fn prune_disconnected(&mut self) -> usize {
        let before = self.devices.len();
        let (alive, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.devices)
            .into_iter()
            .map(|mut d| {
                let ok = d.handle.probe();
                (d, ok)
            })
            .partition(|(_, ok)| *ok);

        self.devices = alive.into_iter().map(|(d, _)| d).collect();
        for (device, _) in dead {
            info!(class = %self.class, id = %device.id(), "device disconnected");
            device.close();
        }

        before - self.devices.len()
    }

    /// Prune disconnected devices, then scan for new ones.
    pub fn rescan(&mut self, backend: &mut dyn Backend) -> (usize, usize) {
        let removed = self.prune_disconnected();
        let added = self.scan(backend);
        debug!(class = %self.class, removed, added, total = self.devices.len(), "rescan");
        (removed, added)
    }

    /// Close every device and empty the set.
    pub fn close_all(&mut self) {
        for device in self.devices.drain(..) {
            device.close();
        }
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut TrackedDevice> {
        self.devices.iter_mut()
    }

    /// Close and drop devices whose poll failed this frame.
    pub(crate) fn drop_failed(&mut self) -> usize {
        let before = self.devices.len();
        let (failed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.devices)
            .into_iter()
            .partition(|d| d.failed);
        self.devices = kept;
        for device in failed {
            let err = Error::Disconnected(device.id().clone());
            warn!(class = %self.class, error = %err, "dropping device after read failure");
            device.close();
        }
        before - self.devices.len()
    }
}

impl Drop for DeviceSet {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(all(test, feature = "virtual"))]
mod tests {
    use super::*;
    use crate::axis::{AxisRange, InputMode};
    use crate::backends::virtual_input::{VirtualBackend, VirtualDeviceSpec};
    use crate::device::Capabilities;

    fn stick(id: &str) -> VirtualDeviceSpec {
        VirtualDeviceSpec::joystick(id)
            .axis(0, Axis::StickX, AxisRange::new(0, 100))
            .axis(1, Axis::StickY, AxisRange::new(0, 100))
    }

    #[test]
    fn scan_never_tracks_a_device_twice() {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(stick("pad-a"));
        hub.plug(stick("pad-b"));

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        assert_eq!(set.scan(&mut backend), 2);
        assert_eq!(set.scan(&mut backend), 0);
        assert_eq!(set.len(), 2);
        assert_eq!(hub.counters().opens, 2);
    }

    #[test]
    fn scan_skips_candidates_of_the_wrong_shape() {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(VirtualDeviceSpec::mouse("mouse-on-joystick-backend"));
        hub.plug(VirtualDeviceSpec::joystick("no-caps").caps(Capabilities::default()));
        hub.plug(stick("pad").refuse_open());

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        assert_eq!(set.scan(&mut backend), 0);
        assert!(set.is_empty());
        // Only the capable candidate got as far as an open attempt.
        assert_eq!(hub.counters().opens, 1);
    }

    #[test]
    fn a_half_relative_pointer_is_not_a_mouse() {
        let mut backend = VirtualBackend::new(DeviceClass::Mouse);
        let hub = backend.hub();
        let wheel_only = Capabilities {
            relative_y: true,
            ..Capabilities::default()
        };
        hub.plug(VirtualDeviceSpec::mouse("wheel").caps(wheel_only));
        hub.plug(VirtualDeviceSpec::mouse("mouse"));

        let mut set = DeviceSet::new(DeviceClass::Mouse);
        assert_eq!(set.scan(&mut backend), 1);
        let ids: Vec<_> = set.ids().cloned().collect();
        assert_eq!(ids, vec![DeviceId::new("mouse")]);
    }

    #[test]
    fn prune_removes_and_closes_dead_devices() {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(stick("stays"));
        hub.plug(stick("goes"));

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        set.scan(&mut backend);
        hub.unplug("goes");

        assert_eq!(set.prune_disconnected(), 1);
        assert!(!set.contains(&DeviceId::new("goes")));
        assert!(set.contains(&DeviceId::new("stays")));
        assert_eq!(hub.counters().closes, 1);
    }

    #[test]
    fn rescan_picks_up_a_replugged_device() {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(stick("pad"));

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        set.scan(&mut backend);
        hub.unplug("pad");
        assert_eq!(set.rescan(&mut backend), (1, 0));
        hub.plug(stick("pad"));
        assert_eq!(set.rescan(&mut backend), (0, 1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn close_all_releases_everything() {
        let mut backend = VirtualBackend::new(DeviceClass::Mouse);
        let hub = backend.hub();
        hub.plug(VirtualDeviceSpec::mouse("m1"));
        hub.plug(VirtualDeviceSpec::mouse("m2"));

        let mut set = DeviceSet::new(DeviceClass::Mouse);
        set.scan(&mut backend);
        set.close_all();
        assert!(set.is_empty());
        assert_eq!(hub.counters().closes, 2);
    }

    #[test]
    fn drain_keeps_the_latest_sample_per_axis() -> Result<()> {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(stick("pad"));

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        set.scan(&mut backend);
        hub.push_abs("pad", 0, 0);
        hub.push_abs("pad", 1, 50);
        for device in set.devices_mut() {
            device.drain()?;
            device.roll_forward();
        }

        hub.push_abs("pad", 0, 10);
        hub.push_abs("pad", 0, 40);
        hub.push_abs("pad", 7, 99); // unmapped code
        hub.push_relative("pad", 5.0, 5.0); // wrong class

        for device in set.devices_mut() {
            device.drain()?;
            let deltas = device.axis_deltas();
            assert_eq!(deltas[Axis::StickX.index()], (Axis::StickX, 0.4));
            assert_eq!(deltas[Axis::StickY.index()], (Axis::StickY, 0.0));
            assert_eq!(device.take_motion(), [0.0, 0.0]);
            assert_eq!(Axis::StickX.channel().0, InputMode::AnalogStick);
        }
        Ok(())
    }

    #[test]
    fn the_first_reading_of_an_axis_is_its_baseline() -> Result<()> {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(stick("pad"));

        let mut set = DeviceSet::new(DeviceClass::Joystick);
        set.scan(&mut backend);
        // Nothing reported yet: the axis stays unseen across an empty frame.
        for device in set.devices_mut() {
            device.drain()?;
            device.roll_forward();
        }

        hub.push_abs("pad", 1, 70);
        for device in set.devices_mut() {
            device.drain()?;
            assert_eq!(device.axis_deltas()[Axis::StickY.index()], (Axis::StickY, 0.0));
            device.roll_forward();
        }

        hub.push_abs("pad", 1, 80);
        for device in set.devices_mut() {
            device.drain()?;
            let (_, delta) = device.axis_deltas()[Axis::StickY.index()];
            assert!((delta - 0.1).abs() < 1e-9);
        }
        Ok(())
    }
}
