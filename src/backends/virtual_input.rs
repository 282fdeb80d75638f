//! In-memory backend with scriptable devices.
//!
//! [`VirtualBackend`] serves one device class from a shared [`VirtualHub`].
//! The hub plays the role of the operating system: devices are plugged and
//! unplugged on it, raw samples are fed into it, and it counts how often the
//! engine enumerated, probed, opened and closed things.
//!
//! ```
//! use axisdelta::backends::virtual_input::{VirtualBackend, VirtualDeviceSpec};
//! use axisdelta::{Axis, AxisRange, DeviceClass};
//!
//! let backend = VirtualBackend::new(DeviceClass::Joystick);
//! let hub = backend.hub();
//! hub.plug(VirtualDeviceSpec::joystick("pad").axis(0, Axis::StickX, AxisRange::U8));
//! hub.push_abs("pad", 0, 128);
//! ```

use crate::axis::{Axis, AxisCode, AxisLayout, AxisRange};
use crate::device::{Backend, Candidate, Capabilities, Device, DeviceId, RawSample};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use crate::metadata::DeviceMeta;
use parking_lot::Mutex;
use std::sync::Arc;

/// How many times the engine touched the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub bring_ups: usize,
    pub enumerates: usize,
    pub opens: usize,
    pub polls: usize,
    pub probes: usize,
    pub closes: usize,
    pub shut_downs: usize,
}

/// Description of a device to plug into a [`VirtualHub`].
#[derive(Clone, Debug)]
pub struct VirtualDeviceSpec {
    id: DeviceId,
    name: String,
    caps: Capabilities,
    refuse_open: bool,
}

impl VirtualDeviceSpec {
    /// A positional device with no axes yet; add some with [`axis`](Self::axis).
    pub fn joystick(id: &str) -> Self {
        Self {
            id: DeviceId::new(id),
            name: format!("Virtual Joystick {id}"),
            caps: Capabilities::absolute(AxisLayout::new()),
            refuse_open: false,
        }
    }

    /// A pointer reporting relative X and Y.
    pub fn mouse(id: &str) -> Self {
        Self {
            id: DeviceId::new(id),
            name: format!("Virtual Mouse {id}"),
            caps: Capabilities::relative(),
            refuse_open: false,
        }
    }

    pub fn axis(mut self, code: AxisCode, axis: Axis, range: AxisRange) -> Self {
        self.caps.axes.insert(code, axis, range);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the advertised capabilities wholesale.
    pub fn caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Enumerate normally but fail every open attempt.
    pub fn refuse_open(mut self) -> Self {
        self.refuse_open = true;
        self
    }
}

struct Plugged {
    spec: VirtualDeviceSpec,
    /// Bumped on every plug so a stale handle never sees a replugged device.
    generation: u64,
    queue: Vec<RawSample>,
    fail_next_poll: bool,
}

#[derive(Default)]
struct HubState {
    plugged: Vec<Plugged>,
    next_generation: u64,
    bring_up_error: Option<String>,
    counters: CallCounters,
}

impl HubState {
    fn find_mut(&mut self, id: &DeviceId) -> Option<&mut Plugged> {
        self.plugged.iter_mut().find(|p| &p.spec.id == id)
    }
}

/// Shared control surface of a [`VirtualBackend`]. Clones share state.
#[derive(Clone, Default)]
pub struct VirtualHub {
    state: Arc<Mutex<HubState>>,
}

impl VirtualHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a device. Replaces any device already plugged under the same id.
    pub fn plug(&self, spec: VirtualDeviceSpec) {
        let mut state = self.state.lock();
        state.plugged.retain(|p| p.spec.id != spec.id);
        let generation = state.next_generation;
        state.next_generation += 1;
        state.plugged.push(Plugged {
            spec,
            generation,
            queue: Vec::new(),
            fail_next_poll: false,
        });
    }

    /// Disconnect a device. Open handles start failing their probe and poll.
    pub fn unplug(&self, id: &str) {
        let id = DeviceId::new(id);
        self.state.lock().plugged.retain(|p| p.spec.id != id);
    }

    /// Queue a raw sample for the next poll of `id`. Ignored if `id` is not plugged.
    pub fn feed(&self, id: &str, sample: RawSample) {
        if let Some(plugged) = self.state.lock().find_mut(&DeviceId::new(id)) {
            plugged.queue.push(sample);
        }
    }

    pub fn push_abs(&self, id: &str, code: AxisCode, value: i32) {
        self.feed(id, RawSample::Absolute { code, value });
    }

    pub fn push_relative(&self, id: &str, dx: f64, dy: f64) {
        self.feed(id, RawSample::Relative { dx, dy });
    }

    /// Make the next poll of `id` fail while the device stays plugged.
    pub fn fail_next_poll(&self, id: &str) {
        if let Some(plugged) = self.state.lock().find_mut(&DeviceId::new(id)) {
            plugged.fail_next_poll = true;
        }
    }

    /// Make every following `bring_up` fail with `reason`; `None` clears it.
    pub fn fail_bring_up(&self, reason: Option<&str>) {
        self.state.lock().bring_up_error = reason.map(str::to_owned);
    }

    pub fn counters(&self) -> CallCounters {
        self.state.lock().counters
    }

}

/// [`Backend`] over a [`VirtualHub`].
pub struct VirtualBackend {
    class: DeviceClass,
    hub: VirtualHub,
}

impl VirtualBackend {
    pub fn new(class: DeviceClass) -> Self {
        Self::with_hub(class, VirtualHub::new())
    }

    pub fn with_hub(class: DeviceClass, hub: VirtualHub) -> Self {
        Self { class, hub }
    }

    pub fn hub(&self) -> VirtualHub {
        self.hub.clone()
    }
}

impl Backend for VirtualBackend {
    fn class(&self) -> DeviceClass {
        self.class
    }

    fn bring_up(&mut self) -> Result<()> {
        let mut state = self.hub.state.lock();
        state.counters.bring_ups += 1;
        match &state.bring_up_error {
            Some(reason) => Err(Error::unavailable(self.class, reason.clone())),
            None => Ok(()),
        }
    }

    fn enumerate(&mut self) -> Vec<Candidate> {
        let mut state = self.hub.state.lock();
        state.counters.enumerates += 1;
        state
            .plugged
            .iter()
            .map(|p| {
                Candidate::new(p.spec.id.clone(), p.spec.name.clone(), p.spec.caps.clone())
                    .with_meta(DeviceMeta {
                        bus: Some("virtual".into()),
                        product_string: Some(p.spec.name.clone()),
                        path: Some(format!("virtual:{}", p.spec.id)),
                        ..DeviceMeta::default()
                    })
            })
            .collect()
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        let mut state = self.hub.state.lock();
        state.counters.opens += 1;
        let plugged = state
            .find_mut(&candidate.id)
            .ok_or_else(|| Error::Disconnected(candidate.id.clone()))?;
        if plugged.spec.refuse_open {
            return Err(Error::rejected(&candidate.id, "open refused"));
        }
        // Samples queued before the open are not part of this connection.
        plugged.queue.clear();

        Ok(Box::new(VirtualDevice {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            meta: candidate.meta.clone(),
            generation: plugged.generation,
            hub: self.hub.clone(),
        }))
    }

    fn shut_down(&mut self) {
        self.hub.state.lock().counters.shut_downs += 1;
    }
}

/// Open handle onto a plugged virtual device.
pub struct VirtualDevice {
    id: DeviceId,
    name: String,
    meta: DeviceMeta,
    generation: u64,
    hub: VirtualHub,
}

impl Device for VirtualDevice {
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
        let mut state = self.hub.state.lock();
        state.counters.polls += 1;
        let generation = self.generation;
        match state.find_mut(&self.id) {
            Some(p) if p.generation == generation => {
                if std::mem::take(&mut p.fail_next_poll) {
                    return Err(Error::Disconnected(self.id.clone()));
                }
                Ok(std::mem::take(&mut p.queue))
            }
            _ => Err(Error::Disconnected(self.id.clone())),
        }
    }

    fn probe(&mut self) -> bool {
        let mut state = self.hub.state.lock();
        state.counters.probes += 1;
        let generation = self.generation;
        state
            .find_mut(&self.id)
            .is_some_and(|p| p.generation == generation)
    }

    fn close(&mut self) {
        self.hub.state.lock().counters.closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_drains_queued_samples_once() -> Result<()> {
        let mut backend = VirtualBackend::new(DeviceClass::Joystick);
        let hub = backend.hub();
        hub.plug(VirtualDeviceSpec::joystick("pad").axis(0, Axis::StickX, AxisRange::U8));

        let candidates = backend.enumerate();
        assert_eq!(candidates.len(), 1);
        let mut dev = backend.open(&candidates[0])?;

        hub.push_abs("pad", 0, 10);
        hub.push_abs("pad", 0, 20);
        assert_eq!(dev.poll()?.len(), 2);
        assert!(dev.poll()?.is_empty());
        Ok(())
    }

    #[test]
    fn stale_handle_fails_after_replug() -> Result<()> {
        let mut backend = VirtualBackend::new(DeviceClass::Mouse);
        let hub = backend.hub();
        hub.plug(VirtualDeviceSpec::mouse("m"));
        let candidates = backend.enumerate();
        let mut dev = backend.open(&candidates[0])?;
        assert!(dev.probe());

        hub.unplug("m");
        hub.plug(VirtualDeviceSpec::mouse("m"));
        assert!(!dev.probe());
        assert!(matches!(dev.poll(), Err(Error::Disconnected(_))));
        Ok(())
    }

    #[test]
    fn injected_poll_failure_fires_once() -> Result<()> {
        let mut backend = VirtualBackend::new(DeviceClass::Mouse);
        let hub = backend.hub();
        hub.plug(VirtualDeviceSpec::mouse("m"));
        let candidates = backend.enumerate();
        let mut dev = backend.open(&candidates[0])?;

        hub.fail_next_poll("m");
        assert!(dev.poll().is_err());
        assert!(dev.poll()?.is_empty());
        Ok(())
    }

    #[test]
    fn bring_up_failure_is_scriptable() {
        let mut backend = VirtualBackend::new(DeviceClass::Mouse);
        let hub = backend.hub();
        hub.fail_bring_up(Some("permission denied"));
        let err = backend.bring_up();
        assert!(matches!(err, Err(Error::BackendUnavailable { class: DeviceClass::Mouse, .. })));
        hub.fail_bring_up(None);
        assert!(backend.bring_up().is_ok());
        assert_eq!(hub.counters().bring_ups, 2);
    }
}
