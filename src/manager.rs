//! The tracking engine: capability mask, rescans, and the per-frame update.
//!
//! [`AxisManager`] owns one [`DeviceSet`] and (optionally) one [`Backend`] per
//! [`DeviceClass`]. The caller drives it:
//!
//! 1. [`init`](AxisManager::init) brings up the requested classes (additively).
//! 2. [`update`](AxisManager::update) once per frame.
//! 3. [`axis_deltas`](AxisManager::axis_deltas) to read the frame's motion.
//! 4. [`terminate`](AxisManager::terminate) (or drop) to release everything.
//!
//! Nothing runs on its own schedule: devices are only touched inside `init`,
//! `update` and `terminate`.
//!
//! ## Frame semantics
//! - All three output channels are zeroed at the start of every `update`.
//! - Joystick-class axes contribute wrap-corrected deltas against the previous
//!   frame, summed across devices. The first `update` after a class is newly
//!   brought up only records a baseline (all joystick deltas are zero).
//! - Mouse-class devices contribute the relative motion drained this frame.
//! - At most once per rescan interval, disconnected devices are pruned and new
//!   ones opened.
//!
//! # Example
//! ```no_run
//! use axisdelta::{AxisManager, DeviceFlags, InputMode, ManagerConfig};
//!
//! let mut manager = AxisManager::new(ManagerConfig::default());
//! let report = manager.init(DeviceFlags::JOYSTICK | DeviceFlags::MOUSE);
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//!
//! loop {
//!     manager.update();
//!     let [dx, dy] = manager.axis_deltas(InputMode::AnalogStick);
//!     if dx != 0.0 || dy != 0.0 {
//!         println!("stick moved by ({dx:.3}, {dy:.3})");
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

use crate::axis::{AxisValues, InputMode};
use crate::backends;
use crate::clock::{Clock, MonotonicClock};
use crate::config::ManagerConfig;
use crate::device::Backend;
use crate::device_set::DeviceSet;
use crate::error::{Error, Result};
use crate::flags::{DeviceClass, DeviceFlags};
use crate::metadata::DeviceInfo;
use std::time::Instant;
use tracing::{info, trace, warn};

/// Outcome of [`AxisManager::init`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitReport {
    /// `true` if at least one newly requested class came up, or nothing new was requested.
    pub ok: bool,
    /// One human-readable line per class that could not be brought up.
    pub warnings: Vec<String>,
}

/// The three per-frame output vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Channels {
    analog_stick: AxisValues,
    slider: AxisValues,
    mouse: AxisValues,
}

impl Channels {
    fn get(&self, mode: InputMode) -> AxisValues {
        match mode {
            InputMode::AnalogStick => self.analog_stick,
            InputMode::Slider => self.slider,
            InputMode::Mouse => self.mouse,
        }
    }

    fn add(&mut self, mode: InputMode, component: usize, value: f64) {
        let channel = match mode {
            InputMode::AnalogStick => &mut self.analog_stick,
            InputMode::Slider => &mut self.slider,
            InputMode::Mouse => &mut self.mouse,
        };
        if let Some(slot) = channel.get_mut(component) {
            *slot += value;
        }
    }
}

struct ClassSlot {
    backend: Option<Box<dyn Backend>>,
    set: DeviceSet,
}

impl ClassSlot {
    fn new(class: DeviceClass) -> Self {
        Self {
            backend: None,
            set: DeviceSet::new(class),
        }
    }
}

/// Per-frame analog delta tracker over every open device.
pub struct AxisManager {
    config: ManagerConfig,
    clock: Box<dyn Clock>,
    joystick: ClassSlot,
    mouse: ClassSlot,
    initialized: DeviceFlags,
    first_update: bool,
    last_scan: Instant,
    channels: Channels,
}

impl AxisManager {
    /// Manager with the platform's default backends and real time.
    pub fn new(config: ManagerConfig) -> Self {
        let mut manager = Self::with_clock(config, MonotonicClock);
        for class in DeviceClass::ALL {
            if let Some(backend) = backends::default_backend(class, &manager.config) {
                manager.slot_mut(class).backend = Some(backend);
            }
        }
        manager
    }

    /// Manager with no backends registered, reading time from `clock`.
    ///
    /// Register backends with [`set_backend`](Self::set_backend) before calling `init`.
    pub fn with_clock(config: ManagerConfig, clock: impl Clock + 'static) -> Self {
        let last_scan = clock.now();
        Self {
            config,
            clock: Box::new(clock),
            joystick: ClassSlot::new(DeviceClass::Joystick),
            mouse: ClassSlot::new(DeviceClass::Mouse),
            initialized: DeviceFlags::empty(),
            first_update: true,
            last_scan,
            channels: Channels::default(),
        }
    }

    /// Install `backend` for its class, returning the one it replaces.
    ///
    /// If that class was initialized, its devices are closed, the old backend is
    /// shut down, and the class must be brought up again with `init`.
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) -> Option<Box<dyn Backend>> {
        let class = backend.class();
        let flag = DeviceFlags::from(class);
        let was_initialized = self.initialized.contains(flag);
        let slot = self.slot_mut(class);
        slot.set.close_all();
        let mut previous = slot.backend.replace(backend);
        if was_initialized {
            if let Some(old) = previous.as_deref_mut() {
                old.shut_down();
            }
            self.initialized.remove(flag);
            info!(%class, "backend replaced; class needs init again");
        }
        previous
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Bring up every requested class that is not up yet.
    ///
    /// Classes already initialized are left untouched (their devices are not
    /// reopened). A class that fails to come up is reported in
    /// [`InitReport::warnings`] and never contributes devices; other classes are
    /// unaffected.
    pub fn init(&mut self, requested: DeviceFlags) -> InitReport {
        let new = requested - self.initialized;
        if new.is_empty() {
            return InitReport {
                ok: true,
                warnings: Vec::new(),
            };
        }

        let mut warnings = Vec::new();
        let mut brought_up = DeviceFlags::empty();

        for class in new.classes() {
            match self.bring_up(class) {
                Ok(opened) => {
                    info!(%class, devices = opened, "class initialized");
                    brought_up |= class.into();
                }
                Err(e) => {
                    warn!(%class, error = %e, "class could not be initialized");
                    warnings.push(e.to_string());
                }
            }
        }

        if !brought_up.is_empty() {
            self.initialized |= brought_up;
            self.first_update = true;
            self.last_scan = self.clock.now();
        }

        InitReport {
            ok: !brought_up.is_empty(),
            warnings,
        }
    }

    fn bring_up(&mut self, class: DeviceClass) -> Result<usize> {
        let slot = self.slot_mut(class);
        let backend = slot
            .backend
            .as_deref_mut()
            .ok_or(Error::NoBackend(class))?;
        backend.bring_up()?;
        Ok(slot.set.scan(backend))
    }

    /// `true` if any class is initialized.
    pub fn is_initialized(&self) -> bool {
        !self.initialized.is_empty()
    }

    /// `true` if every class in `flags` is initialized.
    pub fn is_initialized_for(&self, flags: DeviceFlags) -> bool {
        self.initialized.contains(flags)
    }

    /// The capability mask.
    pub fn initialized(&self) -> DeviceFlags {
        self.initialized
    }

    /// Run one frame.
    pub fn update(&mut self) {
        self.channels = Channels::default();

        if self.initialized.is_empty() {
            return;
        }

        let now = self.clock.now();
        if now.saturating_duration_since(self.last_scan) >= self.config.rescan_interval() {
            self.rescan();
            self.last_scan = now;
        }

        if self.initialized.contains(DeviceFlags::JOYSTICK) {
            self.update_joysticks();
        }
        if self.initialized.contains(DeviceFlags::MOUSE) {
            self.update_mice();
        }

        trace!(
            stick = ?self.channels.analog_stick,
            slider = ?self.channels.slider,
            mouse = ?self.channels.mouse,
            first = self.first_update,
            "frame"
        );
        self.first_update = false;
    }

    fn rescan(&mut self) {
        for class in self.initialized.classes() {
            let slot = self.slot_mut(class);
            if let Some(backend) = slot.backend.as_deref_mut() {
                slot.set.rescan(backend);
            }
        }
    }

    fn update_joysticks(&mut self) {
        let first = self.first_update;
        for device in self.joystick.set.devices_mut() {
            if let Err(e) = device.drain() {
                warn!(id = %device.id(), error = %e, "joystick poll failed");
                device.mark_failed();
                continue;
            }
            if !first {
                for (axis, delta) in device.axis_deltas() {
                    let (mode, component) = axis.channel();
                    self.channels.add(mode, component, delta);
                }
            }
            device.roll_forward();
        }
        self.joystick.set.drop_failed();
    }

    fn update_mice(&mut self) {
        for device in self.mouse.set.devices_mut() {
            if let Err(e) = device.drain() {
                warn!(id = %device.id(), error = %e, "mouse poll failed");
                device.mark_failed();
                continue;
            }
            let [dx, dy] = device.take_motion();
            self.channels.add(InputMode::Mouse, 0, dx);
            self.channels.add(InputMode::Mouse, 1, dy);
        }
        self.mouse.set.drop_failed();
    }

    /// Deltas computed by the most recent [`update`](Self::update).
    ///
    /// Zero before the first update and after [`terminate`](Self::terminate).
    pub fn axis_deltas(&self, mode: InputMode) -> AxisValues {
        self.channels.get(mode)
    }

    /// Close every device, shut down every initialized backend, clear the mask.
    ///
    /// Backends stay registered; a later `init` starts over from a fresh first frame.
    pub fn terminate(&mut self) {
        let initialized = self.initialized;
        for class in DeviceClass::ALL {
            let slot = self.slot_mut(class);
            slot.set.close_all();
            if initialized.contains(class.into()) {
                if let Some(backend) = slot.backend.as_deref_mut() {
                    backend.shut_down();
                }
            }
        }
        if !initialized.is_empty() {
            info!(classes = ?initialized, "terminated");
        }
        self.initialized = DeviceFlags::empty();
        self.channels = Channels::default();
        self.first_update = true;
    }

    /// Currently tracked devices, joysticks first.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.joystick
            .set
            .infos()
            .chain(self.mouse.set.infos())
            .collect()
    }

    pub fn device_count(&self, class: DeviceClass) -> usize {
        self.slot(class).set.len()
    }

    fn slot(&self, class: DeviceClass) -> &ClassSlot {
        match class {
            DeviceClass::Joystick => &self.joystick,
            DeviceClass::Mouse => &self.mouse,
        }
    }

    fn slot_mut(&mut self, class: DeviceClass) -> &mut ClassSlot {
        match class {
            DeviceClass::Joystick => &mut self.joystick,
            DeviceClass::Mouse => &mut self.mouse,
        }
    }
}

impl Drop for AxisManager {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(all(test, feature = "virtual"))]
mod tests {
    use super::*;
    use crate::axis::{Axis, AxisRange};
    use crate::backends::virtual_input::{VirtualBackend, VirtualDeviceSpec, VirtualHub};
    use crate::clock::ManualClock;

    fn manager() -> (AxisManager, VirtualHub, VirtualHub, ManualClock) {
        let clock = ManualClock::new();
        let mut manager = AxisManager::with_clock(ManagerConfig::default(), clock.clone());
        let joy = VirtualBackend::new(DeviceClass::Joystick);
        let mouse = VirtualBackend::new(DeviceClass::Mouse);
        let (jh, mh) = (joy.hub(), mouse.hub());
        manager.set_backend(Box::new(joy));
        manager.set_backend(Box::new(mouse));
        (manager, jh, mh, clock)
    }

    #[test]
    fn update_before_init_is_a_no_op() {
        let (mut manager, jh, _, _) = manager();
        manager.update();
        assert_eq!(manager.axis_deltas(InputMode::AnalogStick), [0.0, 0.0]);
        assert_eq!(jh.counters().enumerates, 0);
    }

    #[test]
    fn init_without_backend_warns() {
        let mut manager = AxisManager::with_clock(ManagerConfig::default(), ManualClock::new());
        let report = manager.init(DeviceFlags::MOUSE);
        assert!(!report.ok);
        assert_eq!(
            report.warnings,
            vec!["mouse: no backend available on this platform".to_string()]
        );
        assert!(!manager.is_initialized());
    }

    #[test]
    fn replacing_a_live_backend_uninitializes_its_class() {
        let (mut manager, jh, _, _) = manager();
        jh.plug(VirtualDeviceSpec::joystick("pad").axis(0, Axis::StickX, AxisRange::U8));
        manager.init(DeviceFlags::all());
        assert_eq!(manager.device_count(DeviceClass::Joystick), 1);

        let old = manager.set_backend(Box::new(VirtualBackend::new(DeviceClass::Joystick)));
        assert!(old.is_some());
        assert_eq!(jh.counters().closes, 1);
        assert_eq!(jh.counters().shut_downs, 1);
        assert_eq!(manager.initialized(), DeviceFlags::MOUSE);
        assert_eq!(manager.device_count(DeviceClass::Joystick), 0);
    }

    #[test]
    fn channels_ignore_out_of_range_components() {
        let mut channels = Channels::default();
        channels.add(InputMode::Slider, 1, 0.25);
        channels.add(InputMode::Slider, 2, 9.0);
        assert_eq!(channels.get(InputMode::Slider), [0.0, 0.25]);
    }
}
