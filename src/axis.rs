//! Logical axes, raw ranges, normalization, and wrap-aware deltas.
//!
//! ## Value conventions
//! - **Joystick/slider axes** are normalized from the device-reported raw range
//!   into `[0.0, 1.0]` with [`normalize`]. No clamping is applied: a reading that
//!   overshoots the reported range normalizes slightly outside `[0, 1]`.
//! - **Deltas** between two normalized readings go through [`wrap_delta`], which
//!   treats any apparent jump larger than half the range as a wrap at the 0/1
//!   boundary (dial-style controls).
//! - **Mouse motion** is already relative; it is never normalized or wrapped.
//!
//! ### Known limitation
//! The `0.5` wrap threshold assumes genuine single-frame motion never exceeds
//! half the axis range. A very fast sweep at a low update rate is read as motion
//! in the opposite direction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Apparent jumps beyond this many normalized units are treated as a wrap.
pub const WRAP_THRESHOLD: f64 = 0.5;

/// Two-component output vector (`[x, y]` or `[slider0, slider1]`).
pub type AxisValues = [f64; 2];

/// Backend-native axis code (e.g. an evdev `ABS_*` code or an XInput thumb index).
pub type AxisCode = u16;

/// Which output channel a caller reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    /// Stick X/Y deltas.
    AnalogStick,
    /// Slider/dial 0 and 1 deltas.
    Slider,
    /// Summed relative mouse motion, in raw device counts.
    Mouse,
}

/// Logical joystick-class axis tracked per device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    StickX,
    StickY,
    Slider0,
    Slider1,
}

impl Axis {
    /// Number of logical axes.
    pub const COUNT: usize = 4;

    /// All axes in storage order.
    pub const ALL: [Axis; Axis::COUNT] = [Axis::StickX, Axis::StickY, Axis::Slider0, Axis::Slider1];

    /// Storage slot of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::StickX => 0,
            Axis::StickY => 1,
            Axis::Slider0 => 2,
            Axis::Slider1 => 3,
        }
    }

    /// Output channel this axis contributes to, and the component within it.
    #[inline]
    pub const fn channel(self) -> (InputMode, usize) {
        match self {
            Axis::StickX => (InputMode::AnalogStick, 0),
            Axis::StickY => (InputMode::AnalogStick, 1),
            Axis::Slider0 => (InputMode::Slider, 0),
            Axis::Slider1 => (InputMode::Slider, 1),
        }
    }
}

/// Device-reported raw range of one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Fixed 8-bit HID range `0..=255`.
    pub const U8: AxisRange = AxisRange { min: 0, max: 255 };

    /// Fixed signed 16-bit range `-32768..=32767` (XInput thumbs, DirectInput defaults).
    pub const I16: AxisRange = AxisRange {
        min: i16::MIN as i32,
        max: i16::MAX as i32,
    };

    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// `true` when the range cannot produce motion (`min == max`).
    #[inline]
    pub const fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Normalize `value` against this range. See [`normalize`].
    #[inline]
    pub fn normalize(&self, value: i32) -> f64 {
        normalize(value, self.min, self.max)
    }
}

/// Linear-map `value` from `[min, max]` to `[0.0, 1.0]`.
///
/// Returns `0.0` for a degenerate range. Out-of-range values are not clamped.
#[inline]
pub fn normalize(value: i32, min: i32, max: i32) -> f64 {
    if max == min {
        return 0.0;
    }
    (f64::from(value) - f64::from(min)) / (f64::from(max) - f64::from(min))
}

/// Wrap-corrected difference between two normalized readings.
#[inline]
pub fn wrap_delta(current: f64, previous: f64) -> f64 {
    let delta = current - previous;
    if delta > WRAP_THRESHOLD {
        delta - 1.0
    } else if delta < -WRAP_THRESHOLD {
        delta + 1.0
    } else {
        delta
    }
}

/// Where one raw axis code lands and how it is scaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBinding {
    pub axis: Axis,
    pub range: AxisRange,
}

/// Raw code → logical axis mapping for one joystick-class device.
///
/// Built by a backend from what the device reports at open time. Codes that are
/// absent are "not available": their samples never contribute motion. Several
/// codes may feed the same logical axis (each with its own range).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLayout {
    bindings: HashMap<AxisCode, AxisBinding>,
}

impl AxisLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, code: AxisCode, axis: Axis, range: AxisRange) -> Self {
        self.insert(code, axis, range);
        self
    }

    /// Map `code` onto `axis` using `range`. Replaces any previous binding of `code`.
    pub fn insert(&mut self, code: AxisCode, axis: Axis, range: AxisRange) {
        self.bindings.insert(code, AxisBinding { axis, range });
    }

    pub fn get(&self, code: AxisCode) -> Option<&AxisBinding> {
        self.bindings.get(&code)
    }

    /// Translate a raw sample into `(axis, normalized value)`.
    ///
    /// Unmapped codes yield `None`. Degenerate ranges normalize to `0.0`.
    pub fn resolve(&self, code: AxisCode, value: i32) -> Option<(Axis, f64)> {
        self.bindings
            .get(&code)
            .map(|binding| (binding.axis, binding.range.normalize(value)))
    }

    /// `true` if at least one code maps onto `axis`.
    pub fn provides(&self, axis: Axis) -> bool {
        self.bindings.values().any(|binding| binding.axis == axis)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn normalize_hits_both_ends_of_the_range() {
        assert_eq!(normalize(-100, -100, 100), 0.0);
        assert_eq!(normalize(100, -100, 100), 1.0);
        assert!((normalize(0, -100, 100) - 0.5).abs() < EPS);
    }

    #[test]
    fn degenerate_range_is_always_zero() {
        assert_eq!(normalize(7, 7, 7), 0.0);
        assert_eq!(normalize(-3, 7, 7), 0.0);
        assert!(AxisRange::new(5, 5).is_degenerate());
    }

    #[test]
    fn normalize_does_not_clamp_overshoot() {
        assert!(normalize(260, 0, 255) > 1.0);
        assert!(normalize(-5, 0, 255) < 0.0);
    }

    #[test]
    fn fixed_ranges() {
        assert_eq!(AxisRange::U8.normalize(0), 0.0);
        assert_eq!(AxisRange::U8.normalize(255), 1.0);
        assert_eq!(AxisRange::I16.normalize(-32768), 0.0);
        assert_eq!(AxisRange::I16.normalize(32767), 1.0);
    }

    #[test]
    fn wrap_delta_crossing_the_top() {
        assert!((wrap_delta(0.02, 0.99) - 0.03).abs() < EPS);
        assert!((wrap_delta(0.99, 0.02) + 0.03).abs() < EPS);
    }

    #[test]
    fn wrap_delta_passes_small_motion_through() {
        assert_eq!(wrap_delta(0.5, 0.5), 0.0);
        assert!((wrap_delta(0.7, 0.3) - 0.4).abs() < EPS);
        assert!((wrap_delta(0.3, 0.7) + 0.4).abs() < EPS);
        // Exactly half the range is still genuine motion.
        assert_eq!(wrap_delta(1.0, 0.5), 0.5);
        assert_eq!(wrap_delta(0.0, 0.5), -0.5);
    }

    #[test]
    fn fast_sweep_is_misread_as_a_wrap() {
        // Documented limitation: a genuine 0.1 -> 0.9 sweep in one frame reads as -0.2.
        assert!((wrap_delta(0.9, 0.1) + 0.2).abs() < EPS);
    }

    #[test]
    fn layout_resolves_only_mapped_codes() {
        let layout = AxisLayout::new()
            .with(0, Axis::StickX, AxisRange::new(0, 1000))
            .with(6, Axis::Slider0, AxisRange::U8)
            .with(0x28, Axis::Slider0, AxisRange::new(0, 100))
            .with(9, Axis::StickY, AxisRange::new(3, 3));

        assert_eq!(layout.resolve(0, 500), Some((Axis::StickX, 0.5)));
        assert_eq!(layout.resolve(0x28, 100), Some((Axis::Slider0, 1.0)));
        assert_eq!(layout.resolve(9, 42), Some((Axis::StickY, 0.0)));
        assert_eq!(layout.resolve(1, 500), None);
        assert!(layout.provides(Axis::Slider0));
        assert!(!layout.provides(Axis::Slider1));
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.get(6).map(|b| b.range), Some(AxisRange::U8));
        assert!(layout.get(1).is_none());
    }

    #[test]
    fn rebinding_a_code_replaces_it() {
        let mut layout = AxisLayout::new();
        assert!(layout.is_empty());
        layout.insert(3, Axis::Slider0, AxisRange::U8);
        layout.insert(3, Axis::Slider1, AxisRange::I16);
        assert!(!layout.is_empty());
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.resolve(3, -32768), Some((Axis::Slider1, 0.0)));
    }

    #[test]
    fn axis_channels() {
        assert_eq!(Axis::StickY.channel(), (InputMode::AnalogStick, 1));
        assert_eq!(Axis::Slider1.channel(), (InputMode::Slider, 1));
        for (i, axis) in Axis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), i);
        }
    }
}
