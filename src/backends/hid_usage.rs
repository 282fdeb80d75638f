//! HID usages and the logical axes they feed.
//!
//! A HID joystick describes each value it reports by a `(usage page, usage)`
//! pair plus a logical range and bit width. Only the Generic Desktop page
//! matters here:
//!
//! - `X` and `Y` feed [`Axis::StickX`] and [`Axis::StickY`].
//! - `Slider` and `Dial` controls are numbered in descriptor order, the way
//!   DirectInput fills its slider array. Slider number 0 feeds
//!   [`Axis::Slider1`] and slider number 1 feeds [`Axis::Slider0`], so the
//!   right-hand knob of a two-knob controller lands on slider 0. A device
//!   with a single slider therefore reports on slider 1. Further sliders are
//!   ignored.
//!
//! The helpers are platform-neutral; the Windows HID backend feeds them what
//! `HidP_GetValueCaps` returns.

use crate::axis::{Axis, AxisRange};

pub const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;

pub const USAGE_JOYSTICK: u16 = 0x04;
pub const USAGE_GAMEPAD: u16 = 0x05;
pub const USAGE_MULTI_AXIS: u16 = 0x08;

pub const USAGE_X: u16 = 0x30;
pub const USAGE_Y: u16 = 0x31;
pub const USAGE_SLIDER: u16 = 0x36;
pub const USAGE_DIAL: u16 = 0x37;

/// Top-level collection usages treated as joystick-class.
pub fn is_game_controller(usage_page: u16, usage: u16) -> bool {
    usage_page == USAGE_PAGE_GENERIC_DESKTOP
        && matches!(usage, USAGE_JOYSTICK | USAGE_GAMEPAD | USAGE_MULTI_AXIS)
}

/// Logical axis for each `(usage_page, usage)` value field, in descriptor order.
///
/// Only the first `X` and first `Y` are used.
pub fn assign_axes(fields: &[(u16, u16)]) -> Vec<Option<Axis>> {
    let (mut have_x, mut have_y) = (false, false);
    let mut sliders = 0usize;

    fields
        .iter()
        .map(|&(page, usage)| {
            if page != USAGE_PAGE_GENERIC_DESKTOP {
                return None;
            }
            match usage {
                USAGE_X if !have_x => {
                    have_x = true;
                    Some(Axis::StickX)
                }
                USAGE_Y if !have_y => {
                    have_y = true;
                    Some(Axis::StickY)
                }
                USAGE_SLIDER | USAGE_DIAL => {
                    let number = sliders;
                    sliders += 1;
                    match number {
                        0 => Some(Axis::Slider1),
                        1 => Some(Axis::Slider0),
                        _ => None,
                    }
                }
                _ => None,
            }
        })
        .collect()
}

/// The range a value field actually spans.
///
/// Descriptors for unsigned full-width fields often declare `LogicalMax` as a
/// negative number (e.g. `0..-1` for 16 bits); that is read as `0..2^bits-1`.
pub fn logical_range(logical_min: i32, logical_max: i32, bit_size: u16) -> AxisRange {
    if logical_max < logical_min && logical_min >= 0 && (1..32).contains(&bit_size) {
        let max = (1i64 << bit_size) - 1;
        return AxisRange::new(logical_min, i32::try_from(max).unwrap_or(i32::MAX));
    }
    AxisRange::new(logical_min, logical_max)
}

/// Interpret a raw field value as `HidP_GetUsageValue` returns it.
///
/// The parser hands back the field's bits zero-extended; fields with a negative
/// logical minimum are two's complement and need sign extension.
pub fn field_value(raw: u32, logical_min: i32, bit_size: u16) -> i32 {
    if logical_min >= 0 || bit_size == 0 || bit_size >= 32 {
        return raw as i32;
    }
    let shift = 32 - u32::from(bit_size);
    ((raw << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    const GD: u16 = USAGE_PAGE_GENERIC_DESKTOP;

    #[test]
    fn stick_and_two_knobs() {
        let fields = [(GD, USAGE_X), (GD, USAGE_Y), (GD, USAGE_SLIDER), (GD, USAGE_DIAL)];
        assert_eq!(
            assign_axes(&fields),
            vec![
                Some(Axis::StickX),
                Some(Axis::StickY),
                Some(Axis::Slider1),
                Some(Axis::Slider0),
            ]
        );
    }

    #[test]
    fn sliders_are_numbered_in_descriptor_order() {
        let fields = [(GD, USAGE_DIAL), (GD, USAGE_SLIDER), (GD, USAGE_SLIDER)];
        assert_eq!(assign_axes(&fields), vec![Some(Axis::Slider1), Some(Axis::Slider0), None]);
    }

    #[test]
    fn a_single_slider_reports_on_slider1() {
        assert_eq!(assign_axes(&[(GD, USAGE_SLIDER)]), vec![Some(Axis::Slider1)]);
    }

    #[test]
    fn other_pages_and_duplicates_are_unmapped() {
        let fields = [(0x02, USAGE_X), (GD, 0x32), (GD, USAGE_X), (GD, USAGE_X)];
        assert_eq!(assign_axes(&fields), vec![None, None, Some(Axis::StickX), None]);
    }

    #[test]
    fn game_controller_collections() {
        assert!(is_game_controller(GD, USAGE_JOYSTICK));
        assert!(is_game_controller(GD, USAGE_MULTI_AXIS));
        assert!(!is_game_controller(GD, 0x02)); // mouse
        assert!(!is_game_controller(0x0C, USAGE_JOYSTICK));
    }

    #[test]
    fn unsigned_full_width_ranges() {
        assert_eq!(logical_range(0, -1, 16), AxisRange::new(0, 65535));
        assert_eq!(logical_range(0, 1023, 10), AxisRange::new(0, 1023));
        assert_eq!(logical_range(-32768, 32767, 16), AxisRange::I16);
    }

    #[test]
    fn signed_fields_are_sign_extended() {
        assert_eq!(field_value(0xFF, -128, 8), -1);
        assert_eq!(field_value(0x80, -128, 8), -128);
        assert_eq!(field_value(0x7F, -128, 8), 127);
        assert_eq!(field_value(0xFF, 0, 8), 255);
        assert_eq!(field_value(0x8000, -32768, 16), -32768);
    }
}
