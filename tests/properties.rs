//! Property-based tests for axis normalization and wrap-corrected deltas.

use axisdelta::axis::WRAP_THRESHOLD;
use axisdelta::{normalize, wrap_delta, AxisRange};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The ends of a non-degenerate range map to exactly 0 and 1.
    #[test]
    fn prop_range_ends_map_to_unit_interval(a in any::<i32>(), b in any::<i32>()) {
        prop_assume!(a != b);
        let (min, max) = (a.min(b), a.max(b));
        prop_assert_eq!(normalize(min, min, max), 0.0);
        prop_assert_eq!(normalize(max, min, max), 1.0);
    }

    /// A degenerate range never produces motion, whatever the reading.
    #[test]
    fn prop_degenerate_range_is_zero(value in any::<i32>(), bound in any::<i32>()) {
        prop_assert_eq!(normalize(value, bound, bound), 0.0);
        prop_assert!(AxisRange::new(bound, bound).is_degenerate());
    }

    /// Readings inside the range stay inside [0, 1] and keep their order.
    #[test]
    fn prop_in_range_is_monotone(
        min in -100_000i32..0,
        span in 1i32..200_000,
        x in 0.0f64..=1.0,
        y in 0.0f64..=1.0,
    ) {
        let max = min + span;
        let pick = |t: f64| min + (t * f64::from(span)).round() as i32;
        let (lo, hi) = (pick(x.min(y)), pick(x.max(y)));
        let (nlo, nhi) = (normalize(lo, min, max), normalize(hi, min, max));
        prop_assert!((0.0..=1.0).contains(&nlo));
        prop_assert!((0.0..=1.0).contains(&nhi));
        prop_assert!(nlo <= nhi, "{lo} -> {nlo} above {hi} -> {nhi}");
    }

    /// Overshoot past the reported range is not clamped.
    #[test]
    fn prop_overshoot_is_preserved(over in 1i32..1000) {
        let range = AxisRange::new(0, 1000);
        prop_assert!(range.normalize(1000 + over) > 1.0);
        prop_assert!(range.normalize(-over) < 0.0);
    }

    /// Differences below half the range pass through unchanged.
    #[test]
    fn prop_small_differences_are_untouched(previous in 0.0f64..=1.0, step in -0.49f64..=0.49) {
        let current = previous + step;
        prop_assert_eq!(wrap_delta(current, previous), current - previous);
    }

    /// Any wrap-corrected delta between unit-interval readings is at most half the range.
    #[test]
    fn prop_corrected_delta_is_bounded(current in 0.0f64..=1.0, previous in 0.0f64..=1.0) {
        let delta = wrap_delta(current, previous);
        prop_assert!(delta.abs() <= WRAP_THRESHOLD + 1e-12, "delta {delta} out of bounds");
    }

    /// Swapping the arguments negates the result away from the exact threshold.
    #[test]
    fn prop_wrap_is_antisymmetric(current in 0.0f64..=1.0, previous in 0.0f64..=1.0) {
        prop_assume!(((current - previous).abs() - WRAP_THRESHOLD).abs() > 1e-9);
        let forward = wrap_delta(current, previous);
        let backward = wrap_delta(previous, current);
        prop_assert!((forward + backward).abs() < 1e-12, "{forward} vs {backward}");
    }
}

#[test]
fn wrap_examples() {
    assert!((wrap_delta(0.02, 0.99) - 0.03).abs() < 1e-12);
    assert!((wrap_delta(0.99, 0.02) + 0.03).abs() < 1e-12);
    assert_eq!(wrap_delta(0.5, 0.5), 0.0);
    // The threshold itself is not a wrap.
    assert_eq!(wrap_delta(0.75, 0.25), 0.5);
    assert_eq!(wrap_delta(0.25, 0.75), -0.5);
}

#[test]
fn fixed_native_ranges() {
    assert_eq!(AxisRange::U8.normalize(0), 0.0);
    assert_eq!(AxisRange::U8.normalize(255), 1.0);
    assert_eq!(AxisRange::I16.normalize(-32768), 0.0);
    assert_eq!(AxisRange::I16.normalize(32767), 1.0);
}
