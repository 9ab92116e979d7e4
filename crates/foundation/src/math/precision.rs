//! Deterministic float ordering for distances and hit depths.

use core::cmp::Ordering;

/// Folds `-0.0` into `0.0` and every NaN payload into one NaN.
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Total order over canonical values. NaN sorts after `+inf`, so a NaN
/// depth never wins a nearest-hit comparison.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn signed_zeros_compare_equal() {
        assert_eq!(canonical_f64(-0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
    }

    #[test]
    fn nan_sorts_after_infinity() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, -f64::NAN), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::INFINITY), Ordering::Greater);
    }
}
