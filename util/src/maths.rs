//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Get the sign of a value, treating zero as positive.
///
/// Unlike `Float::signum` the result for `-0.0` is `+1`, so a branch keyed on
/// the result never sees a third case.
pub fn sign_no_zero<T>(value: T) -> T
where
    T: Float
{
    if value >= T::from(0.0).unwrap() {
        T::from(1.0).unwrap()
    }
    else {
        T::from(-1.0).unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5f64), 5f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0f64), 0.5f64);
        assert_eq!(lin_map((0f64, 1f64), (1f64, 0f64), 0.25f64), 0.75f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0.5f64, 0f64, 1f64), 0.5f64);
        assert_eq!(clamp(-0.5f64, 0f64, 1f64), 0f64);
        assert_eq!(clamp(1.5f64, 0f64, 1f64), 1f64);
    }

    #[test]
    fn test_sign_no_zero() {
        assert_eq!(sign_no_zero(2f64), 1f64);
        assert_eq!(sign_no_zero(-2f64), -1f64);
        assert_eq!(sign_no_zero(0f64), 1f64);
        assert_eq!(sign_no_zero(-0f64), 1f64);
    }
}
