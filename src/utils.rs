use crate::error::{PtJplError, Result};

/// Floor at zero while keeping NaN (nodata) as NaN. `f64::max` would turn
/// NaN into 0.
#[inline]
pub(crate) fn non_negative(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// ±inf treated as nodata.
#[inline]
pub(crate) fn finite_or_nan(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        f64::NAN
    }
}

/// Fail with `ShapeMismatch` unless `found` equals `expected`.
pub(crate) fn check_shape(
    field: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(PtJplError::ShapeMismatch {
            field,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative_keeps_nan() {
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(2.5), 2.5);
        assert!(non_negative(f64::NAN).is_nan());
    }

    #[test]
    fn test_finite_or_nan() {
        assert_eq!(finite_or_nan(-4.0), -4.0);
        assert!(finite_or_nan(f64::INFINITY).is_nan());
        assert!(finite_or_nan(f64::NEG_INFINITY).is_nan());
        assert!(finite_or_nan(f64::NAN).is_nan());
    }

    #[test]
    fn test_check_shape() {
        assert!(check_shape("RH", (2, 3), (2, 3)).is_ok());
        let err = check_shape("RH", (2, 3), (3, 2)).unwrap_err();
        assert!(matches!(
            err,
            PtJplError::ShapeMismatch {
                field: "RH",
                expected: (2, 3),
                found: (3, 2)
            }
        ));
    }
}
