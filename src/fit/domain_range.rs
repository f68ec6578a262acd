//! Common fit domain across all curves.
//!
//! Each curve contributes:
//! - a floor: the smallest X among its samples with `Y > 0`
//! - a ceiling: its largest X
//!
//! The shared domain runs from the highest floor to the lowest ceiling. User
//! bounds can only narrow it.

use tracing::debug;

use crate::domain::{Curve, Domain};
use crate::error::FitError;

/// Compute the shared domain, optionally narrowed by `qmin` / `qmax`.
pub fn find_common_domain(curves: &[Curve], qmin: Option<f64>, qmax: Option<f64>) -> Result<Domain, FitError> {
    if curves.is_empty() {
        return Err(FitError::EmptyInput);
    }

    let mut x_min = f64::NEG_INFINITY;
    let mut x_max = f64::INFINITY;
    for curve in curves {
        let floor = curve
            .min_positive_x()
            .ok_or_else(|| FitError::NoPositiveSamples(curve.id.clone()))?;
        // A curve with a positive sample always has a maximum.
        let ceiling = curve.max_x().unwrap_or(floor);
        x_min = x_min.max(floor);
        x_max = x_max.min(ceiling);
    }
    debug!(x_min, x_max, "natural domain");

    if let Some(q) = qmin {
        if q > x_min {
            x_min = q;
        }
    }
    if let Some(q) = qmax {
        if q < x_max {
            x_max = q;
        }
    }

    if x_min > x_max {
        return Err(FitError::EmptyDomain { x_min, x_max });
    }
    Ok(Domain { x_min, x_max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn curve(id: &str, xs: &[f64], ys: &[f64]) -> Curve {
        Curve::from_xy(id, xs, ys)
    }

    fn two_curves() -> Vec<Curve> {
        vec![
            curve("a", &[0.0, 1.0, 2.0, 8.0], &[0.0, 1.0, 1.0, 1.0]),
            curve("b", &[0.5, 3.0, 6.0], &[1.0, 1.0, 1.0]),
        ]
    }

    #[test]
    fn intersects_positive_ranges() {
        let d = find_common_domain(&two_curves(), None, None).unwrap();
        // "a" only turns positive at x=1.
        assert_eq!(d, Domain { x_min: 1.0, x_max: 6.0 });
    }

    #[test]
    fn user_bounds_only_narrow() {
        let d = find_common_domain(&two_curves(), Some(0.0), Some(100.0)).unwrap();
        assert_eq!(d, Domain { x_min: 1.0, x_max: 6.0 });
        let d = find_common_domain(&two_curves(), Some(2.0), Some(5.0)).unwrap();
        assert_eq!(d, Domain { x_min: 2.0, x_max: 5.0 });
    }

    #[test]
    fn disjoint_curves_are_fatal() {
        let curves = vec![
            curve("a", &[0.0, 1.0], &[1.0, 1.0]),
            curve("b", &[2.0, 3.0], &[1.0, 1.0]),
        ];
        let err = find_common_domain(&curves, None, None).unwrap_err();
        assert_eq!(err, FitError::EmptyDomain { x_min: 2.0, x_max: 1.0 });
    }

    #[test]
    fn crossed_user_bounds_are_fatal() {
        let err = find_common_domain(&two_curves(), Some(5.5), Some(2.0)).unwrap_err();
        assert!(matches!(err, FitError::EmptyDomain { .. }));
    }

    #[test]
    fn curve_without_positive_samples_is_fatal() {
        let curves = vec![curve("neg", &[0.0, 1.0], &[-1.0, 0.0])];
        assert_eq!(
            find_common_domain(&curves, None, None).unwrap_err(),
            FitError::NoPositiveSamples("neg".to_string())
        );
        assert_eq!(find_common_domain(&[], None, None).unwrap_err(), FitError::EmptyInput);
    }

    proptest! {
        #[test]
        fn domain_is_monotonic_in_user_bounds(qmin in -5.0f64..10.0, qmax in -3.0f64..12.0) {
            let curves = two_curves();
            let natural = find_common_domain(&curves, None, None).unwrap();
            match find_common_domain(&curves, Some(qmin), Some(qmax)) {
                Ok(d) => {
                    let lo = if qmin > natural.x_min { qmin } else { natural.x_min };
                    let hi = if qmax < natural.x_max { qmax } else { natural.x_max };
                    prop_assert_eq!(d.x_min, lo);
                    prop_assert_eq!(d.x_max, hi);
                }
                Err(e) => {
                    let is_empty = matches!(e, FitError::EmptyDomain { .. });
                    prop_assert!(is_empty);
                    prop_assert!(qmin.max(natural.x_min) > qmax.min(natural.x_max));
                }
            }
        }
    }
}
