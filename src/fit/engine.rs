//! Scale/offset fitting of one curve against the reference.
//!
//! Given:
//! - the reference evaluator `f_ref`
//! - the candidate evaluator `f`
//! - the shared domain and a resolved `(K, b)` assignment
//!
//! we sample both evaluators on a common grid and solve
//!
//! ```text
//! minimize Σ (f_ref(x_i) - (K f(x_i) - b))^2
//! ```
//!
//! over whichever of `K`, `b` are free. Note the offset is subtracted.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::domain::{Curve, DerivedSeries, Domain, FitOutcome, FitResult, ParamAssignment, ParamValue};
use crate::error::FitError;
use crate::math::{LeastSquaresProblem, LinearInterpolator, LmOptions, minimize};

/// Initial guess for every free unknown.
const INITIAL_GUESS: f64 = 1.0;

/// `K * y - b`.
pub fn scale_offset(k: f64, b: f64, y: f64) -> f64 {
    k * y - b
}

/// Residuals `target - (K candidate - b)` over the free unknowns.
///
/// Parameters are packed `[K, b]`, dropping whichever is given.
#[derive(Debug, Clone)]
pub struct ScaleOffsetProblem<'a> {
    target: &'a [f64],
    candidate: &'a [f64],
    assignment: ParamAssignment,
}

impl<'a> ScaleOffsetProblem<'a> {
    pub fn new(target: &'a [f64], candidate: &'a [f64], assignment: ParamAssignment) -> Self {
        Self {
            target,
            candidate,
            assignment,
        }
    }

    /// Expand packed unknowns into `(K, b)`.
    pub fn unpack(&self, params: &DVector<f64>) -> (f64, f64) {
        match (self.assignment.k, self.assignment.b) {
            (ParamValue::Free, ParamValue::Free) => (params[0], params[1]),
            (ParamValue::Given(k), ParamValue::Free) => (k, params[0]),
            (ParamValue::Free, ParamValue::Given(b)) => (params[0], b),
            (ParamValue::Given(k), ParamValue::Given(b)) => (k, b),
        }
    }
}

impl LeastSquaresProblem for ScaleOffsetProblem<'_> {
    fn residual_count(&self) -> usize {
        self.target.len()
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let (k, b) = self.unpack(params);
        DVector::from_iterator(
            self.target.len(),
            self.target
                .iter()
                .zip(self.candidate)
                .map(|(&t, &c)| t - scale_offset(k, b, c)),
        )
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let n = self.target.len();
        let mut jac = DMatrix::<f64>::zeros(n, params.len());
        let mut col = 0;
        if self.assignment.k.is_free() {
            for (i, &c) in self.candidate.iter().enumerate() {
                jac[(i, col)] = -c;
            }
            col += 1;
        }
        if self.assignment.b.is_free() {
            jac.column_mut(col).fill(1.0);
        }
        jac
    }
}

/// Build one evaluator per curve, in parallel.
pub fn build_interpolators(curves: &[Curve]) -> Vec<Result<LinearInterpolator, FitError>> {
    curves
        .par_iter()
        .map(|curve| {
            LinearInterpolator::new(&curve.xs(), &curve.ys()).map_err(|e| FitError::Interpolation {
                id: curve.id.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Identity series for the reference curve.
pub fn reference_series(curve: &Curve, evaluator: &LinearInterpolator, domain: &Domain) -> Result<DerivedSeries, FitError> {
    let q_range = domain.linspace(curve.len());
    let y_range_fit = evaluator.values(&q_range).map_err(|e| FitError::BadReference {
        id: curve.id.clone(),
        reason: e.to_string(),
    })?;
    Ok(DerivedSeries {
        q_range,
        y_range_fit,
        y_fit: curve.ys(),
    })
}

/// Fit one candidate curve against the reference.
pub fn fit_curve(
    curve: &Curve,
    evaluator: &LinearInterpolator,
    reference: &LinearInterpolator,
    domain: &Domain,
    assignment: ParamAssignment,
    opts: &LmOptions,
) -> Result<FitResult, FitError> {
    if !evaluator.covers(domain.x_min, domain.x_max) {
        return Err(FitError::DomainNotCovered {
            id: curve.id.clone(),
            native_min: evaluator.x_min(),
            native_max: evaluator.x_max(),
            x_min: domain.x_min,
            x_max: domain.x_max,
        });
    }
    let interp_err = |e: crate::math::InterpolationError| FitError::Interpolation {
        id: curve.id.clone(),
        reason: e.to_string(),
    };

    let q_range = domain.linspace(curve.len());
    let target = reference.values(&q_range).map_err(interp_err)?;
    let candidate = evaluator.values(&q_range).map_err(interp_err)?;

    let problem = ScaleOffsetProblem::new(&target, &candidate, assignment);
    let unknowns = assignment.unknown_count();
    let mut warnings = Vec::new();

    let (k, b, k_err, b_err, converged, message, iterations, cost) = if unknowns == 0 {
        // Nothing to optimize: evaluate the model with the given values.
        let (k, b) = problem.unpack(&DVector::zeros(0));
        let cost = 0.5 * problem.residuals(&DVector::zeros(0)).norm_squared();
        let message = "No free parameters; model evaluated directly.".to_string();
        (k, b, None, None, true, message, 0, cost)
    } else {
        let report = minimize(&problem, DVector::from_element(unknowns, INITIAL_GUESS), opts);
        let (k, b) = problem.unpack(&report.params);
        let message = report.termination.message().to_string();

        if !report.converged() {
            warn!(curve = %curve.id, "{message}");
            warnings.push(message.clone());
        }

        let (k_err, b_err) = match report.standard_errors() {
            Some(errs) => split_errors(assignment, &errs),
            None => {
                let msg = "Covariance is degenerate; standard errors are undefined.";
                warn!(curve = %curve.id, "{msg}");
                warnings.push(msg.to_string());
                (None, None)
            }
        };
        (k, b, k_err, b_err, report.converged(), message, report.iterations, report.cost)
    };
    info!(curve = %curve.id, iterations, "{message}");
    debug!(curve = %curve.id, k, b, ?k_err, ?b_err, cost, "fit parameters");

    let y_range_fit = candidate.iter().map(|&c| scale_offset(k, b, c)).collect();
    let y_fit = evaluator
        .values(&curve.xs())
        .map_err(interp_err)?
        .into_iter()
        .map(|y| scale_offset(k, b, y))
        .collect();

    Ok(FitResult {
        assignment,
        k,
        b,
        k_err,
        b_err,
        converged,
        message,
        iterations,
        cost,
        warnings,
        series: DerivedSeries {
            q_range,
            y_range_fit,
            y_fit,
        },
    })
}

/// Map packed standard errors back onto `(K, b)`.
fn split_errors(assignment: ParamAssignment, errs: &[f64]) -> (Option<f64>, Option<f64>) {
    let mut it = errs.iter().copied();
    let k_err = if assignment.k.is_free() { it.next() } else { None };
    let b_err = if assignment.b.is_free() { it.next() } else { None };
    (k_err, b_err)
}

/// Fit every curve against the reference.
///
/// `curves` must already be in processing order and `assignments` resolved
/// for that order (`None` at the reference). Fits run in parallel; the output
/// keeps the input order.
///
/// Configuration problems with the reference abort; data errors on other
/// curves are returned as [`FitOutcome::Failed`].
pub fn fit_all(
    curves: &[Curve],
    reference_idx: usize,
    domain: &Domain,
    assignments: &[Option<ParamAssignment>],
    opts: &LmOptions,
) -> Result<Vec<FitOutcome>, FitError> {
    let reference_curve = curves
        .get(reference_idx)
        .ok_or_else(|| FitError::ReferenceNotFound(format!("#{reference_idx}")))?;

    debug_assert_eq!(curves.len(), assignments.len());

    let evaluators = build_interpolators(curves);
    let reference = evaluators[reference_idx]
        .clone()
        .map_err(|e| FitError::BadReference {
            id: reference_curve.id.clone(),
            reason: e.to_string(),
        })?;
    let ref_series = reference_series(reference_curve, &reference, domain)?;

    let outcomes = curves
        .par_iter()
        .zip(evaluators.par_iter())
        .zip(assignments.par_iter())
        .enumerate()
        .map(|(idx, ((curve, evaluator), assignment))| {
            if idx == reference_idx {
                return FitOutcome::Reference(ref_series.clone());
            }
            debug!(curve = %curve.id, "fitting");
            let Some(assignment) = assignment else {
                // Only the reference may lack an assignment.
                return FitOutcome::Failed(FitError::ReferenceNotFound(curve.id.clone()));
            };
            let result = evaluator
                .as_ref()
                .map_err(|e| e.clone())
                .and_then(|ev| fit_curve(curve, ev, &reference, domain, *assignment, opts));
            match result {
                Ok(fit) => FitOutcome::Fitted(fit),
                Err(e) => {
                    error!(curve = %curve.id, "{e}");
                    FitOutcome::Failed(e)
                }
            }
        })
        .collect();

    Ok(outcomes)
}

/// Attach each outcome's series to its curve.
pub fn attach_series(curves: &mut [Curve], outcomes: &[FitOutcome]) {
    for (curve, outcome) in curves.iter_mut().zip(outcomes) {
        curve.derived = match outcome {
            FitOutcome::Reference(series) => Some(series.clone()),
            FitOutcome::Fitted(fit) => Some(fit.series.clone()),
            FitOutcome::Failed(_) => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(lo: f64, hi: f64, step: f64) -> Vec<f64> {
        let n = ((hi - lo) / step).round() as usize;
        (0..=n).map(|i| lo + step * i as f64).collect()
    }

    fn exp_curve(id: &str, xs: &[f64], k: f64, b: f64) -> Curve {
        let ys: Vec<f64> = xs.iter().map(|&x| scale_offset(k, b, (x / 5.0).exp())).collect();
        Curve::from_xy(id, xs, &ys)
    }

    fn free() -> ParamAssignment {
        ParamAssignment {
            k: ParamValue::Free,
            b: ParamValue::Free,
        }
    }

    fn setup(k0: f64, b0: f64) -> (Curve, LinearInterpolator, Curve, LinearInterpolator, Domain) {
        let xs = grid(0.0, 10.0, 0.1);
        let reference = exp_curve("ref", &xs, 1.0, 0.0);
        let ref_eval = LinearInterpolator::new(&reference.xs(), &reference.ys()).unwrap();
        // Candidate data c(x) with k0 * c(x) - b0 = ref(x).
        let cand_ys: Vec<f64> = reference.ys().iter().map(|&y| (y + b0) / k0).collect();
        let candidate = Curve::from_xy("cand", &xs, &cand_ys);
        let cand_eval = LinearInterpolator::new(&candidate.xs(), &candidate.ys()).unwrap();
        let domain = Domain { x_min: 1.0, x_max: 9.0 };
        (reference, ref_eval, candidate, cand_eval, domain)
    }

    #[test]
    fn recovers_both_parameters() {
        let (_, ref_eval, cand, cand_eval, domain) = setup(2.0, 0.5);
        let fit = fit_curve(&cand, &cand_eval, &ref_eval, &domain, free(), &LmOptions::default()).unwrap();
        assert!(fit.converged, "{}", fit.message);
        assert!((fit.k - 2.0).abs() < 1e-6, "k={}", fit.k);
        assert!((fit.b - 0.5).abs() < 1e-6, "b={}", fit.b);
        assert_eq!(fit.series.q_range.len(), cand.len());
        assert_eq!(fit.series.y_fit.len(), cand.len());
    }

    #[test]
    fn recovers_b_with_k_fixed() {
        let (_, ref_eval, cand, cand_eval, domain) = setup(3.0, -1.25);
        let assignment = ParamAssignment {
            k: ParamValue::Given(3.0),
            b: ParamValue::Free,
        };
        let fit = fit_curve(&cand, &cand_eval, &ref_eval, &domain, assignment, &LmOptions::default()).unwrap();
        assert_eq!(fit.k, 3.0);
        assert!((fit.b + 1.25).abs() < 1e-6, "b={}", fit.b);
        assert!(fit.k_err.is_none());
    }

    #[test]
    fn recovers_k_with_b_fixed() {
        let (_, ref_eval, cand, cand_eval, domain) = setup(0.5, 2.0);
        let assignment = ParamAssignment {
            k: ParamValue::Free,
            b: ParamValue::Given(2.0),
        };
        let fit = fit_curve(&cand, &cand_eval, &ref_eval, &domain, assignment, &LmOptions::default()).unwrap();
        assert!((fit.k - 0.5).abs() < 1e-6, "k={}", fit.k);
        assert_eq!(fit.b, 2.0);
        assert!(fit.b_err.is_none());
    }

    #[test]
    fn zero_unknowns_evaluates_the_model() {
        let (_, ref_eval, cand, cand_eval, domain) = setup(2.0, 1.0);
        let assignment = ParamAssignment {
            k: ParamValue::Given(2.0),
            b: ParamValue::Given(1.0),
        };
        let fit = fit_curve(&cand, &cand_eval, &ref_eval, &domain, assignment, &LmOptions::default()).unwrap();
        assert_eq!((fit.k, fit.b), (2.0, 1.0));
        assert_eq!(fit.iterations, 0);
        assert!(fit.converged);
        assert!(fit.warnings.is_empty());
        let expected: Vec<f64> = cand.ys().iter().map(|&y| 2.0 * y - 1.0).collect();
        for (a, e) in fit.series.y_fit.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-12);
        }
    }

    #[test]
    fn exact_fit_reports_undefined_errors() {
        // Identical curves and a starting point on the solution: zero residual,
        // zero covariance.
        let (reference, ref_eval, _, _, domain) = setup(1.0, 0.0);
        let assignment = ParamAssignment {
            k: ParamValue::Free,
            b: ParamValue::Given(0.0),
        };
        let fit = fit_curve(&reference, &ref_eval, &ref_eval, &domain, assignment, &LmOptions::default()).unwrap();
        assert_eq!(fit.k, 1.0);
        assert!(fit.converged);
        assert!(fit.k_err.is_none() && fit.b_err.is_none());
        assert_eq!(fit.warnings.len(), 1);
    }

    #[test]
    fn noisy_fit_populates_errors() {
        let (_, ref_eval, cand, _, domain) = setup(2.0, 0.0);
        // Perturb the candidate so the residual is not zero.
        let ys: Vec<f64> = cand
            .ys()
            .iter()
            .enumerate()
            .map(|(i, &y)| y + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let noisy = Curve::from_xy("noisy", &cand.xs(), &ys);
        let eval = LinearInterpolator::new(&noisy.xs(), &noisy.ys()).unwrap();
        let fit = fit_curve(&noisy, &eval, &ref_eval, &domain, free(), &LmOptions::default()).unwrap();
        assert!((fit.k - 2.0).abs() < 0.05);
        assert!(fit.k_err.is_some_and(|e| e > 0.0 && e.is_finite()));
        assert!(fit.b_err.is_some_and(|e| e > 0.0 && e.is_finite()));
    }

    #[test]
    fn unconverged_fit_keeps_last_parameters_and_warns() {
        let (_, ref_eval, cand, cand_eval, domain) = setup(2.0, 0.5);
        let opts = LmOptions {
            max_iterations: 1,
            ..LmOptions::default()
        };
        let fit = fit_curve(&cand, &cand_eval, &ref_eval, &domain, free(), &opts).unwrap();

        assert!(!fit.converged);
        assert_eq!(fit.iterations, 1);
        let limit = crate::math::Termination::MaxIterations.message();
        assert_eq!(fit.message, limit);
        assert!(fit.warnings.iter().any(|w| w == limit));
        assert!(fit.k.is_finite() && fit.b.is_finite());
        assert_ne!((fit.k, fit.b), (1.0, 1.0));

        // The curve still gets a row with values.
        let ids = vec!["ref".to_string(), "cand".to_string()];
        let outcomes = vec![FitOutcome::Reference(DerivedSeries::default()), FitOutcome::Fitted(fit.clone())];
        let rows = crate::report::build_summary(&ids, &outcomes, &[None, Some(free())]);
        let row = rows.iter().find(|r| r.id == "cand").unwrap();
        assert_eq!(row.k, Some(fit.k));
        assert_eq!(row.b, Some(fit.b));
    }

    #[test]
    fn uncovered_domain_is_a_data_error() {
        let (_, ref_eval, _, _, _) = setup(1.0, 0.0);
        let short = exp_curve("short", &grid(3.0, 6.0, 0.5), 1.0, 0.0);
        let eval = LinearInterpolator::new(&short.xs(), &short.ys()).unwrap();
        let domain = Domain { x_min: 1.0, x_max: 9.0 };
        let err = fit_curve(&short, &eval, &ref_eval, &domain, free(), &LmOptions::default()).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn fit_all_keeps_order_and_isolates_failures() {
        let xs = grid(0.0, 10.0, 0.1);
        let curves = vec![
            exp_curve("a", &xs, 1.0, 0.0),
            Curve::from_xy("broken", &[5.0], &[1.0]),
            exp_curve("c", &xs, 2.0, 0.0),
        ];
        let domain = Domain { x_min: 1.0, x_max: 9.0 };
        let assignments = vec![None, Some(free()), Some(free())];
        let outcomes = fit_all(&curves, 0, &domain, &assignments, &LmOptions::default()).unwrap();

        assert!(matches!(outcomes[0], FitOutcome::Reference(_)));
        assert!(matches!(outcomes[1], FitOutcome::Failed(FitError::Interpolation { .. })));
        let FitOutcome::Fitted(fit) = &outcomes[2] else {
            panic!("expected a fit, got {:?}", outcomes[2]);
        };
        // c = 2 * a, so K = 1/2 maps c back onto a.
        assert!((fit.k - 0.5).abs() < 1e-6);
        assert!(fit.b.abs() < 1e-6);
    }

    #[test]
    fn reference_gets_identity_series() {
        let xs = grid(0.0, 10.0, 0.5);
        let mut curves = vec![exp_curve("a", &xs, 1.0, 0.0), exp_curve("b", &xs, 3.0, 1.0)];
        let domain = Domain { x_min: 0.0, x_max: 10.0 };
        let outcomes = fit_all(&curves, 0, &domain, &[None, Some(free())], &LmOptions::default()).unwrap();
        attach_series(&mut curves, &outcomes);

        let series = curves[0].derived.as_ref().unwrap();
        assert_eq!(series.y_fit, curves[0].ys());
        for (q, y) in series.q_range.iter().zip(&series.y_range_fit) {
            assert!((y - (q / 5.0).exp()).abs() < 1e-2);
        }
        assert!(curves[1].derived.is_some());
    }

    #[test]
    fn broken_reference_is_fatal() {
        let xs = grid(0.0, 10.0, 0.5);
        let curves = vec![Curve::from_xy("ref", &[1.0], &[1.0]), exp_curve("b", &xs, 1.0, 0.0)];
        let domain = Domain { x_min: 1.0, x_max: 1.0 };
        let err = fit_all(&curves, 0, &domain, &[None, Some(free())], &LmOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::BadReference { .. }));
    }
}
