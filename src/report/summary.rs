//! Per-curve summary rows (K, err(K), b, err(b)).
//!
//! Rows are built from the fit outcomes and the same assignment list the fit
//! used, so given values and fitted values are told apart without re-walking
//! any parameter cycle.

use crate::domain::{FitOutcome, FitResult, ParamAssignment, SummaryRow};

/// Build one row per curve, sorted by identifier.
///
/// `ids`, `outcomes` and `assignments` are parallel slices in processing
/// order. Pure: calling it twice on the same inputs gives the same rows.
pub fn build_summary(
    ids: &[String],
    outcomes: &[FitOutcome],
    assignments: &[Option<ParamAssignment>],
) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = ids
        .iter()
        .zip(outcomes)
        .zip(assignments)
        .map(|((id, outcome), assignment)| match outcome {
            FitOutcome::Reference(_) => reference_row(id),
            FitOutcome::Fitted(fit) => fitted_row(id, fit, assignment.unwrap_or(fit.assignment)),
            FitOutcome::Failed(_) => SummaryRow {
                id: id.clone(),
                k: None,
                k_err: None,
                b: None,
                b_err: None,
            },
        })
        .collect();

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

fn reference_row(id: &str) -> SummaryRow {
    SummaryRow {
        id: id.to_string(),
        k: Some(0.0),
        k_err: Some(0.0),
        b: Some(0.0),
        b_err: Some(0.0),
    }
}

fn fitted_row(id: &str, fit: &FitResult, assignment: ParamAssignment) -> SummaryRow {
    // A given value is reported with a zero error; a fitted one carries the
    // solver's error, which may be undefined.
    let (k, k_err) = match assignment.k.given() {
        Some(k) => (k, Some(0.0)),
        None => (fit.k, fit.k_err),
    };
    let (b, b_err) = match assignment.b.given() {
        Some(b) => (b, Some(0.0)),
        None => (fit.b, fit.b_err),
    };
    SummaryRow {
        id: id.to_string(),
        k: Some(k),
        k_err,
        b: Some(b),
        b_err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DerivedSeries, ParamValue};
    use crate::error::FitError;

    fn fit(assignment: ParamAssignment, k: f64, b: f64, k_err: Option<f64>, b_err: Option<f64>) -> FitOutcome {
        FitOutcome::Fitted(FitResult {
            assignment,
            k,
            b,
            k_err,
            b_err,
            converged: true,
            message: String::new(),
            iterations: 3,
            cost: 0.1,
            warnings: Vec::new(),
            series: DerivedSeries::default(),
        })
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_follow_parameter_modes() {
        let k_fixed = ParamAssignment { k: ParamValue::Given(1.5), b: ParamValue::Free };
        let b_fixed = ParamAssignment { k: ParamValue::Free, b: ParamValue::Given(-2.0) };
        let both = ParamAssignment { k: ParamValue::Free, b: ParamValue::Free };

        let outcomes = vec![
            fit(k_fixed, 1.5, 0.3, None, Some(0.01)),
            FitOutcome::Reference(DerivedSeries::default()),
            fit(b_fixed, 2.0, -2.0, Some(0.02), None),
            fit(both, 3.0, 5.0, Some(0.03), Some(0.04)),
        ];
        let assignments = vec![Some(k_fixed), None, Some(b_fixed), Some(both)];
        let rows = build_summary(&ids(&["d", "a", "c", "b"]), &outcomes, &assignments);

        let got: Vec<_> = rows.iter().map(|r| (r.id.as_str(), r.k, r.k_err, r.b, r.b_err)).collect();
        assert_eq!(
            got,
            vec![
                ("a", Some(0.0), Some(0.0), Some(0.0), Some(0.0)),
                ("b", Some(3.0), Some(0.03), Some(5.0), Some(0.04)),
                ("c", Some(2.0), Some(0.02), Some(-2.0), Some(0.0)),
                ("d", Some(1.5), Some(0.0), Some(0.3), Some(0.01)),
            ]
        );
    }

    #[test]
    fn failed_curves_have_empty_rows() {
        let outcomes = vec![
            FitOutcome::Reference(DerivedSeries::default()),
            FitOutcome::Failed(FitError::Interpolation {
                id: "b".to_string(),
                reason: "need at least two samples".to_string(),
            }),
        ];
        let both = ParamAssignment { k: ParamValue::Free, b: ParamValue::Free };
        let rows = build_summary(&ids(&["a", "b"]), &outcomes, &[None, Some(both)]);
        assert_eq!(rows[1].k, None);
        assert_eq!(rows[1].b_err, None);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let both = ParamAssignment { k: ParamValue::Free, b: ParamValue::Free };
        let outcomes = vec![
            fit(both, 2.0, 0.0, None, None),
            FitOutcome::Reference(DerivedSeries::default()),
        ];
        let names = ids(&["z", "r"]);
        let assignments = vec![Some(both), None];
        assert_eq!(
            build_summary(&names, &outcomes, &assignments),
            build_summary(&names, &outcomes, &assignments)
        );
    }
}
