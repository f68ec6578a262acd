//! Shared superposition pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! working set -> load -> trim -> common domain -> K/b assignment -> fit -> summary
//!
//! The CLI then focuses on presentation (printing, plots, exports).

use tracing::{debug, info};

use crate::domain::{Curve, Domain, FitOutcome, ParamAssignment, RunConfig, SummaryRow};
use crate::error::{AppError, FitError};
use crate::fit::{ParameterSource, attach_series, find_common_domain, fit_all};
use crate::io::load_curves;
use crate::report::build_summary;

/// All computed outputs of a single superposition run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reference: String,
    /// Curves in processing order, with derived columns attached.
    pub curves: Vec<Curve>,
    pub domain: Domain,
    pub assignments: Vec<Option<ParamAssignment>>,
    pub outcomes: Vec<FitOutcome>,
    /// One row per curve, sorted by identifier.
    pub summary: Vec<SummaryRow>,
}

impl RunOutput {
    pub fn ids(&self) -> Vec<String> {
        self.curves.iter().map(|c| c.id.clone()).collect()
    }
}

/// Inputs plus the reference, sorted, without duplicates.
pub fn working_set(reference: &str, inputs: &[String]) -> Result<Vec<String>, FitError> {
    if inputs.is_empty() {
        return Err(FitError::EmptyInput);
    }
    let mut ids: Vec<String> = inputs.to_vec();
    ids.push(reference.to_string());
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Execute the full pipeline, reading curve files from disk.
pub fn run_superimpose(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ids = working_set(&config.reference, &config.inputs)?;
    info!(curves = ids.len(), reference = %config.reference, "working set");
    let curves = load_curves(&ids)?;
    run_with_curves(config, curves)
}

/// Execute the pipeline on curves already in memory.
///
/// Curves are put in identifier order first; `config.inputs` is not read.
pub fn run_with_curves(config: &RunConfig, mut curves: Vec<Curve>) -> Result<RunOutput, AppError> {
    if curves.is_empty() {
        return Err(FitError::EmptyInput.into());
    }
    curves.sort_by(|a, b| a.id.cmp(&b.id));
    curves.dedup_by(|a, b| a.id == b.id);

    let reference_idx = curves
        .iter()
        .position(|c| c.id == config.reference)
        .ok_or_else(|| FitError::ReferenceNotFound(config.reference.clone()))?;

    // 1) Trim every curve once, before anything looks at its samples.
    for curve in &mut curves {
        curve.discard_points(config.discard_begin, config.discard_end);
        debug!(curve = %curve.id, samples = curve.len(), "trimmed");
    }

    // 2) Shared domain.
    let domain = find_common_domain(&curves, config.qmin, config.qmax)?;
    info!(x_min = domain.x_min, x_max = domain.x_max, "common domain");

    // 3) Resolve K/b per curve once; fit and summary both read this list.
    let mut source = ParameterSource::new(config.k.clone(), config.b.clone())?;
    let assignments = source.resolve_assignments(curves.len(), reference_idx);

    // 4) Fit and attach derived columns.
    let outcomes = fit_all(&curves, reference_idx, &domain, &assignments, &config.solver)?;
    attach_series(&mut curves, &outcomes);

    // 5) Summary rows.
    let ids: Vec<String> = curves.iter().map(|c| c.id.clone()).collect();
    let summary = build_summary(&ids, &outcomes, &assignments);

    Ok(RunOutput {
        reference: config.reference.clone(),
        curves,
        domain,
        assignments,
        outcomes,
        summary,
    })
}
