//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during fitting
//! - exported to CSV/JSON
//! - rendered in terminal tables and plots

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::LmOptions;

/// One row of a curve file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Uncertainty of `y`, when the file carries it.
    pub e: Option<f64>,
    /// Resolution of `x`, when the file carries it.
    pub dx: Option<f64>,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, e: None, dx: None }
    }
}

/// Columns computed by the fit and attached to the curve they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    /// Shared grid over the common domain.
    pub q_range: Vec<f64>,
    /// Model evaluated on `q_range`.
    pub y_range_fit: Vec<f64>,
    /// Model evaluated on the curve's own X samples.
    pub y_fit: Vec<f64>,
}

/// A loaded curve.
///
/// Samples keep their read order. Trimming happens once, before fitting;
/// after that only `derived` is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub id: String,
    pub samples: Vec<Sample>,
    pub derived: Option<DerivedSeries>,
}

impl Curve {
    pub fn new(id: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            id: id.into(),
            samples,
            derived: None,
        }
    }

    /// Build a curve from bare `(x, y)` columns.
    pub fn from_xy(id: impl Into<String>, xs: &[f64], ys: &[f64]) -> Self {
        let samples = xs.iter().zip(ys).map(|(&x, &y)| Sample::new(x, y)).collect();
        Self::new(id, samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.y).collect()
    }

    /// Drop `begin` leading and `end` trailing samples.
    ///
    /// Asking for more than the curve holds leaves it empty.
    pub fn discard_points(&mut self, begin: usize, end: usize) {
        let begin = begin.min(self.samples.len());
        self.samples.drain(..begin);
        let keep = self.samples.len().saturating_sub(end);
        self.samples.truncate(keep);
    }

    /// Smallest X among samples with `Y > 0`.
    pub fn min_positive_x(&self) -> Option<f64> {
        self.samples
            .iter()
            .filter(|s| s.y > 0.0)
            .map(|s| s.x)
            .fold(None, |acc, x| Some(acc.map_or(x, |a: f64| a.min(x))))
    }

    /// Largest X over all samples.
    pub fn max_x(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.x)
            .fold(None, |acc, x| Some(acc.map_or(x, |a: f64| a.max(x))))
    }
}

/// The shared X interval over which every fit is performed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub x_min: f64,
    pub x_max: f64,
}

impl Domain {
    /// `n` evenly spaced points from `x_min` to `x_max`, both included.
    pub fn linspace(&self, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![self.x_min],
            _ => {
                let step = (self.x_max - self.x_min) / (n as f64 - 1.0);
                let mut out: Vec<f64> = (0..n).map(|i| self.x_min + step * i as f64).collect();
                // Pin the last point so rounding never leaves the domain.
                out[n - 1] = self.x_max;
                out
            }
        }
    }
}

/// How a parameter (K or b) is supplied for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSpec {
    /// Solved by the optimizer.
    Free,
    /// Same value for every non-reference curve.
    Fixed(f64),
    /// One value per non-reference curve, wrapping around.
    Cyclic(Vec<f64>),
}

impl ParamSpec {
    /// Build a spec from the mutually exclusive "single value" / "list" inputs.
    pub fn from_options(value: Option<f64>, list: Option<Vec<f64>>) -> Self {
        match (value, list) {
            (Some(v), _) => ParamSpec::Fixed(v),
            (None, Some(list)) => ParamSpec::Cyclic(list),
            (None, None) => ParamSpec::Free,
        }
    }
}

/// A parameter resolved for one curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Free,
    Given(f64),
}

impl ParamValue {
    pub fn is_free(self) -> bool {
        matches!(self, ParamValue::Free)
    }

    pub fn given(self) -> Option<f64> {
        match self {
            ParamValue::Free => None,
            ParamValue::Given(v) => Some(v),
        }
    }
}

/// The `(K, b)` pair resolved for one non-reference curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamAssignment {
    pub k: ParamValue,
    pub b: ParamValue,
}

impl ParamAssignment {
    /// Number of unknowns handed to the optimizer (0, 1 or 2).
    pub fn unknown_count(&self) -> usize {
        usize::from(self.k.is_free()) + usize::from(self.b.is_free())
    }
}

/// Fit output for one non-reference curve.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub assignment: ParamAssignment,
    /// K used by the model (fitted or given).
    pub k: f64,
    /// b used by the model (fitted or given).
    pub b: f64,
    /// Standard error of K; `None` when K was given or the covariance is degenerate.
    pub k_err: Option<f64>,
    /// Standard error of b; `None` when b was given or the covariance is degenerate.
    pub b_err: Option<f64>,
    pub converged: bool,
    /// Solver termination message.
    pub message: String,
    pub iterations: usize,
    /// Half the sum of squared residuals at the returned parameters.
    pub cost: f64,
    pub warnings: Vec<String>,
    pub series: DerivedSeries,
}

/// What happened to one curve of the working set.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// The reference curve; no fit performed, series are the identity.
    Reference(DerivedSeries),
    Fitted(FitResult),
    /// A data error confined to this curve.
    Failed(FitError),
}

/// One line of the summary table.
///
/// Absent fields belong to curves whose fit failed, or to standard errors
/// that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: String,
    pub k: Option<f64>,
    pub k_err: Option<f64>,
    pub b: Option<f64>,
    pub b_err: Option<f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from settings files and CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub reference: String,
    pub inputs: Vec<String>,
    /// Domain floor; `None` means unconstrained.
    pub qmin: Option<f64>,
    /// Domain ceiling; `None` means unconstrained.
    pub qmax: Option<f64>,
    pub discard_begin: usize,
    pub discard_end: usize,
    pub save_scaled: bool,
    pub k: ParamSpec,
    pub b: ParamSpec,
    pub solver: LmOptions,

    pub plot: bool,
    /// Also render log-log versions of every plot.
    pub plot_log: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_summary: Option<PathBuf>,
}
