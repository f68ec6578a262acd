//! Piecewise-linear interpolation over a curve's native samples.
//!
//! Queries outside `[x_first, x_last]` are rejected: the fit domain is built
//! so that it lies inside every curve's native range, and an out-of-range
//! query means the caller broke that contract.

use thiserror::Error;

/// Errors returned by [`LinearInterpolator`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("x={x} is outside the interpolation range [{lo}, {hi}]")]
    OutOfRange { x: f64, lo: f64, hi: f64 },
}

/// Piecewise-linear evaluator `y(x)`.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolator {
    /// Build from unsorted `(x, y)` columns.
    ///
    /// Nodes are sorted by `x` (stable). Duplicate abscissas are allowed; the
    /// evaluator then takes the later node of the pair.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        if x.len() != y.len() {
            return Err(InterpolationError::InvalidInput("x and y must have same length"));
        }
        if x.len() < 2 {
            return Err(InterpolationError::InvalidInput("need at least two samples"));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(InterpolationError::InvalidInput("x and y must be finite"));
        }

        let mut nodes: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y): (Vec<f64>, Vec<f64>) = nodes.into_iter().unzip();

        if x[x.len() - 1] <= x[0] {
            return Err(InterpolationError::InvalidInput("x has zero span"));
        }
        Ok(Self { x, y })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Whether `[lo, hi]` lies inside the node range.
    pub fn covers(&self, lo: f64, hi: f64) -> bool {
        lo >= self.x_min() && hi <= self.x_max()
    }

    pub fn value(&self, xq: f64) -> Result<f64, InterpolationError> {
        if !(xq >= self.x_min() && xq <= self.x_max()) {
            return Err(InterpolationError::OutOfRange {
                x: xq,
                lo: self.x_min(),
                hi: self.x_max(),
            });
        }
        let idx = self.x.partition_point(|v| *v <= xq);
        let i = idx.saturating_sub(1).min(self.x.len() - 2);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let w = if (x1 - x0).abs() <= f64::EPSILON {
            1.0
        } else {
            (xq - x0) / (x1 - x0)
        };
        Ok((1.0 - w) * self.y[i] + w * self.y[i + 1])
    }

    /// Evaluate at every point of `xs`.
    pub fn values(&self, xs: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        xs.iter().map(|&x| self.value(x)).collect()
    }
}
