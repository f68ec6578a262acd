//! Levenberg-Marquardt nonlinear least squares.
//!
//! We minimize
//!
//! ```text
//! cost(p) = 1/2 Σ r_i(p)^2
//! ```
//!
//! over a handful of parameters. Each iteration solves the damped normal
//! equations
//!
//! ```text
//! (JᵀJ + λ D) δ = -Jᵀr,    D = diag(JᵀJ)
//! ```
//!
//! with a Cholesky factorization, accepts the step when the gain ratio is
//! positive, and adapts `λ` with Nielsen's update rule.
//!
//! The covariance estimate is `s² (JᵀJ)⁻¹` with `s² = Σr² / (n - p)`, evaluated
//! at the returned parameters.

use nalgebra::{DMatrix, DVector};

/// Smallest diagonal scaling entry, so a zero Jacobian column still gets damped.
const MIN_DIAG: f64 = 1e-12;

/// Initial damping relative to the largest diagonal entry of `JᵀJ`.
const TAU: f64 = 1e-3;

/// Solver limits and tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Relative reduction of the cost below which we stop.
    pub ftol: f64,
    /// Relative step size below which we stop.
    pub xtol: f64,
    /// Infinity norm of the gradient below which we stop.
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
        }
    }
}

/// A least-squares problem: residuals and (optionally) their Jacobian.
pub trait LeastSquaresProblem {
    /// Number of residuals.
    fn residual_count(&self) -> usize;

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of the residuals, `residual_count × params.len()`.
    ///
    /// The default is a forward-difference approximation.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let r0 = self.residuals(params);
        let mut jac = DMatrix::<f64>::zeros(r0.len(), params.len());
        for j in 0..params.len() {
            let h = f64::EPSILON.sqrt() * params[j].abs().max(1.0);
            let mut shifted = params.clone();
            shifted[j] += h;
            let r1 = self.residuals(&shifted);
            for i in 0..r0.len() {
                jac[(i, j)] = (r1[i] - r0[i]) / h;
            }
        }
        jac
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residuals are exactly zero.
    ZeroResidual,
    /// Cost reduction fell below `ftol`.
    CostConverged,
    /// Step size fell below `xtol`.
    StepConverged,
    /// Gradient fell below `gtol`.
    GradientConverged,
    /// `max_iterations` reached.
    MaxIterations,
    /// Damping grew without producing an acceptable step.
    NoProgress,
    /// Residuals or Jacobian became non-finite.
    NonFinite,
}

impl Termination {
    pub fn converged(self) -> bool {
        matches!(
            self,
            Termination::ZeroResidual
                | Termination::CostConverged
                | Termination::StepConverged
                | Termination::GradientConverged
        )
    }

    pub fn message(self) -> &'static str {
        match self {
            Termination::ZeroResidual => "Residuals are zero at the solution.",
            Termination::CostConverged => {
                "Relative reduction in the sum of squares is at most ftol."
            }
            Termination::StepConverged => "Relative change between iterates is at most xtol.",
            Termination::GradientConverged => "Gradient norm is at most gtol.",
            Termination::MaxIterations => "Iteration limit reached before convergence.",
            Termination::NoProgress => "Damping exhausted without reducing the sum of squares.",
            Termination::NonFinite => "Residuals or Jacobian became non-finite.",
        }
    }
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct LmReport {
    /// Last accepted parameters (returned even without convergence).
    pub params: DVector<f64>,
    /// Covariance estimate; `None` when `JᵀJ` is singular or `n <= p`.
    pub covariance: Option<DMatrix<f64>>,
    pub termination: Termination,
    pub iterations: usize,
    pub cost: f64,
}

impl LmReport {
    pub fn converged(&self) -> bool {
        self.termination.converged()
    }

    /// Square roots of the covariance diagonal.
    ///
    /// `None` when the covariance is missing, all zero, or has a non-finite or
    /// negative diagonal entry.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        let cov = self.covariance.as_ref()?;
        if cov.iter().all(|v| *v == 0.0) {
            return None;
        }
        let diag = cov.diagonal();
        if diag.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return None;
        }
        Some(diag.iter().map(|v| v.sqrt()).collect())
    }
}

/// Minimize the problem starting from `initial`.
pub fn minimize<P: LeastSquaresProblem>(problem: &P, initial: DVector<f64>, opts: &LmOptions) -> LmReport {
    let mut params = initial;
    let mut r = problem.residuals(&params);
    let mut cost = 0.5 * r.norm_squared();

    if !cost.is_finite() {
        return finish(problem, params, Termination::NonFinite, 0, cost);
    }
    if params.is_empty() {
        return finish(problem, params, Termination::GradientConverged, 0, cost);
    }

    let mut jac = problem.jacobian(&params);
    let mut lambda: Option<f64> = None;
    let mut nu = 2.0;
    let mut iterations = 0usize;

    let termination = loop {
        if cost == 0.0 {
            break Termination::ZeroResidual;
        }
        if iterations >= opts.max_iterations {
            break Termination::MaxIterations;
        }
        if jac.iter().any(|v| !v.is_finite()) {
            break Termination::NonFinite;
        }
        iterations += 1;

        let jtj = jac.transpose() * &jac;
        let gradient = jac.transpose() * &r;
        if gradient.amax() <= opts.gtol {
            break Termination::GradientConverged;
        }

        let diag = DVector::from_iterator(jtj.nrows(), jtj.diagonal().iter().map(|d| d.max(MIN_DIAG)));
        let mut lam = lambda.unwrap_or_else(|| TAU * diag.max());

        // Inner loop: raise damping until a step reduces the cost.
        let step_outcome = loop {
            if !lam.is_finite() || lam > 1e32 {
                break None;
            }
            let mut damped = jtj.clone();
            for i in 0..damped.nrows() {
                damped[(i, i)] += lam * diag[i];
            }
            let Some(chol) = damped.cholesky() else {
                lam *= nu;
                nu *= 2.0;
                continue;
            };
            let delta = chol.solve(&(-&gradient));
            let candidate = &params + &delta;
            let r_new = problem.residuals(&candidate);
            let cost_new = 0.5 * r_new.norm_squared();

            // Predicted reduction of the linearized model: ½ δᵀ(λDδ - g).
            let scaled = delta.component_mul(&diag) * lam;
            let predicted = 0.5 * delta.dot(&(scaled - &gradient));
            let actual = cost - cost_new;

            if cost_new.is_finite() && actual > 0.0 && predicted > 0.0 {
                let rho = actual / predicted;
                lam *= (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;
                break Some((delta, candidate, r_new, cost_new, actual));
            }

            // A rejected step that is already below xtol means we are done.
            if delta.norm() <= opts.xtol * (params.norm() + opts.xtol) {
                break Some((delta, params.clone(), r.clone(), cost, 0.0));
            }
            lam *= nu;
            nu *= 2.0;
        };
        lambda = Some(lam);

        let Some((delta, new_params, r_new, cost_new, reduction)) = step_outcome else {
            break Termination::NoProgress;
        };

        let step_small = delta.norm() <= opts.xtol * (params.norm() + opts.xtol);
        let cost_small = reduction <= opts.ftol * cost;

        params = new_params;
        r = r_new;
        cost = cost_new;

        if cost_small {
            break Termination::CostConverged;
        }
        if step_small {
            break Termination::StepConverged;
        }
        jac = problem.jacobian(&params);
    };

    finish(problem, params, termination, iterations, cost)
}

fn finish<P: LeastSquaresProblem>(
    problem: &P,
    params: DVector<f64>,
    termination: Termination,
    iterations: usize,
    cost: f64,
) -> LmReport {
    let covariance = estimate_covariance(problem, &params, cost);
    LmReport {
        params,
        covariance,
        termination,
        iterations,
        cost,
    }
}

fn estimate_covariance<P: LeastSquaresProblem>(problem: &P, params: &DVector<f64>, cost: f64) -> Option<DMatrix<f64>> {
    let n = problem.residual_count();
    let p = params.len();
    if p == 0 || n <= p || !cost.is_finite() {
        return None;
    }
    let jac = problem.jacobian(params);
    let inv = (jac.transpose() * &jac).try_inverse()?;
    let s2 = 2.0 * cost / (n - p) as f64;
    let cov = inv * s2;
    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}
