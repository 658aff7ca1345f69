//! Nonlinear minimization backends.
//!
//! Two independent solvers share the [`Minimum`] result type:
//!
//! - [`lm_minimize`]: damped Gauss–Newton (Levenberg–Marquardt) over a
//!   vector of residuals supplied through the [`ResidualFunction`] trait,
//!   with an optional analytic Jacobian and a forward-difference fallback.
//! - [`bfgs_minimize`]: limited-memory BFGS over a scalar objective supplied
//!   through `argmin`'s [`CostFunction`](argmin::core::CostFunction) and
//!   [`Gradient`](argmin::core::Gradient) traits.
//!
//! Both run a fixed, deterministic loop: no retries, no validation of
//! callback output. Non-finite values propagate through the arithmetic and
//! surface as a poor (or unchanged) final estimate, so callbacks are expected
//! to stay finite over the region the solver explores.

mod bfgs;
mod levenberg_marquardt;

pub use bfgs::bfgs_minimize;
pub use levenberg_marquardt::lm_minimize;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Residual capability consumed by [`lm_minimize`].
///
/// An implementor evaluates M residuals at a given parameter vector of
/// length N, with M ≥ N. The Jacobian is optional: leave
/// [`has_jacobian`](Self::has_jacobian) at its default `false` and the
/// solver estimates it by forward differences.
///
/// ## Example: line through points
///
/// ```rust
/// use nalgebra::DVector;
/// use simsac::optim::{lm_minimize, LmControl, ResidualFunction};
///
/// struct LineFit {
///     xs: Vec<f64>,
///     ys: Vec<f64>,
/// }
///
/// impl ResidualFunction for LineFit {
///     fn function_count(&self) -> usize {
///         self.xs.len()
///     }
///
///     fn residual_values(&self, params: &DVector<f64>, out: &mut DVector<f64>) {
///         for i in 0..self.xs.len() {
///             out[i] = params[0] * self.xs[i] + params[1] - self.ys[i];
///         }
///     }
/// }
///
/// let fit = LineFit {
///     xs: vec![0.0, 1.0, 2.0, 3.0],
///     ys: vec![1.0, 3.0, 5.0, 7.0],
/// };
/// let start = DVector::from_column_slice(&[0.0, 0.0]);
/// let minimum = lm_minimize(&fit, &start, &LmControl::default());
/// assert!((minimum.params[0] - 2.0).abs() < 1e-6);
/// assert!((minimum.params[1] - 1.0).abs() < 1e-6);
/// ```
pub trait ResidualFunction {
    /// Number of residuals M evaluated per call.
    fn function_count(&self) -> usize;

    /// Fill `out` (length M) with the residuals at `params` (length N).
    fn residual_values(&self, params: &DVector<f64>, out: &mut DVector<f64>);

    /// Whether [`jacobian`](Self::jacobian) supplies analytic derivatives.
    fn has_jacobian(&self) -> bool {
        false
    }

    /// Fill `out` (N×M, one row per parameter, one column per residual) with
    /// `out[(j, i)] = ∂r_i/∂x_j`. Only called when
    /// [`has_jacobian`](Self::has_jacobian) returns `true`.
    fn jacobian(&self, _params: &DVector<f64>, _out: &mut DMatrix<f64>) {}
}

/// Convergence controls for [`lm_minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmControl {
    /// Stop when an accepted step reduces the sum of squares by less than
    /// this fraction of its current value.
    pub ftol: f64,
    /// Stop when the step length drops below `xtol · (‖x‖ + xtol)`.
    pub xtol: f64,
    /// Stop when the residual vector is nearly orthogonal to every Jacobian
    /// row (maximum cosine below this value).
    pub gtol: f64,
    /// Hard iteration cap; one trial step per iteration.
    pub max_iterations: usize,
    /// Forward-difference step used when no analytic Jacobian is available.
    pub epsilon: f64,
    /// Cap on the step length as a multiple of `max(‖x‖, 1)`.
    pub step_bound: f64,
}

impl Default for LmControl {
    fn default() -> Self {
        Self {
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            max_iterations: 200,
            epsilon: 1e-6,
            step_bound: 100.0,
        }
    }
}

/// Convergence controls for [`bfgs_minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BfgsControl {
    /// Stop when the gradient norm drops below this value.
    pub eps_g: f64,
    /// Stop when the function change between accepted iterates drops below
    /// `eps_f · max(|f_t|, |f_{t-1}|, 1)`.
    pub eps_f: f64,
    /// Stop when the step length drops below this value.
    pub eps_x: f64,
    /// Hard iteration cap.
    pub max_iterations: usize,
}

impl Default for BfgsControl {
    fn default() -> Self {
        Self {
            eps_g: 1e-10,
            eps_f: 1e-10,
            eps_x: 1e-10,
            max_iterations: 500,
        }
    }
}

/// Why a solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The function-change tolerance fired.
    FunctionTolerance,
    /// The parameter-step tolerance fired (includes a failed line search,
    /// where no acceptable step length remains).
    StepTolerance,
    /// The gradient tolerance fired.
    GradientTolerance,
    /// The iteration cap was reached without meeting any tolerance.
    IterationLimit,
}

/// Terminal state of a solver run: best parameters found, the objective
/// there, iterations spent, and the stop condition.
///
/// For [`lm_minimize`] `objective` is the sum of squared residuals; for
/// [`bfgs_minimize`] it is the function value.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub params: DVector<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub stop: StopReason,
}
