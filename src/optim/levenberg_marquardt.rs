//! Damped Gauss–Newton minimization of a residual sum of squares.
//!
//! One trial step per iteration: solve `(JᵀJ + μI)δ = −Jᵀr`, clamp the step
//! to the configured bound, and accept or reject by the gain ratio of actual
//! to predicted reduction. The damping parameter μ shrinks toward Newton
//! behavior on good steps and grows toward gradient descent on bad ones.

use log::trace;
use nalgebra::{Cholesky, DMatrix, DVector};

use super::{LmControl, Minimum, ResidualFunction, StopReason};

/// Minimize the sum of squared residuals of `function`, starting at
/// `initial`.
///
/// Returns the best parameters found together with the final objective and
/// the stop condition; the caller must not assume the tolerances were met
/// when the iteration cap fires first.
pub fn lm_minimize<F: ResidualFunction>(
    function: &F,
    initial: &DVector<f64>,
    control: &LmControl,
) -> Minimum {
    let n = initial.len();
    let m = function.function_count();

    let mut x = initial.clone();
    let mut residuals = DVector::zeros(m);
    function.residual_values(&x, &mut residuals);
    // Work on half the sum of squares so that gradient = J·r exactly.
    let mut half_ssq = 0.5 * residuals.norm_squared();

    let mut jac = DMatrix::zeros(n, m);
    let mut scratch = DVector::zeros(m);
    fill_jacobian(function, &x, &residuals, control.epsilon, &mut jac, &mut scratch);
    let mut normal = &jac * jac.transpose();
    let mut gradient = &jac * &residuals;

    let mut mu = 1e-3 * max_diagonal(&normal);
    if !(mu > 0.0) {
        mu = 1e-3;
    }
    let mut nu = 2.0;

    let mut stop = StopReason::IterationLimit;
    let mut iterations = 0;

    for _ in 0..control.max_iterations {
        iterations += 1;

        if orthogonality(&jac, &residuals, &gradient) <= control.gtol {
            stop = StopReason::GradientTolerance;
            break;
        }

        let mut damped = normal.clone();
        for j in 0..n {
            damped[(j, j)] += mu;
        }
        let neg_gradient = -&gradient;
        let mut step = match Cholesky::new(damped) {
            Some(chol) => chol.solve(&neg_gradient),
            None => {
                // A failed factorization counts as a rejected step.
                mu *= nu;
                nu *= 2.0;
                continue;
            }
        };

        let x_norm = x.norm();
        let bound = control.step_bound * x_norm.max(1.0);
        let step_norm = step.norm();
        if step_norm > bound {
            step *= bound / step_norm;
        }

        if step.norm() <= control.xtol * (x_norm + control.xtol) {
            stop = StopReason::StepTolerance;
            break;
        }

        let trial = &x + &step;
        function.residual_values(&trial, &mut scratch);
        let trial_half_ssq = 0.5 * scratch.norm_squared();

        let predicted = 0.5 * step.dot(&(&step * mu - &gradient));
        let actual = half_ssq - trial_half_ssq;
        let rho = actual / predicted.max(f64::MIN_POSITIVE);

        if rho > 0.0 {
            let relative_drop = actual / half_ssq.max(f64::MIN_POSITIVE);
            x = trial;
            std::mem::swap(&mut residuals, &mut scratch);
            half_ssq = trial_half_ssq;

            fill_jacobian(function, &x, &residuals, control.epsilon, &mut jac, &mut scratch);
            normal = &jac * jac.transpose();
            gradient = &jac * &residuals;

            mu *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;
            trace!(
                "lm accepted step: ssq {:.6e}, gain ratio {:.3}",
                2.0 * half_ssq,
                rho
            );

            if relative_drop <= control.ftol {
                stop = StopReason::FunctionTolerance;
                break;
            }
        } else {
            mu *= nu;
            nu *= 2.0;
        }
    }

    Minimum {
        params: x,
        objective: 2.0 * half_ssq,
        iterations,
        stop,
    }
}

/// Either delegate to the analytic Jacobian or build a forward-difference
/// estimate row by row (`epsilon` is an absolute probe step).
fn fill_jacobian<F: ResidualFunction>(
    function: &F,
    x: &DVector<f64>,
    base: &DVector<f64>,
    epsilon: f64,
    jac: &mut DMatrix<f64>,
    scratch: &mut DVector<f64>,
) {
    if function.has_jacobian() {
        function.jacobian(x, jac);
        return;
    }
    let mut probe = x.clone();
    for j in 0..x.len() {
        let saved = probe[j];
        probe[j] = saved + epsilon;
        function.residual_values(&probe, scratch);
        probe[j] = saved;
        for i in 0..base.len() {
            jac[(j, i)] = (scratch[i] - base[i]) / epsilon;
        }
    }
}

/// Maximum cosine between the residual vector and any Jacobian row; zero
/// residuals report 0 so a perfect fit stops on the gradient test.
fn orthogonality(jac: &DMatrix<f64>, residuals: &DVector<f64>, gradient: &DVector<f64>) -> f64 {
    let r_norm = residuals.norm();
    if r_norm == 0.0 {
        return 0.0;
    }
    let mut worst = 0.0_f64;
    for j in 0..jac.nrows() {
        let row_norm = jac.row(j).norm();
        if row_norm > 0.0 {
            worst = worst.max(gradient[j].abs() / (row_norm * r_norm));
        }
    }
    worst
}

fn max_diagonal(normal: &DMatrix<f64>) -> f64 {
    let mut max = 0.0_f64;
    for j in 0..normal.nrows() {
        max = max.max(normal[(j, j)]);
    }
    max
}
