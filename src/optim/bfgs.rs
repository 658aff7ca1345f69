//! Limited-memory BFGS minimization of a scalar objective.
//!
//! The inverse Hessian is never formed; a bounded history of parameter and
//! gradient differences feeds the standard two-loop recursion, and a
//! backtracking Armijo search picks the step length. Curvature pairs with
//! non-positive `yᵀs` are skipped so the implicit approximation stays
//! positive definite.

use std::collections::VecDeque;

use argmin::core::{CostFunction, Error, Gradient};
use log::trace;
use nalgebra::DVector;

use super::{BfgsControl, Minimum, StopReason};

const HISTORY_DEPTH: usize = 10;
const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

/// Minimize `objective` from `initial`, reading values and gradients through
/// the `argmin` callback traits.
///
/// Callback failures propagate; numerically the loop applies no validation
/// beyond the tolerance tests, so non-finite objective values end the run at
/// whatever iterate they poison.
pub fn bfgs_minimize<O>(
    objective: &O,
    initial: &DVector<f64>,
    control: &BfgsControl,
) -> Result<Minimum, Error>
where
    O: CostFunction<Param = DVector<f64>, Output = f64>
        + Gradient<Param = DVector<f64>, Gradient = DVector<f64>>,
{
    let n = initial.len();
    let memory = n.min(HISTORY_DEPTH).max(1);

    let mut x = initial.clone();
    let mut f = objective.cost(&x)?;
    let mut g = objective.gradient(&x)?;

    let mut s_hist: VecDeque<DVector<f64>> = VecDeque::with_capacity(memory);
    let mut y_hist: VecDeque<DVector<f64>> = VecDeque::with_capacity(memory);
    let mut rho_hist: VecDeque<f64> = VecDeque::with_capacity(memory);

    let mut stop = StopReason::IterationLimit;
    let mut iterations = 0;

    for iter in 0..control.max_iterations {
        iterations = iter + 1;

        let g_norm = g.norm();
        if g_norm <= control.eps_g {
            stop = StopReason::GradientTolerance;
            break;
        }

        // Two-loop recursion over the stored curvature pairs.
        let mut q = g.clone();
        let depth = s_hist.len();
        let mut alpha = vec![0.0; depth];
        for i in (0..depth).rev() {
            alpha[i] = rho_hist[i] * s_hist[i].dot(&q);
            q -= alpha[i] * &y_hist[i];
        }
        if let (Some(s), Some(y)) = (s_hist.back(), y_hist.back()) {
            q *= s.dot(y) / y.dot(y);
        }
        for i in 0..depth {
            let beta = rho_hist[i] * y_hist[i].dot(&q);
            q += (alpha[i] - beta) * &s_hist[i];
        }
        let mut direction = -q;
        let mut dg = direction.dot(&g);
        if dg >= 0.0 {
            // Stale history can stop pointing downhill; fall back to steepest
            // descent for this iteration.
            direction = -g.clone();
            dg = -g_norm * g_norm;
        }

        let mut step = if iter == 0 { (1.0 / g_norm).min(1.0) } else { 1.0 };
        let mut line_search = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial = &x + &direction * step;
            let f_trial = objective.cost(&trial)?;
            if f_trial <= f + ARMIJO_C1 * step * dg {
                line_search = Some((trial, f_trial));
                break;
            }
            step *= 0.5;
        }
        let (x_new, f_new) = match line_search {
            Some(found) => found,
            None => {
                stop = StopReason::StepTolerance;
                break;
            }
        };

        let g_new = objective.gradient(&x_new)?;
        let s = &x_new - &x;
        let y = &g_new - &g;

        let f_small = (f - f_new).abs() <= control.eps_f * f.abs().max(f_new.abs()).max(1.0);
        let x_small = s.norm() <= control.eps_x;

        let ys = y.dot(&s);
        if ys > 1e-10 * y.norm() * s.norm() {
            if s_hist.len() == memory {
                s_hist.pop_front();
                y_hist.pop_front();
                rho_hist.pop_front();
            }
            rho_hist.push_back(1.0 / ys);
            s_hist.push_back(s);
            y_hist.push_back(y);
        }

        x = x_new;
        f = f_new;
        g = g_new;
        trace!("lbfgs iteration {}: f {:.6e}, step {:.3e}", iterations, f, step);

        if f_small {
            stop = StopReason::FunctionTolerance;
            break;
        }
        if x_small {
            stop = StopReason::StepTolerance;
            break;
        }
    }

    Ok(Minimum {
        params: x,
        objective: f,
        iterations,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f(x, y) = (x − 3)² + 10(y + 2)².
    struct Quadratic;

    impl CostFunction for Quadratic {
        type Param = DVector<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok((p[0] - 3.0).powi(2) + 10.0 * (p[1] + 2.0).powi(2))
        }
    }

    impl Gradient for Quadratic {
        type Param = DVector<f64>;
        type Gradient = DVector<f64>;

        fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, Error> {
            Ok(DVector::from_column_slice(&[
                2.0 * (p[0] - 3.0),
                20.0 * (p[1] + 2.0),
            ]))
        }
    }

    /// The Rosenbrock valley, minimum at (1, 1).
    struct Rosenbrock;

    impl CostFunction for Rosenbrock {
        type Param = DVector<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok((1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2))
        }
    }

    impl Gradient for Rosenbrock {
        type Param = DVector<f64>;
        type Gradient = DVector<f64>;

        fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, Error> {
            Ok(DVector::from_column_slice(&[
                -2.0 * (1.0 - p[0]) - 400.0 * p[0] * (p[1] - p[0] * p[0]),
                200.0 * (p[1] - p[0] * p[0]),
            ]))
        }
    }

    #[test]
    fn minimizes_axis_aligned_quadratic() {
        let start = DVector::from_column_slice(&[0.0, 0.0]);
        let minimum = bfgs_minimize(&Quadratic, &start, &BfgsControl::default()).unwrap();
        assert_relative_eq!(minimum.params[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(minimum.params[1], -2.0, epsilon = 1e-5);
        assert!(minimum.objective < 1e-9);
    }

    #[test]
    fn minimizes_rosenbrock_valley() {
        let start = DVector::from_column_slice(&[-1.2, 1.0]);
        let control = BfgsControl {
            max_iterations: 2000,
            ..BfgsControl::default()
        };
        let minimum = bfgs_minimize(&Rosenbrock, &start, &control).unwrap();
        assert!(minimum.objective < 1e-8);
        assert_relative_eq!(minimum.params[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(minimum.params[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn stationary_start_stops_immediately() {
        let start = DVector::from_column_slice(&[3.0, -2.0]);
        let minimum = bfgs_minimize(&Quadratic, &start, &BfgsControl::default()).unwrap();
        assert_eq!(minimum.stop, StopReason::GradientTolerance);
        assert_eq!(minimum.iterations, 1);
        assert_eq!(minimum.params, start);
    }

    #[test]
    fn honors_iteration_cap() {
        let start = DVector::from_column_slice(&[-1.2, 1.0]);
        let control = BfgsControl {
            max_iterations: 2,
            eps_g: 0.0,
            eps_f: 0.0,
            eps_x: 0.0,
        };
        let minimum = bfgs_minimize(&Rosenbrock, &start, &control).unwrap();
        assert_eq!(minimum.iterations, 2);
        assert_eq!(minimum.stop, StopReason::IterationLimit);
    }
}
