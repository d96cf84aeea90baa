//! Damped-Newton minimization of a scalar objective.
//!
//! The inner loop of every fit: at the current point, compute the gradient
//! and Hessian by finite differences, solve `(H + lambda I) delta = -g` by
//! Cholesky, and accept or reject the step against the objective value.
//! Lambda falls on acceptance and rises on rejection, blending Newton steps
//! near the minimum with damped gradient steps far from it.
//!
//! The objective is evaluated in internal (unbounded) coordinates, so bounds
//! never constrain the step; see [`BoundsTransform`].
//!
//! [`BoundsTransform`]: crate::parameters::BoundsTransform

use crate::error::Result;
use crate::fit::config::FitConfig;
use crate::fit::covariance::{cholesky_factor, cholesky_solve};
use crate::utils::finite_difference;
use ndarray::Array1;
use std::cell::Cell;

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MinimizeStatus {
    /// Gradient norm fell below `gtol`.
    GradientConverged,

    /// Relative NLL improvement fell below `ftol`.
    CostConverged,

    /// Largest parameter step fell below `xtol`.
    ParamConverged,

    /// Accepted-iteration budget exhausted.
    MaxIterations,

    /// No acceptable step found before lambda hit its ceiling.
    Stalled,

    /// The objective was non-finite at the starting point.
    NotFinite,
}

impl MinimizeStatus {
    pub(crate) fn is_converged(self) -> bool {
        matches!(
            self,
            MinimizeStatus::GradientConverged
                | MinimizeStatus::CostConverged
                | MinimizeStatus::ParamConverged
        )
    }
}

/// Result of a full minimization run.
#[derive(Debug, Clone)]
pub(crate) struct MinimizeOutcome {
    /// Best point found, in internal coordinates.
    pub x: Array1<f64>,

    /// Objective value at the best point.
    pub value: f64,

    /// Number of accepted iterations.
    pub iterations: usize,

    /// Number of objective evaluations.
    pub func_evals: usize,

    /// Why the run stopped.
    pub status: MinimizeStatus,

    /// A human-readable account of the stop.
    pub message: String,
}

/// Result of a single damped-Newton step.
#[derive(Debug, Clone)]
pub(crate) enum NewtonStep {
    /// The step reduced the objective; the new point is inside.
    Accepted {
        x: Array1<f64>,
        value: f64,
        gradient_norm: f64,
        step_norm: f64,
        improvement: f64,
    },

    /// The gradient is already below tolerance; no step taken.
    GradientConverged { gradient_norm: f64 },

    /// Lambda hit its ceiling without finding a downhill step.
    Exhausted { gradient_norm: f64 },
}

/// Attempt one damped-Newton step from `x` with objective value `f0`.
///
/// `lambda` is updated in place: down on acceptance, up on each rejection.
pub(crate) fn newton_step<F>(
    f: &F,
    x: &Array1<f64>,
    f0: f64,
    lambda: &mut f64,
    config: &FitConfig,
) -> Result<NewtonStep>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let grad = finite_difference::gradient(f, x, None)?;
    let gradient_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();

    if gradient_norm < config.gtol {
        return Ok(NewtonStep::GradientConverged { gradient_norm });
    }

    let hess = finite_difference::hessian(f, x, None)?;
    let n = x.len();

    loop {
        let mut damped = hess.clone();
        for i in 0..n {
            damped[[i, i]] += *lambda;
        }

        if let Some(l) = cholesky_factor(&damped) {
            let delta = cholesky_solve(&l, &grad.mapv(|g| -g));
            let x_new = x + &delta;
            let f_new = f(&x_new)?;

            if f_new.is_finite() && f_new < f0 {
                *lambda = (*lambda * config.lambda_down_factor).max(config.min_lambda);
                let step_norm = delta.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));
                let improvement = (f0 - f_new) / f0.abs().max(1e-10);
                return Ok(NewtonStep::Accepted {
                    x: x_new,
                    value: f_new,
                    gradient_norm,
                    step_norm,
                    improvement,
                });
            }
        }

        // Not positive definite, or the step went uphill: damp harder
        *lambda *= config.lambda_up_factor;
        if *lambda > config.max_lambda {
            return Ok(NewtonStep::Exhausted { gradient_norm });
        }
    }
}

/// Minimize `f` from `x0` until convergence or budget exhaustion.
pub(crate) fn minimize<F>(f: &F, x0: Array1<f64>, config: &FitConfig) -> Result<MinimizeOutcome>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let evals = Cell::new(0usize);
    let counted = |x: &Array1<f64>| -> Result<f64> {
        evals.set(evals.get() + 1);
        f(x)
    };

    let mut x = x0;
    let mut f0 = counted(&x)?;
    if !f0.is_finite() {
        return Ok(MinimizeOutcome {
            x,
            value: f0,
            iterations: 0,
            func_evals: evals.get(),
            status: MinimizeStatus::NotFinite,
            message: "objective is non-finite at the starting point".to_string(),
        });
    }

    let mut lambda = config.initial_lambda;
    let mut iterations = 0usize;

    loop {
        if iterations >= config.max_iterations {
            return Ok(MinimizeOutcome {
                x,
                value: f0,
                iterations,
                func_evals: evals.get(),
                status: MinimizeStatus::MaxIterations,
                message: format!("maximum iterations ({}) reached", config.max_iterations),
            });
        }

        match newton_step(&counted, &x, f0, &mut lambda, config)? {
            NewtonStep::GradientConverged { gradient_norm } => {
                return Ok(MinimizeOutcome {
                    x,
                    value: f0,
                    iterations,
                    func_evals: evals.get(),
                    status: MinimizeStatus::GradientConverged,
                    message: format!(
                        "gradient convergence: ||g|| = {:.2e} < {:.2e}",
                        gradient_norm, config.gtol
                    ),
                });
            }
            NewtonStep::Exhausted { gradient_norm } => {
                return Ok(MinimizeOutcome {
                    x,
                    value: f0,
                    iterations,
                    func_evals: evals.get(),
                    status: MinimizeStatus::Stalled,
                    message: format!(
                        "no downhill step found (||g|| = {:.2e}, lambda at maximum)",
                        gradient_norm
                    ),
                });
            }
            NewtonStep::Accepted {
                x: x_new,
                value,
                step_norm,
                improvement,
                ..
            } => {
                x = x_new;
                f0 = value;
                iterations += 1;

                if improvement < config.ftol {
                    return Ok(MinimizeOutcome {
                        x,
                        value: f0,
                        iterations,
                        func_evals: evals.get(),
                        status: MinimizeStatus::CostConverged,
                        message: format!(
                            "cost convergence: |df|/|f| = {:.2e} < {:.2e}",
                            improvement, config.ftol
                        ),
                    });
                }
                if step_norm < config.xtol {
                    return Ok(MinimizeOutcome {
                        x,
                        value: f0,
                        iterations,
                        func_evals: evals.get(),
                        status: MinimizeStatus::ParamConverged,
                        message: format!(
                            "parameter convergence: |dx| = {:.2e} < {:.2e}",
                            step_norm, config.xtol
                        ),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // Convex quadratic with minimum at (1, -2)
    fn quadratic(x: &Array1<f64>) -> Result<f64> {
        let a = x[0] - 1.0;
        let b = x[1] + 2.0;
        Ok(a * a + 3.0 * b * b + 0.5 * a * b)
    }

    #[test]
    fn test_minimize_quadratic() {
        let outcome = minimize(&quadratic, array![5.0, 5.0], &FitConfig::default()).unwrap();

        assert!(outcome.status.is_converged(), "{}", outcome.message);
        assert_relative_eq!(outcome.x[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(outcome.x[1], -2.0, epsilon = 1e-4);
        assert!(outcome.func_evals > 0);
    }

    #[test]
    fn test_minimize_rosenbrock() {
        // The banana valley takes many damped steps but converges
        let rosenbrock = |x: &Array1<f64>| -> Result<f64> {
            let a = 1.0 - x[0];
            let b = x[1] - x[0] * x[0];
            Ok(a * a + 100.0 * b * b)
        };

        let config = FitConfig::default().with_strategy(2);
        let outcome = minimize(&rosenbrock, array![-1.2, 1.0], &config).unwrap();

        assert!(outcome.status.is_converged(), "{}", outcome.message);
        assert_relative_eq!(outcome.x[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(outcome.x[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_non_finite_start() {
        let bad = |_: &Array1<f64>| -> Result<f64> { Ok(f64::NAN) };
        let outcome = minimize(&bad, array![0.0], &FitConfig::default()).unwrap();
        assert_eq!(outcome.status, MinimizeStatus::NotFinite);
    }

    #[test]
    fn test_iteration_budget() {
        let config = FitConfig::default().with_max_iterations(1).with_ftol(0.0).with_xtol(0.0);
        let outcome = minimize(&quadratic, array![50.0, 50.0], &config).unwrap();
        assert_eq!(outcome.status, MinimizeStatus::MaxIterations);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_single_newton_step_accepts_downhill() {
        let x = array![5.0, 5.0];
        let f0 = quadratic(&x).unwrap();
        let mut lambda = 1e-3;

        match newton_step(&quadratic, &x, f0, &mut lambda, &FitConfig::default()).unwrap() {
            NewtonStep::Accepted { value, .. } => assert!(value < f0),
            other => panic!("expected an accepted step, got {:?}", other),
        }
    }
}
