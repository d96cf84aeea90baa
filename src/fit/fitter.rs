//! The fitter: maximum-likelihood minimization with in-place parameter
//! update.
//!
//! A fit walks the state machine `Unstarted -> Running -> {Converged,
//! Failed, MaxIterationsExceeded}`. The all-in-one [`Fitter::fit`] runs the
//! minimizer to convergence and computes errors; the split
//! [`Fitter::step`] / [`Fitter::compute_errors`] pair exposes the same work
//! one optimizer iteration at a time, so a caller can stop and inspect
//! parameters between iterations.
//!
//! On success the floating parameters' values and standard errors are
//! written back into the registry; fixed parameters are never touched.
//! Numerical failure is reported through `FitResult::converged` and the
//! status code, never as an `Err`.

use crate::dataset::Dataset;
use crate::density::Density;
use crate::error::{MlFitError, Result};
use crate::fit::config::FitConfig;
use crate::fit::covariance::{
    correlation_from_covariance, covariance_from_hessian, standard_errors_from_covariance,
};
use crate::fit::minimizer::{self, MinimizeStatus, NewtonStep};
use crate::fit::nll::NllObjective;
use crate::fit::result::{FitResult, FitStatus, ParameterSnapshot};
use crate::parameters::Parameters;
use crate::utils::finite_difference;
use ndarray::{Array1, Array2};
use std::cell::{Cell, RefCell};

/// Lifecycle of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    /// No fit has been started.
    Unstarted,

    /// A fit (or manual stepping) is in progress.
    Running,

    /// The last fit converged.
    Converged,

    /// The last fit failed numerically.
    Failed,

    /// The last fit ran out of its iteration budget.
    MaxIterationsExceeded,
}

/// Outcome of one manual optimizer iteration.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Whether a downhill step was taken (parameters were updated).
    pub accepted: bool,

    /// NLL at the current (possibly updated) parameter values.
    pub nll: f64,

    /// Gradient norm at the point the step started from.
    pub gradient_norm: f64,

    /// Whether the minimum has been reached: the gradient is below
    /// tolerance, or the last step no longer improves the NLL.
    pub converged: bool,
}

/// Maximum-likelihood fitter.
#[derive(Debug)]
pub struct Fitter {
    config: FitConfig,
    stage: FitStage,
    lambda: f64,
}

impl Default for Fitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fitter {
    /// Create a fitter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FitConfig::default())
    }

    /// Create a fitter with the given configuration.
    pub fn with_config(config: FitConfig) -> Self {
        let lambda = config.initial_lambda;
        Self {
            config,
            stage: FitStage::Unstarted,
            lambda,
        }
    }

    /// The fitter's current lifecycle stage.
    pub fn stage(&self) -> FitStage {
        self.stage
    }

    /// The configuration in use.
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Build the pure NLL objective for external use (scans, manual
    /// minimization).
    pub fn create_nll(
        &self,
        density: &Density,
        dataset: &Dataset,
        extended: bool,
    ) -> Result<NllObjective> {
        Ok(NllObjective::new(density, dataset, extended)?.with_parallel(self.config.parallel))
    }

    /// Fit the density to the dataset, mutating the floating parameters in
    /// place.
    ///
    /// Returns `Err` only for structural problems (unregistered parameters,
    /// empty dataset, no floating parameters, extended-mode mismatch).
    /// Numerical failures come back as a `FitResult` with
    /// `converged = false` and a nonzero status code.
    pub fn fit(
        &mut self,
        density: &Density,
        dataset: &Dataset,
        params: &mut Parameters,
        extended: bool,
    ) -> Result<FitResult> {
        density.validate(params)?;
        let nll = self.create_nll(density, dataset, extended)?;

        let float_names = params.varying_names();
        if float_names.is_empty() {
            return Err(MlFitError::InvalidParameter(
                "no floating parameters to fit".to_string(),
            ));
        }

        self.stage = FitStage::Running;
        self.lambda = self.config.initial_lambda;

        let objective = internal_objective(&nll, params);
        let x0 = Array1::from(params.varying_internal_values()?);
        let outcome = minimizer::minimize(&objective, x0, &self.config)?;

        params.update_from_internal(&outcome.x.to_vec())?;

        let n = float_names.len();
        let mut snapshots = snapshot_floating(params);

        if !outcome.status.is_converged() {
            let status = match outcome.status {
                MinimizeStatus::MaxIterations => FitStatus::MaxIterationsExceeded,
                MinimizeStatus::NotFinite => FitStatus::NotFinite,
                _ => FitStatus::Stalled,
            };
            self.stage = if status == FitStatus::MaxIterationsExceeded {
                FitStage::MaxIterationsExceeded
            } else {
                FitStage::Failed
            };
            return Ok(FitResult {
                parameters: snapshots,
                covariance: Array2::zeros((n, n)),
                correlation: Array2::zeros((n, n)),
                nll: outcome.value,
                converged: false,
                status,
                iterations: outcome.iterations,
                func_evals: outcome.func_evals,
            });
        }

        match error_matrices(&nll, params) {
            Ok((covariance, correlation, hessian_evals)) => {
                let errors = standard_errors_from_covariance(&covariance);
                apply_errors(params, &mut snapshots, &errors);
                self.stage = FitStage::Converged;
                Ok(FitResult {
                    parameters: snapshots,
                    covariance,
                    correlation,
                    nll: outcome.value,
                    converged: true,
                    status: FitStatus::Converged,
                    iterations: outcome.iterations,
                    func_evals: outcome.func_evals + hessian_evals,
                })
            }
            Err(MlFitError::SingularMatrix) => {
                self.stage = FitStage::Failed;
                Ok(FitResult {
                    parameters: snapshots,
                    covariance: Array2::zeros((n, n)),
                    correlation: Array2::zeros((n, n)),
                    nll: outcome.value,
                    converged: false,
                    status: FitStatus::SingularHessian,
                    iterations: outcome.iterations,
                    func_evals: outcome.func_evals,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Take exactly one damped-Newton iteration from the current parameter
    /// values, updating them in place if a downhill step is found.
    ///
    /// Build `nll` once with [`Fitter::create_nll`] and call this in a loop;
    /// the fitter keeps its damping state between calls.
    pub fn step(&mut self, nll: &NllObjective, params: &mut Parameters) -> Result<StepOutcome> {
        let x = Array1::from(params.varying_internal_values()?);
        if x.is_empty() {
            return Err(MlFitError::InvalidParameter(
                "no floating parameters to fit".to_string(),
            ));
        }

        let objective = internal_objective(nll, params);
        let f0 = objective(&x)?;
        if !f0.is_finite() {
            return Err(MlFitError::ConvergenceFailure(
                "objective is non-finite at the current parameter values".to_string(),
            ));
        }

        self.stage = FitStage::Running;
        let step = minimizer::newton_step(&objective, &x, f0, &mut self.lambda, &self.config)?;

        match step {
            NewtonStep::Accepted {
                x: x_new,
                value,
                gradient_norm,
                improvement,
                ..
            } => {
                params.update_from_internal(&x_new.to_vec())?;
                Ok(StepOutcome {
                    accepted: true,
                    nll: value,
                    gradient_norm,
                    // A step that no longer improves the NLL is as converged
                    // as a vanishing gradient
                    converged: improvement < self.config.ftol,
                })
            }
            NewtonStep::GradientConverged { gradient_norm } => Ok(StepOutcome {
                accepted: false,
                nll: f0,
                gradient_norm,
                converged: true,
            }),
            NewtonStep::Exhausted { gradient_norm } => Ok(StepOutcome {
                accepted: false,
                nll: f0,
                gradient_norm,
                converged: false,
            }),
        }
    }

    /// Compute the Hessian, covariance, and per-parameter errors at the
    /// current parameter values, without moving them.
    ///
    /// The HESSE analog for the stop-and-look workflow: run [`Fitter::step`]
    /// until `converged`, then call this once.
    pub fn compute_errors(
        &mut self,
        nll: &NllObjective,
        params: &mut Parameters,
    ) -> Result<FitResult> {
        let float_names = params.varying_names();
        if float_names.is_empty() {
            return Err(MlFitError::InvalidParameter(
                "no floating parameters".to_string(),
            ));
        }
        let n = float_names.len();

        let value = nll.value(params)?;
        let mut snapshots = snapshot_floating(params);

        match error_matrices(nll, params) {
            Ok((covariance, correlation, func_evals)) => {
                let errors = standard_errors_from_covariance(&covariance);
                apply_errors(params, &mut snapshots, &errors);
                self.stage = FitStage::Converged;
                Ok(FitResult {
                    parameters: snapshots,
                    covariance,
                    correlation,
                    nll: value,
                    converged: true,
                    status: FitStatus::Converged,
                    iterations: 0,
                    func_evals,
                })
            }
            Err(MlFitError::SingularMatrix) => {
                self.stage = FitStage::Failed;
                Ok(FitResult {
                    parameters: snapshots,
                    covariance: Array2::zeros((n, n)),
                    correlation: Array2::zeros((n, n)),
                    nll: value,
                    converged: false,
                    status: FitStatus::SingularHessian,
                    iterations: 0,
                    func_evals: 0,
                })
            }
            Err(other) => Err(other),
        }
    }
}

/// The NLL as a function of the internal coordinates of the floating
/// parameters, working on a private copy of the registry.
fn internal_objective<'a>(
    nll: &'a NllObjective,
    params: &Parameters,
) -> impl Fn(&Array1<f64>) -> Result<f64> + 'a {
    let working = RefCell::new(params.clone());
    move |x: &Array1<f64>| {
        let mut w = working.borrow_mut();
        w.update_from_internal(&x.to_vec())?;
        nll.value(&w)
    }
}

/// Hessian of the NLL in external coordinates at the current values, turned
/// into covariance and correlation matrices.
///
/// Finite-difference probes that would leave a parameter's bounds are
/// clamped to the bound.
fn error_matrices(
    nll: &NllObjective,
    params: &Parameters,
) -> Result<(Array2<f64>, Array2<f64>, usize)> {
    let names = params.varying_names();
    let x0 = Array1::from(
        names
            .iter()
            .map(|n| params.value_of(n).map_err(MlFitError::from))
            .collect::<Result<Vec<f64>>>()?,
    );

    let evals = Cell::new(0usize);
    let working = RefCell::new(params.clone());
    let f = |x: &Array1<f64>| -> Result<f64> {
        evals.set(evals.get() + 1);
        let mut w = working.borrow_mut();
        for (name, &v) in names.iter().zip(x.iter()) {
            let p = w.get_mut(name).expect("name came from registry");
            let clamped = p.bounds().clamp(v);
            p.set_value(clamped).map_err(MlFitError::from)?;
        }
        nll.value(&w)
    };

    let hessian = finite_difference::hessian(f, &x0, None)?;
    let covariance = covariance_from_hessian(&hessian)?;
    let correlation = correlation_from_covariance(&covariance);
    Ok((covariance, correlation, evals.get()))
}

fn snapshot_floating(params: &Parameters) -> Vec<ParameterSnapshot> {
    params
        .varying()
        .iter()
        .map(|p| ParameterSnapshot {
            name: p.name().to_string(),
            value: p.value(),
            stderr: None,
        })
        .collect()
}

fn apply_errors(
    params: &mut Parameters,
    snapshots: &mut [ParameterSnapshot],
    errors: &Array1<f64>,
) {
    for (snapshot, &err) in snapshots.iter_mut().zip(errors.iter()) {
        snapshot.stderr = Some(err);
        if let Some(p) = params.get_mut(&snapshot.name) {
            p.set_stderr(Some(err));
        }
    }
}
