//! Configuration options for likelihood fits.
//!
//! This module defines the convergence criteria, damping schedule, and
//! strategy presets used by the fitter's damped-Newton minimization.

/// Configuration options for a likelihood fit.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Maximum number of accepted iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative change in the NLL. Default: 1e-9
    pub ftol: f64,

    /// Tolerance for the largest internal parameter step. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for the gradient norm. Default: 1e-3
    ///
    /// The NLL's absolute scale grows with the dataset, and so does the
    /// finite-difference noise floor of its gradient; at this tolerance the
    /// residual parameter displacement is a negligible fraction of a
    /// standard error.
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda on a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda on an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e10
    pub max_lambda: f64,

    /// Whether to evaluate the per-point NLL sum on the rayon pool.
    /// Default: true
    pub parallel: bool,

    /// Strategy preset applied on top of the defaults (0, 1, or 2).
    pub strategy: u8,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-9,
            xtol: 1e-8,
            gtol: 1e-3,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            parallel: true,
            strategy: 1,
        }
    }
}

impl FitConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a strategy preset.
    ///
    /// Strategy 0 is fast and loose, 1 is the default, 2 trades time for a
    /// more careful minimum (tighter tolerances, larger iteration budget).
    /// Values above 2 are treated as 2.
    pub fn with_strategy(mut self, strategy: u8) -> Self {
        self.strategy = strategy.min(2);
        match self.strategy {
            0 => {
                self.max_iterations = 80;
                self.ftol = 1e-7;
                self.gtol = 1e-2;
            }
            1 => {}
            _ => {
                self.max_iterations = 500;
                self.ftol = 1e-11;
                self.gtol = 1e-4;
            }
        }
        self
    }

    /// Set the maximum number of accepted iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative change in the NLL.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    /// Set the tolerance for the largest internal parameter step.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    /// Set the tolerance for the gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.initial_lambda = lambda;
        self
    }

    /// Enable or disable parallel NLL evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
