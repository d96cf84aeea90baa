//! Immutable fit results.
//!
//! A `FitResult` is created once per fit (or per error computation) and is
//! never mutated afterwards. Numerical failure is part of the result, not an
//! error: check `converged` and `status` before trusting the values.

use ndarray::Array2;
use serde_json::json;
use std::fmt;

/// A frozen view of one floating parameter after a fit.
#[derive(Debug, Clone)]
pub struct ParameterSnapshot {
    /// Parameter name.
    pub name: String,

    /// Fitted value.
    pub value: f64,

    /// Standard error, when the Hessian inverted cleanly.
    pub stderr: Option<f64>,
}

/// Why a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The minimizer converged and the Hessian inverted.
    Converged,

    /// The Hessian at the minimum was singular; no errors available.
    SingularHessian,

    /// The accepted-iteration budget ran out before convergence.
    MaxIterationsExceeded,

    /// No downhill step could be found (damping at its ceiling).
    Stalled,

    /// The objective was non-finite at the starting point.
    NotFinite,
}

impl FitStatus {
    /// The numeric status code (0 on success).
    pub fn code(self) -> i32 {
        match self {
            FitStatus::Converged => 0,
            FitStatus::SingularHessian => 1,
            FitStatus::MaxIterationsExceeded => 2,
            FitStatus::Stalled => 3,
            FitStatus::NotFinite => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FitStatus::Converged => "converged",
            FitStatus::SingularHessian => "singular Hessian",
            FitStatus::MaxIterationsExceeded => "max iterations exceeded",
            FitStatus::Stalled => "stalled",
            FitStatus::NotFinite => "non-finite objective",
        }
    }
}

/// The outcome of one fit: parameter snapshots, uncertainty matrices, and
/// the minimized NLL.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Floating parameters in registry order (the matrix row/column order).
    pub parameters: Vec<ParameterSnapshot>,

    /// Covariance matrix of the floating parameters.
    pub covariance: Array2<f64>,

    /// Correlation matrix of the floating parameters; unit diagonal.
    pub correlation: Array2<f64>,

    /// NLL at the reported parameter values.
    pub nll: f64,

    /// Whether the fit can be trusted.
    pub converged: bool,

    /// Why the fit ended.
    pub status: FitStatus,

    /// Accepted minimizer iterations.
    pub iterations: usize,

    /// Objective evaluations spent.
    pub func_evals: usize,
}

impl FitResult {
    /// Look up one parameter snapshot by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSnapshot> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The correlation between two named floating parameters.
    pub fn correlation_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.parameters.iter().position(|p| p.name == a)?;
        let j = self.parameters.iter().position(|p| p.name == b)?;
        Some(self.correlation[[i, j]])
    }

    /// Export the result as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        let matrix_rows = |m: &Array2<f64>| -> Vec<Vec<f64>> {
            (0..m.nrows()).map(|i| m.row(i).to_vec()).collect()
        };

        json!({
            "converged": self.converged,
            "status": self.status.label(),
            "status_code": self.status.code(),
            "nll": self.nll,
            "iterations": self.iterations,
            "func_evals": self.func_evals,
            "parameters": self.parameters.iter().map(|p| {
                json!({
                    "name": p.name,
                    "value": p.value,
                    "stderr": p.stderr,
                })
            }).collect::<Vec<_>>(),
            "covariance": matrix_rows(&self.covariance),
            "correlation": matrix_rows(&self.correlation),
        })
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit result:")?;
        writeln!(f, "  Converged: {}", self.converged)?;
        writeln!(
            f,
            "  Status: {} (code {})",
            self.status.label(),
            self.status.code()
        )?;
        writeln!(f, "  NLL at minimum: {:.6}", self.nll)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters:")?;
        for p in &self.parameters {
            match p.stderr {
                Some(err) => writeln!(f, "    {} = {:.6} +/- {:.6}", p.name, p.value, err)?,
                None => writeln!(f, "    {} = {:.6}", p.name, p.value)?,
            }
        }
        Ok(())
    }
}
