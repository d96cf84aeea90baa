//! Maximum-likelihood fitting.
//!
//! This module provides the NLL objective, the damped-Newton minimizer that
//! drives it, Hessian-based uncertainties, and the fitter that ties them
//! together with in-place parameter update.

pub mod config;
pub mod covariance;
pub mod fitter;
mod minimizer;
pub mod nll;
pub mod result;

pub use config::FitConfig;
pub use covariance::{
    correlation_from_covariance, covariance_from_hessian, standard_errors_from_covariance,
};
pub use fitter::{FitStage, Fitter, StepOutcome};
pub use nll::NllObjective;
pub use result::{FitResult, FitStatus, ParameterSnapshot};
