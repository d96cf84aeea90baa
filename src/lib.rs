//! # mlfit-rs
//!
//! `mlfit-rs` is a batch-mode statistical model-fitting and visualization
//! engine for high-energy-physics-style analyses: unbinned maximum-likelihood
//! (and extended-likelihood) fits of composable probability densities, toy
//! Monte Carlo generation, and histogram/curve plotting to SVG documents.
//!
//! The library provides:
//! - A parameter system with bounds, fixed/floating state, and post-fit errors
//! - A closed density catalog (Gaussian, Crystal Ball, ARGUS background,
//!   exponential, sums, and products) evaluated against a shared parameter
//!   registry
//! - Toy-data generation and bounds-validated CSV datasets
//! - A damped-Newton NLL minimizer with Hessian-based covariance and
//!   correlation, runnable whole or one inspectable step at a time
//! - A plot renderer that projects densities and datasets onto frames
//!
//! ## Basic Usage
//!
//! ```no_run
//! use mlfit_rs::density;
//! use mlfit_rs::fit::Fitter;
//! use mlfit_rs::parameters::Parameters;
//! use rand::SeedableRng;
//!
//! # fn main() -> mlfit_rs::Result<()> {
//! let mut params = Parameters::new();
//! params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3)?;
//! params.add_param_with_bounds("mB0", 5.28, 5.1, 5.3)?;
//! params.add_param_with_bounds("gB0", 0.007, 0.001, 0.02)?;
//!
//! let model = density::gaussian("mbc", "mB0", "gB0");
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
//! let data = model.sample(&params, 1000, &mut rng)?;
//!
//! let mut fitter = Fitter::new();
//! let result = fitter.fit(&model, &data, &mut params, false)?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Density catalog
pub mod density;

// Datasets
pub mod dataset;

// Likelihood fitting
pub mod fit;

// Plot rendering
pub mod plot;

mod utils;

// Re-exports for convenience
pub use dataset::{Dataset, RowPolicy};
pub use density::Density;
pub use error::{MlFitError, Result};
pub use fit::{FitResult, Fitter};
pub use parameters::{Parameter, Parameters};
pub use plot::{PlotRenderer, RenderMode};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
