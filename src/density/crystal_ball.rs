//! Crystal Ball density.
//!
//! A Gaussian core with a power-law tail, the standard shape for signal
//! peaks with radiative losses:
//!
//! f(x) = exp(-z^2 / 2)                for z > -|alpha|
//!      = A * (B - z)^(-n)             otherwise
//!
//! with z = (x - mean) / sigma (sign-flipped for alpha < 0),
//! A = (n/|alpha|)^n * exp(-alpha^2 / 2) and B = n/|alpha| - |alpha|.
//!
//! The range normalization is done numerically; the tail exponent makes the
//! closed form more trouble than it is worth at this scale.

use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use crate::utils::numeric::simpson;
use rand::Rng;

use super::{sample_envelope, INTEGRATION_PANELS};

/// A Crystal Ball over one observable: `mean`, `sigma`, tail transition
/// `alpha`, and tail order `n`.
#[derive(Debug, Clone)]
pub struct CrystalBall {
    pub(crate) observable: String,
    pub(crate) mean: String,
    pub(crate) sigma: String,
    pub(crate) alpha: String,
    pub(crate) n: String,
}

impl CrystalBall {
    /// Create a Crystal Ball density over `observable` with the named shape
    /// parameters.
    pub fn new(observable: &str, mean: &str, sigma: &str, alpha: &str, n: &str) -> Self {
        Self {
            observable: observable.to_string(),
            mean: mean.to_string(),
            sigma: sigma.to_string(),
            alpha: alpha.to_string(),
            n: n.to_string(),
        }
    }

    fn shape_params(&self, params: &Parameters) -> Result<(f64, f64, f64, f64)> {
        let mean = params.value_of(&self.mean)?;
        let sigma = params.value_of(&self.sigma)?;
        let alpha = params.value_of(&self.alpha)?;
        let n = params.value_of(&self.n)?;

        if sigma <= 0.0 {
            return Err(MlFitError::InvalidParameter(format!(
                "Crystal Ball width '{}' must be positive, got {}",
                self.sigma, sigma
            )));
        }
        if alpha == 0.0 {
            return Err(MlFitError::InvalidParameter(format!(
                "Crystal Ball transition '{}' must be nonzero",
                self.alpha
            )));
        }
        Ok((mean, sigma, alpha, n))
    }

    /// Unnormalized shape value at `x`.
    pub(crate) fn shape_at(&self, params: &Parameters, x: f64) -> Result<f64> {
        let (mean, sigma, alpha, n) = self.shape_params(params)?;

        let z = (x - mean) / sigma;
        // alpha < 0 puts the tail on the high side
        let t = if alpha < 0.0 { -z } else { z };
        let abs_alpha = alpha.abs();

        if t > -abs_alpha {
            Ok((-0.5 * t * t).exp())
        } else {
            let a = (n / abs_alpha).powf(n) * (-0.5 * abs_alpha * abs_alpha).exp();
            let b = n / abs_alpha - abs_alpha;
            Ok(a * (b - t).powf(-n))
        }
    }

    /// Integral of the unnormalized shape over `[lo, hi]` (Simpson).
    pub(crate) fn shape_integral(&self, params: &Parameters, lo: f64, hi: f64) -> Result<f64> {
        // Validate shape parameters once, then integrate the infallible core
        let (mean, sigma, alpha, n) = self.shape_params(params)?;
        let abs_alpha = alpha.abs();
        let a = (n / abs_alpha).powf(n) * (-0.5 * abs_alpha * abs_alpha).exp();
        let b = n / abs_alpha - abs_alpha;

        let shape = |x: f64| {
            let z = (x - mean) / sigma;
            let t = if alpha < 0.0 { -z } else { z };
            if t > -abs_alpha {
                (-0.5 * t * t).exp()
            } else {
                a * (b - t).powf(-n)
            }
        };

        Ok(simpson(shape, lo, hi, INTEGRATION_PANELS))
    }

    /// Draw one value inside `[lo, hi]` by envelope accept-reject.
    pub(crate) fn sample_one<R: Rng + ?Sized>(
        &self,
        params: &Parameters,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> Result<f64> {
        sample_envelope(|x| self.shape_at(params, x), lo, hi, rng)
    }
}
