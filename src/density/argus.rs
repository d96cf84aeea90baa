//! ARGUS background density.
//!
//! The phase-space background shape for beam-constrained masses:
//!
//! f(x) = x * sqrt(1 - (x/cutoff)^2) * exp(curvature * (1 - (x/cutoff)^2))
//!
//! for 0 < x < cutoff, and 0 at or beyond the cutoff. The curvature is
//! typically negative. Range normalization is numeric.

use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use crate::utils::numeric::simpson;
use rand::Rng;

use super::{sample_envelope, INTEGRATION_PANELS};

/// An ARGUS shape over one observable: kinematic `cutoff` and `curvature`.
#[derive(Debug, Clone)]
pub struct ArgusBackground {
    pub(crate) observable: String,
    pub(crate) cutoff: String,
    pub(crate) curvature: String,
}

impl ArgusBackground {
    /// Create an ARGUS density over `observable` with the named shape
    /// parameters.
    pub fn new(observable: &str, cutoff: &str, curvature: &str) -> Self {
        Self {
            observable: observable.to_string(),
            cutoff: cutoff.to_string(),
            curvature: curvature.to_string(),
        }
    }

    fn shape_params(&self, params: &Parameters) -> Result<(f64, f64)> {
        let cutoff = params.value_of(&self.cutoff)?;
        let curvature = params.value_of(&self.curvature)?;
        if cutoff <= 0.0 {
            return Err(MlFitError::InvalidParameter(format!(
                "ARGUS cutoff '{}' must be positive, got {}",
                self.cutoff, cutoff
            )));
        }
        Ok((cutoff, curvature))
    }

    /// Unnormalized shape value at `x`.
    ///
    /// Zero outside the kinematic range (x <= 0 or x >= cutoff).
    pub(crate) fn shape_at(&self, params: &Parameters, x: f64) -> Result<f64> {
        let (cutoff, curvature) = self.shape_params(params)?;

        if x <= 0.0 || x >= cutoff {
            return Ok(0.0);
        }

        let u = 1.0 - (x / cutoff).powi(2);
        Ok(x * u.sqrt() * (curvature * u).exp())
    }

    /// Integral of the unnormalized shape over `[lo, hi]` (Simpson).
    pub(crate) fn shape_integral(&self, params: &Parameters, lo: f64, hi: f64) -> Result<f64> {
        let (cutoff, curvature) = self.shape_params(params)?;

        // Clip to the kinematic range; the shape is zero beyond it
        let lo = lo.max(0.0);
        let hi = hi.min(cutoff);
        if hi <= lo {
            return Ok(0.0);
        }

        let shape = |x: f64| {
            let u = 1.0 - (x / cutoff).powi(2);
            if u <= 0.0 {
                0.0
            } else {
                x * u.sqrt() * (curvature * u).exp()
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
