//! Exponential density.
//!
//! f(x) = exp(slope * x)
//!
//! A negative slope gives the usual falling background. Both the range
//! integral and the truncated inverse CDF have closed forms, so sampling
//! needs no rejection loop.

use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use rand::Rng;

/// Slopes closer to zero than this are treated as a flat density.
const FLAT_SLOPE_EPS: f64 = 1e-12;

/// An exponential over one observable, defined by a `slope` parameter.
#[derive(Debug, Clone)]
pub struct Exponential {
    pub(crate) observable: String,
    pub(crate) slope: String,
}

impl Exponential {
    /// Create an exponential density over `observable` with the named slope
    /// parameter.
    pub fn new(observable: &str, slope: &str) -> Self {
        Self {
            observable: observable.to_string(),
            slope: slope.to_string(),
        }
    }

    /// Unnormalized shape value at `x`.
    pub(crate) fn shape_at(&self, params: &Parameters, x: f64) -> Result<f64> {
        let slope = params.value_of(&self.slope)?;
        Ok((slope * x).exp())
    }

    /// Integral of the unnormalized shape over `[lo, hi]`.
    pub(crate) fn shape_integral(&self, params: &Parameters, lo: f64, hi: f64) -> Result<f64> {
        let slope = params.value_of(&self.slope)?;
        if slope.abs() < FLAT_SLOPE_EPS {
            return Ok(hi - lo);
        }
        Ok(((slope * hi).exp() - (slope * lo).exp()) / slope)
    }

    /// Draw one value inside `[lo, hi]` by the truncated inverse CDF.
    ///
    /// With `u` uniform in [0, 1):
    /// `x = lo + ln(1 + u * (exp(k * (hi - lo)) - 1)) / k`
    pub(crate) fn sample_one<R: Rng + ?Sized>(
        &self,
        params: &Parameters,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let slope = params.value_of(&self.slope)?;
        let u: f64 = rng.gen();

        if slope.abs() < FLAT_SLOPE_EPS {
            return Ok(lo + u * (hi - lo));
        }

        let span = (slope * (hi - lo)).exp() - 1.0;
        let x = lo + (1.0 + u * span).ln() / slope;
        if !x.is_finite() {
            return Err(MlFitError::Sampling(format!(
                "exponential inverse CDF overflowed for slope {} on [{}, {}]",
                slope, lo, hi
            )));
        }
        // Guard the interval edges against rounding
        Ok(x.clamp(lo, hi))
    }
}
