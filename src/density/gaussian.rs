//! Gaussian density.
//!
//! The workhorse signal shape:
//! f(x) = exp(-(x - mean)^2 / (2 * sigma^2)) / (sigma * sqrt(2 pi))
//!
//! The shape carries its natural full-line normalization, so its integral
//! over a range wide compared to sigma approaches 1; the range integral has
//! a closed form through the error function.

use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use crate::utils::numeric::erf;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::MAX_REJECTION_TRIES;

/// A Gaussian over one observable, defined by `mean` and `sigma` parameters.
#[derive(Debug, Clone)]
pub struct Gaussian {
    pub(crate) observable: String,
    pub(crate) mean: String,
    pub(crate) sigma: String,
}

impl Gaussian {
    /// Create a Gaussian density over `observable` with the named shape
    /// parameters.
    pub fn new(observable: &str, mean: &str, sigma: &str) -> Self {
        Self {
            observable: observable.to_string(),
            mean: mean.to_string(),
            sigma: sigma.to_string(),
        }
    }

    fn shape_params(&self, params: &Parameters) -> Result<(f64, f64)> {
        let mean = params.value_of(&self.mean)?;
        let sigma = params.value_of(&self.sigma)?;
        if sigma <= 0.0 {
            return Err(MlFitError::InvalidParameter(format!(
                "Gaussian width '{}' must be positive, got {}",
                self.sigma, sigma
            )));
        }
        Ok((mean, sigma))
    }

    /// Shape value at `x` (full-line normalized, not range normalized).
    pub(crate) fn shape_at(&self, params: &Parameters, x: f64) -> Result<f64> {
        let (mean, sigma) = self.shape_params(params)?;
        let z = (x - mean) / sigma;
        let norm = sigma * (2.0 * std::f64::consts::PI).sqrt();
        Ok((-0.5 * z * z).exp() / norm)
    }

    /// Integral of the shape over `[lo, hi]`.
    ///
    /// Closed form: `(erf(z_hi) - erf(z_lo)) / 2` with
    /// `z = (x - mean) / (sigma * sqrt(2))`; approaches 1 as the range
    /// grows wide compared to sigma.
    pub(crate) fn shape_integral(&self, params: &Parameters, lo: f64, hi: f64) -> Result<f64> {
        let (mean, sigma) = self.shape_params(params)?;
        let sqrt2 = std::f64::consts::SQRT_2;
        let z_lo = (lo - mean) / (sigma * sqrt2);
        let z_hi = (hi - mean) / (sigma * sqrt2);
        Ok(0.5 * (erf(z_hi) - erf(z_lo)))
    }

    /// Draw one value inside `[lo, hi]`: a Normal draw with range rejection.
    pub(crate) fn sample_one<R: Rng + ?Sized>(
        &self,
        params: &Parameters,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let (mean, sigma) = self.shape_params(params)?;
        let normal = Normal::new(mean, sigma)
            .map_err(|e| MlFitError::Sampling(format!("bad Gaussian shape: {}", e)))?;

        for _ in 0..MAX_REJECTION_TRIES {
            let x = normal.sample(rng);
            if x >= lo && x <= hi {
                return Ok(x);
            }
        }

        Err(MlFitError::Sampling(format!(
            "Gaussian acceptance in [{}, {}] too low (mean {}, sigma {})",
            lo, hi, mean, sigma
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> Parameters {
        let mut p = Parameters::new();
        p.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
        p.add_param("mB0", 5.28);
        p.add_param_with_bounds("gB0", 0.007, 0.0, 0.01).unwrap();
        p
    }

    #[test]
    fn test_shape_peaks_at_mean() {
        let g = Gaussian::new("mbc", "mB0", "gB0");
        let p = params();

        let at_mean = g.shape_at(&p, 5.28).unwrap();
        let expected = 1.0 / (0.007 * (2.0 * std::f64::consts::PI).sqrt());
        assert_relative_eq!(at_mean, expected, max_relative = 1e-12);
        assert!(g.shape_at(&p, 5.28 + 0.007).unwrap() < at_mean);
    }

    #[test]
    fn test_wide_integral_approaches_one() {
        let g = Gaussian::new("mbc", "mB0", "gB0");
        let p = params();

        // Over +/- 10 sigma the integral approaches 1
        let sigma = 0.007;
        let integral = g
            .shape_integral(&p, 5.28 - 10.0 * sigma, 5.28 + 10.0 * sigma)
            .unwrap();
        assert_relative_eq!(integral, 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_nonpositive_sigma_rejected() {
        let g = Gaussian::new("mbc", "mB0", "gB0");
        let mut p = params();
        p.get_mut("gB0").unwrap().set_value(0.0).unwrap();

        assert!(g.shape_at(&p, 5.28).is_err());
    }

    #[test]
    fn test_missing_parameter() {
        let g = Gaussian::new("mbc", "missing", "gB0");
        let p = params();
        assert!(matches!(
            g.shape_at(&p, 5.28),
            Err(MlFitError::ParameterNotFound(_))
        ));
    }
}
