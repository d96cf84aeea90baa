//! The negative log-likelihood objective.
//!
//! `NLL(theta) = -sum_points ln( density(point; theta) / norm(theta) )`,
//! plus `Y - N ln Y` in extended mode, where `Y` is the total yield of the
//! extended sum.
//!
//! The objective is pure: evaluating it never mutates the parameter registry
//! it is handed, so it can be evaluated repeatedly at caller-chosen points
//! (one-parameter scans, manual exploration) as well as by the fitter. The
//! per-point sum is pure and reentrant, so it can fan out across the rayon
//! pool; that is a speedup, never a semantic change.

use crate::dataset::Dataset;
use crate::density::{Curve, Density, Point};
use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use rayon::prelude::*;

/// Floor applied inside the log so a vanishing density at one point yields a
/// huge-but-finite NLL the minimizer can back away from.
const LOG_FLOOR: f64 = 1e-300;

/// A pure negative log-likelihood over a density and a dataset.
pub struct NllObjective {
    density: Density,
    points: Vec<Point>,
    extended: bool,
    parallel: bool,
}

impl NllObjective {
    /// Build the objective.
    ///
    /// `extended` must be stated explicitly and must agree with the density:
    /// an extended sum requires `extended = true`, anything else requires
    /// `extended = false`.
    pub fn new(density: &Density, dataset: &Dataset, extended: bool) -> Result<Self> {
        if extended && !density.is_extended() {
            return Err(MlFitError::InvalidState(
                "extended likelihood requires an extended Sum density".to_string(),
            ));
        }
        if !extended && density.is_extended() {
            return Err(MlFitError::InvalidState(
                "an extended Sum density requires extended = true".to_string(),
            ));
        }
        if dataset.is_empty() {
            return Err(MlFitError::InvalidParameter(
                "cannot build an NLL over an empty dataset".to_string(),
            ));
        }
        for obs in density.observables() {
            if !dataset.variables().iter().any(|v| v == &obs) {
                return Err(MlFitError::Domain(format!(
                    "dataset has no variable '{}' required by the density",
                    obs
                )));
            }
        }

        Ok(Self {
            density: density.clone(),
            points: dataset.points(),
            extended,
            parallel: true,
        })
    }

    /// Enable or disable parallel evaluation of the per-point sum.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of points in the likelihood.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the likelihood has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the extended term is included.
    pub fn extended(&self) -> bool {
        self.extended
    }

    /// Evaluate the NLL at the registry's current parameter values.
    ///
    /// Pure: `params` is only read. A vanishing density value at some point
    /// produces a large finite NLL rather than an error, so the minimizer
    /// can reject the step and recover.
    pub fn value(&self, params: &Parameters) -> Result<f64> {
        let norm = self.density.normalization(params)?;
        if !(norm > 0.0) || !norm.is_finite() {
            return Ok(f64::INFINITY);
        }

        let chunk_logs = |chunk: &[Point]| -> Result<f64> {
            let values = self.density.evaluate_batch(params, chunk)?;
            Ok(values
                .into_iter()
                .map(|v| (v / norm).max(LOG_FLOOR).ln())
                .sum())
        };

        let log_sum = if self.parallel {
            self.points
                .par_chunks(1024)
                .map(chunk_logs)
                .try_reduce(|| 0.0, |a, b| Ok(a + b))?
        } else {
            chunk_logs(&self.points)?
        };

        let mut nll = -log_sum;

        if self.extended {
            let expected = self.density.expected_events(params)?;
            let expected = expected.max(LOG_FLOOR);
            nll += expected - self.points.len() as f64 * expected.ln();
        }

        Ok(nll)
    }

    /// Scan the NLL along one parameter, holding all others fixed.
    ///
    /// Produces the curve the stop-and-look workflow plots around a minimum.
    /// Scan values outside the parameter's bounds fail with `OutOfBounds`.
    pub fn scan(
        &self,
        params: &Parameters,
        name: &str,
        lo: f64,
        hi: f64,
        resolution: usize,
    ) -> Result<Curve> {
        if hi <= lo {
            return Err(MlFitError::Domain(format!(
                "scan range [{}, {}] has zero or negative width",
                lo, hi
            )));
        }

        let mut working = params.clone();
        let n = resolution.max(2);

        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let x = lo + (hi - lo) * i as f64 / (n - 1) as f64;
            working.set_value(name, x)?;
            points.push((x, self.value(&working)?));
        }
        Ok(Curve { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Density, Parameters, Dataset) {
        let mut params = Parameters::new();
        params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
        params.add_param_with_bounds("mB0", 5.28, 5.1, 5.3).unwrap();
        params
            .add_param_with_bounds("gB0", 0.007, 0.001, 0.02)
            .unwrap();

        let model = density::gaussian("mbc", "mB0", "gB0");
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let data = model.sample(&params, 500, &mut rng).unwrap();
        (model, params, data)
    }

    #[test]
    fn test_value_is_pure() {
        let (model, params, data) = setup();
        let nll = NllObjective::new(&model, &data, false).unwrap();

        let v1 = nll.value(&params).unwrap();
        let v2 = nll.value(&params).unwrap();
        assert_eq!(v1, v2);
        assert!(v1.is_finite());
        assert_eq!(params.value_of("mB0").unwrap(), 5.28);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let (model, params, data) = setup();
        let parallel = NllObjective::new(&model, &data, false).unwrap();
        let serial = NllObjective::new(&model, &data, false)
            .unwrap()
            .with_parallel(false);

        let a = parallel.value(&params).unwrap();
        let b = serial.value(&params).unwrap();
        assert!((a - b).abs() < 1e-9, "parallel {} serial {}", a, b);
    }

    #[test]
    fn test_truth_beats_displaced_parameters() {
        let (model, mut params, data) = setup();
        let nll = NllObjective::new(&model, &data, false).unwrap();

        let at_truth = nll.value(&params).unwrap();
        params.set_value("mB0", 5.15).unwrap();
        let displaced = nll.value(&params).unwrap();
        assert!(at_truth < displaced);
    }

    #[test]
    fn test_extended_flag_must_match_density() {
        let (model, _, data) = setup();
        assert!(NllObjective::new(&model, &data, true).is_err());
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let (model, params, _) = setup();
        let empty = Dataset::from_rows(vec!["mbc".to_string()], vec![], &params).unwrap();
        assert!(NllObjective::new(&model, &empty, false).is_err());
    }

    #[test]
    fn test_scan_has_minimum_near_truth() {
        let (model, params, data) = setup();
        let nll = NllObjective::new(&model, &data, false).unwrap();

        let curve = nll.scan(&params, "mB0", 5.2, 5.3, 51).unwrap();
        assert_eq!(curve.points.len(), 51);

        let (best_x, _) = curve
            .points
            .iter()
            .copied()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        assert!((best_x - 5.28).abs() < 0.01, "scan minimum at {}", best_x);
    }
}
