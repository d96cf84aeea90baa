//! Probability densities over named observables.
//!
//! The catalog is a closed set of variants: four primitive shapes plus sum
//! and product composition. A density never owns parameter values; it names
//! its observable(s) and shape parameters and reads them from a
//! [`Parameters`] registry at evaluation time, so a fitted parameter moves
//! for every density that references it.
//!
//! The observable's declared bounds define the normalization range: an
//! observable must be registered with finite bounds before a density over it
//! can be normalized, sampled, or projected.

pub mod argus;
pub mod composite;
pub mod crystal_ball;
pub mod exponential;
pub mod gaussian;

pub use argus::ArgusBackground;
pub use composite::{Product, Sum, SumCoefficients};
pub use crystal_ball::CrystalBall;
pub use exponential::Exponential;
pub use gaussian::Gaussian;

use crate::dataset::Dataset;
use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use rand::Rng;
use std::collections::HashMap;

/// A point assignment: one value per observable name.
pub type Point = HashMap<String, f64>;

/// Panels used for the numeric range integrals.
pub(crate) const INTEGRATION_PANELS: usize = 512;

/// Cap on accept-reject attempts per drawn value.
pub(crate) const MAX_REJECTION_TRIES: usize = 10_000;

/// Grid points scanned to bound a shape for envelope sampling.
const ENVELOPE_SCAN_POINTS: usize = 128;

/// Headroom over the scanned maximum; covers peaks between grid points.
const ENVELOPE_MARGIN: f64 = 1.3;

/// Read a named observable out of a point assignment.
pub fn point_value(point: &Point, name: &str) -> Result<f64> {
    point.get(name).copied().ok_or_else(|| {
        MlFitError::Domain(format!("point assignment has no value for '{}'", name))
    })
}

/// Accept-reject sampling under a flat envelope.
///
/// The shape maximum is bounded by a grid scan with headroom; shapes with a
/// vanishing maximum or pathological acceptance fail with `Sampling`.
pub(crate) fn sample_envelope<F, R>(shape: F, lo: f64, hi: f64, rng: &mut R) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
    R: Rng + ?Sized,
{
    let mut max = 0.0f64;
    for i in 0..=ENVELOPE_SCAN_POINTS {
        let x = lo + (hi - lo) * i as f64 / ENVELOPE_SCAN_POINTS as f64;
        max = max.max(shape(x)?);
    }
    if max <= 0.0 || !max.is_finite() {
        return Err(MlFitError::Sampling(format!(
            "shape has no positive maximum on [{}, {}]",
            lo, hi
        )));
    }
    let ceiling = max * ENVELOPE_MARGIN;

    for _ in 0..MAX_REJECTION_TRIES {
        let x = lo + (hi - lo) * rng.gen::<f64>();
        let u = ceiling * rng.gen::<f64>();
        if u <= shape(x)? {
            return Ok(x);
        }
    }

    Err(MlFitError::Sampling(format!(
        "envelope acceptance on [{}, {}] too low",
        lo, hi
    )))
}

/// A sampled 1D curve, ready for plotting.
#[derive(Debug, Clone)]
pub struct Curve {
    /// (x, y) pairs in ascending x order.
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    /// Smallest and largest y values on the curve.
    pub fn y_range(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &(_, y) in &self.points {
            lo = lo.min(y);
            hi = hi.max(y);
        }
        (lo, hi)
    }
}

/// A probability density over one or more named observables.
///
/// Structure is immutable after construction; only the referenced parameter
/// values change between evaluations.
#[derive(Debug, Clone)]
pub enum Density {
    Gaussian(Gaussian),
    CrystalBall(CrystalBall),
    ArgusBackground(ArgusBackground),
    Exponential(Exponential),
    Sum(Sum),
    Product(Product),
}

/// Create a Gaussian density over `observable`.
pub fn gaussian(observable: &str, mean: &str, sigma: &str) -> Density {
    Density::Gaussian(Gaussian::new(observable, mean, sigma))
}

/// Create a Crystal Ball density over `observable`.
pub fn crystal_ball(observable: &str, mean: &str, sigma: &str, alpha: &str, n: &str) -> Density {
    Density::CrystalBall(CrystalBall::new(observable, mean, sigma, alpha, n))
}

/// Create an ARGUS background density over `observable`.
pub fn argus(observable: &str, cutoff: &str, curvature: &str) -> Density {
    Density::ArgusBackground(ArgusBackground::new(observable, cutoff, curvature))
}

/// Create an exponential density over `observable`.
pub fn exponential(observable: &str, slope: &str) -> Density {
    Density::Exponential(Exponential::new(observable, slope))
}

impl From<Sum> for Density {
    fn from(sum: Sum) -> Self {
        Density::Sum(sum)
    }
}

impl From<Product> for Density {
    fn from(product: Product) -> Self {
        Density::Product(product)
    }
}

/// The declared (finite) range of an observable parameter.
pub(crate) fn observable_range(params: &Parameters, name: &str) -> Result<(f64, f64)> {
    let param = params
        .get(name)
        .ok_or_else(|| MlFitError::ParameterNotFound(name.to_string()))?;
    let bounds = param.bounds();
    if !bounds.is_finite() {
        return Err(MlFitError::Domain(format!(
            "observable '{}' must have finite bounds",
            name
        )));
    }
    if bounds.width() <= 0.0 {
        return Err(MlFitError::Domain(format!(
            "observable '{}' has a zero-width range",
            name
        )));
    }
    Ok((bounds.min, bounds.max))
}

impl Density {
    /// The observable names this density is defined over, without duplicates,
    /// in declaration order.
    pub fn observables(&self) -> Vec<String> {
        match self {
            Density::Gaussian(g) => vec![g.observable.clone()],
            Density::CrystalBall(cb) => vec![cb.observable.clone()],
            Density::ArgusBackground(a) => vec![a.observable.clone()],
            Density::Exponential(e) => vec![e.observable.clone()],
            Density::Sum(s) => s.components[0].observables(),
            Density::Product(p) => {
                let mut obs = Vec::new();
                for factor in &p.factors {
                    for o in factor.observables() {
                        if !obs.contains(&o) {
                            obs.push(o);
                        }
                    }
                }
                obs
            }
        }
    }

    /// The shape and coefficient parameter names, without duplicates.
    pub fn parameter_names(&self) -> Vec<String> {
        fn push_unique(list: &mut Vec<String>, name: &str) {
            if !list.iter().any(|n| n == name) {
                list.push(name.to_string());
            }
        }

        let mut names = Vec::new();
        match self {
            Density::Gaussian(g) => {
                push_unique(&mut names, &g.mean);
                push_unique(&mut names, &g.sigma);
            }
            Density::CrystalBall(cb) => {
                push_unique(&mut names, &cb.mean);
                push_unique(&mut names, &cb.sigma);
                push_unique(&mut names, &cb.alpha);
                push_unique(&mut names, &cb.n);
            }
            Density::ArgusBackground(a) => {
                push_unique(&mut names, &a.cutoff);
                push_unique(&mut names, &a.curvature);
            }
            Density::Exponential(e) => {
                push_unique(&mut names, &e.slope);
            }
            Density::Sum(s) => {
                for comp in &s.components {
                    for n in comp.parameter_names() {
                        push_unique(&mut names, &n);
                    }
                }
                for n in s.coefficient_names() {
                    push_unique(&mut names, n);
                }
            }
            Density::Product(p) => {
                for factor in &p.factors {
                    for n in factor.parameter_names() {
                        push_unique(&mut names, &n);
                    }
                }
            }
        }
        names
    }

    /// Check that every referenced parameter is registered and that every
    /// observable has a usable finite range.
    pub fn validate(&self, params: &Parameters) -> Result<()> {
        for obs in self.observables() {
            observable_range(params, &obs)?;
        }
        for name in self.parameter_names() {
            params.value_of(&name)?;
        }
        Ok(())
    }

    /// Evaluate the density at a point assignment.
    ///
    /// Primitives return their natural shape value (not range normalized);
    /// a `Sum` mixes its components normalized over the observables'
    /// declared ranges, weighted by fractions or yields; a `Product`
    /// multiplies its factors. A missing observable fails with `Domain`.
    pub fn evaluate(&self, params: &Parameters, point: &Point) -> Result<f64> {
        match self {
            Density::Gaussian(g) => g.shape_at(params, point_value(point, &g.observable)?),
            Density::CrystalBall(cb) => cb.shape_at(params, point_value(point, &cb.observable)?),
            Density::ArgusBackground(a) => a.shape_at(params, point_value(point, &a.observable)?),
            Density::Exponential(e) => e.shape_at(params, point_value(point, &e.observable)?),
            Density::Sum(s) => {
                let weights = s.weights(params)?;
                let mut value = 0.0;
                for (comp, w) in s.components.iter().zip(weights.iter()) {
                    if *w == 0.0 {
                        continue;
                    }
                    let norm = comp.normalization(params)?;
                    if norm <= 0.0 {
                        return Err(MlFitError::Domain(
                            "Sum component has a non-positive normalization".to_string(),
                        ));
                    }
                    value += w * comp.evaluate(params, point)? / norm;
                }
                Ok(value)
            }
            Density::Product(p) => {
                let mut value = 1.0;
                for factor in &p.factors {
                    value *= factor.evaluate(params, point)?;
                }
                Ok(value)
            }
        }
    }

    /// The normalization constant: the integral of [`evaluate`] over the
    /// declared range of every observable.
    ///
    /// [`evaluate`]: Density::evaluate
    pub fn normalization(&self, params: &Parameters) -> Result<f64> {
        match self {
            Density::Gaussian(g) => {
                let (lo, hi) = observable_range(params, &g.observable)?;
                g.shape_integral(params, lo, hi)
            }
            Density::CrystalBall(cb) => {
                let (lo, hi) = observable_range(params, &cb.observable)?;
                cb.shape_integral(params, lo, hi)
            }
            Density::ArgusBackground(a) => {
                let (lo, hi) = observable_range(params, &a.observable)?;
                a.shape_integral(params, lo, hi)
            }
            Density::Exponential(e) => {
                let (lo, hi) = observable_range(params, &e.observable)?;
                e.shape_integral(params, lo, hi)
            }
            Density::Sum(s) => s.total_weight(params),
            Density::Product(p) => {
                let mut norm = 1.0;
                for factor in &p.factors {
                    norm *= factor.normalization(params)?;
                }
                Ok(norm)
            }
        }
    }

    /// Integral of the density over `[lo, hi]` in `observable`, with any
    /// other observables integrated over their full declared ranges.
    ///
    /// A zero-width or inverted range fails with `Domain`.
    pub fn integral(&self, params: &Parameters, observable: &str, lo: f64, hi: f64) -> Result<f64> {
        if hi <= lo {
            return Err(MlFitError::Domain(format!(
                "integration range [{}, {}] has zero or negative width",
                lo, hi
            )));
        }

        match self {
            Density::Gaussian(g) => {
                self.check_observable(&g.observable, observable)?;
                g.shape_integral(params, lo, hi)
            }
            Density::CrystalBall(cb) => {
                self.check_observable(&cb.observable, observable)?;
                cb.shape_integral(params, lo, hi)
            }
            Density::ArgusBackground(a) => {
                self.check_observable(&a.observable, observable)?;
                a.shape_integral(params, lo, hi)
            }
            Density::Exponential(e) => {
                self.check_observable(&e.observable, observable)?;
                e.shape_integral(params, lo, hi)
            }
            Density::Sum(s) => {
                let weights = s.weights(params)?;
                let mut total = 0.0;
                for (comp, w) in s.components.iter().zip(weights.iter()) {
                    if *w == 0.0 {
                        continue;
                    }
                    let norm = comp.normalization(params)?;
                    total += w * comp.integral(params, observable, lo, hi)? / norm;
                }
                Ok(total)
            }
            Density::Product(p) => {
                let mut value = p.factor_for(observable)?.integral(params, observable, lo, hi)?;
                for factor in &p.factors {
                    if !factor.observables().iter().any(|o| o == observable) {
                        value *= factor.normalization(params)?;
                    }
                }
                Ok(value)
            }
        }
    }

    /// Evaluate the density at many points with the parameter-dependent
    /// factors (component normalizations, weights) computed once.
    ///
    /// Semantically identical to mapping [`evaluate`] over `points`; this is
    /// the path the likelihood uses, where a `Sum` over numerically
    /// normalized components would otherwise re-integrate per point.
    ///
    /// [`evaluate`]: Density::evaluate
    pub fn evaluate_batch(&self, params: &Parameters, points: &[Point]) -> Result<Vec<f64>> {
        match self {
            Density::Sum(s) => {
                let weights = s.weights(params)?;
                let mut totals = vec![0.0; points.len()];
                for (comp, w) in s.components.iter().zip(weights.iter()) {
                    if *w == 0.0 {
                        continue;
                    }
                    let norm = comp.normalization(params)?;
                    if norm <= 0.0 {
                        return Err(MlFitError::Domain(
                            "Sum component has a non-positive normalization".to_string(),
                        ));
                    }
                    let values = comp.evaluate_batch(params, points)?;
                    for (total, v) in totals.iter_mut().zip(values) {
                        *total += w * v / norm;
                    }
                }
                Ok(totals)
            }
            Density::Product(p) => {
                let mut totals = vec![1.0; points.len()];
                for factor in &p.factors {
                    let values = factor.evaluate_batch(params, points)?;
                    for (total, v) in totals.iter_mut().zip(values) {
                        *total *= v;
                    }
                }
                Ok(totals)
            }
            _ => points
                .iter()
                .map(|point| self.evaluate(params, point))
                .collect(),
        }
    }

    fn check_observable(&self, own: &str, requested: &str) -> Result<()> {
        if own != requested {
            return Err(MlFitError::Domain(format!(
                "density is defined over '{}', not '{}'",
                own, requested
            )));
        }
        Ok(())
    }

    /// The range-normalized 1D marginal density at `x` in `observable`.
    pub fn marginal_at(&self, params: &Parameters, observable: &str, x: f64) -> Result<f64> {
        match self {
            Density::Sum(s) => {
                let weights = s.weights(params)?;
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return Err(MlFitError::Domain(
                        "Sum has zero total weight".to_string(),
                    ));
                }
                let mut value = 0.0;
                for (comp, w) in s.components.iter().zip(weights.iter()) {
                    if *w == 0.0 {
                        continue;
                    }
                    value += w / total * comp.marginal_at(params, observable, x)?;
                }
                Ok(value)
            }
            Density::Product(p) => p.factor_for(observable)?.marginal_at(params, observable, x),
            _ => {
                let point: Point = [(observable.to_string(), x)].into_iter().collect();
                let value = self.evaluate(params, &point)?;
                let norm = self.normalization(params)?;
                if norm <= 0.0 {
                    return Err(MlFitError::Domain(
                        "density has a non-positive normalization".to_string(),
                    ));
                }
                Ok(value / norm)
            }
        }
    }

    /// Sample the 1D marginal over `observable` at `resolution` evenly
    /// spaced points across its declared range, as a plottable curve.
    ///
    /// The curve is normalized: its area over the range is 1.
    pub fn project(
        &self,
        params: &Parameters,
        observable: &str,
        resolution: usize,
    ) -> Result<Curve> {
        let (lo, hi) = observable_range(params, observable)?;
        let n = resolution.max(2);

        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let x = lo + (hi - lo) * i as f64 / (n - 1) as f64;
            points.push((x, self.marginal_at(params, observable, x)?));
        }
        Ok(Curve { points })
    }

    /// Draw one point assignment covering all observables.
    pub fn sample_point<R: Rng + ?Sized>(
        &self,
        params: &Parameters,
        rng: &mut R,
    ) -> Result<Point> {
        match self {
            Density::Gaussian(g) => {
                let (lo, hi) = observable_range(params, &g.observable)?;
                let x = g.sample_one(params, lo, hi, rng)?;
                Ok([(g.observable.clone(), x)].into_iter().collect())
            }
            Density::CrystalBall(cb) => {
                let (lo, hi) = observable_range(params, &cb.observable)?;
                let x = cb.sample_one(params, lo, hi, rng)?;
                Ok([(cb.observable.clone(), x)].into_iter().collect())
            }
            Density::ArgusBackground(a) => {
                let (lo, hi) = observable_range(params, &a.observable)?;
                let x = a.sample_one(params, lo, hi, rng)?;
                Ok([(a.observable.clone(), x)].into_iter().collect())
            }
            Density::Exponential(e) => {
                let (lo, hi) = observable_range(params, &e.observable)?;
                let x = e.sample_one(params, lo, hi, rng)?;
                Ok([(e.observable.clone(), x)].into_iter().collect())
            }
            Density::Sum(s) => {
                // Pick a component proportional to its weight, then delegate
                let weights = s.weights(params)?;
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return Err(MlFitError::Sampling(
                        "Sum has zero total weight".to_string(),
                    ));
                }
                let mut pick = rng.gen::<f64>() * total;
                for (comp, w) in s.components.iter().zip(weights.iter()) {
                    pick -= w;
                    if pick <= 0.0 {
                        return comp.sample_point(params, rng);
                    }
                }
                // Rounding pushed the pick past the end; use the last component
                s.components
                    .last()
                    .expect("Sum has components")
                    .sample_point(params, rng)
            }
            Density::Product(p) => {
                let mut point = Point::new();
                for factor in &p.factors {
                    point.extend(factor.sample_point(params, rng)?);
                }
                Ok(point)
            }
        }
    }

    /// Generate a toy dataset of `n` independent points.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        params: &Parameters,
        n: usize,
        rng: &mut R,
    ) -> Result<Dataset> {
        self.validate(params)?;

        let variables = self.observables();
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            let point = self.sample_point(params, rng)?;
            let row: Result<Vec<f64>> =
                variables.iter().map(|v| point_value(&point, v)).collect();
            rows.push(row?);
        }

        Dataset::from_rows(variables, rows, params)
    }

    /// Whether this density models an absolute event count (an extended sum).
    pub fn is_extended(&self) -> bool {
        matches!(self, Density::Sum(s) if s.is_extended())
    }

    /// Total expected event count of an extended sum.
    ///
    /// Fails with `InvalidState` for any other density.
    pub fn expected_events(&self, params: &Parameters) -> Result<f64> {
        match self {
            Density::Sum(s) if s.is_extended() => s.total_weight(params),
            _ => Err(MlFitError::InvalidState(
                "expected_events is only defined for an extended Sum".to_string(),
            )),
        }
    }
}
