//! Composite densities: weighted sums and products.
//!
//! A `Sum` mixes components that live over the same observable(s). Its
//! coefficients come in two modes, and callers must pick one explicitly:
//!
//! - *fraction mode*: k components carry k-1 fraction parameters in [0, 1];
//!   the last component's weight is the implicit remainder `1 - sum`.
//! - *extended mode*: every component carries its own yield parameter (an
//!   absolute expected event count, >= 0). The total yield feeds the
//!   extended likelihood term.
//!
//! A `Product` multiplies factors over pairwise-distinct observables,
//! building a multidimensional density from independent 1D shapes.

use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;

use super::Density;

/// Coefficient mode of a [`Sum`].
#[derive(Debug, Clone)]
pub enum SumCoefficients {
    /// k-1 fraction parameter names; the last component takes the remainder.
    Fractions(Vec<String>),

    /// One yield parameter name per component (extended mode).
    Yields(Vec<String>),
}

/// A weighted sum of component densities over a shared observable set.
#[derive(Debug, Clone)]
pub struct Sum {
    pub(crate) components: Vec<Density>,
    pub(crate) coefficients: SumCoefficients,
}

impl Sum {
    /// Create a fraction-mode sum.
    ///
    /// `fractions` names one fraction parameter per component except the
    /// last, whose weight is the implicit remainder.
    pub fn with_fractions(components: Vec<Density>, fractions: &[&str]) -> Result<Self> {
        if components.len() < 2 {
            return Err(MlFitError::InvalidParameter(
                "a Sum needs at least two components".to_string(),
            ));
        }
        if fractions.len() != components.len() - 1 {
            return Err(MlFitError::InvalidParameter(format!(
                "fraction mode needs {} coefficients for {} components, got {}",
                components.len() - 1,
                components.len(),
                fractions.len()
            )));
        }
        Self::check_shared_observables(&components)?;

        Ok(Self {
            components,
            coefficients: SumCoefficients::Fractions(
                fractions.iter().map(|s| s.to_string()).collect(),
            ),
        })
    }

    /// Create an extended sum with one yield parameter per component.
    pub fn extended(components: Vec<Density>, yields: &[&str]) -> Result<Self> {
        if components.len() < 2 {
            return Err(MlFitError::InvalidParameter(
                "a Sum needs at least two components".to_string(),
            ));
        }
        if yields.len() != components.len() {
            return Err(MlFitError::InvalidParameter(format!(
                "extended mode needs {} yields for {} components, got {}",
                components.len(),
                components.len(),
                yields.len()
            )));
        }
        Self::check_shared_observables(&components)?;

        Ok(Self {
            components,
            coefficients: SumCoefficients::Yields(yields.iter().map(|s| s.to_string()).collect()),
        })
    }

    fn check_shared_observables(components: &[Density]) -> Result<()> {
        let mut first = components[0].observables();
        first.sort();
        for comp in &components[1..] {
            let mut obs = comp.observables();
            obs.sort();
            if obs != first {
                return Err(MlFitError::InvalidParameter(
                    "Sum components must share the same observables".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether this sum carries yields (extended mode).
    pub fn is_extended(&self) -> bool {
        matches!(self.coefficients, SumCoefficients::Yields(_))
    }

    /// The component weights at the current parameter values.
    ///
    /// Fraction mode returns fractions summing to 1 (the implicit last one
    /// included); extended mode returns the raw yields.
    pub(crate) fn weights(&self, params: &Parameters) -> Result<Vec<f64>> {
        match &self.coefficients {
            SumCoefficients::Fractions(names) => {
                let mut weights = Vec::with_capacity(self.components.len());
                let mut total = 0.0;
                for name in names {
                    let f = params.value_of(name)?;
                    if !(0.0..=1.0).contains(&f) {
                        return Err(MlFitError::OutOfBounds(format!(
                            "fraction '{}' must be in [0, 1], got {}",
                            name, f
                        )));
                    }
                    total += f;
                    weights.push(f);
                }
                if total > 1.0 {
                    return Err(MlFitError::OutOfBounds(format!(
                        "fractions sum to {}, must not exceed 1",
                        total
                    )));
                }
                weights.push(1.0 - total);
                Ok(weights)
            }
            SumCoefficients::Yields(names) => {
                let mut weights = Vec::with_capacity(self.components.len());
                for name in names {
                    let y = params.value_of(name)?;
                    if y < 0.0 {
                        return Err(MlFitError::OutOfBounds(format!(
                            "yield '{}' must be non-negative, got {}",
                            name, y
                        )));
                    }
                    weights.push(y);
                }
                Ok(weights)
            }
        }
    }

    /// Sum of the component weights: 1 in fraction mode, the total expected
    /// event count in extended mode.
    pub(crate) fn total_weight(&self, params: &Parameters) -> Result<f64> {
        Ok(self.weights(params)?.iter().sum())
    }

    /// Names of the coefficient parameters.
    pub fn coefficient_names(&self) -> &[String] {
        match &self.coefficients {
            SumCoefficients::Fractions(names) => names,
            SumCoefficients::Yields(names) => names,
        }
    }
}

/// A product of factor densities over pairwise-distinct observables.
#[derive(Debug, Clone)]
pub struct Product {
    pub(crate) factors: Vec<Density>,
}

impl Product {
    /// Create a product density.
    ///
    /// Factors must cover pairwise-distinct observables; the product of a
    /// shape in `x` and a shape in `y` is a 2D density over `(x, y)`.
    pub fn new(factors: Vec<Density>) -> Result<Self> {
        if factors.len() < 2 {
            return Err(MlFitError::InvalidParameter(
                "a Product needs at least two factors".to_string(),
            ));
        }

        let mut seen: Vec<String> = Vec::new();
        for factor in &factors {
            for obs in factor.observables() {
                if seen.contains(&obs) {
                    return Err(MlFitError::InvalidParameter(format!(
                        "Product factors must have distinct observables; '{}' appears twice",
                        obs
                    )));
                }
                seen.push(obs);
            }
        }

        Ok(Self { factors })
    }

    /// The factor whose observables include `observable`.
    pub(crate) fn factor_for(&self, observable: &str) -> Result<&Density> {
        self.factors
            .iter()
            .find(|f| f.observables().iter().any(|o| o == observable))
            .ok_or_else(|| {
                MlFitError::Domain(format!(
                    "no Product factor covers observable '{}'",
                    observable
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density;

    fn two_components() -> Vec<Density> {
        vec![
            density::gaussian("mbc", "mB0", "gB0"),
            density::argus("mbc", "mCt", "crv"),
        ]
    }

    fn params() -> Parameters {
        let mut p = Parameters::new();
        p.add_param_with_bounds("mbc", 5.25, 5.2, 5.29).unwrap();
        p.add_param("mB0", 5.28);
        p.add_param_with_bounds("gB0", 0.003, 0.0001, 0.015).unwrap();
        p.add_param_with_bounds("mCt", 5.29, 5.2, 5.3).unwrap();
        p.add_param_with_bounds("crv", -20.0, -80.0, -1.0).unwrap();
        p.add_param_with_bounds("fsb", 0.7, 0.0, 1.0).unwrap();
        p.add_param_with_bounds("nsg", 7000.0, 0.0, 10000.0).unwrap();
        p.add_param_with_bounds("nbg", 3000.0, 0.0, 10000.0).unwrap();
        p
    }

    #[test]
    fn test_fraction_mode_weights() {
        let sum = Sum::with_fractions(two_components(), &["fsb"]).unwrap();
        assert!(!sum.is_extended());

        let w = sum.weights(&params()).unwrap();
        assert_eq!(w.len(), 2);
        assert!((w[0] - 0.7).abs() < 1e-12);
        assert!((w[1] - 0.3).abs() < 1e-12);
        assert!((sum.total_weight(&params()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extended_mode_weights() {
        let sum = Sum::extended(two_components(), &["nsg", "nbg"]).unwrap();
        assert!(sum.is_extended());

        let w = sum.weights(&params()).unwrap();
        assert_eq!(w, vec![7000.0, 3000.0]);
        assert_eq!(sum.total_weight(&params()).unwrap(), 10000.0);
    }

    #[test]
    fn test_coefficient_count_mismatch() {
        assert!(Sum::with_fractions(two_components(), &[]).is_err());
        assert!(Sum::with_fractions(two_components(), &["a", "b"]).is_err());
        assert!(Sum::extended(two_components(), &["nsg"]).is_err());
    }

    #[test]
    fn test_negative_yield_rejected() {
        let sum = Sum::extended(two_components(), &["nsg", "nbg"]).unwrap();
        let mut p = params();
        p.get_mut("nsg").unwrap().set_bounds(-100.0, 10000.0).unwrap();
        p.get_mut("nsg").unwrap().set_value(-5.0).unwrap();

        assert!(matches!(
            sum.weights(&p),
            Err(MlFitError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_sum_requires_shared_observable() {
        let mismatched = vec![
            density::gaussian("x", "mB0", "gB0"),
            density::exponential("y", "crv"),
        ];
        assert!(Sum::with_fractions(mismatched, &["fsb"]).is_err());
    }

    #[test]
    fn test_product_requires_distinct_observables() {
        let overlapping = two_components();
        assert!(Product::new(overlapping).is_err());

        let disjoint = vec![
            density::gaussian("x", "mB0", "gB0"),
            density::exponential("y", "crv"),
        ];
        let product = Product::new(disjoint).unwrap();
        assert!(product.factor_for("x").is_ok());
        assert!(product.factor_for("y").is_ok());
        assert!(product.factor_for("z").is_err());
    }
}
