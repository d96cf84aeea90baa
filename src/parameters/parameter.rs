//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the fundamental building block
//! of every model. A parameter is a named, bounded scalar that can be floated
//! or fixed during a fit, and that carries its standard error once a fit has
//! run.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },
}

/// A named, bounded scalar used by densities and fits.
///
/// Multiple densities may reference the same parameter (e.g. a shared
/// observable or a shared mean); they do so by name through a [`Parameters`]
/// registry, so a change made through any referencing density is visible to
/// all of them.
///
/// [`Parameters`]: crate::parameters::Parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter (the registry key)
    pub name: String,

    /// Display label, e.g. "m_{B^0}"
    pub label: String,

    /// Display unit, e.g. "GeV/c^2"
    pub unit: Option<String>,

    /// Current value of the parameter
    value: f64,

    /// Initial value when created (for reset operations)
    init_value: f64,

    /// Whether this parameter can be varied during a fit
    vary: bool,

    /// Minimum and maximum bounds for the parameter value
    bounds: Bounds,

    /// Standard error of the parameter (set after fitting)
    stderr: Option<f64>,
}

impl Parameter {
    /// Create a new unbounded, floating parameter.
    ///
    /// The label defaults to the name; use [`Parameter::with_label`] or the
    /// field directly to set a display label.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlfit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("mean", 5.28);
    /// assert_eq!(param.name(), "mean");
    /// assert_eq!(param.value(), 5.28);
    /// assert!(param.vary());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            unit: None,
            value,
            init_value: value,
            vary: true,
            bounds: Bounds::default(),
            stderr: None,
        }
    }

    /// Create a new floating parameter with bounds.
    ///
    /// The initial value is clamped into the bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlfit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::with_bounds("width", 0.007, 0.0, 0.01).unwrap();
    /// assert_eq!(param.min(), 0.0);
    /// assert_eq!(param.max(), 0.01);
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max)?;
        let value = bounds.clamp(value);

        Ok(Self {
            name: name.to_string(),
            label: name.to_string(),
            unit: None,
            value,
            init_value: value,
            vary: true,
            bounds,
            stderr: None,
        })
    }

    /// Create a constant: a fixed parameter with no bounds.
    ///
    /// Useful for shape parameters that are known and should not be fitted,
    /// like a tail-order parameter held at its simulation value.
    pub fn constant(name: &str, value: f64) -> Self {
        let mut p = Self::new(name, value);
        p.vary = false;
        p
    }

    /// Set the display label, builder style.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Set the display unit, builder style.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Get the current value of the parameter.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter.
    ///
    /// Fails if the value is outside the declared bounds; the stored value is
    /// unchanged in that case.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.bounds.is_within_bounds(value) {
            return Err(ParameterError::BoundsError(
                BoundsError::ValueOutsideBounds {
                    value,
                    min: self.bounds.min,
                    max: self.bounds.max,
                },
            ));
        }

        self.value = value;
        Ok(())
    }

    /// Get the initial value of the parameter.
    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset the parameter to its initial value and clear its error.
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
        self.stderr = None;
    }

    /// Get the name of the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the parameter is floated during a fit.
    pub fn vary(&self) -> bool {
        self.vary
    }

    /// Fix the parameter at its current value; the fitter will not vary it.
    pub fn fix(&mut self) {
        self.vary = false;
    }

    /// Float the parameter; the fitter may vary it.
    pub fn float(&mut self) {
        self.vary = true;
    }

    /// Get the minimum allowed value for the parameter.
    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    /// Get the maximum allowed value for the parameter.
    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    /// Set the bounds for the parameter.
    ///
    /// The current value is clamped into the new bounds.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);

        Ok(())
    }

    /// Get the standard error of the parameter, if a fit has set one.
    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    /// Set or clear the standard error of the parameter.
    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Get the bounds of the parameter.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Create a bounds transform for this parameter.
    pub fn bounds_transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    /// Convert the parameter value to the internal optimizer coordinate.
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        let transform = self.bounds_transform();
        transform
            .to_internal(self.value)
            .map_err(ParameterError::from)
    }

    /// Convert an internal optimizer coordinate back to a parameter value.
    pub fn from_internal(&self, internal_value: f64) -> f64 {
        let transform = self.bounds_transform();
        transform.to_external(internal_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::{INFINITY, NEG_INFINITY};

    #[test]
    fn test_parameter_creation() {
        let param = Parameter::new("mean", 5.28);
        assert_eq!(param.name(), "mean");
        assert_eq!(param.label, "mean");
        assert_eq!(param.value(), 5.28);
        assert_eq!(param.init_value(), 5.28);
        assert!(param.vary());
        assert_eq!(param.min(), NEG_INFINITY);
        assert_eq!(param.max(), INFINITY);
        assert!(param.stderr().is_none());

        let param = Parameter::with_bounds("width", 0.007, 0.0, 0.01)
            .unwrap()
            .with_label("#Gamma_{B^0}")
            .with_unit("GeV/c^2");
        assert_eq!(param.value(), 0.007);
        assert_eq!(param.label, "#Gamma_{B^0}");
        assert_eq!(param.unit.as_deref(), Some("GeV/c^2"));

        let param = Parameter::constant("ncb", 15.0);
        assert!(!param.vary());
        assert_eq!(param.value(), 15.0);
    }

    #[test]
    fn test_parameter_value() {
        let mut param = Parameter::new("mean", 5.28);
        param.set_value(5.25).unwrap();
        assert_eq!(param.value(), 5.25);

        let mut param = Parameter::with_bounds("width", 0.005, 0.0, 0.01).unwrap();

        // Valid value is immediately reflected by a subsequent read
        param.set_value(0.008).unwrap();
        assert_eq!(param.value(), 0.008);

        // Value outside bounds fails and leaves the stored value untouched
        assert!(param.set_value(0.02).is_err());
        assert_eq!(param.value(), 0.008);

        assert!(param.set_value(-0.001).is_err());
        assert_eq!(param.value(), 0.008);
    }

    #[test]
    fn test_parameter_creation_clamps() {
        // Out-of-bounds initial value is clamped at construction
        let param = Parameter::with_bounds("frac", 1.5, 0.0, 1.0).unwrap();
        assert_eq!(param.value(), 1.0);
    }

    #[test]
    fn test_parameter_reset() {
        let mut param = Parameter::with_bounds("width", 0.005, 0.0, 0.01).unwrap();
        param.set_value(0.009).unwrap();
        param.set_stderr(Some(0.001));

        param.reset();
        assert_eq!(param.value(), 0.005);
        assert!(param.stderr().is_none());

        // Initial value outside narrowed bounds is clamped on reset
        let mut param = Parameter::with_bounds("c", 10.0, 0.0, 20.0).unwrap();
        param.set_value(15.0).unwrap();
        param.set_bounds(12.0, 18.0).unwrap();
        param.reset();
        assert_eq!(param.value(), 12.0);
    }

    #[test]
    fn test_fix_and_float() {
        let mut param = Parameter::new("mean", 5.28);
        assert!(param.vary());

        param.fix();
        assert!(!param.vary());

        param.float();
        assert!(param.vary());
    }

    #[test]
    fn test_parameter_bounds() {
        let mut param = Parameter::new("c", 10.0);

        param.set_bounds(0.0, 20.0).unwrap();
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 20.0);

        // Invalid bounds leave the old ones in place
        assert!(param.set_bounds(20.0, 0.0).is_err());
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 20.0);

        // Narrowing bounds clamps the current value
        let mut param = Parameter::new("c", 10.0);
        param.set_bounds(15.0, 25.0).unwrap();
        assert_eq!(param.value(), 15.0);
    }

    #[test]
    fn test_parameter_stderr() {
        let mut param = Parameter::new("mean", 5.28);
        assert!(param.stderr().is_none());

        param.set_stderr(Some(0.002));
        assert_eq!(param.stderr().unwrap(), 0.002);

        param.set_stderr(None);
        assert!(param.stderr().is_none());
    }

    #[test]
    fn test_parameter_internal_round_trip() {
        let param = Parameter::new("mean", 5.28);
        assert_eq!(param.to_internal().unwrap(), 5.28);
        assert_eq!(param.from_internal(6.0), 6.0);

        let param = Parameter::with_bounds("width", 0.005, 0.0, 0.01).unwrap();
        let internal = param.to_internal().unwrap();
        let external = param.from_internal(internal);
        assert!((external - 0.005).abs() < 1e-12);
    }
}
