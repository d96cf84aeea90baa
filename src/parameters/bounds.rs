//! Parameter bounds and the bounded/unbounded coordinate transform.
//!
//! Fit parameters carry optional lower/upper limits. The minimizer itself is
//! unconstrained; it works in an internal coordinate that the Minuit-style
//! transform below maps onto the bounded external value, so a step can never
//! leave the declared range.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Infinite parameter value is not allowed")]
    InfiniteValue,
}

/// Lower/upper limits on a parameter value.
///
/// Either side may be infinite, in which case the parameter is unbounded in
/// that direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;

        // JSON has no Infinity literal, so open sides serialize as null
        if self.min.is_infinite() && self.min.is_sign_negative() {
            state.serialize_field("min", &serde_json::Value::Null)?;
        } else {
            state.serialize_field("min", &self.min)?;
        }

        if self.max.is_infinite() && self.max.is_sign_positive() {
            state.serialize_field("max", &serde_json::Value::Null)?;
        } else {
            state.serialize_field("max", &self.max)?;
        }

        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper.min.unwrap_or(NEG_INFINITY);
        let max = helper.max.unwrap_or(INFINITY);

        Ok(Bounds { min, max })
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create bounds with min and max values.
    ///
    /// Returns an error if `min > max`.
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity).
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create bounds with only a minimum value.
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Create bounds with only a maximum value.
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// Check if a value is within the bounds.
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if both min and max are finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Check if the parameter is bounded from below.
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// Check if the parameter is bounded from above.
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Width of the bounded range (infinite for open sides).
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp a value to be within the bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Minuit-style transform between bounded external values and unbounded
/// internal optimizer coordinates.
///
/// With both limits present the mapping is `ext = min + (sin(int) + 1) *
/// (max - min) / 2`; one-sided limits use the sqrt form. The minimizer only
/// ever sees the internal coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    /// Create a new transform for the given bounds.
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Transform an internal optimizer value to an external (bounded) value.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        // No transform needed if parameter is unbounded
        if !self.bounds.has_lower_bound() && !self.bounds.has_upper_bound() {
            return internal_value;
        }

        // Only lower bound
        if self.bounds.has_lower_bound() && !self.bounds.has_upper_bound() {
            return self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt();
        }

        // Only upper bound
        if !self.bounds.has_lower_bound() && self.bounds.has_upper_bound() {
            return self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt();
        }

        // Both bounds
        let bound_range = self.bounds.max - self.bounds.min;
        self.bounds.min + (internal_value.sin() + 1.0) * bound_range / 2.0
    }

    /// Transform an external value to the internal optimizer coordinate.
    ///
    /// Fails if the external value is non-finite or outside the bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        // No transform needed if parameter is unbounded
        if !self.bounds.has_lower_bound() && !self.bounds.has_upper_bound() {
            return Ok(external_value);
        }

        // Only lower bound
        if self.bounds.has_lower_bound() && !self.bounds.has_upper_bound() {
            return Ok(((external_value - self.bounds.min + 1.0).powi(2) - 1.0).sqrt());
        }

        // Only upper bound
        if !self.bounds.has_lower_bound() && self.bounds.has_upper_bound() {
            return Ok(((self.bounds.max - external_value + 1.0).powi(2) - 1.0).sqrt());
        }

        // Both bounds
        let bound_range = self.bounds.max - self.bounds.min;
        let scaled = 2.0 * (external_value - self.bounds.min) / bound_range - 1.0;

        // Keep scaled in [-1, 1] for asin against rounding at the edges
        let scaled = scaled.clamp(-1.0, 1.0);
        Ok(scaled.asin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_creation() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        assert_eq!(bounds.min, 0.0);
        assert_eq!(bounds.max, 10.0);

        // Invalid bounds (min > max)
        let result = Bounds::new(10.0, 0.0);
        assert!(result.is_err());

        let bounds = Bounds::unbounded();
        assert_eq!(bounds.min, NEG_INFINITY);
        assert_eq!(bounds.max, INFINITY);

        let bounds = Bounds::min_only(5.0);
        assert_eq!(bounds.min, 5.0);
        assert_eq!(bounds.max, INFINITY);

        let bounds = Bounds::max_only(15.0);
        assert_eq!(bounds.min, NEG_INFINITY);
        assert_eq!(bounds.max, 15.0);
    }

    #[test]
    fn test_is_within_bounds() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();

        assert!(bounds.is_within_bounds(0.0));
        assert!(bounds.is_within_bounds(5.0));
        assert!(bounds.is_within_bounds(10.0));

        assert!(!bounds.is_within_bounds(-1.0));
        assert!(!bounds.is_within_bounds(11.0));
    }

    #[test]
    fn test_bounds_checks() {
        let unbounded = Bounds::unbounded();
        assert!(!unbounded.is_finite());
        assert!(!unbounded.has_lower_bound());
        assert!(!unbounded.has_upper_bound());

        let bounded = Bounds::new(0.0, 10.0).unwrap();
        assert!(bounded.is_finite());
        assert!(bounded.has_lower_bound());
        assert!(bounded.has_upper_bound());
        assert_eq!(bounded.width(), 10.0);
    }

    #[test]
    fn test_clamp() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();

        assert_eq!(bounds.clamp(-5.0), 0.0);
        assert_eq!(bounds.clamp(5.0), 5.0);
        assert_eq!(bounds.clamp(15.0), 10.0);
    }

    #[test]
    fn test_transform_unbounded() {
        let transform = BoundsTransform::new(Bounds::unbounded());

        // For unbounded parameters, internal and external values are the same
        for &value in &[-10.0, -1.0, 0.0, 1.0, 10.0] {
            assert_eq!(transform.to_external(value), value);
            assert_eq!(transform.to_internal(value).unwrap(), value);
        }
    }

    #[test]
    fn test_transform_one_sided() {
        let lower = BoundsTransform::new(Bounds::min_only(5.0));
        let upper = BoundsTransform::new(Bounds::max_only(5.0));

        for &internal in &[1.0, 5.0, 10.0] {
            let ext = lower.to_external(internal);
            assert!(ext >= 5.0);
            let round_trip = lower.to_internal(ext).unwrap();
            assert!((internal - round_trip).abs() < 1e-8);

            let ext = upper.to_external(internal);
            assert!(ext <= 5.0);
            let round_trip = upper.to_internal(ext).unwrap();
            assert!((internal - round_trip).abs() < 1e-8);
        }
    }

    #[test]
    fn test_transform_both_bounds() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        let transform = BoundsTransform::new(bounds);

        for &internal in &[0.0, 0.5, 1.0] {
            let external = transform.to_external(internal);
            assert!(external >= bounds.min);
            assert!(external <= bounds.max);

            let round_trip = transform.to_internal(external).unwrap();
            assert!((internal - round_trip).abs() < 1e-8);
        }
    }

    #[test]
    fn test_transform_errors() {
        let transform = BoundsTransform::new(Bounds::new(0.0, 10.0).unwrap());

        assert!(transform.to_internal(-1.0).is_err());
        assert!(transform.to_internal(11.0).is_err());
        assert!(transform.to_internal(INFINITY).is_err());
        assert!(transform.to_internal(NEG_INFINITY).is_err());
    }
}
