//! Parameters collection implementation
//!
//! This module provides the Parameters struct, a name-keyed registry of
//! Parameter objects. Densities reference their observables and shape
//! parameters by name through one registry, which is what makes a parameter
//! shared between densities: a fit that moves `mean` moves it for every
//! density that names `mean`.
//!
//! The registry preserves insertion order. The fitter relies on this: the
//! order of floating parameters defines the row/column order of the
//! covariance and correlation matrices.

use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Errors from saving or loading a parameter set.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A name-keyed, insertion-ordered collection of parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Map of parameter names to Parameter objects
    params: HashMap<String, Parameter>,

    /// Names in insertion order
    order: Vec<String>,
}

impl Parameters {
    /// Create a new empty parameters collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlfit_rs::parameters::Parameters;
    ///
    /// let params = Parameters::new();
    /// assert_eq!(params.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the collection.
    ///
    /// A parameter with the same name is replaced in place, keeping its
    /// original position in the ordering.
    pub fn add(&mut self, param: Parameter) {
        let name = param.name().to_string();
        if self.params.insert(name.clone(), param).is_none() {
            self.order.push(name);
        }
    }

    /// Add a new unbounded parameter with the given name and value.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlfit_rs::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param("mean", 5.28);
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn add_param(&mut self, name: &str, value: f64) {
        self.add(Parameter::new(name, value));
    }

    /// Add a new bounded parameter with the given name, value, and bounds.
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterError> {
        let param = Parameter::with_bounds(name, value, min, max)?;
        self.add(param);
        Ok(())
    }

    /// Get a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Get a mutable reference to a parameter by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    /// Get a parameter's current value, failing if it is not registered.
    ///
    /// This is the lookup densities use during evaluation, so a density
    /// referencing an unregistered parameter surfaces as an error rather
    /// than a silent default.
    pub fn value_of(&self, name: &str) -> Result<f64, ParameterError> {
        self.params
            .get(name)
            .map(|p| p.value())
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    /// Set a parameter's value, failing if it is not registered or the value
    /// is out of bounds.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
        param.set_value(value)
    }

    /// Check if a parameter with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Get the number of parameters in the collection.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get all parameter names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Iterate over parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.order.iter().filter_map(move |name| self.params.get(name))
    }

    /// Get the floating parameters, in insertion order.
    pub fn varying(&self) -> Vec<&Parameter> {
        self.iter().filter(|p| p.vary()).collect()
    }

    /// Get the names of the floating parameters, in insertion order.
    pub fn varying_names(&self) -> Vec<String> {
        self.iter()
            .filter(|p| p.vary())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Get the fixed parameters, in insertion order.
    pub fn fixed(&self) -> Vec<&Parameter> {
        self.iter().filter(|p| !p.vary()).collect()
    }

    /// Get the floating parameters' values in the internal (unbounded)
    /// optimizer coordinates, in insertion order.
    pub fn varying_internal_values(&self) -> Result<Vec<f64>, ParameterError> {
        self.iter()
            .filter(|p| p.vary())
            .map(|p| p.to_internal())
            .collect()
    }

    /// Update the floating parameters from a slice of internal optimizer
    /// coordinates, in insertion order.
    ///
    /// The external value produced by the bounds transform is always inside
    /// each parameter's bounds, so this cannot fail on a bounds check; it
    /// fails only on a length mismatch.
    pub fn update_from_internal(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        let varying_names: Vec<String> = self.varying_names();
        if values.len() != varying_names.len() {
            // Reuse the not-found error shape for the structural mismatch
            return Err(ParameterError::ParameterNotFound {
                name: format!(
                    "expected {} internal values, got {}",
                    varying_names.len(),
                    values.len()
                ),
            });
        }

        for (name, &internal) in varying_names.iter().zip(values.iter()) {
            let param = self.params.get_mut(name).expect("name came from registry");
            let external = param.from_internal(internal);
            param.set_value(external)?;
        }

        Ok(())
    }

    /// Reset every parameter to its initial value and clear errors.
    pub fn reset(&mut self) {
        for param in self.params.values_mut() {
            param.reset();
        }
    }

    /// Serialize the collection to a JSON string.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the collection to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SerializationError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Deserialize a collection from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a collection from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        let mut file = File::open(path)?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        Self::from_json(&json)
    }
}
