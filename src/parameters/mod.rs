//! # Parameter System
//!
//! This module provides the parameter system shared by densities, fits, and
//! plots: named scalars with optional bounds, a fixed/floating flag, and a
//! post-fit standard error, collected in an insertion-ordered registry.
//!
//! The registry is the shared-ownership point of the library. A density never
//! stores a parameter value; it stores the parameter's *name* and reads the
//! value through the registry at evaluation time. Two densities that name the
//! same parameter therefore always agree about its value, and a fit that
//! updates it updates it for both.

pub mod bounds;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{Parameter, ParameterError};
pub use parameters::{Parameters, SerializationError};

use crate::error::MlFitError;

impl From<ParameterError> for MlFitError {
    fn from(err: ParameterError) -> Self {
        match err {
            ParameterError::BoundsError(b) => MlFitError::OutOfBounds(b.to_string()),
            ParameterError::ParameterNotFound { name } => MlFitError::ParameterNotFound(name),
        }
    }
}

impl From<SerializationError> for MlFitError {
    fn from(err: SerializationError) -> Self {
        match err {
            SerializationError::Io(e) => MlFitError::IoError(e),
            SerializationError::Json(e) => MlFitError::JsonError(e),
        }
    }
}
