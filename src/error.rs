use thiserror::Error;

/// Error types for the mlfit-rs library.
#[derive(Error, Debug)]
pub enum MlFitError {
    /// Error for a parameter value outside its declared bounds.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Error for a missing or invalid variable in an evaluation.
    #[error("Domain error: {0}")]
    Domain(String),

    /// Error for a malformed dataset record.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Error indicating a mismatch in matrix or vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating the minimizer failed to converge.
    #[error("Minimization failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Error for invalid parameter values or definitions.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Parameter not found in the registry.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Error during toy-data generation.
    #[error("Sampling error: {0}")]
    Sampling(String),

    /// Error while rendering or writing a plot document.
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid state in a component lifecycle.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for mlfit-rs operations.
pub type Result<T> = std::result::Result<T, MlFitError>;

/// Extensions for converting from other error types.
impl From<String> for MlFitError {
    fn from(s: String) -> Self {
        MlFitError::Other(s)
    }
}

impl From<&str> for MlFitError {
    fn from(s: &str) -> Self {
        MlFitError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MlFitError::OutOfBounds("value 7 outside [0, 5]".to_string());
        assert!(format!("{}", err).contains("value 7 outside [0, 5]"));

        let err = MlFitError::Domain("no value for variable 'mbc'".to_string());
        assert!(format!("{}", err).contains("mbc"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MlFitError = io_err.into();

        match err {
            MlFitError::IoError(_) => (),
            _ => panic!("Expected IoError variant"),
        }

        let str_err: MlFitError = "test error".into();
        match str_err {
            MlFitError::Other(s) => assert_eq!(s, "test error"),
            _ => panic!("Expected Other variant"),
        }
    }
}
