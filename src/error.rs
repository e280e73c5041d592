//! Error types for the cross-impact pipeline.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//!
//! Only configuration and schema errors abort a run. Data-quality and
//! numerical errors are raised by a single stage for a single instrument (or
//! a single horizon/target fit) and the pipeline records them as an
//! undefined outcome for that unit while the rest of the universe proceeds.

use thiserror::Error;

/// Result type alias for cross-impact operations.
pub type Result<T> = std::result::Result<T, CrossImpactError>;

/// Main error type for cross-impact operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrossImpactError {
    /// Malformed configuration (horizons, levels, alpha grid, folds, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input table is missing required columns
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A cell could not be parsed
    #[error("Parse error at row {row}, column '{column}': '{value}'")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    /// Not enough usable observations for a stage
    #[error("Insufficient data for {context}: {available} available, {required} required")]
    InsufficientData {
        context: String,
        available: usize,
        required: usize,
    },

    /// Every value of a series is missing or non-finite
    #[error("Series has no finite values: {0}")]
    NonFiniteSeries(String),

    /// Zero-variance inputs, rank-deficient designs
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// CSV reader/writer failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl CrossImpactError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        CrossImpactError::Generic(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        CrossImpactError::InvalidConfig(msg.into())
    }

    /// Whether this error aborts the whole run.
    ///
    /// Everything else is local to one instrument or one fit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrossImpactError::InvalidConfig(_)
                | CrossImpactError::MissingColumns(_)
                | CrossImpactError::Parse { .. }
                | CrossImpactError::Csv(_)
                | CrossImpactError::Io(_)
        )
    }
}

impl From<std::io::Error> for CrossImpactError {
    fn from(err: std::io::Error) -> Self {
        CrossImpactError::Io(err.to_string())
    }
}

impl From<csv::Error> for CrossImpactError {
    fn from(err: csv::Error) -> Self {
        CrossImpactError::Csv(err.to_string())
    }
}

impl From<String> for CrossImpactError {
    fn from(err: String) -> Self {
        CrossImpactError::Generic(err)
    }
}

impl From<&str> for CrossImpactError {
    fn from(err: &str) -> Self {
        CrossImpactError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrossImpactError::MissingColumns(vec!["bid_px_00".into(), "ask_sz_01".into()]);
        assert_eq!(err.to_string(), "Missing required columns: bid_px_00, ask_sz_01");

        let err = CrossImpactError::InsufficientData {
            context: "PCA fit for AAPL".into(),
            available: 1,
            required: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data for PCA fit for AAPL: 1 available, 2 required"
        );
    }

    #[test]
    fn test_fatality() {
        assert!(CrossImpactError::config("no horizons").is_fatal());
        assert!(CrossImpactError::MissingColumns(vec![]).is_fatal());
        assert!(!CrossImpactError::NumericalDegeneracy("flat".into()).is_fatal());
        assert!(!CrossImpactError::NonFiniteSeries("X".into()).is_fatal());
    }

    #[test]
    fn test_result_type() {
        let result: Result<i32> = Err(CrossImpactError::generic("boom"));
        assert!(result.is_err());
    }
}
