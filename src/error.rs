//! Error types for cosecha operations.
//!
//! Structural failures (missing schema fields, too few groups for the fold
//! count, invalid configuration) are errors and halt the run. Per-record
//! validation failures are not errors: they are
//! [`RejectionReason`](crate::validation::RejectionReason)s collected into
//! the cleaning report.

use crate::schema::CanonicalField;
use thiserror::Error;

/// Main error type for cosecha operations.
///
/// # Examples
///
/// ```
/// use cosecha::error::CosechaError;
///
/// let err = CosechaError::InsufficientGroups { n_groups: 3, n_folds: 5 };
/// assert!(err.to_string().contains("3 distinct groups"));
/// ```
#[derive(Debug, Error)]
pub enum CosechaError {
    /// Required canonical fields are absent after applying the rename table.
    #[error(
        "schema error: required field(s) {} missing after normalization (available headers: {})",
        format_fields(.missing),
        .available.join(", ")
    )]
    Schema {
        /// Canonical fields that could not be resolved
        missing: Vec<CanonicalField>,
        /// Raw headers that were present in the input
        available: Vec<String>,
    },

    /// Two or more raw headers resolve to the same canonical field.
    #[error(
        "schema error: ambiguous headers {} all map to {field}",
        .headers.join(", ")
    )]
    AmbiguousHeader {
        /// The contested canonical field
        field: CanonicalField,
        /// Raw headers resolving to it, in input order
        headers: Vec<String>,
    },

    /// Fewer distinct groups than requested folds; a fold would be empty.
    #[error(
        "insufficient groups: {n_groups} distinct groups cannot fill {n_folds} folds \
         (lower the fold count to at most {n_groups})"
    )]
    InsufficientGroups {
        /// Distinct groups found in the grouping column
        n_groups: usize,
        /// Requested fold count
        n_folds: usize,
    },

    /// Invalid hyperparameter or configuration value provided.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// An operation received no data to work on.
    #[error("empty input: {context}")]
    EmptyInput {
        /// What was empty
        context: String,
    },

    /// A model was used before `fit`.
    #[error("{model} is not fitted; call fit() first")]
    NotFitted {
        /// Model name
        model: &'static str,
    },

    /// A column requested by name does not exist.
    #[error("column not found: {name}")]
    ColumnNotFound {
        /// Requested column name
        name: String,
    },

    /// Run aborted through a cancellation token.
    #[error("run cancelled before completion")]
    Cancelled,

    /// Malformed delimited input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for CosechaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CosechaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<&str> for CosechaError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}

impl From<String> for CosechaError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl CosechaError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput {
            context: context.to_string(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_param(param: &str, value: impl std::fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, CosechaError>;
