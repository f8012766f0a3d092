//! Error types for cosecha-cli

use cosecha::error::CosechaError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Not a file (e.g., directory)
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Command-line value out of domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audit of a persisted dataset failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Library error
    #[error("{0}")]
    Cosecha(#[from] CosechaError),
}

impl CliError {
    /// Numeric status for this error
    pub(crate) fn code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_) => 2,
            Self::FileNotFound(_) | Self::NotAFile(_) => 3,
            Self::ValidationFailed(_) => 5,
            Self::Io(_) => 7,
            Self::Cosecha(err) => match err {
                CosechaError::InvalidHyperparameter { .. } | CosechaError::Config(_) => 2,
                CosechaError::Schema { .. }
                | CosechaError::AmbiguousHeader { .. }
                | CosechaError::Csv(_)
                | CosechaError::ColumnNotFound { .. }
                | CosechaError::Serialization(_) => 4,
                CosechaError::InsufficientGroups { .. } => 6,
                CosechaError::Io(_) => 7,
                CosechaError::Cancelled => 130,
                _ => 1,
            },
        }
    }

    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Cosecha(CosechaError::from(e))
    }
}
