//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors writing run output
#[derive(Error, Debug)]
pub enum CliError {
    /// Output path has no recognised extension
    #[error("unsupported output format for {path}: expected .json or .csv")]
    UnsupportedOutput { path: PathBuf },

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn unsupported_output(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedOutput { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
