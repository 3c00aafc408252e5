//! Application error type.
//!
//! Every fallible operation in the crate returns `Result<_, AppError>`. Each
//! variant maps to a process exit code so the binary can report failures
//! consistently:
//!
//! - `2`: bad configuration or unreadable input
//! - `3`: input data that cannot support a run
//! - `4`: pipeline failures (grid, sweep, classifier)

use thiserror::Error;

use crate::domain::Feature;

#[derive(Debug, Error)]
pub enum AppError {
    /// A feature range handed to the grid builder is empty or malformed.
    #[error("Invalid range for {feature}: {message}")]
    InvalidRange { feature: Feature, message: String },

    /// A sweep value matched no grid rows at all.
    #[error("No grid rows hold {feature} = {value}; sweep range does not match the grid")]
    EmptySubset { feature: Feature, value: f64 },

    /// The prediction capability failed or returned a malformed batch.
    #[error("Classifier failed while sweeping {feature} = {value}: {message}")]
    ClassifierInvocation {
        feature: Feature,
        value: f64,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io { .. } | AppError::Csv(_) | AppError::Json(_) => 2,
            AppError::InvalidData(_) => 3,
            AppError::InvalidRange { .. }
            | AppError::EmptySubset { .. }
            | AppError::ClassifierInvocation { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_feature_and_value() {
        let err = AppError::EmptySubset {
            feature: Feature::Links,
            value: 7.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Links"), "{msg}");
        assert!(msg.contains('7'), "{msg}");
        assert_eq!(err.exit_code(), 4);
    }
}
