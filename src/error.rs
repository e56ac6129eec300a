//! Error types and exit codes for sourcepack.

use thiserror::Error;

/// Main error type for sourcepack operations.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{message}")]
    Usage { message: String },

    #[error("validation failed:\n{issues}")]
    Validation { issues: String },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    /// Map the error to the process exit code:
    /// - 1: runtime error (IO, archive, JSON, validation)
    /// - 2: argument error (clap reports its own parse failures with 2 as well)
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. } => 2,
            _ => 1,
        }
    }
}

/// Result type alias for sourcepack operations.
pub type Result<T> = std::result::Result<T, BundleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_exit_with_2() {
        let err = BundleError::Usage {
            message: "--zip and --delta are mutually exclusive".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_runtime_errors_exit_with_1() {
        let err = BundleError::Io(std::io::Error::other("boom"));
        assert_eq!(err.exit_code(), 1);

        let err = BundleError::Validation {
            issues: "manifest.module must be non-empty".into(),
        };
        assert_eq!(err.exit_code(), 1);
    }
}
