use std::path::{Path, PathBuf};

use nvmw_backend::NvmError;
use nvmw_platform::AppPathsError;
use thiserror::Error;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("Could not {action} settings file {}: {source}", path.display())]
    Settings {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed: {error}")]
    OperationFailed {
        operation: &'static str,
        error: NvmError,
    },

    #[error("{operation} cancelled by user")]
    OperationCancelled { operation: &'static str },

    #[error("{operation} ended without reporting a result")]
    NoResult { operation: &'static str },

    #[error("{0}")]
    Refused(String),
}

impl AppError {
    pub fn settings(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Settings {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn operation(operation: &'static str, error: NvmError) -> Self {
        if error == NvmError::Cancelled {
            Self::OperationCancelled { operation }
        } else {
            Self::OperationFailed { operation, error }
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::OperationCancelled { .. } => EXIT_CANCELLED,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether usage text should follow the message.
    #[must_use]
    pub fn show_help(&self) -> bool {
        matches!(self, Self::OperationFailed { error, .. } if error.show_help())
    }
}

#[cfg(test)]
mod tests {
    use nvmw_backend::NvmError;

    use super::{AppError, EXIT_CANCELLED, EXIT_FAILURE};

    #[test]
    fn cancellation_maps_to_interrupt_exit_code() {
        let error = AppError::operation("install", NvmError::Cancelled);
        assert!(matches!(error, AppError::OperationCancelled { operation: "install" }));
        assert_eq!(error.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn input_errors_request_help() {
        let error = AppError::operation("install", NvmError::MissingVersion);
        assert_eq!(error.exit_code(), EXIT_FAILURE);
        assert!(error.show_help());
        assert_eq!(
            error.to_string(),
            "install failed: A version argument is required but missing."
        );

        let network = AppError::operation("install", NvmError::network_request("download", "timed out"));
        assert!(!network.show_help());
    }
}
