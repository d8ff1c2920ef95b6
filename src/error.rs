//! Error types for Polaris
//!
//! Centralized error handling using thiserror. Per-account submission failures are
//! not errors at this level: they are converted into outcomes inside a tick.

use thiserror::Error;

use crate::domain::ValidationError;

/// All error types that can escape a Polaris operation
#[derive(Debug, Error)]
pub enum PolarisError {
    /// A run draft failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid or unsupported configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// Could not reach or keep a connection to the RPC endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// The RPC endpoint answered with an error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Polaris operations
pub type Result<T> = std::result::Result<T, PolarisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_conversion() {
        let err: PolarisError = ValidationError::NoAccounts.into();
        assert!(matches!(err, PolarisError::Validation(ValidationError::NoAccounts)));
        assert!(err.to_string().starts_with("Validation failed:"));
    }

    #[test]
    fn test_config_error() {
        let err = PolarisError::Config("unsupported scheme ftp".to_string());
        assert_eq!(err.to_string(), "Config error: unsupported scheme ftp");
    }

    #[test]
    fn test_rpc_error() {
        let err = PolarisError::Rpc {
            code: -32000,
            message: "nonce too low".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32000: nonce too low");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "keys.txt");
        let err: PolarisError = io_err.into();
        assert!(matches!(err, PolarisError::Io(_)));
        assert!(err.to_string().contains("keys.txt"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PolarisError = json_err.into();
        assert!(matches!(err, PolarisError::Json(_)));
    }
}
