//! Common error types for the CloudX environment tests.

use thiserror::Error;

/// Errors raised by collaborators of the assertion layer (fixture loading,
/// resource lookups, configuration).
#[derive(Error, Debug)]
pub enum SuiteError {
    /// Invalid or unreadable configuration / fixture
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No resource matched a required lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SuiteError {
    fn from(err: serde_json::Error) -> Self {
        SuiteError::Serialization(err.to_string())
    }
}

/// Result type alias using `SuiteError`
pub type Result<T> = std::result::Result<T, SuiteError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = SuiteError::NotFound("sqs queue with prefix 'cloudximage'".to_string());
        assert_eq!(
            err.to_string(),
            "Not found: sqs queue with prefix 'cloudximage'"
        );
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SuiteError = json_err.into();
        assert!(matches!(err, SuiteError::Serialization(_)));
    }
}
