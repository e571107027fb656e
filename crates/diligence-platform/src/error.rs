//! Error types for agent platform operations

use crate::types::RunStatus;
use thiserror::Error;

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Errors that can occur while talking to the agent platform
#[derive(Error, Debug)]
pub enum PlatformError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Remote resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// A run reached a terminal state other than `completed`
    #[error("Run ended with status {status}: {detail}")]
    RunFailed { status: RunStatus, detail: String },

    /// Session used after its remote resources were released
    #[error("Session is not open")]
    SessionClosed,

    /// Local file error (uploads, saved images)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::RunFailed {
            status: RunStatus::Expired,
            detail: "run expired".to_string(),
        };
        assert_eq!(err.to_string(), "Run ended with status expired: run expired");

        let err = PlatformError::NotFound("assistants/asst_1".to_string());
        assert_eq!(err.to_string(), "Not found: assistants/asst_1");
    }
}
