//! Error types for CertPath Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in CertPath Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error (DynamoDB, Bedrock, Cognito)
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authorization error
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response construction error
    #[error("HTTP error: {0}")]
    Http(#[from] lambda_http::http::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::Unauthorized(_) => 403,
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("bad".into()).status_code(), 400);
        assert_eq!(Error::Auth("no token".into()).status_code(), 401);
        assert_eq!(Error::NotFound("curriculum".into()).status_code(), 404);
        assert_eq!(Error::Aws("throttled".into()).status_code(), 500);
    }

    #[test]
    fn test_message_is_passed_through() {
        let err = Error::Aws("PutItem on Users failed".into());
        assert_eq!(err.to_string(), "AWS error: PutItem on Users failed");
    }
}
