//! Client error taxonomy.
//!
//! Distinguishes transport failures (no response received) from terminal
//! HTTP status outcomes and local failures. The gateway recovers from a
//! single 401 internally; everything else is surfaced as-is.

use reqwest::StatusCode;
use thiserror::Error;

use blossom_core::ValidationError;

/// Errors produced by the client when talking to the remote service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: the request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Terminal non-2xx response from the remote service.
    #[error("API error: {} {status_text}", .status.as_u16())]
    Status {
        status: StatusCode,
        status_text: String,
        /// Parsed JSON error body, when the service sent one.
        body: Option<serde_json::Value>,
    },

    /// Response body did not match the expected shape.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Empty (204) response where the endpoint promises a body.
    #[error("empty response where a body was expected")]
    EmptyResponse,

    /// Input rejected locally before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation requires an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl ApiError {
    /// Build a terminal-status error from a response's parts.
    #[must_use]
    pub fn from_status(status: StatusCode, body: Option<serde_json::Value>) -> Self {
        Self::Status {
            status,
            status_text: status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string(),
            body,
        }
    }

    /// Whether this is a terminal 401 outcome.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Status {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

/// Errors from the session itself (login/refresh exchanges, storage).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport failure during a token exchange.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service rejected the exchange.
    #[error("authentication failed: {0}")]
    Rejected(String),

    /// No refresh credential is available to exchange.
    #[error("no credential to refresh")]
    NoCredential,

    /// The session was torn down while the exchange was in flight.
    #[error("session cleared during exchange")]
    SessionCleared,
}

/// Local persistence failures.
///
/// Callers treat these as soft: a corrupt or unreadable snapshot reads as
/// absence, and failed writes are logged, not propagated.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, None);
        assert_eq!(err.to_string(), "API error: 404 Not Found");
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, None).is_unauthorized());
        assert!(!ApiError::from_status(StatusCode::FORBIDDEN, None).is_unauthorized());
        assert!(!ApiError::NotAuthenticated.is_unauthorized());
    }

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::Rejected("bad signature".into());
        assert_eq!(err.to_string(), "authentication failed: bad signature");
    }
}
