//! Error types for the ballot client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, input validation and storage errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for ballot operations.
///
/// Callers can match on the variant to decide whether a failure is worth
/// retrying (transport), needs a new login (auth), or should be shown to
/// the user as-is (protocol).
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (rejected credentials, failed refresh).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-2xx responses, malformed payloads).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (invalid URL, malformed variables).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Session persistence errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns true if this error came from the refresh exchange itself.
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, Error::Auth(AuthError::RefreshFailed { .. }))
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login was rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No session is active and the operation is not public.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The session holds no refresh token.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh exchange failed; the session cannot be recovered.
    #[error("session refresh failed: {reason}")]
    RefreshFailed { reason: String },

    /// The backend rejected the call again after a refresh.
    #[error("session expired")]
    SessionExpired,

    /// The session was torn down while the call was waiting.
    #[error("session terminated")]
    SessionTerminated,
}

/// Protocol-level errors from API responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the response body (GraphQL `extensions.code`).
    pub code: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Check if the transport status alone marks this as an auth failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid operation variables.
    #[error("invalid variables: {reason}")]
    Variables { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The persisted record could not be parsed.
    #[error("corrupt session record: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_code_and_message() {
        let err = ProtocolError::new(
            400,
            Some("BAD_USER_INPUT".to_string()),
            Some("name is required".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 400 [BAD_USER_INPUT]: name is required");
    }

    #[test]
    fn protocol_error_display_status_only() {
        let err = ProtocolError::new(503, None, None);
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[test]
    fn refresh_failure_is_detected() {
        let err: Error = AuthError::RefreshFailed {
            reason: "network".to_string(),
        }
        .into();
        assert!(err.is_refresh_failure());
        assert!(!Error::from(AuthError::SessionExpired).is_refresh_failure());
    }
}
