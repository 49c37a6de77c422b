//! Decides whether a completed call says anything about the session.

use ballot_core::error::{AuthError, Error};
use ballot_core::{GraphQlError, GraphQlResponse};

/// The GraphQL error code servers use for a missing or rejected credential.
pub const UNAUTHENTICATED_CODE: &str = "UNAUTHENTICATED";

/// Outcome of classifying one completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No errors.
    Ok,
    /// The session was rejected; refresh and retry.
    AuthExpired,
    /// The refresh itself failed; only a new login helps.
    AuthInvalid,
    /// Anything else. Surfaced to the caller untouched.
    OtherError,
}

/// Classifies responses using an explicit code, a status, or message keywords.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    keywords: Vec<String>,
}

impl ErrorClassifier {
    /// Create a classifier matching `keywords` case-insensitively.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn classify(&self, outcome: &Result<GraphQlResponse, Error>) -> Classification {
        match outcome {
            Ok(response) => self.classify_response(response),
            Err(err) => self.classify_error(err),
        }
    }

    pub fn classify_response(&self, response: &GraphQlResponse) -> Classification {
        if response.is_ok() {
            Classification::Ok
        } else if response.errors.iter().any(|e| self.is_auth_error(e)) {
            Classification::AuthExpired
        } else {
            Classification::OtherError
        }
    }

    pub fn classify_error(&self, err: &Error) -> Classification {
        match err {
            Error::Auth(AuthError::RefreshFailed { .. }) => Classification::AuthInvalid,
            Error::Protocol(p) => {
                let code_matches = p.code.as_deref() == Some(UNAUTHENTICATED_CODE);
                let message_matches = p
                    .message
                    .as_deref()
                    .is_some_and(|m| self.matches_keyword(m));
                if p.is_unauthorized() || code_matches || message_matches {
                    Classification::AuthExpired
                } else {
                    Classification::OtherError
                }
            }
            _ => Classification::OtherError,
        }
    }

    fn is_auth_error(&self, error: &GraphQlError) -> bool {
        error.code() == Some(UNAUTHENTICATED_CODE) || self.matches_keyword(&error.message)
    }

    fn matches_keyword(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }
}
