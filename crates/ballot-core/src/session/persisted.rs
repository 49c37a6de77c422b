//! Flat on-disk layout of a session.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::tokens::{AccessToken, RefreshToken};

use super::{Session, SessionMode};

/// The persisted form of a [`Session`].
///
/// `expiresAt` is an RFC 3339 / ISO-8601 string so the record stays readable
/// by tooling that does not know about chrono.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub mode: SessionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            mode: session.mode,
            identity: session.identity.clone(),
            access_token: session.access_token.as_ref().map(|t| t.as_str().to_string()),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.as_str().to_string()),
            expires_at: session
                .expires_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl PersistedSession {
    /// Rebuild the in-memory session.
    ///
    /// A record that claims to be authenticated but has no access token is
    /// restored as unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if `expiresAt` is not a valid timestamp.
    pub fn into_session(self) -> Result<Session, StorageError> {
        let expires_at = self
            .expires_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StorageError::Corrupt {
                        message: format!("expiresAt '{}': {}", raw, e),
                    })
            })
            .transpose()?;

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new);

        let session = match self.mode {
            SessionMode::Unauthenticated => Session::unauthenticated(),
            SessionMode::Guest => Session::guest(),
            SessionMode::Authenticated if access_token.is_none() => Session::unauthenticated(),
            SessionMode::Authenticated => Session {
                mode: SessionMode::Authenticated,
                identity: self.identity,
                access_token,
                refresh_token: self
                    .refresh_token
                    .filter(|t| !t.is_empty())
                    .map(RefreshToken::new),
                expires_at,
            },
        };

        Ok(session)
    }
}

impl fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSession")
            .field("mode", &self.mode)
            .field("identity", &self.identity)
            .field("tokens", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
