//! The process-wide authentication state.
//!
//! A [`Session`] is an immutable snapshot. Changes are described by a
//! [`SessionUpdate`] and applied as a whole, so a reader never sees a new
//! access token paired with the old expiry.

mod persisted;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::{AccessToken, RefreshToken};

pub use persisted::PersistedSession;

/// How the current process is authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// No session; only public operations may be dispatched.
    #[default]
    Unauthenticated,
    /// Anonymous ballot redemption. Never refreshed, never redirected.
    Guest,
    /// Logged-in administrator.
    Authenticated,
}

/// A snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    mode: SessionMode,
    identity: Option<String>,
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The empty session.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// A guest session carrying no credentials.
    pub fn guest() -> Self {
        Self {
            mode: SessionMode::Guest,
            ..Self::default()
        }
    }

    /// A freshly logged-in session.
    pub fn authenticated(
        identity: impl Into<String>,
        access_token: AccessToken,
        refresh_token: RefreshToken,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mode: SessionMode::Authenticated,
            identity: Some(identity.into()),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            expires_at: Some(expires_at),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The login identity (account email), used by the refresh exchange.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_guest(&self) -> bool {
        self.mode == SessionMode::Guest
    }

    pub fn is_authenticated(&self) -> bool {
        self.mode == SessionMode::Authenticated
    }

    /// Returns true if the expiry hint is known and not after `now`.
    ///
    /// An absent hint never counts as expired; the reactive path covers it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// The credential to attach to an outbound call, if any.
    ///
    /// Only authenticated sessions with a non-empty token yield one.
    pub fn bearer(&self) -> Option<&AccessToken> {
        if self.mode != SessionMode::Authenticated {
            return None;
        }
        self.access_token.as_ref().filter(|token| !token.is_empty())
    }

    /// Returns a copy with every field in `update` applied.
    pub fn apply(&self, update: SessionUpdate) -> Session {
        let mut next = self.clone();
        if let Some(mode) = update.mode {
            next.mode = mode;
        }
        if let Some(identity) = update.identity {
            next.identity = Some(identity);
        }
        if let Some(access_token) = update.access_token {
            next.access_token = Some(access_token);
        }
        if let Some(refresh_token) = update.refresh_token {
            next.refresh_token = Some(refresh_token);
        }
        if let Some(expires_at) = update.expires_at {
            next.expires_at = Some(expires_at);
        }
        next
    }
}

/// A partial change to a [`Session`]. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    mode: Option<SessionMode>,
    identity: Option<String>,
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The update written after a successful refresh exchange.
    pub fn refreshed(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self::new()
            .access_token(access_token)
            .refresh_token(refresh_token)
            .expires_at(expires_at)
    }

    pub fn mode(mut self, mode: SessionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn refresh_token(mut self, token: RefreshToken) -> Self {
        self.refresh_token = Some(token);
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
