//! Client configuration.

use std::time::Duration;

use ballot_core::ApiUrl;

/// Lease granted to a session at login and after every refresh, in seconds.
pub const DEFAULT_SESSION_LEASE_SECS: i64 = 60 * 60;

/// Upper bound on one refresh exchange.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations that may be dispatched without a session.
pub const DEFAULT_PUBLIC_OPERATIONS: &[&str] = &["login", "refreshToken", "checkCode"];

/// Error-message keywords that mark a rejected token.
pub const DEFAULT_TOKEN_KEYWORDS: &[&str] = &["token", "jwt"];

/// Configuration for an [`AuthClient`](crate::AuthClient).
///
/// # Example
///
/// ```
/// use ballot_client::ClientConfig;
/// use ballot_core::ApiUrl;
///
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap())
///     .with_session_lease(chrono::Duration::hours(23));
/// assert_eq!(config.session_lease(), chrono::Duration::hours(23));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_url: ApiUrl,
    session_lease: chrono::Duration,
    refresh_timeout: Duration,
    public_operations: Vec<String>,
    token_keywords: Vec<String>,
}

impl ClientConfig {
    pub fn new(api_url: ApiUrl) -> Self {
        Self {
            api_url,
            session_lease: chrono::Duration::seconds(DEFAULT_SESSION_LEASE_SECS),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            public_operations: DEFAULT_PUBLIC_OPERATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            token_keywords: DEFAULT_TOKEN_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_session_lease(mut self, lease: chrono::Duration) -> Self {
        self.session_lease = lease;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Replace the public operation allowlist.
    pub fn with_public_operations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_operations = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the token keyword list used by the error classifier.
    pub fn with_token_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    pub fn session_lease(&self) -> chrono::Duration {
        self.session_lease
    }

    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    pub fn token_keywords(&self) -> &[String] {
        &self.token_keywords
    }

    /// Returns true if `operation` may run without a session.
    pub fn is_public(&self, operation: &str) -> bool {
        self.public_operations
            .iter()
            .any(|name| name.eq_ignore_ascii_case(operation))
    }
}
