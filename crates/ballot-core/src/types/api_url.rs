//! API base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated base URL for the election API.
///
/// Remote URLs must use HTTPS; plain HTTP is accepted only for localhost so
/// tests and local backends work without TLS.
///
/// # Example
///
/// ```
/// use ballot_core::ApiUrl;
///
/// let api = ApiUrl::new("https://api.example.com").unwrap();
/// assert_eq!(api.graphql_url(), "https://api.example.com/graphql");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

impl ApiUrl {
    /// Parse and validate a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::ApiUrl`] if `s` is not an absolute
    /// URL with a host, or uses plain HTTP for a non-loopback host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let reject = |reason: &str| -> Error {
            InvalidInputError::ApiUrl {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let url = Url::parse(s).map_err(|e| reject(&e.to_string()))?;
        let Some(host) = url.host_str() else {
            return Err(reject("must be an absolute URL with a host"));
        };

        match url.scheme() {
            "https" => {}
            "http" if LOOPBACK_HOSTS.contains(&host) => {}
            _ => return Err(reject("must use HTTPS (HTTP allowed only for localhost)")),
        }

        Ok(Self(url))
    }

    /// The GraphQL endpoint, `<base>/graphql`.
    pub fn graphql_url(&self) -> String {
        // Url always renders a root path as "/", so trim before joining.
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/graphql", base)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
