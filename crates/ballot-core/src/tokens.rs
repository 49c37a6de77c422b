//! Opaque session credentials.
//!
//! Both token types redact their value in `Debug` output, so a session can
//! be logged or traced without leaking credentials. Read the raw value with
//! `as_str` only to build a request or persist the session.

use std::fmt;

macro_rules! secret_token {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn new(token: impl Into<String>) -> Self {
                Self(token.into())
            }

            /// The raw token value.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(<redacted>)"))
            }
        }
    };
}

secret_token! {
    /// Short-lived credential sent as a bearer `authorization` header on
    /// business operations.
    AccessToken
}

secret_token! {
    /// Longer-lived credential exchanged for a new token pair.
    ///
    /// Rotates on every successful refresh; presenting one that has already
    /// been exchanged is rejected by the backend.
    RefreshToken
}

impl AccessToken {
    /// The `authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}
