//! ballot-core - Session types and traits for the ballot election client.

pub mod credentials;
pub mod error;
pub mod operation;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use operation::{GraphQlError, GraphQlResponse, Operation};
pub use session::{PersistedSession, Session, SessionMode, SessionUpdate};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{LoginRedirect, RedirectReason, SessionPersistence, Transport};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
