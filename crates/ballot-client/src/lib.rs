//! ballot-client - Authenticated request pipeline for the ballot election API.
//!
//! Every outbound GraphQL operation goes through [`AuthClient::dispatch`],
//! which attaches the session's bearer token, refreshes the session when it
//! has expired or been rejected (at most one refresh in flight at a time),
//! retries the operation once, and tears the session down when nothing
//! else helps.

pub mod classifier;
pub mod config;
mod dispatcher;
pub mod graphql;
pub mod refresh;
pub mod store;
pub mod teardown;

pub use classifier::{Classification, ErrorClassifier};
pub use config::ClientConfig;
pub use dispatcher::{AuthClient, AuthClientBuilder, LogRedirect};
pub use graphql::GraphQlClient;
pub use refresh::{RefreshCoordinator, RefreshTicket, TicketState};
pub use store::{MemoryPersistence, SessionStore};
pub use teardown::SessionTeardown;
