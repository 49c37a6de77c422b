//! GraphQL transport and session operations.

pub mod client;
pub(crate) mod endpoints;

pub use client::GraphQlClient;
pub use endpoints::{LOGIN, REFRESH_TOKEN};
