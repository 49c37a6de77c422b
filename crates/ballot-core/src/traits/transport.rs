//! Outbound transport trait.

use async_trait::async_trait;

use crate::operation::{GraphQlResponse, Operation};
use crate::tokens::AccessToken;
use crate::Result;

/// Sends one operation to the remote API.
///
/// Implementations attach `bearer` as the `authorization` header when given
/// and must not add credentials of their own. A 2xx response is returned as
/// `Ok` even if it carries GraphQL errors; anything else is an `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<&AccessToken>,
    ) -> Result<GraphQlResponse>;
}
