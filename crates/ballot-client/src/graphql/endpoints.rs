//! Session operations and their payload types.

use serde::{Deserialize, Serialize};

use ballot_core::{AccessToken, GraphQlResponse, Operation, RefreshToken, Result};

/// Operation name of the login mutation.
pub const LOGIN: &str = "login";

/// Operation name of the refresh mutation.
pub const REFRESH_TOKEN: &str = "refreshToken";

const LOGIN_DOCUMENT: &str = "mutation login($input: AccountLoginInput!) {
  login(input: $input) {
    accessToken
    refreshToken
  }
}";

const REFRESH_TOKEN_DOCUMENT: &str = "mutation refreshToken($input: RefreshTokenInput!) {
  refreshToken(input: $input) {
    accessToken
    refreshToken
  }
}";

#[derive(Debug, Serialize)]
struct Input<T> {
    input: T,
}

#[derive(Debug, Serialize)]
struct LoginInput<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenInput<'a> {
    email: &'a str,
    refresh_token: &'a str,
}

pub(crate) fn login_operation(email: &str, password: &str) -> Result<Operation> {
    Operation::new(LOGIN, LOGIN_DOCUMENT).with_variables(&Input {
        input: LoginInput { email, password },
    })
}

pub(crate) fn refresh_operation(email: &str, refresh_token: &RefreshToken) -> Result<Operation> {
    Operation::new(REFRESH_TOKEN, REFRESH_TOKEN_DOCUMENT).with_variables(&Input {
        input: RefreshTokenInput {
            email,
            refresh_token: refresh_token.as_str(),
        },
    })
}

/// The token pair returned by both `login` and `refreshToken`.
///
/// Both fields are required; a payload missing either one, or carrying an
/// empty string, is rejected.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenPair {
    access_token: String,
    refresh_token: String,
}

impl TokenPair {
    /// Extract the pair from the named field of `response`.
    pub(crate) fn from_response(response: &GraphQlResponse, field: &str) -> Option<Self> {
        if !response.is_ok() {
            return None;
        }
        response
            .field_as::<TokenPair>(field)
            .filter(|pair| !pair.access_token.is_empty() && !pair.refresh_token.is_empty())
    }

    pub(crate) fn into_tokens(self) -> (AccessToken, RefreshToken) {
        (
            AccessToken::new(self.access_token),
            RefreshToken::new(self.refresh_token),
        )
    }
}
