//! GraphQL HTTP client implementation.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, trace};

use ballot_core::error::{Error, InvalidInputError, ProtocolError, TransportError};
use ballot_core::{AccessToken, ApiUrl, GraphQlResponse, Operation, Result, Transport};

/// HTTP client for GraphQL requests.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    client: reqwest::Client,
    api: ApiUrl,
    endpoint: String,
}

pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout { duration_ms: 0 }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

impl GraphQlClient {
    /// Create a new client for the given API.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the TLS backend cannot be initialised.
    pub fn new(api: ApiUrl) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ballot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest)?;

        let endpoint = api.graphql_url();
        Ok(Self {
            client,
            api,
            endpoint,
        })
    }

    /// Returns the API URL this client is configured for.
    pub fn api_url(&self) -> &ApiUrl {
        &self.api
    }

    /// Create request headers, with the bearer credential if one is given.
    fn headers(&self, bearer: Option<&AccessToken>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
                InvalidInputError::Other {
                    message: "access token contains invalid header characters".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Handle a GraphQL response, parsing the body or error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<GraphQlResponse> {
        let status = response.status();
        trace!(status = %status, "GraphQL response");

        if status.is_success() {
            response.json::<GraphQlResponse>().await.map_err(|e| {
                Error::Protocol(ProtocolError::new(
                    status.as_u16(),
                    None,
                    Some(format!("malformed response body: {}", e)),
                ))
            })
        } else {
            Err(Error::Protocol(self.parse_error_response(response).await))
        }
    }

    /// Parse a non-2xx response, keeping the first GraphQL error if present.
    async fn parse_error_response(&self, response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<GraphQlResponse>().await {
            Ok(body) => match body.errors.into_iter().next() {
                Some(first) => {
                    let code = first.code().map(str::to_string);
                    ProtocolError::new(status, code, Some(first.message))
                }
                None => ProtocolError::new(status, None, None),
            },
            Err(_) => ProtocolError::new(status, None, None),
        }
    }
}

#[async_trait]
impl Transport for GraphQlClient {
    #[instrument(skip(self, operation, bearer), fields(api = %self.api, operation = %operation.name()))]
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<&AccessToken>,
    ) -> Result<GraphQlResponse> {
        debug!(authenticated = bearer.is_some(), "GraphQL request");
        trace!(variables = %operation.variables(), "operation variables");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(bearer)?)
            .json(operation)
            .send()
            .await
            .map_err(map_reqwest)?;

        self.handle_response(response).await
    }
}
