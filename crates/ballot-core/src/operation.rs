//! GraphQL operations and responses.
//!
//! The pipeline never looks inside a document or its data; it only needs
//! the operation name (for the public allowlist) and the error list (for
//! classification).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, InvalidInputError};

/// An outbound GraphQL operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    #[serde(rename = "operationName")]
    name: String,
    query: String,
    variables: Value,
}

impl Operation {
    /// Create an operation with no variables.
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: document.into(),
            variables: Value::Object(Default::default()),
        }
    }

    /// Attach variables. Must serialize to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if `variables` does not serialize to an object.
    pub fn with_variables<V: Serialize>(mut self, variables: &V) -> Result<Self, Error> {
        let value = serde_json::to_value(variables).map_err(|e| InvalidInputError::Variables {
            reason: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(InvalidInputError::Variables {
                reason: "variables must be a JSON object".to_string(),
            }
            .into());
        }
        self.variables = value;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &str {
        &self.query
    }

    pub fn variables(&self) -> &Value {
        &self.variables
    }
}

/// A completed GraphQL response.
///
/// GraphQL reports most failures in-band with a 2xx status, so a response
/// can carry both `data` and `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The value of a top-level field in `data`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(name))
    }

    /// Deserialize a top-level field of `data`.
    ///
    /// Returns `None` when the field is absent, null, or has the wrong shape.
    pub fn field_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.field(name)
            .filter(|value| !value.is_null())
            .and_then(|value| T::deserialize(value).ok())
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ErrorExtensions>,
}

impl GraphQlError {
    /// The machine-readable error code, if the server sent one.
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }
}

/// The `extensions` object of a GraphQL error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_serializes_as_graphql_request() {
        let op = Operation::new("getElection", "query getElection($electionId: String!) { x }")
            .with_variables(&json!({ "electionId": "e1" }))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "operationName": "getElection",
                "query": "query getElection($electionId: String!) { x }",
                "variables": { "electionId": "e1" }
            })
        );
    }

    #[test]
    fn non_object_variables_rejected() {
        let result = Operation::new("x", "query x { y }").with_variables(&json!([1, 2]));
        assert!(result.is_err());
    }

    #[test]
    fn response_parses_errors_with_code() {
        let response: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{
                "message": "Unauthorized",
                "extensions": { "code": "UNAUTHENTICATED" }
            }]
        }))
        .unwrap();

        assert!(!response.is_ok());
        assert_eq!(response.errors[0].code(), Some("UNAUTHENTICATED"));
    }

    #[test]
    fn field_as_rejects_null() {
        let response = GraphQlResponse {
            data: Some(json!({ "checkCode": null })),
            errors: vec![],
        };
        assert!(response.field_as::<Value>("checkCode").is_none());
    }
}
