//! GraphQL envelope handling
//!
//! A GraphQL call usually answers `200 OK` even when the operation failed;
//! the failure travels in a top-level `errors` array. That array is copied to
//! the context's error channel so steps can assert on it separately from the
//! body.

use serde::{Deserialize, Serialize};

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphqlError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

/// Serialized `errors` array of `body`, if it has a non-empty one
///
/// Anything that is not a GraphQL envelope yields `None`.
pub fn extract_errors(body: &[u8]) -> Option<Vec<u8>> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "response is not a GraphQL envelope");
            return None;
        }
    };
    if envelope.errors.is_empty() {
        return None;
    }
    serde_json::to_vec(&envelope.errors).ok()
}

/// JSON payload for a GraphQL POST
#[derive(Serialize)]
pub struct GraphqlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: &'a V,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_messages_only() {
        let body = br#"{"data":null,"errors":[{"message":"not found","path":["user"]}]}"#;
        let errors = extract_errors(body).unwrap();
        assert_eq!(errors, br#"[{"message":"not found"}]"#.to_vec());
    }

    #[test]
    fn test_no_errors_key_or_empty_array() {
        assert_eq!(extract_errors(br#"{"data":{"id":1}}"#), None);
        assert_eq!(extract_errors(br#"{"data":null,"errors":[]}"#), None);
    }

    #[test]
    fn test_non_envelope_bodies_are_ignored() {
        assert_eq!(extract_errors(b"<html>oops</html>"), None);
        assert_eq!(extract_errors(br#"[1,2]"#), None);
        assert_eq!(extract_errors(br#"{"errors":"boom"}"#), None);
    }

    #[test]
    fn test_request_payload_shape() {
        let vars = serde_json::json!({"id": 1});
        let payload = GraphqlRequest {
            query: "query { me { id } }",
            variables: &vars,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"query":"query { me { id } }","variables":{"id":1}}"#
        );
    }
}
