//! Envelope parsers: raw response body → `{data, errors, metadata}`.
//!
//! A parser decides the [`Payload`] variant once, per response. Everything
//! downstream matches on that tag instead of inspecting JSON types.

use serde_json::{Map, Value};

use crate::errors::{ResourceError, Result};
use crate::transport::TransportResponse;
use crate::types::{Envelope, Params, Payload};

/// Turns a raw transport response into an [`Envelope`].
pub trait EnvelopeParser: Send + Sync + std::fmt::Debug {
    /// Parses a successful response.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if the body is not in the expected format.
    fn parse(&self, response: &TransportResponse) -> Result<Envelope>;
}

fn parse_json(body: &str) -> Result<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| ResourceError::parser(format!("invalid JSON body: {e}")))
}

// ---------------------------------------------------------------------------
// Plain JSON
// ---------------------------------------------------------------------------

/// Default parser for plain JSON APIs.
///
/// - object → `errors` and `metadata` keys are split off, the rest is
///   [`Payload::Single`];
/// - array → [`Payload::Many`];
/// - empty body → [`Payload::Empty`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl EnvelopeParser for JsonParser {
    fn parse(&self, response: &TransportResponse) -> Result<Envelope> {
        let Some(json) = parse_json(&response.body)? else {
            return Ok(Envelope::new(Payload::Empty));
        };
        match json {
            Value::Object(mut object) => {
                let errors = object
                    .remove("errors")
                    .unwrap_or_else(|| Value::Object(Map::new()));
                let metadata = object
                    .remove("metadata")
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                Ok(Envelope {
                    data: Payload::Single(object),
                    errors,
                    metadata,
                })
            }
            Value::Array(items) => Ok(Envelope::new(Payload::Many(items))),
            other => Err(ResourceError::parser(format!(
                "expected a JSON object or array, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON:API-like
// ---------------------------------------------------------------------------

/// Parser for JSON:API-like documents.
///
/// Resource objects (`{"id", "type", "attributes", "relationships"}`) are
/// flattened into plain objects: `id` plus every attribute, plus one key per
/// relationship holding its `data` linkage. `meta` becomes metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiParser;

impl JsonApiParser {
    fn flatten(resource: Value) -> Value {
        let Value::Object(mut object) = resource else {
            return resource;
        };
        let mut flat = Params::new();
        if let Some(id) = object.remove("id") {
            flat.insert("id".to_string(), id);
        }
        if let Some(Value::Object(attributes)) = object.remove("attributes") {
            flat.extend(attributes);
        }
        if let Some(Value::Object(relationships)) = object.remove("relationships") {
            for (name, relationship) in relationships {
                if let Some(data) = relationship.get("data") {
                    let linked = match data {
                        Value::Array(items) => {
                            Value::Array(items.iter().cloned().map(Self::flatten).collect())
                        }
                        other => Self::flatten(other.clone()),
                    };
                    flat.insert(name, linked);
                }
            }
        }
        Value::Object(flat)
    }
}

impl EnvelopeParser for JsonApiParser {
    fn parse(&self, response: &TransportResponse) -> Result<Envelope> {
        let Some(json) = parse_json(&response.body)? else {
            return Ok(Envelope::new(Payload::Empty));
        };
        let Value::Object(mut document) = json else {
            return Err(ResourceError::parser("JSON:API document must be an object"));
        };
        let data = match document.remove("data") {
            Some(Value::Array(items)) => {
                Payload::Many(items.into_iter().map(Self::flatten).collect())
            }
            Some(resource @ Value::Object(_)) => match Self::flatten(resource) {
                Value::Object(flat) => Payload::Single(flat),
                _ => Payload::Empty,
            },
            Some(Value::Null) | None => Payload::Empty,
            Some(other) => {
                return Err(ResourceError::parser(format!(
                    "JSON:API data must be an object or array, got {other}"
                )))
            }
        };
        Ok(Envelope {
            data,
            errors: document
                .remove("errors")
                .unwrap_or_else(|| Value::Object(Map::new())),
            metadata: document
                .remove("meta")
                .unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> TransportResponse {
        TransportResponse::new(200, body.to_string())
    }

    #[test]
    fn json_object_splits_errors_and_metadata() {
        let envelope = JsonParser
            .parse(&response(json!({"id": 1, "name": "Tobias", "metadata": {"page": 2}})))
            .unwrap();
        assert_eq!(envelope.metadata, json!({"page": 2}));
        assert_eq!(envelope.errors, json!({}));
        let Payload::Single(data) = envelope.data else {
            panic!("expected single payload");
        };
        assert_eq!(Value::Object(data), json!({"id": 1, "name": "Tobias"}));
    }

    #[test]
    fn json_array_is_many_and_empty_body_is_empty() {
        let envelope = JsonParser.parse(&response(json!([{"id": 1}]))).unwrap();
        assert!(envelope.data.is_many());
        assert_eq!(envelope.metadata, json!([]));
        let envelope = JsonParser.parse(&TransportResponse::new(204, "")).unwrap();
        assert_eq!(envelope.data, Payload::Empty);
    }

    #[test]
    fn invalid_json_is_a_parser_error() {
        let err = JsonParser.parse(&TransportResponse::new(200, "<html>")).unwrap_err();
        assert!(matches!(err, ResourceError::Parser { .. }));
        let err = JsonParser.parse(&response(json!("text"))).unwrap_err();
        assert!(matches!(err, ResourceError::Parser { .. }));
    }

    #[test]
    fn json_api_documents_are_flattened() {
        let body = json!({
            "data": [{
                "id": "1",
                "type": "users",
                "attributes": {"name": "Lindsay"},
                "relationships": {"organization": {"data": {"id": "9", "type": "organizations"}}}
            }],
            "meta": {"total": 1}
        });
        let envelope = JsonApiParser.parse(&response(body)).unwrap();
        assert_eq!(envelope.metadata, json!({"total": 1}));
        assert_eq!(
            envelope.data,
            Payload::Many(vec![json!({"id": "1", "name": "Lindsay", "organization": {"id": "9"}})])
        );
    }
}
