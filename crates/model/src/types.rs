//! Shared value types: HTTP verbs, parameter maps, the normalized response
//! envelope and sort keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter and attribute map as carried on the wire or in a record.
///
/// Insertion order is preserved so request bodies and query strings are
/// deterministic.
pub type Params = Map<String, Value>;

// ---------------------------------------------------------------------------
// HTTP verbs
// ---------------------------------------------------------------------------

/// The HTTP verbs a resource class can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`; parameters travel as a query string.
    Get,
    /// `POST`; parameters travel as the request body.
    Post,
    /// `PUT`; parameters travel as the request body.
    Put,
    /// `PATCH`; parameters travel as the request body.
    Patch,
    /// `DELETE`; parameters travel as the request body.
    Delete,
}

impl Method {
    /// Upper-case verb name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` if parameters are sent as a query string.
    pub fn uses_query(self) -> bool {
        self == Self::Get
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The data portion of a parsed response, tagged by shape.
///
/// Produced by the envelope parser so that record/collection decisions never
/// have to sniff JSON types.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// One resource object.
    Single(Params),
    /// A sequence of resource objects.
    Many(Vec<Value>),
    /// No body (e.g. `204 No Content`).
    Empty,
}

impl Payload {
    /// Returns `true` for [`Payload::Many`].
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Short name of the shape, for logs and parser errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Single(_) => "object",
            Self::Many(_) => "array",
            Self::Empty => "empty",
        }
    }
}

/// Normalized `{data, errors, metadata}` response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The resource payload.
    pub data: Payload,
    /// Server-provided errors; an empty object when none were sent.
    pub errors: Value,
    /// Server-provided metadata; an empty array when none was sent.
    pub metadata: Value,
}

impl Envelope {
    /// Creates an envelope with empty errors and metadata.
    pub fn new(data: Payload) -> Self {
        Self {
            data,
            errors: Value::Object(Map::new()),
            metadata: Value::Array(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// How a class's responses are turned into records or collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Decided per response: sequences become collections, objects records.
    #[default]
    Auto,
    /// Every generic response is an array-of-resources collection.
    Array,
    /// Every generic response is a JSON:API-like document holding a collection.
    JsonApi,
}

impl ResponseShape {
    /// Returns `true` if generic requests always build a collection.
    pub fn forces_collection(self) -> bool {
        !matches!(self, Self::Auto)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Sort direction for an ordered association fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Lower-case suffix used in sort tokens.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One sort field with its direction. A bare field name sorts ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Logical attribute name.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

impl SortKey {
    /// Creates a sort key.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl From<&str> for SortKey {
    fn from(field: &str) -> Self {
        Self::new(field, Direction::Asc)
    }
}

impl From<String> for SortKey {
    fn from(field: String) -> Self {
        Self::new(field, Direction::Asc)
    }
}

impl<S: Into<String>> From<(S, Direction)> for SortKey {
    fn from((field, direction): (S, Direction)) -> Self {
        Self::new(field, direction)
    }
}

/// Returns `true` for values the resolver treats as "no value": `null`, empty
/// strings (after trimming), empty arrays and empty objects.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_get_uses_query() {
        assert!(Method::Get.uses_query());
        for m in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
            assert!(!m.uses_query(), "{m}");
        }
    }

    #[test]
    fn bare_sort_field_is_ascending() {
        let key = SortKey::from("name");
        assert_eq!(key.direction, Direction::Asc);
        let key = SortKey::from(("created_at", Direction::Desc));
        assert_eq!(key.field, "created_at");
        assert_eq!(key.direction, Direction::Desc);
    }

    #[test]
    fn blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!(" ")));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!({})));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
        assert!(!is_blank(&json!("3")));
    }
}
