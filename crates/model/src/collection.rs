//! Ordered, shared sequences of records plus the parsers that build them.
//!
//! A [`Collection`] is a handle: clones share the same element list, so an
//! element appended through one handle (for example by an association's
//! `create`) is visible through every other.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::errors::{ResourceError, Result};
use crate::lock;
use crate::record::Record;
use crate::types::{Envelope, Params, Payload};

// ---------------------------------------------------------------------------
// Collection parsers
// ---------------------------------------------------------------------------

/// Elements and metadata extracted from a collection response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionData {
    /// Raw element objects, wire-keyed.
    pub elements: Vec<Value>,
    /// Metadata that accompanied the elements.
    pub metadata: Params,
}

/// Pulls the element sequence out of a collection response.
pub trait CollectionParser: Send + Sync + std::fmt::Debug {
    /// Extracts elements and metadata.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if the payload holds no element sequence.
    fn parse(&self, envelope: Envelope) -> Result<CollectionData>;
}

fn envelope_metadata(metadata: Value) -> Params {
    match metadata {
        Value::Object(map) => map,
        Value::Array(items) if items.is_empty() => Params::new(),
        Value::Null => Params::new(),
        other => {
            let mut map = Params::new();
            map.insert("metadata".to_string(), other);
            map
        }
    }
}

/// The payload itself is the element sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayCollectionParser;

impl CollectionParser for ArrayCollectionParser {
    fn parse(&self, envelope: Envelope) -> Result<CollectionData> {
        match envelope.data {
            Payload::Many(elements) => Ok(CollectionData {
                elements,
                metadata: envelope_metadata(envelope.metadata),
            }),
            _ => Err(ResourceError::parser(
                "Collection elements should be an Array.",
            )),
        }
    }
}

/// The elements live under one key of an object payload; every other
/// top-level key becomes collection metadata.
///
/// `{"users": [..], "total": 12}` with key `users` yields the users and
/// `{"total": 12}`.
#[derive(Debug, Clone)]
pub struct KeyedCollectionParser {
    key: String,
}

impl KeyedCollectionParser {
    /// Creates a parser reading elements from `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The element key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl CollectionParser for KeyedCollectionParser {
    fn parse(&self, envelope: Envelope) -> Result<CollectionData> {
        let Payload::Single(mut object) = envelope.data else {
            return Err(ResourceError::parser(format!(
                "expected an object holding '{}', got {}",
                self.key,
                envelope.data.shape()
            )));
        };
        let elements = match object.remove(&self.key) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ResourceError::parser(
                    "Collection elements should be an Array.",
                ))
            }
        };
        let mut metadata = envelope_metadata(envelope.metadata);
        metadata.extend(object);
        Ok(CollectionData { elements, metadata })
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CollectionState {
    elements: Vec<Record>,
    metadata: Params,
}

/// Ordered sequence of records with attached metadata.
#[derive(Clone, Default)]
pub struct Collection {
    inner: Arc<Mutex<CollectionState>>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `records`.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::with_metadata(records, Params::new())
    }

    /// Creates a collection holding `records` and `metadata`.
    pub fn with_metadata(records: Vec<Record>, metadata: Params) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectionState {
                elements: records,
                metadata,
            })),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        lock(&self.inner).elements.len()
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).elements.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<Record> {
        lock(&self.inner).elements.get(index).cloned()
    }

    /// First element.
    pub fn first(&self) -> Option<Record> {
        self.get(0)
    }

    /// Last element.
    pub fn last(&self) -> Option<Record> {
        lock(&self.inner).elements.last().cloned()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Record> {
        lock(&self.inner).elements.clone()
    }

    /// Iterates over a snapshot of the elements.
    pub fn iter(&self) -> std::vec::IntoIter<Record> {
        self.to_vec().into_iter()
    }

    /// Appends a record; visible through every handle.
    pub fn push(&self, record: Record) {
        lock(&self.inner).elements.push(record);
    }

    /// Maps every element to a value.
    pub fn map<T>(&self, f: impl FnMut(Record) -> T) -> Vec<T> {
        self.iter().map(f).collect()
    }

    /// Replaces every element with the result of `f`.
    pub fn map_in_place(&self, f: impl FnMut(Record) -> Record) {
        let elements = std::mem::take(&mut lock(&self.inner).elements);
        let mapped: Vec<Record> = elements.into_iter().map(f).collect();
        lock(&self.inner).elements = mapped;
    }

    /// Metadata sent alongside the elements.
    pub fn metadata(&self) -> Params {
        lock(&self.inner).metadata.clone()
    }

    /// Returns `true` if both handles share the same element list.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Logical JSON for every element.
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(|record| record.to_json()).collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (elements, metadata) = {
            let state = lock(&self.inner);
            (state.elements.clone(), state.metadata.clone())
        };
        f.debug_struct("Collection")
            .field("elements", &elements)
            .field("metadata", &metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_parser_rejects_non_sequences() {
        let mut object = Params::new();
        object.insert("id".into(), json!(1));
        let err = ArrayCollectionParser
            .parse(Envelope::new(Payload::Single(object)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parser error: Collection elements should be an Array."
        );
        assert!(ArrayCollectionParser
            .parse(Envelope::new(Payload::Empty))
            .is_err());
    }

    #[test]
    fn array_parser_keeps_envelope_metadata() {
        let mut envelope = Envelope::new(Payload::Many(vec![]));
        envelope.metadata = json!({"page": 1});
        let data = ArrayCollectionParser.parse(envelope).unwrap();
        assert!(data.elements.is_empty());
        assert_eq!(Value::Object(data.metadata), json!({"page": 1}));
    }

    #[test]
    fn keyed_parser_splits_elements_and_metadata() {
        let Value::Object(object) = json!({"users": [{"id": 1}], "total": 12}) else {
            unreachable!()
        };
        let data = KeyedCollectionParser::new("users")
            .parse(Envelope::new(Payload::Single(object)))
            .unwrap();
        assert_eq!(data.elements, vec![json!({"id": 1})]);
        assert_eq!(Value::Object(data.metadata), json!({"total": 12}));
    }

    #[test]
    fn keyed_parser_requires_an_array_under_the_key() {
        let Value::Object(object) = json!({"users": {"id": 1}}) else {
            unreachable!()
        };
        let err = KeyedCollectionParser::new("users")
            .parse(Envelope::new(Payload::Single(object)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parser error: Collection elements should be an Array."
        );
    }
}
