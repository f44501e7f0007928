//! Turning envelopes into records and collections.
//!
//! Wire keys are translated to logical names and association data found
//! inline in a payload is instantiated through the target class before the
//! record is handed out.

use serde_json::Value;

use crate::collection::{Collection, CollectionData};
use crate::errors::{ResourceError, Result};
use crate::model::{Model, Resource};
use crate::record::Record;
use crate::types::{Envelope, Params, Payload};

impl Model {
    /// Builds a record from a wire-keyed object.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if inline association data has the wrong
    /// shape.
    pub fn instantiate(&self, wire: Params) -> Result<Record> {
        let record = Record::new(self.clone());
        record.merge_wire(wire)?;
        Ok(record)
    }

    /// Builds a collection from extracted elements.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if an element is not an object.
    pub fn instantiate_collection(&self, data: CollectionData) -> Result<Collection> {
        let records = data
            .elements
            .into_iter()
            .map(|element| match element {
                Value::Object(wire) => self.instantiate(wire),
                other => Err(ResourceError::parser(format!(
                    "collection element for {} should be an object, got {other}",
                    self.name()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Collection::with_metadata(records, data.metadata))
    }

    /// Builds a collection using the class's collection parser.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if the payload holds no element sequence.
    pub fn build_collection(&self, envelope: Envelope) -> Result<Collection> {
        let data = self.class().collection_parser().parse(envelope)?;
        tracing::trace!(class = %self.name(), elements = data.elements.len(), "Building collection");
        self.instantiate_collection(data)
    }

    /// Builds one record; the envelope's metadata and errors are attached.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] unless the payload is a single object.
    pub fn build_record(&self, envelope: Envelope) -> Result<Record> {
        let Payload::Single(wire) = envelope.data else {
            return Err(ResourceError::parser(format!(
                "expected a single {} object, got {}",
                self.name(),
                envelope.data.shape()
            )));
        };
        let record = self.instantiate(wire)?;
        record.set_response_extras(envelope.metadata, envelope.errors);
        Ok(record)
    }

    /// Shapes a generic response: collection for sequences (or always, when
    /// the class shape says so), record for objects, nothing for empty bodies.
    ///
    /// # Errors
    ///
    /// As [`Model::build_collection`] and [`Model::build_record`].
    pub fn build_resource_from(&self, envelope: Envelope) -> Result<Resource> {
        if envelope.data.is_many() || self.class().shape().forces_collection() {
            return self.build_collection(envelope).map(Resource::Many);
        }
        match envelope.data {
            Payload::Empty => Ok(Resource::None),
            _ => self.build_record(envelope).map(Resource::One),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::mock::MockTransport;
    use crate::{Dispatcher, ResourceClassBuilder, ResponseShape, Schema};

    fn users() -> Model {
        let dispatcher =
            Dispatcher::builder("https://api.example.com", Arc::new(MockTransport::new()))
                .build()
                .unwrap();
        Schema::builder()
            .dispatcher(Arc::new(dispatcher))
            .resource(
                ResourceClassBuilder::new("User")
                    .field("email", "EmailAddress")
                    .has_many("comments", Default::default())
                    .has_one("profile", Default::default()),
            )
            .resource(ResourceClassBuilder::new("Comment"))
            .resource(ResourceClassBuilder::new("Profile"))
            .resource(ResourceClassBuilder::new("Feed").shape(ResponseShape::Array))
            .build()
            .unwrap()
            .model("User")
            .unwrap()
    }

    fn object(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn wire_keys_become_logical_and_inline_associations_materialize() {
        let record = users()
            .instantiate(object(json!({
                "id": 1,
                "EmailAddress": "a@b.c",
                "comments": [{"id": 2, "body": "hi"}],
                "profile": {"id": 3}
            })))
            .unwrap();
        assert_eq!(record.get("email"), Some(json!("a@b.c")));
        assert!(!record.has_attribute("EmailAddress"));
        let comments = record.related_collection("comments").unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments.first().unwrap().get("body"), Some(json!("hi")));
        let profile = record.related("profile").unwrap();
        assert_eq!(profile.class_name().as_str(), "Profile");
        assert_eq!(profile.id(), Some(json!(3)));
    }

    #[test]
    fn absent_association_data_leaves_the_slot_absent() {
        let record = users().instantiate(object(json!({"id": 1}))).unwrap();
        assert!(!record.has_attribute("comments"));
        assert!(!record.has_attribute("profile"));
    }

    #[test]
    fn collection_from_object_payload_is_a_parser_error() {
        let err = users()
            .build_collection(Envelope::new(Payload::Single(object(json!({"id": 1})))))
            .unwrap_err();
        assert!(matches!(err, ResourceError::Parser { .. }));
    }

    #[test]
    fn empty_sequence_builds_an_empty_collection() {
        let collection = users()
            .build_collection(Envelope::new(Payload::Many(vec![])))
            .unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn record_from_sequence_is_a_parser_error() {
        let err = users()
            .build_record(Envelope::new(Payload::Many(vec![json!({"id": 1})])))
            .unwrap_err();
        assert!(matches!(err, ResourceError::Parser { .. }));
    }

    #[test]
    fn generic_shaping_follows_the_payload_and_class_shape() {
        let model = users();
        let one = model
            .build_resource_from(Envelope::new(Payload::Single(object(json!({"id": 1})))))
            .unwrap();
        assert!(one.as_record().is_some());
        let none = model.build_resource_from(Envelope::new(Payload::Empty)).unwrap();
        assert!(none.is_none());

        let feed = model.sibling("Feed").unwrap();
        let err = feed
            .build_resource_from(Envelope::new(Payload::Single(object(json!({"id": 1})))))
            .unwrap_err();
        assert!(matches!(err, ResourceError::Parser { .. }));
    }
}
