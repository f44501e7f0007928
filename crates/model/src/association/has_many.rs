//! Building and creating records through an association.

use serde_json::Value;

use super::declaration::Cardinality;
use super::proxy::AssociationProxy;
use crate::collection::Collection;
use crate::errors::Result;
use crate::model::Resource;
use crate::record::{Attribute, Record};
use crate::types::Params;

impl AssociationProxy {
    fn foreign_key(&self) -> String {
        format!("{}_id", self.owner().class_name().resource_name())
    }

    /// Builds an unsaved target record whose foreign key
    /// (`<owner singular>_id`) is set to the owner's identifier.
    ///
    /// # Errors
    ///
    /// As [`crate::Model::build`].
    pub fn build(&self, attributes: Params) -> Result<Record> {
        let mut attributes = attributes;
        attributes.insert(
            self.foreign_key(),
            self.owner().id().unwrap_or(Value::Null),
        );
        self.target()?.build(attributes)
    }

    /// Builds, saves, and attaches a target record to the owner.
    ///
    /// To-many: the record is appended to the owner's collection (the one in
    /// its slot, else the cached one, else a new one) and its inverse
    /// attribute points at the owner. To-one: the record replaces the slot.
    ///
    /// # Errors
    ///
    /// As [`AssociationProxy::build`] and [`Record::save`]. Nothing is
    /// attached when saving fails.
    pub async fn create(&self, attributes: Params) -> Result<Record> {
        let record = self.build(attributes)?;
        record.save().await?;

        let name = self.name().to_string();
        match self.declaration().cardinality {
            Cardinality::Many => {
                let collection = match self.owner().attribute(&name) {
                    Some(Attribute::Collection(collection)) => collection,
                    _ => {
                        let collection = match self.cached() {
                            Some(Resource::Many(cached)) => cached,
                            _ => Collection::new(),
                        };
                        self.owner()
                            .set_attribute(name, Attribute::Collection(collection.clone()));
                        collection
                    }
                };
                collection.push(record.clone());
                self.assign_inverse(&collection);
            }
            Cardinality::One => {
                self.clear_cache();
                self.owner()
                    .set_attribute(name, Attribute::Record(record.clone()));
            }
        }
        tracing::debug!(
            association = self.name(),
            owner = %self.owner().class_name(),
            id = ?record.id(),
            "Created associated record"
        );
        Ok(record)
    }
}
