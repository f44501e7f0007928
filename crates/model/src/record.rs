//! Records: one remote resource instance.
//!
//! A [`Record`] is a shared handle. Clones refer to the same attribute map, so
//! a record placed in a collection, cached by an association and held by the
//! caller is one object, and [`Record::ptr_eq`] is the identity test.
//!
//! Attribute names are logical. Translation to and from wire names happens at
//! the edges: [`Record::to_params`] on the way out, record building on the way
//! in.
//!
//! ## Ownership
//!
//! A record owns its attributes, including nested records and collections.
//! The inverse link from a fetched child back to its owner is an
//! [`Attribute::Parent`] holding a [`WeakRecord`], so owner ↔ child cycles
//! never keep each other alive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use crate::association::{AssociationProxy, ProxyState};
use crate::collection::Collection;
use crate::errors::{ResourceError, Result};
use crate::identifiers::ClassName;
use crate::lock;
use crate::model::Model;
use crate::types::{is_blank, Method, Params, Payload};

/// One attribute value.
#[derive(Clone)]
pub enum Attribute {
    /// A plain JSON value.
    Value(Value),
    /// A nested to-one record.
    Record(Record),
    /// A nested to-many collection.
    Collection(Collection),
    /// Back-reference to the record that owns this one through an association.
    Parent(WeakRecord),
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Record(record) => record.fmt(f),
            Self::Collection(collection) => collection.fmt(f),
            Self::Parent(_) => f.write_str("<parent>"),
        }
    }
}

struct RecordInner {
    model: Model,
    state: Mutex<RecordState>,
}

#[derive(Default)]
struct RecordState {
    attributes: IndexMap<String, Attribute>,
    metadata: Value,
    errors: Value,
    associations: HashMap<String, Arc<Mutex<ProxyState>>>,
    destroyed: bool,
}

/// Non-owning reference to a [`Record`].
#[derive(Clone)]
pub struct WeakRecord(Weak<RecordInner>);

impl WeakRecord {
    /// The record, if it is still alive.
    pub fn upgrade(&self) -> Option<Record> {
        self.0.upgrade().map(|inner| Record { inner })
    }
}

/// One instance of a remote resource.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attributes = lock(&self.inner.state).attributes.clone();
        f.debug_struct(self.class_name().as_str())
            .field("attributes", &attributes)
            .finish()
    }
}

impl Record {
    pub(crate) fn new(model: Model) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                model,
                state: Mutex::new(RecordState::default()),
            }),
        }
    }

    /// The class-level handle this record belongs to.
    pub fn model(&self) -> &Model {
        &self.inner.model
    }

    /// Class name.
    pub fn class_name(&self) -> &ClassName {
        self.inner.model.name()
    }

    /// Returns `true` if both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning reference to this record.
    pub fn downgrade(&self) -> WeakRecord {
        WeakRecord(Arc::downgrade(&self.inner))
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Attribute by logical name.
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        lock(&self.inner.state).attributes.get(name).cloned()
    }

    /// Plain value by logical name; `None` for nested records, collections
    /// and parent links.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.attribute(name)? {
            Attribute::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Sets a plain value. Does not route through association assignment; use
    /// [`Record::assign_attributes`] for that.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.set_attribute(name, Attribute::Value(value.into()));
    }

    /// Sets any attribute.
    pub fn set_attribute(&self, name: impl Into<String>, attribute: Attribute) {
        lock(&self.inner.state)
            .attributes
            .insert(name.into(), attribute);
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, name: &str) -> Option<Attribute> {
        lock(&self.inner.state).attributes.shift_remove(name)
    }

    /// Returns `true` if the attribute is present (even if `null`).
    pub fn has_attribute(&self, name: &str) -> bool {
        lock(&self.inner.state).attributes.contains_key(name)
    }

    /// Logical attribute names in insertion order.
    pub fn attribute_names(&self) -> Vec<String> {
        lock(&self.inner.state).attributes.keys().cloned().collect()
    }

    /// Nested record or owner under `name`.
    pub fn related(&self, name: &str) -> Option<Record> {
        match self.attribute(name)? {
            Attribute::Record(record) => Some(record),
            Attribute::Parent(weak) => weak.upgrade(),
            _ => None,
        }
    }

    /// Nested collection under `name`.
    pub fn related_collection(&self, name: &str) -> Option<Collection> {
        match self.attribute(name)? {
            Attribute::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Plain attributes only, logical names.
    pub fn plain_attributes(&self) -> Params {
        lock(&self.inner.state)
            .attributes
            .iter()
            .filter_map(|(name, attribute)| match attribute {
                Attribute::Value(value) => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Assigns logical attributes. Keys naming an association are assigned as
    /// nested data: a to-one object is merged into an existing nested record
    /// or instantiated, a to-many array (or object of objects) replaces the
    /// slot.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if nested data has the wrong shape.
    pub fn assign_attributes(&self, attributes: Params) -> Result<()> {
        for (name, value) in attributes {
            if self.model().class().association(&name).is_some() {
                self.association(&name)?.assign_nested(value)?;
            } else {
                self.set(name, value);
            }
        }
        Ok(())
    }

    /// Merges a wire-keyed payload: plain keys are translated to logical
    /// names, association data keys become nested records or collections.
    pub(crate) fn merge_wire(&self, mut wire: Params) -> Result<()> {
        let model = self.model().clone();
        let mut nested = Vec::new();
        for declaration in model.class().associations() {
            if let Some(value) = wire.remove(&declaration.data_key) {
                nested.push((declaration.name.as_str().to_string(), value));
            }
        }
        for (key, value) in wire {
            let logical = model.fields().to_logical(&key).to_string();
            self.set(logical, value);
        }
        for (name, value) in nested {
            self.association(&name)?.merge_wire(value)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Identity and serialization
    // -----------------------------------------------------------------------

    /// The primary key value, if present and non-blank.
    pub fn id(&self) -> Option<Value> {
        self.get(self.model().class().primary_key())
            .filter(|value| !is_blank(value))
    }

    /// Returns `true` if the record has no identifier yet.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Returns `true` after a successful [`Record::destroy`].
    pub fn is_destroyed(&self) -> bool {
        lock(&self.inner.state).destroyed
    }

    /// Metadata from the last response that built or updated this record.
    pub fn metadata(&self) -> Value {
        lock(&self.inner.state).metadata.clone()
    }

    /// Errors from the last response that built or updated this record.
    pub fn errors(&self) -> Value {
        lock(&self.inner.state).errors.clone()
    }

    pub(crate) fn set_response_extras(&self, metadata: Value, errors: Value) {
        let mut state = lock(&self.inner.state);
        state.metadata = metadata;
        state.errors = errors;
    }

    /// Plain attributes with wire names, as sent in a request body.
    pub fn to_params(&self) -> Params {
        self.model().fields().params_to_source(&self.plain_attributes())
    }

    /// Logical JSON including nested records and collections. Parent links
    /// are left out.
    pub fn to_json(&self) -> Value {
        let attributes = lock(&self.inner.state).attributes.clone();
        let mut out = Params::new();
        for (name, attribute) in attributes {
            let value = match attribute {
                Attribute::Value(value) => value,
                Attribute::Record(record) => record.to_json(),
                Attribute::Collection(collection) => collection.to_json(),
                Attribute::Parent(_) => continue,
            };
            out.insert(name, value);
        }
        Value::Object(out)
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    fn path_params(&self, params: &Params) -> Params {
        let mut merged = params.clone();
        merged.extend(self.plain_attributes());
        merged
    }

    /// Member path when the record has an identifier, collection path
    /// otherwise. Placeholders are filled from attributes, then `params`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] if a placeholder has no value.
    pub fn request_path(&self, params: &Params) -> Result<String> {
        let class = self.model().class();
        let mut merged = self.path_params(params);
        if self.is_new() {
            class.collection_path().render(&mut merged)
        } else {
            class.resource_path().render(&mut merged)
        }
    }

    /// Member path. Fails for records without an identifier.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] if a placeholder (including the identifier) has
    /// no value.
    pub fn member_path(&self, params: &Params) -> Result<String> {
        let mut merged = self.path_params(params);
        self.model().class().resource_path().render(&mut merged)
    }

    // -----------------------------------------------------------------------
    // Associations
    // -----------------------------------------------------------------------

    /// The proxy for association `name`. Every call for the same name on the
    /// same record returns a proxy sharing one cache.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownAssociation`] if the class declares no such
    /// association.
    pub fn association(&self, name: &str) -> Result<AssociationProxy> {
        let declaration = self
            .model()
            .class()
            .association(name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownAssociation {
                model: self.class_name().to_string(),
                name: name.to_string(),
            })?;
        let state = {
            let mut state = lock(&self.inner.state);
            Arc::clone(state.associations.entry(name.to_string()).or_default())
        };
        Ok(AssociationProxy::new(self.clone(), declaration, state))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Persists the record: `POST` to the collection path when new, `PUT` to
    /// the member path otherwise. Attributes in the response are merged back.
    ///
    /// # Errors
    ///
    /// Path, status, transport and parser failures. A `422` surfaces as
    /// [`ResourceError::ResourceInvalid`] carrying the server's body.
    #[tracing::instrument(name = "save", skip(self), fields(class = %self.class_name()))]
    pub async fn save(&self) -> Result<()> {
        let model = self.model().clone();
        let attributes = self.plain_attributes();
        let method = if self.is_new() { Method::Post } else { Method::Put };
        let path = self.request_path(&Params::new())?;
        let body = model.fields().params_to_source(&attributes);
        let envelope = model.dispatch_wire(method, path, body).await?;
        match envelope.data {
            Payload::Single(data) => self.merge_wire(data)?,
            Payload::Empty => {}
            Payload::Many(_) => {
                return Err(ResourceError::parser(
                    "expected a single resource in the save response, got array",
                ))
            }
        }
        self.set_response_extras(envelope.metadata, envelope.errors);
        tracing::debug!(%method, id = ?self.id(), "Record saved");
        Ok(())
    }

    /// Deletes the record on the server.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] for a record without an identifier, otherwise
    /// status and transport failures.
    #[tracing::instrument(name = "destroy", skip(self), fields(class = %self.class_name()))]
    pub async fn destroy(&self) -> Result<()> {
        let model = self.model().clone();
        let path = self.member_path(&Params::new())?;
        let envelope = model.dispatch_wire(Method::Delete, path, Params::new()).await?;
        if let Payload::Single(data) = envelope.data {
            self.merge_wire(data)?;
        }
        let mut state = lock(&self.inner.state);
        state.destroyed = true;
        state.metadata = envelope.metadata;
        state.errors = envelope.errors;
        Ok(())
    }
}
