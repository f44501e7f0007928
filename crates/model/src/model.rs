//! Class-level operations: the generic verbs, custom requests and the
//! `find` / `all` / `create` conveniences.
//!
//! Path arguments follow one rule everywhere:
//!
//! | Argument | Resolved to |
//! |---|---|
//! | `""` | the class's collection path |
//! | `"popular"` (bare name) | collection path + `/popular` |
//! | `"/users/:id/stats"` | the template itself |
//! | `"https://other.example.com/x"` | the URL itself (absolute) |
//!
//! Placeholders are filled from the parameters, which consume the values they
//! use. Remaining logical parameter names are translated to wire names before
//! dispatch.

use std::sync::Arc;

use serde_json::Value;

use crate::collection::Collection;
use crate::dispatcher::Request;
use crate::errors::{ResourceError, Result};
use crate::fields::FieldMap;
use crate::identifiers::ClassName;
use crate::path::{self, PathTemplate};
use crate::record::Record;
use crate::schema::{ResourceClass, Schema};
use crate::types::{Envelope, Method, Params};

/// The result of a generic fetch: one record, a collection, or nothing.
#[derive(Debug, Clone)]
pub enum Resource {
    /// A single record.
    One(Record),
    /// A collection of records.
    Many(Collection),
    /// No resource (empty response, or an association that could not be
    /// addressed).
    None,
}

impl Resource {
    /// The record, if this is [`Resource::One`].
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::One(record) => Some(record),
            _ => None,
        }
    }

    /// The collection, if this is [`Resource::Many`].
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Many(collection) => Some(collection),
            _ => None,
        }
    }

    /// Consumes into the record, if any.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::One(record) => Some(record),
            _ => None,
        }
    }

    /// Consumes into the collection, if any.
    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Self::Many(collection) => Some(collection),
            _ => None,
        }
    }

    /// Returns `true` for [`Resource::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Identity comparison: both sides hold the same record or collection.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        match (self, other) {
            (Self::One(a), Self::One(b)) => a.ptr_eq(b),
            (Self::Many(a), Self::Many(b)) => a.ptr_eq(b),
            (Self::None, Self::None) => true,
            _ => false,
        }
    }

    /// Logical JSON (`null` for [`Resource::None`]).
    pub fn to_json(&self) -> Value {
        match self {
            Self::One(record) => record.to_json(),
            Self::Many(collection) => collection.to_json(),
            Self::None => Value::Null,
        }
    }
}

/// Class-level handle: a resource class bound to its schema.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    class: Arc<ResourceClass>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Model").field(self.class.name()).finish()
    }
}

impl Model {
    pub(crate) fn new(schema: Arc<Schema>, class: Arc<ResourceClass>) -> Self {
        Self { schema, class }
    }

    /// Class name.
    pub fn name(&self) -> &ClassName {
        self.class.name()
    }

    /// The underlying class description.
    pub fn class(&self) -> &Arc<ResourceClass> {
        &self.class
    }

    /// The schema this class is registered in.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Logical ↔ wire attribute names.
    pub fn fields(&self) -> &FieldMap {
        self.class.fields()
    }

    /// Handle for another class of the same schema.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownModel`] if no such class is registered.
    pub fn sibling(&self, name: &str) -> Result<Model> {
        self.schema.model(name)
    }

    /// Resolves a path argument against this class, consuming placeholder
    /// values from `params`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] if a placeholder has no value.
    pub fn resolve_path(&self, path: &str, params: &mut Params) -> Result<String> {
        if path.starts_with('/') || path.starts_with("http://") || path.starts_with("https://") {
            return PathTemplate::parse(path).render(params);
        }
        let collection = self.class.collection_path().render(params)?;
        if path.is_empty() {
            Ok(collection)
        } else {
            Ok(path::join(&collection, path))
        }
    }

    // -----------------------------------------------------------------------
    // Generic verbs
    // -----------------------------------------------------------------------

    /// Sends a request and returns the raw envelope.
    ///
    /// `params` use logical names; placeholders are consumed first and the
    /// rest is translated to wire names.
    ///
    /// # Errors
    ///
    /// Path, status, transport and parser failures.
    pub async fn request(&self, method: Method, path: &str, params: Params) -> Result<Envelope> {
        let mut params = params;
        let path = self.resolve_path(path, &mut params)?;
        let wire = self.fields().params_to_source(&params);
        self.dispatch_wire(method, path, wire).await
    }

    /// Sends already-resolved wire parameters to an already-rendered path.
    pub(crate) async fn dispatch_wire(
        &self,
        method: Method,
        path: String,
        params: Params,
    ) -> Result<Envelope> {
        let mut request = Request::new(method, path).with_params(params);
        for (name, value) in self.class.headers() {
            request = request.with_header(name.clone(), value.clone());
        }
        self.class.dispatcher().dispatch(request).await
    }

    /// Sends a request and builds a record or collection from the response.
    ///
    /// Sequence payloads (or any payload when the class shape forces it)
    /// become collections; objects become records; empty bodies become
    /// [`Resource::None`].
    ///
    /// # Errors
    ///
    /// As [`Model::request`], plus builder failures.
    pub async fn send(&self, method: Method, path: &str, params: Params) -> Result<Resource> {
        let envelope = self.request(method, path, params).await?;
        self.build_resource_from(envelope)
    }

    /// Sends a request and builds a collection from the response.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if the response holds no element sequence.
    pub async fn send_collection(
        &self,
        method: Method,
        path: &str,
        params: Params,
    ) -> Result<Collection> {
        let envelope = self.request(method, path, params).await?;
        self.build_collection(envelope)
    }

    /// Sends a request and builds one record from the response.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if the response does not hold one object.
    pub async fn send_resource(&self, method: Method, path: &str, params: Params) -> Result<Record> {
        let envelope = self.request(method, path, params).await?;
        self.build_record(envelope)
    }

    /// `GET`, shaped by the response.
    ///
    /// # Errors
    ///
    /// As [`Model::send`].
    pub async fn get(&self, path: &str, params: Params) -> Result<Resource> {
        self.send(Method::Get, path, params).await
    }

    /// `GET`, always a collection.
    ///
    /// # Errors
    ///
    /// As [`Model::send_collection`].
    pub async fn get_collection(&self, path: &str, params: Params) -> Result<Collection> {
        self.send_collection(Method::Get, path, params).await
    }

    /// `GET`, always one record.
    ///
    /// # Errors
    ///
    /// As [`Model::send_resource`].
    pub async fn get_resource(&self, path: &str, params: Params) -> Result<Record> {
        self.send_resource(Method::Get, path, params).await
    }

    /// `POST`, shaped by the response.
    ///
    /// # Errors
    ///
    /// As [`Model::send`].
    pub async fn post(&self, path: &str, params: Params) -> Result<Resource> {
        self.send(Method::Post, path, params).await
    }

    /// `PUT`, shaped by the response.
    ///
    /// # Errors
    ///
    /// As [`Model::send`].
    pub async fn put(&self, path: &str, params: Params) -> Result<Resource> {
        self.send(Method::Put, path, params).await
    }

    /// `PATCH`, shaped by the response.
    ///
    /// # Errors
    ///
    /// As [`Model::send`].
    pub async fn patch(&self, path: &str, params: Params) -> Result<Resource> {
        self.send(Method::Patch, path, params).await
    }

    /// `DELETE`, shaped by the response.
    ///
    /// # Errors
    ///
    /// As [`Model::send`].
    pub async fn delete(&self, path: &str, params: Params) -> Result<Resource> {
        self.send(Method::Delete, path, params).await
    }

    /// Runs a custom request registered with
    /// [`crate::ResourceClassBuilder::custom`].
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownVerb`] if `name` is not registered, otherwise
    /// as [`Model::send`].
    pub async fn call(&self, name: &str, params: Params) -> Result<Resource> {
        let method = self
            .class
            .custom_verb(name)
            .ok_or_else(|| ResourceError::UnknownVerb {
                model: self.name().to_string(),
                name: name.to_string(),
            })?;
        self.send(method, name, params).await
    }

    // -----------------------------------------------------------------------
    // Conveniences
    // -----------------------------------------------------------------------

    /// Fetches one record by identifier.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] for a blank identifier, otherwise as
    /// [`Model::send_resource`].
    pub async fn find(&self, id: impl Into<Value>) -> Result<Record> {
        self.find_with(id, Params::new()).await
    }

    /// Fetches one record by identifier with extra parameters (for nested
    /// paths such as `/organizations/:organization_id/users/:id`).
    ///
    /// # Errors
    ///
    /// As [`Model::find`].
    pub async fn find_with(&self, id: impl Into<Value>, params: Params) -> Result<Record> {
        let mut params = params;
        params.insert(self.class.primary_key().to_string(), id.into());
        let path = self.class.resource_path().render(&mut params)?;
        let wire = self.fields().params_to_source(&params);
        let envelope = self.dispatch_wire(Method::Get, path, wire).await?;
        self.build_record(envelope)
    }

    /// Fetches the collection, filtered by `params`.
    ///
    /// # Errors
    ///
    /// As [`Model::send_collection`].
    pub async fn all(&self, params: Params) -> Result<Collection> {
        self.get_collection("", params).await
    }

    /// Creates an unsaved record from logical attributes. Keys naming an
    /// association are assigned as nested data.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if nested association data has the wrong
    /// shape.
    pub fn build(&self, attributes: Params) -> Result<Record> {
        let record = Record::new(self.clone());
        record.assign_attributes(attributes)?;
        Ok(record)
    }

    /// Builds a record and saves it.
    ///
    /// # Errors
    ///
    /// As [`Model::build`] and [`Record::save`].
    pub async fn create(&self, attributes: Params) -> Result<Record> {
        let record = self.build(attributes)?;
        record.save().await?;
        Ok(record)
    }
}
