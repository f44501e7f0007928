//! Deserializable setup: API connection settings and resource declarations.
//!
//! Loaded by the composition root (usually from TOML) and turned into a
//! [`crate::Dispatcher`] and a [`crate::Schema`]. Nothing here performs I/O.
//!
//! ```toml
//! base_url = "https://api.example.com"
//! timeout_secs = 30
//! format = "plain"
//!
//! [headers]
//! Accept = "application/json"
//!
//! [[resources]]
//! name = "User"
//! fields = { email = "EmailAddress" }
//! has_many = [{ name = "comments" }]
//! custom = { popular = "GET" }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::association::AssociationOptions;
use crate::collection::KeyedCollectionParser;
use crate::dispatcher::Dispatcher;
use crate::errors::Result;
use crate::schema::{ResourceClassBuilder, Schema};
use crate::types::{Method, ResponseShape};

/// Wire format of the API's response documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    /// Plain JSON objects and arrays.
    #[default]
    Plain,
    /// JSON:API-like `{data, meta}` documents.
    JsonApi,
}

/// Connection settings for one API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    /// Absolute base URL every relative path is joined to.
    #[serde(alias = "base_uri")]
    pub base_url: String,
    /// Default headers sent with every request.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Per-request timeout, applied by the transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Response document format.
    #[serde(default)]
    pub format: ApiFormat,
}

/// One association entry in a [`ResourceConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssociationConfig {
    /// Association name.
    pub name: String,
    /// Everything else; unset options take their defaults.
    #[serde(flatten)]
    pub options: AssociationOptions,
}

/// Declaration of one resource class.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceConfig {
    /// Class name, unique within the schema.
    pub name: String,
    /// Class declared earlier whose paths, fields, associations and verbs
    /// are copied before this declaration applies.
    #[serde(default)]
    pub inherits: Option<String>,
    /// Collection path template.
    #[serde(default)]
    pub path: Option<String>,
    /// Member path template.
    #[serde(default)]
    pub resource_path: Option<String>,
    /// Identifying attribute. Default: `id`.
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Logical attribute name → wire field name.
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    /// To-many associations.
    #[serde(default)]
    pub has_many: Vec<AssociationConfig>,
    /// To-one associations.
    #[serde(default)]
    pub has_one: Vec<AssociationConfig>,
    /// Custom request name → verb.
    #[serde(default)]
    pub custom: IndexMap<String, Method>,
    /// Headers sent with every request of this class.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Forced response shape for generic requests. Inferred from the payload
    /// when unset.
    #[serde(default)]
    pub shape: Option<ResponseShape>,
    /// Key holding collection elements when collection responses are wrapped
    /// in an object (`{"users": [..], "total": 3}`).
    #[serde(default)]
    pub collection_key: Option<String>,
}

impl ResourceConfig {
    /// Converts the declaration into a class builder.
    pub fn to_builder(&self) -> ResourceClassBuilder {
        let mut builder = ResourceClassBuilder::new(self.name.clone());
        if let Some(parent) = &self.inherits {
            builder = builder.inherits(parent.clone());
        }
        if let Some(path) = &self.path {
            builder = builder.collection_path(path.clone());
        }
        if let Some(path) = &self.resource_path {
            builder = builder.resource_path(path.clone());
        }
        if let Some(key) = &self.primary_key {
            builder = builder.primary_key(key.clone());
        }
        for (logical, wire) in &self.fields {
            builder = builder.field(logical.clone(), wire.clone());
        }
        for association in &self.has_many {
            builder = builder.has_many(association.name.clone(), association.options.clone());
        }
        for association in &self.has_one {
            builder = builder.has_one(association.name.clone(), association.options.clone());
        }
        for (name, method) in &self.custom {
            builder = builder.custom(*method, name.clone());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(shape) = self.shape {
            builder = builder.shape(shape);
        }
        if let Some(key) = &self.collection_key {
            builder = builder.collection_parser(Arc::new(KeyedCollectionParser::new(key.clone())));
        }
        builder
    }
}

/// Builds a schema from resource declarations, all sending through
/// `dispatcher` unless inherited otherwise.
///
/// # Errors
///
/// As [`crate::SchemaBuilder::build`].
pub fn build_schema(dispatcher: Arc<Dispatcher>, resources: &[ResourceConfig]) -> Result<Arc<Schema>> {
    resources
        .iter()
        .fold(Schema::builder().dispatcher(dispatcher), |builder, resource| {
            builder.resource(resource.to_builder())
        })
        .build()
}
