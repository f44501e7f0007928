//! Core of restmap: remote REST resources as local records.
//!
//! Resource classes are declared once in a [`Schema`]. Through a class handle
//! ([`Model`]) callers fetch, filter and persist [`Record`]s and
//! [`Collection`]s. Records expose lazy, cached associations
//! ([`AssociationProxy`]) that fetch related resources on first use.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate opens no connections. It
//! reaches the network only through the [`Transport`] port; the `transport`
//! crate supplies the HTTP implementation and [`mock::MockTransport`] serves
//! tests.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`errors`] | [`ResourceError`] and the status → error mapping |
//! | [`identifiers`] | `ClassName`, `AssociationName` newtypes |
//! | [`types`] | `Method`, `Params`, `Payload`, `Envelope`, sort keys |
//! | [`fields`] | Logical ↔ wire attribute mapping |
//! | [`path`] | `:placeholder` path templates |
//! | [`transport`] | The `Transport` port |
//! | [`parser`] | Envelope parsers (plain JSON, JSON:API-like) |
//! | [`dispatcher`] | One logical request → one envelope |
//! | [`schema`] | Resource classes and their registry |
//! | [`model`] | Class-level verbs, custom requests, `find`/`all`/`create` |
//! | [`record`] | Record instances, persistence |
//! | [`collection`] | Collections and collection parsers |
//! | [`association`] | Declarations and lazy proxies |
//! | [`config`] | Deserializable setup |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use model::mock::MockTransport;
//! use model::{Dispatcher, Method, ResourceClassBuilder, Schema};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> model::Result<()> {
//! let mock = MockTransport::new();
//! mock.expect(Method::Get, "/users/1").respond_json(200, json!({"id": 1, "name": "Tobias"}));
//! mock.expect(Method::Get, "/users/1/comments").respond_json(200, json!([{"id": 7}]));
//!
//! let dispatcher = Dispatcher::builder("https://api.example.com", Arc::new(mock.clone())).build()?;
//! let schema = Schema::builder()
//!     .dispatcher(Arc::new(dispatcher))
//!     .resource(ResourceClassBuilder::new("User").has_many("comments", Default::default()))
//!     .resource(ResourceClassBuilder::new("Comment"))
//!     .build()?;
//!
//! let user = schema.model("User")?.find(1).await?;
//! let comments = user.association("comments")?.fetch().await?;
//! assert_eq!(comments.as_collection().map(|c| c.len()), Some(1));
//! # Ok(())
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod association;
mod builder;
pub mod collection;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod fields;
pub mod identifiers;
pub mod inflection;
pub mod mock;
pub mod model;
pub mod parser;
pub mod path;
pub mod record;
pub mod schema;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use association::{AssociationDeclaration, AssociationOptions, AssociationProxy, Cardinality};
pub use collection::{
    ArrayCollectionParser, Collection, CollectionData, CollectionParser, KeyedCollectionParser,
};
pub use config::{build_schema, ApiConfig, ApiFormat, AssociationConfig, ResourceConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Request};
pub use errors::{ResourceError, Result};
pub use fields::FieldMap;
pub use identifiers::{AssociationName, ClassName};
pub use model::{Model, Resource};
pub use parser::{EnvelopeParser, JsonApiParser, JsonParser};
pub use path::PathTemplate;
pub use record::{Attribute, Record, WeakRecord};
pub use schema::{ResourceClass, ResourceClassBuilder, Schema, SchemaBuilder};
pub use transport::{Transport, TransportRequest, TransportResponse};
pub use types::{Direction, Envelope, Method, Params, Payload, ResponseShape, SortKey};

/// Locks `mutex`, recovering the data if a previous holder panicked.
///
/// Guards are never held across an `.await`.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
