//! Resource classes and the schema that registers them.
//!
//! A [`ResourceClass`] is everything the library knows about one kind of
//! remote resource: where it lives, how its attributes are named on the wire,
//! which associations it declares and which dispatcher it talks through.
//! Classes are declared with [`ResourceClassBuilder`] and registered in a
//! [`Schema`], which resolves inheritance, association targets and dispatcher
//! injection once, at build time.
//!
//! ```rust
//! use std::sync::Arc;
//! use model::mock::MockTransport;
//! use model::{Dispatcher, ResourceClassBuilder, Schema};
//!
//! let dispatcher = Dispatcher::builder("https://api.example.com", Arc::new(MockTransport::new()))
//!     .build()
//!     .unwrap();
//! let schema = Schema::builder()
//!     .dispatcher(Arc::new(dispatcher))
//!     .resource(ResourceClassBuilder::new("User").has_many("comments", Default::default()))
//!     .resource(ResourceClassBuilder::new("Comment"))
//!     .build()
//!     .unwrap();
//! let users = schema.model("User").unwrap();
//! assert_eq!(users.class().collection_path().as_str(), "/users");
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::association::{AssociationDeclaration, AssociationOptions, Cardinality};
use crate::collection::{ArrayCollectionParser, CollectionParser};
use crate::dispatcher::Dispatcher;
use crate::errors::{ResourceError, Result};
use crate::fields::FieldMap;
use crate::identifiers::ClassName;
use crate::model::Model;
use crate::path::PathTemplate;
use crate::types::{Method, ResponseShape};

// ---------------------------------------------------------------------------
// ResourceClass
// ---------------------------------------------------------------------------

/// Immutable description of one remote resource kind.
pub struct ResourceClass {
    name: ClassName,
    parent: Option<ClassName>,
    collection_path: PathTemplate,
    resource_path: PathTemplate,
    primary_key: String,
    fields: FieldMap,
    associations: IndexMap<String, Arc<AssociationDeclaration>>,
    custom_verbs: IndexMap<String, Method>,
    shape: ResponseShape,
    collection_parser: Arc<dyn CollectionParser>,
    headers: IndexMap<String, String>,
    dispatcher: Arc<Dispatcher>,
}

impl ResourceClass {
    /// Class name.
    pub fn name(&self) -> &ClassName {
        &self.name
    }

    /// Class this one inherits from, if any.
    pub fn parent(&self) -> Option<&ClassName> {
        self.parent.as_ref()
    }

    /// Path template of the collection (`/users`).
    pub fn collection_path(&self) -> &PathTemplate {
        &self.collection_path
    }

    /// Path template of one member (`/users/:id`).
    pub fn resource_path(&self) -> &PathTemplate {
        &self.resource_path
    }

    /// Logical name of the identifying attribute.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Logical ↔ wire attribute names.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Looks up an association declaration by name.
    pub fn association(&self, name: &str) -> Option<&Arc<AssociationDeclaration>> {
        self.associations.get(name)
    }

    /// Every association declaration, in declaration order (inherited first).
    pub fn associations(&self) -> impl Iterator<Item = &Arc<AssociationDeclaration>> {
        self.associations.values()
    }

    /// Looks up the verb of a custom request.
    pub fn custom_verb(&self, name: &str) -> Option<Method> {
        self.custom_verbs.get(name).copied()
    }

    /// How generic responses become records or collections.
    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Parser used for collection responses.
    pub fn collection_parser(&self) -> &Arc<dyn CollectionParser> {
        &self.collection_parser
    }

    /// Headers added to every request of this class.
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// The dispatcher this class sends through.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl std::fmt::Debug for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClass")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("collection_path", &self.collection_path)
            .field("resource_path", &self.resource_path)
            .field("primary_key", &self.primary_key)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ResourceClassBuilder
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
enum DispatcherChoice {
    #[default]
    Inherited,
    Explicit(Arc<Dispatcher>),
    Global,
}

/// Declares one resource class.
///
/// Unset settings are inherited from the parent class (see
/// [`ResourceClassBuilder::inherits`]) and otherwise derived from the class
/// name.
#[derive(Clone)]
pub struct ResourceClassBuilder {
    name: String,
    inherits: Option<String>,
    collection_path: Option<String>,
    resource_path: Option<String>,
    primary_key: Option<String>,
    fields: Vec<(String, String)>,
    associations: Vec<(Cardinality, String, AssociationOptions)>,
    custom_verbs: Vec<(String, Method)>,
    shape: Option<ResponseShape>,
    collection_parser: Option<Arc<dyn CollectionParser>>,
    headers: IndexMap<String, String>,
    dispatcher: DispatcherChoice,
}

impl ResourceClassBuilder {
    /// Starts a class named `name` (`"User"`, `"BlogPost"`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits: None,
            collection_path: None,
            resource_path: None,
            primary_key: None,
            fields: Vec::new(),
            associations: Vec::new(),
            custom_verbs: Vec::new(),
            shape: None,
            collection_parser: None,
            headers: IndexMap::new(),
            dispatcher: DispatcherChoice::Inherited,
        }
    }

    /// Inherits paths, fields, associations, verbs and dispatcher from a class
    /// registered earlier in the same schema.
    #[must_use]
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(parent.into());
        self
    }

    /// Sets the collection path template. A `:placeholder` is filled from
    /// attributes or parameters (`/organizations/:organization_id/users`).
    #[must_use]
    pub fn collection_path(mut self, path: impl Into<String>) -> Self {
        self.collection_path = Some(path.into());
        self
    }

    /// Sets the member path template. Default: `<collection>/:<primary key>`.
    #[must_use]
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    /// Sets the identifying attribute. Default: `id`.
    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// Maps logical attribute `logical` to wire key `wire`.
    #[must_use]
    pub fn field(mut self, logical: impl Into<String>, wire: impl Into<String>) -> Self {
        self.fields.push((logical.into(), wire.into()));
        self
    }

    /// Declares a to-many association.
    #[must_use]
    pub fn has_many(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.associations
            .push((Cardinality::Many, name.into(), options));
        self
    }

    /// Declares a to-one association.
    #[must_use]
    pub fn has_one(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.associations.push((Cardinality::One, name.into(), options));
        self
    }

    /// Registers a named custom request (`GET /users/popular`).
    #[must_use]
    pub fn custom(mut self, method: Method, name: impl Into<String>) -> Self {
        self.custom_verbs.push((name.into(), method));
        self
    }

    /// Forces how generic responses are shaped.
    #[must_use]
    pub fn shape(mut self, shape: ResponseShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Replaces the collection parser (default: [`ArrayCollectionParser`]).
    #[must_use]
    pub fn collection_parser(mut self, parser: Arc<dyn CollectionParser>) -> Self {
        self.collection_parser = Some(parser);
        self
    }

    /// Adds a header sent with every request of this class.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sends through `dispatcher` instead of the inherited one.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = DispatcherChoice::Explicit(dispatcher);
        self
    }

    /// Sends through the process-wide dispatcher installed with
    /// [`Dispatcher::install_global`].
    #[must_use]
    pub fn use_global_dispatcher(mut self) -> Self {
        self.dispatcher = DispatcherChoice::Global;
        self
    }

    /// Name given to [`ResourceClassBuilder::new`].
    pub fn name(&self) -> &str {
        &self.name
    }

    fn finish(
        self,
        parent: Option<&ResourceClass>,
        default_dispatcher: Option<&Arc<Dispatcher>>,
    ) -> Result<ResourceClass> {
        let name = ClassName::new(&self.name)
            .ok_or_else(|| ResourceError::configuration("class name must not be empty"))?;

        let collection_path = match (&self.collection_path, parent) {
            (Some(path), _) => PathTemplate::parse(path.as_str()),
            (None, Some(parent)) => parent.collection_path.clone(),
            (None, None) => PathTemplate::parse(format!("/{}", name.collection_name())),
        };
        let primary_key = self
            .primary_key
            .or_else(|| parent.map(|p| p.primary_key.clone()))
            .unwrap_or_else(|| "id".to_string());
        let resource_path = match (&self.resource_path, parent) {
            (Some(path), _) => PathTemplate::parse(path.as_str()),
            (None, Some(parent)) if self.collection_path.is_none() => parent.resource_path.clone(),
            _ => PathTemplate::parse(format!(
                "{}/:{primary_key}",
                collection_path.as_str().trim_end_matches('/')
            )),
        };

        let mut fields = parent.map(|p| p.fields.clone()).unwrap_or_default();
        for (logical, wire) in self.fields {
            fields.insert(logical, wire)?;
        }

        let mut associations = parent
            .map(|p| p.associations.clone())
            .unwrap_or_default();
        for (cardinality, assoc_name, options) in self.associations {
            let declaration = AssociationDeclaration::attach(cardinality, &assoc_name, options)?;
            let key = declaration.name.as_str().to_string();
            if associations.contains_key(&key) {
                return Err(ResourceError::configuration(format!(
                    "association '{key}' is declared twice on {name}"
                )));
            }
            associations.insert(key, Arc::new(declaration));
        }

        let mut custom_verbs = parent
            .map(|p| p.custom_verbs.clone())
            .unwrap_or_default();
        custom_verbs.extend(self.custom_verbs);

        let mut headers = parent.map(|p| p.headers.clone()).unwrap_or_default();
        headers.extend(self.headers);

        let dispatcher = match self.dispatcher {
            DispatcherChoice::Explicit(dispatcher) => dispatcher,
            DispatcherChoice::Global => Dispatcher::global().ok_or_else(|| {
                ResourceError::configuration(format!(
                    "{name} uses the global dispatcher but none is installed"
                ))
            })?,
            DispatcherChoice::Inherited => parent
                .map(|p| Arc::clone(&p.dispatcher))
                .or_else(|| default_dispatcher.cloned())
                .ok_or_else(|| {
                    ResourceError::configuration(format!("{name} has no dispatcher"))
                })?,
        };

        Ok(ResourceClass {
            parent: parent.map(|p| p.name.clone()),
            shape: self
                .shape
                .or_else(|| parent.map(|p| p.shape))
                .unwrap_or_default(),
            collection_parser: self
                .collection_parser
                .or_else(|| parent.map(|p| Arc::clone(&p.collection_parser)))
                .unwrap_or_else(|| Arc::new(ArrayCollectionParser)),
            name,
            collection_path,
            resource_path,
            primary_key,
            fields,
            associations,
            custom_verbs,
            headers,
            dispatcher,
        })
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Registry of resource classes, looked up by name.
///
/// Association targets are resolved through the schema, so classes may refer
/// to each other in any order.
#[derive(Debug)]
pub struct Schema {
    classes: IndexMap<String, Arc<ResourceClass>>,
}

impl Schema {
    /// Starts an empty schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Looks up a class by name.
    pub fn class(&self, name: &str) -> Option<&Arc<ResourceClass>> {
        self.classes.get(name)
    }

    /// Registered class names, in registration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Returns the class-level handle for `name`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownModel`] if no such class is registered.
    pub fn model(self: &Arc<Self>, name: &str) -> Result<Model> {
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| ResourceError::UnknownModel {
                name: name.to_string(),
            })?;
        Ok(Model::new(Arc::clone(self), Arc::clone(class)))
    }
}

/// Collects class declarations and validates them into a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    dispatcher: Option<Arc<Dispatcher>>,
    classes: Vec<ResourceClassBuilder>,
}

impl SchemaBuilder {
    /// Dispatcher for classes that neither set one nor inherit one.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Registers a class.
    #[must_use]
    pub fn resource(mut self, class: ResourceClassBuilder) -> Self {
        self.classes.push(class);
        self
    }

    /// Validates every declaration and builds the schema.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] for duplicate classes or associations,
    /// a parent declared later than its child, an association target that is
    /// not registered, a class with no dispatcher, or a non-bijective field
    /// mapping.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut classes: IndexMap<String, Arc<ResourceClass>> = IndexMap::new();
        for builder in self.classes {
            if classes.contains_key(builder.name()) {
                return Err(ResourceError::configuration(format!(
                    "class '{}' is registered twice",
                    builder.name()
                )));
            }
            let parent = match &builder.inherits {
                Some(parent) => Some(Arc::clone(classes.get(parent).ok_or_else(|| {
                    ResourceError::configuration(format!(
                        "class '{}' inherits from '{parent}', which is not registered before it",
                        builder.name()
                    ))
                })?)),
                None => None,
            };
            let class = builder.finish(parent.as_deref(), self.dispatcher.as_ref())?;
            tracing::debug!(
                class = %class.name,
                path = %class.collection_path,
                associations = class.associations.len(),
                "Registered resource class"
            );
            classes.insert(class.name.as_str().to_string(), Arc::new(class));
        }

        for class in classes.values() {
            for declaration in class.associations() {
                if !classes.contains_key(declaration.class_name.as_str()) {
                    return Err(ResourceError::configuration(format!(
                        "association '{}' on {} targets unknown class '{}'",
                        declaration.name,
                        class.name,
                        declaration.class_name
                    )));
                }
            }
        }
        Ok(Arc::new(Schema { classes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn dispatcher() -> Arc<Dispatcher> {
        Arc::new(
            Dispatcher::builder("https://api.example.com", Arc::new(MockTransport::new()))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn paths_default_from_the_class_name() {
        let schema = Schema::builder()
            .dispatcher(dispatcher())
            .resource(ResourceClassBuilder::new("BlogPost"))
            .build()
            .unwrap();
        let class = schema.class("BlogPost").unwrap();
        assert_eq!(class.collection_path().as_str(), "/blog_posts");
        assert_eq!(class.resource_path().as_str(), "/blog_posts/:id");
        assert_eq!(class.primary_key(), "id");
    }

    #[test]
    fn resource_path_follows_custom_collection_path_and_primary_key() {
        let schema = Schema::builder()
            .dispatcher(dispatcher())
            .resource(
                ResourceClassBuilder::new("User")
                    .collection_path("/organizations/:organization_id/users")
                    .primary_key("uid"),
            )
            .build()
            .unwrap();
        let class = schema.class("User").unwrap();
        assert_eq!(
            class.resource_path().as_str(),
            "/organizations/:organization_id/users/:uid"
        );
    }

    #[test]
    fn subclasses_inherit_declarations() {
        let schema = Schema::builder()
            .dispatcher(dispatcher())
            .resource(
                ResourceClassBuilder::new("User")
                    .field("email", "EmailAddress")
                    .has_many("comments", Default::default())
                    .custom(Method::Get, "popular"),
            )
            .resource(ResourceClassBuilder::new("Admin").inherits("User").has_one("role", Default::default()))
            .resource(ResourceClassBuilder::new("Comment"))
            .resource(ResourceClassBuilder::new("Role"))
            .build()
            .unwrap();
        let admin = schema.class("Admin").unwrap();
        assert_eq!(admin.parent().map(ClassName::as_str), Some("User"));
        assert_eq!(admin.collection_path().as_str(), "/users");
        assert_eq!(admin.fields().to_source("email"), "EmailAddress");
        assert!(admin.association("comments").is_some());
        assert!(admin.association("role").is_some());
        assert_eq!(admin.custom_verb("popular"), Some(Method::Get));
        assert!(schema.class("User").unwrap().association("role").is_none());
    }

    #[test]
    fn duplicate_association_is_rejected() {
        let err = Schema::builder()
            .dispatcher(dispatcher())
            .resource(
                ResourceClassBuilder::new("User")
                    .has_many("comments", Default::default())
                    .has_many("comments", Default::default()),
            )
            .resource(ResourceClassBuilder::new("Comment"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ResourceError::Configuration { .. }));
    }

    #[test]
    fn unknown_association_target_is_rejected() {
        let err = Schema::builder()
            .dispatcher(dispatcher())
            .resource(ResourceClassBuilder::new("User").has_many("comments", Default::default()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown class 'Comment'"));
    }

    #[test]
    fn class_without_dispatcher_is_rejected() {
        let err = Schema::builder()
            .resource(ResourceClassBuilder::new("User"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("has no dispatcher"));
    }

    #[test]
    fn unknown_model_lookup_fails() {
        let schema = Schema::builder().build().unwrap();
        assert!(matches!(
            schema.model("Ghost"),
            Err(ResourceError::UnknownModel { .. })
        ));
    }
}
