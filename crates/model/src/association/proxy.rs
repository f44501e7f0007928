//! Per-record association proxies.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::declaration::{AssociationDeclaration, Cardinality};
use crate::collection::{Collection, CollectionData};
use crate::errors::{ResourceError, Result};
use crate::fields::{value_to_string, FieldMap};
use crate::lock;
use crate::model::{Model, Resource};
use crate::path::{escape_segment, join};
use crate::record::{Attribute, Record};
use crate::types::{is_blank, Method, Params, SortKey};

/// Pending filters and the cached result of one proxy.
#[derive(Debug, Default)]
pub(crate) struct ProxyState {
    params: Params,
    cached: Option<Resource>,
}

/// Lazy handle on one association of one record.
///
/// Handles returned by [`Record::association`] for the same name share their
/// state: a fetch through one is a cache hit through the other. Handles
/// returned by [`AssociationProxy::filter`] and [`AssociationProxy::order`]
/// are independent.
#[derive(Clone)]
pub struct AssociationProxy {
    owner: Record,
    declaration: Arc<AssociationDeclaration>,
    state: Arc<Mutex<ProxyState>>,
}

impl std::fmt::Debug for AssociationProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationProxy")
            .field("owner", self.owner.class_name())
            .field("name", &self.declaration.name)
            .field("params", &self.params())
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Source {
    Logical,
    Wire,
}

impl AssociationProxy {
    pub(crate) fn new(
        owner: Record,
        declaration: Arc<AssociationDeclaration>,
        state: Arc<Mutex<ProxyState>>,
    ) -> Self {
        Self {
            owner,
            declaration,
            state,
        }
    }

    /// The record this association belongs to.
    pub fn owner(&self) -> &Record {
        &self.owner
    }

    /// The class-level declaration.
    pub fn declaration(&self) -> &AssociationDeclaration {
        &self.declaration
    }

    /// Association name.
    pub fn name(&self) -> &str {
        self.declaration.name.as_str()
    }

    /// Pending (wire-keyed) query parameters.
    pub fn params(&self) -> Params {
        lock(&self.state).params.clone()
    }

    pub(crate) fn cached(&self) -> Option<Resource> {
        lock(&self.state).cached.clone()
    }

    pub(crate) fn clear_cache(&self) {
        lock(&self.state).cached = None;
    }

    /// Returns `true` if both handles share the same cache and parameters.
    pub fn ptr_eq(&self, other: &AssociationProxy) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// The target class.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownModel`] if the target is not registered.
    pub fn target(&self) -> Result<Model> {
        self.owner
            .model()
            .sibling(self.declaration.class_name.as_str())
    }

    fn target_fields(&self) -> FieldMap {
        self.target()
            .map(|target| target.fields().clone())
            .unwrap_or_default()
    }

    /// `<owner member path><association path>`, with placeholders filled from
    /// the owner's attributes and the pending parameters.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] if the owner cannot be addressed yet.
    pub fn path(&self) -> Result<String> {
        self.path_with(&self.params())
    }

    fn path_with(&self, params: &Params) -> Result<String> {
        let owner_path = self.owner.member_path(params)?;
        Ok(join(&owner_path, &self.declaration.path))
    }

    fn inverse_name(&self) -> String {
        self.declaration
            .inverse_of
            .clone()
            .unwrap_or_else(|| self.owner.class_name().resource_name())
    }

    pub(crate) fn assign_inverse(&self, collection: &Collection) {
        let inverse = self.inverse_name();
        for record in collection {
            record.set_attribute(inverse.clone(), Attribute::Parent(self.owner.downgrade()));
        }
    }

    fn slot(&self) -> Option<Attribute> {
        self.owner.attribute(self.name())
    }

    fn is_default(&self, slot: &Attribute) -> bool {
        match slot {
            Attribute::Value(value) => is_blank(value) || *value == self.declaration.default,
            Attribute::Collection(collection) => collection.is_empty(),
            Attribute::Record(_) | Attribute::Parent(_) => false,
        }
    }

    fn slot_is_blank(&self) -> bool {
        self.slot().map_or(true, |slot| self.is_default(&slot))
    }

    fn fresh_default(&self) -> Result<Resource> {
        let target = self.target()?;
        let resource = match (&self.declaration.cardinality, &self.declaration.default) {
            (Cardinality::Many, Value::Array(items)) => {
                let data = CollectionData {
                    elements: items.clone(),
                    metadata: Params::new(),
                };
                Resource::Many(target.instantiate_collection(data)?)
            }
            (Cardinality::Many, _) => Resource::Many(Collection::new()),
            (Cardinality::One, Value::Object(attributes)) => {
                Resource::One(target.instantiate(attributes.clone())?)
            }
            (Cardinality::One, _) => Resource::None,
        };
        Ok(self.finish(resource))
    }

    fn finish(&self, resource: Resource) -> Resource {
        if let (Cardinality::Many, Resource::Many(collection)) =
            (self.declaration.cardinality, &resource)
        {
            self.assign_inverse(collection);
        }
        resource
    }

    /// Resolves the association.
    ///
    /// Without pending parameters the first match wins:
    ///
    /// 1. the owner's slot holds the default → a fresh copy of the default;
    /// 2. a cached result → the cache;
    /// 3. the owner holds the data inline → that record or collection.
    ///
    /// Otherwise the association is fetched, cached, and the pending
    /// parameters are cleared. An owner that cannot be addressed yet (no
    /// identifier) yields [`Resource::None`] without a request. For to-many
    /// associations every element's inverse attribute points at the owner.
    ///
    /// # Errors
    ///
    /// Status, transport and parser failures of the fetch.
    pub async fn fetch(&self) -> Result<Resource> {
        let (params, cached) = {
            let state = lock(&self.state);
            (state.params.clone(), state.cached.clone())
        };

        if params.is_empty() {
            let slot = self.slot();
            if slot.as_ref().is_some_and(|slot| self.is_default(slot)) {
                return self.fresh_default();
            }
            if let Some(cached) = cached {
                return Ok(cached);
            }
            match slot {
                Some(Attribute::Record(record)) => return Ok(Resource::One(record)),
                Some(Attribute::Collection(collection)) => {
                    return Ok(self.finish(Resource::Many(collection)))
                }
                _ => {}
            }
        }

        let path = match self.path_with(&params) {
            Ok(path) => path,
            Err(err) if err.is_path_error() => {
                tracing::debug!(
                    association = self.name(),
                    owner = %self.owner.class_name(),
                    error = %err,
                    "Association owner cannot be addressed; resolving to nothing"
                );
                return Ok(Resource::None);
            }
            Err(err) => return Err(err),
        };

        let target = self.target()?;
        let resource = match self.declaration.cardinality {
            Cardinality::Many => {
                let envelope = target
                    .dispatch_wire(Method::Get, path, params)
                    .await?;
                Resource::Many(target.build_collection(envelope)?)
            }
            Cardinality::One => {
                let envelope = target
                    .dispatch_wire(Method::Get, path, params)
                    .await?;
                Resource::One(target.build_record(envelope)?)
            }
        };
        let resource = self.finish(resource);

        let mut state = lock(&self.state);
        state.cached = Some(resource.clone());
        state.params.clear();
        Ok(resource)
    }

    fn scoped(&self, params: Params) -> Self {
        Self {
            owner: self.owner.clone(),
            declaration: Arc::clone(&self.declaration),
            state: Arc::new(Mutex::new(ProxyState {
                params,
                cached: None,
            })),
        }
    }

    /// A new, independent proxy whose pending parameters are this proxy's
    /// merged with `params` (logical names, translated to wire names).
    ///
    /// With empty `params` on an association whose owner slot is empty or
    /// default, returns this very proxy.
    pub fn filter(&self, params: Params) -> Self {
        if params.is_empty() && self.slot_is_blank() {
            return self.clone();
        }
        let mut merged = self.params();
        merged.extend(self.target_fields().params_to_source(&params));
        self.scoped(merged)
    }

    /// A new, independent proxy sorted by `keys`.
    ///
    /// Keys are translated to wire names and joined into a single `order`
    /// parameter of `field_direction` tokens: `name_asc,created_at_desc`.
    pub fn order<I>(&self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SortKey>,
    {
        let keys: Vec<SortKey> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() && self.slot_is_blank() {
            return self.clone();
        }
        let mut merged = self.params();
        if !keys.is_empty() {
            let fields = self.target_fields();
            let token = keys
                .iter()
                .map(|key| format!("{}_{}", fields.to_source(&key.field), key.direction.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            merged.insert("order".to_string(), Value::String(token));
        }
        self.scoped(merged)
    }

    /// Fetches one associated record by identifier, scoped to the owner.
    ///
    /// A blank identifier, or an owner that cannot be addressed, yields
    /// `None` without a request. The result is not cached.
    ///
    /// # Errors
    ///
    /// Status, transport and parser failures of the fetch.
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        let id = id.into();
        if is_blank(&id) {
            return Ok(None);
        }
        let params = self.params();
        let base = match self.path_with(&params) {
            Ok(path) => path,
            Err(err) if err.is_path_error() => return Ok(None),
            Err(err) => return Err(err),
        };
        let path = join(&base, &escape_segment(&value_to_string(&id)));
        let target = self.target()?;
        let envelope = target
            .dispatch_wire(Method::Get, path, params)
            .await?;
        target.build_record(envelope).map(Some)
    }

    /// Clears pending parameters, the cache and the owner's slot.
    pub fn reset(&self) {
        {
            let mut state = lock(&self.state);
            state.params.clear();
            state.cached = None;
        }
        self.owner.remove_attribute(self.name());
    }

    /// [`AssociationProxy::reset`] followed by [`AssociationProxy::fetch`].
    ///
    /// # Errors
    ///
    /// As [`AssociationProxy::fetch`].
    pub async fn reload(&self) -> Result<Resource> {
        self.reset();
        self.fetch().await
    }

    /// Assigns logical nested data to the owner's slot.
    ///
    /// To-one: an object is merged into the existing nested record, or
    /// instantiated if there is none. To-many: an array (or an object whose
    /// values are objects) replaces the slot with a new collection.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parser`] if `value` has the wrong shape.
    pub fn assign_nested(&self, value: Value) -> Result<()> {
        self.assign(value, Source::Logical)
    }

    pub(crate) fn merge_wire(&self, value: Value) -> Result<()> {
        self.assign(value, Source::Wire)
    }

    fn assign(&self, value: Value, source: Source) -> Result<()> {
        let name = self.name().to_string();
        self.clear_cache();
        if value.is_null() {
            let cleared = match self.declaration.cardinality {
                Cardinality::One => Attribute::Value(Value::Null),
                Cardinality::Many => Attribute::Collection(Collection::new()),
            };
            self.owner.set_attribute(name, cleared);
            return Ok(());
        }
        let target = self.target()?;
        let build = |attributes: Params| match source {
            Source::Logical => target.build(attributes),
            Source::Wire => target.instantiate(attributes),
        };
        match self.declaration.cardinality {
            Cardinality::One => {
                let attributes = match value {
                    Value::Object(attributes) => attributes,
                    other => {
                        return Err(ResourceError::parser(format!(
                            "nested data for '{name}' should be an object, got {other}"
                        )))
                    }
                };
                if let Some(Attribute::Record(existing)) = self.slot() {
                    match source {
                        Source::Logical => existing.assign_attributes(attributes)?,
                        Source::Wire => existing.merge_wire(attributes)?,
                    }
                } else {
                    self.owner.set_attribute(name, Attribute::Record(build(attributes)?));
                }
            }
            Cardinality::Many => {
                let items: Vec<Value> = match value {
                    Value::Array(items) => items,
                    Value::Object(map) => map.into_iter().map(|(_, item)| item).collect(),
                    other => {
                        return Err(ResourceError::parser(format!(
                            "nested data for '{name}' should be an array, got {other}"
                        )))
                    }
                };
                let records = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(attributes) => build(attributes),
                        other => Err(ResourceError::parser(format!(
                            "nested element for '{name}' should be an object, got {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let collection = Collection::from_records(records);
                self.assign_inverse(&collection);
                self.owner
                    .set_attribute(name, Attribute::Collection(collection));
            }
        }
        Ok(())
    }
}
