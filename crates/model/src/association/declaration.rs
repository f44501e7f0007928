//! Class-level association declarations.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ResourceError, Result};
use crate::identifiers::{AssociationName, ClassName};

/// How many records an association resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// A single record (`has_one`).
    One,
    /// A collection of records (`has_many`).
    Many,
}

/// Optional settings for a `has_many` / `has_one` declaration.
///
/// Anything left unset is filled in by [`AssociationDeclaration::attach`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssociationOptions {
    /// Target class name. Default: the singular of the association name in
    /// `UpperCamelCase`.
    #[serde(default)]
    pub class_name: Option<String>,
    /// Key under which inline data arrives in the owner's payload. Default:
    /// the association name.
    #[serde(default)]
    pub data_key: Option<String>,
    /// Default value template. Default: `[]` for many, `null` for one.
    #[serde(default)]
    pub default: Option<Value>,
    /// Path suffix appended to the owner's resource path. Default: `/<name>`.
    #[serde(default)]
    pub path: Option<String>,
    /// Attribute on each fetched child that points back at the owner. Default:
    /// the owner's singular resource name.
    #[serde(default)]
    pub inverse_of: Option<String>,
}

impl AssociationOptions {
    /// Sets the target class name.
    #[must_use]
    pub fn class_name(mut self, value: impl Into<String>) -> Self {
        self.class_name = Some(value.into());
        self
    }

    /// Sets the inline data key.
    #[must_use]
    pub fn data_key(mut self, value: impl Into<String>) -> Self {
        self.data_key = Some(value.into());
        self
    }

    /// Sets the default value template.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the path suffix.
    #[must_use]
    pub fn path(mut self, value: impl Into<String>) -> Self {
        self.path = Some(value.into());
        self
    }

    /// Sets the inverse relationship name.
    #[must_use]
    pub fn inverse_of(mut self, value: impl Into<String>) -> Self {
        self.inverse_of = Some(value.into());
        self
    }
}

/// Immutable description of one relationship, shared by every record of the
/// owning class.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationDeclaration {
    /// Logical association name.
    pub name: AssociationName,
    /// Target class.
    pub class_name: ClassName,
    /// Inline data key in the owner's payload.
    pub data_key: String,
    /// Default value template; never handed out directly.
    pub default: Value,
    /// Path suffix relative to the owner's resource path.
    pub path: String,
    /// Explicit inverse relationship name.
    pub inverse_of: Option<String>,
    /// One or many.
    pub cardinality: Cardinality,
}

impl AssociationDeclaration {
    /// Builds a declaration, filling every unset option with its default.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] for an empty association or class
    /// name, or a default template that does not fit the cardinality.
    pub fn attach(
        cardinality: Cardinality,
        name: &str,
        options: AssociationOptions,
    ) -> Result<Self> {
        let name = AssociationName::new(name)
            .ok_or_else(|| ResourceError::configuration("association name must not be empty"))?;
        let class_name = match options.class_name {
            Some(explicit) => ClassName::new(explicit).ok_or_else(|| {
                ResourceError::configuration(format!("association '{name}' has an empty class_name"))
            })?,
            None => name.classify(),
        };
        let default = match (cardinality, options.default) {
            (_, Some(value)) => value,
            (Cardinality::Many, None) => Value::Array(Vec::new()),
            (Cardinality::One, None) => Value::Null,
        };
        let fits = match cardinality {
            Cardinality::Many => default.is_array() || default.is_null(),
            Cardinality::One => default.is_object() || default.is_null(),
        };
        if !fits {
            return Err(ResourceError::configuration(format!(
                "default for association '{name}' does not match its cardinality"
            )));
        }
        Ok(Self {
            data_key: options.data_key.unwrap_or_else(|| name.as_str().to_string()),
            path: options.path.unwrap_or_else(|| format!("/{name}")),
            inverse_of: options.inverse_of,
            class_name,
            default,
            cardinality,
            name,
        })
    }

    /// Returns `true` for `has_many` declarations.
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}
