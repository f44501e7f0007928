//! Newtype names used by the class-level schema.
//!
//! A class name (`"Comment"`) and an association name (`"comments"`) are both
//! strings, but they live in different namespaces and follow different naming
//! conventions. Distinct newtypes keep them from being interchanged.

use serde::{Deserialize, Serialize};

use crate::inflection;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new name, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Name of a resource class in `UpperCamelCase` (e.g. `"Comment"`).
    ///
    /// Used as the registry key in [`crate::Schema`] and as the target of an
    /// association declaration.
    ClassName
}

string_id! {
    /// Logical name of an association on its owning class (e.g. `"comments"`).
    AssociationName
}

impl ClassName {
    /// Singular `snake_case` resource name (`"BlogPost"` → `"blog_post"`).
    ///
    /// Used for foreign keys (`blog_post_id`) and default inverse names.
    pub fn resource_name(&self) -> String {
        inflection::resource_name(&self.0)
    }

    /// Plural `snake_case` collection name (`"BlogPost"` → `"blog_posts"`).
    pub fn collection_name(&self) -> String {
        inflection::pluralize(&self.resource_name())
    }
}

impl AssociationName {
    /// Class name implied by the association name (`"comments"` → `"Comment"`).
    pub fn classify(&self) -> ClassName {
        ClassName(inflection::classify(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        assert!(ClassName::new("").is_none());
        assert!(AssociationName::new("   ").is_none());
    }

    #[test]
    fn class_name_conventions() {
        let name = ClassName::new("BlogPost").unwrap();
        assert_eq!(name.resource_name(), "blog_post");
        assert_eq!(name.collection_name(), "blog_posts");
    }

    #[test]
    fn association_name_classifies_to_singular_class() {
        let name = AssociationName::new("comments").unwrap();
        assert_eq!(name.classify().as_str(), "Comment");
        let name = AssociationName::new("categories").unwrap();
        assert_eq!(name.classify().as_str(), "Category");
    }
}
