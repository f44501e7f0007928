//! Bidirectional mapping between logical attribute names and wire field names.
//!
//! Every component that moves a key across the wire boundary goes through a
//! [`FieldMap`]: record building (wire → logical), persistence bodies and
//! association filters/sort keys (logical → wire). Unmapped keys pass through
//! unchanged.

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::{ResourceError, Result};
use crate::types::Params;

/// Bijective attribute ↔ wire-field map for one resource class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    to_source: IndexMap<String, String>,
    to_logical: IndexMap<String, String>,
}

impl FieldMap {
    /// Creates an empty (identity) map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `logical` to `wire`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Configuration`] if either side is already mapped to
    /// something else, or if `wire` collides with an unmapped logical name
    /// that would pass through as the same key.
    pub fn insert(&mut self, logical: impl Into<String>, wire: impl Into<String>) -> Result<()> {
        let logical = logical.into();
        let wire = wire.into();
        if let Some(existing) = self.to_source.get(&logical) {
            if *existing == wire {
                return Ok(());
            }
            return Err(ResourceError::configuration(format!(
                "attribute '{logical}' is already mapped to field '{existing}'"
            )));
        }
        if let Some(existing) = self.to_logical.get(&wire) {
            return Err(ResourceError::configuration(format!(
                "field '{wire}' is already mapped to attribute '{existing}'"
            )));
        }
        if wire != logical && self.to_logical.contains_key(&logical) {
            return Err(ResourceError::configuration(format!(
                "attribute '{logical}' is already used as a wire field name"
            )));
        }
        self.to_logical.insert(wire.clone(), logical.clone());
        self.to_source.insert(logical, wire);
        Ok(())
    }

    /// Wire field name for a logical attribute name.
    pub fn to_source<'a>(&'a self, logical: &'a str) -> &'a str {
        self.to_source.get(logical).map_or(logical, String::as_str)
    }

    /// Logical attribute name for a wire field name.
    pub fn to_logical<'a>(&'a self, wire: &'a str) -> &'a str {
        self.to_logical.get(wire).map_or(wire, String::as_str)
    }

    /// Translates every key of a logical map to wire names.
    pub fn params_to_source(&self, params: &Params) -> Params {
        params
            .iter()
            .map(|(k, v)| (self.to_source(k).to_string(), v.clone()))
            .collect()
    }

    /// Translates every key of a wire map to logical names.
    pub fn params_to_logical(&self, params: &Params) -> Params {
        params
            .iter()
            .map(|(k, v)| (self.to_logical(k).to_string(), v.clone()))
            .collect()
    }

    /// Translates a sequence of logical keys to wire names.
    pub fn keys_to_source<'a, I>(&'a self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().map(|k| self.to_source(k).to_string()).collect()
    }

    /// Number of explicit mappings.
    pub fn len(&self) -> usize {
        self.to_source.len()
    }

    /// Returns `true` when no explicit mapping exists.
    pub fn is_empty(&self) -> bool {
        self.to_source.is_empty()
    }

    /// Iterates over `(logical, wire)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.to_source.iter().map(|(l, w)| (l.as_str(), w.as_str()))
    }
}

/// Renders a JSON value into the string form used in paths and query strings.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_fields() -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("id", "InvoiceDID").unwrap();
        map.insert("number", "InvoiceNumber").unwrap();
        map.insert("due_at", "EndDT").unwrap();
        map
    }

    #[test]
    fn maps_both_directions_and_passes_through_unmapped() {
        let map = invoice_fields();
        assert_eq!(map.to_source("due_at"), "EndDT");
        assert_eq!(map.to_logical("EndDT"), "due_at");
        assert_eq!(map.to_source("status"), "status");
        assert_eq!(map.to_logical("Status"), "Status");
    }

    #[test]
    fn bulk_translation() {
        let map = invoice_fields();
        let params = json!({"number": 7, "status": "OPN"});
        let wire = map.params_to_source(params.as_object().unwrap());
        assert_eq!(Value::Object(wire.clone()), json!({"InvoiceNumber": 7, "status": "OPN"}));
        assert_eq!(Value::Object(map.params_to_logical(&wire)), params);
        assert_eq!(map.keys_to_source(["id", "total"]), vec!["InvoiceDID", "total"]);
    }

    #[test]
    fn rejects_non_bijective_mappings() {
        let mut map = invoice_fields();
        assert!(map.insert("number", "Other").is_err());
        assert!(map.insert("other", "InvoiceNumber").is_err());
        assert!(map.insert("number", "InvoiceNumber").is_ok());
    }

    #[test]
    fn rejects_logical_name_shadowing_a_wire_name() {
        let mut map = FieldMap::new();
        map.insert("name", "title").unwrap();
        assert!(map.insert("title", "heading").is_err());
    }
}
