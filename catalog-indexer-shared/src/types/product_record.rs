//! Product record type for the catalog indexer.
//!
//! This module defines the schema-free record shape that product-update events
//! carry and that the search index stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The mandatory identifier field of a product record.
pub const OBJECT_ID_FIELD: &str = "objectID";

/// A schema-free product record.
///
/// Records are open mappings from field name to JSON value; apart from the
/// identifier field there is no fixed field set. The only structural
/// requirement is that a record carries a non-null string under
/// [`OBJECT_ID_FIELD`]; records without one are dropped before they reach
/// the merge engine.
///
/// The wrapper serializes transparently, so a record round-trips through the
/// search index as the plain JSON object it was received as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Map<String, Value>);

impl ProductRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value.
    ///
    /// Returns `None` when the value is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The record's identifier, if present as a non-null string.
    ///
    /// A missing field, a JSON null, or a non-string value all yield `None`;
    /// such records are invalid and are filtered out before merging.
    pub fn object_id(&self) -> Option<&str> {
        self.0.get(OBJECT_ID_FIELD).and_then(Value::as_str)
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the record carries the given field, regardless of its value.
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set a field, returning the previous value if there was one.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Iterate over the record's fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, yielding the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ProductRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ProductRecord> for Value {
    fn from(record: ProductRecord) -> Self {
        Value::Object(record.0)
    }
}
