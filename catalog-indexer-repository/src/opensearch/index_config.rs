//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the product
//! catalog index.

use serde_json::{json, Value};

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 0 for "products_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// The versioned physical index name behind the alias.
    pub fn versioned_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

/// Get the index settings and mappings for the product catalog index.
///
/// Product records are schema-free, so the mapping is dynamic apart from the
/// identifier field, which is mapped as a keyword for exact lookups.
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic": true,
            "properties": {
                "objectID": {
                    "type": "keyword"
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["settings"]["number_of_replicas"].is_number());

        assert_eq!(settings["mappings"]["dynamic"], true);
        assert_eq!(
            settings["mappings"]["properties"]["objectID"]["type"],
            "keyword"
        );
    }

    #[test]
    fn test_versioned_name() {
        assert_eq!(IndexConfig::new("products", 0).versioned_name(), "products_v0");
        assert_eq!(IndexConfig::new("products", 3).versioned_name(), "products_v3");
        assert_eq!(IndexConfig::new("catalog", 42).versioned_name(), "catalog_v42");
    }
}
