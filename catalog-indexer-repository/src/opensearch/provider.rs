//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::collections::HashMap;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    BulkParts, MgetParts, OpenSearch,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use catalog_indexer_shared::ProductRecord;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{BatchOperationResult, BatchOperationSummary};

/// OpenSearch provider implementation.
///
/// Stores product records as schema-free documents keyed by their identifier.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::opensearch::IndexConfig;
///
/// let config = IndexConfig::new("products", 0);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config).await?;
/// provider.ensure_index_exists().await?;
///
/// let existing = provider.get_documents(&["42".to_string()]).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias and version
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Extract found documents from an `_mget` response body.
    ///
    /// Documents with `found: false`, a missing id, or a non-object source
    /// are skipped.
    fn collect_found_documents(body: &Value) -> HashMap<String, ProductRecord> {
        let mut found = HashMap::new();

        let docs = match body["docs"].as_array() {
            Some(docs) => docs,
            None => return found,
        };

        for doc in docs {
            if doc["found"].as_bool() != Some(true) {
                continue;
            }
            let id = match doc["_id"].as_str() {
                Some(id) => id,
                None => continue,
            };
            match ProductRecord::from_value(doc["_source"].clone()) {
                Some(record) => {
                    found.insert(id.to_string(), record);
                }
                None => {
                    warn!(object_id = %id, "Stored document source is not a JSON object, skipping");
                }
            }
        }

        found
    }

    /// Build a per-record summary from a `_bulk` response body.
    ///
    /// Bulk responses list one item per request in submission order; items are
    /// paired with `object_ids` by position. A missing item counts as a
    /// failure for that record.
    fn summarize_bulk_response(body: &Value, object_ids: &[String]) -> BatchOperationSummary {
        let items = body["items"].as_array();

        let mut results = Vec::with_capacity(object_ids.len());
        let mut succeeded = 0;
        let mut failed = 0;

        for (position, object_id) in object_ids.iter().enumerate() {
            let item = items.and_then(|items| items.get(position));

            match item {
                Some(item) => {
                    let op = &item["index"];
                    let status = op["status"].as_u64().unwrap_or(0);

                    if (200..300).contains(&status) {
                        succeeded += 1;
                        results.push(BatchOperationResult {
                            object_id: object_id.clone(),
                            success: true,
                            error: None,
                        });
                    } else {
                        failed += 1;
                        let reason = op["error"]["reason"]
                            .as_str()
                            .unwrap_or("unknown bulk failure");
                        results.push(BatchOperationResult {
                            object_id: object_id.clone(),
                            success: false,
                            error: Some(SearchIndexError::bulk_index(format!(
                                "status {}: {}",
                                status, reason
                            ))),
                        });
                    }
                }
                None => {
                    failed += 1;
                    results.push(BatchOperationResult {
                        object_id: object_id.clone(),
                        success: false,
                        error: Some(SearchIndexError::parse(
                            "bulk response is missing an item for this record",
                        )),
                    });
                }
            }
        }

        BatchOperationSummary {
            total: object_ids.len(),
            succeeded,
            failed,
            results,
        }
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Ensure the versioned index and its alias exist, creating them if necessary.
    ///
    /// The physical index is created under its versioned name (e.g.
    /// "products_v0") with the alias attached, so reads and writes always go
    /// through the alias.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let index_name = self.index_config.versioned_name();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index_name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            debug!(index = %index_name, "Index already exists");
            return Ok(());
        }

        if status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::connection(format!(
                "Index existence check failed with status {}: {}",
                status, error_body
            )));
        }

        let mut body = get_index_settings();
        let mut aliases = Map::new();
        aliases.insert(self.index_config.alias.clone(), json!({}));
        body["aliases"] = Value::Object(aliases);

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(
            index = %index_name,
            alias = %self.index_config.alias,
            "Created search index"
        );
        Ok(())
    }

    /// Fetch the currently-stored documents for a set of identifiers.
    ///
    /// Uses the multi-get API against the alias. Identifiers that do not
    /// exist in the index are simply absent from the result.
    async fn get_documents(
        &self,
        object_ids: &[String],
    ) -> Result<HashMap<String, ProductRecord>, SearchIndexError> {
        if object_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .client
            .mget(MgetParts::Index(&self.index_config.alias))
            .body(json!({ "ids": object_ids }))
            .send()
            .await
            .map_err(|e| SearchIndexError::lookup(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Multi-get request failed");
            return Err(SearchIndexError::lookup(format!(
                "Multi-get failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let found = Self::collect_found_documents(&body);
        debug!(
            requested = object_ids.len(),
            found = found.len(),
            "Fetched existing documents"
        );
        Ok(found)
    }

    /// Write a set of documents in one bulk request and await visibility.
    ///
    /// Documents are indexed whole (the caller has already merged them with
    /// the stored state) under their identifier. The request carries
    /// `refresh=wait_for`, so a subsequent lookup observes these writes once
    /// this method returns.
    async fn bulk_upsert_documents(
        &self,
        records: &[ProductRecord],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if records.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(records.len() * 2);
        let mut object_ids = Vec::with_capacity(records.len());

        for record in records {
            let object_id = record.object_id().ok_or_else(|| {
                SearchIndexError::validation("record is missing a non-null string objectID")
            })?;

            body.push(json!({ "index": { "_id": object_id } }).into());
            let doc = serde_json::to_value(record)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(doc.into());
            object_ids.push(object_id.to_string());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.alias))
            .refresh(Refresh::WaitFor)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::summarize_bulk_response(&body, &object_ids);
        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk upsert completed"
        );
        Ok(summary)
    }
}
