//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use std::collections::HashMap;

use async_trait::async_trait;

use catalog_indexer_shared::ProductRecord;

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into the orchestrator to enable dependency
/// injection and easy testing with mock implementations. All methods return
/// `Result<T, SearchIndexError>` for consistent error handling across
/// backends.
///
/// # Note on Document Creation
///
/// There is no separate `create_document` function. `bulk_upsert_documents`
/// writes full documents keyed by their identifier: a document is created if
/// it doesn't exist and replaced if it does. The caller is responsible for
/// having merged the incoming record with the existing document first.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index and its alias exist, creating them if necessary.
    ///
    /// This method should be called during application startup so the backend
    /// is ready before any document operations are performed.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Fetch the currently-stored documents for a set of identifiers.
    ///
    /// A missing identifier is simply absent from the result, not an error -
    /// the record not existing yet is a legitimate outcome. Failure signaling
    /// is reserved for true backend errors (connection failure, malformed
    /// response).
    ///
    /// # Arguments
    ///
    /// * `object_ids` - The identifiers to look up
    ///
    /// # Returns
    ///
    /// * `Ok(HashMap<String, ProductRecord>)` - Stored records keyed by identifier,
    ///   restricted to identifiers that exist in the index
    /// * `Err(SearchIndexError)` - If the lookup fails
    async fn get_documents(
        &self,
        object_ids: &[String],
    ) -> Result<HashMap<String, ProductRecord>, SearchIndexError>;

    /// Write a set of documents in one bulk request and await visibility.
    ///
    /// The returned summary reflects per-document outcomes; implementations
    /// must not return `Ok` before the written documents are visible to a
    /// subsequent lookup, since the caller relies on that ordering across
    /// batches.
    ///
    /// # Arguments
    ///
    /// * `records` - Full documents to write, each carrying its identifier
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Aggregate statistics and individual results
    /// * `Err(SearchIndexError)` - If the bulk operation fails entirely
    async fn bulk_upsert_documents(
        &self,
        records: &[ProductRecord],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
