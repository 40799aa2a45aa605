//! Integration tests for the catalog indexer orchestrator.
//!
//! These tests drive the real orchestrator batch path against a mock
//! SearchIndexProvider, covering enrichment, lookup degradation, write
//! failures and identifier filtering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use catalog_indexer::batcher::Batch;
use catalog_indexer::orchestrator::Orchestrator;
use catalog_indexer_repository::{
    BatchOperationResult, BatchOperationSummary, SearchIndexError, SearchIndexProvider,
};
use catalog_indexer_shared::ProductRecord;

/// Mock search provider backed by an in-memory document store.
///
/// Successful upserts are applied to the store, so a later batch's lookup
/// observes an earlier batch's writes the way it would against a real index.
struct MockSearchProvider {
    store: Mutex<HashMap<String, ProductRecord>>,
    lookup_calls: Mutex<Vec<Vec<String>>>,
    upsert_calls: Mutex<Vec<Vec<ProductRecord>>>,
    fail_lookup: AtomicBool,
    fail_upsert: AtomicBool,
}

impl MockSearchProvider {
    fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            lookup_calls: Mutex::new(Vec::new()),
            upsert_calls: Mutex::new(Vec::new()),
            fail_lookup: AtomicBool::new(false),
            fail_upsert: AtomicBool::new(false),
        }
    }

    fn prime(&self, record: ProductRecord) {
        let id = record.object_id().expect("primed record needs an id").to_string();
        self.store.lock().unwrap().insert(id, record);
    }

    fn lookup_call_count(&self) -> usize {
        self.lookup_calls.lock().unwrap().len()
    }

    fn upsert_call_count(&self) -> usize {
        self.upsert_calls.lock().unwrap().len()
    }

    fn last_upserted(&self) -> Vec<ProductRecord> {
        self.upsert_calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn get_documents(
        &self,
        object_ids: &[String],
    ) -> Result<HashMap<String, ProductRecord>, SearchIndexError> {
        self.lookup_calls.lock().unwrap().push(object_ids.to_vec());

        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(SearchIndexError::lookup("mock lookup failure"));
        }

        let store = self.store.lock().unwrap();
        Ok(object_ids
            .iter()
            .filter_map(|id| store.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }

    async fn bulk_upsert_documents(
        &self,
        records: &[ProductRecord],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(SearchIndexError::bulk_index("mock writer failure"));
        }

        self.upsert_calls.lock().unwrap().push(records.to_vec());

        let mut store = self.store.lock().unwrap();
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let id = record.object_id().expect("merged record needs an id");
            store.insert(id.to_string(), record.clone());
            results.push(BatchOperationResult {
                object_id: id.to_string(),
                success: true,
                error: None,
            });
        }

        Ok(BatchOperationSummary {
            total: records.len(),
            succeeded: records.len(),
            failed: 0,
            results,
        })
    }
}

fn record(value: serde_json::Value) -> ProductRecord {
    ProductRecord::from_value(value).expect("object value")
}

fn new_records(count: usize) -> Vec<ProductRecord> {
    (0..count)
        .map(|i| record(json!({"objectID": i.to_string(), "name": format!("Product {}", i)})))
        .collect()
}

#[tokio::test]
async fn test_batch_of_new_records_written_in_full() {
    let provider = Arc::new(MockSearchProvider::new());
    let mut orchestrator = Orchestrator::new(provider.clone());

    let batch = Batch::from_records(new_records(250));
    orchestrator.process_batch(batch).await.unwrap();

    let stats = orchestrator.statistics();
    assert_eq!(stats.messages_processed, 250);
    assert_eq!(stats.records_written, 250);
    assert_eq!(stats.batch_errors, 0);
    assert_eq!(provider.last_upserted().len(), 250);
}

#[tokio::test]
async fn test_writer_failure_counts_one_batch_error_and_run_continues() {
    let provider = Arc::new(MockSearchProvider::new());
    let mut orchestrator = Orchestrator::new(provider.clone());

    provider.fail_upsert.store(true, Ordering::SeqCst);
    let result = orchestrator
        .process_batch(Batch::from_records(new_records(3)))
        .await;
    assert!(result.is_err());
    assert_eq!(orchestrator.statistics().batch_errors, 1);
    assert_eq!(orchestrator.statistics().records_written, 0);

    // The next batch goes through untouched by the earlier failure
    provider.fail_upsert.store(false, Ordering::SeqCst);
    orchestrator
        .process_batch(Batch::from_records(new_records(2)))
        .await
        .unwrap();

    let stats = orchestrator.statistics();
    assert_eq!(stats.batch_errors, 1);
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.messages_processed, 5);
}

#[tokio::test]
async fn test_lookup_failure_degrades_to_insert_as_new() {
    let provider = Arc::new(MockSearchProvider::new());
    provider.prime(record(json!({"objectID": "1", "name": "Catalog"})));
    provider.fail_lookup.store(true, Ordering::SeqCst);

    let mut orchestrator = Orchestrator::new(provider.clone());
    let incoming = record(json!({"objectID": "1", "name": "Stream", "rating": 5}));
    orchestrator
        .process_batch(Batch::from_records(vec![incoming.clone()]))
        .await
        .unwrap();

    // The batch is written verbatim, and the failed lookup is not a batch error
    let stats = orchestrator.statistics();
    assert_eq!(stats.batch_errors, 0);
    assert_eq!(stats.records_written, 1);
    assert_eq!(provider.last_upserted(), vec![incoming]);
}

#[tokio::test]
async fn test_catalog_fields_survive_enrichment() {
    let provider = Arc::new(MockSearchProvider::new());
    provider.prime(record(json!({
        "objectID": "1", "name": "Catalog", "price": 100, "description": "D"
    })));

    let mut orchestrator = Orchestrator::new(provider.clone());
    orchestrator
        .process_batch(Batch::from_records(vec![record(json!({
            "objectID": "1", "name": "Kafka", "price": 50, "description": "K", "rating": 5
        }))]))
        .await
        .unwrap();

    let written = provider.last_upserted();
    assert_eq!(
        serde_json::to_value(&written[0]).unwrap(),
        json!({
            "objectID": "1", "name": "Catalog", "price": 100,
            "description": "D", "rating": 5
        })
    );
}

#[tokio::test]
async fn test_falsy_catalog_values_survive_enrichment() {
    let provider = Arc::new(MockSearchProvider::new());
    provider.prime(record(json!({"objectID": "1", "price": 0, "description": ""})));

    let mut orchestrator = Orchestrator::new(provider.clone());
    orchestrator
        .process_batch(Batch::from_records(vec![record(json!({
            "objectID": "1", "price": 100, "description": "x"
        }))]))
        .await
        .unwrap();

    let written = provider.last_upserted();
    assert_eq!(written[0].get("price"), Some(&json!(0)));
    assert_eq!(written[0].get("description"), Some(&json!("")));
}

#[tokio::test]
async fn test_records_without_identifier_are_filtered() {
    let provider = Arc::new(MockSearchProvider::new());
    let mut orchestrator = Orchestrator::new(provider.clone());

    orchestrator
        .process_batch(Batch::from_records(vec![
            record(json!({"objectID": "1", "name": "A"})),
            record(json!({"name": "no id"})),
            record(json!({"objectID": null, "name": "null id"})),
            record(json!({"objectID": "2", "name": "B"})),
        ]))
        .await
        .unwrap();

    // Dropped records never reach the lookup id set nor the writer input
    let lookups = provider.lookup_calls.lock().unwrap().clone();
    assert_eq!(lookups, vec![vec!["1".to_string(), "2".to_string()]]);
    assert_eq!(provider.last_upserted().len(), 2);

    let stats = orchestrator.statistics();
    assert_eq!(stats.messages_processed, 4);
    assert_eq!(stats.records_dropped, 2);
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.batch_errors, 0);
}

#[tokio::test]
async fn test_batch_with_no_valid_records_touches_nothing() {
    let provider = Arc::new(MockSearchProvider::new());
    let mut orchestrator = Orchestrator::new(provider.clone());

    orchestrator
        .process_batch(Batch::from_records(vec![record(json!({"name": "no id"}))]))
        .await
        .unwrap();

    assert_eq!(provider.lookup_call_count(), 0);
    assert_eq!(provider.upsert_call_count(), 0);
    assert_eq!(orchestrator.statistics().records_dropped, 1);
}

#[tokio::test]
async fn test_later_batch_observes_earlier_writes() {
    let provider = Arc::new(MockSearchProvider::new());
    let mut orchestrator = Orchestrator::new(provider.clone());

    orchestrator
        .process_batch(Batch::from_records(vec![record(json!({
            "objectID": "1", "name": "First"
        }))]))
        .await
        .unwrap();

    orchestrator
        .process_batch(Batch::from_records(vec![record(json!({
            "objectID": "1", "name": "Second", "rating": 5
        }))]))
        .await
        .unwrap();

    let written = provider.last_upserted();
    assert_eq!(written[0].get("name"), Some(&json!("First")));
    assert_eq!(written[0].get("rating"), Some(&json!(5)));
    assert_eq!(orchestrator.statistics().records_written, 2);
}

#[tokio::test]
async fn test_duplicate_ids_within_a_batch_all_written() {
    let provider = Arc::new(MockSearchProvider::new());
    provider.prime(record(json!({"objectID": "1", "name": "Catalog"})));

    let mut orchestrator = Orchestrator::new(provider.clone());
    orchestrator
        .process_batch(Batch::from_records(vec![
            record(json!({"objectID": "1", "rating": 3})),
            record(json!({"objectID": "1", "rating": 5})),
        ]))
        .await
        .unwrap();

    // Both occurrences are written in order; the last one wins in the store
    let written = provider.last_upserted();
    assert_eq!(written.len(), 2);
    let stored = provider.store.lock().unwrap().get("1").cloned().unwrap();
    assert_eq!(stored.get("rating"), Some(&json!(5)));
    assert_eq!(stored.get("name"), Some(&json!("Catalog")));
}
