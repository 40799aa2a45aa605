//! Batch assembly for the ingest flow.
//!
//! Records arrive one at a time from the source; the batcher groups them into
//! bounded batches that the orchestrator processes as a unit.

use catalog_indexer_shared::ProductRecord;

/// A bounded group of records processed together through lookup, merge and
/// write.
///
/// Batch size is bounded above by the configured threshold, except the final
/// batch of a run, which may be smaller (flush on exhaustion).
#[derive(Debug, Clone)]
pub struct Batch {
    records: Vec<ProductRecord>,
}

impl Batch {
    /// Build a batch from a sequence of records.
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        Self { records }
    }

    /// The records in arrival order.
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    /// Consume the batch, yielding its records.
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }

    /// The distinct identifiers in this batch, in first-seen order.
    ///
    /// Records without a valid identifier contribute nothing here.
    pub fn object_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for record in &self.records {
            if let Some(id) = record.object_id() {
                if !ids.iter().any(|seen| seen == id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Accumulates records and emits a [`Batch`] when the size threshold is
/// reached or the caller flushes.
///
/// After emitting, the internal buffer resets to empty. Partial batches are
/// only emitted through [`Batcher::flush`]; callers must flush at
/// end-of-input so trailing records are never dropped.
#[derive(Debug)]
pub struct Batcher {
    buffer: Vec<ProductRecord>,
    batch_size: usize,
}

impl Batcher {
    /// Create a batcher with the given size threshold.
    ///
    /// `batch_size` must be positive; configuration rejects zero before a
    /// batcher is ever constructed.
    pub fn new(batch_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Accept one record; returns a full batch once the threshold is reached.
    pub fn offer(&mut self, record: ProductRecord) -> Option<Batch> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.take()
        } else {
            None
        }
    }

    /// Emit whatever is buffered, or `None` when the buffer is empty.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            None
        } else {
            self.take()
        }
    }

    /// Number of buffered records awaiting a batch.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take(&mut self) -> Option<Batch> {
        let records = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        Some(Batch::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> ProductRecord {
        ProductRecord::from_value(json!({"objectID": id})).unwrap()
    }

    #[test]
    fn test_emits_at_threshold() {
        let mut batcher = Batcher::new(3);

        assert!(batcher.offer(record("1")).is_none());
        assert!(batcher.offer(record("2")).is_none());
        let batch = batcher.offer(record("3")).expect("full batch");

        assert_eq!(batch.len(), 3);
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_buffer_resets_after_emission() {
        let mut batcher = Batcher::new(2);

        let first = batcher.offer(record("1")).is_none() && batcher.offer(record("2")).is_some();
        assert!(first);

        assert!(batcher.offer(record("3")).is_none());
        let second = batcher.offer(record("4")).expect("second batch");
        let ids = second.object_ids();
        assert_eq!(ids, vec!["3", "4"]);
    }

    #[test]
    fn test_flush_emits_partial_batch() {
        let mut batcher = Batcher::new(10);
        batcher.offer(record("1"));
        batcher.offer(record("2"));

        let batch = batcher.flush().expect("partial batch");
        assert_eq!(batch.len(), 2);
        assert!(batcher.flush().is_none());
    }

    #[test]
    fn test_flush_empty_is_none() {
        let mut batcher = Batcher::new(5);
        assert!(batcher.flush().is_none());
    }

    #[test]
    fn test_object_ids_distinct_first_seen_order() {
        let batch = Batch::from_records(vec![
            record("b"),
            record("a"),
            record("b"),
            ProductRecord::from_value(json!({"name": "no id"})).unwrap(),
        ]);

        assert_eq!(batch.object_ids(), vec!["b", "a"]);
        assert_eq!(batch.len(), 4);
    }
}
