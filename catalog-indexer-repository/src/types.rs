//! Result types for search index operations.

use crate::errors::SearchIndexError;

/// Result of a bulk operation for a single record.
///
/// Indicates whether writing one document succeeded and carries the error
/// when it did not.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The record's identifier.
    pub object_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a bulk operation containing aggregate statistics and individual results.
///
/// Provides a complete overview of one bulk write: the total number of records
/// submitted, how many succeeded and failed, and the per-record outcomes. This
/// allows callers to handle partial failures gracefully.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of records in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each record.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// An empty summary for a zero-record write.
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
        }
    }
}
