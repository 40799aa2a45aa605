//! Message types for the consumer.
//!
//! Defines the channel protocol between the consumer task and the
//! orchestrator.

use crate::batcher::Batch;

/// Source position of one consumed record: (topic, partition, offset).
pub type SourceOffset = (String, i32, i64);

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of records with associated offsets for acknowledgment.
    Batch {
        batch: Batch,
        offsets: Vec<SourceOffset>,
    },
    /// Acknowledgment that a batch was processed.
    Acknowledgment {
        offsets: Vec<SourceOffset>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
