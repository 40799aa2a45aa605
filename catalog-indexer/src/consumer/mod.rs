//! Consumer module for the catalog indexer ingest.
//!
//! Provides the Kafka consumer for the live feed and the capture loader for
//! demo mode.

pub mod capture;
mod kafka_consumer;
mod messages;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{SourceOffset, StreamMessage};

/// Field stamped onto every record with the UTC time it was pulled from the
/// source.
pub const INGESTED_AT_FIELD: &str = "_ingested_at";
