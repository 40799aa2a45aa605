//! Kafka consumer implementation for the catalog indexer.
//!
//! Consumes product-update messages from Kafka, assembles them into batches
//! and forwards the batches to the orchestrator. Offsets are committed only
//! after the orchestrator acknowledges a batch as durably written.

use std::time::Duration;

use chrono::Utc;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    message::Message as KafkaMessage,
    TopicPartitionList,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use catalog_indexer_shared::ProductRecord;

use crate::batcher::{Batch, Batcher};
use crate::consumer::messages::{SourceOffset, StreamMessage};
use crate::consumer::INGESTED_AT_FIELD;
use crate::errors::IngestError;

/// Field stamped onto live records with the source partition.
pub const PARTITION_FIELD: &str = "_partition";

/// Field stamped onto live records with the source offset.
pub const OFFSET_FIELD: &str = "_offset";

/// Default maximum time to hold a partial batch before flushing (milliseconds).
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Kafka consumer for product-update messages.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Topic carrying product updates
    /// * `batch_size` - Number of records to batch before forwarding
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
    ) -> Result<Self, IngestError> {
        Self::with_batch_config(brokers, group_id, topic, batch_size, DEFAULT_BATCH_TIMEOUT_MS)
    }

    /// Create a new Kafka consumer with a custom partial-batch timeout.
    pub fn with_batch_config(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
        batch_timeout_ms: u64,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout_ms,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            batch_size,
            batch_timeout: Duration::from_millis(batch_timeout_ms),
        })
    }

    /// Subscribe to the configured topic.
    pub fn subscribe(&self) -> Result<(), IngestError> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topic = %self.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Start consuming messages and send assembled batches through the channel.
    ///
    /// # Arguments
    ///
    /// * `sender` - Channel to send batches to
    /// * `ack_receiver` - Channel to receive acknowledgments from the orchestrator
    /// * `shutdown` - Shutdown signal receiver
    pub async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batcher = Batcher::new(self.batch_size);
        let mut pending_offsets: Vec<SourceOffset> = Vec::new();
        let mut flush_timer = tokio::time::interval(self.batch_timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Don't flush pending records - they haven't been committed
                    // and will be re-read from the last committed offset on restart
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                // Handle acknowledgments from the orchestrator
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            if success {
                                if let Err(e) = self.commit_offsets(&offsets) {
                                    error!(error = %e, "Failed to commit offsets after acknowledgment");
                                } else {
                                    debug!(offset_count = offsets.len(), "Committed offsets after successful processing");
                                }
                            } else {
                                error!(
                                    offset_count = offsets.len(),
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Not committing offsets for failed batch"
                                );
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {
                            // Ignore other message types
                        }
                    }
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = %msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Received message from Kafka"
                            );
                            match self.parse_record(&msg) {
                                Some(record) => {
                                    pending_offsets.push((msg.topic().to_string(), msg.partition(), msg.offset()));
                                    if let Some(batch) = batcher.offer(record) {
                                        let offsets = std::mem::take(&mut pending_offsets);
                                        Self::send_batch(batch, offsets, &sender).await?;
                                    }
                                }
                                None => {
                                    // Unusable payload, commit the offset immediately so
                                    // we don't re-read this message on restart
                                    let mut tpl = TopicPartitionList::new();
                                    tpl.add_partition_offset(
                                        msg.topic(),
                                        msg.partition(),
                                        rdkafka::Offset::Offset(msg.offset() + 1)
                                    )
                                    .map_err(|e| IngestError::kafka(e.to_string()))?;
                                    self.consumer
                                        .commit(&tpl, rdkafka::consumer::CommitMode::Async)
                                        .map_err(|e| IngestError::kafka(e.to_string()))?;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            // Flush any pending records
                            if let Some(batch) = batcher.flush() {
                                let offsets = std::mem::take(&mut pending_offsets);
                                Self::send_batch(batch, offsets, &sender).await?;
                            }
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    // Flush if timeout reached and we have pending records
                    if let Some(batch) = batcher.flush() {
                        debug!(count = batch.len(), "Flushing partial batch due to timeout");
                        let offsets = std::mem::take(&mut pending_offsets);
                        Self::send_batch(batch, offsets, &sender).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Send a completed batch with its offsets to the orchestrator.
    async fn send_batch(
        batch: Batch,
        offsets: Vec<SourceOffset>,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        info!(
            record_count = batch.len(),
            offset_count = offsets.len(),
            "Sending batch to orchestrator"
        );
        sender
            .send(StreamMessage::Batch { batch, offsets })
            .await
            .map_err(|e| IngestError::ChannelError(e.to_string()))
    }

    /// Commit offsets for a batch of messages.
    fn commit_offsets(&self, offsets: &[SourceOffset]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, rdkafka::Offset::Offset(offset + 1))
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        Ok(())
    }

    /// Parse a Kafka message payload into a product record.
    ///
    /// Returns `None` for empty, non-JSON or non-object payloads; those carry
    /// no work and are skipped. Parsed records are stamped with the source
    /// partition, offset and ingest time before batching.
    fn parse_record(
        &self,
        msg: &rdkafka::message::BorrowedMessage<'_>,
    ) -> Option<ProductRecord> {
        let payload = match msg.payload() {
            Some(p) => p,
            None => {
                debug!("Received message with empty payload");
                return None;
            }
        };

        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    topic = %msg.topic(),
                    partition = msg.partition(),
                    offset = msg.offset(),
                    error = %e,
                    "Skipping non-JSON payload"
                );
                return None;
            }
        };

        let mut record = match ProductRecord::from_value(value) {
            Some(record) => record,
            None => {
                warn!(
                    topic = %msg.topic(),
                    partition = msg.partition(),
                    offset = msg.offset(),
                    "Skipping non-object payload"
                );
                return None;
            }
        };

        record.insert(
            INGESTED_AT_FIELD,
            Value::String(Utc::now().to_rfc3339()),
        );
        record.insert(PARTITION_FIELD, Value::from(msg.partition()));
        record.insert(OFFSET_FIELD, Value::from(msg.offset()));

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PARTITION_FIELD, "_partition");
        assert_eq!(OFFSET_FIELD, "_offset");
        assert_eq!(DEFAULT_BATCH_TIMEOUT_MS, 1000);
    }
}
