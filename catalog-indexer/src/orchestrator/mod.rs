//! Orchestrator module for the catalog indexer ingest.
//!
//! Coordinates the consumer, batcher, merge engine and index writer, owns the
//! run statistics and the per-batch failure policy.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use catalog_indexer_repository::SearchIndexProvider;
use catalog_indexer_shared::ProductRecord;

use crate::batcher::{Batch, Batcher};
use crate::consumer::{KafkaConsumer, StreamMessage};
use crate::errors::IngestError;
use crate::merge::merge_batch;

/// Counters for one ingestion run.
///
/// Mutated only by the orchestrator on its single control loop; initialized
/// at process start and reported at shutdown. Nothing is persisted between
/// runs. If batch processing is ever parallelized, these mutations must be
/// serialized behind a lock or a single-writer channel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    /// Records received from the source, valid or not.
    pub messages_processed: u64,
    /// Records confirmed written to the index.
    pub records_written: u64,
    /// Batches whose write failed, in whole or in part.
    pub batch_errors: u64,
    /// Records dropped for lacking a valid identifier.
    pub records_dropped: u64,
}

impl RunStatistics {
    /// Fresh counters for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the end-of-run summary.
    pub fn report(&self) {
        info!(
            messages_processed = self.messages_processed,
            records_written = self.records_written,
            batch_errors = self.batch_errors,
            records_dropped = self.records_dropped,
            "Ingestion run summary"
        );
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Drives the per-batch flow: filter, lookup, merge, write
/// - Owns and reports run statistics
/// - Handles shutdown signals
///
/// Batches are processed strictly one at a time; the writer awaits index
/// visibility before a batch is acknowledged, so a later batch's lookup
/// always observes the previous batch's writes.
pub struct Orchestrator {
    provider: Arc<dyn SearchIndexProvider>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    stats: RunStatistics,
}

impl Orchestrator {
    /// Create a new orchestrator with the given index provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            provider,
            config: OrchestratorConfig::default(),
            shutdown_tx,
            stats: RunStatistics::new(),
        }
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: OrchestratorConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            provider,
            config,
            shutdown_tx,
            stats: RunStatistics::new(),
        }
    }

    /// The run counters gathered so far.
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Trigger a graceful shutdown of a live run.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run a bounded capture of records through the ingest flow (demo mode).
    ///
    /// Records are chunked through the batcher and each batch is processed
    /// to completion before the next one starts. A ctrl-c between batches
    /// stops feeding new records; the partial batch already assembled is
    /// still flushed, and the summary is reported either way.
    pub async fn run_capture(
        &mut self,
        records: Vec<ProductRecord>,
        batch_size: usize,
    ) -> Result<(), IngestError> {
        use futures::FutureExt;

        info!(
            record_count = records.len(),
            batch_size = batch_size,
            "Starting capture run"
        );

        let mut batcher = Batcher::new(batch_size);
        let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());

        for record in records {
            if let Some(batch) = batcher.offer(record) {
                self.handle_batch(batch).await;

                if (&mut ctrl_c).now_or_never().is_some() {
                    info!("Stop requested, flushing partial batch before reporting");
                    break;
                }
            }
        }

        if let Some(batch) = batcher.flush() {
            self.handle_batch(batch).await;
        }

        self.stats.report();
        Ok(())
    }

    /// Run the live ingest loop against Kafka.
    ///
    /// Starts the consumer in the background and processes batches as they
    /// arrive, acknowledging each one so the consumer can commit offsets.
    /// Blocks until the stream ends or a shutdown signal is received.
    pub async fn run_live(&mut self, consumer: KafkaConsumer) -> Result<(), IngestError> {
        info!("Starting catalog indexer orchestrator");

        consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let shutdown_rx = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(event_transmitter, ack_receiver, shutdown_rx).await {
                error!(error = %e, "Consumer error");
            }
        });

        info!("Ready to process product updates from Kafka");

        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Track previous values for rate calculation
        let mut prev_messages: u64 = 0;
        let mut prev_written: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Batch { batch, offsets }) => {
                            info!(
                                record_count = batch.len(),
                                offset_count = offsets.len(),
                                "Received batch from consumer"
                            );
                            match self.process_batch(batch).await {
                                Ok(()) => {
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: true,
                                        error: None,
                                    }).await;
                                }
                                Err(e) => {
                                    error!(error = %e, "Failed to process batch, continuing with next batch");
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }).await;
                                }
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();

                    let messages_per_sec = if elapsed_secs > 0.0 {
                        (self.stats.messages_processed.saturating_sub(prev_messages) as f64) / elapsed_secs
                    } else {
                        0.0
                    };
                    let written_per_sec = if elapsed_secs > 0.0 {
                        (self.stats.records_written.saturating_sub(prev_written) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        messages_processed = self.stats.messages_processed,
                        records_written = self.stats.records_written,
                        batch_errors = self.stats.batch_errors,
                        messages_per_sec = format!("{:.2}", messages_per_sec),
                        records_per_sec = format!("{:.2}", written_per_sec),
                        "Processing progress"
                    );

                    prev_messages = self.stats.messages_processed;
                    prev_written = self.stats.records_written;
                    prev_time = now;
                }
            }
        }

        // Wait for the consumer to finish
        let _ = consumer_handle.await;

        self.stats.report();
        Ok(())
    }

    /// Process one batch through lookup, merge and write.
    ///
    /// Records without a valid identifier are dropped before lookup. A failed
    /// lookup degrades to insert-as-new for the whole batch. A failed or
    /// partially failed write counts as one batch error and returns `Err` so
    /// the caller can withhold the acknowledgment; the run itself continues.
    pub async fn process_batch(&mut self, batch: Batch) -> Result<(), IngestError> {
        self.stats.messages_processed += batch.len() as u64;

        let object_ids = batch.object_ids();

        let mut records = Vec::with_capacity(batch.len());
        let mut dropped: u64 = 0;
        for record in batch.into_records() {
            if record.object_id().is_some() {
                records.push(record);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            self.stats.records_dropped += dropped;
            warn!(dropped = dropped, "Dropped records without a valid objectID");
        }

        if records.is_empty() {
            debug!("No valid records in batch, nothing to write");
            return Ok(());
        }

        let existing = match self.provider.get_documents(&object_ids).await {
            Ok(existing) => {
                debug!(
                    requested = object_ids.len(),
                    found = existing.len(),
                    "Fetched existing records"
                );
                existing
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch existing records, uploading batch as new");
                HashMap::new()
            }
        };

        let merged = merge_batch(&records, &existing);

        match self.provider.bulk_upsert_documents(&merged).await {
            Ok(summary) => {
                self.stats.records_written += summary.succeeded as u64;

                if summary.failed > 0 {
                    self.stats.batch_errors += 1;
                    for result in summary.results.iter().filter(|r| !r.success) {
                        if let Some(ref err) = result.error {
                            error!(
                                object_id = %result.object_id,
                                error = %err,
                                "Failed to write record"
                            );
                        }
                    }
                    return Err(IngestError::writer(format!(
                        "{} of {} records failed to index",
                        summary.failed, summary.total
                    )));
                }

                debug!(count = summary.succeeded, "Batch written and visible");
                Ok(())
            }
            Err(e) => {
                self.stats.batch_errors += 1;
                Err(IngestError::writer(e.to_string()))
            }
        }
    }

    /// Process a batch and absorb its failure (capture mode path).
    async fn handle_batch(&mut self, batch: Batch) {
        if let Err(e) = self.process_batch(batch).await {
            error!(error = %e, "Batch processing failed, continuing with next batch");
        }
    }
}
