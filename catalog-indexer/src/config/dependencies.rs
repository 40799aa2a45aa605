//! Dependency initialization and wiring for the catalog indexer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use catalog_indexer_repository::opensearch::IndexConfig;
use catalog_indexer_repository::{OpenSearchProvider, SearchIndexProvider};

use crate::config::settings::{IndexerMode, Settings};
use crate::consumer::KafkaConsumer;
use crate::orchestrator::Orchestrator;
use crate::IndexingError;

/// The mode-specific half of a run.
pub enum Runner {
    /// Replay a capture file once.
    Demo {
        capture_file: PathBuf,
        batch_size: usize,
    },
    /// Consume the live Kafka feed.
    Live { consumer: KafkaConsumer },
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// The mode-specific source to drive it with.
    pub runner: Runner,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// Connects to OpenSearch, ensures the index and alias exist, and builds
    /// the Kafka consumer when running live. Any failure here is a startup
    /// failure: the process should exit non-zero without processing anything.
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = Settings::from_env()?;

        info!(
            mode = ?settings.mode,
            opensearch_url = %settings.opensearch_url,
            index_alias = %settings.index_alias,
            kafka_broker = %settings.kafka_broker,
            kafka_topic = %settings.kafka_topic,
            kafka_group_id = %settings.kafka_group_id,
            batch_size = settings.batch_size,
            "Initializing dependencies"
        );

        let index_config = IndexConfig::new(settings.index_alias.clone(), settings.index_version);
        let provider = OpenSearchProvider::new(&settings.opensearch_url, index_config)
            .await
            .map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?;

        // Validate and create the index and alias if they don't exist yet
        provider
            .ensure_index_exists()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        info!("OpenSearch connection established");

        let runner = match settings.mode {
            IndexerMode::Demo => Runner::Demo {
                capture_file: settings.capture_file.clone(),
                batch_size: settings.batch_size,
            },
            IndexerMode::Live => {
                let consumer = KafkaConsumer::new(
                    &settings.kafka_broker,
                    &settings.kafka_group_id,
                    &settings.kafka_topic,
                    settings.batch_size,
                )
                .map_err(|e| {
                    IndexingError::config(format!("Failed to create Kafka consumer: {}", e))
                })?;

                info!("Kafka consumer created");
                Runner::Live { consumer }
            }
        };

        let orchestrator = Orchestrator::new(Arc::new(provider));

        Ok(Self {
            orchestrator,
            runner,
        })
    }
}
