//! Environment-derived settings for the catalog indexer.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::IndexingError;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka topic carrying product updates.
const DEFAULT_KAFKA_TOPIC: &str = "product-updates";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "catalog-indexer";

/// Default index alias.
const DEFAULT_INDEX_ALIAS: &str = "products";

/// Default batch size.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default capture file for demo mode.
const DEFAULT_CAPTURE_FILE: &str = "product-updates.json";

/// Ingestion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerMode {
    /// Replay a bounded capture file once.
    Demo,
    /// Consume the live Kafka feed until stopped.
    Live,
}

/// Runtime settings, loaded from the environment.
///
/// # Environment Variables
///
/// - `INDEXER_MODE`: "demo" or "live" (default: demo)
/// - `OPENSEARCH_URL`: OpenSearch endpoint (required)
/// - `INDEX_ALIAS`: Index alias name (default: "products")
/// - `INDEX_VERSION`: Physical index version number (default: 0)
/// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
/// - `KAFKA_TOPIC`: Topic carrying product updates (default: product-updates)
/// - `KAFKA_GROUP_ID`: Consumer group ID (default: catalog-indexer)
/// - `BATCH_SIZE`: Records per batch, positive (default: 100)
/// - `CAPTURE_FILE`: Demo capture path (default: product-updates.json)
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: IndexerMode,
    pub opensearch_url: String,
    pub index_alias: String,
    pub index_version: u32,
    pub kafka_broker: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub batch_size: usize,
    pub capture_file: PathBuf,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Aborts with a configuration error naming the variable when a required
    /// option is absent or an explicitly-set value is invalid.
    pub fn from_env() -> Result<Self, IndexingError> {
        let opensearch_url = env::var("OPENSEARCH_URL").map_err(|_| {
            IndexingError::config("missing required environment variable OPENSEARCH_URL")
        })?;

        let mode = parse_mode(env::var("INDEXER_MODE").ok());
        let batch_size = parse_batch_size(env::var("BATCH_SIZE").ok())?;

        let index_alias =
            env::var("INDEX_ALIAS").unwrap_or_else(|_| DEFAULT_INDEX_ALIAS.to_string());
        let index_version = env::var("INDEX_VERSION")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        let kafka_broker =
            env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let kafka_topic =
            env::var("KAFKA_TOPIC").unwrap_or_else(|_| DEFAULT_KAFKA_TOPIC.to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());

        let capture_file = PathBuf::from(
            env::var("CAPTURE_FILE").unwrap_or_else(|_| DEFAULT_CAPTURE_FILE.to_string()),
        );

        Ok(Self {
            mode,
            opensearch_url,
            index_alias,
            index_version,
            kafka_broker,
            kafka_topic,
            kafka_group_id,
            batch_size,
            capture_file,
        })
    }
}

/// Parse the ingestion mode.
///
/// Valid values: "demo" or "live" (case-insensitive). Defaults to demo when
/// unset or invalid.
fn parse_mode(raw: Option<String>) -> IndexerMode {
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("demo") => IndexerMode::Demo,
        Some("live") => IndexerMode::Live,
        Some(other) => {
            warn!(value = %other, "Invalid INDEXER_MODE, defaulting to 'demo'");
            IndexerMode::Demo
        }
    }
}

/// Parse the batch size, rejecting non-numeric and zero values.
fn parse_batch_size(raw: Option<String>) -> Result<usize, IndexingError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(DEFAULT_BATCH_SIZE),
    };

    match raw.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        Ok(_) => Err(IndexingError::config(
            "BATCH_SIZE must be a positive integer",
        )),
        Err(_) => Err(IndexingError::config(format!(
            "BATCH_SIZE must be a positive integer, got '{}'",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None), IndexerMode::Demo);
        assert_eq!(parse_mode(Some("demo".to_string())), IndexerMode::Demo);
        assert_eq!(parse_mode(Some("LIVE".to_string())), IndexerMode::Live);
        assert_eq!(parse_mode(Some("bogus".to_string())), IndexerMode::Demo);
    }

    #[test]
    fn test_parse_batch_size_default() {
        assert_eq!(parse_batch_size(None).unwrap(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_parse_batch_size_explicit() {
        assert_eq!(parse_batch_size(Some("250".to_string())).unwrap(), 250);
    }

    #[test]
    fn test_parse_batch_size_rejects_zero_and_garbage() {
        assert!(parse_batch_size(Some("0".to_string())).is_err());
        assert!(parse_batch_size(Some("many".to_string())).is_err());
        assert!(parse_batch_size(Some("-5".to_string())).is_err());
    }
}
