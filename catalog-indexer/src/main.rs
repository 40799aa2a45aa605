//! Catalog Indexer Main Entry Point
//!
//! This is the main binary for the catalog enrichment indexer. It consumes
//! product-update events from Kafka (or a capture file in demo mode) and
//! reconciles them into OpenSearch, never overwriting catalog fields that
//! already hold a value.

use dotenv::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_indexer::config::Runner;
use catalog_indexer::consumer::capture;
use catalog_indexer::{Dependencies, IndexingError};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_indexer=info,catalog_indexer_repository=info"));

    let json_format = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting catalog indexer");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let Dependencies {
        mut orchestrator,
        runner,
    } = deps;

    let result = match runner {
        Runner::Demo {
            capture_file,
            batch_size,
        } => {
            info!(capture_file = %capture_file.display(), "Running in demo mode");
            match capture::load_capture(&capture_file) {
                Ok(records) => orchestrator.run_capture(records, batch_size).await,
                Err(e) => Err(e),
            }
        }
        Runner::Live { consumer } => {
            info!("Running in live mode");
            orchestrator.run_live(consumer).await
        }
    };

    match result {
        Ok(()) => {
            info!("Catalog indexer completed successfully");
            Ok(())
        }
        Err(e) => {
            // The summary is still reported on an aborted run
            orchestrator.statistics().report();
            error!(error = %e, "Catalog indexer failed");
            Err(e.into())
        }
    }
}
