//! Configuration and dependency initialization for the catalog indexer.

mod dependencies;
mod settings;

pub use dependencies::{Dependencies, Runner};
pub use settings::{IndexerMode, Settings};
