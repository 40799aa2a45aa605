//! # Catalog Indexer Shared
//!
//! This crate defines shared data structures and types used across the catalog
//! indexer ecosystem. It includes the schema-free product record that flows from
//! the event stream into the search index.

pub mod types;

pub use types::product_record::{ProductRecord, OBJECT_ID_FIELD};
