//! This module defines the core data structures used across the catalog indexer.
//! It re-exports specific types like `ProductRecord`.

pub mod product_record;

pub use product_record::{ProductRecord, OBJECT_ID_FIELD};
