//! The catalog-authoritative merge engine.
//!
//! Reconciles a batch of incoming product updates against the records already
//! stored in the search index. The stored record ("the catalog") wins every
//! conflict: an incoming field is applied only where the catalog has no value
//! at all, i.e. the field is absent or JSON null. Falsy-but-valid values such
//! as `0`, `""` and `false` on the catalog side are present values and are
//! never replaced; only a null/absent test decides, never truthiness.

use std::collections::HashMap;

use catalog_indexer_shared::ProductRecord;

/// Merge a batch of incoming records against the existing indexed records.
///
/// For each incoming record, in batch order:
///
/// - no existing record under its identifier: the record passes through
///   unchanged as a new catalog entry;
/// - an existing record is found: the output starts as a copy of the existing
///   record, and each incoming field is applied only where the copy has no
///   field of that name or holds null. An incoming null never clears an
///   existing non-null value. Nested objects and arrays are applied wholesale
///   into missing/null slots; there is no recursive merge.
///
/// Neither input is mutated; the output contains freshly built records in the
/// same order as `incoming`. Records sharing an identifier within one batch
/// are each merged against the same existing record and all appear in the
/// output; the writer applies them in order, so the last occurrence wins at
/// the index.
pub fn merge_batch(
    incoming: &[ProductRecord],
    existing: &HashMap<String, ProductRecord>,
) -> Vec<ProductRecord> {
    incoming
        .iter()
        .map(|record| {
            match record.object_id().and_then(|id| existing.get(id)) {
                Some(stored) => enrich(stored, record),
                None => record.clone(),
            }
        })
        .collect()
}

/// Copy `stored` and fill in fields from `update` where `stored` has none.
fn enrich(stored: &ProductRecord, update: &ProductRecord) -> ProductRecord {
    let mut merged = stored.clone();

    for (field, value) in update.fields() {
        let missing = match merged.get(field) {
            None => true,
            Some(current) => current.is_null(),
        };
        if missing {
            merged.insert(field.clone(), value.clone());
        }
    }

    merged
}
