//! Capture file loader for demo mode.
//!
//! Reads a finite, ordered sequence of product updates from a static JSON
//! file; a replay-once substitute for the live feed. Records are kept in
//! file order and are not deduplicated by identifier; the merge engine
//! defines how duplicates behave.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use catalog_indexer_shared::ProductRecord;

use crate::consumer::INGESTED_AT_FIELD;
use crate::errors::IngestError;

/// Load and parse a capture file.
///
/// The file must contain a JSON array of objects. Entries that are not
/// objects are logged and skipped; an unreadable file or a top-level value
/// that is not an array is fatal to the run.
pub fn load_capture(path: &Path) -> Result<Vec<ProductRecord>, IngestError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        IngestError::source(format!("cannot read capture file {}: {}", path.display(), e))
    })?;

    let records = parse_capture(&contents)?;
    info!(
        path = %path.display(),
        record_count = records.len(),
        "Loaded capture file"
    );
    Ok(records)
}

/// Parse capture contents into records, stamping each with the ingest time.
pub fn parse_capture(contents: &str) -> Result<Vec<ProductRecord>, IngestError> {
    let parsed: Value = serde_json::from_str(contents)
        .map_err(|e| IngestError::parse(format!("capture file is not valid JSON: {}", e)))?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        other => {
            return Err(IngestError::parse(format!(
                "capture file must hold a JSON array of records, got {}",
                json_type_name(&other)
            )));
        }
    };

    let ingested_at = Utc::now().to_rfc3339();
    let mut records = Vec::with_capacity(entries.len());

    for (position, entry) in entries.into_iter().enumerate() {
        match ProductRecord::from_value(entry) {
            Some(mut record) => {
                record.insert(INGESTED_AT_FIELD, Value::String(ingested_at.clone()));
                records.push(record);
            }
            None => {
                warn!(position = position, "Skipping non-object capture entry");
            }
        }
    }

    Ok(records)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture() {
        let contents = r#"[
            {"objectID": "1", "name": "Widget", "price": 0},
            {"objectID": "2", "rating": 5}
        ]"#;

        let records = parse_capture(contents).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].object_id(), Some("1"));
        assert_eq!(records[1].object_id(), Some("2"));
        assert!(records
            .iter()
            .all(|r| r.get(INGESTED_AT_FIELD).is_some()));
    }

    #[test]
    fn test_parse_capture_keeps_file_order_and_duplicates() {
        let contents = r#"[
            {"objectID": "1", "rating": 3},
            {"objectID": "2"},
            {"objectID": "1", "rating": 5}
        ]"#;

        let records = parse_capture(contents).unwrap();

        let ids: Vec<&str> = records.iter().filter_map(|r| r.object_id()).collect();
        assert_eq!(ids, vec!["1", "2", "1"]);
    }

    #[test]
    fn test_parse_capture_skips_non_object_entries() {
        let contents = r#"[{"objectID": "1"}, 42, "junk", {"objectID": "2"}]"#;

        let records = parse_capture(contents).unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_capture_rejects_non_array() {
        let result = parse_capture(r#"{"objectID": "1"}"#);
        assert!(matches!(result, Err(IngestError::ParseError(_))));
    }

    #[test]
    fn test_parse_capture_rejects_invalid_json() {
        let result = parse_capture("not json at all");
        assert!(matches!(result, Err(IngestError::ParseError(_))));
    }

    #[test]
    fn test_load_capture_missing_file() {
        let result = load_capture(Path::new("/nonexistent/capture.json"));
        assert!(matches!(result, Err(IngestError::SourceError(_))));
    }
}
