//! Ingestion sources
//!
//! A source is a JSON array of `{"docId", "title", "titleVector"}` records,
//! or the same records one per line. Each record is decoded on its own, so
//! one malformed record is rejected without losing the rest.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use vesper_vector::SourceRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed source on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A record that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// `docId` when readable, otherwise the record position
    pub id: String,
    pub reason: String,
}

/// Records decoded from a source, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl SourceBatch {
    fn push(&mut self, value: Value, position: &str) {
        let id = value
            .get("docId")
            .and_then(Value::as_str)
            .map_or_else(|| position.to_string(), str::to_string);

        match serde_json::from_value::<SourceRecord>(value) {
            Ok(record) => self.records.push(record),
            Err(e) => {
                warn!(id = %id, error = %e, "Skipping malformed source record");
                self.rejected.push(RejectedRecord {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Number of records seen, decoded or not
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse records from a JSON array or JSON Lines text.
///
/// Fails only when the text as a whole cannot be read as JSON; records that
/// do not have the expected shape are collected as rejected.
pub fn parse_records(input: &str) -> Result<SourceBatch, SourceError> {
    let mut batch = SourceBatch::default();

    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed).map_err(|source| SourceError::Parse {
            line: source.line(),
            source,
        })?;
        for (index, value) in values.into_iter().enumerate() {
            batch.push(value, &format!("record {}", index + 1));
        }
        return Ok(batch);
    }

    for (index, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let position = format!("line {}", index + 1);
        match serde_json::from_str::<Value>(line) {
            Ok(value) => batch.push(value, &position),
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping unreadable source line");
                batch.rejected.push(RejectedRecord {
                    id: position,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(batch)
}

/// Load records from a file
pub async fn load_records(path: impl AsRef<Path>) -> Result<SourceBatch, SourceError> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_records(&contents)
}
