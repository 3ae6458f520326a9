//! Ingestion flow: source records are normalized into documents and written
//! to the store one at a time.

mod service;
mod source;

pub use service::{DocumentIndexer, IndexerConfig, IndexingError, IndexingResult, IndexingService};
pub use source::{load_records, parse_records, RejectedRecord, SourceBatch, SourceError};
