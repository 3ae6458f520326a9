//! Vesper Search - ingestion and query orchestration
//!
//! This crate implements the two flows of the system:
//! - Ingestion: source records are normalized and written to the store
//! - Query: the index is provisioned, text is encoded and KNN or range
//!   queries are submitted and formatted

pub mod config;
pub mod indexing;
pub mod provision;
pub mod search;

pub use config::{ConfigError, Settings};
pub use indexing::{
    load_records, parse_records, DocumentIndexer, IndexerConfig, IndexingError, IndexingResult,
    IndexingService, RejectedRecord, SourceBatch, SourceError,
};
pub use provision::IndexProvisioner;
pub use search::{SearchError, SearchMode, SearchRequest, SearchResponse, SearchService, SemanticSearchService};
