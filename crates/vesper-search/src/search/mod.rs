//! Semantic search over indexed documents
//!
//! Query text is encoded with the same model used at ingestion, then run as
//! a KNN or range query against the index.

mod service;

pub use service::{
    SearchError, SearchMode, SearchRequest, SearchResponse, SearchService, SemanticSearchService,
};
