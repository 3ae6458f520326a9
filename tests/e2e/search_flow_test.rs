//! End-to-end tests of the ingestion and query flows
//!
//! These run against the in-memory store and the deterministic encoder, so
//! they need no Redis or embedding server.

mod integration;

use std::sync::Arc;

use integration::asserts::assert_ascending;
use integration::fixtures::{axis, blend, init, provisioned_store, DIM};
use vesper_runtime::{EmbeddingProvider, EmbeddingRequest, MockEmbeddingProvider};
use vesper_search::{
    load_records, DocumentIndexer, IndexProvisioner, IndexerConfig, IndexingService, SearchError, SearchRequest,
    SearchService, SemanticSearchService,
};
use vesper_vector::{Document, IndexStatus, SourceRecord, Vector, VectorStore};

fn indexer(store: Arc<dyn VectorStore>) -> DocumentIndexer {
    DocumentIndexer::new(store, IndexerConfig { dimension: DIM })
}

fn record(id: &str, title: &str, vector: Vec<f32>) -> SourceRecord {
    SourceRecord {
        doc_id: id.to_string(),
        title: title.to_string(),
        title_vector: vector,
    }
}

#[tokio::test]
async fn ingested_document_is_found_by_knn() {
    init();
    let (store, settings) = provisioned_store().await;

    let livro = blend(&axis(0), &axis(1), 0.1);
    let mut records = vec![record("gf0gc9ag0d", "Livro - Pocket", livro.clone())];
    for i in 2..8 {
        records.push(record(&format!("other{i}"), &format!("Produto {i}"), blend(&axis(0), &axis(i), 0.5 + 0.05 * i as f32)));
    }
    let batch = indexer(store.clone()).index_batch(records).await;
    assert!(batch.is_all_success());

    let embedder = Arc::new(MockEmbeddingProvider::new(DIM));
    embedder.register("Livro", blend(&livro, &axis(0), 0.05));
    let service = SemanticSearchService::new(store, embedder, settings.index_name, DIM);

    let response = service.knn("Livro", 5).await.unwrap();

    assert_eq!(response.hits.len(), 5);
    assert_eq!(response.hits[0].id, "product-docs:gf0gc9ag0d");
    assert_eq!(response.hits[0].title, "Livro - Pocket");
    assert_ascending(&response.hits);
}

#[tokio::test]
async fn knn_returns_only_what_the_store_holds() {
    init();
    let (store, settings) = provisioned_store().await;
    for i in 0..3 {
        store
            .write(&Document::new(format!("doc{i}"), format!("Doc {i}"), Vector::new(axis(i))))
            .await
            .unwrap();
    }

    let embedder = Arc::new(MockEmbeddingProvider::new(DIM));
    let service = SemanticSearchService::new(store, embedder, settings.index_name, DIM);

    let response = service
        .search(SearchRequest::knn("anything", 5).with_page(0, 10))
        .await
        .unwrap();

    assert_eq!(response.hits.len(), 3);
    assert_ascending(&response.hits);
}

#[tokio::test]
async fn knn_page_never_exceeds_k() {
    init();
    let (store, settings) = provisioned_store().await;
    for i in 0..12 {
        store
            .write(&Document::new(format!("doc{i}"), format!("Doc {i}"), Vector::new(axis(i))))
            .await
            .unwrap();
    }

    let embedder = Arc::new(MockEmbeddingProvider::new(DIM));
    let service = SemanticSearchService::new(store, embedder, settings.index_name, DIM);

    let response = service
        .search(SearchRequest::knn("anything", 5).with_page(0, 10))
        .await
        .unwrap();
    assert_eq!(response.hits.len(), 5);

    let tail = service
        .search(SearchRequest::knn("anything", 5).with_page(3, 10))
        .await
        .unwrap();
    assert_eq!(tail.hits.len(), 2);
    assert_eq!(tail.hits[..], response.hits[3..]);
}

#[tokio::test]
async fn range_results_stay_within_radius() {
    init();
    let (store, settings) = provisioned_store().await;
    let query = axis(0);
    for i in 0..10 {
        let vector = blend(&query, &axis(i + 1), i as f32 / 10.0);
        store
            .write(&Document::new(format!("doc{i}"), format!("Doc {i}"), Vector::new(vector)))
            .await
            .unwrap();
    }

    let embedder = Arc::new(MockEmbeddingProvider::new(DIM));
    embedder.register("query", query.clone());
    let service = SemanticSearchService::new(store.clone(), embedder, settings.index_name, DIM);

    let radius = 0.1;
    let response = service
        .search(SearchRequest::range("query", radius).with_page(0, 100))
        .await
        .unwrap();

    assert!(!response.hits.is_empty());
    assert!(response.hits.len() < 10);
    assert_ascending(&response.hits);

    let query = Vector::new(query);
    for hit in &response.hits {
        let id = hit.id.trim_start_matches("product-docs:");
        let stored = store.get(id).await.unwrap();
        let distance = stored.vector.distance(&query, settings.metric);
        assert!(distance <= radius + 1e-5, "{} at {distance} is outside {radius}", hit.id);
    }
}

#[tokio::test]
async fn ensure_index_is_idempotent() {
    init();
    let (store, settings) = provisioned_store().await;
    let before = store.index_definition(&settings.index_name).await;

    let status = IndexProvisioner::from_settings(store.clone(), &settings)
        .ensure()
        .await
        .unwrap();

    assert_eq!(status, IndexStatus::AlreadyExists);
    assert_eq!(store.list_indexes().await.unwrap().len(), 1);
    assert_eq!(store.index_definition(&settings.index_name).await, before);
}

#[tokio::test]
async fn written_documents_round_trip_exactly() {
    init();
    let (store, _) = provisioned_store().await;
    let vector: Vec<f32> = (0..DIM).map(|i| (i as f32 * 0.37).sin()).collect();

    let key = indexer(store.clone())
        .index_document(Document::new("gf0gc9ag0d", "Livro - Pocket", Vector::new(vector.clone())))
        .await
        .unwrap();

    assert_eq!(key, "product-docs:gf0gc9ag0d");
    let stored = store.get("gf0gc9ag0d").await.unwrap();
    assert_eq!(stored.title, "Livro - Pocket");
    assert_eq!(stored.vector.data, vector);
    assert_eq!(stored.vector.data.len(), DIM);
}

#[tokio::test]
async fn encoder_is_deterministic() {
    let embedder = MockEmbeddingProvider::new(DIM);
    let first = embedder.embed(EmbeddingRequest::new("Livro")).await.unwrap();
    let second = embedder.embed(EmbeddingRequest::new("Livro")).await.unwrap();
    assert_eq!(first.embedding, second.embedding);
}

#[tokio::test]
async fn mismatched_encoder_dimension_fails_the_query() {
    init();
    let (store, settings) = provisioned_store().await;
    store
        .write(&Document::new("doc", "Doc", Vector::new(axis(0))))
        .await
        .unwrap();

    let embedder = Arc::new(MockEmbeddingProvider::new(128));
    let service = SemanticSearchService::new(store, embedder, settings.index_name, DIM);

    let err = service.knn("Livro", 5).await.unwrap_err();
    assert!(matches!(
        err,
        SearchError::DimensionMismatch {
            expected: 384,
            actual: 128
        }
    ));
}

#[tokio::test]
async fn mismatched_documents_are_skipped_during_ingestion() {
    init();
    let (store, _) = provisioned_store().await;

    let batch = indexer(store.clone())
        .index_batch(vec![
            record("short", "Too short", vec![1.0; 128]),
            record("ok", "Right size", axis(3)),
        ])
        .await;

    assert_eq!(batch.succeeded, vec!["ok".to_string()]);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn shipped_product_docs_support_the_livro_scenario() {
    init();
    let (store, settings) = provisioned_store().await;

    let source = load_records(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/product_docs.json"))
        .await
        .unwrap();
    assert!(source.rejected.is_empty());
    let livro = source
        .records
        .iter()
        .find(|r| r.doc_id == "gf0gc9ag0d")
        .expect("fixture holds the Livro document")
        .clone();
    assert_eq!(livro.title, "Livro - Pocket");
    assert_eq!(livro.title_vector.len(), DIM);

    let batch = indexer(store.clone()).index_source(source).await;
    assert!(batch.is_all_success());

    let embedder = Arc::new(MockEmbeddingProvider::new(DIM));
    embedder.register("Livro", livro.title_vector);
    let service = SemanticSearchService::new(store, embedder, settings.index_name, DIM);

    let response = service.knn("Livro", 5).await.unwrap();

    assert_eq!(response.hits.len(), batch.succeeded.len().min(5));
    assert_eq!(response.hits[0].id, "product-docs:gf0gc9ag0d");
    assert_eq!(response.hits[0].title, "Livro - Pocket");
    assert_ascending(&response.hits);
}

#[tokio::test]
async fn malformed_source_record_does_not_block_the_rest() {
    init();
    let (store, _) = provisioned_store().await;
    let good = serde_json::to_string(&axis(1)).unwrap();
    let text = format!(
        r#"[
            {{"docId": "first", "title": "First", "titleVector": {good}}},
            {{"docId": "broken", "title": "Broken", "titleVector": [1.0, "x", 0.0]}},
            {{"docId": "last", "title": "Last", "titleVector": {good}}}
        ]"#
    );

    let source = vesper_search::parse_records(&text).unwrap();
    let batch = indexer(store.clone()).index_source(source).await;

    assert_eq!(batch.succeeded, vec!["first".to_string(), "last".to_string()]);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].0, "broken");
    assert_eq!(store.len().await, 2);
}
