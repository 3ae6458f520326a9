use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{info, warn};
use vesper_runtime::{EmbeddingProvider, EmbeddingRequest, HttpEmbeddingProvider, ProviderError};
use vesper_search::{
    load_records, ConfigError, DocumentIndexer, IndexProvisioner, IndexerConfig, IndexingError,
    IndexingService, SearchError, SearchMode, SearchRequest, SearchService, SemanticSearchService,
    Settings, SourceError,
};
use vesper_vector::{
    DistanceMetric, IndexAlgorithm, IndexStatus, RedisConfig, RedisVectorStore, SearchHit,
    Vector, VectorError, VectorStore,
};

/// Question asked by `demo` when none is given
pub const DEMO_QUESTION: &str = "Camisa do Palmeiras Abel Ferreira";

const RESULT_SEPARATOR: &str = "----------------------";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "vesper",
    version,
    about = "Vector search over JSON documents in Redis Stack",
    long_about = "Ingest titled documents with embeddings into Redis Stack, provision the vector index and run KNN or range queries from free text"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "VESPER_REDIS_URL",
        default_value = "redis://127.0.0.1:6379",
        help = "Redis URL, credentials included"
    )]
    pub redis_url: String,
    #[arg(
        long,
        global = true,
        env = "VESPER_KEY_PREFIX",
        default_value = "product-docs:",
        help = "Key prefix for stored documents"
    )]
    pub key_prefix: String,
    #[arg(
        long,
        global = true,
        env = "VESPER_INDEX",
        default_value = "productDocsIdx",
        help = "Search index name"
    )]
    pub index: String,
    #[arg(
        long,
        global = true,
        env = "VESPER_DIMENSION",
        default_value_t = vesper_runtime::DEFAULT_EMBEDDING_DIMENSION,
        help = "Vector dimension, must match the embedding model"
    )]
    pub dimension: usize,
    #[arg(
        long,
        global = true,
        env = "VESPER_METRIC",
        default_value = "COSINE",
        help = "Distance metric (COSINE, L2 or IP)"
    )]
    pub metric: DistanceMetric,
    #[arg(
        long,
        global = true,
        env = "VESPER_ALGORITHM",
        default_value = "HNSW",
        help = "Vector index algorithm (HNSW or FLAT)"
    )]
    pub algorithm: IndexAlgorithm,
    #[arg(
        long,
        global = true,
        env = "VESPER_DIALECT",
        default_value_t = 2,
        help = "Query dialect, 2 or later"
    )]
    pub dialect: u32,
    #[arg(
        long,
        global = true,
        env = "VESPER_EMBEDDING_URL",
        default_value = "http://127.0.0.1:8081",
        help = "Sentence-embedding server base URL"
    )]
    pub embedding_url: String,
    #[arg(
        long,
        global = true,
        env = "VESPER_EMBEDDING_MODEL",
        default_value = "all-MiniLM-L6-v2",
        help = "Embedding model name"
    )]
    pub embedding_model: String,
    #[arg(
        long,
        global = true,
        env = "VESPER_EMBEDDING_API_KEY",
        hide_env_values = true,
        help = "Bearer token for the embedding server"
    )]
    pub embedding_api_key: Option<String>,
    #[arg(long, global = true, help = "Print search results as JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            redis_url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
            index_name: self.index.clone(),
            dimension: self.dimension,
            metric: self.metric,
            algorithm: self.algorithm,
            dialect: self.dialect,
            embedding_url: self.embedding_url.clone(),
            embedding_model: self.embedding_model.clone(),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Write documents from a JSON or JSON Lines file")]
    Ingest {
        #[arg(help = "File of {docId, title, titleVector} records")]
        file: PathBuf,
    },
    #[command(about = "Encode a title and write it as a document")]
    Add {
        #[arg(help = "Document ID")]
        id: String,
        #[arg(help = "Document title")]
        title: String,
    },
    #[command(about = "Create the search index if it does not exist")]
    EnsureIndex,
    #[command(about = "Drop the search index, keeping documents")]
    DropIndex,
    #[command(about = "Fetch a stored document")]
    Get {
        #[arg(help = "Document ID")]
        id: String,
    },
    #[command(about = "Find the k documents closest to a question")]
    Knn {
        #[arg(help = "Question text")]
        query: String,
        #[arg(short, long, default_value_t = 5, help = "Number of neighbours")]
        k: usize,
        #[arg(long, default_value_t = 0, help = "Results to skip")]
        offset: usize,
        #[arg(long, default_value_t = 10, help = "Page size")]
        limit: usize,
    },
    #[command(about = "Find every document within a distance of a question")]
    Range {
        #[arg(help = "Question text")]
        query: String,
        #[arg(short, long, default_value_t = 3.0, help = "Maximum distance")]
        radius: f32,
        #[arg(long, default_value_t = 0, help = "Results to skip")]
        offset: usize,
        #[arg(long, default_value_t = 5, help = "Page size")]
        limit: usize,
    },
    #[command(about = "Ensure the index, then run a KNN and a range search for one question")]
    Demo {
        #[arg(default_value = DEMO_QUESTION, help = "Question text")]
        question: String,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] VectorError),
    #[error("encoder error: {0}")]
    Encoder(#[from] ProviderError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("ingestion error: {0}")]
    Indexing(#[from] IndexingError),
    #[error("search error: {0}")]
    Search(#[from] SearchError),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Connect to Redis and the embedding server, run the command and close
/// the connection
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let settings = cli.settings();
    settings.validate()?;

    let mut embedder = HttpEmbeddingProvider::new(
        settings.embedding_url.clone(),
        settings.embedding_model.clone(),
        settings.dimension,
    )?;
    if let Some(key) = cli.embedding_api_key.filter(|k| !k.is_empty()) {
        embedder = embedder.with_api_key(key);
    }

    let config = RedisConfig::new(settings.redis_url.clone(), settings.key_prefix.clone())
        .with_dimension(settings.dimension)
        .with_dialect(settings.dialect);
    let store = Arc::new(RedisVectorStore::connect(config).await?);

    let output = execute(cli.command, &settings, cli.json, store.clone(), Arc::new(embedder)).await;

    if let Ok(store) = Arc::try_unwrap(store) {
        store.close();
    }
    output
}

/// Run one command against an already connected store and encoder
pub async fn execute(
    command: Commands,
    settings: &Settings,
    json: bool,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<String, CliError> {
    match command {
        Commands::Ingest { file } => {
            let source = load_records(&file).await?;
            let result = indexer(settings, store).index_source(source).await;

            let mut lines = vec![format!(
                "ingested {} of {} documents",
                result.succeeded.len(),
                result.total()
            )];
            lines.extend(
                result
                    .failed
                    .iter()
                    .map(|(id, reason)| format!("failed {id}: {reason}")),
            );
            Ok(lines.join("\n"))
        }
        Commands::Add { id, title } => {
            let key = indexer(settings, store)
                .with_embedder(embedder)
                .index_text(&id, &title)
                .await?;
            Ok(format!("Document added with ID: {key}"))
        }
        Commands::EnsureIndex => {
            let status = IndexProvisioner::from_settings(store, settings).ensure().await?;
            Ok(index_status_line(status).to_string())
        }
        Commands::DropIndex => {
            IndexProvisioner::from_settings(store, settings).drop_index().await?;
            Ok(format!("index dropped: {}", settings.index_name))
        }
        Commands::Get { id } => {
            let document = store.get(&id).await?;
            Ok(format!(
                "Document ID: {}\nTitle: {}\nDimension: {}",
                document.key(&settings.key_prefix),
                document.title,
                document.vector.data.len()
            ))
        }
        Commands::Knn {
            query,
            k,
            offset,
            limit,
        } => {
            let request = SearchRequest::knn(query, k).with_page(offset, limit);
            let response = search_service(settings, store, embedder).search(request).await?;
            render_response("KNN Search Results:", &response.hits, json)
        }
        Commands::Range {
            query,
            radius,
            offset,
            limit,
        } => {
            let request = SearchRequest::range(query, radius).with_page(offset, limit);
            let response = search_service(settings, store, embedder).search(request).await?;
            render_response("Range Search Results:", &response.hits, json)
        }
        Commands::Demo { question } => demo(settings, json, store, embedder, &question).await,
    }
}

// The index is provisioned softly: a failure is reported and the queries
// still run, surfacing their own errors.
async fn demo(
    settings: &Settings,
    json: bool,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    question: &str,
) -> Result<String, CliError> {
    let mut sections = Vec::new();

    match IndexProvisioner::from_settings(store.clone(), settings).ensure().await {
        Ok(status) => sections.push(index_status_line(status).to_string()),
        Err(e) => sections.push(format!("Error creating index: {e}")),
    }

    let encoded = embedder.embed(EmbeddingRequest::new(question)).await?;
    let vector = Vector::new(encoded.embedding);
    let service = search_service(settings, store, embedder);

    for (heading, mode, limit) in [
        ("KNN Search Results:", SearchMode::Knn { k: 5 }, 10),
        ("Range Search Results:", SearchMode::Range { radius: 3.0 }, 5),
    ] {
        match service.search_vector(vector.clone(), mode, 0, limit).await {
            Ok(results) => sections.push(render_response(heading, &results.hits, json)?),
            Err(e) => {
                warn!(error = %e, reason = e.reason(), "Demo search failed");
                sections.push(format!("{heading}\nError: {e}"));
            }
        }
    }

    info!(question = %question, "Demo finished");
    Ok(sections.join("\n"))
}

fn indexer(settings: &Settings, store: Arc<dyn VectorStore>) -> DocumentIndexer {
    DocumentIndexer::new(
        store,
        IndexerConfig {
            dimension: settings.dimension,
        },
    )
}

fn search_service(
    settings: &Settings,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> SemanticSearchService {
    SemanticSearchService::new(store, embedder, settings.index_name.clone(), settings.dimension)
}

fn index_status_line(status: IndexStatus) -> &'static str {
    match status {
        IndexStatus::Created => "Index created.",
        IndexStatus::AlreadyExists => "Index already exists.",
    }
}

fn render_response(heading: &str, hits: &[SearchHit], json: bool) -> Result<String, CliError> {
    if json {
        return Ok(serde_json::to_string_pretty(hits)?);
    }
    Ok(format!("{heading}\n{}", render_hits(hits)))
}

/// One block per hit, in the order given
pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    hits.iter()
        .map(|hit| {
            format!(
                "Document ID: {}\nTitle: {}\nScore: {}\n{RESULT_SEPARATOR}",
                hit.id, hit.title, hit.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
