//! Request, response, and error types for the document service.

use crate::aggregate::{AggregationOp, Occurrence, PathParseError};
use crate::embedding::EmbeddingClientError;
use crate::extract::ExtractError;
use crate::ingest::chunking::ChunkingError;
use crate::qdrant::QdrantError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while ingesting a document.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Upload extension maps to no supported format.
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
    /// Content extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    /// Chunking rejected the configured window.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// Embedding generation failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store rejected the write.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
}

/// Errors raised while searching stored chunks.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding the query text failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store query failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vector for the query text.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
    /// Query vector dimension differs from the configured collection size.
    #[error("Embedding dimension {actual} does not match configured dimension {expected}")]
    DimensionMismatch {
        /// Dimension configured for the collection.
        expected: usize,
        /// Dimension the provider actually returned.
        actual: usize,
    },
}

/// Errors raised while running an aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Field path failed to parse.
    #[error(transparent)]
    Path(#[from] PathParseError),
    /// Embedding the similarity query failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store request failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vector for the similarity query.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Identifier assigned to the stored document.
    pub doc_id: String,
    /// Number of chunks written to the vector store.
    pub chunk_count: usize,
}

/// Parameters of one similarity search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    /// Text to embed and search with.
    pub query_text: String,
    /// Optional result limit; clamped to the configured maximum.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One scored chunk returned from a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Chunk text content.
    pub content: String,
    /// Decoded document metadata.
    pub metadata: Value,
    /// Similarity score reported by the vector store.
    pub score: f32,
    /// Identifier of the owning document.
    pub doc_id: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_id: u64,
    /// Source format tag.
    pub file_type: String,
}

/// Parameters of one aggregation request.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateRequest {
    /// Dotted field path addressing values inside stored JSON payloads.
    pub field_path: String,
    /// Aggregation operation to apply.
    pub operation: AggregationOp,
    /// Optional document scope; combinable with the similarity filter.
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Minimum frequency for `text_occurrences` entries.
    #[serde(default)]
    pub min_occurrences: Option<usize>,
    /// Optional cosine distance cutoff for the similarity filter.
    #[serde(default)]
    pub distance: Option<f32>,
    /// Optional text whose embedding restricts candidates by similarity.
    #[serde(default)]
    pub query_text: Option<String>,
}

/// Outcome of one aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationOutcome {
    /// Field path the aggregation was computed over.
    pub field: String,
    /// Operation tag.
    pub operation: &'static str,
    /// Scalar result; absent for `text_occurrences`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Occurrence ranking; present only for `text_occurrences`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<Occurrence>>,
}
