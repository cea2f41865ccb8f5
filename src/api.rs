//! HTTP surface for the document knowledge base.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /upload` – Multipart upload of one document. The file is extracted,
//!   chunked, embedded, and persisted; the response returns the assigned `doc_id`
//!   and the number of chunks stored.
//! - `POST /query` – Embed the supplied text and return the most similar chunks.
//! - `POST /aggregate` – Resolve a field path across stored JSON payloads and
//!   reduce the values with the requested operation.
//! - `GET /metrics` – Observe ingestion counters.
//!
//! Handlers are generic over [`DocumentApi`] so tests can substitute a stub service.

use crate::ingest::{
    AggregateError, AggregateRequest, DocumentApi, IngestError, SearchHit, SearchRequest,
};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/upload", post(upload_document::<S>))
        .route("/query", post(query_chunks::<S>))
        .route("/aggregate", post(aggregate_field::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Success response for the `POST /upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Identifier assigned to the stored document.
    doc_id: String,
    /// Original filename of the upload.
    filename: String,
    /// Extension the format was inferred from.
    file_extension: String,
    /// Upload size in bytes.
    file_size: usize,
    /// Number of chunks written to the vector store.
    chunks_stored: usize,
}

/// Ingest one uploaded document.
///
/// Expects a multipart form with a `file` part carrying both a filename and the
/// document bytes. The extension decides the extraction path; unsupported
/// extensions are rejected before any bytes are processed.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
{
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("File part is missing a filename".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(format!("Failed to read file part: {err}")))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload
        .ok_or_else(|| AppError::BadRequest("Multipart body is missing a file part".into()))?;
    let file_size = bytes.len();
    let file_extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    let outcome = service.ingest_document(&filename, bytes).await?;
    tracing::info!(
        doc_id = %outcome.doc_id,
        filename,
        file_size,
        chunks = outcome.chunk_count,
        "Upload request completed"
    );

    Ok(Json(UploadResponse {
        doc_id: outcome.doc_id,
        filename,
        file_extension,
        file_size,
        chunks_stored: outcome.chunk_count,
    }))
}

/// Request body for the `POST /query` endpoint.
#[derive(Deserialize)]
struct QueryRequest {
    /// Text to embed and search with.
    query: String,
    /// Optional result limit.
    #[serde(default)]
    limit: Option<usize>,
}

/// Response body for the `POST /query` endpoint.
#[derive(Serialize)]
struct QueryResponse {
    /// Echo of the query text.
    query: String,
    /// Scored chunks, most similar first.
    results: Vec<SearchHit>,
}

/// Run a similarity search over stored chunks.
async fn query_chunks<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: DocumentApi,
{
    let results = service
        .search_chunks(SearchRequest {
            query_text: request.query.clone(),
            limit: request.limit,
        })
        .await?;
    Ok(Json(QueryResponse {
        query: request.query,
        results,
    }))
}

/// Aggregate values addressed by a field path across stored JSON payloads.
async fn aggregate_field<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AggregateRequest>,
) -> Result<Json<crate::ingest::AggregationOutcome>, AppError>
where
    S: DocumentApi,
{
    let outcome = service.aggregate(request).await?;
    Ok(Json(outcome))
}

/// Return a concise metrics snapshot with document and chunk counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        match inner {
            IngestError::UnsupportedExtension(_) => Self::BadRequest(inner.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<crate::ingest::SearchError> for AppError {
    fn from(inner: crate::ingest::SearchError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<AggregateError> for AppError {
    fn from(inner: AggregateError) -> Self {
        match inner {
            AggregateError::Path(_) => Self::BadRequest(inner.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
