//! Document service orchestrating extraction, chunking, embedding, and storage.

use crate::aggregate::{
    AggregationResult, PathExpression, aggregate_values, resolve_record,
};
use crate::config::get_config;
use crate::embedding::{EmbeddingClient, get_embedding_client};
use crate::extract::{DocumentFormat, extract_document};
use crate::ingest::chunking::{DEFAULT_CHUNK_WINDOW, chunk_text};
use crate::ingest::types::{
    AggregateError, AggregateRequest, AggregationOutcome, IngestError, IngestOutcome,
    SearchError, SearchHit, SearchRequest,
};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::ocr::{HttpOcrClient, OcrClient};
use crate::qdrant::{ChunkPoint, QdrantError, QdrantService, build_doc_filter};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Operations exposed by the document service, abstracted for the HTTP layer.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Ingest one uploaded document end to end.
    async fn ingest_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError>;

    /// Run a similarity search over stored chunks.
    async fn search_chunks(&self, request: SearchRequest) -> Result<Vec<SearchHit>, SearchError>;

    /// Aggregate values addressed by a field path across stored JSON payloads.
    async fn aggregate(
        &self,
        request: AggregateRequest,
    ) -> Result<AggregationOutcome, AggregateError>;

    /// Snapshot of ingestion counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production document service wired to Qdrant and the configured collaborators.
pub struct DocumentService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant: QdrantService,
    ocr_client: Option<Arc<dyn OcrClient>>,
    metrics: Arc<IngestMetrics>,
}

impl DocumentService {
    /// Construct the service and ensure the backing collection and indexes exist.
    pub async fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        let qdrant = QdrantService::new()?;

        qdrant
            .create_collection_if_not_exists(
                &config.qdrant_collection_name,
                config.embedding_dimension as u64,
            )
            .await?;
        qdrant
            .ensure_payload_indexes(&config.qdrant_collection_name)
            .await?;

        let ocr_client = HttpOcrClient::from_config()
            .map(|client| Arc::new(client) as Arc<dyn OcrClient>);
        if ocr_client.is_none() {
            tracing::info!("No OCR collaborator configured; scanned PDFs will not be recognized");
        }

        Ok(Self {
            embedding_client: get_embedding_client(),
            qdrant,
            ocr_client,
            metrics: Arc::new(IngestMetrics::default()),
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let mut embeddings = self
            .embedding_client
            .generate_embeddings(vec![text.to_string()])
            .await?;
        let vector = embeddings.pop().ok_or(SearchError::EmptyEmbedding)?;

        let expected = get_config().embedding_dimension;
        if vector.len() != expected {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn ingest_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        let extension = file_extension(filename)
            .ok_or_else(|| IngestError::UnsupportedExtension(filename.to_string()))?;
        let format = DocumentFormat::from_extension(extension)
            .ok_or_else(|| IngestError::UnsupportedExtension(extension.to_string()))?;

        let document = extract_document(format, &bytes, self.ocr_client.as_deref()).await?;

        let config = get_config();
        let doc_id = Uuid::new_v4().to_string();

        // JSON documents stay whole so path aggregation sees the full payload.
        let (chunks, json_payload) = match format {
            DocumentFormat::Json => {
                let payload = document.content.clone();
                (vec![document.content], Some(payload))
            }
            _ => {
                let window = config.chunk_size.unwrap_or(DEFAULT_CHUNK_WINDOW);
                (chunk_text(&document.content, window)?, None)
            }
        };

        if chunks.is_empty() {
            tracing::info!(doc_id = %doc_id, filename, "Document produced no chunks");
            self.metrics.record_document(0);
            return Ok(IngestOutcome { doc_id, chunk_count: 0 });
        }

        let metadata = Value::Object(document.metadata).to_string();
        let embeddings = self
            .embedding_client
            .generate_embeddings(chunks.clone())
            .await?;

        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, vector))| ChunkPoint {
                doc_id: doc_id.clone(),
                chunk_id: index as u64,
                content,
                json: json_payload.clone(),
                metadata: metadata.clone(),
                file_type: format.as_str().to_string(),
                vector,
            })
            .collect();

        let chunk_count = self
            .qdrant
            .insert_chunks(&config.qdrant_collection_name, points)
            .await?;

        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            doc_id = %doc_id,
            filename,
            file_type = format.as_str(),
            extraction = document.method.as_str(),
            chunks = chunk_count,
            "Document ingested"
        );

        Ok(IngestOutcome { doc_id, chunk_count })
    }

    async fn search_chunks(&self, request: SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        let config = get_config();
        let vector = self.embed_query(&request.query_text).await?;
        let limit = request
            .limit
            .unwrap_or(config.search_default_limit)
            .clamp(1, config.search_max_limit);

        let points = self
            .qdrant
            .search_points(&config.qdrant_collection_name, vector, None, limit, None)
            .await?;

        let hits = points
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload?;
                Some(SearchHit {
                    content: string_field(&payload, "content"),
                    metadata: decode_metadata(&payload),
                    score: point.score,
                    doc_id: string_field(&payload, "doc_id"),
                    chunk_id: payload
                        .get("chunk_id")
                        .and_then(Value::as_u64)
                        .unwrap_or_default(),
                    file_type: string_field(&payload, "file_type"),
                })
            })
            .collect();

        Ok(hits)
    }

    async fn aggregate(
        &self,
        request: AggregateRequest,
    ) -> Result<AggregationOutcome, AggregateError> {
        let config = get_config();
        let path = PathExpression::parse(&request.field_path)?;
        let filter = build_doc_filter(request.doc_id.as_deref());

        let query_text = request
            .query_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let payloads = match query_text {
            Some(text) => {
                let vector = match self.embed_query(text).await {
                    Ok(vector) => vector,
                    Err(SearchError::Embedding(err)) => return Err(err.into()),
                    Err(SearchError::Qdrant(err)) => return Err(err.into()),
                    Err(SearchError::EmptyEmbedding | SearchError::DimensionMismatch { .. }) => {
                        return Err(AggregateError::EmptyEmbedding);
                    }
                };
                // Qdrant scores cosine as similarity; a distance cutoff becomes
                // a similarity floor.
                let score_threshold = request.distance.map(|distance| 1.0 - distance);
                let points = self
                    .qdrant
                    .search_points(
                        &config.qdrant_collection_name,
                        vector,
                        filter,
                        config.aggregate_fetch_limit,
                        score_threshold,
                    )
                    .await?;
                points.into_iter().filter_map(|point| point.payload).collect()
            }
            None => {
                self.qdrant
                    .scroll_payloads(&config.qdrant_collection_name, json!(["json"]), filter)
                    .await?
            }
        };

        let values: Vec<Value> = payloads
            .iter()
            .flat_map(|payload| resolve_record(payload, &path))
            .collect();

        tracing::debug!(
            field = %request.field_path,
            operation = request.operation.as_str(),
            records = payloads.len(),
            values = values.len(),
            "Aggregation computed"
        );

        let result = aggregate_values(
            &values,
            request.operation,
            request.min_occurrences.unwrap_or(1),
        );

        let (value, occurrences) = match result {
            AggregationResult::Scalar(value) => (Some(value), None),
            AggregationResult::Occurrences(occurrences) => (None, Some(occurrences)),
        };

        Ok(AggregationOutcome {
            field: request.field_path,
            operation: request.operation.as_str(),
            value,
            occurrences,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn file_extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .filter(|extension| !extension.is_empty())
}

fn string_field(payload: &serde_json::Map<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_metadata(payload: &serde_json::Map<String, Value>) -> Value {
    match payload.get("metadata").and_then(Value::as_str) {
        Some(raw) => serde_json::from_str(raw)
            .unwrap_or_else(|_| json!({ "error": "Failed to parse metadata" })),
        None => json!({ "error": "Failed to parse metadata" }),
    }
}
