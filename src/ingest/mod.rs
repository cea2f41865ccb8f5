//! Ingestion pipeline: chunking, orchestration, and service types.

pub mod chunking;
pub mod service;
pub mod types;

pub use chunking::{ChunkingError, DEFAULT_CHUNK_WINDOW, chunk_text};
pub use service::{DocumentApi, DocumentService};
pub use types::{
    AggregateError, AggregateRequest, AggregationOutcome, IngestError, IngestOutcome,
    SearchError, SearchHit, SearchRequest,
};
