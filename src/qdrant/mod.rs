//! Qdrant vector store integration: REST client, payload shape, and filters.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::build_doc_filter;
pub use types::{ChunkPoint, QdrantError, ScoredPoint};
