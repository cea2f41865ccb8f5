#![deny(missing_docs)]

//! Core library for the docbase knowledge-base server.

/// JSON path resolution and aggregation engine.
pub mod aggregate;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Multi-format content and metadata extraction.
pub mod extract;
/// Document ingestion pipeline and service orchestration.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// OCR collaborator abstraction.
pub mod ocr;
/// Qdrant vector store integration.
pub mod qdrant;
