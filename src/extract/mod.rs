//! Multi-format content and metadata extraction.
//!
//! Each supported format decodes raw bytes into text plus a best-effort metadata map.
//! Metadata failures degrade (fields are dropped, never null); content failures are
//! fatal for every format except PDF, which cascades native -> OCR -> placeholder.

mod docx;
mod json;
mod pdf;
mod text;

use crate::ocr::OcrClient;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

/// Supported source document formats, inferred from the upload extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format; the only format with an OCR fallback.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// JSON payload ingested as a single canonical chunk.
    Json,
    /// Plain UTF-8 text.
    Text,
}

impl DocumentFormat {
    /// Map a file extension to a format, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "json" => Some(Self::Json),
            "txt" | "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Stable tag stored alongside each chunk.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// Strategy that ultimately produced the text of a PDF.
///
/// Only meaningful for [`DocumentFormat::Pdf`]; other formats always report `Native`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// The native text layer was sufficient.
    Native,
    /// Page images were recognized by the OCR collaborator.
    Ocr,
    /// Both strategies were exhausted; content holds a placeholder string.
    Failed,
}

impl ExtractionMethod {
    /// Stable tag recorded in document metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ocr => "ocr",
            Self::Failed => "failed",
        }
    }
}

/// Extracted text plus metadata for one document.
///
/// Carried as a return value rather than extractor state so a single pipeline instance
/// can serve concurrent documents without cross-document interference.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Text content; for JSON documents this is the canonical re-serialization.
    pub content: String,
    /// Best-effort string-keyed metadata. Never contains null values.
    pub metadata: Map<String, Value>,
    /// Strategy that produced the content.
    pub method: ExtractionMethod,
}

/// Errors raised by single-pass extraction. PDF never surfaces here: its failures
/// terminate in a placeholder result instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// DOCX archive or document part could not be decoded.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    /// JSON payload could not be parsed.
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    /// A blocking decode task failed to complete.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Decode a document of the given format into text and metadata.
///
/// The OCR collaborator is consulted only for PDFs whose native text layer is too
/// short to be trusted.
pub async fn extract_document(
    format: DocumentFormat,
    bytes: &[u8],
    ocr: Option<&dyn OcrClient>,
) -> Result<ExtractedDocument, ExtractError> {
    let mut document = match format {
        DocumentFormat::Pdf => pdf::extract(bytes, ocr).await?,
        DocumentFormat::Docx => docx::extract(bytes)?,
        DocumentFormat::Json => json::extract(bytes)?,
        DocumentFormat::Text => text::extract(bytes),
    };

    document
        .metadata
        .insert("file_type".into(), Value::String(format.as_str().into()));
    document.metadata.insert(
        "timestamp".into(),
        Value::String(current_timestamp_rfc3339()),
    );

    // Best-effort extractors may surface absent fields as nulls; drop them.
    document.metadata.retain(|_, value| !value.is_null());

    Ok(document)
}

/// Current timestamp formatted for metadata storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
