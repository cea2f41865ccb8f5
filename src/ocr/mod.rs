//! OCR collaborator abstraction.
//!
//! The OCR engine is an external capability: it receives a page image and returns
//! best-effort text, possibly empty. Failures are contained by the PDF extraction
//! pipeline and never propagate past its OCR stage.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors raised while talking to the OCR collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    /// HTTP layer failed before receiving a response.
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// OCR service responded with an unexpected status code.
    #[error("Unexpected OCR response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the OCR service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Interface implemented by OCR backends.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Recognize text in a single page image. May return an empty string.
    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String, OcrError>;
}

/// HTTP client for a remote OCR service.
///
/// Posts raw image bytes to the configured endpoint and expects the recognized text as
/// the plain response body.
pub struct HttpOcrClient {
    client: Client,
    base_url: String,
}

impl HttpOcrClient {
    /// Build a client from `OCR_URL`, returning `None` when no endpoint is configured.
    pub fn from_config() -> Option<Self> {
        let url = get_config().ocr_url.clone()?;
        Some(Self::new(url))
    }

    /// Construct a client targeting an explicit OCR endpoint.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl OcrClient for HttpOcrClient {
    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String, OcrError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("content-type", mime_type)
            .body(image.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = OcrError::UnexpectedStatus { status, body };
            tracing::warn!(error = %error, "OCR request rejected");
            return Err(error);
        }

        let text = response.text().await?;
        tracing::debug!(bytes = image.len(), chars = text.len(), "OCR page complete");
        Ok(text)
    }
}
