//! PDF extraction: native text layer first, OCR over page images as fallback.
//!
//! The pipeline is a small state machine: a native pass that never errors (failures
//! decode to empty text), a fixed acceptance threshold separating text PDFs from
//! scanned ones, and an OCR attempt whose failure terminates in a placeholder result.

use super::{ExtractError, ExtractedDocument, ExtractionMethod};
use crate::ocr::OcrClient;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, xobject::PdfImage};
use serde_json::{Map, Value};
use std::io::Read;

/// Minimum trimmed character count for the native text layer to be trusted.
/// Shorter output is treated as a scanned/image PDF.
const NATIVE_TEXT_MIN_CHARS: usize = 50;

const FAILED_PLACEHOLDER: &str = "Failed to process document.";
const EMPTY_PLACEHOLDER: &str = "No text could be extracted from this document.";

pub(crate) async fn extract(
    bytes: &[u8],
    ocr: Option<&dyn OcrClient>,
) -> Result<ExtractedDocument, ExtractError> {
    let owned = bytes.to_vec();
    let (native_text, mut metadata) = tokio::task::spawn_blocking(move || native_pass(&owned))
        .await
        .map_err(|err| ExtractError::Task(err.to_string()))?;

    if native_is_sufficient(&native_text) {
        metadata.insert(
            "extraction_method".into(),
            Value::String(ExtractionMethod::Native.as_str().into()),
        );
        return Ok(ExtractedDocument {
            content: native_text,
            metadata,
            method: ExtractionMethod::Native,
        });
    }

    tracing::info!(
        chars = native_text.trim().chars().count(),
        "Native PDF text below threshold; attempting OCR"
    );

    let owned = bytes.to_vec();
    let images = tokio::task::spawn_blocking(move || collect_page_images(&owned))
        .await
        .map_err(|err| ExtractError::Task(err.to_string()))?;

    let (content, method) = run_ocr(&images, ocr).await;
    metadata.insert(
        "extraction_method".into(),
        Value::String(method.as_str().into()),
    );
    if method == ExtractionMethod::Ocr {
        metadata.insert("ocr_processed".into(), Value::Bool(true));
    }

    Ok(ExtractedDocument {
        content,
        metadata,
        method,
    })
}

fn native_is_sufficient(text: &str) -> bool {
    text.trim().chars().count() >= NATIVE_TEXT_MIN_CHARS
}

/// Extract the native text layer and best-effort metadata. Never fails: decode
/// errors degrade to empty text so the OCR fallback can take over.
fn native_pass(bytes: &[u8]) -> (String, Map<String, Value>) {
    let text = pdf_extract::extract_text_from_mem(bytes).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "Native PDF text extraction failed; treating as empty");
        String::new()
    });
    (text, read_metadata(bytes))
}

fn read_metadata(bytes: &[u8]) -> Map<String, Value> {
    let mut metadata = Map::new();

    let document = match Document::load_mem(bytes) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse PDF for metadata");
            metadata.insert("title".into(), Value::String("Untitled".into()));
            metadata.insert("author".into(), Value::String("Unknown".into()));
            return metadata;
        }
    };

    metadata.insert(
        "page_count".into(),
        Value::from(document.get_pages().len()),
    );

    let info = info_dictionary(&document);
    let title = info
        .and_then(|dict| info_string(&document, dict, b"Title"))
        .unwrap_or_else(|| "Untitled".to_string());
    let author = info
        .and_then(|dict| info_string(&document, dict, b"Author"))
        .unwrap_or_else(|| "Unknown".to_string());
    metadata.insert("title".into(), Value::String(title));
    metadata.insert("author".into(), Value::String(author));

    if let Some(created) = info.and_then(|dict| info_string(&document, dict, b"CreationDate")) {
        metadata.insert("creation_date".into(), Value::String(created));
    }
    if let Some(modified) = info.and_then(|dict| info_string(&document, dict, b"ModDate")) {
        metadata.insert("modified_date".into(), Value::String(modified));
    }

    metadata
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    let info = match info {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    info.as_dict().ok()
}

fn info_string(document: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let object = info.get(key).ok()?;
    let object = match object {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or a latin-ish byte encoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// One recovered page raster ready for the OCR collaborator.
struct PageImage {
    data: Vec<u8>,
    mime_type: &'static str,
}

async fn run_ocr(
    images: &[PageImage],
    ocr: Option<&dyn OcrClient>,
) -> (String, ExtractionMethod) {
    let Some(client) = ocr else {
        tracing::warn!("OCR fallback required but no OCR endpoint is configured");
        return (FAILED_PLACEHOLDER.to_string(), ExtractionMethod::Failed);
    };

    let mut pages = Vec::new();
    for image in images {
        match client.recognize(&image.data, image.mime_type).await {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pages.push(trimmed.to_string());
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "OCR attempt failed");
                return (FAILED_PLACEHOLDER.to_string(), ExtractionMethod::Failed);
            }
        }
    }

    if pages.is_empty() {
        (EMPTY_PLACEHOLDER.to_string(), ExtractionMethod::Failed)
    } else {
        (pages.join("\n"), ExtractionMethod::Ocr)
    }
}

/// Recover embedded page rasters in page order. Scanned PDFs carry each page as a
/// single image XObject, which we hand to OCR at its native scan resolution.
fn collect_page_images(bytes: &[u8]) -> Vec<PageImage> {
    let document = match Document::load_mem(bytes) {
        Ok(document) => document,
        Err(err) => {
            tracing::debug!(error = %err, "Failed to parse PDF for page images");
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        match document.get_page_images(page_id) {
            Ok(page_images) => {
                for page_image in page_images {
                    if let Some(decoded) = decode_page_image(&page_image) {
                        images.push(decoded);
                    }
                }
            }
            Err(err) => {
                tracing::debug!(page = page_number, error = %err, "No images recovered from page");
            }
        }
    }

    tracing::debug!(images = images.len(), "Collected page images for OCR");
    images
}

fn decode_page_image(page_image: &PdfImage<'_>) -> Option<PageImage> {
    let filters = page_image.filters.as_ref()?;

    if filters.iter().any(|filter| filter == "DCTDecode") {
        return Some(PageImage {
            data: page_image.content.to_vec(),
            mime_type: "image/jpeg",
        });
    }
    if filters.iter().any(|filter| filter == "FlateDecode") {
        return match flate_to_png(page_image) {
            Ok(data) => Some(PageImage {
                data,
                mime_type: "image/png",
            }),
            Err(reason) => {
                tracing::debug!(reason, "Failed to decode FlateDecode page image");
                None
            }
        };
    }
    if filters.iter().any(|filter| filter == "JPXDecode") {
        return Some(PageImage {
            data: page_image.content.to_vec(),
            mime_type: "image/jp2",
        });
    }

    tracing::debug!(?filters, "Unsupported page image filter");
    None
}

/// Decompress a FlateDecode raster and re-encode it as PNG for the OCR service.
fn flate_to_png(page_image: &PdfImage<'_>) -> Result<Vec<u8>, String> {
    let mut decoder = ZlibDecoder::new(page_image.content);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|err| format!("decompression failed: {err}"))?;

    let width = u32::try_from(page_image.width).map_err(|_| "invalid width".to_string())?;
    let height = u32::try_from(page_image.height).map_err(|_| "invalid height".to_string())?;
    let color_space = page_image.color_space.as_deref().unwrap_or("DeviceRGB");

    let dynamic = match color_space {
        "DeviceGray" | "Gray" | "CalGray" => {
            image::GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
        }
        _ => image::RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| "raster buffer does not match declared dimensions".to_string())?;

    let mut png = Vec::new();
    dynamic
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| format!("PNG encoding failed: {err}"))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;
    use async_trait::async_trait;

    struct StubOcr {
        responses: Vec<Result<String, ()>>,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl StubOcr {
        fn new(responses: Vec<Result<String, ()>>) -> Self {
            Self {
                responses,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OcrClient for StubOcr {
        async fn recognize(&self, _image: &[u8], _mime_type: &str) -> Result<String, OcrError> {
            let idx = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            match &self.responses[idx] {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(OcrError::UnexpectedStatus {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "down".into(),
                }),
            }
        }
    }

    fn page(data: &[u8]) -> PageImage {
        PageImage {
            data: data.to_vec(),
            mime_type: "image/jpeg",
        }
    }

    #[test]
    fn native_threshold_is_fifty_trimmed_chars() {
        assert!(!native_is_sufficient("   short scan artifact   "));
        assert!(native_is_sufficient(&"x".repeat(50)));
        assert!(!native_is_sufficient(&format!("  {}  ", "x".repeat(49))));
    }

    #[tokio::test]
    async fn ocr_joins_non_empty_pages_with_newlines() {
        let stub = StubOcr::new(vec![
            Ok("page one".into()),
            Ok("   ".into()),
            Ok("page three".into()),
        ]);
        let images = vec![page(b"a"), page(b"b"), page(b"c")];

        let (content, method) = run_ocr(&images, Some(&stub)).await;
        assert_eq!(method, ExtractionMethod::Ocr);
        assert_eq!(content, "page one\npage three");
    }

    #[tokio::test]
    async fn ocr_failure_terminates_with_failed_placeholder() {
        let stub = StubOcr::new(vec![Ok("first".into()), Err(())]);
        let images = vec![page(b"a"), page(b"b")];

        let (content, method) = run_ocr(&images, Some(&stub)).await;
        assert_eq!(method, ExtractionMethod::Failed);
        assert_eq!(content, FAILED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn empty_ocr_output_yields_empty_placeholder() {
        let stub = StubOcr::new(vec![Ok(String::new())]);
        let images = vec![page(b"a")];

        let (content, method) = run_ocr(&images, Some(&stub)).await;
        assert_eq!(method, ExtractionMethod::Failed);
        assert_eq!(content, EMPTY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn missing_ocr_client_counts_as_failure() {
        let (content, method) = run_ocr(&[page(b"a")], None).await;
        assert_eq!(method, ExtractionMethod::Failed);
        assert_eq!(content, FAILED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn unparseable_pdf_never_reports_native() {
        let document = extract(b"not a pdf at all", None).await.expect("terminal result");
        assert_eq!(document.method, ExtractionMethod::Failed);
        assert_eq!(document.content, FAILED_PLACEHOLDER);
        assert_eq!(document.metadata["extraction_method"], "failed");
        assert_eq!(document.metadata["title"], "Untitled");
        assert_eq!(document.metadata["author"], "Unknown");
    }

    #[test]
    fn utf16_info_strings_are_decoded() {
        let mut encoded = vec![0xFE, 0xFF];
        for unit in "Résumé".encode_utf16() {
            encoded.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&encoded), "Résumé");
        assert_eq!(decode_pdf_string(b"Plain Title"), "Plain Title");
    }
}
