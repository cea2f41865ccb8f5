//! JSON extraction: parse and canonically re-serialize the payload.
//!
//! The canonical string (sorted object keys, no insignificant whitespace) is both the
//! embedded content and the `json` field stored with the document's single chunk.

use super::{ExtractError, ExtractedDocument, ExtractionMethod};
use serde_json::{Map, Value};

pub(crate) fn extract(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    let parsed: Value = serde_json::from_slice(bytes)?;
    let content = serde_json::to_string(&parsed)?;

    let mut metadata = Map::new();
    if let Value::Object(object) = &parsed {
        metadata.insert("key_count".into(), Value::from(object.len()));
    }

    Ok(ExtractedDocument {
        content,
        metadata,
        method: ExtractionMethod::Native,
    })
}
