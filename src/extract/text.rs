//! Plain-text extraction: lossy UTF-8 decode of the raw bytes.

use super::{ExtractedDocument, ExtractionMethod};
use serde_json::{Map, Value};

pub(crate) fn extract(bytes: &[u8]) -> ExtractedDocument {
    let content = String::from_utf8_lossy(bytes).into_owned();

    let mut metadata = Map::new();
    metadata.insert("size_bytes".into(), Value::from(bytes.len()));

    ExtractedDocument {
        content,
        metadata,
        method: ExtractionMethod::Native,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8_content() {
        let document = extract("héllo world".as_bytes());
        assert_eq!(document.content, "héllo world");
        assert_eq!(document.metadata["size_bytes"], 12);
    }

    #[test]
    fn invalid_utf8_degrades_lossily() {
        let document = extract(&[0x68, 0x69, 0xFF]);
        assert!(document.content.starts_with("hi"));
    }
}
