//! DOCX extraction: paragraph text from `word/document.xml`, metadata from
//! `docProps/core.xml`. OOXML archives are ZIP containers; both parts are parsed
//! with a streaming XML reader.

use super::{ExtractError, ExtractedDocument, ExtractionMethod};
use quick_xml::events::Event;
use serde_json::{Map, Value};
use std::io::{Cursor, Read};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub(crate) fn extract(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ExtractError::Docx(err.to_string()))?;

    let document_xml = read_zip_entry(&mut archive, "word/document.xml")?;
    let content = paragraph_text(&document_xml)?;

    // Core properties are optional; a malformed part degrades to defaults.
    let metadata = match read_zip_entry(&mut archive, "docProps/core.xml") {
        Ok(core_xml) => core_properties(&core_xml),
        Err(err) => {
            tracing::debug!(error = %err, "DOCX core properties unavailable");
            Map::new()
        }
    };

    let mut metadata = metadata;
    metadata
        .entry("title".to_string())
        .or_insert_with(|| Value::String("Untitled".into()));
    metadata
        .entry("author".to_string())
        .or_insert_with(|| Value::String("Unknown".into()));

    Ok(ExtractedDocument {
        content,
        metadata,
        method: ExtractionMethod::Native,
    })
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|err| ExtractError::Docx(format!("{name}: {err}")))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(format!(
            "{name} exceeds size limit ({MAX_XML_ENTRY_BYTES} bytes)"
        )));
    }
    Ok(out)
}

/// Collect `w:t` runs in document order, emitting one line per `w:p` paragraph.
fn paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                if element.local_name().as_ref() == b"t" {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        current.push_str(text.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(Event::End(element)) => {
                if element.local_name().as_ref() == b"p" {
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(ExtractError::Docx(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

/// Pull `dc:title` and `dc:creator` from the core-properties part.
fn core_properties(xml: &[u8]) -> Map<String, Value> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut metadata = Map::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                let key = match element.local_name().as_ref() {
                    b"title" => Some("title"),
                    b"creator" => Some("author"),
                    _ => None,
                };
                if let Some(key) = key {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        let value = text.unescape().unwrap_or_default().trim().to_string();
                        if !value.is_empty() {
                            metadata.insert(key.to_string(), Value::String(value));
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::debug!(error = %err, "Failed to parse DOCX core properties");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_archive(document_xml: &str, core_xml: Option<&str>) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            if let Some(core) = core_xml {
                writer
                    .start_file("docProps/core.xml", SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(core.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn paragraphs_are_joined_in_order() {
        let xml = r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
                <w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;
        let bytes = docx_archive(xml, None);

        let document = extract(&bytes).expect("docx extraction");
        assert_eq!(document.content, "First paragraph.\nSecond paragraph.");
        assert_eq!(document.metadata["title"], "Untitled");
        assert_eq!(document.metadata["author"], "Unknown");
    }

    #[test]
    fn core_properties_populate_title_and_author() {
        let doc = r#"<w:document xmlns:w="ns"><w:body><w:p><w:r><w:t>Body</w:t></w:r></w:p></w:body></w:document>"#;
        let core = r#"<cp:coreProperties xmlns:cp="ns" xmlns:dc="http://purl.org/dc/elements/1.1/">
              <dc:title>Quarterly Report</dc:title>
              <dc:creator>A. Author</dc:creator>
            </cp:coreProperties>"#;
        let bytes = docx_archive(doc, Some(core));

        let document = extract(&bytes).expect("docx extraction");
        assert_eq!(document.metadata["title"], "Quarterly Report");
        assert_eq!(document.metadata["author"], "A. Author");
    }

    #[test]
    fn invalid_archive_is_a_fatal_error() {
        let error = extract(b"not a zip archive").unwrap_err();
        assert!(matches!(error, ExtractError::Docx(_)));
    }

    #[test]
    fn missing_document_part_is_a_fatal_error() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("unrelated.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"hi").unwrap();
            writer.finish().unwrap();
        }
        let error = extract(&cursor.into_inner()).unwrap_err();
        assert!(matches!(error, ExtractError::Docx(_)));
    }
}
