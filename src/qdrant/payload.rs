//! Helpers for constructing Qdrant point payloads.

use crate::qdrant::types::ChunkPoint;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_chunk_payload(point: &ChunkPoint) -> Value {
    let mut payload = Map::new();
    payload.insert("doc_id".into(), Value::String(point.doc_id.clone()));
    payload.insert("chunk_id".into(), Value::from(point.chunk_id));
    payload.insert("content".into(), Value::String(point.content.clone()));
    payload.insert("metadata".into(), Value::String(point.metadata.clone()));
    payload.insert("file_type".into(), Value::String(point.file_type.clone()));

    if let Some(json) = point.json.as_ref().filter(|value| !value.is_empty()) {
        payload.insert("json".into(), Value::String(json.clone()));
    }

    Value::Object(payload)
}

/// Construct an identifier suitable for Qdrant point ids.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}
