//! Filter construction for Qdrant queries.

use serde_json::{Value, json};

/// Build a payload filter scoping a query to a single document, when requested.
pub fn build_doc_filter(doc_id: Option<&str>) -> Option<Value> {
    let doc_id = doc_id.map(str::trim).filter(|value| !value.is_empty())?;
    Some(json!({
        "must": [
            {
                "key": "doc_id",
                "match": { "value": doc_id }
            }
        ]
    }))
}
