//! Path expression DSL for selecting values inside nested JSON payloads.
//!
//! Grammar: `path := segment ('.' segment)*`, `segment := ident | ident "[]"`.
//! A trailing `[]` marks an array-iterate segment. A leading plain `json` segment is
//! stripped at parse time because traversal always starts from the decoded payload.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while parsing a textual field path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    /// The supplied path contained no segments.
    #[error("field path is empty")]
    Empty,
    /// A `.`-separated segment was blank (e.g. `a..b` or `[]`).
    #[error("field path contains an empty segment")]
    EmptySegment,
}

/// One step of a parsed path: a field name, optionally iterating the addressed array.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathSegment {
    name: String,
    iterate: bool,
}

/// Parsed, reusable form of a textual field path. Immutable after parsing;
/// resolution is a pure function over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    segments: Vec<PathSegment>,
}

impl PathExpression {
    /// Parse a dotted/array-bracket path such as `orders[].total`.
    pub fn parse(path: &str) -> Result<Self, PathParseError> {
        if path.trim().is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        for raw in path.split('.') {
            let (name, iterate) = match raw.strip_suffix("[]") {
                Some(name) => (name, true),
                None => (raw, false),
            };
            if name.is_empty() {
                return Err(PathParseError::EmptySegment);
            }
            segments.push(PathSegment {
                name: name.to_string(),
                iterate,
            });
        }

        // Paths are written against the stored record, whose JSON payload lives
        // under a `json` field; traversal starts below it.
        if segments
            .first()
            .is_some_and(|segment| segment.name == "json" && !segment.iterate)
        {
            segments.remove(0);
        }

        Ok(Self { segments })
    }

    /// Extract every value addressed by this path within `root`.
    ///
    /// Missing fields, type mismatches, and non-object list elements contribute no
    /// values; resolution never fails.
    pub fn resolve(&self, root: &Value) -> Vec<Value> {
        extract_values(root, &self.segments)
    }
}

fn extract_values(value: &Value, segments: &[PathSegment]) -> Vec<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return if value.is_null() {
            Vec::new()
        } else {
            vec![value.clone()]
        };
    };

    if segment.iterate {
        let Value::Object(map) = value else {
            return Vec::new();
        };
        return match map.get(&segment.name) {
            Some(Value::Array(items)) => items
                .iter()
                .flat_map(|item| extract_values(item, rest))
                .collect(),
            _ => Vec::new(),
        };
    }

    match value {
        Value::Object(map) => {
            extract_values(map.get(&segment.name).unwrap_or(&Value::Null), rest)
        }
        // A list met without an explicit `[]` iterates its object elements;
        // anything else in the list is silently skipped.
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object())
            .flat_map(|item| {
                extract_values(item.get(&segment.name).unwrap_or(&Value::Null), rest)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolve a path against one stored record's `json` payload.
///
/// The payload is a serialized string (or occasionally an already-decoded value).
/// Records with a missing or malformed payload resolve to no values; the error is
/// logged, never raised.
pub fn resolve_record(payload: &Map<String, Value>, path: &PathExpression) -> Vec<Value> {
    let Some(raw) = payload.get("json") else {
        tracing::debug!("Record has no json payload; skipping");
        return Vec::new();
    };

    match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(decoded) => path.resolve(&decoded),
            Err(err) => {
                tracing::debug!(error = %err, "Record json payload is malformed; skipping");
                Vec::new()
            }
        },
        other => path.resolve(other),
    }
}
