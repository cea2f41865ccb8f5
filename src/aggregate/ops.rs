//! Aggregation operations over a flat list of extracted values.
//!
//! Values arrive as arbitrary JSON; objects and arrays are stringified before
//! counting. Numeric operations admit a value only when its textual form, with at
//! most one decimal point removed, is all digits — a deliberate heuristic carried
//! over from the query language this engine serves (negative numbers and scientific
//! notation are excluded; see DESIGN.md).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Supported aggregation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationOp {
    /// Number of extracted values.
    Count,
    /// Sum of numeric-eligible values.
    Sum,
    /// Arithmetic mean of numeric-eligible values.
    Mean,
    /// Median of numeric-eligible values.
    Median,
    /// Minimum numeric-eligible value.
    Min,
    /// Maximum numeric-eligible value.
    Max,
    /// Most frequent numeric-eligible value; first seen wins ties.
    Mode,
    /// Ranked list of distinct stringified values with frequency counts.
    TextOccurrences,
}

impl AggregationOp {
    /// Stable textual tag for responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Mode => "mode",
            Self::TextOccurrences => "text_occurrences",
        }
    }
}

/// One entry of an occurrence ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Stringified value.
    pub value: String,
    /// Number of times the value was extracted.
    pub count: usize,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    /// Scalar result; `Value::Null` when no eligible input existed.
    Scalar(Value),
    /// Occurrence ranking; empty when no input existed.
    Occurrences(Vec<Occurrence>),
}

/// Reduce a flat list of extracted values into a scalar or ranked result.
///
/// Empty input always yields `null` (or an empty ranking for
/// [`AggregationOp::TextOccurrences`]), never an operation-specific default.
pub fn aggregate_values(
    values: &[Value],
    operation: AggregationOp,
    min_occurrences: usize,
) -> AggregationResult {
    if values.is_empty() {
        return match operation {
            AggregationOp::TextOccurrences => AggregationResult::Occurrences(Vec::new()),
            _ => AggregationResult::Scalar(Value::Null),
        };
    }

    match operation {
        AggregationOp::Count => AggregationResult::Scalar(Value::from(values.len())),
        AggregationOp::TextOccurrences => {
            AggregationResult::Occurrences(rank_occurrences(values, min_occurrences))
        }
        numeric_op => AggregationResult::Scalar(aggregate_numeric(values, numeric_op)),
    }
}

fn rank_occurrences(values: &[Value], min_occurrences: usize) -> Vec<Occurrence> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(stringify(value)).or_insert(0) += 1;
    }

    let mut occurrences: Vec<Occurrence> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_occurrences)
        .map(|(value, count)| Occurrence { value, count })
        .collect();

    // Deterministic order: count descending, then value ascending.
    occurrences.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    occurrences
}

fn aggregate_numeric(values: &[Value], operation: AggregationOp) -> Value {
    let numeric: Vec<f64> = values.iter().filter_map(numeric_candidate).collect();
    if numeric.is_empty() {
        return Value::Null;
    }

    let result = match operation {
        AggregationOp::Sum => numeric.iter().sum(),
        AggregationOp::Mean => numeric.iter().sum::<f64>() / numeric.len() as f64,
        AggregationOp::Median => median(numeric),
        AggregationOp::Min => numeric.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationOp::Max => numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationOp::Mode => mode(&numeric),
        AggregationOp::Count | AggregationOp::TextOccurrences => unreachable!(),
    };

    Value::from(result)
}

fn median(mut numeric: Vec<f64>) -> f64 {
    numeric.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = numeric.len() / 2;
    if numeric.len() % 2 == 1 {
        numeric[mid]
    } else {
        (numeric[mid - 1] + numeric[mid]) / 2.0
    }
}

/// First-seen value wins when counts tie.
fn mode(numeric: &[f64]) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for value in numeric {
        match counts
            .iter_mut()
            .find(|(seen, _)| seen.to_bits() == value.to_bits())
        {
            Some(entry) => entry.1 += 1,
            None => counts.push((*value, 1)),
        }
    }

    let mut best = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best.0
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Admit a value as numeric when its text, minus at most one decimal point,
/// is all ASCII digits.
fn numeric_candidate(value: &Value) -> Option<f64> {
    let text = stringify(value);
    let cleaned = text.replacen('.', "", 1);
    if cleaned.is_empty() || !cleaned.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok()
}
