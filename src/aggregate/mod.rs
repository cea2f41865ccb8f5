//! Path resolution and aggregation over ingested JSON payloads.

pub mod ops;
pub mod path;

pub use ops::{AggregationOp, AggregationResult, Occurrence, aggregate_values};
pub use path::{PathExpression, PathParseError, resolve_record};
