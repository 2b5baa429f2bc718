//! Dotted-path resolution of metric values inside a bucket
//!
//! A buckets path like `"filtered.sales"` walks the bucket's nested
//! sub-aggregations component by component. Intermediate components must be
//! single-bucket aggregations (a nested multi-bucket result holding exactly
//! one bucket); the terminal component must be a single numeric metric.
//!
//! A component that does not exist is a schema/config error and fails the
//! whole reduction. A component that exists but produced no usable number
//! (NaN) is a data gap and is delegated to the configured [`GapPolicy`].

use crate::error::{ReduceError, Result};
use crate::pipeline::gap::{GapPolicy, GapPolicyDecision};
use crate::types::{AggregationValue, Bucket};

/// Special path component referring to the bucket's own document count
pub const COUNT_PATH: &str = "_count";

/// Resolve `path` against `bucket`, applying `policy` to the terminal value.
///
/// `aggregation` is the name of the aggregation being reduced, used only to
/// label errors.
pub fn resolve_bucket_value(
    aggregation: &str,
    bucket: &Bucket,
    path: &str,
    policy: GapPolicy,
) -> Result<GapPolicyDecision> {
    if path == COUNT_PATH {
        return Ok(policy.decide(Some(bucket.doc_count as f64)));
    }

    let unresolvable = |component: &str| ReduceError::UnresolvableAggregationPath {
        aggregation: aggregation.to_string(),
        path: path.to_string(),
        component: component.to_string(),
    };

    let mut current = bucket;
    let mut components = path.split('.').peekable();
    while let Some(component) = components.next() {
        let sub = current.sub_agg(component).ok_or_else(|| unresolvable(component))?;
        let terminal = components.peek().is_none();
        match (&sub.value, terminal) {
            (AggregationValue::Single(v), true) => {
                return Ok(policy.decide(Some(*v)));
            }
            (AggregationValue::Buckets(buckets), false) if buckets.len() == 1 => {
                current = &buckets[0];
            }
            // Terminal component is not a numeric metric, or an intermediate
            // component cannot be descended into. Both are schema errors.
            _ => return Err(unresolvable(component)),
        }
    }

    // Unreachable: split('.') yields at least one component
    Err(unresolvable(path))
}
