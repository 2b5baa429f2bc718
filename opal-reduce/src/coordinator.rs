//! Top-level entry point for coordinator-side reduction
//!
//! Once the scatter-gather layer has collected every expected shard response
//! for a request, it hands the batch to [`ReductionCoordinator::reduce`],
//! which validates that all partials answer the same logical request and
//! dispatches by kind:
//!
//! ```text
//! [ShardResult, ...] → validate name + kind → ┬ suggestions → bounded top-K merge
//!                                             └ aggregation → combine partials → bucket script
//! ```
//!
//! Reduction is a pure, single-threaded function of the batch: independent
//! requests reduce concurrently on their own worker tasks with no shared
//! state, and nothing here blocks or retries. This is the only component
//! aware of both reduction sub-protocols.

use crate::error::{ReduceError, Result};
use crate::metrics::{record_reduce_duration, record_reduce_error, record_reduce_success};
use crate::pipeline::{BucketScript, BucketScriptTransform};
use crate::suggest::merge_candidate_lists;
use crate::types::{
    AggregationResult, AggregationValue, Bucket, CandidateList, ShardPayload, ShardResult,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Final reduced result of one batch of shard responses
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    Suggestions(CandidateList),
    Aggregation(AggregationResult),
}

/// Evaluator for the suggestion path, which never runs a script
struct NoScript;

impl BucketScript for NoScript {
    fn evaluate(&self, _vars: &BTreeMap<String, f64>) -> Option<Value> {
        None
    }
}

/// Reduces one batch of shard partials into a single result.
///
/// An optional [`BucketScriptTransform`] is applied to aggregation results
/// after the partials have been combined; without one, the combined
/// aggregation is returned untouched.
#[derive(Debug, Clone, Default)]
pub struct ReductionCoordinator {
    transform: Option<BucketScriptTransform>,
}

impl ReductionCoordinator {
    pub fn new() -> Self {
        Self { transform: None }
    }

    pub fn with_transform(transform: BucketScriptTransform) -> Self {
        Self {
            transform: Some(transform),
        }
    }

    /// Reduce a batch of shard partials.
    ///
    /// All partials must share one logical name and one kind. Document hits
    /// are merged by the scatter-gather search path, so a `hits` partial
    /// here fails with [`ReduceError::UnsupportedReductionKind`]; validation
    /// runs before any merging, so a failed batch leaves no half-reduced
    /// state behind.
    pub fn reduce(
        &self,
        partials: Vec<ShardResult>,
        script: &dyn BucketScript,
    ) -> Result<Reduced> {
        let kind = partials
            .first()
            .map(|p| p.payload.kind())
            .unwrap_or("unknown");
        let start = Instant::now();
        let result = self.reduce_inner(partials, script);
        record_reduce_duration(kind, start.elapsed());
        match &result {
            Ok(_) => record_reduce_success(kind),
            Err(err) => record_reduce_error(kind, err.error_type()),
        }
        result
    }

    /// Reduce a batch that is expected to contain suggestion partials
    pub fn reduce_suggestions(&self, partials: Vec<ShardResult>) -> Result<CandidateList> {
        match self.reduce(partials, &NoScript)? {
            Reduced::Suggestions(list) => Ok(list),
            Reduced::Aggregation(_) => Err(ReduceError::UnsupportedReductionKind {
                kind: "aggregation".to_string(),
            }),
        }
    }

    fn reduce_inner(
        &self,
        partials: Vec<ShardResult>,
        script: &dyn BucketScript,
    ) -> Result<Reduced> {
        let Some(first) = partials.first() else {
            return Err(ReduceError::EmptyInput);
        };

        // Validate the whole batch before touching any payload
        let kind = first.payload.kind();
        for partial in &partials {
            if partial.payload.kind() != kind {
                return Err(ReduceError::UnsupportedReductionKind {
                    kind: partial.payload.kind().to_string(),
                });
            }
        }
        let Some(name) = first.payload.name() else {
            return Err(ReduceError::UnsupportedReductionKind {
                kind: kind.to_string(),
            });
        };
        let name = name.to_string();
        for partial in &partials {
            // Kinds are uniform and named at this point
            let found = partial.payload.name().unwrap_or_default();
            if found != name {
                return Err(ReduceError::NameMismatch {
                    expected: name.clone(),
                    found: found.to_string(),
                });
            }
        }

        debug!(name = %name, kind, shards = partials.len(), "reducing shard results");

        match kind {
            "suggestions" => {
                let mut lists = Vec::with_capacity(partials.len());
                for partial in partials {
                    let ShardPayload::Suggestions(mut list) = partial.payload else {
                        unreachable!("kind validated above");
                    };
                    for candidate in &mut list.candidates {
                        candidate.shard_origin = Some(partial.shard_id);
                    }
                    lists.push(list);
                }
                let capacity = lists[0].capacity;
                Ok(Reduced::Suggestions(merge_candidate_lists(
                    lists, capacity,
                )?))
            }
            "aggregation" => {
                let aggs = partials
                    .into_iter()
                    .map(|p| match p.payload {
                        ShardPayload::Aggregation(agg) => agg,
                        _ => unreachable!("kind validated above"),
                    })
                    .collect();
                let combined = combine_aggregations(aggs);
                match &self.transform {
                    Some(transform) => Ok(Reduced::Aggregation(
                        transform.transform(&combined, script)?,
                    )),
                    None => Ok(Reduced::Aggregation(combined)),
                }
            }
            other => Err(ReduceError::UnsupportedReductionKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Combine per-shard partials of one aggregation definition.
///
/// Single-value partials are additive (counts and sums, the shape shard
/// aggregators ship to the coordinator); bucket lists merge by key with
/// first-seen key order, summed doc counts and recursively combined
/// sub-aggregations.
fn combine_aggregations(partials: Vec<AggregationResult>) -> AggregationResult {
    let mut iter = partials.into_iter();
    let mut acc = iter
        .next()
        .expect("combine_aggregations requires at least one partial");
    for next in iter {
        combine_into(&mut acc, next);
    }
    acc
}

fn combine_into(acc: &mut AggregationResult, other: AggregationResult) {
    match (&mut acc.value, other.value) {
        (AggregationValue::Single(a), AggregationValue::Single(b)) => *a += b,
        (AggregationValue::Buckets(a), AggregationValue::Buckets(b)) => merge_bucket_lists(a, b),
        // Partials of one aggregation definition always share a shape
        (_, other) => debug_assert!(false, "aggregation shape mismatch: {other:?}"),
    }
}

fn merge_bucket_lists(acc: &mut Vec<Bucket>, other: Vec<Bucket>) {
    for bucket in other {
        match acc.iter_mut().find(|b| b.key == bucket.key) {
            Some(existing) => {
                existing.doc_count += bucket.doc_count;
                for sub in bucket.sub_aggs {
                    match existing.sub_aggs.iter_mut().find(|a| a.name == sub.name) {
                        Some(existing_sub) => combine_into(existing_sub, sub),
                        None => existing.sub_aggs.push(sub),
                    }
                }
            }
            None => acc.push(bucket),
        }
    }
}
