//! Opal Reduce - Coordinator-side reduction of shard results
//!
//! When a search request fans out across shards, every shard answers with a
//! locally-sorted partial result. This crate turns one batch of such
//! partials into a single final result on the coordinating node:
//!
//! - **Suggestions**: per-shard completion candidate lists are merged into
//!   one global top-K via a capacity-bounded min-heap with a deterministic
//!   score/text ordering, so the outcome does not depend on shard count or
//!   response order.
//! - **Aggregations**: per-shard multi-bucket partials are combined by key,
//!   then an optional bucket-script transform computes a derived metric per
//!   bucket, honoring a configurable gap policy for missing inputs.
//!
//! Everything here is synchronous and allocation-bounded: one reduction owns
//! its own heap and bucket list, so independent requests reduce concurrently
//! without any shared state. Shard fan-out, request lifecycle, scripting
//! runtimes and wire encoding all live in neighboring crates; this one only
//! defines the in-memory shapes and the reduction itself.

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod suggest;
pub mod types;

pub use coordinator::{Reduced, ReductionCoordinator};
pub use error::{ReduceError, Result};
pub use pipeline::{
    resolve_bucket_value, BucketScript, BucketScriptTransform, GapPolicy, GapPolicyDecision,
};
pub use suggest::merge_candidate_lists;
pub use types::{
    AggregationResult, AggregationValue, Bucket, BucketsPathMap, Candidate, CandidateList,
    SearchHits, ShardHit, ShardPayload, ShardResult,
};
