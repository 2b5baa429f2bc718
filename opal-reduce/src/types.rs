//! Shard result types consumed by the coordinator-side reduction
//!
//! These types are the in-memory shape of per-shard partial results. Wire
//! encoding (bincode over RPC, JSON at the REST layer) happens outside this
//! crate; everything here just carries Serialize/Deserialize derives so the
//! transport can pick its codec.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// One scored completion candidate produced by a single shard.
///
/// Immutable once produced by the shard, except for the one-time
/// `shard_origin` stamp applied by the coordinator when the shard response
/// arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Suggested text
    pub text: String,
    /// Relevance score assigned by the shard-local suggester
    pub score: f64,
    /// Index of the shard that produced this candidate, stamped on arrival
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_origin: Option<u32>,
    /// Context values attached by the shard-local suggester
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub contexts: HashMap<String, Vec<String>>,
}

impl Candidate {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            score,
            shard_origin: None,
            contexts: HashMap::new(),
        }
    }

    /// Ordering used everywhere candidates are ranked: score descending,
    /// ties broken by text ascending (code-point order). Deliberately never
    /// considers insertion order or shard index so that merged output is
    /// identical regardless of how many shards contributed or in which order
    /// their responses arrived.
    pub fn rank_cmp(&self, other: &Candidate) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.text.cmp(&self.text))
    }
}

/// A named, capacity-bounded list of candidates, sorted by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateList {
    /// Name of the suggestion this list answers
    pub name: String,
    /// Requested size of the final top-K
    pub capacity: usize,
    /// Candidates, best first
    pub candidates: Vec<Candidate>,
}

impl CandidateList {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates(
        name: impl Into<String>,
        capacity: usize,
        candidates: Vec<Candidate>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            candidates,
        }
    }

    /// Whether `candidates` is sorted best-first under [`Candidate::rank_cmp`]
    pub fn is_sorted(&self) -> bool {
        self.candidates
            .windows(2)
            .all(|w| w[0].rank_cmp(&w[1]) != std::cmp::Ordering::Less)
    }
}

/// Result of a named aggregation, either a single numeric metric or a
/// multi-bucket grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub name: String,
    #[serde(flatten)]
    pub value: AggregationValue,
}

impl AggregationResult {
    pub fn single(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: AggregationValue::Single(value),
        }
    }

    pub fn buckets(name: impl Into<String>, buckets: Vec<Bucket>) -> Self {
        Self {
            name: name.into(),
            value: AggregationValue::Buckets(buckets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationValue {
    Single(f64),
    Buckets(Vec<Bucket>),
}

/// One group of a multi-bucket aggregation.
///
/// Buckets are value objects: the bucket-script transform replaces a bucket
/// with a new one rather than mutating it, which keeps reduction
/// referentially transparent. Sub-aggregations are a `Vec` (not a map) so
/// iteration order is deterministic across repeated reductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Grouping key (term, range bound, histogram interval, ...)
    pub key: Value,
    pub doc_count: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_aggs: Vec<AggregationResult>,
}

impl Bucket {
    pub fn new(key: impl Into<Value>, doc_count: i64) -> Self {
        Self {
            key: key.into(),
            doc_count,
            sub_aggs: Vec::new(),
        }
    }

    pub fn with_sub_aggs(
        key: impl Into<Value>,
        doc_count: i64,
        sub_aggs: Vec<AggregationResult>,
    ) -> Self {
        Self {
            key: key.into(),
            doc_count,
            sub_aggs,
        }
    }

    /// Look up a direct sub-aggregation by name
    pub fn sub_agg(&self, name: &str) -> Option<&AggregationResult> {
        self.sub_aggs.iter().find(|a| a.name == name)
    }
}

/// Variable name → dotted path into a bucket's sub-aggregations.
///
/// BTreeMap keeps iteration deterministic; key insertion order carries no
/// meaning.
pub type BucketsPathMap = BTreeMap<String, String>;

/// One document hit as returned by a shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardHit {
    pub id: String,
    pub score: f32,
}

/// Shard-local document hits. Hit merging is handled by the scatter-gather
/// search path, not by this reducer; the variant exists here because shard
/// responses carry all result kinds over the same channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: usize,
    pub hits: Vec<ShardHit>,
}

/// One partial result from one shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardResult {
    pub shard_id: u32,
    pub payload: ShardPayload,
}

impl ShardResult {
    pub fn suggestions(shard_id: u32, list: CandidateList) -> Self {
        Self {
            shard_id,
            payload: ShardPayload::Suggestions(list),
        }
    }

    pub fn aggregation(shard_id: u32, agg: AggregationResult) -> Self {
        Self {
            shard_id,
            payload: ShardPayload::Aggregation(agg),
        }
    }
}

/// The closed set of partial result kinds a shard can contribute.
///
/// The coordinator reduces `Suggestions` and `Aggregation`; `Hits` belongs
/// to the scatter-gather hit merger and is rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardPayload {
    Suggestions(CandidateList),
    Aggregation(AggregationResult),
    Hits(SearchHits),
}

impl ShardPayload {
    /// Kind label for errors and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ShardPayload::Suggestions(_) => "suggestions",
            ShardPayload::Aggregation(_) => "aggregation",
            ShardPayload::Hits(_) => "hits",
        }
    }

    /// Logical name of the request this partial answers, if the kind has one
    pub fn name(&self) -> Option<&str> {
        match self {
            ShardPayload::Suggestions(list) => Some(&list.name),
            ShardPayload::Aggregation(agg) => Some(&agg.name),
            ShardPayload::Hits(_) => None,
        }
    }
}
