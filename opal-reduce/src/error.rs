//! Reduction-specific error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reducing shard results on the coordinator.
///
/// None of these are retryable inside this crate: reduction is a pure
/// function of its inputs, so retrying without new shard responses cannot
/// change the outcome. Retries belong to the shard-communication layer.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReduceError {
    #[error("No shard results to reduce")]
    EmptyInput,

    #[error("Shard result name mismatch: expected '{expected}', found '{found}'")]
    NameMismatch { expected: String, found: String },

    #[error("Cannot reduce shard results of kind '{kind}'")]
    UnsupportedReductionKind { kind: String },

    #[error("No aggregation found for path '{path}' in [{aggregation}]: missing component '{component}'")]
    UnresolvableAggregationPath {
        aggregation: String,
        path: String,
        component: String,
    },

    #[error("Invalid gap policy '{0}', expected one of: insert_zeros, skip")]
    InvalidGapPolicy(String),

    #[error("Bucket script for [{aggregation}] must return a number")]
    NonNumericScriptResult { aggregation: String },

    #[error("Aggregation [{aggregation}] is not a multi-bucket aggregation")]
    NotMultiBucket { aggregation: String },
}

impl ReduceError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            ReduceError::EmptyInput => "empty_input",
            ReduceError::NameMismatch { .. } => "name_mismatch",
            ReduceError::UnsupportedReductionKind { .. } => "unsupported_kind",
            ReduceError::UnresolvableAggregationPath { .. } => "unresolvable_path",
            ReduceError::InvalidGapPolicy(_) => "invalid_gap_policy",
            ReduceError::NonNumericScriptResult { .. } => "non_numeric_script_result",
            ReduceError::NotMultiBucket { .. } => "not_multi_bucket",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReduceError>;
