//! Gap policy: what to do when a bucket is missing an input value
//!
//! A gap is a data-level condition (the metric produced no value, or NaN),
//! as opposed to a schema-level condition (the path names an aggregation
//! that does not exist), which is always an error.

use crate::error::{ReduceError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configured handling for missing or NaN bucket values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Substitute 0.0 for missing values
    InsertZeros,
    /// Leave the affected bucket out of the derived computation
    Skip,
}

impl Default for GapPolicy {
    fn default() -> Self {
        GapPolicy::Skip
    }
}

impl GapPolicy {
    /// Policy name as it appears in request syntax
    pub fn name(&self) -> &'static str {
        match self {
            GapPolicy::InsertZeros => "insert_zeros",
            GapPolicy::Skip => "skip",
        }
    }

    /// Decide how a resolved (or absent) value enters the computation.
    ///
    /// Finite and infinite values are "present"; only absence and NaN are
    /// gaps.
    pub fn decide(&self, raw: Option<f64>) -> GapPolicyDecision {
        match raw {
            Some(v) if !v.is_nan() => GapPolicyDecision::UseValue(v),
            _ => match self {
                GapPolicy::InsertZeros => GapPolicyDecision::InsertZero,
                GapPolicy::Skip => GapPolicyDecision::Skip,
            },
        }
    }
}

impl FromStr for GapPolicy {
    type Err = ReduceError;

    /// Parse a configured policy name. Unknown names fail here, at
    /// aggregation build time, never per bucket.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert_zeros" => Ok(GapPolicy::InsertZeros),
            "skip" => Ok(GapPolicy::Skip),
            other => Err(ReduceError::InvalidGapPolicy(other.to_string())),
        }
    }
}

/// Outcome of applying a gap policy to one resolved value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapPolicyDecision {
    UseValue(f64),
    InsertZero,
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_value_always_used() {
        for policy in [GapPolicy::InsertZeros, GapPolicy::Skip] {
            assert_eq!(policy.decide(Some(42.5)), GapPolicyDecision::UseValue(42.5));
            assert_eq!(
                policy.decide(Some(f64::INFINITY)),
                GapPolicyDecision::UseValue(f64::INFINITY)
            );
        }
    }

    #[test]
    fn test_insert_zeros_on_gap() {
        assert_eq!(
            GapPolicy::InsertZeros.decide(None),
            GapPolicyDecision::InsertZero
        );
        assert_eq!(
            GapPolicy::InsertZeros.decide(Some(f64::NAN)),
            GapPolicyDecision::InsertZero
        );
    }

    #[test]
    fn test_skip_on_gap() {
        assert_eq!(GapPolicy::Skip.decide(None), GapPolicyDecision::Skip);
        assert_eq!(
            GapPolicy::Skip.decide(Some(f64::NAN)),
            GapPolicyDecision::Skip
        );
    }

    #[test]
    fn test_parse_known_policies() {
        assert_eq!("insert_zeros".parse::<GapPolicy>(), Ok(GapPolicy::InsertZeros));
        assert_eq!("skip".parse::<GapPolicy>(), Ok(GapPolicy::Skip));
    }

    #[test]
    fn test_parse_unknown_policy_fails() {
        let err = "ignore".parse::<GapPolicy>().unwrap_err();
        assert_eq!(err, ReduceError::InvalidGapPolicy("ignore".to_string()));
    }
}
