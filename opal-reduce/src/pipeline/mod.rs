//! Pipeline stage: derived per-bucket metrics
//!
//! After shard-level aggregation results have been combined, a bucket-script
//! transform computes one derived value per bucket from named inputs located
//! via buckets paths, and attaches it as an extra sub-aggregation. Gaps in
//! the input data are handled by the configured [`GapPolicy`].
//!
//! ```text
//! AggregationResult → per bucket: resolve paths → gap policy → evaluate → new bucket
//! ```
//!
//! The evaluator itself (script compilation, caching) is an external
//! concern; this module only defines the [`BucketScript`] seam.

mod gap;
mod resolver;

pub use gap::{GapPolicy, GapPolicyDecision};
pub use resolver::{resolve_bucket_value, COUNT_PATH};

use crate::error::{ReduceError, Result};
use crate::types::{AggregationResult, AggregationValue, Bucket, BucketsPathMap};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// External evaluator invoked once per eligible bucket.
///
/// Must be pure with respect to the bucket it is invoked for: `None` means
/// "no value for this bucket" and passes the bucket through unchanged. A
/// non-numeric `Value` is a contract violation and fails the reduction.
pub trait BucketScript {
    fn evaluate(&self, vars: &BTreeMap<String, f64>) -> Option<Value>;
}

impl<F> BucketScript for F
where
    F: Fn(&BTreeMap<String, f64>) -> Option<Value>,
{
    fn evaluate(&self, vars: &BTreeMap<String, f64>) -> Option<Value> {
        self(vars)
    }
}

/// Bucket-script transform configuration, built once at
/// aggregation-definition time.
#[derive(Debug, Clone)]
pub struct BucketScriptTransform {
    /// Name of the derived metric attached to each bucket
    name: String,
    /// Variable name → dotted path into each bucket's sub-aggregations
    paths: BucketsPathMap,
    policy: GapPolicy,
}

impl BucketScriptTransform {
    pub fn new(name: impl Into<String>, paths: BucketsPathMap, policy: GapPolicy) -> Self {
        Self {
            name: name.into(),
            paths,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the transform to every bucket of `agg`, in original order.
    ///
    /// Buckets are replaced, never mutated: the result is a new
    /// `AggregationResult` with the same name and bucket order, where each
    /// eligible bucket gained one `Single` sub-aggregation named after the
    /// transform. Under `skip` gap policy, a bucket missing any input is
    /// passed through whole and unchanged rather than omitted.
    pub fn transform(
        &self,
        agg: &AggregationResult,
        script: &dyn BucketScript,
    ) -> Result<AggregationResult> {
        let AggregationValue::Buckets(buckets) = &agg.value else {
            return Err(ReduceError::NotMultiBucket {
                aggregation: agg.name.clone(),
            });
        };

        debug!(
            aggregation = %agg.name,
            transform = %self.name,
            buckets = buckets.len(),
            policy = self.policy.name(),
            "applying bucket script"
        );

        let mut new_buckets = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            match self.transform_bucket(&agg.name, bucket, script)? {
                Some(new_bucket) => new_buckets.push(new_bucket),
                None => new_buckets.push(bucket.clone()),
            }
        }

        Ok(AggregationResult::buckets(agg.name.clone(), new_buckets))
    }

    /// Returns `Ok(None)` when the bucket passes through unchanged: a
    /// whole-bucket skip under `skip` policy, or the script declining to
    /// produce a value.
    fn transform_bucket(
        &self,
        aggregation: &str,
        bucket: &Bucket,
        script: &dyn BucketScript,
    ) -> Result<Option<Bucket>> {
        let mut vars: BTreeMap<String, f64> = BTreeMap::new();
        for (var_name, path) in &self.paths {
            match resolve_bucket_value(aggregation, bucket, path, self.policy)? {
                GapPolicyDecision::UseValue(v) => {
                    vars.insert(var_name.clone(), v);
                }
                GapPolicyDecision::InsertZero => {
                    vars.insert(var_name.clone(), 0.0);
                }
                GapPolicyDecision::Skip => return Ok(None),
            }
        }

        let Some(returned) = script.evaluate(&vars) else {
            return Ok(None);
        };
        let Some(value) = returned.as_f64() else {
            return Err(ReduceError::NonNumericScriptResult {
                aggregation: self.name.clone(),
            });
        };

        let mut sub_aggs = bucket.sub_aggs.clone();
        sub_aggs.push(AggregationResult::single(self.name.clone(), value));
        Ok(Some(Bucket {
            key: bucket.key.clone(),
            doc_count: bucket.doc_count,
            sub_aggs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_paths(entries: &[(&str, &str)]) -> BucketsPathMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn make_sales_bucket(key: &str, sales: f64, costs: f64) -> Bucket {
        Bucket::with_sub_aggs(
            key,
            10,
            vec![
                AggregationResult::single("sales", sales),
                AggregationResult::single("costs", costs),
            ],
        )
    }

    fn profit_script(vars: &BTreeMap<String, f64>) -> Option<Value> {
        Some(json!(vars["s"] - vars["c"]))
    }

    fn derived_value(bucket: &Bucket, name: &str) -> Option<f64> {
        bucket.sub_agg(name).and_then(|a| match a.value {
            AggregationValue::Single(v) => Some(v),
            _ => None,
        })
    }

    #[test]
    fn test_transform_attaches_derived_metric() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales"), ("c", "costs")]),
            GapPolicy::Skip,
        );
        let agg = AggregationResult::buckets(
            "by_category",
            vec![
                make_sales_bucket("a", 100.0, 40.0),
                make_sales_bucket("b", 10.0, 2.5),
            ],
        );

        let reduced = transform.transform(&agg, &profit_script).unwrap();
        let AggregationValue::Buckets(buckets) = &reduced.value else {
            panic!("expected buckets");
        };
        assert_eq!(buckets.len(), 2);
        assert_eq!(derived_value(&buckets[0], "profit"), Some(60.0));
        assert_eq!(derived_value(&buckets[1], "profit"), Some(7.5));
        // Identity preserved
        assert_eq!(buckets[0].key, json!("a"));
        assert_eq!(buckets[0].doc_count, 10);
    }

    #[test]
    fn test_skip_policy_passes_gapped_bucket_through_unchanged() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales"), ("c", "costs")]),
            GapPolicy::Skip,
        );
        let gapped = make_sales_bucket("a", 100.0, f64::NAN);
        let agg = AggregationResult::buckets("by_category", vec![gapped.clone()]);

        let reduced = transform.transform(&agg, &profit_script).unwrap();
        let AggregationValue::Buckets(buckets) = &reduced.value else {
            panic!("expected buckets");
        };
        // Whole-bucket pass-through: still present, no derived metric
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0], gapped);
        assert_eq!(derived_value(&buckets[0], "profit"), None);
    }

    #[test]
    fn test_insert_zeros_policy_substitutes_zero() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales"), ("c", "costs")]),
            GapPolicy::InsertZeros,
        );
        let agg =
            AggregationResult::buckets("by_category", vec![make_sales_bucket("a", 100.0, f64::NAN)]);

        let reduced = transform.transform(&agg, &profit_script).unwrap();
        let AggregationValue::Buckets(buckets) = &reduced.value else {
            panic!("expected buckets");
        };
        // evaluate(s=100, c=0) = 100
        assert_eq!(derived_value(&buckets[0], "profit"), Some(100.0));
    }

    #[test]
    fn test_script_returning_none_passes_bucket_through() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales")]),
            GapPolicy::Skip,
        );
        let bucket = make_sales_bucket("a", 100.0, 40.0);
        let agg = AggregationResult::buckets("by_category", vec![bucket.clone()]);

        let none_script = |_: &BTreeMap<String, f64>| -> Option<Value> { None };
        let reduced = transform.transform(&agg, &none_script).unwrap();
        let AggregationValue::Buckets(buckets) = &reduced.value else {
            panic!("expected buckets");
        };
        assert_eq!(buckets[0], bucket);
    }

    #[test]
    fn test_non_numeric_script_result_fails_naming_the_transform() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales")]),
            GapPolicy::Skip,
        );
        let agg =
            AggregationResult::buckets("by_category", vec![make_sales_bucket("a", 100.0, 40.0)]);

        let bad_script = |_: &BTreeMap<String, f64>| -> Option<Value> { Some(json!("oops")) };
        let err = transform.transform(&agg, &bad_script).unwrap_err();
        assert_eq!(
            err,
            ReduceError::NonNumericScriptResult {
                aggregation: "profit".to_string(),
            }
        );
    }

    #[test]
    fn test_unresolvable_path_fails_even_under_skip_policy() {
        let transform = BucketScriptTransform::new(
            "profit",
            make_paths(&[("s", "sales"), ("m", "margin")]),
            GapPolicy::Skip,
        );
        let agg =
            AggregationResult::buckets("by_category", vec![make_sales_bucket("a", 100.0, 40.0)]);

        let err = transform.transform(&agg, &profit_script).unwrap_err();
        match err {
            ReduceError::UnresolvableAggregationPath { component, .. } => {
                assert_eq!(component, "margin");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_single_value_aggregation_is_not_multi_bucket() {
        let transform =
            BucketScriptTransform::new("profit", make_paths(&[("s", "sales")]), GapPolicy::Skip);
        let agg = AggregationResult::single("total", 5.0);

        let err = transform.transform(&agg, &profit_script).unwrap_err();
        assert_eq!(
            err,
            ReduceError::NotMultiBucket {
                aggregation: "total".to_string(),
            }
        );
    }

    #[test]
    fn test_bucket_order_preserved() {
        let transform =
            BucketScriptTransform::new("double_count", make_paths(&[("n", "_count")]), GapPolicy::Skip);
        let agg = AggregationResult::buckets(
            "by_category",
            vec![Bucket::new("z", 1), Bucket::new("a", 2), Bucket::new("m", 3)],
        );

        let script = |vars: &BTreeMap<String, f64>| -> Option<Value> { Some(json!(vars["n"] * 2.0)) };
        let reduced = transform.transform(&agg, &script).unwrap();
        let AggregationValue::Buckets(buckets) = &reduced.value else {
            panic!("expected buckets");
        };
        let keys: Vec<_> = buckets.iter().map(|b| b.key.clone()).collect();
        assert_eq!(keys, vec![json!("z"), json!("a"), json!("m")]);
        assert_eq!(derived_value(&buckets[2], "double_count"), Some(6.0));
    }
}
