//! Bounded top-K merge of per-shard suggestion candidate lists
//!
//! Each shard returns its local top candidates already sorted best-first.
//! The coordinator combines them into one global top-K with a min-heap of
//! fixed capacity: every incoming candidate is pushed, and once the heap
//! exceeds capacity the current worst is evicted. Because each shard list is
//! pre-sorted under the same comparator, a shard can be abandoned as soon as
//! one of its candidates fails to beat the current minimum.
//!
//! Precondition: shard lists must be sorted under [`Candidate::rank_cmp`].
//! A list sorted under any other comparator makes the early exit drop valid
//! candidates. This is checked with a debug assertion only.

use crate::error::{ReduceError, Result};
use crate::types::{Candidate, CandidateList};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::debug;

/// Heap entry ordered by rank, so `Reverse<HeapEntry>` in a `BinaryHeap`
/// keeps the worst surviving candidate on top.
struct HeapEntry(Candidate);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Merge already-sorted candidate lists into the global top `capacity`.
///
/// - Empty input is an error: the caller is expected to have collected at
///   least one shard response before reducing.
/// - A single list is returned as-is (truncated to `capacity` if the shard
///   overshot), skipping the heap entirely.
/// - Output is sorted best-first under [`Candidate::rank_cmp`] and is
///   identical for any permutation of the input lists.
pub fn merge_candidate_lists(
    lists: Vec<CandidateList>,
    capacity: usize,
) -> Result<CandidateList> {
    let Some(first) = lists.first() else {
        return Err(ReduceError::EmptyInput);
    };
    let name = first.name.clone();

    if lists.len() == 1 {
        let mut list = lists.into_iter().next().unwrap();
        list.candidates.truncate(capacity);
        return Ok(list);
    }

    let list_count = lists.len();
    let total: usize = lists.iter().map(|l| l.candidates.len()).sum();

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(capacity + 1);
    for list in lists {
        debug_assert!(list.is_sorted(), "shard candidate list must be pre-sorted");
        for candidate in list.candidates {
            if heap.len() == capacity {
                match heap.peek() {
                    Some(Reverse(worst)) if candidate.rank_cmp(&worst.0) == Ordering::Greater => {}
                    // Not better than the current minimum. The list is
                    // sorted, so no later candidate from this shard can be
                    // better either.
                    _ => break,
                }
            }
            heap.push(Reverse(HeapEntry(candidate)));
            if heap.len() > capacity {
                heap.pop();
            }
        }
    }

    // Pop ascending, then reverse into final best-first order
    let mut candidates: Vec<Candidate> = Vec::with_capacity(heap.len());
    while let Some(Reverse(entry)) = heap.pop() {
        candidates.push(entry.0);
    }
    candidates.reverse();

    debug!(
        suggestion = %name,
        lists = list_count,
        candidates = total,
        survivors = candidates.len(),
        "merged shard candidate lists"
    );

    Ok(CandidateList {
        name,
        capacity,
        candidates,
    })
}
