//! Frequency aggregation: exhaustive cross-tree pair mining.
//!
//! # Overview
//! Every cell of the subtree matrix is compared against every cell of
//! every *other* row (`i ≠ k`; subtrees never compete with their own
//! source tree). Scores ≥ 1 land in the [`ScoreIndex`] keyed by score and
//! then by the representative subtree's identifier, and the best score
//! seen so far is tracked as the global maximum.
//!
//! Both pair directions are evaluated and recorded independently: the
//! loop only excludes `i == k`, so a matching pair appears once under each
//! subtree as the representative. That is deliberate, lookups by either
//! side must succeed; do not collapse this into a triangular sweep.
//!
//! # Cost
//! O(max_rows² × max_columns²) scorer calls. Exhaustive by design. The
//! parallel variant splits the outer row axis across rayon workers with
//! private partial indexes merged at the end; it produces the same scores
//! and the same value multisets, but the order within a match list is not
//! the sequential reference order.

use crate::matrix::SubtreeMatrix;
use crate::score::{Metric, NOT_COMPARABLE};
use rayon::prelude::*;
use std::collections::HashMap;

/// score → representative subtree id → matching subtree ids.
///
/// Duplicate matches are kept (a pair scoring the same against one
/// representative twice appends twice); only scores ≥ 1 are ever
/// recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreIndex {
    entries: HashMap<i64, HashMap<String, Vec<String>>>,
}

impl ScoreIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed empty buckets for scores `1..=max_columns`, the seeding
    /// scheme of the originating pipeline. Equivalent to [`Self::new`]
    /// for lookup purposes; seeded buckets just also appear (empty) when
    /// iterating.
    pub fn seeded(max_columns: usize) -> Self {
        let mut entries = HashMap::with_capacity(max_columns);
        for score in 1..=max_columns as i64 {
            entries.insert(score, HashMap::new());
        }
        ScoreIndex { entries }
    }

    /// Append `matched` under `(score, representative)`. Existing lists
    /// grow, they are never replaced.
    pub fn record(&mut self, score: i64, representative: &str, matched: &str) {
        self.entries
            .entry(score)
            .or_default()
            .entry(representative.to_string())
            .or_default()
            .push(matched.to_string());
    }

    /// Concatenate another (partial) index into this one.
    pub fn merge(&mut self, other: ScoreIndex) {
        for (score, reps) in other.entries {
            let bucket = self.entries.entry(score).or_default();
            for (rep, mut matches) in reps {
                bucket.entry(rep).or_default().append(&mut matches);
            }
        }
    }

    /// The match list recorded under `(score, representative)`, if any.
    pub fn matches(&self, score: i64, representative: &str) -> Option<&[String]> {
        self.entries
            .get(&score)
            .and_then(|reps| reps.get(representative))
            .map(Vec::as_slice)
    }

    /// Full view of the index, for reporting.
    pub fn entries(&self) -> &HashMap<i64, HashMap<String, Vec<String>>> {
        &self.entries
    }

    /// Total number of recorded (representative, match) pairs.
    pub fn recorded_pairs(&self) -> usize {
        self.entries
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }
}

/// Mine the whole matrix sequentially.
///
/// This is the reference order: rows in index order, every `(j, k, l)`
/// combination in loop order. Returns the global maximum score and the
/// populated index. An empty matrix short-circuits to `(0, index)`.
pub fn compare_subtrees(
    matrix: &SubtreeMatrix,
    metric: Metric,
    mut index: ScoreIndex,
) -> (i64, ScoreIndex) {
    if matrix.is_empty() {
        return (0, index);
    }

    let mut max_score = 0i64;
    for i in 0..matrix.max_rows() {
        let row_max = scan_row(matrix, metric, i, &mut index);
        if row_max > max_score {
            max_score = row_max;
        }
    }
    (max_score, index)
}

/// Mine the matrix with the outer row axis split across rayon workers.
///
/// Each worker owns a disjoint set of representative rows and a private
/// partial index; partials merge by list concatenation. Same maximum and
/// value multisets as [`compare_subtrees`].
pub fn compare_subtrees_parallel(
    matrix: &SubtreeMatrix,
    metric: Metric,
    index: ScoreIndex,
) -> (i64, ScoreIndex) {
    if matrix.is_empty() {
        return (0, index);
    }

    let (max_score, partial) = (0..matrix.max_rows())
        .into_par_iter()
        .map(|i| {
            let mut local = ScoreIndex::new();
            let local_max = scan_row(matrix, metric, i, &mut local);
            (local_max, local)
        })
        .reduce(
            || (0, ScoreIndex::new()),
            |(max_a, mut index_a), (max_b, index_b)| {
                index_a.merge(index_b);
                (max_a.max(max_b), index_a)
            },
        );

    let mut index = index;
    index.merge(partial);
    (max_score, index)
}

/// Compare every cell of row `i` against every cell of every other row,
/// recording into `index`. Returns the best score seen.
fn scan_row(matrix: &SubtreeMatrix, metric: Metric, i: usize, index: &mut ScoreIndex) -> i64 {
    let mut max_score = 0i64;
    for j in 0..matrix.max_columns() {
        for k in 0..matrix.max_rows() {
            if i == k {
                continue;
            }
            for l in 0..matrix.max_columns() {
                let representative = matrix.cell(i, j);
                let candidate = matrix.cell(k, l);

                let grade = metric.grade(representative, candidate);
                if grade == NOT_COMPARABLE {
                    continue;
                }
                if grade > max_score {
                    max_score = grade;
                }
                if grade >= 1 {
                    // Both cells are real subtrees here; padding was
                    // caught by the sentinel.
                    if let (Some(rep), Some(matched)) = (representative, candidate) {
                        index.record(grade, &rep.id, &matched.id);
                    }
                }
            }
        }
    }
    max_score
}
