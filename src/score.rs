//! Pairwise subtree similarity scoring.
//!
//! # Overview
//! Two subtrees are compared by their leaf labels (sequence identifiers).
//! The default metric counts, over the full cross product of the two sorted
//! label lists, every position pair with equal labels. For unique labels
//! this equals the size of the label intersection; when a label repeats
//! within one subtree the count is multiplicity-weighted:
//!
//! ```text
//! overlap = Σ_label  multiplicity_in_1(label) × multiplicity_in_2(label)
//! ```
//!
//! This multiplicative behavior is the historical contract of the pipeline
//! and is kept as the default. A true set-intersection variant is available
//! behind [`Metric::Intersection`] for callers that want distinct-label
//! counts instead.
//!
//! # Padding sentinel
//! Matrix cells are `Option<&Subtree>`; a `None` operand means the cell is
//! row padding, and [`Metric::grade`] returns [`NOT_COMPARABLE`]. The
//! sentinel must never reach a score index or a running maximum.

use crate::subtree::Subtree;
use std::collections::HashSet;

/// Sentinel returned when either operand is a padding cell.
pub const NOT_COMPARABLE: i64 = -1;

/// Which similarity metric to apply to a subtree pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Metric {
    /// Multiplicity-weighted label overlap (the historical default).
    #[default]
    Overlap,
    /// Distinct shared labels only.
    Intersection,
}

impl Metric {
    /// Score a pair of matrix cells.
    ///
    /// Returns [`NOT_COMPARABLE`] if either cell is padding, otherwise a
    /// non-negative overlap score.
    pub fn grade(self, a: Option<&Subtree>, b: Option<&Subtree>) -> i64 {
        match (a, b) {
            (Some(a), Some(b)) => match self {
                Metric::Overlap => overlap_grade(a, b),
                Metric::Intersection => intersection_grade(a, b),
            },
            _ => NOT_COMPARABLE,
        }
    }
}

/// Multiplicity-weighted overlap between two subtrees.
///
/// # Algorithm
/// Sort both label lists (for a deterministic evaluation order, not for an
/// early exit), then walk the full cross product and count equal pairs.
/// O(L1 × L2) with no short-circuit, by contract.
pub fn overlap_grade(a: &Subtree, b: &Subtree) -> i64 {
    let mut sorted1 = a.labels.clone();
    let mut sorted2 = b.labels.clone();
    sorted1.sort();
    sorted2.sort();

    let mut grade = 0i64;
    for x in &sorted1 {
        for y in &sorted2 {
            if x == y {
                grade += 1;
            }
        }
    }
    grade
}

/// Number of distinct labels present in both subtrees.
pub fn intersection_grade(a: &Subtree, b: &Subtree) -> i64 {
    let set1: HashSet<&str> = a.labels.iter().map(String::as_str).collect();
    let set2: HashSet<&str> = b.labels.iter().map(String::as_str).collect();
    set1.intersection(&set2).count() as i64
}
