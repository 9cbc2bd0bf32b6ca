//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `subtree`: decomposing one phylogenetic tree into subtree artifacts.
//! - `matrix`: padded rectangular ensemble matrix of subtree references.
//! - `score`: pairwise leaf-label overlap scoring (+ intersection variant).
//! - `aggregate`: exhaustive cross-tree mining into a score index,
//!   sequential reference loop and rayon-parallel equivalent.
//! - `io`: reading Newick/NEXUS tree files, clearing prior artifacts,
//!   writing the score report.
//! - `error`: recoverable error kinds.

pub mod aggregate;
pub mod error;
pub mod io;
pub mod matrix;
pub mod score;
pub mod subtree;

// Re-export frequently used types & functions
pub use aggregate::{ScoreIndex, compare_subtrees, compare_subtrees_parallel};
pub use error::EnsembleError;
pub use matrix::{SubtreeMatrix, build_matrix};
pub use score::{Metric, NOT_COMPARABLE};
pub use subtree::{Subtree, extract_subtrees};
