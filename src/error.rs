//! Error kinds for the mining pipeline.
//!
//! None of these abort a run: an unreadable tree contributes an empty
//! matrix row, an unwritable artifact is dropped from its row, and an
//! empty ensemble short-circuits to an empty result. The caller decides
//! whether an empty ensemble is worth retrying upstream.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    /// A source tree file could not be read or parsed.
    #[error("failed to read tree {}: {reason}", path.display())]
    TreeRead { path: PathBuf, reason: String },

    /// A subtree artifact could not be written to the output directory.
    #[error("failed to write subtree artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No usable trees (or no non-trivial subtrees) in the whole ensemble.
    #[error("no usable trees in the ensemble")]
    EmptyEnsemble,
}
