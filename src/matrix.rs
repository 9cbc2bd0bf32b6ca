//! Ensemble subtree matrix: one row per source tree, padded rectangular.
//!
//! Rows come back ragged from extraction (different trees decompose into
//! different subtree counts), and the aggregator wants uniform quadratic
//! iteration, so every row is right-padded with `None` up to the longest
//! row. Padding cells are type-enforced placeholders: the scorer maps them
//! to its sentinel and they never reach the score index.

use crate::io::{clear_artifacts, read_tree_file};
use crate::subtree::{Subtree, extract_subtrees};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extensions recognized as tree-exchange files during directory scan.
const TREE_EXTENSIONS: [&str; 5] = ["nwk", "newick", "nexus", "nex", "tree"];

/// A rectangular matrix of subtree references, `max_rows × max_columns`.
#[derive(Debug, Clone, Default)]
pub struct SubtreeMatrix {
    rows: Vec<Vec<Option<Subtree>>>,
    max_columns: usize,
}

impl SubtreeMatrix {
    /// Build from ragged rows, right-padding each with `None` to the
    /// longest row's length. Rows are never truncated.
    pub fn from_rows(rows: Vec<Vec<Subtree>>) -> Self {
        let max_columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut padded: Vec<Option<Subtree>> = row.into_iter().map(Some).collect();
                padded.resize(max_columns, None);
                padded
            })
            .collect();
        SubtreeMatrix { rows, max_columns }
    }

    /// Number of source trees (rows).
    pub fn max_rows(&self) -> usize {
        self.rows.len()
    }

    /// Padded row width.
    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    /// The cell at `(row, column)`; `None` for padding and for
    /// out-of-range coordinates.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Subtree> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// True when there is nothing to mine: no rows, or rows that all
    /// decomposed to zero subtrees.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.max_columns == 0
    }

    /// Total number of real (non-padding) subtrees.
    pub fn subtree_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().flatten().count())
            .sum()
    }

    /// Artifact identifiers per row, padding skipped, for downstream
    /// inspection.
    pub fn artifact_ids(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().flatten().map(|s| s.id.clone()).collect())
            .collect()
    }
}

/// Scan `trees_dir`, decompose every tree into subtree artifacts under
/// `subtree_dir`, and assemble the padded matrix.
///
/// Prior artifacts in `subtree_dir` are cleared first (keep-file markers
/// survive). Files are processed in name order so row order is
/// reproducible. A tree that fails to parse or decompose contributes an
/// empty row and is reported to stderr; the run continues.
///
/// # Errors
/// Only directory-level I/O failures (unreadable `trees_dir`, uncreatable
/// `subtree_dir`) propagate.
pub fn build_matrix(trees_dir: &Path, subtree_dir: &Path) -> io::Result<SubtreeMatrix> {
    clear_artifacts(subtree_dir)?;

    let mut files: Vec<PathBuf> = fs::read_dir(trees_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_tree_file(path))
        .collect();
    files.sort();

    let mut rows: Vec<Vec<Subtree>> = Vec::with_capacity(files.len());
    for file in &files {
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tree")
            .to_string();

        let row = match read_tree_file(file) {
            Ok(tree) => match extract_subtrees(&tree, &stem, subtree_dir) {
                Ok(row) => row,
                Err(e) => {
                    eprintln!("failed to decompose {}: {e}", file.display());
                    Vec::new()
                }
            },
            Err(e) => {
                eprintln!("{e}");
                Vec::new()
            }
        };
        rows.push(row);
    }

    Ok(SubtreeMatrix::from_rows(rows))
}

/// Tree files only; keep-file markers and unrelated files are skipped.
fn is_tree_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name == "file.gitkeep" || name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TREE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn st(id: &str, labels: &[&str]) -> Subtree {
        Subtree::detached(id, labels.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn rows_are_padded_to_the_longest() {
        let matrix = SubtreeMatrix::from_rows(vec![
            vec![st("a1", &["a", "b"]), st("a2", &["c", "d"])],
            vec![st("b1", &["a", "b"])],
            vec![],
        ]);

        assert_eq!(matrix.max_rows(), 3);
        assert_eq!(matrix.max_columns(), 2);
        assert_eq!(matrix.subtree_count(), 3);

        // Trailing cells of short rows are placeholders.
        assert!(matrix.cell(1, 0).is_some());
        assert!(matrix.cell(1, 1).is_none());
        assert!(matrix.cell(2, 0).is_none());
        assert!(matrix.cell(2, 1).is_none());
    }

    #[test]
    fn no_rows_means_empty() {
        let matrix = SubtreeMatrix::from_rows(Vec::new());
        assert_eq!(matrix.max_rows(), 0);
        assert_eq!(matrix.max_columns(), 0);
        assert!(matrix.is_empty());
    }

    #[test]
    fn all_trivial_rows_mean_empty() {
        let matrix = SubtreeMatrix::from_rows(vec![Vec::new(), Vec::new()]);
        assert_eq!(matrix.max_rows(), 2);
        assert_eq!(matrix.max_columns(), 0);
        assert!(matrix.is_empty());
    }

    #[test]
    fn builds_from_a_directory_of_trees() {
        let trees = TempDir::new().unwrap();
        let subtrees = TempDir::new().unwrap();

        fs::write(trees.path().join("t1.nwk"), "((a:1,b:1)ab:1,c:1)r;\n").unwrap();
        fs::write(trees.path().join("t2.nwk"), "((a:1,b:1)ab:1,(d:1,e:1)de:1)r;\n").unwrap();
        // Reserved placeholder entries must be skipped.
        fs::write(trees.path().join("file.gitkeep"), "").unwrap();
        fs::write(trees.path().join(".gitkeep"), "").unwrap();

        let matrix = build_matrix(trees.path(), subtrees.path()).unwrap();

        // t1: {a,b,c} and {a,b}. t2: {a,b,d,e}, {a,b}, {d,e}.
        assert_eq!(matrix.max_rows(), 2);
        assert_eq!(matrix.max_columns(), 3);
        assert_eq!(matrix.subtree_count(), 5);

        let ids = matrix.artifact_ids();
        assert_eq!(ids[0], vec!["t1_r", "t1_ab"]);
        assert_eq!(ids[1], vec!["t2_r", "t2_ab", "t2_de"]);

        // Row for t1 was extended, never truncated.
        assert!(matrix.cell(0, 2).is_none());
    }

    #[test]
    fn unparseable_tree_contributes_an_empty_row() {
        let trees = TempDir::new().unwrap();
        let subtrees = TempDir::new().unwrap();

        fs::write(trees.path().join("bad.nwk"), "((a,b,not a tree").unwrap();
        fs::write(trees.path().join("good.nwk"), "((a:1,b:1)ab:1,c:1)r;\n").unwrap();

        let matrix = build_matrix(trees.path(), subtrees.path()).unwrap();
        assert_eq!(matrix.max_rows(), 2);
        // bad.nwk sorts first and is an all-padding row.
        assert!(matrix.cell(0, 0).is_none());
        assert!(matrix.cell(1, 0).is_some());
    }

    #[test]
    fn single_leaf_tree_file_contributes_an_empty_row() {
        let trees = TempDir::new().unwrap();
        let subtrees = TempDir::new().unwrap();

        fs::write(trees.path().join("a_lonely.nwk"), "a;\n").unwrap();
        fs::write(trees.path().join("b_good.nwk"), "((a:1,b:1)ab:1,c:1)r;\n").unwrap();

        // The leaf-only file must not abort the run.
        let matrix = build_matrix(trees.path(), subtrees.path()).unwrap();
        assert_eq!(matrix.max_rows(), 2);
        assert!(matrix.cell(0, 0).is_none());
        assert_eq!(matrix.cell(1, 0).map(|s| s.id.as_str()), Some("b_good_r"));
    }

    #[test]
    fn out_of_range_cells_read_as_padding() {
        let matrix = SubtreeMatrix::from_rows(vec![vec![st("a1", &["a", "b"])]]);
        assert!(matrix.cell(0, 0).is_some());
        assert!(matrix.cell(0, 5).is_none());
        assert!(matrix.cell(7, 0).is_none());
    }

    #[test]
    fn reruns_clear_prior_artifacts() {
        let trees = TempDir::new().unwrap();
        let subtrees = TempDir::new().unwrap();

        fs::write(subtrees.path().join("stale_old.nwk"), "(x,y);\n").unwrap();
        fs::write(subtrees.path().join("file.gitkeep"), "").unwrap();
        fs::write(trees.path().join("t1.nwk"), "((a:1,b:1)ab:1,c:1)r;\n").unwrap();

        build_matrix(trees.path(), subtrees.path()).unwrap();

        assert!(!subtrees.path().join("stale_old.nwk").exists());
        assert!(subtrees.path().join("file.gitkeep").exists());
        assert!(subtrees.path().join("t1_r.nwk").exists());
    }
}
