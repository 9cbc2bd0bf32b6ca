//! Subtree extraction: decompose one phylogenetic tree into artifacts.
//!
//! # Overview
//! Every clade of a source tree that covers more than one leaf is
//! materialized as an independent Newick artifact (the clade re-rooted,
//! descendants and branch lengths intact). Single-leaf clades carry no
//! topology and are skipped.
//!
//! # Ordering
//! Clades are visited in preorder depth-first from the root, so the same
//! input tree always yields the same artifact sequence. The root itself
//! qualifies (the whole tree is its own largest subtree).
//!
//! # Naming
//! Artifacts are named `{tree_stem}_{clade_name}.nwk`, falling back to
//! `{tree_stem}_node{id}` for unnamed internal clades. Names double as the
//! subtree's identity in the score index.

use crate::error::EnsembleError;
use phylotree::tree::{Tree as PhyloTree, TreeError};
use std::fs;
use std::path::{Path, PathBuf};

/// A materialized subtree: artifact identity, on-disk location, and the
/// leaf labels beneath its root clade (in discovery order).
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    /// Artifact identifier, `{tree_stem}_{clade_name}`.
    pub id: String,
    /// Where the Newick artifact was written.
    pub path: PathBuf,
    /// Leaf labels under the clade, discovery order.
    pub labels: Vec<String>,
}

impl Subtree {
    /// A subtree that exists only in memory (no artifact on disk).
    ///
    /// Used by tests and by callers that assemble matrices from
    /// already-known label sets.
    pub fn detached(id: &str, labels: Vec<String>) -> Self {
        Subtree {
            id: id.to_string(),
            path: PathBuf::new(),
            labels,
        }
    }
}

/// Decompose `tree` into subtree artifacts under `out_dir`.
///
/// Returns one [`Subtree`] per clade with ≥ 2 leaf descendants, in
/// preorder. A failed artifact write drops that subtree from the row
/// (logged to stderr); the rest of the row is still produced.
///
/// # Errors
/// Returns `TreeError` only when the tree itself is malformed (no root,
/// dangling node ids); per-artifact I/O failures are recovered locally.
pub fn extract_subtrees(
    tree: &PhyloTree,
    tree_stem: &str,
    out_dir: &Path,
) -> Result<Vec<Subtree>, TreeError> {
    let root_id = tree.get_root()?;
    let mut clades = Vec::new();
    collect_preorder(tree, root_id, &mut clades)?;

    let mut row = Vec::new();
    for node_id in clades {
        let labels = leaf_labels(tree, node_id)?;
        if labels.len() <= 1 {
            continue;
        }

        let clade_name = match &tree.get(&node_id)?.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("node{node_id}"),
        };
        let id = format!("{tree_stem}_{clade_name}");
        let path = out_dir.join(format!("{id}.nwk"));

        let newick = clade_newick(tree, node_id)?;
        match fs::write(&path, format!("{newick};\n")) {
            Ok(()) => row.push(Subtree { id, path, labels }),
            Err(source) => {
                let err = EnsembleError::ArtifactWrite { path, source };
                eprintln!("{err}");
            }
        }
    }

    Ok(row)
}

fn collect_preorder(
    tree: &PhyloTree,
    node_id: usize,
    out: &mut Vec<usize>,
) -> Result<(), TreeError> {
    out.push(node_id);
    for &child_id in &tree.get(&node_id)?.children {
        collect_preorder(tree, child_id, out)?;
    }
    Ok(())
}

fn leaf_labels(tree: &PhyloTree, node_id: usize) -> Result<Vec<String>, TreeError> {
    let node = tree.get(&node_id)?;
    if node.children.is_empty() {
        return Ok(vec![node.name.clone().unwrap_or_default()]);
    }
    let mut labels = Vec::new();
    for &child_id in &node.children {
        labels.extend(leaf_labels(tree, child_id)?);
    }
    Ok(labels)
}

/// Serialize the clade rooted at `node_id` as a Newick fragment
/// (no trailing `;`). The subtree root carries no branch length since it
/// is re-rooted; edges below it keep their lengths.
fn clade_newick(tree: &PhyloTree, node_id: usize) -> Result<String, TreeError> {
    let node = tree.get(&node_id)?;
    if node.children.is_empty() {
        return Ok(node.name.clone().unwrap_or_default());
    }

    let mut parts = Vec::with_capacity(node.children.len());
    for &child_id in &node.children {
        let mut rendered = clade_newick(tree, child_id)?;
        if let Some(length) = tree.get(&child_id)?.parent_edge {
            rendered.push_str(&format!(":{length}"));
        }
        parts.push(rendered);
    }

    let label = node.name.clone().unwrap_or_default();
    Ok(format!("({}){label}", parts.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extracts_one_subtree_per_multi_leaf_clade() {
        let tree = PhyloTree::from_newick("((a:0.1,b:0.1)ab:0.2,c:0.3)r;").unwrap();
        let dir = TempDir::new().unwrap();

        let row = extract_subtrees(&tree, "tree1", dir.path()).unwrap();

        // Preorder: root {a,b,c} first, then the {a,b} clade. The three
        // leaves themselves yield nothing.
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].id, "tree1_r");
        assert_eq!(row[0].labels, vec!["a", "b", "c"]);
        assert_eq!(row[1].id, "tree1_ab");
        assert_eq!(row[1].labels, vec!["a", "b"]);

        for subtree in &row {
            assert!(subtree.path.exists());
        }
    }

    #[test]
    fn unwritable_artifacts_are_dropped_from_the_row() {
        let tree = PhyloTree::from_newick("((a:1,b:1)ab:1,c:1)r;").unwrap();
        let dir = TempDir::new().unwrap();
        // Nonexistent output directory: every artifact write fails.
        let missing = dir.path().join("missing");

        // Extraction still succeeds; the failed subtrees just drop out
        // and the row shrinks.
        let row = extract_subtrees(&tree, "t", &missing).unwrap();
        assert!(row.is_empty());
    }

    #[test]
    fn artifacts_reparse_to_the_same_leaf_set() {
        let tree = PhyloTree::from_newick("(((a:1,b:1)ab:1,c:1)abc:1,(d:1,e:1)de:1)r;").unwrap();
        let dir = TempDir::new().unwrap();

        let row = extract_subtrees(&tree, "t", dir.path()).unwrap();
        // r, abc, ab, de
        assert_eq!(row.len(), 4);

        for subtree in &row {
            let written = fs::read_to_string(&subtree.path).unwrap();
            let reparsed = PhyloTree::from_newick(written.trim()).unwrap();
            let mut names: Vec<String> = reparsed
                .get_leaves()
                .iter()
                .map(|id| reparsed.get(id).unwrap().name.clone().unwrap_or_default())
                .collect();
            names.sort();
            let mut expected = subtree.labels.clone();
            expected.sort();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn unnamed_clades_fall_back_to_node_ids() {
        let tree = PhyloTree::from_newick("((a,b),c);").unwrap();
        let dir = TempDir::new().unwrap();
        let row = extract_subtrees(&tree, "t", dir.path()).unwrap();
        assert_eq!(row.len(), 2);
        for subtree in &row {
            assert!(subtree.id.starts_with("t_node"), "id: {}", subtree.id);
        }
    }

}
