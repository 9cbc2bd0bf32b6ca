use crate::aggregate::ScoreIndex;
use crate::error::EnsembleError;
use phylotree::tree::Tree;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use itertools::Itertools;

/// Strip square-bracket annotations from Newick strings.
///
/// BEAST-flavored files carry annotations like `:[&rate=0.123]2.45` where
/// 2.45 is the actual branch length, and rooting markers like `[&R]`.
/// This removes the `[&...]` blocks while preserving everything else.
fn strip_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }

    result
}

/// Read a single phylogenetic tree from a file.
///
/// Plain files are parsed as Newick directly. Files starting with
/// `#NEXUS` have their first tree statement extracted, annotations
/// stripped, and leaf ids mapped through the TRANSLATE block when one is
/// present.
///
/// # Errors
/// `EnsembleError::TreeRead` when the file is unreadable, has no tree
/// statement, or fails Newick parsing. Callers recover by treating the
/// tree as contributing no subtrees.
pub fn read_tree_file(path: &Path) -> Result<Tree, EnsembleError> {
    let tree_read = |reason: String| EnsembleError::TreeRead {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| tree_read(e.to_string()))?;

    let (newick, translate) = if content.trim_start().to_ascii_uppercase().starts_with("#NEXUS") {
        let newick = first_tree_statement(&content)
            .ok_or_else(|| tree_read("no tree statement in NEXUS file".to_string()))?;
        (newick, parse_translate_block(&content))
    } else {
        (content.trim().to_string(), HashMap::new())
    };

    let newick = strip_annotations(&newick);
    let newick = newick.trim();

    // phylotree's parser panics on leaf-only newick (`a;`). A tree with
    // no internal clade has no non-trivial subtrees anyway, so surface
    // it as a read error and let the caller keep an empty row.
    if !newick.starts_with('(') {
        return Err(tree_read("no internal clades in newick".to_string()));
    }

    let mut tree = Tree::from_newick(newick).map_err(|e| tree_read(e.to_string()))?;

    if !translate.is_empty() {
        rename_leaf_nodes(&mut tree, &translate);
    }

    Ok(tree)
}

/// Extract the Newick body of the first `TREE name = ...;` statement.
///
/// Skips ahead to the tree statements before watching for `END;`, so
/// earlier blocks (Biopython emits a TAXA block, with its own `End;`,
/// ahead of the TREES block) don't cut the scan short.
fn first_tree_statement(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.to_ascii_uppercase().starts_with("TREE "))
        .take_while(|line| !line.to_ascii_uppercase().starts_with("END;"))
        .find_map(|line| {
            let mut parts = line.splitn(2, '=');
            let _header = parts.next()?;
            Some(parts.next()?.trim().to_string())
        })
}

/// Parse the TRANSLATE block mapping taxon ids to labels.
///
/// ```text
/// TRANSLATE
///     1 'P.falciparum.K1',
///     2 'P.vivax.Sal1',
/// ;
/// ```
fn parse_translate_block(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"))
        .skip(1)
        .take_while(|line| !line.trim().starts_with(';'))
        .filter_map(|line| {
            let line = line.trim().trim_end_matches(',');
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect()
}

fn rename_leaf_nodes(tree: &mut Tree, translate: &HashMap<String, String>) {
    for leaf_id in tree.get_leaves() {
        if let Ok(node) = tree.get_mut(&leaf_id) {
            let renamed = node.name.as_ref().and_then(|n| translate.get(n)).cloned();
            if let Some(label) = renamed {
                node.name = Some(label);
            }
        }
    }
}

/// Remove a prior run's artifacts from `dir`, creating it if needed.
/// Keep-file markers (`.gitkeep`, `file.gitkeep`) survive.
pub fn clear_artifacts(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "file.gitkeep" || name == ".gitkeep" {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Write the mined score index as TSV.
///
/// If `path` ends with `.gz`, the output is gzip-compressed. Rows are
/// ordered score-descending, then by representative id, so identical
/// results serialize identically. Seeded-but-empty score buckets produce
/// no rows.
pub fn write_score_report<P: AsRef<Path>>(
    path: P,
    global_maximum: i64,
    index: &ScoreIndex,
) -> io::Result<()> {
    let p = path.as_ref();
    let is_gz = p.to_string_lossy().ends_with(".gz");

    let mut out: Box<dyn Write> = if is_gz {
        let f = File::create(p)?;
        let enc = GzEncoder::new(f, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    writeln!(&mut out, "# global_maximum\t{global_maximum}")?;
    writeln!(&mut out, "score\trepresentative\tmatches")?;

    for (score, reps) in index
        .entries()
        .iter()
        .sorted_by_key(|(score, _)| std::cmp::Reverse(**score))
    {
        for (rep, matches) in reps.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            writeln!(&mut out, "{score}\t{rep}\t{}", matches.iter().join(","))?;
        }
    }

    out.flush()?;
    Ok(())
}
