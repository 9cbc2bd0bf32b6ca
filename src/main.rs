use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use subtree_freq::aggregate::{ScoreIndex, compare_subtrees, compare_subtrees_parallel};
use subtree_freq::error::EnsembleError;
use subtree_freq::io::write_score_report;
use subtree_freq::matrix::build_matrix;
use subtree_freq::score::Metric;

/// Decompose an ensemble of phylogenetic trees into subtrees, score every
/// cross-tree subtree pair by shared-leaf overlap, and write the mined
/// frequency index as a labeled TSV report.
#[derive(Parser, Debug)]
#[command(name = "subtree-freq", version, about = "Cross-tree subtree frequency mining")]
struct Args {
    /// Directory of source trees, one tree per file (.nwk/.newick/.nexus/.nex/.tree)
    #[arg(short = 'i', long = "trees")]
    trees: PathBuf,

    /// Directory for materialized subtree artifacts (cleared at start of run)
    #[arg(short = 's', long = "subtrees")]
    subtrees: PathBuf,

    /// Output path for the TSV score report (gzip-compressed if it ends in .gz)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Similarity metric to apply: overlap | intersection
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Overlap)]
    metric: MetricArg,

    /// Split the comparison loop across worker threads
    #[arg(long = "parallel", default_value_t = false)]
    parallel: bool,

    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg {
    Overlap,
    Intersection,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Overlap => Metric::Overlap,
            MetricArg::Intersection => Metric::Intersection,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Decompose every tree into subtree artifacts and assemble the matrix
    let t0 = Instant::now();
    let matrix = match build_matrix(&args.trees, &args.subtrees) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to scan {:?}: {e}", args.trees);
            std::process::exit(3);
        }
    };
    if matrix.is_empty() {
        eprintln!("{}", EnsembleError::EmptyEnsemble);
        std::process::exit(2);
    }
    let build_s = t0.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Decomposing trees {build_s:.3}s"));
    log_if(
        !args.quiet,
        format!(
            "Built {}x{} matrix holding {} subtrees",
            matrix.max_rows(),
            matrix.max_columns(),
            matrix.subtree_count()
        ),
    );

    // Mine all cross-tree pairs
    let t1 = Instant::now();
    let metric = Metric::from(args.metric);
    let index = ScoreIndex::seeded(matrix.max_columns());
    let (max_score, index) = if args.parallel {
        compare_subtrees_parallel(&matrix, metric, index)
    } else {
        compare_subtrees(&matrix, metric, index)
    };
    let mine_s = t1.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Comparing subtrees {mine_s:.3}s"));
    log_if(
        !args.quiet,
        format!(
            "Global maximum {max_score} over {} recorded pairs",
            index.recorded_pairs()
        ),
    );

    let t2 = Instant::now();
    if let Err(e) = write_score_report(&args.output, max_score, &index) {
        eprintln!("Failed to write output {:?}: {e}", args.output);
        std::process::exit(4);
    }
    let write_s = t2.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Writing to output {write_s:.3}s"));
}

fn log_if(show: bool, msg: String) {
    if show {
        println!("{}", msg);
    }
}
