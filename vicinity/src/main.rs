use anyhow::{Context, Result};
use clap::Parser;
use dump_vicinity::{
    CancelToken, DEFAULT_ATOM_COUNT_LINE, DEFAULT_HEADER_LINES, DEFAULT_THRESHOLD,
    DEFAULT_TIMESTEP_LIMIT, DumpFormat, NeighborSearch, VicinityConfig, run,
};
use log::warn;
use std::path::PathBuf;

/// Extracts a range of timesteps from a LAMMPS dump, keeps anchor atoms and
/// the candidate atoms near them, renumbers and merges the result.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input dump file
    input: PathBuf,

    /// Merged output dump file
    #[arg(short, long, default_value = "merged_output.dump")]
    output: PathBuf,

    /// First timestep to extract (1-based marker count)
    #[arg(short, long)]
    start: usize,

    /// Last timestep to extract, inclusive
    #[arg(short, long)]
    end: usize,

    /// Number of atom lines per timestep
    #[arg(short, long)]
    atoms: usize,

    /// Candidates closer than this to an anchor are kept
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Stop scanning after this many timesteps
    #[arg(long, default_value_t = DEFAULT_TIMESTEP_LIMIT)]
    limit: usize,

    /// Header lines per timestep
    #[arg(long, default_value_t = DEFAULT_HEADER_LINES)]
    header_lines: usize,

    /// 0-based header line holding the atom count
    #[arg(long, default_value_t = DEFAULT_ATOM_COUNT_LINE)]
    count_line: usize,

    /// Anchor atom types "<type 1>,<type 2>,...", ex. "N,C"
    #[arg(long, value_delimiter = ',', default_value = "N,C")]
    anchors: Vec<String>,

    /// Candidate atom types, ex. "O,H"
    #[arg(long, value_delimiter = ',', default_value = "O,H")]
    candidates: Vec<String>,

    /// Also write every timestep to its own file in this directory
    #[arg(long)]
    intermediate_dir: Option<PathBuf>,

    /// Look up anchors through a kd-tree
    #[arg(long)]
    kd_tree: bool,

    /// Number of threads to run in parallel
    #[arg(short, long, default_value_t = 1)]
    threads: usize,
}

impl Cli {
    fn into_config(self) -> VicinityConfig {
        VicinityConfig {
            intermediate_dir: self.intermediate_dir,
            timestep_limit: self.limit,
            threshold: self.threshold,
            format: DumpFormat::new(self.header_lines, self.count_line),
            anchors: self.anchors,
            candidates: self.candidates,
            search: if self.kd_tree {
                NeighborSearch::KdTree
            } else {
                NeighborSearch::Linear
            },
            threads: self.threads,
            ..VicinityConfig::new(self.input, self.output, self.start, self.end, self.atoms)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Cli::parse().into_config();
    let report = run(&config, &CancelToken::new())
        .with_context(|| format!("Processing {}", config.input.display()))?;
    for failure in &report.failures {
        warn!(
            "skipped timestep {} (#{}): {}",
            failure.step, failure.occurrence, failure.error
        );
    }
    let kept: usize = report.processed.iter().map(|s| s.kept_atoms).sum();
    println!(
        "merged {} timesteps ({kept} atoms) into {}, {} failed",
        report.processed.len(),
        config.output.display(),
        report.failures.len()
    );
    Ok(())
}
