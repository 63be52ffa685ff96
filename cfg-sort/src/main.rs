use anyhow::{Context, Result};
use clap::Parser;
use dump_vicinity::cfg_file::{CfgFile, default_sorted_path};
use std::path::PathBuf;

/// Sorts the atom records of an extended CFG file by atom id.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input CFG file
    input_file: PathBuf,

    /// Resulting CFG file, "sorted_<input>" by default
    output_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut cfg = CfgFile::read(&cli.input_file)
        .with_context(|| format!("Reading {}", cli.input_file.display()))?;
    cfg.sort_by_id();
    let output = cli
        .output_file
        .unwrap_or_else(|| default_sorted_path(&cli.input_file));
    cfg.save(&output)
        .with_context(|| format!("Writing {}", output.display()))?;
    println!("sorted {} records into {}", cfg.records().len(), output.display());
    Ok(())
}
