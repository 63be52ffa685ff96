use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPoolBuilder};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dump_format::DumpFormat;
use crate::dump_snapshot::Timestep;
use crate::error::{DumpError, Result};
use crate::merge::{merge_via_dir, save};
use crate::proximity::{NeighborSearch, ProximityFilter, DEFAULT_THRESHOLD};
use crate::timestep_index::{TimestepEntry, TimestepIndex, DEFAULT_TIMESTEP_LIMIT};

/// Everything one extraction run needs. `start` and `end` are inclusive
/// 1-based occurrence numbers of `ITEM: TIMESTEP` markers.
#[derive(Debug, Clone)]
pub struct VicinityConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// When set, every timestep is also written to its own file here and the
    /// output is merged from this directory.
    pub intermediate_dir: Option<PathBuf>,
    pub start: usize,
    pub end: usize,
    pub timestep_limit: usize,
    pub threshold: f64,
    pub format: DumpFormat,
    pub atom_lines: usize,
    pub anchors: Vec<String>,
    pub candidates: Vec<String>,
    pub search: NeighborSearch,
    pub threads: usize,
}

impl VicinityConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        start: usize,
        end: usize,
        atom_lines: usize,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            intermediate_dir: None,
            start,
            end,
            timestep_limit: DEFAULT_TIMESTEP_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            format: DumpFormat::default(),
            atom_lines,
            anchors: vec!["N".to_string(), "C".to_string()],
            candidates: vec!["O".to_string(), "H".to_string()],
            search: NeighborSearch::default(),
            threads: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DumpError::InvalidConfig(msg));
        if self.start == 0 || self.start > self.end {
            return invalid(format!(
                "timestep range [{}, {}] must satisfy 1 <= start <= end",
                self.start, self.end
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return invalid(format!("distance threshold {}", self.threshold));
        }
        if self.format.header_lines <= DumpFormat::STEP_LINE {
            return invalid(format!("{} header lines", self.format.header_lines));
        }
        if self.format.atom_count_line <= DumpFormat::STEP_LINE
            || self.format.atom_count_line >= self.format.header_lines
        {
            return invalid(format!(
                "atom count line {} outside header of {} lines",
                self.format.atom_count_line, self.format.header_lines
            ));
        }
        if self.threads == 0 {
            return invalid("zero worker threads".to_string());
        }
        if let Some(t) = self.anchors.iter().find(|t| self.candidates.contains(t)) {
            warn!("type {t} is both anchor and candidate, treating it as anchor");
        }
        Ok(())
    }

    pub fn filter(&self) -> ProximityFilter {
        ProximityFilter::new(
            self.anchors.iter().cloned(),
            self.candidates.iter().cloned(),
            self.threshold,
        )
        .with_search(self.search)
    }
}

/// Shared flag checked before each timestep is started.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestepSummary {
    pub occurrence: usize,
    pub step: u64,
    pub input_atoms: usize,
    pub kept_atoms: usize,
}

#[derive(Debug)]
pub struct TimestepFailure {
    pub occurrence: usize,
    pub step: u64,
    pub error: DumpError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub processed: Vec<TimestepSummary>,
    pub failures: Vec<TimestepFailure>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn process_timestep(
    config: &VicinityConfig,
    filter: &ProximityFilter,
    entry: &TimestepEntry,
    cancel: &CancelToken,
) -> Result<(Timestep, usize)> {
    if cancel.is_cancelled() {
        return Err(DumpError::Cancelled);
    }
    let reader = BufReader::new(File::open(&config.input)?);
    let mut timestep = Timestep::read_at(
        reader,
        entry.byte_offset,
        entry.line_offset + 1,
        &config.format,
        config.atom_lines,
        entry.occurrence,
    )?;
    let input_atoms = timestep.atoms.len();
    timestep.retain_vicinity(filter);
    timestep.reindex(&config.format);
    debug!(
        "timestep {} (#{}): kept {} of {} atoms",
        entry.step,
        entry.occurrence,
        timestep.atoms.len(),
        input_atoms
    );
    Ok((timestep, input_atoms))
}

/// Indexes the input, filters and renumbers every selected timestep and
/// writes the merged output.
///
/// Fails only when nothing can be selected, the configuration is invalid or
/// the output cannot be written. A timestep that fails to parse is reported
/// in [`RunReport::failures`] and left out of the output.
pub fn run(config: &VicinityConfig, cancel: &CancelToken) -> Result<RunReport> {
    config.validate()?;
    info!("indexing {}", config.input.display());
    let index = TimestepIndex::scan(
        BufReader::new(File::open(&config.input)?),
        config.timestep_limit,
    )?;
    let selected = index.select(config.start, config.end)?;
    info!(
        "processing {} of {} timesteps with {} thread(s)",
        selected.len(),
        index.len(),
        config.threads
    );

    let filter = config.filter();
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| DumpError::InvalidConfig(e.to_string()))?;
    let results = pool.install(|| {
        selected
            .par_iter()
            .map(|entry| (*entry, process_timestep(config, &filter, entry, cancel)))
            .collect::<Vec<_>>()
    });

    let mut report = RunReport::default();
    let mut timesteps = Vec::with_capacity(results.len());
    for (entry, result) in results {
        match result {
            Ok((timestep, input_atoms)) => {
                report.processed.push(TimestepSummary {
                    occurrence: entry.occurrence,
                    step: entry.step,
                    input_atoms,
                    kept_atoms: timestep.atoms.len(),
                });
                timesteps.push(timestep);
            }
            Err(error) => {
                warn!("timestep {} (#{}): {error}", entry.step, entry.occurrence);
                report.failures.push(TimestepFailure {
                    occurrence: entry.occurrence,
                    step: entry.step,
                    error,
                });
            }
        }
    }

    match &config.intermediate_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let mut w = BufWriter::new(File::create(&config.output)?);
            merge_via_dir(&timesteps, dir, &mut w)?;
            w.flush()?;
        }
        None => save(&timesteps, &config.output)?,
    }
    info!(
        "{} timesteps merged into {}, {} failed",
        report.processed.len(),
        config.output.display(),
        report.failures.len()
    );
    Ok(report)
}
