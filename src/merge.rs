use log::{debug, info};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dump_snapshot::Timestep;
use crate::error::Result;

const INTERMEDIATE_PREFIX: &str = "modified_";
const INTERMEDIATE_SUFFIX: &str = ".dump";
/// Enough digits for any `u64`, so name order equals numeric order.
const NUMBER_WIDTH: usize = 20;

/// Writes timesteps in ascending occurrence order, whatever order they come in.
pub fn merge<'a, I, W>(timesteps: I, w: &mut W) -> io::Result<()>
where
    I: IntoIterator<Item = &'a Timestep>,
    W: Write,
{
    let mut timesteps = timesteps.into_iter().collect::<Vec<_>>();
    timesteps.sort_by_key(|t| t.occurrence);
    for timestep in timesteps {
        timestep.write(w)?;
    }
    Ok(())
}

pub fn save<'a, I>(timesteps: I, path: &Path) -> io::Result<()>
where
    I: IntoIterator<Item = &'a Timestep>,
{
    let mut w = BufWriter::new(File::create(path)?);
    merge(timesteps, &mut w)?;
    w.flush()
}

/// `modified_<occurrence>_<step>.dump`, both zero-padded. The occurrence
/// keeps repeated step numbers (restarted runs) apart.
#[must_use]
pub fn intermediate_name(occurrence: usize, step: u64) -> String {
    format!(
        "{INTERMEDIATE_PREFIX}{occurrence:0width$}_{step:0width$}{INTERMEDIATE_SUFFIX}",
        width = NUMBER_WIDTH
    )
}

pub fn write_intermediate(dir: &Path, timestep: &Timestep) -> io::Result<PathBuf> {
    let path = dir.join(intermediate_name(
        timestep.occurrence,
        timestep.header.sequence_number,
    ));
    let mut w = BufWriter::new(File::create(&path)?);
    timestep.write(&mut w)?;
    w.flush()?;
    debug!(
        "timestep {} written to {}",
        timestep.header.sequence_number,
        path.display()
    );
    Ok(path)
}

/// Writes each timestep to its own file in `dir`, then concatenates exactly
/// those files in occurrence order. Other files already in `dir` are ignored.
pub fn merge_via_dir<'a, I, W>(timesteps: I, dir: &Path, w: &mut W) -> io::Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a Timestep>,
    W: Write,
{
    let mut timesteps = timesteps.into_iter().collect::<Vec<_>>();
    timesteps.sort_by_key(|t| t.occurrence);
    let paths = timesteps
        .into_iter()
        .map(|t| write_intermediate(dir, t))
        .collect::<io::Result<Vec<_>>>()?;
    concat(&paths, w)?;
    Ok(paths)
}

fn concat<W: Write>(paths: &[PathBuf], w: &mut W) -> io::Result<()> {
    for path in paths {
        let mut r = BufReader::new(File::open(path)?);
        io::copy(&mut r, w)?;
    }
    Ok(())
}

/// Concatenates every `modified_<n>.dump` or `modified_<n>_<m>.dump` in
/// `dir`, ordered numerically by `(n, m)`, so unpadded names from older runs
/// merge correctly too.
pub fn merge_dir<W: Write>(dir: &Path, w: &mut W) -> Result<usize> {
    let re = Regex::new(r"^modified_(\d+)(?:_(\d+))?\.dump$")?;
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let key = re.captures(&name).and_then(|c| {
            let first = c[1].parse::<u64>().ok()?;
            let second = match c.get(2) {
                Some(m) => m.as_str().parse::<u64>().ok()?,
                None => 0,
            };
            Some((first, second))
        });
        if let Some(key) = key {
            entries.push((key, path));
        }
    }
    entries.sort();
    let paths = entries.into_iter().map(|(_, path)| path).collect::<Vec<_>>();
    concat(&paths, w)?;
    info!("merged {} files from {}", paths.len(), dir.display());
    Ok(paths.len())
}
