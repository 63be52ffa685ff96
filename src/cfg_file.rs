//! Extended CFG files, where every atom is a three-line record:
//! mass, type label, then coordinates followed by auxiliary columns.

use itertools::Itertools;
use log::warn;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DumpError, Result};

/// Auxiliary column `k` sits after the three coordinates.
const AUXILIARY_OFFSET: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgRecord {
    pub id: u64,
    pub mass: String,
    pub atom_type: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CfgFile {
    pub particles: usize,
    pub id_column: usize,
    header: Vec<String>,
    records: Vec<CfgRecord>,
}

impl CfgFile {
    pub fn read(path: &Path) -> Result<Self> {
        let lines = BufReader::new(File::open(path)?)
            .lines()
            .collect::<io::Result<Vec<_>>>()?;
        Self::parse(&lines)
    }

    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let particles_re = Regex::new(r"^Number of particles = (\d+)")?;
        let mass_re = Regex::new(r"^\d+\.\d+")?;
        let id_re = Regex::new(r"^auxiliary\[(\d+)\] = id")?;

        let first = lines.first().map(|l| l.as_ref().trim()).unwrap_or_default();
        let particles = particles_re
            .captures(first)
            .and_then(|c| c[1].parse::<usize>().ok())
            .ok_or_else(|| DumpError::header(1, "expected 'Number of particles = N'"))?;

        let body_start = lines
            .iter()
            .position(|l| mass_re.is_match(l.as_ref()))
            .unwrap_or(lines.len());
        let header = lines[..body_start]
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>();
        let id_column = header
            .iter()
            .filter_map(|l| id_re.captures(l))
            .filter_map(|c| c[1].parse::<usize>().ok())
            .last()
            .map(|k| k + AUXILIARY_OFFSET)
            .ok_or(DumpError::MissingIdColumn)?;

        let mut records = Vec::new();
        let mut i = body_start;
        while i < lines.len() {
            if !mass_re.is_match(lines[i].as_ref()) {
                i += 1;
                continue;
            }
            let line_at = |k: usize| {
                lines
                    .get(i + k)
                    .map(|l| l.as_ref().trim())
                    .ok_or_else(|| DumpError::atom_line(i + k + 1, "truncated CFG record"))
            };
            let mass = line_at(0)?.to_string();
            let atom_type = line_at(1)?.to_string();
            let fields = line_at(2)?
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>();
            let id = fields
                .get(id_column)
                .ok_or_else(|| {
                    DumpError::atom_line(i + 3, format!("no id in column {}", id_column + 1))
                })?
                .parse::<u64>()
                .map_err(|e| DumpError::atom_line(i + 3, format!("atom id: {e}")))?;
            records.push(CfgRecord {
                id,
                mass,
                atom_type,
                fields,
            });
            i += 3;
        }
        if records.len() != particles {
            warn!(
                "header declares {particles} particles, found {} records",
                records.len()
            );
        }
        Ok(Self {
            particles,
            id_column,
            header,
            records,
        })
    }

    #[must_use]
    pub fn records(&self) -> &[CfgRecord] {
        &self.records
    }

    /// Stable, so records sharing an id keep their relative order.
    pub fn sort_by_id(&mut self) {
        self.records.sort_by_key(|r| r.id);
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for line in &self.header {
            writeln!(w, "{line}")?;
        }
        for record in &self.records {
            writeln!(w, "{}", record.mass)?;
            writeln!(w, "{}", record.atom_type)?;
            writeln!(w, "{}", record.fields.iter().join(" "))?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write(&mut w)?;
        w.flush()
    }
}

/// `sorted_<name>` next to `input`.
#[must_use]
pub fn default_sorted_path(input: &Path) -> PathBuf {
    input.with_file_name(format!(
        "sorted_{}",
        input.file_name().unwrap_or_default().to_string_lossy()
    ))
}
