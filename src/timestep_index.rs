use log::debug;
use std::io::{self, BufRead};

use crate::dump_format::DumpFormat;
use crate::error::{DumpError, Result};

pub const DEFAULT_TIMESTEP_LIMIT: usize = 10000;

/// Position of one `ITEM: TIMESTEP` marker in a dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestepEntry {
    /// 1-based count of markers seen up to and including this one.
    pub occurrence: usize,
    /// Literal step number written after the marker.
    pub step: u64,
    /// 0-based line of the marker.
    pub line_offset: usize,
    /// Byte offset of the marker line start.
    pub byte_offset: u64,
}

#[derive(Debug, Default)]
pub struct TimestepIndex {
    entries: Vec<TimestepEntry>,
}

/// Lines of a reader together with the byte offset each one starts at.
/// Line terminators (`\n` or `\r\n`) are stripped.
pub(crate) struct OffsetLines<R> {
    reader: R,
    offset: u64,
}

impl<R: BufRead> OffsetLines<R> {
    pub(crate) fn new(reader: R, offset: u64) -> Self {
        Self { reader, offset }
    }
}

impl<R: BufRead> Iterator for OffsetLines<R> {
    type Item = io::Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(n) => {
                let start = self.offset;
                self.offset += n as u64;
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(Ok((start, line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl TimestepIndex {
    /// Indexes an in-memory dump. Byte offsets assume `\n` terminated lines.
    pub fn index<S: AsRef<str>>(lines: &[S], timestep_limit: usize) -> Result<Self> {
        let with_offsets = lines.iter().scan(0u64, |offset, line| {
            let start = *offset;
            *offset += line.as_ref().len() as u64 + 1;
            Some(Ok::<_, io::Error>((start, line.as_ref())))
        });
        Self::build(with_offsets, timestep_limit)
    }

    /// Indexes a dump in one streaming pass without holding it in memory.
    pub fn scan<R: BufRead>(reader: R, timestep_limit: usize) -> Result<Self> {
        Self::build(OffsetLines::new(reader, 0), timestep_limit)
    }

    fn build<I, L>(lines: I, timestep_limit: usize) -> Result<Self>
    where
        I: Iterator<Item = io::Result<(u64, L)>>,
        L: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut lines = lines.enumerate();
        while let Some((line_offset, line)) = lines.next() {
            let (byte_offset, line) = line?;
            if !DumpFormat::is_marker(line.as_ref()) {
                continue;
            }
            let occurrence = entries.len() + 1;
            let step_line = line_offset + 2;
            let step = match lines.next() {
                Some((_, Ok((_, s)))) => s.as_ref().trim().parse::<u64>().map_err(|e| {
                    DumpError::header(step_line, format!("timestep number '{}': {e}", s.as_ref()))
                })?,
                Some((_, Err(e))) => return Err(e.into()),
                None => return Err(DumpError::header(step_line, "missing timestep number")),
            };
            entries.push(TimestepEntry {
                occurrence,
                step,
                line_offset,
                byte_offset,
            });
            if occurrence > timestep_limit {
                debug!("timestep limit {timestep_limit} passed at line {}", line_offset + 1);
                break;
            }
        }
        debug!("indexed {} timesteps", entries.len());
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[TimestepEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with `start <= occurrence <= end`.
    pub fn select(&self, start: usize, end: usize) -> Result<&[TimestepEntry]> {
        let lo = start.max(1) - 1;
        let hi = end.min(self.entries.len());
        if lo >= hi {
            return Err(DumpError::EmptyTimestepRange {
                start,
                end,
                found: self.entries.len(),
            });
        }
        Ok(&self.entries[lo..hi])
    }
}
