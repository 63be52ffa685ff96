use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("malformed timestep header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("malformed atom line {line}: {reason}")]
    MalformedAtomLine { line: usize, reason: String },

    #[error("no timesteps in occurrence range [{start}, {end}] ({found} indexed)")]
    EmptyTimestepRange {
        start: usize,
        end: usize,
        found: usize,
    },

    #[error("timestep ended early: expected {expected} lines, found {found}")]
    InconsistentLineCount { expected: usize, found: usize },

    #[error("no 'auxiliary[k] = id' header line")]
    MissingIdColumn,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("cancelled before processing")]
    Cancelled,

    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl DumpError {
    pub(crate) fn header(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn atom_line(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedAtomLine {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = DumpError> = std::result::Result<T, E>;
