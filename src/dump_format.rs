pub const HEADER_TIMESTEP: &str = "ITEM: TIMESTEP";

pub const DEFAULT_HEADER_LINES: usize = 9;
pub const DEFAULT_ATOM_COUNT_LINE: usize = 3;

/// Fixed layout of a dump timestep block.
///
/// The header holds `header_lines` lines starting with the timestep marker,
/// the literal step number comes right after the marker and the atom count
/// sits at `atom_count_line` (0-based, relative to the marker). Atom lines
/// are whitespace separated: index, molecule/type id, type label, x, y, z,
/// then any number of passthrough columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpFormat {
    pub header_lines: usize,
    pub atom_count_line: usize,
}

impl DumpFormat {
    pub const STEP_LINE: usize = 1;
    pub const INDEX_COLUMN: usize = 0;
    pub const TYPE_COLUMN: usize = 2;
    pub const X_COLUMN: usize = 3;
    pub const MIN_ATOM_FIELDS: usize = 6;

    #[must_use]
    pub fn new(header_lines: usize, atom_count_line: usize) -> Self {
        Self {
            header_lines,
            atom_count_line,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_marker(line: &str) -> bool {
        line.contains(HEADER_TIMESTEP)
    }

    #[must_use]
    pub fn lines_per_timestep(&self, atom_lines: usize) -> usize {
        self.header_lines + atom_lines
    }
}

impl Default for DumpFormat {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_LINES, DEFAULT_ATOM_COUNT_LINE)
    }
}
