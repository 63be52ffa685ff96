use itertools::Itertools;
use log::debug;
use std::fmt;
use std::io::{self, BufRead, Seek, SeekFrom, Write};

use crate::dump_format::DumpFormat;
use crate::error::{DumpError, Result};
use crate::timestep_index::OffsetLines;
use crate::xyz::XYZ;

/// One atom line. `raw_fields` keeps every column so that anything past
/// the coordinates is written back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub raw_index: u64,
    pub atom_type: String,
    pub position: XYZ,
    pub raw_fields: Vec<String>,
}

impl Atom {
    /// Parses a dump atom line; `line_no` is only used for error reporting.
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let raw_fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if raw_fields.len() < DumpFormat::MIN_ATOM_FIELDS {
            return Err(DumpError::atom_line(
                line_no,
                format!(
                    "expected at least {} fields, found {}",
                    DumpFormat::MIN_ATOM_FIELDS,
                    raw_fields.len()
                ),
            ));
        }
        let raw_index = raw_fields[DumpFormat::INDEX_COLUMN]
            .parse::<u64>()
            .map_err(|e| DumpError::atom_line(line_no, format!("atom index: {e}")))?;
        let mut coords = [0.0; 3];
        for (k, coord) in coords.iter_mut().enumerate() {
            let field = &raw_fields[DumpFormat::X_COLUMN + k];
            *coord = field.parse::<f64>().map_err(|e| {
                DumpError::atom_line(line_no, format!("coordinate '{field}': {e}"))
            })?;
            if !coord.is_finite() {
                return Err(DumpError::atom_line(
                    line_no,
                    format!("coordinate '{field}' is not finite"),
                ));
            }
        }
        Ok(Self {
            raw_index,
            atom_type: raw_fields[DumpFormat::TYPE_COLUMN].clone(),
            position: XYZ::from(coords),
            raw_fields,
        })
    }

    pub fn set_index(&mut self, index: u64) {
        self.raw_index = index;
        self.raw_fields[DumpFormat::INDEX_COLUMN] = index.to_string();
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw_fields.iter().join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestepHeader {
    pub sequence_number: u64,
    pub declared_atom_count: usize,
    /// Every header line, starting with the `ITEM: TIMESTEP` marker.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    /// 1-based position of this timestep among the markers of its file.
    pub occurrence: usize,
    pub header: TimestepHeader,
    pub atoms: Vec<Atom>,
}

impl Timestep {
    /// Slices `format.header_lines + atom_lines` lines starting at `offset`.
    pub fn extract<S: AsRef<str>>(
        lines: &[S],
        offset: usize,
        format: &DumpFormat,
        atom_lines: usize,
        occurrence: usize,
    ) -> Result<Self> {
        let block = lines
            .iter()
            .skip(offset)
            .map(|l| Ok::<_, io::Error>(l.as_ref()));
        Self::parse(block, offset + 1, format, atom_lines, occurrence)
    }

    /// Same as [`Timestep::extract`], but seeks to `byte_offset` and reads
    /// only the lines of this timestep.
    pub fn read_at<R: BufRead + Seek>(
        mut reader: R,
        byte_offset: u64,
        first_line: usize,
        format: &DumpFormat,
        atom_lines: usize,
        occurrence: usize,
    ) -> Result<Self> {
        reader.seek(SeekFrom::Start(byte_offset))?;
        let block = OffsetLines::new(reader, byte_offset).map_ok(|(_, line)| line);
        Self::parse(block, first_line, format, atom_lines, occurrence)
    }

    fn parse<I, L>(
        lines: I,
        first_line: usize,
        format: &DumpFormat,
        atom_lines: usize,
        occurrence: usize,
    ) -> Result<Self>
    where
        I: Iterator<Item = io::Result<L>>,
        L: AsRef<str>,
    {
        let expected = format.lines_per_timestep(atom_lines);
        let block = lines.take(expected).collect::<io::Result<Vec<L>>>()?;
        if block.len() < expected {
            return Err(DumpError::InconsistentLineCount {
                expected,
                found: block.len(),
            });
        }
        let (header, atoms) = block.split_at(format.header_lines);
        let header = Self::parse_header(header, first_line, format)?;
        let atoms = atoms
            .iter()
            .enumerate()
            .map(|(i, line)| Atom::parse(line.as_ref(), first_line + format.header_lines + i))
            .collect::<Result<Vec<_>>>()?;
        if header.declared_atom_count != atoms.len() {
            debug!(
                "timestep {} declares {} atoms, sliced {}",
                header.sequence_number,
                header.declared_atom_count,
                atoms.len()
            );
        }
        Ok(Self {
            occurrence,
            header,
            atoms,
        })
    }

    fn parse_header<L: AsRef<str>>(
        lines: &[L],
        first_line: usize,
        format: &DumpFormat,
    ) -> Result<TimestepHeader> {
        let line_at = |i: usize| {
            lines
                .get(i)
                .map(|l| l.as_ref())
                .ok_or_else(|| DumpError::header(first_line + i, "header too short"))
        };
        if !DumpFormat::is_marker(line_at(0)?) {
            return Err(DumpError::header(first_line, "expected 'ITEM: TIMESTEP'"));
        }
        let step = line_at(DumpFormat::STEP_LINE)?;
        let sequence_number = step.trim().parse::<u64>().map_err(|e| {
            DumpError::header(first_line + DumpFormat::STEP_LINE, format!("timestep number '{step}': {e}"))
        })?;
        let count = line_at(format.atom_count_line)?;
        let declared_atom_count = count.trim().parse::<usize>().map_err(|e| {
            DumpError::header(first_line + format.atom_count_line, format!("atom count '{count}': {e}"))
        })?;
        Ok(TimestepHeader {
            sequence_number,
            declared_atom_count,
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for line in &self.header.lines {
            writeln!(w, "{line}")?;
        }
        for atom in &self.atoms {
            writeln!(w, "{atom}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{block_text, dump_text, simple_atoms};
    use assert_float_eq::assert_f64_near;
    use std::io::Cursor;

    #[test]
    fn test_atom_parse_keeps_extra_columns() {
        let atom = Atom::parse("17 3 O 1.5 -2.25 3e-1 0.41 extra", 1).unwrap();
        assert_eq!(atom.raw_index, 17);
        assert_eq!(atom.atom_type, "O");
        assert_f64_near!(atom.position.x(), 1.5);
        assert_f64_near!(atom.position.y(), -2.25);
        assert_f64_near!(atom.position.z(), 0.3);
        assert_eq!(atom.raw_fields.len(), 8);
        assert_eq!(atom.to_string(), "17 3 O 1.5 -2.25 3e-1 0.41 extra");
    }

    #[test]
    fn test_atom_parse_errors() {
        let err = Atom::parse("1 1 O 0.0 0.0", 12).unwrap_err();
        assert!(matches!(err, DumpError::MalformedAtomLine { line: 12, .. }));
        let err = Atom::parse("1 1 O 0.0 zero 0.0", 4).unwrap_err();
        assert!(matches!(err, DumpError::MalformedAtomLine { line: 4, .. }));
        let err = Atom::parse("1 1 C nan 0.0 0.0", 5).unwrap_err();
        assert!(matches!(err, DumpError::MalformedAtomLine { line: 5, .. }));
        let err = Atom::parse("1 1 C 0.0 0.0 -inf", 6).unwrap_err();
        assert!(matches!(err, DumpError::MalformedAtomLine { line: 6, .. }));
        let err = Atom::parse("x 1 O 0.0 0.0 0.0", 4).unwrap_err();
        assert!(matches!(err, DumpError::MalformedAtomLine { .. }));
    }

    #[test]
    fn test_set_index_rewrites_first_field() {
        let mut atom = Atom::parse("40 1 H 0 0 0", 1).unwrap();
        atom.set_index(2);
        assert_eq!(atom.raw_index, 2);
        assert_eq!(atom.to_string(), "2 1 H 0 0 0");
    }

    #[test]
    fn test_extract_second_timestep() {
        let atoms = simple_atoms();
        let text = dump_text(&[(100, atoms.clone()), (200, atoms.clone())]);
        let lines = text.lines().collect::<Vec<_>>();
        let format = DumpFormat::default();
        let offset = format.lines_per_timestep(atoms.len());
        let timestep = Timestep::extract(&lines, offset, &format, atoms.len(), 2).unwrap();
        assert_eq!(timestep.occurrence, 2);
        assert_eq!(timestep.header.sequence_number, 200);
        assert_eq!(timestep.header.declared_atom_count, atoms.len());
        assert_eq!(timestep.header.lines.len(), 9);
        assert_eq!(timestep.atoms.len(), atoms.len());
        assert_eq!(timestep.atoms[1].atom_type, "O");
    }

    #[test]
    fn test_extract_past_end_of_file() {
        let atoms = simple_atoms();
        let text = block_text(7, &atoms);
        let lines = text.lines().collect::<Vec<_>>();
        let format = DumpFormat::default();
        let err = Timestep::extract(&lines, 0, &format, atoms.len() + 2, 1).unwrap_err();
        assert!(matches!(
            err,
            DumpError::InconsistentLineCount { expected: 15, found: 13 }
        ));
    }

    #[test]
    fn test_extract_reports_malformed_header() {
        let text = block_text(7, &simple_atoms()).replacen("\n7\n", "\nseven\n", 1);
        let lines = text.lines().collect::<Vec<_>>();
        let err = Timestep::extract(&lines, 0, &DumpFormat::default(), 4, 1).unwrap_err();
        assert!(matches!(err, DumpError::MalformedHeader { line: 2, .. }));
        let err = Timestep::extract(&lines, 1, &DumpFormat::default(), 3, 1).unwrap_err();
        assert!(matches!(err, DumpError::MalformedHeader { line: 2, .. }));
    }

    #[test]
    fn test_read_at_matches_extract() {
        let atoms = simple_atoms();
        let text = dump_text(&[(1, atoms.clone()), (2, atoms.clone())]);
        let lines = text.lines().collect::<Vec<_>>();
        let format = DumpFormat::default();
        let offset = format.lines_per_timestep(atoms.len());
        let byte_offset = text.find("ITEM: TIMESTEP\n2\n").unwrap() as u64;
        let sliced = Timestep::extract(&lines, offset, &format, atoms.len(), 2).unwrap();
        let seeked = Timestep::read_at(
            Cursor::new(text.as_bytes()),
            byte_offset,
            offset + 1,
            &format,
            atoms.len(),
            2,
        )
        .unwrap();
        assert_eq!(sliced, seeked);
    }

    #[test]
    fn test_write_round_trips_block() {
        let text = block_text(3, &simple_atoms());
        let lines = text.lines().collect::<Vec<_>>();
        let timestep = Timestep::extract(&lines, 0, &DumpFormat::default(), 4, 1).unwrap();
        let mut out = Vec::new();
        timestep.write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }
}
