pub mod cfg_file;
mod dump_format;
mod dump_snapshot;
mod error;
pub mod merge;
mod pipeline;
mod proximity;
mod reindex;
mod timestep_index;
mod xyz;

pub use dump_format::{
    DumpFormat, DEFAULT_ATOM_COUNT_LINE, DEFAULT_HEADER_LINES, HEADER_TIMESTEP,
};
pub use dump_snapshot::{Atom, Timestep, TimestepHeader};
pub use error::{DumpError, Result};
pub use pipeline::{
    run, CancelToken, RunReport, TimestepFailure, TimestepSummary, VicinityConfig,
};
pub use proximity::{NeighborSearch, ProximityFilter, DEFAULT_THRESHOLD};
pub use reindex::reindex;
pub use timestep_index::{TimestepEntry, TimestepIndex, DEFAULT_TIMESTEP_LIMIT};
pub use xyz::{check_cutoff, XYZ};

#[cfg(test)]
pub(crate) mod test_util {
    use crate::Atom;

    pub(crate) type AtomSpec = (&'static str, [f64; 3]);

    pub(crate) fn simple_atoms() -> Vec<AtomSpec> {
        vec![
            ("N", [0.0, 0.0, 0.0]),
            ("O", [0.0, 0.0, 0.5]),
            ("C", [1.0, 0.0, 0.0]),
            ("H", [10.0, 10.0, 10.0]),
        ]
    }

    pub(crate) fn atoms_from(specs: &[AtomSpec]) -> Vec<Atom> {
        specs
            .iter()
            .enumerate()
            .map(|(i, (t, [x, y, z]))| {
                Atom::parse(&format!("{} 1 {t} {x} {y} {z}", i + 1), i + 1).unwrap()
            })
            .collect()
    }

    pub(crate) fn block_text(step: u64, atoms: &[AtomSpec]) -> String {
        let mut text = format!(
            "ITEM: TIMESTEP\n{step}\nITEM: NUMBER OF ATOMS\n{}\n\
             ITEM: BOX BOUNDS pp pp pp\n0 20\n0 20\n0 20\n\
             ITEM: ATOMS id mol type x y z q\n",
            atoms.len()
        );
        for (i, (t, [x, y, z])) in atoms.iter().enumerate() {
            text += &format!("{} 1 {t} {x} {y} {z} 0.25\n", i + 1);
        }
        text
    }

    pub(crate) fn dump_text(blocks: &[(u64, Vec<AtomSpec>)]) -> String {
        blocks
            .iter()
            .map(|(step, atoms)| block_text(*step, atoms))
            .collect()
    }
}
