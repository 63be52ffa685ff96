use crate::dump_format::DumpFormat;
use crate::dump_snapshot::{Atom, Timestep};

/// Renumbers atoms `1..=N` in sequence order and returns them with `N`.
pub fn reindex(mut atoms: Vec<Atom>) -> (Vec<Atom>, usize) {
    for (atom, index) in atoms.iter_mut().zip(1u64..) {
        atom.set_index(index);
    }
    let count = atoms.len();
    (atoms, count)
}

impl Timestep {
    /// Renumbers the atoms and rewrites the atom-count header line to match.
    pub fn reindex(&mut self, format: &DumpFormat) {
        let (atoms, count) = reindex(std::mem::take(&mut self.atoms));
        self.atoms = atoms;
        self.header.declared_atom_count = count;
        if let Some(line) = self.header.lines.get_mut(format.atom_count_line) {
            *line = count.to_string();
        }
    }
}
