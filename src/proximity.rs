use kd_tree::KdTree;
use std::collections::HashSet;

use crate::dump_snapshot::{Atom, Timestep};
use crate::xyz::{check_cutoff, XYZ};

pub const DEFAULT_THRESHOLD: f64 = 1.7;

/// How candidate atoms look up their anchors. Both give the same result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NeighborSearch {
    #[default]
    Linear,
    KdTree,
}

enum AnchorPositions {
    Linear(Vec<XYZ>),
    Tree(KdTree<XYZ>),
}

impl AnchorPositions {
    fn build(positions: Vec<XYZ>, search: NeighborSearch) -> Self {
        match search {
            NeighborSearch::Linear => Self::Linear(positions),
            NeighborSearch::KdTree => Self::Tree(KdTree::build_by_ordered_float(positions)),
        }
    }

    fn any_within(&self, point: &XYZ, threshold: f64) -> bool {
        match self {
            Self::Linear(anchors) => anchors
                .iter()
                .any(|anchor| check_cutoff(point, anchor, threshold)),
            Self::Tree(tree) => tree
                .nearest(point)
                .is_some_and(|nearest| check_cutoff(point, nearest.item, threshold)),
        }
    }
}

/// Keeps anchor atoms plus the candidate atoms that sit closer than
/// `threshold` to at least one anchor of the same timestep.
///
/// Kept anchors come first in their original order, followed by the kept
/// candidates in their original order. Anchors later in the file still count
/// for candidates that precede them. Atoms of any other type are dropped.
#[derive(Debug, Clone)]
pub struct ProximityFilter {
    anchors: HashSet<String>,
    candidates: HashSet<String>,
    threshold: f64,
    search: NeighborSearch,
}

impl ProximityFilter {
    pub fn new<A, C, S>(anchors: A, candidates: C, threshold: f64) -> Self
    where
        A: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchors: anchors.into_iter().map(Into::into).collect(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            threshold,
            search: NeighborSearch::default(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: NeighborSearch) -> Self {
        self.search = search;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_anchor(&self, atom: &Atom) -> bool {
        self.anchors.contains(&atom.atom_type)
    }

    /// A type listed in both sets is an anchor.
    pub fn is_candidate(&self, atom: &Atom) -> bool {
        !self.is_anchor(atom) && self.candidates.contains(&atom.atom_type)
    }

    pub fn filter(&self, atoms: Vec<Atom>) -> Vec<Atom> {
        let (anchors, others): (Vec<_>, Vec<_>) =
            atoms.into_iter().partition(|atom| self.is_anchor(atom));
        if anchors.is_empty() {
            return anchors;
        }
        let positions = AnchorPositions::build(
            anchors.iter().map(|atom| atom.position).collect(),
            self.search,
        );
        let candidates = others.into_iter().filter(|atom| {
            self.is_candidate(atom) && positions.any_within(&atom.position, self.threshold)
        });
        anchors.into_iter().chain(candidates).collect()
    }
}

impl Timestep {
    pub fn retain_vicinity(&mut self, filter: &ProximityFilter) {
        self.atoms = filter.filter(std::mem::take(&mut self.atoms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::atoms_from;

    fn default_filter(threshold: f64) -> ProximityFilter {
        ProximityFilter::new(["N", "C"], ["O", "H"], threshold)
    }

    fn types(atoms: &[Atom]) -> Vec<&str> {
        atoms.iter().map(|a| a.atom_type.as_str()).collect()
    }

    fn indices(atoms: &[Atom]) -> Vec<u64> {
        atoms.iter().map(|a| a.raw_index).collect()
    }

    #[test]
    fn test_keeps_near_candidates_only() {
        let atoms = atoms_from(&[
            ("N", [0.0, 0.0, 0.0]),
            ("C", [1.0, 0.0, 0.0]),
            ("O", [0.0, 0.0, 0.5]),
            ("H", [10.0, 10.0, 10.0]),
        ]);
        let kept = default_filter(1.7).filter(atoms);
        assert_eq!(kept.len(), 3);
        assert_eq!(types(&kept), ["N", "C", "O"]);
    }

    #[test]
    fn test_threshold_zero_keeps_anchors_only() {
        let atoms = atoms_from(&[
            ("O", [0.0, 0.0, 0.0]),
            ("N", [0.0, 0.0, 0.0]),
            ("H", [0.0, 0.0, 0.0]),
            ("C", [5.0, 0.0, 0.0]),
        ]);
        let kept = default_filter(0.0).filter(atoms);
        assert_eq!(types(&kept), ["N", "C"]);
        assert_eq!(indices(&kept), [2, 4]);
    }

    #[test]
    fn test_empty_candidate_set_keeps_anchors_only() {
        let atoms = atoms_from(&[("N", [0.0; 3]), ("O", [0.1, 0.0, 0.0])]);
        let filter = ProximityFilter::new(vec!["N"], Vec::<&str>::new(), 5.0);
        assert_eq!(types(&filter.filter(atoms)), ["N"]);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let atoms = atoms_from(&[
            ("N", [0.0, 0.0, 0.0]),
            ("O", [0.0, 0.0, 1.5]),
            ("H", [0.0, 1.4999, 0.0]),
        ]);
        let kept = default_filter(1.5).filter(atoms);
        assert_eq!(types(&kept), ["N", "H"]);
    }

    #[test]
    fn test_anchor_after_candidate_counts() {
        let atoms = atoms_from(&[
            ("H", [4.0, 4.0, 4.0]),
            ("O", [-9.0, 0.0, 0.0]),
            ("N", [0.0, 0.0, 0.0]),
            ("C", [4.0, 4.0, 4.5]),
        ]);
        let kept = default_filter(1.0).filter(atoms);
        assert_eq!(indices(&kept), [3, 4, 1]);
    }

    #[test]
    fn test_anchors_then_candidates_order() {
        let atoms = atoms_from(&[
            ("O", [0.0, 0.0, 0.1]),
            ("N", [0.0, 0.0, 0.0]),
            ("H", [0.0, 0.1, 0.0]),
            ("Si", [0.0, 0.0, 0.0]),
            ("C", [0.2, 0.0, 0.0]),
            ("O", [0.3, 0.0, 0.0]),
        ]);
        let kept = default_filter(1.7).filter(atoms);
        assert_eq!(indices(&kept), [2, 5, 1, 3, 6]);
    }

    #[test]
    fn test_no_anchors_drops_everything() {
        let atoms = atoms_from(&[("O", [0.0; 3]), ("H", [0.0; 3])]);
        assert!(default_filter(100.0).filter(atoms).is_empty());
    }

    #[test]
    fn test_type_in_both_sets_is_not_duplicated() {
        let atoms = atoms_from(&[("N", [0.0; 3]), ("O", [0.5, 0.0, 0.0])]);
        let filter = ProximityFilter::new(["N", "O"], ["O", "H"], 1.7);
        assert_eq!(indices(&filter.filter(atoms)), [1, 2]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let atoms = atoms_from(&[
            ("H", [0.9, 0.0, 0.0]),
            ("N", [0.0, 0.0, 0.0]),
            ("O", [3.0, 0.0, 0.0]),
            ("C", [2.0, 2.0, 2.0]),
            ("O", [2.0, 2.0, 3.0]),
        ]);
        let filter = default_filter(1.7);
        let once = filter.filter(atoms);
        let twice = filter.filter(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_kd_tree_matches_linear() {
        let labels = ["N", "C", "O", "H", "Si"];
        let specs = (0..400)
            .map(|i| {
                let t = i as f64;
                (
                    labels[i % labels.len()],
                    [
                        (t * 1.37).sin() * 8.0,
                        (t * 0.71).cos() * 8.0,
                        (t * 2.13).sin() * (t * 0.05).cos() * 8.0,
                    ],
                )
            })
            .collect::<Vec<_>>();
        for threshold in [0.0, 0.5, 1.7, 2.5, 20.0] {
            let linear = default_filter(threshold).filter(atoms_from(&specs));
            let tree = default_filter(threshold)
                .with_search(NeighborSearch::KdTree)
                .filter(atoms_from(&specs));
            assert_eq!(indices(&linear), indices(&tree), "threshold {threshold}");
        }
    }
}
