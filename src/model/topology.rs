//! Explicit bond list attached to a [`Structure`].
//!
//! Only the bonds a PDB file cannot imply are tracked here: disulfide bridges and the
//! connectivity of hetero groups. They are what the writer serializes as `CONECT` records.

use super::structure::Structure;
use std::fmt;

/// Undirected bond between two atoms, addressed by their flat index in the structure.
///
/// Indices are stored in ascending order so duplicate bonds compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bond {
    pub a1_idx: usize,
    pub a2_idx: usize,
}

impl Bond {
    pub fn new(idx1: usize, idx2: usize) -> Self {
        Self {
            a1_idx: idx1.min(idx2),
            a2_idx: idx1.max(idx2),
        }
    }

    /// Returns the partner of `atom_idx`, or `None` when the bond does not touch it.
    pub fn partner(&self, atom_idx: usize) -> Option<usize> {
        if self.a1_idx == atom_idx {
            Some(self.a2_idx)
        } else if self.a2_idx == atom_idx {
            Some(self.a1_idx)
        } else {
            None
        }
    }
}

/// A structure paired with the bonds that must be written explicitly.
#[derive(Debug, Clone)]
pub struct Topology {
    structure: Structure,
    bonds: Vec<Bond>,
}

impl Topology {
    /// Builds a topology; bond indices must address atoms of `structure`.
    pub fn new(structure: Structure, bonds: Vec<Bond>) -> Self {
        debug_assert!(
            bonds.iter().all(|b| b.a2_idx < structure.atom_count()),
            "Bond index out of bounds"
        );
        Self { structure, bonds }
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn into_structure(self) -> Structure {
        self.structure
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn atom_count(&self) -> usize {
        self.structure.atom_count()
    }

    /// Indices of every atom bonded to `atom_idx`, in bond-list order.
    pub fn neighbors_of(&self, atom_idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.bonds.iter().filter_map(move |b| b.partner(atom_idx))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topology {{ atoms: {}, bonds: {} }}",
            self.atom_count(),
            self.bond_count()
        )
    }
}
