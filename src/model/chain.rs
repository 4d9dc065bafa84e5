use super::atom::Atom;
use super::residue::Residue;
use super::types::{ResiduePosition, StandardResidue};
use std::fmt;

/// Ordered list of residues sharing a chain identifier.
///
/// Residue order is significant: it is the order in which residues are written, and the
/// repair passes treat neighbors in this list as candidates for peptide bonding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: String,
    residues: Vec<Residue>,
}

impl Chain {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            residues: Vec::new(),
        }
    }

    pub fn add_residue(&mut self, residue: Residue) {
        debug_assert!(
            self.residue(residue.id, residue.insertion_code).is_none(),
            "Attempted to add a duplicate residue '{}' to chain '{}'",
            residue.label(),
            self.id
        );
        self.residues.push(residue);
    }

    /// Inserts a residue at a positional index, shifting later residues back.
    ///
    /// # Panics
    ///
    /// Panics if `index > residue_count()`.
    pub fn insert_residue(&mut self, index: usize, residue: Residue) {
        debug_assert!(
            self.residue(residue.id, residue.insertion_code).is_none(),
            "Attempted to insert a duplicate residue '{}' into chain '{}'",
            residue.label(),
            self.id
        );
        self.residues.insert(index, residue);
    }

    pub fn remove_residue(&mut self, id: i32, insertion_code: Option<char>) -> Option<Residue> {
        let index = self
            .residues
            .iter()
            .position(|r| r.id == id && r.insertion_code == insertion_code)?;
        Some(self.residues.remove(index))
    }

    pub fn retain_residues<F>(&mut self, keep: F)
    where
        F: FnMut(&Residue) -> bool,
    {
        self.residues.retain(keep);
    }

    pub fn residue(&self, id: i32, insertion_code: Option<char>) -> Option<&Residue> {
        self.residues
            .iter()
            .find(|r| r.id == id && r.insertion_code == insertion_code)
    }

    pub fn residue_mut(&mut self, id: i32, insertion_code: Option<char>) -> Option<&mut Residue> {
        self.residues
            .iter_mut()
            .find(|r| r.id == id && r.insertion_code == insertion_code)
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut [Residue] {
        &mut self.residues
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Returns `true` when the chain contains at least one amino acid or nucleotide.
    pub fn is_polymer(&self) -> bool {
        self.residues
            .iter()
            .any(|r| r.is_amino_acid() || r.is_nucleotide())
    }

    pub fn iter_residues(&self) -> std::slice::Iter<'_, Residue> {
        self.residues.iter()
    }

    pub fn iter_residues_mut(&mut self) -> std::slice::IterMut<'_, Residue> {
        self.residues.iter_mut()
    }

    /// Recomputes polymer positions from residue order.
    ///
    /// The first and last amino acid become N/C-terminal and the first and last nucleotide
    /// 5'/3'-terminal; other polymer residues are internal and everything else has no position.
    pub fn assign_residue_positions(&mut self) {
        let amino = self.polymer_indices(StandardResidue::is_amino_acid);
        let nucleic = self.polymer_indices(StandardResidue::is_nucleotide);

        for (i, residue) in self.residues.iter_mut().enumerate() {
            residue.position = if amino.contains(&i) {
                terminal_position(&amino, i, ResiduePosition::NTerminal, ResiduePosition::CTerminal)
            } else if nucleic.contains(&i) {
                terminal_position(
                    &nucleic,
                    i,
                    ResiduePosition::FivePrime,
                    ResiduePosition::ThreePrime,
                )
            } else {
                ResiduePosition::None
            };
        }
    }

    fn polymer_indices(&self, predicate: fn(&StandardResidue) -> bool) -> Vec<usize> {
        self.residues
            .iter()
            .enumerate()
            .filter(|(_, r)| r.standard_name.as_ref().is_some_and(predicate))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.residues.iter().flat_map(|r| r.iter_atoms())
    }

    pub fn iter_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.residues.iter_mut().flat_map(|r| r.iter_atoms_mut())
    }
}

fn terminal_position(
    indices: &[usize],
    i: usize,
    first: ResiduePosition,
    last: ResiduePosition,
) -> ResiduePosition {
    if indices.first() == Some(&i) {
        first
    } else if indices.last() == Some(&i) {
        last
    } else {
        ResiduePosition::Internal
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain {{ id: \"{}\", residues: {} }}",
            self.id,
            self.residue_count()
        )
    }
}
