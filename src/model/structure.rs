use super::atom::Atom;
use super::chain::Chain;
use super::residue::Residue;
use super::sequence::Sequence;
use std::fmt;

/// A single model of a macromolecular structure.
///
/// Besides the chain hierarchy, the structure keeps the unit-cell vectors from `CRYST1` or
/// `_cell.*` and the declared polymer sequences, so both survive a read-repair-write cycle.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    chains: Vec<Chain>,
    sequences: Vec<Sequence>,
    pub box_vectors: Option<[[f64; 3]; 3]>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chain(&mut self, chain: Chain) {
        debug_assert!(
            self.chain(&chain.id).is_none(),
            "Attempted to add a duplicate chain ID '{}'",
            chain.id
        );
        self.chains.push(chain);
    }

    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn chain_mut(&mut self, id: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.id == id)
    }

    pub fn find_residue(
        &self,
        chain_id: &str,
        residue_id: i32,
        insertion_code: Option<char>,
    ) -> Option<&Residue> {
        self.chain(chain_id)
            .and_then(|c| c.residue(residue_id, insertion_code))
    }

    pub fn find_residue_mut(
        &mut self,
        chain_id: &str,
        residue_id: i32,
        insertion_code: Option<char>,
    ) -> Option<&mut Residue> {
        self.chain_mut(chain_id)
            .and_then(|c| c.residue_mut(residue_id, insertion_code))
    }

    /// Records the declared sequence for a chain, replacing any previous one.
    pub fn set_sequence(&mut self, sequence: Sequence) {
        self.sequences.retain(|s| s.chain_id != sequence.chain_id);
        self.sequences.push(sequence);
    }

    pub fn sequence(&self, chain_id: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.chain_id == chain_id)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residue_count()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.chains.iter().map(|c| c.iter_atoms().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter_chains(&self) -> std::slice::Iter<'_, Chain> {
        self.chains.iter()
    }

    pub fn iter_chains_mut(&mut self) -> std::slice::IterMut<'_, Chain> {
        self.chains.iter_mut()
    }

    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.chains.iter().flat_map(|c| c.iter_atoms())
    }

    pub fn iter_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.chains.iter_mut().flat_map(|c| c.iter_atoms_mut())
    }

    /// Walks every atom together with its owning chain and residue.
    ///
    /// The enumeration order defines the flat atom indices used by
    /// [`Topology`](super::topology::Topology) bonds.
    pub fn iter_atoms_with_context(&self) -> impl Iterator<Item = (&Chain, &Residue, &Atom)> {
        self.chains.iter().flat_map(|chain| {
            chain.iter_residues().flat_map(move |residue| {
                residue.iter_atoms().map(move |atom| (chain, residue, atom))
            })
        })
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Structure {{ chains: {}, residues: {}, atoms: {} }}",
            self.chain_count(),
            self.residue_count(),
            self.atom_count()
        )
    }
}

impl FromIterator<Chain> for Structure {
    fn from_iter<T: IntoIterator<Item = Chain>>(iter: T) -> Self {
        Self {
            chains: iter.into_iter().collect(),
            sequences: Vec::new(),
            box_vectors: None,
        }
    }
}
