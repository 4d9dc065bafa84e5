use super::atom::Atom;
use super::types::{Element, ResidueCategory, ResiduePosition, StandardResidue};
use std::fmt;

/// A residue keyed by sequence number and insertion code.
///
/// `name` is the label written back out. Standard residues carry their canonical name
/// (`HIS`, `CYS`) even after hydrogenation picks a protonation template such as `HIE` or
/// `CYX`; `standard_name` links the residue to that template family.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub id: i32,
    pub insertion_code: Option<char>,
    pub name: String,
    pub standard_name: Option<StandardResidue>,
    pub category: ResidueCategory,
    pub position: ResiduePosition,
    /// Whether the residue was read from (and should be written as) `HETATM` records.
    pub is_hetatm: bool,
    atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(
        id: i32,
        insertion_code: Option<char>,
        name: &str,
        standard_name: Option<StandardResidue>,
        category: ResidueCategory,
    ) -> Self {
        Self {
            id,
            insertion_code,
            name: name.to_string(),
            standard_name,
            category,
            position: ResiduePosition::None,
            is_hetatm: category != ResidueCategory::Standard,
            atoms: Vec::new(),
        }
    }

    pub fn is_standard(&self) -> bool {
        self.standard_name.is_some()
    }

    pub fn is_amino_acid(&self) -> bool {
        self.standard_name.is_some_and(|s| s.is_amino_acid())
    }

    pub fn is_nucleotide(&self) -> bool {
        self.standard_name.is_some_and(|s| s.is_nucleotide())
    }

    pub fn is_water(&self) -> bool {
        self.standard_name == Some(StandardResidue::HOH)
    }

    pub fn add_atom(&mut self, atom: Atom) {
        debug_assert!(
            self.atom(&atom.name).is_none(),
            "Attempted to add a duplicate atom name '{}' to residue '{}'",
            atom.name,
            self.name
        );
        self.atoms.push(atom);
    }

    pub fn remove_atom(&mut self, name: &str) -> Option<Atom> {
        let index = self.atoms.iter().position(|a| a.name == name)?;
        Some(self.atoms.remove(index))
    }

    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }

    pub fn atom_mut(&mut self, name: &str) -> Option<&mut Atom> {
        self.atoms.iter_mut().find(|a| a.name == name)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom(name).is_some()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter_atoms(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn iter_atoms_mut(&mut self) -> std::slice::IterMut<'_, Atom> {
        self.atoms.iter_mut()
    }

    /// Drops every atom whose name fails the predicate.
    pub fn retain_atoms<F>(&mut self, keep: F)
    where
        F: FnMut(&Atom) -> bool,
    {
        self.atoms.retain(keep);
    }

    pub fn strip_hydrogens(&mut self) {
        self.atoms.retain(|a| a.element != Element::H);
    }

    /// Formats the residue key the way PDB tooling prints it, e.g. `42` or `42A`.
    pub fn label(&self) -> String {
        match self.insertion_code {
            Some(code) => format!("{}{}", self.id, code),
            None => self.id.to_string(),
        }
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.standard_name {
            Some(std_name) if std_name.code() != self.name => write!(
                f,
                "Residue {{ id: {}, name: \"{}\" ({}), category: {}, atoms: {} }}",
                self.label(),
                self.name,
                std_name,
                self.category,
                self.atom_count()
            ),
            _ => write!(
                f,
                "Residue {{ id: {}, name: \"{}\", category: {}, atoms: {} }}",
                self.label(),
                self.name,
                self.category,
                self.atom_count()
            ),
        }
    }
}
