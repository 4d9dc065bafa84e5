//! Explicit bond inference for the `CONECT` section of a repaired structure.
//!
//! Standard polymer connectivity is implied by residue and atom names, so only two kinds of
//! bonds are collected: disulfide bridges between cysteine SG atoms, and covalent contacts
//! involving hetero residues (both within the residue and to neighbouring polymer or hetero
//! atoms). Water and ions never receive bonds.

use crate::model::{
    atom::Atom,
    residue::Residue,
    structure::Structure,
    topology::{Bond, Topology},
    types::{Element, ResidueCategory, StandardResidue},
};
use crate::ops::hydro::DISULFIDE_SG_THRESHOLD;
use std::collections::BTreeSet;

const DEFAULT_BOND_TOLERANCE: f64 = 0.4;
/// Contacts closer than this are treated as overlapping atoms rather than bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

/// Builder for the bond list attached to a [`Topology`].
///
/// Cutoffs default to the values used throughout the fixer and can be tuned before
/// calling [`TopologyBuilder::build`].
pub struct TopologyBuilder {
    disulfide_cutoff: f64,
    bond_tolerance: f64,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self {
            disulfide_cutoff: DISULFIDE_SG_THRESHOLD,
            bond_tolerance: DEFAULT_BOND_TOLERANCE,
        }
    }
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum SG···SG distance, in Å, for a disulfide bond.
    pub fn disulfide_cutoff(mut self, cutoff: f64) -> Self {
        self.disulfide_cutoff = cutoff;
        self
    }

    /// Sets the slack, in Å, added to the sum of covalent radii when inferring hetero bonds.
    pub fn bond_tolerance(mut self, tolerance: f64) -> Self {
        self.bond_tolerance = tolerance;
        self
    }

    /// Consumes the structure and pairs it with its explicit bonds.
    ///
    /// Bond indices follow the order of [`Structure::iter_atoms`].
    pub fn build(self, structure: Structure) -> Topology {
        let atoms = index_atoms(&structure);
        let mut bonds = BTreeSet::new();

        let sulfurs: Vec<&IndexedAtom> = atoms.iter().filter(|a| a.is_cysteine_sulfur()).collect();
        let cutoff_sq = self.disulfide_cutoff * self.disulfide_cutoff;
        for (i, sg1) in sulfurs.iter().enumerate() {
            for sg2 in &sulfurs[i + 1..] {
                if sg1.atom.distance_squared(sg2.atom) <= cutoff_sq {
                    bonds.insert(Bond::new(sg1.index, sg2.index));
                }
            }
        }

        let linkable: Vec<&IndexedAtom> = atoms.iter().filter(|a| a.kind != Kind::Inert).collect();
        for hetero in atoms.iter().filter(|a| a.kind == Kind::Hetero) {
            for other in &linkable {
                if other.index != hetero.index && self.is_covalent(hetero.atom, other.atom) {
                    bonds.insert(Bond::new(hetero.index, other.index));
                }
            }
        }

        Topology::new(structure, bonds.into_iter().collect())
    }

    fn is_covalent(&self, a: &Atom, b: &Atom) -> bool {
        if a.is_hydrogen() && b.is_hydrogen() {
            return false;
        }
        if a.element == Element::Unknown || b.element == Element::Unknown {
            return false;
        }

        let max = a.element.covalent_radius() + b.element.covalent_radius() + self.bond_tolerance;
        let distance = a.distance(b);
        distance > MIN_BOND_DISTANCE && distance <= max
    }
}

/// Builds the topology with default cutoffs.
pub fn build_topology(structure: Structure) -> Topology {
    TopologyBuilder::new().build(structure)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Polymer,
    Hetero,
    /// Water and ions.
    Inert,
}

struct IndexedAtom<'a> {
    index: usize,
    kind: Kind,
    residue: &'a Residue,
    atom: &'a Atom,
}

impl IndexedAtom<'_> {
    fn is_cysteine_sulfur(&self) -> bool {
        self.residue.standard_name == Some(StandardResidue::CYS) && self.atom.name == "SG"
    }
}

fn index_atoms(structure: &Structure) -> Vec<IndexedAtom<'_>> {
    structure
        .iter_chains()
        .flat_map(|chain| chain.iter_residues())
        .flat_map(|residue| {
            let kind = if residue.is_water() || residue.category == ResidueCategory::Ion {
                Kind::Inert
            } else if residue.category == ResidueCategory::Hetero {
                Kind::Hetero
            } else {
                Kind::Polymer
            };
            residue.iter_atoms().map(move |atom| (kind, residue, atom))
        })
        .enumerate()
        .map(|(index, (kind, residue, atom))| IndexedAtom {
            index,
            kind,
            residue,
            atom,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{chain::Chain, types::Point};

    fn residue(
        id: i32,
        name: &str,
        category: ResidueCategory,
        atoms: &[(&str, Element, [f64; 3])],
    ) -> Residue {
        let standard = name.parse::<StandardResidue>().ok();
        let mut residue = Residue::new(id, None, name, standard, category);
        for (atom_name, element, [x, y, z]) in atoms {
            residue.add_atom(Atom::new(atom_name, *element, Point::new(*x, *y, *z)));
        }
        residue
    }

    fn structure(residues: Vec<Residue>) -> Structure {
        let mut chain = Chain::new("A");
        for r in residues {
            chain.add_residue(r);
        }
        let mut structure = Structure::new();
        structure.add_chain(chain);
        structure
    }

    fn pairs(topology: &Topology) -> Vec<(usize, usize)> {
        topology.bonds().iter().map(|b| (b.a1_idx, b.a2_idx)).collect()
    }

    #[test]
    fn disulfide_bridges_pair_close_cysteine_sulfurs() {
        let cys = |id: i32, x: f64| {
            residue(
                id,
                "CYS",
                ResidueCategory::Standard,
                &[("CB", Element::C, [x, 1.8, 0.0]), ("SG", Element::S, [x, 0.0, 0.0])],
            )
        };
        let topology = build_topology(structure(vec![cys(1, 0.0), cys(2, 2.05), cys(3, 8.0)]));

        assert_eq!(pairs(&topology), vec![(1, 3)]);
    }

    #[test]
    fn disulfide_cutoff_is_configurable() {
        let cys = |id: i32, x: f64| {
            residue(id, "CYS", ResidueCategory::Standard, &[("SG", Element::S, [x, 0.0, 0.0])])
        };
        let topology = TopologyBuilder::new()
            .disulfide_cutoff(1.5)
            .build(structure(vec![cys(1, 0.0), cys(2, 2.05)]));

        assert!(topology.bonds().is_empty());
    }

    #[test]
    fn hetero_residues_bond_by_covalent_radii() {
        let ligand = residue(
            50,
            "LIG",
            ResidueCategory::Hetero,
            &[
                ("C1", Element::C, [0.0, 0.0, 0.0]),
                ("C2", Element::C, [1.5, 0.0, 0.0]),
                ("O1", Element::O, [1.5, 1.4, 0.0]),
                ("H1", Element::H, [-1.0, 0.0, 0.0]),
                ("H2", Element::H, [-1.0, 0.7, 0.0]),
            ],
        );
        let topology = build_topology(structure(vec![ligand]));

        assert_eq!(pairs(&topology), vec![(0, 1), (0, 3), (0, 4), (1, 2)]);
    }

    #[test]
    fn hetero_links_reach_polymer_but_not_water_or_ions() {
        let lys = residue(
            1,
            "LYS",
            ResidueCategory::Standard,
            &[("CE", Element::C, [-1.5, 0.0, 0.0]), ("NZ", Element::N, [0.0, 0.0, 0.0])],
        );
        let ligand = residue(2, "LIG", ResidueCategory::Hetero, &[("C1", Element::C, [1.45, 0.0, 0.0])]);
        let water = residue(3, "HOH", ResidueCategory::Standard, &[("O", Element::O, [1.45, 1.2, 0.0])]);
        let zinc = residue(4, "ZN", ResidueCategory::Ion, &[("ZN", Element::Zn, [1.45, -1.9, 0.0])]);

        let topology = build_topology(structure(vec![lys, ligand, water, zinc]));

        assert_eq!(pairs(&topology), vec![(1, 2)]);
        assert_eq!(topology.neighbors_of(2).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn polymer_only_structure_has_no_explicit_bonds() {
        let ala = residue(
            1,
            "ALA",
            ResidueCategory::Standard,
            &[("N", Element::N, [0.0, 0.0, 0.0]), ("CA", Element::C, [1.458, 0.0, 0.0])],
        );
        let topology = build_topology(structure(vec![ala]));

        assert!(topology.bonds().is_empty());
        assert_eq!(topology.atom_count(), 2);
    }

    #[test]
    fn unknown_elements_and_overlaps_are_ignored() {
        let ligand = residue(
            1,
            "LIG",
            ResidueCategory::Hetero,
            &[
                ("X1", Element::Unknown, [0.0, 0.0, 0.0]),
                ("C1", Element::C, [1.0, 0.0, 0.0]),
                ("C2", Element::C, [1.1, 0.0, 0.0]),
            ],
        );
        let topology = build_topology(structure(vec![ligand]));

        assert!(topology.bonds().is_empty());
    }
}
