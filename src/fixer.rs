//! Stateful front-end over the repair passes.
//!
//! [`PdbFixer`] owns one structure and remembers what the `find_*` calls reported, so the
//! `add_*` calls can act on exactly those findings. The usual call order is
//! `find_missing_residues`, `find_missing_atoms`, `add_missing_atoms`, `add_missing_hydrogens`.

use crate::io::{self, IoContext};
use crate::model::{structure::Structure, topology::Topology};
use crate::ops::{self, HisStrategy, HydroConfig, MissingAtoms, ResidueGap};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PdbFixer {
    structure: Structure,
    missing_residues: Vec<ResidueGap>,
    missing_atoms: Vec<MissingAtoms>,
    his_strategy: HisStrategy,
}

impl PdbFixer {
    pub fn new(structure: Structure) -> Self {
        Self {
            structure,
            missing_residues: Vec::new(),
            missing_atoms: Vec::new(),
            his_strategy: HisStrategy::default(),
        }
    }

    /// Loads a PDB file with the default residue-name normalization.
    pub fn from_pdb_file(path: &Path) -> Result<Self, io::Error> {
        io::read_pdb_file(path, &IoContext::new_default()).map(Self::new)
    }

    pub fn with_his_strategy(mut self, strategy: HisStrategy) -> Self {
        self.his_strategy = strategy;
        self
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn into_structure(self) -> Structure {
        self.structure
    }

    /// Drops every water residue and returns how many were removed.
    pub fn remove_water(&mut self) -> usize {
        let before = self.structure.residue_count();
        for chain in self.structure.iter_chains_mut() {
            chain.retain_residues(|r| !r.is_water());
        }
        let removed = before - self.structure.residue_count();
        debug!(removed, "removed water residues");
        removed
    }

    /// Aligns each chain's declared sequence against its residues and records the gaps.
    pub fn find_missing_residues(&mut self) -> &[ResidueGap] {
        self.missing_residues = ops::find_missing_residues(&self.structure);
        debug!(
            gaps = self.missing_residues.len(),
            residues = self.missing_residues.iter().map(ResidueGap::len).sum::<usize>(),
            "found missing residues"
        );
        &self.missing_residues
    }

    /// Records the heavy atoms each standard residue lacks relative to its template.
    pub fn find_missing_atoms(&mut self) -> &[MissingAtoms] {
        self.missing_atoms = ops::find_missing_atoms(&self.structure);
        debug!(
            residues = self.missing_atoms.len(),
            atoms = self.missing_atoms.iter().map(|m| m.atom_names.len()).sum::<usize>(),
            "found missing heavy atoms"
        );
        &self.missing_atoms
    }

    /// Inserts the recorded missing residues, then rebuilds the recorded missing atoms plus
    /// whatever the inserted residues still lack.
    ///
    /// Only findings from earlier `find_*` calls are acted on, and they are consumed. Without
    /// those calls nothing is added.
    pub fn add_missing_atoms(&mut self) -> Result<(), ops::Error> {
        let gaps = std::mem::take(&mut self.missing_residues);
        let mut pending = std::mem::take(&mut self.missing_atoms);

        let inserted = ops::add_missing_residues(&mut self.structure, &gaps)?;
        debug!(inserted = inserted.len(), "added missing residues");
        pending.extend(inserted);

        let added = ops::add_missing_atoms(&mut self.structure, &pending)?;
        debug!(added, "added missing heavy atoms");
        Ok(())
    }

    /// Protonates the structure for the given pH, replacing any existing hydrogens.
    pub fn add_missing_hydrogens(&mut self, ph: f64) -> Result<usize, ops::Error> {
        let config = HydroConfig {
            target_ph: ph,
            his_strategy: self.his_strategy,
            ..HydroConfig::default()
        };
        let added = ops::add_hydrogens(&mut self.structure, &config)?;
        debug!(added, ph, "added hydrogens");
        Ok(added)
    }

    /// Finishes the session, attaching the bonds that must be written as `CONECT` records.
    pub fn into_topology(self) -> Topology {
        let topology = ops::build_topology(self.structure);
        debug!(bonds = topology.bond_count(), "built topology");
        topology
    }
}
