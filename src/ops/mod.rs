//! Structure repair passes.
//!
//! The passes are meant to run in order: [`find_missing_residues`] and [`find_missing_atoms`]
//! inspect, [`add_missing_residues`] and [`add_missing_atoms`] rebuild heavy atoms,
//! [`add_hydrogens`] protonates, and [`build_topology`] collects the explicit bonds for output.

mod error;
mod hydro;
mod repair;
mod sequence;
mod topology;

pub use error::Error;

pub use sequence::{ResidueGap, find_missing_residues};

pub use repair::{MissingAtoms, add_missing_atoms, add_missing_residues, find_missing_atoms};

pub use hydro::{HisStrategy, HydroConfig, add_hydrogens};

pub use topology::{TopologyBuilder, build_topology};
