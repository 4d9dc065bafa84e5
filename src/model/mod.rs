//! Core data structures describing a macromolecular model.
//!
//! Readers build these types, the fixer passes mutate them in place, and the PDB writer
//! serializes them back out.

pub mod atom;
pub mod chain;
pub mod residue;
pub mod sequence;
pub mod structure;
pub mod topology;
pub mod types;
