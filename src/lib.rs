//! # structfix
//!
//! **structfix** converts mmCIF files to PDB and repairs PDB files in place of a manual
//! preparation step: residues declared in `SEQRES` but absent from the coordinates are
//! rebuilt, incomplete side chains and termini are completed from curated templates, and
//! hydrogens are added for a chosen pH. Whole directory trees can be processed with
//! per-file failure isolation.
//!
//! ## Features
//!
//! - **File-level operations** – [`operations::convert_cif_to_pdb`], [`operations::fix_single_pdb`], and [`operations::fix_pdb_directory_recursive`] each return a classified [`operations::FixError`].
//! - **Fixer session** – [`fixer::PdbFixer`] runs the find/add repair steps on one structure and hands back a [`Topology`] ready for writing.
//! - **Embedded templates** – Idealized TOML templates for every standard amino acid and its protonation variants, the RNA and DNA nucleotides, and water are compiled into the binary.
//! - **Buffered I/O** – PDB and mmCIF readers normalize residue aliases through [`io::IoContext`] and report line-accurate diagnostics.
//! - **Configurable runs** – [`config::FixerOptions`] can be loaded from TOML and controls pH, histidine tautomers, water, and directory exclusions.

mod db;
mod model;

pub mod config;
pub mod fixer;
pub mod io;
pub mod operations;
pub mod ops;

pub use model::atom::Atom;
pub use model::chain::Chain;
pub use model::residue::Residue;
pub use model::sequence::Sequence;
pub use model::structure::Structure;
pub use model::topology::{Bond, Topology};
pub use model::types::{Element, Point, ResidueCategory, ResiduePosition, StandardResidue};
