//! Structure file readers and writers.
//!
//! Stream-level functions (`read_*_structure`, `write_pdb_*`) work on any `BufRead`/`Write`;
//! the `*_file` helpers wrap them with buffered file handles and attach the path to every
//! error they return.

mod builder;
mod context;
mod error;
mod mmcif;
mod pdb;

use crate::model::{structure::Structure, topology::Topology};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub use pdb::reader::read as read_pdb_structure;
pub use pdb::writer::{
    write_structure as write_pdb_structure, write_topology as write_pdb_topology,
};

pub use mmcif::reader::read as read_mmcif_structure;

pub use context::IoContext;

pub use error::Error;

/// Reads a PDB file from disk.
pub fn read_pdb_file(path: &Path, context: &IoContext) -> Result<Structure, Error> {
    let reader = open(path)?;
    read_pdb_structure(reader, context).map_err(|e| e.with_path(path))
}

/// Reads an mmCIF file from disk.
pub fn read_mmcif_file(path: &Path, context: &IoContext) -> Result<Structure, Error> {
    let reader = open(path)?;
    read_mmcif_structure(reader, context).map_err(|e| e.with_path(path))
}

/// Writes a structure to `path` as PDB, replacing any existing file.
pub fn write_pdb_file(path: &Path, structure: &Structure) -> Result<(), Error> {
    let writer = create(path)?;
    write_pdb_structure(writer, structure).map_err(|e| e.with_path(path))
}

/// Writes a topology (coordinates plus `CONECT` records) to `path` as PDB.
pub fn write_pdb_topology_file(path: &Path, topology: &Topology) -> Result<(), Error> {
    let writer = create(path)?;
    write_pdb_topology(writer, topology).map_err(|e| e.with_path(path))
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::from_io(e, Some(path.to_path_buf())))
}

fn create(path: &Path) -> Result<BufWriter<File>, Error> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::from_io(e, Some(path.to_path_buf())))
}
