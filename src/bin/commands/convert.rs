use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use structfix::operations::convert_cif_to_pdb;

use crate::commands::run_with_spinner;

/// Converts an mmCIF file to PDB.
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Source mmCIF file.
    #[arg(value_name = "CIF")]
    pub cif: PathBuf,
    /// Destination PDB file; overwritten if present.
    #[arg(value_name = "PDB")]
    pub pdb: PathBuf,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    run_with_spinner("Converting structure", || {
        convert_cif_to_pdb(&args.cif, &args.pdb)
    })?;
    Ok(())
}
