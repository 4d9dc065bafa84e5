use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use structfix::operations::{collect_candidates, fix_candidates, fix_single_pdb};

use crate::commands::{OptionArgs, batch_progress, run_with_spinner};

/// Repairs a single PDB file.
#[derive(Debug, Args)]
pub struct FixArgs {
    /// PDB file to repair.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    #[command(flatten)]
    pub options: OptionArgs,
}

/// Repairs every eligible PDB file below a directory.
#[derive(Debug, Args)]
pub struct FixDirArgs {
    /// Directory to walk recursively.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
    #[command(flatten)]
    pub options: OptionArgs,
}

pub fn run_single(args: &FixArgs) -> Result<()> {
    let options = args.options.resolve()?;
    let output = run_with_spinner("Repairing structure", || fix_single_pdb(&args.file, &options))?;
    println!("{}", output.display());
    Ok(())
}

pub fn run_directory(args: &FixDirArgs) -> Result<()> {
    let options = args.options.resolve()?;
    let candidates = collect_candidates(&args.dir, &options.directory_filter())?;

    let bar = batch_progress(candidates.files.len());
    let report = fix_candidates(candidates, &options, |file| {
        bar.set_message(file.display().to_string());
        bar.inc(1);
    });
    bar.finish_and_clear();

    println!(
        "Repaired {} file(s), skipped {}, failed {}",
        report.written.len(),
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("  {failure}");
    }

    if !report.is_success() {
        bail!("{} file(s) could not be repaired", report.failures.len());
    }
    Ok(())
}
