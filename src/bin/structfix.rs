use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::{convert, fix, logging};

#[derive(Parser, Debug)]
#[command(
    name = "structfix",
    about = "Convert mmCIF files to PDB and repair PDB files by adding missing residues, atoms, and hydrogens.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Silence all log output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Also write logs to this file.
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an mmCIF file to PDB.
    Convert(convert::ConvertArgs),
    /// Repair one PDB file, writing a `.fixed.pdb` sibling.
    Fix(fix::FixArgs),
    /// Repair every eligible PDB file below a directory.
    FixDir(fix::FixDirArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    match cli.command {
        Command::Convert(args) => convert::run(&args),
        Command::Fix(args) => fix::run_single(&args),
        Command::FixDir(args) => fix::run_directory(&args),
    }
}
