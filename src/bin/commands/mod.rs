use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use structfix::config::FixerOptions;
use structfix::ops::HisStrategy;

pub mod convert;
pub mod fix;
pub mod logging;

/// Histidine tautomer selection exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HisArg {
    /// Always protonate ND1.
    #[value(name = "hid")]
    Hid,
    /// Always protonate NE2.
    #[value(name = "hie")]
    Hie,
    /// Protonate the nitrogen with a nearby hydrogen-bond partner.
    #[value(name = "network")]
    Network,
}

impl From<HisArg> for HisStrategy {
    fn from(arg: HisArg) -> Self {
        match arg {
            HisArg::Hid => HisStrategy::Hid,
            HisArg::Hie => HisStrategy::Hie,
            HisArg::Network => HisStrategy::Network,
        }
    }
}

/// Fixer options shared by `fix` and `fix-dir`. Flags override values from `--config`.
#[derive(Debug, Default, Args)]
pub struct OptionArgs {
    /// TOML file with fixer options.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// pH used to choose protonation states.
    #[arg(long, value_name = "PH")]
    pub ph: Option<f64>,
    /// Histidine tautomer strategy.
    #[arg(long, value_enum)]
    pub his: Option<HisArg>,
    /// File-name substring that excludes a file from directory runs (repeatable).
    #[arg(long = "exclude", value_name = "SUBSTRING")]
    pub exclude: Vec<String>,
    /// Remove crystallographic water.
    #[arg(long)]
    pub no_water: bool,
    /// Do not insert residues missing from the coordinates.
    #[arg(long)]
    pub no_residues: bool,
    /// Do not add hydrogens.
    #[arg(long)]
    pub no_hydrogens: bool,
}

impl OptionArgs {
    pub fn resolve(&self) -> Result<FixerOptions> {
        let mut options = match &self.config {
            Some(path) => FixerOptions::from_path(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => FixerOptions::default(),
        };

        if let Some(ph) = self.ph {
            options.ph = ph;
        }
        if let Some(his) = self.his {
            options.his_strategy = his.into();
        }
        if !self.exclude.is_empty() {
            options.exclude = self.exclude.clone();
        }
        if self.no_water {
            options.keep_water = false;
        }
        if self.no_residues {
            options.add_residues = false;
        }
        if self.no_hydrogens {
            options.add_hydrogens = false;
        }
        Ok(options)
    }
}

/// Runs `work` behind a spinner that reports success or failure when it completes.
pub fn run_with_spinner<T, E, F>(message: &str, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

/// Progress bar for a batch of `len` files.
pub fn batch_progress(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}
