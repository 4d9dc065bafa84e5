//! Options shared by the file-level operations.
//!
//! Options can be built in code or loaded from a TOML file whose keys are the kebab-case
//! field names:
//!
//! ```toml
//! ph = 7.4
//! his-strategy = "hie"
//! keep-water = false
//! exclude = ["cfg", "tmp"]
//! ```

use crate::ops::HisStrategy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PDB_SUFFIX: &str = ".pdb";
const FIXED_SUFFIX: &str = ".fixed.pdb";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config{}: {source}", location(path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in '{}'", p.display()))
        .unwrap_or_default()
}

/// Tunables for a repair run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FixerOptions {
    /// pH used to choose protonation states.
    pub ph: f64,
    pub his_strategy: HisStrategy,
    /// Keep crystallographic water in the output.
    pub keep_water: bool,
    /// Insert residues declared in the sequence header but missing from the coordinates.
    pub add_residues: bool,
    pub add_hydrogens: bool,
    /// File-name substrings that exclude a file from directory runs.
    pub exclude: Vec<String>,
}

impl Default for FixerOptions {
    fn default() -> Self {
        Self {
            ph: 7.0,
            his_strategy: HisStrategy::Network,
            keep_water: true,
            add_residues: true,
            add_hydrogens: true,
            exclude: vec!["cfg".to_string()],
        }
    }
}

impl FixerOptions {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    pub fn directory_filter(&self) -> DirectoryFilter {
        DirectoryFilter {
            exclude_substrings: self.exclude.clone(),
        }
    }
}

/// Decides which files a directory run picks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub exclude_substrings: Vec<String>,
}

impl Default for DirectoryFilter {
    fn default() -> Self {
        FixerOptions::default().directory_filter()
    }
}

impl DirectoryFilter {
    /// A file qualifies when it has a `.pdb` extension (any case), is not already a
    /// `.fixed.pdb` output, and contains none of the excluded substrings.
    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        lower.ends_with(PDB_SUFFIX)
            && !lower.ends_with(FIXED_SUFFIX)
            && !self
                .exclude_substrings
                .iter()
                .any(|s| !s.is_empty() && file_name.contains(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let options = FixerOptions::from_toml_str("").expect("parse");
        assert_eq!(options, FixerOptions::default());
        assert_eq!(options.ph, 7.0);
        assert_eq!(options.exclude, vec!["cfg".to_string()]);
    }

    #[test]
    fn kebab_case_keys_override_defaults() {
        let options = FixerOptions::from_toml_str(
            "ph = 5.5\nhis-strategy = \"hid\"\nkeep-water = false\nexclude = []\n",
        )
        .expect("parse");

        assert_eq!(options.ph, 5.5);
        assert_eq!(options.his_strategy, HisStrategy::Hid);
        assert!(!options.keep_water);
        assert!(options.add_hydrogens);
        assert!(options.exclude.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FixerOptions::from_toml_str("temperature = 300").expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn from_path_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            FixerOptions::from_path(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "ph = \"acidic\"").expect("write fixture");
        let err = FixerOptions::from_path(&broken).expect_err("wrong type");
        assert!(err.to_string().contains("broken.toml"));

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "add-residues = false").expect("write fixture");
        assert!(!FixerOptions::from_path(&good).expect("parse").add_residues);
    }

    #[test]
    fn filter_accepts_pdb_files_case_insensitively() {
        let filter = DirectoryFilter::default();

        assert!(filter.accepts("a.pdb"));
        assert!(filter.accepts("b.PDB"));
        assert!(filter.accepts("x.Pdb"));
        assert!(!filter.accepts("notes.txt"));
        assert!(!filter.accepts("model.pdb.gz"));
    }

    #[test]
    fn filter_skips_outputs_and_excluded_names() {
        let filter = DirectoryFilter::default();

        assert!(!filter.accepts("a.fixed.pdb"));
        assert!(!filter.accepts("a.FIXED.PDB"));
        assert!(!filter.accepts("run_cfg.pdb"));
        assert!(!filter.accepts("sim_cfg.pdb"));

        let custom = DirectoryFilter {
            exclude_substrings: vec!["tmp".to_string()],
        };
        assert!(custom.accepts("run_cfg.pdb"));
        assert!(!custom.accepts("tmp_model.pdb"));
    }
}
