//! File-level entry points: mmCIF conversion, single-file repair, and directory repair.
//!
//! Every function returns a [`FixError`] classified by [`ErrorKind`]. Directory runs isolate
//! per-file failures in a [`BatchReport`] instead of aborting.

use crate::config::{DirectoryFilter, FixerOptions};
use crate::fixer::PdbFixer;
use crate::io::{self, IoContext};
use crate::ops;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const PDB_TOKEN: &str = ".pdb";
const FIXED_TAG: &str = ".fixed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Parse,
    Repair,
    Write,
}

#[derive(Debug, Error)]
pub enum FixError {
    #[error("invalid input '{path}': {reason}", path = path.display())]
    Validation { path: PathBuf, reason: String },

    #[error("failed to read '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to repair '{path}': {source}", path = path.display())]
    Repair {
        path: PathBuf,
        #[source]
        source: ops::Error,
    },

    #[error("failed to write '{path}': {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FixError {
    pub fn validation(path: &Path, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Repair { .. } => ErrorKind::Repair,
            Self::Write { .. } => ErrorKind::Write,
        }
    }

    /// The file the failure concerns: the input for validation, parse, and repair errors,
    /// the destination for write errors.
    pub fn path(&self) -> &Path {
        match self {
            Self::Validation { path, .. }
            | Self::Parse { path, .. }
            | Self::Repair { path, .. }
            | Self::Write { path, .. } => path,
        }
    }
}

/// Outcome of a directory run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Output files written, in processing order.
    pub written: Vec<PathBuf>,
    pub failures: Vec<FixError>,
    /// Files that did not pass the [`DirectoryFilter`].
    pub skipped: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.written.len() + self.failures.len()
    }
}

/// Converts an mmCIF file to PDB, overwriting `pdb_file` if it exists.
pub fn convert_cif_to_pdb(cif_file: &Path, pdb_file: &Path) -> Result<(), FixError> {
    if !cif_file.is_file() {
        return Err(FixError::validation(cif_file, "not an existing file"));
    }

    let structure =
        io::read_mmcif_file(cif_file, &IoContext::new_default()).map_err(|source| FixError::Parse {
            path: cif_file.to_path_buf(),
            source,
        })?;
    io::write_pdb_file(pdb_file, &structure).map_err(|source| FixError::Write {
        path: pdb_file.to_path_buf(),
        source,
    })?;

    info!("Saved PDB to {}", pdb_file.display());
    Ok(())
}

/// Derives the repair output path: `.fixed` goes before the first `.pdb` in the file name,
/// matched case-insensitively and keeping the original case.
///
/// `model.pdb` becomes `model.fixed.pdb`, `b.PDB` becomes `b.fixed.PDB`, and `a.pdb.pdb`
/// becomes `a.fixed.pdb.pdb`. Returns `None` when the path has no file name or the name is
/// not valid UTF-8.
pub fn fixed_output_path(input: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_str()?;

    let fixed_name = match name.to_ascii_lowercase().find(PDB_TOKEN) {
        Some(at) => format!("{}{FIXED_TAG}{}", &name[..at], &name[at..]),
        None => format!("{name}{FIXED_TAG}{PDB_TOKEN}"),
    };
    Some(input.with_file_name(fixed_name))
}

/// Repairs one PDB file and writes the result next to it; see [`fixed_output_path`].
///
/// Returns the output path. A failure is logged once before it is returned.
pub fn fix_single_pdb(pdb_file: &Path, options: &FixerOptions) -> Result<PathBuf, FixError> {
    fix_file(pdb_file, options)
        .inspect_err(|e| error!("Error processing {}: {e}", pdb_file.display()))
}

fn fix_file(pdb_file: &Path, options: &FixerOptions) -> Result<PathBuf, FixError> {
    if !pdb_file.is_file() {
        return Err(FixError::validation(pdb_file, "not an existing file"));
    }
    let Some(name) = pdb_file.file_name().and_then(|n| n.to_str()) else {
        return Err(FixError::validation(pdb_file, "file name is not valid UTF-8"));
    };
    if !name.to_ascii_lowercase().ends_with(PDB_TOKEN) {
        return Err(FixError::validation(pdb_file, "expected a .pdb file"));
    }
    let output = fixed_output_path(pdb_file)
        .ok_or_else(|| FixError::validation(pdb_file, "cannot derive an output file name"))?;

    repair_to(pdb_file, &output, options)?;

    info!("Fixed PDB saved to {}", output.display());
    Ok(output)
}

fn repair_to(input: &Path, output: &Path, options: &FixerOptions) -> Result<(), FixError> {
    let repair_err = |source| FixError::Repair {
        path: input.to_path_buf(),
        source,
    };

    let mut fixer = PdbFixer::from_pdb_file(input)
        .map_err(|source| FixError::Parse {
            path: input.to_path_buf(),
            source,
        })?
        .with_his_strategy(options.his_strategy);

    if !options.keep_water {
        fixer.remove_water();
    }
    if options.add_residues {
        fixer.find_missing_residues();
    }
    fixer.find_missing_atoms();
    fixer.add_missing_atoms().map_err(repair_err)?;
    if options.add_hydrogens {
        fixer.add_missing_hydrogens(options.ph).map_err(repair_err)?;
    }

    let topology = fixer.into_topology();
    io::write_pdb_topology_file(output, &topology).map_err(|source| FixError::Write {
        path: output.to_path_buf(),
        source,
    })
}

/// Repairs every eligible PDB file below `base_dir`.
///
/// Candidates are gathered depth-first with entries sorted by name before any file is
/// touched, so outputs written during the run are never picked up. A failing file is
/// logged and recorded in the report; the run continues with the next one.
pub fn fix_pdb_directory_recursive(
    base_dir: &Path,
    options: &FixerOptions,
) -> Result<BatchReport, FixError> {
    let candidates = collect_candidates(base_dir, &options.directory_filter())?;
    let report = fix_candidates(candidates, options, |_| {});

    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        skipped = report.skipped,
        "finished {}",
        base_dir.display()
    );
    Ok(report)
}

/// Repairs already collected candidates in order, calling `on_file` before each one.
///
/// Each failing file is logged once as a warning and recorded in the report.
pub fn fix_candidates(
    candidates: Candidates,
    options: &FixerOptions,
    mut on_file: impl FnMut(&Path),
) -> BatchReport {
    let mut report = BatchReport {
        skipped: candidates.skipped,
        failures: candidates.unreadable,
        ..BatchReport::default()
    };
    for file in candidates.files {
        on_file(&file);
        match fix_file(&file, options) {
            Ok(output) => report.written.push(output),
            Err(e) => {
                warn!("Skipping {}: {e}", file.display());
                report.failures.push(e);
            }
        }
    }
    report
}

/// Files a directory run will process, plus what the walk had to leave out.
#[derive(Debug, Default)]
pub struct Candidates {
    pub files: Vec<PathBuf>,
    pub skipped: usize,
    /// Subdirectories that could not be listed.
    pub unreadable: Vec<FixError>,
}

/// Walks `base_dir` depth-first in name order and splits its files by `filter`.
///
/// Symbolic links to directories are not followed.
pub fn collect_candidates(base_dir: &Path, filter: &DirectoryFilter) -> Result<Candidates, FixError> {
    if !base_dir.is_dir() {
        return Err(FixError::validation(base_dir, "not an existing directory"));
    }

    let mut candidates = Candidates::default();
    let entries = sorted_entries(base_dir)
        .map_err(|e| FixError::validation(base_dir, format!("cannot list directory: {e}")))?;
    walk(entries, filter, &mut candidates);
    debug!(
        candidates = candidates.files.len(),
        skipped = candidates.skipped,
        "collected directory candidates"
    );
    Ok(candidates)
}

fn walk(entries: Vec<(PathBuf, FileType)>, filter: &DirectoryFilter, candidates: &mut Candidates) {
    for (path, file_type) in entries {
        if file_type.is_dir() {
            match sorted_entries(&path) {
                Ok(children) => walk(children, filter, candidates),
                Err(e) => {
                    warn!("Cannot list {}: {e}", path.display());
                    candidates.unreadable.push(FixError::validation(
                        &path,
                        format!("cannot list directory: {e}"),
                    ));
                }
            }
            continue;
        }

        // Symlinked directories are never entered; symlinked files are treated as files.
        if file_type.is_symlink() && !path.is_file() {
            debug!("Not following {}", path.display());
            continue;
        }

        let accepted = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| filter.accepts(name));
        if accepted {
            candidates.files.push(path);
        } else {
            candidates.skipped += 1;
        }
    }
}

/// Lists a directory sorted by path, with each entry's own file type (symlinks unresolved).
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<(PathBuf, FileType)>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLY_PDB: &str = "\
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
ATOM      2  CA  GLY A   1       1.458   0.000   0.000  1.00  0.00           C
ATOM      3  C   GLY A   1       2.005   1.424   0.000  1.00  0.00           C
ATOM      4  O   GLY A   1       2.986   1.716   0.681  1.00  0.00           O
END
";

    const RNA_PDB: &str = "\
ATOM      1  C4'   G A   1       1.524   0.000   0.000  1.00  0.00           C
ATOM      2  C3'   G A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      3  O3'   G A   1      -0.524  -1.182   0.594  1.00  0.00           O
ATOM      4  C1'   G A   1       0.853   2.188   0.506  1.00  0.00           C
ATOM      5  P     C A   2       2.830   1.323   2.654  1.00  0.00           P
ATOM      6  C4'   C A   2       2.524   2.000   6.500  1.00  0.00           C
ATOM      7  C1'   C A   2       1.853   4.188   7.006  1.00  0.00           C
END
";

    const GLY_CIF: &str = "\
data_test
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.type_symbol
_atom_site.label_atom_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_seq_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
_atom_site.pdbx_PDB_model_num
ATOM 1 N N GLY A 1 0.000 0.000 0.000 1
ATOM 2 C CA GLY A 1 1.458 0.000 0.000 1
";

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("list dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn fixed_output_path_replaces_first_token_only() {
        assert_eq!(
            fixed_output_path(Path::new("model.pdb")),
            Some(PathBuf::from("model.fixed.pdb"))
        );
        assert_eq!(
            fixed_output_path(Path::new("a.pdb.pdb")),
            Some(PathBuf::from("a.fixed.pdb.pdb"))
        );
        assert_eq!(
            fixed_output_path(Path::new("runs/b.PDB")),
            Some(PathBuf::from("runs/b.fixed.PDB"))
        );
        assert_eq!(
            fixed_output_path(Path::new("x.pdb.d/x.Pdb")),
            Some(PathBuf::from("x.pdb.d/x.fixed.Pdb"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_rejected_without_writing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"mod\xffel.pdb");
        assert_eq!(fixed_output_path(Path::new(name)), None);
        assert_eq!(fixed_output_path(Path::new("/")), None);

        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join(name);
        if fs::write(&input, GLY_PDB).is_err() {
            // Some filesystems refuse non-UTF-8 names outright.
            return;
        }

        let err = fix_single_pdb(&input, &FixerOptions::default()).expect_err("undecodable name");

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(fs::read_dir(dir.path()).expect("list dir").count(), 1);
    }

    #[test]
    fn convert_writes_readable_pdb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cif = dir.path().join("in.cif");
        let pdb = dir.path().join("out.pdb");
        fs::write(&cif, GLY_CIF).expect("write fixture");
        fs::write(&pdb, "stale").expect("write stale output");

        convert_cif_to_pdb(&cif, &pdb).expect("conversion succeeds");

        let structure = io::read_pdb_file(&pdb, &IoContext::new_default()).expect("re-read");
        assert_eq!(structure.atom_count(), 2);
    }

    #[test]
    fn convert_classifies_missing_and_malformed_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdb = dir.path().join("out.pdb");

        let missing = convert_cif_to_pdb(&dir.path().join("absent.cif"), &pdb).expect_err("missing");
        assert_eq!(missing.kind(), ErrorKind::Validation);

        let empty = dir.path().join("empty.cif");
        fs::write(&empty, "data_empty\n").expect("write fixture");
        let err = convert_cif_to_pdb(&empty, &pdb).expect_err("no atoms");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!pdb.exists());
    }

    #[test]
    fn fix_single_pdb_writes_sibling_with_hydrogens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("model.pdb");
        fs::write(&input, GLY_PDB).expect("write fixture");

        let output = fix_single_pdb(&input, &FixerOptions::default()).expect("repair succeeds");

        assert_eq!(output, dir.path().join("model.fixed.pdb"));
        let repaired = io::read_pdb_file(&output, &IoContext::new_default()).expect("re-read");
        let gly = repaired.find_residue("A", 1, None).expect("residue kept");
        for name in ["H1", "H2", "H3", "HA2", "HA3"] {
            assert!(gly.has_atom(name), "missing {name}");
        }
    }

    #[test]
    fn fix_single_pdb_completes_rna_atoms_and_hydrogens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("rna.pdb");
        fs::write(&input, RNA_PDB).expect("write fixture");

        let output = fix_single_pdb(&input, &FixerOptions::default()).expect("repair succeeds");

        let repaired = io::read_pdb_file(&output, &IoContext::new_default()).expect("re-read");
        assert!(repaired.atom_count() > 40);
        let g = repaired.find_residue("A", 1, None).expect("G kept");
        for name in ["O5'", "C5'", "O2'", "N9", "O6", "N2", "H8", "H1'", "HO5'"] {
            assert!(g.has_atom(name), "G lacks {name}");
        }
        assert!(!g.has_atom("P"), "a 5' end without phosphorus stays a hydroxyl");
        let c = repaired.find_residue("A", 2, None).expect("C kept");
        for name in ["OP1", "OP2", "O5'", "N1", "N4", "O2", "H41", "H42", "HO3'"] {
            assert!(c.has_atom(name), "C lacks {name}");
        }
    }

    #[test]
    fn fix_single_pdb_validates_input() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = fix_single_pdb(&dir.path().join("absent.pdb"), &FixerOptions::default())
            .expect_err("missing file");
        assert_eq!(missing.kind(), ErrorKind::Validation);

        let wrong = dir.path().join("model.cif");
        fs::write(&wrong, GLY_PDB).expect("write fixture");
        let err = fix_single_pdb(&wrong, &FixerOptions::default()).expect_err("wrong extension");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.path(), wrong.as_path());
        assert_eq!(file_names(dir.path()), vec!["model.cif"]);
    }

    #[test]
    fn fix_single_pdb_reports_parse_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("broken.pdb");
        fs::write(&input, "REMARK no coordinates\n").expect("write fixture");

        let err = fix_single_pdb(&input, &FixerOptions::default()).expect_err("no atoms");

        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!dir.path().join("broken.fixed.pdb").exists());
    }

    #[test]
    fn directory_run_filters_recurses_and_isolates_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("a.pdb"), GLY_PDB).expect("write a");
        fs::write(root.join("b.PDB"), GLY_PDB).expect("write b");
        fs::write(root.join("notes.txt"), "hello").expect("write notes");
        fs::write(root.join("run_cfg.pdb"), GLY_PDB).expect("write cfg");
        fs::write(root.join("a.fixed.pdb"), "stale").expect("write stale");
        fs::create_dir(root.join("nested")).expect("mkdir");
        fs::write(root.join("nested/c.pdb"), GLY_PDB).expect("write c");
        fs::write(root.join("nested/bad.pdb"), "REMARK empty\n").expect("write bad");

        let report = fix_pdb_directory_recursive(root, &FixerOptions::default()).expect("run");

        assert_eq!(
            report.written,
            vec![
                root.join("a.fixed.pdb"),
                root.join("b.fixed.PDB"),
                root.join("nested/c.fixed.pdb"),
            ]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind(), ErrorKind::Parse);
        assert_eq!(report.failures[0].path(), root.join("nested/bad.pdb").as_path());
        assert_eq!(report.skipped, 3);
        assert!(!report.is_success());

        let overwritten = fs::read_to_string(root.join("a.fixed.pdb")).expect("read output");
        assert!(overwritten.contains("ATOM"));
        assert_eq!(
            file_names(root),
            vec!["a.fixed.pdb", "a.pdb", "b.PDB", "b.fixed.PDB", "nested", "notes.txt", "run_cfg.pdb"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn directory_walk_does_not_follow_symlinked_directories() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("a.pdb"), GLY_PDB).expect("write a");
        symlink(root, root.join("loop")).expect("link to ancestor");
        symlink(root.join("a.pdb"), root.join("link.pdb")).expect("link to file");
        symlink(root.join("absent.pdb"), root.join("dangling.pdb")).expect("dangling link");

        let candidates = collect_candidates(root, &DirectoryFilter::default()).expect("walk");

        assert_eq!(candidates.files, vec![root.join("a.pdb"), root.join("link.pdb")]);
        assert_eq!(candidates.skipped, 0);
        assert!(candidates.unreadable.is_empty());
    }

    #[test]
    fn batch_failures_are_logged_once() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().expect("log buffer").extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("bad.pdb"), "REMARK empty\n").expect("write bad");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let report = tracing::subscriber::with_default(subscriber, || {
            fix_pdb_directory_recursive(dir.path(), &FixerOptions::default()).expect("run")
        });

        assert_eq!(report.failures.len(), 1);
        let logs = String::from_utf8(captured.0.lock().expect("log buffer").clone()).expect("utf-8");
        let mentions: Vec<&str> = logs.lines().filter(|l| l.contains("bad.pdb")).collect();
        assert_eq!(mentions.len(), 1, "{logs}");
        assert!(mentions[0].contains("WARN"));
    }

    #[test]
    fn second_directory_run_creates_no_new_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.pdb"), GLY_PDB).expect("write a");

        let first = fix_pdb_directory_recursive(dir.path(), &FixerOptions::default()).expect("run");
        let after_first = file_names(dir.path());
        let second = fix_pdb_directory_recursive(dir.path(), &FixerOptions::default()).expect("run");

        assert_eq!(first.written.len(), 1);
        assert_eq!(second.written.len(), 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(file_names(dir.path()), after_first);
    }

    #[test]
    fn directory_run_requires_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.pdb");
        fs::write(&file, GLY_PDB).expect("write a");

        for path in [dir.path().join("absent"), file] {
            let err = fix_pdb_directory_recursive(&path, &FixerOptions::default())
                .expect_err("not a directory");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn custom_exclusions_replace_the_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("run_cfg.pdb"), GLY_PDB).expect("write cfg");
        fs::write(dir.path().join("tmp.pdb"), GLY_PDB).expect("write tmp");
        let options = FixerOptions {
            exclude: vec!["tmp".to_string()],
            ..FixerOptions::default()
        };

        let report = fix_pdb_directory_recursive(dir.path(), &options).expect("run");

        assert_eq!(report.written, vec![dir.path().join("run_cfg.fixed.pdb")]);
        assert_eq!(report.skipped, 1);
    }
}
