//! Source units and the files derived from them.
//!
//! A source unit `Sources/foo.rs` compiles to `Sources/foo.<dll ext>`; a failed
//! build leaves its diagnostics in `Sources/foo.error.txt`.

use std::path::{Path, PathBuf};

/// Extension of source unit files.
pub const SOURCE_EXTENSION: &str = "rs";

/// Suffix of the error report written next to a failed source unit.
pub const ERROR_REPORT_SUFFIX: &str = "error.txt";

/// One self-contained compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUnit {
    path: PathBuf,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Crate name passed to the compiler: the stem with every character
    /// that is not valid in an identifier replaced by `_`.
    pub fn crate_name(&self) -> String {
        let name: String = self
            .stem()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        match name.chars().next() {
            Some(c) if c.is_ascii_digit() => format!("_{}", name),
            None => "_".to_string(),
            _ => name,
        }
    }

    /// Loadable artifact: same directory, same stem, platform library extension.
    pub fn artifact_path(&self) -> PathBuf {
        self.path.with_extension(std::env::consts::DLL_EXTENSION)
    }

    /// Sibling error report of the last failed build.
    pub fn error_report_path(&self) -> PathBuf {
        self.path.with_extension(ERROR_REPORT_SUFFIX)
    }
}

impl std::fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Enumerate the source units in `folder`, sorted by path.
pub fn scan_sources(folder: &Path) -> std::io::Result<Vec<SourceUnit>> {
    let mut units = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            units.push(SourceUnit::new(path));
        }
    }
    units.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(units)
}
