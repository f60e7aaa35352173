//! Session configuration, loaded from `autonet.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "autonet.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned for `*.rs` source units.
    pub source_folder: PathBuf,
    /// Reuse an existing artifact instead of rebuilding its source unit.
    pub skip_existing_artifacts: bool,
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` takes precedence.
    pub log_level: String,
    /// Log to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Banner shown when the console starts.
    pub title: String,
    pub compiler: CompilerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("Sources"),
            skip_existing_artifacts: true,
            log_level: "warn".to_string(),
            log_file: None,
            title: "autonet interactive session".to_string(),
            compiler: CompilerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler executable.
    pub rustc: String,
    pub edition: String,
    /// Path to the compiled `autonet-abi` rlib. Searched for when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi_library: Option<PathBuf>,
    /// Extra arguments appended to every compiler invocation.
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            rustc: "rustc".to_string(),
            edition: "2024".to_string(),
            abi_library: None,
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given (it must exist), else `autonet.toml` in `dir`
    /// when present, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.exists() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

const ABI_RLIB: &str = "libautonet_abi.rlib";

/// Locate the `autonet-abi` rlib that source units link against.
///
/// An explicit path from config wins when it exists. Otherwise the Cargo
/// output directories under the working directory are searched, then the
/// directory holding the running executable.
pub fn resolve_abi_library(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.to_path_buf());
    }

    let mut dirs = vec![PathBuf::from("target/debug"), PathBuf::from("target/release")];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    for dir in &dirs {
        let direct = dir.join(ABI_RLIB);
        if direct.exists() {
            return Some(direct);
        }
        if let Some(found) = newest_hashed_rlib(&dir.join("deps")) {
            return Some(found);
        }
    }
    None
}

/// Cargo places dependency rlibs in `deps/` as `libautonet_abi-<hash>.rlib`.
fn newest_hashed_rlib(deps: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(deps).ok()?;
    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with("libautonet_abi-") && name.ends_with(".rlib")
        })
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            source_folder = "Queries"

            [compiler]
            edition = "2021"
            "#,
        )
        .unwrap();
        assert_eq!(config.source_folder, PathBuf::from("Queries"));
        assert!(config.skip_existing_artifacts);
        assert_eq!(config.compiler.edition, "2021");
        assert_eq!(config.compiler.rustc, "rustc");
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn discover_reads_file_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "skip_existing_artifacts = false\n").unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert!(!config.skip_existing_artifacts);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::discover(Some(&missing), dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "skip_existing_artifacts = \"sometimes\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn configured_abi_library_must_exist() {
        assert_eq!(resolve_abi_library(Some(Path::new("/nonexistent/libautonet_abi.rlib"))), None);
    }

    #[test]
    fn hashed_rlib_is_found_in_deps() {
        let dir = tempfile::tempdir().unwrap();
        let rlib = dir.path().join("libautonet_abi-0123abcd.rlib");
        std::fs::write(&rlib, b"").unwrap();
        std::fs::write(dir.path().join("libother-0123abcd.rlib"), b"").unwrap();
        assert_eq!(newest_hashed_rlib(dir.path()), Some(rlib));
    }
}
