//! Building source units into loadable artifacts.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};

use crate::config::CompilerConfig;
use crate::error::BuildError;
use crate::source::SourceUnit;

/// Produce (or reuse) the artifact of one source unit.
pub trait Compiler: Send + Sync {
    fn compile(&self, unit: &SourceUnit) -> Result<PathBuf, BuildError>;
}

/// The external tool that turns one source file into one artifact.
///
/// Returns the error diagnostics it reported; an empty list means success.
pub trait CompilerBackend: Send + Sync {
    fn build(&self, unit: &SourceUnit, artifact: &Path) -> Result<Vec<String>, BuildError>;
}

/// Builds source units as `cdylib`s with `rustc`, linked against `autonet-abi`.
#[derive(Debug, Clone)]
pub struct RustcBackend {
    rustc: String,
    edition: String,
    abi_library: Option<PathBuf>,
    extra_args: Vec<String>,
}

impl RustcBackend {
    pub fn new(config: &CompilerConfig, abi_library: Option<PathBuf>) -> Self {
        Self {
            rustc: config.rustc.clone(),
            edition: config.edition.clone(),
            abi_library,
            extra_args: config.extra_args.clone(),
        }
    }

    /// Command line for building `unit` into `artifact`.
    pub fn command(&self, unit: &SourceUnit, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.rustc);
        cmd.arg("--crate-type")
            .arg("cdylib")
            .arg("--crate-name")
            .arg(unit.crate_name())
            .arg("--edition")
            .arg(&self.edition)
            .arg("--error-format=short");
        if let Some(rlib) = &self.abi_library {
            cmd.arg("--extern")
                .arg(format!("autonet_abi={}", rlib.display()));
            if let Some(dir) = rlib.parent() {
                cmd.arg("-L").arg(format!("dependency={}", dir.display()));
            }
        }
        cmd.args(&self.extra_args)
            .arg("-o")
            .arg(artifact)
            .arg(unit.path());
        cmd
    }
}

impl CompilerBackend for RustcBackend {
    fn build(&self, unit: &SourceUnit, artifact: &Path) -> Result<Vec<String>, BuildError> {
        let mut cmd = self.command(unit, artifact);
        debug!(?cmd, "invoking compiler");
        let output = cmd.output().map_err(|source| BuildError::Spawn {
            program: self.rustc.clone(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = error_diagnostics(&stderr);
        if !output.status.success() && diagnostics.is_empty() {
            let text = stderr.trim();
            diagnostics.push(if text.is_empty() {
                format!("compiler exited with {}", output.status)
            } else {
                text.to_string()
            });
        }
        Ok(diagnostics)
    }
}

/// Pick the error lines out of `--error-format=short` output.
fn error_diagnostics(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("error") || line.contains(": error"))
        .filter(|line| !line.starts_with("error: aborting due to"))
        .map(str::to_string)
        .collect()
}

/// Memoizing, failure-isolating front end over a [`CompilerBackend`].
///
/// Stale error reports are removed before every attempt; a failed build
/// leaves a fresh report beside the source unit and no artifact.
pub struct ArtifactCompiler<B> {
    backend: B,
    skip_existing: bool,
}

impl<B: CompilerBackend> ArtifactCompiler<B> {
    pub fn new(backend: B, skip_existing: bool) -> Self {
        Self {
            backend,
            skip_existing,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build `unit`. With `skip_if_exists`, an existing artifact is reused
    /// without invoking the backend.
    pub fn build(&self, unit: &SourceUnit, skip_if_exists: bool) -> Result<PathBuf, BuildError> {
        let artifact = unit.artifact_path();
        let report = unit.error_report_path();

        remove_if_exists(&report).map_err(|source| BuildError::Io {
            unit: unit.path().to_path_buf(),
            source,
        })?;

        if skip_if_exists && artifact.exists() {
            info!("Skipping compilation for existing binary: {}", artifact.display());
            return Ok(artifact);
        }

        info!("Compiling {}", unit);
        let failure = match self.backend.build(unit, &artifact) {
            Ok(diagnostics) if diagnostics.is_empty() => {
                if artifact.exists() {
                    return Ok(artifact);
                }
                BuildError::MissingArtifact { artifact: artifact.clone() }
            }
            Ok(diagnostics) => BuildError::Diagnostics {
                unit: unit.path().to_path_buf(),
                diagnostics,
            },
            Err(e) => e,
        };

        if let Err(e) = write_report(&report, unit, &artifact, &failure.report_lines()) {
            error!("cannot write error report {}: {}", report.display(), e);
        }
        // Nothing half-built may stay loadable.
        if let Err(e) = remove_if_exists(&artifact) {
            error!("cannot remove partial artifact {}: {}", artifact.display(), e);
        }
        error!("Build failed for {}: {}", unit, failure);
        Err(failure)
    }
}

impl<B: CompilerBackend> Compiler for ArtifactCompiler<B> {
    fn compile(&self, unit: &SourceUnit) -> Result<PathBuf, BuildError> {
        self.build(unit, self.skip_existing)
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Render the human-readable error report for a failed build.
pub fn format_report(unit: &SourceUnit, artifact: &Path, lines: &[String]) -> String {
    let mut out = format!("Errors building {} into {}\n", unit, artifact.display());
    for line in lines {
        let mut parts = line.lines();
        if let Some(first) = parts.next() {
            out.push_str("  ≡ ");
            out.push_str(first);
            out.push('\n');
        }
        for rest in parts {
            out.push_str("    ");
            out.push_str(rest);
            out.push('\n');
        }
    }
    out
}

fn write_report(report: &Path, unit: &SourceUnit, artifact: &Path, lines: &[String]) -> std::io::Result<()> {
    std::fs::write(report, format_report(unit, artifact, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Backend that writes the artifact or fails with fixed diagnostics.
    struct ScriptedBackend {
        diagnostics: Vec<String>,
        write_artifact: bool,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn succeeding() -> Self {
            Self {
                diagnostics: Vec::new(),
                write_artifact: true,
                calls: Mutex::new(0),
            }
        }

        fn failing(diagnostics: &[&str]) -> Self {
            Self {
                diagnostics: diagnostics.iter().map(|d| d.to_string()).collect(),
                write_artifact: true,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl CompilerBackend for ScriptedBackend {
        fn build(&self, _unit: &SourceUnit, artifact: &Path) -> Result<Vec<String>, BuildError> {
            *self.calls.lock().unwrap() += 1;
            if self.write_artifact {
                std::fs::write(artifact, b"artifact").unwrap();
            }
            Ok(self.diagnostics.clone())
        }
    }

    fn unit_in(dir: &Path, name: &str) -> SourceUnit {
        let path = dir.join(name);
        std::fs::write(&path, "// unit").unwrap();
        SourceUnit::new(path)
    }

    #[test]
    fn existing_artifact_skips_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "query.rs");
        std::fs::write(unit.artifact_path(), b"old").unwrap();
        std::fs::write(unit.error_report_path(), b"Errors building query.rs\n").unwrap();

        let compiler = ArtifactCompiler::new(ScriptedBackend::failing(&["boom"]), true);
        assert_eq!(compiler.compile(&unit).unwrap(), unit.artifact_path());
        assert_eq!(compiler.backend().calls(), 0);
        assert!(!unit.error_report_path().exists());
    }

    #[test]
    fn rebuild_ignores_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "query.rs");
        std::fs::write(unit.artifact_path(), b"old").unwrap();

        let compiler = ArtifactCompiler::new(ScriptedBackend::succeeding(), true);
        compiler.build(&unit, false).unwrap();
        assert_eq!(compiler.backend().calls(), 1);
        assert_eq!(std::fs::read(unit.artifact_path()).unwrap(), b"artifact");
    }

    #[test]
    fn diagnostics_write_report_and_remove_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "broken.rs");

        let compiler = ArtifactCompiler::new(
            ScriptedBackend::failing(&["broken.rs:3:5: error[E0425]: cannot find value `x`"]),
            true,
        );
        let err = compiler.compile(&unit).unwrap_err();
        assert!(matches!(err, BuildError::Diagnostics { ref diagnostics, .. } if diagnostics.len() == 1));

        let report = std::fs::read_to_string(unit.error_report_path()).unwrap();
        assert!(report.starts_with("Errors building "));
        assert!(report.contains("  ≡ broken.rs:3:5: error[E0425]"));
        assert!(!unit.artifact_path().exists());
    }

    #[test]
    fn stale_report_is_removed_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "fixed.rs");
        std::fs::write(unit.error_report_path(), "old errors").unwrap();

        let compiler = ArtifactCompiler::new(ScriptedBackend::succeeding(), true);
        compiler.compile(&unit).unwrap();
        assert!(!unit.error_report_path().exists());
    }

    #[test]
    fn silent_success_without_artifact_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "ghost.rs");
        let backend = ScriptedBackend {
            diagnostics: Vec::new(),
            write_artifact: false,
            calls: Mutex::new(0),
        };

        let compiler = ArtifactCompiler::new(backend, true);
        assert!(matches!(compiler.compile(&unit), Err(BuildError::MissingArtifact { .. })));
        assert!(unit.error_report_path().exists());
    }

    #[test]
    fn missing_compiler_executable_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_in(dir.path(), "query.rs");
        let config = CompilerConfig {
            rustc: "autonet-no-such-compiler".to_string(),
            ..CompilerConfig::default()
        };

        let compiler = ArtifactCompiler::new(RustcBackend::new(&config, None), true);
        assert!(matches!(compiler.compile(&unit), Err(BuildError::Spawn { .. })));
        let report = std::fs::read_to_string(unit.error_report_path()).unwrap();
        assert!(report.contains("autonet-no-such-compiler"));
    }

    #[test]
    fn short_format_errors_are_extracted() {
        let stderr = "\
q.rs:1:1: warning: unused import
q.rs:4:9: error[E0308]: mismatched types
error: aborting due to 1 previous error
";
        assert_eq!(
            error_diagnostics(stderr),
            vec!["q.rs:4:9: error[E0308]: mismatched types".to_string()]
        );
    }

    #[test]
    fn rustc_command_links_the_abi_crate() {
        let backend = RustcBackend::new(
            &CompilerConfig::default(),
            Some(PathBuf::from("/t/debug/libautonet_abi.rlib")),
        );
        let unit = SourceUnit::new("Sources/tee-sheet.rs");
        let cmd = backend.command(&unit, Path::new("Sources/tee-sheet.so"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w == ["--crate-name", "tee_sheet"]));
        assert!(args.contains(&"autonet_abi=/t/debug/libautonet_abi.rlib".to_string()));
        assert!(args.contains(&"dependency=/t/debug".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("Sources/tee-sheet.rs"));
    }
}
