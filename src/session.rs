//! The type session: registry population, reset, and the active instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::compiler::Compiler;
use crate::error::{BuildError, LoadError, SessionError};
use crate::loader::{LoadSummary, LoadedArtifact, Loader, load_into};
use crate::reflect::Instance;
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::source::{SourceUnit, scan_sources};

/// Stage at which a source unit dropped out of a population pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Build => write!(f, "build"),
            Stage::Load => write!(f, "load"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub unit: SourceUnit,
    pub stage: Stage,
    pub message: String,
}

/// Outcome of one population pass.
#[derive(Debug, Clone, Default)]
pub struct PopulateReport {
    pub units: usize,
    pub built: usize,
    pub loaded: usize,
    pub types_added: usize,
    pub types_skipped: usize,
    pub failures: Vec<UnitFailure>,
    /// Set when the pass stopped early on cancellation.
    pub cancelled: bool,
}

/// The selected type and its live instance.
#[derive(Debug)]
pub struct ActiveContext {
    descriptor: TypeDescriptor,
    instance: Instance,
}

impl ActiveContext {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut Instance {
        &mut self.instance
    }
}

/// One operator session over a source folder.
///
/// Compilation and loading are injected so population can run against
/// fakes. At most one instance is active at a time.
pub struct Session<C, L> {
    source_folder: PathBuf,
    compiler: C,
    loader: L,
    registry: TypeRegistry,
    active: Option<ActiveContext>,
    cancel: CancellationToken,
    resident: Vec<Arc<LoadedArtifact>>,
}

impl<C: Compiler, L: Loader> Session<C, L> {
    pub fn new(source_folder: impl Into<PathBuf>, compiler: C, loader: L) -> Self {
        Self {
            source_folder: source_folder.into(),
            compiler,
            loader,
            registry: TypeRegistry::new(),
            active: None,
            cancel: CancellationToken::new(),
            resident: Vec::new(),
        }
    }

    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Token for stopping the population pass in flight. Checked between
    /// source units; a unit already being built finishes first.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of libraries kept mapped for the life of the process.
    pub fn resident_libraries(&self) -> usize {
        self.resident.len()
    }

    /// Build and load every source unit, optionally after a reset.
    ///
    /// Units are processed one at a time; a failing unit is logged and the
    /// pass moves on. Types registered by earlier units are never rolled back.
    pub fn populate(&mut self, purge_first: bool) -> Result<PopulateReport, SessionError> {
        if purge_first {
            self.reset();
        }

        let units = scan_sources(&self.source_folder).map_err(|source| SessionError::SourceFolder {
            folder: self.source_folder.clone(),
            source,
        })?;
        info!("Populating from {} ({} source unit(s))", self.source_folder.display(), units.len());

        let mut report = PopulateReport {
            units: units.len(),
            ..PopulateReport::default()
        };

        for unit in &units {
            if self.cancel.is_cancelled() {
                warn!("Population cancelled before {}", unit);
                report.cancelled = true;
                break;
            }

            let artifact = match self.build_unit(unit) {
                Ok(path) => path,
                Err(e) => {
                    report.failures.push(UnitFailure {
                        unit: unit.clone(),
                        stage: Stage::Build,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            report.built += 1;

            match self.load_unit(&artifact, unit) {
                Ok((library, summary)) => {
                    self.keep_resident(library);
                    report.loaded += 1;
                    report.types_added += summary.added;
                    report.types_skipped += summary.skipped;
                }
                Err(e) => {
                    error!("Failed to load {}: {}", artifact.display(), e);
                    report.failures.push(UnitFailure {
                        unit: unit.clone(),
                        stage: Stage::Load,
                        message: e.to_string(),
                    });
                }
            }
        }

        if report.cancelled {
            self.cancel = CancellationToken::new();
        }
        info!(
            "Population finished: {} type(s) registered, {} unit(s) failed",
            self.registry.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Compile on a worker thread and wait for it.
    fn build_unit(&self, unit: &SourceUnit) -> Result<PathBuf, BuildError> {
        let compiler = &self.compiler;
        thread::scope(|scope| scope.spawn(move || compiler.compile(unit)).join()).unwrap_or_else(|_| {
            Err(BuildError::Io {
                unit: unit.path().to_path_buf(),
                source: std::io::Error::other("compiler worker panicked"),
            })
        })
    }

    /// Load and register on a worker thread and wait for it.
    fn load_unit(
        &mut self,
        artifact: &Path,
        unit: &SourceUnit,
    ) -> Result<(Arc<LoadedArtifact>, LoadSummary), LoadError> {
        let registry = &mut self.registry;
        let loader: &dyn Loader = &self.loader;
        thread::scope(|scope| scope.spawn(move || load_into(registry, loader, artifact, unit)).join())
            .unwrap_or_else(|_| {
                Err(LoadError::Panicked {
                    path: artifact.to_path_buf(),
                })
            })
    }

    /// Keep a library mapped for the rest of the process. A library the
    /// loader handed back unchanged is held once.
    fn keep_resident(&mut self, library: Arc<LoadedArtifact>) {
        if !self.resident.iter().any(|held| Arc::ptr_eq(held, &library)) {
            self.resident.push(library);
        }
    }

    /// Drop the active pair and empty the registry. Libraries stay loaded.
    pub fn reset(&mut self) {
        debug!("Resetting session ({} type(s))", self.registry.len());
        self.active = None;
        self.registry.clear();
    }

    /// Make a fresh default instance of `full_name` the active context.
    ///
    /// On failure the previous context, if any, stays active.
    pub fn select(&mut self, full_name: &str) -> Result<&ActiveContext, SessionError> {
        let Some(descriptor) = self.registry.get(full_name) else {
            warn!("Unable to locate the type [{}] in current session", full_name);
            return Err(SessionError::Lookup(full_name.to_string()));
        };

        let Some(instance) = descriptor.handle().instantiate() else {
            error!("Unable to create an instance of type [{}]", full_name);
            return Err(SessionError::Activation(full_name.to_string()));
        };

        info!("Switched context to {}", full_name);
        let context = ActiveContext {
            descriptor: descriptor.clone(),
            instance,
        };
        Ok(self.active.insert(context))
    }

    pub fn active(&self) -> Option<&ActiveContext> {
        self.active.as_ref()
    }

    /// Short name of the active type.
    pub fn active_type_name(&self) -> Option<&str> {
        self.active.as_ref().map(|ctx| ctx.descriptor.name())
    }

    pub fn active_instance(&self) -> Option<&Instance> {
        self.active.as_ref().map(|ctx| &ctx.instance)
    }

    pub fn active_instance_mut(&mut self) -> Option<&mut Instance> {
        self.active.as_mut().map(|ctx| &mut ctx.instance)
    }
}
