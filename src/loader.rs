//! Loading compiled artifacts and registering the types they export.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use autonet_abi::{ABI_VERSION, MANIFEST_SYMBOL, ManifestFn, OwnedType, manifest_to_types};
use libloading::Library;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::reflect::TypeHandle;
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::source::SourceUnit;

/// A library mapped into the process.
///
/// Never unloaded while referenced: type handles and the session's resident
/// list hold it through an `Arc`.
pub struct LoadedArtifact {
    path: PathBuf,
    /// The copy actually mapped. Empty for in-process types.
    image: PathBuf,
    unit_name: String,
    _library: Option<Library>,
}

impl LoadedArtifact {
    /// Types linked into the running process; there is no library to hold.
    pub fn in_process(unit_name: &str) -> Self {
        Self {
            path: PathBuf::new(),
            image: PathBuf::new(),
            unit_name: unit_name.to_string(),
            _library: None,
        }
    }

    /// Artifact as produced by the compiler.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }
}

impl std::fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("path", &self.path)
            .field("image", &self.image)
            .field("unit_name", &self.unit_name)
            .finish_non_exhaustive()
    }
}

/// What one artifact exports.
#[derive(Debug, Clone)]
pub struct LoadedExports {
    pub artifact: Arc<LoadedArtifact>,
    pub types: Vec<OwnedType>,
}

/// Load an artifact and enumerate its exported types.
pub trait Loader: Send + Sync {
    fn load_exports(&self, artifact: &Path) -> Result<LoadedExports, LoadError>;
}

/// Size and modification time of an artifact when it was last loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArtifactStamp {
    modified: SystemTime,
    len: u64,
}

impl ArtifactStamp {
    fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct CachedLoad {
    stamp: ArtifactStamp,
    exports: LoadedExports,
}

/// Loads artifacts as dynamic libraries exporting `autonet_type_manifest`.
///
/// The dynamic linker hands back the already mapped image when a path is
/// opened twice, so every load maps a fresh copy under a unique name in a
/// private staging directory. An artifact unchanged since its last load is
/// served from the earlier image instead of being mapped again.
#[derive(Debug)]
pub struct DylibLoader {
    staging: TempDir,
    generation: AtomicU64,
    loaded: Mutex<HashMap<PathBuf, CachedLoad>>,
}

impl DylibLoader {
    pub fn new() -> std::io::Result<Self> {
        let staging = tempfile::Builder::new().prefix("autonet-images-").tempdir()?;
        debug!("staging libraries in {}", staging.path().display());
        Ok(Self {
            staging,
            generation: AtomicU64::new(0),
            loaded: Mutex::new(HashMap::new()),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Copy `artifact` to `<stem>.<generation>.<ext>` in the staging directory.
    fn stage(&self, artifact: &Path) -> Result<PathBuf, LoadError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());
        let image = self.staging.path().join(format!(
            "{}.{}.{}",
            stem,
            generation,
            std::env::consts::DLL_EXTENSION
        ));
        std::fs::copy(artifact, &image).map_err(|source| LoadError::Staging {
            path: artifact.to_path_buf(),
            source,
        })?;
        Ok(image)
    }

    fn open(&self, artifact: &Path, image: PathBuf) -> Result<LoadedExports, LoadError> {
        // Safety: loading runs the library's initializers; source units are
        // trusted code built by this session.
        let library = unsafe { Library::new(&image) }.map_err(|source| LoadError::Open {
            path: artifact.to_path_buf(),
            source,
        })?;

        let manifest = {
            let manifest_fn: libloading::Symbol<ManifestFn> = unsafe { library.get(MANIFEST_SYMBOL) }
                .map_err(|source| LoadError::MissingManifest {
                    path: artifact.to_path_buf(),
                    source,
                })?;
            manifest_fn()
        };

        if manifest.abi_version != ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                path: artifact.to_path_buf(),
                found: manifest.abi_version,
                expected: ABI_VERSION,
            });
        }

        let (unit_name, types) =
            unsafe { manifest_to_types(&manifest) }.map_err(|message| LoadError::Manifest {
                path: artifact.to_path_buf(),
                message,
            })?;
        debug!(unit = %unit_name, types = types.len(), image = %image.display(), "read type manifest");

        Ok(LoadedExports {
            artifact: Arc::new(LoadedArtifact {
                path: artifact.to_path_buf(),
                image,
                unit_name,
                _library: Some(library),
            }),
            types,
        })
    }
}

impl Loader for DylibLoader {
    fn load_exports(&self, artifact: &Path) -> Result<LoadedExports, LoadError> {
        let stamp = ArtifactStamp::of(artifact).map_err(|source| LoadError::Staging {
            path: artifact.to_path_buf(),
            source,
        })?;

        let mut loaded = self.loaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(cached) = loaded.get(artifact)
            && cached.stamp == stamp
        {
            debug!("{} unchanged since last load", artifact.display());
            return Ok(cached.exports.clone());
        }

        let image = self.stage(artifact)?;
        let exports = match self.open(artifact, image.clone()) {
            Ok(exports) => exports,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&image) {
                    warn!("cannot remove staged image {}: {}", image.display(), rm);
                }
                return Err(e);
            }
        };
        loaded.insert(
            artifact.to_path_buf(),
            CachedLoad {
                stamp,
                exports: exports.clone(),
            },
        );
        Ok(exports)
    }
}

/// Result of registering one artifact's exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Register every exported type whose name is not yet taken.
///
/// All descriptors are validated before any is inserted, so a malformed
/// manifest adds nothing.
pub fn register_exports(
    registry: &mut TypeRegistry,
    exports: &LoadedExports,
    origin: &SourceUnit,
) -> Result<LoadSummary, LoadError> {
    let artifact_path = if exports.artifact.path().as_os_str().is_empty() {
        origin.artifact_path()
    } else {
        exports.artifact.path().to_path_buf()
    };

    let mut handles = Vec::with_capacity(exports.types.len());
    for raw in &exports.types {
        let handle = TypeHandle::new(raw.clone(), Arc::clone(&exports.artifact)).map_err(|message| {
            LoadError::Manifest {
                path: artifact_path.clone(),
                message,
            }
        })?;
        handles.push(handle);
    }

    let mut summary = LoadSummary::default();
    for handle in handles {
        let full_name = handle.full_name().to_string();
        let descriptor = TypeDescriptor::new(origin.clone(), artifact_path.clone(), Arc::new(handle));
        if registry.insert(descriptor) {
            debug!("registered type {}", full_name);
            summary.added += 1;
        } else {
            debug!("type {} already registered, skipping", full_name);
            summary.skipped += 1;
        }
    }
    info!(
        "Loaded {} type(s) from unit {} at {} ({} already known)",
        summary.added,
        exports.artifact.unit_name(),
        artifact_path.display(),
        summary.skipped
    );
    Ok(summary)
}

/// Load `artifact` with `loader` and register its types.
pub fn load_into(
    registry: &mut TypeRegistry,
    loader: &dyn Loader,
    artifact: &Path,
    origin: &SourceUnit,
) -> Result<(Arc<LoadedArtifact>, LoadSummary), LoadError> {
    let exports = loader.load_exports(artifact)?;
    let summary = register_exports(registry, &exports, origin)?;
    Ok((exports.artifact, summary))
}
