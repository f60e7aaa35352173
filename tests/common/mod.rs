//! Fakes shared by the integration tests: a scripted compiler backend, a
//! loader that serves in-process types instead of opening libraries, and a
//! handful of exported types.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use autonet::abi::{ExportedType, OwnedType, PropertySpec, TypeKind, describe, opaque_property, property};
use autonet::compiler::{ArtifactCompiler, CompilerBackend};
use autonet::error::{BuildError, LoadError};
use autonet::loader::{LoadedArtifact, LoadedExports, Loader};
use autonet::session::Session;

// ── Exported types ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BaseQuery {
    pub max_rows: i32,
    pub current_index: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Gender {
    #[default]
    Unspecified,
    Female,
}

opaque_property!(Gender);

#[derive(Debug, Default)]
pub struct EventFilterQuery {
    pub base: BaseQuery,
    pub company_id: Option<i32>,
    pub name: String,
    pub category_id: Option<i32>,
    pub is_registerable: Option<bool>,
    pub genders: Vec<Gender>,
}

impl ExportedType for EventFilterQuery {
    const NAME: &'static str = "EventFilterQuery";
    const FULL_NAME: &'static str = "queries::EventFilterQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("CompanyId" => company_id),
            property!("Name" => name),
            property!("CategoryId" => category_id),
            property!("IsRegisterable" => is_registerable),
            property!("Genders" => genders),
            property!(inherited "MaxRows" => base.max_rows),
            property!(inherited "CurrentIndex" => base.current_index),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self {
            base: BaseQuery {
                max_rows: 25,
                current_index: 0,
            },
            name: "Spring Open".to_string(),
            ..Self::default()
        })
    }
}

/// Same full name as `EventFilterQuery`, different shape.
#[derive(Debug, Default)]
pub struct ShadowEventFilterQuery {
    pub shadow: bool,
}

impl ExportedType for ShadowEventFilterQuery {
    const NAME: &'static str = "EventFilterQuery";
    const FULL_NAME: &'static str = "queries::EventFilterQuery";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![property!("Shadow" => shadow)]
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TeeTimeSlot {
    pub hour: u8,
    pub minute: u8,
    pub green_fee: f64,
}

impl ExportedType for TeeTimeSlot {
    const NAME: &'static str = "TeeTimeSlot";
    const FULL_NAME: &'static str = "queries::TeeTimeSlot";
    const KIND: TypeKind = TypeKind::Struct;

    fn properties() -> Vec<PropertySpec<Self>> {
        vec![
            property!("Hour" => hour),
            property!("Minute" => minute),
            property!("GreenFee" => green_fee),
        ]
    }

    fn construct() -> Option<Self> {
        Some(Self {
            hour: 7,
            minute: 30,
            green_fee: 45.5,
        })
    }
}

impl ExportedType for Gender {
    const NAME: &'static str = "Gender";
    const FULL_NAME: &'static str = "queries::Gender";
    const KIND: TypeKind = TypeKind::Enum;

    fn properties() -> Vec<PropertySpec<Self>> {
        Vec::new()
    }

    fn construct() -> Option<Self> {
        Some(Self::default())
    }
}

/// Has no usable default instance.
pub struct Refusing;

impl ExportedType for Refusing {
    const NAME: &'static str = "Refusing";
    const FULL_NAME: &'static str = "queries::Refusing";
    const KIND: TypeKind = TypeKind::Class;

    fn properties() -> Vec<PropertySpec<Self>> {
        Vec::new()
    }

    fn construct() -> Option<Self> {
        None
    }
}

// ── Compiler ──────────────────────────────────────────────────────────────

/// Writes a placeholder artifact, or fails for the configured stems.
#[derive(Default)]
pub struct FakeBackend {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn failing(stems: &[&str]) -> Self {
        Self {
            failing: stems.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Stems built so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompilerBackend for FakeBackend {
    fn build(&self, unit: &autonet::source::SourceUnit, artifact: &Path) -> Result<Vec<String>, BuildError> {
        let stem = unit.stem();
        self.calls.lock().unwrap().push(stem.clone());
        if self.failing.contains(&stem) {
            // A half-written artifact that must not survive the failure.
            std::fs::write(artifact, b"partial").unwrap();
            return Ok(vec![format!("{}.rs:1:1: error: expected item", stem)]);
        }
        std::fs::write(artifact, b"artifact").unwrap();
        Ok(Vec::new())
    }
}

// ── Loader ────────────────────────────────────────────────────────────────

type Exports = fn() -> Vec<OwnedType>;

/// Serves types linked into the test binary, keyed by artifact stem.
///
/// Like a real loader, repeated loads of one stem hand back the same
/// artifact.
#[derive(Default)]
pub struct InProcessLoader {
    units: HashMap<String, Exports>,
    loads: Mutex<Vec<PathBuf>>,
    artifacts: Mutex<HashMap<String, Arc<LoadedArtifact>>>,
}

impl InProcessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, stem: &str, exports: Exports) -> Self {
        self.units.insert(stem.to_string(), exports);
        self
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().unwrap().clone()
    }
}

impl Loader for InProcessLoader {
    fn load_exports(&self, artifact: &Path) -> Result<LoadedExports, LoadError> {
        self.loads.lock().unwrap().push(artifact.to_path_buf());
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let exports = self.units.get(&stem).ok_or_else(|| LoadError::Manifest {
            path: artifact.to_path_buf(),
            message: "no type manifest".to_string(),
        })?;
        let artifact = Arc::clone(
            self.artifacts
                .lock()
                .unwrap()
                .entry(stem.clone())
                .or_insert_with(|| Arc::new(LoadedArtifact::in_process(&stem))),
        );
        Ok(LoadedExports {
            artifact,
            types: exports(),
        })
    }
}

pub fn event_unit() -> Vec<OwnedType> {
    vec![
        describe::<EventFilterQuery>().unwrap(),
        describe::<Gender>().unwrap(),
    ]
}

pub fn tee_unit() -> Vec<OwnedType> {
    vec![describe::<TeeTimeSlot>().unwrap()]
}

pub fn shadow_unit() -> Vec<OwnedType> {
    vec![describe::<ShadowEventFilterQuery>().unwrap()]
}

pub fn refusing_unit() -> Vec<OwnedType> {
    vec![describe::<Refusing>().unwrap()]
}

// ── Session fixtures ──────────────────────────────────────────────────────

pub type TestSession = Session<ArtifactCompiler<FakeBackend>, InProcessLoader>;

/// Create empty source files for `stems` in a fresh folder.
pub fn source_folder(stems: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for stem in stems {
        std::fs::write(dir.path().join(format!("{}.rs", stem)), "// source unit\n").unwrap();
    }
    dir
}

pub fn session_in(dir: &Path, backend: FakeBackend, loader: InProcessLoader) -> TestSession {
    Session::new(dir, ArtifactCompiler::new(backend, true), loader)
}

/// A populated session with the event, tee time and refusing units.
pub fn standard_session() -> (tempfile::TempDir, TestSession) {
    let dir = source_folder(&["events", "refusing", "tee_times"]);
    let loader = InProcessLoader::new()
        .with_unit("events", event_unit)
        .with_unit("refusing", refusing_unit)
        .with_unit("tee_times", tee_unit);
    let mut session = session_in(dir.path(), FakeBackend::default(), loader);
    let report = session.populate(false).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    (dir, session)
}
