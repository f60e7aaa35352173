use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use autonet_abi::TypeKind;

use crate::reflect::TypeHandle;
use crate::source::SourceUnit;

/// One exported type discovered inside an artifact.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    origin: SourceUnit,
    artifact_path: PathBuf,
    handle: Arc<TypeHandle>,
}

impl TypeDescriptor {
    pub fn new(origin: SourceUnit, artifact_path: PathBuf, handle: Arc<TypeHandle>) -> Self {
        Self {
            origin,
            artifact_path,
            handle,
        }
    }

    pub fn origin(&self) -> &SourceUnit {
        &self.origin
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn handle(&self) -> &Arc<TypeHandle> {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Registry key.
    pub fn full_name(&self) -> &str {
        self.handle.full_name()
    }

    pub fn kind(&self) -> TypeKind {
        self.handle.kind()
    }
}

/// Fully-qualified name → descriptor. The first registration of a name wins.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already taken. Returns whether it was added.
    pub fn insert(&mut self, descriptor: TypeDescriptor) -> bool {
        if self.types.contains_key(descriptor.full_name()) {
            return false;
        }
        self.types
            .insert(descriptor.full_name().to_string(), descriptor);
        true
    }

    pub fn get(&self, full_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.types.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Descriptors ordered by fully-qualified name.
    pub fn sorted(&self) -> Vec<&TypeDescriptor> {
        let mut all: Vec<_> = self.types.values().collect();
        all.sort_by(|a, b| a.full_name().cmp(b.full_name()));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadedArtifact;
    use autonet_abi::{ExportedType, PropertySpec, describe};

    struct Marker;

    impl ExportedType for Marker {
        const NAME: &'static str = "Marker";
        const FULL_NAME: &'static str = "registry::Marker";
        const KIND: TypeKind = TypeKind::Enum;

        fn properties() -> Vec<PropertySpec<Self>> {
            Vec::new()
        }

        fn construct() -> Option<Self> {
            Some(Marker)
        }
    }

    fn descriptor(unit: &str) -> TypeDescriptor {
        let artifact = Arc::new(LoadedArtifact::in_process(unit));
        let handle = TypeHandle::new(describe::<Marker>().unwrap(), artifact).unwrap();
        TypeDescriptor::new(
            SourceUnit::new(format!("{}.rs", unit)),
            PathBuf::from(format!("{}.so", unit)),
            Arc::new(handle),
        )
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = TypeRegistry::new();
        assert!(registry.insert(descriptor("first")));
        assert!(!registry.insert(descriptor("second")));
        assert_eq!(registry.len(), 1);
        let kept = registry.get("registry::Marker").unwrap();
        assert_eq!(kept.origin().stem(), "first");
        assert_eq!(kept.kind(), TypeKind::Enum);
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut registry = TypeRegistry::new();
        registry.insert(descriptor("first"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("registry::Marker"));
    }
}
