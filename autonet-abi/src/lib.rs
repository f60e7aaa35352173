//! Shared interface crate for the autonet type ABI.
//!
//! Both the autonet host binary and every compiled source unit depend on this
//! crate. It defines the C-ABI contract that crosses the library boundary:
//! the type manifest, property tables, the value encoding, and the
//! `export_types!` / `property!` macros that generate the entry point.
//!
//! Source-unit authors implement [`ExportedType`] for plain Rust structs and
//! enums; all `unsafe` is encapsulated here. The host uses
//! [`manifest_to_types`] to turn a loaded manifest into owned Rust values.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};

mod property;

pub use property::{Property, read_opaque};

/// ABI version — bump on breaking changes to the manifest layout.
pub const ABI_VERSION: u32 = 1;

/// Name of the manifest entry point every compiled unit exports.
pub const MANIFEST_SYMBOL: &[u8] = b"autonet_type_manifest";

/// Status codes returned by the get/set entry points.
pub mod status {
    pub const OK: u32 = 0;
    pub const NO_SUCH_PROPERTY: u32 = 1;
    pub const TYPE_MISMATCH: u32 = 2;
    pub const PANICKED: u32 = 3;
}

// ── Tags ──────────────────────────────────────────────────────────────────

/// How an exported type is classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
}

impl TypeKind {
    pub fn as_u32(self) -> u32 {
        match self {
            TypeKind::Class => 0,
            TypeKind::Struct => 1,
            TypeKind::Enum => 2,
        }
    }

    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TypeKind::Class),
            1 => Some(TypeKind::Struct),
            2 => Some(TypeKind::Enum),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKind::Class => write!(f, "Class"),
            TypeKind::Struct => write!(f, "Struct"),
            TypeKind::Enum => write!(f, "Enum"),
        }
    }
}

/// Wire tag of a [`RawValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    Str,
    /// Readable as text only; never assignable.
    Opaque,
}

const VALUE_TAGS: [ValueTag; 15] = [
    ValueTag::Null,
    ValueTag::Bool,
    ValueTag::I8,
    ValueTag::I16,
    ValueTag::I32,
    ValueTag::I64,
    ValueTag::U8,
    ValueTag::U16,
    ValueTag::U32,
    ValueTag::U64,
    ValueTag::F32,
    ValueTag::F64,
    ValueTag::Char,
    ValueTag::Str,
    ValueTag::Opaque,
];

impl ValueTag {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(raw: u32) -> Option<Self> {
        VALUE_TAGS.get(raw as usize).copied()
    }
}

// ── C-ABI contract types ──────────────────────────────────────────────────

/// A single value crossing the boundary.
///
/// Scalars are stored in `bits` (signed integers sign-extended to 64 bits,
/// floats as their IEEE bit pattern, `char` as its scalar value). Text is a
/// borrowed UTF-8 pointer/length pair, valid only for the call it is passed in.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawValue {
    pub tag: u32,
    pub bits: u64,
    pub text: *const u8,
    pub text_len: usize,
}

impl RawValue {
    pub const NULL: RawValue = RawValue {
        tag: 0,
        bits: 0,
        text: std::ptr::null(),
        text_len: 0,
    };

    fn scalar(tag: ValueTag, bits: u64) -> Self {
        RawValue {
            tag: tag.as_u32(),
            bits,
            text: std::ptr::null(),
            text_len: 0,
        }
    }

    pub fn int(tag: ValueTag, value: i64) -> Self {
        Self::scalar(tag, value as u64)
    }

    pub fn uint(tag: ValueTag, value: u64) -> Self {
        Self::scalar(tag, value)
    }

    pub fn boolean(value: bool) -> Self {
        Self::scalar(ValueTag::Bool, value as u64)
    }

    pub fn float32(value: f32) -> Self {
        Self::scalar(ValueTag::F32, value.to_bits() as u64)
    }

    pub fn float64(value: f64) -> Self {
        Self::scalar(ValueTag::F64, value.to_bits())
    }

    pub fn character(value: char) -> Self {
        Self::scalar(ValueTag::Char, value as u32 as u64)
    }

    /// Borrow `text` for the duration of one call.
    pub fn text(tag: ValueTag, text: &str) -> Self {
        RawValue {
            tag: tag.as_u32(),
            bits: 0,
            text: text.as_ptr(),
            text_len: text.len(),
        }
    }

    pub fn tag(&self) -> Option<ValueTag> {
        ValueTag::from_u32(self.tag)
    }

    pub fn as_i64(&self) -> i64 {
        self.bits as i64
    }

    pub fn as_u64(&self) -> u64 {
        self.bits
    }

    pub fn as_bool(&self) -> bool {
        self.bits != 0
    }

    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.bits as u32)
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.bits)
    }

    pub fn as_char(&self) -> Option<char> {
        u32::try_from(self.bits).ok().and_then(char::from_u32)
    }

    /// View the text payload.
    ///
    /// # Safety
    /// The pointer must still be valid, i.e. this must be called within the
    /// call that received the value.
    pub unsafe fn as_text(&self) -> Option<&str> {
        if self.text.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.text, self.text_len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Receives a value produced by a get entry point.
pub type EmitFn = extern "C" fn(sink: *mut c_void, value: *const RawValue);

/// Construct a default instance. Null means activation failed.
pub type ConstructFn = unsafe extern "C" fn() -> *mut c_void;

/// Drop an instance produced by the matching `ConstructFn`.
pub type DestroyFn = unsafe extern "C" fn(instance: *mut c_void);

/// Read property `index` of `instance`, delivering the value through `emit`.
pub type GetFn = unsafe extern "C" fn(
    table: *const c_void,
    instance: *const c_void,
    index: usize,
    sink: *mut c_void,
    emit: EmitFn,
) -> u32;

/// Assign property `index` of `instance` from `value`.
pub type SetFn = unsafe extern "C" fn(
    table: *const c_void,
    instance: *mut c_void,
    index: usize,
    value: *const RawValue,
) -> u32;

/// One property descriptor in the C ABI.
#[repr(C)]
pub struct RawProperty {
    pub name: *const u8,
    pub name_len: usize,
    /// Display name of the Rust type (e.g. "Option<i32>").
    pub type_name: *const u8,
    pub type_name_len: usize,
    /// `ValueTag` of non-null values.
    pub tag: u32,
    pub nullable: u8,
    /// 1 if declared on the type itself, 0 if inherited from a base.
    pub declared: u8,
}

/// One exported type in the C ABI.
#[repr(C)]
pub struct RawType {
    pub name: *const u8,
    pub name_len: usize,
    pub full_name: *const u8,
    pub full_name_len: usize,
    /// `TypeKind` as u32.
    pub kind: u32,
    pub properties: *const RawProperty,
    pub property_count: usize,
    /// Opaque accessor table passed back to `get` / `set`.
    pub table: *const c_void,
    pub construct: ConstructFn,
    pub destroy: DestroyFn,
    pub get: GetFn,
    pub set: SetFn,
}

/// Manifest returned by a unit's `autonet_type_manifest` entry point.
#[repr(C)]
pub struct TypeManifest {
    /// Must match `autonet_abi::ABI_VERSION`.
    pub abi_version: u32,
    /// `status::OK`, or `status::PANICKED` if describing the types panicked.
    pub status: u32,
    pub unit_name: *const u8,
    pub unit_name_len: usize,
    pub types: *const RawType,
    pub type_count: usize,
}

/// Signature of the manifest entry point.
pub type ManifestFn = extern "C" fn() -> TypeManifest;

// ── Guest side: describing exported types ─────────────────────────────────

/// A Rust type exported from a source unit.
pub trait ExportedType: Sized + 'static {
    /// Short name (e.g. "EventFilterQuery").
    const NAME: &'static str;
    /// Fully-qualified name; the host's registry key.
    const FULL_NAME: &'static str;
    const KIND: TypeKind;

    /// Public properties, declared ones and inherited ones.
    fn properties() -> Vec<PropertySpec<Self>>;

    /// Default (zero-argument) construction. `None` when the type has no
    /// usable default instance.
    fn construct() -> Option<Self>;
}

/// Accessors for one property of `T`.
pub struct PropertySpec<T> {
    pub name: &'static str,
    pub declared: bool,
    pub tag: ValueTag,
    pub nullable: bool,
    pub type_name: String,
    pub read: fn(&T, &mut dyn FnMut(&RawValue)),
    pub write: fn(&mut T, &RawValue) -> bool,
}

impl<T> PropertySpec<T> {
    /// Build a spec; `shape` only pins down the field type `P`.
    pub fn new<P: Property>(
        name: &'static str,
        declared: bool,
        _shape: fn(&T) -> PhantomData<P>,
        read: fn(&T, &mut dyn FnMut(&RawValue)),
        write: fn(&mut T, &RawValue) -> bool,
    ) -> Self {
        PropertySpec {
            name,
            declared,
            tag: P::TAG,
            nullable: P::NULLABLE,
            type_name: P::type_name(),
            read,
            write,
        }
    }
}

/// Type witness used by the `property!` macro.
pub fn shape_of<P>(_field: &P) -> PhantomData<P> {
    PhantomData
}

/// Declare one property inside `ExportedType::properties`.
///
/// `property!("Name" => field)` declares a property backed by `self.field`;
/// `property!(inherited "MaxRows" => base.max_rows)` declares one reached
/// through an embedded base value.
#[macro_export]
macro_rules! property {
    (@build $declared:expr, $name:literal, $($field:ident).+) => {
        $crate::PropertySpec::new(
            $name,
            $declared,
            |target: &Self| $crate::shape_of(&target.$($field).+),
            |target: &Self, emit: &mut dyn FnMut(&$crate::RawValue)| {
                $crate::Property::read(&target.$($field).+, emit)
            },
            |target: &mut Self, raw: &$crate::RawValue| match $crate::Property::write(raw) {
                Some(value) => {
                    target.$($field).+ = value;
                    true
                }
                None => false,
            },
        )
    };
    (inherited $name:literal => $($field:ident).+) => {
        $crate::property!(@build false, $name, $($field).+)
    };
    ($name:literal => $($field:ident).+) => {
        $crate::property!(@build true, $name, $($field).+)
    };
}

unsafe extern "C" fn construct_thunk<T: ExportedType>() -> *mut c_void {
    match catch_unwind(T::construct) {
        Ok(Some(value)) => Box::into_raw(Box::new(value)).cast(),
        _ => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn destroy_thunk<T: ExportedType>(instance: *mut c_void) {
    if instance.is_null() {
        return;
    }
    let boxed = unsafe { Box::from_raw(instance.cast::<T>()) };
    let _ = catch_unwind(AssertUnwindSafe(move || drop(boxed)));
}

unsafe extern "C" fn get_thunk<T: ExportedType>(
    table: *const c_void,
    instance: *const c_void,
    index: usize,
    sink: *mut c_void,
    emit: EmitFn,
) -> u32 {
    let specs = unsafe { &*table.cast::<Vec<PropertySpec<T>>>() };
    let Some(spec) = specs.get(index) else {
        return status::NO_SUCH_PROPERTY;
    };
    let target = unsafe { &*instance.cast::<T>() };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        (spec.read)(target, &mut |raw: &RawValue| emit(sink, raw))
    }));
    match outcome {
        Ok(()) => status::OK,
        Err(_) => status::PANICKED,
    }
}

unsafe extern "C" fn set_thunk<T: ExportedType>(
    table: *const c_void,
    instance: *mut c_void,
    index: usize,
    value: *const RawValue,
) -> u32 {
    let specs = unsafe { &*table.cast::<Vec<PropertySpec<T>>>() };
    let Some(spec) = specs.get(index) else {
        return status::NO_SUCH_PROPERTY;
    };
    let target = unsafe { &mut *instance.cast::<T>() };
    let raw = unsafe { &*value };
    match catch_unwind(AssertUnwindSafe(|| (spec.write)(target, raw))) {
        Ok(true) => status::OK,
        Ok(false) => status::TYPE_MISMATCH,
        Err(_) => status::PANICKED,
    }
}

fn leak_str(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

/// Build the C-ABI descriptor for `T`.
///
/// Property specs and names are leaked: descriptors live as long as the
/// library that exported them, which the host never unloads.
pub fn raw_type<T: ExportedType>() -> RawType {
    let specs: &'static Vec<PropertySpec<T>> = Box::leak(Box::new(T::properties()));
    let properties: &'static [RawProperty] = Box::leak(
        specs
            .iter()
            .map(|spec| {
                let type_name = leak_str(spec.type_name.clone());
                RawProperty {
                    name: spec.name.as_ptr(),
                    name_len: spec.name.len(),
                    type_name: type_name.as_ptr(),
                    type_name_len: type_name.len(),
                    tag: spec.tag.as_u32(),
                    nullable: spec.nullable as u8,
                    declared: spec.declared as u8,
                }
            })
            .collect::<Vec<_>>()
            .into_boxed_slice(),
    );

    RawType {
        name: T::NAME.as_ptr(),
        name_len: T::NAME.len(),
        full_name: T::FULL_NAME.as_ptr(),
        full_name_len: T::FULL_NAME.len(),
        kind: T::KIND.as_u32(),
        properties: properties.as_ptr(),
        property_count: properties.len(),
        table: (specs as *const Vec<PropertySpec<T>>).cast(),
        construct: construct_thunk::<T>,
        destroy: destroy_thunk::<T>,
        get: get_thunk::<T>,
        set: set_thunk::<T>,
    }
}

/// Build a manifest from the unit's descriptor list.
pub fn manifest(unit_name: &'static str, build: fn() -> Vec<RawType>) -> TypeManifest {
    let (status, types) = match catch_unwind(build) {
        Ok(types) => (status::OK, types),
        Err(_) => (status::PANICKED, Vec::new()),
    };
    let types: &'static [RawType] = Box::leak(types.into_boxed_slice());
    TypeManifest {
        abi_version: ABI_VERSION,
        status,
        unit_name: unit_name.as_ptr(),
        unit_name_len: unit_name.len(),
        types: types.as_ptr(),
        type_count: types.len(),
    }
}

/// Declare the types a source unit exports.
///
/// Generates the `autonet_type_manifest` entry point the host looks up
/// after loading the compiled library.
///
/// # Example
///
/// ```ignore
/// use autonet_abi::*;
///
/// #[derive(Default)]
/// pub struct BaseQuery { pub max_rows: i32 }
///
/// impl ExportedType for BaseQuery {
///     const NAME: &'static str = "BaseQuery";
///     const FULL_NAME: &'static str = "queries::BaseQuery";
///     const KIND: TypeKind = TypeKind::Class;
///
///     fn properties() -> Vec<PropertySpec<Self>> {
///         vec![property!("MaxRows" => max_rows)]
///     }
///
///     fn construct() -> Option<Self> {
///         Some(Self::default())
///     }
/// }
///
/// export_types! {
///     unit: "base_query",
///     types: [BaseQuery],
/// }
/// ```
#[macro_export]
macro_rules! export_types {
    (
        unit: $unit:literal,
        types: [$($ty:ty),* $(,)?] $(,)?
    ) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn autonet_type_manifest() -> $crate::TypeManifest {
            $crate::manifest($unit, || vec![$($crate::raw_type::<$ty>(),)*])
        }
    };
}

// ── Host side: owned descriptors ──────────────────────────────────────────

/// Safe Rust descriptor for one property, converted from C-ABI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedProperty {
    pub name: String,
    pub type_name: String,
    pub tag: ValueTag,
    pub nullable: bool,
    pub declared: bool,
}

/// Safe Rust descriptor for one exported type, converted from C-ABI.
///
/// The entry points and `table` stay valid while the exporting library is
/// loaded.
#[derive(Clone)]
pub struct OwnedType {
    pub name: String,
    pub full_name: String,
    pub kind: TypeKind,
    pub properties: Vec<OwnedProperty>,
    pub table: *const c_void,
    pub construct: ConstructFn,
    pub destroy: DestroyFn,
    pub get: GetFn,
    pub set: SetFn,
}

// Safety: the table is immutable after construction and the entry points are
// plain functions; instance pointers are never stored in an OwnedType.
unsafe impl Send for OwnedType {}
unsafe impl Sync for OwnedType {}

impl std::fmt::Debug for OwnedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedType")
            .field("name", &self.name)
            .field("full_name", &self.full_name)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

unsafe fn string_from_raw(ptr: *const u8, len: usize, what: &str) -> Result<String, String> {
    if ptr.is_null() {
        return if len == 0 {
            Ok(String::new())
        } else {
            Err(format!("null pointer for {}", what))
        };
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| format!("invalid UTF-8 in {}: {}", what, e))
}

/// Convert one C-ABI type descriptor into an owned one.
///
/// # Safety
/// All pointers in `raw` must be valid and point to UTF-8 data.
pub unsafe fn owned_type(raw: &RawType) -> Result<OwnedType, String> {
    let name = unsafe { string_from_raw(raw.name, raw.name_len, "type name")? };
    let full_name = unsafe { string_from_raw(raw.full_name, raw.full_name_len, "full type name")? };
    let kind = TypeKind::from_u32(raw.kind)
        .ok_or_else(|| format!("unknown type kind {} for {}", raw.kind, full_name))?;

    let raw_properties = if raw.property_count == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(raw.properties, raw.property_count) }
    };

    let mut properties = Vec::with_capacity(raw_properties.len());
    for prop in raw_properties {
        let prop_name = unsafe { string_from_raw(prop.name, prop.name_len, "property name")? };
        let type_name =
            unsafe { string_from_raw(prop.type_name, prop.type_name_len, "property type")? };
        let tag = ValueTag::from_u32(prop.tag)
            .ok_or_else(|| format!("unknown value tag {} on {}.{}", prop.tag, full_name, prop_name))?;
        properties.push(OwnedProperty {
            name: prop_name,
            type_name,
            tag,
            nullable: prop.nullable != 0,
            declared: prop.declared != 0,
        });
    }

    Ok(OwnedType {
        name,
        full_name,
        kind,
        properties,
        table: raw.table,
        construct: raw.construct,
        destroy: raw.destroy,
        get: raw.get,
        set: raw.set,
    })
}

/// Convert a C-ABI manifest into owned descriptors.
/// Returns (unit name, types).
///
/// # Safety
/// All pointers in the manifest must be valid and point to UTF-8 data.
pub unsafe fn manifest_to_types(manifest: &TypeManifest) -> Result<(String, Vec<OwnedType>), String> {
    if manifest.status != status::OK {
        return Err(format!("manifest reported status {}", manifest.status));
    }
    let unit_name = unsafe { string_from_raw(manifest.unit_name, manifest.unit_name_len, "unit name")? };
    let raw_types = if manifest.type_count == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(manifest.types, manifest.type_count) }
    };
    let mut types = Vec::with_capacity(raw_types.len());
    for raw in raw_types {
        types.push(unsafe { owned_type(raw)? });
    }
    Ok((unit_name, types))
}

/// Describe a type linked into the current process, without a library.
pub fn describe<T: ExportedType>() -> Result<OwnedType, String> {
    // Safety: raw_type only produces leaked, valid UTF-8 descriptors.
    unsafe { owned_type(&raw_type::<T>()) }
}
