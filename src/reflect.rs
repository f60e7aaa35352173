//! Host-side view of exported types: type handles, live instances and the
//! value model used for property traffic.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use autonet_abi::{OwnedType, RawValue, TypeKind, ValueTag, status};

use crate::loader::LoadedArtifact;

/// Kind of a non-null property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
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
    Opaque,
}

impl ValueKind {
    pub fn from_tag(tag: ValueTag) -> Option<Self> {
        Some(match tag {
            ValueTag::Null => return None,
            ValueTag::Bool => ValueKind::Bool,
            ValueTag::I8 => ValueKind::I8,
            ValueTag::I16 => ValueKind::I16,
            ValueTag::I32 => ValueKind::I32,
            ValueTag::I64 => ValueKind::I64,
            ValueTag::U8 => ValueKind::U8,
            ValueTag::U16 => ValueKind::U16,
            ValueTag::U32 => ValueKind::U32,
            ValueTag::U64 => ValueKind::U64,
            ValueTag::F32 => ValueKind::F32,
            ValueTag::F64 => ValueKind::F64,
            ValueTag::Char => ValueKind::Char,
            ValueTag::Str => ValueKind::Str,
            ValueTag::Opaque => ValueKind::Opaque,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Char => "char",
            ValueKind::Str => "String",
            ValueKind::Opaque => "opaque",
        }
    }
}

/// Declared type of a property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyType {
    pub kind: ValueKind,
    /// `Option<_>` over `kind`.
    pub nullable: bool,
    /// Rust spelling of the field type, e.g. `Option<i32>`.
    pub display_name: String,
}

impl PropertyType {
    pub fn new(kind: ValueKind, nullable: bool) -> Self {
        let display_name = if nullable {
            format!("Option<{}>", kind.name())
        } else {
            kind.name().to_string()
        };
        Self {
            kind,
            nullable,
            display_name,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// One public property of an exported type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: PropertyType,
    /// False when the property is reached through an embedded base.
    pub declared: bool,
    /// Position in the type's property table.
    pub index: usize,
}

/// A property value read from or written to an instance.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    /// Debug rendering of a value with no scalar or text form.
    Opaque(String),
}

impl Value {
    /// Decode a value received from type code.
    ///
    /// # Safety
    /// Text pointers in `raw` must be valid for the duration of this call.
    unsafe fn from_raw(raw: &RawValue) -> Option<Value> {
        let text = || unsafe { raw.as_text() }.map(str::to_string);
        Some(match raw.tag()? {
            ValueTag::Null => Value::Null,
            ValueTag::Bool => Value::Bool(raw.as_bool()),
            ValueTag::I8 => Value::I8(i8::try_from(raw.as_i64()).ok()?),
            ValueTag::I16 => Value::I16(i16::try_from(raw.as_i64()).ok()?),
            ValueTag::I32 => Value::I32(i32::try_from(raw.as_i64()).ok()?),
            ValueTag::I64 => Value::I64(raw.as_i64()),
            ValueTag::U8 => Value::U8(u8::try_from(raw.as_u64()).ok()?),
            ValueTag::U16 => Value::U16(u16::try_from(raw.as_u64()).ok()?),
            ValueTag::U32 => Value::U32(u32::try_from(raw.as_u64()).ok()?),
            ValueTag::U64 => Value::U64(raw.as_u64()),
            ValueTag::F32 => Value::F32(raw.as_f32()),
            ValueTag::F64 => Value::F64(raw.as_f64()),
            ValueTag::Char => Value::Char(raw.as_char()?),
            ValueTag::Str => Value::Str(text()?),
            ValueTag::Opaque => Value::Opaque(text()?),
        })
    }

    /// Encode for type code. The `RawValue` borrows from `self`.
    fn with_raw<R>(&self, f: impl FnOnce(&RawValue) -> R) -> R {
        let raw = match self {
            Value::Null => RawValue::NULL,
            Value::Bool(v) => RawValue::boolean(*v),
            Value::I8(v) => RawValue::int(ValueTag::I8, *v as i64),
            Value::I16(v) => RawValue::int(ValueTag::I16, *v as i64),
            Value::I32(v) => RawValue::int(ValueTag::I32, *v as i64),
            Value::I64(v) => RawValue::int(ValueTag::I64, *v),
            Value::U8(v) => RawValue::uint(ValueTag::U8, *v as u64),
            Value::U16(v) => RawValue::uint(ValueTag::U16, *v as u64),
            Value::U32(v) => RawValue::uint(ValueTag::U32, *v as u64),
            Value::U64(v) => RawValue::uint(ValueTag::U64, *v),
            Value::F32(v) => RawValue::float32(*v),
            Value::F64(v) => RawValue::float64(*v),
            Value::Char(v) => RawValue::character(*v),
            Value::Str(s) => RawValue::text(ValueTag::Str, s),
            Value::Opaque(s) => RawValue::text(ValueTag::Opaque, s),
        };
        f(&raw)
    }
}

/// Strings are shown quoted, absent values as `null`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Opaque(s) => f.write_str(s),
        }
    }
}

/// Type code reported a failure through a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestFailure(pub String);

impl GuestFailure {
    fn from_status(code: u32) -> Self {
        GuestFailure(match code {
            status::NO_SUCH_PROPERTY => "no such property in type table".to_string(),
            status::TYPE_MISMATCH => "value rejected by type code".to_string(),
            status::PANICKED => "type code panicked".to_string(),
            other => format!("unknown status {}", other),
        })
    }
}

/// Runtime handle of one exported type: its property table and entry points.
///
/// Holds the artifact that exported it, so the code stays mapped while the
/// handle (or any instance of it) is alive.
pub struct TypeHandle {
    name: String,
    full_name: String,
    kind: TypeKind,
    properties: Vec<PropertyInfo>,
    raw: OwnedType,
    _artifact: Arc<LoadedArtifact>,
}

impl TypeHandle {
    pub fn new(raw: OwnedType, artifact: Arc<LoadedArtifact>) -> Result<Self, String> {
        let mut properties = Vec::with_capacity(raw.properties.len());
        for (index, prop) in raw.properties.iter().enumerate() {
            let kind = ValueKind::from_tag(prop.tag).ok_or_else(|| {
                format!("property {}.{} has no value kind", raw.full_name, prop.name)
            })?;
            let mut ty = PropertyType::new(kind, prop.nullable);
            if !prop.type_name.is_empty() {
                ty.display_name = prop.type_name.clone();
            }
            properties.push(PropertyInfo {
                name: prop.name.clone(),
                ty,
                declared: prop.declared,
                index,
            });
        }
        Ok(Self {
            name: raw.name.clone(),
            full_name: raw.full_name.clone(),
            kind: raw.kind,
            properties,
            raw,
            _artifact: artifact,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// All properties, declared and inherited.
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Property declared on this type itself, by exact name.
    pub fn declared_property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.declared && p.name == name)
    }

    /// Construct a default instance. `None` if the type refused or panicked.
    pub fn instantiate(self: &Arc<Self>) -> Option<Instance> {
        // Safety: construct is the type's own constructor thunk.
        let ptr = unsafe { (self.raw.construct)() };
        NonNull::new(ptr).map(|ptr| Instance {
            handle: Arc::clone(self),
            ptr,
        })
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("full_name", &self.full_name)
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

/// A live instance owned by the host, destroyed through its type on drop.
pub struct Instance {
    handle: Arc<TypeHandle>,
    ptr: NonNull<c_void>,
}

extern "C" fn collect_value(sink: *mut c_void, value: *const RawValue) {
    // Safety: sink is the `Option<Value>` passed by `Instance::read`.
    let slot = unsafe { &mut *sink.cast::<Option<Value>>() };
    *slot = unsafe { Value::from_raw(&*value) };
}

impl Instance {
    pub fn type_handle(&self) -> &Arc<TypeHandle> {
        &self.handle
    }

    /// Read one property.
    pub fn read(&self, prop: &PropertyInfo) -> Result<Value, GuestFailure> {
        let mut slot: Option<Value> = None;
        let raw = &self.handle.raw;
        // Safety: ptr came from this type's constructor and is still alive.
        let code = unsafe {
            (raw.get)(
                raw.table,
                self.ptr.as_ptr(),
                prop.index,
                (&mut slot as *mut Option<Value>).cast(),
                collect_value,
            )
        };
        if code != status::OK {
            return Err(GuestFailure::from_status(code));
        }
        slot.ok_or_else(|| GuestFailure("type code produced no readable value".to_string()))
    }

    /// Write one property.
    pub fn write(&mut self, prop: &PropertyInfo, value: &Value) -> Result<(), GuestFailure> {
        let raw = &self.handle.raw;
        let ptr = self.ptr.as_ptr();
        // Safety: as in `read`; the RawValue only lives for the call.
        let code = value.with_raw(|value| unsafe { (raw.set)(raw.table, ptr, prop.index, value) });
        if code == status::OK {
            Ok(())
        } else {
            Err(GuestFailure::from_status(code))
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // Safety: ptr came from the matching constructor and is dropped once.
        unsafe { (self.handle.raw.destroy)(self.ptr.as_ptr()) }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.handle.full_name)
            .finish_non_exhaustive()
    }
}
