//! Mapping between Rust field types and the wire values carried by `RawValue`.
//!
//! Scalars travel in `RawValue::bits`, text travels as a borrowed pointer and
//! length. Types with no scalar or text form are exported as *opaque*: the
//! host can display them (via `Debug`) but never assign them from text.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use crate::{RawValue, ValueTag};

/// A field type that can be read and written across the type boundary.
pub trait Property: Sized {
    /// Wire tag for non-null values of this type.
    const TAG: ValueTag;
    /// Whether the property may hold no value (`Option<T>`).
    const NULLABLE: bool = false;

    /// Human-readable type name shown by the host (`i32`, `Option<String>`).
    fn type_name() -> String;

    /// Encode the current value and hand it to `emit`.
    ///
    /// The `RawValue` passed to `emit` may borrow from `self` or from a
    /// temporary; it is only valid for the duration of the call.
    fn read(&self, emit: &mut dyn FnMut(&RawValue));

    /// Decode a value sent by the host. `None` means the tag does not match.
    fn write(raw: &RawValue) -> Option<Self>;
}

macro_rules! signed_property {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Property for $ty {
                const TAG: ValueTag = ValueTag::$tag;

                fn type_name() -> String {
                    stringify!($ty).to_string()
                }

                fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
                    emit(&RawValue::int(ValueTag::$tag, *self as i64));
                }

                fn write(raw: &RawValue) -> Option<Self> {
                    if raw.tag() != Some(ValueTag::$tag) {
                        return None;
                    }
                    <$ty>::try_from(raw.as_i64()).ok()
                }
            }
        )*
    };
}

macro_rules! unsigned_property {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Property for $ty {
                const TAG: ValueTag = ValueTag::$tag;

                fn type_name() -> String {
                    stringify!($ty).to_string()
                }

                fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
                    emit(&RawValue::uint(ValueTag::$tag, *self as u64));
                }

                fn write(raw: &RawValue) -> Option<Self> {
                    if raw.tag() != Some(ValueTag::$tag) {
                        return None;
                    }
                    <$ty>::try_from(raw.as_u64()).ok()
                }
            }
        )*
    };
}

signed_property!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
unsigned_property!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl Property for bool {
    const TAG: ValueTag = ValueTag::Bool;

    fn type_name() -> String {
        "bool".to_string()
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        emit(&RawValue::boolean(*self));
    }

    fn write(raw: &RawValue) -> Option<Self> {
        (raw.tag() == Some(ValueTag::Bool)).then(|| raw.as_bool())
    }
}

impl Property for f32 {
    const TAG: ValueTag = ValueTag::F32;

    fn type_name() -> String {
        "f32".to_string()
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        emit(&RawValue::float32(*self));
    }

    fn write(raw: &RawValue) -> Option<Self> {
        (raw.tag() == Some(ValueTag::F32)).then(|| raw.as_f32())
    }
}

impl Property for f64 {
    const TAG: ValueTag = ValueTag::F64;

    fn type_name() -> String {
        "f64".to_string()
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        emit(&RawValue::float64(*self));
    }

    fn write(raw: &RawValue) -> Option<Self> {
        (raw.tag() == Some(ValueTag::F64)).then(|| raw.as_f64())
    }
}

impl Property for char {
    const TAG: ValueTag = ValueTag::Char;

    fn type_name() -> String {
        "char".to_string()
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        emit(&RawValue::character(*self));
    }

    fn write(raw: &RawValue) -> Option<Self> {
        if raw.tag() != Some(ValueTag::Char) {
            return None;
        }
        raw.as_char()
    }
}

impl Property for String {
    const TAG: ValueTag = ValueTag::Str;

    fn type_name() -> String {
        "String".to_string()
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        emit(&RawValue::text(ValueTag::Str, self));
    }

    fn write(raw: &RawValue) -> Option<Self> {
        if raw.tag() != Some(ValueTag::Str) {
            return None;
        }
        // Safety: the host keeps the text alive for the duration of the set call.
        unsafe { raw.as_text() }.map(str::to_string)
    }
}

impl<T: Property> Property for Option<T> {
    const TAG: ValueTag = T::TAG;
    const NULLABLE: bool = true;

    fn type_name() -> String {
        format!("Option<{}>", T::type_name())
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        match self {
            Some(value) => value.read(emit),
            None => emit(&RawValue::NULL),
        }
    }

    fn write(raw: &RawValue) -> Option<Self> {
        if raw.tag() == Some(ValueTag::Null) {
            return Some(None);
        }
        T::write(raw).map(Some)
    }
}

/// Read a value through its `Debug` form. Shared by every opaque property.
pub fn read_opaque<T: Debug + ?Sized>(value: &T, emit: &mut dyn FnMut(&RawValue)) {
    let text = format!("{:?}", value);
    emit(&RawValue::text(ValueTag::Opaque, &text));
}

impl<T: Debug> Property for Vec<T> {
    const TAG: ValueTag = ValueTag::Opaque;

    fn type_name() -> String {
        format!("Vec<{}>", std::any::type_name::<T>())
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        read_opaque(self, emit);
    }

    fn write(_raw: &RawValue) -> Option<Self> {
        None
    }
}

impl<T: Debug> Property for VecDeque<T> {
    const TAG: ValueTag = ValueTag::Opaque;

    fn type_name() -> String {
        format!("VecDeque<{}>", std::any::type_name::<T>())
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        read_opaque(self, emit);
    }

    fn write(_raw: &RawValue) -> Option<Self> {
        None
    }
}

impl<T: Debug> Property for HashSet<T> {
    const TAG: ValueTag = ValueTag::Opaque;

    fn type_name() -> String {
        format!("HashSet<{}>", std::any::type_name::<T>())
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        read_opaque(self, emit);
    }

    fn write(_raw: &RawValue) -> Option<Self> {
        None
    }
}

impl<K: Debug, V: Debug> Property for HashMap<K, V> {
    const TAG: ValueTag = ValueTag::Opaque;

    fn type_name() -> String {
        format!(
            "HashMap<{}, {}>",
            std::any::type_name::<K>(),
            std::any::type_name::<V>()
        )
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        read_opaque(self, emit);
    }

    fn write(_raw: &RawValue) -> Option<Self> {
        None
    }
}

impl<K: Debug, V: Debug> Property for BTreeMap<K, V> {
    const TAG: ValueTag = ValueTag::Opaque;

    fn type_name() -> String {
        format!(
            "BTreeMap<{}, {}>",
            std::any::type_name::<K>(),
            std::any::type_name::<V>()
        )
    }

    fn read(&self, emit: &mut dyn FnMut(&RawValue)) {
        read_opaque(self, emit);
    }

    fn write(_raw: &RawValue) -> Option<Self> {
        None
    }
}

/// Implement [`Property`] for user types (usually enums) as read-only opaque
/// values rendered with `Debug`.
///
/// ```ignore
/// #[derive(Debug, Default)]
/// pub enum TimeOfDay { #[default] Morning, Afternoon }
///
/// opaque_property!(TimeOfDay);
/// ```
#[macro_export]
macro_rules! opaque_property {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Property for $ty {
                const TAG: $crate::ValueTag = $crate::ValueTag::Opaque;

                fn type_name() -> String {
                    stringify!($ty).to_string()
                }

                fn read(&self, emit: &mut dyn FnMut(&$crate::RawValue)) {
                    $crate::read_opaque(self, emit);
                }

                fn write(_raw: &$crate::RawValue) -> Option<Self> {
                    None
                }
            }
        )+
    };
}
