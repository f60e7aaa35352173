//! Conversion of operator text into typed property values.

use std::str::FromStr;

use crate::error::CoercionError;
use crate::reflect::{PropertyType, Value, ValueKind};

/// Convert `raw` to a value of `ty`.
///
/// Nullable properties accept `null` (any case) and otherwise coerce to
/// their underlying kind. Numeric, bool and char targets ignore surrounding
/// whitespace. Strings are taken verbatim. Opaque targets always fail.
pub fn coerce(raw: &str, ty: &PropertyType) -> Result<Value, CoercionError> {
    if ty.nullable && raw.trim().eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    coerce_kind(raw, ty.kind)
}

fn coerce_kind(raw: &str, kind: ValueKind) -> Result<Value, CoercionError> {
    let text = raw.trim();
    match kind {
        ValueKind::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(invalid(raw, kind))
            }
        }
        ValueKind::I8 => integer(text, kind).map(Value::I8),
        ValueKind::I16 => integer(text, kind).map(Value::I16),
        ValueKind::I32 => integer(text, kind).map(Value::I32),
        ValueKind::I64 => integer(text, kind).map(Value::I64),
        ValueKind::U8 => integer(text, kind).map(Value::U8),
        ValueKind::U16 => integer(text, kind).map(Value::U16),
        ValueKind::U32 => integer(text, kind).map(Value::U32),
        ValueKind::U64 => integer(text, kind).map(Value::U64),
        ValueKind::F32 => float(text, kind).map(Value::F32),
        ValueKind::F64 => float(text, kind).map(Value::F64),
        ValueKind::Char => single_char(raw)
            .or_else(|| single_char(text))
            .map(Value::Char)
            .ok_or_else(|| invalid(raw, kind)),
        ValueKind::Str => Ok(Value::Str(raw.to_string())),
        ValueKind::Opaque => Err(CoercionError::NotAssignable {
            target: kind.name().to_string(),
        }),
    }
}

fn invalid(raw: &str, kind: ValueKind) -> CoercionError {
    CoercionError::Invalid {
        value: raw.to_string(),
        target: kind.name().to_string(),
    }
}

/// Decimal integer with optional sign that fits the target width.
fn integer<T: FromStr<Err = std::num::ParseIntError>>(
    text: &str,
    kind: ValueKind,
) -> Result<T, CoercionError> {
    use std::num::IntErrorKind;

    text.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CoercionError::OutOfRange {
            value: text.to_string(),
            target: kind.name().to_string(),
        },
        _ => invalid(text, kind),
    })
}

fn float<T: FromStr>(text: &str, kind: ValueKind) -> Result<T, CoercionError> {
    text.parse::<T>().map_err(|_| invalid(text, kind))
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(kind: ValueKind) -> PropertyType {
        PropertyType::new(kind, false)
    }

    fn nullable(kind: ValueKind) -> PropertyType {
        PropertyType::new(kind, true)
    }

    #[test]
    fn integers_parse_with_sign_and_whitespace() {
        assert_eq!(coerce("42", &plain(ValueKind::I32)), Ok(Value::I32(42)));
        assert_eq!(coerce(" -7 ", &plain(ValueKind::I64)), Ok(Value::I64(-7)));
        assert_eq!(coerce("+3", &plain(ValueKind::U8)), Ok(Value::U8(3)));
    }

    #[test]
    fn integers_must_fit_the_target() {
        assert!(matches!(
            coerce("300", &plain(ValueKind::U8)),
            Err(CoercionError::OutOfRange { .. })
        ));
        assert!(matches!(
            coerce("-1", &plain(ValueKind::U32)),
            Err(CoercionError::Invalid { .. })
        ));
        assert!(matches!(
            coerce("abc", &plain(ValueKind::I32)),
            Err(CoercionError::Invalid { .. })
        ));
        assert!(coerce("4.5", &plain(ValueKind::I32)).is_err());
    }

    #[test]
    fn bools_ignore_case() {
        assert_eq!(coerce("TRUE", &plain(ValueKind::Bool)), Ok(Value::Bool(true)));
        assert_eq!(coerce("False", &plain(ValueKind::Bool)), Ok(Value::Bool(false)));
        assert!(coerce("yes", &plain(ValueKind::Bool)).is_err());
    }

    #[test]
    fn floats_use_rust_syntax() {
        assert_eq!(coerce("2.5", &plain(ValueKind::F64)), Ok(Value::F64(2.5)));
        assert_eq!(coerce("1e3", &plain(ValueKind::F32)), Ok(Value::F32(1000.0)));
        assert!(coerce("2,5", &plain(ValueKind::F64)).is_err());
    }

    #[test]
    fn chars_need_exactly_one_character() {
        assert_eq!(coerce(" ", &plain(ValueKind::Char)), Ok(Value::Char(' ')));
        assert_eq!(coerce(" x ", &plain(ValueKind::Char)), Ok(Value::Char('x')));
        assert!(coerce("xy", &plain(ValueKind::Char)).is_err());
        assert!(coerce("", &plain(ValueKind::Char)).is_err());
    }

    #[test]
    fn strings_are_verbatim() {
        assert_eq!(
            coerce("  Pebble Beach ", &plain(ValueKind::Str)),
            Ok(Value::Str("  Pebble Beach ".to_string()))
        );
        assert_eq!(coerce("", &plain(ValueKind::Str)), Ok(Value::Str(String::new())));
    }

    #[test]
    fn nullable_unwraps_to_inner_kind() {
        assert_eq!(coerce("12", &nullable(ValueKind::I32)), Ok(Value::I32(12)));
        assert_eq!(coerce("null", &nullable(ValueKind::I32)), Ok(Value::Null));
        assert_eq!(coerce("NULL", &nullable(ValueKind::Bool)), Ok(Value::Null));
        assert!(coerce("null", &plain(ValueKind::I32)).is_err());
    }

    #[test]
    fn opaque_targets_never_coerce() {
        assert_eq!(
            coerce("[1, 2]", &plain(ValueKind::Opaque)),
            Err(CoercionError::NotAssignable {
                target: "opaque".to_string()
            })
        );
    }
}
