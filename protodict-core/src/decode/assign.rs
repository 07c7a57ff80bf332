//! Typed assignment of dynamic values to protobuf values.
//!
//! This is the last step of decoding a scalar: after the optional coercion the value
//! must have the exact shape of the target type, or the assignment fails.
use crate::coercion::{self, CoercionError, ScalarType};
use crate::timestamp::TimestampError;
use crate::value::Value;
use prost_reflect::{MapKey, Value as ProstValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: ScalarType },
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

impl AssignError {
    pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        AssignError::TypeMismatch {
            expected: expected.into(),
            found: found.type_name(),
        }
    }
}

/// Converts `value` into a prost value of type `ty`.
///
/// Integers are range checked, floats accept integers, bytes accept strings and
/// sequences of small integers. Nothing else is converted implicitly.
pub fn scalar(ty: ScalarType, value: &Value) -> Result<ProstValue, AssignError> {
    match ty {
        ScalarType::Double => float(ty, value).map(ProstValue::F64),
        ScalarType::Float => float(ty, value).map(|f| ProstValue::F32(f as f32)),
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            int(ty, value).map(ProstValue::I32)
        }
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            int(ty, value).map(ProstValue::I64)
        }
        ScalarType::Uint32 | ScalarType::Fixed32 => int(ty, value).map(ProstValue::U32),
        ScalarType::Uint64 | ScalarType::Fixed64 => int(ty, value).map(ProstValue::U64),
        ScalarType::Enum => int(ty, value).map(ProstValue::EnumNumber),
        ScalarType::Bool => match value {
            Value::Bool(b) => Ok(ProstValue::Bool(*b)),
            other => Err(AssignError::mismatch(ty.name(), other)),
        },
        ScalarType::String => match value {
            Value::String(s) => Ok(ProstValue::String(s.clone())),
            other => Err(AssignError::mismatch(ty.name(), other)),
        },
        ScalarType::Bytes => match value {
            Value::Bytes(b) => Ok(ProstValue::Bytes(bytes::Bytes::copy_from_slice(b))),
            Value::String(_) | Value::Sequence(_) => match coercion::to_bytes(value.clone())? {
                Value::Bytes(b) => Ok(ProstValue::Bytes(b.into())),
                other => Err(AssignError::mismatch(ty.name(), &other)),
            },
            other => Err(AssignError::mismatch(ty.name(), other)),
        },
    }
}

/// Converts `value` into a map key of type `ty`. Strings are parsed for integer and
/// bool keys, since text formats can only carry string keys.
pub fn map_key(ty: ScalarType, value: &Value) -> Result<MapKey, AssignError> {
    match ty {
        ScalarType::String => match value {
            Value::String(s) => Ok(MapKey::String(s.clone())),
            other => Err(AssignError::mismatch(ty.name(), other)),
        },
        ScalarType::Bool => match value {
            Value::Bool(b) => Ok(MapKey::Bool(*b)),
            Value::String(_) => match coercion::to_bool(value.clone())? {
                Value::Bool(b) => Ok(MapKey::Bool(b)),
                other => Err(AssignError::mismatch(ty.name(), &other)),
            },
            other => Err(AssignError::mismatch(ty.name(), other)),
        },
        _ => {
            let numeric = match value {
                Value::String(_) => coercion::to_int(value.clone())?,
                other => other.clone(),
            };
            match ty {
                ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                    int(ty, &numeric).map(MapKey::I32)
                }
                ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                    int(ty, &numeric).map(MapKey::I64)
                }
                ScalarType::Uint32 | ScalarType::Fixed32 => int(ty, &numeric).map(MapKey::U32),
                ScalarType::Uint64 | ScalarType::Fixed64 => int(ty, &numeric).map(MapKey::U64),
                _ => Err(AssignError::TypeMismatch {
                    expected: "a valid map key type".to_string(),
                    found: value.type_name(),
                }),
            }
        }
    }
}

fn int<T>(ty: ScalarType, value: &Value) -> Result<T, AssignError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let out_of_range = || AssignError::OutOfRange {
        value: format!("{value:?}"),
        target: ty,
    };
    match value {
        Value::Int(i) => T::try_from(*i).map_err(|_| out_of_range()),
        Value::UInt(u) => T::try_from(*u).map_err(|_| out_of_range()),
        other => Err(AssignError::mismatch(ty.name(), other)),
    }
}

fn float(ty: ScalarType, value: &Value) -> Result<f64, AssignError> {
    value
        .as_f64()
        .ok_or_else(|| AssignError::mismatch(ty.name(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_range_checked() {
        assert_eq!(
            scalar(ScalarType::Int32, &Value::Int(7)),
            Ok(ProstValue::I32(7))
        );
        assert_eq!(
            scalar(ScalarType::Uint64, &Value::UInt(u64::MAX)),
            Ok(ProstValue::U64(u64::MAX))
        );
        assert!(matches!(
            scalar(ScalarType::Int32, &Value::Int(i64::MAX)),
            Err(AssignError::OutOfRange { target: ScalarType::Int32, .. })
        ));
        assert!(matches!(
            scalar(ScalarType::Uint32, &Value::Int(-1)),
            Err(AssignError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_no_implicit_conversion_between_kinds() {
        assert_eq!(
            scalar(ScalarType::String, &Value::Int(1)),
            Err(AssignError::TypeMismatch {
                expected: "string".to_string(),
                found: "int"
            })
        );
        assert!(scalar(ScalarType::Bool, &Value::Int(1)).is_err());
        assert!(scalar(ScalarType::Int64, &Value::Float(1.0)).is_err());
        assert_eq!(
            scalar(ScalarType::Double, &Value::Int(2)),
            Ok(ProstValue::F64(2.0))
        );
    }

    #[test]
    fn test_bytes_accept_strings_and_number_sequences() {
        let expected = Ok(ProstValue::Bytes(bytes::Bytes::from_static(b"ok")));

        assert_eq!(scalar(ScalarType::Bytes, &Value::from("ok")), expected);
        assert_eq!(
            scalar(
                ScalarType::Bytes,
                &Value::Sequence(vec![Value::Int(111), Value::Int(107)])
            ),
            expected
        );
    }

    #[test]
    fn test_map_keys_parse_strings() {
        assert_eq!(
            map_key(ScalarType::Int32, &Value::from("42")),
            Ok(MapKey::I32(42))
        );
        assert_eq!(
            map_key(ScalarType::Bool, &Value::from("true")),
            Ok(MapKey::Bool(true))
        );
        assert_eq!(
            map_key(ScalarType::Uint64, &Value::UInt(3)),
            Ok(MapKey::U64(3))
        );
        assert!(map_key(ScalarType::String, &Value::Int(1)).is_err());
        assert!(matches!(
            map_key(ScalarType::Int32, &Value::from("many")),
            Err(AssignError::Coercion(_))
        ));
    }
}
