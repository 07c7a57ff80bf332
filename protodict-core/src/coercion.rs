//! # Type-Coercion Table
//!
//! Maps each primitive protobuf type to a function that coerces a dynamic [`Value`]
//! into the native shape used for that type.
//!
//! The encoder runs every scalar it emits through the table, and fails with
//! `UnsupportedFieldType` when a type has no entry. The decoder runs an input value
//! through the table (when an entry exists) before the typed assignment.
//!
//! Two process-wide tables are provided: [`CoercionTable::standard`] (the encoder
//! default) and [`CoercionTable::none`] (the decoder default). Callers can build their
//! own table per call with [`CoercionTable::with`].
use crate::value::Value;
use prost_reflect::Kind;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// A coercion function. It receives ownership of the value and returns the coerced one.
pub type Coercion = fn(Value) -> Result<Value, CoercionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot coerce {found} value {value:?} into {target}")]
pub struct CoercionError {
    pub value: Value,
    pub found: &'static str,
    pub target: &'static str,
}

impl CoercionError {
    pub fn new(value: Value, target: &'static str) -> Self {
        Self {
            found: value.type_name(),
            value,
            target,
        }
    }
}

/// Primitive protobuf types, numbered like `FieldDescriptorProto.Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

/// Type id used for message (and group) fields, which never reach the table.
pub const MESSAGE_TYPE_ID: i32 = 11;

impl ScalarType {
    pub const ALL: [ScalarType; 16] = [
        ScalarType::Double,
        ScalarType::Float,
        ScalarType::Int64,
        ScalarType::Uint64,
        ScalarType::Int32,
        ScalarType::Fixed64,
        ScalarType::Fixed32,
        ScalarType::Bool,
        ScalarType::String,
        ScalarType::Bytes,
        ScalarType::Uint32,
        ScalarType::Enum,
        ScalarType::Sfixed32,
        ScalarType::Sfixed64,
        ScalarType::Sint32,
        ScalarType::Sint64,
    ];

    /// Returns `None` for message kinds.
    pub fn of_kind(kind: &Kind) -> Option<Self> {
        let ty = match kind {
            Kind::Double => ScalarType::Double,
            Kind::Float => ScalarType::Float,
            Kind::Int64 => ScalarType::Int64,
            Kind::Uint64 => ScalarType::Uint64,
            Kind::Int32 => ScalarType::Int32,
            Kind::Fixed64 => ScalarType::Fixed64,
            Kind::Fixed32 => ScalarType::Fixed32,
            Kind::Bool => ScalarType::Bool,
            Kind::String => ScalarType::String,
            Kind::Bytes => ScalarType::Bytes,
            Kind::Uint32 => ScalarType::Uint32,
            Kind::Enum(_) => ScalarType::Enum,
            Kind::Sfixed32 => ScalarType::Sfixed32,
            Kind::Sfixed64 => ScalarType::Sfixed64,
            Kind::Sint32 => ScalarType::Sint32,
            Kind::Sint64 => ScalarType::Sint64,
            Kind::Message(_) => return None,
        };
        Some(ty)
    }

    /// The numeric type tag, as found in descriptors.
    pub fn type_id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int64 => "int64",
            ScalarType::Uint64 => "uint64",
            ScalarType::Int32 => "int32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Uint32 => "uint32",
            ScalarType::Enum => "enum",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Default)]
pub struct CoercionTable {
    entries: HashMap<ScalarType, Coercion>,
}

static STANDARD: LazyLock<CoercionTable> = LazyLock::new(|| {
    ScalarType::ALL
        .into_iter()
        .fold(CoercionTable::empty(), |table, ty| {
            let coercion: Coercion = match ty {
                ScalarType::Double | ScalarType::Float => to_float,
                ScalarType::Bool => to_bool,
                ScalarType::String => to_string,
                ScalarType::Bytes => to_bytes,
                // every integer type, enum numbers included
                _ => to_int,
            };
            table.with(ty, coercion)
        })
});

static NONE: LazyLock<CoercionTable> = LazyLock::new(CoercionTable::empty);

impl CoercionTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared default table: floats for `double`/`float`, integers for every
    /// integer type and enums, booleans, strings and bytes.
    pub fn standard() -> &'static CoercionTable {
        &STANDARD
    }

    /// The shared empty table.
    pub fn none() -> &'static CoercionTable {
        &NONE
    }

    /// Registers (or replaces) the coercion for `ty`.
    pub fn with(mut self, ty: ScalarType, coercion: Coercion) -> Self {
        self.entries.insert(ty, coercion);
        self
    }

    /// Removes the coercion for `ty`.
    pub fn without(mut self, ty: ScalarType) -> Self {
        self.entries.remove(&ty);
        self
    }

    pub fn get(&self, ty: ScalarType) -> Option<Coercion> {
        self.entries.get(&ty).copied()
    }

    pub fn contains(&self, ty: ScalarType) -> bool {
        self.entries.contains_key(&ty)
    }

    /// Applies the coercion for `ty`, or returns the value untouched if there is none.
    pub fn apply(&self, ty: ScalarType, value: Value) -> Result<Value, CoercionError> {
        match self.get(ty) {
            Some(coercion) => coercion(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for CoercionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.entries.keys().collect();
        types.sort();
        f.debug_struct("CoercionTable")
            .field("types", &types)
            .finish()
    }
}

pub fn to_float(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Float(_) => Ok(value),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::UInt(u) => Ok(Value::Float(u as f64)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::String(ref s) => match s.trim().parse::<f64>() {
            Ok(f) => Ok(Value::Float(f)),
            Err(_) => Err(CoercionError::new(value, "float")),
        },
        other => Err(CoercionError::new(other, "float")),
    }
}

/// Floats are truncated toward zero. Values above `i64::MAX` stay unsigned.
pub fn to_int(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Int(_) | Value::UInt(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Int(b.into())),
        Value::Float(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Value::Int(f.trunc() as i64))
        }
        Value::String(ref s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::Int(i))
            } else if let Ok(u) = trimmed.parse::<u64>() {
                Ok(Value::UInt(u))
            } else {
                Err(CoercionError::new(value, "int"))
            }
        }
        other => Err(CoercionError::new(other, "int")),
    }
}

/// Numbers are true when non-zero. Strings must spell `true` or `false`.
pub fn to_bool(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Int(i) => Ok(Value::Bool(i != 0)),
        Value::UInt(u) => Ok(Value::Bool(u != 0)),
        Value::Float(f) => Ok(Value::Bool(f != 0.0)),
        Value::String(ref s) => match s.trim().parse::<bool>() {
            Ok(b) => Ok(Value::Bool(b)),
            Err(_) => Err(CoercionError::new(value, "bool")),
        },
        other => Err(CoercionError::new(other, "bool")),
    }
}

pub fn to_string(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::String(_) => Ok(value),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Int(i) => Ok(Value::String(i.to_string())),
        Value::UInt(u) => Ok(Value::String(u.to_string())),
        Value::Float(f) => Ok(Value::String(f.to_string())),
        Value::Bytes(bytes) => String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|e| CoercionError::new(Value::Bytes(e.into_bytes()), "string")),
        other => Err(CoercionError::new(other, "string")),
    }
}

/// Strings are taken as UTF-8, sequences must hold integers in `0..=255`.
pub fn to_bytes(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bytes(_) => Ok(value),
        Value::String(s) => Ok(Value::Bytes(s.into_bytes())),
        Value::Sequence(ref items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Value::Bytes)
            .ok_or_else(|| CoercionError::new(value.clone(), "bytes")),
        other => Err(CoercionError::new(other, "bytes")),
    }
}
