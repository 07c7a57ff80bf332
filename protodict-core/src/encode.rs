//! # Encoder (message -> dynamic value)
//!
//! Walks a message guided by its descriptor and produces a [`Mapping`].
//!
//! Only the fields that are present on the message are emitted (following the
//! presence rules of the wire format), unless [`EncodeOptions::emit_defaults`] asks for
//! the declared-but-absent fields to be filled with their schema defaults.
//!
//! Extensions are emitted under the reserved [`EXTENSION_CONTAINER`] key, keyed by their
//! field number. The key is only present when at least one extension is set.
use crate::coercion::{Coercion, CoercionError, CoercionTable};
use crate::schema::{self, FieldKind, FieldSchema};
use crate::timestamp::{self, TimestampError};
use crate::value::{Key, Mapping, Value};
use prost_reflect::{
    DynamicMessage, EnumDescriptor, MapKey, MessageDescriptor, ReflectMessage,
    Value as ProstValue,
};

/// Reserved key of the extension container in a message mapping.
pub const EXTENSION_CONTAINER: &str = "___X";

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Field {message}.{field} has unrecognised type id {type_id}")]
    UnsupportedFieldType {
        message: String,
        field: String,
        type_id: i32,
    },
    #[error("Field {message}.{field} holds an invalid timestamp: {source}")]
    InvalidTimestamp {
        message: String,
        field: String,
        #[source]
        source: TimestampError,
    },
    #[error("Field {message}.{field} could not be coerced: {source}")]
    Coercion {
        message: String,
        field: String,
        #[source]
        source: CoercionError,
    },
}

/// Options of a single encode call.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions<'a> {
    pub coercions: &'a CoercionTable,
    /// Fill in declared fields that are not set, with their schema defaults.
    pub emit_defaults: bool,
    /// Emit enum values by label instead of number.
    pub enum_as_label: bool,
    /// Lowercase the labels emitted under `enum_as_label`.
    pub lowercase_enum_labels: bool,
}

impl Default for EncodeOptions<'_> {
    fn default() -> Self {
        Self {
            coercions: CoercionTable::standard(),
            emit_defaults: false,
            enum_as_label: false,
            lowercase_enum_labels: false,
        }
    }
}

impl<'a> EncodeOptions<'a> {
    pub fn with_coercions(self, coercions: &'a CoercionTable) -> Self {
        Self { coercions, ..self }
    }

    pub fn emit_defaults(self, emit_defaults: bool) -> Self {
        Self {
            emit_defaults,
            ..self
        }
    }

    pub fn enum_as_label(self, enum_as_label: bool) -> Self {
        Self {
            enum_as_label,
            ..self
        }
    }

    pub fn lowercase_enum_labels(self, lowercase_enum_labels: bool) -> Self {
        Self {
            lowercase_enum_labels,
            ..self
        }
    }
}

/// Encodes any reflectable message, generated types included.
pub fn encode<M>(message: &M, options: &EncodeOptions<'_>) -> Result<Mapping, EncodeError>
where
    M: ReflectMessage,
{
    encode_message(&message.transcode_to_dynamic(), options)
}

/// Encodes a dynamic message.
///
/// # Returns
///
/// * `Ok(Mapping)` - field names (and the extension container) mapped to their values.
/// * `Err(EncodeError)` - a field type has no coercion, or a value could not be coerced.
pub fn encode_message(
    message: &DynamicMessage,
    options: &EncodeOptions<'_>,
) -> Result<Mapping, EncodeError> {
    let descriptor = message.descriptor();
    let owner = descriptor.full_name();
    let mut result = Mapping::new();

    for (field, value) in message.fields() {
        let field = FieldSchema::of_field(&field);
        let encoded = encode_field(owner, &field, value, options)?;
        result.insert(Key::from(field.name()), encoded);
    }

    let mut extensions = Mapping::new();
    for (extension, value) in message.extensions() {
        let field = FieldSchema::of_extension(&extension);
        let encoded = encode_field(owner, &field, value, options)?;
        extensions.insert(Key::String(field.number().to_string()), encoded);
    }

    if options.emit_defaults {
        emit_defaults(owner, &descriptor, &mut result, options);
    }

    if !extensions.is_empty() {
        result.insert(Key::from(EXTENSION_CONTAINER), Value::Mapping(extensions));
    }

    Ok(result)
}

fn encode_field(
    owner: &str,
    field: &FieldSchema,
    value: &ProstValue,
    options: &EncodeOptions<'_>,
) -> Result<Value, EncodeError> {
    if let FieldKind::Map { value_type, .. } = field.kind() {
        let adaptor = Adaptor::resolve(owner, field.name(), value_type, options)?;
        let entries = value.as_map().into_iter().flatten();
        return entries
            .map(|(key, value)| Ok((map_key(key), adaptor.apply(value)?)))
            .collect::<Result<Mapping, _>>()
            .map(Value::Mapping);
    }

    let adaptor = Adaptor::resolve(owner, field.name(), field.kind(), options)?;
    match value {
        ProstValue::List(items) => items.iter().map(|item| adaptor.apply(item)).collect(),
        value => adaptor.apply(value),
    }
}

fn emit_defaults(
    owner: &str,
    descriptor: &MessageDescriptor,
    result: &mut Mapping,
    options: &EncodeOptions<'_>,
) {
    for field in schema::declared_fields(descriptor) {
        let singular_message = !field.is_repeated()
            && !field.is_map()
            && field.kind().message_descriptor().is_some();
        if singular_message || field.in_oneof() {
            continue;
        }

        let key = Key::from(field.name());
        if result.contains_key(&key) {
            continue;
        }

        let value = if field.is_map() {
            Value::Mapping(Mapping::new())
        } else if field.is_repeated() {
            Value::Sequence(Vec::new())
        } else {
            let default = field.default_value();
            match (field.kind(), &default) {
                (FieldKind::Enum(descriptor), ProstValue::EnumNumber(number))
                    if options.enum_as_label =>
                {
                    enum_label(descriptor, *number, options.lowercase_enum_labels)
                        .map(Value::String)
                        .unwrap_or(Value::Int((*number).into()))
                }
                _ => lift(&default),
            }
        };

        tracing::trace!(message_type = owner, field = field.name(), "emitting default value");
        result.insert(key, value);
    }
}

/// How the values of one field are turned into dynamic values.
enum Adaptor<'o, 'a> {
    Timestamp,
    Message(&'o EncodeOptions<'a>),
    EnumLabel {
        descriptor: EnumDescriptor,
        lowercase: bool,
    },
    Coerce(Coercion),
}

/// An adaptor together with the context needed to report failures.
struct Resolved<'f, 'o, 'a> {
    owner: &'f str,
    field: &'f str,
    adaptor: Adaptor<'o, 'a>,
}

impl<'o, 'a> Adaptor<'o, 'a> {
    /// Picks the adaptor for a field kind, in priority order: timestamp, nested message,
    /// enum label (if requested), coercion table.
    fn resolve<'f>(
        owner: &'f str,
        field: &'f str,
        kind: &FieldKind,
        options: &'o EncodeOptions<'a>,
    ) -> Result<Resolved<'f, 'o, 'a>, EncodeError> {
        let adaptor = match kind {
            FieldKind::Timestamp(_) => Adaptor::Timestamp,
            FieldKind::Message(_) | FieldKind::Map { .. } => Adaptor::Message(options),
            FieldKind::Enum(descriptor) if options.enum_as_label => Adaptor::EnumLabel {
                descriptor: descriptor.clone(),
                lowercase: options.lowercase_enum_labels,
            },
            kind => {
                let coercion = kind.scalar_type().and_then(|ty| options.coercions.get(ty));
                match coercion {
                    Some(coercion) => Adaptor::Coerce(coercion),
                    None => {
                        return Err(EncodeError::UnsupportedFieldType {
                            message: owner.to_string(),
                            field: field.to_string(),
                            type_id: kind.type_id(),
                        });
                    }
                }
            }
        };

        Ok(Resolved {
            owner,
            field,
            adaptor,
        })
    }
}

impl Resolved<'_, '_, '_> {
    fn apply(&self, value: &ProstValue) -> Result<Value, EncodeError> {
        match (&self.adaptor, value) {
            (Adaptor::Timestamp, ProstValue::Message(message)) => timestamp::to_datetime(message)
                .map(Value::DateTime)
                .map_err(|source| EncodeError::InvalidTimestamp {
                    message: self.owner.to_string(),
                    field: self.field.to_string(),
                    source,
                }),
            (Adaptor::Message(options), ProstValue::Message(message)) => {
                encode_message(message, options).map(Value::Mapping)
            }
            (
                Adaptor::EnumLabel {
                    descriptor,
                    lowercase,
                },
                ProstValue::EnumNumber(number),
            ) => Ok(enum_label(descriptor, *number, *lowercase)
                .map(Value::String)
                // open enums may carry numbers without a declared label
                .unwrap_or(Value::Int((*number).into()))),
            (Adaptor::Coerce(coercion), value) => {
                coercion(lift(value)).map_err(|source| EncodeError::Coercion {
                    message: self.owner.to_string(),
                    field: self.field.to_string(),
                    source,
                })
            }
            // a value whose shape does not match its descriptor, passed through as is
            (_, value) => Ok(lift(value)),
        }
    }
}

fn enum_label(descriptor: &EnumDescriptor, number: i32, lowercase: bool) -> Option<String> {
    let label = descriptor.get_value(number)?.name().to_string();
    Some(if lowercase {
        label.to_lowercase()
    } else {
        label
    })
}

fn map_key(key: &MapKey) -> Key {
    match key {
        MapKey::Bool(b) => Key::Bool(*b),
        MapKey::I32(i) => Key::Int((*i).into()),
        MapKey::I64(i) => Key::Int(*i),
        MapKey::U32(u) => Key::UInt((*u).into()),
        MapKey::U64(u) => Key::UInt(*u),
        MapKey::String(s) => Key::String(s.clone()),
    }
}

/// The natural dynamic value of a prost value, before any coercion.
pub(crate) fn lift(value: &ProstValue) -> Value {
    match value {
        ProstValue::Bool(b) => Value::Bool(*b),
        ProstValue::I32(i) => Value::Int((*i).into()),
        ProstValue::I64(i) => Value::Int(*i),
        ProstValue::U32(u) => Value::UInt((*u).into()),
        ProstValue::U64(u) => Value::UInt(*u),
        ProstValue::F32(f) => Value::Float((*f).into()),
        ProstValue::F64(f) => Value::Float(*f),
        ProstValue::String(s) => Value::String(s.clone()),
        ProstValue::Bytes(b) => Value::Bytes(b.to_vec()),
        ProstValue::EnumNumber(n) => Value::Int((*n).into()),
        ProstValue::Message(_) => Value::Mapping(Mapping::new()),
        ProstValue::List(items) => items.iter().map(lift).collect(),
        ProstValue::Map(entries) => Value::Mapping(
            entries
                .iter()
                .map(|(key, value)| (map_key(key), lift(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> EnumDescriptor {
        sample_schema::pool()
            .get_enum_by_name(sample_schema::STATUS)
            .expect("Status enum must exist")
    }

    #[test]
    fn test_enum_labels_for_declared_numbers_only() {
        assert_eq!(enum_label(&status(), 2, false).as_deref(), Some("SUSPENDED"));
        assert_eq!(enum_label(&status(), 2, true).as_deref(), Some("suspended"));
        assert_eq!(enum_label(&status(), 42, false), None);
    }

    #[test]
    fn test_undeclared_enum_numbers_are_emitted_as_numbers() {
        let account = sample_schema::message(sample_schema::ACCOUNT);
        let status = account.get_field_by_name("status").expect("status must exist");
        let mut message = DynamicMessage::new(account);
        message.set_field(&status, ProstValue::EnumNumber(42));

        let mapping = encode_message(&message, &EncodeOptions::default().enum_as_label(true))
            .expect("Failed to encode");

        assert_eq!(mapping.get(&Key::from("status")), Some(&Value::Int(42)));
    }

    #[test]
    fn test_map_keys_keep_their_type() {
        assert_eq!(map_key(&MapKey::I32(-1)), Key::Int(-1));
        assert_eq!(map_key(&MapKey::U64(u64::MAX)), Key::UInt(u64::MAX));
        assert_eq!(map_key(&MapKey::Bool(true)), Key::Bool(true));
        assert_eq!(map_key(&MapKey::String("k".into())), Key::from("k"));
    }
}
