//! # Decoder (dynamic value -> message)
//!
//! Populates a message from a [`Mapping`], guided by the message descriptor.
//!
//! ## Strictness
//!
//! With [`DecodeOptions::strict`] set (the default), keys that are not fields of the
//! target message, unregistered extension numbers and unknown enum labels are errors.
//! Without it, unknown keys and extensions are dropped, and an unknown enum label gets
//! one more chance upper-cased (after which it must match exactly).
//!
//! ## Absent values
//!
//! A `Null` input resets the field to its schema default. With
//! [`DecodeOptions::ignore_none`] it is skipped instead, leaving the field untouched.
pub mod assign;

use crate::coercion::{CoercionTable, ScalarType};
use crate::encode::EXTENSION_CONTAINER;
use crate::schema::{self, FieldKind, FieldSchema};
use crate::timestamp;
use crate::value::{Key, Mapping, Value};
use assign::AssignError;
use chrono::NaiveDateTime;
use prost_reflect::{
    DynamicMessage, EnumDescriptor, MapKey, MessageDescriptor, ReflectMessage,
    Value as ProstValue,
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{message} does not have a field called {key}")]
    UnknownField { message: String, key: String },

    #[error("{message} does not have an extension with number {number}. Perhaps it was never registered?")]
    UnknownExtension { message: String, number: u32 },

    #[error("Extension keys must be integers, got '{key}'")]
    InvalidExtensionKey { key: String },

    #[error("The extension container of {message} must be a mapping, got {found}")]
    MalformedExtensions {
        message: String,
        found: &'static str,
    },

    #[error("`{label}` is not a valid value for field `{field}`")]
    InvalidEnumLabel { field: String, label: String },

    #[error("type: {message}, field: {field}, value: {value:?}: {source}")]
    FieldAssignment {
        message: String,
        field: String,
        value: Value,
        #[source]
        source: AssignError,
    },

    #[error("Failed to convert the decoded message into its target type: '{0}'")]
    Transcode(#[from] prost::DecodeError),
}

/// Options of a single decode call.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions<'a> {
    /// Applied to each scalar input before assignment. Empty by default.
    pub coercions: &'a CoercionTable,
    pub strict: bool,
    pub ignore_none: bool,
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self {
            coercions: CoercionTable::none(),
            strict: true,
            ignore_none: false,
        }
    }
}

impl<'a> DecodeOptions<'a> {
    pub fn with_coercions(self, coercions: &'a CoercionTable) -> Self {
        Self { coercions, ..self }
    }

    pub fn strict(self, strict: bool) -> Self {
        Self { strict, ..self }
    }

    pub fn ignore_none(self, ignore_none: bool) -> Self {
        Self {
            ignore_none,
            ..self
        }
    }
}

/// Decodes into a fresh instance of a reflectable (e.g. generated) message type.
pub fn decode<M>(values: &Mapping, options: &DecodeOptions<'_>) -> Result<M, DecodeError>
where
    M: ReflectMessage + Default,
{
    let message = decode_message(M::default().descriptor(), values, options)?;
    Ok(message.transcode_to::<M>()?)
}

/// Decodes into a fresh `DynamicMessage` of type `descriptor`.
pub fn decode_message(
    descriptor: MessageDescriptor,
    values: &Mapping,
    options: &DecodeOptions<'_>,
) -> Result<DynamicMessage, DecodeError> {
    let mut message = DynamicMessage::new(descriptor);
    decode_into(&mut message, values, options)?;
    Ok(message)
}

/// Populates `message` in place and hands it back.
///
/// Fields already set on `message` and not mentioned in `values` are kept, repeated
/// fields are appended to and map fields are merged into.
pub fn decode_into<'m>(
    message: &'m mut DynamicMessage,
    values: &Mapping,
    options: &DecodeOptions<'_>,
) -> Result<&'m mut DynamicMessage, DecodeError> {
    let descriptor = message.descriptor();

    for (field, input) in field_mapping(&descriptor, values, options.strict)? {
        if options.ignore_none && input.is_null() {
            continue;
        }
        FieldDecoder {
            owner: descriptor.full_name(),
            field: &field,
            options,
        }
        .decode(message, input)?;
    }

    Ok(message)
}

/// Resolves every key of `values` (and of its extension container) against the schema.
fn field_mapping<'v>(
    descriptor: &MessageDescriptor,
    values: &'v Mapping,
    strict: bool,
) -> Result<Vec<(FieldSchema, &'v Value)>, DecodeError> {
    let container_key = Key::from(EXTENSION_CONTAINER);
    let mut mapping = Vec::with_capacity(values.len());

    for (key, value) in values {
        if *key == container_key {
            continue;
        }
        let name = key.to_string();
        match schema::field_by_name(descriptor, &name) {
            Some(field) => mapping.push((field, value)),
            None if strict => {
                return Err(DecodeError::UnknownField {
                    message: descriptor.full_name().to_string(),
                    key: name,
                });
            }
            None => {
                tracing::debug!(
                    message_type = descriptor.full_name(),
                    key = %name,
                    "skipping unknown field"
                );
            }
        }
    }

    let extensions = match values.get(&container_key) {
        None | Some(Value::Null) => return Ok(mapping),
        Some(Value::Mapping(extensions)) => extensions,
        Some(other) => {
            return Err(DecodeError::MalformedExtensions {
                message: descriptor.full_name().to_string(),
                found: other.type_name(),
            });
        }
    };

    for (key, value) in extensions {
        let number = extension_number(key)?;
        match schema::extension_by_number(descriptor, number) {
            Some(extension) => mapping.push((extension, value)),
            None if strict => {
                return Err(DecodeError::UnknownExtension {
                    message: descriptor.full_name().to_string(),
                    number,
                });
            }
            None => {
                tracing::debug!(
                    message_type = descriptor.full_name(),
                    number,
                    "skipping unregistered extension"
                );
            }
        }
    }

    Ok(mapping)
}

fn extension_number(key: &Key) -> Result<u32, DecodeError> {
    let number = match key {
        Key::Int(i) => u32::try_from(*i).ok(),
        Key::UInt(u) => u32::try_from(*u).ok(),
        Key::String(s) => s.trim().parse().ok(),
        Key::Bool(_) => None,
    };
    number.ok_or_else(|| DecodeError::InvalidExtensionKey {
        key: key.to_string(),
    })
}

/// Decodes the input of a single field of `owner`.
struct FieldDecoder<'f, 'o> {
    owner: &'f str,
    field: &'f FieldSchema,
    options: &'f DecodeOptions<'o>,
}

impl FieldDecoder<'_, '_> {
    fn decode(&self, message: &mut DynamicMessage, input: &Value) -> Result<(), DecodeError> {
        if input.is_null() {
            self.field.clear(message);
            return Ok(());
        }

        match self.field.kind() {
            FieldKind::Map {
                key_type,
                value_type,
            } => self.decode_map(message, *key_type, value_type, input),
            _ if self.field.is_repeated() => self.decode_list(message, input),
            _ => self.decode_singular(message, input),
        }
    }

    fn decode_map(
        &self,
        message: &mut DynamicMessage,
        key_type: ScalarType,
        value_type: &FieldKind,
        input: &Value,
    ) -> Result<(), DecodeError> {
        let Value::Mapping(entries) = input else {
            return Err(self.fail(input, AssignError::mismatch("mapping", input)));
        };

        for (key, value) in entries {
            let key_value = Value::from(key.clone());
            let map_key = self
                .options
                .coercions
                .apply(key_type, key_value.clone())
                .map_err(AssignError::from)
                .and_then(|coerced| assign::map_key(key_type, &coerced))
                .map_err(|source| self.fail(&key_value, source))?;

            if value.is_null() && self.options.ignore_none {
                continue;
            }

            match value_type {
                FieldKind::Message(_) | FieldKind::Timestamp(_) => {
                    self.merge_map_entry(message, value_type, map_key, value)?
                }
                kind => {
                    let decoded = self.decode_scalar(kind, value)?;
                    if let ProstValue::Map(map) = self.field.get_mut(message) {
                        map.insert(map_key, decoded);
                    }
                }
            }
        }

        Ok(())
    }

    /// Decodes a message-typed map value into the entry at `key`, creating it if needed.
    fn merge_map_entry(
        &self,
        message: &mut DynamicMessage,
        value_type: &FieldKind,
        key: MapKey,
        value: &Value,
    ) -> Result<(), DecodeError> {
        let Some(nested) = value_type.message_descriptor() else {
            return Err(self.fail(value, AssignError::mismatch(value_type.describe(), value)));
        };

        if let Some(dt) = datetime_input(value_type, value) {
            let timestamp = self.timestamp(nested, &dt, value)?;
            if let ProstValue::Map(map) = self.field.get_mut(message) {
                map.insert(key, timestamp);
            }
            return Ok(());
        }

        let empty = Mapping::new();
        let nested_values = match value {
            Value::Mapping(nested_values) => nested_values,
            Value::Null => &empty,
            other => return Err(self.fail(other, AssignError::mismatch("mapping", other))),
        };

        if let ProstValue::Map(map) = self.field.get_mut(message) {
            let entry = map
                .entry(key)
                .or_insert_with(|| ProstValue::Message(DynamicMessage::new(nested.clone())));
            if let ProstValue::Message(entry) = entry {
                decode_into(entry, nested_values, self.options)?;
            }
        }
        Ok(())
    }

    fn decode_list(&self, message: &mut DynamicMessage, input: &Value) -> Result<(), DecodeError> {
        let Value::Sequence(items) = input else {
            return Err(self.fail(input, AssignError::mismatch("sequence", input)));
        };

        let decoded = items
            .iter()
            .map(|item| self.decode_element(item))
            .collect::<Result<Vec<_>, _>>()?;

        if let ProstValue::List(list) = self.field.get_mut(message) {
            list.extend(decoded);
        }
        Ok(())
    }

    fn decode_element(&self, item: &Value) -> Result<ProstValue, DecodeError> {
        let kind = self.field.kind();
        if let (FieldKind::Timestamp(descriptor), Some(dt)) = (kind, datetime_input(kind, item)) {
            return self.timestamp(descriptor, &dt, item);
        }

        match (kind, item) {
            (FieldKind::Message(nested) | FieldKind::Timestamp(nested), Value::Mapping(values)) => {
                decode_message(nested.clone(), values, self.options).map(ProstValue::Message)
            }
            (FieldKind::Message(_) | FieldKind::Timestamp(_), other) => {
                Err(self.fail(other, AssignError::mismatch("mapping", other)))
            }
            (kind, item) => self.decode_scalar(kind, item),
        }
    }

    fn decode_singular(
        &self,
        message: &mut DynamicMessage,
        input: &Value,
    ) -> Result<(), DecodeError> {
        let kind = self.field.kind();
        if let (FieldKind::Timestamp(descriptor), Some(dt)) = (kind, datetime_input(kind, input)) {
            let timestamp = self.timestamp(descriptor, &dt, input)?;
            self.field.set(message, timestamp);
            return Ok(());
        }

        match (kind, input) {
            (FieldKind::Message(_) | FieldKind::Timestamp(_), Value::Mapping(values)) => {
                if let ProstValue::Message(nested) = self.field.get_mut(message) {
                    decode_into(nested, values, self.options)?;
                }
                Ok(())
            }
            (FieldKind::Message(_) | FieldKind::Timestamp(_), other) => {
                Err(self.fail(other, AssignError::mismatch("mapping", other)))
            }
            (kind, input) => {
                let value = self.decode_scalar(kind, input)?;
                self.field.set(message, value);
                Ok(())
            }
        }
    }

    /// Translates enum labels, or coerces (if the table has an entry) and assigns.
    fn decode_scalar(&self, kind: &FieldKind, input: &Value) -> Result<ProstValue, DecodeError> {
        let Some(ty) = kind.scalar_type() else {
            return Err(self.fail(input, AssignError::mismatch(kind.describe(), input)));
        };

        // labels never go through the enum coercion, which is numeric
        if let (FieldKind::Enum(descriptor), Value::String(label)) = (kind, input) {
            return string_to_enum(self.field.name(), descriptor, label, self.options.strict)
                .map(ProstValue::EnumNumber);
        }

        let coerced = self
            .options
            .coercions
            .apply(ty, input.clone())
            .map_err(|source| self.fail(input, source.into()))?;

        assign::scalar(ty, &coerced).map_err(|source| self.fail(&coerced, source))
    }

    /// Builds an independent `Timestamp` value for the field.
    fn timestamp(
        &self,
        descriptor: &MessageDescriptor,
        dt: &NaiveDateTime,
        input: &Value,
    ) -> Result<ProstValue, DecodeError> {
        timestamp::to_message(descriptor.clone(), dt)
            .map(ProstValue::Message)
            .map_err(|source| self.fail(input, source.into()))
    }

    fn fail(&self, value: &Value, source: AssignError) -> DecodeError {
        DecodeError::FieldAssignment {
            message: self.owner.to_string(),
            field: self.field.name().to_string(),
            value: value.clone(),
            source,
        }
    }
}

/// A native date-time, or a date-time string, given for a timestamp field.
fn datetime_input(kind: &FieldKind, input: &Value) -> Option<NaiveDateTime> {
    match (kind, input) {
        (FieldKind::Timestamp(_), Value::DateTime(dt)) => Some(*dt),
        (FieldKind::Timestamp(_), Value::String(s)) => timestamp::parse(s),
        _ => None,
    }
}

/// Translates an enum label into its number.
///
/// When not strict, a label with no exact match is retried once upper-cased, and that
/// retry is strict.
fn string_to_enum(
    field: &str,
    descriptor: &EnumDescriptor,
    label: &str,
    strict: bool,
) -> Result<i32, DecodeError> {
    if let Some(value) = descriptor.get_value_by_name(label) {
        return Ok(value.number());
    }

    if strict {
        return Err(DecodeError::InvalidEnumLabel {
            field: field.to_string(),
            label: label.to_string(),
        });
    }

    tracing::trace!(field, label, "retrying enum label upper-cased");
    string_to_enum(field, descriptor, &label.to_uppercase(), true)
}
