//! # Conversion Layer
//!
//! Glue between the command line and `protodict_core`. Everything here works on bytes and
//! JSON values, file and terminal I/O is left to `main.rs`.
//!
//! - **`Schema`**: the descriptor pool loaded from a descriptor set.
//! - **`to_json()` / `from_json()`**: the two conversion directions.
//! - **`validate_body()`**: the required-field check on its own.
use anyhow::{Context, anyhow};
use prost::Message;
use protodict_core::prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use protodict_core::{DecodeOptions, EncodeOptions, Mapping, Value, decode, encode, validate};
use std::path::Path;

pub struct Schema {
    pool: DescriptorPool,
}

impl Schema {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read descriptor set '{}'", path.display()))?;
        let schema = Self::from_bytes(&bytes)?;
        tracing::debug!(path = %path.display(), "loaded descriptor set");
        Ok(schema)
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let pool = DescriptorPool::decode(bytes).context("Failed to parse file descriptor set")?;
        Ok(Self { pool })
    }

    pub fn message(&self, name: &str) -> anyhow::Result<MessageDescriptor> {
        self.pool
            .get_message_by_name(name)
            .ok_or_else(|| anyhow!("Message '{name}' not found in the descriptor set"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ToJsonOptions {
    pub enum_labels: bool,
    pub lowercase_enums: bool,
    pub emit_defaults: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FromJsonOptions {
    pub lenient: bool,
    pub ignore_none: bool,
    pub validate: bool,
}

/// Decodes a binary message and renders it as JSON.
pub fn to_json(
    descriptor: MessageDescriptor,
    bytes: &[u8],
    options: ToJsonOptions,
) -> anyhow::Result<serde_json::Value> {
    let message = DynamicMessage::decode(descriptor, bytes)
        .context("Input is not a valid binary message of the requested type")?;

    let options = EncodeOptions::default()
        .enum_as_label(options.enum_labels)
        .lowercase_enum_labels(options.lowercase_enums)
        .emit_defaults(options.emit_defaults);
    let mapping = encode::encode_message(&message, &options)?;

    Ok(Value::Mapping(mapping).into())
}

/// Builds a binary message out of a JSON object.
pub fn from_json(
    descriptor: MessageDescriptor,
    body: serde_json::Value,
    options: FromJsonOptions,
) -> anyhow::Result<Vec<u8>> {
    let values = body_to_mapping(body)?;
    if options.validate {
        validate::validate(&descriptor, &values)?;
    }

    let decode_options = DecodeOptions::default()
        .strict(!options.lenient)
        .ignore_none(options.ignore_none);
    let message = decode::decode_message(descriptor, &values, &decode_options)?;

    Ok(message.encode_to_vec())
}

pub fn validate_body(descriptor: &MessageDescriptor, body: serde_json::Value) -> anyhow::Result<()> {
    let values = body_to_mapping(body)?;
    validate::validate(descriptor, &values)?;
    Ok(())
}

fn body_to_mapping(body: serde_json::Value) -> anyhow::Result<Mapping> {
    match Value::from(body) {
        Value::Mapping(values) => Ok(values),
        other => Err(anyhow!(
            "The JSON body must be an object, got {}",
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protodict_core::{DecodeError, FieldsMissing};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_bytes(&sample_schema::file_descriptor_set_bytes())
            .expect("Failed to load the sample schema")
    }

    #[test]
    fn test_json_to_binary_and_back() {
        let schema = schema();
        let account = schema
            .message(sample_schema::ACCOUNT)
            .expect("Account must exist");
        let body = json!({
            "name": "Ada",
            "status": "ACTIVE",
            "tags": ["a", "b"],
            "created_at": "2024-01-02T03:04:05Z"
        });

        // --- Act ---
        let bytes = from_json(account.clone(), body, FromJsonOptions::default())
            .expect("Failed to build binary message");
        let json = to_json(
            account,
            &bytes,
            ToJsonOptions {
                enum_labels: true,
                ..Default::default()
            },
        )
        .expect("Failed to render JSON");

        // --- Assert ---
        assert_eq!(
            json,
            json!({
                "name": "Ada",
                "status": "ACTIVE",
                "tags": ["a", "b"],
                "created_at": "2024-01-02T03:04:05Z"
            })
        );
    }

    #[test]
    fn test_validation_runs_before_decoding() {
        let schema = schema();
        let registration = schema
            .message(sample_schema::REGISTRATION)
            .expect("Registration must exist");

        let err = from_json(
            registration,
            json!({ "a": "x" }),
            FromJsonOptions {
                validate: true,
                ..Default::default()
            },
        )
        .expect_err("b is missing");

        let missing = err
            .downcast_ref::<FieldsMissing>()
            .expect("Expected a FieldsMissing error");
        assert_eq!(missing.fields(), ["b"]);
    }

    #[test]
    fn test_lenient_flag_drops_unknown_fields() {
        let schema = schema();
        let registration = schema
            .message(sample_schema::REGISTRATION)
            .expect("Registration must exist");
        let body = json!({ "a": "x", "z": 1 });

        let strict = from_json(registration.clone(), body.clone(), FromJsonOptions::default())
            .expect_err("z is not a field");
        assert!(matches!(
            strict.downcast_ref::<DecodeError>(),
            Some(DecodeError::UnknownField { .. })
        ));

        let lenient = from_json(
            registration,
            body,
            FromJsonOptions {
                lenient: true,
                ..Default::default()
            },
        );
        assert!(lenient.is_ok());
    }

    #[test]
    fn test_body_must_be_an_object() {
        let schema = schema();
        let registration = schema
            .message(sample_schema::REGISTRATION)
            .expect("Registration must exist");

        let err = validate_body(&registration, json!([1, 2])).expect_err("Arrays are not messages");

        assert_eq!(err.to_string(), "The JSON body must be an object, got sequence");
        assert!(schema.message("sample.v1.Ghost").is_err());
    }
}
