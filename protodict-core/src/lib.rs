//! # Protodict Core
//!
//! `protodict-core` converts protobuf messages into plain dynamic value trees (nested
//! mappings, sequences and scalars) and back, guided only by the message descriptor. No
//! generated code is required: field names, nesting and types are discovered at runtime.
//!
//! ## Key Components
//!
//! * **[`encode`]:** message -> [`Mapping`]. Nested messages recurse, repeated fields become
//!   sequences, map fields become typed mappings, `google.protobuf.Timestamp` becomes a
//!   native date-time and extensions land under the [`EXTENSION_CONTAINER`] key.
//! * **[`decode`]:** [`Mapping`] -> message, the inverse of the encoder. Strict by default,
//!   lenient on request.
//! * **[`validate`]:** checks that a mapping carries every field its schema requires.
//! * **[`coercion`]:** the per-scalar-type conversion table both directions can be tuned with.
//!
//! ```
//! use protodict_core::{decode, encode, value::mapping, Value};
//! # let descriptor = sample_schema::message(sample_schema::REGISTRATION);
//!
//! let input = mapping([("a", Value::from("x")), ("b", Value::from(2))]);
//! let message = decode::decode_message(descriptor, &input, &Default::default())?;
//!
//! let output = encode::encode_message(&message, &Default::default())?;
//! assert_eq!(output, input);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports `prost` and `prost-reflect` to ensure that consumers use
//! compatible versions of these underlying dependencies.
pub mod coercion;
pub mod decode;
pub mod encode;
pub mod schema;
pub mod timestamp;
pub mod validate;
pub mod value;

pub use decode::{DecodeError, DecodeOptions};
pub use encode::{EXTENSION_CONTAINER, EncodeError, EncodeOptions};
pub use validate::FieldsMissing;
pub use value::{Key, Mapping, Value};

// Re-exports
pub use prost;
pub use prost_reflect;
