//! # Timestamp adapter
//!
//! `google.protobuf.Timestamp` is not encoded like other messages: it becomes a
//! native [`NaiveDateTime`] (UTC, no zone) and a date-time given to the decoder is
//! turned back into an independent `Timestamp` message.
use chrono::{DateTime, NaiveDateTime};
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage, Value as ProstValue};

/// Fully qualified name of the well-known timestamp type.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("Timestamp {seconds}s {nanos}ns is out of the supported date-time range")]
    OutOfRange { seconds: i64, nanos: i32 },
    #[error("Message '{0}' is not a google.protobuf.Timestamp")]
    NotATimestamp(String),
}

pub fn is_timestamp(descriptor: &MessageDescriptor) -> bool {
    descriptor.full_name() == TIMESTAMP_TYPE
}

/// Reads `seconds` and `nanos` off a `Timestamp` message.
pub fn to_datetime(message: &DynamicMessage) -> Result<NaiveDateTime, TimestampError> {
    let descriptor = message.descriptor();
    if !is_timestamp(&descriptor) {
        return Err(TimestampError::NotATimestamp(
            descriptor.full_name().to_string(),
        ));
    }

    let seconds = message
        .get_field_by_name("seconds")
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    let nanos = message
        .get_field_by_name("nanos")
        .and_then(|v| v.as_i32())
        .unwrap_or_default();

    u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::from_timestamp(seconds, n))
        .map(|dt| dt.naive_utc())
        .ok_or(TimestampError::OutOfRange { seconds, nanos })
}

/// Builds a new `Timestamp` message of type `descriptor` for `dt`.
pub fn to_message(
    descriptor: MessageDescriptor,
    dt: &NaiveDateTime,
) -> Result<DynamicMessage, TimestampError> {
    if !is_timestamp(&descriptor) {
        return Err(TimestampError::NotATimestamp(
            descriptor.full_name().to_string(),
        ));
    }

    let utc = dt.and_utc();
    // Both fields are part of the well-known type, a missing one means a broken pool.
    let (Some(seconds), Some(nanos)) = (
        descriptor.get_field_by_name("seconds"),
        descriptor.get_field_by_name("nanos"),
    ) else {
        return Err(TimestampError::NotATimestamp(
            descriptor.full_name().to_string(),
        ));
    };

    let mut message = DynamicMessage::new(descriptor);
    message.set_field(&seconds, ProstValue::I64(utc.timestamp()));
    // subsec nanos are always below 2e9, so they fit an i32
    message.set_field(&nanos, ProstValue::I32(utc.timestamp_subsec_nanos() as i32));
    Ok(message)
}

/// Parses an RFC 3339 string (`2024-01-02T03:04:05Z`, any offset) or a zone-less
/// `2024-01-02T03:04:05` into a UTC date-time.
pub fn parse(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
