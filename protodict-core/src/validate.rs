//! # Required-Field Validator
//!
//! Checks a mapping against a message schema before decoding. Every declared field is
//! required unless it is marked optional (see [`FieldSchema::is_optional`]). Extensions
//! are never required.
use crate::schema::{self, FieldSchema};
use crate::value::{Key, Mapping};
use prost_reflect::MessageDescriptor;

/// The complete list of required fields absent from a mapping, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing fields: {}", .missing.join(", "))]
pub struct FieldsMissing {
    missing: Vec<String>,
}

impl FieldsMissing {
    pub fn fields(&self) -> &[String] {
        &self.missing
    }

    pub fn into_fields(self) -> Vec<String> {
        self.missing
    }
}

/// Validates that `values` has a key for every required field of `descriptor`.
///
/// Only presence is checked, not the shape of the values.
pub fn validate(descriptor: &MessageDescriptor, values: &Mapping) -> Result<(), FieldsMissing> {
    let missing: Vec<String> = schema::declared_fields(descriptor)
        .filter(|field| !field.is_optional())
        .filter(|field| !values.contains_key(&Key::from(field.name())))
        .map(|field: FieldSchema| field.name().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::debug!(
            message_type = descriptor.full_name(),
            missing = missing.len(),
            "required fields missing"
        );
        Err(FieldsMissing { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, mapping};

    #[test]
    fn test_reports_every_missing_field_in_order() {
        let registration = sample_schema::message(sample_schema::REGISTRATION);

        let err = validate(&registration, &Mapping::new()).expect_err("Both a and b are required");

        assert_eq!(err.fields(), ["a", "b"]);
        assert_eq!(err.to_string(), "Missing fields: a, b");
    }

    #[test]
    fn test_fields_marked_is_optional_are_not_required() {
        let registration = sample_schema::message(sample_schema::REGISTRATION);
        let values = mapping([("a", Value::from("x")), ("b", Value::from(1))]);

        assert_eq!(validate(&registration, &values), Ok(()));

        let err = validate(&registration, &mapping([("a", 1)])).expect_err("b is required");
        assert_eq!(err.fields(), ["b"]);
    }

    #[test]
    fn test_proto3_optional_keyword_is_still_required() {
        let account = sample_schema::message(sample_schema::ACCOUNT);

        let err = validate(&account, &Mapping::new()).expect_err("Account has required fields");

        assert!(err.fields().iter().any(|f| f == "nickname"));
        assert!(err.fields().iter().any(|f| f == "email"));
    }

    #[test]
    fn test_null_counts_as_present() {
        let registration = sample_schema::message(sample_schema::REGISTRATION);
        let values = mapping([("a", Value::Null), ("b", Value::Null)]);

        assert_eq!(validate(&registration, &values), Ok(()));
    }
}
