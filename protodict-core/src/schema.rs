//! # Field Classifier
//!
//! A thin view over `prost-reflect` descriptors that answers, once per field, the
//! questions the encoder and decoder keep asking:
//!
//! * Is it a map field, and if so what are its key and value types?
//! * Is it the well-known timestamp type, a nested message, an enum or a plain scalar?
//! * Is it an extension (addressed by number) or a regular field (addressed by name)?
//! * Is it marked optional in its schema options?
//!
//! Map detection relies on the map-entry flag of the entry type and is done here only,
//! callers match on [`FieldKind::Map`].
use crate::coercion::{MESSAGE_TYPE_ID, ScalarType};
use crate::timestamp;
use prost_reflect::{
    DynamicMessage, EnumDescriptor, ExtensionDescriptor, FieldDescriptor, Kind,
    MessageDescriptor, Value as ProstValue,
};

/// Name of the custom field option that marks a field as not required.
pub const IS_OPTIONAL_OPTION: &str = "is_optional";

#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarType),
    Enum(EnumDescriptor),
    /// `google.protobuf.Timestamp`, converted to and from date-times.
    Timestamp(MessageDescriptor),
    Message(MessageDescriptor),
    Map {
        key_type: ScalarType,
        value_type: Box<FieldKind>,
    },
}

impl FieldKind {
    pub fn classify(kind: Kind) -> Self {
        match kind {
            Kind::Message(message) => Self::classify_message(message),
            Kind::Enum(descriptor) => FieldKind::Enum(descriptor),
            scalar => match ScalarType::of_kind(&scalar) {
                Some(ty) => FieldKind::Scalar(ty),
                None => unreachable!("message kinds are matched above"),
            },
        }
    }

    fn classify_message(message: MessageDescriptor) -> Self {
        if message.is_map_entry() {
            let key = message.map_entry_key_field();
            let value = message.map_entry_value_field();
            if let Some(key_type) = ScalarType::of_kind(&key.kind()) {
                return FieldKind::Map {
                    key_type,
                    value_type: Box::new(Self::classify(value.kind())),
                };
            }
        }

        if timestamp::is_timestamp(&message) {
            FieldKind::Timestamp(message)
        } else {
            FieldKind::Message(message)
        }
    }

    /// The numeric type tag, as found in descriptors.
    pub fn type_id(&self) -> i32 {
        match self {
            FieldKind::Scalar(ty) => ty.type_id(),
            FieldKind::Enum(_) => ScalarType::Enum.type_id(),
            FieldKind::Timestamp(_) | FieldKind::Message(_) | FieldKind::Map { .. } => {
                MESSAGE_TYPE_ID
            }
        }
    }

    /// The key used to look this kind up in a coercion table.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldKind::Scalar(ty) => Some(*ty),
            FieldKind::Enum(_) => Some(ScalarType::Enum),
            _ => None,
        }
    }

    pub fn message_descriptor(&self) -> Option<&MessageDescriptor> {
        match self {
            FieldKind::Timestamp(d) | FieldKind::Message(d) => Some(d),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(ty) => ty.name().to_string(),
            FieldKind::Enum(e) => e.full_name().to_string(),
            FieldKind::Timestamp(m) | FieldKind::Message(m) => m.full_name().to_string(),
            FieldKind::Map {
                key_type,
                value_type,
            } => format!("map<{}, {}>", key_type, value_type.describe()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
    Map,
}

/// Either a regular field or an extension.
#[derive(Debug, Clone)]
pub enum FieldRef {
    Field(FieldDescriptor),
    Extension(ExtensionDescriptor),
}

/// A classified field of a message schema.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    target: FieldRef,
    kind: FieldKind,
    cardinality: Cardinality,
}

impl FieldSchema {
    pub fn of_field(field: &FieldDescriptor) -> Self {
        Self::new(
            FieldRef::Field(field.clone()),
            field.kind(),
            field.is_list(),
        )
    }

    pub fn of_extension(extension: &ExtensionDescriptor) -> Self {
        Self::new(
            FieldRef::Extension(extension.clone()),
            extension.kind(),
            extension.is_list(),
        )
    }

    fn new(target: FieldRef, kind: Kind, is_list: bool) -> Self {
        let kind = FieldKind::classify(kind);
        let cardinality = match (&kind, is_list) {
            (FieldKind::Map { .. }, _) => Cardinality::Map,
            (_, true) => Cardinality::Repeated,
            (_, false) => Cardinality::Singular,
        };
        Self {
            target,
            kind,
            cardinality,
        }
    }

    pub fn name(&self) -> &str {
        match &self.target {
            FieldRef::Field(f) => f.name(),
            FieldRef::Extension(e) => e.name(),
        }
    }

    pub fn number(&self) -> u32 {
        match &self.target {
            FieldRef::Field(f) => f.number(),
            FieldRef::Extension(e) => e.number(),
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn target(&self) -> &FieldRef {
        &self.target
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// True for repeated fields that are not maps.
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }

    pub fn is_extension(&self) -> bool {
        matches!(self.target, FieldRef::Extension(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, FieldKind::Enum(_))
    }

    /// Whether the field is a member of a oneof (synthetic oneofs included).
    pub fn in_oneof(&self) -> bool {
        match &self.target {
            FieldRef::Field(f) => f.containing_oneof().is_some(),
            FieldRef::Extension(_) => false,
        }
    }

    /// Whether the field may be left out of an input mapping.
    ///
    /// A field is optional only when it carries the `is_optional = true` custom option.
    /// The proto3 `optional` keyword does not count. Extensions are always optional.
    pub fn is_optional(&self) -> bool {
        match &self.target {
            FieldRef::Field(f) => has_is_optional_option(f),
            FieldRef::Extension(_) => true,
        }
    }

    /// The schema default: empty list or map, zero value, declared proto2 default.
    pub fn default_value(&self) -> ProstValue {
        match &self.target {
            FieldRef::Field(f) => ProstValue::default_value_for_field(f),
            FieldRef::Extension(e) => ProstValue::default_value_for_extension(e),
        }
    }

    /// Mutable access to the field, materializing it with its default if unset.
    pub fn get_mut<'m>(&self, message: &'m mut DynamicMessage) -> &'m mut ProstValue {
        match &self.target {
            FieldRef::Field(f) => message.get_field_mut(f),
            FieldRef::Extension(e) => message.get_extension_mut(e),
        }
    }

    /// Sets the field. The value must already match the field type.
    pub fn set(&self, message: &mut DynamicMessage, value: ProstValue) {
        match &self.target {
            FieldRef::Field(f) => message.set_field(f, value),
            FieldRef::Extension(e) => message.set_extension(e, value),
        }
    }

    /// Resets the field to its default, clearing its presence.
    pub fn clear(&self, message: &mut DynamicMessage) {
        match &self.target {
            FieldRef::Field(f) => message.clear_field(f),
            FieldRef::Extension(e) => message.clear_extension(e),
        }
    }
}

fn has_is_optional_option(field: &FieldDescriptor) -> bool {
    field.options().extensions().any(|(extension, value)| {
        extension.name() == IS_OPTIONAL_OPTION && value.as_bool() == Some(true)
    })
}

/// Resolves a regular field by name.
pub fn field_by_name(descriptor: &MessageDescriptor, name: &str) -> Option<FieldSchema> {
    descriptor
        .get_field_by_name(name)
        .map(|f| FieldSchema::of_field(&f))
}

/// Resolves an extension of `descriptor` registered in its pool.
pub fn extension_by_number(descriptor: &MessageDescriptor, number: u32) -> Option<FieldSchema> {
    descriptor
        .get_extension(number)
        .map(|e| FieldSchema::of_extension(&e))
}

/// Every declared field, in declaration order. Extensions are not included.
pub fn declared_fields(descriptor: &MessageDescriptor) -> impl Iterator<Item = FieldSchema> {
    descriptor.fields().map(|f| FieldSchema::of_field(&f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_field(name: &str) -> FieldSchema {
        let account = sample_schema::message(sample_schema::ACCOUNT);
        field_by_name(&account, name).expect("Field must exist on Account")
    }

    #[test]
    fn test_map_fields_carry_key_and_value_types() {
        let field = account_field("addresses_by_id");

        assert!(field.is_map());
        assert!(!field.is_repeated());
        match field.kind() {
            FieldKind::Map {
                key_type,
                value_type,
            } => {
                assert_eq!(*key_type, ScalarType::Int32);
                assert_eq!(
                    value_type.message_descriptor().map(|m| m.full_name()),
                    Some(sample_schema::ADDRESS)
                );
            }
            other => panic!("Expected a map, got {other:?}"),
        }
        assert_eq!(field.kind().describe(), "map<int32, sample.v1.Address>");
    }

    #[test]
    fn test_classifies_timestamps_enums_and_lists() {
        assert!(matches!(
            account_field("created_at").kind(),
            FieldKind::Timestamp(_)
        ));
        assert!(matches!(account_field("address").kind(), FieldKind::Message(_)));
        assert!(account_field("status").is_enum());

        let history = account_field("history");
        assert!(history.is_repeated());
        assert_eq!(history.kind().scalar_type(), Some(ScalarType::Enum));
        assert_eq!(account_field("created_at").kind().type_id(), MESSAGE_TYPE_ID);
    }

    #[test]
    fn test_optional_and_oneof_membership() {
        // the proto3 keyword alone does not make a field optional
        let nickname = account_field("nickname");
        assert!(!nickname.is_optional());
        assert!(nickname.in_oneof());

        let registration = sample_schema::message(sample_schema::REGISTRATION);
        let c = field_by_name(&registration, "c").expect("c must exist");
        assert!(c.is_optional());

        let email = account_field("email");
        assert!(!email.is_optional());
        assert!(email.in_oneof());

        assert!(!account_field("name").is_optional());
    }

    #[test]
    fn test_extensions_are_resolved_by_number() {
        let legacy = sample_schema::message(sample_schema::LEGACY);

        let note = extension_by_number(&legacy, 1001).expect("Extension 1001 must exist");
        assert!(note.is_extension());
        assert!(note.is_optional());
        assert_eq!(note.name(), "note");
        assert!(extension_by_number(&legacy, 9999).is_none());
    }

    #[test]
    fn test_declared_defaults() {
        let legacy = sample_schema::message(sample_schema::LEGACY);
        let retries = field_by_name(&legacy, "retries").expect("retries must exist");

        assert_eq!(retries.default_value(), ProstValue::I32(3));
        assert_eq!(
            account_field("tags").default_value(),
            ProstValue::List(Vec::new())
        );
    }
}
