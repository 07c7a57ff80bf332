//! # Sample Schema
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a descriptor pool for
//! testing `protodict-core` and the `protodict` CLI. It is not intended for production use.
//!
//! The schema is assembled from `prost-types` descriptors in code, so no `protoc` is
//! needed at build time. It is equivalent to the following files:
//!
//! ```proto
//! // google/protobuf/timestamp.proto
//! message Timestamp { int64 seconds = 1; int32 nanos = 2; }
//!
//! // sample/v1/options.proto
//! syntax = "proto3";
//! package sample.v1;
//! import "google/protobuf/descriptor.proto";
//!
//! extend google.protobuf.FieldOptions { bool is_optional = 50000; }
//!
//! // sample/v1/catalog.proto
//! syntax = "proto3";
//! package sample.v1;
//! import "sample/v1/options.proto";
//!
//! enum Status { UNKNOWN = 0; ACTIVE = 1; SUSPENDED = 2; }
//!
//! message Address { string street = 1; uint32 zip = 2; }
//!
//! message Account {
//!   string name = 1;
//!   int32 age = 2;
//!   int64 balance = 3;
//!   uint64 visits = 4;
//!   double score = 5;
//!   float ratio = 6;
//!   bool active = 7;
//!   bytes avatar = 8;
//!   Status status = 9;
//!   repeated string tags = 10;
//!   repeated int32 lucky_numbers = 11;
//!   repeated Status history = 12;
//!   Address address = 13;
//!   repeated Address previous_addresses = 14;
//!   map<int32, Address> addresses_by_id = 15;
//!   map<string, int64> counters = 16;
//!   google.protobuf.Timestamp created_at = 17;
//!   optional string nickname = 18;
//!   oneof contact { string email = 19; string phone = 20; }
//!   sint32 delta = 21;
//!   fixed64 checksum = 22;
//!   map<string, Status> roles = 23;
//! }
//!
//! message Registration {
//!   string a = 1;
//!   int32 b = 2;
//!   string c = 3 [(sample.v1.is_optional) = true];
//! }
//!
//! // sample/v1/legacy.proto
//! syntax = "proto2";
//! package sample.v1;
//!
//! message Legacy {
//!   optional string name = 1;
//!   optional int32 retries = 2 [default = 3];
//!   extensions 1000 to 9999;
//! }
//!
//! extend Legacy {
//!   optional string note = 1001;
//!   optional int32 priority = 1002;
//!   repeated string labels = 1003;
//! }
//! ```
//!
//! `google/protobuf/descriptor.proto` is taken from the global `prost-reflect` pool.
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
    descriptor_proto::ExtensionRange,
    field_descriptor_proto::{Label, Type},
};
use std::sync::LazyLock;

pub const ACCOUNT: &str = "sample.v1.Account";
pub const ADDRESS: &str = "sample.v1.Address";
pub const REGISTRATION: &str = "sample.v1.Registration";
pub const LEGACY: &str = "sample.v1.Legacy";
pub const STATUS: &str = "sample.v1.Status";
pub const IS_OPTIONAL: &str = "sample.v1.is_optional";

const DESCRIPTOR_FILE: &str = "google/protobuf/descriptor.proto";

static FILE_DESCRIPTOR_SET: LazyLock<Vec<u8>> = LazyLock::new(build_file_descriptor_set);

static POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET.as_slice())
        .expect("Sample schema must be a valid descriptor set")
});

/// The shared pool holding every sample file.
pub fn pool() -> DescriptorPool {
    POOL.clone()
}

/// Looks up a message of the sample schema, panicking if it does not exist.
pub fn message(name: &str) -> MessageDescriptor {
    POOL.get_message_by_name(name)
        .unwrap_or_else(|| panic!("Message '{name}' not found in the sample schema"))
}

/// The encoded `FileDescriptorSet`, as it would be written by `protoc --descriptor_set_out`.
pub fn file_descriptor_set_bytes() -> Vec<u8> {
    FILE_DESCRIPTOR_SET.clone()
}

/// `prost-types` drops option extensions it does not know, so `is_optional` is set on
/// the encoded set through reflection, with a pool that knows the extension.
fn build_file_descriptor_set() -> Vec<u8> {
    let set = FileDescriptorSet {
        file: vec![
            descriptor_file(),
            options_file(),
            timestamp_file(),
            catalog_file(),
            legacy_file(),
        ],
    };

    let mut bootstrap = DescriptorPool::global();
    bootstrap
        .add_file_descriptor_proto(options_file())
        .expect("options.proto must extend FieldOptions");
    let is_optional = bootstrap
        .get_extension_by_name(IS_OPTIONAL)
        .expect("is_optional must be registered");
    let set_descriptor = bootstrap
        .get_message_by_name("google.protobuf.FileDescriptorSet")
        .expect("FileDescriptorSet must be in the global pool");

    let mut set = DynamicMessage::decode(set_descriptor, set.encode_to_vec().as_slice())
        .expect("Failed to reflect the sample descriptor set");

    let catalog = named_entry(list_field(&mut set, "file"), "sample/v1/catalog.proto");
    let registration = named_entry(list_field(catalog, "message_type"), "Registration");
    let c = named_entry(list_field(registration, "field"), "c");
    c.get_field_by_name_mut("options")
        .and_then(Value::as_message_mut)
        .expect("Field options must be a message")
        .set_extension(&is_optional, Value::Bool(true));

    set.encode_to_vec()
}

fn list_field<'m>(message: &'m mut DynamicMessage, name: &str) -> &'m mut Vec<Value> {
    message
        .get_field_by_name_mut(name)
        .and_then(Value::as_list_mut)
        .unwrap_or_else(|| panic!("'{name}' must be a repeated field"))
}

fn named_entry<'l>(entries: &'l mut [Value], name: &str) -> &'l mut DynamicMessage {
    entries
        .iter_mut()
        .filter_map(Value::as_message_mut)
        .find(|entry| {
            entry
                .get_field_by_name("name")
                .is_some_and(|n| n.as_str() == Some(name))
        })
        .unwrap_or_else(|| panic!("No entry named '{name}'"))
}

fn descriptor_file() -> FileDescriptorProto {
    DescriptorPool::global()
        .get_file_by_name(DESCRIPTOR_FILE)
        .expect("descriptor.proto must be in the global pool")
        .file_descriptor_proto()
        .clone()
}

fn options_file() -> FileDescriptorProto {
    let mut is_optional = scalar("is_optional", 50000, Label::Optional, Type::Bool);
    is_optional.extendee = Some(".google.protobuf.FieldOptions".to_string());

    FileDescriptorProto {
        name: Some("sample/v1/options.proto".to_string()),
        package: Some("sample.v1".to_string()),
        dependency: vec![DESCRIPTOR_FILE.to_string()],
        syntax: Some("proto3".to_string()),
        extension: vec![is_optional],
        ..Default::default()
    }
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Timestamp".to_string()),
            field: vec![
                scalar("seconds", 1, Label::Optional, Type::Int64),
                scalar("nanos", 2, Label::Optional, Type::Int32),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn catalog_file() -> FileDescriptorProto {
    let status = EnumDescriptorProto {
        name: Some("Status".to_string()),
        value: ["UNKNOWN", "ACTIVE", "SUSPENDED"]
            .into_iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let address = DescriptorProto {
        name: Some("Address".to_string()),
        field: vec![
            scalar("street", 1, Label::Optional, Type::String),
            scalar("zip", 2, Label::Optional, Type::Uint32),
        ],
        ..Default::default()
    };

    let mut nickname = scalar("nickname", 18, Label::Optional, Type::String);
    nickname.proto3_optional = Some(true);
    nickname.oneof_index = Some(1);

    let mut email = scalar("email", 19, Label::Optional, Type::String);
    email.oneof_index = Some(0);
    let mut phone = scalar("phone", 20, Label::Optional, Type::String);
    phone.oneof_index = Some(0);

    let account = DescriptorProto {
        name: Some("Account".to_string()),
        field: vec![
            scalar("name", 1, Label::Optional, Type::String),
            scalar("age", 2, Label::Optional, Type::Int32),
            scalar("balance", 3, Label::Optional, Type::Int64),
            scalar("visits", 4, Label::Optional, Type::Uint64),
            scalar("score", 5, Label::Optional, Type::Double),
            scalar("ratio", 6, Label::Optional, Type::Float),
            scalar("active", 7, Label::Optional, Type::Bool),
            scalar("avatar", 8, Label::Optional, Type::Bytes),
            named("status", 9, Label::Optional, Type::Enum, ".sample.v1.Status"),
            scalar("tags", 10, Label::Repeated, Type::String),
            scalar("lucky_numbers", 11, Label::Repeated, Type::Int32),
            named("history", 12, Label::Repeated, Type::Enum, ".sample.v1.Status"),
            named("address", 13, Label::Optional, Type::Message, ".sample.v1.Address"),
            named(
                "previous_addresses",
                14,
                Label::Repeated,
                Type::Message,
                ".sample.v1.Address",
            ),
            named(
                "addresses_by_id",
                15,
                Label::Repeated,
                Type::Message,
                ".sample.v1.Account.AddressesByIdEntry",
            ),
            named(
                "counters",
                16,
                Label::Repeated,
                Type::Message,
                ".sample.v1.Account.CountersEntry",
            ),
            named(
                "created_at",
                17,
                Label::Optional,
                Type::Message,
                ".google.protobuf.Timestamp",
            ),
            nickname,
            email,
            phone,
            scalar("delta", 21, Label::Optional, Type::Sint32),
            scalar("checksum", 22, Label::Optional, Type::Fixed64),
            named(
                "roles",
                23,
                Label::Repeated,
                Type::Message,
                ".sample.v1.Account.RolesEntry",
            ),
        ],
        nested_type: vec![
            map_entry(
                "AddressesByIdEntry",
                Type::Int32,
                named("value", 2, Label::Optional, Type::Message, ".sample.v1.Address"),
            ),
            map_entry(
                "CountersEntry",
                Type::String,
                scalar("value", 2, Label::Optional, Type::Int64),
            ),
            map_entry(
                "RolesEntry",
                Type::String,
                named("value", 2, Label::Optional, Type::Enum, ".sample.v1.Status"),
            ),
        ],
        // real oneofs first, then the synthetic one backing `optional nickname`
        oneof_decl: vec![oneof("contact"), oneof("_nickname")],
        ..Default::default()
    };

    let registration = DescriptorProto {
        name: Some("Registration".to_string()),
        field: vec![
            scalar("a", 1, Label::Optional, Type::String),
            scalar("b", 2, Label::Optional, Type::Int32),
            // `is_optional` is set later, see `build_file_descriptor_set`
            scalar("c", 3, Label::Optional, Type::String),
        ],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("sample/v1/catalog.proto".to_string()),
        package: Some("sample.v1".to_string()),
        dependency: vec![
            "google/protobuf/timestamp.proto".to_string(),
            "sample/v1/options.proto".to_string(),
        ],
        syntax: Some("proto3".to_string()),
        enum_type: vec![status],
        message_type: vec![address, account, registration],
        ..Default::default()
    }
}

fn legacy_file() -> FileDescriptorProto {
    let mut retries = scalar("retries", 2, Label::Optional, Type::Int32);
    retries.default_value = Some("3".to_string());

    let legacy = DescriptorProto {
        name: Some("Legacy".to_string()),
        field: vec![scalar("name", 1, Label::Optional, Type::String), retries],
        extension_range: vec![ExtensionRange {
            start: Some(1000),
            end: Some(10000),
            ..Default::default()
        }],
        ..Default::default()
    };

    let extensions = [
        scalar("note", 1001, Label::Optional, Type::String),
        scalar("priority", 1002, Label::Optional, Type::Int32),
        scalar("labels", 1003, Label::Repeated, Type::String),
    ]
    .into_iter()
    .map(|mut ext| {
        ext.extendee = Some(".sample.v1.Legacy".to_string());
        ext
    })
    .collect();

    FileDescriptorProto {
        name: Some("sample/v1/legacy.proto".to_string()),
        package: Some("sample.v1".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![legacy],
        extension: extensions,
        ..Default::default()
    }
}

fn scalar(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn named(name: &str, number: i32, label: Label, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, label, ty)
    }
}

fn map_entry(name: &str, key: Type, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![scalar("key", 1, Label::Optional, key), value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}
