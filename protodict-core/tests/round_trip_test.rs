use chrono::NaiveDate;
use protodict_core::coercion::{CoercionTable, ScalarType};
use protodict_core::decode::{self, DecodeOptions};
use protodict_core::encode::{self, EncodeOptions};
use protodict_core::value::{Key, Mapping, Value, mapping};
use protodict_core::{DecodeError, EncodeError};
use sample_schema::{ACCOUNT, REGISTRATION};

fn decode_account(values: &Mapping, options: &DecodeOptions<'_>) -> Result<Mapping, DecodeError> {
    let message = decode::decode_message(sample_schema::message(ACCOUNT), values, options)?;
    Ok(encode::encode_message(&message, &EncodeOptions::default()).expect("Failed to encode"))
}

#[test]
fn test_scalar_round_trip() {
    let input = mapping([
        ("name", Value::from("Ada")),
        ("age", Value::from(36)),
        ("balance", Value::from(-5i64)),
        ("visits", Value::from(u64::MAX)),
        ("score", Value::from(1.5)),
        ("ratio", Value::from(0.25)),
        ("active", Value::from(true)),
        ("avatar", Value::from(vec![1u8, 2, 3])),
        ("status", Value::from(1)),
        ("delta", Value::from(-3)),
        ("checksum", Value::from(42u64)),
    ]);

    // --- Act ---
    let output = decode_account(&input, &DecodeOptions::default()).expect("Failed to decode");

    // --- Assert ---
    assert_eq!(output, input);
}

#[test]
fn test_repeated_fields_keep_their_order() {
    let input = mapping([
        (
            "tags",
            Value::from(vec![Value::from("b"), Value::from("a"), Value::from("c")]),
        ),
        (
            "lucky_numbers",
            Value::from(vec![Value::from(3), Value::from(1), Value::from(2)]),
        ),
        (
            "previous_addresses",
            Value::from(vec![
                Value::mapping([("street", "First")]),
                Value::mapping([("street", "Second")]),
            ]),
        ),
    ]);

    let output = decode_account(&input, &DecodeOptions::default()).expect("Failed to decode");

    assert_eq!(output, input);
}

#[test]
fn test_map_fields_with_integer_keys_and_message_values() {
    let input = mapping([
        (
            "addresses_by_id",
            Value::mapping([(
                Key::Int(7),
                Value::mapping([("street", Value::from("Main")), ("zip", Value::from(12345u32))]),
            )]),
        ),
        ("counters", Value::mapping([("hits", Value::from(3i64))])),
    ]);

    let output = decode_account(&input, &DecodeOptions::default()).expect("Failed to decode");

    assert_eq!(output, input);
}

#[test]
fn test_map_keys_given_as_strings_are_parsed() {
    let input = mapping([(
        "addresses_by_id",
        Value::mapping([("7", Value::mapping([("street", "Main")]))]),
    )]);

    let output = decode_account(&input, &DecodeOptions::default()).expect("Failed to decode");

    let entry = output
        .get(&Key::from("addresses_by_id"))
        .and_then(Value::as_mapping)
        .and_then(|entries| entries.get(&Key::Int(7)))
        .expect("Entry 7 must be present");
    assert_eq!(entry.get("street"), Some(&Value::from("Main")));
}

#[test]
fn test_emit_defaults_is_idempotent() {
    let account = sample_schema::message(ACCOUNT);
    let options = EncodeOptions::default().emit_defaults(true);
    let message = decode::decode_message(
        account.clone(),
        &mapping([("name", "Ada")]),
        &DecodeOptions::default(),
    )
    .expect("Failed to decode");

    // --- Act ---
    let first = encode::encode_message(&message, &options).expect("Failed to encode");
    let decoded = decode::decode_message(account, &first, &DecodeOptions::default())
        .expect("Failed to decode defaults");
    let second = encode::encode_message(&decoded, &options).expect("Failed to encode again");

    // --- Assert ---
    assert_eq!(first, second);
    assert_eq!(first.get(&Key::from("age")), Some(&Value::Int(0)));
    assert_eq!(first.get(&Key::from("tags")), Some(&Value::Sequence(vec![])));
    assert_eq!(
        first.get(&Key::from("counters")),
        Some(&Value::Mapping(Mapping::new()))
    );
    // singular messages and oneof members are never synthesized
    assert!(!first.contains_key(&Key::from("address")));
    assert!(!first.contains_key(&Key::from("created_at")));
    assert!(!first.contains_key(&Key::from("email")));
    assert!(!first.contains_key(&Key::from("nickname")));
}

#[test]
fn test_absent_fields_are_not_emitted() {
    let output = decode_account(&mapping([("name", "Ada")]), &DecodeOptions::default())
        .expect("Failed to decode");

    assert_eq!(output, mapping([("name", "Ada")]));
}

#[test]
fn test_enum_labels() {
    let input = mapping([
        ("status", Value::from("ACTIVE")),
        (
            "history",
            Value::from(vec![Value::from("SUSPENDED"), Value::from("ACTIVE")]),
        ),
        ("roles", Value::mapping([("admin", "SUSPENDED")])),
    ]);
    let message = decode::decode_message(
        sample_schema::message(ACCOUNT),
        &input,
        &DecodeOptions::default(),
    )
    .expect("Failed to decode labels");

    // --- Act ---
    let by_number = encode::encode_message(&message, &EncodeOptions::default())
        .expect("Failed to encode numbers");
    let by_label = encode::encode_message(&message, &EncodeOptions::default().enum_as_label(true))
        .expect("Failed to encode labels");
    let lowercase = encode::encode_message(
        &message,
        &EncodeOptions::default()
            .enum_as_label(true)
            .lowercase_enum_labels(true),
    )
    .expect("Failed to encode lowercase labels");

    // --- Assert ---
    assert_eq!(by_number.get(&Key::from("status")), Some(&Value::Int(1)));
    assert_eq!(by_label, input);
    assert_eq!(
        lowercase.get(&Key::from("status")),
        Some(&Value::from("active"))
    );
}

#[test]
fn test_lowercase_labels_need_lenient_decoding() {
    let account = sample_schema::message(ACCOUNT);
    let input = mapping([("status", "active")]);

    let strict = decode::decode_message(account.clone(), &input, &DecodeOptions::default());
    assert!(matches!(
        strict,
        Err(DecodeError::InvalidEnumLabel { ref field, ref label }) if field == "status" && label == "active"
    ));

    let lenient = decode::decode_message(account, &input, &DecodeOptions::default().strict(false))
        .expect("Lenient decoding must accept lowercase labels");
    let output = encode::encode_message(&lenient, &EncodeOptions::default().enum_as_label(true))
        .expect("Failed to encode");
    assert_eq!(output, mapping([("status", "ACTIVE")]));
}

#[test]
fn test_unknown_fields_depend_on_strictness() {
    let input = mapping([("name", "Ada"), ("shoe_size", "42")]);

    let strict = decode_account(&input, &DecodeOptions::default());
    assert!(matches!(
        strict,
        Err(DecodeError::UnknownField { ref key, .. }) if key == "shoe_size"
    ));

    let lenient = decode_account(&input, &DecodeOptions::default().strict(false))
        .expect("Lenient decoding must drop unknown fields");
    assert_eq!(lenient, mapping([("name", "Ada")]));
}

#[test]
fn test_timestamps_become_date_times() {
    let created_at = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_milli_opt(3, 4, 5, 500))
        .expect("valid date");

    let from_datetime = decode_account(
        &mapping([("created_at", Value::from(created_at))]),
        &DecodeOptions::default(),
    )
    .expect("Failed to decode a date-time");
    let from_string = decode_account(
        &mapping([("created_at", "2024-01-02T03:04:05.500Z")]),
        &DecodeOptions::default(),
    )
    .expect("Failed to decode an RFC 3339 string");

    assert_eq!(
        from_datetime.get(&Key::from("created_at")),
        Some(&Value::DateTime(created_at))
    );
    assert_eq!(from_datetime, from_string);
}

#[test]
fn test_assignment_errors_name_the_field() {
    let wrong_type = decode_account(&mapping([("age", "old")]), &DecodeOptions::default());
    assert!(matches!(
        wrong_type,
        Err(DecodeError::FieldAssignment { ref message, ref field, .. })
            if message == ACCOUNT && field == "age"
    ));

    let too_large = decode_account(
        &mapping([("age", Value::from(i64::MAX))]),
        &DecodeOptions::default(),
    );
    assert!(matches!(too_large, Err(DecodeError::FieldAssignment { .. })));

    let not_a_message = decode_account(&mapping([("address", "Main")]), &DecodeOptions::default());
    assert!(matches!(
        not_a_message,
        Err(DecodeError::FieldAssignment { ref field, .. }) if field == "address"
    ));
}

#[test]
fn test_decode_coercions_are_opt_in() {
    let input = mapping([("age", "42"), ("active", "true")]);

    let output = decode_account(
        &input,
        &DecodeOptions::default().with_coercions(CoercionTable::standard()),
    )
    .expect("Standard coercions must parse numeric strings");

    assert_eq!(
        output,
        mapping([("age", Value::Int(42)), ("active", Value::Bool(true))])
    );
}

#[test]
fn test_missing_coercion_is_unsupported() {
    let table = CoercionTable::standard().clone().without(ScalarType::Bytes);
    let message = decode::decode_message(
        sample_schema::message(ACCOUNT),
        &mapping([("avatar", Value::from(vec![1u8]))]),
        &DecodeOptions::default(),
    )
    .expect("Failed to decode");

    let result = encode::encode_message(&message, &EncodeOptions::default().with_coercions(&table));

    assert!(matches!(
        result,
        Err(EncodeError::UnsupportedFieldType { ref field, type_id: 12, .. }) if field == "avatar"
    ));
}

#[test]
fn test_decode_into_merges_with_existing_values() {
    let mut message = decode::decode_message(
        sample_schema::message(REGISTRATION),
        &mapping([("a", Value::from("x")), ("b", Value::from(1))]),
        &DecodeOptions::default(),
    )
    .expect("Failed to decode");

    decode::decode_into(&mut message, &mapping([("b", 2)]), &DecodeOptions::default())
        .expect("Failed to decode into existing message");

    let output = encode::encode_message(&message, &EncodeOptions::default()).expect("Failed to encode");
    assert_eq!(output, mapping([("a", Value::from("x")), ("b", Value::from(2))]));
}
