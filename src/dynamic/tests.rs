use std::{borrow::Cow, ops::ControlFlow};

use prost::bytes::Bytes;
use prost_types::{Duration, Timestamp};

use crate::{
    test_file_set, DynamicMessage, ExtensionRegistry, FieldAccessError, KnownTypeRegistry, MapKey,
    MessageFactory, Value,
};

fn new_message(name: &str) -> DynamicMessage {
    let files = test_file_set();
    DynamicMessage::new(files.get_message_by_name(name).unwrap())
}

fn entry(message: &DynamicMessage, field: &str, key: &str, value: i32) -> Value {
    let field = message.descriptor().get_field_by_name(field).unwrap();
    let entry_desc = field.kind().as_message().unwrap().clone();
    let mut entry = DynamicMessage::new(entry_desc);
    entry.set_field_by_number(1, Value::from(key));
    entry.set_field_by_number(2, Value::I32(value));
    Value::Message(entry)
}

#[test]
fn proto3_defaults() {
    let message = new_message("test.Scalars");

    assert_eq!(message.get_field_by_name("int32_value"), Some(Cow::Owned(Value::I32(0))));
    assert_eq!(message.get_field_by_name("double_value"), Some(Cow::Owned(Value::F64(0.0))));
    assert_eq!(
        message.get_field_by_name("string_value"),
        Some(Cow::Owned(Value::String(String::new())))
    );
    assert_eq!(
        message.get_field_by_name("bytes_value"),
        Some(Cow::Owned(Value::Bytes(Bytes::new())))
    );
    assert_eq!(message.get_field_by_name("color"), Some(Cow::Owned(Value::EnumNumber(0))));
    assert_eq!(
        message.get_field_by_name("optional_int32"),
        Some(Cow::Owned(Value::I32(0)))
    );

    for field in message.descriptor().fields() {
        assert!(!message.has_field(&field), "{} should be unset", field.name());
    }
    assert!(message.is_empty());
    assert_eq!(message.encoded_len(), 0);
}

#[test]
fn proto3_presence() {
    let mut message = new_message("test.Scalars");

    message.set_field_by_name("int32_value", Value::I32(0));
    assert!(!message.has_field_by_name("int32_value"));
    assert!(message.is_empty());

    message.set_field_by_name("int32_value", Value::I32(5));
    assert!(message.has_field_by_name("int32_value"));

    message.set_field_by_name("optional_int32", Value::I32(0));
    assert!(message.has_field_by_name("optional_int32"));

    message.clear_field_by_name("int32_value");
    assert!(!message.has_field_by_name("int32_value"));
    assert_eq!(message.get_field_by_name("int32_value").as_deref(), Some(&Value::I32(0)));
}

#[test]
fn proto2_defaults() {
    let mut message = new_message("legacy.Defaults");

    assert_eq!(message.get_field_by_name("count").as_deref(), Some(&Value::I32(42)));
    assert_eq!(message.get_field_by_name("name").as_deref(), Some(&Value::from("hello")));
    assert_eq!(message.get_field_by_name("level").as_deref(), Some(&Value::EnumNumber(1)));
    assert_eq!(message.get_field_by_name("ratio").as_deref(), Some(&Value::F64(1.5)));
    assert_eq!(
        message.get_field_by_name("data").as_deref(),
        Some(&Value::Bytes(Bytes::from_static(b"\x01\x02")))
    );
    assert_eq!(message.get_field_by_name("flag").as_deref(), Some(&Value::Bool(false)));
    assert_eq!(message.get_field_by_name("item"), None);
    assert_eq!(message.get_field_by_name("entry").as_deref(), Some(&Value::List(vec![])));

    assert!(!message.has_field_by_name("count"));
    message.set_field_by_name("count", Value::I32(42));
    assert!(message.has_field_by_name("count"));
    assert_eq!(message.encode_to_vec(), b"\x08\x2a");
}

#[test]
fn set_field_errors() {
    let mut message = new_message("test.Scalars");

    let err = message
        .try_set_field_by_name("int32_value", Value::I64(1))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expected a value of type 'int32' for field 'test.Scalars.int32_value', but found 'i64'");

    let err = message
        .try_set_field_by_name("missing", Value::I32(1))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"message 'test.Scalars' has no field 'missing'");

    assert_eq!(
        message.try_get_field_by_number(99),
        Err(FieldAccessError::UnknownField {
            message: "test.Scalars".to_owned(),
            field: "99".to_owned(),
        })
    );

    // A failed set keeps the previous value.
    message.set_field_by_name("uint32_value", Value::U32(3));
    assert!(message
        .try_set_field_by_name("uint32_value", Value::I32(4))
        .is_err());
    assert_eq!(
        message.get_field_by_name("uint32_value").as_deref(),
        Some(&Value::U32(3))
    );
}

#[test]
#[should_panic(expected = "message 'test.Scalars' has no field 'missing'")]
fn set_field_panics() {
    let mut message = new_message("test.Scalars");
    message.set_field_by_name("missing", Value::I32(1));
}

#[test]
fn widening_on_set() {
    let mut message = new_message("test.Scalars");

    message.set_field_by_name("int64_value", Value::I32(-5));
    message.set_field_by_name("fixed64_value", Value::U32(5));
    message.set_field_by_name("double_value", Value::F32(0.25));

    assert_eq!(message.get_field_by_name("int64_value").as_deref(), Some(&Value::I64(-5)));
    assert_eq!(message.get_field_by_name("fixed64_value").as_deref(), Some(&Value::U64(5)));
    assert_eq!(message.get_field_by_name("double_value").as_deref(), Some(&Value::F64(0.25)));
}

#[test]
fn oneof_exclusivity() {
    let mut message = new_message("test.Choice");
    let oneof = message
        .descriptor()
        .oneofs()
        .find(|oneof| oneof.name() == "kind")
        .unwrap();

    assert_eq!(message.get_oneof_field(&oneof), None);
    assert_eq!(message.get_field_by_name("number"), None);

    message.set_field_by_name("number", Value::I32(1));
    message.set_field_by_name("other", Value::I32(2));
    message.set_field_by_name("text", Value::from("a"));

    assert!(!message.has_field_by_name("number"));
    assert!(message.has_field_by_name("text"));
    assert!(message.has_field_by_name("other"));
    assert_eq!(message.get_field_by_name("number"), None);

    let (field, value) = message.get_oneof_field(&oneof).unwrap();
    assert_eq!(field.name(), "text");
    assert_eq!(value, &Value::from("a"));

    let nested = DynamicMessage::new(test_file_set().get_message_by_name("test.Scalars").unwrap());
    message.set_field_by_name("nested", Value::Message(nested));
    assert!(!message.has_field_by_name("text"));
    let (field, _) = message.get_oneof_field(&oneof).unwrap();
    assert_eq!(field.name(), "nested");
}

#[test]
fn oneof_from_other_message() {
    let message = new_message("test.Choice");
    let other = new_message("test.Scalars");
    let synthetic = other.descriptor().oneofs().next().unwrap();
    assert!(synthetic.is_synthetic());

    let err = message.try_get_oneof_field(&synthetic).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"oneof 'test.Scalars._optional_int32' is not declared in message 'test.Choice'");
}

#[test]
fn repeated_fields() {
    let mut message = new_message("test.Repeated");

    assert_eq!(message.field_len("packed"), 0);
    message.add_repeated_field("packed", Value::I32(1));
    message.add_repeated_field("packed", Value::I32(2));
    assert_eq!(message.field_len("packed"), 2);
    assert!(message.has_field_by_name("packed"));
    assert_eq!(*message.get_repeated_field("packed", 1), Value::I32(2));

    message.set_repeated_field("packed", 0, Value::I32(5));
    assert_eq!(
        message.get_field_by_name("packed").as_deref(),
        Some(&Value::List(vec![Value::I32(5), Value::I32(2)]))
    );

    assert_eq!(
        message.try_get_repeated_field("packed", 2),
        Err(FieldAccessError::IndexOutOfRange {
            field: "test.Repeated.packed".to_owned(),
            index: 2,
            len: 2,
        })
    );
    assert_eq!(
        message.try_set_repeated_field("unpacked", 0, Value::I32(1)),
        Err(FieldAccessError::IndexOutOfRange {
            field: "test.Repeated.unpacked".to_owned(),
            index: 0,
            len: 0,
        })
    );
    assert!(matches!(
        message.try_add_repeated_field("strings", Value::I32(1)),
        Err(FieldAccessError::TypeMismatch { .. })
    ));

    let mut scalars = new_message("test.Scalars");
    let err = scalars.try_add_repeated_field("int32_value", Value::I32(1)).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"field 'test.Scalars.int32_value' is not a repeated field");
    assert!(matches!(
        scalars.try_field_len("int32_value"),
        Err(FieldAccessError::NotRepeated { .. })
    ));
}

#[test]
fn set_list_field() {
    let mut message = new_message("test.Repeated");

    message.set_field_by_name("doubles", Value::List(vec![Value::F32(0.5), Value::F64(1.5)]));
    assert_eq!(
        message.get_field_by_name("doubles").as_deref(),
        Some(&Value::List(vec![Value::F64(0.5), Value::F64(1.5)]))
    );

    message.set_field_by_name("doubles", Value::List(vec![]));
    assert!(!message.has_field_by_name("doubles"));
}

#[test]
fn map_fields() {
    let mut message = new_message("test.Maps");

    message.put_map_entry("string_int32", "b", Value::I32(2));
    message.put_map_entry("string_int32", "a", Value::I32(1));
    assert_eq!(message.field_len("string_int32"), 2);
    assert_eq!(message.get_map_entry("string_int32", "a"), Some(&Value::I32(1)));
    assert_eq!(message.get_map_entry("string_int32", "c"), None);

    let mut keys = Vec::new();
    message.for_each_map_entry("string_int32", |key, _| {
        keys.push(key.clone());
        ControlFlow::Continue(())
    });
    assert_eq!(keys, vec![MapKey::from("a"), MapKey::from("b")]);

    let mut visited = 0;
    message.for_each_map_entry("string_int32", |_, _| {
        visited += 1;
        ControlFlow::Break(())
    });
    assert_eq!(visited, 1);

    assert_eq!(message.remove_map_entry("string_int32", "missing"), None);
    assert_eq!(message.remove_map_entry("string_int32", "b"), Some(Value::I32(2)));
    assert_eq!(message.field_len("string_int32"), 1);

    // Narrower integer keys widen like values do.
    message.put_map_entry("uint64_enum", 7u32, Value::EnumNumber(1));
    assert_eq!(message.get_map_entry("uint64_enum", 7u64), Some(&Value::EnumNumber(1)));

    let err = message
        .try_put_map_entry("string_int32", 1i32, Value::I32(1))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expected a value of type 'map<string, int32>' for field 'test.Maps.string_int32', but found 'map with i32 keys'");

    let mut repeated = new_message("test.Repeated");
    let err = repeated
        .try_put_map_entry("packed", "a", Value::I32(1))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"field 'test.Repeated.packed' is not a map field");
}

#[test]
fn map_repeated_duality() {
    let mut by_key = new_message("test.Maps");
    by_key.put_map_entry("string_int32", "a", Value::I32(1));
    by_key.put_map_entry("string_int32", "b", Value::I32(2));

    let mut by_entry = new_message("test.Maps");
    let first = entry(&by_entry, "string_int32", "a", 1);
    let second = entry(&by_entry, "string_int32", "b", 2);
    by_entry.add_repeated_field("string_int32", first.clone());
    by_entry.add_repeated_field("string_int32", second);

    assert_eq!(by_key, by_entry);
    assert_eq!(*by_entry.get_repeated_field("string_int32", 0), first);

    assert_eq!(by_key.remove_map_entry("string_int32", "missing"), None);
    assert_eq!(by_entry.remove_map_entry("string_int32", "missing"), None);
    assert_eq!(by_key, by_entry);

    let replacement = entry(&by_entry, "string_int32", "c", 3);
    by_entry.set_repeated_field("string_int32", 0, replacement);
    assert_eq!(by_entry.get_map_entry("string_int32", "a"), None);
    assert_eq!(by_entry.get_map_entry("string_int32", "c"), Some(&Value::I32(3)));

    let mut from_list = new_message("test.Maps");
    let entries = vec![
        entry(&from_list, "string_int32", "a", 1),
        entry(&from_list, "string_int32", "b", 2),
    ];
    from_list.set_field_by_name("string_int32", Value::List(entries));
    assert_eq!(from_list, by_key);
}

#[test]
fn extensions_through_factory() {
    let files = test_file_set();
    let base = files.get_message_by_name("pkg.Base").unwrap();
    let label = files.get_extension_by_name("pkg.ext.label").unwrap();

    let registry = ExtensionRegistry::new();
    registry.add_file(&files.get_file_by_name("ext.proto").unwrap());
    let factory = MessageFactory::new(registry, KnownTypeRegistry::new());

    let mut message = factory.new_dynamic_message(base.clone());
    message.set_field_by_name("pkg.ext.label", Value::from("x"));
    assert_eq!(message.get_field(&label).as_deref(), Some(&Value::from("x")));
    message.add_repeated_field(200u32, Value::I32(3));
    assert_eq!(message.field_len(".pkg.ext.Scope.scores"), 1);

    let mut unbound = DynamicMessage::new(base);
    assert!(matches!(
        unbound.try_set_field_by_number(100, Value::from("x")),
        Err(FieldAccessError::UnknownField { .. })
    ));
    unbound.set_field(&label, Value::from("y"));
    assert_eq!(unbound.get_field_by_number(100).as_deref(), Some(&Value::from("y")));
    assert_eq!(unbound.get_field_by_name("pkg.ext.label").as_deref(), Some(&Value::from("y")));

    let fields: Vec<_> = unbound.fields().map(|(field, _)| field.full_name().to_owned()).collect();
    assert_eq!(fields, ["pkg.ext.label"]);
}

#[test]
fn extension_of_other_message() {
    let files = test_file_set();
    let label = files.get_extension_by_name("pkg.ext.label").unwrap();
    let mut message = new_message("legacy.Defaults");

    let err = message.try_set_field(&label, Value::from("x")).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"message 'legacy.Defaults' has no field 'pkg.ext.label'");
}

#[test]
fn known_fields() {
    let timestamp = Timestamp {
        seconds: 5,
        nanos: 1,
    };

    let mut message = new_message("test.WellKnown");
    message.set_known_field("timestamp", &timestamp);
    let stored = message.get_field_by_name("timestamp").unwrap();
    assert_eq!(
        stored.as_message().unwrap().get_field_by_name("seconds").as_deref(),
        Some(&Value::I64(5))
    );

    let err = message
        .try_set_known_field("timestamp", &Duration::default())
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expected a value of type 'google.protobuf.Timestamp' for field 'test.WellKnown.timestamp', but found 'google.protobuf.Duration'");

    // Concrete types are only known through a factory.
    let err = message.try_get_known_field("timestamp").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"no concrete type is registered for message 'google.protobuf.Timestamp'");

    let factory = MessageFactory::default();
    let mut bound = factory.new_dynamic_message(message.descriptor());
    assert!(bound.get_known_field("timestamp").is_none());
    bound.set_known_field("timestamp", &timestamp);
    let known = bound.get_known_field("timestamp").unwrap();
    assert_eq!(known.downcast_ref::<Timestamp>(), Some(&timestamp));
}

#[test]
fn known_list_and_map_values() {
    let first = Timestamp {
        seconds: 1,
        nanos: 0,
    };
    let second = Timestamp {
        seconds: 2,
        nanos: 3,
    };
    let timeout = Duration {
        seconds: 30,
        nanos: 0,
    };

    let mut message = new_message("test.WellKnown");
    message.add_known_repeated_field("history", &first);
    message.add_known_repeated_field("history", &first);
    message.set_known_repeated_field("history", 1, &second);
    assert_eq!(message.field_len("history"), 2);
    assert_eq!(
        message
            .get_repeated_field("history", 1)
            .as_message()
            .unwrap()
            .get_field_by_name("nanos")
            .as_deref(),
        Some(&Value::I32(3))
    );

    message.put_known_map_entry("timeouts", "connect", &timeout);
    let stored = message.get_map_entry("timeouts", "connect").unwrap();
    assert_eq!(
        stored.as_message().unwrap().get_field_by_name("seconds").as_deref(),
        Some(&Value::I64(30))
    );

    let err = message
        .try_add_known_repeated_field("history", &timeout)
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expected a value of type 'list of google.protobuf.Timestamp' for field 'test.WellKnown.history', but found 'google.protobuf.Duration'");
    let err = message
        .try_put_known_map_entry("timeouts", "read", &first)
        .unwrap_err();
    assert!(matches!(err, FieldAccessError::TypeMismatch { .. }));
    assert!(matches!(
        message.try_set_known_repeated_field("history", 5, &first),
        Err(FieldAccessError::IndexOutOfRange { index: 5, len: 2, .. })
    ));
    assert!(matches!(
        message.try_add_known_repeated_field("timestamp", &first),
        Err(FieldAccessError::NotRepeated { .. })
    ));
    assert!(matches!(
        message.try_put_known_map_entry("history", "x", &first),
        Err(FieldAccessError::NotMap { .. })
    ));
    assert!(matches!(
        message.try_add_known_repeated_field("timeouts", &timeout),
        Err(FieldAccessError::TypeMismatch { .. })
    ));
    assert_eq!(message.field_len("history"), 2);
    assert_eq!(message.field_len("timeouts"), 1);
}

#[test]
fn merge_from() {
    let mut target = new_message("test.Repeated");
    target.add_repeated_field("packed", Value::I32(1));
    let mut nested = new_message("test.Scalars");
    nested.set_field_by_name("int32_value", Value::I32(1));
    nested.set_field_by_name("string_value", Value::from("kept"));
    target.add_repeated_field("messages", Value::Message(nested));

    let mut source = new_message("test.Repeated");
    source.add_repeated_field("packed", Value::I32(2));

    target.merge_from(&source);
    assert_eq!(
        target.get_field_by_name("packed").as_deref(),
        Some(&Value::List(vec![Value::I32(1), Value::I32(2)]))
    );
    assert_eq!(target.field_len("messages"), 1);

    let mut tree = new_message("test.Tree");
    let mut child = new_message("test.Tree");
    child.set_field_by_name("value", Value::I32(1));
    tree.set_field_by_name("child", Value::Message(child));

    let mut update = DynamicMessage::new(tree.descriptor());
    let mut other_child = DynamicMessage::new(tree.descriptor());
    other_child.set_field_by_name("child", Value::Message(DynamicMessage::new(tree.descriptor())));
    update.set_field_by_name("child", Value::Message(other_child));
    update.set_field_by_name("value", Value::I32(9));

    tree.merge_from(&update);
    let child = tree.get_field_by_name("child").unwrap();
    let child = child.as_message().unwrap();
    assert_eq!(child.get_field_by_name("value").as_deref(), Some(&Value::I32(1)));
    assert!(child.has_field_by_name("child"));
    assert_eq!(tree.get_field_by_name("value").as_deref(), Some(&Value::I32(9)));

    let other = new_message("test.Scalars");
    assert!(matches!(
        tree.try_merge_from(&other),
        Err(FieldAccessError::TypeMismatch { .. })
    ));
}

#[test]
fn transcode_well_known_type() {
    let files = test_file_set();
    let desc = files.get_message_by_name("google.protobuf.Timestamp").unwrap();
    let timestamp = Timestamp {
        seconds: 10,
        nanos: 20,
    };

    let mut message = DynamicMessage::new(desc);
    message.transcode_from(&timestamp).unwrap();
    assert_eq!(message.get_field_by_name("seconds").as_deref(), Some(&Value::I64(10)));
    assert_eq!(message.get_field_by_name("nanos").as_deref(), Some(&Value::I32(20)));

    assert_eq!(message.transcode_to::<Timestamp>().unwrap(), timestamp);
    assert!(message.eq_known(&timestamp));
    assert!(!message.eq_known(&Timestamp::default()));
    assert!(!message.eq_known(&Duration {
        seconds: 10,
        nanos: 20
    }));
}

#[test]
fn debug_output() {
    let mut message = new_message("test.Tree");
    message.set_field_by_name("value", Value::I32(3));

    insta::assert_snapshot!(format!("{:?}", message), @r###"DynamicMessage { desc: "test.Tree", fields: {"value": I32(3)} }"###);
}

#[test]
fn fields_iterate_in_number_order() {
    let mut message = new_message("test.Scalars");
    message.set_field_by_name("string_value", Value::from("s"));
    message.set_field_by_name("int32_value", Value::I32(0));
    message.set_field_by_name("double_value", Value::F64(1.0));

    let names: Vec<_> = message
        .fields()
        .map(|(field, _)| field.name().to_owned())
        .collect();
    assert_eq!(names, ["double_value", "string_value"]);

    message.clear();
    assert!(message.is_empty());
}
