//! Conversion of caller-supplied values into the representation stored for a field.
//!
//! Values are accepted unchanged when their variant matches the field type. The only other
//! conversions are widening ones: a narrower integer becomes a wider integer of the same
//! signedness, and `f32` becomes `f64`.

use std::collections::HashMap;

use crate::{
    DynamicMessage, FieldAccessError, FieldDescriptor, Kind, MapKey, MessageDescriptor, Value,
};

/// Converts `value` into a value of type `kind`, or gives it back unchanged if that is not
/// possible.
pub(super) fn coerce_value(value: Value, kind: &Kind) -> Result<Value, Value> {
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => Ok(Value::Bool(value)),
        (Value::I32(value), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => Ok(Value::I32(value)),
        (Value::I32(value), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => {
            Ok(Value::I64(value.into()))
        }
        (Value::I64(value), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => Ok(Value::I64(value)),
        (Value::U32(value), Kind::Uint32 | Kind::Fixed32) => Ok(Value::U32(value)),
        (Value::U32(value), Kind::Uint64 | Kind::Fixed64) => Ok(Value::U64(value.into())),
        (Value::U64(value), Kind::Uint64 | Kind::Fixed64) => Ok(Value::U64(value)),
        (Value::F32(value), Kind::Float) => Ok(Value::F32(value)),
        (Value::F32(value), Kind::Double) => Ok(Value::F64(value.into())),
        (Value::F64(value), Kind::Double) => Ok(Value::F64(value)),
        (Value::String(value), Kind::String) => Ok(Value::String(value)),
        (Value::Bytes(value), Kind::Bytes) => Ok(Value::Bytes(value)),
        (Value::EnumNumber(value), Kind::Enum(_)) => Ok(Value::EnumNumber(value)),
        (Value::Message(message), Kind::Message(desc)) => coerce_message(message, desc)
            .map(Value::Message)
            .map_err(Value::Message),
        (value, _) => Err(value),
    }
}

/// Converts `key` into a map key of type `kind`, or gives it back unchanged if that is not
/// possible.
pub(super) fn coerce_map_key(key: MapKey, kind: &Kind) -> Result<MapKey, MapKey> {
    match (key, kind) {
        (MapKey::Bool(key), Kind::Bool) => Ok(MapKey::Bool(key)),
        (MapKey::I32(key), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => Ok(MapKey::I32(key)),
        (MapKey::I32(key), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => {
            Ok(MapKey::I64(key.into()))
        }
        (MapKey::I64(key), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => Ok(MapKey::I64(key)),
        (MapKey::U32(key), Kind::Uint32 | Kind::Fixed32) => Ok(MapKey::U32(key)),
        (MapKey::U32(key), Kind::Uint64 | Kind::Fixed64) => Ok(MapKey::U64(key.into())),
        (MapKey::U64(key), Kind::Uint64 | Kind::Fixed64) => Ok(MapKey::U64(key)),
        (MapKey::String(key), Kind::String) => Ok(MapKey::String(key)),
        (key, _) => Err(key),
    }
}

/// A message is accepted for a field of message type `desc` if it has that exact descriptor.
///
/// A message of a type with the same name from a separately built descriptor is re-bound to
/// `desc` by round-tripping it through the binary format.
fn coerce_message(
    message: DynamicMessage,
    desc: &MessageDescriptor,
) -> Result<DynamicMessage, DynamicMessage> {
    if message.desc == *desc {
        return Ok(message);
    }
    if message.desc.full_name() != desc.full_name() {
        return Err(message);
    }

    let mut rebound = DynamicMessage::new(desc.clone());
    rebound.factory = message.factory.clone();
    match rebound.merge(&message.encode_to_vec()) {
        Ok(()) => Ok(rebound),
        Err(_) => Err(message),
    }
}

/// Converts a value for storage in `field`, taking its cardinality into account.
pub(super) fn coerce_field_value(
    field: &FieldDescriptor,
    value: Value,
) -> Result<Value, FieldAccessError> {
    let kind = field.kind();
    if field.is_list() {
        match value {
            Value::List(values) => values
                .into_iter()
                .map(|value| coerce_value(value, &kind))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
                .map_err(|value| {
                    type_mismatch(
                        field,
                        format!("list containing {}", value.type_name()),
                    )
                }),
            value => Err(type_mismatch(field, value.type_name())),
        }
    } else if field.is_map() {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| coerce_map_entry(field, key, value))
                .collect::<Result<HashMap<_, _>, _>>()
                .map(Value::Map),
            Value::List(entries) => entries
                .into_iter()
                .map(|entry| map_entry_from_message(field, entry))
                .collect::<Result<HashMap<_, _>, _>>()
                .map(Value::Map),
            value => Err(type_mismatch(field, value.type_name())),
        }
    } else {
        coerce_value(value, &kind).map_err(|value| type_mismatch(field, value.type_name()))
    }
}

/// Converts a single element for storage in the list field `field`.
pub(super) fn coerce_list_element(
    field: &FieldDescriptor,
    value: Value,
) -> Result<Value, FieldAccessError> {
    coerce_value(value, &field.kind()).map_err(|value| type_mismatch(field, value.type_name()))
}

/// Converts a key and value for storage in the map field `field`.
pub(super) fn coerce_map_entry(
    field: &FieldDescriptor,
    key: MapKey,
    value: Value,
) -> Result<(MapKey, Value), FieldAccessError> {
    let entry = map_entry_type(field);
    let key = coerce_map_key(key, &entry.map_entry_key_field().kind()).map_err(|key| {
        type_mismatch(field, format!("map with {} keys", key.type_name()))
    })?;
    let value = coerce_value(value, &entry.map_entry_value_field().kind()).map_err(|value| {
        type_mismatch(field, format!("map with {} values", value.type_name()))
    })?;
    Ok((key, value))
}

/// Converts a key for lookup in the map field `field`.
pub(super) fn coerce_lookup_key(
    field: &FieldDescriptor,
    key: MapKey,
) -> Result<MapKey, FieldAccessError> {
    let entry = map_entry_type(field);
    coerce_map_key(key, &entry.map_entry_key_field().kind())
        .map_err(|key| type_mismatch(field, format!("map with {} keys", key.type_name())))
}

/// Splits a message of the synthetic entry type of the map field `field` into a key and value.
///
/// Unset key and value fields take their default values.
pub(super) fn map_entry_from_message(
    field: &FieldDescriptor,
    entry: Value,
) -> Result<(MapKey, Value), FieldAccessError> {
    let entry_desc = map_entry_type(field);
    let entry = match coerce_value(entry, &Kind::Message(entry_desc.clone())) {
        Ok(Value::Message(entry)) => entry,
        Ok(value) | Err(value) => return Err(type_mismatch(field, value.type_name())),
    };

    let key_field = entry_desc.map_entry_key_field();
    let value_field = entry_desc.map_entry_value_field();
    let key = entry
        .fields
        .get(key_field.number())
        .cloned()
        .unwrap_or_else(|| Value::default_value_for_field(&key_field))
        .into_map_key()
        .unwrap_or_else(|| MapKey::default_value(&key_field.kind()));
    let value = entry
        .fields
        .get(value_field.number())
        .cloned()
        .unwrap_or_else(|| Value::default_value_for_field(&value_field));
    Ok((key, value))
}

/// Builds a message of the synthetic entry type of the map field `field`.
pub(super) fn map_entry_to_message(
    field: &FieldDescriptor,
    key: &MapKey,
    value: &Value,
) -> DynamicMessage {
    let entry_desc = map_entry_type(field);
    let mut entry = DynamicMessage::new(entry_desc.clone());
    entry
        .fields
        .set(entry_desc.map_entry_key_field(), Value::from(key.clone()));
    entry
        .fields
        .set(entry_desc.map_entry_value_field(), value.clone());
    entry
}

fn map_entry_type(field: &FieldDescriptor) -> MessageDescriptor {
    match field.kind() {
        Kind::Message(entry) if entry.is_map_entry() => entry,
        kind => panic!("field '{}' of type {:?} is not a map", field.full_name(), kind),
    }
}

pub(super) fn type_mismatch(field: &FieldDescriptor, actual: impl Into<String>) -> FieldAccessError {
    FieldAccessError::TypeMismatch {
        field: field.full_name().to_owned(),
        expected: expected_type(field),
        actual: actual.into(),
    }
}

fn expected_type(field: &FieldDescriptor) -> String {
    if field.is_map() {
        let entry = map_entry_type(field);
        format!(
            "map<{:?}, {:?}>",
            entry.map_entry_key_field().kind(),
            entry.map_entry_value_field().kind()
        )
    } else if field.is_list() {
        format!("list of {:?}", field.kind())
    } else {
        format!("{:?}", field.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn accepts(value: Value, kind: Kind, expected: Value) {
        assert_eq!(coerce_value(value, &kind), Ok(expected));
    }

    #[track_caller]
    fn rejects(value: Value, kind: Kind) {
        assert_eq!(coerce_value(value.clone(), &kind), Err(value));
    }

    #[test]
    fn exact_matches() {
        accepts(Value::Bool(true), Kind::Bool, Value::Bool(true));
        accepts(Value::I32(-3), Kind::Sint32, Value::I32(-3));
        accepts(Value::I64(-3), Kind::Sfixed64, Value::I64(-3));
        accepts(Value::U32(3), Kind::Fixed32, Value::U32(3));
        accepts(Value::U64(3), Kind::Uint64, Value::U64(3));
        accepts(Value::F32(0.5), Kind::Float, Value::F32(0.5));
        accepts(Value::F64(0.5), Kind::Double, Value::F64(0.5));
        accepts(Value::from("a"), Kind::String, Value::from("a"));
        accepts(Value::from(b"a".to_vec()), Kind::Bytes, Value::from(b"a".to_vec()));
    }

    #[test]
    fn widening() {
        accepts(Value::I32(-7), Kind::Int64, Value::I64(-7));
        accepts(Value::I32(i32::MIN), Kind::Sint64, Value::I64(i32::MIN.into()));
        accepts(Value::U32(u32::MAX), Kind::Fixed64, Value::U64(u32::MAX.into()));
        accepts(Value::F32(1.25), Kind::Double, Value::F64(1.25));
        accepts(Value::from(7u8), Kind::Uint32, Value::U32(7));
        accepts(Value::from(-7i16), Kind::Int32, Value::I32(-7));
    }

    #[test]
    fn narrowing_and_sign_changes() {
        rejects(Value::I64(1), Kind::Int32);
        rejects(Value::U64(1), Kind::Uint32);
        rejects(Value::F64(1.0), Kind::Float);
        rejects(Value::I32(1), Kind::Uint32);
        rejects(Value::U32(1), Kind::Int64);
        rejects(Value::I32(1), Kind::Float);
        rejects(Value::Bool(false), Kind::Int32);
        rejects(Value::from("1"), Kind::Bytes);
        rejects(Value::from(b"1".to_vec()), Kind::String);
    }

    #[test]
    fn enums_require_numbers() {
        let files = crate::test_file_set();
        let color = files.get_enum_by_name("test.Color").unwrap();

        accepts(
            Value::EnumNumber(2),
            Kind::Enum(color.clone()),
            Value::EnumNumber(2),
        );
        rejects(Value::I32(2), Kind::Enum(color));
    }

    #[test]
    fn messages_require_matching_type() {
        let files = crate::test_file_set();
        let scalars = files.get_message_by_name("test.Scalars").unwrap();
        let tree = files.get_message_by_name("test.Tree").unwrap();

        let message = DynamicMessage::new(scalars.clone());
        accepts(
            Value::Message(message.clone()),
            Kind::Message(scalars),
            Value::Message(message),
        );
        rejects(
            Value::Message(DynamicMessage::new(tree.clone())),
            Kind::Message(files.get_message_by_name("test.Scalars").unwrap()),
        );
        rejects(Value::I32(0), Kind::Message(tree));
    }

    #[test]
    fn messages_from_separate_build_are_rebound() {
        let first = crate::test_file_set();
        let second = crate::build_test_file_set();
        let first_tree = first.get_message_by_name("test.Tree").unwrap();
        let second_tree = second.get_message_by_name("test.Tree").unwrap();
        assert_ne!(first_tree, second_tree);

        let mut message = DynamicMessage::new(second_tree);
        message.set_field_by_name("value", Value::I32(5));

        let rebound = match coerce_value(Value::Message(message), &Kind::Message(first_tree.clone())) {
            Ok(Value::Message(rebound)) => rebound,
            other => panic!("unexpected result {:?}", other),
        };
        assert_eq!(rebound.descriptor(), first_tree);
        assert_eq!(
            rebound.get_field_by_name("value").as_deref(),
            Some(&Value::I32(5))
        );
    }

    #[test]
    fn map_keys() {
        assert_eq!(coerce_map_key(MapKey::I32(-1), &Kind::Sint64), Ok(MapKey::I64(-1)));
        assert_eq!(coerce_map_key(MapKey::U32(1), &Kind::Uint64), Ok(MapKey::U64(1)));
        assert_eq!(
            coerce_map_key(MapKey::from("k"), &Kind::String),
            Ok(MapKey::from("k"))
        );
        assert_eq!(coerce_map_key(MapKey::I64(1), &Kind::Int32), Err(MapKey::I64(1)));
        assert_eq!(coerce_map_key(MapKey::Bool(true), &Kind::String), Err(MapKey::Bool(true)));
    }

    #[test]
    fn field_level_errors() {
        let files = crate::test_file_set();
        let repeated = files.get_message_by_name("test.Repeated").unwrap();
        let maps = files.get_message_by_name("test.Maps").unwrap();

        let packed = repeated.get_field_by_name("packed").unwrap();
        assert_eq!(
            coerce_field_value(&packed, Value::List(vec![Value::I32(1), Value::I64(2)])),
            Err(FieldAccessError::TypeMismatch {
                field: "test.Repeated.packed".to_owned(),
                expected: "list of int32".to_owned(),
                actual: "list containing i64".to_owned(),
            })
        );
        assert_eq!(
            coerce_field_value(&packed, Value::I32(1)),
            Err(FieldAccessError::TypeMismatch {
                field: "test.Repeated.packed".to_owned(),
                expected: "list of int32".to_owned(),
                actual: "i32".to_owned(),
            })
        );

        let string_int32 = maps.get_field_by_name("string_int32").unwrap();
        let err = coerce_map_entry(&string_int32, MapKey::I32(1), Value::I32(1)).unwrap_err();
        assert_eq!(
            err,
            FieldAccessError::TypeMismatch {
                field: "test.Maps.string_int32".to_owned(),
                expected: "map<string, int32>".to_owned(),
                actual: "map with i32 keys".to_owned(),
            }
        );
    }
}
