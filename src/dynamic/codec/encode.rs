use prost::{
    bytes::{Buf, BufMut},
    encoding::{self, DecodeContext, WireType},
    Message,
};

use crate::{
    descriptor::{MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER},
    DynamicMessage, EncodeOptions, FieldDescriptor, Kind, MapKey, Value,
};

const DEFAULT_OPTIONS: EncodeOptions = EncodeOptions::new();

/// A message borrowed along with the options it is written with, so that nested messages and
/// groups are framed by [`prost::encoding::message`] and [`prost::encoding::group`].
#[derive(Debug)]
struct MessageWriter<'a> {
    message: &'a DynamicMessage,
    options: &'a EncodeOptions,
}

impl Message for MessageWriter<'_> {
    fn encode_raw(&self, buf: &mut impl BufMut)
    where
        Self: Sized,
    {
        encode_message(self.message, buf, self.options)
    }

    fn merge_field(
        &mut self,
        _: u32,
        _: WireType,
        _: &mut impl Buf,
        _: DecodeContext,
    ) -> Result<(), prost::DecodeError>
    where
        Self: Sized,
    {
        unreachable!("MessageWriter is only used for encoding")
    }

    fn encoded_len(&self) -> usize {
        message_len(self.message)
    }

    fn clear(&mut self) {
        unreachable!("MessageWriter is only used for encoding")
    }
}

pub(super) fn message_len(message: &DynamicMessage) -> usize {
    let fields: usize = message
        .fields
        .iter()
        .filter(|entry| entry.is_populated())
        .map(|entry| field_len(&entry.desc, &entry.value))
        .sum();
    fields + message.unknown.encoded_len()
}

pub(super) fn encode_message<B>(message: &DynamicMessage, buf: &mut B, options: &EncodeOptions)
where
    B: BufMut,
{
    for entry in message.fields.iter().filter(|entry| entry.is_populated()) {
        encode_field(&entry.desc, &entry.value, buf, options);
    }
    message.unknown.encode_raw(buf);
}

fn field_len(desc: &FieldDescriptor, value: &Value) -> usize {
    let number = desc.number();
    let kind = desc.kind();
    match value {
        Value::List(values) if desc.is_packed() => packed_len(number, &kind, values),
        Value::List(values) => values
            .iter()
            .map(|value| value_len(number, &kind, desc.is_group(), value))
            .sum(),
        Value::Map(values) => {
            let (key_kind, value_kind) = map_entry_kinds(&kind);
            values
                .iter()
                .map(|(key, value)| {
                    let len = map_entry_len(&key_kind, &value_kind, key, value);
                    encoding::key_len(number) + encoding::encoded_len_varint(len as u64) + len
                })
                .sum()
        }
        value => value_len(number, &kind, desc.is_group(), value),
    }
}

fn encode_field<B>(desc: &FieldDescriptor, value: &Value, buf: &mut B, options: &EncodeOptions)
where
    B: BufMut,
{
    let number = desc.number();
    let kind = desc.kind();
    match value {
        Value::List(values) if desc.is_packed() => encode_packed(number, &kind, values, buf),
        Value::List(values) => {
            for value in values {
                encode_value(number, &kind, desc.is_group(), value, buf, options);
            }
        }
        Value::Map(values) => {
            let (key_kind, value_kind) = map_entry_kinds(&kind);
            let mut encode_entry = |key: &MapKey, value: &Value| {
                encoding::encode_key(number, WireType::LengthDelimited, buf);
                encoding::encode_varint(
                    map_entry_len(&key_kind, &value_kind, key, value) as u64,
                    buf,
                );
                if !key.is_default(&key_kind) {
                    encode_map_key(MAP_ENTRY_KEY_NUMBER, &key_kind, key, buf);
                }
                if !is_default_value(&value_kind, value) {
                    encode_value(MAP_ENTRY_VALUE_NUMBER, &value_kind, false, value, buf, options);
                }
            };

            if options.deterministic {
                let mut entries: Vec<_> = values.iter().collect();
                entries.sort_unstable_by(|(l, _), (r, _)| l.cmp(r));
                for (key, value) in entries {
                    encode_entry(key, value);
                }
            } else {
                for (key, value) in values {
                    encode_entry(key, value);
                }
            }
        }
        value => encode_value(number, &kind, desc.is_group(), value, buf, options),
    }
}

fn value_len(number: u32, kind: &Kind, is_group: bool, value: &Value) -> usize {
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => encoding::bool::encoded_len(number, value),
        (Value::I32(value), Kind::Int32) => encoding::int32::encoded_len(number, value),
        (Value::I32(value), Kind::Sint32) => encoding::sint32::encoded_len(number, value),
        (Value::I32(value), Kind::Sfixed32) => encoding::sfixed32::encoded_len(number, value),
        (Value::I64(value), Kind::Int64) => encoding::int64::encoded_len(number, value),
        (Value::I64(value), Kind::Sint64) => encoding::sint64::encoded_len(number, value),
        (Value::I64(value), Kind::Sfixed64) => encoding::sfixed64::encoded_len(number, value),
        (Value::U32(value), Kind::Uint32) => encoding::uint32::encoded_len(number, value),
        (Value::U32(value), Kind::Fixed32) => encoding::fixed32::encoded_len(number, value),
        (Value::U64(value), Kind::Uint64) => encoding::uint64::encoded_len(number, value),
        (Value::U64(value), Kind::Fixed64) => encoding::fixed64::encoded_len(number, value),
        (Value::F32(value), Kind::Float) => encoding::float::encoded_len(number, value),
        (Value::F64(value), Kind::Double) => encoding::double::encoded_len(number, value),
        (Value::String(value), Kind::String) => encoding::string::encoded_len(number, value),
        (Value::Bytes(value), Kind::Bytes) => encoding::bytes::encoded_len(number, value),
        (Value::EnumNumber(value), Kind::Enum(_)) => encoding::int32::encoded_len(number, value),
        (Value::Message(message), Kind::Message(_)) => {
            let message = MessageWriter {
                message,
                options: &DEFAULT_OPTIONS,
            };
            if is_group {
                encoding::group::encoded_len(number, &message)
            } else {
                encoding::message::encoded_len(number, &message)
            }
        }
        (value, kind) => panic!(
            "mismatch between DynamicMessage value {:?} and type {:?}",
            value, kind
        ),
    }
}

fn encode_value<B>(
    number: u32,
    kind: &Kind,
    is_group: bool,
    value: &Value,
    buf: &mut B,
    options: &EncodeOptions,
) where
    B: BufMut,
{
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => encoding::bool::encode(number, value, buf),
        (Value::I32(value), Kind::Int32) => encoding::int32::encode(number, value, buf),
        (Value::I32(value), Kind::Sint32) => encoding::sint32::encode(number, value, buf),
        (Value::I32(value), Kind::Sfixed32) => encoding::sfixed32::encode(number, value, buf),
        (Value::I64(value), Kind::Int64) => encoding::int64::encode(number, value, buf),
        (Value::I64(value), Kind::Sint64) => encoding::sint64::encode(number, value, buf),
        (Value::I64(value), Kind::Sfixed64) => encoding::sfixed64::encode(number, value, buf),
        (Value::U32(value), Kind::Uint32) => encoding::uint32::encode(number, value, buf),
        (Value::U32(value), Kind::Fixed32) => encoding::fixed32::encode(number, value, buf),
        (Value::U64(value), Kind::Uint64) => encoding::uint64::encode(number, value, buf),
        (Value::U64(value), Kind::Fixed64) => encoding::fixed64::encode(number, value, buf),
        (Value::F32(value), Kind::Float) => encoding::float::encode(number, value, buf),
        (Value::F64(value), Kind::Double) => encoding::double::encode(number, value, buf),
        (Value::String(value), Kind::String) => encoding::string::encode(number, value, buf),
        (Value::Bytes(value), Kind::Bytes) => encoding::bytes::encode(number, value, buf),
        (Value::EnumNumber(value), Kind::Enum(_)) => encoding::int32::encode(number, value, buf),
        (Value::Message(message), Kind::Message(_)) => {
            let message = MessageWriter { message, options };
            if is_group {
                encoding::group::encode(number, &message, buf)
            } else {
                encoding::message::encode(number, &message, buf)
            }
        }
        (value, kind) => panic!(
            "mismatch between DynamicMessage value {:?} and type {:?}",
            value, kind
        ),
    }
}

/// Collects the elements of a list field into the native slice taken by the packed functions of
/// `prost::encoding`.
macro_rules! packed {
    ($module:ident :: $func:ident ($number:expr, $values:expr, $as:ident $(, $buf:expr)?)) => {
        encoding::$module::$func(
            $number,
            &$values
                .iter()
                .map(|value| value.$as().expect("list element does not match its field type"))
                .collect::<Vec<_>>(),
            $($buf)?
        )
    };
}

fn packed_len(number: u32, kind: &Kind, values: &[Value]) -> usize {
    match kind {
        Kind::Bool => packed!(bool::encoded_len_packed(number, values, as_bool)),
        Kind::Int32 => packed!(int32::encoded_len_packed(number, values, as_i32)),
        Kind::Sint32 => packed!(sint32::encoded_len_packed(number, values, as_i32)),
        Kind::Sfixed32 => packed!(sfixed32::encoded_len_packed(number, values, as_i32)),
        Kind::Int64 => packed!(int64::encoded_len_packed(number, values, as_i64)),
        Kind::Sint64 => packed!(sint64::encoded_len_packed(number, values, as_i64)),
        Kind::Sfixed64 => packed!(sfixed64::encoded_len_packed(number, values, as_i64)),
        Kind::Uint32 => packed!(uint32::encoded_len_packed(number, values, as_u32)),
        Kind::Fixed32 => packed!(fixed32::encoded_len_packed(number, values, as_u32)),
        Kind::Uint64 => packed!(uint64::encoded_len_packed(number, values, as_u64)),
        Kind::Fixed64 => packed!(fixed64::encoded_len_packed(number, values, as_u64)),
        Kind::Float => packed!(float::encoded_len_packed(number, values, as_f32)),
        Kind::Double => packed!(double::encoded_len_packed(number, values, as_f64)),
        Kind::Enum(_) => packed!(int32::encoded_len_packed(number, values, as_enum_number)),
        kind => panic!("invalid type {:?} for packed field", kind),
    }
}

fn encode_packed<B>(number: u32, kind: &Kind, values: &[Value], buf: &mut B)
where
    B: BufMut,
{
    match kind {
        Kind::Bool => packed!(bool::encode_packed(number, values, as_bool, buf)),
        Kind::Int32 => packed!(int32::encode_packed(number, values, as_i32, buf)),
        Kind::Sint32 => packed!(sint32::encode_packed(number, values, as_i32, buf)),
        Kind::Sfixed32 => packed!(sfixed32::encode_packed(number, values, as_i32, buf)),
        Kind::Int64 => packed!(int64::encode_packed(number, values, as_i64, buf)),
        Kind::Sint64 => packed!(sint64::encode_packed(number, values, as_i64, buf)),
        Kind::Sfixed64 => packed!(sfixed64::encode_packed(number, values, as_i64, buf)),
        Kind::Uint32 => packed!(uint32::encode_packed(number, values, as_u32, buf)),
        Kind::Fixed32 => packed!(fixed32::encode_packed(number, values, as_u32, buf)),
        Kind::Uint64 => packed!(uint64::encode_packed(number, values, as_u64, buf)),
        Kind::Fixed64 => packed!(fixed64::encode_packed(number, values, as_u64, buf)),
        Kind::Float => packed!(float::encode_packed(number, values, as_f32, buf)),
        Kind::Double => packed!(double::encode_packed(number, values, as_f64, buf)),
        Kind::Enum(_) => packed!(int32::encode_packed(number, values, as_enum_number, buf)),
        kind => panic!("invalid type {:?} for packed field", kind),
    }
}

/// Map entries omit a key or value which is equal to its default.
fn map_entry_len(key_kind: &Kind, value_kind: &Kind, key: &MapKey, value: &Value) -> usize {
    let key_len = if key.is_default(key_kind) {
        0
    } else {
        map_key_len(MAP_ENTRY_KEY_NUMBER, key_kind, key)
    };
    let value_len = if is_default_value(value_kind, value) {
        0
    } else {
        value_len(MAP_ENTRY_VALUE_NUMBER, value_kind, false, value)
    };
    key_len + value_len
}

fn map_entry_kinds(kind: &Kind) -> (Kind, Kind) {
    match kind {
        Kind::Message(entry) => (
            entry.map_entry_key_field().kind(),
            entry.map_entry_value_field().kind(),
        ),
        kind => panic!("invalid type {:?} for map field", kind),
    }
}

fn is_default_value(kind: &Kind, value: &Value) -> bool {
    match value {
        Value::Message(message) => message.is_empty(),
        value => value.is_default(kind),
    }
}

fn map_key_len(number: u32, kind: &Kind, key: &MapKey) -> usize {
    match (key, kind) {
        (MapKey::Bool(key), Kind::Bool) => encoding::bool::encoded_len(number, key),
        (MapKey::I32(key), Kind::Int32) => encoding::int32::encoded_len(number, key),
        (MapKey::I32(key), Kind::Sint32) => encoding::sint32::encoded_len(number, key),
        (MapKey::I32(key), Kind::Sfixed32) => encoding::sfixed32::encoded_len(number, key),
        (MapKey::I64(key), Kind::Int64) => encoding::int64::encoded_len(number, key),
        (MapKey::I64(key), Kind::Sint64) => encoding::sint64::encoded_len(number, key),
        (MapKey::I64(key), Kind::Sfixed64) => encoding::sfixed64::encoded_len(number, key),
        (MapKey::U32(key), Kind::Uint32) => encoding::uint32::encoded_len(number, key),
        (MapKey::U32(key), Kind::Fixed32) => encoding::fixed32::encoded_len(number, key),
        (MapKey::U64(key), Kind::Uint64) => encoding::uint64::encoded_len(number, key),
        (MapKey::U64(key), Kind::Fixed64) => encoding::fixed64::encoded_len(number, key),
        (MapKey::String(key), Kind::String) => encoding::string::encoded_len(number, key),
        (key, kind) => panic!(
            "mismatch between DynamicMessage map key {:?} and type {:?}",
            key, kind
        ),
    }
}

fn encode_map_key<B>(number: u32, kind: &Kind, key: &MapKey, buf: &mut B)
where
    B: BufMut,
{
    match (key, kind) {
        (MapKey::Bool(key), Kind::Bool) => encoding::bool::encode(number, key, buf),
        (MapKey::I32(key), Kind::Int32) => encoding::int32::encode(number, key, buf),
        (MapKey::I32(key), Kind::Sint32) => encoding::sint32::encode(number, key, buf),
        (MapKey::I32(key), Kind::Sfixed32) => encoding::sfixed32::encode(number, key, buf),
        (MapKey::I64(key), Kind::Int64) => encoding::int64::encode(number, key, buf),
        (MapKey::I64(key), Kind::Sint64) => encoding::sint64::encode(number, key, buf),
        (MapKey::I64(key), Kind::Sfixed64) => encoding::sfixed64::encode(number, key, buf),
        (MapKey::U32(key), Kind::Uint32) => encoding::uint32::encode(number, key, buf),
        (MapKey::U32(key), Kind::Fixed32) => encoding::fixed32::encode(number, key, buf),
        (MapKey::U64(key), Kind::Uint64) => encoding::uint64::encode(number, key, buf),
        (MapKey::U64(key), Kind::Fixed64) => encoding::fixed64::encode(number, key, buf),
        (MapKey::String(key), Kind::String) => encoding::string::encode(number, key, buf),
        (key, kind) => panic!(
            "mismatch between DynamicMessage map key {:?} and type {:?}",
            key, kind
        ),
    }
}
