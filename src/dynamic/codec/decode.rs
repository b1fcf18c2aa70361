use std::ops::Range;

use prost::{
    bytes::{Buf, Bytes},
    encoding::{self, WireType},
};

use crate::{
    dynamic::unknown::UnknownField, DecodeError, DynamicMessage, ExtensionRegistry,
    FieldDescriptor, Kind, MapKey, Value,
};

/// State threaded through the decoding of nested messages.
#[derive(Clone, Copy)]
pub(super) struct DecodeContext<'a> {
    depth_remaining: u32,
    extensions: Option<&'a ExtensionRegistry>,
}

impl<'a> DecodeContext<'a> {
    pub(super) fn new(recursion_limit: u32, extensions: Option<&'a ExtensionRegistry>) -> Self {
        DecodeContext {
            depth_remaining: recursion_limit,
            extensions,
        }
    }

    fn enter_nested(self) -> Result<Self, DecodeError> {
        match self.depth_remaining.checked_sub(1) {
            Some(depth_remaining) => Ok(DecodeContext {
                depth_remaining,
                ..self
            }),
            None => Err(DecodeError::RecursionLimitExceeded),
        }
    }
}

/// Reads fields from `buf` into `message` until the buffer is exhausted or, if `group` is set,
/// until the end group tag for that field number.
pub(super) fn merge_message(
    message: &mut DynamicMessage,
    buf: &mut &[u8],
    ctx: DecodeContext<'_>,
    group: Option<u32>,
) -> Result<(), DecodeError> {
    loop {
        if buf.is_empty() {
            return match group {
                Some(number) => Err(DecodeError::UnmatchedGroup { number }),
                None => Ok(()),
            };
        }

        let record_start: &[u8] = *buf;
        let (number, wire_type) = decode_key(buf)?;
        if wire_type == WireType::EndGroup {
            return match group {
                Some(expected) if expected == number => Ok(()),
                Some(expected) => Err(DecodeError::UnmatchedGroup { number: expected }),
                None => Err(DecodeError::UnexpectedEndGroup { number }),
            };
        }

        match find_field(message, number, ctx) {
            Some(field) if accepts_wire_type(&field, wire_type) => {
                merge_field(message, field, wire_type, buf, ctx)?
            }
            _ => {
                let key_len = record_start.len() - buf.len();
                let payload = skip_payload(number, wire_type, buf, ctx)?;
                let record_len = record_start.len() - buf.len();
                message.unknown.push(UnknownField::new(
                    number,
                    wire_type,
                    Bytes::copy_from_slice(&record_start[..record_len]),
                    (key_len + payload.start)..(key_len + payload.end),
                ));
            }
        }
    }
}

/// Merges a single field read by a prost decoder into `message`.
///
/// The record is copied out of `buf` and then read by the slice decoder, using the default
/// recursion limit and the extension registry of the message's factory.
pub(super) fn merge_buffered_field(
    message: &mut DynamicMessage,
    number: u32,
    wire_type: WireType,
    buf: &mut impl Buf,
) -> Result<(), prost::DecodeError> {
    let mut record = Vec::new();
    encoding::encode_key(number, wire_type, &mut record);
    copy_payload(number, wire_type, buf, &mut record, super::DEFAULT_RECURSION_LIMIT)?;

    let extensions = message.extension_registry().cloned();
    let ctx = DecodeContext::new(super::DEFAULT_RECURSION_LIMIT, extensions.as_ref());
    merge_message(message, &mut record.as_slice(), ctx, None)
        .map_err(|err| prost::DecodeError::new(err.to_string()))
}

fn copy_payload(
    number: u32,
    wire_type: WireType,
    buf: &mut impl Buf,
    out: &mut Vec<u8>,
    depth_remaining: u32,
) -> Result<(), prost::DecodeError> {
    match wire_type {
        WireType::Varint => encoding::encode_varint(encoding::decode_varint(buf)?, out),
        WireType::SixtyFourBit => copy_bytes(buf, 8, out)?,
        WireType::ThirtyTwoBit => copy_bytes(buf, 4, out)?,
        WireType::LengthDelimited => {
            let len = encoding::decode_varint(buf)?;
            encoding::encode_varint(len, out);
            copy_bytes(buf, len, out)?;
        }
        WireType::StartGroup => {
            let depth_remaining = depth_remaining
                .checked_sub(1)
                .ok_or_else(|| prost::DecodeError::new("recursion limit reached"))?;
            loop {
                let (inner_number, inner_wire_type) = encoding::decode_key(buf)?;
                encoding::encode_key(inner_number, inner_wire_type, out);
                if inner_wire_type == WireType::EndGroup {
                    if inner_number != number {
                        return Err(prost::DecodeError::new("unexpected end group tag"));
                    }
                    break;
                }
                copy_payload(inner_number, inner_wire_type, buf, out, depth_remaining)?;
            }
        }
        WireType::EndGroup => return Err(prost::DecodeError::new("unexpected end group tag")),
    }
    Ok(())
}

fn copy_bytes(buf: &mut impl Buf, len: u64, out: &mut Vec<u8>) -> Result<(), prost::DecodeError> {
    if len > buf.remaining() as u64 {
        return Err(prost::DecodeError::new("buffer underflow"));
    }
    out.extend_from_slice(&buf.copy_to_bytes(len as usize));
    Ok(())
}

fn find_field(
    message: &DynamicMessage,
    number: u32,
    ctx: DecodeContext<'_>,
) -> Option<FieldDescriptor> {
    if let Some(field) = message.desc.get_field(number) {
        return Some(field);
    }
    if !message.desc.is_extension_number(number) {
        return None;
    }
    if let Some(entry) = message.fields.get_entry(number) {
        return Some(entry.desc.clone());
    }
    ctx.extensions?.find(message.desc.full_name(), number)
}

fn accepts_wire_type(field: &FieldDescriptor, wire_type: WireType) -> bool {
    if field.is_list() && field.is_packable() {
        wire_type == field.kind().wire_type() || wire_type == WireType::LengthDelimited
    } else {
        wire_type == field.wire_type()
    }
}

fn merge_field(
    message: &mut DynamicMessage,
    field: FieldDescriptor,
    wire_type: WireType,
    buf: &mut &[u8],
    ctx: DecodeContext<'_>,
) -> Result<(), DecodeError> {
    let kind = field.kind();
    if field.is_map() {
        let entry_desc = match &kind {
            Kind::Message(entry_desc) => entry_desc.clone(),
            kind => panic!("invalid type {:?} for map field", kind),
        };
        let mut entry = DynamicMessage::new_with_factory(entry_desc, message.factory.clone());
        merge_nested(&mut entry, field.number(), wire_type, buf, ctx)?;
        let (key, value) = split_map_entry(entry);
        if let Value::Map(values) = message.fields.get_or_insert_default(&field) {
            values.insert(key, value);
        }
    } else if field.is_list() {
        let mut decoded = Vec::new();
        match &kind {
            Kind::Message(desc) => {
                let mut nested = DynamicMessage::new_with_factory(desc.clone(), message.factory.clone());
                merge_nested(&mut nested, field.number(), wire_type, buf, ctx)?;
                decoded.push(Value::Message(nested));
            }
            kind if wire_type == WireType::LengthDelimited => {
                let mut payload = take_length_delimited(buf)?;
                if let Some(width) = fixed_width(kind) {
                    if payload.len() % width != 0 {
                        return Err(DecodeError::InvalidLength {
                            len: payload.len() as u64,
                        });
                    }
                }
                while !payload.is_empty() {
                    decoded.push(decode_scalar(&field, kind, &mut payload)?);
                }
            }
            kind => decoded.push(decode_scalar(&field, kind, buf)?),
        }

        if let Value::List(values) = message.fields.get_or_insert_default(&field) {
            values.extend(decoded);
        }
    } else if kind.as_message().is_some() {
        let factory = message.factory.clone();
        if let Value::Message(nested) = message.fields.get_or_insert_default(&field) {
            if nested.factory.is_none() {
                nested.factory = factory;
            }
            merge_nested(nested, field.number(), wire_type, buf, ctx)?;
        }
    } else {
        let value = decode_scalar(&field, &kind, buf)?;
        message.fields.set(field, value);
    }
    Ok(())
}

fn merge_nested(
    message: &mut DynamicMessage,
    number: u32,
    wire_type: WireType,
    buf: &mut &[u8],
    ctx: DecodeContext<'_>,
) -> Result<(), DecodeError> {
    let ctx = ctx.enter_nested()?;
    if wire_type == WireType::StartGroup {
        merge_message(message, buf, ctx, Some(number))
    } else {
        let mut payload = take_length_delimited(buf)?;
        merge_message(message, &mut payload, ctx, None)
    }
}

fn split_map_entry(mut entry: DynamicMessage) -> (MapKey, Value) {
    let key_field = entry.desc.map_entry_key_field();
    let value_field = entry.desc.map_entry_value_field();

    let key = entry
        .fields
        .remove(key_field.number())
        .and_then(Value::into_map_key)
        .unwrap_or_else(|| MapKey::default_value(&key_field.kind()));
    let value = entry
        .fields
        .remove(value_field.number())
        .unwrap_or_else(|| Value::default_value_for_field(&value_field));
    (key, value)
}

fn decode_scalar(
    field: &FieldDescriptor,
    kind: &Kind,
    buf: &mut &[u8],
) -> Result<Value, DecodeError> {
    Ok(match kind {
        Kind::Double => Value::F64(f64::from_bits(decode_fixed64(buf)?)),
        Kind::Float => Value::F32(f32::from_bits(decode_fixed32(buf)?)),
        Kind::Int32 => Value::I32(decode_int32(field, buf)?),
        Kind::Int64 => Value::I64(decode_varint(buf)? as i64),
        Kind::Uint32 => Value::U32(decode_uint32(field, buf)?),
        Kind::Uint64 => Value::U64(decode_varint(buf)?),
        Kind::Sint32 => {
            let value = decode_uint32(field, buf)?;
            Value::I32(((value >> 1) as i32) ^ -((value & 1) as i32))
        }
        Kind::Sint64 => {
            let value = decode_varint(buf)?;
            Value::I64(((value >> 1) as i64) ^ -((value & 1) as i64))
        }
        Kind::Fixed32 => Value::U32(decode_fixed32(buf)?),
        Kind::Fixed64 => Value::U64(decode_fixed64(buf)?),
        Kind::Sfixed32 => Value::I32(decode_fixed32(buf)? as i32),
        Kind::Sfixed64 => Value::I64(decode_fixed64(buf)? as i64),
        Kind::Bool => Value::Bool(decode_varint(buf)? != 0),
        Kind::String => {
            let bytes = take_length_delimited(buf)?;
            match std::str::from_utf8(bytes) {
                Ok(value) => Value::String(value.to_owned()),
                Err(_) => {
                    return Err(DecodeError::InvalidUtf8 {
                        field: field.full_name().to_owned(),
                    })
                }
            }
        }
        Kind::Bytes => Value::Bytes(Bytes::copy_from_slice(take_length_delimited(buf)?)),
        Kind::Enum(_) => Value::EnumNumber(decode_int32(field, buf)?),
        Kind::Message(_) => unreachable!("message fields are not scalars"),
    })
}

fn fixed_width(kind: &Kind) -> Option<usize> {
    match kind {
        Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => Some(4),
        Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => Some(8),
        _ => None,
    }
}

/// Negative values are sign-extended to ten bytes on the wire. Anything which does not read back
/// as an `i32` after sign extension, such as a five byte two's complement, is an overflow.
fn decode_int32(field: &FieldDescriptor, buf: &mut &[u8]) -> Result<i32, DecodeError> {
    let value = decode_varint(buf)?;
    i32::try_from(value as i64).map_err(|_| DecodeError::NumericOverflow {
        field: field.full_name().to_owned(),
        value,
    })
}

fn decode_uint32(field: &FieldDescriptor, buf: &mut &[u8]) -> Result<u32, DecodeError> {
    let value = decode_varint(buf)?;
    u32::try_from(value).map_err(|_| DecodeError::NumericOverflow {
        field: field.full_name().to_owned(),
        value,
    })
}

/// Skips over the value of an unrecognized field, returning the range of its payload relative to
/// the end of its key.
fn skip_payload(
    number: u32,
    wire_type: WireType,
    buf: &mut &[u8],
    ctx: DecodeContext<'_>,
) -> Result<Range<usize>, DecodeError> {
    let start_len = buf.len();
    match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
            Ok(0..(start_len - buf.len()))
        }
        WireType::ThirtyTwoBit => {
            take(buf, 4)?;
            Ok(0..4)
        }
        WireType::SixtyFourBit => {
            take(buf, 8)?;
            Ok(0..8)
        }
        WireType::LengthDelimited => {
            let payload = take_length_delimited(buf)?;
            let prefix_len = start_len - buf.len() - payload.len();
            Ok(prefix_len..(prefix_len + payload.len()))
        }
        WireType::StartGroup => skip_group(number, buf, ctx.enter_nested()?),
        WireType::EndGroup => Err(DecodeError::UnexpectedEndGroup { number }),
    }
}

/// Skips to just after the end group tag for `number`. The returned range excludes that tag.
fn skip_group(
    number: u32,
    buf: &mut &[u8],
    ctx: DecodeContext<'_>,
) -> Result<Range<usize>, DecodeError> {
    let start_len = buf.len();
    loop {
        if buf.is_empty() {
            return Err(DecodeError::UnmatchedGroup { number });
        }

        let before_key = buf.len();
        let (inner_number, inner_wire_type) = decode_key(buf)?;
        if inner_wire_type == WireType::EndGroup {
            return if inner_number == number {
                Ok(0..(start_len - before_key))
            } else {
                Err(DecodeError::UnmatchedGroup { number })
            };
        }
        skip_payload(inner_number, inner_wire_type, buf, ctx)?;
    }
}

fn decode_key(buf: &mut &[u8]) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::InvalidTag { tag: key });
    }

    let wire_type = match key & 0x07 {
        0 => WireType::Varint,
        1 => WireType::SixtyFourBit,
        2 => WireType::LengthDelimited,
        3 => WireType::StartGroup,
        4 => WireType::EndGroup,
        5 => WireType::ThirtyTwoBit,
        value => return Err(DecodeError::InvalidWireType { value }),
    };
    let number = (key >> 3) as u32;
    if number == 0 {
        return Err(DecodeError::InvalidTag { tag: key });
    }
    Ok((number, wire_type))
}

fn decode_varint(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    let bytes: &[u8] = *buf;
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (i * 7);
        if byte < 0x80 {
            // The tenth byte may only contribute the top bit.
            if i == 9 && byte > 1 {
                return Err(DecodeError::MalformedVarint);
            }
            *buf = &bytes[i + 1..];
            return Ok(value);
        }
    }

    if bytes.len() >= 10 {
        Err(DecodeError::MalformedVarint)
    } else {
        Err(DecodeError::Truncated)
    }
}

fn decode_fixed32(buf: &mut &[u8]) -> Result<u32, DecodeError> {
    let bytes = take(buf, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn decode_fixed64(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    let bytes = take(buf, 8)?;
    let mut array = [0; 8];
    array.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(array))
}

fn take_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = decode_varint(buf)?;
    if len > i32::MAX as u64 {
        return Err(DecodeError::InvalidLength { len });
    }
    take(buf, len as usize)
}

fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    let bytes: &'a [u8] = *buf;
    if bytes.len() < len {
        return Err(DecodeError::Truncated);
    }
    let (head, tail) = bytes.split_at(len);
    *buf = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varints() {
        let mut buf: &[u8] = &[0x96, 0x01, 0xff];
        assert_eq!(decode_varint(&mut buf), Ok(150));
        assert_eq!(buf, &[0xff]);

        let mut buf: &[u8] = &[0xff, 0xff];
        assert_eq!(decode_varint(&mut buf), Err(DecodeError::Truncated));

        let mut buf: &[u8] = &[0xff; 11];
        assert_eq!(decode_varint(&mut buf), Err(DecodeError::MalformedVarint));

        let mut buf: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(decode_varint(&mut buf), Ok(u64::MAX));

        let mut buf: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        assert_eq!(decode_varint(&mut buf), Err(DecodeError::MalformedVarint));
    }

    #[test]
    fn keys() {
        let mut buf: &[u8] = &[0x08];
        assert_eq!(decode_key(&mut buf), Ok((1, WireType::Varint)));

        let mut buf: &[u8] = &[0x00];
        assert_eq!(decode_key(&mut buf), Err(DecodeError::InvalidTag { tag: 0 }));

        let mut buf: &[u8] = &[0x0e];
        assert_eq!(
            decode_key(&mut buf),
            Err(DecodeError::InvalidWireType { value: 6 })
        );

        let mut buf: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x10];
        assert_eq!(
            decode_key(&mut buf),
            Err(DecodeError::InvalidTag { tag: 1 << 32 })
        );
    }

    #[test]
    fn skip_nested_groups() {
        // group 1 { group 2 { field 3 = 1 } }, followed by another field
        let mut buf: &[u8] = &[0x0b, 0x13, 0x18, 0x01, 0x14, 0x0c, 0x20, 0x01];
        decode_key(&mut buf).unwrap();
        let range = skip_payload(1, WireType::StartGroup, &mut buf, DecodeContext::new(100, None))
            .unwrap();
        assert_eq!(range, 0..4);
        assert_eq!(buf, &[0x20, 0x01]);
    }

    #[test]
    fn skip_group_recursion_limit() {
        let mut buf: &[u8] = &[0x13, 0x14, 0x0c];
        assert_eq!(
            skip_payload(1, WireType::StartGroup, &mut buf, DecodeContext::new(1, None)),
            Err(DecodeError::RecursionLimitExceeded)
        );
    }

    #[test]
    fn take_truncated() {
        let mut buf: &[u8] = &[0x05, 0x01];
        assert_eq!(take_length_delimited(&mut buf), Err(DecodeError::Truncated));

        let mut buf: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0x0f];
        assert_eq!(
            take_length_delimited(&mut buf),
            Err(DecodeError::InvalidLength { len: u32::MAX as u64 })
        );
    }
}
