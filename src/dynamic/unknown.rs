use std::{collections::BTreeMap, fmt, ops::Range};

use prost::{
    bytes::{BufMut, Bytes},
    encoding::WireType,
};

/// A field of an encoded message which was not recognized while decoding it.
///
/// The complete record is kept, including its tag, so that it is written out again byte for
/// byte when the message is re-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct UnknownField {
    number: u32,
    wire_type: WireType,
    record: Bytes,
    payload: Range<usize>,
}

/// The unknown fields of a message, in the order they were read.
///
/// Equality compares the records of each field number in order, and ignores how records of
/// different numbers are interleaved.
#[derive(Debug, Default, Clone)]
pub(crate) struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownField {
    pub(crate) fn new(
        number: u32,
        wire_type: WireType,
        record: Bytes,
        payload: Range<usize>,
    ) -> Self {
        debug_assert!(payload.end <= record.len());
        UnknownField {
            number,
            wire_type,
            record,
            payload,
        }
    }

    /// Gets the field number of this field.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Gets the wire type this field was encoded with.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Gets the complete encoded record, including the tag and, for groups, the end group tag.
    pub fn encoded_bytes(&self) -> &Bytes {
        &self.record
    }

    /// Gets the encoded value of this field.
    ///
    /// This excludes the tag and any length prefix. For groups it is the encoded fields between
    /// the start and end group tags.
    pub fn payload(&self) -> &[u8] {
        &self.record[self.payload.clone()]
    }

    /// If this field has the varint wire type, gets its value.
    pub fn as_varint(&self) -> Option<u64> {
        if self.wire_type != WireType::Varint {
            return None;
        }
        let value = self
            .payload()
            .iter()
            .enumerate()
            .fold(0u64, |value, (i, &byte)| {
                value | (u64::from(byte & 0x7f) << (7 * i))
            });
        Some(value)
    }
}

impl fmt::Debug for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnknownField")
            .field("number", &self.number)
            .field("wire_type", &self.wire_type)
            .field("payload", &self.payload())
            .finish()
    }
}

impl UnknownFieldSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push(&mut self, field: UnknownField) {
        tracing::trace!(
            number = field.number,
            wire_type = ?field.wire_type,
            "storing unknown field"
        );
        self.fields.push(field);
    }

    pub(crate) fn extend(&mut self, other: &UnknownFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &UnknownField> + '_ {
        self.fields.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.iter().map(|field| field.record.len()).sum()
    }

    pub(crate) fn encode_raw<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        for field in self.iter() {
            buf.put_slice(&field.record);
        }
    }

    fn by_number(&self) -> BTreeMap<u32, Vec<&UnknownField>> {
        let mut fields: BTreeMap<u32, Vec<&UnknownField>> = BTreeMap::new();
        for field in self.iter() {
            fields.entry(field.number).or_default().push(field);
        }
        fields
    }
}

impl PartialEq for UnknownFieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.by_number() == other.by_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(number: u32, value: u8) -> UnknownField {
        let record = Bytes::from(vec![(number << 3) as u8, value]);
        UnknownField::new(number, WireType::Varint, record, 1..2)
    }

    #[test]
    fn arrival_order_is_kept() {
        let mut set = UnknownFieldSet::default();
        set.push(varint(10, 1));
        set.push(varint(5, 2));
        set.push(varint(10, 3));

        let mut buf = Vec::new();
        set.encode_raw(&mut buf);
        assert_eq!(buf, [0x50, 0x01, 0x28, 0x02, 0x50, 0x03]);
        assert_eq!(set.encoded_len(), 6);
    }

    #[test]
    fn equality_groups_by_number() {
        let mut interleaved = UnknownFieldSet::default();
        interleaved.push(varint(10, 1));
        interleaved.push(varint(5, 2));

        let mut sorted = UnknownFieldSet::default();
        sorted.push(varint(5, 2));
        sorted.push(varint(10, 1));
        assert_eq!(interleaved, sorted);

        let mut reordered = UnknownFieldSet::default();
        reordered.push(varint(10, 1));
        reordered.push(varint(10, 3));
        let mut same_number = UnknownFieldSet::default();
        same_number.push(varint(10, 3));
        same_number.push(varint(10, 1));
        assert_ne!(reordered, same_number);
    }
}
