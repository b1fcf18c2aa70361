use thiserror::Error;

/// An error returned by the field access methods of [`DynamicMessage`](crate::DynamicMessage).
///
/// A failed operation never modifies the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldAccessError {
    /// The field is not declared by the message type, and no matching extension is known.
    #[error("message '{message}' has no field '{field}'")]
    UnknownField {
        /// The full name of the message type.
        message: String,
        /// The field, as it was given by the caller.
        field: String,
    },
    /// The value cannot be stored in the field.
    #[error("expected a value of type '{expected}' for field '{field}', but found '{actual}'")]
    TypeMismatch {
        /// The full name of the field.
        field: String,
        /// The type of value the field holds.
        expected: String,
        /// The type of the value that was given.
        actual: String,
    },
    /// A list operation was used on a field which is not repeated.
    #[error("field '{field}' is not a repeated field")]
    NotRepeated {
        /// The full name of the field.
        field: String,
    },
    /// A map operation was used on a field which is not a map.
    #[error("field '{field}' is not a map field")]
    NotMap {
        /// The full name of the field.
        field: String,
    },
    /// An index was outside the bounds of a repeated field.
    #[error("index {index} is out of range for field '{field}' of length {len}")]
    IndexOutOfRange {
        /// The full name of the field.
        field: String,
        /// The index which was given.
        index: usize,
        /// The length of the field.
        len: usize,
    },
    /// A oneof was used with a message type that does not declare it.
    #[error("oneof '{oneof}' is not declared in message '{message}'")]
    NotOneofMember {
        /// The full name of the oneof.
        oneof: String,
        /// The full name of the message type.
        message: String,
    },
    /// No concrete type is registered for a message type.
    #[error("no concrete type is registered for message '{name}'")]
    UnknownKnownType {
        /// The full name of the message type.
        name: String,
    },
}

/// An error returned when decoding a message from the protobuf binary format.
///
/// Decoding stops at the first error, and no partially decoded message is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended in the middle of a tag, varint, fixed-width value or length-delimited
    /// payload.
    #[error("buffer underflow: the message is truncated")]
    Truncated,
    /// A varint was longer than ten bytes, or its tenth byte had more than one significant bit.
    #[error("invalid varint")]
    MalformedVarint,
    /// A value is too large for the declared type of its field.
    #[error("value {value} is out of range for field '{field}'")]
    NumericOverflow {
        /// The full name of the field.
        field: String,
        /// The raw value read from the input.
        value: u64,
    },
    /// A tag has a field number of zero or outside the valid range.
    #[error("invalid tag value: {tag}")]
    InvalidTag {
        /// The raw tag.
        tag: u64,
    },
    /// A tag has a wire type of 6 or 7.
    #[error("invalid wire type value: {value}")]
    InvalidWireType {
        /// The raw wire type.
        value: u64,
    },
    /// An end group tag appeared outside of any group.
    #[error("unexpected end group tag for field {number}")]
    UnexpectedEndGroup {
        /// The field number of the end group tag.
        number: u32,
    },
    /// A group was not closed by an end group tag with the same field number.
    #[error("unmatched start group tag for field {number}")]
    UnmatchedGroup {
        /// The field number of the start group tag.
        number: u32,
    },
    /// A `string` field does not contain valid UTF-8.
    #[error("invalid string value for field '{field}': data is not UTF-8 encoded")]
    InvalidUtf8 {
        /// The full name of the field.
        field: String,
    },
    /// A length prefix is too large, or a packed field has a length which is not a multiple of
    /// its element size.
    #[error("invalid length {len}")]
    InvalidLength {
        /// The length read from the input.
        len: u64,
    },
    /// Messages or groups are nested more deeply than the recursion limit.
    #[error("recursion limit reached")]
    RecursionLimitExceeded,
}

/// An error returned when encoding a message into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The buffer does not have enough remaining capacity for the encoded message.
    #[error("failed to encode message; insufficient buffer capacity (required: {required}, remaining: {remaining})")]
    InsufficientCapacity {
        /// The number of bytes needed to encode the message.
        required: usize,
        /// The number of bytes available in the buffer.
        remaining: usize,
    },
}
