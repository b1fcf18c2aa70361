mod decode;
mod encode;

use prost::{
    bytes::{Buf, BufMut},
    encoding::WireType,
    Message,
};

use crate::{DecodeError, DynamicMessage, EncodeError, ExtensionRegistry, MessageDescriptor};

const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Options to control encoding of a [`DynamicMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    deterministic: bool,
}

/// Options to control decoding of a [`DynamicMessage`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    recursion_limit: u32,
    extensions: Option<ExtensionRegistry>,
}

impl EncodeOptions {
    /// Creates a new instance of [`EncodeOptions`], with the default options chosen to match
    /// the behavior of other protobuf runtimes.
    pub const fn new() -> Self {
        EncodeOptions {
            deterministic: false,
        }
    }

    /// Whether to write map entries sorted by key, so that equal messages always encode to the
    /// same bytes.
    ///
    /// The default value is `false`, in which case map entries are written in the iteration
    /// order of the map.
    pub const fn deterministic(mut self, yes: bool) -> Self {
        self.deterministic = yes;
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Creates a new instance of [`DecodeOptions`], with the default options chosen to match
    /// the behavior of other protobuf runtimes.
    pub const fn new() -> Self {
        DecodeOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            extensions: None,
        }
    }

    /// The maximum depth of nested messages and groups.
    ///
    /// The default value is 100.
    pub const fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// The registry used to recognize extension fields.
    ///
    /// By default, the registry of the [`MessageFactory`](crate::MessageFactory) the message was
    /// created by is used. Extensions which are not known are kept as unknown fields.
    pub fn extensions(mut self, registry: ExtensionRegistry) -> Self {
        self.extensions = Some(registry);
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicMessage {
    /// Returns the number of bytes this message occupies in the protobuf binary format.
    pub fn encoded_len(&self) -> usize {
        encode::message_len(self)
    }

    /// Encodes this message into `buf`, with the default options.
    ///
    /// Fails if `buf` does not have enough remaining capacity.
    pub fn encode<B>(&self, buf: &mut B) -> Result<(), EncodeError>
    where
        B: BufMut,
    {
        self.encode_with_options(buf, &EncodeOptions::new())
    }

    /// Encodes this message into `buf`.
    ///
    /// Known fields are written in field number order, followed by any unknown fields in field
    /// number order. Fails if `buf` does not have enough remaining capacity.
    pub fn encode_with_options<B>(&self, buf: &mut B, options: &EncodeOptions) -> Result<(), EncodeError>
    where
        B: BufMut,
    {
        let required = self.encoded_len();
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::InsufficientCapacity {
                required,
                remaining,
            });
        }

        encode::encode_message(self, buf, options);
        Ok(())
    }

    /// Appends the encoded form of this message to `buf`.
    ///
    /// The vector is only reallocated if its spare capacity is smaller than the encoded length.
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        encode::encode_message(self, buf, &EncodeOptions::new());
    }

    /// Encodes this message into a newly allocated buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        encode::encode_message(self, &mut buf, &EncodeOptions::new());
        buf
    }

    /// Encodes this message into a newly allocated buffer, with the given options.
    pub fn encode_to_vec_with_options(&self, options: &EncodeOptions) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        encode::encode_message(self, &mut buf, options);
        buf
    }

    /// Decodes an instance of the message type specified by the [`MessageDescriptor`] from
    /// `bytes`, with the default options.
    pub fn decode(desc: MessageDescriptor, bytes: &[u8]) -> Result<Self, DecodeError> {
        DynamicMessage::decode_with_options(desc, bytes, &DecodeOptions::new())
    }

    /// Decodes an instance of the message type specified by the [`MessageDescriptor`] from
    /// `bytes`.
    pub fn decode_with_options(
        desc: MessageDescriptor,
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<Self, DecodeError> {
        let mut message = DynamicMessage::new(desc);
        message.merge_with_options(bytes, options)?;
        Ok(message)
    }

    /// Decodes fields from `bytes` and merges them into this message, with the default options.
    ///
    /// Scalar fields present in `bytes` overwrite the current values, message fields are merged,
    /// and list and map fields are extended. If an error is returned, the message is unchanged.
    pub fn merge(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.merge_with_options(bytes, &DecodeOptions::new())
    }

    /// Decodes fields from `bytes` and merges them into this message.
    ///
    /// If an error is returned, the message is unchanged.
    pub fn merge_with_options(&mut self, bytes: &[u8], options: &DecodeOptions) -> Result<(), DecodeError> {
        let extensions = options
            .extensions
            .as_ref()
            .or_else(|| self.extension_registry())
            .cloned();
        let ctx = decode::DecodeContext::new(options.recursion_limit, extensions.as_ref());

        let mut merged = self.clone();
        decode::merge_message(&mut merged, &mut &*bytes, ctx, None)?;
        *self = merged;
        Ok(())
    }
}

/// Lets a [`DynamicMessage`] be used wherever prost expects a message, for example as a nested
/// field written with [`prost::encoding::message::encode`].
///
/// Decoding through this impl reports errors as [`prost::DecodeError`], and is not atomic: on
/// failure the fields merged so far are kept.
impl Message for DynamicMessage {
    fn encode_raw(&self, buf: &mut impl BufMut)
    where
        Self: Sized,
    {
        encode::encode_message(self, buf, &EncodeOptions::new())
    }

    fn merge_field(
        &mut self,
        number: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        _: prost::encoding::DecodeContext,
    ) -> Result<(), prost::DecodeError>
    where
        Self: Sized,
    {
        decode::merge_buffered_field(self, number, wire_type, buf)
    }

    fn encoded_len(&self) -> usize {
        encode::message_len(self)
    }

    fn clear(&mut self) {
        DynamicMessage::clear(self)
    }
}
