mod codec;
mod coerce;
mod error;
mod fields;
mod known;
mod repeated;
#[cfg(test)]
mod tests;
mod unknown;
mod value;

pub use self::codec::{DecodeOptions, EncodeOptions};
pub use self::error::{DecodeError, EncodeError, FieldAccessError};
pub use self::fields::FieldKey;
pub use self::unknown::UnknownField;
pub use self::value::{MapKey, Value};

use std::{borrow::Cow, fmt};

use prost::Message;

use self::{
    fields::{FieldEntry, FieldSet},
    unknown::UnknownFieldSet,
};
use crate::{
    ExtensionRegistry, FieldDescriptor, KnownMessage, KnownTypeRegistry, MessageDescriptor,
    MessageFactory,
};

/// [`DynamicMessage`] holds the field values of a protobuf message whose type is only known at
/// runtime, through its [`MessageDescriptor`].
///
/// Fields are addressed with any [`FieldKey`]: a [`FieldDescriptor`], a field number or a field
/// name. Each accessor comes in two forms. The `try_` form returns a [`FieldAccessError`] if the
/// field does not exist or the value has the wrong type, and the plain form panics instead.
///
/// Messages compare equal if they have the same descriptor, the same populated fields and the
/// same unknown fields.
#[derive(Clone)]
pub struct DynamicMessage {
    desc: MessageDescriptor,
    fields: FieldSet,
    unknown: UnknownFieldSet,
    factory: Option<MessageFactory>,
}

impl DynamicMessage {
    /// Creates a new, empty instance of [`DynamicMessage`] for the message type specified by the
    /// [`MessageDescriptor`].
    pub fn new(desc: MessageDescriptor) -> Self {
        DynamicMessage::new_with_factory(desc, None)
    }

    pub(crate) fn new_with_factory(desc: MessageDescriptor, factory: Option<MessageFactory>) -> Self {
        DynamicMessage {
            desc,
            fields: FieldSet::default(),
            unknown: UnknownFieldSet::default(),
            factory,
        }
    }

    /// Gets the [`MessageDescriptor`] describing the type of this message.
    pub fn descriptor(&self) -> MessageDescriptor {
        self.desc.clone()
    }

    /// Gets the [`MessageFactory`] this message was created by, if any.
    ///
    /// Messages created by a factory look up extensions and concrete message types in its
    /// registries. Nested messages created while decoding inherit the factory of their parent.
    pub fn factory(&self) -> Option<&MessageFactory> {
        self.factory.as_ref()
    }

    fn extension_registry(&self) -> Option<&ExtensionRegistry> {
        self.factory.as_ref().map(MessageFactory::extensions)
    }

    fn known_types(&self) -> Option<&KnownTypeRegistry> {
        self.factory.as_ref().map(MessageFactory::known_types)
    }

    /// Returns `true` if the given field is set.
    ///
    /// For fields which support presence (see [`FieldDescriptor::supports_presence`]) this is true
    /// once a value has been set, even if it is the default value. Other fields are only set while
    /// they hold a non-default value, and lists and maps only while they are non-empty.
    pub fn try_has_field(&self, field: impl FieldKey) -> Result<bool, FieldAccessError> {
        let field = field.resolve_field(self)?;
        Ok(self
            .fields
            .get_entry(field.number())
            .map_or(false, FieldEntry::is_populated))
    }

    /// Returns `true` if the given field is set, panicking if it does not exist.
    ///
    /// See [`try_has_field`](Self::try_has_field).
    pub fn has_field(&self, field: impl FieldKey) -> bool {
        self.try_has_field(field).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Gets the value of the given field.
    ///
    /// If the field has never been set, this returns its default value: an empty list or map for
    /// repeated fields, the declared default for proto2 fields with a `default` option, and the
    /// zero value of its type otherwise. Unset message fields and unset members of a oneof have
    /// no default, and `None` is returned for them.
    pub fn try_get_field(
        &self,
        field: impl FieldKey,
    ) -> Result<Option<Cow<'_, Value>>, FieldAccessError> {
        let field = field.resolve_field(self)?;
        if let Some(value) = self.fields.get(field.number()) {
            return Ok(Some(Cow::Borrowed(value)));
        }

        let in_oneof = field
            .containing_oneof()
            .map_or(false, |oneof| !oneof.is_synthetic());
        let is_message = !field.is_list() && !field.is_map() && field.kind().as_message().is_some();
        if in_oneof || is_message {
            Ok(None)
        } else {
            Ok(Some(Cow::Owned(Value::default_value_for_field(&field))))
        }
    }

    /// Gets the value of the given field, panicking if it does not exist.
    ///
    /// See [`try_get_field`](Self::try_get_field).
    pub fn get_field(&self, field: impl FieldKey) -> Option<Cow<'_, Value>> {
        self.try_get_field(field).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Sets the value of the given field.
    ///
    /// The value must have the type of the field, except that narrower integers are widened to
    /// wider integers of the same signedness and `f32` is widened to `f64`. List fields take a
    /// [`Value::List`]. Map fields take a [`Value::Map`], or a [`Value::List`] of messages of the
    /// synthetic map entry type.
    ///
    /// Setting a member of a oneof clears every other member.
    pub fn try_set_field(&mut self, field: impl FieldKey, value: Value) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        let value = coerce::coerce_field_value(&field, value)?;
        self.fields.set(field, value);
        Ok(())
    }

    /// Sets the value of the given field, panicking if it does not exist or the value has the
    /// wrong type.
    ///
    /// See [`try_set_field`](Self::try_set_field).
    pub fn set_field(&mut self, field: impl FieldKey, value: Value) {
        self.try_set_field(field, value).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Clears the given field.
    ///
    /// After calling this method, [`has_field`](Self::has_field) returns `false` for the field and
    /// it is not written when encoding.
    pub fn try_clear_field(&mut self, field: impl FieldKey) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        self.fields.remove(field.number());
        Ok(())
    }

    /// Clears the given field, panicking if it does not exist.
    ///
    /// See [`try_clear_field`](Self::try_clear_field).
    pub fn clear_field(&mut self, field: impl FieldKey) {
        self.try_clear_field(field).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Like [`try_has_field`](Self::try_has_field), for the field with the given number.
    pub fn try_has_field_by_number(&self, number: u32) -> Result<bool, FieldAccessError> {
        self.try_has_field(number)
    }

    /// Like [`has_field`](Self::has_field), for the field with the given number.
    pub fn has_field_by_number(&self, number: u32) -> bool {
        self.has_field(number)
    }

    /// Like [`try_get_field`](Self::try_get_field), for the field with the given number.
    pub fn try_get_field_by_number(
        &self,
        number: u32,
    ) -> Result<Option<Cow<'_, Value>>, FieldAccessError> {
        self.try_get_field(number)
    }

    /// Like [`get_field`](Self::get_field), for the field with the given number.
    pub fn get_field_by_number(&self, number: u32) -> Option<Cow<'_, Value>> {
        self.get_field(number)
    }

    /// Like [`try_set_field`](Self::try_set_field), for the field with the given number.
    pub fn try_set_field_by_number(&mut self, number: u32, value: Value) -> Result<(), FieldAccessError> {
        self.try_set_field(number, value)
    }

    /// Like [`set_field`](Self::set_field), for the field with the given number.
    pub fn set_field_by_number(&mut self, number: u32, value: Value) {
        self.set_field(number, value)
    }

    /// Like [`try_clear_field`](Self::try_clear_field), for the field with the given number.
    pub fn try_clear_field_by_number(&mut self, number: u32) -> Result<(), FieldAccessError> {
        self.try_clear_field(number)
    }

    /// Like [`clear_field`](Self::clear_field), for the field with the given number.
    pub fn clear_field_by_number(&mut self, number: u32) {
        self.clear_field(number)
    }

    /// Like [`try_has_field`](Self::try_has_field), for the field with the given name.
    pub fn try_has_field_by_name(&self, name: &str) -> Result<bool, FieldAccessError> {
        self.try_has_field(name)
    }

    /// Like [`has_field`](Self::has_field), for the field with the given name.
    pub fn has_field_by_name(&self, name: &str) -> bool {
        self.has_field(name)
    }

    /// Like [`try_get_field`](Self::try_get_field), for the field with the given name.
    pub fn try_get_field_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Cow<'_, Value>>, FieldAccessError> {
        self.try_get_field(name)
    }

    /// Like [`get_field`](Self::get_field), for the field with the given name.
    pub fn get_field_by_name(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get_field(name)
    }

    /// Like [`try_set_field`](Self::try_set_field), for the field with the given name.
    pub fn try_set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), FieldAccessError> {
        self.try_set_field(name, value)
    }

    /// Like [`set_field`](Self::set_field), for the field with the given name.
    pub fn set_field_by_name(&mut self, name: &str, value: Value) {
        self.set_field(name, value)
    }

    /// Like [`try_clear_field`](Self::try_clear_field), for the field with the given name.
    pub fn try_clear_field_by_name(&mut self, name: &str) -> Result<(), FieldAccessError> {
        self.try_clear_field(name)
    }

    /// Like [`clear_field`](Self::clear_field), for the field with the given name.
    pub fn clear_field_by_name(&mut self, name: &str) {
        self.clear_field(name)
    }

    /// Gets an iterator over the fields and extensions which are set on this message, in field
    /// number order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldDescriptor, &Value)> + '_ {
        self.fields
            .iter()
            .filter(|entry| entry.is_populated())
            .map(|entry| (entry.desc.clone(), &entry.value))
    }

    /// Gets an iterator over the unknown fields kept from decoding, ordered by field number.
    pub fn unknown_fields(&self) -> impl Iterator<Item = &UnknownField> + '_ {
        self.unknown.iter()
    }

    /// Clears all fields, extensions and unknown fields of this message.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.unknown.clear();
    }

    /// Discards the unknown fields kept from decoding.
    pub fn clear_unknown_fields(&mut self) {
        self.unknown.clear();
    }

    /// Returns `true` if no field, extension or unknown field is set.
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none() && self.unknown.is_empty()
    }

    /// Merges the fields of `other` into this message.
    ///
    /// Set scalar fields of `other` overwrite those of this message, set message fields are
    /// merged recursively, list fields are concatenated and map entries are inserted. Unknown
    /// fields are appended.
    ///
    /// Fails if `other` has a different message type.
    pub fn try_merge_from(&mut self, other: &DynamicMessage) -> Result<(), FieldAccessError> {
        if self.desc != other.desc {
            return Err(FieldAccessError::TypeMismatch {
                field: self.desc.full_name().to_owned(),
                expected: self.desc.full_name().to_owned(),
                actual: other.desc.full_name().to_owned(),
            });
        }
        self.merge_fields_from(other);
        Ok(())
    }

    /// Merges the fields of `other` into this message, panicking if it has a different message
    /// type.
    ///
    /// See [`try_merge_from`](Self::try_merge_from).
    pub fn merge_from(&mut self, other: &DynamicMessage) {
        self.try_merge_from(other).unwrap_or_else(|err| panic!("{}", err))
    }

    fn merge_fields_from(&mut self, other: &DynamicMessage) {
        for entry in other.fields.iter().filter(|entry| entry.is_populated()) {
            match &entry.value {
                Value::List(values) => {
                    if let Value::List(existing) = self.fields.get_or_insert_default(&entry.desc) {
                        existing.extend(values.iter().cloned());
                    }
                }
                Value::Map(values) => {
                    if let Value::Map(existing) = self.fields.get_or_insert_default(&entry.desc) {
                        existing.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
                Value::Message(message) => {
                    match self.fields.get_or_insert_default(&entry.desc) {
                        Value::Message(existing) => existing.merge_fields_from(message),
                        existing => *existing = Value::Message(message.clone()),
                    }
                }
                value => self.fields.set(entry.desc.clone(), value.clone()),
            }
        }
        self.unknown.extend(&other.unknown);
    }

    /// Merges the encoded form of a concrete message into this message.
    ///
    /// This can only fail if `value` is not compatible with the descriptor of this message.
    pub fn transcode_from<T>(&mut self, value: &T) -> Result<(), DecodeError>
    where
        T: Message,
    {
        self.merge(&value.encode_to_vec())
    }

    /// Converts this message into a concrete message type by encoding and decoding it.
    pub fn transcode_to<T>(&self) -> Result<T, prost::DecodeError>
    where
        T: Message + Default,
    {
        T::decode(self.encode_to_vec().as_slice())
    }

    /// Returns `true` if `other` is a concrete message of the same type, with the same contents
    /// as this message.
    pub fn eq_known(&self, other: &dyn KnownMessage) -> bool {
        if other.type_name() != self.desc.full_name() {
            return false;
        }
        let mut converted = DynamicMessage::new_with_factory(self.desc.clone(), self.factory.clone());
        match converted.merge(&other.encode_to_vec()) {
            Ok(()) => converted == *self,
            Err(_) => false,
        }
    }
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        fn populated(message: &DynamicMessage) -> impl Iterator<Item = (u32, &Value)> + '_ {
            message
                .fields
                .iter()
                .filter(|entry| entry.is_populated())
                .map(|entry| (entry.desc.number(), &entry.value))
        }

        self.desc == other.desc
            && populated(self).eq(populated(other))
            && self.unknown == other.unknown
    }
}

impl fmt::Debug for DynamicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct DebugFields<'a>(&'a FieldSet);

        impl fmt::Debug for DebugFields<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.iter().map(|entry| (entry.desc.name(), &entry.value)))
                    .finish()
            }
        }

        let mut debug = f.debug_struct("DynamicMessage");
        debug
            .field("desc", &self.desc.full_name())
            .field("fields", &DebugFields(&self.fields));
        if !self.unknown.is_empty() {
            debug.field("unknown_fields", &self.unknown);
        }
        debug.finish()
    }
}

#[test]
fn assert_dynamic_send_sync() {
    fn test_send_sync<T: Send + Sync>() {}

    test_send_sync::<DynamicMessage>();
    test_send_sync::<Value>();
    test_send_sync::<FieldAccessError>();
    test_send_sync::<DecodeError>();
}
