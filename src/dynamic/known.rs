use crate::{
    dynamic::{coerce::type_mismatch, repeated::not_repeated},
    DynamicMessage, FieldAccessError, FieldDescriptor, FieldKey, Kind, KnownMessage, MapKey,
    MessageDescriptor, Value,
};

/// Operations which take or return instances of concrete message types.
///
/// A concrete value is accepted wherever a message of exactly its [type
/// name](KnownMessage::type_name) is expected, and is stored as a [`DynamicMessage`].
impl DynamicMessage {
    /// Sets a message field from an instance of a concrete message type.
    pub fn try_set_known_field(
        &mut self,
        field: impl FieldKey,
        value: &dyn KnownMessage,
    ) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        let value = self.known_to_value(&field, singular_message_type(&field), value)?;
        self.fields.set(field, value);
        Ok(())
    }

    /// Sets a message field from an instance of a concrete message type, panicking on failure.
    pub fn set_known_field(&mut self, field: impl FieldKey, value: &dyn KnownMessage) {
        self.try_set_known_field(field, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Appends an instance of a concrete message type to a list of messages.
    pub fn try_add_known_repeated_field(
        &mut self,
        field: impl FieldKey,
        value: &dyn KnownMessage,
    ) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        let value = self.known_to_value(&field, list_message_type(&field)?, value)?;
        self.try_add_repeated_field(&field, value)
    }

    /// Appends an instance of a concrete message type to a list of messages, panicking on failure.
    pub fn add_known_repeated_field(&mut self, field: impl FieldKey, value: &dyn KnownMessage) {
        self.try_add_known_repeated_field(field, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Replaces the element at `index` of a list of messages with an instance of a concrete
    /// message type.
    pub fn try_set_known_repeated_field(
        &mut self,
        field: impl FieldKey,
        index: usize,
        value: &dyn KnownMessage,
    ) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        let value = self.known_to_value(&field, list_message_type(&field)?, value)?;
        self.try_set_repeated_field(&field, index, value)
    }

    /// Replaces the element at `index` of a list of messages, panicking on failure.
    pub fn set_known_repeated_field(
        &mut self,
        field: impl FieldKey,
        index: usize,
        value: &dyn KnownMessage,
    ) {
        self.try_set_known_repeated_field(field, index, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Inserts an entry into a map field whose values are messages, using an instance of a
    /// concrete message type as the value.
    pub fn try_put_known_map_entry(
        &mut self,
        field: impl FieldKey,
        key: impl Into<MapKey>,
        value: &dyn KnownMessage,
    ) -> Result<(), FieldAccessError> {
        let field = self.resolve_map_field(field)?;
        let value_type = match field.kind() {
            Kind::Message(entry) => entry.map_entry_value_field().kind().as_message().cloned(),
            _ => None,
        };
        let value = self.known_to_value(&field, value_type, value)?;
        self.try_put_map_entry(&field, key, value)
    }

    /// Inserts an entry into a map field whose values are messages, panicking on failure.
    pub fn put_known_map_entry(
        &mut self,
        field: impl FieldKey,
        key: impl Into<MapKey>,
        value: &dyn KnownMessage,
    ) {
        self.try_put_known_map_entry(field, key, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Gets the value of a message field as an instance of its concrete message type.
    ///
    /// The concrete type is created by the [`KnownTypeRegistry`](crate::KnownTypeRegistry) of the
    /// [`MessageFactory`](crate::MessageFactory) this message was created by. Returns `None` if the
    /// field is not set.
    pub fn try_get_known_field(
        &self,
        field: impl FieldKey,
    ) -> Result<Option<Box<dyn KnownMessage>>, FieldAccessError> {
        let field = field.resolve_field(self)?;
        let desc = singular_message_type(&field).ok_or_else(|| type_mismatch(&field, "message"))?;
        let message = match self.fields.get(field.number()) {
            Some(Value::Message(message)) => message,
            _ => return Ok(None),
        };

        let mut known = self
            .known_types()
            .and_then(|registry| registry.create(desc.full_name()))
            .ok_or_else(|| FieldAccessError::UnknownKnownType {
                name: desc.full_name().to_owned(),
            })?;
        known
            .merge_from_slice(&message.encode_to_vec())
            .map_err(|_| type_mismatch(&field, known.type_name()))?;
        Ok(Some(known))
    }

    /// Gets the value of a message field as an instance of its concrete message type, panicking
    /// on failure.
    pub fn get_known_field(&self, field: impl FieldKey) -> Option<Box<dyn KnownMessage>> {
        self.try_get_known_field(field)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Converts `value` to a [`DynamicMessage`] of type `expected`, bound to this message's
    /// factory.
    fn known_to_value(
        &self,
        field: &FieldDescriptor,
        expected: Option<MessageDescriptor>,
        value: &dyn KnownMessage,
    ) -> Result<Value, FieldAccessError> {
        let desc = expected
            .filter(|desc| desc.full_name() == value.type_name())
            .ok_or_else(|| type_mismatch(field, value.type_name()))?;

        let mut message = DynamicMessage::new_with_factory(desc, self.factory.clone());
        message
            .merge(&value.encode_to_vec())
            .map_err(|_| type_mismatch(field, value.type_name()))?;
        Ok(Value::Message(message))
    }
}

fn singular_message_type(field: &FieldDescriptor) -> Option<MessageDescriptor> {
    match field.kind() {
        Kind::Message(desc) if !field.is_list() && !field.is_map() => Some(desc),
        _ => None,
    }
}

/// Map entries have no concrete type, so a map field never accepts one as an element.
fn list_message_type(
    field: &FieldDescriptor,
) -> Result<Option<MessageDescriptor>, FieldAccessError> {
    if field.is_list() {
        Ok(field.kind().as_message().cloned())
    } else if field.is_map() {
        Ok(None)
    } else {
        Err(not_repeated(field))
    }
}
