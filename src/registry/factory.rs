use crate::{
    DecodeError, DynamicMessage, ExtensionRegistry, KnownMessage, KnownTypeRegistry,
    MessageDescriptor,
};

/// Creates messages, choosing between concrete and dynamic representations.
///
/// A factory bundles an [`ExtensionRegistry`], used to recognize extension fields, and a
/// [`KnownTypeRegistry`], used to materialize messages as their concrete types.
/// [`DynamicMessage`]s created by a factory remember it, and use its registries when their
/// fields are accessed or decoded.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    extensions: ExtensionRegistry,
    known_types: KnownTypeRegistry,
}

/// A message created by a [`MessageFactory`].
#[derive(Debug, Clone)]
pub enum AnyMessage {
    /// An instance of a concrete type registered with the factory's [`KnownTypeRegistry`].
    Known(Box<dyn KnownMessage>),
    /// A dynamic message bound to the factory.
    Dynamic(DynamicMessage),
}

impl MessageFactory {
    /// Creates a factory using the given registries.
    pub fn new(extensions: ExtensionRegistry, known_types: KnownTypeRegistry) -> Self {
        MessageFactory {
            extensions,
            known_types,
        }
    }

    /// Gets the registry of extensions known to this factory.
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Gets the registry of concrete message types known to this factory.
    pub fn known_types(&self) -> &KnownTypeRegistry {
        &self.known_types
    }

    /// Creates a new, empty message of the type described by `desc`.
    ///
    /// If a concrete type is registered for the message's full name, an instance of it is
    /// returned. Otherwise, the message is a [`DynamicMessage`] bound to this factory.
    pub fn new_message(&self, desc: &MessageDescriptor) -> AnyMessage {
        match self.known_types.create(desc.full_name()) {
            Some(message) => AnyMessage::Known(message),
            None => AnyMessage::Dynamic(self.new_dynamic_message(desc.clone())),
        }
    }

    /// Creates a new, empty [`DynamicMessage`] bound to this factory.
    pub fn new_dynamic_message(&self, desc: MessageDescriptor) -> DynamicMessage {
        DynamicMessage::new_with_factory(desc, Some(self.clone()))
    }

    /// Decodes a message of the type described by `desc`.
    ///
    /// The bytes are always validated against the descriptor. If a concrete type is registered,
    /// the message is then decoded as that type, falling back to a [`DynamicMessage`] if the
    /// concrete type rejects the input.
    pub fn decode_message(
        &self,
        desc: MessageDescriptor,
        bytes: &[u8],
    ) -> Result<AnyMessage, DecodeError> {
        let mut message = self.new_dynamic_message(desc);
        message.merge(bytes)?;

        if let Some(mut known) = self.known_types.create(message.descriptor().full_name()) {
            match known.merge_from_slice(bytes) {
                Ok(()) => return Ok(AnyMessage::Known(known)),
                Err(err) => tracing::debug!(
                    message = message.descriptor().full_name(),
                    error = %err,
                    "concrete type rejected message, keeping dynamic representation"
                ),
            }
        }
        Ok(AnyMessage::Dynamic(message))
    }
}

impl Default for MessageFactory {
    /// Creates a factory whose extension registry falls back to the
    /// [global registry](ExtensionRegistry::global), and whose known types are the google
    /// well-known types.
    fn default() -> Self {
        MessageFactory::new(
            ExtensionRegistry::with_defaults(),
            KnownTypeRegistry::with_well_known_types(),
        )
    }
}

impl AnyMessage {
    /// Gets the fully-qualified protobuf name of this message's type.
    pub fn type_name(&self) -> String {
        match self {
            AnyMessage::Known(message) => message.type_name(),
            AnyMessage::Dynamic(message) => message.descriptor().full_name().to_owned(),
        }
    }

    /// Encodes this message into a newly allocated buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        match self {
            AnyMessage::Known(message) => message.encode_to_vec(),
            AnyMessage::Dynamic(message) => message.encode_to_vec(),
        }
    }

    /// If this is an instance of a concrete type, gets it.
    pub fn as_known(&self) -> Option<&dyn KnownMessage> {
        match self {
            AnyMessage::Known(message) => Some(message.as_ref()),
            AnyMessage::Dynamic(_) => None,
        }
    }

    /// If this is an instance of the concrete type `T`, gets it.
    pub fn downcast_ref<T: KnownMessage>(&self) -> Option<&T> {
        self.as_known()?.downcast_ref()
    }

    /// If this is a dynamic message, gets it.
    pub fn as_dynamic(&self) -> Option<&DynamicMessage> {
        match self {
            AnyMessage::Known(_) => None,
            AnyMessage::Dynamic(message) => Some(message),
        }
    }

    /// If this is a dynamic message, converts it into one.
    pub fn into_dynamic(self) -> Option<DynamicMessage> {
        match self {
            AnyMessage::Known(_) => None,
            AnyMessage::Dynamic(message) => Some(message),
        }
    }
}
