use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use prost::{Message, Name};

/// An object-safe view of a concrete, generated protobuf message type.
///
/// This trait is implemented for every [`prost::Message`] which also implements [`prost::Name`],
/// so that its protobuf type name is known.
pub trait KnownMessage: Any + Send + Sync + fmt::Debug {
    /// Gets the fully-qualified protobuf name of this message type, for example
    /// `google.protobuf.Timestamp`.
    fn type_name(&self) -> String;

    /// Encodes this message into a newly allocated buffer.
    fn encode_to_vec(&self) -> Vec<u8>;

    /// Decodes fields from `bytes` and merges them into this message.
    fn merge_from_slice(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError>;

    /// Clones this message into a new box.
    fn clone_box(&self) -> Box<dyn KnownMessage>;

    /// Converts this message to [`Any`], for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Converts this message to a mutable [`Any`], for downcasting to its concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M> KnownMessage for M
where
    M: Message + Name + Default + Clone + 'static,
{
    fn type_name(&self) -> String {
        <M as Name>::full_name()
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        <M as Message>::encode_to_vec(self)
    }

    fn merge_from_slice(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError> {
        <M as Message>::merge(self, bytes)
    }

    fn clone_box(&self) -> Box<dyn KnownMessage> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn KnownMessage {
    /// Returns `true` if this message has the concrete type `T`.
    pub fn is<T: KnownMessage>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Gets a reference to this message as its concrete type, if it has type `T`.
    pub fn downcast_ref<T: KnownMessage>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Gets a mutable reference to this message as its concrete type, if it has type `T`.
    pub fn downcast_mut<T: KnownMessage>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

impl Clone for Box<dyn KnownMessage> {
    fn clone(&self) -> Self {
        (**self).clone_box()
    }
}

type Constructor = Arc<dyn Fn() -> Box<dyn KnownMessage> + Send + Sync>;

/// A catalog of concrete message types, keyed by protobuf type name.
///
/// A [`MessageFactory`](crate::MessageFactory) uses this registry to decide whether a message
/// should be materialized as its concrete type rather than as a
/// [`DynamicMessage`](crate::DynamicMessage).
///
/// Cloning a [`KnownTypeRegistry`] is cheap, and the clone shares its contents with the original.
#[derive(Clone, Default)]
pub struct KnownTypeRegistry {
    types: Arc<RwLock<HashMap<String, Constructor>>>,
}

macro_rules! well_known_types {
    ($($ty:ty => $name:literal;)*) => {
        fn register_well_known_types(registry: &KnownTypeRegistry) {
            $(
                registry.register::<$ty>();
            )*
        }

        #[test]
        fn test_well_known_type_names() {
            let registry = KnownTypeRegistry::with_well_known_types();
            $(
                assert!(registry.contains($name));
                assert_eq!(<$ty>::default().type_name(), $name);
            )*
        }
    };
}

well_known_types! {
    prost_types::Any => "google.protobuf.Any";
    prost_types::Duration => "google.protobuf.Duration";
    prost_types::Timestamp => "google.protobuf.Timestamp";
}

impl KnownTypeRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        KnownTypeRegistry::default()
    }

    /// Creates a registry containing the google well-known types from [`prost_types`] which have a
    /// protobuf type name: `Any`, `Duration` and `Timestamp`.
    pub fn with_well_known_types() -> Self {
        let registry = KnownTypeRegistry::new();
        register_well_known_types(&registry);
        registry
    }

    /// Registers the concrete message type `M` under its protobuf type name.
    pub fn register<M>(&self)
    where
        M: Message + Name + Default + Clone + 'static,
    {
        self.register_factory(M::full_name(), || Box::new(M::default()));
    }

    /// Registers a function creating new, empty instances of the message type named `name`.
    ///
    /// This replaces any factory previously registered for the same name.
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn KnownMessage> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::trace!(name = name.as_str(), "registered known message type");
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(factory));
    }

    /// Returns `true` if a concrete type is registered for the message type named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Creates a new, empty instance of the concrete type registered for `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn KnownMessage>> {
        let constructor = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        Some(constructor())
    }
}

impl fmt::Debug for KnownTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = types.keys().collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}
