use std::collections::{btree_map, BTreeMap};

use crate::{DynamicMessage, FieldAccessError, FieldDescriptor, Value};

/// A way of naming a field of a [`DynamicMessage`].
///
/// This trait is implemented for:
///
/// * [`&FieldDescriptor`](FieldDescriptor): a field of the message type, or an extension of it.
/// * `u32`: the number of a field or of a known extension.
/// * `&str`: the name of a field, or the fully-qualified name of a known extension.
///
/// Extensions are known to a message if they are already set on it, or if they are registered
/// with the [`ExtensionRegistry`](crate::ExtensionRegistry) of the
/// [`MessageFactory`](crate::MessageFactory) that created it.
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait FieldKey: private::Sealed {
    #[doc(hidden)]
    fn resolve_field(&self, message: &DynamicMessage) -> Result<FieldDescriptor, FieldAccessError>;
}

mod private {
    pub trait Sealed {}

    impl Sealed for &crate::FieldDescriptor {}
    impl Sealed for u32 {}
    impl Sealed for &str {}
}

impl FieldKey for &FieldDescriptor {
    fn resolve_field(&self, message: &DynamicMessage) -> Result<FieldDescriptor, FieldAccessError> {
        if self.containing_message() == message.desc
            || (self.is_extension()
                && self.containing_message().full_name() == message.desc.full_name())
        {
            Ok((*self).clone())
        } else {
            Err(message.unknown_field(self.full_name()))
        }
    }
}

impl FieldKey for u32 {
    fn resolve_field(&self, message: &DynamicMessage) -> Result<FieldDescriptor, FieldAccessError> {
        message
            .find_field_by_number(*self)
            .ok_or_else(|| message.unknown_field(&self.to_string()))
    }
}

impl FieldKey for &str {
    fn resolve_field(&self, message: &DynamicMessage) -> Result<FieldDescriptor, FieldAccessError> {
        message
            .find_field_by_name(self)
            .ok_or_else(|| message.unknown_field(self))
    }
}

/// The values of the fields and extensions set on a message, keyed by field number.
#[derive(Debug, Default, Clone)]
pub(super) struct FieldSet {
    fields: BTreeMap<u32, FieldEntry>,
}

#[derive(Debug, Clone)]
pub(super) struct FieldEntry {
    pub(super) desc: FieldDescriptor,
    pub(super) value: Value,
}

impl FieldEntry {
    /// Whether this field counts as set, and so is written when encoding.
    ///
    /// Fields without presence tracking that hold their default value are treated as unset.
    pub(super) fn is_populated(&self) -> bool {
        is_populated(&self.desc, &self.value)
    }
}

pub(super) fn is_populated(desc: &FieldDescriptor, value: &Value) -> bool {
    match value {
        Value::List(values) => !values.is_empty(),
        Value::Map(values) => !values.is_empty(),
        value => desc.supports_presence() || !value.is_default_for_field(desc),
    }
}

impl FieldSet {
    pub(super) fn get(&self, number: u32) -> Option<&Value> {
        self.fields.get(&number).map(|entry| &entry.value)
    }

    pub(super) fn get_entry(&self, number: u32) -> Option<&FieldEntry> {
        self.fields.get(&number)
    }

    pub(super) fn get_mut(&mut self, number: u32) -> Option<&mut Value> {
        self.fields.get_mut(&number).map(|entry| &mut entry.value)
    }

    /// Gets the value of a field for modification, inserting its default value if it is not set.
    ///
    /// Any other field of the same oneof is cleared.
    pub(super) fn get_or_insert_default(&mut self, desc: &FieldDescriptor) -> &mut Value {
        self.clear_oneof_siblings(desc);
        match self.fields.entry(desc.number()) {
            btree_map::Entry::Occupied(entry) => &mut entry.into_mut().value,
            btree_map::Entry::Vacant(entry) => {
                &mut entry
                    .insert(FieldEntry {
                        desc: desc.clone(),
                        value: Value::default_value_for_field(desc),
                    })
                    .value
            }
        }
    }

    /// Stores the value of a field, clearing any other field of the same oneof.
    pub(super) fn set(&mut self, desc: FieldDescriptor, value: Value) {
        self.clear_oneof_siblings(&desc);
        self.fields
            .insert(desc.number(), FieldEntry { desc, value });
    }

    pub(super) fn remove(&mut self, number: u32) -> Option<Value> {
        self.fields.remove(&number).map(|entry| entry.value)
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = &FieldEntry> + '_ {
        self.fields.values()
    }

    pub(super) fn clear(&mut self) {
        self.fields.clear();
    }

    fn clear_oneof_siblings(&mut self, desc: &FieldDescriptor) {
        if let Some(oneof) = desc.containing_oneof() {
            for sibling in oneof.fields() {
                if sibling.number() != desc.number() {
                    self.fields.remove(&sibling.number());
                }
            }
        }
    }
}

impl DynamicMessage {
    pub(super) fn find_field_by_number(&self, number: u32) -> Option<FieldDescriptor> {
        if let Some(field) = self.desc.get_field(number) {
            return Some(field);
        }
        if let Some(entry) = self.fields.get_entry(number) {
            return Some(entry.desc.clone());
        }
        self.extension_registry()?
            .find(self.desc.full_name(), number)
    }

    pub(super) fn find_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        if let Some(field) = self.desc.get_field_by_name(name) {
            return Some(field);
        }

        let name = name.strip_prefix('.').unwrap_or(name);
        if let Some(entry) = self
            .fields
            .iter()
            .find(|entry| entry.desc.is_extension() && entry.desc.full_name() == name)
        {
            return Some(entry.desc.clone());
        }
        self.extension_registry()?
            .find_by_name(self.desc.full_name(), name)
    }

    pub(super) fn unknown_field(&self, field: &str) -> FieldAccessError {
        FieldAccessError::UnknownField {
            message: self.desc.full_name().to_owned(),
            field: field.to_owned(),
        }
    }
}
