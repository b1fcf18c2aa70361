use std::{borrow::Cow, collections::HashMap, ops::ControlFlow};

use crate::{
    dynamic::coerce, DynamicMessage, FieldAccessError, FieldDescriptor, FieldKey, MapKey,
    OneofDescriptor, Value,
};

/// Operations on list and map fields.
///
/// The list operations also accept map fields, which are then viewed as a list of messages of the
/// synthetic map entry type, ordered by key.
impl DynamicMessage {
    /// Gets the number of elements of a list field, or the number of entries of a map field.
    pub fn try_field_len(&self, field: impl FieldKey) -> Result<usize, FieldAccessError> {
        let field = field.resolve_field(self)?;
        if field.is_list() {
            Ok(self.list_values(&field).len())
        } else if field.is_map() {
            Ok(self.map_values(&field).map_or(0, HashMap::len))
        } else {
            Err(not_repeated(&field))
        }
    }

    /// Gets the number of elements of a list or map field, panicking on failure.
    pub fn field_len(&self, field: impl FieldKey) -> usize {
        self.try_field_len(field).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Gets the element at `index` of a list field.
    ///
    /// For a map field, this returns the entry with the `index`th smallest key, as a message of
    /// the synthetic map entry type.
    pub fn try_get_repeated_field(
        &self,
        field: impl FieldKey,
        index: usize,
    ) -> Result<Cow<'_, Value>, FieldAccessError> {
        let field = field.resolve_field(self)?;
        if field.is_list() {
            let values = self.list_values(&field);
            values
                .get(index)
                .map(Cow::Borrowed)
                .ok_or_else(|| index_out_of_range(&field, index, values.len()))
        } else if field.is_map() {
            let entries = self.sorted_map_entries(&field);
            let (key, value) = entries
                .get(index)
                .ok_or_else(|| index_out_of_range(&field, index, entries.len()))?;
            Ok(Cow::Owned(Value::Message(coerce::map_entry_to_message(
                &field, key, value,
            ))))
        } else {
            Err(not_repeated(&field))
        }
    }

    /// Gets the element at `index` of a list or map field, panicking on failure.
    pub fn get_repeated_field(&self, field: impl FieldKey, index: usize) -> Cow<'_, Value> {
        self.try_get_repeated_field(field, index)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Replaces the element at `index` of a list field.
    ///
    /// For a map field, `value` must be a message of the synthetic map entry type, and it replaces
    /// the entry with the `index`th smallest key.
    pub fn try_set_repeated_field(
        &mut self,
        field: impl FieldKey,
        index: usize,
        value: Value,
    ) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        if field.is_list() {
            let value = coerce::coerce_list_element(&field, value)?;
            let len = self.list_values(&field).len();
            match self.fields.get_mut(field.number()) {
                Some(Value::List(values)) if index < len => {
                    values[index] = value;
                    Ok(())
                }
                _ => Err(index_out_of_range(&field, index, len)),
            }
        } else if field.is_map() {
            let (key, value) = coerce::map_entry_from_message(&field, value)?;
            let entries = self.sorted_map_entries(&field);
            let old_key = match entries.get(index) {
                Some((old_key, _)) => (*old_key).clone(),
                None => return Err(index_out_of_range(&field, index, entries.len())),
            };
            if let Some(Value::Map(values)) = self.fields.get_mut(field.number()) {
                values.remove(&old_key);
                values.insert(key, value);
            }
            Ok(())
        } else {
            Err(not_repeated(&field))
        }
    }

    /// Replaces the element at `index` of a list or map field, panicking on failure.
    pub fn set_repeated_field(&mut self, field: impl FieldKey, index: usize, value: Value) {
        self.try_set_repeated_field(field, index, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Appends an element to a list field.
    ///
    /// For a map field, `value` must be a message of the synthetic map entry type, and its key and
    /// value are inserted into the map.
    pub fn try_add_repeated_field(
        &mut self,
        field: impl FieldKey,
        value: Value,
    ) -> Result<(), FieldAccessError> {
        let field = field.resolve_field(self)?;
        if field.is_list() {
            let value = coerce::coerce_list_element(&field, value)?;
            if let Value::List(values) = self.fields.get_or_insert_default(&field) {
                values.push(value);
            }
            Ok(())
        } else if field.is_map() {
            let (key, value) = coerce::map_entry_from_message(&field, value)?;
            if let Value::Map(values) = self.fields.get_or_insert_default(&field) {
                values.insert(key, value);
            }
            Ok(())
        } else {
            Err(not_repeated(&field))
        }
    }

    /// Appends an element to a list or map field, panicking on failure.
    pub fn add_repeated_field(&mut self, field: impl FieldKey, value: Value) {
        self.try_add_repeated_field(field, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Gets the value stored for `key` in a map field, or `None` if there is no entry for it.
    pub fn try_get_map_entry(
        &self,
        field: impl FieldKey,
        key: impl Into<MapKey>,
    ) -> Result<Option<&Value>, FieldAccessError> {
        let field = self.resolve_map_field(field)?;
        let key = coerce::coerce_lookup_key(&field, key.into())?;
        Ok(self
            .map_values(&field)
            .and_then(|values| values.get(&key)))
    }

    /// Gets the value stored for `key` in a map field, panicking on failure.
    pub fn get_map_entry(&self, field: impl FieldKey, key: impl Into<MapKey>) -> Option<&Value> {
        self.try_get_map_entry(field, key)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Inserts an entry into a map field, replacing any existing value for the key.
    pub fn try_put_map_entry(
        &mut self,
        field: impl FieldKey,
        key: impl Into<MapKey>,
        value: Value,
    ) -> Result<(), FieldAccessError> {
        let field = self.resolve_map_field(field)?;
        let (key, value) = coerce::coerce_map_entry(&field, key.into(), value)?;
        if let Value::Map(values) = self.fields.get_or_insert_default(&field) {
            values.insert(key, value);
        }
        Ok(())
    }

    /// Inserts an entry into a map field, panicking on failure.
    pub fn put_map_entry(&mut self, field: impl FieldKey, key: impl Into<MapKey>, value: Value) {
        self.try_put_map_entry(field, key, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Removes the entry for `key` from a map field, returning its value.
    ///
    /// Removing a key which is not present is not an error, and returns `None`.
    pub fn try_remove_map_entry(
        &mut self,
        field: impl FieldKey,
        key: impl Into<MapKey>,
    ) -> Result<Option<Value>, FieldAccessError> {
        let field = self.resolve_map_field(field)?;
        let key = coerce::coerce_lookup_key(&field, key.into())?;
        match self.fields.get_mut(field.number()) {
            Some(Value::Map(values)) => Ok(values.remove(&key)),
            _ => Ok(None),
        }
    }

    /// Removes the entry for `key` from a map field, panicking on failure.
    pub fn remove_map_entry(&mut self, field: impl FieldKey, key: impl Into<MapKey>) -> Option<Value> {
        self.try_remove_map_entry(field, key)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Calls `visit` with each entry of a map field, in key order, until it returns
    /// [`ControlFlow::Break`].
    pub fn try_for_each_map_entry<F>(
        &self,
        field: impl FieldKey,
        mut visit: F,
    ) -> Result<(), FieldAccessError>
    where
        F: FnMut(&MapKey, &Value) -> ControlFlow<()>,
    {
        let field = self.resolve_map_field(field)?;
        for (key, value) in self.sorted_map_entries(&field) {
            if visit(key, value).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Calls `visit` with each entry of a map field, panicking if the field is not a map.
    pub fn for_each_map_entry<F>(&self, field: impl FieldKey, visit: F)
    where
        F: FnMut(&MapKey, &Value) -> ControlFlow<()>,
    {
        self.try_for_each_map_entry(field, visit)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Gets the member of a oneof which is currently set, along with its value.
    pub fn try_get_oneof_field(
        &self,
        oneof: &OneofDescriptor,
    ) -> Result<Option<(FieldDescriptor, &Value)>, FieldAccessError> {
        if oneof.parent_message() != self.desc {
            return Err(FieldAccessError::NotOneofMember {
                oneof: oneof.full_name().to_owned(),
                message: self.desc.full_name().to_owned(),
            });
        }

        Ok(oneof.fields().find_map(|field| {
            let value = self.fields.get(field.number())?;
            Some((field, value))
        }))
    }

    /// Gets the member of a oneof which is currently set, panicking if the oneof belongs to a
    /// different message type.
    pub fn get_oneof_field(&self, oneof: &OneofDescriptor) -> Option<(FieldDescriptor, &Value)> {
        self.try_get_oneof_field(oneof)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    pub(super) fn resolve_map_field(
        &self,
        field: impl FieldKey,
    ) -> Result<FieldDescriptor, FieldAccessError> {
        let field = field.resolve_field(self)?;
        if field.is_map() {
            Ok(field)
        } else {
            Err(FieldAccessError::NotMap {
                field: field.full_name().to_owned(),
            })
        }
    }

    fn list_values(&self, field: &FieldDescriptor) -> &[Value] {
        match self.fields.get(field.number()) {
            Some(Value::List(values)) => values,
            _ => &[],
        }
    }

    fn map_values(&self, field: &FieldDescriptor) -> Option<&HashMap<MapKey, Value>> {
        match self.fields.get(field.number()) {
            Some(Value::Map(values)) => Some(values),
            _ => None,
        }
    }

    fn sorted_map_entries(&self, field: &FieldDescriptor) -> Vec<(&MapKey, &Value)> {
        let mut entries: Vec<_> = self
            .map_values(field)
            .into_iter()
            .flatten()
            .collect();
        entries.sort_unstable_by(|(l, _), (r, _)| l.cmp(r));
        entries
    }
}

pub(super) fn not_repeated(field: &FieldDescriptor) -> FieldAccessError {
    FieldAccessError::NotRepeated {
        field: field.full_name().to_owned(),
    }
}

fn index_out_of_range(field: &FieldDescriptor, index: usize, len: usize) -> FieldAccessError {
    FieldAccessError::IndexOutOfRange {
        field: field.full_name().to_owned(),
        index,
        len,
    }
}
