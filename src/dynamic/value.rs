use std::collections::HashMap;

use prost::bytes::Bytes;

use crate::{DynamicMessage, FieldDescriptor, Kind};

/// The value of a field of a [`DynamicMessage`].
///
/// Several field types share a variant, so a value is only meaningful alongside the field
/// descriptor it is stored for.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// For `bool` fields.
    Bool(bool),
    /// For `int32`, `sint32` and `sfixed32` fields.
    I32(i32),
    /// For `int64`, `sint64` and `sfixed64` fields.
    I64(i64),
    /// For `uint32` and `fixed32` fields.
    U32(u32),
    /// For `uint64` and `fixed64` fields.
    U64(u64),
    /// For `float` fields.
    F32(f32),
    /// For `double` fields.
    F64(f64),
    /// For `string` fields.
    String(String),
    /// For `bytes` fields.
    Bytes(Bytes),
    /// The number of an enum value. Numbers with no declared value are kept as they are.
    EnumNumber(i32),
    /// For message and group fields.
    Message(DynamicMessage),
    /// The elements of a repeated field.
    List(Vec<Value>),
    /// The entries of a map field.
    Map(HashMap<MapKey, Value>),
}

/// A key of a map field. Map keys may be any integral type, `bool` or `string`.
///
/// Keys order by variant first, which gives deterministic encoding a stable entry order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// For `bool` keys.
    Bool(bool),
    /// For `int32`, `sint32` and `sfixed32` keys.
    I32(i32),
    /// For `int64`, `sint64` and `sfixed64` keys.
    I64(i64),
    /// For `uint32` and `fixed32` keys.
    U32(u32),
    /// For `uint64` and `fixed64` keys.
    U64(u64),
    /// For `string` keys.
    String(String),
}

/// Generates `as_*` accessors for the variants holding a `Copy` value.
macro_rules! scalar_accessors {
    ($($name:ident => $variant:ident($ty:ty),)*) => {
        $(
            #[doc = concat!("Returns the contents if this is a `Value::", stringify!($variant), "`.")]
            pub fn $name(&self) -> Option<$ty> {
                match *self {
                    Value::$variant(value) => Some(value),
                    _ => None,
                }
            }
        )*
    };
}

impl Value {
    /// The value an unset `field` reads as.
    ///
    /// This is the explicit `default` of a proto2 field if one was declared, an empty list or map
    /// for repeated fields, and [`Value::default_value`] otherwise.
    pub fn default_value_for_field(field: &FieldDescriptor) -> Self {
        if field.is_list() {
            Value::List(Vec::new())
        } else if field.is_map() {
            Value::Map(HashMap::new())
        } else {
            field
                .default_value()
                .cloned()
                .unwrap_or_else(|| Self::default_value(&field.kind()))
        }
    }

    /// The zero value of a single element of type `kind`. Messages default to an empty message.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Message(desc) => Value::Message(DynamicMessage::new(desc.clone())),
            Kind::Enum(enum_ty) => Value::EnumNumber(enum_ty.default_value().number()),
            Kind::Double => Value::F64(0.0),
            Kind::Float => Value::F32(0.0),
            Kind::Bytes => Value::Bytes(Bytes::new()),
            // Every remaining kind can also be a map key.
            key => MapKey::default_value(key).into(),
        }
    }

    /// Whether an unset `field` would read as this value.
    pub fn is_default_for_field(&self, field: &FieldDescriptor) -> bool {
        *self == Value::default_value_for_field(field)
    }

    /// Whether this is the zero value of type `kind`.
    pub fn is_default(&self, kind: &Kind) -> bool {
        *self == Value::default_value(kind)
    }

    /// A short name for the variant of this value, used in error messages.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum number",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    scalar_accessors! {
        as_bool => Bool(bool),
        as_i32 => I32(i32),
        as_i64 => I64(i64),
        as_u32 => U32(u32),
        as_u64 => U64(u64),
        as_f32 => F32(f32),
        as_f64 => F64(f64),
        as_enum_number => EnumNumber(i32),
    }

    /// Returns the nested message, or `None` for any other variant.
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Converts this value into a [`MapKey`]. Floating point, bytes, enum, message and repeated
    /// values cannot be keys.
    pub fn into_map_key(self) -> Option<MapKey> {
        match self {
            Value::Bool(value) => Some(MapKey::Bool(value)),
            Value::I32(value) => Some(MapKey::I32(value)),
            Value::I64(value) => Some(MapKey::I64(value)),
            Value::U32(value) => Some(MapKey::U32(value)),
            Value::U64(value) => Some(MapKey::U64(value)),
            Value::String(value) => Some(MapKey::String(value)),
            _ => None,
        }
    }
}

impl MapKey {
    /// The key an entry without a key field is stored under.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not an integral type, `bool` or `string`.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Bool => MapKey::Bool(false),
            Kind::String => MapKey::String(String::new()),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => 0i32.into(),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => 0i64.into(),
            Kind::Uint32 | Kind::Fixed32 => 0u32.into(),
            Kind::Uint64 | Kind::Fixed64 => 0u64.into(),
            other => panic!("'{:?}' cannot be the key of a map", other),
        }
    }

    /// Whether this key is left out of an encoded map entry. `kind` must be the key type the
    /// entry was declared with.
    pub fn is_default(&self, kind: &Kind) -> bool {
        debug_assert_eq!(MapKey::default_value(kind).type_name(), self.type_name());
        match self {
            MapKey::Bool(key) => !key,
            MapKey::I32(key) => *key == 0,
            MapKey::I64(key) => *key == 0,
            MapKey::U32(key) => *key == 0,
            MapKey::U64(key) => *key == 0,
            MapKey::String(key) => key.is_empty(),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            MapKey::Bool(_) => "bool",
            MapKey::I32(_) => "i32",
            MapKey::I64(_) => "i64",
            MapKey::U32(_) => "u32",
            MapKey::U64(_) => "u64",
            MapKey::String(_) => "string",
        }
    }
}

impl From<MapKey> for Value {
    fn from(value: MapKey) -> Self {
        match value {
            MapKey::Bool(value) => Value::Bool(value),
            MapKey::I32(value) => Value::I32(value),
            MapKey::I64(value) => Value::I64(value),
            MapKey::U32(value) => Value::U32(value),
            MapKey::U64(value) => Value::U64(value),
            MapKey::String(value) => Value::String(value),
        }
    }
}

macro_rules! impl_from {
    ($target:ident { $($ty:ty => $variant:ident,)* }) => {
        $(
            impl From<$ty> for $target {
                fn from(value: $ty) -> Self {
                    $target::$variant(value.into())
                }
            }
        )*
    };
}

impl_from!(Value {
    bool => Bool,
    i8 => I32,
    i16 => I32,
    i32 => I32,
    i64 => I64,
    u8 => U32,
    u16 => U32,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Bytes => Bytes,
    Vec<u8> => Bytes,
    &'static [u8] => Bytes,
    DynamicMessage => Message,
    Vec<Value> => List,
    HashMap<MapKey, Value> => Map,
});

impl_from!(MapKey {
    bool => Bool,
    i8 => I32,
    i16 => I32,
    i32 => I32,
    i64 => I64,
    u8 => U32,
    u16 => U32,
    u32 => U32,
    u64 => U64,
    String => String,
    &str => String,
});

#[test]
#[cfg(target_pointer_width = "64")]
fn type_sizes() {
    assert!(std::mem::size_of::<MapKey>() <= 32);
}

#[test]
fn zero_values() {
    assert_eq!(Value::default_value(&Kind::Sint64), Value::I64(0));
    assert_eq!(Value::default_value(&Kind::Fixed32), Value::U32(0));
    assert_eq!(Value::default_value(&Kind::String), Value::String(String::new()));
    assert_eq!(Value::default_value(&Kind::Bytes), Value::Bytes(Bytes::new()));
    assert!(Value::F64(0.0).is_default(&Kind::Double));

    assert!(MapKey::Bool(false).is_default(&Kind::Bool));
    assert!(MapKey::U32(0).is_default(&Kind::Fixed32));
    assert!(!MapKey::from("a").is_default(&Kind::String));
    assert!(!MapKey::I64(-1).is_default(&Kind::Sint64));
}

#[test]
#[should_panic = "'double' cannot be the key of a map"]
fn float_map_key() {
    MapKey::default_value(&Kind::Double);
}
