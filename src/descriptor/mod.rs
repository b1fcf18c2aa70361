mod api;
mod build;
mod error;
mod set;
mod source;
mod tag;
#[cfg(test)]
mod tests;

pub use self::error::DescriptorError;
pub use self::set::FileSet;
pub use self::source::Comments;

use std::{
    collections::{BTreeMap, HashMap},
    convert::TryInto,
    fmt,
    ops::Range,
    sync::Arc,
};

use prost_types::{
    field_descriptor_proto::Type, DescriptorProto, EnumDescriptorProto, FileDescriptorProto,
};

use crate::Value;

pub(crate) const MAP_ENTRY_KEY_NUMBER: u32 = 1;
pub(crate) const MAP_ENTRY_VALUE_NUMBER: u32 = 2;

pub(crate) const RESERVED_MESSAGE_FIELD_NUMBERS: Range<i32> = 19_000..20_000;
pub(crate) const VALID_MESSAGE_FIELD_NUMBERS: Range<i32> = 1..536_870_912;

/// How many times a field may occur in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    /// At most once. Whether an unset field can be told apart from its default depends on
    /// [`FieldDescriptor::supports_presence`].
    Optional,
    /// Exactly once. Only proto2 files declare required fields.
    Required,
    /// Any number of times, as a list or map.
    Repeated,
}

/// The `syntax` a file was written in.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// `syntax = "proto2"`, also assumed when a file does not declare its syntax.
    Proto2,
    /// `syntax = "proto3"`.
    Proto3,
}

/// The declared type of a field, with messages and enums resolved to their descriptors.
///
/// The `Debug` output is the type as written in a `.proto` file.
#[derive(Clone, PartialEq, Eq)]
pub enum Kind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// A message type. Fields declared with `group` have this kind too, see
    /// [`FieldDescriptor::is_group`].
    Message(MessageDescriptor),
    /// An enum type.
    Enum(EnumDescriptor),
}

/// Any named element of a [`FileDescriptor`], as returned by [`FileDescriptor::find_symbol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A message type.
    Message(MessageDescriptor),
    /// A message field or an extension field.
    Field(FieldDescriptor),
    /// A oneof declared in a message.
    Oneof(OneofDescriptor),
    /// An enum type.
    Enum(EnumDescriptor),
    /// A value of an enum type.
    EnumValue(EnumValueDescriptor),
    /// A service.
    Service(ServiceDescriptor),
    /// A method of a service.
    Method(MethodDescriptor),
}

// Definitions refer to each other by position within the arrays of `FileDescriptorInner`.
type DescriptorIndex = u32;
type ImportIndex = DescriptorIndex;
type MessageIndex = DescriptorIndex;
type FieldIndex = DescriptorIndex;
type OneofIndex = DescriptorIndex;
type EnumIndex = DescriptorIndex;
type EnumValueIndex = DescriptorIndex;
type ServiceIndex = DescriptorIndex;
type MethodIndex = DescriptorIndex;

/// Which file a cross reference points into: the file that declares it, or one of its imports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum FileRef {
    Local,
    Import(ImportIndex),
}

/// A message or enum definition, in this file or in an import.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct TypeRef {
    file: FileRef,
    index: DescriptorIndex,
}

/// A [`Kind`] as stored in a built file, with type references not yet turned into descriptors.
#[derive(Copy, Clone)]
enum KindIndex {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(TypeRef),
    Enum(TypeRef),
    Group(TypeRef),
}

/// A linked `.proto` file: the definitions it declares, with every type reference resolved.
///
/// Cloning is cheap since the built file is shared. Handles compare equal only when they come from
/// the same call to [`FileDescriptor::new`], even if another build produced identical contents.
#[derive(Clone)]
pub struct FileDescriptor {
    inner: Arc<FileDescriptorInner>,
}

struct FileDescriptorInner {
    raw: FileDescriptorProto,
    syntax: Syntax,
    /// Direct dependencies first, then every file they import transitively, each once.
    imports: Vec<FileDescriptor>,
    /// Position in `imports` of each entry of `raw.dependency`.
    dependencies: Vec<ImportIndex>,
    names: HashMap<Box<str>, Definition>,
    messages: Vec<MessageDescriptorInner>,
    fields: Vec<FieldDescriptorInner>,
    oneofs: Vec<OneofDescriptorInner>,
    enums: Vec<EnumDescriptorInner>,
    services: Vec<ServiceDescriptorInner>,
    extensions: Vec<FieldIndex>,
    locations: HashMap<Box<[i32]>, usize>,
}

/// The name and `source_code_info` path of a definition.
#[derive(Clone)]
struct Identity {
    path: Box<[i32]>,
    full_name: Box<str>,
    /// Byte offset of the unqualified name within `full_name`.
    name_start: usize,
}

/// An entry in the symbol table of a file.
#[derive(Clone, Debug)]
struct Definition {
    path: Box<[i32]>,
    kind: DefinitionKind,
}

#[derive(Copy, Clone, Debug)]
enum DefinitionKind {
    Package,
    Message(MessageIndex),
    Field(FieldIndex),
    Oneof(OneofIndex),
    Service(ServiceIndex),
    Method(ServiceIndex, MethodIndex),
    Enum(EnumIndex),
    EnumValue(EnumIndex, EnumValueIndex),
    Extension(FieldIndex),
}

/// A protobuf message definition.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MessageDescriptor {
    file: FileDescriptor,
    index: MessageIndex,
}

struct MessageDescriptorInner {
    id: Identity,
    parent: Option<MessageIndex>,
    fields: Vec<FieldIndex>,
    field_numbers: BTreeMap<u32, FieldIndex>,
    field_names: HashMap<Box<str>, FieldIndex>,
    field_json_names: HashMap<Box<str>, FieldIndex>,
    oneofs: Vec<OneofIndex>,
    messages: Vec<MessageIndex>,
    enums: Vec<EnumIndex>,
    extensions: Vec<FieldIndex>,
    is_map_entry: bool,
}

/// A field of a protobuf message, or an extension field declared for some other message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    file: FileDescriptor,
    index: FieldIndex,
}

#[derive(Copy, Clone)]
enum FieldParent {
    Message(MessageIndex),
    Extension {
        extendee: TypeRef,
        scope: Option<MessageIndex>,
    },
}

struct FieldDescriptorInner {
    id: Identity,
    parent: FieldParent,
    number: u32,
    json_name: Box<str>,
    kind: KindIndex,
    cardinality: Cardinality,
    oneof: Option<OneofIndex>,
    is_packed: bool,
    supports_presence: bool,
    default: Option<Value>,
}

/// A oneof declared in a protobuf message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OneofDescriptor {
    file: FileDescriptor,
    index: OneofIndex,
}

struct OneofDescriptorInner {
    id: Identity,
    message: MessageIndex,
    fields: Vec<FieldIndex>,
    is_synthetic: bool,
}

/// A protobuf enum type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    file: FileDescriptor,
    index: EnumIndex,
}

struct EnumDescriptorInner {
    id: Identity,
    parent: Option<MessageIndex>,
    values: Vec<EnumValueDescriptorInner>,
    value_numbers: BTreeMap<i32, EnumValueIndex>,
    value_names: HashMap<Box<str>, EnumValueIndex>,
}

/// A value in a protobuf enum type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EnumValueDescriptor {
    parent: EnumDescriptor,
    index: EnumValueIndex,
}

struct EnumValueDescriptorInner {
    id: Identity,
    number: i32,
}

/// A protobuf service definition.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    file: FileDescriptor,
    index: ServiceIndex,
}

struct ServiceDescriptorInner {
    id: Identity,
    methods: Vec<MethodDescriptorInner>,
}

/// A method definition for a [`ServiceDescriptor`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    service: ServiceDescriptor,
    index: MethodIndex,
}

struct MethodDescriptorInner {
    id: Identity,
    input: TypeRef,
    output: TypeRef,
}

impl TypeRef {
    const UNRESOLVED: TypeRef = TypeRef {
        file: FileRef::Local,
        index: DescriptorIndex::MAX,
    };

    fn local(index: DescriptorIndex) -> Self {
        TypeRef {
            file: FileRef::Local,
            index,
        }
    }
}

impl Identity {
    fn new(path: &[i32], full_name: &str, name: &str) -> Identity {
        let name_start = full_name.len() - name.len();
        debug_assert_eq!(&full_name[name_start..], name);
        debug_assert!(name_start == 0 || full_name[..name_start].ends_with('.'));
        Identity {
            path: path.into(),
            full_name: full_name.into(),
            name_start,
        }
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn name(&self) -> &str {
        &self.full_name[self.name_start..]
    }
}

/// Generates the conversions between the scalar variants of [`Kind`], [`KindIndex`] and
/// [`Type`], which all share the same names.
macro_rules! scalar_kinds {
    ($($variant:ident => $keyword:literal,)*) => {
        impl Kind {
            fn new(file: &FileDescriptor, kind: KindIndex) -> Self {
                match kind {
                    $(KindIndex::$variant => Kind::$variant,)*
                    KindIndex::Message(ty) | KindIndex::Group(ty) => {
                        Kind::Message(file.resolve_message(ty))
                    }
                    KindIndex::Enum(ty) => Kind::Enum(file.resolve_enum(ty)),
                }
            }
        }

        impl fmt::Debug for Kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Kind::$variant => f.write_str($keyword),)*
                    Kind::Message(desc) => f.write_str(desc.full_name()),
                    Kind::Enum(desc) => f.write_str(desc.full_name()),
                }
            }
        }

        impl KindIndex {
            /// The kind of a field whose `type_name` is empty, or `None` if its type needs one.
            fn scalar(ty: Type) -> Option<Self> {
                match ty {
                    $(Type::$variant => Some(KindIndex::$variant),)*
                    Type::Message | Type::Group | Type::Enum => None,
                }
            }
        }

        impl fmt::Debug for KindIndex {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(KindIndex::$variant => f.write_str($keyword),)*
                    KindIndex::Message(_) => f.write_str("message"),
                    KindIndex::Group(_) => f.write_str("group"),
                    KindIndex::Enum(_) => f.write_str("enum"),
                }
            }
        }
    };
}

scalar_kinds! {
    Double => "double",
    Float => "float",
    Int32 => "int32",
    Int64 => "int64",
    Uint32 => "uint32",
    Uint64 => "uint64",
    Sint32 => "sint32",
    Sint64 => "sint64",
    Fixed32 => "fixed32",
    Fixed64 => "fixed64",
    Sfixed32 => "sfixed32",
    Sfixed64 => "sfixed64",
    Bool => "bool",
    String => "string",
    Bytes => "bytes",
}

impl KindIndex {
    /// Only types with a fixed-size or varint encoding can be packed.
    fn is_packable(&self) -> bool {
        !matches!(
            self,
            KindIndex::String | KindIndex::Bytes | KindIndex::Message(_) | KindIndex::Group(_)
        )
    }

    fn is_message(&self) -> bool {
        matches!(self, KindIndex::Message(_) | KindIndex::Group(_))
    }
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        })
    }
}

impl FileDescriptorInner {
    /// Finds a definition of this file by its fully qualified name. A leading `.` is optional.
    fn definition(&self, name: &str) -> Option<&Definition> {
        self.names.get(name.strip_prefix('.').unwrap_or(name))
    }
}

fn to_index(i: usize) -> DescriptorIndex {
    i.try_into().expect("index too large")
}

/// Follows a `source_code_info` path of the form `[4, i, 3, j, 3, k, ..]` to a message.
fn find_message_proto<'a>(file: &'a FileDescriptorProto, path: &[i32]) -> &'a DescriptorProto {
    debug_assert!(!path.is_empty() && path.len() % 2 == 0);
    debug_assert_eq!(path[0], tag::file::MESSAGE_TYPE);

    path[2..]
        .chunks_exact(2)
        .fold(&file.message_type[path[1] as usize], |message, step| {
            debug_assert_eq!(step[0], tag::message::NESTED_TYPE);
            &message.nested_type[step[1] as usize]
        })
}

/// Follows a `source_code_info` path to an enum declared at the top level or within a message.
fn find_enum_proto<'a>(file: &'a FileDescriptorProto, path: &[i32]) -> &'a EnumDescriptorProto {
    let (scope, last) = path.split_at(path.len() - 2);
    let enums = if scope.is_empty() {
        debug_assert_eq!(last[0], tag::file::ENUM_TYPE);
        &file.enum_type
    } else {
        debug_assert_eq!(last[0], tag::message::ENUM_TYPE);
        &find_message_proto(file, scope).enum_type
    };
    &enums[last[1] as usize]
}

#[test]
fn handles_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<FileDescriptor>();
    assert_send_sync::<MessageDescriptor>();
    assert_send_sync::<FieldDescriptor>();
    assert_send_sync::<FileSet>();
    assert_send_sync::<Kind>();
    assert_send_sync::<DescriptorError>();
}
