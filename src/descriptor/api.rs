use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    sync::Arc,
};

use prost::{bytes::Buf, encoding::WireType, Message};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto};

use crate::{
    descriptor::{
        find_message_proto, tag, Cardinality, DefinitionKind, EnumDescriptorInner,
        EnumIndex, EnumValueDescriptorInner, FieldDescriptorInner, FieldIndex, FieldParent,
        FileRef, KindIndex, MessageDescriptorInner, MessageIndex, MethodDescriptorInner,
        OneofDescriptorInner, OneofIndex, ServiceDescriptorInner, ServiceIndex, Symbol, Syntax,
        TypeRef, MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER,
    },
    DescriptorError, EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, Kind,
    MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor, Value,
};

/// Implements `name` and `full_name` for descriptors, which all keep an `Identity`.
macro_rules! identity {
    ($($desc:ident => $what:literal, $example:literal;)*) => {
        $(
            impl $desc {
                #[doc = concat!("The name of this ", $what, " within its scope, such as `", $example, "`.")]
                pub fn name(&self) -> &str {
                    self.inner().id.name()
                }

                #[doc = concat!("The fully qualified name of this ", $what, ", without a leading `.`.")]
                pub fn full_name(&self) -> &str {
                    self.inner().id.full_name()
                }
            }
        )*
    };
}

identity! {
    MessageDescriptor => "message", "Outer";
    FieldDescriptor => "field", "count";
    OneofDescriptor => "oneof", "kind";
    EnumDescriptor => "enum", "Color";
    EnumValueDescriptor => "enum value", "RED";
    ServiceDescriptor => "service", "Store";
    MethodDescriptor => "method", "Fetch";
}

impl Kind {
    /// The message type, for [`Kind::Message`].
    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            Kind::Message(desc) => Some(desc),
            _ => None,
        }
    }

    /// The wire type of one value of this type. Group fields are the exception, see
    /// [`FieldDescriptor::wire_type`].
    pub fn wire_type(&self) -> WireType {
        match self {
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::SixtyFourBit,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::ThirtyTwoBit,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::LengthDelimited,
            _ => WireType::Varint,
        }
    }
}

impl FileDescriptor {
    /// Links a [`FileDescriptorProto`] against the already built files it imports.
    ///
    /// `dependencies` must contain exactly one file for each entry of
    /// [`FileDescriptorProto::dependency`], in the same order. Every type name referenced by the
    /// file is resolved against its own definitions and the definitions visible through its
    /// imports, and the file is checked for duplicate names, invalid field numbers and other
    /// structural errors.
    pub fn new(
        file: FileDescriptorProto,
        dependencies: &[FileDescriptor],
    ) -> Result<Self, DescriptorError> {
        FileDescriptor::build(file, dependencies)
    }

    /// Decodes a serialized [`FileDescriptorProto`] and links it like [`FileDescriptor::new`].
    pub fn decode<B>(bytes: B, dependencies: &[FileDescriptor]) -> Result<Self, DescriptorError>
    where
        B: Buf,
    {
        let file = FileDescriptorProto::decode(bytes).map_err(DescriptorError::decode)?;
        FileDescriptor::new(file, dependencies)
    }

    /// The path of this file within its source tree, such as `shop/order.proto`.
    pub fn name(&self) -> &str {
        self.inner.raw.name()
    }

    /// The declared package, or an empty string.
    pub fn package_name(&self) -> &str {
        self.inner.raw.package()
    }

    pub fn syntax(&self) -> Syntax {
        self.inner.syntax
    }

    /// The files named by `import` statements, in declaration order.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        (0..self.inner.dependencies.len()).map(move |index| self.dependency(index))
    }

    /// The files imported with `import public`.
    pub fn public_dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        self.inner
            .raw
            .public_dependency
            .iter()
            .map(move |&index| self.dependency(index as usize))
    }

    /// The files imported with `import weak`.
    pub fn weak_dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        self.inner
            .raw
            .weak_dependency
            .iter()
            .map(move |&index| self.dependency(index as usize))
    }

    /// Messages declared at the top level of this file.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        let top_level: Vec<_> = (0..self.inner.messages.len())
            .filter(|&index| self.inner.messages[index].parent.is_none())
            .map(|index| self.message_at(index as MessageIndex))
            .collect();
        top_level.into_iter()
    }

    /// Enums declared at the top level of this file.
    pub fn enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        let top_level: Vec<_> = (0..self.inner.enums.len())
            .filter(|&index| self.inner.enums[index].parent.is_none())
            .map(|index| self.enum_at(index as EnumIndex))
            .collect();
        top_level.into_iter()
    }

    /// Extensions declared at the top level of this file. See also
    /// [`all_extensions`](Self::all_extensions).
    pub fn extensions(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner
            .extensions
            .iter()
            .map(move |&index| self.field_at(index))
    }

    pub fn services(&self) -> impl ExactSizeIterator<Item = ServiceDescriptor> + '_ {
        (0..self.inner.services.len()).map(move |index| self.service_at(index as ServiceIndex))
    }

    /// Every message of this file at any depth, including the entry types generated for map
    /// fields.
    pub fn all_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        (0..self.inner.messages.len()).map(move |index| self.message_at(index as MessageIndex))
    }

    /// Every extension of this file, including those declared inside a message.
    pub fn all_extensions(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        (0..self.inner.fields.len())
            .filter(move |&index| {
                matches!(self.inner.fields[index].parent, FieldParent::Extension { .. })
            })
            .map(move |index| self.field_at(index as FieldIndex))
    }

    /// Finds a message declared here or in a transitive import.
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.find_symbol(name)?.into_message()
    }

    /// Finds an enum declared here or in a transitive import.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Enum(desc) => Some(desc),
            _ => None,
        }
    }

    /// Finds a service declared here or in a transitive import.
    pub fn get_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Service(desc) => Some(desc),
            _ => None,
        }
    }

    /// Finds an extension declared here or in a transitive import. Regular fields are not
    /// returned.
    pub fn get_extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Field(desc) if desc.is_extension() => Some(desc),
            _ => None,
        }
    }

    /// Looks up a named element defined in this file or in any file it transitively imports.
    ///
    /// A leading `.` on the name is ignored. Package names are not symbols, so looking one up
    /// returns `None`.
    pub fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.find_local_symbol(name).or_else(|| {
            self.inner
                .imports
                .iter()
                .find_map(|import| import.find_local_symbol(name))
        })
    }

    /// Looks up a named element defined in this file only.
    pub(crate) fn find_local_symbol(&self, name: &str) -> Option<Symbol> {
        let symbol = match self.inner.definition(name)?.kind {
            DefinitionKind::Package => return None,
            DefinitionKind::Message(index) => Symbol::Message(self.message_at(index)),
            DefinitionKind::Field(index) | DefinitionKind::Extension(index) => {
                Symbol::Field(self.field_at(index))
            }
            DefinitionKind::Oneof(index) => Symbol::Oneof(self.oneof_at(index)),
            DefinitionKind::Enum(index) => Symbol::Enum(self.enum_at(index)),
            DefinitionKind::EnumValue(parent, index) => Symbol::EnumValue(EnumValueDescriptor {
                parent: self.enum_at(parent),
                index,
            }),
            DefinitionKind::Service(index) => Symbol::Service(self.service_at(index)),
            DefinitionKind::Method(service, index) => Symbol::Method(MethodDescriptor {
                service: self.service_at(service),
                index,
            }),
        };
        Some(symbol)
    }

    /// The proto this file was linked from, normalized so that every type name is fully
    /// qualified and every field has a `json_name`.
    pub fn file_descriptor_proto(&self) -> &FileDescriptorProto {
        &self.inner.raw
    }

    /// Serializes [`file_descriptor_proto`](Self::file_descriptor_proto).
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.inner.raw.encode_to_vec()
    }

    fn dependency(&self, index: usize) -> FileDescriptor {
        let import = self.inner.dependencies[index];
        self.inner.imports[import as usize].clone()
    }

    pub(super) fn message_at(&self, index: MessageIndex) -> MessageDescriptor {
        MessageDescriptor {
            file: self.clone(),
            index,
        }
    }

    pub(super) fn field_at(&self, index: FieldIndex) -> FieldDescriptor {
        FieldDescriptor {
            file: self.clone(),
            index,
        }
    }

    fn oneof_at(&self, index: OneofIndex) -> OneofDescriptor {
        OneofDescriptor {
            file: self.clone(),
            index,
        }
    }

    fn enum_at(&self, index: EnumIndex) -> EnumDescriptor {
        EnumDescriptor {
            file: self.clone(),
            index,
        }
    }

    fn service_at(&self, index: ServiceIndex) -> ServiceDescriptor {
        ServiceDescriptor {
            file: self.clone(),
            index,
        }
    }

    /// The file a reference made from this file points into.
    fn referenced_file(&self, file: FileRef) -> &FileDescriptor {
        match file {
            FileRef::Local => self,
            FileRef::Import(index) => &self.inner.imports[index as usize],
        }
    }

    pub(super) fn resolve_message(&self, ty: TypeRef) -> MessageDescriptor {
        self.referenced_file(ty.file).message_at(ty.index)
    }

    pub(super) fn resolve_enum(&self, ty: TypeRef) -> EnumDescriptor {
        self.referenced_file(ty.file).enum_at(ty.index)
    }
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("name", &self.name())
            .field("package_name", &self.package_name())
            .field("syntax", &self.syntax())
            .finish()
    }
}

impl PartialEq for FileDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for FileDescriptor {}

impl Hash for FileDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state)
    }
}

impl Symbol {
    fn into_message(self) -> Option<MessageDescriptor> {
        match self {
            Symbol::Message(desc) => Some(desc),
            _ => None,
        }
    }
}

impl MessageDescriptor {
    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    /// The message this one is nested in, or `None` for a top level message.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.file.message_at(index))
    }

    /// The package of the file declaring this message.
    pub fn package_name(&self) -> &str {
        self.file.package_name()
    }

    /// The [`DescriptorProto`] within [`FileDescriptor::file_descriptor_proto`] that declares
    /// this message.
    pub fn descriptor_proto(&self) -> &DescriptorProto {
        find_message_proto(&self.file.inner.raw, &self.inner().id.path)
    }

    /// The fields of this message in declaration order. Extensions are not included.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner()
            .fields
            .iter()
            .map(move |&index| self.file.field_at(index))
    }

    /// The oneofs of this message, including the synthetic oneof of each proto3 `optional` field.
    pub fn oneofs(&self) -> impl ExactSizeIterator<Item = OneofDescriptor> + '_ {
        self.inner()
            .oneofs
            .iter()
            .map(move |&index| self.file.oneof_at(index))
    }

    /// Messages declared directly inside this one.
    pub fn child_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        self.inner()
            .messages
            .iter()
            .map(move |&index| self.file.message_at(index))
    }

    /// Enums declared directly inside this one.
    pub fn child_enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        self.inner()
            .enums
            .iter()
            .map(move |&index| self.file.enum_at(index))
    }

    /// Extensions declared inside this message. They usually extend a different message, see
    /// [`FieldDescriptor::containing_message`].
    pub fn child_extensions(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner()
            .extensions
            .iter()
            .map(move |&index| self.file.field_at(index))
    }

    /// The field with the given number. Extensions are not included.
    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        let index = *self.inner().field_numbers.get(&number)?;
        Some(self.file.field_at(index))
    }

    /// The field with the given name. Extensions are not included.
    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let index = *self.inner().field_names.get(name)?;
        Some(self.file.field_at(index))
    }

    /// The field whose [`json_name`](FieldDescriptor::json_name) is `json_name`.
    pub fn get_field_by_json_name(&self, json_name: &str) -> Option<FieldDescriptor> {
        let index = *self.inner().field_json_names.get(json_name)?;
        Some(self.file.field_at(index))
    }

    /// Whether this is the entry type generated for a map field. An entry type has exactly two
    /// fields, the key numbered 1 and the value numbered 2.
    pub fn is_map_entry(&self) -> bool {
        self.inner().is_map_entry
    }

    /// The key field of a [map entry](Self::is_map_entry).
    ///
    /// # Panics
    ///
    /// Panics if this is not a map entry.
    pub fn map_entry_key_field(&self) -> FieldDescriptor {
        self.map_entry_field(MAP_ENTRY_KEY_NUMBER)
    }

    /// The value field of a [map entry](Self::is_map_entry).
    ///
    /// # Panics
    ///
    /// Panics if this is not a map entry.
    pub fn map_entry_value_field(&self) -> FieldDescriptor {
        self.map_entry_field(MAP_ENTRY_VALUE_NUMBER)
    }

    /// The `reserved` field numbers, as half-open ranges.
    pub fn reserved_ranges(&self) -> impl ExactSizeIterator<Item = Range<u32>> + '_ {
        self.descriptor_proto()
            .reserved_range
            .iter()
            .map(|range| range.start() as u32..range.end() as u32)
    }

    /// The `reserved` field names.
    pub fn reserved_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.descriptor_proto()
            .reserved_name
            .iter()
            .map(String::as_str)
    }

    /// The field numbers declared with `extensions`, as half-open ranges.
    pub fn extension_ranges(&self) -> impl ExactSizeIterator<Item = Range<u32>> + '_ {
        self.descriptor_proto()
            .extension_range
            .iter()
            .map(|range| range.start() as u32..range.end() as u32)
    }

    /// Whether `number` falls in one of the extension ranges declared by this message.
    pub fn is_extension_number(&self, number: u32) -> bool {
        self.extension_ranges().any(|range| range.contains(&number))
    }

    fn map_entry_field(&self, number: u32) -> FieldDescriptor {
        match self.get_field(number) {
            Some(field) if self.is_map_entry() => field,
            _ => panic!("'{}' is not a map entry message", self.full_name()),
        }
    }

    pub(super) fn inner(&self) -> &MessageDescriptorInner {
        &self.file.inner.messages[self.index as usize]
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name())
            .field("is_map_entry", &self.is_map_entry())
            .field("fields", &self.fields().collect::<Vec<_>>())
            .field("oneofs", &self.oneofs().collect::<Vec<_>>())
            .finish()
    }
}

impl FieldDescriptor {
    /// The file declaring this field. For an extension this may differ from the file of the
    /// message it extends.
    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    /// The message this field is written inside of in the `.proto` source.
    ///
    /// This is the [`containing_message`](Self::containing_message) of a regular field. For an
    /// extension it is the message enclosing its `extend` block, or `None` when the block is at
    /// the top level of the file.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        match self.inner().parent {
            FieldParent::Message(index) => Some(self.file.message_at(index)),
            FieldParent::Extension { scope, .. } => scope.map(|index| self.file.message_at(index)),
        }
    }

    /// The message this field is a member of. For an extension this is the extended message.
    pub fn containing_message(&self) -> MessageDescriptor {
        match self.inner().parent {
            FieldParent::Message(index) => self.file.message_at(index),
            FieldParent::Extension { extendee, .. } => self.file.resolve_message(extendee),
        }
    }

    /// The [`FieldDescriptorProto`] within [`FileDescriptor::file_descriptor_proto`] that
    /// declares this field.
    pub fn field_descriptor_proto(&self) -> &FieldDescriptorProto {
        let file = &self.file.inner.raw;
        let (scope, last) = self.inner().id.path.split_at(self.inner().id.path.len() - 2);
        let index = last[1] as usize;
        match (scope.is_empty(), last[0]) {
            (true, _) => &file.extension[index],
            (false, tag::message::EXTENSION) => &find_message_proto(file, scope).extension[index],
            (false, _) => &find_message_proto(file, scope).field[index],
        }
    }

    pub fn number(&self) -> u32 {
        self.inner().number
    }

    /// The name of this field in JSON. Unless `json_name` is set explicitly it is the name in
    /// lower camel case. An extension uses its full name in brackets, such as `[pkg.note]`.
    pub fn json_name(&self) -> &str {
        &self.inner().json_name
    }

    /// Whether this field is declared with `group`, and so written between start and end group
    /// tags.
    pub fn is_group(&self) -> bool {
        matches!(self.inner().kind, KindIndex::Group(_))
    }

    /// Whether this is a repeated field other than a map.
    pub fn is_list(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && !self.is_map()
    }

    /// Whether this is a `map<K, V>` field: a repeated field whose message type is a
    /// [map entry](MessageDescriptor::is_map_entry).
    pub fn is_map(&self) -> bool {
        self.cardinality() == Cardinality::Repeated
            && self
                .kind()
                .as_message()
                .map_or(false, MessageDescriptor::is_map_entry)
    }

    /// Whether this list is written as a single length-delimited record.
    pub fn is_packed(&self) -> bool {
        self.inner().is_packed
    }

    pub fn is_extension(&self) -> bool {
        matches!(self.inner().parent, FieldParent::Extension { .. })
    }

    pub fn cardinality(&self) -> Cardinality {
        self.inner().cardinality
    }

    /// Whether an unset field can be told apart from one set to its default value.
    ///
    /// True for proto3 `optional` fields, oneof members and every non-repeated message field. In
    /// proto2 files, and for extensions, all non-repeated fields track presence.
    pub fn supports_presence(&self) -> bool {
        self.inner().supports_presence
    }

    pub fn kind(&self) -> Kind {
        Kind::new(&self.file, self.inner().kind)
    }

    /// The wire type each value of this field is written with, ignoring packing.
    ///
    /// This is [`WireType::StartGroup`] for group fields and [`Kind::wire_type`] otherwise.
    pub fn wire_type(&self) -> WireType {
        if self.is_group() {
            WireType::StartGroup
        } else {
            self.kind().wire_type()
        }
    }

    /// The oneof this field is a member of, if any.
    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        self.inner().oneof.map(|index| self.file.oneof_at(index))
    }

    /// The value of the `default` option, which only proto2 fields may declare.
    pub fn default_value(&self) -> Option<&Value> {
        self.inner().default.as_ref()
    }

    pub(crate) fn is_packable(&self) -> bool {
        self.inner().kind.is_packable()
    }

    pub(super) fn is_map_entry_field(&self) -> bool {
        match self.inner().parent {
            FieldParent::Message(index) => self.file.inner.messages[index as usize].is_map_entry,
            FieldParent::Extension { .. } => false,
        }
    }

    pub(super) fn inner(&self) -> &FieldDescriptorInner {
        &self.file.inner.fields[self.index as usize]
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FieldDescriptor");
        debug
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .field("kind", &self.kind())
            .field("cardinality", &self.cardinality());
        if let Some(oneof) = self.containing_oneof() {
            debug.field("oneof", &oneof.name());
        }
        if let Some(default) = self.default_value() {
            debug.field("default_value", default);
        }
        debug
            .field("is_extension", &self.is_extension())
            .field("is_packed", &self.is_packed())
            .field("supports_presence", &self.supports_presence())
            .finish()
    }
}

impl OneofDescriptor {
    pub fn parent_message(&self) -> MessageDescriptor {
        self.file.message_at(self.inner().message)
    }

    /// The members of this oneof, in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner()
            .fields
            .iter()
            .map(move |&index| self.file.field_at(index))
    }

    /// Whether this oneof was generated for a proto3 `optional` field rather than written in the
    /// source.
    pub fn is_synthetic(&self) -> bool {
        self.inner().is_synthetic
    }

    pub(super) fn inner(&self) -> &OneofDescriptorInner {
        &self.file.inner.oneofs[self.index as usize]
    }
}

impl fmt::Debug for OneofDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneofDescriptor")
            .field("full_name", &self.full_name())
            .field("fields", &self.fields().map(|field| field.number()).collect::<Vec<_>>())
            .field("is_synthetic", &self.is_synthetic())
            .finish()
    }
}

impl EnumDescriptor {
    /// The value unset enum fields read as: the first declared value.
    pub fn default_value(&self) -> EnumValueDescriptor {
        self.value_at(0)
    }

    /// The value with the given name. Names of enum values are scoped as siblings of their enum,
    /// but this lookup takes only the unqualified name.
    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        let index = *self.inner().value_names.get(name)?;
        Some(self.value_at(index))
    }

    /// The value with the given number. Where `allow_alias` gives several values the same
    /// number, the first declared is returned.
    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        let index = *self.inner().value_numbers.get(&number)?;
        Some(self.value_at(index))
    }

    /// The values of this enum in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDescriptor> + '_ {
        (0..self.inner().values.len()).map(move |index| self.value_at(index as u32))
    }

    fn value_at(&self, index: u32) -> EnumValueDescriptor {
        EnumValueDescriptor {
            parent: self.clone(),
            index,
        }
    }

    pub(super) fn inner(&self) -> &EnumDescriptorInner {
        &self.file.inner.enums[self.index as usize]
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name())
            .field("values", &self.values().collect::<Vec<_>>())
            .finish()
    }
}

impl EnumValueDescriptor {
    pub fn parent_enum(&self) -> &EnumDescriptor {
        &self.parent
    }

    pub fn number(&self) -> i32 {
        self.inner().number
    }

    pub(super) fn inner(&self) -> &EnumValueDescriptorInner {
        &self.parent.inner().values[self.index as usize]
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name(), self.number())
    }
}

impl ServiceDescriptor {
    /// The methods of this service in declaration order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDescriptor> + '_ {
        (0..self.inner().methods.len()).map(move |index| MethodDescriptor {
            service: self.clone(),
            index: index as u32,
        })
    }

    pub(super) fn inner(&self) -> &ServiceDescriptorInner {
        &self.file.inner.services[self.index as usize]
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("full_name", &self.full_name())
            .field("methods", &self.methods().collect::<Vec<_>>())
            .finish()
    }
}

impl MethodDescriptor {
    /// The request message type.
    pub fn input(&self) -> MessageDescriptor {
        self.service.file.resolve_message(self.inner().input)
    }

    /// The response message type.
    pub fn output(&self) -> MessageDescriptor {
        self.service.file.resolve_message(self.inner().output)
    }

    /// Whether the request is declared as a `stream`.
    pub fn is_client_streaming(&self) -> bool {
        self.method_proto().client_streaming()
    }

    /// Whether the response is declared as a `stream`.
    pub fn is_server_streaming(&self) -> bool {
        self.method_proto().server_streaming()
    }

    fn method_proto(&self) -> &MethodDescriptorProto {
        let service = &self.service.file.inner.raw.service[self.service.index as usize];
        &service.method[self.index as usize]
    }

    pub(super) fn inner(&self) -> &MethodDescriptorInner {
        &self.service.inner().methods[self.index as usize]
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}{}) returns ({}{})",
            self.name(),
            if self.is_client_streaming() { "stream " } else { "" },
            self.input().full_name(),
            if self.is_server_streaming() { "stream " } else { "" },
            self.output().full_name(),
        )
    }
}
