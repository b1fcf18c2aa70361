use std::{
    collections::{hash_map, BTreeMap, HashMap},
    mem,
};

use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};

use crate::{
    descriptor::{
        build::{
            join_path,
            visit::{visit, Visitor},
            ImportScope,
        },
        error::{DescriptorError, DescriptorErrorKind, Label},
        tag, to_index, Cardinality, Definition, DefinitionKind, EnumDescriptorInner, EnumIndex,
        EnumValueDescriptorInner, EnumValueIndex, FieldDescriptorInner, FieldIndex, FieldParent,
        FileDescriptorInner, Identity, KindIndex, MessageDescriptorInner, MessageIndex,
        MethodDescriptorInner, MethodIndex, OneofDescriptorInner, OneofIndex,
        ServiceDescriptorInner, ServiceIndex, TypeRef, MAP_ENTRY_KEY_NUMBER,
        MAP_ENTRY_VALUE_NUMBER,
    },
    Syntax,
};

impl FileDescriptorInner {
    /// Creates a placeholder for every definition in the file and records its name, so that the
    /// second pass can resolve forward and recursive references.
    pub(super) fn collect_names(&mut self, scope: &ImportScope<'_>) -> Result<(), DescriptorError> {
        let raw = mem::take(&mut self.raw);

        let mut visitor = NameVisitor {
            raw: &raw,
            file: self,
            errors: vec![],
        };
        visit(&raw, &mut visitor);
        visitor.check_import_conflicts(scope);
        let errors = visitor.errors;

        self.raw = raw;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DescriptorError::new(errors))
        }
    }
}

struct NameVisitor<'a> {
    raw: &'a FileDescriptorProto,
    file: &'a mut FileDescriptorInner,
    errors: Vec<DescriptorErrorKind>,
}

impl Visitor for NameVisitor<'_> {
    fn visit_file(&mut self, path: &[i32], file: &FileDescriptorProto) {
        if !file.package().is_empty() {
            for (i, _) in file.package().match_indices('.') {
                self.add_name(
                    &file.package()[..i],
                    path,
                    &[tag::file::PACKAGE],
                    DefinitionKind::Package,
                );
            }
            self.add_name(
                file.package(),
                path,
                &[tag::file::PACKAGE],
                DefinitionKind::Package,
            );
        }
    }

    fn visit_message(
        &mut self,
        path: &[i32],
        full_name: &str,
        parent: Option<MessageIndex>,
        index: MessageIndex,
        message: &DescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::message::NAME],
            DefinitionKind::Message(index),
        );

        let is_map_entry = message
            .options
            .as_ref()
            .map_or(false, |options| options.map_entry());
        if is_map_entry {
            self.check_map_entry(path, full_name, message);
        }

        debug_assert_eq!(to_index(self.file.messages.len()), index);
        self.file.messages.push(MessageDescriptorInner {
            id: Identity::new(path, full_name, message.name()),
            parent,
            fields: Vec::with_capacity(message.field.len()),
            field_numbers: BTreeMap::new(),
            field_names: HashMap::with_capacity(message.field.len()),
            field_json_names: HashMap::with_capacity(message.field.len()),
            oneofs: Vec::with_capacity(message.oneof_decl.len()),
            messages: Vec::with_capacity(message.nested_type.len()),
            enums: Vec::with_capacity(message.enum_type.len()),
            extensions: Vec::with_capacity(message.extension.len()),
            is_map_entry,
        });
        if let Some(parent) = parent {
            self.file.messages[parent as usize].messages.push(index);
        }
    }

    fn visit_field(
        &mut self,
        path: &[i32],
        full_name: &str,
        message: MessageIndex,
        index: FieldIndex,
        field: &FieldDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::field::NAME],
            DefinitionKind::Field(index),
        );

        debug_assert_eq!(to_index(self.file.fields.len()), index);
        self.file
            .fields
            .push(placeholder_field(path, full_name, field, FieldParent::Message(message)));
        self.file.messages[message as usize].fields.push(index);
    }

    fn visit_oneof(
        &mut self,
        path: &[i32],
        full_name: &str,
        message: MessageIndex,
        index: OneofIndex,
        oneof: &OneofDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::oneof::NAME],
            DefinitionKind::Oneof(index),
        );

        debug_assert_eq!(to_index(self.file.oneofs.len()), index);
        self.file.oneofs.push(OneofDescriptorInner {
            id: Identity::new(path, full_name, oneof.name()),
            message,
            fields: Vec::new(),
            is_synthetic: false,
        });
        self.file.messages[message as usize].oneofs.push(index);
    }

    fn visit_service(
        &mut self,
        path: &[i32],
        full_name: &str,
        index: ServiceIndex,
        service: &ServiceDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::service::NAME],
            DefinitionKind::Service(index),
        );

        debug_assert_eq!(to_index(self.file.services.len()), index);
        self.file.services.push(ServiceDescriptorInner {
            id: Identity::new(path, full_name, service.name()),
            methods: Vec::with_capacity(service.method.len()),
        });
    }

    fn visit_method(
        &mut self,
        path: &[i32],
        full_name: &str,
        service: ServiceIndex,
        index: MethodIndex,
        method: &MethodDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::method::NAME],
            DefinitionKind::Method(service, index),
        );

        let service = &mut self.file.services[service as usize];
        debug_assert_eq!(to_index(service.methods.len()), index);
        service.methods.push(MethodDescriptorInner {
            id: Identity::new(path, full_name, method.name()),
            input: TypeRef::UNRESOLVED,
            output: TypeRef::UNRESOLVED,
        });
    }

    fn visit_enum(
        &mut self,
        path: &[i32],
        full_name: &str,
        parent: Option<MessageIndex>,
        index: EnumIndex,
        enum_: &EnumDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::enum_::NAME],
            DefinitionKind::Enum(index),
        );

        if enum_.value.is_empty() {
            self.errors.push(DescriptorErrorKind::EmptyEnum {
                found: Label::new(self.raw, "enum defined here", path.into()),
            });
        } else if self.file.syntax != Syntax::Proto2 && enum_.value[0].number() != 0 {
            self.errors
                .push(DescriptorErrorKind::InvalidProto3EnumDefault {
                    found: Label::new(
                        self.raw,
                        "defined here",
                        join_path(path, &[tag::enum_::VALUE, 0, tag::enum_value::NUMBER]),
                    ),
                });
        }

        debug_assert_eq!(to_index(self.file.enums.len()), index);
        self.file.enums.push(EnumDescriptorInner {
            id: Identity::new(path, full_name, enum_.name()),
            parent,
            values: Vec::with_capacity(enum_.value.len()),
            value_numbers: BTreeMap::new(),
            value_names: HashMap::with_capacity(enum_.value.len()),
        });
        if let Some(parent) = parent {
            self.file.messages[parent as usize].enums.push(index);
        }
    }

    fn visit_enum_value(
        &mut self,
        path: &[i32],
        full_name: &str,
        enum_: EnumIndex,
        index: EnumValueIndex,
        value: &EnumValueDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::enum_value::NAME],
            DefinitionKind::EnumValue(enum_, index),
        );

        let enum_ = &mut self.file.enums[enum_ as usize];
        debug_assert_eq!(to_index(enum_.values.len()), index);
        enum_.values.push(EnumValueDescriptorInner {
            id: Identity::new(path, full_name, value.name()),
            number: value.number(),
        });
    }

    fn visit_extension(
        &mut self,
        path: &[i32],
        full_name: &str,
        parent: Option<MessageIndex>,
        index: FieldIndex,
        extension: &FieldDescriptorProto,
    ) {
        self.add_name(
            full_name,
            path,
            &[tag::field::NAME],
            DefinitionKind::Extension(index),
        );

        debug_assert_eq!(to_index(self.file.fields.len()), index);
        self.file.fields.push(placeholder_field(
            path,
            full_name,
            extension,
            FieldParent::Extension {
                extendee: TypeRef::UNRESOLVED,
                scope: parent,
            },
        ));
        match parent {
            Some(parent) => self.file.messages[parent as usize].extensions.push(index),
            None => self.file.extensions.push(index),
        }
    }
}

impl NameVisitor<'_> {
    fn add_name(&mut self, name: &str, path1: &[i32], path2: &[i32], kind: DefinitionKind) {
        let path = join_path(path1, path2);

        match self.file.names.entry(name.into()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(Definition { kind, path });
            }
            hash_map::Entry::Occupied(entry) => {
                let first = entry.get();
                if matches!(kind, DefinitionKind::Package)
                    && matches!(first.kind, DefinitionKind::Package)
                {
                    return;
                }

                self.errors.push(DescriptorErrorKind::DuplicateName {
                    name: name.to_owned(),
                    first: Label::new(self.raw, "first defined here", first.path.clone()),
                    second: Label::new(self.raw, "defined again here", path),
                })
            }
        }
    }

    /// Symbols must be unique across the file and everything it imports.
    fn check_import_conflicts(&mut self, scope: &ImportScope<'_>) {
        let mut conflicts: Vec<_> = self
            .file
            .names
            .iter()
            .filter_map(|(name, def)| {
                let &(import, first) = scope.names.get(name.as_ref())?;
                if matches!(def.kind, DefinitionKind::Package)
                    && matches!(first.kind, DefinitionKind::Package)
                {
                    None
                } else {
                    Some((name, def, import, first))
                }
            })
            .collect();
        conflicts.sort_by(|l, r| l.1.path.cmp(&r.1.path));

        for (name, def, import, first) in conflicts {
            self.errors.push(DescriptorErrorKind::DuplicateName {
                name: name.to_string(),
                first: Label::new(
                    &scope.imports[import as usize].inner.raw,
                    "first defined here",
                    first.path.clone(),
                ),
                second: Label::new(self.raw, "defined again here", def.path.clone()),
            });
        }
    }

    fn check_map_entry(&mut self, path: &[i32], full_name: &str, message: &DescriptorProto) {
        let key = message
            .field
            .iter()
            .find(|f| f.number() as u32 == MAP_ENTRY_KEY_NUMBER);
        let value = message
            .field
            .iter()
            .find(|f| f.number() as u32 == MAP_ENTRY_VALUE_NUMBER);

        let reason = match (key, value) {
            _ if message.field.len() != 2 => Some("map entry messages must have exactly two fields"),
            (Some(key), Some(value)) => {
                if key.name() != "key" || value.name() != "value" {
                    Some("map entry fields must be named 'key' and 'value'")
                } else if key.label() == field_descriptor_proto::Label::Repeated
                    || value.label() == field_descriptor_proto::Label::Repeated
                {
                    Some("map entry fields must not be repeated")
                } else if !is_valid_map_key(key) {
                    Some("map keys must be integral, boolean or string types")
                } else {
                    None
                }
            }
            _ => Some("map entry fields must be numbered 1 and 2"),
        };

        if let Some(reason) = reason {
            self.errors.push(DescriptorErrorKind::InvalidMapEntry {
                message: full_name.to_owned(),
                reason,
                found: Label::new(self.raw, "defined here", path.into()),
            });
        }
    }
}

fn is_valid_map_key(key: &FieldDescriptorProto) -> bool {
    use field_descriptor_proto::Type;

    match key.r#type {
        None => key.type_name().is_empty(),
        Some(_) => !matches!(
            key.r#type(),
            Type::Float | Type::Double | Type::Bytes | Type::Message | Type::Group | Type::Enum
        ),
    }
}

fn placeholder_field(
    path: &[i32],
    full_name: &str,
    field: &FieldDescriptorProto,
    parent: FieldParent,
) -> FieldDescriptorInner {
    FieldDescriptorInner {
        id: Identity::new(path, full_name, field.name()),
        parent,
        number: field.number() as u32,
        json_name: Box::default(),
        kind: KindIndex::Double,
        cardinality: match field.label() {
            field_descriptor_proto::Label::Optional => Cardinality::Optional,
            field_descriptor_proto::Label::Required => Cardinality::Required,
            field_descriptor_proto::Label::Repeated => Cardinality::Repeated,
        },
        oneof: None,
        is_packed: false,
        supports_presence: false,
        default: None,
    }
}
