use std::{
    collections::{btree_map, hash_map, HashMap},
    mem,
};

use prost::bytes::Bytes;
use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MethodDescriptorProto,
};

use crate::{
    descriptor::{
        build::{
            join_path, resolve_name, to_json_name,
            visit::{visit, Visitor},
            ImportScope, ResolveNameFilter,
        },
        error::{DescriptorError, DescriptorErrorKind, Label},
        find_enum_proto, find_message_proto, tag, Cardinality, DefinitionKind,
        EnumDescriptorInner, EnumIndex, EnumValueIndex, FieldIndex, FieldParent,
        FileDescriptorInner, FileRef, Identity, KindIndex, MessageIndex, MethodIndex,
        ServiceIndex, TypeRef, RESERVED_MESSAGE_FIELD_NUMBERS, VALID_MESSAGE_FIELD_NUMBERS,
    },
    Syntax, Value,
};

impl FileDescriptorInner {
    /// Binds every type reference to its definition and computes the derived properties of
    /// fields and enums.
    pub(super) fn resolve_names(&mut self, scope: &ImportScope<'_>) -> Result<(), DescriptorError> {
        let mut raw = mem::take(&mut self.raw);

        let mut visitor = ResolveVisitor {
            raw: &raw,
            file: self,
            scope,
            errors: vec![],
            fixups: vec![],
            extension_numbers: HashMap::new(),
        };
        visit(&raw, &mut visitor);
        let ResolveVisitor { errors, fixups, .. } = visitor;

        for fixup in fixups {
            fixup.apply(&mut raw);
        }
        self.raw = raw;

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DescriptorError::new(errors))
        }
    }
}

struct ResolveVisitor<'a, 'b> {
    raw: &'a FileDescriptorProto,
    file: &'a mut FileDescriptorInner,
    scope: &'a ImportScope<'b>,
    errors: Vec<DescriptorErrorKind>,
    /// Changes to make to the raw descriptor once the walk is complete, so that it holds fully
    /// qualified type names and JSON names.
    fixups: Vec<Fixup>,
    extension_numbers: HashMap<(TypeRef, u32), FieldIndex>,
}

enum Fixup {
    TypeName {
        path: Box<[i32]>,
        tag: i32,
        type_name: String,
        ty: field_descriptor_proto::Type,
    },
    JsonName {
        path: Box<[i32]>,
        json_name: String,
    },
}

impl Visitor for ResolveVisitor<'_, '_> {
    fn visit_field(
        &mut self,
        path: &[i32],
        full_name: &str,
        message: MessageIndex,
        index: FieldIndex,
        field: &FieldDescriptorProto,
    ) {
        let syntax = self.file.syntax;

        self.check_field_number(TypeRef::local(message), field, path);
        self.check_label(field, path);

        let kind = self.resolve_field_type(field.r#type(), field.type_name(), full_name, path);
        let json_name: Box<str> = self.resolve_field_json_name(field, path).into();
        let cardinality = self.file.fields[index as usize].cardinality;

        let is_packed = cardinality == Cardinality::Repeated
            && kind.map_or(false, |k| k.is_packable())
            && field
                .options
                .as_ref()
                .and_then(|o| o.packed)
                .unwrap_or(syntax == Syntax::Proto3);

        let supports_presence = field.proto3_optional()
            || field.oneof_index.is_some()
            || (cardinality != Cardinality::Repeated
                && (kind.map_or(false, |k| k.is_message()) || syntax == Syntax::Proto2));

        let default = kind.and_then(|kind| {
            self.parse_field_default_value(kind, field.default_value.as_deref(), path)
        });

        let oneofs = &self.file.messages[message as usize].oneofs;
        let oneof = match field.oneof_index {
            None => None,
            Some(oneof_index) => match usize::try_from(oneof_index)
                .ok()
                .and_then(|i| oneofs.get(i))
            {
                Some(&oneof) => Some(oneof),
                None => {
                    self.errors.push(DescriptorErrorKind::InvalidOneofIndex {
                        index: oneof_index,
                        found: Label::new(
                            self.raw,
                            "found here",
                            join_path(path, &[tag::field::ONEOF_INDEX]),
                        ),
                    });
                    None
                }
            },
        };
        if let Some(oneof) = oneof {
            let oneof = &mut self.file.oneofs[oneof as usize];
            oneof.fields.push(index);
            if field.proto3_optional() {
                oneof.is_synthetic = true;
            }
        }

        let inner = &mut self.file.fields[index as usize];
        inner.json_name = json_name.clone();
        inner.kind = kind.unwrap_or(KindIndex::Double);
        inner.oneof = oneof;
        inner.is_packed = is_packed;
        inner.supports_presence = supports_presence;
        inner.default = default;

        let fields = &self.file.fields;
        let message = &mut self.file.messages[message as usize];
        if let Some(existing) = message.field_numbers.insert(field.number() as u32, index) {
            self.errors.push(DescriptorErrorKind::DuplicateFieldNumber {
                number: field.number() as u32,
                first: Label::new(
                    self.raw,
                    "first defined here",
                    join_path(&fields[existing as usize].id.path, &[tag::field::NUMBER]),
                ),
                second: Label::new(
                    self.raw,
                    "defined again here",
                    join_path(path, &[tag::field::NUMBER]),
                ),
            });
        }
        message
            .field_names
            .entry(field.name().into())
            .or_insert(index);
        match message.field_json_names.entry(json_name) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(index);
            }
            hash_map::Entry::Occupied(entry) if syntax == Syntax::Proto3 => {
                self.errors
                    .push(DescriptorErrorKind::DuplicateFieldJsonName {
                        name: entry.key().to_string(),
                        first: Label::new(
                            self.raw,
                            "first defined here",
                            join_path(&fields[*entry.get() as usize].id.path, &[tag::field::NAME]),
                        ),
                        second: Label::new(
                            self.raw,
                            "defined again here",
                            join_path(path, &[tag::field::NAME]),
                        ),
                    });
            }
            hash_map::Entry::Occupied(_) => (),
        }
    }

    fn visit_method(
        &mut self,
        path: &[i32],
        full_name: &str,
        service: ServiceIndex,
        index: MethodIndex,
        method: &MethodDescriptorProto,
    ) {
        let input = self
            .find_message(full_name, method.input_type(), path, tag::method::INPUT_TYPE)
            .unwrap_or(TypeRef::UNRESOLVED);
        let output = self
            .find_message(full_name, method.output_type(), path, tag::method::OUTPUT_TYPE)
            .unwrap_or(TypeRef::UNRESOLVED);

        let method = &mut self.file.services[service as usize].methods[index as usize];
        method.input = input;
        method.output = output;
    }

    fn visit_enum_value(
        &mut self,
        path: &[i32],
        full_name: &str,
        enum_index: EnumIndex,
        index: EnumValueIndex,
        value: &EnumValueDescriptorProto,
    ) {
        self.check_enum_number(enum_index, value, path);

        let allow_alias = {
            let enum_proto = find_enum_proto(self.raw, &self.file.enums[enum_index as usize].id.path);
            enum_proto
                .options
                .as_ref()
                .map_or(false, |o| o.allow_alias())
        };

        let enum_ = &mut self.file.enums[enum_index as usize];
        match enum_.value_numbers.entry(value.number()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(index);
            }
            btree_map::Entry::Occupied(entry) => {
                if !allow_alias {
                    let existing = *entry.get();
                    self.errors.push(DescriptorErrorKind::DuplicateEnumNumber {
                        number: value.number(),
                        first: Label::new(
                            self.raw,
                            "first defined here",
                            join_path(
                                &enum_.values[existing as usize].id.path,
                                &[tag::enum_value::NUMBER],
                            ),
                        ),
                        second: Label::new(
                            self.raw,
                            "defined again here",
                            join_path(path, &[tag::enum_value::NUMBER]),
                        ),
                    });
                }
            }
        }

        debug_assert!(full_name.ends_with(value.name()));
        enum_.value_names.entry(value.name().into()).or_insert(index);
    }

    fn visit_extension(
        &mut self,
        path: &[i32],
        full_name: &str,
        _: Option<MessageIndex>,
        index: FieldIndex,
        extension: &FieldDescriptorProto,
    ) {
        let syntax = self.file.syntax;

        let extendee = if extension.extendee().is_empty() {
            self.add_missing_required_field_error(join_path(path, &[tag::field::EXTENDEE]));
            None
        } else {
            self.find_message(full_name, extension.extendee(), path, tag::field::EXTENDEE)
        };
        if let Some(extendee) = extendee {
            self.check_field_number(extendee, extension, path);

            if let Some(existing) = self
                .extension_numbers
                .insert((extendee, extension.number() as u32), index)
            {
                self.errors.push(DescriptorErrorKind::DuplicateFieldNumber {
                    number: extension.number() as u32,
                    first: Label::new(
                        self.raw,
                        "first defined here",
                        join_path(
                            &self.file.fields[existing as usize].id.path,
                            &[tag::field::NUMBER],
                        ),
                    ),
                    second: Label::new(
                        self.raw,
                        "defined again here",
                        join_path(path, &[tag::field::NUMBER]),
                    ),
                });
            }
        }
        self.check_label(extension, path);

        let kind = self.resolve_field_type(
            extension.r#type(),
            extension.type_name(),
            full_name,
            path,
        );
        let cardinality = self.file.fields[index as usize].cardinality;

        let is_packed = cardinality == Cardinality::Repeated
            && kind.map_or(false, |k| k.is_packable())
            && extension
                .options
                .as_ref()
                .and_then(|o| o.packed)
                .unwrap_or(syntax == Syntax::Proto3);

        let default = kind.and_then(|kind| {
            self.parse_field_default_value(kind, extension.default_value.as_deref(), path)
        });

        let inner = &mut self.file.fields[index as usize];
        if let FieldParent::Extension {
            extendee: target, ..
        } = &mut inner.parent
        {
            *target = extendee.unwrap_or(TypeRef::UNRESOLVED);
        }
        inner.json_name = format!("[{}]", full_name).into();
        inner.kind = kind.unwrap_or(KindIndex::Double);
        inner.is_packed = is_packed;
        inner.supports_presence = cardinality != Cardinality::Repeated;
        inner.default = default;
    }
}

impl ResolveVisitor<'_, '_> {
    fn check_field_number(&mut self, message: TypeRef, field: &FieldDescriptorProto, path: &[i32]) {
        let number = field.number();
        let found = || Label::new(self.raw, "defined here", join_path(path, &[tag::field::NUMBER]));

        let mut errors = Vec::new();
        if !VALID_MESSAGE_FIELD_NUMBERS.contains(&number)
            || RESERVED_MESSAGE_FIELD_NUMBERS.contains(&number)
        {
            errors.push(DescriptorErrorKind::InvalidFieldNumber {
                number,
                found: found(),
            });
        }

        let (message_file, message_id) = self.message_identity(message);
        let message_proto = find_message_proto(message_file, &message_id.path);
        for (i, range) in message_proto.reserved_range.iter().enumerate() {
            if range.start() <= number && number < range.end() {
                errors.push(DescriptorErrorKind::FieldNumberInReservedRange {
                    number,
                    range: range.start()..range.end(),
                    defined: Label::new(
                        message_file,
                        "reserved range defined here",
                        join_path(&message_id.path, &[tag::message::RESERVED_RANGE, i as i32]),
                    ),
                    found: found(),
                });
            }
        }

        let extension_range = message_proto
            .extension_range
            .iter()
            .enumerate()
            .find(|(_, range)| range.start() <= number && number < range.end());
        match (&field.extendee, extension_range) {
            (None, None) | (Some(_), Some(_)) => (),
            (None, Some((i, range))) => {
                errors.push(DescriptorErrorKind::FieldNumberInExtensionRange {
                    number,
                    range: range.start()..range.end(),
                    defined: Label::new(
                        message_file,
                        "extension range defined here",
                        join_path(&message_id.path, &[tag::message::EXTENSION_RANGE, i as i32]),
                    ),
                    found: found(),
                });
            }
            (Some(_), None) => {
                errors.push(DescriptorErrorKind::ExtensionNumberOutOfRange {
                    number,
                    message: message_id.full_name().to_owned(),
                    found: found(),
                });
            }
        }

        self.errors.extend(errors);
    }

    fn check_enum_number(
        &mut self,
        enum_: EnumIndex,
        value: &EnumValueDescriptorProto,
        path: &[i32],
    ) {
        let enum_ = &self.file.enums[enum_ as usize];
        let enum_proto = find_enum_proto(self.raw, &enum_.id.path);
        for (i, range) in enum_proto.reserved_range.iter().enumerate() {
            if range.start() <= value.number() && value.number() <= range.end() {
                self.errors
                    .push(DescriptorErrorKind::EnumNumberInReservedRange {
                        number: value.number(),
                        range: range.start()..range.end(),
                        defined: Label::new(
                            self.raw,
                            "reserved range defined here",
                            join_path(&enum_.id.path, &[tag::enum_::RESERVED_RANGE, i as i32]),
                        ),
                        found: Label::new(
                            self.raw,
                            "defined here",
                            join_path(path, &[tag::enum_value::NUMBER]),
                        ),
                    });
            }
        }
    }

    fn check_label(&mut self, field: &FieldDescriptorProto, path: &[i32]) {
        match self.file.syntax {
            Syntax::Proto3 if field.label() == field_descriptor_proto::Label::Required => {
                self.errors.push(DescriptorErrorKind::Proto3RequiredField {
                    found: Label::new(
                        self.raw,
                        "found here",
                        join_path(path, &[tag::field::LABEL]),
                    ),
                });
            }
            Syntax::Proto2 if field.proto3_optional() => {
                self.errors.push(DescriptorErrorKind::InvalidProto3Optional {
                    found: Label::new(
                        self.raw,
                        "found here",
                        join_path(path, &[tag::field::PROTO3_OPTIONAL]),
                    ),
                });
            }
            _ => (),
        }
    }

    fn resolve_field_json_name(&mut self, field: &FieldDescriptorProto, path: &[i32]) -> String {
        if let Some(json_name) = &field.json_name {
            json_name.clone()
        } else {
            let json_name = to_json_name(field.name());
            self.fixups.push(Fixup::JsonName {
                path: path.into(),
                json_name: json_name.clone(),
            });
            json_name
        }
    }

    fn resolve_field_type(
        &mut self,
        ty: field_descriptor_proto::Type,
        ty_name: &str,
        scope: &str,
        path: &[i32],
    ) -> Option<KindIndex> {
        if ty_name.is_empty() {
            let kind = KindIndex::scalar(ty);
            if kind.is_none() {
                self.add_missing_required_field_error(join_path(path, &[tag::field::TYPE_NAME]));
            }
            kind
        } else {
            let (file, def) = self.resolve_name(
                scope,
                ty_name,
                path,
                tag::field::TYPE_NAME,
                ResolveNameFilter::FieldType,
            )?;
            match def {
                DefinitionKind::Message(index) => {
                    let message = TypeRef { file, index };
                    if ty == field_descriptor_proto::Type::Group {
                        Some(KindIndex::Group(message))
                    } else {
                        Some(KindIndex::Message(message))
                    }
                }
                DefinitionKind::Enum(index) => Some(KindIndex::Enum(TypeRef { file, index })),
                _ => unreachable!(),
            }
        }
    }

    fn parse_field_default_value(
        &mut self,
        kind: KindIndex,
        default_value: Option<&str>,
        path: &[i32],
    ) -> Option<Value> {
        let default_value = default_value?;

        let result = match kind {
            KindIndex::Enum(enum_) => {
                let enum_ = self.enum_inner(enum_);
                match enum_.values.iter().find(|v| v.id.name() == default_value) {
                    Some(value) => Ok(Value::EnumNumber(value.number)),
                    None => Err(enum_.id.full_name().to_owned()),
                }
            }
            KindIndex::Message(_) | KindIndex::Group(_) => Err("message type".to_owned()),
            scalar => parse_simple_value(scalar, default_value).map_err(|_| format!("{:?}", scalar)),
        };

        match result {
            Ok(value) => Some(value),
            Err(kind) => {
                self.errors.push(DescriptorErrorKind::InvalidFieldDefault {
                    value: default_value.to_owned(),
                    kind,
                    found: Label::new(
                        self.raw,
                        "found here",
                        join_path(path, &[tag::field::DEFAULT_VALUE]),
                    ),
                });
                None
            }
        }
    }

    fn find_message(
        &mut self,
        scope: &str,
        name: &str,
        path: &[i32],
        tag: i32,
    ) -> Option<TypeRef> {
        if name.is_empty() {
            self.add_missing_required_field_error(join_path(path, &[tag]));
            return None;
        }

        let (file, def) = self.resolve_name(scope, name, path, tag, ResolveNameFilter::Message)?;
        match def {
            DefinitionKind::Message(index) => Some(TypeRef { file, index }),
            _ => unreachable!(),
        }
    }

    fn resolve_name(
        &mut self,
        scope: &str,
        name: &str,
        path: &[i32],
        tag: i32,
        filter: ResolveNameFilter,
    ) -> Option<(FileRef, DefinitionKind)> {
        let result = resolve_name(&self.file.names, self.scope, scope, name, filter).into_result(
            name,
            self.raw,
            self.scope,
            path,
            &[tag],
        );

        match result {
            Ok((type_name, file, kind)) => {
                tracing::trace!(
                    scope,
                    name,
                    resolved = type_name.as_ref(),
                    "resolved type reference"
                );

                let ty = if matches!(kind, DefinitionKind::Message(_)) {
                    field_descriptor_proto::Type::Message
                } else {
                    field_descriptor_proto::Type::Enum
                };
                self.fixups.push(Fixup::TypeName {
                    path: path.into(),
                    tag,
                    type_name: format!(".{}", type_name),
                    ty,
                });
                Some((file, kind))
            }
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    fn message_identity(&self, message: TypeRef) -> (&FileDescriptorProto, &Identity) {
        match message.file {
            FileRef::Local => (self.raw, &self.file.messages[message.index as usize].id),
            FileRef::Import(import) => {
                let file = &self.scope.imports[import as usize].inner;
                (&file.raw, &file.messages[message.index as usize].id)
            }
        }
    }

    fn enum_inner(&self, enum_: TypeRef) -> &EnumDescriptorInner {
        match enum_.file {
            FileRef::Local => &self.file.enums[enum_.index as usize],
            FileRef::Import(import) => {
                &self.scope.imports[import as usize].inner.enums[enum_.index as usize]
            }
        }
    }

    fn add_missing_required_field_error(&mut self, path: Box<[i32]>) {
        self.errors.push(DescriptorErrorKind::MissingRequiredField {
            label: Label::new(self.raw, "found here", path),
        });
    }
}

impl Fixup {
    fn apply(self, file: &mut FileDescriptorProto) {
        match self {
            Fixup::TypeName {
                path,
                tag,
                type_name,
                ty,
            } => set_type_name(file, &path, tag, type_name, ty),
            Fixup::JsonName { path, json_name } => {
                find_file_field_proto_mut(file, &path).json_name = Some(json_name);
            }
        }
    }
}

pub(super) fn parse_simple_value(
    kind: KindIndex,
    value: &str,
) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
    let value = match kind {
        KindIndex::Double => value.parse().map(Value::F64)?,
        KindIndex::Float => value.parse().map(Value::F32)?,
        KindIndex::Int32 | KindIndex::Sint32 | KindIndex::Sfixed32 => {
            value.parse().map(Value::I32)?
        }
        KindIndex::Int64 | KindIndex::Sint64 | KindIndex::Sfixed64 => {
            value.parse().map(Value::I64)?
        }
        KindIndex::Uint32 | KindIndex::Fixed32 => value.parse().map(Value::U32)?,
        KindIndex::Uint64 | KindIndex::Fixed64 => value.parse().map(Value::U64)?,
        KindIndex::Bool => value.parse().map(Value::Bool)?,
        KindIndex::String => Value::String(value.to_owned()),
        KindIndex::Bytes => unescape_c_escape_string(value).map(Value::Bytes)?,
        KindIndex::Enum(_) | KindIndex::Message(_) | KindIndex::Group(_) => unreachable!(),
    };

    Ok(value)
}

/// Based on [`google::protobuf::UnescapeCEscapeString`][1]
/// [1]: https://github.com/google/protobuf/blob/3.3.x/src/google/protobuf/stubs/strutil.cc#L312-L322
fn unescape_c_escape_string(s: &str) -> Result<Bytes, &'static str> {
    let src = s.as_bytes();
    let len = src.len();
    let mut dst = Vec::new();

    let mut p = 0;

    while p < len {
        if src[p] != b'\\' {
            dst.push(src[p]);
            p += 1;
        } else {
            p += 1;
            if p == len {
                return Err("missing escape character");
            }
            let simple = match src[p] {
                b'a' => Some(0x07),
                b'b' => Some(0x08),
                b'f' => Some(0x0C),
                b'n' => Some(0x0A),
                b'r' => Some(0x0D),
                b't' => Some(0x09),
                b'v' => Some(0x0B),
                b'\\' => Some(0x5C),
                b'?' => Some(0x3F),
                b'\'' => Some(0x27),
                b'"' => Some(0x22),
                _ => None,
            };
            if let Some(byte) = simple {
                dst.push(byte);
                p += 1;
                continue;
            }

            match src[p] {
                b'0'..=b'7' => {
                    let mut octal: u8 = 0;
                    for _ in 0..3 {
                        if p < len && src[p] >= b'0' && src[p] <= b'7' {
                            octal = octal.wrapping_mul(8).wrapping_add(src[p] - b'0');
                            p += 1;
                        } else {
                            break;
                        }
                    }
                    dst.push(octal);
                }
                b'x' | b'X' => {
                    if p + 3 > len {
                        return Err("hex escape must contain two characters");
                    }
                    match s.get(p + 1..p + 3).and_then(|h| u8::from_str_radix(h, 16).ok()) {
                        Some(b) => dst.push(b),
                        None => return Err("invalid hex escape"),
                    }
                    p += 3;
                }
                _ => return Err("invalid escape character"),
            }
        }
    }
    Ok(dst.into())
}

fn set_type_name(
    file: &mut FileDescriptorProto,
    path: &[i32],
    tag: i32,
    type_name: String,
    ty: field_descriptor_proto::Type,
) {
    match path[0] {
        tag::file::SERVICE => {
            debug_assert_eq!(path.len(), 4);
            let service = &mut file.service[path[1] as usize];
            debug_assert_eq!(path[2], tag::service::METHOD);
            let method = &mut service.method[path[3] as usize];
            match tag {
                tag::method::INPUT_TYPE => method.input_type = Some(type_name),
                tag::method::OUTPUT_TYPE => method.output_type = Some(type_name),
                p => panic!("unknown path element {}", p),
            }
        }
        tag::file::MESSAGE_TYPE | tag::file::EXTENSION => {
            let field = find_file_field_proto_mut(file, path);
            match tag {
                tag::field::TYPE_NAME => {
                    field.type_name = Some(type_name);
                    if field.r#type() != field_descriptor_proto::Type::Group {
                        field.set_type(ty);
                    }
                }
                tag::field::EXTENDEE => field.extendee = Some(type_name),
                p => panic!("unknown path element {}", p),
            }
        }
        p => panic!("unknown path element {}", p),
    }
}

fn find_file_field_proto_mut<'a>(
    file: &'a mut FileDescriptorProto,
    path: &[i32],
) -> &'a mut FieldDescriptorProto {
    match path[0] {
        tag::file::MESSAGE_TYPE => {
            let message = &mut file.message_type[path[1] as usize];
            find_message_field_proto(message, &path[2..])
        }
        tag::file::EXTENSION => {
            debug_assert_eq!(path.len(), 2);
            &mut file.extension[path[1] as usize]
        }
        p => panic!("unknown path element {}", p),
    }
}

fn find_message_field_proto<'a>(
    message: &'a mut DescriptorProto,
    path: &[i32],
) -> &'a mut FieldDescriptorProto {
    match path[0] {
        tag::message::FIELD => {
            debug_assert_eq!(path.len(), 2);
            &mut message.field[path[1] as usize]
        }
        tag::message::EXTENSION => {
            debug_assert_eq!(path.len(), 2);
            &mut message.extension[path[1] as usize]
        }
        tag::message::NESTED_TYPE => {
            let nested_message = &mut message.nested_type[path[1] as usize];
            find_message_field_proto(nested_message, &path[2..])
        }
        p => panic!("unknown path element {}", p),
    }
}

#[test]
fn test_unescape_c_escape_string() {
    assert_eq!(Ok(Bytes::default()), unescape_c_escape_string(""));
    assert_eq!(
        Ok(Bytes::from_static(b"hello world")),
        unescape_c_escape_string("hello world"),
    );
    assert_eq!(
        Ok(Bytes::from_static(b"\0")),
        unescape_c_escape_string(r"\0"),
    );
    assert_eq!(
        Ok(Bytes::from_static(&[0o012, 0o156])),
        unescape_c_escape_string(r"\012\156"),
    );
    assert_eq!(
        Ok(Bytes::from_static(&[0x01, 0x02])),
        unescape_c_escape_string(r"\x01\x02")
    );
    assert_eq!(
        Ok(Bytes::from_static(
            b"\0\x01\x07\x08\x0C\n\r\t\x0B\\\'\"\xFE?"
        )),
        unescape_c_escape_string(r#"\0\001\a\b\f\n\r\t\v\\\'\"\xfe\?"#),
    );
    assert_eq!(
        Err("hex escape must contain two characters"),
        unescape_c_escape_string(r"\x")
    );
    assert_eq!(
        Err("hex escape must contain two characters"),
        unescape_c_escape_string(r"\x1")
    );
    assert_eq!(
        Ok(Bytes::from_static(b"\x111")),
        unescape_c_escape_string(r"\x111")
    );
    assert_eq!(
        Err("invalid escape character"),
        unescape_c_escape_string(r"\w")
    );
    assert_eq!(Err("invalid hex escape"), unescape_c_escape_string(r"\x__"));
}

#[test]
fn test_parse_simple_value() {
    assert_eq!(
        parse_simple_value(KindIndex::Sint32, "-12").unwrap(),
        Value::I32(-12)
    );
    assert_eq!(
        parse_simple_value(KindIndex::Fixed64, "18446744073709551615").unwrap(),
        Value::U64(u64::MAX)
    );
    assert_eq!(
        parse_simple_value(KindIndex::Double, "-inf").unwrap(),
        Value::F64(f64::NEG_INFINITY)
    );
    assert_eq!(
        parse_simple_value(KindIndex::Bool, "true").unwrap(),
        Value::Bool(true)
    );
    assert!(parse_simple_value(KindIndex::Uint32, "-1").is_err());
    assert!(parse_simple_value(KindIndex::Int32, "2147483648").is_err());
}
