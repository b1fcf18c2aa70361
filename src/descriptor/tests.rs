use prost::bytes::Bytes;
use prost_types::{
    descriptor_proto::{ExtensionRange, ReservedRange},
    field_descriptor_proto::{Label, Type},
    source_code_info::Location,
    DescriptorProto, EnumDescriptorProto, EnumOptions, EnumValueDescriptorProto,
    FieldDescriptorProto, FieldOptions, FileDescriptorProto, FileDescriptorSet, MessageOptions,
    MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto, SourceCodeInfo,
};

use crate::{Cardinality, DescriptorError, FileDescriptor, FileSet, Kind, Symbol, Syntax, Value};

fn file(name: &str, syntax: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: Some("pkg".to_owned()),
        syntax: Some(syntax.to_owned()),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn typed_field(name: &str, number: i32, label: Label, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, label, ty)
    }
}

fn enum_(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn build_err(file: FileDescriptorProto, dependencies: &[FileDescriptor]) -> DescriptorError {
    FileDescriptor::new(file, dependencies).unwrap_err()
}

#[test]
fn resolve_recursive_message() {
    let mut raw = file("tree.proto", "proto3");
    raw.message_type.push(message(
        "Node",
        vec![
            typed_field("parent", 1, Label::Optional, Type::Message, "Node"),
            typed_field("children", 2, Label::Repeated, Type::Message, ".pkg.Node"),
        ],
    ));

    let file = FileDescriptor::new(raw, &[]).unwrap();
    let node = file.get_message_by_name("pkg.Node").unwrap();

    let parent = node.get_field_by_name("parent").unwrap();
    assert_eq!(parent.kind(), Kind::Message(node.clone()));
    assert_eq!(parent.cardinality(), Cardinality::Optional);
    assert!(parent.supports_presence());

    let children = node.get_field(2).unwrap();
    assert!(children.is_list());
    assert!(!children.is_map());
    assert!(!children.is_packed());
    assert_eq!(children.kind().as_message(), Some(&node));

    // Relative type names are rewritten to their fully qualified form.
    assert_eq!(parent.field_descriptor_proto().type_name(), ".pkg.Node");
}

#[test]
fn resolve_message_from_dependency() {
    let mut a = file("a.proto", "proto3");
    a.message_type.push(message("Foo", vec![]));
    let a = FileDescriptor::new(a, &[]).unwrap();

    let mut b = file("b.proto", "proto3");
    b.dependency.push("a.proto".to_owned());
    b.message_type.push(message(
        "Bar",
        vec![typed_field("foo", 1, Label::Optional, Type::Message, "Foo")],
    ));
    let b = FileDescriptor::new(b, &[a.clone()]).unwrap();

    let foo = a.get_message_by_name("pkg.Foo").unwrap();
    let bar = b.get_message_by_name("pkg.Bar").unwrap();
    let field = bar.get_field(1).unwrap();

    assert_eq!(field.kind(), Kind::Message(foo.clone()));
    assert_eq!(field.kind().as_message().unwrap().parent_file(), a);
    assert_eq!(b.dependencies().collect::<Vec<_>>(), vec![a.clone()]);
    assert_eq!(b.find_symbol("pkg.Foo"), Some(Symbol::Message(foo)));
}

#[test]
fn public_imports_are_visible() {
    let mut a = file("a.proto", "proto3");
    a.message_type.push(message("Foo", vec![]));
    let a = FileDescriptor::new(a, &[]).unwrap();

    let mut b = file("b.proto", "proto3");
    b.dependency.push("a.proto".to_owned());
    let b_public = FileDescriptorProto {
        public_dependency: vec![0],
        ..b.clone()
    };
    let b = FileDescriptor::new(b, &[a.clone()]).unwrap();
    let b_public = FileDescriptor::new(b_public, &[a.clone()]).unwrap();

    let mut c = file("c.proto", "proto3");
    c.dependency.push("b.proto".to_owned());
    c.message_type.push(message(
        "Baz",
        vec![typed_field("foo", 1, Label::Optional, Type::Message, ".pkg.Foo")],
    ));

    let err = build_err(c.clone(), &[b]);
    insta::assert_snapshot!(err.to_string(), @"name 'pkg.Foo' is not defined");

    let c = FileDescriptor::new(c, &[b_public.clone()]).unwrap();
    assert_eq!(b_public.public_dependencies().collect::<Vec<_>>(), vec![a.clone()]);
    let field = c.get_message_by_name("pkg.Baz").unwrap().get_field(1).unwrap();
    assert_eq!(field.kind().as_message().unwrap().parent_file(), a);
}

#[test]
fn dependency_errors() {
    let a = FileDescriptor::new(file("a.proto", "proto3"), &[]).unwrap();
    let c = FileDescriptor::new(file("c.proto", "proto3"), &[]).unwrap();

    let mut b = file("b.proto", "proto3");
    b.dependency.push("a.proto".to_owned());

    let err = build_err(b.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"imported file 'a.proto' has not been added");
    assert_eq!(err.file(), Some("b.proto"));
    assert_eq!(err.path(), Some(&[3, 0][..]));

    let err = build_err(b.clone(), &[c.clone()]);
    insta::assert_snapshot!(err.to_string(), @"expected dependency 'a.proto' but 'c.proto' was supplied");

    let err = build_err(b.clone(), &[a.clone(), c.clone()]);
    insta::assert_snapshot!(err.to_string(), @"dependency 'c.proto' was supplied but is not imported");

    b.public_dependency.push(1);
    let err = build_err(b, &[a]);
    insta::assert_snapshot!(err.to_string(), @"invalid import index 1");
}

#[test]
fn unknown_syntax() {
    let err = build_err(file("a.proto", "proto4"), &[]);
    insta::assert_snapshot!(err.to_string(), @"unknown syntax 'proto4'");
}

#[test]
fn duplicate_names() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(message("Foo", vec![]));
    raw.enum_type.push(enum_("Foo", &[("ZERO", 0)]));
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"name 'pkg.Foo' is defined twice");
    assert_eq!(err.path(), Some(&[5, 0, 1][..]));

    let mut a = file("a.proto", "proto3");
    a.message_type.push(message("Foo", vec![]));
    let a = FileDescriptor::new(a, &[]).unwrap();
    let mut b = file("b.proto", "proto3");
    b.dependency.push("a.proto".to_owned());
    b.message_type.push(message("Foo", vec![]));
    let err = build_err(b, &[a]);
    insta::assert_snapshot!(err.to_string(), @"name 'pkg.Foo' is already defined in file 'a.proto'");
}

#[test]
fn invalid_field_numbers() {
    let mut raw = file("a.proto", "proto2");
    raw.message_type.push(DescriptorProto {
        reserved_range: vec![ReservedRange {
            start: Some(4),
            end: Some(6),
        }],
        ..message(
            "Foo",
            vec![
                field("a", 1, Label::Optional, Type::Int32),
                field("b", 1, Label::Optional, Type::Int32),
            ],
        )
    });
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"field number '1' is already used");

    raw.message_type[0].field[1].number = Some(0);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid field number '0'");

    raw.message_type[0].field[1].number = Some(19_500);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid field number '19500'");

    raw.message_type[0].field[1].number = Some(5);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"field number '5' conflicts with reserved range '4 to 5'");

    raw.message_type[0].field[1].number = Some(6);
    FileDescriptor::new(raw, &[]).unwrap();
}

#[test]
fn unresolved_type_names() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(message(
        "Foo",
        vec![typed_field("bar", 1, Label::Optional, Type::Message, "Missing")],
    ));
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"name 'Missing' is not defined");

    raw.message_type[0].field[0].type_name = Some("Foo.bar".to_owned());
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"'pkg.Foo.bar' is not a message or enum type");
}

#[test]
fn extensions() {
    let mut raw = file("ext.proto", "proto2");
    raw.message_type.push(DescriptorProto {
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }],
        ..message("Base", vec![field("id", 1, Label::Optional, Type::Int32)])
    });
    raw.message_type.push(DescriptorProto {
        extension: vec![FieldDescriptorProto {
            extendee: Some("Base".to_owned()),
            ..field("nested", 101, Label::Repeated, Type::Int32)
        }],
        ..message("Scope", vec![])
    });
    raw.extension.push(FieldDescriptorProto {
        extendee: Some(".pkg.Base".to_owned()),
        ..field("top", 100, Label::Optional, Type::String)
    });

    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let base = file.get_message_by_name("pkg.Base").unwrap();
    let scope = file.get_message_by_name("pkg.Scope").unwrap();

    let top = file.get_extension_by_name("pkg.top").unwrap();
    assert!(top.is_extension());
    assert_eq!(top.containing_message(), base);
    assert_eq!(top.parent_message(), None);
    assert_eq!(top.json_name(), "[pkg.top]");
    assert!(top.supports_presence());
    assert_eq!(file.extensions().collect::<Vec<_>>(), vec![top.clone()]);

    let nested = file.get_extension_by_name(".pkg.Scope.nested").unwrap();
    assert_eq!(nested.containing_message(), base);
    assert_eq!(nested.parent_message(), Some(scope.clone()));
    assert!(!nested.supports_presence());
    assert_eq!(scope.child_extensions().collect::<Vec<_>>(), vec![nested.clone()]);
    assert_eq!(file.all_extensions().count(), 2);
    assert_eq!(nested.field_descriptor_proto().extendee(), ".pkg.Base");

    assert!(base.is_extension_number(150));
    assert!(!base.is_extension_number(200));
    assert_eq!(file.get_extension_by_name("pkg.Base.id"), None);

    raw.extension[0].number = Some(999);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"message 'pkg.Base' does not define '999' as an extension number");

    raw.extension[0].number = Some(101);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"field number '101' is already used");

    raw.extension[0].number = Some(100);
    raw.message_type[0].field[0].number = Some(150);
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"field number '150' conflicts with extension range '100 to 199'");
}

#[test]
fn enum_values() {
    let mut raw = file("a.proto", "proto2");
    raw.enum_type.push(EnumDescriptorProto {
        options: Some(EnumOptions {
            allow_alias: Some(true),
            ..Default::default()
        }),
        ..enum_("Color", &[("RED", 1), ("CRIMSON", 1), ("BLUE", 3)])
    });
    let built = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let color = built.get_enum_by_name("pkg.Color").unwrap();

    assert_eq!(color.default_value().name(), "RED");
    assert_eq!(color.get_value(1).unwrap().name(), "RED");
    assert_eq!(color.get_value_by_name("CRIMSON").unwrap().number(), 1);
    assert_eq!(color.get_value(2), None);
    assert_eq!(
        color.values().map(|v| v.full_name().to_owned()).collect::<Vec<_>>(),
        ["pkg.RED", "pkg.CRIMSON", "pkg.BLUE"]
    );
    assert!(matches!(
        built.find_symbol("pkg.BLUE"),
        Some(Symbol::EnumValue(value)) if value.parent_enum() == &color
    ));

    raw.enum_type[0].options = None;
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"enum number '1' has already been used");

    let mut raw = file("a.proto", "proto3");
    raw.enum_type.push(enum_("Color", &[("RED", 1)]));
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"the first value for proto3 enums must be 0");

    raw.enum_type[0].value.clear();
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"enums must have at least one value");
}

#[test]
fn proto3_field_properties() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(DescriptorProto {
        oneof_decl: vec![
            OneofDescriptorProto {
                name: Some("choice".to_owned()),
                ..Default::default()
            },
            OneofDescriptorProto {
                name: Some("_maybe".to_owned()),
                ..Default::default()
            },
        ],
        ..message(
            "Foo",
            vec![
                field("plain_int", 1, Label::Optional, Type::Int32),
                field("ints", 2, Label::Repeated, Type::Int32),
                field("strings", 3, Label::Repeated, Type::String),
                FieldDescriptorProto {
                    options: Some(FieldOptions {
                        packed: Some(false),
                        ..Default::default()
                    }),
                    ..field("unpacked", 4, Label::Repeated, Type::Sint64)
                },
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("a", 5, Label::Optional, Type::String)
                },
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("b", 6, Label::Optional, Type::Bytes)
                },
                FieldDescriptorProto {
                    oneof_index: Some(1),
                    proto3_optional: Some(true),
                    ..field("maybe", 7, Label::Optional, Type::Double)
                },
            ],
        )
    });
    let file = FileDescriptor::new(raw, &[]).unwrap();
    assert_eq!(file.syntax(), Syntax::Proto3);
    let foo = file.get_message_by_name("pkg.Foo").unwrap();

    let plain = foo.get_field_by_name("plain_int").unwrap();
    assert!(!plain.supports_presence());
    assert_eq!(plain.json_name(), "plainInt");
    assert_eq!(foo.get_field_by_json_name("plainInt"), Some(plain.clone()));
    assert_eq!(plain.field_descriptor_proto().json_name(), "plainInt");

    assert!(foo.get_field(2).unwrap().is_packed());
    assert!(!foo.get_field(3).unwrap().is_packed());
    assert!(!foo.get_field(4).unwrap().is_packed());
    assert!(!foo.get_field(2).unwrap().supports_presence());

    let oneofs: Vec<_> = foo.oneofs().collect();
    assert_eq!(oneofs.len(), 2);
    assert_eq!(oneofs[0].name(), "choice");
    assert!(!oneofs[0].is_synthetic());
    assert_eq!(
        oneofs[0].fields().map(|f| f.number()).collect::<Vec<_>>(),
        [5, 6]
    );
    assert!(oneofs[1].is_synthetic());

    let maybe = foo.get_field(7).unwrap();
    assert!(maybe.supports_presence());
    assert_eq!(maybe.containing_oneof(), Some(oneofs[1].clone()));
    assert!(foo.get_field(5).unwrap().supports_presence());
}

#[test]
fn proto2_field_properties() {
    let mut raw = file("a.proto", "proto2");
    raw.enum_type.push(enum_("Level", &[("LOW", 1), ("HIGH", 2)]));
    raw.message_type.push(message(
        "Foo",
        vec![
            FieldDescriptorProto {
                default_value: Some("-5".to_owned()),
                ..field("count", 1, Label::Optional, Type::Int32)
            },
            FieldDescriptorProto {
                default_value: Some("HIGH".to_owned()),
                ..typed_field("level", 2, Label::Optional, Type::Enum, "Level")
            },
            FieldDescriptorProto {
                default_value: Some("a\\001b".to_owned()),
                ..field("data", 3, Label::Optional, Type::Bytes)
            },
            field("ints", 4, Label::Repeated, Type::Int32),
            FieldDescriptorProto {
                options: Some(FieldOptions {
                    packed: Some(true),
                    ..Default::default()
                }),
                ..field("packed", 5, Label::Repeated, Type::Fixed32)
            },
            field("required", 6, Label::Required, Type::Bool),
        ],
    ));
    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let foo = file.get_message_by_name("pkg.Foo").unwrap();

    assert_eq!(foo.get_field(1).unwrap().default_value(), Some(&Value::I32(-5)));
    assert_eq!(foo.get_field(2).unwrap().default_value(), Some(&Value::EnumNumber(2)));
    assert_eq!(
        foo.get_field(3).unwrap().default_value(),
        Some(&Value::Bytes(Bytes::from_static(b"a\x01b")))
    );
    assert_eq!(foo.get_field(4).unwrap().default_value(), None);
    assert!(foo.get_field(1).unwrap().supports_presence());
    assert!(!foo.get_field(4).unwrap().is_packed());
    assert!(foo.get_field(5).unwrap().is_packed());
    assert_eq!(foo.get_field(6).unwrap().cardinality(), Cardinality::Required);

    raw.message_type[0].field[0].default_value = Some("abc".to_owned());
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid default value 'abc' for type 'int32'");

    raw.message_type[0].field[0].default_value = None;
    raw.message_type[0].field[1].default_value = Some("MEDIUM".to_owned());
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid default value 'MEDIUM' for type 'pkg.Level'");
}

#[test]
fn proto3_labels() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(message(
        "Foo",
        vec![field("a", 1, Label::Required, Type::Int32)],
    ));
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"required fields are not allowed in proto3");

    let mut raw = file("a.proto", "proto2");
    raw.message_type.push(message(
        "Foo",
        vec![FieldDescriptorProto {
            proto3_optional: Some(true),
            ..field("a", 1, Label::Optional, Type::Int32)
        }],
    ));
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"the 'proto3_optional' flag is only valid in proto3 files");
}

#[test]
fn map_entries() {
    let entry = DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            "ValuesEntry",
            vec![
                field("key", 1, Label::Optional, Type::String),
                field("value", 2, Label::Optional, Type::Sint32),
            ],
        )
    };
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(DescriptorProto {
        nested_type: vec![entry],
        ..message(
            "Foo",
            vec![typed_field("values", 1, Label::Repeated, Type::Message, "ValuesEntry")],
        )
    });

    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let foo = file.get_message_by_name("pkg.Foo").unwrap();
    let values = foo.get_field_by_name("values").unwrap();
    assert!(values.is_map());
    assert!(!values.is_list());

    let entry = values.kind().as_message().unwrap().clone();
    assert!(entry.is_map_entry());
    assert_eq!(entry.parent_message(), Some(foo.clone()));
    assert_eq!(entry.map_entry_key_field().kind(), Kind::String);
    assert_eq!(entry.map_entry_value_field().kind(), Kind::Sint32);
    assert_eq!(file.messages().count(), 1);
    assert_eq!(file.all_messages().count(), 2);

    raw.message_type[0].nested_type[0].field[0].r#type = Some(Type::Double as i32);
    let err = build_err(raw.clone(), &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid map entry message 'pkg.Foo.ValuesEntry': map keys must be integral, boolean or string types");

    raw.message_type[0].nested_type[0].field.pop();
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid map entry message 'pkg.Foo.ValuesEntry': map entry messages must have exactly two fields");
}

#[test]
fn find_symbols() {
    let mut raw = file("a.proto", "proto3");
    raw.package = Some("my.pkg".to_owned());
    raw.message_type.push(message(
        "Foo",
        vec![field("bar", 1, Label::Optional, Type::Int32)],
    ));
    let file = FileDescriptor::new(raw, &[]).unwrap();

    let foo = file.get_message_by_name("my.pkg.Foo").unwrap();
    assert_eq!(foo.name(), "Foo");
    assert_eq!(foo.package_name(), "my.pkg");
    assert_eq!(file.find_symbol(".my.pkg.Foo"), Some(Symbol::Message(foo.clone())));
    assert_eq!(
        file.find_symbol("my.pkg.Foo.bar"),
        Some(Symbol::Field(foo.get_field(1).unwrap()))
    );
    assert_eq!(file.find_symbol("my.pkg"), None);
    assert_eq!(file.find_symbol("my"), None);
    assert_eq!(file.find_symbol("my.pkg.Bar"), None);
    assert_eq!(file.get_enum_by_name("my.pkg.Foo"), None);
}

#[test]
fn file_set_ordering_and_errors() {
    let mut a = file("a.proto", "proto3");
    a.message_type.push(message("Foo", vec![]));
    let mut b = file("b.proto", "proto3");
    b.dependency.push("a.proto".to_owned());
    b.message_type.push(message(
        "Bar",
        vec![typed_field("foo", 1, Label::Optional, Type::Message, "Foo")],
    ));

    let set = FileSet::from_file_descriptor_set(FileDescriptorSet {
        file: vec![b.clone(), a.clone()],
    })
    .unwrap();
    assert_eq!(
        set.files().map(|f| f.name()).collect::<Vec<_>>(),
        ["a.proto", "b.proto"]
    );
    let foo = set.get_message_by_name("pkg.Foo").unwrap();
    let bar = set.get_message_by_name("pkg.Bar").unwrap();
    assert_eq!(bar.get_field(1).unwrap().kind(), Kind::Message(foo));

    let existing = set.get_file_by_name("a.proto").unwrap();
    let extended = FileSet::from_file_descriptor_set_with(
        FileDescriptorSet { file: vec![b.clone()] },
        &[existing.clone()],
    )
    .unwrap();
    assert_eq!(extended.get_file_by_name("a.proto"), Some(existing));

    let err = FileSet::from_file_descriptor_set(FileDescriptorSet {
        file: vec![b.clone()],
    })
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"imported file 'a.proto' has not been added");

    let mut cyclic_a = a.clone();
    cyclic_a.dependency.push("b.proto".to_owned());
    let err = FileSet::from_file_descriptor_set(FileDescriptorSet {
        file: vec![cyclic_a, b.clone()],
    })
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"import cycle detected: a.proto -> b.proto -> a.proto");

    let mut other_a = a.clone();
    other_a.message_type.push(message("Other", vec![]));
    let err = FileSet::from_file_descriptor_set(FileDescriptorSet {
        file: vec![a.clone(), other_a],
    })
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"a different file named 'a.proto' has already been added");

    // Identical duplicates are accepted.
    FileSet::from_file_descriptor_set(FileDescriptorSet {
        file: vec![a.clone(), a, b],
    })
    .unwrap();
}

#[test]
fn comments_and_locations() {
    fn location(path: &[i32], span: &[i32], leading: Option<&str>) -> Location {
        Location {
            path: path.to_vec(),
            span: span.to_vec(),
            leading_comments: leading.map(ToOwned::to_owned),
            ..Default::default()
        }
    }

    let mut raw = file("a.proto", "proto2");
    raw.message_type.push(DescriptorProto {
        nested_type: vec![message(
            "Result",
            vec![field("url", 2, Label::Optional, Type::String)],
        )],
        ..message(
            "Search",
            vec![
                field("query", 1, Label::Optional, Type::String),
                typed_field("result", 2, Label::Repeated, Type::Group, "Result"),
            ],
        )
    });
    raw.source_code_info = Some(SourceCodeInfo {
        location: vec![
            location(&[], &[0, 0, 12, 0], None),
            location(&[4, 0], &[2, 0, 11, 1], Some(" A search request.\n")),
            location(&[4, 0, 2, 0], &[3, 2, 30], Some(" The query.\n")),
            location(&[4, 0, 2, 0, 3], &[3, 28, 29], None),
            location(&[4, 0, 2, 1], &[4, 2, 10, 3], Some(" Each result.\n")),
        ],
    });

    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    assert_eq!(file.source_location().unwrap().span, [0, 0, 12, 0]);

    let search = file.get_message_by_name("pkg.Search").unwrap();
    assert_eq!(search.comments().leading.as_deref(), Some(" A search request.\n"));
    let query = search.get_field(1).unwrap();
    assert_eq!(query.comments().leading.as_deref(), Some(" The query.\n"));

    let result = search.get_field(2).unwrap();
    assert!(result.is_group());
    assert_eq!(result.source_location(), None);
    assert_eq!(result.comments(), Default::default());
    let result_message = result.kind().as_message().unwrap().clone();
    assert_eq!(result_message.comments().leading.as_deref(), Some(" Each result.\n"));

    raw.message_type[0].field[1].number = Some(1);
    let err = build_err(raw, &[]);
    assert_eq!(err.file(), Some("a.proto"));
    assert_eq!(err.path(), Some(&[4, 0, 2, 1, 3][..]));
    assert_eq!(err.line(), None);
    assert_eq!(err.error_count(), 1);
}

#[test]
fn error_location() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(message(
        "Foo",
        vec![field("a", 0, Label::Optional, Type::Int32)],
    ));
    raw.source_code_info = Some(SourceCodeInfo {
        location: vec![Location {
            path: vec![4, 0, 2, 0, 3],
            span: vec![3, 16, 17],
            ..Default::default()
        }],
    });

    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"invalid field number '0'");
    assert_eq!(err.line(), Some(4));
    assert_eq!(err.column(), Some(17));
}

#[test]
fn encode_file_descriptor() {
    let mut raw = file("a.proto", "proto3");
    raw.message_type.push(message(
        "Foo",
        vec![field("some_field", 1, Label::Optional, Type::Int32)],
    ));
    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();

    raw.message_type[0].field[0].json_name = Some("someField".to_owned());
    assert_eq!(file.file_descriptor_proto(), &raw);

    let decoded = FileDescriptor::decode(file.encode_to_vec().as_slice(), &[]).unwrap();
    assert_eq!(decoded.file_descriptor_proto(), file.file_descriptor_proto());
    assert_ne!(decoded, file);
    assert_eq!(file.clone(), file);
}

#[test]
fn services_and_methods() {
    let mut raw = file("store.proto", "proto3");
    raw.message_type.push(message("Request", vec![]));
    raw.message_type.push(message("Response", vec![]));
    raw.service.push(ServiceDescriptorProto {
        name: Some("Store".to_owned()),
        method: vec![
            MethodDescriptorProto {
                name: Some("Fetch".to_owned()),
                input_type: Some("Request".to_owned()),
                output_type: Some(".pkg.Response".to_owned()),
                server_streaming: Some(true),
                ..Default::default()
            },
            MethodDescriptorProto {
                name: Some("Upload".to_owned()),
                input_type: Some("Request".to_owned()),
                output_type: Some("Request".to_owned()),
                client_streaming: Some(true),
                ..Default::default()
            },
        ],
        ..Default::default()
    });

    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let request = file.get_message_by_name("pkg.Request").unwrap();
    let response = file.get_message_by_name("pkg.Response").unwrap();

    let store = file.get_service_by_name("pkg.Store").unwrap();
    assert_eq!(file.services().collect::<Vec<_>>(), vec![store.clone()]);
    assert_eq!(store.name(), "Store");
    assert_eq!(store.full_name(), "pkg.Store");

    let methods: Vec<_> = store.methods().collect();
    assert_eq!(methods[0].full_name(), "pkg.Store.Fetch");
    assert_eq!(methods[0].input(), request);
    assert_eq!(methods[0].output(), response);
    assert!(!methods[0].is_client_streaming());
    assert!(methods[0].is_server_streaming());
    assert!(methods[1].is_client_streaming());
    assert!(!methods[1].is_server_streaming());
    insta::assert_snapshot!(format!("{:?}", methods[0]), @"Fetch(pkg.Request) returns (stream pkg.Response)");
    assert_eq!(
        file.find_symbol("pkg.Store.Upload"),
        Some(Symbol::Method(methods[1].clone()))
    );

    let set = FileSet::from_file_descriptor_set(FileDescriptorSet { file: vec![raw.clone()] }).unwrap();
    assert_eq!(set.get_service_by_name("pkg.Store").unwrap().methods().len(), 2);
    assert_eq!(set.get_service_by_name("pkg.Request"), None);

    raw.service[0].method[0].output_type = Some("Missing".to_owned());
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"name 'Missing' is not defined");
}

#[test]
fn nested_definitions_and_reserved() {
    let mut raw = file("outer.proto", "proto2");
    raw.message_type.push(DescriptorProto {
        nested_type: vec![message("Inner", vec![])],
        enum_type: vec![enum_("Mode", &[("FAST", 0), ("SLOW", 1)])],
        reserved_range: vec![ReservedRange {
            start: Some(5),
            end: Some(8),
        }],
        reserved_name: vec!["legacy".to_owned()],
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(110),
            ..Default::default()
        }],
        ..message("Outer", vec![field("id", 1, Label::Optional, Type::Int32)])
    });

    let file = FileDescriptor::new(raw.clone(), &[]).unwrap();
    let outer = file.get_message_by_name("pkg.Outer").unwrap();
    let inner = file.get_message_by_name("pkg.Outer.Inner").unwrap();
    let mode = file.get_enum_by_name("pkg.Outer.Mode").unwrap();

    assert_eq!(outer.child_messages().collect::<Vec<_>>(), vec![inner.clone()]);
    assert_eq!(outer.child_enums().collect::<Vec<_>>(), vec![mode.clone()]);
    assert_eq!(file.messages().collect::<Vec<_>>(), vec![outer.clone()]);
    assert_eq!(file.enums().len(), 0);
    assert_eq!(file.all_messages().count(), 2);
    assert_eq!(inner.name(), "Inner");
    assert_eq!(inner.descriptor_proto(), &raw.message_type[0].nested_type[0]);
    assert_eq!(mode.full_name(), "pkg.Outer.Mode");

    assert_eq!(outer.reserved_ranges().collect::<Vec<_>>(), vec![5..8]);
    assert_eq!(outer.reserved_names().collect::<Vec<_>>(), ["legacy"]);
    assert_eq!(outer.extension_ranges().collect::<Vec<_>>(), vec![100..110]);
    assert!(outer.is_extension_number(109));
    assert!(!inner.is_extension_number(100));

    raw.message_type[0].field[0].number = Some(6);
    let err = build_err(raw, &[]);
    insta::assert_snapshot!(err.to_string(), @"field number '6' conflicts with reserved range '5 to 7'");
}

#[test]
fn weak_dependencies() {
    let a = FileDescriptor::new(file("a.proto", "proto3"), &[]).unwrap();
    let b = FileDescriptor::new(file("b.proto", "proto3"), &[]).unwrap();

    let mut c = file("c.proto", "proto3");
    c.dependency = vec!["a.proto".to_owned(), "b.proto".to_owned()];
    c.weak_dependency = vec![1];
    let c_file = FileDescriptor::new(c.clone(), &[a.clone(), b.clone()]).unwrap();

    assert_eq!(c_file.dependencies().collect::<Vec<_>>(), vec![a.clone(), b.clone()]);
    assert_eq!(c_file.weak_dependencies().collect::<Vec<_>>(), vec![b.clone()]);
    assert_eq!(c_file.public_dependencies().len(), 0);

    c.weak_dependency = vec![2];
    let err = build_err(c, &[a, b]);
    insta::assert_snapshot!(err.to_string(), @"invalid import index 2");
}
