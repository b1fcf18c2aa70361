//! Reflection over protobuf schemas that are only known at runtime.
//!
//! The crate has four cooperating parts:
//!
//! * [`FileDescriptor::new`] and [`FileSet`] link raw [`FileDescriptorProto`][prost_types::FileDescriptorProto]s
//!   into an immutable, cross-referenced graph of descriptors.
//! * [`ExtensionRegistry`] and [`KnownTypeRegistry`] are shared catalogs of extension fields and of
//!   concrete message types that should be materialized as themselves.
//! * [`DynamicMessage`] holds the field values of a message described only by a [`MessageDescriptor`].
//! * The binary codec on [`DynamicMessage`] reads and writes the standard protobuf wire format,
//!   keeping any fields it does not recognize.
//!
//! # Example
//!
//! ```
//! use dynproto::{DynamicMessage, FileDescriptor, Value};
//! use prost_types::{field_descriptor_proto::{Label, Type}, DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
//!
//! let file = FileDescriptor::new(
//!     FileDescriptorProto {
//!         name: Some("example.proto".to_owned()),
//!         package: Some("example".to_owned()),
//!         syntax: Some("proto3".to_owned()),
//!         message_type: vec![DescriptorProto {
//!             name: Some("Point".to_owned()),
//!             field: vec![FieldDescriptorProto {
//!                 name: Some("x".to_owned()),
//!                 number: Some(1),
//!                 label: Some(Label::Optional as i32),
//!                 r#type: Some(Type::Int32 as i32),
//!                 ..Default::default()
//!             }],
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     },
//!     &[],
//! )
//! .unwrap();
//!
//! let point = file.get_message_by_name("example.Point").unwrap();
//! let mut message = DynamicMessage::new(point.clone());
//! message.set_field_by_name("x", Value::I32(150));
//!
//! let bytes = message.encode_to_vec();
//! assert_eq!(bytes, b"\x08\x96\x01");
//! assert_eq!(DynamicMessage::decode(point, &bytes).unwrap(), message);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]

mod descriptor;
mod dynamic;
mod registry;

pub use {prost, prost::bytes, prost_types};

pub use self::descriptor::{
    Cardinality, Comments, DescriptorError, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FileDescriptor, FileSet, Kind, MessageDescriptor, MethodDescriptor, OneofDescriptor,
    ServiceDescriptor, Symbol, Syntax,
};
pub use self::dynamic::{
    DecodeError, DecodeOptions, DynamicMessage, EncodeError, EncodeOptions, FieldAccessError,
    FieldKey, MapKey, UnknownField, Value,
};
pub use self::registry::{
    AnyMessage, ExtensionRegistry, InvalidExtensionError, KnownMessage, KnownTypeRegistry,
    MessageFactory,
};

#[cfg(test)]
fn test_file_set() -> FileSet {
    static FILES: once_cell::sync::Lazy<FileSet> = once_cell::sync::Lazy::new(build_test_file_set);
    FILES.clone()
}

/// Links the test files again, producing descriptors distinct from [`test_file_set`].
#[cfg(test)]
fn build_test_file_set() -> FileSet {
    let files = [
        "scalars.proto",
        "proto2.proto",
        "base.proto",
        "ext.proto",
        "bar.proto",
    ];
    let set = protox::compile(files, [concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data")])
        .expect("failed to compile test files");
    FileSet::from_file_descriptor_set(set).expect("failed to build test descriptors")
}
