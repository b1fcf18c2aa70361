//! Field numbers within `google/protobuf/descriptor.proto`. These are the elements of the paths
//! used by `source_code_info` locations and by [`DescriptorError`](crate::DescriptorError) to point
//! at the definition that failed to link.

pub(in crate::descriptor) mod file {
    pub(in crate::descriptor) const PACKAGE: i32 = 2;
    pub(in crate::descriptor) const DEPENDENCY: i32 = 3;
    pub(in crate::descriptor) const MESSAGE_TYPE: i32 = 4;
    pub(in crate::descriptor) const ENUM_TYPE: i32 = 5;
    pub(in crate::descriptor) const SERVICE: i32 = 6;
    pub(in crate::descriptor) const EXTENSION: i32 = 7;
    pub(in crate::descriptor) const PUBLIC_DEPENDENCY: i32 = 10;
    pub(in crate::descriptor) const WEAK_DEPENDENCY: i32 = 11;
    pub(in crate::descriptor) const SYNTAX: i32 = 12;
}

pub(in crate::descriptor) mod message {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const FIELD: i32 = 2;
    pub(in crate::descriptor) const NESTED_TYPE: i32 = 3;
    pub(in crate::descriptor) const ENUM_TYPE: i32 = 4;
    pub(in crate::descriptor) const EXTENSION_RANGE: i32 = 5;
    pub(in crate::descriptor) const EXTENSION: i32 = 6;
    pub(in crate::descriptor) const ONEOF_DECL: i32 = 8;
    pub(in crate::descriptor) const RESERVED_RANGE: i32 = 9;
}

pub(in crate::descriptor) mod field {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const EXTENDEE: i32 = 2;
    pub(in crate::descriptor) const NUMBER: i32 = 3;
    pub(in crate::descriptor) const LABEL: i32 = 4;
    pub(in crate::descriptor) const TYPE_NAME: i32 = 6;
    pub(in crate::descriptor) const DEFAULT_VALUE: i32 = 7;
    pub(in crate::descriptor) const ONEOF_INDEX: i32 = 9;
    pub(in crate::descriptor) const PROTO3_OPTIONAL: i32 = 17;
}

pub(in crate::descriptor) mod oneof {
    pub(in crate::descriptor) const NAME: i32 = 1;
}

pub(in crate::descriptor) mod enum_ {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const VALUE: i32 = 2;
    pub(in crate::descriptor) const RESERVED_RANGE: i32 = 4;
}

pub(in crate::descriptor) mod enum_value {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const NUMBER: i32 = 2;
}

pub(in crate::descriptor) mod service {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const METHOD: i32 = 2;
}

pub(in crate::descriptor) mod method {
    pub(in crate::descriptor) const NAME: i32 = 1;
    pub(in crate::descriptor) const INPUT_TYPE: i32 = 2;
    pub(in crate::descriptor) const OUTPUT_TYPE: i32 = 3;
}
