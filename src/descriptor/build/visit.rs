use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto,
};

use crate::descriptor::{
    tag, to_index, EnumIndex, EnumValueIndex, FieldIndex, MessageIndex, MethodIndex, OneofIndex,
    ServiceIndex,
};

/// Callbacks for a depth-first walk over every definition in a single file.
///
/// Messages, fields, oneofs, enums and services are numbered by a per-file counter in visit
/// order, so the `index` passed to a callback is also the position of that definition in the
/// file's arena. Extensions share the field counter. Methods and enum values are numbered within
/// their parent.
pub(super) trait Visitor {
    fn visit_file(&mut self, _path: &[i32], _file: &FileDescriptorProto) {}

    fn visit_message(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _parent_message: Option<MessageIndex>,
        _index: MessageIndex,
        _message: &DescriptorProto,
    ) {
    }

    fn visit_field(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _message: MessageIndex,
        _index: FieldIndex,
        _field: &FieldDescriptorProto,
    ) {
    }

    fn visit_oneof(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _message: MessageIndex,
        _index: OneofIndex,
        _oneof: &OneofDescriptorProto,
    ) {
    }

    fn visit_service(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _index: ServiceIndex,
        _service: &ServiceDescriptorProto,
    ) {
    }

    fn visit_method(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _service: ServiceIndex,
        _index: MethodIndex,
        _method: &MethodDescriptorProto,
    ) {
    }

    fn visit_enum(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _parent_message: Option<MessageIndex>,
        _index: EnumIndex,
        _enum: &EnumDescriptorProto,
    ) {
    }

    fn visit_enum_value(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _enum_: EnumIndex,
        _index: EnumValueIndex,
        _value: &EnumValueDescriptorProto,
    ) {
    }

    fn visit_extension(
        &mut self,
        _path: &[i32],
        _full_name: &str,
        _parent_message: Option<MessageIndex>,
        _index: FieldIndex,
        _extension: &FieldDescriptorProto,
    ) {
    }
}

pub(super) fn visit<V>(file: &FileDescriptorProto, visitor: &mut V)
where
    V: Visitor,
{
    let mut context = Context {
        path: Vec::new(),
        scope: String::new(),
        counters: Counters::default(),
    };

    context.visit_file(file, visitor);
}

#[derive(Default)]
struct Counters {
    message: MessageIndex,
    field: FieldIndex,
    oneof: OneofIndex,
    enum_: EnumIndex,
    service: ServiceIndex,
}

struct Context {
    path: Vec<i32>,
    scope: String,
    counters: Counters,
}

impl Context {
    fn visit_file(&mut self, file: &FileDescriptorProto, visitor: &mut impl Visitor) {
        if !file.package().is_empty() {
            self.push_scope(file.package());
        }

        visitor.visit_file(&self.path, file);

        self.push_path(tag::file::MESSAGE_TYPE);
        for (i, message) in file.message_type.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_message(message, visitor, None);
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::file::ENUM_TYPE);
        for (i, enum_) in file.enum_type.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_enum(enum_, visitor, None);
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::file::SERVICE);
        for (i, service) in file.service.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_service(service, visitor);
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::file::EXTENSION);
        for (i, extension) in file.extension.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_extension(extension, visitor, None);
            self.pop_path();
        }
        self.pop_path();

        if !file.package().is_empty() {
            self.pop_scope(file.package());
        }
    }

    fn visit_message(
        &mut self,
        message: &DescriptorProto,
        visitor: &mut impl Visitor,
        parent_message: Option<MessageIndex>,
    ) {
        self.push_scope(message.name());

        let index = post_inc(&mut self.counters.message);
        visitor.visit_message(&self.path, &self.scope, parent_message, index, message);

        self.push_path(tag::message::ONEOF_DECL);
        for (i, oneof) in message.oneof_decl.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_oneof(oneof, visitor, index);
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::message::FIELD);
        for (i, field) in message.field.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_field(field, visitor, index);
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::message::NESTED_TYPE);
        for (i, nested) in message.nested_type.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_message(nested, visitor, Some(index));
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::message::ENUM_TYPE);
        for (i, enum_) in message.enum_type.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_enum(enum_, visitor, Some(index));
            self.pop_path();
        }
        self.pop_path();

        self.push_path(tag::message::EXTENSION);
        for (i, extension) in message.extension.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_extension(extension, visitor, Some(index));
            self.pop_path();
        }
        self.pop_path();

        self.pop_scope(message.name());
    }

    fn visit_field(
        &mut self,
        field: &FieldDescriptorProto,
        visitor: &mut impl Visitor,
        message: MessageIndex,
    ) {
        self.push_scope(field.name());
        let index = post_inc(&mut self.counters.field);
        visitor.visit_field(&self.path, &self.scope, message, index, field);
        self.pop_scope(field.name());
    }

    fn visit_oneof(
        &mut self,
        oneof: &OneofDescriptorProto,
        visitor: &mut impl Visitor,
        message: MessageIndex,
    ) {
        self.push_scope(oneof.name());
        let index = post_inc(&mut self.counters.oneof);
        visitor.visit_oneof(&self.path, &self.scope, message, index, oneof);
        self.pop_scope(oneof.name());
    }

    fn visit_service(&mut self, service: &ServiceDescriptorProto, visitor: &mut impl Visitor) {
        self.push_scope(service.name());

        let index = post_inc(&mut self.counters.service);
        visitor.visit_service(&self.path, &self.scope, index, service);

        self.push_path(tag::service::METHOD);
        for (i, method) in service.method.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_method(method, visitor, index, to_index(i));
            self.pop_path();
        }
        self.pop_path();

        self.pop_scope(service.name());
    }

    fn visit_method(
        &mut self,
        method: &MethodDescriptorProto,
        visitor: &mut impl Visitor,
        service: ServiceIndex,
        index: MethodIndex,
    ) {
        self.push_scope(method.name());
        visitor.visit_method(&self.path, &self.scope, service, index, method);
        self.pop_scope(method.name());
    }

    fn visit_enum(
        &mut self,
        enum_: &EnumDescriptorProto,
        visitor: &mut impl Visitor,
        parent_message: Option<MessageIndex>,
    ) {
        self.push_scope(enum_.name());

        let index = post_inc(&mut self.counters.enum_);
        visitor.visit_enum(&self.path, &self.scope, parent_message, index, enum_);

        self.pop_scope(enum_.name());

        // Enum values are scoped as siblings of their enum, not children.
        self.push_path(tag::enum_::VALUE);
        for (i, value) in enum_.value.iter().enumerate() {
            self.push_path(i as i32);
            self.visit_enum_value(value, visitor, index, to_index(i));
            self.pop_path();
        }
        self.pop_path();
    }

    fn visit_enum_value(
        &mut self,
        value: &EnumValueDescriptorProto,
        visitor: &mut impl Visitor,
        enum_: EnumIndex,
        index: EnumValueIndex,
    ) {
        self.push_scope(value.name());
        visitor.visit_enum_value(&self.path, &self.scope, enum_, index, value);
        self.pop_scope(value.name());
    }

    fn visit_extension(
        &mut self,
        extension: &FieldDescriptorProto,
        visitor: &mut impl Visitor,
        parent_message: Option<MessageIndex>,
    ) {
        self.push_scope(extension.name());
        let index = post_inc(&mut self.counters.field);
        visitor.visit_extension(&self.path, &self.scope, parent_message, index, extension);
        self.pop_scope(extension.name());
    }

    fn push_path(&mut self, path: i32) {
        self.path.push(path);
    }

    fn pop_path(&mut self) {
        self.path.pop();
    }

    fn push_scope(&mut self, scope: &str) {
        if !self.scope.is_empty() {
            self.scope.push('.');
        }
        self.scope.push_str(scope);
    }

    fn pop_scope(&mut self, scope: &str) {
        debug_assert!(self.scope.ends_with(scope));
        self.scope
            .truncate((self.scope.len() - scope.len()).saturating_sub(1));
    }
}

fn post_inc(index: &mut u32) -> u32 {
    let value = *index;
    *index = value + 1;
    value
}
