use prost_types::source_code_info::Location;

use crate::{
    descriptor::{FileDescriptorInner, KindIndex, TypeRef},
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
    MethodDescriptor, OneofDescriptor, ServiceDescriptor,
};

/// The comments attached to a definition in its `.proto` source file.
///
/// Comments are only available if the file was compiled with source info, for example with
/// `protoc --include_source_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    /// The comment immediately before the definition, if any.
    pub leading: Option<String>,
    /// The comment on the same line as, or on the line after, the definition, if any.
    pub trailing: Option<String>,
    /// Comments before the definition separated from it by a blank line.
    pub leading_detached: Vec<String>,
}

impl Comments {
    fn from_location(location: Option<&Location>) -> Comments {
        match location {
            Some(location) => Comments {
                leading: location.leading_comments.clone(),
                trailing: location.trailing_comments.clone(),
                leading_detached: location.leading_detached_comments.clone(),
            },
            None => Comments::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.leading.is_none() && self.trailing.is_none() && self.leading_detached.is_empty()
    }
}

impl FileDescriptorInner {
    fn location(&self, path: &[i32]) -> Option<&Location> {
        let index = *self.locations.get(path)?;
        self.raw.source_code_info.as_ref()?.location.get(index)
    }
}

impl FileDescriptor {
    /// Gets the source location of the `syntax` statement, which spans the whole file.
    pub fn source_location(&self) -> Option<&Location> {
        self.inner.location(&[])
    }
}

impl MessageDescriptor {
    /// Gets the source location of this message definition.
    ///
    /// Synthetic map entry messages have no location.
    pub fn source_location(&self) -> Option<&Location> {
        if self.is_map_entry() {
            return None;
        }
        self.file.inner.location(&self.inner().id.path)
    }

    /// Gets the comments attached to this message.
    ///
    /// For the message generated by a `group` field, these are the comments written on the
    /// group declaration.
    pub fn comments(&self) -> Comments {
        let comments = Comments::from_location(self.source_location());
        if comments.is_empty() {
            if let Some(group) = self.declaring_group() {
                return Comments::from_location(self.file.inner.location(&group.inner().id.path));
            }
        }
        comments
    }

    fn declaring_group(&self) -> Option<FieldDescriptor> {
        let this = TypeRef::local(self.index);
        let index = self.file.inner.fields.iter().position(
            |field| matches!(field.kind, KindIndex::Group(message) if message == this),
        )?;
        Some(self.file.field_at(index as u32))
    }
}

impl FieldDescriptor {
    /// Gets the source location of this field or extension.
    ///
    /// Fields of map entry messages and `group` fields have no location. The comments of a group
    /// are reported by its message type instead.
    pub fn source_location(&self) -> Option<&Location> {
        if self.is_group() || self.is_map_entry_field() {
            return None;
        }
        self.file.inner.location(&self.inner().id.path)
    }

    /// Gets the comments attached to this field or extension.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}

impl OneofDescriptor {
    /// Gets the source location of this oneof.
    pub fn source_location(&self) -> Option<&Location> {
        self.file.inner.location(&self.inner().id.path)
    }

    /// Gets the comments attached to this oneof.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}

impl EnumDescriptor {
    /// Gets the source location of this enum.
    pub fn source_location(&self) -> Option<&Location> {
        self.file.inner.location(&self.inner().id.path)
    }

    /// Gets the comments attached to this enum.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}

impl EnumValueDescriptor {
    /// Gets the source location of this enum value.
    pub fn source_location(&self) -> Option<&Location> {
        self.parent
            .file
            .inner
            .location(&self.inner().id.path)
    }

    /// Gets the comments attached to this enum value.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}

impl ServiceDescriptor {
    /// Gets the source location of this service.
    pub fn source_location(&self) -> Option<&Location> {
        self.file.inner.location(&self.inner().id.path)
    }

    /// Gets the comments attached to this service.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}

impl MethodDescriptor {
    /// Gets the source location of this method.
    pub fn source_location(&self) -> Option<&Location> {
        self.service
            .file
            .inner
            .location(&self.inner().id.path)
    }

    /// Gets the comments attached to this method.
    pub fn comments(&self) -> Comments {
        Comments::from_location(self.source_location())
    }
}
