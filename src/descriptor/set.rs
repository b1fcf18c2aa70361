use std::{collections::HashMap, fmt};

use prost::{bytes::Buf, Message};
use prost_types::{FileDescriptorProto, FileDescriptorSet};

use crate::{
    descriptor::{
        error::{DescriptorErrorKind, Label},
        tag,
    },
    DescriptorError, EnumDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
    ServiceDescriptor, Symbol,
};

/// A collection of linked [`FileDescriptor`]s, built together from a [`FileDescriptorSet`].
///
/// Files are kept in dependency order: every file appears after all of the files it imports.
/// Like the descriptors it contains, a `FileSet` is cheap to clone.
#[derive(Clone, Default)]
pub struct FileSet {
    files: Vec<FileDescriptor>,
    file_names: HashMap<Box<str>, usize>,
}

enum VisitState {
    InProgress,
    Done,
}

impl FileSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        FileSet::default()
    }

    /// Links every file in a [`FileDescriptorSet`].
    ///
    /// The files may appear in any order. Every import must be satisfied by another file in the
    /// set.
    pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Self, DescriptorError> {
        FileSet::from_file_descriptor_set_with(set, &[])
    }

    /// Links every file in a [`FileDescriptorSet`], resolving imports against `existing` when
    /// they are not part of the set.
    ///
    /// The returned set contains `existing` and all of their imports, followed by the newly
    /// linked files. A file in `set` which has the same name as an existing file is skipped in
    /// favour of the existing one.
    pub fn from_file_descriptor_set_with(
        set: FileDescriptorSet,
        existing: &[FileDescriptor],
    ) -> Result<Self, DescriptorError> {
        let mut result = FileSet::new();
        for file in existing {
            for import in &file.inner.imports {
                result.insert(import.clone());
            }
            result.insert(file.clone());
        }

        let mut protos: Vec<FileDescriptorProto> = Vec::with_capacity(set.file.len());
        let mut proto_names: HashMap<String, usize> = HashMap::with_capacity(set.file.len());
        for file in set.file {
            if let Some(&index) = proto_names.get(file.name()) {
                if protos[index] != file {
                    return Err(DescriptorError::new(vec![
                        DescriptorErrorKind::DuplicateFileName {
                            name: file.name().to_owned(),
                        },
                    ]));
                }
            } else if result.file_names.contains_key(file.name()) {
                tracing::trace!(file = file.name(), "using existing file descriptor");
            } else {
                proto_names.insert(file.name().to_owned(), protos.len());
                protos.push(file);
            }
        }

        let order = sort_files(&protos, &proto_names, &result)?;
        tracing::debug!(
            order = ?order.iter().map(|&i| protos[i].name()).collect::<Vec<_>>(),
            "linking file descriptor set"
        );

        let mut protos: Vec<Option<FileDescriptorProto>> = protos.into_iter().map(Some).collect();
        for index in order {
            let proto = match protos[index].take() {
                Some(proto) => proto,
                None => continue,
            };
            let dependencies: Vec<FileDescriptor> = proto
                .dependency
                .iter()
                .filter_map(|name| result.get_file_by_name(name))
                .collect();
            let file = FileDescriptor::new(proto, &dependencies)?;
            result.insert(file);
        }

        Ok(result)
    }

    /// Decodes and links a serialized [`FileDescriptorSet`].
    pub fn decode<B>(bytes: B) -> Result<Self, DescriptorError>
    where
        B: Buf,
    {
        let set = FileDescriptorSet::decode(bytes).map_err(DescriptorError::decode)?;
        FileSet::from_file_descriptor_set(set)
    }

    /// Gets an iterator over the files in this set, in dependency order.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &FileDescriptor> + '_ {
        self.files.iter()
    }

    /// Gets the file with the given name, if it is part of this set.
    pub fn get_file_by_name(&self, name: &str) -> Option<FileDescriptor> {
        self.file_names
            .get(name)
            .map(|&index| self.files[index].clone())
    }

    /// Gets a message by its fully qualified name, for example `my.package.MessageName`.
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Gets an enum by its fully qualified name, for example `my.package.EnumName`.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Enum(enum_) => Some(enum_),
            _ => None,
        }
    }

    /// Gets a service by its fully qualified name, for example `my.package.Service`.
    pub fn get_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Service(service) => Some(service),
            _ => None,
        }
    }

    /// Gets an extension field by its fully qualified name, for example `my.package.my_extension`.
    pub fn get_extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        match self.find_symbol(name)? {
            Symbol::Field(field) if field.is_extension() => Some(field),
            _ => None,
        }
    }

    /// Looks up any named element defined in one of the files of this set.
    ///
    /// A leading `.` on the name is ignored.
    pub fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.files
            .iter()
            .find_map(|file| file.find_local_symbol(name))
    }

    fn insert(&mut self, file: FileDescriptor) {
        if !self.file_names.contains_key(file.name()) {
            self.file_names.insert(file.name().into(), self.files.len());
            self.files.push(file);
        }
    }
}

/// Orders the files of a set so that each file comes after its imports, preferring the order the
/// files were given in.
fn sort_files(
    protos: &[FileDescriptorProto],
    names: &HashMap<String, usize>,
    existing: &FileSet,
) -> Result<Vec<usize>, DescriptorError> {
    fn visit(
        index: usize,
        protos: &[FileDescriptorProto],
        names: &HashMap<String, usize>,
        existing: &FileSet,
        states: &mut HashMap<usize, VisitState>,
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), DescriptorErrorKind> {
        match states.get(&index) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                let start = stack.iter().position(|&i| i == index).unwrap_or(0);
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .map(|&i| protos[i].name().to_owned())
                    .collect();
                chain.push(protos[index].name().to_owned());
                return Err(DescriptorErrorKind::DependencyCycle { chain });
            }
            None => (),
        }

        states.insert(index, VisitState::InProgress);
        stack.push(index);

        let file = &protos[index];
        for (i, dependency) in file.dependency.iter().enumerate() {
            if let Some(&dependency_index) = names.get(dependency.as_str()) {
                visit(
                    dependency_index,
                    protos,
                    names,
                    existing,
                    states,
                    stack,
                    order,
                )?;
            } else if existing.get_file_by_name(dependency).is_none() {
                return Err(DescriptorErrorKind::FileNotFound {
                    name: dependency.clone(),
                    found: Label::new(
                        file,
                        "imported here",
                        [tag::file::DEPENDENCY, i as i32].into(),
                    ),
                });
            }
        }

        stack.pop();
        states.insert(index, VisitState::Done);
        order.push(index);
        Ok(())
    }

    let mut states = HashMap::with_capacity(protos.len());
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(protos.len());
    for index in 0..protos.len() {
        visit(
            index,
            protos,
            names,
            existing,
            &mut states,
            &mut stack,
            &mut order,
        )
        .map_err(|err| DescriptorError::new(vec![err]))?;
    }

    Ok(order)
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("files", &self.files.iter().map(|f| f.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for FileSet {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

impl Eq for FileSet {}
