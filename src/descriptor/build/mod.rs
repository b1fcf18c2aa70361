mod names;
mod resolve;
mod visit;

use std::{
    borrow::Cow,
    collections::{hash_map, HashMap, HashSet},
    fmt, iter,
    sync::Arc,
};

use prost_types::FileDescriptorProto;

use crate::{
    descriptor::{
        error::{DescriptorErrorKind, Label},
        tag, to_index, Definition, DefinitionKind, FileDescriptor, FileDescriptorInner, FileRef,
        ImportIndex, Syntax,
    },
    DescriptorError,
};

#[derive(Copy, Clone, Debug)]
enum ResolveNameFilter {
    Message,
    FieldType,
}

enum ResolveNameResult<'a, 'b> {
    Found {
        name: Cow<'b, str>,
        file: FileRef,
        def: &'a Definition,
    },
    InvalidType {
        name: Cow<'b, str>,
        file: FileRef,
        def: &'a Definition,
        filter: ResolveNameFilter,
    },
    NotImported {
        name: Cow<'b, str>,
        file: ImportIndex,
    },
    NotFound,
}

/// Every name defined by the imports of the file being linked.
struct ImportScope<'a> {
    imports: &'a [FileDescriptor],
    names: HashMap<&'a str, (ImportIndex, &'a Definition)>,
    /// Imports whose names may be referenced: direct dependencies and anything they re-export
    /// through `import public`.
    visible: HashSet<ImportIndex>,
}

impl FileDescriptor {
    pub(super) fn build(
        raw: FileDescriptorProto,
        dependencies: &[FileDescriptor],
    ) -> Result<FileDescriptor, DescriptorError> {
        let syntax = check_file(&raw, dependencies)?;

        let (imports, direct) = collect_imports(dependencies);
        let scope = ImportScope::new(&imports, &direct)?;

        let mut inner = FileDescriptorInner {
            syntax,
            imports: Vec::new(),
            dependencies: direct,
            names: HashMap::new(),
            messages: Vec::with_capacity(raw.message_type.len()),
            fields: Vec::new(),
            oneofs: Vec::new(),
            enums: Vec::with_capacity(raw.enum_type.len()),
            services: Vec::with_capacity(raw.service.len()),
            extensions: Vec::new(),
            locations: HashMap::new(),
            raw,
        };

        inner.collect_names(&scope)?;
        inner.resolve_names(&scope)?;
        inner.index_locations();
        drop(scope);

        tracing::debug!(
            file = inner.raw.name(),
            messages = inner.messages.len(),
            enums = inner.enums.len(),
            extensions = inner.extensions.len(),
            "linked file descriptor"
        );

        inner.imports = imports;
        Ok(FileDescriptor {
            inner: Arc::new(inner),
        })
    }
}

impl FileDescriptorInner {
    fn index_locations(&mut self) {
        if let Some(info) = &self.raw.source_code_info {
            self.locations.reserve(info.location.len());
            for (i, location) in info.location.iter().enumerate() {
                // The first location recorded for a path is the one describing the whole element.
                self.locations
                    .entry(location.path.clone().into_boxed_slice())
                    .or_insert(i);
            }
        }
    }
}

fn check_file(
    raw: &FileDescriptorProto,
    dependencies: &[FileDescriptor],
) -> Result<Syntax, DescriptorError> {
    let mut errors = Vec::new();

    let syntax = match raw.syntax.as_deref() {
        None | Some("") | Some("proto2") => Syntax::Proto2,
        Some("proto3") => Syntax::Proto3,
        Some(syntax) => {
            errors.push(DescriptorErrorKind::UnknownSyntax {
                syntax: syntax.to_owned(),
                found: Label::new(raw, "found here", [tag::file::SYNTAX].into()),
            });
            Syntax::Proto2
        }
    };

    for (i, name) in raw.dependency.iter().enumerate() {
        let found = Label::new(
            raw,
            "imported here",
            [tag::file::DEPENDENCY, i as i32].into(),
        );
        match dependencies.get(i) {
            None => errors.push(DescriptorErrorKind::FileNotFound {
                name: name.clone(),
                found,
            }),
            Some(dependency) if dependency.name() != name => {
                errors.push(DescriptorErrorKind::DependencyMismatch {
                    expected: name.clone(),
                    actual: dependency.name().to_owned(),
                    found,
                })
            }
            Some(_) => (),
        }
    }
    for dependency in dependencies.iter().skip(raw.dependency.len()) {
        errors.push(DescriptorErrorKind::UnexpectedDependency {
            name: dependency.name().to_owned(),
        });
    }

    for (i, &index) in raw.public_dependency.iter().enumerate() {
        if !matches!(usize::try_from(index), Ok(index) if index < raw.dependency.len()) {
            errors.push(DescriptorErrorKind::InvalidImportIndex {
                index,
                found: Label::new(
                    raw,
                    "found here",
                    [tag::file::PUBLIC_DEPENDENCY, i as i32].into(),
                ),
            });
        }
    }
    for (i, &index) in raw.weak_dependency.iter().enumerate() {
        if !matches!(usize::try_from(index), Ok(index) if index < raw.dependency.len()) {
            errors.push(DescriptorErrorKind::InvalidImportIndex {
                index,
                found: Label::new(
                    raw,
                    "found here",
                    [tag::file::WEAK_DEPENDENCY, i as i32].into(),
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(syntax)
    } else {
        Err(DescriptorError::new(errors))
    }
}

/// Flattens the dependency graph into a list of unique files. Returns the list along with the
/// position of each direct dependency in it.
fn collect_imports(dependencies: &[FileDescriptor]) -> (Vec<FileDescriptor>, Vec<ImportIndex>) {
    let mut imports: Vec<FileDescriptor> = Vec::with_capacity(dependencies.len());
    let mut positions: HashMap<String, ImportIndex> = HashMap::with_capacity(dependencies.len());

    let mut add = |imports: &mut Vec<FileDescriptor>, file: &FileDescriptor| match positions
        .entry(file.name().to_owned())
    {
        hash_map::Entry::Occupied(entry) => *entry.get(),
        hash_map::Entry::Vacant(entry) => {
            let index = to_index(imports.len());
            imports.push(file.clone());
            *entry.insert(index)
        }
    };

    let direct: Vec<_> = dependencies
        .iter()
        .map(|dependency| add(&mut imports, dependency))
        .collect();
    for dependency in dependencies {
        for transitive in &dependency.inner.imports {
            add(&mut imports, transitive);
        }
    }

    (imports, direct)
}

impl<'a> ImportScope<'a> {
    fn new(
        imports: &'a [FileDescriptor],
        direct: &[ImportIndex],
    ) -> Result<Self, DescriptorError> {
        let mut errors = Vec::new();
        let mut names: HashMap<&'a str, (ImportIndex, &'a Definition)> = HashMap::new();

        for (i, import) in imports.iter().enumerate() {
            let index = to_index(i);
            for (name, def) in &import.inner.names {
                match names.entry(name.as_ref()) {
                    hash_map::Entry::Vacant(entry) => {
                        entry.insert((index, def));
                    }
                    hash_map::Entry::Occupied(entry) => {
                        let &(first_index, first) = entry.get();
                        if matches!(first.kind, DefinitionKind::Package)
                            && matches!(def.kind, DefinitionKind::Package)
                        {
                            continue;
                        }

                        errors.push(DescriptorErrorKind::DuplicateName {
                            name: name.to_string(),
                            first: Label::new(
                                &imports[first_index as usize].inner.raw,
                                "first defined here",
                                first.path.clone(),
                            ),
                            second: Label::new(
                                &import.inner.raw,
                                "defined again here",
                                def.path.clone(),
                            ),
                        });
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(DescriptorError::new(errors));
        }

        let mut scope = ImportScope {
            imports,
            names,
            visible: HashSet::with_capacity(imports.len()),
        };
        for &index in direct {
            scope.add_visible(index);
        }
        Ok(scope)
    }

    fn add_visible(&mut self, index: ImportIndex) {
        if !self.visible.insert(index) {
            return;
        }

        let file = &self.imports[index as usize];
        for public in file.public_dependencies() {
            if let Some(public_index) = self
                .imports
                .iter()
                .position(|import| import.name() == public.name())
            {
                self.add_visible(to_index(public_index));
            }
        }
    }

    fn file(&self, file: FileRef) -> Option<&'a FileDescriptor> {
        match file {
            FileRef::Local => None,
            FileRef::Import(index) => Some(&self.imports[index as usize]),
        }
    }
}

impl ResolveNameFilter {
    fn is_match(&self, def: &DefinitionKind) -> bool {
        matches!(
            (self, def),
            (ResolveNameFilter::Message, DefinitionKind::Message(_))
                | (
                    ResolveNameFilter::FieldType,
                    DefinitionKind::Message(_) | DefinitionKind::Enum(_),
                )
        )
    }
}

impl fmt::Display for ResolveNameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveNameFilter::Message => f.write_str("a message type"),
            ResolveNameFilter::FieldType => f.write_str("a message or enum type"),
        }
    }
}

impl<'a, 'b> ResolveNameResult<'a, 'b> {
    fn new(
        local: &'a HashMap<Box<str>, Definition>,
        scope: &ImportScope<'a>,
        name: impl Into<Cow<'b, str>>,
        filter: ResolveNameFilter,
    ) -> Self {
        let name = name.into();
        let (file, def) = if let Some(def) = local.get(name.as_ref()) {
            (FileRef::Local, def)
        } else if let Some(&(index, def)) = scope.names.get(name.as_ref()) {
            if !scope.visible.contains(&index) {
                return ResolveNameResult::NotImported { name, file: index };
            }
            (FileRef::Import(index), def)
        } else {
            return ResolveNameResult::NotFound;
        };

        if filter.is_match(&def.kind) {
            ResolveNameResult::Found { name, file, def }
        } else {
            ResolveNameResult::InvalidType {
                name,
                file,
                def,
                filter,
            }
        }
    }

    fn into_owned(self) -> ResolveNameResult<'a, 'static> {
        match self {
            ResolveNameResult::Found { name, file, def } => ResolveNameResult::Found {
                name: Cow::Owned(name.into_owned()),
                file,
                def,
            },
            ResolveNameResult::InvalidType {
                name,
                file,
                def,
                filter,
            } => ResolveNameResult::InvalidType {
                name: Cow::Owned(name.into_owned()),
                file,
                def,
                filter,
            },
            ResolveNameResult::NotImported { name, file } => ResolveNameResult::NotImported {
                name: Cow::Owned(name.into_owned()),
                file,
            },
            ResolveNameResult::NotFound => ResolveNameResult::NotFound,
        }
    }

    fn is_found(&self) -> bool {
        matches!(self, ResolveNameResult::Found { .. })
    }

    #[allow(clippy::result_large_err)]
    fn into_result(
        self,
        orig_name: impl Into<String>,
        raw: &FileDescriptorProto,
        scope: &ImportScope<'_>,
        found_path1: &[i32],
        found_path2: &[i32],
    ) -> Result<(Cow<'b, str>, FileRef, DefinitionKind), DescriptorErrorKind> {
        match self {
            ResolveNameResult::Found { name, file, def } => Ok((name, file, def.kind)),
            ResolveNameResult::InvalidType {
                name,
                file,
                def,
                filter,
            } => Err(DescriptorErrorKind::InvalidType {
                name: name.into_owned(),
                expected: filter.to_string(),
                found: Label::new(raw, "found here", join_path(found_path1, found_path2)),
                defined: Label::new(
                    scope.file(file).map_or(raw, |f| &f.inner.raw),
                    "defined here",
                    def.path.clone(),
                ),
            }),
            ResolveNameResult::NotImported { name, file } => {
                let dep_name = scope.imports[file as usize].name();
                Err(DescriptorErrorKind::NameNotFound {
                    found: Label::new(raw, "found here", join_path(found_path1, found_path2)),
                    help: Some(format!(
                        "'{}' is defined in '{}', which is not imported by '{}'",
                        name,
                        dep_name,
                        raw.name()
                    )),
                    name: name.into_owned(),
                })
            }
            ResolveNameResult::NotFound => Err(DescriptorErrorKind::NameNotFound {
                name: orig_name.into(),
                found: Label::new(raw, "found here", join_path(found_path1, found_path2)),
                help: None,
            }),
        }
    }
}

fn to_json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut uppercase_next = false;

    for ch in name.chars() {
        if ch == '_' {
            uppercase_next = true
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
        } else {
            result.push(ch);
        }
    }

    result
}

fn resolve_name<'a, 'b>(
    local: &'a HashMap<Box<str>, Definition>,
    imports: &ImportScope<'a>,
    scope: &str,
    name: &'b str,
    filter: ResolveNameFilter,
) -> ResolveNameResult<'a, 'b> {
    match name.strip_prefix('.') {
        Some(full_name) => ResolveNameResult::new(local, imports, full_name, filter),
        None if scope.is_empty() => ResolveNameResult::new(local, imports, name, filter),
        None => resolve_relative_name(local, imports, scope, name, filter),
    }
}

fn resolve_relative_name<'a>(
    local: &'a HashMap<Box<str>, Definition>,
    imports: &ImportScope<'a>,
    scope: &str,
    relative_name: &str,
    filter: ResolveNameFilter,
) -> ResolveNameResult<'a, 'static> {
    let mut err = ResolveNameResult::NotFound;

    for candidate in resolve_relative_name_candidates(scope, relative_name) {
        let res = ResolveNameResult::new(local, imports, candidate, filter);
        if res.is_found() {
            return res.into_owned();
        } else if matches!(err, ResolveNameResult::NotFound) {
            err = res;
        }
    }

    err.into_owned()
}

fn resolve_relative_name_candidates<'b: 'c, 'c>(
    scope: &'c str,
    relative_name: &'b str,
) -> impl Iterator<Item = Cow<'b, str>> + 'c {
    iter::once(Cow::Owned(format!("{scope}.{relative_name}")))
        .chain(
            scope
                .rmatch_indices('.')
                .map(move |(i, _)| Cow::Owned(format!("{}.{relative_name}", &scope[..i]))),
        )
        .chain(iter::once(Cow::Borrowed(relative_name)))
}

fn join_path(path1: &[i32], path2: &[i32]) -> Box<[i32]> {
    let mut path = Vec::with_capacity(path1.len() + path2.len());
    path.extend_from_slice(path1);
    path.extend_from_slice(path2);
    path.into_boxed_slice()
}

#[test]
fn test_resolve_relative_name_candidates() {
    let candidates: Vec<_> = resolve_relative_name_candidates("a.b.C.field", "D").collect();
    assert_eq!(candidates, ["a.b.C.field.D", "a.b.C.D", "a.b.D", "a.D", "D"]);
}

#[test]
fn test_to_json_name() {
    assert_eq!(to_json_name("foo_bar"), "fooBar");
    assert_eq!(to_json_name("foo_bar_baz_1"), "fooBarBaz1");
    assert_eq!(to_json_name("_leading"), "Leading");
    assert_eq!(to_json_name("already"), "already");
}
