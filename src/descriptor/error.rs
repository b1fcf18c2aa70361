use std::{fmt, ops::Range};

use prost_types::FileDescriptorProto;

/// An error that may occur while linking a [`FileDescriptor`][crate::FileDescriptor] or a
/// [`FileSet`][crate::FileSet].
///
/// Linking never returns a partially built graph: if any error is found, the whole call fails.
/// Every problem found is recorded, and the first one determines the [`Display`][fmt::Display]
/// output and the location accessors.
#[derive(Debug)]
pub struct DescriptorError {
    inner: Box<[DescriptorErrorKind]>,
    #[cfg(feature = "miette")]
    source: Option<String>,
}

#[derive(Debug)]
pub(super) enum DescriptorErrorKind {
    MissingRequiredField {
        label: Label,
    },
    UnknownSyntax {
        syntax: String,
        found: Label,
    },
    DuplicateFileName {
        name: String,
    },
    FileNotFound {
        name: String,
        found: Label,
    },
    DependencyMismatch {
        expected: String,
        actual: String,
        found: Label,
    },
    UnexpectedDependency {
        name: String,
    },
    DependencyCycle {
        chain: Vec<String>,
    },
    InvalidImportIndex {
        index: i32,
        found: Label,
    },
    InvalidOneofIndex {
        index: i32,
        found: Label,
    },
    DuplicateName {
        name: String,
        first: Label,
        second: Label,
    },
    DuplicateFieldNumber {
        number: u32,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        first: Label,
        second: Label,
    },
    DuplicateFieldJsonName {
        name: String,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        first: Label,
        second: Label,
    },
    NameNotFound {
        name: String,
        found: Label,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        help: Option<String>,
    },
    InvalidType {
        name: String,
        expected: String,
        found: Label,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        defined: Label,
    },
    InvalidFieldNumber {
        number: i32,
        found: Label,
    },
    FieldNumberInReservedRange {
        number: i32,
        range: Range<i32>,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        defined: Label,
        found: Label,
    },
    FieldNumberInExtensionRange {
        number: i32,
        range: Range<i32>,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        defined: Label,
        found: Label,
    },
    ExtensionNumberOutOfRange {
        number: i32,
        message: String,
        found: Label,
    },
    InvalidFieldDefault {
        value: String,
        kind: String,
        found: Label,
    },
    InvalidMapEntry {
        message: String,
        reason: &'static str,
        found: Label,
    },
    Proto3RequiredField {
        found: Label,
    },
    InvalidProto3Optional {
        found: Label,
    },
    EmptyEnum {
        found: Label,
    },
    InvalidProto3EnumDefault {
        found: Label,
    },
    DuplicateEnumNumber {
        number: i32,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        first: Label,
        second: Label,
    },
    EnumNumberInReservedRange {
        number: i32,
        range: Range<i32>,
        #[cfg_attr(not(feature = "miette"), allow(dead_code))]
        defined: Label,
        found: Label,
    },
    DecodeFileDescriptor {
        err: prost::DecodeError,
    },
}

#[derive(Debug)]
pub(super) struct Label {
    file: String,
    path: Box<[i32]>,
    span: Option<[i32; 4]>,
    #[cfg_attr(not(feature = "miette"), allow(dead_code))]
    message: String,
    #[cfg(feature = "miette")]
    resolved: Option<miette::SourceSpan>,
}

impl DescriptorError {
    pub(super) fn new(errors: Vec<DescriptorErrorKind>) -> DescriptorError {
        debug_assert!(!errors.is_empty());
        DescriptorError {
            inner: errors.into(),
            #[cfg(feature = "miette")]
            source: None,
        }
    }

    pub(super) fn decode(err: prost::DecodeError) -> DescriptorError {
        DescriptorError::new(vec![DescriptorErrorKind::DecodeFileDescriptor { err }])
    }

    /// The primary file in which this error occurred.
    pub fn file(&self) -> Option<&str> {
        self.first().label().map(|l| l.file.as_str())
    }

    /// The 1-based line number at which this error occurred, if available.
    pub fn line(&self) -> Option<usize> {
        self.first()
            .label()
            .and_then(|l| l.span)
            .map(|s| s[0] as usize + 1)
    }

    /// The 1-based column number at which this error occurred, if available.
    pub fn column(&self) -> Option<usize> {
        self.first()
            .label()
            .and_then(|l| l.span)
            .map(|s| s[1] as usize + 1)
    }

    /// Gets the path where this error occurred in the [`FileDescriptorProto`], if available.
    ///
    /// See [`path`][prost_types::source_code_info::Location::path] for more details on the structure of the path.
    pub fn path(&self) -> Option<&[i32]> {
        self.first().label().map(|l| l.path.as_ref())
    }

    /// The number of distinct problems found while linking.
    pub fn error_count(&self) -> usize {
        self.inner.len()
    }

    #[cfg(feature = "miette")]
    #[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
    /// Provide source code information for this error.
    ///
    /// The source should correspond to the contents of [`file()`][DescriptorError::file].
    pub fn with_source_code(mut self, source: &str) -> Self {
        if let Some(file) = self.file() {
            let file = file.to_owned();

            self.source = Some(source.into());
            for error in self.inner.as_mut() {
                error.add_source_code(&file, source);
            }
        }
        self
    }

    fn first(&self) -> &DescriptorErrorKind {
        &self.inner[0]
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.first().source()
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.first().fmt(f)
    }
}

#[cfg(feature = "miette")]
#[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
impl miette::Diagnostic for DescriptorError {
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.first().help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match &self.source {
            Some(source) => Some(source),
            None => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.first().labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn miette::Diagnostic> + 'a>> {
        if self.inner.len() > 1 {
            Some(Box::new(
                self.inner
                    .iter()
                    .map(|e| e as &dyn miette::Diagnostic)
                    .skip(1),
            ))
        } else {
            None
        }
    }
}

impl DescriptorErrorKind {
    fn label(&self) -> Option<&Label> {
        match self {
            DescriptorErrorKind::MissingRequiredField { label } => Some(label),
            DescriptorErrorKind::UnknownSyntax { found, .. }
            | DescriptorErrorKind::FileNotFound { found, .. }
            | DescriptorErrorKind::DependencyMismatch { found, .. }
            | DescriptorErrorKind::InvalidImportIndex { found, .. }
            | DescriptorErrorKind::InvalidOneofIndex { found, .. }
            | DescriptorErrorKind::NameNotFound { found, .. }
            | DescriptorErrorKind::InvalidType { found, .. }
            | DescriptorErrorKind::InvalidFieldNumber { found, .. }
            | DescriptorErrorKind::FieldNumberInReservedRange { found, .. }
            | DescriptorErrorKind::FieldNumberInExtensionRange { found, .. }
            | DescriptorErrorKind::ExtensionNumberOutOfRange { found, .. }
            | DescriptorErrorKind::InvalidFieldDefault { found, .. }
            | DescriptorErrorKind::InvalidMapEntry { found, .. }
            | DescriptorErrorKind::Proto3RequiredField { found }
            | DescriptorErrorKind::InvalidProto3Optional { found }
            | DescriptorErrorKind::EmptyEnum { found }
            | DescriptorErrorKind::InvalidProto3EnumDefault { found }
            | DescriptorErrorKind::EnumNumberInReservedRange { found, .. } => Some(found),
            DescriptorErrorKind::DuplicateName { second, .. }
            | DescriptorErrorKind::DuplicateFieldNumber { second, .. }
            | DescriptorErrorKind::DuplicateFieldJsonName { second, .. }
            | DescriptorErrorKind::DuplicateEnumNumber { second, .. } => Some(second),
            DescriptorErrorKind::DuplicateFileName { .. }
            | DescriptorErrorKind::UnexpectedDependency { .. }
            | DescriptorErrorKind::DependencyCycle { .. }
            | DescriptorErrorKind::DecodeFileDescriptor { .. } => None,
        }
    }

    #[cfg(feature = "miette")]
    fn labels_mut(&mut self) -> Vec<&mut Label> {
        match self {
            DescriptorErrorKind::MissingRequiredField { label } => vec![label],
            DescriptorErrorKind::UnknownSyntax { found, .. }
            | DescriptorErrorKind::FileNotFound { found, .. }
            | DescriptorErrorKind::DependencyMismatch { found, .. }
            | DescriptorErrorKind::InvalidImportIndex { found, .. }
            | DescriptorErrorKind::InvalidOneofIndex { found, .. }
            | DescriptorErrorKind::NameNotFound { found, .. }
            | DescriptorErrorKind::InvalidFieldNumber { found, .. }
            | DescriptorErrorKind::ExtensionNumberOutOfRange { found, .. }
            | DescriptorErrorKind::InvalidFieldDefault { found, .. }
            | DescriptorErrorKind::InvalidMapEntry { found, .. }
            | DescriptorErrorKind::Proto3RequiredField { found }
            | DescriptorErrorKind::InvalidProto3Optional { found }
            | DescriptorErrorKind::EmptyEnum { found }
            | DescriptorErrorKind::InvalidProto3EnumDefault { found } => vec![found],
            DescriptorErrorKind::InvalidType { found, defined, .. }
            | DescriptorErrorKind::FieldNumberInReservedRange { found, defined, .. }
            | DescriptorErrorKind::FieldNumberInExtensionRange { found, defined, .. }
            | DescriptorErrorKind::EnumNumberInReservedRange { found, defined, .. } => {
                vec![found, defined]
            }
            DescriptorErrorKind::DuplicateName { first, second, .. }
            | DescriptorErrorKind::DuplicateFieldNumber { first, second, .. }
            | DescriptorErrorKind::DuplicateFieldJsonName { first, second, .. }
            | DescriptorErrorKind::DuplicateEnumNumber { first, second, .. } => {
                vec![first, second]
            }
            DescriptorErrorKind::DuplicateFileName { .. }
            | DescriptorErrorKind::UnexpectedDependency { .. }
            | DescriptorErrorKind::DependencyCycle { .. }
            | DescriptorErrorKind::DecodeFileDescriptor { .. } => vec![],
        }
    }

    #[cfg(feature = "miette")]
    fn add_source_code(&mut self, file: &str, source: &str) {
        for label in self.labels_mut() {
            label.resolve_span(file, source);
        }
    }
}

impl std::error::Error for DescriptorErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DescriptorErrorKind::DecodeFileDescriptor { err } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DescriptorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorErrorKind::MissingRequiredField { label } => {
                write!(f, "missing required field at {:?}", label.path)
            }
            DescriptorErrorKind::UnknownSyntax { syntax, .. } => {
                write!(f, "unknown syntax '{}'", syntax)
            }
            DescriptorErrorKind::DuplicateFileName { name } => {
                write!(f, "a different file named '{}' has already been added", name)
            }
            DescriptorErrorKind::FileNotFound { name, .. } => {
                write!(f, "imported file '{}' has not been added", name)
            }
            DescriptorErrorKind::DependencyMismatch {
                expected, actual, ..
            } => {
                write!(
                    f,
                    "expected dependency '{}' but '{}' was supplied",
                    expected, actual
                )
            }
            DescriptorErrorKind::UnexpectedDependency { name } => {
                write!(f, "dependency '{}' was supplied but is not imported", name)
            }
            DescriptorErrorKind::DependencyCycle { chain } => {
                write!(f, "import cycle detected: {}", chain.join(" -> "))
            }
            DescriptorErrorKind::InvalidImportIndex { index, .. } => {
                write!(f, "invalid import index {}", index)
            }
            DescriptorErrorKind::InvalidOneofIndex { index, .. } => {
                write!(f, "invalid oneof index {}", index)
            }
            DescriptorErrorKind::DuplicateName {
                name,
                first,
                second,
            } => {
                if first.file == second.file {
                    write!(f, "name '{}' is defined twice", name)
                } else {
                    write!(
                        f,
                        "name '{}' is already defined in file '{}'",
                        name, first.file
                    )
                }
            }
            DescriptorErrorKind::DuplicateFieldNumber { number, .. } => {
                write!(f, "field number '{}' is already used", number)
            }
            DescriptorErrorKind::DuplicateFieldJsonName { name, .. } => {
                write!(f, "a field with JSON name '{}' is already defined", name)
            }
            DescriptorErrorKind::NameNotFound { name, .. } => {
                write!(f, "name '{}' is not defined", name)
            }
            DescriptorErrorKind::InvalidType { name, expected, .. } => {
                write!(f, "'{}' is not {}", name, expected)
            }
            DescriptorErrorKind::InvalidFieldNumber { number, .. } => {
                write!(f, "invalid field number '{}'", number)
            }
            DescriptorErrorKind::FieldNumberInReservedRange { number, range, .. } => {
                write!(
                    f,
                    "field number '{}' conflicts with reserved range '{} to {}'",
                    number,
                    range.start,
                    range.end - 1
                )
            }
            DescriptorErrorKind::FieldNumberInExtensionRange { number, range, .. } => {
                write!(
                    f,
                    "field number '{}' conflicts with extension range '{} to {}'",
                    number,
                    range.start,
                    range.end - 1
                )
            }
            DescriptorErrorKind::ExtensionNumberOutOfRange {
                number, message, ..
            } => {
                write!(
                    f,
                    "message '{}' does not define '{}' as an extension number",
                    message, number
                )
            }
            DescriptorErrorKind::InvalidFieldDefault { value, kind, .. } => {
                write!(f, "invalid default value '{}' for type '{}'", value, kind)
            }
            DescriptorErrorKind::InvalidMapEntry {
                message, reason, ..
            } => {
                write!(f, "invalid map entry message '{}': {}", message, reason)
            }
            DescriptorErrorKind::Proto3RequiredField { .. } => {
                write!(f, "required fields are not allowed in proto3")
            }
            DescriptorErrorKind::InvalidProto3Optional { .. } => {
                write!(f, "the 'proto3_optional' flag is only valid in proto3 files")
            }
            DescriptorErrorKind::EmptyEnum { .. } => {
                write!(f, "enums must have at least one value")
            }
            DescriptorErrorKind::InvalidProto3EnumDefault { .. } => {
                write!(f, "the first value for proto3 enums must be 0")
            }
            DescriptorErrorKind::DuplicateEnumNumber { number, .. } => {
                write!(f, "enum number '{}' has already been used", number)
            }
            DescriptorErrorKind::EnumNumberInReservedRange { number, range, .. } => {
                write!(
                    f,
                    "enum number '{}' conflicts with reserved range '{} to {}'",
                    number, range.start, range.end
                )
            }
            DescriptorErrorKind::DecodeFileDescriptor { .. } => {
                write!(f, "failed to decode file descriptor")
            }
        }
    }
}

#[cfg(feature = "miette")]
#[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
impl miette::Diagnostic for DescriptorErrorKind {
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            DescriptorErrorKind::UnknownSyntax { .. } => {
                Some(Box::new("valid values are 'proto2' and 'proto3'"))
            }
            DescriptorErrorKind::NameNotFound {
                help: Some(help), ..
            } => Some(Box::new(help)),
            DescriptorErrorKind::DuplicateEnumNumber { .. } => Some(Box::new(
                "set the 'allow_alias' option allow re-using enum numbers",
            )),
            DescriptorErrorKind::DependencyMismatch { .. } => Some(Box::new(
                "dependencies must be supplied in the order they are declared",
            )),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let spans: Vec<_> = match self {
            DescriptorErrorKind::DuplicateName { first, second, .. }
            | DescriptorErrorKind::DuplicateFieldNumber { first, second, .. }
            | DescriptorErrorKind::DuplicateFieldJsonName { first, second, .. }
            | DescriptorErrorKind::DuplicateEnumNumber { first, second, .. } => {
                first.to_span().into_iter().chain(second.to_span()).collect()
            }
            DescriptorErrorKind::InvalidType { found, defined, .. }
            | DescriptorErrorKind::FieldNumberInReservedRange { found, defined, .. }
            | DescriptorErrorKind::FieldNumberInExtensionRange { found, defined, .. }
            | DescriptorErrorKind::EnumNumberInReservedRange { found, defined, .. } => {
                found.to_span().into_iter().chain(defined.to_span()).collect()
            }
            _ => self.label().and_then(Label::to_span).into_iter().collect(),
        };
        if spans.is_empty() {
            None
        } else {
            Some(Box::new(spans.into_iter()))
        }
    }
}

impl Label {
    pub fn new(file: &FileDescriptorProto, message: impl ToString, path: Box<[i32]>) -> Self {
        let span = file
            .source_code_info
            .as_ref()
            .and_then(|s| s.location.iter().find(|l| *l.path == *path))
            .and_then(|l| match *l.span {
                [start_line, start_col, end_col] => {
                    Some([start_line, start_col, start_line, end_col])
                }
                [start_line, start_col, end_line, end_col] => {
                    Some([start_line, start_col, end_line, end_col])
                }
                _ => None,
            });

        Label {
            file: file.name().to_owned(),
            span,
            path,
            message: message.to_string(),
            #[cfg(feature = "miette")]
            resolved: None,
        }
    }

    #[cfg(feature = "miette")]
    fn resolve_span(&mut self, file: &str, source: &str) {
        if file == self.file {
            if let Some([start_line, start_col, end_line, end_col]) = self.span {
                let start = miette::SourceOffset::from_location(
                    source,
                    start_line.saturating_add(1) as _,
                    start_col.saturating_add(1) as _,
                )
                .offset();
                let end = miette::SourceOffset::from_location(
                    source,
                    end_line.saturating_add(1) as _,
                    end_col.saturating_add(1) as _,
                )
                .offset();
                self.resolved = Some(miette::SourceSpan::from(start..end));
            }
        }
    }

    #[cfg(feature = "miette")]
    fn to_span(&self) -> Option<miette::LabeledSpan> {
        match self.resolved {
            Some(span) if !span.is_empty() => Some(miette::LabeledSpan::new_with_span(
                Some(self.message.clone()),
                span,
            )),
            _ => None,
        }
    }
}
