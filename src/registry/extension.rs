use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use once_cell::sync::Lazy;

use crate::{FileDescriptor, FieldDescriptor};

static GLOBAL: Lazy<ExtensionRegistry> = Lazy::new(ExtensionRegistry::new);

/// A catalog of extension fields, keyed by the full name of the message they extend.
///
/// Cloning an [`ExtensionRegistry`] is cheap, and the clone shares its contents with the original.
/// The registry may be read and updated from multiple threads at once. Each call to
/// [`add`](ExtensionRegistry::add) is applied atomically: readers see all of the extensions it
/// registers, or none of them.
///
/// A registry may have a fallback registry, which is consulted for any owner and number that has
/// no explicit registration.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    by_owner: HashMap<String, BTreeMap<u32, FieldDescriptor>>,
    fallback: Option<ExtensionRegistry>,
}

/// An error returned when registering a field which is not an extension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "miette", derive(miette::Diagnostic))]
#[error("field '{name}' is not an extension")]
pub struct InvalidExtensionError {
    name: String,
}

impl ExtensionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    /// Creates a new, empty registry that falls back to the [global](ExtensionRegistry::global)
    /// registry of statically known extensions.
    pub fn with_defaults() -> Self {
        ExtensionRegistry::with_fallback(ExtensionRegistry::global())
    }

    /// Creates a new, empty registry that falls back to `fallback`.
    ///
    /// Extensions registered with this registry take precedence over extensions with the same
    /// owner and number in the fallback.
    pub fn with_fallback(fallback: ExtensionRegistry) -> Self {
        ExtensionRegistry {
            inner: Arc::new(RwLock::new(RegistryInner {
                by_owner: HashMap::new(),
                fallback: Some(fallback),
            })),
        }
    }

    /// Gets a handle to the process-wide registry of statically known extensions.
    ///
    /// The global registry starts out empty. Extensions added to it are visible to every
    /// registry created with [`with_defaults`](ExtensionRegistry::with_defaults).
    pub fn global() -> ExtensionRegistry {
        GLOBAL.clone()
    }

    /// Registers extension fields.
    ///
    /// Fails if any of the fields is not an extension, in which case none of them are
    /// registered. An extension replaces any extension previously registered with the same
    /// owner and number.
    pub fn add(&self, extensions: &[FieldDescriptor]) -> Result<(), InvalidExtensionError> {
        if let Some(field) = extensions.iter().find(|field| !field.is_extension()) {
            return Err(InvalidExtensionError {
                name: field.full_name().to_owned(),
            });
        }

        self.insert(extensions);
        tracing::debug!(count = extensions.len(), "registered extensions");
        Ok(())
    }

    /// Registers every extension declared in `file`, including extensions nested in messages.
    pub fn add_file(&self, file: &FileDescriptor) {
        let extensions: Vec<_> = file.all_extensions().collect();
        if extensions.is_empty() {
            tracing::trace!(file = file.name(), "file declares no extensions");
            return;
        }

        self.insert(&extensions);
        tracing::debug!(
            file = file.name(),
            count = extensions.len(),
            "registered extensions from file"
        );
    }

    /// Finds the extension of the message named `owner` with the given field number.
    pub fn find(&self, owner: &str, number: u32) -> Option<FieldDescriptor> {
        let inner = self.read();
        if let Some(extension) = inner
            .by_owner
            .get(owner)
            .and_then(|extensions| extensions.get(&number))
        {
            return Some(extension.clone());
        }

        let extension = inner.fallback.as_ref()?.find(owner, number)?;
        tracing::trace!(owner, number, "found extension in fallback registry");
        Some(extension)
    }

    /// Finds the extension of the message named `owner` with the given fully-qualified name.
    pub fn find_by_name(&self, owner: &str, name: &str) -> Option<FieldDescriptor> {
        let name = name.strip_prefix('.').unwrap_or(name);
        let inner = self.read();
        if let Some(extension) = inner.by_owner.get(owner).and_then(|extensions| {
            extensions
                .values()
                .find(|extension| extension.full_name() == name)
        }) {
            return Some(extension.clone());
        }

        // A fallback extension is hidden by an explicit one with the same number.
        let extension = inner.fallback.as_ref()?.find_by_name(owner, name)?;
        match inner
            .by_owner
            .get(owner)
            .and_then(|extensions| extensions.get(&extension.number()))
        {
            Some(_) => None,
            None => Some(extension),
        }
    }

    /// Gets every extension of the message named `owner`, ordered by field number.
    pub fn all_for_type(&self, owner: &str) -> Vec<FieldDescriptor> {
        let inner = self.read();
        let mut extensions: BTreeMap<u32, FieldDescriptor> = match &inner.fallback {
            Some(fallback) => fallback
                .all_for_type(owner)
                .into_iter()
                .map(|extension| (extension.number(), extension))
                .collect(),
            None => BTreeMap::new(),
        };
        if let Some(explicit) = inner.by_owner.get(owner) {
            extensions.extend(
                explicit
                    .iter()
                    .map(|(&number, extension)| (number, extension.clone())),
            );
        }
        extensions.into_values().collect()
    }

    /// Returns `true` if no extension is registered with this registry or its fallback.
    pub fn is_empty(&self) -> bool {
        let inner = self.read();
        inner.by_owner.values().all(BTreeMap::is_empty)
            && inner
                .fallback
                .as_ref()
                .map_or(true, ExtensionRegistry::is_empty)
    }

    fn insert(&self, extensions: &[FieldDescriptor]) {
        let mut inner = self.write();
        for extension in extensions {
            inner
                .by_owner
                .entry(extension.containing_message().full_name().to_owned())
                .or_default()
                .insert(extension.number(), extension.clone());
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("ExtensionRegistry")
            .field(
                "extensions",
                &inner
                    .by_owner
                    .values()
                    .flat_map(BTreeMap::values)
                    .map(FieldDescriptor::full_name)
                    .collect::<Vec<_>>(),
            )
            .field("fallback", &inner.fallback)
            .finish()
    }
}

impl InvalidExtensionError {
    /// Gets the full name of the field which is not an extension.
    pub fn name(&self) -> &str {
        &self.name
    }
}
