use std::path::{Component, Path, PathBuf};

use crate::models::config::LibraryConfiguration;
use crate::traits::resolver::FileReferenceResolver;

/// Resolver for platforms whose storage paths are stable across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl FileReferenceResolver for IdentityResolver {
    fn resolve(&self, locator: &Path) -> PathBuf {
        locator.to_path_buf()
    }
}

/// Resolver for platforms that move the app container between runs.
///
/// A locator saved under an old container root is rebuilt as
/// `documents_root/<file name>`. Locators under a volatile root (the
/// configured cache root) or passing through a volatile directory (`tmp`,
/// `Caches`) are returned unchanged, since they were never meant to outlive
/// the run that created them.
#[derive(Debug, Clone)]
pub struct DocumentsResolver {
    documents_root: PathBuf,
    volatile_markers: Vec<String>,
    volatile_roots: Vec<PathBuf>,
}

impl DocumentsResolver {
    pub fn new(documents_root: PathBuf, volatile_markers: Vec<String>) -> Self {
        Self {
            documents_root,
            volatile_markers,
            volatile_roots: Vec::new(),
        }
    }

    /// Treat everything under `root` as volatile.
    pub fn with_volatile_root(mut self, root: PathBuf) -> Self {
        self.volatile_roots.push(root);
        self
    }

    pub fn from_config(config: &LibraryConfiguration) -> Self {
        Self::new(config.storage_root.clone(), config.volatile_markers.clone())
            .with_volatile_root(config.cache_root.clone())
    }

    fn is_volatile(&self, locator: &Path) -> bool {
        if self.volatile_roots.iter().any(|root| locator.starts_with(root)) {
            return true;
        }
        locator.components().any(|component| match component {
            Component::Normal(part) => self
                .volatile_markers
                .iter()
                .any(|marker| part.to_str() == Some(marker.as_str())),
            _ => false,
        })
    }
}

impl FileReferenceResolver for DocumentsResolver {
    fn resolve(&self, locator: &Path) -> PathBuf {
        if self.is_volatile(locator) {
            return locator.to_path_buf();
        }
        match locator.file_name() {
            Some(name) => self.documents_root.join(name),
            None => locator.to_path_buf(),
        }
    }
}
