use std::fs;
use std::path::{Path, PathBuf};

/// Maps persisted locators to paths valid for the current run.
pub trait FileReferenceResolver: Send + Sync {
    /// Platform-current absolute path for `locator`.
    fn resolve(&self, locator: &Path) -> PathBuf;

    /// Whether `path` exists. File-system errors count as missing.
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }
}
