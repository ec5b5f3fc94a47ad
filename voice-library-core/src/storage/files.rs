use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::models::error::LibraryError;

/// Reduce a user-entered name to `[A-Za-z0-9 _-]`, trimmed, plus `.{extension}`.
///
/// A trailing `.{extension}` typed by the user is dropped before filtering so
/// that "Meeting.m4a" and "Meeting" both give "Meeting.m4a".
pub fn sanitize_name(raw: &str, extension: &str) -> Result<String, LibraryError> {
    let suffix = format!(".{}", extension);
    let stem = raw.trim().strip_suffix(suffix.as_str()).unwrap_or(raw);

    let clean: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let clean = clean.trim();

    if clean.is_empty() {
        return Err(LibraryError::InvalidName(format!(
            "{:?} has no letters or digits",
            raw
        )));
    }
    Ok(format!("{}{}", clean, suffix))
}

pub fn ensure_dir(dir: &Path) -> Result<(), LibraryError> {
    fs::create_dir_all(dir)
        .map_err(|e| LibraryError::StorageError(format!("failed to create directory: {}", e)))
}

/// Copy `from` to `to`, creating the destination directory.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), LibraryError> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| LibraryError::StorageError(format!("failed to copy file: {}", e)))
}

/// Move `from` to `to`. Falls back to copy + delete across file systems.
pub fn move_file(from: &Path, to: &Path) -> Result<(), LibraryError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_file(from, to)?;
            remove_file(from).map(|_| ())
        }
        Err(e) => Err(LibraryError::StorageError(format!("failed to move file: {}", e))),
    }
}

/// Delete `path`. Returns `false` if it was already gone.
pub fn remove_file(path: &Path) -> Result<bool, LibraryError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LibraryError::StorageError(format!("failed to delete file: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_appends_extension() {
        assert_eq!(sanitize_name("Test", "m4a").unwrap(), "Test.m4a");
        assert_eq!(sanitize_name("  Team sync_2-b ", "m4a").unwrap(), "Team sync_2-b.m4a");
    }

    #[test]
    fn sanitize_keeps_single_extension() {
        assert_eq!(sanitize_name("Test.m4a", "m4a").unwrap(), "Test.m4a");
    }

    #[test]
    fn sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize_name("../etc/passwd", "m4a").unwrap(), "etcpasswd.m4a");
        assert_eq!(sanitize_name("Çağrı #1", "m4a").unwrap(), "ar 1.m4a");
    }

    #[test]
    fn sanitize_rejects_empty_result() {
        assert!(matches!(sanitize_name("", "m4a"), Err(LibraryError::InvalidName(_))));
        assert!(matches!(sanitize_name("!!! ***", "m4a"), Err(LibraryError::InvalidName(_))));
        assert!(matches!(sanitize_name(".m4a", "m4a"), Err(LibraryError::InvalidName(_))));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.m4a");
        fs::write(&path, b"x").unwrap();

        assert!(remove_file(&path).unwrap());
        assert!(!remove_file(&path).unwrap());
    }

    #[test]
    fn move_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m4a");
        let b = dir.path().join("nested").join("b.m4a");
        let c = dir.path().join("nested").join("c.m4a");
        fs::write(&a, b"audio").unwrap();

        copy_file(&a, &b).unwrap();
        assert!(a.exists() && b.exists());

        move_file(&b, &c).unwrap();
        assert!(!b.exists());
        assert_eq!(fs::read(&c).unwrap(), b"audio");
    }
}
