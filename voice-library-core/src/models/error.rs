use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the session manager.
///
/// Every variant is recoverable from the application's point of view: the
/// worst case (`ConfigurationMissing`) only disables persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("encryption key is not configured")]
    ConfigurationMissing,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("library blob could not be decrypted: {0}")]
    DecryptFailed(String),

    #[error("library blob has unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("file missing: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio device error: {0}")]
    DeviceError(String),

    #[error("recording could not be finalized: {0}")]
    FinalizeFailed(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("name already in use: {0}")]
    NameCollision(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no draft selected")]
    NoDraft,

    #[error("draft is already in the library")]
    AlreadyCommitted,

    #[error("draft must be saved to the library first")]
    NotCommitted,

    #[error("recording not found: {0}")]
    RecordNotFound(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}
