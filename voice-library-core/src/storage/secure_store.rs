use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::models::config::LibraryConfiguration;
use crate::models::error::LibraryError;
use crate::models::record::{LibrarySnapshot, RecordingRecord, StoredLibrary, LIBRARY_FORMAT_VERSION};
use crate::storage::cipher::AesGcmCipher;
use crate::traits::encryptor::BlobCipher;
use crate::traits::key_value::KeyValueStore;

/// Key holding the encrypted library blob.
pub const LIBRARY_KEY: &str = "library/recordings";

/// Key receiving an undecodable blob before the library is reset.
pub const CORRUPT_BACKUP_KEY: &str = "library/recordings.corrupt";

/// How a `load` concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// Nothing stored yet.
    Empty,
    /// The blob could not be decrypted or parsed and was cleared.
    /// Callers must tell the user their library was reset.
    Reset,
    /// No encryption key; persistence is off.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub records: Vec<RecordingRecord>,
    pub status: LoadStatus,
}

impl LoadReport {
    fn empty(status: LoadStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
        }
    }
}

/// Encrypts the library index into one key-value entry.
///
/// ## Blob Format
/// ```text
/// base64( nonce || AES-256-GCM( {"version": 1, "records": [...]} ) || tag )
/// ```
///
/// Every `save` overwrites the whole blob.
pub struct SecureStore {
    kv: Arc<dyn KeyValueStore>,
    cipher: Option<Box<dyn BlobCipher>>,
}

impl SecureStore {
    /// A store without a cipher never reads or writes the blob.
    pub fn new(kv: Arc<dyn KeyValueStore>, cipher: Option<Box<dyn BlobCipher>>) -> Self {
        match cipher.as_deref() {
            Some(cipher) => log::debug!("library blob cipher: {}", cipher.algorithm()),
            None => log::error!("library encryption key is missing; recordings will not be persisted"),
        }
        Self { kv, cipher }
    }

    pub fn from_config(kv: Arc<dyn KeyValueStore>, config: &LibraryConfiguration) -> Self {
        let cipher = config
            .secret_key
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| Box::new(AesGcmCipher::from_secret(secret)) as Box<dyn BlobCipher>);
        Self::new(kv, cipher)
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Read and decrypt the library.
    ///
    /// Decrypt or parse failures are not retried: the blob is copied to
    /// `CORRUPT_BACKUP_KEY`, removed, and an empty `Reset` report returned.
    /// A blob written by a newer format version is left untouched.
    pub fn load(&self) -> Result<LoadReport, LibraryError> {
        let Some(cipher) = self.cipher.as_deref() else {
            return Ok(LoadReport::empty(LoadStatus::Disabled));
        };

        let Some(blob) = self.kv.get(LIBRARY_KEY)? else {
            return Ok(LoadReport::empty(LoadStatus::Empty));
        };

        match Self::decode(cipher, &blob) {
            Ok(records) => Ok(LoadReport {
                records,
                status: LoadStatus::Loaded,
            }),
            Err(LibraryError::UnsupportedVersion(version)) => {
                log::error!("library blob version {} is newer than {}", version, LIBRARY_FORMAT_VERSION);
                Err(LibraryError::UnsupportedVersion(version))
            }
            Err(e) => {
                log::error!("library blob unreadable, resetting: {}", e);
                if let Err(backup_err) = self.kv.set(CORRUPT_BACKUP_KEY, &blob) {
                    log::warn!("failed to back up unreadable library blob: {}", backup_err);
                }
                self.kv.remove(LIBRARY_KEY)?;
                Ok(LoadReport::empty(LoadStatus::Reset))
            }
        }
    }

    /// Encrypt and persist the complete list, replacing the stored blob.
    pub fn save(&self, records: &[RecordingRecord]) -> Result<(), LibraryError> {
        let Some(cipher) = self.cipher.as_deref() else {
            log::warn!("library not persisted: encryption key is missing");
            return Ok(());
        };

        let snapshot = LibrarySnapshot::current(records.to_vec());
        let json = serde_json::to_vec(&snapshot)
            .map_err(|e| LibraryError::StorageError(format!("failed to serialize library: {}", e)))?;
        let sealed = cipher.encrypt(&json).map_err(LibraryError::EncryptionFailed)?;
        self.kv.set(LIBRARY_KEY, &STANDARD.encode(sealed))
    }

    fn decode(cipher: &dyn BlobCipher, blob: &str) -> Result<Vec<RecordingRecord>, LibraryError> {
        let sealed = STANDARD
            .decode(blob.trim())
            .map_err(|e| LibraryError::DecryptFailed(format!("invalid base64: {}", e)))?;
        let json = cipher.decrypt(&sealed).map_err(LibraryError::DecryptFailed)?;
        let value: serde_json::Value = serde_json::from_slice(&json)
            .map_err(|e| LibraryError::DecryptFailed(format!("invalid JSON: {}", e)))?;

        if let Some(version) = value.get("version").and_then(serde_json::Value::as_u64) {
            let version = u32::try_from(version).unwrap_or(u32::MAX);
            if version > LIBRARY_FORMAT_VERSION {
                return Err(LibraryError::UnsupportedVersion(version));
            }
        }

        let stored: StoredLibrary = serde_json::from_value(value)
            .map_err(|e| LibraryError::DecryptFailed(format!("invalid library shape: {}", e)))?;
        log::debug!("loaded library format version {}", stored.version());
        Ok(stored.into_records())
    }
}
