use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Version written by this crate into the persisted library blob.
pub const LIBRARY_FORMAT_VERSION: u32 = 1;

/// A saved recording in the library.
///
/// Serialized in camelCase. Older blobs used `uri`, `date`, `duration` and
/// `metering`; those names are still accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "uri")]
    pub locator: PathBuf,
    #[serde(alias = "date")]
    pub created_at: String,
    #[serde(alias = "duration", default)]
    pub duration_label: String,
    #[serde(alias = "metering", default)]
    pub amplitude_samples: Vec<f32>,
    /// Flag offsets in milliseconds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<u64>,
    /// Settings used the last time this recording was processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_settings: Option<ProcessSettings>,
}

/// User-supplied options handed to the processing service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSettings {
    pub summary_language: String,
    pub transcript_language: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclusive_focus: bool,
}

/// Versioned wrapper persisted (encrypted) by the secure store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub version: u32,
    pub records: Vec<RecordingRecord>,
}

impl LibrarySnapshot {
    pub fn current(records: Vec<RecordingRecord>) -> Self {
        Self {
            version: LIBRARY_FORMAT_VERSION,
            records,
        }
    }
}

/// Any blob shape this crate can read.
///
/// Blobs written before versioning are a bare array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredLibrary {
    Versioned(LibrarySnapshot),
    Legacy(Vec<RecordingRecord>),
}

impl StoredLibrary {
    pub(crate) fn version(&self) -> u32 {
        match self {
            Self::Versioned(snapshot) => snapshot.version,
            Self::Legacy(_) => 0,
        }
    }

    pub(crate) fn into_records(self) -> Vec<RecordingRecord> {
        match self {
            Self::Versioned(snapshot) => snapshot.records,
            Self::Legacy(records) => records,
        }
    }
}
