use std::path::PathBuf;

/// Where the current draft came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOrigin {
    /// Produced by the capture session. Kept after the take is saved.
    Capture,
    /// Loaded from a library record for preview.
    Library { record_id: String },
    /// Chosen by the user from the device's files.
    Pick,
}

/// The file currently presented to the user, saved or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionDraft {
    pub name: String,
    pub locator: PathBuf,
    pub size_hint: u64,
    pub mime_hint: String,
    pub origin: DraftOrigin,
    /// Duration label to persist on commit.
    pub duration_label: String,
    /// Exact length when known (fresh captures); `0` otherwise.
    pub duration_ms: u64,
    /// Waveform levels shown with the draft.
    pub amplitude_samples: Vec<f32>,
    /// Flag offsets in milliseconds.
    pub flags: Vec<u64>,
}

/// Output of a finished capture take, ready to become a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub file_path: PathBuf,
    pub display_name: String,
    pub duration_ms: u64,
    pub samples: Vec<f32>,
    pub flags: Vec<u64>,
}

/// A file chosen through the platform picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}
