use crate::models::draft::SelectionDraft;
use crate::models::record::RecordingRecord;
use crate::models::state::{CaptureState, PlaybackSource, PlaybackState};

/// User-facing notices raised outside a direct call's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No encryption key configured; the library will not be persisted.
    PersistenceDisabled,
    /// The stored library could not be decrypted and was reset to empty.
    LibraryReset,
    /// A stop could not finalize the recording; no draft was produced.
    RecordingLost(String),
}

/// Observer for session and library changes.
///
/// Capture and playback progress arrive on the sessions' timer threads.
/// Implementations should marshal to the UI thread if needed.
#[allow(unused_variables)]
pub trait SessionDelegate: Send + Sync {
    fn on_capture_state_changed(&self, state: CaptureState) {}

    /// Called on every sampling tick while recording.
    fn on_capture_progress(&self, elapsed_ms: u64, level_db: f32) {}

    fn on_flag_added(&self, offset_ms: u64) {}

    fn on_playback_changed(
        &self,
        state: PlaybackState,
        source: Option<&PlaybackSource>,
        position_ms: u64,
        duration_ms: u64,
    ) {
    }

    fn on_library_changed(&self, records: &[RecordingRecord]) {}

    fn on_selection_changed(&self, draft: Option<&SelectionDraft>, is_committed: bool) {}

    fn on_notice(&self, notice: &Notice) {}
}
