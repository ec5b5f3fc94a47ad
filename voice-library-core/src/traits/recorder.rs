use std::path::PathBuf;

use crate::models::error::LibraryError;

/// Snapshot reported by the recorder on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecorderStatus {
    /// Recorded duration so far, excluding paused time.
    pub duration_ms: u64,
    /// Input level in dBFS, `None` when the device reports no metering.
    pub metering_db: Option<f32>,
}

/// Platform microphone recorder.
///
/// One instance backs one capture session. Calls arrive from the session
/// owner and from the sampling thread, never concurrently.
pub trait AudioRecorder: Send {
    /// Ask for microphone access. May block on a system prompt.
    fn request_permission(&mut self) -> bool;

    /// Acquire the microphone and begin writing a new file.
    fn start(&mut self) -> Result<(), LibraryError>;

    fn pause(&mut self) -> Result<(), LibraryError>;

    fn resume(&mut self) -> Result<(), LibraryError>;

    /// Finalize the file, release the microphone, and return the file path.
    fn stop(&mut self) -> Result<PathBuf, LibraryError>;

    fn status(&self) -> RecorderStatus;
}
