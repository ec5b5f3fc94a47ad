use std::path::Path;

use crate::models::error::LibraryError;

/// Snapshot reported by the player on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    /// Set once when the source reaches its natural end.
    pub did_just_finish: bool,
}

/// Platform audio output.
///
/// The output device is a singleton: the playback session unloads the
/// previous source before loading the next one.
pub trait AudioPlayer: Send {
    /// Open `path` and return its duration in milliseconds.
    fn load(&mut self, path: &Path) -> Result<u64, LibraryError>;

    fn play(&mut self) -> Result<(), LibraryError>;

    fn pause(&mut self) -> Result<(), LibraryError>;

    fn seek(&mut self, position_ms: u64) -> Result<(), LibraryError>;

    fn stop(&mut self) -> Result<(), LibraryError>;

    /// Release the loaded source and its file handle.
    fn unload(&mut self) -> Result<(), LibraryError>;

    fn status(&self) -> PlayerStatus;
}
