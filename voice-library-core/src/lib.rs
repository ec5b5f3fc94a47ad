//! # voice-library-core
//!
//! Platform-agnostic recording session manager.
//!
//! Records microphone takes, previews and plays them back one at a time, and
//! keeps saved recordings in an encrypted library. Platform backends (the
//! microphone recorder, the audio output, the key-value store) implement the
//! traits in [`traits`] and plug into [`RecorderWorkspace`].
//!
//! ## Architecture
//!
//! ```text
//! voice-library-core (this crate)
//! ├── traits/       ← AudioRecorder, AudioPlayer, KeyValueStore, FileReferenceResolver,
//! │                   BlobCipher, SessionDelegate, ProcessingClient, AnalysisSink
//! ├── models/       ← LibraryError, LibraryConfiguration, RecordingRecord, SelectionDraft, states
//! ├── processing/   ← waveform scaling, flag placement, duration labels
//! ├── session/      ← CaptureSession, PlaybackSession, LibraryIndex, DraftController,
//! │                   RecorderWorkspace (top-level controller)
//! └── storage/      ← SecureStore, AesGcmCipher, key-value stores, resolvers, file helpers
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::LibraryConfiguration;
pub use models::draft::{CapturedAudio, DraftOrigin, PickedFile, SelectionDraft};
pub use models::error::LibraryError;
pub use models::record::{ProcessSettings, RecordingRecord};
pub use models::state::{CaptureState, PlaybackSource, PlaybackState};
pub use processing::waveform::WaveformScale;
pub use session::capture::CaptureSession;
pub use session::draft::DraftController;
pub use session::library::{LibraryEntry, LibraryIndex};
pub use session::playback::{PlayOutcome, PlaybackSession, PlaybackSnapshot};
pub use session::workspace::RecorderWorkspace;
pub use storage::cipher::AesGcmCipher;
pub use storage::key_value::{FileKeyValueStore, MemoryKeyValueStore};
pub use storage::resolver::{DocumentsResolver, IdentityResolver};
pub use storage::secure_store::{LoadReport, LoadStatus, SecureStore};
pub use traits::delegate::{Notice, SessionDelegate};
pub use traits::encryptor::BlobCipher;
pub use traits::key_value::KeyValueStore;
pub use traits::player::{AudioPlayer, PlayerStatus};
pub use traits::processing::{AnalysisResult, AnalysisSink, ProcessingClient};
pub use traits::recorder::{AudioRecorder, RecorderStatus};
pub use traits::resolver::FileReferenceResolver;
