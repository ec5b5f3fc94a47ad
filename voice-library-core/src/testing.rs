//! Scripted platform fakes shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::draft::SelectionDraft;
use crate::models::error::LibraryError;
use crate::models::record::{ProcessSettings, RecordingRecord};
use crate::models::state::{CaptureState, PlaybackSource, PlaybackState};
use crate::traits::delegate::{Notice, SessionDelegate};
use crate::traits::player::{AudioPlayer, PlayerStatus};
use crate::traits::processing::{AnalysisResult, AnalysisSink, ProcessingClient};
use crate::traits::recorder::{AudioRecorder, RecorderStatus};

#[derive(Default)]
struct RecorderScript {
    output: PathBuf,
    write_file: bool,
    permission_denied: bool,
    start_error: Option<String>,
    stop_error: Option<String>,
    started: bool,
    paused: bool,
    duration_ms: u64,
    metering_db: Option<f32>,
}

/// Recorder whose clock and levels are advanced by the test.
#[derive(Clone)]
pub struct FakeRecorder {
    script: Arc<Mutex<RecorderScript>>,
}

impl FakeRecorder {
    /// `stop` returns `output` without touching the file system.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            script: Arc::new(Mutex::new(RecorderScript {
                output: output.into(),
                ..Default::default()
            })),
        }
    }

    /// `stop` writes a small file at `output` before returning it.
    pub fn writing_to(output: impl Into<PathBuf>) -> Self {
        let recorder = Self::new(output);
        recorder.script.lock().write_file = true;
        recorder
    }

    pub fn deny_permission(&self) {
        self.script.lock().permission_denied = true;
    }

    pub fn fail_start(&self, message: &str) {
        self.script.lock().start_error = Some(message.to_string());
    }

    /// The next `stop` fails.
    pub fn fail_stop(&self, message: &str) {
        self.script.lock().stop_error = Some(message.to_string());
    }

    /// Move the recorder clock forward by `delta_ms` and set the input level.
    pub fn advance(&self, delta_ms: u64, metering_db: Option<f32>) {
        let mut script = self.script.lock();
        if !script.paused {
            script.duration_ms += delta_ms;
        }
        script.metering_db = metering_db;
    }

    pub fn is_started(&self) -> bool {
        self.script.lock().started
    }
}

impl AudioRecorder for FakeRecorder {
    fn request_permission(&mut self) -> bool {
        !self.script.lock().permission_denied
    }

    fn start(&mut self) -> Result<(), LibraryError> {
        let mut script = self.script.lock();
        if let Some(message) = script.start_error.take() {
            return Err(LibraryError::DeviceError(message));
        }
        script.started = true;
        script.paused = false;
        script.duration_ms = 0;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), LibraryError> {
        self.script.lock().paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), LibraryError> {
        self.script.lock().paused = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<PathBuf, LibraryError> {
        let mut script = self.script.lock();
        script.started = false;
        if let Some(message) = script.stop_error.take() {
            return Err(LibraryError::DeviceError(message));
        }
        if script.write_file {
            if let Some(parent) = script.output.parent() {
                fs::create_dir_all(parent).map_err(|e| LibraryError::StorageError(e.to_string()))?;
            }
            fs::write(&script.output, b"fake m4a payload").map_err(|e| LibraryError::StorageError(e.to_string()))?;
        }
        Ok(script.output.clone())
    }

    fn status(&self) -> RecorderStatus {
        let script = self.script.lock();
        RecorderStatus {
            duration_ms: script.duration_ms,
            metering_db: script.metering_db,
        }
    }
}

#[derive(Default)]
struct PlayerScript {
    duration_ms: u64,
    loaded: Option<PathBuf>,
    playing: bool,
    position_ms: u64,
    finished: bool,
    load_error: Option<String>,
    release_fails: bool,
    load_count: usize,
    unload_count: usize,
}

/// Player whose position is advanced by the test.
#[derive(Clone)]
pub struct FakePlayer {
    script: Arc<Mutex<PlayerScript>>,
}

impl FakePlayer {
    /// Every loaded source reports `duration_ms`.
    pub fn new(duration_ms: u64) -> Self {
        Self {
            script: Arc::new(Mutex::new(PlayerScript {
                duration_ms,
                ..Default::default()
            })),
        }
    }

    pub fn fail_next_load(&self, message: &str) {
        self.script.lock().load_error = Some(message.to_string());
    }

    /// `stop` and `unload` fail from now on.
    pub fn fail_release(&self) {
        self.script.lock().release_fails = true;
    }

    pub fn advance(&self, delta_ms: u64) {
        let mut script = self.script.lock();
        if !script.playing {
            return;
        }
        script.position_ms = (script.position_ms + delta_ms).min(script.duration_ms);
        if script.position_ms >= script.duration_ms {
            script.playing = false;
            script.finished = true;
        }
    }

    pub fn loaded(&self) -> Option<PathBuf> {
        self.script.lock().loaded.clone()
    }

    pub fn position(&self) -> u64 {
        self.script.lock().position_ms
    }

    pub fn load_count(&self) -> usize {
        self.script.lock().load_count
    }

    pub fn unload_count(&self) -> usize {
        self.script.lock().unload_count
    }
}

impl AudioPlayer for FakePlayer {
    fn load(&mut self, path: &Path) -> Result<u64, LibraryError> {
        let mut script = self.script.lock();
        if let Some(message) = script.load_error.take() {
            return Err(LibraryError::DeviceError(message));
        }
        script.loaded = Some(path.to_path_buf());
        script.position_ms = 0;
        script.finished = false;
        script.load_count += 1;
        Ok(script.duration_ms)
    }

    fn play(&mut self) -> Result<(), LibraryError> {
        self.script.lock().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), LibraryError> {
        self.script.lock().playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), LibraryError> {
        self.script.lock().position_ms = position_ms;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LibraryError> {
        let mut script = self.script.lock();
        script.playing = false;
        if script.release_fails {
            return Err(LibraryError::DeviceError("stop failed".into()));
        }
        Ok(())
    }

    fn unload(&mut self) -> Result<(), LibraryError> {
        let mut script = self.script.lock();
        if script.loaded.take().is_some() {
            script.unload_count += 1;
        }
        if script.release_fails {
            return Err(LibraryError::DeviceError("unload failed".into()));
        }
        Ok(())
    }

    fn status(&self) -> PlayerStatus {
        let mut script = self.script.lock();
        let did_just_finish = std::mem::take(&mut script.finished);
        PlayerStatus {
            position_ms: script.position_ms,
            duration_ms: script.duration_ms,
            did_just_finish,
        }
    }
}

/// Delegate that records every event it receives.
#[derive(Default)]
pub struct EventLog {
    pub capture_states: Mutex<Vec<CaptureState>>,
    pub playback_states: Mutex<Vec<(PlaybackState, Option<PlaybackSource>)>>,
    pub library_sizes: Mutex<Vec<usize>>,
    pub selections: Mutex<Vec<(Option<String>, bool)>>,
    pub notices: Mutex<Vec<Notice>>,
    pub flags: Mutex<Vec<u64>>,
}

impl SessionDelegate for EventLog {
    fn on_capture_state_changed(&self, state: CaptureState) {
        self.capture_states.lock().push(state);
    }

    fn on_flag_added(&self, offset_ms: u64) {
        self.flags.lock().push(offset_ms);
    }

    fn on_playback_changed(
        &self,
        state: PlaybackState,
        source: Option<&PlaybackSource>,
        _position_ms: u64,
        _duration_ms: u64,
    ) {
        self.playback_states.lock().push((state, source.cloned()));
    }

    fn on_library_changed(&self, records: &[RecordingRecord]) {
        self.library_sizes.lock().push(records.len());
    }

    fn on_selection_changed(&self, draft: Option<&SelectionDraft>, is_committed: bool) {
        self.selections
            .lock()
            .push((draft.map(|d| d.name.clone()), is_committed));
    }

    fn on_notice(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}

/// Processing client returning a canned result, remembering its inputs.
#[derive(Default)]
pub struct CannedProcessing {
    pub calls: Mutex<Vec<(PathBuf, ProcessSettings)>>,
    pub fail_with: Mutex<Option<String>>,
}

impl ProcessingClient for CannedProcessing {
    fn process(&self, audio: &Path, settings: &ProcessSettings) -> Result<AnalysisResult, String> {
        if let Some(message) = self.fail_with.lock().take() {
            return Err(message);
        }
        self.calls.lock().push((audio.to_path_buf(), settings.clone()));
        Ok(serde_json::json!({ "summary": "ok", "file": audio.to_string_lossy() }))
    }
}

/// Analysis sink that keeps everything in memory.
#[derive(Default)]
pub struct MemorySink {
    pub saved: Mutex<Vec<(AnalysisResult, ProcessSettings)>>,
}

impl AnalysisSink for MemorySink {
    fn save_analysis(&self, result: &AnalysisResult, settings: &ProcessSettings) -> Result<(), String> {
        self.saved.lock().push((result.clone(), settings.clone()));
        Ok(())
    }
}
