use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::models::config::LibraryConfiguration;
use crate::models::draft::{DraftOrigin, PickedFile, SelectionDraft};
use crate::models::error::LibraryError;
use crate::models::record::{ProcessSettings, RecordingRecord};
use crate::models::state::{CaptureState, PlaybackSource};
use crate::processing::waveform::{bar_interval, flag_bar_indices, WaveformScale};
use crate::session::capture::CaptureSession;
use crate::session::draft::DraftController;
use crate::session::library::{LibraryEntry, LibraryIndex};
use crate::session::playback::{PlayOutcome, PlaybackSession, PlaybackSnapshot};
use crate::storage::files;
use crate::storage::secure_store::{LoadStatus, SecureStore};
use crate::traits::delegate::{Notice, SessionDelegate};
use crate::traits::key_value::KeyValueStore;
use crate::traits::player::AudioPlayer;
use crate::traits::processing::{AnalysisResult, AnalysisSink, ProcessingClient};
use crate::traits::recorder::AudioRecorder;
use crate::traits::resolver::FileReferenceResolver;

/// Tolerance when placing a flag on a waveform bar.
const FLAG_BAR_TOLERANCE: Duration = Duration::from_millis(50);

/// The recorder screen's controller.
///
/// ```text
///                    ┌── CaptureSession  (microphone)
/// RecorderWorkspace ─┼── PlaybackSession (audio output)
///                    ├── DraftController (current selection)
///                    └── LibraryIndex ── SecureStore ── KeyValueStore
/// ```
///
/// Owns exactly one of each session, so the microphone and the output device
/// are never held twice. Every file operation releases the playback first if
/// it holds the file. Dropping the workspace releases both devices.
pub struct RecorderWorkspace<R: AudioRecorder + 'static, P: AudioPlayer + 'static> {
    config: LibraryConfiguration,
    capture: CaptureSession<R>,
    playback: PlaybackSession<P>,
    library: LibraryIndex,
    drafts: DraftController,
    delegate: Option<Arc<dyn SessionDelegate>>,
    processing: Option<(Arc<dyn ProcessingClient>, Arc<dyn AnalysisSink>)>,
}

impl<R: AudioRecorder + 'static, P: AudioPlayer + 'static> RecorderWorkspace<R, P> {
    pub fn new(
        config: LibraryConfiguration,
        recorder: R,
        player: P,
        kv: Arc<dyn KeyValueStore>,
        resolver: Arc<dyn FileReferenceResolver>,
    ) -> Result<Self, LibraryError> {
        config.validate().map_err(LibraryError::InvalidConfiguration)?;

        let store = SecureStore::from_config(kv, &config);
        Ok(Self {
            capture: CaptureSession::new(recorder, &config),
            playback: PlaybackSession::new(player, resolver.clone(), config.playback_update_interval),
            library: LibraryIndex::new(store, resolver.clone(), &config.audio_extension),
            drafts: DraftController::new(&config, resolver),
            delegate: None,
            processing: None,
            config,
        })
    }

    /// Route every session's events to `delegate`.
    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.capture.set_delegate(delegate.clone());
        self.playback.set_delegate(delegate.clone());
        self.library.set_delegate(delegate.clone());
        self.delegate = Some(delegate);
    }

    pub fn set_processing(&mut self, client: Arc<dyn ProcessingClient>, sink: Arc<dyn AnalysisSink>) {
        self.processing = Some((client, sink));
    }

    /// Prepare the storage roots and load the library.
    ///
    /// A reset library or disabled persistence is reported through
    /// `on_notice` as well as the returned status.
    pub fn open(&mut self) -> Result<LoadStatus, LibraryError> {
        files::ensure_dir(&self.config.storage_root)?;
        files::ensure_dir(&self.config.cache_root)?;

        let status = self.library.load()?;
        match status {
            LoadStatus::Reset => self.notice(Notice::LibraryReset),
            LoadStatus::Disabled => self.notice(Notice::PersistenceDisabled),
            LoadStatus::Loaded | LoadStatus::Empty => {}
        }
        Ok(status)
    }

    // --- Accessors ---

    pub fn config(&self) -> &LibraryConfiguration {
        &self.config
    }

    pub fn capture(&self) -> &CaptureSession<R> {
        &self.capture
    }

    pub fn playback(&self) -> &PlaybackSession<P> {
        &self.playback
    }

    pub fn library(&self) -> &LibraryIndex {
        &self.library
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn playback_snapshot(&self) -> PlaybackSnapshot {
        self.playback.snapshot()
    }

    pub fn records(&self) -> Vec<RecordingRecord> {
        self.library.all()
    }

    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.library.entries()
    }

    pub fn selection(&self) -> Option<&SelectionDraft> {
        self.drafts.current()
    }

    pub fn is_committed(&self) -> bool {
        self.drafts.is_committed(&self.library)
    }

    // --- Capture ---

    /// Start a new take. The output device is released and the previous
    /// selection is dropped once the microphone is ours.
    pub fn start_recording(&mut self) -> Result<(), LibraryError> {
        self.playback.stop();
        self.capture.start()?;
        if self.drafts.clear().is_some() {
            self.notify_selection();
        }
        Ok(())
    }

    pub fn pause_recording(&mut self) -> Result<(), LibraryError> {
        self.capture.pause()
    }

    pub fn resume_recording(&mut self) -> Result<(), LibraryError> {
        self.capture.resume()
    }

    /// Finish the take and select it as the draft.
    ///
    /// `Ok(None)` when nothing was recording.
    pub fn stop_recording(&mut self) -> Result<Option<SelectionDraft>, LibraryError> {
        let Some(audio) = self.capture.stop()? else {
            return Ok(None);
        };
        self.drafts.set_from_capture(audio);
        self.notify_selection();
        Ok(self.drafts.current().cloned())
    }

    pub fn discard_recording(&mut self) {
        self.capture.discard();
    }

    /// Flag the current moment of the take being recorded or previewed.
    ///
    /// Flags added while previewing a saved take are written to its record.
    pub fn add_flag(&mut self) -> Option<u64> {
        let previewing_take = self
            .drafts
            .current()
            .is_some_and(|draft| draft.origin == DraftOrigin::Capture);
        let position = if previewing_take {
            self.playback.position_for(&PlaybackSource::Preview)
        } else {
            None
        };

        let offset = self.capture.add_flag(position)?;
        if previewing_take {
            let flags = self.capture.flags();
            self.drafts.sync_flags(flags.clone());
            if let Some(record) = self.drafts.committed_record(&self.library) {
                if let Err(e) = self.library.set_flags(&record.id, flags) {
                    log::error!("flag at {}ms not saved to {}: {}", offset, record.id, e);
                }
            }
        }
        Some(offset)
    }

    // --- Playback ---

    /// Play a library record; playing the same record again stops it.
    pub fn play_record(&mut self, id: &str) -> Result<PlayOutcome, LibraryError> {
        let record = self
            .library
            .get(id)
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;
        self.playback
            .play(&record.locator, PlaybackSource::Record(record.id))
    }

    /// Play the current draft as the preview source.
    pub fn play_draft(&mut self) -> Result<PlayOutcome, LibraryError> {
        let locator = self
            .drafts
            .current()
            .map(|draft| draft.locator.clone())
            .ok_or(LibraryError::NoDraft)?;
        self.playback.play(&locator, PlaybackSource::Preview)
    }

    pub fn pause_playback(&mut self) -> Result<(), LibraryError> {
        self.playback.pause()
    }

    pub fn resume_playback(&mut self) -> Result<(), LibraryError> {
        self.playback.resume()
    }

    pub fn seek_playback(&mut self, position_ms: u64) -> Result<(), LibraryError> {
        self.playback.seek(position_ms)
    }

    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    // --- Selection ---

    /// Select a library record for preview.
    pub fn load_from_library(&mut self, id: &str) -> Result<(), LibraryError> {
        let record = self
            .library
            .get(id)
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;
        self.playback.release_source(&PlaybackSource::Preview);
        self.drafts.set_from_library(&record);
        self.capture.clear_take();
        self.notify_selection();
        Ok(())
    }

    /// Select a file from the platform picker as the draft.
    pub fn pick_file(&mut self, file: PickedFile) {
        self.playback.release_source(&PlaybackSource::Preview);
        self.drafts.set_from_pick(file);
        self.capture.clear_take();
        self.notify_selection();
    }

    /// Back out of the preview. The user has already confirmed.
    pub fn clear_selection(&mut self) {
        self.playback.release_source(&PlaybackSource::Preview);
        self.drafts.clear();
        self.capture.clear_take();
        self.notify_selection();
    }

    /// Save the draft into the library.
    pub fn save_draft(&mut self) -> Result<RecordingRecord, LibraryError> {
        let record = self.drafts.commit(&self.library)?;
        self.notify_selection();
        Ok(record)
    }

    pub fn rename_draft(&mut self, new_name: &str) -> Result<(), LibraryError> {
        let playback = &mut self.playback;
        self.drafts
            .rename(&self.library, new_name, |path| playback.release_path(path))?;
        self.notify_selection();
        Ok(())
    }

    pub fn shareable_path(&self) -> Result<PathBuf, LibraryError> {
        self.drafts.shareable_path()
    }

    // --- Library ---

    /// Rename a saved record. A draft showing that record follows the rename.
    pub fn rename_record(&mut self, id: &str, new_name: &str) -> Result<PathBuf, LibraryError> {
        let selected = self
            .drafts
            .committed_record(&self.library)
            .is_some_and(|record| record.id == id);
        if selected {
            self.rename_draft(new_name)?;
            return self.library.playable_path(id);
        }

        let playback = &mut self.playback;
        self.library
            .rename_with(id, new_name, |path| playback.release_path(path))
    }

    /// Delete a saved record and its file. Unknown ids are a no-op.
    pub fn delete_record(&mut self, id: &str) -> Result<bool, LibraryError> {
        let playback = &mut self.playback;
        let removed = self
            .library
            .remove_with(id, |path| playback.release_path(path))?;
        if removed {
            self.notify_selection();
        }
        Ok(removed)
    }

    /// Delete every saved record and file.
    pub fn clear_all(&mut self) -> Result<(), LibraryError> {
        let playback = &mut self.playback;
        self.library
            .clear_all_with(|path| playback.release_path(path))?;
        self.notify_selection();
        Ok(())
    }

    /// Send the committed draft to the processing service.
    ///
    /// The result is handed to the analysis sink and the settings are kept on
    /// the record so the UI can show what was used.
    pub fn process(&mut self, settings: ProcessSettings) -> Result<AnalysisResult, LibraryError> {
        let (client, sink) = self
            .processing
            .clone()
            .ok_or_else(|| LibraryError::ProcessingFailed("no processing client configured".into()))?;
        if self.drafts.current().is_none() {
            return Err(LibraryError::NoDraft);
        }
        let record = self
            .drafts
            .committed_record(&self.library)
            .ok_or(LibraryError::NotCommitted)?;
        let path = self.library.playable_path(&record.id)?;

        log::info!("processing {} ({})", record.name, record.id);
        let result = client
            .process(&path, &settings)
            .map_err(LibraryError::ProcessingFailed)?;
        sink.save_analysis(&result, &settings)
            .map_err(LibraryError::ProcessingFailed)?;
        self.library.set_used_settings(&record.id, settings)?;
        Ok(result)
    }

    // --- Waveform ---

    /// Bar heights for the waveform on screen: the live take while
    /// recording, otherwise the selected draft.
    pub fn waveform_heights(&self, scale: &WaveformScale) -> Vec<f32> {
        scale.bar_heights(&self.visible_samples())
    }

    /// Indices of waveform bars that carry a flag.
    ///
    /// A finished take spreads its bars evenly over its exact length; a live
    /// capture places them at the sampling interval.
    pub fn flag_bars(&self) -> Vec<usize> {
        let bar_count = self.visible_samples().len();
        let (flags, interval) = match self.drafts.current() {
            Some(draft) if !self.capture.state().is_active() => (
                draft.flags.clone(),
                bar_interval(draft.duration_ms, bar_count, self.config.sample_interval),
            ),
            _ => (self.capture.flags(), self.config.sample_interval),
        };
        flag_bar_indices(&flags, bar_count, interval, FLAG_BAR_TOLERANCE)
    }

    // --- Internal helpers ---

    fn visible_samples(&self) -> Vec<f32> {
        match self.drafts.current() {
            Some(draft) if !self.capture.state().is_active() => draft.amplitude_samples.clone(),
            _ => self.capture.samples(),
        }
    }

    fn notify_selection(&self) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_selection_changed(self.drafts.current(), self.drafts.is_committed(&self.library));
        }
    }

    fn notice(&self, notice: Notice) {
        log::warn!("notice: {:?}", notice);
        if let Some(ref delegate) = self.delegate {
            delegate.on_notice(&notice);
        }
    }
}

impl<R: AudioRecorder + 'static, P: AudioPlayer + 'static> Drop for RecorderWorkspace<R, P> {
    fn drop(&mut self) {
        self.playback.stop();
        if self.capture.state().is_active() {
            log::warn!("workspace dropped while recording; discarding take");
            self.capture.discard();
        }
    }
}
