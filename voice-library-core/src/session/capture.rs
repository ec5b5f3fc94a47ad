use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::config::LibraryConfiguration;
use crate::models::draft::CapturedAudio;
use crate::models::error::LibraryError;
use crate::models::state::CaptureState;
use crate::processing::waveform::SILENCE_DB;
use crate::traits::delegate::{Notice, SessionDelegate};
use crate::traits::recorder::AudioRecorder;

/// Internal mutable take state, protected by `parking_lot::Mutex`.
struct TakeState {
    state: CaptureState,
    elapsed_ms: u64,
    samples: Vec<f32>,
    flags: Vec<u64>,
    last_flag_at: Option<Instant>,
}

impl TakeState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            elapsed_ms: 0,
            samples: Vec::new(),
            flags: Vec::new(),
            last_flag_at: None,
        }
    }

    fn clear(&mut self) {
        self.elapsed_ms = 0;
        self.samples.clear();
        self.flags.clear();
        self.last_flag_at = None;
    }
}

/// One microphone capture lifecycle at a time.
///
/// ```text
/// [AudioRecorder] ←poll every sample_interval─ [sampler thread] → samples / elapsed
/// ```
///
/// Samples are the raw dBFS readings, appended while recording and cleared
/// only by `start` and `discard`. Dropping the session releases the recorder.
pub struct CaptureSession<R: AudioRecorder + 'static> {
    recorder: Arc<Mutex<R>>,
    take: Arc<Mutex<TakeState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
    sample_interval: Duration,
    flag_cooldown: Duration,
    cache_extension: String,

    sampler_running: Arc<AtomicBool>,
    sampler_handle: Option<thread::JoinHandle<()>>,
}

impl<R: AudioRecorder + 'static> CaptureSession<R> {
    pub fn new(recorder: R, config: &LibraryConfiguration) -> Self {
        Self {
            recorder: Arc::new(Mutex::new(recorder)),
            take: Arc::new(Mutex::new(TakeState::new())),
            delegate: None,
            sample_interval: config.sample_interval,
            flag_cooldown: config.flag_cooldown,
            cache_extension: config.audio_extension.clone(),
            sampler_running: Arc::new(AtomicBool::new(false)),
            sampler_handle: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.take.lock().state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.take.lock().elapsed_ms
    }

    pub fn samples(&self) -> Vec<f32> {
        self.take.lock().samples.clone()
    }

    pub fn flags(&self) -> Vec<u64> {
        self.take.lock().flags.clone()
    }

    /// Begin a new take. Transitions: idle/stopped/discarded → recording.
    ///
    /// On permission denial or device failure the state is left unchanged.
    pub fn start(&mut self) -> Result<(), LibraryError> {
        let current = self.state();
        if !current.can_start() {
            return Err(LibraryError::InvalidState(format!(
                "cannot start while {:?}",
                current
            )));
        }

        {
            let mut recorder = self.recorder.lock();
            if !recorder.request_permission() {
                log::warn!("microphone permission denied");
                return Err(LibraryError::PermissionDenied);
            }
            recorder.start()?;
        }

        self.take.lock().clear();
        self.set_state(CaptureState::Recording);
        self.start_sampler();
        log::info!("recording started");
        Ok(())
    }

    /// Transitions: recording → paused. No-op when already paused.
    pub fn pause(&mut self) -> Result<(), LibraryError> {
        match self.state() {
            CaptureState::Paused => Ok(()),
            CaptureState::Recording => {
                self.recorder.lock().pause()?;
                self.set_state(CaptureState::Paused);
                Ok(())
            }
            other => Err(LibraryError::InvalidState(format!("cannot pause while {:?}", other))),
        }
    }

    /// Transitions: paused → recording. No-op when already recording.
    pub fn resume(&mut self) -> Result<(), LibraryError> {
        match self.state() {
            CaptureState::Recording => Ok(()),
            CaptureState::Paused => {
                self.recorder.lock().resume()?;
                self.set_state(CaptureState::Recording);
                Ok(())
            }
            other => Err(LibraryError::InvalidState(format!("cannot resume while {:?}", other))),
        }
    }

    /// Finalize the take. Transitions: recording/paused → stopped.
    ///
    /// Returns `Ok(None)` when no take is active, so a double-tapped stop is
    /// harmless. A finalize failure still ends in `Stopped` and is returned
    /// as `FinalizeFailed`; no audio is produced.
    pub fn stop(&mut self) -> Result<Option<CapturedAudio>, LibraryError> {
        if !self.state().is_active() {
            log::debug!("stop ignored: no active take");
            return Ok(None);
        }

        self.stop_sampler();
        self.poll_status();

        let finalized = self.recorder.lock().stop();
        self.set_state(CaptureState::Stopped);

        match finalized {
            Ok(file_path) => {
                let take = self.take.lock();
                let audio = CapturedAudio {
                    file_path,
                    display_name: self.display_name_now(),
                    duration_ms: take.elapsed_ms,
                    samples: take.samples.clone(),
                    flags: take.flags.clone(),
                };
                log::info!("recording stopped after {}ms", audio.duration_ms);
                Ok(Some(audio))
            }
            Err(e) => {
                log::error!("failed to finalize recording: {}", e);
                let message = e.to_string();
                if let Some(ref delegate) = self.delegate {
                    delegate.on_notice(&Notice::RecordingLost(message.clone()));
                }
                Err(LibraryError::FinalizeFailed(message))
            }
        }
    }

    /// Throw the take away. Transitions: recording/paused → discarded.
    ///
    /// Recorder release errors are logged and swallowed.
    pub fn discard(&mut self) {
        if !self.state().is_active() {
            log::debug!("discard ignored: no active take");
            return;
        }

        self.stop_sampler();
        if let Err(e) = self.recorder.lock().stop() {
            log::warn!("recorder release failed during discard: {}", e);
        }
        self.take.lock().clear();
        self.set_state(CaptureState::Discarded);
    }

    /// Mark a moment of interest.
    ///
    /// While recording the offset is the elapsed time; otherwise
    /// `playback_position_ms` must carry the position of a playback of this
    /// same take. Returns the accepted offset, or `None` when the request is
    /// out of context or inside the cool-down window.
    pub fn add_flag(&self, playback_position_ms: Option<u64>) -> Option<u64> {
        let offset = {
            let mut take = self.take.lock();
            let offset = match (take.state, playback_position_ms) {
                (CaptureState::Recording, _) => take.elapsed_ms,
                (_, Some(position)) => position,
                _ => {
                    log::debug!("flag ignored: not recording and no preview playback");
                    return None;
                }
            };

            let now = Instant::now();
            if let Some(last) = take.last_flag_at {
                if now.duration_since(last) < self.flag_cooldown {
                    log::debug!("flag ignored: within cool-down");
                    return None;
                }
            }
            take.last_flag_at = Some(now);
            take.flags.push(offset);
            offset
        };

        if let Some(ref delegate) = self.delegate {
            delegate.on_flag_added(offset);
        }
        Some(offset)
    }

    /// Clear samples and flags without touching the lifecycle state.
    ///
    /// Used when the user backs out of a stopped take's preview.
    pub fn clear_take(&self) {
        let mut take = self.take.lock();
        if take.state.is_active() {
            return;
        }
        take.clear();
    }

    /// Read the recorder once and append a sample. Called by the sampler thread.
    pub fn poll_status(&self) {
        Self::sample_once(&self.recorder, &self.take, self.delegate.as_deref());
    }

    // --- Internal helpers ---

    fn display_name_now(&self) -> String {
        format!(
            "Rec_{}.{}",
            chrono::Local::now().format("%H-%M-%S"),
            self.cache_extension
        )
    }

    fn set_state(&self, new_state: CaptureState) {
        self.take.lock().state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_state_changed(new_state);
        }
    }

    fn sample_once(recorder: &Mutex<R>, take: &Mutex<TakeState>, delegate: Option<&dyn SessionDelegate>) {
        if take.lock().state != CaptureState::Recording {
            return;
        }
        let status = recorder.lock().status();
        let level = status.metering_db.unwrap_or(SILENCE_DB);

        {
            let mut take = take.lock();
            if take.state != CaptureState::Recording {
                return;
            }
            take.elapsed_ms = status.duration_ms;
            take.samples.push(level);
        }

        if let Some(d) = delegate {
            d.on_capture_progress(status.duration_ms, level);
        }
    }

    fn start_sampler(&mut self) {
        self.stop_sampler();
        self.sampler_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.sampler_running);
        let recorder = Arc::clone(&self.recorder);
        let take = Arc::clone(&self.take);
        let delegate = self.delegate.clone();
        let interval = self.sample_interval;

        let spawned = thread::Builder::new()
            .name("capture-sampler".into())
            .spawn(move || {
                while super::wait_for_tick(&running, interval) {
                    Self::sample_once(&recorder, &take, delegate.as_deref());
                }
            });

        match spawned {
            Ok(handle) => self.sampler_handle = Some(handle),
            Err(e) => {
                // Sampling only drives the live waveform; the take itself continues.
                log::error!("failed to spawn capture sampler: {}", e);
                self.sampler_running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop_sampler(&mut self) {
        self.sampler_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.sampler_handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl<R: AudioRecorder + 'static> Drop for CaptureSession<R> {
    fn drop(&mut self) {
        self.stop_sampler();
        if self.take.lock().state.is_active() {
            if let Err(e) = self.recorder.lock().stop() {
                log::warn!("recorder release failed during teardown: {}", e);
            }
        }
    }
}
