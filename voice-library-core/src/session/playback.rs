use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::LibraryError;
use crate::models::state::{PlaybackSource, PlaybackState};
use crate::traits::delegate::SessionDelegate;
use crate::traits::player::AudioPlayer;
use crate::traits::resolver::FileReferenceResolver;

/// Internal playback state, protected by `parking_lot::Mutex`.
#[derive(Debug, Clone)]
struct Cursor {
    state: PlaybackState,
    source: Option<PlaybackSource>,
    path: Option<PathBuf>,
    position_ms: u64,
    duration_ms: u64,
}

impl Cursor {
    fn inactive() -> Self {
        Self {
            state: PlaybackState::Inactive,
            source: None,
            path: None,
            position_ms: 0,
            duration_ms: 0,
        }
    }
}

/// What a `play` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// `play` on the source that was already playing stops it instead.
    Stopped,
}

/// Read-only view of the playback session for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub source: Option<PlaybackSource>,
    pub path: Option<PathBuf>,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// The single audio output lifecycle.
///
/// Starting a new source always unloads the previous one first, so at most
/// one source holds the output device. Position is refreshed on a timer
/// thread; natural completion returns the session to `Inactive`.
pub struct PlaybackSession<P: AudioPlayer + 'static> {
    player: Arc<Mutex<P>>,
    cursor: Arc<Mutex<Cursor>>,
    resolver: Arc<dyn FileReferenceResolver>,
    delegate: Option<Arc<dyn SessionDelegate>>,
    update_interval: Duration,

    ticker_running: Arc<AtomicBool>,
    ticker_handle: Option<thread::JoinHandle<()>>,
}

impl<P: AudioPlayer + 'static> PlaybackSession<P> {
    pub fn new(player: P, resolver: Arc<dyn FileReferenceResolver>, update_interval: Duration) -> Self {
        Self {
            player: Arc::new(Mutex::new(player)),
            cursor: Arc::new(Mutex::new(Cursor::inactive())),
            resolver,
            delegate: None,
            update_interval,
            ticker_running: Arc::new(AtomicBool::new(false)),
            ticker_handle: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> PlaybackState {
        self.cursor.lock().state
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let cursor = self.cursor.lock();
        PlaybackSnapshot {
            state: cursor.state,
            source: cursor.source.clone(),
            path: cursor.path.clone(),
            position_ms: cursor.position_ms,
            duration_ms: cursor.duration_ms,
        }
    }

    /// Whether `source` is loaded and playing or paused.
    pub fn is_live_for(&self, source: &PlaybackSource) -> bool {
        let cursor = self.cursor.lock();
        cursor.state.is_live() && cursor.source.as_ref() == Some(source)
    }

    /// Position of `source` if it is the live source.
    pub fn position_for(&self, source: &PlaybackSource) -> Option<u64> {
        let cursor = self.cursor.lock();
        (cursor.state.is_live() && cursor.source.as_ref() == Some(source)).then_some(cursor.position_ms)
    }

    /// Play `locator`, tagged as `source`.
    ///
    /// Calling this again for the source that is currently playing stops it.
    /// A missing file or a load failure leaves the session inactive.
    pub fn play(&mut self, locator: &Path, source: PlaybackSource) -> Result<PlayOutcome, LibraryError> {
        let already_playing = {
            let cursor = self.cursor.lock();
            cursor.state == PlaybackState::Playing && cursor.source.as_ref() == Some(&source)
        };
        if already_playing {
            self.stop();
            return Ok(PlayOutcome::Stopped);
        }

        let path = self.resolver.resolve(locator);
        if !self.resolver.exists(&path) {
            log::warn!("playback source missing: {}", path.display());
            return Err(LibraryError::FileMissing(path));
        }

        self.stop();

        *self.cursor.lock() = Cursor {
            state: PlaybackState::Loading,
            source: Some(source),
            path: Some(path.clone()),
            position_ms: 0,
            duration_ms: 0,
        };
        self.notify();

        let loaded = {
            let mut player = self.player.lock();
            player.load(&path).and_then(|duration| player.play().map(|_| duration))
        };

        match loaded {
            Ok(duration_ms) => {
                {
                    let mut cursor = self.cursor.lock();
                    cursor.state = PlaybackState::Playing;
                    cursor.duration_ms = duration_ms;
                }
                self.notify();
                self.start_ticker();
                Ok(PlayOutcome::Started)
            }
            Err(e) => {
                log::error!("failed to open {}: {}", path.display(), e);
                self.release();
                Err(e)
            }
        }
    }

    /// Transitions: playing → paused. No-op when already paused.
    pub fn pause(&mut self) -> Result<(), LibraryError> {
        match self.state() {
            PlaybackState::Paused => Ok(()),
            PlaybackState::Playing => {
                self.player.lock().pause()?;
                self.cursor.lock().state = PlaybackState::Paused;
                self.notify();
                Ok(())
            }
            other => Err(LibraryError::InvalidState(format!("cannot pause while {:?}", other))),
        }
    }

    /// Transitions: paused → playing. No-op when already playing.
    pub fn resume(&mut self) -> Result<(), LibraryError> {
        match self.state() {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                self.player.lock().play()?;
                self.cursor.lock().state = PlaybackState::Playing;
                self.notify();
                Ok(())
            }
            other => Err(LibraryError::InvalidState(format!("cannot resume while {:?}", other))),
        }
    }

    /// Jump to `position_ms`, clamped to the loaded duration.
    pub fn seek(&mut self, position_ms: u64) -> Result<(), LibraryError> {
        let duration = {
            let cursor = self.cursor.lock();
            if !cursor.state.is_live() {
                return Err(LibraryError::InvalidState(format!(
                    "cannot seek while {:?}",
                    cursor.state
                )));
            }
            cursor.duration_ms
        };

        let target = position_ms.min(duration);
        self.player.lock().seek(target)?;
        self.cursor.lock().position_ms = target;
        self.notify();
        Ok(())
    }

    /// Stop and unload whatever is loaded. Always ends inactive.
    pub fn stop(&mut self) {
        if self.state() == PlaybackState::Inactive {
            return;
        }
        self.release();
    }

    /// Stop if the loaded file is `path`, so it can be moved or deleted.
    pub fn release_path(&mut self, path: &Path) {
        let holds = self.cursor.lock().path.as_deref() == Some(path);
        if holds {
            log::debug!("releasing {} before file operation", path.display());
            self.release();
        }
    }

    /// Stop if `source` is the loaded source.
    pub fn release_source(&mut self, source: &PlaybackSource) {
        let holds = self.cursor.lock().source.as_ref() == Some(source);
        if holds {
            self.release();
        }
    }

    /// Read the player once. Called by the ticker thread.
    pub fn poll_status(&self) {
        Self::tick(&self.player, &self.cursor, self.delegate.as_deref());
    }

    // --- Internal helpers ---

    fn release(&mut self) {
        self.stop_ticker();
        {
            let mut player = self.player.lock();
            if let Err(e) = player.stop() {
                log::warn!("player stop failed: {}", e);
            }
            if let Err(e) = player.unload() {
                log::warn!("player unload failed: {}", e);
            }
        }
        let was_active = {
            let mut cursor = self.cursor.lock();
            let was_active = cursor.state != PlaybackState::Inactive;
            *cursor = Cursor::inactive();
            was_active
        };
        if was_active {
            self.notify();
        }
    }

    fn notify(&self) {
        Self::notify_with(&self.cursor, self.delegate.as_deref());
    }

    fn notify_with(cursor: &Mutex<Cursor>, delegate: Option<&dyn SessionDelegate>) {
        let Some(delegate) = delegate else {
            return;
        };
        let cursor = cursor.lock().clone();
        delegate.on_playback_changed(
            cursor.state,
            cursor.source.as_ref(),
            cursor.position_ms,
            cursor.duration_ms,
        );
    }

    /// One position update. Returns `false` once the source has finished.
    fn tick(player: &Mutex<P>, cursor: &Mutex<Cursor>, delegate: Option<&dyn SessionDelegate>) -> bool {
        if cursor.lock().state != PlaybackState::Playing {
            return true;
        }
        let status = player.lock().status();

        if status.did_just_finish {
            {
                let mut c = cursor.lock();
                c.state = PlaybackState::Finished;
                c.position_ms = c.duration_ms;
            }
            Self::notify_with(cursor, delegate);

            if let Err(e) = player.lock().unload() {
                log::warn!("player unload after finish failed: {}", e);
            }
            *cursor.lock() = Cursor::inactive();
            Self::notify_with(cursor, delegate);
            return false;
        }

        {
            let mut c = cursor.lock();
            if c.state != PlaybackState::Playing {
                return true;
            }
            c.position_ms = status.position_ms;
            if status.duration_ms > 0 {
                c.duration_ms = status.duration_ms;
            }
        }
        Self::notify_with(cursor, delegate);
        true
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();
        self.ticker_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.ticker_running);
        let player = Arc::clone(&self.player);
        let cursor = Arc::clone(&self.cursor);
        let delegate = self.delegate.clone();
        let interval = self.update_interval;

        let spawned = thread::Builder::new()
            .name("playback-ticker".into())
            .spawn(move || {
                while super::wait_for_tick(&running, interval) {
                    if !Self::tick(&player, &cursor, delegate.as_deref()) {
                        running.store(false, Ordering::SeqCst);
                    }
                }
            });

        match spawned {
            Ok(handle) => self.ticker_handle = Some(handle),
            Err(e) => {
                log::error!("failed to spawn playback ticker: {}", e);
                self.ticker_running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop_ticker(&mut self) {
        self.ticker_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker_handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl<P: AudioPlayer + 'static> Drop for PlaybackSession<P> {
    fn drop(&mut self) {
        self.stop_ticker();
        if self.state() != PlaybackState::Inactive {
            self.release();
        }
    }
}
