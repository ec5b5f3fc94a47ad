/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording ↔ paused
///            ↓         ↓
///      stopped / discarded
/// ```
/// `Stopped` and `Discarded` are terminal for one take; `start` begins a new take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    Stopped,
    Discarded,
}

impl CaptureState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Discarded)
    }

    pub fn can_start(&self) -> bool {
        *self == Self::Idle || self.is_terminal()
    }
}

/// Which item a playback session belongs to.
///
/// Used by observers to highlight the active row; never used to find the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaybackSource {
    /// A library record, by id.
    Record(String),
    /// The current draft (fresh capture, pick, or a library item in preview).
    Preview,
}

/// Playback session state machine.
///
/// ```text
/// inactive → loading → playing ↔ paused
///               ↓         ↓        ↓
///           inactive   finished → inactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Inactive,
    Loading,
    Playing,
    Paused,
    Finished,
}

impl PlaybackState {
    /// True while a source is loaded and holding the output device.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_or_terminal_can_start() {
        assert!(CaptureState::Idle.can_start());
        assert!(CaptureState::Stopped.can_start());
        assert!(CaptureState::Discarded.can_start());
        assert!(!CaptureState::Recording.can_start());
        assert!(!CaptureState::Paused.can_start());
    }

    #[test]
    fn live_playback_states() {
        assert!(PlaybackState::Playing.is_live());
        assert!(PlaybackState::Paused.is_live());
        assert!(!PlaybackState::Loading.is_live());
        assert!(!PlaybackState::Finished.is_live());
    }
}
