use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the recording library and its sessions.
#[derive(Debug, Clone)]
pub struct LibraryConfiguration {
    /// Stable per-app storage root. Committed recordings live here.
    pub storage_root: PathBuf,

    /// Volatile root for fresh captures and picked files.
    pub cache_root: PathBuf,

    /// Secret for the encrypted library blob. `None` disables persistence.
    pub secret_key: Option<String>,

    /// Fixed audio extension without the dot (default: `m4a`).
    pub audio_extension: String,

    /// How often the recorder is polled for duration and metering (default: 75ms).
    pub sample_interval: Duration,

    /// How often playback position is refreshed (default: 250ms).
    pub playback_update_interval: Duration,

    /// Minimum spacing between two accepted flags (default: 500ms).
    pub flag_cooldown: Duration,

    /// Path components that mark a locator as volatile (never rewritten).
    pub volatile_markers: Vec<String>,
}

impl LibraryConfiguration {
    /// Secret baked in at build time from `VOICE_LIBRARY_SECRET_KEY`, if set.
    pub fn secret_key_from_build() -> Option<String> {
        option_env!("VOICE_LIBRARY_SECRET_KEY")
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.audio_extension.is_empty() || self.audio_extension.contains('.') {
            return Err(format!("invalid audio extension: {:?}", self.audio_extension));
        }
        if self.sample_interval.is_zero() {
            return Err("sample interval must be positive".into());
        }
        if self.playback_update_interval.is_zero() {
            return Err("playback update interval must be positive".into());
        }
        if self.storage_root == self.cache_root {
            return Err("storage root and cache root must differ".into());
        }
        Ok(())
    }
}

impl Default for LibraryConfiguration {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("documents"),
            cache_root: PathBuf::from("caches"),
            secret_key: Self::secret_key_from_build(),
            audio_extension: "m4a".to_string(),
            sample_interval: Duration::from_millis(75),
            playback_update_interval: Duration::from_millis(250),
            flag_cooldown: Duration::from_millis(500),
            volatile_markers: vec!["tmp".to_string(), "Caches".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates() {
        assert!(LibraryConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_dotted_extension() {
        let config = LibraryConfiguration {
            audio_extension: ".m4a".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_shared_roots() {
        let config = LibraryConfiguration {
            storage_root: PathBuf::from("/data"),
            cache_root: PathBuf::from("/data"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
