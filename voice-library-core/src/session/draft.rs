use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::config::LibraryConfiguration;
use crate::models::draft::{CapturedAudio, DraftOrigin, PickedFile, SelectionDraft};
use crate::models::error::LibraryError;
use crate::models::record::RecordingRecord;
use crate::processing::waveform::format_duration;
use crate::session::library::LibraryIndex;
use crate::storage::files;
use crate::traits::resolver::FileReferenceResolver;

const DEFAULT_MIME: &str = "audio/m4a";

/// Holds the file the user is previewing and moves it into the library.
///
/// Whether the draft is committed is never stored; it is derived from the
/// library each time it is asked for.
pub struct DraftController {
    draft: Option<SelectionDraft>,
    storage_root: PathBuf,
    audio_extension: String,
    resolver: Arc<dyn FileReferenceResolver>,
}

impl DraftController {
    pub fn new(config: &LibraryConfiguration, resolver: Arc<dyn FileReferenceResolver>) -> Self {
        Self {
            draft: None,
            storage_root: config.storage_root.clone(),
            audio_extension: config.audio_extension.clone(),
            resolver,
        }
    }

    pub fn current(&self) -> Option<&SelectionDraft> {
        self.draft.as_ref()
    }

    pub fn set_from_capture(&mut self, audio: CapturedAudio) {
        self.draft = Some(SelectionDraft {
            name: audio.display_name,
            locator: audio.file_path,
            size_hint: 0,
            mime_hint: DEFAULT_MIME.to_string(),
            origin: DraftOrigin::Capture,
            duration_label: format_duration(audio.duration_ms),
            duration_ms: audio.duration_ms,
            amplitude_samples: audio.samples,
            flags: audio.flags,
        });
    }

    /// Preview a saved record. The locator is resolved up front.
    pub fn set_from_library(&mut self, record: &RecordingRecord) {
        self.draft = Some(SelectionDraft {
            name: record.name.clone(),
            locator: self.resolver.resolve(&record.locator),
            size_hint: 0,
            mime_hint: DEFAULT_MIME.to_string(),
            origin: DraftOrigin::Library {
                record_id: record.id.clone(),
            },
            duration_label: record.duration_label.clone(),
            duration_ms: 0,
            amplitude_samples: record.amplitude_samples.clone(),
            flags: record.flags.clone(),
        });
    }

    pub fn set_from_pick(&mut self, file: PickedFile) {
        self.draft = Some(SelectionDraft {
            name: file.name,
            locator: file.path,
            size_hint: file.size,
            mime_hint: file.mime_type,
            origin: DraftOrigin::Pick,
            duration_label: format_duration(0),
            duration_ms: 0,
            amplitude_samples: Vec::new(),
            flags: Vec::new(),
        });
    }

    /// Record new flags on a capture draft so they are saved with it.
    pub fn sync_flags(&mut self, flags: Vec<u64>) {
        if let Some(draft) = self.draft.as_mut() {
            if draft.origin == DraftOrigin::Capture {
                draft.flags = flags;
            }
        }
    }

    /// Drop the draft. The caller has already confirmed with the user.
    pub fn clear(&mut self) -> Option<SelectionDraft> {
        self.draft.take()
    }

    /// True iff a library record points at the draft's file.
    pub fn is_committed(&self, library: &LibraryIndex) -> bool {
        self.draft
            .as_ref()
            .is_some_and(|draft| library.find_by_locator(&draft.locator).is_some())
    }

    /// The library record backing the draft, if committed.
    pub fn committed_record(&self, library: &LibraryIndex) -> Option<RecordingRecord> {
        self.draft
            .as_ref()
            .and_then(|draft| library.find_by_locator(&draft.locator))
    }

    /// Copy the draft into the storage root and register it in the library.
    ///
    /// The stored file is named after the sanitized display name, so a picked
    /// file's name can never place the copy outside the storage root. The
    /// source file is left in place. Afterwards the draft points at the
    /// stored copy so later renames and processing act on the saved file; its
    /// origin is kept so a saved take can still be flagged during preview.
    pub fn commit(&mut self, library: &LibraryIndex) -> Result<RecordingRecord, LibraryError> {
        if self.is_committed(library) {
            return Err(LibraryError::AlreadyCommitted);
        }
        let draft = self.draft.as_ref().ok_or(LibraryError::NoDraft)?;

        let source = self.resolver.resolve(&draft.locator);
        if !self.resolver.exists(&source) {
            return Err(LibraryError::FileMissing(source));
        }

        let name = files::sanitize_name(&draft.name, &self.audio_extension)?;
        let destination = self.storage_root.join(&name);
        let copied = destination != source;
        if copied {
            if self.resolver.exists(&destination) {
                return Err(LibraryError::NameCollision(name));
            }
            files::copy_file(&source, &destination)?;
        }

        let from_capture = draft.origin == DraftOrigin::Capture;
        let record = RecordingRecord {
            id: library.next_id(),
            name,
            locator: destination.clone(),
            created_at: chrono::Local::now().format("%d.%m.%Y").to_string(),
            duration_label: draft.duration_label.clone(),
            amplitude_samples: if from_capture {
                draft.amplitude_samples.clone()
            } else {
                Vec::new()
            },
            flags: if from_capture { draft.flags.clone() } else { Vec::new() },
            used_settings: None,
        };

        if let Err(e) = library.append(record.clone()) {
            if copied {
                if let Err(cleanup) = files::remove_file(&destination) {
                    log::warn!("could not remove orphaned copy {}: {}", destination.display(), cleanup);
                }
            }
            return Err(e);
        }

        if let Some(draft) = self.draft.as_mut() {
            draft.name = record.name.clone();
            draft.locator = destination;
        }
        log::info!("committed {} as record {}", record.name, record.id);
        Ok(record)
    }

    /// Rename the draft's file.
    ///
    /// A committed draft is renamed through the library so the record and
    /// the file move together; an uncommitted draft is moved in place.
    /// `release` runs with the current path before the move.
    pub fn rename(
        &mut self,
        library: &LibraryIndex,
        new_name: &str,
        mut release: impl FnMut(&Path),
    ) -> Result<(), LibraryError> {
        let draft = self.draft.as_ref().ok_or(LibraryError::NoDraft)?;
        let clean = files::sanitize_name(new_name, &self.audio_extension)?;
        if draft.name == clean {
            log::debug!("draft rename skipped: name unchanged");
            return Ok(());
        }

        let new_path = match library.find_by_locator(&draft.locator) {
            Some(record) => library.rename_with(&record.id, &clean, &mut release)?,
            None => {
                let old_path = self.resolver.resolve(&draft.locator);
                if !self.resolver.exists(&old_path) {
                    return Err(LibraryError::FileMissing(old_path));
                }
                let new_path = old_path.with_file_name(&clean);
                if self.resolver.exists(&new_path) {
                    return Err(LibraryError::NameCollision(clean));
                }
                release(&old_path);
                files::move_file(&old_path, &new_path)?;
                new_path
            }
        };

        if let Some(draft) = self.draft.as_mut() {
            draft.name = clean;
            draft.locator = new_path;
        }
        Ok(())
    }

    /// Resolved path of the draft for sharing or upload.
    pub fn shareable_path(&self) -> Result<PathBuf, LibraryError> {
        let draft = self.draft.as_ref().ok_or(LibraryError::NoDraft)?;
        let path = self.resolver.resolve(&draft.locator);
        if !self.resolver.exists(&path) {
            return Err(LibraryError::FileMissing(path));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::storage::cipher::AesGcmCipher;
    use crate::storage::key_value::MemoryKeyValueStore;
    use crate::storage::resolver::IdentityResolver;
    use crate::storage::secure_store::SecureStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: LibraryConfiguration,
        library: LibraryIndex,
        drafts: DraftController,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = LibraryConfiguration {
            storage_root: dir.path().join("Documents"),
            cache_root: dir.path().join("Caches"),
            ..Default::default()
        };
        fs::create_dir_all(&config.cache_root).unwrap();
        let resolver: Arc<dyn FileReferenceResolver> = Arc::new(IdentityResolver);
        let store = SecureStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            Some(Box::new(AesGcmCipher::from_secret("test"))),
        );
        let library = LibraryIndex::new(store, resolver.clone(), "m4a");
        let drafts = DraftController::new(&config, resolver);
        Fixture {
            _dir: dir,
            config,
            library,
            drafts,
        }
    }

    impl Fixture {
        fn capture(&mut self, name: &str) -> PathBuf {
            let path = self.config.cache_root.join("recording-1234.m4a");
            fs::write(&path, b"captured").unwrap();
            self.drafts.set_from_capture(CapturedAudio {
                file_path: path.clone(),
                display_name: name.to_string(),
                duration_ms: 3_200,
                samples: vec![-40.0, -20.0, -10.0],
                flags: vec![1_500],
            });
            path
        }
    }

    #[test]
    fn commit_copies_and_registers() {
        let mut f = fixture();
        let cache_path = f.capture("Test.m4a");
        assert!(!f.drafts.is_committed(&f.library));

        let record = f.drafts.commit(&f.library).unwrap();

        let stored = f.config.storage_root.join("Test.m4a");
        assert_eq!(record.locator, stored);
        assert_eq!(record.duration_label, "00:03");
        assert_eq!(record.amplitude_samples, vec![-40.0, -20.0, -10.0]);
        assert_eq!(record.flags, vec![1_500]);
        assert!(stored.exists());
        assert!(cache_path.exists(), "commit copies, it does not move");

        let draft = f.drafts.current().unwrap();
        assert_eq!(draft.locator, stored);
        assert!(f.drafts.is_committed(&f.library));
    }

    #[test]
    fn commit_without_draft_fails() {
        let mut f = fixture();
        assert_eq!(f.drafts.commit(&f.library), Err(LibraryError::NoDraft));
    }

    #[test]
    fn commit_twice_is_rejected() {
        let mut f = fixture();
        f.capture("Test.m4a");
        f.drafts.commit(&f.library).unwrap();
        assert_eq!(f.drafts.commit(&f.library), Err(LibraryError::AlreadyCommitted));
        assert_eq!(f.library.len(), 1);
    }

    #[test]
    fn commit_rejects_name_collision() {
        let mut f = fixture();
        fs::create_dir_all(&f.config.storage_root).unwrap();
        fs::write(f.config.storage_root.join("Test.m4a"), b"other").unwrap();
        f.capture("Test.m4a");

        assert!(matches!(f.drafts.commit(&f.library), Err(LibraryError::NameCollision(_))));
        assert!(f.library.is_empty());
    }

    #[test]
    fn commit_missing_source_fails() {
        let mut f = fixture();
        let path = f.capture("Test.m4a");
        fs::remove_file(&path).unwrap();
        assert_eq!(f.drafts.commit(&f.library), Err(LibraryError::FileMissing(path)));
    }

    #[test]
    fn picked_file_commits_without_samples() {
        let mut f = fixture();
        let path = f.config.cache_root.join("voice-note.m4a");
        fs::write(&path, b"picked").unwrap();
        f.drafts.set_from_pick(PickedFile {
            name: "voice-note.m4a".into(),
            path,
            size: 6,
            mime_type: "audio/mp4".into(),
        });

        let record = f.drafts.commit(&f.library).unwrap();
        assert!(record.amplitude_samples.is_empty());
        assert_eq!(record.name, "voice-note.m4a");
    }

    #[test]
    fn picked_name_is_sanitized_into_storage_root() {
        let mut f = fixture();
        let path = f.config.cache_root.join("notes.mp3");
        fs::write(&path, b"picked").unwrap();
        f.drafts.set_from_pick(PickedFile {
            name: "../notes.mp3".into(),
            path,
            size: 6,
            mime_type: "audio/mpeg".into(),
        });

        let record = f.drafts.commit(&f.library).unwrap();

        assert_eq!(record.name, "notesmp3.m4a");
        assert_eq!(record.locator, f.config.storage_root.join("notesmp3.m4a"));
        assert_eq!(record.locator.parent(), Some(f.config.storage_root.as_path()));
        assert!(record.locator.exists());
        assert_eq!(f.drafts.current().unwrap().name, "notesmp3.m4a");
        assert!(f.drafts.is_committed(&f.library));
    }

    #[test]
    fn picked_name_without_usable_characters_is_rejected() {
        let mut f = fixture();
        let path = f.config.cache_root.join("x.m4a");
        fs::write(&path, b"picked").unwrap();
        f.drafts.set_from_pick(PickedFile {
            name: "/../".into(),
            path,
            size: 6,
            mime_type: "audio/m4a".into(),
        });

        assert!(matches!(f.drafts.commit(&f.library), Err(LibraryError::InvalidName(_))));
        assert!(f.library.is_empty());
    }

    #[test]
    fn committed_take_keeps_capture_origin() {
        let mut f = fixture();
        f.capture("Test.m4a");
        f.drafts.commit(&f.library).unwrap();
        assert_eq!(f.drafts.current().unwrap().origin, DraftOrigin::Capture);
    }

    #[test]
    fn committed_until_record_removed() {
        let mut f = fixture();
        f.capture("Test.m4a");
        let record = f.drafts.commit(&f.library).unwrap();
        assert!(f.drafts.is_committed(&f.library));

        f.library.remove(&record.id).unwrap();
        assert!(!f.drafts.is_committed(&f.library));
    }

    #[test]
    fn library_draft_is_committed() {
        let mut f = fixture();
        f.capture("Test.m4a");
        let record = f.drafts.commit(&f.library).unwrap();
        f.drafts.clear();
        assert!(!f.drafts.is_committed(&f.library));

        f.drafts.set_from_library(&record);
        assert!(f.drafts.is_committed(&f.library));
        assert_eq!(f.drafts.current().unwrap().amplitude_samples, record.amplitude_samples);
    }

    #[test]
    fn rename_uncommitted_moves_in_place() {
        let mut f = fixture();
        let cache_path = f.capture("Rec_10-00-00.m4a");

        f.drafts.rename(&f.library, "Standup", |_| {}).unwrap();

        let draft = f.drafts.current().unwrap();
        assert_eq!(draft.name, "Standup.m4a");
        assert_eq!(draft.locator, f.config.cache_root.join("Standup.m4a"));
        assert!(!cache_path.exists());
        assert!(draft.locator.exists());
    }

    #[test]
    fn rename_committed_updates_record() {
        let mut f = fixture();
        f.capture("Test.m4a");
        let record = f.drafts.commit(&f.library).unwrap();

        let mut released = Vec::new();
        f.drafts
            .rename(&f.library, "Renamed", |p| released.push(p.to_path_buf()))
            .unwrap();

        let renamed = f.library.get(&record.id).unwrap();
        assert_eq!(renamed.name, "Renamed.m4a");
        assert_eq!(f.drafts.current().unwrap().locator, renamed.locator);
        assert_eq!(released, vec![record.locator]);
        assert!(f.drafts.is_committed(&f.library));
    }

    #[test]
    fn rename_rejects_bad_name_and_missing_file() {
        let mut f = fixture();
        let path = f.capture("Test.m4a");

        assert!(matches!(
            f.drafts.rename(&f.library, "***", |_| {}),
            Err(LibraryError::InvalidName(_))
        ));

        fs::remove_file(&path).unwrap();
        assert_eq!(
            f.drafts.rename(&f.library, "Other", |_| {}),
            Err(LibraryError::FileMissing(path))
        );
        assert_eq!(f.drafts.current().unwrap().name, "Test.m4a");
    }

    #[test]
    fn shareable_path_checks_existence() {
        let mut f = fixture();
        assert_eq!(f.drafts.shareable_path(), Err(LibraryError::NoDraft));
        let path = f.capture("Test.m4a");
        assert_eq!(f.drafts.shareable_path(), Ok(path.clone()));
        fs::remove_file(&path).unwrap();
        assert_eq!(f.drafts.shareable_path(), Err(LibraryError::FileMissing(path)));
    }
}
