use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::LibraryError;
use crate::models::record::{ProcessSettings, RecordingRecord};
use crate::storage::files;
use crate::storage::secure_store::{LoadStatus, SecureStore};
use crate::traits::delegate::SessionDelegate;
use crate::traits::resolver::FileReferenceResolver;

/// A record together with the current state of its file.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub record: RecordingRecord,
    pub resolved_path: PathBuf,
    /// `false` when the file is gone; the record stays listed as missing.
    pub available: bool,
}

/// Ordered, persisted collection of saved recordings (newest first).
///
/// Each mutation holds the index lock across the file-system change and the
/// `SecureStore::save` that follows it, so mutations are applied one at a
/// time and the in-memory list never runs ahead of the persisted blob. A
/// failed save rolls the in-memory change back.
pub struct LibraryIndex {
    records: Mutex<Vec<RecordingRecord>>,
    store: SecureStore,
    resolver: Arc<dyn FileReferenceResolver>,
    audio_extension: String,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl LibraryIndex {
    pub fn new(store: SecureStore, resolver: Arc<dyn FileReferenceResolver>, audio_extension: &str) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            store,
            resolver,
            audio_extension: audio_extension.to_string(),
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Replace the in-memory list with the persisted one.
    pub fn load(&self) -> Result<LoadStatus, LibraryError> {
        let report = self.store.load()?;
        let snapshot = {
            let mut records = self.records.lock();
            *records = report.records;
            records.clone()
        };
        log::info!("library loaded: {} records ({:?})", snapshot.len(), report.status);
        self.notify(&snapshot);
        Ok(report.status)
    }

    pub fn all(&self) -> Vec<RecordingRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<RecordingRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Every record with its resolved path and whether that file exists.
    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.all()
            .into_iter()
            .map(|record| {
                let resolved_path = self.resolver.resolve(&record.locator);
                let available = self.resolver.exists(&resolved_path);
                LibraryEntry {
                    record,
                    resolved_path,
                    available,
                }
            })
            .collect()
    }

    /// The record whose locator equals `locator`, directly or once resolved.
    pub fn find_by_locator(&self, locator: &Path) -> Option<RecordingRecord> {
        self.records
            .lock()
            .iter()
            .find(|r| r.locator == locator || self.resolver.resolve(&r.locator) == locator)
            .cloned()
    }

    /// Resolved path of record `id`, or `FileMissing` if the file is gone.
    pub fn playable_path(&self, id: &str) -> Result<PathBuf, LibraryError> {
        let record = self
            .get(id)
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;
        let path = self.resolver.resolve(&record.locator);
        if !self.resolver.exists(&path) {
            return Err(LibraryError::FileMissing(path));
        }
        Ok(path)
    }

    /// A fresh id derived from the current time, unique within the index.
    pub fn next_id(&self) -> String {
        let records = self.records.lock();
        let mut millis = chrono::Utc::now().timestamp_millis();
        let newest = records
            .iter()
            .filter_map(|r| r.id.parse::<i64>().ok())
            .max()
            .unwrap_or(i64::MIN);
        if millis <= newest {
            millis = newest + 1;
        }
        let mut id = millis.to_string();
        while records.iter().any(|r| r.id == id) {
            millis += 1;
            id = millis.to_string();
        }
        id
    }

    /// Insert `record` at the front and persist.
    pub fn append(&self, record: RecordingRecord) -> Result<(), LibraryError> {
        let snapshot = {
            let mut records = self.records.lock();
            if records.iter().any(|r| r.id == record.id) {
                return Err(LibraryError::InvalidState(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
            records.insert(0, record);
            if let Err(e) = self.store.save(&records) {
                records.remove(0);
                log::error!("append rolled back: {}", e);
                return Err(e);
            }
            records.clone()
        };
        self.notify(&snapshot);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<bool, LibraryError> {
        self.remove_with(id, |_| {})
    }

    /// Delete record `id` and its file, then persist.
    ///
    /// `release` runs with the resolved path before the delete so open
    /// handles can be closed. Removing an unknown id is a no-op returning
    /// `false`. A missing or undeletable file does not keep the record alive.
    pub fn remove_with(&self, id: &str, mut release: impl FnMut(&Path)) -> Result<bool, LibraryError> {
        let snapshot = {
            let mut records = self.records.lock();
            let Some(index) = records.iter().position(|r| r.id == id) else {
                log::debug!("remove ignored: no record {}", id);
                return Ok(false);
            };

            let path = self.resolver.resolve(&records[index].locator);
            release(&path);
            self.delete_file(&path);

            let removed = records.remove(index);
            if let Err(e) = self.store.save(&records) {
                // A record whose file is already gone stays removed.
                if self.resolver.exists(&path) {
                    records.insert(index, removed);
                    log::error!("remove rolled back: {}", e);
                } else {
                    log::error!("remove not persisted: {}", e);
                }
                return Err(e);
            }
            records.clone()
        };
        self.notify(&snapshot);
        Ok(true)
    }

    pub fn rename(&self, id: &str, new_name: &str) -> Result<PathBuf, LibraryError> {
        self.rename_with(id, new_name, |_| {})
    }

    /// Rename record `id` and move its file within the same directory.
    ///
    /// The name is sanitized first; an unchanged name is a no-op. The move is
    /// refused before any mutation when the source file is missing or the
    /// target name is taken. Returns the record's new resolved path.
    pub fn rename_with(&self, id: &str, new_name: &str, mut release: impl FnMut(&Path)) -> Result<PathBuf, LibraryError> {
        let clean = files::sanitize_name(new_name, &self.audio_extension)?;

        let snapshot = {
            let mut records = self.records.lock();
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;

            let old_path = self.resolver.resolve(&records[index].locator);
            if records[index].name == clean {
                log::debug!("rename skipped: name unchanged");
                return Ok(old_path);
            }
            if !self.resolver.exists(&old_path) {
                return Err(LibraryError::FileMissing(old_path));
            }

            let new_path = old_path.with_file_name(&clean);
            let taken_by_record = records
                .iter()
                .any(|r| r.id != id && self.resolver.resolve(&r.locator) == new_path);
            if taken_by_record || self.resolver.exists(&new_path) {
                return Err(LibraryError::NameCollision(clean));
            }

            release(&old_path);
            files::move_file(&old_path, &new_path)?;

            let previous = records[index].clone();
            records[index].name = clean.clone();
            records[index].locator = new_path.clone();

            if let Err(e) = self.store.save(&records) {
                records[index] = previous;
                if let Err(undo) = files::move_file(&new_path, &old_path) {
                    log::error!("failed to move {} back after rename: {}", new_path.display(), undo);
                }
                log::error!("rename rolled back: {}", e);
                return Err(e);
            }
            log::info!("renamed record {} to {}", id, clean);
            (records.clone(), new_path)
        };

        self.notify(&snapshot.0);
        Ok(snapshot.1)
    }

    pub fn clear_all(&self) -> Result<(), LibraryError> {
        self.clear_all_with(|_| {})
    }

    /// Delete every record's file, best effort, then persist an empty list.
    ///
    /// If the save fails, only records whose file survived the delete are
    /// kept in memory.
    pub fn clear_all_with(&self, mut release: impl FnMut(&Path)) -> Result<(), LibraryError> {
        {
            let mut records = self.records.lock();
            for record in records.iter() {
                let path = self.resolver.resolve(&record.locator);
                release(&path);
                self.delete_file(&path);
            }

            let previous = std::mem::take(&mut *records);
            if let Err(e) = self.store.save(&records) {
                *records = previous
                    .into_iter()
                    .filter(|r| self.resolver.exists(&self.resolver.resolve(&r.locator)))
                    .collect();
                log::error!("clear not persisted, {} records kept: {}", records.len(), e);
                let snapshot = records.clone();
                drop(records);
                self.notify(&snapshot);
                return Err(e);
            }
        }
        log::info!("library cleared");
        self.notify(&[]);
        Ok(())
    }

    /// Remember the settings last used to process record `id`.
    pub fn set_used_settings(&self, id: &str, settings: ProcessSettings) -> Result<(), LibraryError> {
        self.update(id, |record| record.used_settings = Some(settings))
    }

    /// Replace the flag offsets of record `id`.
    pub fn set_flags(&self, id: &str, flags: Vec<u64>) -> Result<(), LibraryError> {
        self.update(id, |record| record.flags = flags)
    }

    // --- Internal helpers ---

    /// Apply `change` to record `id` and persist, restoring it on failure.
    fn update(&self, id: &str, change: impl FnOnce(&mut RecordingRecord)) -> Result<(), LibraryError> {
        let snapshot = {
            let mut records = self.records.lock();
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;

            let previous = records[index].clone();
            change(&mut records[index]);
            if let Err(e) = self.store.save(&records) {
                records[index] = previous;
                return Err(e);
            }
            records.clone()
        };
        self.notify(&snapshot);
        Ok(())
    }

    fn delete_file(&self, path: &Path) {
        if !self.resolver.exists(path) {
            log::debug!("{} already gone", path.display());
            return;
        }
        if let Err(e) = files::remove_file(path) {
            log::warn!("could not delete {}: {}", path.display(), e);
        }
    }

    fn notify(&self, records: &[RecordingRecord]) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_library_changed(records);
        }
    }
}
