//! Photo record persistence.
//!
//! [`PhotoStore`] is the seam the pipeline talks to. Record semantics live in
//! [`RecordTable`] so every store applies them identically; a store only
//! decides where the table lives.
//!
//! ## Commit
//!
//! [`PhotoStore::commit_publish`] is the single point where a record becomes
//! `uploaded`. With `expected_version = None` the commit is last-writer-wins;
//! with `Some(v)` it fails with [`StoreError::VersionConflict`] unless the
//! stored version is still `v`. Either way it runs once, never retried.

use crate::types::{Filters, PhotoRecord, PhotoStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Photo not found: {0}")]
    NotFound(String),
    #[error("Version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict { id: String, expected: u64, found: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Record file error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Derived fields written by a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    pub version: u64,
    pub filename: Option<String>,
    pub labels: Vec<String>,
    pub color: Option<String>,
    pub annotations: Option<serde_json::Value>,
}

/// Keyed record storage.
pub trait PhotoStore: Send + Sync {
    /// Create a fresh `uploading` record at version 0 with a new id.
    fn insert(&self, filters: Filters) -> Result<PhotoRecord>;

    fn get(&self, id: &str) -> Result<PhotoRecord>;

    /// Replace the filters. Status and version are left alone, so a
    /// published photo stays listed until the next commit replaces it.
    fn update_filters(&self, id: &str, filters: Filters) -> Result<PhotoRecord>;

    /// Mark the record `uploaded` at `publish.version` with its derived fields.
    fn commit_publish(
        &self,
        id: &str,
        publish: &Publish,
        expected_version: Option<u64>,
    ) -> Result<PhotoRecord>;

    fn delete(&self, id: &str) -> Result<()>;

    /// Every record, in id order.
    fn list(&self) -> Result<Vec<PhotoRecord>>;

    /// Records with status `uploaded`, newest first.
    fn list_uploaded(&self) -> Result<Vec<PhotoRecord>> {
        let mut records: Vec<PhotoRecord> = self
            .list()?
            .into_iter()
            .filter(|r| r.status == PhotoStatus::Uploaded)
            .collect();
        records.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(records)
    }
}

/// In-memory table of records keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTable {
    records: BTreeMap<String, PhotoRecord>,
}

impl RecordTable {
    pub fn insert(&mut self, filters: Filters) -> PhotoRecord {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let record = PhotoRecord::new(id, filters, Utc::now());
        self.records.insert(record.id.clone(), record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Result<PhotoRecord> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn update_filters(&mut self, id: &str, filters: Filters) -> Result<PhotoRecord> {
        let record = self.entry(id)?;
        record.filters = filters;
        Ok(record.clone())
    }

    pub fn commit_publish(
        &mut self,
        id: &str,
        publish: &Publish,
        expected_version: Option<u64>,
    ) -> Result<PhotoRecord> {
        let record = self.entry(id)?;
        if let Some(expected) = expected_version
            && record.version != expected
        {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected,
                found: record.version,
            });
        }
        record.status = PhotoStatus::Uploaded;
        record.version = publish.version;
        record.filename = publish.filename.clone();
        record.labels = publish.labels.clone();
        record.color = publish.color.clone();
        record.annotations = publish.annotations.clone();
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<PhotoRecord> {
        self.records.values().cloned().collect()
    }

    /// Insert or overwrite a record as-is.
    pub fn put(&mut self, record: PhotoRecord) {
        self.records.insert(record.id.clone(), record);
    }

    fn entry(&mut self, id: &str) -> Result<&mut PhotoRecord> {
        self.records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Records persisted as one pretty-printed JSON file.
///
/// Every mutation is applied to a copy of the table, written to a sibling
/// temp file and renamed over the original. A failed write leaves both the
/// file and the in-memory table unchanged.
pub struct JsonPhotoStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonPhotoStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, table: &RecordTable) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(table)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "record file written");
        Ok(())
    }

    /// Run `f` on a copy of the table, persist it, then swap it in.
    fn mutate<T>(&self, f: impl FnOnce(&mut RecordTable) -> Result<T>) -> Result<T> {
        let mut guard = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.save(&next)?;
        *guard = next;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&RecordTable) -> T) -> T {
        let guard = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

impl PhotoStore for JsonPhotoStore {
    fn insert(&self, filters: Filters) -> Result<PhotoRecord> {
        self.mutate(|t| Ok(t.insert(filters)))
    }

    fn get(&self, id: &str) -> Result<PhotoRecord> {
        self.read(|t| t.get(id))
    }

    fn update_filters(&self, id: &str, filters: Filters) -> Result<PhotoRecord> {
        self.mutate(|t| t.update_filters(id, filters))
    }

    fn commit_publish(
        &self,
        id: &str,
        publish: &Publish,
        expected_version: Option<u64>,
    ) -> Result<PhotoRecord> {
        self.mutate(|t| t.commit_publish(id, publish, expected_version))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.mutate(|t| t.delete(id))
    }

    fn list(&self) -> Result<Vec<PhotoRecord>> {
        Ok(self.read(|t| t.list()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MemoryPhotoStore;
    use crate::types::{FaceOperation, Operation};
    use chrono::TimeZone;

    fn publish(version: u64) -> Publish {
        Publish {
            version,
            filename: Some("cat.jpg".into()),
            labels: vec!["Cat".into(), "Whiskers".into()],
            color: Some("#ff8000".into()),
            annotations: Some(serde_json::json!({"labelAnnotations": []})),
        }
    }

    // =========================================================================
    // RecordTable
    // =========================================================================

    #[test]
    fn insert_starts_uploading_at_version_zero() {
        let mut table = RecordTable::default();
        let record = table.insert(Filters::default());
        assert_eq!(record.version, 0);
        assert_eq!(record.status, PhotoStatus::Uploading);
        assert_eq!(record.id.len(), 32);
        assert_eq!(table.get(&record.id).unwrap(), record);
    }

    #[test]
    fn inserted_ids_are_unique() {
        let mut table = RecordTable::default();
        let a = table.insert(Filters::default());
        let b = table.insert(Filters::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn update_filters_keeps_status_version_and_created() {
        let mut table = RecordTable::default();
        let record = table.insert(Filters::default());
        table.commit_publish(&record.id, &publish(1), None).unwrap();

        let filters = Filters {
            face_operation: FaceOperation::None,
            ..Filters::default()
        };
        let updated = table.update_filters(&record.id, filters.clone()).unwrap();
        assert_eq!(updated.status, PhotoStatus::Uploaded);
        assert_eq!(updated.filters, filters);
        assert_eq!(updated.created, record.created);
        assert_eq!(updated.version, 1);
    }

    #[test]
    fn commit_sets_uploaded_and_derived_fields() {
        let mut table = RecordTable::default();
        let record = table.insert(Filters::default());
        let committed = table.commit_publish(&record.id, &publish(1), None).unwrap();

        assert_eq!(committed.status, PhotoStatus::Uploaded);
        assert_eq!(committed.version, 1);
        assert_eq!(committed.filename.as_deref(), Some("cat.jpg"));
        assert_eq!(committed.labels, vec!["Cat", "Whiskers"]);
        assert_eq!(committed.color.as_deref(), Some("#ff8000"));
        assert!(committed.annotations.is_some());
    }

    #[test]
    fn last_writer_wins_without_expected_version() {
        let mut table = RecordTable::default();
        let record = table.insert(Filters::default());
        table.commit_publish(&record.id, &publish(1), None).unwrap();
        // A second writer that also read version 0 still commits
        let again = table.commit_publish(&record.id, &publish(1), None).unwrap();
        assert_eq!(again.version, 1);
    }

    #[test]
    fn compare_and_set_rejects_stale_base() {
        let mut table = RecordTable::default();
        let record = table.insert(Filters::default());
        table.commit_publish(&record.id, &publish(1), Some(0)).unwrap();

        let err = table
            .commit_publish(&record.id, &publish(1), Some(0))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 0, found: 1, .. }
        ));
        assert_eq!(table.get(&record.id).unwrap().version, 1);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let mut table = RecordTable::default();
        assert!(matches!(table.get("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            table.update_filters("nope", Filters::default()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            table.commit_publish("nope", &publish(1), None),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(table.delete("nope"), Err(StoreError::NotFound(_))));
    }

    // =========================================================================
    // list_uploaded
    // =========================================================================

    #[test]
    fn list_uploaded_filters_and_orders_newest_first() {
        let mut records = Vec::new();
        for (id, day, status) in [
            ("a", 1, PhotoStatus::Uploaded),
            ("b", 3, PhotoStatus::Uploaded),
            ("c", 2, PhotoStatus::Uploading),
            ("d", 2, PhotoStatus::Uploaded),
        ] {
            let mut record = PhotoRecord::new(
                id,
                Filters::default(),
                Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            );
            record.status = status;
            records.push(record);
        }
        let store = MemoryPhotoStore::with_records(records);

        let ids: Vec<String> = store
            .list_uploaded()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    // =========================================================================
    // JsonPhotoStore
    // =========================================================================

    #[test]
    fn json_store_persists_across_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("db/records.json");

        let id = {
            let store = JsonPhotoStore::open(&path).unwrap();
            let filters = Filters {
                operation: Operation::Redact,
                ..Filters::default()
            };
            let record = store.insert(filters).unwrap();
            store.commit_publish(&record.id, &publish(1), None).unwrap();
            record.id
        };

        let reopened = JsonPhotoStore::open(&path).unwrap();
        let record = reopened.get(&id).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.status, PhotoStatus::Uploaded);
        assert_eq!(record.filters.operation, Operation::Redact);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonPhotoStore::open(tmp.path().join("none.json")).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn json_store_corrupt_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonPhotoStore::open(&path),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn json_store_failed_mutation_changes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        let store = JsonPhotoStore::open(&path).unwrap();
        let record = store.insert(Filters::default()).unwrap();
        store.commit_publish(&record.id, &publish(1), None).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(store
            .commit_publish(&record.id, &publish(2), Some(0))
            .is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.get(&record.id).unwrap().version, 1);
    }

    #[test]
    fn json_store_delete_removes_record() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonPhotoStore::open(tmp.path().join("records.json")).unwrap();
        let record = store.insert(Filters::default()).unwrap();
        store.delete(&record.id).unwrap();
        assert!(matches!(store.get(&record.id), Err(StoreError::NotFound(_))));
    }
}
