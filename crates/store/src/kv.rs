use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{record_filename, StoreError};

/// Whole-value key-value persistence.
///
/// Records are read and written in one piece; there are no partial updates.
pub trait KvStore: Send + Sync {
    /// Read a record, `None` when it was never written.
    fn get(&self, record: &str) -> Result<Option<Value>, StoreError>;

    /// Replace a record.
    fn put(&self, record: &str, value: &Value) -> Result<(), StoreError>;
}

/// Directory of `<record>.json` files.
///
/// ```text
/// data/
///   dedup_keys.json   <- ["<event id>:<milestone>:<start secs>", ...]
///   settings.json     <- {"enabled": true, ...}
/// ```
#[derive(Debug)]
pub struct FileKvStore {
    base_dir: PathBuf,
}

impl FileKvStore {
    /// Open the store, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl KvStore for FileKvStore {
    fn get(&self, record: &str) -> Result<Option<Value>, StoreError> {
        let path = self.base_dir.join(record_filename(record)?);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn put(&self, record: &str, value: &Value) -> Result<(), StoreError> {
        let filename = record_filename(record)?;
        let json = serde_json::to_string_pretty(value)?;
        // Write-then-rename so a crash never leaves a torn record.
        let tmp = self.base_dir.join(format!(".{filename}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(tmp, self.base_dir.join(filename))?;
        Ok(())
    }
}

/// In-process store. Counts writes so callers can assert on mutations.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    records: Mutex<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, record: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(record).cloned())
    }

    fn put(&self, record: &str, value: &Value) -> Result<(), StoreError> {
        record_filename(record)?;
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(tmp.path().join("state")).unwrap();

        assert!(store.get("settings").unwrap().is_none());
        store.put("settings", &json!({"enabled": false})).unwrap();
        assert_eq!(store.get("settings").unwrap(), Some(json!({"enabled": false})));
        assert!(tmp.path().join("state").join("settings.json").exists());

        store.put("settings", &json!({"enabled": true})).unwrap();
        assert_eq!(store.get("settings").unwrap(), Some(json!({"enabled": true})));
    }

    #[test]
    fn file_store_reports_corrupt_json() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("dedup_keys.json"), "{not json").unwrap();
        assert!(matches!(store.get("dedup_keys"), Err(StoreError::Json(_))));
    }

    #[test]
    fn record_names_are_validated() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(tmp.path()).unwrap();
        assert!(matches!(
            store.put("../escape", &json!(1)),
            Err(StoreError::InvalidRecord(_))
        ));
        assert!(MemoryKvStore::new().put("", &json!(1)).is_err());
    }

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryKvStore::new();
        store.put("a", &json!([1])).unwrap();
        store.put("a", &json!([1, 2])).unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get("a").unwrap(), Some(json!([1, 2])));
    }
}
