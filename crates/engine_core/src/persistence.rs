//! Key/value persistence port for manager save data.
//!
//! Each manager owns one record under its own key. Records are RON text.
//! Loading merges saved fields over defaults (every persisted struct carries
//! `#[serde(default)]`), and failures are logged and swallowed so that a
//! broken save never blocks play.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize record: {0}")]
    Serialize(#[from] ron::Error),
    #[error("could not parse record: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Backend storing one string blob per key.
pub trait Store {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn save_raw(&mut self, key: &str, data: &str) -> Result<(), PersistenceError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<RefCell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full or locked storage would.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.borrow_mut() = read_only;
    }

    /// Raw access for inspecting or corrupting saved text.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, data: &str) {
        self.entries.borrow_mut().insert(key.to_string(), data.to_string());
    }
}

impl Store for MemoryStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(key))
    }

    fn save_raw(&mut self, key: &str, data: &str) -> Result<(), PersistenceError> {
        if *self.read_only.borrow() {
            return Err(PersistenceError::Unavailable("store is read-only".to_string()));
        }
        self.insert(key, data);
        Ok(())
    }
}

/// One `<key>.ron` file per record inside a directory.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    dir: PathBuf,
}

impl RonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.ron"))
    }
}

impl Store for RonFileStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    fn save_raw(&mut self, key: &str, data: &str) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        std::fs::write(&path, data).map_err(|source| PersistenceError::Io { path, source })
    }
}

/// Load and parse a record, propagating every failure.
pub fn load_record<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>, PersistenceError> {
    match store.load_raw(key)? {
        Some(data) => Ok(Some(ron::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Load a record, falling back to `T::default()` when missing or unreadable.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn Store, key: &str) -> T {
    match load_record(store, key) {
        Ok(Some(record)) => record,
        Ok(None) => {
            log::debug!("No saved record for '{}', using defaults", key);
            T::default()
        }
        Err(e) => {
            log::warn!("Discarding unreadable record '{}': {}", key, e);
            T::default()
        }
    }
}

/// Serialize and write a record. Returns false (after logging) on failure.
pub fn save_record<T: Serialize>(store: &mut dyn Store, key: &str, record: &T) -> bool {
    let result = ron::ser::to_string_pretty(record, ron::ser::PrettyConfig::default())
        .map_err(PersistenceError::from)
        .and_then(|data| store.save_raw(key, &data));
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not persist '{}', keeping state in memory: {}", key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Record {
        best: u32,
        name: String,
        added_later: bool,
    }

    impl Default for Record {
        fn default() -> Self {
            Self {
                best: 0,
                name: "nobody".to_string(),
                added_later: true,
            }
        }
    }

    #[test]
    fn save_then_load_returns_same_record() {
        let mut store = MemoryStore::new();
        let rec = Record {
            best: 42,
            name: "ace".to_string(),
            added_later: false,
        };
        assert!(save_record(&mut store, "rec", &rec));
        let back: Record = load_or_default(&store, "rec");
        assert_eq!(back, rec);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let store = MemoryStore::new();
        store.insert("rec", "(best: 9)");
        let back: Record = load_or_default(&store, "rec");
        assert_eq!(back.best, 9);
        assert_eq!(back.name, "nobody");
        assert!(back.added_later);
    }

    #[test]
    fn corrupt_record_falls_back_to_default() {
        let store = MemoryStore::new();
        store.insert("rec", "{not ron at all");
        let back: Record = load_or_default(&store, "rec");
        assert_eq!(back, Record::default());
        assert!(load_record::<Record>(&store, "rec").is_err());
    }

    #[test]
    fn failed_write_is_swallowed() {
        let mut store = MemoryStore::new();
        store.set_read_only(true);
        assert!(!save_record(&mut store, "rec", &Record::default()));
        assert!(store.get("rec").is_none());
    }

    #[test]
    fn clones_share_entries() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        save_record(&mut a, "rec", &Record::default());
        assert!(b.get("rec").is_some());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("engine_core_store_{}", std::process::id()));
        let mut store = RonFileStore::new(&dir);
        assert!(load_record::<Record>(&store, "rec").unwrap().is_none());
        let rec = Record {
            best: 3,
            ..Default::default()
        };
        assert!(save_record(&mut store, "rec", &rec));
        let back: Record = load_or_default(&store, "rec");
        assert_eq!(back, rec);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
