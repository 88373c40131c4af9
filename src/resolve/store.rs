//! Durable storage backends for the resolution cache snapshot
//!
//! The cache persists its full map after every mutation and reloads it at
//! construction time, so discovered IP routes survive a process restart.
//! Storage is best-effort: a missing or unreadable snapshot simply yields an
//! empty cache.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Backend holding one serialized cache snapshot
pub trait CacheStore: Send + Sync {
    /// Load the stored snapshot, if any
    fn load(&self) -> Option<String>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &str) -> io::Result<()>;
}

/// File-backed snapshot store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store writing to the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn save(&self, snapshot: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, snapshot)
    }
}

/// In-memory snapshot store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a snapshot
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Some(snapshot.into())),
        }
    }

    /// Current snapshot contents, if any
    pub fn contents(&self) -> Option<String> {
        self.inner.lock().expect("store lock poisoned").clone()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.inner.lock().expect("store lock poisoned").clone()
    }

    fn save(&self, snapshot: &str) -> io::Result<()> {
        *self.inner.lock().expect("store lock poisoned") = Some(snapshot.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().is_none());

        store.save(r#"{"a":1}"#).unwrap();
        assert_eq!(store.load().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/cache.json"));

        assert!(store.load().is_none());

        store.save("snapshot").unwrap();
        assert_eq!(store.load().as_deref(), Some("snapshot"));
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let store = FileStore::new("/nonexistent/definitely/missing.json");
        assert!(store.load().is_none());
    }
}
