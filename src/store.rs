//! Content store: where harvested image bytes live for the rest of the run.
//!
//! [`ExtractedImage`](crate::model::ExtractedImage) records only carry a key;
//! the bytes are owned by the store. Writes are idempotent (re-running a
//! harvest overwrites the same keys with the same bytes), so a store left
//! behind by a cancelled run is safe to reuse.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Keyed blob storage for harvested images.
///
/// Implementations must be `Send + Sync`: the harvester persists assets
/// from the blocking thread pool.
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    /// `true` when `key` has a backing blob.
    fn contains(&self, key: &str) -> bool;

    /// Filesystem location of `key`, for stores that have one.
    fn locate(&self, key: &str) -> Option<PathBuf> {
        let _ = key;
        None
    }
}

/// Stores each blob as a file named after its key inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentStore for DirectoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.root.join(key);
        std::fs::write(&path, bytes)?;
        debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.root.join(key).is_file()
    }

    fn locate(&self, key: &str) -> Option<PathBuf> {
        let path = self.root.join(key);
        path.is_file().then_some(path)
    }
}

/// In-process store; handy for tests and for callers that serialise the
/// deck somewhere other than the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.blobs.read().ok()?.get(key).cloned()
    }

    /// Drop a blob; used to simulate a store that lost an asset.
    pub fn remove(&self, key: &str) -> bool {
        self.blobs
            .write()
            .map(|mut m| m.remove(key).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        blobs.insert(key.to_string(), Arc::from(bytes));
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.blobs
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path().join("images")).unwrap();
        assert!(!store.contains("a.png"));
        store.put("a.png", b"abc").unwrap();
        assert!(store.contains("a.png"));
        let path = store.locate("a.png").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
    }

    #[test]
    fn puts_are_idempotent() {
        let store = MemoryStore::new();
        store.put("k", b"1").unwrap();
        store.put("k", b"1").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(&store.get("k").unwrap()[..], b"1");
    }

    #[test]
    fn memory_store_remove() {
        let store = MemoryStore::new();
        store.put("k", b"1").unwrap();
        assert!(store.remove("k"));
        assert!(!store.contains("k"));
        assert!(store.locate("k").is_none());
    }
}
