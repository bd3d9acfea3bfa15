//! Bounded cache of parsed documents keyed by file path.
//!
//! The cache is an ordinary value owned by the application and shared by
//! reference. A single mutex guards the whole lookup → evict → parse →
//! insert sequence, so two threads asking for the same path never parse it
//! twice. Failed loads are never inserted.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use tracing::debug;

use crate::config::CacheConfig;
use crate::document::Document;
use crate::error::Result;

#[derive(Debug)]
struct Entry {
    document: Arc<Document>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<PathBuf, Entry>,
    clock: u64,
    evictions: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(path, _)| path.clone());
        if let Some(path) = oldest {
            self.entries.remove(&path);
            self.evictions += 1;
            debug!("Evicted {} from document cache", path.display());
        }
    }
}

/// Shared, read-only documents by path, holding at most `capacity` entries.
#[derive(Debug)]
pub struct DocumentCache {
    capacity: usize,
    state: Mutex<State>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl DocumentCache {
    pub const DEFAULT_CAPACITY: usize = 5;

    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of entries evicted to make room.
    pub fn evictions(&self) -> u64 {
        self.lock().evictions
    }

    /// Cached document for `path`, if resident.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Document>> {
        let mut state = self.lock();
        let now = state.tick();
        let entry = state.entries.get_mut(path.as_ref())?;
        entry.last_used = now;
        Some(Arc::clone(&entry.document))
    }

    /// Cached document for `path`, parsing and inserting it on a miss.
    ///
    /// When the cache is full the least recently used entry is evicted first.
    pub fn load_or_get(&self, path: impl AsRef<Path>) -> Result<Arc<Document>> {
        let path = path.as_ref();
        let mut state = self.lock();
        let now = state.tick();

        if let Some(entry) = state.entries.get_mut(path) {
            entry.last_used = now;
            return Ok(Arc::clone(&entry.document));
        }

        let document = Arc::new(Document::open(path)?);

        while state.entries.len() >= self.capacity {
            state.evict_least_recent();
        }
        state.entries.insert(
            path.to_path_buf(),
            Entry {
                document: Arc::clone(&document),
                last_used: now,
            },
        );
        debug!("Cached {} ({} resident)", path.display(), state.entries.len());
        Ok(document)
    }

    /// Drop `path` from the cache. Returns whether it was resident.
    ///
    /// Handles already given out stay valid.
    pub fn evict(&self, path: impl AsRef<Path>) -> bool {
        self.lock().entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Scene names of the document at `path`, loading it through the cache.
    pub fn scene_list(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        Ok(self.load_or_get(path)?.scene_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write_scene_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.gltf"));
        let json = format!(r#"{{"asset":{{"version":"2.0"}},"scenes":[{{"name":"{name}"}}]}}"#);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_hit_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scene_file(dir.path(), "a");
        let cache = DocumentCache::default();

        let first = cache.load_or_get(&path).unwrap();
        let second = cache.load_or_get(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| write_scene_file(dir.path(), n))
            .collect();
        let cache = DocumentCache::new(2);

        cache.load_or_get(&paths[0]).unwrap();
        cache.load_or_get(&paths[1]).unwrap();
        // touch a so b becomes the oldest
        cache.load_or_get(&paths[0]).unwrap();
        cache.load_or_get(&paths[2]).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.evictions(), 1);
        assert!(cache.get(&paths[0]).is_some());
        assert!(cache.get(&paths[1]).is_none());
    }

    #[test]
    fn test_evicted_handle_stays_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scene_file(dir.path(), "kept");
        let cache = DocumentCache::default();

        let doc = cache.load_or_get(&path).unwrap();
        assert!(cache.evict(&path));
        assert!(!cache.evict(&path));
        assert_eq!(doc.scene_names(), vec!["kept"]);
    }

    #[test]
    fn test_failed_load_not_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocumentCache::default();

        let err = cache.load_or_get(dir.path().join("missing.glb")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_scene_list_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scene_file(dir.path(), "Level1");
        let cache = DocumentCache::from_config(&CacheConfig { capacity: 0 });

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.scene_list(&path).unwrap(), vec!["Level1"]);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
