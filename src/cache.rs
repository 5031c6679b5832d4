//! Persisted read-through query cache.
//!
//! Maps a trimmed query string to the hit list its live query resolved to.
//! Lookups are exact-match and case-sensitive. Every write is flushed to
//! disk immediately, so a completed query's results survive a restart; a
//! corrupt or unreadable cache file loads as an empty cache. Capacity is
//! bounded with LRU eviction; entries are otherwise never invalidated —
//! only a storage reset ([`QueryCache::clear`]) drops them all.
//!
//! The last-typed query is persisted under a sibling file for session
//! restore.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::IndexRecord;

const CACHE_FILE: &str = "query_cache.json";
const LAST_QUERY_FILE: &str = "last_query";

pub struct QueryCache {
    entries: LruCache<String, Vec<IndexRecord>>,
    cache_path: PathBuf,
    query_path: PathBuf,
    last_query: Option<String>,
}

impl QueryCache {
    /// Open the cache rooted at `dir`, loading any persisted state.
    ///
    /// Missing or unparsable persisted data is treated as an empty cache;
    /// storage is outside this system's control and must never be fatal.
    pub fn open(dir: &Path, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        let cache_path = dir.join(CACHE_FILE);
        let query_path = dir.join(LAST_QUERY_FILE);

        let mut entries = LruCache::new(capacity);
        match std::fs::read_to_string(&cache_path) {
            Ok(content) => {
                match serde_json::from_str::<Vec<(String, Vec<IndexRecord>)>>(&content) {
                    Ok(pairs) => {
                        // Persisted least-recently-used first, so insertion
                        // order restores recency.
                        for (query, results) in pairs {
                            entries.put(query, results);
                        }
                    }
                    Err(e) => {
                        warn!("discarding unparsable query cache: {}", e);
                    }
                }
            }
            Err(_) => debug!("no persisted query cache at {}", cache_path.display()),
        }

        let last_query = std::fs::read_to_string(&query_path)
            .ok()
            .map(|s| s.trim_end_matches('\n').to_string())
            .filter(|s| !s.is_empty());

        Self {
            entries,
            cache_path,
            query_path,
            last_query,
        }
    }

    /// Exact-match lookup on the trimmed query string. Promotes the entry.
    pub fn get(&mut self, query: &str) -> Option<Vec<IndexRecord>> {
        self.entries.get(query.trim()).cloned()
    }

    /// Insert (or overwrite) an entry and flush the whole cache to disk.
    pub fn put(&mut self, query: &str, results: Vec<IndexRecord>) {
        self.entries.put(query.trim().to_string(), results);
        self.persist();
    }

    /// The query string the user last typed, restored across sessions.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Remember the last-typed query, flushed immediately.
    pub fn set_last_query(&mut self, query: &str) {
        self.last_query = Some(query.to_string());
        if let Err(e) = self.write_to_storage(&self.query_path, query.as_bytes()) {
            warn!("failed to persist last query: {}", e);
        }
    }

    /// Storage-scope reset: drop every entry and delete the persisted files.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_query = None;
        let _ = std::fs::remove_file(&self.cache_path);
        let _ = std::fs::remove_file(&self.query_path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached `(query, hit count)` pairs, most recently used first.
    pub fn summary(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .map(|(q, r)| (q.clone(), r.len()))
            .collect()
    }

    fn persist(&self) {
        // Least-recently-used first so a reload replays recency in order.
        let pairs: Vec<(&String, &Vec<IndexRecord>)> = self.entries.iter().rev().collect();
        match serde_json::to_vec(&pairs) {
            Ok(bytes) => {
                if let Err(e) = self.write_to_storage(&self.cache_path, &bytes) {
                    warn!("failed to persist query cache: {}", e);
                }
            }
            Err(e) => warn!("failed to serialize query cache: {}", e),
        }
    }

    fn write_to_storage(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)
    }
}
