//! Memory cache for fetched previews.
//!
//! LRU keyed by preview URL with both an entry cap and a byte budget. Shared between the
//! loader and its workers.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;
use tracing::trace;

/// Default capacity for the LRU cache (number of entries).
pub const DEFAULT_CACHE_ENTRIES: usize = 512;

/// Default byte budget for cached preview payloads.
const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CachedPreview {
    pub width: u32,
    pub height: u32,
    /// Encoded preview bytes, handed to the host for display.
    pub bytes: Arc<Vec<u8>>,
}

impl CachedPreview {
    pub fn new(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bytes: Arc::new(bytes),
        }
    }

    fn memory_bytes(&self) -> usize {
        self.bytes.len()
    }
}

struct Inner {
    entries: LruCache<String, CachedPreview>,
    used_bytes: usize,
}

#[derive(Clone)]
pub struct PreviewCache {
    inner: Arc<RwLock<Inner>>,
    max_bytes: usize,
}

impl PreviewCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_budget(capacity, DEFAULT_MAX_BYTES)
    }

    pub fn with_budget(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: LruCache::new(capacity),
                used_bytes: 0,
            })),
            max_bytes: max_bytes.max(1),
        }
    }

    pub fn get(&self, url: &str) -> Option<CachedPreview> {
        // `LruCache::get` promotes the entry, so this needs the write lock.
        self.inner.write().entries.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.read().entries.contains(url)
    }

    pub fn insert(&self, url: &str, preview: CachedPreview) {
        let mut inner = self.inner.write();
        let size = preview.memory_bytes();

        if let Some((_, old)) = inner.entries.push(url.to_string(), preview) {
            inner.used_bytes = inner.used_bytes.saturating_sub(old.memory_bytes());
        }
        inner.used_bytes += size;

        while inner.used_bytes > self.max_bytes && inner.entries.len() > 1 {
            match inner.entries.pop_lru() {
                Some((evicted, old)) => {
                    trace!(url = %evicted, "Evicted preview over byte budget");
                    inner.used_bytes = inner.used_bytes.saturating_sub(old.memory_bytes());
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.read().used_bytes
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = PreviewCache::new(4);
        cache.insert("/thumbs/1.jpg", CachedPreview::new(4, 3, vec![0; 10]));
        let hit = cache.get("/thumbs/1.jpg").unwrap();
        assert_eq!((hit.width, hit.height), (4, 3));
        assert!(cache.get("/thumbs/2.jpg").is_none());
        assert_eq!(cache.used_bytes(), 10);
    }

    #[test]
    fn test_entry_cap_evicts_lru() {
        let cache = PreviewCache::new(2);
        cache.insert("a", CachedPreview::new(1, 1, vec![0; 1]));
        cache.insert("b", CachedPreview::new(1, 1, vec![0; 1]));
        let _ = cache.get("a");
        cache.insert("c", CachedPreview::new(1, 1, vec![0; 1]));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert_eq!(cache.used_bytes(), 2);
    }

    #[test]
    fn test_byte_budget_evicts() {
        let cache = PreviewCache::with_budget(10, 25);
        cache.insert("a", CachedPreview::new(1, 1, vec![0; 10]));
        cache.insert("b", CachedPreview::new(1, 1, vec![0; 10]));
        cache.insert("c", CachedPreview::new(1, 1, vec![0; 10]));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.used_bytes() <= 25);
    }

    #[test]
    fn test_replacing_entry_updates_usage() {
        let cache = PreviewCache::new(4);
        cache.insert("a", CachedPreview::new(1, 1, vec![0; 10]));
        cache.insert("a", CachedPreview::new(1, 1, vec![0; 4]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 4);
    }
}
