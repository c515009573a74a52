//! Decoded chunk cache.
//!
//! Each reader owns one cache keyed by chunk index. Entries are bounded by
//! count and by decoded bytes, and can be dropped at any time with
//! [`ChunkCache::trim_to`] or [`ChunkCache::clear`] when the host is under
//! memory pressure. A dropped entry is rebuilt from the file on the next
//! access; two readers racing on the same miss both decode and the later
//! insert wins, which is harmless because chunk contents never change.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::format::ChunkContents;

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Inner {
    entries: LruCache<usize, Arc<ChunkContents>>,
    weight: usize,
}

pub struct ChunkCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ChunkCache {
    /// Zero bounds are clamped to one; [`CacheConfig::validate`] rejects them
    /// before a reader gets here.
    pub fn new(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_chunks).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                weight: 0,
            }),
            max_bytes: config.max_bytes.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a chunk, promoting it to most-recently-used.
    pub fn get(&self, chunk: usize) -> Option<Arc<ChunkContents>> {
        let found = self.inner.lock().entries.get(&chunk).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert a decoded chunk, replacing any previous entry for the index.
    ///
    /// A chunk heavier than the byte budget on its own is returned to the
    /// caller but not retained.
    pub fn insert(&self, chunk: usize, contents: Arc<ChunkContents>) {
        let weight = contents.weight();
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.pop(&chunk) {
            inner.weight -= old.weight();
        }
        if weight > self.max_bytes {
            log::trace!("chunk {chunk} ({weight} bytes) exceeds cache budget, not retained");
            return;
        }
        if let Some((evicted, old)) = inner.entries.push(chunk, contents) {
            inner.weight -= old.weight();
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::trace!("evicted chunk {evicted} from cache");
        }
        inner.weight += weight;
        let evicted = Self::shrink(&mut inner, self.max_bytes);
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
    }

    /// Drop least-recently-used entries until at most `max_bytes` remain.
    pub fn trim_to(&self, max_bytes: usize) {
        let mut inner = self.inner.lock();
        let evicted = Self::shrink(&mut inner, max_bytes);
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
        if evicted > 0 {
            log::debug!("trimmed {evicted} chunks, {} bytes retained", inner.weight);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len() as u64;
        inner.entries.clear();
        inner.weight = 0;
        self.evictions.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Decoded bytes currently held.
    pub fn weight_bytes(&self) -> usize {
        self.inner.lock().weight
    }

    pub fn contains(&self, chunk: usize) -> bool {
        self.inner.lock().entries.contains(&chunk)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn shrink(inner: &mut Inner, max_bytes: usize) -> u64 {
        let mut evicted = 0;
        while inner.weight > max_bytes {
            match inner.entries.pop_lru() {
                Some((_, old)) => {
                    inner.weight -= old.weight();
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

impl std::fmt::Debug for ChunkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ChunkCache")
            .field("len", &inner.entries.len())
            .field("cap", &inner.entries.cap())
            .field("weight", &inner.weight)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
