//! In-memory block cache with LRU eviction using moka.
//!
//! One cache instance is shared by every band and overview level of a
//! dataset. The coordinator only checks and fills it; eviction is the
//! cache's own business, driven by the configured byte capacity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::coord::{BlockCoord, Level};

/// Default capacity of the in-memory block cache (256 MiB).
pub const DEFAULT_BLOCK_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Key addressing one band's block at one resolution level.
///
/// Levels never share entries: the same geography decoded at two
/// overview levels occupies two independent slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    /// 1-based band number
    pub band: usize,
    /// Resolution level
    pub level: Level,
    /// Block coordinate within the level's grid
    pub coord: BlockCoord,
}

impl BlockKey {
    /// Create a new block key.
    pub fn new(band: usize, level: Level, coord: BlockCoord) -> Self {
        Self { band, level, coord }
    }
}

/// In-memory cache of decoded blocks.
///
/// Backed by `moka::sync::Cache` with size-based eviction, weighing
/// each entry by its pixel data length. Values are shared as
/// `Arc<Vec<u8>>` so a hit never copies pixel data.
pub struct BlockCache {
    cache: Cache<BlockKey, Arc<Vec<u8>>>,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BlockCache {
    /// Create a block cache bounded by the given byte capacity.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_key: &BlockKey, value: &Arc<Vec<u8>>| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached block.
    pub fn get(&self, key: &BlockKey) -> Option<Arc<Vec<u8>>> {
        match self.cache.get(key) {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Residency check. Does not count as a hit or miss.
    pub fn contains(&self, key: &BlockKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Insert a decoded block, replacing any previous entry.
    pub fn insert(&self, key: BlockKey, data: Vec<u8>) {
        self.cache.insert(key, Arc::new(data));
    }

    /// Current number of cached blocks.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Current cache size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.weighted_size()
    }

    /// Configured capacity in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Number of lookups answered from the cache.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that missed.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every cached block.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }
}
