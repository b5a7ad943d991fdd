//! Persistent tile cache keyed by request URL.
//!
//! Stores the raw fetched body of each tile under a path derived from
//! the sha256 digest of its URL, so a second dataset pointed at the
//! same service reuses the same files. Lookups never go to the
//! network; the coordinator decides what to do on a miss.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

/// Directory name used under the platform cache directory.
const DEFAULT_CACHE_DIR_NAME: &str = "tilestream";

/// Persistent store of raw tile bodies.
///
/// Implementations must be safe to share across threads. `store`
/// overwrites any existing entry for the same URL, which is how a
/// corrupt cached file heals after a refetch.
pub trait TileCache: Send + Sync {
    /// Path of the cached body for `url`, if one exists on disk.
    fn lookup(&self, url: &str) -> Option<PathBuf>;

    /// Write the raw body fetched from `url`, returning the cached path.
    fn store(&self, url: &str, body: &[u8]) -> io::Result<PathBuf>;
}

/// Disk-backed tile cache with digest fan-out directories.
///
/// Layout: `<root>/<hex[0..2]>/<hex[2..4]>/<hex>` where `hex` is the
/// sha256 digest of the URL. Two fan-out levels keep directory sizes
/// manageable for large caches.
pub struct DiskTileCache {
    root: PathBuf,
}

impl DiskTileCache {
    /// Open a tile cache rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open a tile cache under the platform cache directory.
    pub fn open_default() -> io::Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no platform cache directory available",
            )
        })?;
        Self::new(base.join(DEFAULT_CACHE_DIR_NAME))
    }

    /// Root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache path for a URL, whether or not the file exists.
    pub fn tile_path(&self, url: &str) -> PathBuf {
        let hex = format!("{:x}", Sha256::digest(url.as_bytes()));
        self.root.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }
}

impl TileCache for DiskTileCache {
    fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.tile_path(url);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    fn store(&self, url: &str, body: &[u8]) -> io::Result<PathBuf> {
        let path = self.tile_path(url);
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent"))?;
        fs::create_dir_all(parent)?;

        // Write to a temp file in the same directory, then rename into
        // place. Readers either see the old body or the new one, never
        // a partial write.
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(body)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }
}
