//! Caching layers.
//!
//! Two independent caches back a dataset: an in-memory [`BlockCache`]
//! of decoded per-band blocks, and an optional on-disk [`TileCache`]
//! of raw fetched tile bodies. A read consults the block cache first,
//! then the tile cache, and only then the network.

mod block;
mod tile;

pub use block::{BlockCache, BlockKey, DEFAULT_BLOCK_CACHE_BYTES};
pub use tile::{DiskTileCache, TileCache};
