//! TileStream - block coordination for remote tiled rasters
//!
//! This library reads raster blocks out of tiled imagery services. A
//! [`dataset::RemoteDataset`] owns the coordination pipeline: block
//! reads consult an in-memory cache, then a persistent tile cache,
//! then fetch every remaining tile of the request in one batched
//! network call, decode each tile once, and distribute its channels
//! to every band that shares it.
//!
//! The protocol-specific pieces sit behind small traits: a
//! [`minidriver::MiniDriver`] turns tile addresses into request URLs,
//! a [`fetch::BatchFetcher`] moves bytes, a [`decode::TileDecoder`]
//! opens downloaded payloads, and a [`cache::TileCache`] persists
//! them. WMS, TMS and WorldWind drivers ship in-tree.
//!
//! # High-Level API
//!
//! ```ignore
//! use tilestream::cache::DiskTileCache;
//! use tilestream::coord::{BlockCoord, DataWindow, Level};
//! use tilestream::dataset::{DatasetGeometry, RemoteDataset};
//! use tilestream::minidriver::WmsDriver;
//!
//! let geometry = DatasetGeometry::new(
//!     DataWindow::new(-180.0, 90.0, 180.0, -90.0),
//!     2048, 1024, 256, 256, 3,
//! )?;
//! let dataset = RemoteDataset::builder()
//!     .with_geometry(geometry)
//!     .with_driver(WmsDriver::new("http://maps.example.com/wms", "satellite"))
//!     .with_tile_cache(DiskTileCache::open_default()?)
//!     .build()?;
//!
//! let mut block = vec![0u8; 256 * 256];
//! dataset.read_block(1, Level::Full, BlockCoord::new(0, 0), &mut block)?;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod dataset;
pub mod decode;
pub mod error;
pub mod exception;
pub mod fetch;
pub mod logging;
pub mod minidriver;

/// Version of the TileStream library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
