//! Remote-backed raster dataset
//!
//! A [`RemoteDataset`] looks like an ordinary block-organized raster:
//! callers ask for band blocks and get pixel bytes. Behind that call
//! sits the block coordinator, which serves each block from the
//! in-memory block cache, the persistent tile cache, or one batched
//! network fetch, and degrades to zero-filled blocks where the
//! configuration allows it.
//!
//! Datasets are assembled through [`RemoteDatasetBuilder`], which wires
//! the protocol driver, transport, decoder and caches together and
//! validates the tile grid against the configured overview chain.

mod band;
mod coordinator;
mod geometry;
mod stats;

pub use band::{Band, OverviewChain, OverviewEntry};
pub use geometry::DatasetGeometry;
pub use stats::StatsSnapshot;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{BlockCache, BlockKey, TileCache, DEFAULT_BLOCK_CACHE_BYTES};
use crate::config::FetchConfig;
use crate::coord::{self, BlockCoord, BlockRect, CoordError, Level, PixelWindow};
use crate::decode::{ImageTileDecoder, TileDecoder};
use crate::error::Error;
use crate::fetch::{BatchFetcher, HttpBatchFetcher};
use crate::minidriver::MiniDriver;

use coordinator::{BlockCoordinator, Target};
use stats::FetchStats;

/// Advisory prefetch footprint, published by `advise_read` and consumed
/// by the first block read it covers. Single use: reading one covered
/// block widens that read to the whole rectangle and clears the hint.
struct HintWindow {
    level: Level,
    rect: BlockRect,
}

/// A raster dataset whose pixels live on a remote tile service.
///
/// All methods take `&self`; the dataset can be shared across threads.
/// Reads are synchronous: a call returns once every block it covers is
/// resolved or the first failure is known.
pub struct RemoteDataset {
    geometry: DatasetGeometry,
    config: FetchConfig,
    driver: Box<dyn MiniDriver>,
    fetcher: Box<dyn BatchFetcher>,
    tile_cache: Option<Box<dyn TileCache>>,
    decoder: Box<dyn TileDecoder>,
    block_cache: BlockCache,
    overviews: OverviewChain,
    hint: Mutex<Option<HintWindow>>,
    stats: FetchStats,
}

impl RemoteDataset {
    /// Start building a dataset.
    pub fn builder() -> RemoteDatasetBuilder {
        RemoteDatasetBuilder::new()
    }

    /// Dataset geometry: extent, raster size, block size, band count.
    pub fn geometry(&self) -> &DatasetGeometry {
        &self.geometry
    }

    /// Fetch behavior configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Configured overview levels, finest first.
    pub fn overviews(&self) -> &OverviewChain {
        &self.overviews
    }

    /// The shared in-memory block cache.
    pub fn block_cache(&self) -> &BlockCache {
        &self.block_cache
    }

    /// Counters accumulated over the dataset's lifetime.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Dimension view of one band at one level.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for a band index outside
    /// `1..=band_count` or an overview index that was never configured.
    pub fn band(&self, index: usize, level: Level) -> Result<Band, Error> {
        if index == 0 || index > self.geometry.band_count() {
            return Err(Error::InvalidArgument(format!(
                "band {} outside 1..={}",
                index,
                self.geometry.band_count()
            )));
        }
        let (width, height) = self.level_size(level)?;
        Ok(Band::new(
            index,
            level,
            width,
            height,
            self.geometry.block_width(),
            self.geometry.block_height(),
        ))
    }

    /// Read one block of one band into `buf`.
    ///
    /// The buffer must hold exactly `block_width * block_height` bytes.
    /// A resident block is copied straight out of the block cache;
    /// otherwise the read goes through the coordinator, widened to the
    /// current hint window when one covers this block. On success the
    /// buffer holds decoded pixels, or zeros when the service response
    /// matched the configured zero-block rules.
    pub fn read_block(
        &self,
        band: usize,
        level: Level,
        coord: BlockCoord,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let view = self.band(band, level)?;
        if !view.contains_block(coord) {
            return Err(Error::Coord(CoordError::BlockOutOfRange {
                coord,
                max_x: view.blocks_across() - 1,
                max_y: view.blocks_down() - 1,
            }));
        }
        if buf.len() != view.block_len() {
            return Err(Error::InvalidArgument(format!(
                "block buffer holds {} bytes, blocks are {}",
                buf.len(),
                view.block_len()
            )));
        }

        let key = BlockKey::new(band, level, coord);
        if let Some(block) = self.block_cache.get(&key) {
            buf.copy_from_slice(&block);
            self.stats.record_memory_hit();
            return Ok(());
        }

        let rect = self
            .take_hint_rect(level, coord)
            .unwrap_or_else(|| BlockRect::single(coord));

        self.coordinator()
            .read_blocks(&view, Some(Target { coord, buf }), rect, false)
    }

    /// Announce an upcoming read of a pixel window at one level.
    ///
    /// Prefetches every tile the window covers in one batch and
    /// publishes the window as the dataset's hint, so the next block
    /// read inside it resolves the whole rectangle at once. Tiles land
    /// in the persistent cache undecoded unless read verification is
    /// configured, in which case they are decoded into the block cache
    /// immediately.
    ///
    /// A no-op when prefetch is disabled or the dataset is offline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when prefetch is enabled but no tile
    /// cache is attached.
    pub fn advise_read(&self, level: Level, window: &PixelWindow) -> Result<(), Error> {
        if !self.config.advise_read || self.config.offline {
            return Ok(());
        }
        if self.tile_cache.is_none() {
            return Err(Error::Config(
                "advise_read requires a tile cache".to_string(),
            ));
        }
        if window.is_empty() {
            return Ok(());
        }

        let view = self.band(1, level)?;
        let rect = view.block_range(window)?;

        debug!(level = %level, rect = %rect, "publishing read hint");
        {
            let mut hint = self.hint.lock();
            *hint = Some(HintWindow { level, rect });
        }

        let advise_only = !self.config.verify_advise_read;
        self.coordinator().read_blocks(&view, None, rect, advise_only)
    }

    /// URL answering "what is at this pixel", when the protocol has one.
    ///
    /// `px` and `py` are full-band pixel coordinates at `level`; the
    /// URL addresses the tile containing them with the pixel offset
    /// within that tile.
    pub fn pixel_info_url(
        &self,
        band: usize,
        level: Level,
        px: u32,
        py: u32,
    ) -> Result<String, Error> {
        let view = self.band(band, level)?;
        if px >= view.width() || py >= view.height() {
            return Err(Error::InvalidArgument(format!(
                "pixel ({}, {}) outside {}x{}",
                px,
                py,
                view.width(),
                view.height()
            )));
        }
        let coord = coord::block_for_pixel(px, py, view.block_width(), view.block_height())?;
        let info = self.coordinator().request_info(&view, coord)?;
        let url = self.driver.pixel_info_url(
            &info,
            (px % view.block_width(), py % view.block_height()),
        )?;
        Ok(url)
    }

    /// Consume the hint when it covers `coord` at `level`.
    ///
    /// A hint for another level or another rectangle stays published;
    /// only the read that actually uses it clears it.
    fn take_hint_rect(&self, level: Level, coord: BlockCoord) -> Option<BlockRect> {
        let mut hint = self.hint.lock();
        match hint.as_ref() {
            Some(h) if h.level == level && h.rect.contains(coord) => {
                let rect = h.rect;
                *hint = None;
                Some(rect)
            }
            _ => None,
        }
    }

    fn level_size(&self, level: Level) -> Result<(u32, u32), Error> {
        match level {
            Level::Full => Ok((self.geometry.raster_width(), self.geometry.raster_height())),
            Level::Overview(i) => {
                let entry = self.overviews.get(i).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "overview {} outside 0..{}",
                        i,
                        self.overviews.len()
                    ))
                })?;
                Ok((entry.width(), entry.height()))
            }
        }
    }

    fn coordinator(&self) -> BlockCoordinator<'_> {
        BlockCoordinator {
            geometry: &self.geometry,
            config: &self.config,
            driver: self.driver.as_ref(),
            fetcher: self.fetcher.as_ref(),
            tile_cache: self.tile_cache.as_deref(),
            decoder: self.decoder.as_ref(),
            block_cache: &self.block_cache,
            stats: &self.stats,
        }
    }
}

/// Assembles a [`RemoteDataset`].
///
/// Geometry and a protocol driver are required. The transport defaults
/// to [`HttpBatchFetcher`], the decoder to [`ImageTileDecoder`], and
/// the block cache to [`DEFAULT_BLOCK_CACHE_BYTES`]; a tile cache is
/// attached only when given one.
pub struct RemoteDatasetBuilder {
    geometry: Option<DatasetGeometry>,
    config: FetchConfig,
    driver: Option<Box<dyn MiniDriver>>,
    fetcher: Option<Box<dyn BatchFetcher>>,
    tile_cache: Option<Box<dyn TileCache>>,
    decoder: Option<Box<dyn TileDecoder>>,
    block_cache_bytes: u64,
    overview_scales: Vec<f64>,
}

impl Default for RemoteDatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteDatasetBuilder {
    pub fn new() -> Self {
        Self {
            geometry: None,
            config: FetchConfig::new(),
            driver: None,
            fetcher: None,
            tile_cache: None,
            decoder: None,
            block_cache_bytes: DEFAULT_BLOCK_CACHE_BYTES,
            overview_scales: Vec::new(),
        }
    }

    /// Dataset geometry (required).
    pub fn with_geometry(mut self, geometry: DatasetGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Fetch behavior configuration.
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Protocol driver that turns tile addresses into URLs (required).
    pub fn with_driver(mut self, driver: impl MiniDriver + 'static) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    /// Replace the HTTP transport.
    pub fn with_fetcher(mut self, fetcher: impl BatchFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Attach a persistent tile cache.
    pub fn with_tile_cache(mut self, cache: impl TileCache + 'static) -> Self {
        self.tile_cache = Some(Box::new(cache));
        self
    }

    /// Replace the tile decoder.
    pub fn with_decoder(mut self, decoder: impl TileDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Capacity of the in-memory block cache.
    pub fn with_block_cache_bytes(mut self, bytes: u64) -> Self {
        self.block_cache_bytes = bytes;
        self
    }

    /// Add one overview level by scale factor, strictly between 0 and 1.
    pub fn with_overview_scale(mut self, scale: f64) -> Self {
        self.overview_scales.push(scale);
        self
    }

    /// Add several overview levels at once.
    pub fn with_overview_scales(mut self, scales: impl IntoIterator<Item = f64>) -> Self {
        self.overview_scales.extend(scales);
        self
    }

    /// Validate the configuration and build the dataset.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when geometry or driver is missing, or
    /// when the overview chain is deeper than the tile grid allows, and
    /// `Error::InvalidArgument` for an unusable overview scale.
    pub fn build(self) -> Result<RemoteDataset, Error> {
        let geometry = self
            .geometry
            .ok_or_else(|| Error::Config("dataset geometry is required".to_string()))?;
        let driver = self
            .driver
            .ok_or_else(|| Error::Config("a protocol driver is required".to_string()))?;

        let mut overviews = OverviewChain::new(geometry.raster_width(), geometry.raster_height());
        for scale in self.overview_scales {
            overviews.add(scale)?;
        }

        // Every level must map onto a non-negative tile grid level.
        if geometry.base_level() < overviews.len() as i32 {
            return Err(Error::Config(format!(
                "tile level would drop below zero: base level {} with {} overview level(s)",
                geometry.base_level(),
                overviews.len()
            )));
        }

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Box::new(HttpBatchFetcher::new()));
        let decoder = self
            .decoder
            .unwrap_or_else(|| Box::new(ImageTileDecoder::new()));

        Ok(RemoteDataset {
            geometry,
            config: self.config,
            driver,
            fetcher,
            tile_cache: self.tile_cache,
            decoder,
            block_cache: BlockCache::new(self.block_cache_bytes),
            overviews,
            hint: Mutex::new(None),
            stats: FetchStats::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskTileCache;
    use crate::coord::DataWindow;
    use crate::fetch::{FetchResponse, FetchResult, MockBatchFetcher};
    use crate::minidriver::{DriverError, TileRequest};
    use bytes::Bytes;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    struct StaticDriver;

    impl MiniDriver for StaticDriver {
        fn tile_url(&self, req: &TileRequest) -> Result<String, DriverError> {
            Ok(format!(
                "http://tiles.test/{}/{}/{}",
                req.tile.level, req.tile.x, req.tile.y
            ))
        }

        fn pixel_info_url(
            &self,
            req: &TileRequest,
            pixel: (u32, u32),
        ) -> Result<String, DriverError> {
            Ok(format!(
                "http://tiles.test/{}/{}/{}?i={}&j={}",
                req.tile.level, req.tile.x, req.tile.y, pixel.0, pixel.1
            ))
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn png_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Bytes {
        let img = RgbImage::from_pixel(width, height, Rgb(rgb));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png)
            .expect("Failed to encode PNG");
        Bytes::from(buffer.into_inner())
    }

    fn ok_with(body: Bytes) -> FetchResult {
        Ok(FetchResponse { status: 200, body })
    }

    fn world_geometry(width: u32, height: u32, bands: usize) -> DatasetGeometry {
        DatasetGeometry::new(
            DataWindow::new(-180.0, 90.0, 180.0, -90.0),
            width,
            height,
            256,
            256,
            bands,
        )
        .expect("Failed to build geometry")
    }

    fn tile_fetcher(color: [u8; 3]) -> MockBatchFetcher {
        MockBatchFetcher::new().with_fallback(ok_with(png_rgb(256, 256, color)))
    }

    #[test]
    fn test_build_requires_geometry_and_driver() {
        let err = RemoteDataset::builder().build().expect_err("must fail");
        assert!(matches!(err, Error::Config(ref m) if m.contains("geometry")));

        let err = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .build()
            .expect_err("must fail");
        assert!(matches!(err, Error::Config(ref m) if m.contains("driver")));
    }

    #[test]
    fn test_build_rejects_overview_chain_deeper_than_tile_grid() {
        let err = RemoteDataset::builder()
            .with_geometry(world_geometry(1024, 512, 3).with_base_level(1))
            .with_driver(StaticDriver)
            .with_overview_scales([0.5, 0.25])
            .build()
            .expect_err("two overviews need base level 2");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_second_read_hits_memory() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(tile_fetcher([10, 20, 30]))
            .build()
            .expect("Failed to build dataset");

        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("first read failed");
        assert!(buf.iter().all(|&v| v == 10));

        let mut again = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut again)
            .expect("second read failed");
        assert_eq!(buf, again);

        let stats = dataset.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.memory_hits, 1);
        assert!((stats.cache_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sibling_band_read_hits_memory() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(tile_fetcher([10, 20, 30]))
            .build()
            .expect("Failed to build dataset");

        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("read failed");

        // Bands 2 and 3 were decoded from the same tile.
        dataset
            .read_block(2, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("band 2 read failed");
        assert!(buf.iter().all(|&v| v == 20));
        dataset
            .read_block(3, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("band 3 read failed");
        assert!(buf.iter().all(|&v| v == 30));

        assert_eq!(dataset.stats().fetches, 1);
        assert_eq!(dataset.stats().memory_hits, 2);
    }

    #[test]
    fn test_read_block_validates_arguments() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(MockBatchFetcher::new())
            .build()
            .expect("Failed to build dataset");

        let mut buf = vec![0u8; 256 * 256];
        let err = dataset
            .read_block(0, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect_err("band 0 must fail");
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = dataset
            .read_block(4, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect_err("band 4 of 3 must fail");
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = dataset
            .read_block(1, Level::Full, BlockCoord::new(2, 0), &mut buf)
            .expect_err("column 2 of a 2x2 grid must fail");
        assert!(matches!(
            err,
            Error::Coord(CoordError::BlockOutOfRange { .. })
        ));

        let mut short = vec![0u8; 16];
        let err = dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut short)
            .expect_err("short buffer must fail");
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = dataset
            .read_block(1, Level::Overview(0), BlockCoord::new(0, 0), &mut buf)
            .expect_err("unconfigured overview must fail");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_overview_band_dimensions() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(1024, 512, 3).with_base_level(2))
            .with_driver(StaticDriver)
            .with_fetcher(MockBatchFetcher::new())
            .with_overview_scales([0.5, 0.25])
            .build()
            .expect("Failed to build dataset");

        assert_eq!(dataset.overviews().len(), 2);

        let fine = dataset.band(1, Level::Overview(0)).expect("band failed");
        assert_eq!((fine.width(), fine.height()), (512, 256));
        assert_eq!((fine.blocks_across(), fine.blocks_down()), (2, 1));

        let coarse = dataset.band(1, Level::Overview(1)).expect("band failed");
        assert_eq!((coarse.width(), coarse.height()), (256, 128));
        assert_eq!((coarse.blocks_across(), coarse.blocks_down()), (1, 1));
    }

    #[test]
    fn test_overview_read_addresses_shallower_tile_level() {
        let fetcher = tile_fetcher([5, 6, 7]);
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(1024, 512, 3).with_base_level(2))
            .with_driver(StaticDriver)
            .with_fetcher(fetcher)
            .with_overview_scale(0.5)
            .build()
            .expect("Failed to build dataset");

        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Overview(0), BlockCoord::new(1, 0), &mut buf)
            .expect("overview read failed");

        // Base level 2, one overview step down: tile level 1.
        let view = dataset.band(1, Level::Overview(0)).unwrap();
        let info = dataset
            .coordinator()
            .request_info(&view, BlockCoord::new(1, 0))
            .unwrap();
        assert_eq!(info.tile.level, 1);
        assert!(buf.iter().all(|&v| v == 5));
    }

    #[test]
    fn test_advise_read_requires_tile_cache() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(MockBatchFetcher::new())
            .with_config(FetchConfig::new().with_advise_read(true))
            .build()
            .expect("Failed to build dataset");

        let err = dataset
            .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
            .expect_err("advise without a tile cache must fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_advise_read_disabled_is_noop() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(MockBatchFetcher::new())
            .build()
            .expect("Failed to build dataset");

        dataset
            .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
            .expect("disabled advise must be a no-op");
        assert_eq!(dataset.stats().fetches, 0);
    }

    fn advising_dataset(tmp: &TempDir, width: u32, height: u32) -> RemoteDataset {
        RemoteDataset::builder()
            .with_geometry(world_geometry(width, height, 3))
            .with_driver(StaticDriver)
            .with_fetcher(tile_fetcher([1, 2, 3]))
            .with_tile_cache(DiskTileCache::new(tmp.path()).expect("Failed to create cache"))
            .with_config(FetchConfig::new().with_advise_read(true))
            .build()
            .expect("Failed to build dataset")
    }

    #[test]
    fn test_advise_read_prefetches_window_in_one_batch() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let dataset = advising_dataset(&tmp, 768, 512);

        dataset
            .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
            .expect("advise failed");

        // Four tiles, one batch, nothing decoded yet.
        assert_eq!(dataset.stats().fetches, 4);
        assert_eq!(dataset.block_cache().entry_count(), 0);
    }

    #[test]
    fn test_hinted_read_widens_and_consumes_hint() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let dataset = advising_dataset(&tmp, 768, 512);

        dataset
            .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
            .expect("advise failed");

        // First covered read resolves the whole 2x2 rectangle from the
        // tile cache.
        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("read failed");
        assert!(buf.iter().all(|&v| v == 1));
        assert_eq!(dataset.stats().disk_hits, 4);
        assert_eq!(dataset.stats().fetches, 4);

        // Sibling blocks of the rectangle are now resident.
        dataset
            .read_block(2, Level::Full, BlockCoord::new(1, 1), &mut buf)
            .expect("read failed");
        assert!(buf.iter().all(|&v| v == 2));
        assert_eq!(dataset.stats().memory_hits, 1);

        // The hint was single-use: a fresh miss inside the old window
        // resolves alone.
        dataset.block_cache().clear();
        dataset
            .read_block(1, Level::Full, BlockCoord::new(1, 1), &mut buf)
            .expect("read failed");
        assert_eq!(dataset.stats().disk_hits, 5);
    }

    #[test]
    fn test_hint_survives_level_mismatch() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(1024, 512, 3).with_base_level(1))
            .with_driver(StaticDriver)
            .with_fetcher(tile_fetcher([9, 9, 9]))
            .with_tile_cache(DiskTileCache::new(tmp.path()).expect("Failed to create cache"))
            .with_config(FetchConfig::new().with_advise_read(true))
            .with_overview_scale(0.5)
            .build()
            .expect("Failed to build dataset");

        dataset
            .advise_read(Level::Overview(0), &PixelWindow::new(0, 0, 512, 256))
            .expect("advise failed");
        assert_eq!(dataset.stats().fetches, 2);

        // A full-resolution read does not match the overview hint.
        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
            .expect("read failed");
        assert_eq!(dataset.stats().fetches, 3);
        assert_eq!(dataset.stats().disk_hits, 0);

        // The hint is still live for its own level.
        dataset
            .read_block(1, Level::Overview(0), BlockCoord::new(1, 0), &mut buf)
            .expect("overview read failed");
        assert_eq!(dataset.stats().disk_hits, 2);
        assert_eq!(dataset.stats().fetches, 3);
    }

    #[test]
    fn test_verified_advise_decodes_immediately() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3))
            .with_driver(StaticDriver)
            .with_fetcher(tile_fetcher([4, 5, 6]))
            .with_tile_cache(DiskTileCache::new(tmp.path()).expect("Failed to create cache"))
            .with_config(
                FetchConfig::new()
                    .with_advise_read(true)
                    .with_verify_advise_read(true),
            )
            .build()
            .expect("Failed to build dataset");

        dataset
            .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
            .expect("advise failed");

        // Verified prefetch decodes into the block cache: 4 blocks for
        // each of 3 bands.
        assert_eq!(dataset.block_cache().entry_count(), 12);

        let mut buf = vec![0u8; 256 * 256];
        dataset
            .read_block(2, Level::Full, BlockCoord::new(1, 1), &mut buf)
            .expect("read failed");
        assert!(buf.iter().all(|&v| v == 5));
        assert_eq!(dataset.stats().memory_hits, 1);
        assert_eq!(dataset.stats().fetches, 4);
    }

    #[test]
    fn test_pixel_info_url_addresses_tile_and_offset() {
        let dataset = RemoteDataset::builder()
            .with_geometry(world_geometry(512, 512, 3).with_base_level(3))
            .with_driver(StaticDriver)
            .with_fetcher(MockBatchFetcher::new())
            .build()
            .expect("Failed to build dataset");

        let url = dataset
            .pixel_info_url(1, Level::Full, 300, 100)
            .expect("info url failed");
        assert_eq!(url, "http://tiles.test/3/1/0?i=44&j=100");

        let err = dataset
            .pixel_info_url(1, Level::Full, 512, 0)
            .expect_err("pixel outside the raster must fail");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
