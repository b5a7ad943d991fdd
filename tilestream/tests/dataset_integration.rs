//! Integration tests for the remote dataset read pipeline.
//!
//! These tests verify the complete flow through the public API:
//! - block read → batched fetch → decode → multi-band distribution
//! - persistent tile cache write-through and reuse across datasets
//! - prefetch advisories and hint-widened reads
//! - zero-block degradation for status codes and service exceptions
//!
//! Run with: `cargo test --test dataset_integration`

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use image::{Rgb, RgbImage};
use tempfile::TempDir;

use tilestream::cache::DiskTileCache;
use tilestream::config::FetchConfig;
use tilestream::coord::{BlockCoord, DataWindow, Level, PixelWindow};
use tilestream::dataset::{DatasetGeometry, RemoteDataset};
use tilestream::error::Error;
use tilestream::fetch::{BatchFetcher, FetchError, FetchOptions, FetchResponse, FetchResult};
use tilestream::minidriver::TmsDriver;

// ============================================================================
// Helper Functions
// ============================================================================

/// Fetcher that answers from a scripted URL table and records every
/// batch, shared between the dataset and the test via `Arc`.
struct ScriptedFetcher {
    responses: HashMap<String, FetchResult>,
    fallback: FetchResult,
    batches: Mutex<Vec<Vec<String>>>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: Err(FetchError::new("no scripted response")),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Script the result for one URL.
    fn with_response(mut self, url: impl Into<String>, result: FetchResult) -> Self {
        self.responses.insert(url.into(), result);
        self
    }

    /// Result for URLs without a scripted response.
    fn with_fallback(mut self, result: FetchResult) -> Self {
        self.fallback = result;
        self
    }

    fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of `fetch_all` calls so far.
    fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Total number of requests across all batches.
    fn request_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(|b| b.len()).sum()
    }
}

impl BatchFetcher for Arc<ScriptedFetcher> {
    fn fetch_all(&self, urls: &[String], _options: &FetchOptions) -> Vec<FetchResult> {
        self.batches.lock().unwrap().push(urls.to_vec());
        urls.iter()
            .map(|url| {
                self.responses
                    .get(url)
                    .cloned()
                    .unwrap_or_else(|| self.fallback.clone())
            })
            .collect()
    }
}

/// PNG tile of a single color.
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

fn status(code: u16) -> FetchResult {
    Ok(FetchResponse {
        status: code,
        body: Bytes::new(),
    })
}

/// World-spanning 512x512 dataset in 256-pixel blocks, placed at tile
/// grid level 3 with its origin at tile (2, 1).
fn world_geometry(bands: usize) -> DatasetGeometry {
    DatasetGeometry::new(
        DataWindow::new(-180.0, 90.0, 180.0, -90.0),
        512,
        512,
        256,
        256,
        bands,
    )
    .expect("Failed to build geometry")
    .with_base_level(3)
    .with_origin_tile(2, 1)
}

fn tms_driver() -> TmsDriver {
    TmsDriver::new("http://tiles.test/${z}/${x}/${y}.png").expect("Failed to build driver")
}

/// URL the TMS template produces for a service tile address.
fn tile_url(level: i32, x: u32, y: u32) -> String {
    format!("http://tiles.test/{}/{}/{}.png", level, x, y)
}

/// Service exception document a WMS server answers with HTTP 200.
const EXCEPTION_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="LayerNotDefined">no such layer</ServiceException>
</ServiceExceptionReport>"#;

// ============================================================================
// Integration Tests
// ============================================================================

/// Test the full read pipeline for one block.
///
/// 1. Block (0, 0) of band 1 is requested
/// 2. The coordinator fetches the tile at grid address (2, 1, 3)
/// 3. The PNG is decoded and all three bands become cache-resident
/// 4. The raw body is written through to the persistent cache
/// 5. Sibling band reads are answered from memory
#[test]
fn test_full_read_pipeline() {
    let temp = TempDir::new().unwrap();
    let cache_root = temp.path().join("tiles");
    let body = png_rgb(256, 256, [40, 80, 120]);
    let fetcher = ScriptedFetcher::new()
        .with_response(tile_url(3, 2, 1), ok_with(body.clone()))
        .shared();

    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .with_tile_cache(DiskTileCache::new(&cache_root).unwrap())
        .build()
        .expect("Failed to build dataset");

    let mut buf = vec![0u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("read failed");
    assert!(buf.iter().all(|&v| v == 40), "band 1 should decode to 40");

    // Sibling bands were distributed from the same decode
    for (band, value) in [(2usize, 80u8), (3, 120)] {
        let mut sibling = vec![0u8; 256 * 256];
        dataset
            .read_block(band, Level::Full, BlockCoord::new(0, 0), &mut sibling)
            .expect("sibling read failed");
        assert!(
            sibling.iter().all(|&v| v == value),
            "band {} should decode to {}",
            band,
            value
        );
    }
    assert_eq!(fetcher.request_count(), 1, "one tile, one request");

    // The raw body landed in the persistent cache under the tile URL
    let probe = DiskTileCache::new(&cache_root).unwrap();
    let cached = probe
        .lookup(&tile_url(3, 2, 1))
        .expect("tile should be cached on disk");
    assert_eq!(fs::read(cached).unwrap(), body);

    let stats = dataset.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.memory_hits, 2);
    assert_eq!(stats.failures, 0);
}

/// A second dataset pointed at the same cache directory decodes from
/// disk without touching the network.
#[test]
fn test_persistent_cache_reused_across_datasets() {
    let temp = TempDir::new().unwrap();
    let cache_root = temp.path().join("tiles");

    let first = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(
            ScriptedFetcher::new()
                .with_fallback(ok_with(png_rgb(256, 256, [40, 80, 120])))
                .shared(),
        )
        .with_tile_cache(DiskTileCache::new(&cache_root).unwrap())
        .build()
        .unwrap();
    let mut buf = vec![0u8; 256 * 256];
    first
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("seeding read failed");

    // Fresh dataset, fresh block cache, no scripted responses: every
    // network request would fail
    let offline_fetcher = ScriptedFetcher::new().shared();
    let second = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&offline_fetcher))
        .with_tile_cache(DiskTileCache::new(&cache_root).unwrap())
        .build()
        .unwrap();

    let mut again = vec![0u8; 256 * 256];
    second
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut again)
        .expect("cached read failed");
    assert!(again.iter().all(|&v| v == 40));
    assert_eq!(offline_fetcher.request_count(), 0, "no network needed");
    assert_eq!(second.stats().disk_hits, 1);
    assert_eq!(second.stats().fetches, 0);
}

/// Test the prefetch flow.
///
/// 1. `advise_read` covers the whole raster: all four tiles are
///    fetched in a single batch and stored undecoded
/// 2. The advisory publishes a hint window
/// 3. The next read consumes the hint, widens to the full rectangle,
///    and decodes every tile from disk
/// 4. Reads elsewhere in the window are memory hits
#[test]
fn test_prefetch_then_read() {
    let temp = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with_fallback(ok_with(png_rgb(256, 256, [7, 14, 21])))
        .shared();

    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .with_tile_cache(DiskTileCache::new(temp.path().join("tiles")).unwrap())
        .with_config(FetchConfig::new().with_advise_read(true))
        .build()
        .unwrap();

    dataset
        .advise_read(Level::Full, &PixelWindow::new(0, 0, 512, 512))
        .expect("advise failed");
    assert_eq!(fetcher.batch_count(), 1, "one batch for the window");
    assert_eq!(fetcher.request_count(), 4, "four tiles advised");
    assert_eq!(
        dataset.block_cache().entry_count(),
        0,
        "advised tiles are stored, not decoded"
    );

    let mut buf = vec![0u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("hinted read failed");
    assert!(buf.iter().all(|&v| v == 7));
    assert_eq!(fetcher.request_count(), 4, "hinted read stays off the network");

    let mut far = vec![0u8; 256 * 256];
    dataset
        .read_block(2, Level::Full, BlockCoord::new(1, 1), &mut far)
        .expect("read inside window failed");
    assert!(far.iter().all(|&v| v == 14));
    assert_eq!(fetcher.request_count(), 4);

    let stats = dataset.stats();
    assert_eq!(stats.disk_hits, 4, "whole window decoded from disk");
    assert_eq!(stats.memory_hits, 1);
}

/// A status code in the configured zero-block set degrades the block
/// to zeros instead of failing, and the zeros are cached for every
/// band.
#[test]
fn test_zero_block_status_degradation() {
    let fetcher = ScriptedFetcher::new()
        .with_fallback(status(404))
        .shared();
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .with_config(FetchConfig::new().with_zero_block_code(404))
        .build()
        .unwrap();

    let mut buf = vec![1u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("zero-block read should succeed");
    assert!(buf.iter().all(|&v| v == 0));
    assert_eq!(fetcher.request_count(), 1, "the request was attempted");

    // Sibling bands were zero-filled by the same decision
    let mut sibling = vec![1u8; 256 * 256];
    dataset
        .read_block(2, Level::Full, BlockCoord::new(0, 0), &mut sibling)
        .expect("sibling read failed");
    assert!(sibling.iter().all(|&v| v == 0));
    assert_eq!(fetcher.request_count(), 1, "zeros are cache-resident");

    let stats = dataset.stats();
    assert_eq!(stats.zero_fills, 1);
    assert_eq!(stats.fetches, 0, "nothing was actually retrieved");
    assert_eq!(stats.failures, 0);
}

/// The same 404 without configuration is a transport failure.
#[test]
fn test_unconfigured_status_fails() {
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(ScriptedFetcher::new().with_fallback(status(404)).shared())
        .build()
        .unwrap();

    let mut buf = vec![0u8; 256 * 256];
    let err = dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect_err("404 outside the zero set must fail");
    match err {
        Error::Transport { status, .. } => assert_eq!(status, Some(404)),
        other => panic!("expected transport failure, got {}", other),
    }
    assert_eq!(dataset.stats().failures, 1);
}

/// A service exception document fails the read by default and carries
/// the parsed exception records.
#[test]
fn test_service_exception_fails_with_records() {
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(
            ScriptedFetcher::new()
                .with_fallback(ok_with(Bytes::from_static(EXCEPTION_BODY.as_bytes())))
                .shared(),
        )
        .build()
        .unwrap();

    let mut buf = vec![0u8; 256 * 256];
    let err = dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect_err("exception must fail");
    match err {
        Error::Protocol { records, .. } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].code.as_deref(), Some("LayerNotDefined"));
            assert_eq!(records[0].message, "no such layer");
        }
        other => panic!("expected protocol failure, got {}", other),
    }
}

/// The same exception degrades to a zero block when configured.
#[test]
fn test_service_exception_zero_fills_when_configured() {
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(
            ScriptedFetcher::new()
                .with_fallback(ok_with(Bytes::from_static(EXCEPTION_BODY.as_bytes())))
                .shared(),
        )
        .with_config(FetchConfig::new().with_zero_block_on_exception(true))
        .build()
        .unwrap();

    let mut buf = vec![1u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("configured exception read should succeed");
    assert!(buf.iter().all(|&v| v == 0));
    assert_eq!(dataset.stats().zero_fills, 1);
}

/// Three-band tiles against a four-band dataset: the alpha band is
/// synthesized fully opaque, the color bands decode normally.
#[test]
fn test_three_band_tile_fills_alpha_band() {
    let fetcher = ScriptedFetcher::new()
        .with_fallback(ok_with(png_rgb(256, 256, [10, 20, 30])))
        .shared();
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(4))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .build()
        .unwrap();

    let mut alpha = vec![0u8; 256 * 256];
    dataset
        .read_block(4, Level::Full, BlockCoord::new(0, 0), &mut alpha)
        .expect("alpha read failed");
    assert!(alpha.iter().all(|&v| v == 255), "alpha is fully opaque");

    let mut red = vec![0u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut red)
        .expect("red read failed");
    assert!(red.iter().all(|&v| v == 10), "color bands decode normally");

    assert_eq!(fetcher.request_count(), 1, "one decode serves all four bands");
}

/// Overview levels address a shallower tile grid and never share
/// block cache entries with the full-resolution level.
#[test]
fn test_overview_levels_fetch_independently() {
    let fetcher = ScriptedFetcher::new()
        .with_response(tile_url(3, 2, 1), ok_with(png_rgb(256, 256, [100, 0, 0])))
        .with_response(tile_url(2, 1, 0), ok_with(png_rgb(256, 256, [200, 0, 0])))
        .shared();
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .with_overview_scale(0.5)
        .build()
        .unwrap();

    let mut full = vec![0u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut full)
        .expect("full read failed");
    assert!(full.iter().all(|&v| v == 100));

    let mut overview = vec![0u8; 256 * 256];
    dataset
        .read_block(1, Level::Overview(0), BlockCoord::new(0, 0), &mut overview)
        .expect("overview read failed");
    assert!(overview.iter().all(|&v| v == 200));

    assert_eq!(fetcher.request_count(), 2, "same geography, two levels, two tiles");
    assert_eq!(
        dataset.block_cache().entry_count(),
        6,
        "three bands resident per level"
    );
}

/// An offline dataset answers every uncached block with zeros and
/// never constructs a network request.
#[test]
fn test_offline_dataset_never_fetches() {
    let fetcher = ScriptedFetcher::new().shared();
    let dataset = RemoteDataset::builder()
        .with_geometry(world_geometry(3))
        .with_driver(tms_driver())
        .with_fetcher(Arc::clone(&fetcher))
        .with_config(FetchConfig::new().with_offline(true))
        .build()
        .unwrap();

    let mut buf = vec![1u8; 256 * 256];
    dataset
        .read_block(1, Level::Full, BlockCoord::new(0, 0), &mut buf)
        .expect("offline read should succeed");
    assert!(buf.iter().all(|&v| v == 0));
    assert_eq!(fetcher.batch_count(), 0, "offline mode never fetches");
    assert_eq!(dataset.stats().zero_fills, 1);
}
