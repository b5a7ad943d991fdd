//! Per-band block coordination.
//!
//! One [`BlockCoordinator`] invocation resolves a rectangle of blocks
//! for one band: resident blocks are skipped, disk-cached tiles are
//! decoded in place, and every remaining coordinate becomes exactly one
//! request in a single batched fetch. Responses are decoded and
//! distributed across all bands that share the tile, downgraded to a
//! zero block when configuration says so, or reported as the call's
//! failure. Nothing here retries; one call, one batch, one verdict.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::cache::{BlockCache, BlockKey, TileCache};
use crate::config::FetchConfig;
use crate::coord::{BlockCoord, BlockRect, PixelWindow};
use crate::decode::{ColorTable, DecodeError, DecodedTile, TileDecoder};
use crate::error::Error;
use crate::exception;
use crate::fetch::{BatchFetcher, FetchOptions, FetchResult};
use crate::minidriver::{MiniDriver, TileRequest};

use super::band::Band;
use super::geometry::DatasetGeometry;
use super::stats::FetchStats;

/// The requested block of one read call: the coordinate the caller
/// asked for and the buffer its pixels go into.
pub(crate) struct Target<'b> {
    pub(crate) coord: BlockCoord,
    pub(crate) buf: &'b mut [u8],
}

/// One coordinate that must be fetched, with the bands that still need
/// it. The band list is captured at enumeration time so a concurrent
/// reader filling the cache mid-batch cannot change what gets written.
struct PendingRequest {
    coord: BlockCoord,
    url: String,
    bands: Vec<usize>,
}

/// Borrowed view over one dataset's collaborators for the duration of
/// a single read or prefetch call.
pub(crate) struct BlockCoordinator<'a> {
    pub(crate) geometry: &'a DatasetGeometry,
    pub(crate) config: &'a FetchConfig,
    pub(crate) driver: &'a dyn MiniDriver,
    pub(crate) fetcher: &'a dyn BatchFetcher,
    pub(crate) tile_cache: Option<&'a dyn TileCache>,
    pub(crate) decoder: &'a dyn TileDecoder,
    pub(crate) block_cache: &'a BlockCache,
    pub(crate) stats: &'a FetchStats,
}

impl BlockCoordinator<'_> {
    /// Resolve every block of `rect` for `band`.
    ///
    /// With a `target`, the target coordinate is always fetched or
    /// decoded for the target band and its pixels are written into the
    /// target buffer. Without one (prefetch), blocks already resident
    /// in the block cache are skipped. With `advise_only`, tiles are
    /// downloaded into the tile cache without being decoded.
    ///
    /// The call is not transactional: blocks decoded before a later
    /// coordinate fails stay in the block cache, and the first failure
    /// becomes the call's result.
    pub(crate) fn read_blocks(
        &self,
        band: &Band,
        mut target: Option<Target<'_>>,
        rect: BlockRect,
        advise_only: bool,
    ) -> Result<(), Error> {
        debug!(
            band = band.index(),
            level = %band.level(),
            rect = %rect,
            advise_only,
            "resolving block rect"
        );

        let mut pending: Vec<PendingRequest> = Vec::new();

        for coord in rect.coords() {
            // Rects arrive pre-clamped to the band's block grid.
            debug_assert!(band.contains_block(coord));

            let needed = self.needed_bands(band, coord, target.as_ref(), advise_only);
            if needed.is_empty() {
                continue;
            }

            let info = self.request_info(band, coord)?;
            let url = self.driver.tile_url(&info)?;

            if let Some(cache) = self.tile_cache {
                if let Some(path) = cache.lookup(&url) {
                    if advise_only {
                        continue;
                    }
                    match self.decode_cached(band, coord, &needed, &path, &mut target) {
                        Ok(()) => {
                            self.stats.record_disk_hit();
                            continue;
                        }
                        Err(err) => {
                            // Degrade to a miss; the re-fetch overwrites
                            // the unreadable entry.
                            warn!(
                                url = %url,
                                path = %path.display(),
                                error = %err,
                                "cached tile unreadable, refetching"
                            );
                        }
                    }
                }
            }

            if self.config.offline {
                self.zero_block(band, coord, &mut target, advise_only);
                self.stats.record_zero_fill();
                continue;
            }

            pending.push(PendingRequest {
                coord,
                url,
                bands: needed,
            });
        }

        if pending.is_empty() {
            return Ok(());
        }

        debug!(requests = pending.len(), "dispatching fetch batch");
        let urls: Vec<String> = pending.iter().map(|p| p.url.clone()).collect();
        let options = FetchOptions::from(self.config);
        let results = self.fetcher.fetch_all(&urls, &options);

        let mut failure: Option<Error> = None;
        for (request, result) in pending.iter().zip(results) {
            if let Err(err) = self.handle_response(band, request, result, &mut target, advise_only)
            {
                self.stats.record_failure();
                warn!(url = %request.url, error = %err, "tile request failed");
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Bands that still need `coord`, in ascending order.
    ///
    /// The requested band of the requested coordinate is always needed,
    /// resident or not; every other slot is needed only while absent
    /// from the block cache. In advise mode every band counts as
    /// needed so the tile itself is considered.
    fn needed_bands(
        &self,
        band: &Band,
        coord: BlockCoord,
        target: Option<&Target<'_>>,
        advise_only: bool,
    ) -> Vec<usize> {
        let mut needed = Vec::new();
        for b in 1..=self.geometry.band_count() {
            let is_target = target.map_or(false, |t| t.coord == coord && b == band.index());
            if advise_only
                || is_target
                || !self
                    .block_cache
                    .contains(&BlockKey::new(b, band.level(), coord))
            {
                needed.push(b);
            }
        }
        needed
    }

    /// Build the wire-level request description for one block.
    ///
    /// The data window is computed from the block's nominal pixel
    /// bounds with the shared edge interpolation, so adjacent blocks
    /// get bitwise-identical shared edges. With request clamping the
    /// pixel size and window shrink to the valid portion at the raster
    /// edge; otherwise the full block extent is requested, past the
    /// raster edge if necessary.
    pub(crate) fn request_info(&self, band: &Band, coord: BlockCoord) -> Result<TileRequest, Error> {
        let tile = self.geometry.tile_for(band.level(), coord)?;
        let nominal = band.block_window(coord);

        let (width, height, px1, py1) = if self.config.clamp_requests {
            let valid = band.valid_block_window(coord);
            (valid.width, valid.height, valid.right(), valid.bottom())
        } else {
            (nominal.width, nominal.height, nominal.right(), nominal.bottom())
        };

        let window = self.geometry.data_window_for(
            nominal.x as u64,
            nominal.y as u64,
            px1,
            py1,
            band.width(),
            band.height(),
        );

        Ok(TileRequest {
            window,
            width,
            height,
            tile,
        })
    }

    fn decode_cached(
        &self,
        band: &Band,
        coord: BlockCoord,
        bands: &[usize],
        path: &Path,
        target: &mut Option<Target<'_>>,
    ) -> Result<(), Error> {
        let bytes = fs::read(path)?;
        let what = path.display().to_string();
        self.decode_and_distribute(band, coord, bands, &bytes, &what, target)
    }

    /// Classify one batch response and finish its coordinate.
    fn handle_response(
        &self,
        band: &Band,
        request: &PendingRequest,
        result: FetchResult,
        target: &mut Option<Target<'_>>,
        advise_only: bool,
    ) -> Result<(), Error> {
        match result {
            Ok(response) if response.is_success() && !response.body.is_empty() => {
                if exception::looks_like_exception(&response.body) {
                    return self.handle_exception(
                        band,
                        request,
                        &response.body,
                        target,
                        advise_only,
                    );
                }

                if advise_only {
                    // Prefetch stores the body undecoded; a later read
                    // pays the decode cost.
                    self.store_required(&request.url, &response.body)?;
                    self.stats.record_fetch();
                    return Ok(());
                }

                self.decode_and_distribute(
                    band,
                    request.coord,
                    &request.bands,
                    &response.body,
                    &request.url,
                    target,
                )?;
                self.stats.record_fetch();

                if let Some(cache) = self.tile_cache {
                    if let Err(err) = cache.store(&request.url, &response.body) {
                        warn!(url = %request.url, error = %err, "tile cache write failed");
                    }
                }
                Ok(())
            }
            Ok(response) => {
                if self.config.is_zero_block_code(response.status) {
                    debug!(
                        url = %request.url,
                        status = response.status,
                        "status in zero-block set"
                    );
                    self.zero_block(band, request.coord, target, advise_only);
                    self.stats.record_zero_fill();
                    Ok(())
                } else if response.is_success() {
                    Err(Error::transport_status(
                        &request.url,
                        response.status,
                        "empty response body",
                    ))
                } else {
                    Err(Error::transport_status(
                        &request.url,
                        response.status,
                        format!("unexpected status {}", response.status),
                    ))
                }
            }
            // No status code, so no zero-block downgrade.
            Err(err) => Err(Error::transport(&request.url, err.detail())),
        }
    }

    fn handle_exception(
        &self,
        band: &Band,
        request: &PendingRequest,
        body: &[u8],
        target: &mut Option<Target<'_>>,
        advise_only: bool,
    ) -> Result<(), Error> {
        let records = exception::classify(body);
        for record in &records {
            warn!(
                url = %request.url,
                code = record.code.as_deref().unwrap_or("-"),
                message = %record.message,
                "service exception"
            );
        }

        // An undiagnosed exception body never downgrades to a zero
        // block, whatever the configuration says.
        if !records.is_empty() && self.config.zero_block_on_exception {
            self.zero_block(band, request.coord, target, advise_only);
            self.stats.record_zero_fill();
            Ok(())
        } else {
            Err(Error::Protocol {
                url: request.url.clone(),
                records,
            })
        }
    }

    /// Fill one coordinate with zero bytes: the target buffer when it
    /// matches, and every sibling band not already resident. Always
    /// succeeds.
    pub(crate) fn zero_block(
        &self,
        band: &Band,
        coord: BlockCoord,
        target: &mut Option<Target<'_>>,
        advise_only: bool,
    ) {
        let len = band.block_len();

        let mut target_written = false;
        if let Some(t) = target.as_mut() {
            if t.coord == coord {
                t.buf.fill(0);
                self.block_cache
                    .insert(BlockKey::new(band.index(), band.level(), coord), vec![0; len]);
                target_written = true;
            }
        }

        if advise_only {
            return;
        }

        for b in 1..=self.geometry.band_count() {
            if target_written && b == band.index() {
                continue;
            }
            let key = BlockKey::new(b, band.level(), coord);
            if !self.block_cache.contains(&key) {
                self.block_cache.insert(key, vec![0; len]);
            }
        }
    }

    fn store_required(&self, url: &str, body: &[u8]) -> Result<(), Error> {
        if let Some(cache) = self.tile_cache {
            cache.store(url, body)?;
        }
        Ok(())
    }

    /// Decode one tile body and write its channels into every band in
    /// `bands`, plus the target buffer when the coordinate matches.
    ///
    /// The decoded size must fit the block and cover at least the valid
    /// portion at the raster edge. A decoded band count equal to the
    /// dataset's distributes channel-per-band. Two mismatches are
    /// permitted: a single paletted channel feeds each band through its
    /// color table column, and a 3-channel tile in a 4-band dataset
    /// fills band 4 with 255. Everything else is a decode failure.
    fn decode_and_distribute(
        &self,
        band: &Band,
        coord: BlockCoord,
        bands: &[usize],
        bytes: &[u8],
        what: &str,
        target: &mut Option<Target<'_>>,
    ) -> Result<(), Error> {
        let tile = self
            .decoder
            .decode(bytes)
            .map_err(|e| Error::decode(what, e))?;

        let block_width = band.block_width();
        let block_height = band.block_height();
        let valid = band.valid_block_window(coord);
        let tile_width = tile.width();
        let tile_height = tile.height();

        if tile_width > block_width
            || tile_height > block_height
            || tile_width < valid.width
            || tile_height < valid.height
        {
            let (expected_width, expected_height) = if self.config.clamp_requests {
                (valid.width, valid.height)
            } else {
                (block_width, block_height)
            };
            return Err(Error::decode(
                what,
                DecodeError::WrongSize {
                    expected_width,
                    expected_height,
                    actual_width: tile_width,
                    actual_height: tile_height,
                },
            ));
        }

        let file_bands = tile.band_count();
        let dataset_bands = self.geometry.band_count();
        let full = PixelWindow::new(0, 0, tile_width, tile_height);

        // A paletted single channel is read once and indexed per band.
        let palette: Option<(Vec<u8>, &ColorTable)> =
            if file_bands == 1 && file_bands != dataset_bands {
                match tile.color_table() {
                    Some(table) => {
                        let mut indexes =
                            vec![0u8; tile_width as usize * tile_height as usize];
                        tile.read_band_region(1, &full, &mut indexes)
                            .map_err(|e| Error::decode(what, e))?;
                        Some((indexes, table))
                    }
                    None => None,
                }
            } else {
                None
            };

        for &b in bands {
            let mut block = vec![0u8; band.block_len()];

            if file_bands == dataset_bands {
                copy_band(&*tile, b, &full, block_width, &mut block)
                    .map_err(|e| Error::decode(what, e))?;
            } else if let Some((indexes, table)) = &palette {
                let channel = b - 1;
                for row in 0..tile_height as usize {
                    let dst = row * block_width as usize;
                    let src = row * tile_width as usize;
                    for col in 0..tile_width as usize {
                        block[dst + col] = table.channel(indexes[src + col], channel);
                    }
                }
            } else if file_bands == 3 && dataset_bands == 4 {
                if b == 4 {
                    block.fill(255);
                } else {
                    copy_band(&*tile, b, &full, block_width, &mut block)
                        .map_err(|e| Error::decode(what, e))?;
                }
            } else {
                return Err(Error::decode(
                    what,
                    DecodeError::BandCount {
                        actual: file_bands,
                        expected: dataset_bands,
                    },
                ));
            }

            if let Some(t) = target.as_mut() {
                if t.coord == coord && b == band.index() {
                    t.buf.copy_from_slice(&block);
                }
            }
            self.block_cache
                .insert(BlockKey::new(b, band.level(), coord), block);
        }

        Ok(())
    }
}

/// Copy one decoded channel into a block buffer, row by row when the
/// tile is narrower than the block. Margin bytes keep their zero fill.
fn copy_band(
    tile: &dyn DecodedTile,
    file_band: usize,
    full: &PixelWindow,
    block_width: u32,
    block: &mut [u8],
) -> Result<(), DecodeError> {
    let tile_width = full.width as usize;
    let tile_height = full.height as usize;

    if tile_width == block_width as usize {
        return tile.read_band_region(file_band, full, &mut block[..tile_width * tile_height]);
    }

    let mut rows = vec![0u8; tile_width * tile_height];
    tile.read_band_region(file_band, full, &mut rows)?;
    for row in 0..tile_height {
        let dst = row * block_width as usize;
        let src = row * tile_width;
        block[dst..dst + tile_width].copy_from_slice(&rows[src..src + tile_width]);
    }
    Ok(())
}
