//! Dataset geometry and pixel-to-CRS mapping.
//!
//! One `DatasetGeometry` describes everything about a dataset that is
//! fixed at open time: the georeferenced extent, the full-resolution
//! raster size, the block size, the band count, and where the dataset
//! sits on the remote service's tile grid. Every band and overview
//! derives its request windows from it.

use crate::coord::{BlockCoord, CoordError, DataWindow, Level, TileRef};
use crate::error::Error;

/// CRS coordinate of pixel boundary `p` on an axis of `size` pixels
/// spanning `e0..e1`.
///
/// Neighboring blocks evaluate their shared boundary with identical
/// arguments, so the results are bitwise equal and adjacent requests
/// never drift apart. `p == size` returns `e1` itself, putting the far
/// edge of the last block exactly on the dataset extent. `p > size`
/// extrapolates past the extent, which unclamped edge requests rely on.
pub(crate) fn boundary(e0: f64, e1: f64, p: u64, size: u32) -> f64 {
    if p == size as u64 {
        e1
    } else {
        e0 + (e1 - e0) * (p as f64 / size as f64)
    }
}

/// Fixed geometry of a remote dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetGeometry {
    data_window: DataWindow,
    raster_width: u32,
    raster_height: u32,
    block_width: u32,
    block_height: u32,
    band_count: usize,
    base_level: i32,
    origin_tile_x: u32,
    origin_tile_y: u32,
}

impl DatasetGeometry {
    /// Describe a dataset.
    ///
    /// `data_window` spans the full raster; its `(x0, y0)` corner maps
    /// to pixel (0, 0). The base tile level and origin tile default to
    /// zero and can be set with the `with_*` methods.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for zero-sized rasters or blocks, a
    /// degenerate data window, or a band count outside 1..=4.
    pub fn new(
        data_window: DataWindow,
        raster_width: u32,
        raster_height: u32,
        block_width: u32,
        block_height: u32,
        band_count: usize,
    ) -> Result<Self, Error> {
        if raster_width == 0 || raster_height == 0 {
            return Err(Error::Config(format!(
                "raster size {}x{} must be positive",
                raster_width, raster_height
            )));
        }
        if block_width == 0 || block_height == 0 {
            return Err(Error::Config(format!(
                "block size {}x{} must be positive",
                block_width, block_height
            )));
        }
        if data_window.width() == 0.0 || data_window.height() == 0.0 {
            return Err(Error::Config("data window is degenerate".to_string()));
        }
        if band_count == 0 || band_count > 4 {
            return Err(Error::Config(format!(
                "band count {} outside supported range 1..=4",
                band_count
            )));
        }

        Ok(Self {
            data_window,
            raster_width,
            raster_height,
            block_width,
            block_height,
            band_count,
            base_level: 0,
            origin_tile_x: 0,
            origin_tile_y: 0,
        })
    }

    /// Set the tile grid level of the full-resolution raster.
    pub fn with_base_level(mut self, level: i32) -> Self {
        self.base_level = level;
        self
    }

    /// Set the tile grid address of block (0, 0) at full resolution.
    pub fn with_origin_tile(mut self, x: u32, y: u32) -> Self {
        self.origin_tile_x = x;
        self.origin_tile_y = y;
        self
    }

    /// Georeferenced extent of the dataset.
    pub fn data_window(&self) -> DataWindow {
        self.data_window
    }

    /// Full-resolution raster width in pixels.
    pub fn raster_width(&self) -> u32 {
        self.raster_width
    }

    /// Full-resolution raster height in pixels.
    pub fn raster_height(&self) -> u32 {
        self.raster_height
    }

    /// Block width in pixels, shared by every band and level.
    pub fn block_width(&self) -> u32 {
        self.block_width
    }

    /// Block height in pixels, shared by every band and level.
    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Tile grid level of the full-resolution raster.
    pub fn base_level(&self) -> i32 {
        self.base_level
    }

    /// Tile grid address of block (0, 0) at full resolution.
    pub fn origin_tile(&self) -> (u32, u32) {
        (self.origin_tile_x, self.origin_tile_y)
    }

    /// CRS extent of the pixel range `[px0, px1) x [py0, py1)` at a
    /// level whose raster measures `level_width x level_height`.
    ///
    /// Pixel boundaries may exceed the level size; those interpolate
    /// past the dataset extent.
    pub fn data_window_for(
        &self,
        px0: u64,
        py0: u64,
        px1: u64,
        py1: u64,
        level_width: u32,
        level_height: u32,
    ) -> DataWindow {
        let dw = &self.data_window;
        DataWindow {
            x0: boundary(dw.x0, dw.x1, px0, level_width),
            y0: boundary(dw.y0, dw.y1, py0, level_height),
            x1: boundary(dw.x0, dw.x1, px1, level_width),
            y1: boundary(dw.y0, dw.y1, py1, level_height),
        }
    }

    /// Service tile address of a block at a level.
    ///
    /// Each overview level halves the tile grid: the tile level drops
    /// by the level's shift and the origin tile address shifts right
    /// by the same amount.
    pub fn tile_for(&self, level: Level, coord: BlockCoord) -> Result<TileRef, CoordError> {
        let shift = level.shift();
        let tile_level = self.base_level - shift as i32;
        if tile_level < 0 {
            return Err(CoordError::TileLevelUnderflow {
                base_level: self.base_level,
                shift,
            });
        }
        Ok(TileRef {
            x: self.origin_tile_x.checked_shr(shift).unwrap_or(0) + coord.x,
            y: self.origin_tile_y.checked_shr(shift).unwrap_or(0) + coord.y,
            level: tile_level,
        })
    }
}
