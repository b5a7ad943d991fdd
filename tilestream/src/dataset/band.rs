//! Band views and the overview chain.

use crate::coord::{self, BlockCoord, BlockRect, CoordError, Level, PixelWindow};
use crate::error::Error;

/// View of one band at one resolution level.
///
/// A `Band` is plain data derived from the dataset geometry and the
/// overview chain: band number, level, the level's raster size, and
/// the block size. It carries no collaborators and is cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    index: usize,
    level: Level,
    width: u32,
    height: u32,
    block_width: u32,
    block_height: u32,
}

impl Band {
    pub(crate) fn new(
        index: usize,
        level: Level,
        width: u32,
        height: u32,
        block_width: u32,
        block_height: u32,
    ) -> Self {
        Self {
            index,
            level,
            width,
            height,
            block_width,
            block_height,
        }
    }

    /// 1-based band number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Resolution level of this view.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Raster width at this level.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height at this level.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Block width in pixels.
    pub fn block_width(&self) -> u32 {
        self.block_width
    }

    /// Block height in pixels.
    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    /// Number of block columns in the grid.
    pub fn blocks_across(&self) -> u32 {
        self.width.div_ceil(self.block_width)
    }

    /// Number of block rows in the grid.
    pub fn blocks_down(&self) -> u32 {
        self.height.div_ceil(self.block_height)
    }

    /// Byte length of one block buffer.
    pub fn block_len(&self) -> usize {
        self.block_width as usize * self.block_height as usize
    }

    /// Whether the block coordinate lies inside the grid.
    pub fn contains_block(&self, coord: BlockCoord) -> bool {
        coord.x < self.blocks_across() && coord.y < self.blocks_down()
    }

    /// Nominal pixel window of a block: full block size, anchored at
    /// the block origin, possibly reaching past the raster edge.
    pub fn block_window(&self, coord: BlockCoord) -> PixelWindow {
        PixelWindow {
            x: coord.x * self.block_width,
            y: coord.y * self.block_height,
            width: self.block_width,
            height: self.block_height,
        }
    }

    /// Pixel window of a block clipped to the raster extent; smaller
    /// than the block size for partial blocks on the right and bottom
    /// edges.
    pub fn valid_block_window(&self, coord: BlockCoord) -> PixelWindow {
        let x = coord.x * self.block_width;
        let y = coord.y * self.block_height;
        PixelWindow {
            x,
            y,
            width: self.block_width.min(self.width.saturating_sub(x)),
            height: self.block_height.min(self.height.saturating_sub(y)),
        }
    }

    /// Block rectangle covering a pixel window, clipped to the grid.
    ///
    /// # Errors
    ///
    /// `CoordError::EmptyWindow` for zero-sized windows and
    /// `CoordError::BlockOutOfRange` when the window lies entirely
    /// outside the raster.
    pub fn block_range(&self, window: &PixelWindow) -> Result<BlockRect, CoordError> {
        let cover = coord::block_cover(window, self.block_width, self.block_height)?;
        cover
            .clamped(self.blocks_across() - 1, self.blocks_down() - 1)
            .ok_or(CoordError::BlockOutOfRange {
                coord: BlockCoord::new(cover.x0(), cover.y0()),
                max_x: self.blocks_across() - 1,
                max_y: self.blocks_down() - 1,
            })
    }
}

/// One reduced-resolution level of the dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverviewEntry {
    scale: f64,
    width: u32,
    height: u32,
}

impl OverviewEntry {
    /// Scale factor relative to full resolution, in (0, 1).
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Raster width at this level.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height at this level.
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Ordered set of overview levels.
///
/// Entries are kept sorted by strictly decreasing scale, so index 0 is
/// always the finest overview. Inserting in the middle renumbers the
/// coarser levels implicitly, since a level's index is its position.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewChain {
    full_width: u32,
    full_height: u32,
    entries: Vec<OverviewEntry>,
}

impl OverviewChain {
    /// Empty chain for a dataset of the given full-resolution size.
    pub fn new(full_width: u32, full_height: u32) -> Self {
        Self {
            full_width,
            full_height,
            entries: Vec::new(),
        }
    }

    /// Insert an overview level, returning its index.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` for scales outside (0, 1) or scales
    /// already present.
    pub fn add(&mut self, scale: f64) -> Result<usize, Error> {
        if !(scale > 0.0 && scale < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "overview scale {} outside (0, 1)",
                scale
            )));
        }
        if self.entries.iter().any(|e| e.scale == scale) {
            return Err(Error::InvalidArgument(format!(
                "overview scale {} already present",
                scale
            )));
        }

        let index = self.entries.partition_point(|e| e.scale > scale);
        let width = ((self.full_width as f64 * scale).round() as u32).max(1);
        let height = ((self.full_height as f64 * scale).round() as u32).max(1);
        self.entries.insert(
            index,
            OverviewEntry {
                scale,
                width,
                height,
            },
        );
        Ok(index)
    }

    /// Number of overview levels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no levels.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overview at the given index, 0 being the finest.
    pub fn get(&self, index: usize) -> Option<&OverviewEntry> {
        self.entries.get(index)
    }

    /// Iterate levels from finest to coarsest.
    pub fn iter(&self) -> impl Iterator<Item = &OverviewEntry> {
        self.entries.iter()
    }
}
