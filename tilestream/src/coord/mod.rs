//! Block grid arithmetic
//!
//! Provides the mapping between pixel coordinates and the block grid
//! that organizes each band, plus the rectangle types used to describe
//! multi-block operations.

mod types;

pub use types::{
    BlockCoord, BlockRect, BlockRectIter, CoordError, DataWindow, Level, PixelWindow, TileRef,
};

/// Returns the block containing the given pixel.
///
/// # Arguments
///
/// * `px` - Pixel column
/// * `py` - Pixel row
/// * `block_width` - Block width in pixels
/// * `block_height` - Block height in pixels
///
/// # Errors
///
/// Returns `CoordError::InvalidBlockSize` if either block dimension is zero.
#[inline]
pub fn block_for_pixel(
    px: u32,
    py: u32,
    block_width: u32,
    block_height: u32,
) -> Result<BlockCoord, CoordError> {
    if block_width == 0 {
        return Err(CoordError::InvalidBlockSize(block_width));
    }
    if block_height == 0 {
        return Err(CoordError::InvalidBlockSize(block_height));
    }
    Ok(BlockCoord {
        x: px / block_width,
        y: py / block_height,
    })
}

/// Number of blocks needed to cover `extent` pixels.
///
/// The last block may be partial when `extent` is not a multiple of
/// `block`.
#[inline]
pub fn blocks_spanning(extent: u32, block: u32) -> Result<u32, CoordError> {
    if block == 0 {
        return Err(CoordError::InvalidBlockSize(block));
    }
    Ok(((extent as u64 + block as u64 - 1) / block as u64) as u32)
}

/// Block-aligned bounding rectangle of a pixel window.
///
/// The result is the smallest inclusive block rectangle whose pixel
/// footprint contains every pixel of `window`.
///
/// # Errors
///
/// Returns `CoordError::EmptyWindow` for a zero-area window and
/// `CoordError::InvalidBlockSize` for a zero block dimension.
pub fn block_cover(
    window: &PixelWindow,
    block_width: u32,
    block_height: u32,
) -> Result<BlockRect, CoordError> {
    if window.is_empty() {
        return Err(CoordError::EmptyWindow);
    }
    let first = block_for_pixel(window.x, window.y, block_width, block_height)?;
    // Inclusive far corner comes from the window's last pixel.
    let last_x = ((window.right() - 1) / block_width as u64) as u32;
    let last_y = ((window.bottom() - 1) / block_height as u64) as u32;
    BlockRect::new(first.x, first.y, last_x, last_y)
}
