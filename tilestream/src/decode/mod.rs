//! Tile decoding.
//!
//! A fetched tile body is an encoded raster (PNG, JPEG, ...) holding
//! one or more sample channels. [`TileDecoder`] turns the bytes into a
//! [`DecodedTile`], from which the coordinator copies one channel per
//! dataset band. Decoders are trait objects so tests and alternative
//! formats can plug in without touching the read path.

mod image;

use thiserror::Error;

use crate::coord::PixelWindow;

pub use self::image::ImageTileDecoder;

/// Errors produced while opening or reading a decoded tile.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a readable image.
    #[error("unreadable image: {0}")]
    Image(#[from] ::image::ImageError),

    /// The decoded image does not have the pixel dimensions the
    /// request asked the service for.
    #[error("tile is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    WrongSize {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The decoded band count cannot be mapped onto the dataset's bands.
    #[error("tile has {actual} band(s), dataset expects {expected}")]
    BandCount { actual: usize, expected: usize },

    /// Requested band does not exist in the decoded tile.
    #[error("band {band} out of range for {band_count}-band tile")]
    BandOutOfRange { band: usize, band_count: usize },

    /// Requested region extends past the decoded tile.
    #[error(
        "region {x},{y} {width}x{height} out of tile bounds {tile_width}x{tile_height}"
    )]
    RegionOutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
    },

    /// Output buffer length does not match the region's pixel count.
    #[error("output buffer holds {got} bytes, region needs {needed}")]
    Buffer { needed: usize, got: usize },
}

/// Palette attached to a single-band tile.
///
/// Each entry is an RGBA quadruple; channel 0 is red, 3 is alpha.
/// Indexes past the end of the table read as fully transparent black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<[u8; 4]>,
}

impl ColorTable {
    /// Build a table from RGBA entries.
    pub fn new(entries: Vec<[u8; 4]>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full RGBA entry for a palette index.
    pub fn entry(&self, index: u8) -> [u8; 4] {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or([0, 0, 0, 0])
    }

    /// One channel of a palette entry. `channel` is 0-based RGBA.
    pub fn channel(&self, index: u8, channel: usize) -> u8 {
        debug_assert!(channel < 4);
        self.entry(index)[channel]
    }
}

/// A tile decoded into addressable sample channels.
pub trait DecodedTile {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Number of sample channels.
    fn band_count(&self) -> usize;

    /// Palette, for single-band paletted tiles.
    fn color_table(&self) -> Option<&ColorTable>;

    /// Copy one channel of a pixel region into `out`, row-major, one
    /// byte per pixel. `band` is 1-based; `out` must hold exactly
    /// `region.width * region.height` bytes.
    fn read_band_region(
        &self,
        band: usize,
        region: &PixelWindow,
        out: &mut [u8],
    ) -> Result<(), DecodeError>;
}

/// Decodes raw tile bytes into a [`DecodedTile`].
pub trait TileDecoder: Send + Sync {
    /// Decode an encoded tile body.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DecodedTile>, DecodeError>;

    /// Decoder name for diagnostics.
    fn name(&self) -> &str;
}
