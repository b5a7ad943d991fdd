//! Block grid and window type definitions

use std::fmt;

/// Coordinates of one block within a band's block grid.
///
/// Blocks tile the band in row-major fashion: (0, 0) is the top-left
/// block, `x` grows eastward and `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockCoord {
    /// Column index, 0 at the left edge
    pub x: u32,
    /// Row index, 0 at the top edge
    pub y: u32,
}

impl BlockCoord {
    /// Create a new block coordinate.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for BlockCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of block coordinates.
///
/// Both corners are part of the rectangle, so a single block is
/// represented as `x0 == x1 && y0 == y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl BlockRect {
    /// Create a rectangle from inclusive corners.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::InvalidRect` if either corner is inverted.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Result<Self, CoordError> {
        if x1 < x0 || y1 < y0 {
            return Err(CoordError::InvalidRect { x0, y0, x1, y1 });
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// Rectangle covering exactly one block.
    pub fn single(coord: BlockCoord) -> Self {
        Self {
            x0: coord.x,
            y0: coord.y,
            x1: coord.x,
            y1: coord.y,
        }
    }

    /// Left column of the rectangle.
    pub fn x0(&self) -> u32 {
        self.x0
    }

    /// Top row of the rectangle.
    pub fn y0(&self) -> u32 {
        self.y0
    }

    /// Right column of the rectangle (inclusive).
    pub fn x1(&self) -> u32 {
        self.x1
    }

    /// Bottom row of the rectangle (inclusive).
    pub fn y1(&self) -> u32 {
        self.y1
    }

    /// Number of block columns covered.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    /// Number of block rows covered.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }

    /// Total number of blocks covered.
    pub fn len(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Always false: a rectangle covers at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the rectangle contains the given block.
    pub fn contains(&self, coord: BlockCoord) -> bool {
        coord.x >= self.x0 && coord.x <= self.x1 && coord.y >= self.y0 && coord.y <= self.y1
    }

    /// Intersect with the block grid `[0, max_x] x [0, max_y]` (inclusive).
    ///
    /// Returns `None` when the rectangle lies entirely outside the grid.
    pub fn clamped(&self, max_x: u32, max_y: u32) -> Option<Self> {
        if self.x0 > max_x || self.y0 > max_y {
            return None;
        }
        Some(Self {
            x0: self.x0,
            y0: self.y0,
            x1: self.x1.min(max_x),
            y1: self.y1.min(max_y),
        })
    }

    /// Returns an iterator over all blocks in the rectangle.
    ///
    /// Blocks are yielded in row-major order (top row left to right,
    /// then the next row, and so on).
    #[inline]
    pub fn coords(&self) -> BlockRectIter {
        BlockRectIter {
            rect: *self,
            current: 0,
        }
    }
}

impl fmt::Display for BlockRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {})..({}, {})]",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

/// Iterator over all blocks in a rectangle.
///
/// Yields `width * height` coordinates in row-major order.
#[derive(Debug, Clone)]
pub struct BlockRectIter {
    rect: BlockRect,
    current: u64,
}

impl Iterator for BlockRectIter {
    type Item = BlockCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.rect.len() as u64;
        if self.current >= total {
            return None;
        }

        let w = self.rect.width() as u64;
        let dy = (self.current / w) as u32;
        let dx = (self.current % w) as u32;

        self.current += 1;

        Some(BlockCoord {
            x: self.rect.x0 + dx,
            y: self.rect.y0 + dy,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.rect.len() as u64 - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BlockRectIter {
    fn len(&self) -> usize {
        (self.rect.len() as u64 - self.current) as usize
    }
}

/// Rectangle of pixels within one band, in that band's own resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    /// Left pixel column
    pub x: u32,
    /// Top pixel row
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelWindow {
    /// Create a new pixel window.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// One past the bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Whether the window covers zero pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the window contains the given pixel.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        (px as u64) >= self.x as u64
            && (px as u64) < self.right()
            && (py as u64) >= self.y as u64
            && (py as u64) < self.bottom()
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Georeferenced extent in the dataset's CRS.
///
/// `(x0, y0)` is the corner mapped to pixel (0, 0) and `(x1, y1)` the
/// corner past the last pixel, so for a north-up dataset `y0 > y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataWindow {
    /// CRS coordinate of the left edge
    pub x0: f64,
    /// CRS coordinate of the top edge
    pub y0: f64,
    /// CRS coordinate of the right edge
    pub x1: f64,
    /// CRS coordinate of the bottom edge
    pub y1: f64,
}

impl DataWindow {
    /// Create a new data window.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Signed width along the x axis.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Signed height along the y axis (negative for north-up data).
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Address of one tile on the remote service's tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRef {
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
    /// Tile grid level
    pub level: i32,
}

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Resolution level of a band.
///
/// `Full` is the native resolution; `Overview(i)` is the reduced
/// resolution at overview index `i`, where index 0 is the finest
/// overview. Each step down the overview ladder halves the tile grid,
/// which is what [`Level::shift`] captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Native resolution
    Full,
    /// Overview at the given index (0 = finest)
    Overview(usize),
}

impl Level {
    /// Number of bits the full-resolution tile grid is shifted right
    /// at this level.
    pub fn shift(&self) -> u32 {
        match self {
            Level::Full => 0,
            Level::Overview(i) => *i as u32 + 1,
        }
    }

    /// Overview index, or `None` at full resolution.
    pub fn overview_index(&self) -> Option<usize> {
        match self {
            Level::Full => None,
            Level::Overview(i) => Some(*i),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Full => write!(f, "full"),
            Level::Overview(i) => write!(f, "overview {}", i),
        }
    }
}

/// Errors that can occur during block grid arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Rectangle corners are inverted
    InvalidRect { x0: u32, y0: u32, x1: u32, y1: u32 },
    /// Block dimension is zero
    InvalidBlockSize(u32),
    /// Block coordinate outside the band's grid
    BlockOutOfRange {
        coord: BlockCoord,
        max_x: u32,
        max_y: u32,
    },
    /// Pixel window covers zero pixels
    EmptyWindow,
    /// Overview shift pushes the tile level below zero
    TileLevelUnderflow { base_level: i32, shift: u32 },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidRect { x0, y0, x1, y1 } => {
                write!(
                    f,
                    "Invalid block rectangle: ({}, {})..({}, {})",
                    x0, y0, x1, y1
                )
            }
            CoordError::InvalidBlockSize(size) => {
                write!(f, "Invalid block size: {} (must be positive)", size)
            }
            CoordError::BlockOutOfRange { coord, max_x, max_y } => {
                write!(
                    f,
                    "Block {} outside grid (max ({}, {}))",
                    coord, max_x, max_y
                )
            }
            CoordError::EmptyWindow => {
                write!(f, "Pixel window covers zero pixels")
            }
            CoordError::TileLevelUnderflow { base_level, shift } => {
                write!(
                    f,
                    "Tile level underflow: base level {} shifted by {}",
                    base_level, shift
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
