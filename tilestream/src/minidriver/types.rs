//! Mini-driver types and traits

use std::fmt;

use crate::coord::{DataWindow, TileRef};

/// Errors that can occur during URL construction.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Tile grid level not representable by this service
    UnsupportedLevel(i32),
    /// Tile coordinate outside the service's grid at this level
    TileOutOfGrid { x: u32, y: u32, level: i32 },
    /// Pixel metadata queries not offered by this service
    InfoNotSupported(String),
    /// URL template is missing a required placeholder
    MissingPlaceholder(&'static str),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::UnsupportedLevel(level) => {
                write!(f, "Tile level {} not supported by service", level)
            }
            DriverError::TileOutOfGrid { x, y, level } => {
                write!(
                    f,
                    "Tile ({}, {}) outside service grid at level {}",
                    x, y, level
                )
            }
            DriverError::InfoNotSupported(name) => {
                write!(f, "{} service does not answer pixel metadata queries", name)
            }
            DriverError::MissingPlaceholder(name) => {
                write!(f, "URL template is missing the {} placeholder", name)
            }
        }
    }
}

impl std::error::Error for DriverError {}

/// One tile request handed to a mini-driver.
///
/// Carries everything a protocol needs to phrase the request: the CRS
/// extent the tile must cover, the pixel size of the image, and the
/// tile's address on the service grid. Protocols ignore the parts they
/// do not need (tiled services ignore the window, bounding-box services
/// ignore the tile address).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    /// CRS extent the tile must cover
    pub window: DataWindow,
    /// Pixel width of the requested image
    pub width: u32,
    /// Pixel height of the requested image
    pub height: u32,
    /// Tile grid address
    pub tile: TileRef,
}

/// Append `query` to a base URL with whichever of `?` or `&` the URL
/// still needs.
pub(crate) fn append_query(base: &str, query: &str) -> String {
    if base.ends_with('?') || base.ends_with('&') {
        format!("{}{}", base, query)
    } else if base.contains('?') {
        format!("{}&{}", base, query)
    } else {
        format!("{}?{}", base, query)
    }
}

/// Strategy translating a tile request into service URLs.
///
/// One implementation exists per remote-imagery protocol; the block
/// coordinator depends only on this interface and never inspects the
/// URLs it gets back.
pub trait MiniDriver: Send + Sync {
    /// Build the URL delivering the tile's image data.
    fn tile_url(&self, req: &TileRequest) -> Result<String, DriverError>;

    /// Build the URL answering a metadata query for one pixel.
    ///
    /// `pixel` is the pixel's offset within the tile image. Services
    /// without a metadata operation return
    /// `DriverError::InfoNotSupported`.
    fn pixel_info_url(&self, req: &TileRequest, pixel: (u32, u32)) -> Result<String, DriverError>;

    /// Short service name for logging.
    fn name(&self) -> &str;
}
