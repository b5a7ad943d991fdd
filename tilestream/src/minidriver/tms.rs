//! TMS / XYZ template URL construction.
//!
//! Covers every service addressed by substituting tile coordinates
//! into a URL template, e.g.
//! `http://tile.example.com/${z}/${x}/${y}.png`. The `${y}` axis can
//! be flipped for services that count rows from the bottom edge, the
//! way classic Tile Map Service servers do.

use crate::minidriver::{DriverError, MiniDriver, TileRequest};

const PLACEHOLDER_X: &str = "${x}";
const PLACEHOLDER_Y: &str = "${y}";
const PLACEHOLDER_Z: &str = "${z}";

/// Mini-driver for tiled services addressed by a URL template.
///
/// # Example
///
/// ```
/// use tilestream::minidriver::TmsDriver;
///
/// let driver = TmsDriver::new("http://tile.example.com/${z}/${x}/${y}.png").unwrap();
/// ```
pub struct TmsDriver {
    template: String,
    invert_y: bool,
}

impl TmsDriver {
    /// Create a TMS driver from a URL template.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::MissingPlaceholder` unless the template
    /// contains all of `${x}`, `${y}` and `${z}`.
    pub fn new(template: impl Into<String>) -> Result<Self, DriverError> {
        let template = template.into();
        for placeholder in [PLACEHOLDER_X, PLACEHOLDER_Y, PLACEHOLDER_Z] {
            if !template.contains(placeholder) {
                return Err(DriverError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self {
            template,
            invert_y: false,
        })
    }

    /// Count tile rows from the bottom edge instead of the top.
    pub fn with_inverted_y(mut self, invert: bool) -> Self {
        self.invert_y = invert;
        self
    }

    /// Row index as the service understands it.
    fn service_row(&self, x: u32, y: u32, level: i32) -> Result<u32, DriverError> {
        if !self.invert_y {
            return Ok(y);
        }
        if !(0..32).contains(&level) {
            return Err(DriverError::UnsupportedLevel(level));
        }
        let rows = 1u32 << level;
        if y >= rows {
            return Err(DriverError::TileOutOfGrid { x, y, level });
        }
        Ok(rows - 1 - y)
    }
}

impl MiniDriver for TmsDriver {
    fn tile_url(&self, req: &TileRequest) -> Result<String, DriverError> {
        let tile = req.tile;
        if tile.level < 0 {
            return Err(DriverError::UnsupportedLevel(tile.level));
        }
        let row = self.service_row(tile.x, tile.y, tile.level)?;
        Ok(self
            .template
            .replace(PLACEHOLDER_X, &tile.x.to_string())
            .replace(PLACEHOLDER_Y, &row.to_string())
            .replace(PLACEHOLDER_Z, &tile.level.to_string()))
    }

    fn pixel_info_url(&self, _req: &TileRequest, _pixel: (u32, u32)) -> Result<String, DriverError> {
        Err(DriverError::InfoNotSupported(self.name().to_string()))
    }

    fn name(&self) -> &str {
        "TMS"
    }
}
