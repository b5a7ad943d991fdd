//! WorldWind TileService URL construction.
//!
//! The TileService protocol addresses tiles as `T` (tileset name),
//! `L` (level), `X` (column) and `Y` (row counted from the bottom
//! edge of the grid). The grid's row count at level 0 depends on the
//! tileset; each level doubles it.

use crate::minidriver::types::append_query;
use crate::minidriver::{DriverError, MiniDriver, TileRequest};

/// Mini-driver for WorldWind TileService endpoints.
pub struct WorldWindDriver {
    base_url: String,
    tileset: String,
    level_zero_rows: u32,
}

impl WorldWindDriver {
    /// Create a driver for the given endpoint and tileset.
    ///
    /// Defaults to 5 rows at level 0, the grid of the original 36
    /// degree WorldWind tilesets.
    pub fn new(base_url: impl Into<String>, tileset: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tileset: tileset.into(),
            level_zero_rows: 5,
        }
    }

    /// Set the number of tile rows at level 0.
    pub fn with_level_zero_rows(mut self, rows: u32) -> Self {
        self.level_zero_rows = rows;
        self
    }

    fn rows_at(&self, level: i32) -> Result<u32, DriverError> {
        if !(0..32).contains(&level) {
            return Err(DriverError::UnsupportedLevel(level));
        }
        self.level_zero_rows
            .checked_shl(level as u32)
            .filter(|rows| *rows > 0)
            .ok_or(DriverError::UnsupportedLevel(level))
    }
}

impl MiniDriver for WorldWindDriver {
    fn tile_url(&self, req: &TileRequest) -> Result<String, DriverError> {
        let tile = req.tile;
        let rows = self.rows_at(tile.level)?;
        if tile.y >= rows {
            return Err(DriverError::TileOutOfGrid {
                x: tile.x,
                y: tile.y,
                level: tile.level,
            });
        }
        let query = format!(
            "T={}&L={}&X={}&Y={}",
            self.tileset,
            tile.level,
            tile.x,
            rows - 1 - tile.y,
        );
        Ok(append_query(&self.base_url, &query))
    }

    fn pixel_info_url(&self, _req: &TileRequest, _pixel: (u32, u32)) -> Result<String, DriverError> {
        Err(DriverError::InfoNotSupported(self.name().to_string()))
    }

    fn name(&self) -> &str {
        "WorldWind"
    }
}
