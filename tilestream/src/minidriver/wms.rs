//! WMS GetMap URL construction.
//!
//! Speaks the OGC Web Map Service protocol: every tile becomes one
//! `GetMap` request whose bounding box is the tile's CRS window, and
//! pixel metadata queries become `GetFeatureInfo` requests when an
//! info format is configured.
//!
//! Version differences handled here:
//! - 1.3.x names the reference system parameter `CRS`, earlier
//!   versions name it `SRS`
//! - 1.3.x orders `EPSG:4326` bounding boxes latitude-first
//! - 1.3.x `GetFeatureInfo` addresses the query pixel as `I`/`J`,
//!   earlier versions as `X`/`Y`

use crate::minidriver::types::append_query;
use crate::minidriver::{DriverError, MiniDriver, TileRequest};

/// Mini-driver for WMS services.
///
/// # Example
///
/// ```
/// use tilestream::minidriver::WmsDriver;
///
/// let driver = WmsDriver::new("http://maps.example.com/wms", "landcover")
///     .with_version("1.3.0")
///     .with_image_format("image/png");
/// ```
pub struct WmsDriver {
    base_url: String,
    version: String,
    layers: String,
    styles: String,
    srs: String,
    image_format: String,
    transparent: bool,
    info_format: Option<String>,
}

impl WmsDriver {
    /// Create a WMS driver for the given endpoint and layer list.
    ///
    /// Defaults: version 1.1.1, empty styles, `EPSG:4326`,
    /// `image/jpeg`, opaque, no metadata queries.
    pub fn new(base_url: impl Into<String>, layers: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            version: "1.1.1".to_string(),
            layers: layers.into(),
            styles: String::new(),
            srs: "EPSG:4326".to_string(),
            image_format: "image/jpeg".to_string(),
            transparent: false,
            info_format: None,
        }
    }

    /// Set the protocol version (e.g. "1.1.1", "1.3.0").
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the STYLES parameter.
    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = styles.into();
        self
    }

    /// Set the reference system identifier.
    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    /// Set the requested image format.
    pub fn with_image_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = format.into();
        self
    }

    /// Request transparent tiles.
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Enable `GetFeatureInfo` queries with the given response format.
    pub fn with_info_format(mut self, format: impl Into<String>) -> Self {
        self.info_format = Some(format.into());
        self
    }

    fn is_v13(&self) -> bool {
        self.version.starts_with("1.3")
    }

    /// BBOX text for one request window.
    ///
    /// Emitted min-x,min-y,max-x,max-y; the window's y0 is the top
    /// edge, so it supplies max-y. WMS 1.3.0 made `EPSG:4326`
    /// latitude-first, which swaps the axis pairs on the wire.
    fn bbox(&self, req: &TileRequest) -> String {
        let w = &req.window;
        if self.is_v13() && self.srs.eq_ignore_ascii_case("EPSG:4326") {
            format!("{},{},{},{}", w.y1, w.x0, w.y0, w.x1)
        } else {
            format!("{},{},{},{}", w.x0, w.y1, w.x1, w.y0)
        }
    }

    /// Parameter block shared by GetMap and GetFeatureInfo.
    fn map_params(&self, req: &TileRequest) -> String {
        let srs_key = if self.is_v13() { "CRS" } else { "SRS" };
        let mut params = format!(
            "VERSION={}&LAYERS={}&STYLES={}&{}={}&BBOX={}&WIDTH={}&HEIGHT={}&FORMAT={}",
            self.version,
            self.layers,
            self.styles,
            srs_key,
            self.srs,
            self.bbox(req),
            req.width,
            req.height,
            self.image_format,
        );
        if self.transparent {
            params.push_str("&TRANSPARENT=TRUE");
        }
        params
    }
}

impl MiniDriver for WmsDriver {
    fn tile_url(&self, req: &TileRequest) -> Result<String, DriverError> {
        let query = format!("SERVICE=WMS&REQUEST=GetMap&{}", self.map_params(req));
        Ok(append_query(&self.base_url, &query))
    }

    fn pixel_info_url(&self, req: &TileRequest, pixel: (u32, u32)) -> Result<String, DriverError> {
        let info_format = self
            .info_format
            .as_deref()
            .ok_or_else(|| DriverError::InfoNotSupported(self.name().to_string()))?;
        let (ikey, jkey) = if self.is_v13() { ("I", "J") } else { ("X", "Y") };
        let query = format!(
            "SERVICE=WMS&REQUEST=GetFeatureInfo&{}&QUERY_LAYERS={}&INFO_FORMAT={}&{}={}&{}={}",
            self.map_params(req),
            self.layers,
            info_format,
            ikey,
            pixel.0,
            jkey,
            pixel.1,
        );
        Ok(append_query(&self.base_url, &query))
    }

    fn name(&self) -> &str {
        "WMS"
    }
}
