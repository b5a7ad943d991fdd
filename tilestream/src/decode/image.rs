//! Tile decoder backed by the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageReader, RgbImage, RgbaImage};

use crate::coord::PixelWindow;
use crate::decode::{ColorTable, DecodeError, DecodedTile, TileDecoder};

/// Decodes PNG, JPEG and the other formats the `image` crate can
/// sniff. The format is guessed from the bytes, not from the URL, so
/// a service that ignores the requested format still decodes.
///
/// 8-bit gray, gray+alpha, RGB and RGBA images keep their channel
/// layout. Anything else (16-bit, floating point) is converted to
/// 8-bit RGBA before band extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTileDecoder;

impl ImageTileDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }
}

impl TileDecoder for ImageTileDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DecodedTile>, DecodeError> {
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;
        Ok(Box::new(ImageTile::from(img)))
    }

    fn name(&self) -> &str {
        "image"
    }
}

enum Samples {
    Luma(GrayImage),
    LumaA(GrayAlphaImage),
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl Samples {
    fn channels(&self) -> usize {
        match self {
            Samples::Luma(_) => 1,
            Samples::LumaA(_) => 2,
            Samples::Rgb(_) => 3,
            Samples::Rgba(_) => 4,
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        match self {
            Samples::Luma(img) => img.dimensions(),
            Samples::LumaA(img) => img.dimensions(),
            Samples::Rgb(img) => img.dimensions(),
            Samples::Rgba(img) => img.dimensions(),
        }
    }

    fn raw(&self) -> &[u8] {
        match self {
            Samples::Luma(img) => img.as_raw(),
            Samples::LumaA(img) => img.as_raw(),
            Samples::Rgb(img) => img.as_raw(),
            Samples::Rgba(img) => img.as_raw(),
        }
    }
}

/// A decoded raster with interleaved 8-bit samples.
pub struct ImageTile {
    samples: Samples,
}

impl From<DynamicImage> for ImageTile {
    fn from(img: DynamicImage) -> Self {
        let samples = match img {
            DynamicImage::ImageLuma8(img) => Samples::Luma(img),
            DynamicImage::ImageLumaA8(img) => Samples::LumaA(img),
            DynamicImage::ImageRgb8(img) => Samples::Rgb(img),
            DynamicImage::ImageRgba8(img) => Samples::Rgba(img),
            other => Samples::Rgba(other.to_rgba8()),
        };
        Self { samples }
    }
}

impl DecodedTile for ImageTile {
    fn width(&self) -> u32 {
        self.samples.dimensions().0
    }

    fn height(&self) -> u32 {
        self.samples.dimensions().1
    }

    fn band_count(&self) -> usize {
        self.samples.channels()
    }

    fn color_table(&self) -> Option<&ColorTable> {
        // The image crate expands palettes during decoding, so a
        // paletted PNG arrives here as RGB or RGBA.
        None
    }

    fn read_band_region(
        &self,
        band: usize,
        region: &PixelWindow,
        out: &mut [u8],
    ) -> Result<(), DecodeError> {
        let (tile_width, tile_height) = self.samples.dimensions();
        let channels = self.samples.channels();

        if band == 0 || band > channels {
            return Err(DecodeError::BandOutOfRange {
                band,
                band_count: channels,
            });
        }
        if region.right() > tile_width as u64 || region.bottom() > tile_height as u64 {
            return Err(DecodeError::RegionOutOfRange {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                tile_width,
                tile_height,
            });
        }
        let needed = region.width as usize * region.height as usize;
        if out.len() != needed {
            return Err(DecodeError::Buffer {
                needed,
                got: out.len(),
            });
        }

        let raw = self.samples.raw();
        let stride = tile_width as usize * channels;
        let mut dst = 0;
        for row in 0..region.height as usize {
            let mut src =
                (region.y as usize + row) * stride + region.x as usize * channels + (band - 1);
            for _ in 0..region.width as usize {
                out[dst] = raw[src];
                dst += 1;
                src += channels;
            }
        }

        Ok(())
    }
}
