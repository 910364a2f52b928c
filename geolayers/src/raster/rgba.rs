use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::error::GeolayersError;

/// RGBA image produced by the raster renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Raw bytes of the image, in RGBA order, row 0 first.
    pub(crate) bytes: Vec<u8>,
    /// Width and height of the image.
    pub(crate) dimensions: (u32, u32),
}

impl RasterImage {
    /// Wraps an RGBA buffer. The buffer length must be `width * height * 4`.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Result<Self, GeolayersError> {
        if width == 0 || height == 0 || bytes.len() != width as usize * height as usize * 4 {
            return Err(GeolayersError::RasterDecode(format!(
                "RGBA buffer of {} bytes does not match {width}x{height}",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            dimensions: (width, height),
        })
    }

    /// RGBA bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// RGBA value of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        let offset = (y as usize * self.width() as usize + x as usize) * 4;
        self.bytes
            .get(offset..offset + 4)
            .and_then(|slice| slice.try_into().ok())
    }

    /// Encodes the image as PNG, the form map engines accept for image sources.
    pub fn encode_png(&self) -> Result<Vec<u8>, GeolayersError> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            &self.bytes,
            self.width(),
            self.height(),
            ColorType::Rgba8,
        )?;

        Ok(png)
    }
}
