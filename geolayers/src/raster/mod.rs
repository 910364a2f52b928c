//! Client side colorization of single band rasters.
//!
//! A [`RasterDecoder`] turns a fetched payload into a [`RasterGrid`]; [`RasterRenderer`]
//! colors every pixel with a [`ColorRule`] and computes where the resulting image goes on the
//! map.

use geolayers_types::{Extent, Quad};
use maybe_sync::{MaybeSend, MaybeSync};

use crate::color_rule::ColorRule;
use crate::config::CoordinateAdjustment;
use crate::error::GeolayersError;
use crate::Color;

mod geotiff;
mod rgba;

pub use geotiff::GeoTiffDecoder;
pub use rgba::RasterImage;

/// Decodes raster payloads.
pub trait RasterDecoder: MaybeSend + MaybeSync {
    /// Decodes the first band of the payload.
    fn decode(&self, bytes: &[u8]) -> Result<RasterGrid, GeolayersError>;
}

/// Single band grid of pixel values, row 0 being the northernmost row.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    width: u32,
    height: u32,
    values: Vec<f64>,
    extent: Extent,
    nodata: Option<f64>,
}

impl RasterGrid {
    /// Creates a grid. Consistency of dimensions and values is checked on render.
    pub fn new(width: u32, height: u32, values: Vec<f64>, extent: Extent) -> Self {
        Self {
            width,
            height,
            values,
            extent,
            nodata: None,
        }
    }

    /// Sets the value marking pixels without data.
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// Grid width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Declared extent.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Nodata value.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nodata| nodata == value)
    }
}

/// Colored raster ready to be placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOverlay {
    /// Colored image.
    pub image: RasterImage,
    /// Extent the image covers, after corrections.
    pub extent: Extent,
    /// Image corners: top-left, top-right, bottom-right, bottom-left.
    pub corners: Quad,
}

/// Colors raster grids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterRenderer;

impl RasterRenderer {
    /// Creates a renderer.
    pub fn new() -> Self {
        Self
    }

    /// Colors every pixel of `grid` with `rule` and computes the image corners.
    ///
    /// Pixels equal to the nodata value (or NaN) are fully transparent.
    pub fn render(
        &self,
        grid: &RasterGrid,
        rule: &ColorRule,
        adjustment: Option<&CoordinateAdjustment>,
    ) -> Result<RasterOverlay, GeolayersError> {
        let pixel_count = grid.width as usize * grid.height as usize;
        if pixel_count == 0 || grid.values.is_empty() {
            return Err(GeolayersError::RasterDecode(format!(
                "raster grid is empty ({}x{})",
                grid.width, grid.height
            )));
        }

        if grid.values.len() != pixel_count {
            return Err(GeolayersError::RasterDecode(format!(
                "raster grid has {} values, expected {pixel_count}",
                grid.values.len()
            )));
        }

        let mut bytes = Vec::with_capacity(pixel_count * 4);
        for &value in &grid.values {
            let color = if grid.is_nodata(value) {
                Color::TRANSPARENT
            } else {
                rule.resolve_number(value)
            };
            bytes.extend_from_slice(&color.to_u8_array());
        }

        let image = RasterImage::new(bytes, grid.width, grid.height)?;
        let extent = georeference(grid.extent, grid.width, grid.height, adjustment);

        Ok(RasterOverlay {
            image,
            extent,
            corners: extent.corners(),
        })
    }
}

/// Corrects a declared raster extent: projected metres are converted to degrees, swapped axes
/// are restored, then the configured adjustment moves the extent by whole pixels.
pub fn georeference(
    extent: Extent,
    width: u32,
    height: u32,
    adjustment: Option<&CoordinateAdjustment>,
) -> Extent {
    let mut extent = extent;

    if extent.is_projected() {
        log::debug!("Raster extent {extent:?} looks projected, converting from Web Mercator");
        extent = extent.unproject_web_mercator();
    }

    if extent.is_transposed() {
        log::info!("Raster extent {extent:?} has swapped axes, transposing");
        extent = extent.transposed();
    }

    if let Some(adjustment) = adjustment {
        let pixel_size = extent.pixel_size(adjustment.axis, width, height);
        let offset = pixel_size * adjustment.multiplier * adjustment.direction.sign();
        extent = extent.shifted(adjustment.axis, offset);
    }

    extent
}
