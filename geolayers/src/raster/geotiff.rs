use std::io::Cursor;

use geolayers_types::Extent;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::error::GeolayersError;
use crate::raster::{RasterDecoder, RasterGrid};

/// Reads the first band of a GeoTIFF.
///
/// The extent is taken from the `ModelPixelScale` and `ModelTiepoint` tags, or from
/// `ModelTransformation` when those are absent. The GDAL nodata tag is honored.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffDecoder;

impl GeoTiffDecoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self
    }
}

impl RasterDecoder for GeoTiffDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RasterGrid, GeolayersError> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions()?;
        let pixel_count = width as usize * height as usize;
        if pixel_count == 0 {
            return Err(GeolayersError::RasterDecode(
                "GeoTIFF has zero dimensions".into(),
            ));
        }

        let extent = read_extent(&mut decoder, width, height)?;
        let nodata = read_nodata(&mut decoder)?;

        let samples = into_f64(decoder.read_image()?);
        if samples.len() < pixel_count || samples.len() % pixel_count != 0 {
            return Err(GeolayersError::RasterDecode(format!(
                "GeoTIFF has {} samples for {width}x{height} pixels",
                samples.len()
            )));
        }

        let samples_per_pixel = samples.len() / pixel_count;
        let values = if samples_per_pixel == 1 {
            samples
        } else {
            samples.into_iter().step_by(samples_per_pixel).collect()
        };

        Ok(RasterGrid::new(width, height, values, extent).with_nodata(nodata))
    }
}

fn read_extent<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> Result<Extent, GeolayersError> {
    let scale = find_f64(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64(decoder, Tag::ModelTiepointTag)?;

    let (x_min, y_max, pixel_width, pixel_height) = match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) if scale.len() >= 2 && tiepoint.len() >= 6 => {
            let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
            (x - i * scale[0], y + j * scale[1], scale[0], -scale[1])
        }
        _ => match find_f64(decoder, Tag::ModelTransformationTag)? {
            Some(matrix) if matrix.len() >= 8 => (matrix[3], matrix[7], matrix[0], matrix[5]),
            _ => {
                return Err(GeolayersError::RasterDecode(
                    "GeoTIFF has no georeferencing tags".into(),
                ))
            }
        },
    };

    let x_max = x_min + pixel_width * width as f64;
    let y_min = y_max + pixel_height * height as f64;

    Ok(Extent::new(
        x_min.min(x_max),
        x_min.max(x_max),
        y_min.min(y_max),
        y_min.max(y_max),
    ))
}

fn find_f64<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, GeolayersError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_nodata<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<f64>, GeolayersError> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };

    let text = value.into_string()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.parse::<f64>() {
        Ok(nodata) => Ok(Some(nodata)),
        Err(_) => {
            log::warn!("Ignoring unparsable GeoTIFF nodata value {text:?}");
            Ok(None)
        }
    }
}

fn into_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|v| v as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use tiff::encoder::{colortype, TiffEncoder};

    use super::*;

    fn encode(values: &[f32], width: u32, height: u32, nodata: Option<&str>) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
            let mut image = encoder
                .new_image::<colortype::Gray32Float>(width, height)
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.25, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, -80.0, 45.0, 0.0][..])
                .unwrap();
            if let Some(nodata) = nodata {
                image.encoder().write_tag(Tag::GdalNodata, nodata).unwrap();
            }
            image.write_data(values).unwrap();
        }

        buffer.into_inner()
    }

    #[test]
    fn reads_values_extent_and_nodata() {
        let bytes = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, -9999.0], 3, 2, Some("-9999"));
        let grid = GeoTiffDecoder::new().decode(&bytes).unwrap();

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, -9999.0]);
        assert_eq!(grid.nodata(), Some(-9999.0));
        assert_relative_eq!(grid.extent(), Extent::new(-80.0, -78.5, 44.5, 45.0));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert_matches!(
            GeoTiffDecoder::new().decode(b"definitely not a tiff"),
            Err(GeolayersError::RasterDecode(_))
        );
    }
}
