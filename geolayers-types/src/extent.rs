use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use crate::projection::web_mercator_to_lnglat;
use crate::{LngLat, Quad};

/// Coordinate axis of an [`Extent`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal axis (longitude).
    #[serde(alias = "lng", alias = "lon", alias = "longitude")]
    X,
    /// Vertical axis (latitude).
    #[serde(alias = "lat", alias = "latitude")]
    Y,
}

/// Axis aligned extent of a raster grid.
///
/// For geographic data `x` is longitude and `y` is latitude, but an extent makes no promises
/// about that: data with swapped axes or projected coordinates can be stored here too, see
/// [`Extent::is_transposed`] and [`Extent::is_projected`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum x coordinate.
    pub x_min: f64,
    /// Maximum x coordinate.
    pub x_max: f64,
    /// Minimum y coordinate.
    pub y_min: f64,
    /// Maximum y coordinate.
    pub y_max: f64,
}

impl Extent {
    /// Creates a new extent.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Width of the extent.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the extent.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Size of a single pixel along `axis` when the extent is covered by a grid of the given
    /// dimensions.
    pub fn pixel_size(&self, axis: Axis, width: u32, height: u32) -> f64 {
        match axis {
            Axis::X => self.width() / width as f64,
            Axis::Y => self.height() / height as f64,
        }
    }

    /// Returns true if the extent looks like it was stored latitude first.
    ///
    /// Both x values must be valid latitudes (`|x| < 90`). The y values must then either be
    /// impossible as latitudes (`|y| > 90`), or all be larger in magnitude than every x value.
    pub fn is_transposed(&self) -> bool {
        let x_max_abs = self.x_min.abs().max(self.x_max.abs());
        let y_min_abs = self.y_min.abs().min(self.y_max.abs());

        if x_max_abs >= 90.0 {
            return false;
        }

        y_min_abs > 90.0 || y_min_abs > x_max_abs
    }

    /// Returns the extent with x and y swapped.
    pub fn transposed(&self) -> Self {
        Self {
            x_min: self.y_min,
            x_max: self.y_max,
            y_min: self.x_min,
            y_max: self.x_max,
        }
    }

    /// Returns true if any coordinate is outside of the range degrees can take, meaning the
    /// extent is most likely in projected metres.
    pub fn is_projected(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .any(|v| v.abs() > 360.0)
    }

    /// Interprets the extent as EPSG:3857 metres and converts it to degrees.
    pub fn unproject_web_mercator(&self) -> Self {
        let min = web_mercator_to_lnglat(self.x_min, self.y_min);
        let max = web_mercator_to_lnglat(self.x_max, self.y_max);
        Self::new(min.lng(), max.lng(), min.lat(), max.lat())
    }

    /// Moves the extent along `axis` by `offset`.
    pub fn shifted(&self, axis: Axis, offset: f64) -> Self {
        match axis {
            Axis::X => Self {
                x_min: self.x_min + offset,
                x_max: self.x_max + offset,
                ..*self
            },
            Axis::Y => Self {
                y_min: self.y_min + offset,
                y_max: self.y_max + offset,
                ..*self
            },
        }
    }

    /// Corners of the extent in the order top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> Quad {
        [
            LngLat::new(self.x_min, self.y_max),
            LngLat::new(self.x_max, self.y_max),
            LngLat::new(self.x_max, self.y_min),
            LngLat::new(self.x_min, self.y_min),
        ]
    }
}

impl AbsDiffEq for Extent {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x_min.abs_diff_eq(&other.x_min, epsilon)
            && self.x_max.abs_diff_eq(&other.x_max, epsilon)
            && self.y_min.abs_diff_eq(&other.y_min, epsilon)
            && self.y_max.abs_diff_eq(&other.y_max, epsilon)
    }
}

impl RelativeEq for Extent {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.x_min.relative_eq(&other.x_min, epsilon, max_relative)
            && self.x_max.relative_eq(&other.x_max, epsilon, max_relative)
            && self.y_min.relative_eq(&other.y_min, epsilon, max_relative)
            && self.y_max.relative_eq(&other.y_max, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn detects_transposed_extent() {
        let extent = Extent::new(44.0, 45.0, -80.0, -78.0);
        assert!(extent.is_transposed());
        assert_eq!(extent.transposed(), Extent::new(-80.0, -78.0, 44.0, 45.0));

        let extent = Extent::new(-80.0, -78.0, 44.0, 45.0);
        assert!(!extent.is_transposed());

        let extent = Extent::new(10.0, 20.0, 120.0, 130.0);
        assert!(extent.is_transposed());

        let extent = Extent::new(120.0, 130.0, 10.0, 20.0);
        assert!(!extent.is_transposed());
    }

    #[test]
    fn pixel_size_and_shift() {
        let extent = Extent::new(-80.0, -78.0, 44.0, 45.0);
        assert_relative_eq!(extent.pixel_size(Axis::X, 200, 100), 0.01);
        assert_relative_eq!(extent.pixel_size(Axis::Y, 200, 100), 0.01);

        let shifted = extent.shifted(Axis::Y, -0.5);
        assert_relative_eq!(shifted, Extent::new(-80.0, -78.0, 43.5, 44.5));
    }

    #[test]
    fn corners_order() {
        let corners = Extent::new(-80.0, -78.0, 44.0, 45.0).corners();
        assert_eq!(
            corners,
            [
                LngLat::new(-80.0, 45.0),
                LngLat::new(-78.0, 45.0),
                LngLat::new(-78.0, 44.0),
                LngLat::new(-80.0, 44.0),
            ]
        );
    }

    #[test]
    fn projected_extent_is_converted_to_degrees() {
        let extent = Extent::new(-8_905_559.3, -8_683_000.0, 5_465_442.2, 5_621_521.5);
        assert!(extent.is_projected());

        let degrees = extent.unproject_web_mercator();
        assert!(!degrees.is_projected());
        assert_relative_eq!(degrees.x_min, -80.0, epsilon = 1e-3);
        assert_relative_eq!(degrees.y_min, 44.0, epsilon = 1e-3);
    }
}
