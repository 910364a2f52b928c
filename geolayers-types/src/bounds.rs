use serde::{Deserialize, Serialize};

use crate::LngLat;

/// Rectangular camera target given by its south-west and north-east corners.
///
/// Serialized as `[[west, south], [east, north]]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[LngLat; 2]", into = "[LngLat; 2]")]
pub struct Bounds {
    south_west: LngLat,
    north_east: LngLat,
}

impl Bounds {
    /// Creates bounds from two corners. Corners are normalized, so any two opposite corners can
    /// be given.
    pub fn new(a: LngLat, b: LngLat) -> Self {
        Self {
            south_west: LngLat::new(a.lng().min(b.lng()), a.lat().min(b.lat())),
            north_east: LngLat::new(a.lng().max(b.lng()), a.lat().max(b.lat())),
        }
    }

    /// South-west corner.
    pub fn south_west(&self) -> LngLat {
        self.south_west
    }

    /// North-east corner.
    pub fn north_east(&self) -> LngLat {
        self.north_east
    }

    /// Center point of the bounds.
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.south_west.lng() + self.north_east.lng()) / 2.0,
            (self.south_west.lat() + self.north_east.lat()) / 2.0,
        )
    }
}

impl From<[LngLat; 2]> for Bounds {
    fn from(value: [LngLat; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Bounds> for [LngLat; 2] {
    fn from(value: Bounds) -> Self {
        [value.south_west, value.north_east]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_corners() {
        let bounds: Bounds = serde_json::from_str("[[-78.0, 45.0], [-79.5, 44.0]]").unwrap();
        assert_eq!(bounds.south_west(), LngLat::new(-79.5, 44.0));
        assert_eq!(bounds.north_east(), LngLat::new(-78.0, 45.0));
        assert_eq!(bounds.center(), LngLat::new(-78.75, 44.5));
    }
}
