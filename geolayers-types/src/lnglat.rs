use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

/// Geographic point in degrees, longitude first.
///
/// Serialized as a two element array `[lng, lat]`, which is the order map engines and GeoJSON
/// use.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Creates a new point.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl AbsDiffEq for LngLat {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lng.abs_diff_eq(&other.lng, epsilon) && self.lat.abs_diff_eq(&other.lat, epsilon)
    }
}

impl RelativeEq for LngLat {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.lng.relative_eq(&other.lng, epsilon, max_relative)
            && self.lat.relative_eq(&other.lat, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_array() {
        let point = LngLat::new(-78.5, 44.25);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, "[-78.5,44.25]");

        let back: LngLat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }
}
