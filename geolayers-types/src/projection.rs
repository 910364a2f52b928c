//! Minimal projection helpers. Only the inverse spherical Web-Mercator transform is needed: it
//! backs the heuristic that recognizes raster extents stored in metres.

use crate::LngLat;

/// Radius of the sphere used by EPSG:3857.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Converts EPSG:3857 metres to longitude/latitude degrees.
pub fn web_mercator_to_lnglat(x: f64, y: f64) -> LngLat {
    let lng = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    LngLat::new(lng, lat)
}

/// Converts longitude/latitude degrees to EPSG:3857 metres.
pub fn lnglat_to_web_mercator(point: LngLat) -> (f64, f64) {
    let x = point.lng().to_radians() * EARTH_RADIUS;
    let y = (std::f64::consts::FRAC_PI_4 + point.lat().to_radians() / 2.0)
        .tan()
        .ln()
        * EARTH_RADIUS;
    (x, y)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn inverse_of_forward() {
        let point = LngLat::new(-78.3, 44.6);
        let (x, y) = lnglat_to_web_mercator(point);
        assert_relative_eq!(web_mercator_to_lnglat(x, y), point, epsilon = 1e-9);
    }

    #[test]
    fn origin_maps_to_origin() {
        assert_relative_eq!(web_mercator_to_lnglat(0.0, 0.0), LngLat::new(0.0, 0.0));
    }
}
