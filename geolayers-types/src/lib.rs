//! Geographic primitives shared by the `geolayers` crates: points in longitude/latitude order,
//! raster extents, camera bounds and the image corner quadrilateral.

mod bounds;
mod extent;
mod lnglat;
pub mod projection;

pub use bounds::Bounds;
pub use extent::{Axis, Extent};
pub use lnglat::LngLat;

/// Four corners of a georeferenced image in the order top-left, top-right, bottom-right,
/// bottom-left.
pub type Quad = [LngLat; 4];
