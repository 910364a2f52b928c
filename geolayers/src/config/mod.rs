//! Declarative layer configuration.
//!
//! The configuration document is a mapping with two lists, `categories` and `layers`. It is
//! usually written in YAML and served as JSON, so everything here deserializes from a
//! [`serde_json::Value`]. Layers are kept as raw values in [`LayersConfig`] and decoded one by
//! one by the [`LayerRegistry`](crate::LayerRegistry), so a single broken declaration does not
//! take the rest of the map down with it.

use geolayers_types::{Axis, Bounds};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GeolayersError};
use crate::fetch::DataFetcher;

mod legend;
mod popup;
mod style;

pub use legend::{LegendConfig, LegendItem};
pub use popup::{FieldRef, NumberFormat, PopupConfig, PopupFieldSpec, RenderKind};
pub use style::{
    CircleBlock, CircleStyle, FillBlock, FillStyle, LayerStyle, LineBlock, LineStyle,
    OutlineBlock, OutlineStyle, RasterBlock, RasterStyle, StyleBlock, TiledRasterStyle,
};

/// Raw configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayersConfig {
    /// Layer groups shown in the layer panel.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Layer declarations, decoded individually by the registry.
    #[serde(default)]
    pub layers: Vec<serde_json::Value>,
}

impl LayersConfig {
    /// Reads the configuration from an already parsed document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads the configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads the configuration document from `locator` (for example the `/api/layer-config`
    /// endpoint of the data server).
    pub async fn fetch(fetcher: &dyn DataFetcher, locator: &str) -> Result<Self, GeolayersError> {
        let value = fetcher.fetch_json(locator).await?;
        Ok(Self::from_value(value)?)
    }
}

/// Group of layers in the layer panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique key referenced by [`LayerConfig::category`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// Sort order, ascending. Ties keep declaration order.
    #[serde(default)]
    pub order: i64,
}

/// Geometry kind of a layer. It decides how the data is fetched and which engine layers are
/// created for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// GeoJSON points drawn as circles.
    Point,
    /// GeoJSON polygons drawn as a fill plus an outline.
    Polygon,
    /// GeoJSON lines.
    #[serde(alias = "linestring")]
    Line,
    /// Single band GeoTIFF colorized on the client.
    #[serde(alias = "geotiff")]
    Raster,
    /// Raster tiles rendered by an external service.
    #[serde(alias = "tiled_raster", alias = "image_service")]
    ExternallyTiledRaster,
}

impl GeometryKind {
    /// Returns true for kinds whose data is GeoJSON.
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            GeometryKind::Point | GeometryKind::Polygon | GeometryKind::Line
        )
    }
}

/// Camera target applied when a layer is switched on.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomOnShow {
    /// Area to fit.
    pub bounds: Bounds,
    /// Padding in pixels. Falls back to the manager default when absent.
    #[serde(default)]
    pub padding: Option<f64>,
}

/// Direction of a [`CoordinateAdjustment`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards larger coordinates.
    #[default]
    #[serde(alias = "east", alias = "north", alias = "up", alias = "right", alias = "+")]
    Positive,
    /// Towards smaller coordinates.
    #[serde(alias = "west", alias = "south", alias = "down", alias = "left", alias = "-")]
    Negative,
}

impl Direction {
    /// `1.0` or `-1.0`.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

/// Correction of a known systematic misalignment of a raster: the extent is moved along
/// `axis` by `multiplier` pixels.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAdjustment {
    /// Axis to move along.
    pub axis: Axis,
    /// Sign of the move.
    #[serde(default)]
    pub direction: Direction,
    /// Number of pixels to move by.
    #[serde(default = "one")]
    pub multiplier: f64,
}

fn one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Declaration of a single layer.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Unique layer id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Key of the [`Category`] the layer is listed under.
    pub category: String,
    /// Geometry kind.
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    /// Data locator: a path served by the data server or a full URL.
    #[serde(alias = "url", alias = "data_url", alias = "path")]
    pub data: String,
    /// Inactive layers are not shown in the layer panel at all.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Visibility when the page opens.
    #[serde(default)]
    pub initial_visibility: bool,
    /// Defer loading until the layer is switched on for the first time.
    #[serde(default)]
    pub lazy_load: bool,
    /// Free form status shown next to the layer name.
    #[serde(default)]
    pub status: Option<String>,
    /// Longer description for the layer panel.
    #[serde(default)]
    pub description: Option<String>,
    /// Kind specific style.
    #[serde(default)]
    pub style: StyleBlock,
    /// Feature popup.
    #[serde(default)]
    pub popup: Option<PopupConfig>,
    /// Legend shown while the layer is visible.
    #[serde(default)]
    pub legend: Option<LegendConfig>,
    /// Camera target applied when the layer is switched on.
    #[serde(default)]
    pub zoom_on_show: Option<ZoomOnShow>,
    /// Engine layer to insert this layer's engine layers before.
    #[serde(default)]
    pub before_layer: Option<String>,
    /// Raster extent correction.
    #[serde(default)]
    pub coordinate_adjustment: Option<CoordinateAdjustment>,
    /// Rendering rule passed to an external raster tile service.
    #[serde(default)]
    pub rendering_rule: Option<serde_json::Value>,
}

impl LayerConfig {
    /// Decodes a single layer declaration. The error carries the layer id when it can be read.
    pub fn from_value(value: &serde_json::Value, position: usize) -> Result<Self, ConfigError> {
        LayerConfig::deserialize(value).map_err(|err| {
            let layer = value
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("layers[{position}]"));
            ConfigError::Malformed {
                layer,
                message: err.to_string(),
            }
        })
    }

    /// Validates the style, popup and legend blocks against the layer kind.
    pub fn activate(&self) -> Result<LayerStyle, ConfigError> {
        if let Some(popup) = &self.popup {
            popup.validate(&self.id)?;
        }

        self.style.activate(&self.id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn layer_defaults() {
        let layer = LayerConfig::from_value(
            &json!({
                "id": "treaty",
                "name": "Williams Treaty",
                "category": "boundaries",
                "type": "polygon",
                "data": "/data/boundaries/treaty.geojson",
            }),
            0,
        )
        .unwrap();

        assert!(layer.active);
        assert!(!layer.initial_visibility);
        assert!(!layer.lazy_load);
        assert!(layer.popup.is_none());
        assert_eq!(layer.kind, GeometryKind::Polygon);
    }

    #[test]
    fn malformed_layer_reports_id() {
        let result = LayerConfig::from_value(
            &json!({"id": "fire", "name": "Fire", "category": "hazards", "type": "hexagon", "data": "x"}),
            3,
        );
        assert_matches!(result, Err(ConfigError::Malformed { layer, .. }) if layer == "fire");

        let result = LayerConfig::from_value(&json!({"name": "No id"}), 3);
        assert_matches!(result, Err(ConfigError::Malformed { layer, .. }) if layer == "layers[3]");
    }

    #[test]
    fn coordinate_adjustment_aliases() {
        let adjustment: CoordinateAdjustment =
            serde_json::from_value(json!({"axis": "latitude", "direction": "south"})).unwrap();
        assert_eq!(adjustment.axis, Axis::Y);
        assert_eq!(adjustment.direction, Direction::Negative);
        assert_eq!(adjustment.multiplier, 1.0);
    }

    #[test]
    fn zoom_on_show_reads_bounds() {
        let zoom: ZoomOnShow = serde_json::from_value(json!({
            "bounds": [[-79.5, 44.0], [-78.0, 45.0]],
            "padding": 20,
        }))
        .unwrap();
        assert_eq!(zoom.padding, Some(20.0));
        assert_eq!(zoom.bounds.south_west().lng(), -79.5);
    }
}
