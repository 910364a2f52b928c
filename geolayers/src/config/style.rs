use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::color_rule::ColorRule;
use crate::config::GeometryKind;
use crate::error::ConfigError;
use crate::map::EngineLayerType;
use crate::Color;

/// Style block of a layer as written in configuration. Every field is optional here; which
/// ones are required depends on the layer kind and is checked by [`StyleBlock::activate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleBlock {
    /// Point style.
    #[serde(default)]
    pub circle: Option<CircleBlock>,
    /// Polygon fill.
    #[serde(default)]
    pub fill: Option<FillBlock>,
    /// Polygon outline.
    #[serde(default)]
    pub outline: Option<OutlineBlock>,
    /// Line style.
    #[serde(default)]
    pub line: Option<LineBlock>,
    /// Raster colorization.
    #[serde(default)]
    pub raster: Option<RasterBlock>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CircleBlock {
    pub radius: Option<f64>,
    pub color: Option<ColorRule>,
    pub opacity: Option<f64>,
    pub stroke_color: Option<Color>,
    pub stroke_width: Option<f64>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FillBlock {
    pub color: Option<ColorRule>,
    pub opacity: Option<f64>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutlineBlock {
    pub color: Option<Color>,
    pub width: Option<f64>,
    pub opacity: Option<f64>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineBlock {
    pub color: Option<ColorRule>,
    pub width: Option<f64>,
    pub opacity: Option<f64>,
    pub dasharray: Option<Vec<f64>>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RasterBlock {
    #[serde(alias = "colormap", alias = "color_map")]
    pub color_scale: Option<ColorRule>,
    pub opacity: Option<f64>,
    pub tile_size: Option<u32>,
}

/// Validated style of an activated layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerStyle {
    /// Points.
    Point(CircleStyle),
    /// Polygons: two engine layers that always move together.
    Polygon {
        /// Fill layer.
        fill: FillStyle,
        /// Outline layer.
        outline: OutlineStyle,
    },
    /// Lines.
    Line(LineStyle),
    /// Client colorized raster.
    Raster(RasterStyle),
    /// Externally tiled raster.
    TiledRaster(TiledRasterStyle),
}

/// Circle paint of a point layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleStyle {
    /// Radius in pixels.
    pub radius: f64,
    /// Fill color rule.
    pub color: ColorRule,
    /// Opacity in `0..=1`.
    pub opacity: f64,
    /// Stroke color, black by default.
    pub stroke_color: Color,
    /// Stroke width, `0` by default.
    pub stroke_width: f64,
    color_expression: Value,
}

/// Fill paint of a polygon layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    /// Fill color rule.
    pub color: ColorRule,
    /// Opacity, `1` by default.
    pub opacity: f64,
    color_expression: Value,
}

/// Outline paint of a polygon layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineStyle {
    /// Line color, black by default.
    pub color: Color,
    /// Line width, `0` by default.
    pub width: f64,
    /// Opacity, `1` by default.
    pub opacity: f64,
}

/// Paint of a line layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    /// Line color rule.
    pub color: ColorRule,
    /// Width in pixels.
    pub width: f64,
    /// Opacity, `1` by default.
    pub opacity: f64,
    /// Optional dash pattern.
    pub dasharray: Option<Vec<f64>>,
    color_expression: Value,
}

/// Colorization of a client rendered raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStyle {
    /// Rule applied to every pixel.
    pub color_scale: ColorRule,
    /// Opacity of the overlay, `1` by default.
    pub opacity: f64,
}

/// Paint of an externally tiled raster.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledRasterStyle {
    /// Opacity, `1` by default.
    pub opacity: f64,
    /// Tile size in pixels, if overridden.
    pub tile_size: Option<u32>,
}

impl StyleBlock {
    /// Checks that the fields required for `kind` are present and decodes the paint
    /// expressions. Optional fields receive their documented defaults.
    pub fn activate(&self, layer: &str, kind: GeometryKind) -> Result<LayerStyle, ConfigError> {
        let style = match kind {
            GeometryKind::Point => {
                let circle = self
                    .circle
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing(layer, "style.circle"))?;
                let color = required(circle.color.clone(), layer, "style.circle.color")?;
                LayerStyle::Point(CircleStyle {
                    radius: required(circle.radius, layer, "style.circle.radius")?,
                    opacity: required(circle.opacity, layer, "style.circle.opacity")?,
                    stroke_color: circle.stroke_color.unwrap_or(Color::BLACK),
                    stroke_width: circle.stroke_width.unwrap_or(0.0),
                    color_expression: vector_expression(&color, layer)?,
                    color,
                })
            }
            GeometryKind::Polygon => {
                let fill = self
                    .fill
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing(layer, "style.fill"))?;
                let color = required(fill.color.clone(), layer, "style.fill.color")?;
                let outline = self.outline.clone().unwrap_or_default();
                LayerStyle::Polygon {
                    fill: FillStyle {
                        opacity: fill.opacity.unwrap_or(1.0),
                        color_expression: vector_expression(&color, layer)?,
                        color,
                    },
                    outline: OutlineStyle {
                        color: outline.color.unwrap_or(Color::BLACK),
                        width: outline.width.unwrap_or(0.0),
                        opacity: outline.opacity.unwrap_or(1.0),
                    },
                }
            }
            GeometryKind::Line => {
                let line = self
                    .line
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing(layer, "style.line"))?;
                let color = required(line.color.clone(), layer, "style.line.color")?;
                LayerStyle::Line(LineStyle {
                    width: required(line.width, layer, "style.line.width")?,
                    opacity: line.opacity.unwrap_or(1.0),
                    dasharray: line.dasharray.clone(),
                    color_expression: vector_expression(&color, layer)?,
                    color,
                })
            }
            GeometryKind::Raster => {
                let raster = self
                    .raster
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing(layer, "style.raster"))?;
                LayerStyle::Raster(RasterStyle {
                    color_scale: required(
                        raster.color_scale.clone(),
                        layer,
                        "style.raster.color_scale",
                    )?,
                    opacity: raster.opacity.unwrap_or(1.0),
                })
            }
            GeometryKind::ExternallyTiledRaster => {
                let raster = self.raster.clone().unwrap_or_default();
                LayerStyle::TiledRaster(TiledRasterStyle {
                    opacity: raster.opacity.unwrap_or(1.0),
                    tile_size: raster.tile_size,
                })
            }
        };

        for opacity in style.opacities() {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::malformed(
                    layer,
                    format!("opacity {opacity} is outside of 0..=1"),
                ));
            }
        }

        Ok(style)
    }
}

impl LayerStyle {
    fn opacities(&self) -> Vec<f64> {
        match self {
            LayerStyle::Point(circle) => vec![circle.opacity],
            LayerStyle::Polygon { fill, outline } => vec![fill.opacity, outline.opacity],
            LayerStyle::Line(line) => vec![line.opacity],
            LayerStyle::Raster(raster) => vec![raster.opacity],
            LayerStyle::TiledRaster(tiled) => vec![tiled.opacity],
        }
    }

    /// Engine layers this style is drawn with: id suffix, engine layer type and paint
    /// properties. Order is the drawing order.
    pub fn engine_layers(&self) -> Vec<(&'static str, EngineLayerType, Map<String, Value>)> {
        match self {
            LayerStyle::Point(circle) => vec![(
                "circle",
                EngineLayerType::Circle,
                paint(json!({
                    "circle-radius": circle.radius,
                    "circle-color": circle.color_expression,
                    "circle-opacity": circle.opacity,
                    "circle-stroke-color": circle.stroke_color.to_css(),
                    "circle-stroke-width": circle.stroke_width,
                })),
            )],
            LayerStyle::Polygon { fill, outline } => vec![
                (
                    "fill",
                    EngineLayerType::Fill,
                    paint(json!({
                        "fill-color": fill.color_expression,
                        "fill-opacity": fill.opacity,
                    })),
                ),
                (
                    "outline",
                    EngineLayerType::Line,
                    paint(json!({
                        "line-color": outline.color.to_css(),
                        "line-width": outline.width,
                        "line-opacity": outline.opacity,
                    })),
                ),
            ],
            LayerStyle::Line(line) => {
                let mut properties = paint(json!({
                    "line-color": line.color_expression,
                    "line-width": line.width,
                    "line-opacity": line.opacity,
                }));
                if let Some(dasharray) = &line.dasharray {
                    properties.insert("line-dasharray".into(), json!(dasharray));
                }
                vec![("line", EngineLayerType::Line, properties)]
            }
            LayerStyle::Raster(RasterStyle { opacity, .. })
            | LayerStyle::TiledRaster(TiledRasterStyle { opacity, .. }) => vec![(
                "raster",
                EngineLayerType::Raster,
                paint(json!({ "raster-opacity": opacity })),
            )],
        }
    }

    /// Engine layer that receives click and hover events, if the layer is interactive.
    pub fn interactive_suffix(&self) -> Option<&'static str> {
        match self {
            LayerStyle::Point(_) => Some("circle"),
            LayerStyle::Polygon { .. } => Some("fill"),
            LayerStyle::Line(_) => Some("line"),
            LayerStyle::Raster(_) | LayerStyle::TiledRaster(_) => None,
        }
    }
}

fn paint(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn required<T>(value: Option<T>, layer: &str, field: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::missing(layer, field))
}

fn vector_expression(rule: &ColorRule, layer: &str) -> Result<Value, ConfigError> {
    rule.to_expression()
        .map_err(|err| ConfigError::malformed(layer, err))
}
