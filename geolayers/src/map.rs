//! Interface of the map engine the layers are drawn with.
//!
//! The engine owns all sources and layers; the [`LayerManager`](crate::LayerManager) only keeps
//! their string ids. Feature interaction is delivered through [`FeatureEventHandler`]s. A handler
//! does not get access to the map: it answers with an [`EventResponse`] and the engine acts on
//! it, so handlers never keep the engine alive.

use geolayers_types::{Bounds, LngLat, Quad};
use maybe_sync::{MaybeSend, MaybeSync};
use serde_json::{Map, Value};

use crate::error::GeolayersError;
use crate::raster::RasterImage;

/// Map engine surface.
pub trait MapFacade: MaybeSend + MaybeSync {
    /// Registers a data source.
    fn add_source(&self, id: &str, source: SourceSpec) -> Result<(), GeolayersError>;
    /// Returns true if a source with the id is registered.
    fn has_source(&self, id: &str) -> bool;
    /// Removes a source. Layers using it must be removed first.
    fn remove_source(&self, id: &str) -> Result<(), GeolayersError>;
    /// Adds a layer on top of the stack, or below the layer `before` if it exists.
    fn add_layer(&self, layer: EngineLayer, before: Option<&str>) -> Result<(), GeolayersError>;
    /// Returns true if a layer with the id is registered.
    fn has_layer(&self, id: &str) -> bool;
    /// Removes a layer.
    fn remove_layer(&self, id: &str) -> Result<(), GeolayersError>;
    /// Sets the `visibility` layout property of a layer.
    fn set_layout_visibility(&self, layer_id: &str, visible: bool) -> Result<(), GeolayersError>;
    /// Moves the camera so that `bounds` fit the viewport with `padding` pixels around.
    fn fit_bounds(&self, bounds: Bounds, padding: f64);
    /// Subscribes `handler` to events of `kind` on a layer.
    fn subscribe(
        &self,
        layer_id: &str,
        kind: FeatureEventKind,
        handler: Box<dyn FeatureEventHandler>,
    ) -> SubscriptionId;
    /// Removes a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Handle of an event subscription.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Data source definition.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Vector features.
    GeoJson(geojson::GeoJson),
    /// Single image placed at four corners.
    Image {
        /// RGBA image.
        image: RasterImage,
        /// Top-left, top-right, bottom-right, bottom-left.
        coordinates: Quad,
    },
    /// Raster tiles from a URL template.
    RasterTiles {
        /// Tile URL templates.
        tiles: Vec<String>,
        /// Tile size in pixels.
        tile_size: u32,
    },
}

/// Type of an engine layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EngineLayerType {
    /// Circles at point features.
    Circle,
    /// Filled polygons.
    Fill,
    /// Lines and polygon outlines.
    Line,
    /// Raster image or tiles.
    Raster,
}

impl EngineLayerType {
    /// Type name used by style documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineLayerType::Circle => "circle",
            EngineLayerType::Fill => "fill",
            EngineLayerType::Line => "line",
            EngineLayerType::Raster => "raster",
        }
    }
}

/// Engine layer definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLayer {
    /// Layer id, unique in the engine.
    pub id: String,
    /// Source id.
    pub source: String,
    /// Layer type.
    pub layer_type: EngineLayerType,
    /// Paint properties.
    pub paint: Map<String, Value>,
    /// Initial `visibility` layout property.
    pub visible: bool,
}

/// Kind of a feature event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FeatureEventKind {
    /// Feature was clicked.
    Click,
    /// Pointer entered a feature.
    PointerEnter,
    /// Pointer left the layer's features.
    PointerLeave,
}

/// Event delivered to a [`FeatureEventHandler`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEvent {
    /// Event kind.
    pub kind: FeatureEventKind,
    /// Engine layer the feature belongs to.
    pub layer_id: String,
    /// Position of the pointer.
    pub position: LngLat,
    /// Properties of the topmost feature under the pointer, if any.
    pub properties: Option<Map<String, Value>>,
}

/// Mouse cursor shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Engine default.
    Default,
    /// Hand pointer.
    Pointer,
}

/// What the engine should do in answer to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResponse {
    /// Nothing.
    None,
    /// Open a popup.
    ShowPopup {
        /// Popup anchor.
        position: LngLat,
        /// Popup content.
        html: String,
    },
    /// Change the cursor.
    SetCursor(Cursor),
}

/// Feature event handler.
pub trait FeatureEventHandler: MaybeSend + MaybeSync {
    /// Handle the event.
    fn handle(&self, event: &FeatureEvent) -> EventResponse;
}

impl<T: Fn(&FeatureEvent) -> EventResponse> FeatureEventHandler for T
where
    T: MaybeSync + MaybeSend,
{
    fn handle(&self, event: &FeatureEvent) -> EventResponse {
        self(event)
    }
}
