//! Geolayers is a configuration driven layer engine for slippy maps. A single document declares
//! categories and layers (GeoJSON points, polygons and lines, single band GeoTIFF rasters and
//! externally tiled rasters); geolayers turns it into sources and styled layers of a map engine,
//! loads data lazily, colorizes rasters on the client, and formats feature popups and legends.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use geolayers::{LayerManagerBuilder, LayersConfig};
//! use geolayers::fetch::HttpFetcher;
//! # use geolayers::map::MapFacade;
//! # fn engine() -> Arc<dyn MapFacade> { unimplemented!() }
//!
//! # tokio_test::block_on(async {
//! let fetcher = Arc::new(HttpFetcher::new(Some("https://maps.example.org")).unwrap());
//! let config = LayersConfig::fetch(fetcher.as_ref(), "/api/layer-config").await.unwrap();
//!
//! let manager = LayerManagerBuilder::new(config)
//!     .with_map(engine())
//!     .with_fetcher(fetcher)
//!     .build()
//!     .unwrap();
//!
//! manager.initialize().await;
//! manager.toggle_layer("fire_perimeters", true).await;
//! # });
//! ```
//!
//! # Main components
//!
//! * [`LayerRegistry`] validates the declarations and keeps per-layer runtime state.
//! * [`LayerManager`] drives a [`MapFacade`](map::MapFacade) and a
//!   [`LayerPanel`](panel::LayerPanel): it loads layers once, toggles their visibility, restores
//!   them after a basemap style swap and wires popups to feature clicks.
//! * [`ColorRule`] resolves colors for vector features and raster cells, and
//!   [`RasterRenderer`](raster::RasterRenderer) turns a decoded grid into a georeferenced image.
//! * [`format_popup`](popup::format_popup) builds popup content from feature properties.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod color;
mod color_rule;
pub mod config;
pub mod error;
pub mod fetch;
mod manager;
pub mod map;
pub mod panel;
pub mod popup;
pub mod raster;
mod registry;
mod value;

#[cfg(test)]
mod tests;

pub use color::Color;
pub use color_rule::{ColorRule, Condition, RasterClass};
pub use config::{LayerConfig, LayersConfig};
pub use error::{ConfigError, FetchError, FetchErrorKind, GeolayersError};
pub use manager::{
    render_panel_html, tile_template, LayerManager, LayerManagerBuilder, ManagerOptions,
    PanelEntry, PanelGroup, ToggleOutcome,
};
pub use registry::{CategoryGroup, LayerRegistry, LoadState, RegisteredLayer, RuntimeLayerState};
pub use value::PropertyValue;

// Reexport geolayers_types
pub use geolayers_types;
