use std::sync::Arc;
use std::time::Duration;

use super::LayerManager;
use crate::config::LayersConfig;
use crate::error::GeolayersError;
use crate::fetch::{AvailabilityProbe, DataFetcher};
use crate::map::MapFacade;
use crate::panel::{LayerPanel, LogPanel};
use crate::raster::{GeoTiffDecoder, RasterDecoder};
use crate::registry::LayerRegistry;

const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_secs(5);
const DEFAULT_ERROR_NOTIFICATION_DURATION: Duration = Duration::from_secs(8);
const DEFAULT_FIT_PADDING: f64 = 50.0;
const DEFAULT_TILE_SIZE: u32 = 256;

/// Options of a [`LayerManager`].
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ManagerOptions {
    notification_duration: Duration,
    error_notification_duration: Duration,
    fit_padding: f64,
    tile_size: u32,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            notification_duration: DEFAULT_NOTIFICATION_DURATION,
            error_notification_duration: DEFAULT_ERROR_NOTIFICATION_DURATION,
            fit_padding: DEFAULT_FIT_PADDING,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl ManagerOptions {
    /// How long info, success and warning notifications stay on screen.
    pub fn notification_duration(&self) -> Duration {
        self.notification_duration
    }

    /// Sets how long info, success and warning notifications stay on screen.
    pub fn with_notification_duration(mut self, duration: Duration) -> Self {
        self.notification_duration = duration;
        self
    }

    /// How long error notifications stay on screen.
    pub fn error_notification_duration(&self) -> Duration {
        self.error_notification_duration
    }

    /// Sets how long error notifications stay on screen.
    pub fn with_error_notification_duration(mut self, duration: Duration) -> Self {
        self.error_notification_duration = duration;
        self
    }

    /// Padding in pixels used for `zoom_on_show` when the layer does not set one.
    pub fn fit_padding(&self) -> f64 {
        self.fit_padding
    }

    /// Sets the default `zoom_on_show` padding.
    pub fn with_fit_padding(mut self, padding: f64) -> Self {
        self.fit_padding = padding;
        self
    }

    /// Tile size of externally tiled rasters that do not set one.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Sets the default tile size of externally tiled rasters.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }
}

/// Constructor for a [`LayerManager`].
///
/// The map and the data fetcher are required. Without a panel, notifications are only logged;
/// without a probe, every layer is considered available. Rasters are decoded as GeoTIFF unless
/// another decoder is given.
pub struct LayerManagerBuilder {
    config: LayersConfig,
    map: Option<Arc<dyn MapFacade>>,
    fetcher: Option<Arc<dyn DataFetcher>>,
    panel: Option<Arc<dyn LayerPanel>>,
    probe: Option<Arc<dyn AvailabilityProbe>>,
    decoder: Option<Arc<dyn RasterDecoder>>,
    options: ManagerOptions,
}

impl LayerManagerBuilder {
    /// Starts a builder for the given layer configuration.
    pub fn new(config: LayersConfig) -> Self {
        Self {
            config,
            map: None,
            fetcher: None,
            panel: None,
            probe: None,
            decoder: None,
            options: ManagerOptions::default(),
        }
    }

    /// Sets the map engine.
    pub fn with_map(mut self, map: Arc<dyn MapFacade>) -> Self {
        self.map = Some(map);
        self
    }

    /// Sets the data fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the layer panel.
    pub fn with_panel(mut self, panel: Arc<dyn LayerPanel>) -> Self {
        self.panel = Some(panel);
        self
    }

    /// Sets the availability probe.
    pub fn with_probe(mut self, probe: Arc<dyn AvailabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the raster decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn RasterDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the manager options.
    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the registry and the manager.
    ///
    /// Fails on duplicate layer or category ids and when the map or fetcher is missing.
    pub fn build(self) -> Result<LayerManager, GeolayersError> {
        let Self {
            config,
            map,
            fetcher,
            panel,
            probe,
            decoder,
            options,
        } = self;

        let map = map.ok_or_else(|| {
            GeolayersError::Configuration("layer manager requires a map".into())
        })?;
        let fetcher = fetcher.ok_or_else(|| {
            GeolayersError::Configuration("layer manager requires a data fetcher".into())
        })?;
        let registry = LayerRegistry::from_config(config)?;

        Ok(LayerManager::new_raw(
            registry,
            map,
            fetcher,
            panel.unwrap_or_else(|| Arc::new(LogPanel)),
            probe,
            decoder.unwrap_or_else(|| Arc::new(GeoTiffDecoder::new())),
            options,
        ))
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_compact_debug_snapshot;
    use serde_json::json;

    use super::*;
    use crate::config::LayersConfig;
    use crate::tests::{MockFetcher, MockMap};

    #[test]
    fn build_requires_map() {
        let result = LayerManagerBuilder::new(LayersConfig::default())
            .with_fetcher(Arc::new(MockFetcher::new()))
            .build();
        assert_compact_debug_snapshot!(result.err(), @r#"Some(Configuration("layer manager requires a map"))"#);
    }

    #[test]
    fn build_fails_on_duplicate_category() {
        let config = LayersConfig::from_value(json!({
            "categories": [{"id": "a", "name": "A"}, {"id": "a", "name": "A again"}],
        }))
        .unwrap();
        let result = LayerManagerBuilder::new(config)
            .with_map(Arc::new(MockMap::new()))
            .with_fetcher(Arc::new(MockFetcher::new()))
            .build();
        assert_compact_debug_snapshot!(result.err(), @r#"Some(Config(DuplicateCategory("a")))"#);
    }

    #[test]
    fn options_defaults() {
        let options = ManagerOptions::default();
        assert_eq!(options.notification_duration(), Duration::from_secs(5));
        assert_eq!(options.error_notification_duration(), Duration::from_secs(8));
        assert_eq!(options.fit_padding(), 50.0);
        assert_eq!(options.with_tile_size(512).tile_size(), 512);
    }
}
