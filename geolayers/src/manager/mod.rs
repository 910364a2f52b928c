//! Layer manager: turns the registry into live map state.
//!
//! Every layer goes through `Unloaded -> Loading -> Loaded`. Visibility is tracked separately
//! and applied to all engine layers of the logical layer at once. While a layer is `Loading`,
//! toggles of that layer are rejected, so at most one load per layer is ever in flight.
//!
//! The manager is shared by reference: all operations take `&self` and locks are never held
//! across an await point or while calling into the map or the panel.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use crate::config::LayerStyle;
use crate::error::{FetchError, GeolayersError};
use crate::fetch::{AvailabilityProbe, DataFetcher};
use crate::map::{
    Cursor, EngineLayer, EventResponse, FeatureEvent, FeatureEventKind, MapFacade, SourceSpec,
    SubscriptionId,
};
use crate::panel::{LayerPanel, Notification, NotificationLevel};
use crate::popup::format_popup;
use crate::raster::{RasterDecoder, RasterRenderer};
use crate::registry::{LayerRegistry, LoadState, RegisteredLayer, RuntimeLayerState};

mod builder;
mod tiles;
mod ui;

pub use builder::{LayerManagerBuilder, ManagerOptions};
pub use tiles::tile_template;
pub use ui::{render_panel_html, PanelEntry, PanelGroup};

/// Result of [`LayerManager::toggle_layer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A loaded layer was shown.
    Shown,
    /// The layer was hidden, or marked hidden if it was never loaded.
    Hidden,
    /// The layer was loaded for the first time and shown.
    Loaded,
    /// Loading failed; the layer stays unloaded and unchecked.
    LoadFailed,
    /// The layer is still loading; the checkbox was reverted.
    Rejected,
    /// No active layer with the id exists.
    UnknownLayer,
}

enum LoadStart {
    Started(Arc<RegisteredLayer>, bool),
    AlreadyLoaded,
    Busy,
    Unknown,
}

enum ToggleStep {
    Apply(Arc<RegisteredLayer>),
    Load(Arc<RegisteredLayer>),
    Record(Arc<RegisteredLayer>),
    Reject(Arc<RegisteredLayer>, bool),
    Unknown,
}

/// Orchestrates loading, visibility, popups and legends of configured layers.
pub struct LayerManager {
    registry: RwLock<LayerRegistry>,
    map: RwLock<Arc<dyn MapFacade>>,
    fetcher: Arc<dyn DataFetcher>,
    panel: Arc<dyn LayerPanel>,
    probe: Option<Arc<dyn AvailabilityProbe>>,
    decoder: Arc<dyn RasterDecoder>,
    renderer: RasterRenderer,
    subscriptions: Mutex<HashMap<String, Vec<SubscriptionId>>>,
    options: ManagerOptions,
}

impl LayerManager {
    pub(crate) fn new_raw(
        registry: LayerRegistry,
        map: Arc<dyn MapFacade>,
        fetcher: Arc<dyn DataFetcher>,
        panel: Arc<dyn LayerPanel>,
        probe: Option<Arc<dyn AvailabilityProbe>>,
        decoder: Arc<dyn RasterDecoder>,
        options: ManagerOptions,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            map: RwLock::new(map),
            fetcher,
            panel,
            probe,
            decoder,
            renderer: RasterRenderer::new(),
            subscriptions: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// Current map engine.
    pub fn map(&self) -> Arc<dyn MapFacade> {
        self.map.read().clone()
    }

    /// Options the manager was built with.
    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Registered layer by id.
    pub fn layer(&self, id: &str) -> Option<Arc<RegisteredLayer>> {
        self.registry.read().layer(id).cloned()
    }

    /// Snapshot of the runtime state of a layer.
    pub fn layer_state(&self, id: &str) -> Option<RuntimeLayerState> {
        self.registry.read().state(id).copied()
    }

    /// Prepares the map: probes availability, then loads every listed non-lazy layer in
    /// declaration order. Hidden layers are registered hidden.
    pub async fn initialize(&self) {
        self.refresh_availability().await;

        let eager: Vec<String> = {
            let registry = self.registry.read();
            registry
                .layers()
                .filter(|layer| !layer.config().lazy_load && registry.is_listed(layer.id()))
                .map(|layer| layer.id().to_owned())
                .collect()
        };

        debug!("Loading {} layers eagerly", eager.len());
        for id in eager {
            self.load_layer(&id).await;
        }
    }

    /// Queries the availability probe. If the probe fails, every active layer is treated as
    /// available.
    pub async fn refresh_availability(&self) {
        let Some(probe) = &self.probe else {
            return;
        };

        match probe.probe().await {
            Ok(availability) => self.registry.write().set_availability(&availability),
            Err(err) => {
                warn!("Availability probe failed, listing all active layers: {err}");
                self.registry.write().mark_all_available();
            }
        }
    }

    /// Loads a layer unless it is loaded or loading already, keeping its recorded visibility.
    ///
    /// Returns true if the layer is loaded afterwards. Failures are logged and reported to the
    /// panel; the layer is left unloaded so that the next toggle retries.
    pub async fn load_layer(&self, id: &str) -> bool {
        let (layer, visible) = match self.begin_load(id) {
            LoadStart::Started(layer, visible) => (layer, visible),
            LoadStart::AlreadyLoaded => return true,
            LoadStart::Busy => {
                debug!("Layer {id} is already loading");
                return false;
            }
            LoadStart::Unknown => {
                warn!("Cannot load unknown layer {id}");
                return false;
            }
        };

        let loaded = self.run_load(&layer, visible).await;
        if loaded {
            self.apply_visibility(&layer, visible);
        }

        loaded
    }

    /// Shows or hides a layer, loading it first if it was never loaded.
    ///
    /// Toggles of a layer that is still loading are rejected: the checkbox is set back to the
    /// recorded visibility and a warning is shown.
    pub async fn toggle_layer(&self, id: &str, visible: bool) -> ToggleOutcome {
        let step = {
            let mut registry = self.registry.write();
            let layer = registry
                .layer(id)
                .filter(|layer| layer.config().active)
                .cloned();
            match (layer, registry.state_mut(id)) {
                (Some(layer), Some(state)) => match state.load_state {
                    LoadState::Loading => ToggleStep::Reject(layer, state.visible),
                    LoadState::Loaded => {
                        state.visible = visible;
                        ToggleStep::Apply(layer)
                    }
                    LoadState::Unloaded if visible => {
                        state.visible = true;
                        state.load_state = LoadState::Loading;
                        ToggleStep::Load(layer)
                    }
                    LoadState::Unloaded => {
                        state.visible = false;
                        ToggleStep::Record(layer)
                    }
                },
                _ => ToggleStep::Unknown,
            }
        };

        match step {
            ToggleStep::Unknown => {
                warn!("Ignoring toggle of unknown layer {id}");
                ToggleOutcome::UnknownLayer
            }
            ToggleStep::Reject(layer, recorded) => {
                let err = GeolayersError::ToggleRaceRejected(id.to_owned());
                warn!("{err}");
                self.panel.set_checked(id, recorded);
                self.notify(
                    NotificationLevel::Warning,
                    format!("{} is still loading, please wait", layer.config().name),
                );
                ToggleOutcome::Rejected
            }
            ToggleStep::Apply(layer) => {
                self.apply_visibility(&layer, visible);
                if visible {
                    self.zoom_on_show(&layer);
                    ToggleOutcome::Shown
                } else {
                    ToggleOutcome::Hidden
                }
            }
            ToggleStep::Record(layer) => {
                self.set_legend_visible(&layer, false);
                ToggleOutcome::Hidden
            }
            ToggleStep::Load(layer) => {
                if self.run_load(&layer, true).await {
                    self.apply_visibility(&layer, true);
                    self.zoom_on_show(&layer);
                    self.notify(
                        NotificationLevel::Success,
                        format!("{} loaded", layer.config().name),
                    );
                    ToggleOutcome::Loaded
                } else {
                    ToggleOutcome::LoadFailed
                }
            }
        }
    }

    /// Rebuilds the map state after the engine dropped all sources and layers, as it does when
    /// the basemap style is replaced.
    ///
    /// Handlers are unsubscribed first. Every loaded layer is fetched and registered again with
    /// its recorded visibility; unloaded layers are left alone.
    pub async fn reload_after_style_change(&self) {
        let map = self.map();
        self.unsubscribe_all(map.as_ref());

        let reload: Vec<(Arc<RegisteredLayer>, bool)> = {
            let mut registry = self.registry.write();
            let loaded: Vec<Arc<RegisteredLayer>> = registry
                .layers()
                .filter(|layer| registry.state(layer.id()).is_some_and(|s| s.loaded()))
                .cloned()
                .collect();

            loaded
                .into_iter()
                .filter_map(|layer| {
                    let state = registry.state_mut(layer.id())?;
                    state.load_state = LoadState::Loading;
                    let visible = state.visible;
                    Some((layer, visible))
                })
                .collect()
        };

        info!("Reloading {} layers after style change", reload.len());
        for (layer, visible) in reload {
            if self.run_load(&layer, visible).await {
                self.apply_visibility(&layer, visible);
            }
        }
    }

    /// Replaces the map engine instance and reloads all loaded layers into it.
    pub async fn replace_map(&self, map: Arc<dyn MapFacade>) {
        let previous = std::mem::replace(&mut *self.map.write(), map);
        self.unsubscribe_all(previous.as_ref());
        self.reload_after_style_change().await;
    }

    /// Popup HTML of a feature of the layer.
    pub fn generate_popup_html(&self, id: &str, properties: &Map<String, Value>) -> Option<String> {
        let layer = self.layer(id)?;
        Some(popup_html(&layer, properties))
    }

    fn begin_load(&self, id: &str) -> LoadStart {
        let mut registry = self.registry.write();
        let Some(layer) = registry
            .layer(id)
            .filter(|layer| layer.config().active)
            .cloned()
        else {
            return LoadStart::Unknown;
        };

        let Some(state) = registry.state_mut(id) else {
            return LoadStart::Unknown;
        };

        match state.load_state {
            LoadState::Loaded => LoadStart::AlreadyLoaded,
            LoadState::Loading => LoadStart::Busy,
            LoadState::Unloaded => {
                state.load_state = LoadState::Loading;
                LoadStart::Started(layer, state.visible)
            }
        }
    }

    /// Fetches and registers a layer that was put into `Loading`, then settles its state.
    async fn run_load(&self, layer: &Arc<RegisteredLayer>, visible: bool) -> bool {
        let result = self.fetch_and_register(layer, visible).await;

        {
            let mut registry = self.registry.write();
            if let Some(state) = registry.state_mut(layer.id()) {
                match result {
                    Ok(()) => state.load_state = LoadState::Loaded,
                    Err(_) => {
                        state.load_state = LoadState::Unloaded;
                        state.visible = false;
                    }
                }
            }
        }

        match result {
            Ok(()) => {
                info!("Layer {} loaded", layer.id());
                true
            }
            Err(err) => {
                let config = layer.config();
                error!(
                    "Failed to load layer {} ({:?}) from {}: {err}",
                    config.id, config.kind, config.data
                );
                self.panel.set_checked(layer.id(), false);
                self.set_legend_visible(layer, false);
                self.notify(
                    NotificationLevel::Error,
                    format!("Failed to load {}: {err}", config.name),
                );
                false
            }
        }
    }

    async fn fetch_and_register(
        &self,
        layer: &Arc<RegisteredLayer>,
        visible: bool,
    ) -> Result<(), GeolayersError> {
        let config = layer.config();
        let source = match layer.style() {
            LayerStyle::Point(_) | LayerStyle::Polygon { .. } | LayerStyle::Line(_) => {
                let value = self.fetcher.fetch_json(&config.data).await?;
                let geojson = geojson::GeoJson::from_json_value(value)
                    .map_err(|err| FetchError::decode(&config.data, err))?;
                SourceSpec::GeoJson(geojson)
            }
            LayerStyle::Raster(style) => {
                let bytes = self.fetcher.fetch_bytes(&config.data).await?;
                let grid = self.decoder.decode(&bytes)?;
                let overlay = self.renderer.render(
                    &grid,
                    &style.color_scale,
                    config.coordinate_adjustment.as_ref(),
                )?;
                SourceSpec::Image {
                    image: overlay.image,
                    coordinates: overlay.corners,
                }
            }
            LayerStyle::TiledRaster(style) => {
                let tile_size = style.tile_size.unwrap_or(self.options.tile_size());
                SourceSpec::RasterTiles {
                    tiles: vec![tile_template(
                        &config.data,
                        config.rendering_rule.as_ref(),
                        tile_size,
                    )],
                    tile_size,
                }
            }
        };

        self.register(layer, source, visible)
    }

    fn register(
        &self,
        layer: &Arc<RegisteredLayer>,
        source: SourceSpec,
        visible: bool,
    ) -> Result<(), GeolayersError> {
        let map = self.map();
        self.remove_from_map(map.as_ref(), layer);

        let source_id = layer.source_id();
        map.add_source(&source_id, source)?;

        let before = layer.config().before_layer.as_deref();
        let before = match before {
            Some(before) if map.has_layer(before) => Some(before),
            Some(before) => {
                debug!("Layer {before} is not on the map, adding {} on top", layer.id());
                None
            }
            None => None,
        };

        for (suffix, layer_type, paint) in layer.style().engine_layers() {
            let engine_layer = EngineLayer {
                id: layer.engine_layer_id(suffix),
                source: source_id.clone(),
                layer_type,
                paint,
                visible,
            };

            if let Err(err) = map.add_layer(engine_layer, before) {
                self.remove_from_map(map.as_ref(), layer);
                return Err(err);
            }
        }

        self.subscribe(map.as_ref(), layer);
        Ok(())
    }

    fn remove_from_map(&self, map: &dyn MapFacade, layer: &RegisteredLayer) {
        if let Some(subscriptions) = self.subscriptions.lock().remove(layer.id()) {
            for subscription in subscriptions {
                map.unsubscribe(subscription);
            }
        }

        for id in layer.engine_layer_ids().iter().rev() {
            if map.has_layer(id) {
                if let Err(err) = map.remove_layer(id) {
                    warn!("Failed to remove engine layer {id}: {err}");
                }
            }
        }

        let source_id = layer.source_id();
        if map.has_source(&source_id) {
            if let Err(err) = map.remove_source(&source_id) {
                warn!("Failed to remove source {source_id}: {err}");
            }
        }
    }

    fn subscribe(&self, map: &dyn MapFacade, layer: &Arc<RegisteredLayer>) {
        let Some(suffix) = layer.style().interactive_suffix() else {
            return;
        };

        let engine_layer_id = layer.engine_layer_id(suffix);
        let mut subscriptions = Vec::with_capacity(3);

        if layer.config().popup.is_some() {
            let popup_layer = layer.clone();
            subscriptions.push(map.subscribe(
                &engine_layer_id,
                FeatureEventKind::Click,
                Box::new(move |event: &FeatureEvent| match &event.properties {
                    Some(properties) => EventResponse::ShowPopup {
                        position: event.position,
                        html: popup_html(&popup_layer, properties),
                    },
                    None => EventResponse::None,
                }),
            ));
        }

        subscriptions.push(map.subscribe(
            &engine_layer_id,
            FeatureEventKind::PointerEnter,
            Box::new(|_: &FeatureEvent| EventResponse::SetCursor(Cursor::Pointer)),
        ));
        subscriptions.push(map.subscribe(
            &engine_layer_id,
            FeatureEventKind::PointerLeave,
            Box::new(|_: &FeatureEvent| EventResponse::SetCursor(Cursor::Default)),
        ));

        self.subscriptions
            .lock()
            .entry(layer.id().to_owned())
            .or_default()
            .extend(subscriptions);
    }

    fn unsubscribe_all(&self, map: &dyn MapFacade) {
        let subscriptions: Vec<SubscriptionId> = self
            .subscriptions
            .lock()
            .drain()
            .flat_map(|(_, ids)| ids)
            .collect();

        debug!("Removing {} event subscriptions", subscriptions.len());
        for subscription in subscriptions {
            map.unsubscribe(subscription);
        }
    }

    fn apply_visibility(&self, layer: &RegisteredLayer, visible: bool) {
        let map = self.map();
        for id in layer.engine_layer_ids() {
            if let Err(err) = map.set_layout_visibility(&id, visible) {
                warn!("Failed to set visibility of engine layer {id}: {err}");
            }
        }

        self.set_legend_visible(layer, visible);
    }

    fn set_legend_visible(&self, layer: &RegisteredLayer, visible: bool) {
        if layer.config().legend.is_some() {
            self.panel.set_legend_visible(layer.id(), visible);
        }
    }

    fn zoom_on_show(&self, layer: &RegisteredLayer) {
        if let Some(zoom) = &layer.config().zoom_on_show {
            let padding = zoom.padding.unwrap_or(self.options.fit_padding());
            self.map().fit_bounds(zoom.bounds, padding);
        }
    }

    fn notify(&self, level: NotificationLevel, message: String) {
        let duration = match level {
            NotificationLevel::Error => self.options.error_notification_duration(),
            _ => self.options.notification_duration(),
        };

        self.panel.notify(Notification {
            level,
            message,
            duration,
        });
    }
}

fn popup_html(layer: &RegisteredLayer, properties: &Map<String, Value>) -> String {
    let name = &layer.config().name;
    match &layer.config().popup {
        Some(popup) => format_popup(popup, name, properties).to_html(),
        None => format_popup(&Default::default(), name, properties).to_html(),
    }
}
