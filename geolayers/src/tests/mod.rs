use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use geolayers_types::Bounds;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{FetchError, GeolayersError};
use crate::fetch::DataFetcher;
use crate::map::{
    EngineLayer, EventResponse, FeatureEvent, FeatureEventHandler, FeatureEventKind, MapFacade,
    SourceSpec, SubscriptionId,
};
use crate::panel::{LayerPanel, Notification, NotificationLevel};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Subscription {
    layer_id: String,
    kind: FeatureEventKind,
    handler: Box<dyn FeatureEventHandler>,
}

#[derive(Default)]
struct MapState {
    sources: HashMap<String, SourceSpec>,
    layers: Vec<EngineLayer>,
    subscriptions: HashMap<u64, Subscription>,
    next_subscription: u64,
    added_sources: Vec<String>,
    fits: Vec<(Bounds, f64)>,
}

/// In-memory map engine that behaves like a style based engine: ids must be unique and layers
/// need their source.
#[derive(Default)]
pub struct MockMap {
    state: Mutex<MapState>,
}

impl MockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all sources and layers like a basemap style swap does. Subscriptions survive.
    pub fn replace_style(&self) {
        let mut state = self.state.lock();
        state.sources.clear();
        state.layers.clear();
    }

    pub fn add_foreign_layer(&self, id: &str) {
        self.state.lock().layers.push(EngineLayer {
            id: id.to_owned(),
            source: "basemap".to_owned(),
            layer_type: crate::map::EngineLayerType::Line,
            paint: Default::default(),
            visible: true,
        });
    }

    pub fn layer_ids(&self) -> Vec<String> {
        self.state.lock().layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<EngineLayer> {
        self.state.lock().layers.iter().find(|l| l.id == id).cloned()
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.layer(id).map(|layer| layer.visible)
    }

    pub fn source(&self, id: &str) -> Option<SourceSpec> {
        self.state.lock().sources.get(id).cloned()
    }

    /// Number of times a source with the id was added over the map's lifetime.
    pub fn source_additions(&self, id: &str) -> usize {
        self.state
            .lock()
            .added_sources
            .iter()
            .filter(|added| *added == id)
            .count()
    }

    pub fn subscription_count(&self, layer_id: &str) -> usize {
        self.state
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.layer_id == layer_id)
            .count()
    }

    pub fn fits(&self) -> Vec<(Bounds, f64)> {
        self.state.lock().fits.clone()
    }

    pub fn dispatch(&self, event: &FeatureEvent) -> Vec<EventResponse> {
        let state = self.state.lock();
        let mut ids: Vec<&u64> = state.subscriptions.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| state.subscriptions.get(id))
            .filter(|s| s.layer_id == event.layer_id && s.kind == event.kind)
            .map(|s| s.handler.handle(event))
            .collect()
    }
}

impl MapFacade for MockMap {
    fn add_source(&self, id: &str, source: SourceSpec) -> Result<(), GeolayersError> {
        let mut state = self.state.lock();
        if state.sources.contains_key(id) {
            return Err(GeolayersError::Engine(format!("source {id} already exists")));
        }

        state.sources.insert(id.to_owned(), source);
        state.added_sources.push(id.to_owned());
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.lock().sources.contains_key(id)
    }

    fn remove_source(&self, id: &str) -> Result<(), GeolayersError> {
        let mut state = self.state.lock();
        if state.layers.iter().any(|l| l.source == id) {
            return Err(GeolayersError::Engine(format!("source {id} is in use")));
        }

        state
            .sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GeolayersError::Engine(format!("no source {id}")))
    }

    fn add_layer(&self, layer: EngineLayer, before: Option<&str>) -> Result<(), GeolayersError> {
        let mut state = self.state.lock();
        if state.layers.iter().any(|l| l.id == layer.id) {
            return Err(GeolayersError::Engine(format!("layer {} already exists", layer.id)));
        }
        if !state.sources.contains_key(&layer.source) {
            return Err(GeolayersError::Engine(format!("no source {}", layer.source)));
        }

        match before.and_then(|before| state.layers.iter().position(|l| l.id == before)) {
            Some(position) => state.layers.insert(position, layer),
            None => state.layers.push(layer),
        }
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.lock().layers.iter().any(|l| l.id == id)
    }

    fn remove_layer(&self, id: &str) -> Result<(), GeolayersError> {
        let mut state = self.state.lock();
        let position = state
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| GeolayersError::Engine(format!("no layer {id}")))?;
        state.layers.remove(position);
        Ok(())
    }

    fn set_layout_visibility(&self, layer_id: &str, visible: bool) -> Result<(), GeolayersError> {
        let mut state = self.state.lock();
        let layer = state
            .layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or_else(|| GeolayersError::Engine(format!("no layer {layer_id}")))?;
        layer.visible = visible;
        Ok(())
    }

    fn fit_bounds(&self, bounds: Bounds, padding: f64) {
        self.state.lock().fits.push((bounds, padding));
    }

    fn subscribe(
        &self,
        layer_id: &str,
        kind: FeatureEventKind,
        handler: Box<dyn FeatureEventHandler>,
    ) -> SubscriptionId {
        let mut state = self.state.lock();
        state.next_subscription += 1;
        let id = state.next_subscription;
        state.subscriptions.insert(
            id,
            Subscription {
                layer_id: layer_id.to_owned(),
                kind,
                handler,
            },
        );
        SubscriptionId(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.state.lock().subscriptions.remove(&subscription.0);
    }
}

/// Fetcher serving canned responses and counting requests per locator.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Result<Bytes, FetchError>>>,
    counts: Mutex<HashMap<String, usize>>,
    yield_before_response: AtomicBool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every fetch suspend once before it resolves, so that concurrent calls interleave.
    pub fn with_yield(self) -> Self {
        self.yield_before_response.store(true, Ordering::Relaxed);
        self
    }

    pub fn insert_json(&self, locator: &str, value: Value) {
        self.insert_bytes(locator, value.to_string().into_bytes());
    }

    pub fn insert_bytes(&self, locator: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .insert(locator.to_owned(), Ok(Bytes::from(bytes)));
    }

    pub fn insert_error(&self, locator: &str, error: FetchError) {
        self.responses.lock().insert(locator.to_owned(), Err(error));
    }

    pub fn fetch_count(&self, locator: &str) -> usize {
        self.counts.lock().get(locator).copied().unwrap_or_default()
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

#[async_trait]
impl DataFetcher for MockFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Bytes, FetchError> {
        *self.counts.lock().entry(locator.to_owned()).or_default() += 1;

        if self.yield_before_response.load(Ordering::Relaxed) {
            tokio::task::yield_now().await;
        }

        let response = self.responses.lock().get(locator).cloned();
        response.unwrap_or_else(|| Err(FetchError::http(locator, 404)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Checked(String, bool),
    Legend(String, bool),
    Notified(Notification),
}

/// Panel recording every call.
#[derive(Default)]
pub struct RecordingPanel {
    events: Mutex<Vec<PanelEvent>>,
}

impl RecordingPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PanelEvent> {
        self.events.lock().clone()
    }

    pub fn notifications(&self, level: NotificationLevel) -> Vec<Notification> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                PanelEvent::Notified(n) if n.level == level => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_checked(&self, layer_id: &str) -> Option<bool> {
        self.events.lock().iter().rev().find_map(|event| match event {
            PanelEvent::Checked(id, checked) if id == layer_id => Some(*checked),
            _ => None,
        })
    }

    pub fn last_legend(&self, layer_id: &str) -> Option<bool> {
        self.events.lock().iter().rev().find_map(|event| match event {
            PanelEvent::Legend(id, visible) if id == layer_id => Some(*visible),
            _ => None,
        })
    }
}

impl LayerPanel for RecordingPanel {
    fn set_checked(&self, layer_id: &str, checked: bool) {
        self.events
            .lock()
            .push(PanelEvent::Checked(layer_id.to_owned(), checked));
    }

    fn set_legend_visible(&self, layer_id: &str, visible: bool) {
        self.events
            .lock()
            .push(PanelEvent::Legend(layer_id.to_owned(), visible));
    }

    fn notify(&self, notification: Notification) {
        self.events.lock().push(PanelEvent::Notified(notification));
    }
}
