//! Parsed layer configuration and per-layer runtime state.

use std::sync::Arc;

use ahash::{HashMap, HashSet};
use log::{debug, warn};
use serde_json::Value;

use crate::config::{Category, GeometryKind, LayerConfig, LayerStyle, LayersConfig};
use crate::error::ConfigError;

/// Load state of a layer.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Data was never loaded, or the last load failed.
    #[default]
    Unloaded,
    /// A load is in flight.
    Loading,
    /// Data is registered in the map engine.
    Loaded,
}

/// Mutable state of a layer for the lifetime of a session.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RuntimeLayerState {
    /// Visibility requested by the user. An unloaded layer is not drawn regardless.
    pub visible: bool,
    /// Load state.
    pub load_state: LoadState,
    /// Result of the availability probe; `None` while unknown.
    pub data_available: Option<bool>,
}

impl RuntimeLayerState {
    /// Data is registered in the map engine.
    pub fn loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    /// A load is in flight.
    pub fn loading_in_progress(&self) -> bool {
        self.load_state == LoadState::Loading
    }
}

/// Layer declaration that passed activation.
#[derive(Debug, Clone)]
pub struct RegisteredLayer {
    config: LayerConfig,
    style: LayerStyle,
}

impl RegisteredLayer {
    /// Validates the declaration.
    pub fn activate(config: LayerConfig) -> Result<Self, ConfigError> {
        let style = config.activate()?;
        Ok(Self { config, style })
    }

    /// Layer id.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Geometry kind.
    pub fn kind(&self) -> GeometryKind {
        self.config.kind
    }

    /// Declaration.
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Validated style.
    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    /// Id of the engine source holding the layer data.
    pub fn source_id(&self) -> String {
        format!("{}-source", self.config.id)
    }

    /// Ids of all engine layers drawing this layer, bottom first.
    pub fn engine_layer_ids(&self) -> Vec<String> {
        self.style
            .engine_layers()
            .into_iter()
            .map(|(suffix, _, _)| self.engine_layer_id(suffix))
            .collect()
    }

    pub(crate) fn engine_layer_id(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.config.id)
    }
}

/// Layers of one category, in declaration order.
#[derive(Debug, Clone)]
pub struct CategoryGroup<'a> {
    /// Category.
    pub category: &'a Category,
    /// Layers listed under the category.
    pub layers: Vec<&'a Arc<RegisteredLayer>>,
}

/// Holds the layer configuration for a session together with each layer's runtime state.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    categories: Vec<Category>,
    layers: Vec<Arc<RegisteredLayer>>,
    index: HashMap<String, usize>,
    states: HashMap<String, RuntimeLayerState>,
    rejected: Vec<ConfigError>,
}

impl LayerRegistry {
    /// Builds the registry from the configuration document.
    pub fn initialize(config: Value) -> Result<Self, ConfigError> {
        Self::from_config(LayersConfig::from_value(config)?)
    }

    /// Builds the registry from a parsed configuration.
    ///
    /// Duplicate layer or category ids fail the whole registry. Layers that cannot be decoded
    /// or activated are logged, kept in [`LayerRegistry::rejected`] and left out.
    pub fn from_config(config: LayersConfig) -> Result<Self, ConfigError> {
        let mut category_ids = HashSet::default();
        for category in &config.categories {
            if !category_ids.insert(category.id.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut layer_ids = HashSet::default();
        for id in config
            .layers
            .iter()
            .filter_map(|layer| layer.get("id").and_then(Value::as_str))
        {
            if !layer_ids.insert(id) {
                return Err(ConfigError::DuplicateLayer(id.to_owned()));
            }
        }

        let mut layers = Vec::with_capacity(config.layers.len());
        let mut rejected = Vec::new();
        for (position, raw) in config.layers.iter().enumerate() {
            match LayerConfig::from_value(raw, position).and_then(RegisteredLayer::activate) {
                Ok(layer) => layers.push(Arc::new(layer)),
                Err(err) => {
                    warn!("Layer rejected: {err}");
                    rejected.push(err);
                }
            }
        }

        let index = layers
            .iter()
            .enumerate()
            .map(|(i, layer)| (layer.id().to_owned(), i))
            .collect();
        let states = layers
            .iter()
            .map(|layer| {
                (
                    layer.id().to_owned(),
                    RuntimeLayerState {
                        visible: layer.config().initial_visibility,
                        ..Default::default()
                    },
                )
            })
            .collect();

        debug!(
            "Layer registry initialized with {} layers, {} rejected",
            layers.len(),
            rejected.len()
        );

        Ok(Self {
            categories: config.categories,
            layers,
            index,
            states,
            rejected,
        })
    }

    /// Declared categories.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Layer by id.
    pub fn layer(&self, id: &str) -> Option<&Arc<RegisteredLayer>> {
        self.index.get(id).and_then(|&i| self.layers.get(i))
    }

    /// All registered layers in declaration order.
    pub fn layers(&self) -> impl Iterator<Item = &Arc<RegisteredLayer>> {
        self.layers.iter()
    }

    /// Errors of layers left out of the registry.
    pub fn rejected(&self) -> &[ConfigError] {
        &self.rejected
    }

    /// Runtime state of a layer.
    pub fn state(&self, id: &str) -> Option<&RuntimeLayerState> {
        self.states.get(id)
    }

    pub(crate) fn state_mut(&mut self, id: &str) -> Option<&mut RuntimeLayerState> {
        self.states.get_mut(id)
    }

    /// Applies a probe result. Layers the probe does not mention become unknown.
    pub fn set_availability(&mut self, availability: &std::collections::HashMap<String, bool>) {
        for (id, state) in &mut self.states {
            state.data_available = availability.get(id).copied();
        }
    }

    /// Marks every active layer as available, used when the probe fails.
    pub fn mark_all_available(&mut self) {
        for layer in &self.layers {
            if let Some(state) = self.states.get_mut(layer.id()) {
                state.data_available = layer.config().active.then_some(true);
            }
        }
    }

    /// Returns true if the layer is active and not known to lack data.
    pub fn is_listed(&self, id: &str) -> bool {
        let Some(layer) = self.layer(id) else {
            return false;
        };

        layer.config().active
            && self
                .state(id)
                .map_or(true, |state| state.data_available != Some(false))
    }

    /// Listed layers grouped by category. Categories are sorted by `order`, ties keep
    /// declaration order. Empty categories are omitted, as are layers referencing an
    /// undeclared category.
    pub fn layers_by_category(&self) -> Vec<CategoryGroup<'_>> {
        let mut categories: Vec<&Category> = self.categories.iter().collect();
        categories.sort_by_key(|category| category.order);

        for layer in &self.layers {
            if !categories.iter().any(|c| c.id == layer.config().category) {
                debug!(
                    "Layer {} references unknown category {}",
                    layer.id(),
                    layer.config().category
                );
            }
        }

        categories
            .into_iter()
            .map(|category| CategoryGroup {
                category,
                layers: self
                    .layers
                    .iter()
                    .filter(|layer| layer.config().category == category.id)
                    .filter(|layer| self.is_listed(layer.id()))
                    .collect(),
            })
            .filter(|group| !group.layers.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn polygon(id: &str, category: &str) -> Value {
        json!({
            "id": id,
            "name": id.to_uppercase(),
            "category": category,
            "type": "polygon",
            "data": format!("/data/{id}.geojson"),
            "style": {"fill": {"color": "#FF0000"}},
        })
    }

    #[test]
    fn duplicate_layer_ids_fail() {
        let result = LayerRegistry::initialize(json!({
            "categories": [{"id": "a", "name": "A"}],
            "layers": [polygon("x", "a"), polygon("x", "a")],
        }));
        assert_eq!(result.unwrap_err(), ConfigError::DuplicateLayer("x".into()));
    }

    #[test]
    fn duplicate_category_ids_fail() {
        let result = LayerRegistry::initialize(json!({
            "categories": [{"id": "a", "name": "A"}, {"id": "a", "name": "B"}],
            "layers": [],
        }));
        assert_eq!(result.unwrap_err(), ConfigError::DuplicateCategory("a".into()));
    }

    #[test]
    fn initial_state_follows_visibility() {
        let mut visible = polygon("treaty", "a");
        visible["initial_visibility"] = json!(true);
        let registry = LayerRegistry::initialize(json!({
            "categories": [{"id": "a", "name": "A"}],
            "layers": [visible, polygon("fire", "a")],
        }))
        .unwrap();

        let treaty = registry.state("treaty").unwrap();
        assert!(treaty.visible);
        assert_eq!(treaty.load_state, LoadState::Unloaded);
        assert_eq!(treaty.data_available, None);
        assert!(!registry.state("fire").unwrap().visible);
    }

    #[test]
    fn point_without_radius_is_rejected_others_survive() {
        let registry = LayerRegistry::initialize(json!({
            "categories": [{"id": "a", "name": "A"}],
            "layers": [
                {
                    "id": "wells",
                    "name": "Wells",
                    "category": "a",
                    "type": "point",
                    "data": "/data/wells.geojson",
                    "style": {"circle": {"color": "#0000FF", "opacity": 1}},
                },
                polygon("treaty", "a"),
            ],
        }))
        .unwrap();

        assert!(registry.layer("wells").is_none());
        assert_matches!(
            registry.rejected(),
            [ConfigError::MissingField { layer, field }] if layer == "wells" && field == "style.circle.radius"
        );

        let groups = registry.layers_by_category();
        let ids: Vec<&str> = groups[0].layers.iter().map(|layer| layer.id()).collect();
        assert_eq!(ids, ["treaty"]);
    }

    #[test]
    fn categories_sorted_with_stable_ties() {
        let registry = LayerRegistry::initialize(json!({
            "categories": [
                {"id": "hazards", "name": "Hazards", "order": 2},
                {"id": "boundaries", "name": "Boundaries", "order": 1},
                {"id": "water", "name": "Water", "order": 2},
                {"id": "empty", "name": "Empty", "order": 0},
            ],
            "layers": [
                polygon("fire", "hazards"),
                polygon("advisories", "water"),
                polygon("treaty", "boundaries"),
                polygon("orphan", "missing"),
            ],
        }))
        .unwrap();

        let groups: Vec<(&str, Vec<&str>)> = registry
            .layers_by_category()
            .iter()
            .map(|group| {
                (
                    group.category.id.as_str(),
                    group.layers.iter().map(|layer| layer.id()).collect(),
                )
            })
            .collect();

        assert_eq!(
            groups,
            [
                ("boundaries", vec!["treaty"]),
                ("hazards", vec!["fire"]),
                ("water", vec!["advisories"]),
            ]
        );
    }

    #[test]
    fn inactive_and_unavailable_layers_are_not_listed() {
        let mut inactive = polygon("old", "a");
        inactive["active"] = json!(false);
        let mut registry = LayerRegistry::initialize(json!({
            "categories": [{"id": "a", "name": "A"}],
            "layers": [inactive, polygon("fire", "a"), polygon("treaty", "a")],
        }))
        .unwrap();

        registry.set_availability(&std::collections::HashMap::from([("fire".to_owned(), false)]));
        assert!(!registry.is_listed("old"));
        assert!(!registry.is_listed("fire"));
        assert!(registry.is_listed("treaty"));

        registry.mark_all_available();
        assert!(registry.is_listed("fire"));
        assert_eq!(registry.state("old").unwrap().data_available, None);
    }
}
