//! Loading of layer data and availability information.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use maybe_sync::{MaybeSend, MaybeSync};
use serde_json::Value;

use crate::error::FetchError;

#[cfg(not(target_arch = "wasm32"))]
mod http;
#[cfg(not(target_arch = "wasm32"))]
mod local;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpFetcher;
#[cfg(not(target_arch = "wasm32"))]
pub use local::LocalFetcher;

/// Loads data by locator (a URL or a path on the data server).
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DataFetcher: MaybeSend + MaybeSync {
    /// Loads raw bytes. Non-2xx answers are reported as [`FetchErrorKind::Http`](crate::FetchErrorKind::Http) errors.
    async fn fetch_bytes(&self, locator: &str) -> Result<Bytes, FetchError>;

    /// Loads and parses a JSON document.
    async fn fetch_json(&self, locator: &str) -> Result<Value, FetchError> {
        let bytes = self.fetch_bytes(locator).await?;
        serde_json::from_slice(&bytes).map_err(|err| FetchError::decode(locator, err))
    }
}

/// Reports which layers currently have data.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AvailabilityProbe: MaybeSend + MaybeSync {
    /// Returns availability per layer id. Layers missing from the map are treated as unknown.
    async fn probe(&self) -> Result<HashMap<String, bool>, FetchError>;
}

/// Availability probe backed by a JSON endpoint.
///
/// The endpoint answers with an object keyed by layer id; values are either booleans or objects
/// with an `available` boolean.
pub struct EndpointProbe {
    fetcher: Arc<dyn DataFetcher>,
    locator: String,
}

impl EndpointProbe {
    /// Creates a probe reading `locator` through `fetcher`.
    pub fn new(fetcher: Arc<dyn DataFetcher>, locator: impl Into<String>) -> Self {
        Self {
            fetcher,
            locator: locator.into(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AvailabilityProbe for EndpointProbe {
    async fn probe(&self) -> Result<HashMap<String, bool>, FetchError> {
        let document = self.fetcher.fetch_json(&self.locator).await?;
        parse_availability(&self.locator, &document)
    }
}

fn parse_availability(locator: &str, document: &Value) -> Result<HashMap<String, bool>, FetchError> {
    let Value::Object(entries) = document else {
        return Err(FetchError::decode(
            locator,
            "availability document is not an object",
        ));
    };

    let mut availability = HashMap::with_capacity(entries.len());
    for (layer_id, entry) in entries {
        let available = match entry {
            Value::Bool(available) => Some(*available),
            Value::Object(details) => details.get("available").and_then(Value::as_bool),
            _ => None,
        };

        match available {
            Some(available) => {
                availability.insert(layer_id.clone(), available);
            }
            None => log::debug!("Ignoring availability entry for {layer_id}: {entry}"),
        }
    }

    Ok(availability)
}
