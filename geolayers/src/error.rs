//! Error types used by the crate.

use thiserror::Error;

/// Geolayers error type.
#[derive(Debug, Error)]
pub enum GeolayersError {
    /// Layer or category declaration is malformed or incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Layer data could not be loaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Raster payload is corrupt, empty or has zero dimensions.
    #[error("failed to decode raster: {0}")]
    RasterDecode(String),
    /// A toggle arrived while the layer was still loading.
    #[error("layer {0} is still loading")]
    ToggleRaceRejected(String),
    /// No layer with the given id is known.
    #[error("unknown layer: {0}")]
    UnknownLayer(String),
    /// A component was set up with invalid or missing parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The map engine refused an operation.
    #[error("map engine error: {0}")]
    Engine(String),
    /// Image encoding error.
    #[error("image encode error: {0:?}")]
    Image(#[from] image::ImageError),
}

impl From<tiff::TiffError> for GeolayersError {
    fn from(value: tiff::TiffError) -> Self {
        Self::RasterDecode(value.to_string())
    }
}

/// Problems in the layer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Two layers share the same id.
    #[error("duplicate layer id: {0}")]
    DuplicateLayer(String),
    /// Two categories share the same id.
    #[error("duplicate category id: {0}")]
    DuplicateCategory(String),
    /// A field required for the layer's geometry kind is missing.
    #[error("layer {layer}: missing required field {field}")]
    MissingField {
        /// Layer id.
        layer: String,
        /// Dotted path of the missing field.
        field: String,
    },
    /// A layer declaration could not be interpreted.
    #[error("layer {layer}: {message}")]
    Malformed {
        /// Layer id, or a positional description if the id itself is unreadable.
        layer: String,
        /// Description of the problem.
        message: String,
    },
    /// A color rule is invalid.
    #[error("invalid color rule: {0}")]
    InvalidColorRule(String),
    /// The configuration document as a whole could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn missing(layer: &str, field: &str) -> Self {
        Self::MissingField {
            layer: layer.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn malformed(layer: &str, message: impl ToString) -> Self {
        Self::Malformed {
            layer: layer.to_owned(),
            message: message.to_string(),
        }
    }
}

/// Kind of a [`FetchError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Server answered with a non-2xx status.
    Http,
    /// Request did not reach the server or the connection failed.
    Network,
    /// Data was received but could not be parsed.
    Decode,
}

/// Failure to load data from a locator.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    locator: String,
    status: Option<u16>,
    kind: FetchErrorKind,
    message: String,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to fetch {}", self.locator)?;
        if let Some(status) = self.status {
            write!(f, " (status {status})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Non-2xx answer from the server.
    pub fn http(locator: impl Into<String>, status: u16) -> Self {
        Self {
            locator: locator.into(),
            status: Some(status),
            kind: FetchErrorKind::Http,
            message: "unexpected response status".into(),
        }
    }

    /// Connection level failure.
    pub fn network(locator: impl Into<String>, message: impl ToString) -> Self {
        Self {
            locator: locator.into(),
            status: None,
            kind: FetchErrorKind::Network,
            message: message.to_string(),
        }
    }

    /// Payload could not be parsed.
    pub fn decode(locator: impl Into<String>, message: impl ToString) -> Self {
        Self {
            locator: locator.into(),
            status: None,
            kind: FetchErrorKind::Decode,
            message: message.to_string(),
        }
    }

    /// Locator the request was made for.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Kind of the failure.
    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_message_includes_status() {
        let error = FetchError::http("/data/fire.geojson", 404);
        assert_eq!(
            error.to_string(),
            "failed to fetch /data/fire.geojson (status 404): unexpected response status"
        );

        let error = FetchError::network("/data/fire.geojson", "connection refused");
        assert_eq!(
            error.to_string(),
            "failed to fetch /data/fire.geojson: connection refused"
        );
    }
}
