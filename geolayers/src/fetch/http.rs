use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use url::Url;

use crate::error::{FetchError, GeolayersError};
use crate::fetch::DataFetcher;

/// Fetches data over HTTP.
///
/// Relative locators such as `/data/fire/perimeters.geojson` are resolved against the base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    /// Creates a fetcher. `base_url` is required for relative locators.
    pub fn new(base_url: Option<&str>) -> Result<Self, GeolayersError> {
        let base_url = base_url
            .map(Url::parse)
            .transpose()
            .map_err(|err| GeolayersError::Configuration(format!("invalid base url: {err}")))?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("geolayers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GeolayersError::Configuration(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn resolve(&self, locator: &str) -> Result<Url, FetchError> {
        match Url::parse(locator) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(locator)
                    .map_err(|err| FetchError::network(locator, err)),
                None => Err(FetchError::network(
                    locator,
                    "relative locator and no base url",
                )),
            },
            Err(err) => Err(FetchError::network(locator, err)),
        }
    }
}

#[async_trait]
impl DataFetcher for HttpFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Bytes, FetchError> {
        let url = self.resolve(locator)?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::network(locator, err))?;

        let status = response.status();
        if !status.is_success() {
            info!("Failed to load {locator}: {status}");
            return Err(FetchError::http(locator, status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|err| FetchError::network(locator, err))
    }
}
