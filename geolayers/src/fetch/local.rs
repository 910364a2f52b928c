use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::fetch::DataFetcher;

const DATA_PREFIX: &str = "/data/";

/// Reads data from a local directory, the way the data server maps `/data/...` paths.
///
/// Missing files are reported as HTTP 404 and paths escaping the directory as HTTP 403.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    data_dir: PathBuf,
}

impl LocalFetcher {
    /// Creates a fetcher serving files under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf, FetchError> {
        let relative = locator
            .strip_prefix(DATA_PREFIX)
            .unwrap_or_else(|| locator.trim_start_matches('/'));
        let relative = Path::new(relative);

        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(FetchError::http(locator, 403));
        }

        Ok(self.data_dir.join(relative))
    }
}

#[async_trait]
impl DataFetcher for LocalFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Bytes, FetchError> {
        let path = self.resolve(locator)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("File {} for {locator} does not exist", path.display());
                Err(FetchError::http(locator, 404))
            }
            Err(err) => Err(FetchError::network(locator, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchErrorKind;

    fn data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geolayers-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("boundaries")).unwrap();
        dir
    }

    #[test]
    fn reads_files_under_data_dir() {
        let dir = data_dir("read");
        std::fs::write(dir.join("boundaries/treaty.geojson"), b"{}").unwrap();

        let fetcher = LocalFetcher::new(&dir);
        let bytes =
            tokio_test::block_on(fetcher.fetch_bytes("/data/boundaries/treaty.geojson")).unwrap();
        assert_eq!(&bytes[..], b"{}");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = data_dir("missing");
        let fetcher = LocalFetcher::new(&dir);

        let error =
            tokio_test::block_on(fetcher.fetch_bytes("/data/boundaries/none.geojson")).unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::Http);
        assert_eq!(error.status(), Some(404));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn parent_components_are_forbidden() {
        let fetcher = LocalFetcher::new("/srv/data");
        let error = fetcher.resolve("/data/../secrets.txt").unwrap_err();
        assert_eq!(error.status(), Some(403));
    }
}
