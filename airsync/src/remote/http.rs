//! HTTP JSON source backed by reqwest.

use std::marker::PhantomData;
use std::time::Duration;

use tracing::debug;

use super::RemoteSource;
use crate::error::RemoteError;
use crate::key::{GeoKey, LocationKey};
use crate::store::BoxFuture;

/// Default request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A key that can be substituted into a URL template.
pub trait UrlTemplateKey {
    /// Replace this key's placeholders in `template`.
    fn render(&self, template: &str) -> String;
}

/// Fills `{lat}` and `{lon}` with the rounded coordinates.
impl UrlTemplateKey for GeoKey {
    fn render(&self, template: &str) -> String {
        template
            .replace("{lat}", &format!("{:.2}", self.latitude()))
            .replace("{lon}", &format!("{:.2}", self.longitude()))
    }
}

/// Fills `{name}` with the location name.
impl UrlTemplateKey for LocationKey {
    fn render(&self, template: &str) -> String {
        template.replace("{name}", self.as_str())
    }
}

/// Fetches a URL rendered from the key and decodes the body as JSON.
pub struct HttpJsonSource<K> {
    name: String,
    template: String,
    client: reqwest::Client,
    _key: PhantomData<fn(&K)>,
}

impl<K: UrlTemplateKey> HttpJsonSource<K> {
    /// Create a source with its own client and the default timeout.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(
            name,
            template,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a source with its own client and a custom timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        template: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::permanent(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(name, template, client))
    }

    /// Create a source sharing an existing client.
    pub fn with_client(
        name: impl Into<String>,
        template: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            client,
            _key: PhantomData,
        }
    }

    /// The URL requested for `key`.
    pub fn url_for(&self, key: &K) -> Result<reqwest::Url, RemoteError> {
        let rendered = key.render(&self.template);
        reqwest::Url::parse(&rendered)
            .map_err(|e| RemoteError::permanent(format!("invalid URL '{}': {}", rendered, e)))
    }

    async fn fetch_json(&self, key: &K) -> Result<serde_json::Value, RemoteError> {
        let url = self.url_for(key)?;
        debug!(source = %self.name, url = %url, "Fetching");

        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        if let Some(err) = RemoteError::from_status(status) {
            return Err(err);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

impl<K> RemoteSource<K, serde_json::Value> for HttpJsonSource<K>
where
    K: UrlTemplateKey + Sync,
{
    fn fetch<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<serde_json::Value, RemoteError>> {
        Box::pin(self.fetch_json(key))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
