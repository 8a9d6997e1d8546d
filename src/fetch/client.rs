use super::{FetchedResource, ResourceFetcher};
use crate::credentials::CredentialProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Plain HTTP GET fetcher.
///
/// URIs under `authorized_prefix` get the provider API key attached, which is
/// how finished video files are downloaded.
pub struct HttpResourceFetcher {
    client: Client,
    timeout: Duration,
    credentials: Option<(String, Arc<dyn CredentialProvider>)>,
}

impl HttpResourceFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            credentials: None,
        }
    }

    pub fn with_credentials(
        mut self,
        authorized_prefix: String,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        self.credentials = Some((authorized_prefix, credentials));
        self
    }

    fn api_key_for(&self, uri: &str) -> Option<String> {
        self.credentials
            .as_ref()
            .filter(|(prefix, _)| uri.starts_with(prefix.as_str()))
            .and_then(|(_, creds)| creds.api_key())
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch_resource(&self, uri: &str) -> Result<FetchedResource> {
        let url = reqwest::Url::parse(uri)
            .map_err(|e| Error::Fetch(format!("Invalid resource URL '{}': {}", uri, e)))?;

        tracing::debug!("Fetching resource {}", url);

        let mut request = self.client.get(url).timeout(self.timeout);
        if let Some(api_key) = self.api_key_for(uri) {
            request = request.header("x-goog-api-key", api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to fetch {}: {}", uri, e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Fetching {} failed with status {}", uri, status);
            return Err(Error::Fetch(format!(
                "Failed to fetch {} (status {})",
                uri, status
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!("Fetched {} bytes from {}", bytes.len(), uri);

        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }
}
