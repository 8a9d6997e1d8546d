use crate::credentials::CredentialProvider;
use crate::models::DEFAULT_GEMINI_BASE_URL;
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Lightweight Gemini REST client used by the stylist, composite and video modules.
///
/// The API key is read from the credential provider on every request.
pub struct GeminiHttpClient {
    pub(crate) client: Client,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    pub(crate) base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example `gemini-3-pro-preview`),
    /// a `models/...`-prefixed ID is also accepted.
    pub fn new(credentials: Arc<dyn CredentialProvider>, model: String, timeout: Duration) -> Self {
        Self::new_with_client(credentials, model, timeout, Client::new())
    }

    pub fn new_with_client(
        credentials: Arc<dyn CredentialProvider>,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            credentials,
            model,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<String> {
        self.credentials
            .api_key()
            .ok_or_else(|| Error::Credentials("No Gemini API key selected".to_string()))
    }

    async fn send<Resp: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Resp> {
        let response = request
            .timeout(self.timeout)
            .header("x-goog-api-key", self.api_key()?)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                Error::AiProvider(format!("Failed to reach Gemini: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|e| {
                tracing::warn!("Failed to read Gemini error body: {}", e);
                String::new()
            });
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read Gemini response body: {}", e);
            Error::AiProvider(format!("Failed to read Gemini response: {}", e))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Gemini response: {}", e))
        })
    }

    async fn post_to_url<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        url: String,
        request: &Req,
    ) -> Result<Resp> {
        self.send(
            self.client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(request),
        )
        .await
    }

    /// Calls Gemini's `generateContent` endpoint for text and image requests.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        self.post_to_url(url, request).await
    }

    /// Starts a long-running generation (video) and returns the operation.
    pub async fn predict_long_running<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.base_url, self.model
        );
        self.post_to_url(url, request).await
    }

    /// Fetches the current state of a long-running operation by its full name.
    pub async fn get_operation<Resp: DeserializeOwned>(&self, name: &str) -> Result<Resp> {
        let url = format!("{}/v1beta/{}", self.base_url, name.trim_start_matches('/'));
        self.send(self.client.get(&url)).await
    }
}
