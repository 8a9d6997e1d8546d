//! Provider credential selection
//!
//! Privileged calls (try-on compositing, video generation) ask a
//! [`CredentialProvider`] to make sure a key is authorized, then read the
//! current key on every request so a freshly selected key takes effect
//! without rebuilding any client.

use crate::Result;
use async_trait::async_trait;
use tokio::sync::watch;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Make sure a credential is available, running any selection flow the
    /// host shell offers. Returns `false` when the user declined.
    async fn ensure_authorized(&self) -> Result<bool>;

    /// The most recently authorized API key.
    fn api_key(&self) -> Option<String>;
}

/// Fixed key read once from configuration.
pub struct StaticCredentials {
    api_key: String,
}

impl StaticCredentials {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn ensure_authorized(&self) -> Result<bool> {
        Ok(!self.api_key.trim().is_empty())
    }

    fn api_key(&self) -> Option<String> {
        Some(self.api_key.clone()).filter(|key| !key.trim().is_empty())
    }
}

/// Key chosen at runtime by the surrounding shell.
///
/// Every change is broadcast to receivers from [`subscribe`](Self::subscribe).
pub struct SelectableCredentials {
    current: watch::Sender<Option<String>>,
}

impl SelectableCredentials {
    pub fn new(initial: Option<String>) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn select_key(&self, api_key: String) {
        tracing::info!("Provider API key selected");
        self.current.send_replace(Some(api_key));
    }

    pub fn clear(&self) {
        tracing::info!("Provider API key cleared");
        self.current.send_replace(None);
    }

    /// Receiver notified whenever the selected key changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }
}

impl Default for SelectableCredentials {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl CredentialProvider for SelectableCredentials {
    async fn ensure_authorized(&self) -> Result<bool> {
        let authorized = self.current.borrow().is_some();
        if !authorized {
            tracing::warn!("No provider API key selected");
        }
        Ok(authorized)
    }

    fn api_key(&self) -> Option<String> {
        self.current.borrow().clone()
    }
}
