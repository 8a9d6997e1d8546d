//! Remote resource retrieval
//!
//! Used to ingest remote product images and to download finished video clips.

pub mod client;
pub mod mock;

pub use client::HttpResourceFetcher;
pub use mock::MockResourceFetcher;

use crate::Result;
use async_trait::async_trait;

/// Bytes of a fetched resource plus the Content-Type the server declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_resource(&self, uri: &str) -> Result<FetchedResource>;
}
