use super::{FetchedResource, ResourceFetcher};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockResourceFetcher {
    resources: Arc<Mutex<HashMap<String, FetchedResource>>>,
    fetch_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockResourceFetcher {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(Mutex::new(HashMap::new())),
            fetch_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_resource(self, uri: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.resources.lock().unwrap().insert(
            uri.to_string(),
            FetchedResource {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    pub fn get_fetch_count(&self, uri: &str) -> usize {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(uri)
            .copied()
            .unwrap_or(0)
    }

    pub fn get_total_fetch_count(&self) -> usize {
        self.fetch_counts.lock().unwrap().values().sum()
    }
}

impl Default for MockResourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceFetcher for MockResourceFetcher {
    async fn fetch_resource(&self, uri: &str) -> Result<FetchedResource> {
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_insert(0) += 1;

        self.resources
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("Failed to fetch {} (status 404)", uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_counts_per_uri() {
        let fetcher = MockResourceFetcher::new().with_resource("https://a/1", vec![1], None);

        fetcher.fetch_resource("https://a/1").await.unwrap();
        fetcher.fetch_resource("https://a/1").await.unwrap();
        assert!(fetcher.fetch_resource("https://a/2").await.is_err());

        assert_eq!(fetcher.get_fetch_count("https://a/1"), 2);
        assert_eq!(fetcher.get_fetch_count("https://a/2"), 1);
        assert_eq!(fetcher.get_total_fetch_count(), 3);
    }
}
