//! Image-to-video generation through Veo long-running operations.

use super::client::GeminiHttpClient;
use super::types::Operation;
use crate::ai::VideoJobService;
use crate::credentials::CredentialProvider;
use crate::media::MediaInput;
use crate::models::{JobHandle, VideoConfig};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct VideoRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    image: VideoImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: String,
    resolution: String,
    sample_count: u32,
}

pub struct GeminiVideoClient {
    http: GeminiHttpClient,
}

impl GeminiVideoClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>, model: String) -> Self {
        Self::new_with_client(credentials, model, reqwest::Client::new())
    }

    pub fn new_with_client(
        credentials: Arc<dyn CredentialProvider>,
        model: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                credentials,
                model,
                Duration::from_secs(60),
                client,
            ),
        }
    }
}

super::impl_with_gemini_base_url!(GeminiVideoClient);

#[async_trait]
impl VideoJobService for GeminiVideoClient {
    async fn start_video_job(&self, image: &MediaInput, config: &VideoConfig) -> Result<JobHandle> {
        let request = VideoRequest {
            instances: vec![VideoInstance {
                image: VideoImage {
                    bytes_base64_encoded: image.data().to_string(),
                    mime_type: image.mime_type().to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: config.aspect.as_ratio().to_string(),
                resolution: config.resolution.clone(),
                sample_count: config.count,
            },
        };

        tracing::info!(
            "Starting video generation ({}, {} {})",
            self.http.model(),
            config.resolution,
            config.aspect.as_ratio()
        );
        let operation: Operation = self.http.predict_long_running(&request).await?;
        tracing::info!("Video operation {} started", operation.name);

        Ok(operation.into())
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobHandle> {
        let operation: Operation = self.http.get_operation(&handle.id).await?;
        tracing::debug!("Video operation {} done={}", operation.name, operation.done);
        Ok(operation.into())
    }
}
