//! Request orchestration for the stylist, virtual try-on and animated clips.
//!
//! Turns UI-level requests into provider calls and shapes the responses into
//! displayable results. Nothing is cached between calls: every invocation
//! prepares its own inputs and owns its own job handle.

use crate::ai::{
    GeminiCompositeClient, GeminiStylistClient, GeminiVideoClient, ImageCompositeService,
    TextGenerationService, VideoJobService,
};
use crate::credentials::{CredentialProvider, StaticCredentials};
use crate::fetch::{HttpResourceFetcher, ResourceFetcher};
use crate::media::{MediaInput, ProductImage};
use crate::models::{
    Config, GenerationOptions, GenerationRequest, OutputModality, VideoAspect, VideoClip,
    VideoConfig,
};
use crate::poll::{self, PollPolicy};
use crate::{prompts, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Returned when the stylist answers with no text.
pub const EMPTY_ADVICE_FALLBACK: &str = "Sorry bestie, my connection is a bit glitched. Try again?";
/// Returned when the stylist call fails.
pub const ADVICE_ERROR_FALLBACK: &str = "My neural networks are tangling. Can't style right now!";

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

pub struct Orchestrator {
    text: Box<dyn TextGenerationService>,
    composite: Box<dyn ImageCompositeService>,
    video: Box<dyn VideoJobService>,
    fetcher: Box<dyn ResourceFetcher>,
    credentials: Arc<dyn CredentialProvider>,
    poll_policy: PollPolicy,
}

/// Injectable service bundle used to construct [`Orchestrator`] in tests/harnesses.
pub struct OrchestratorServices {
    pub text: Box<dyn TextGenerationService>,
    pub composite: Box<dyn ImageCompositeService>,
    pub video: Box<dyn VideoJobService>,
    pub fetcher: Box<dyn ResourceFetcher>,
    pub credentials: Arc<dyn CredentialProvider>,
}

impl Orchestrator {
    pub fn with_services(services: OrchestratorServices, poll_policy: PollPolicy) -> Self {
        Self {
            text: services.text,
            composite: services.composite,
            video: services.video,
            fetcher: services.fetcher,
            credentials: services.credentials,
            poll_policy,
        }
    }

    /// Build Gemini-backed services using the configured API key.
    pub fn from_config(config: &Config) -> Self {
        let credentials: Arc<dyn CredentialProvider> =
            Arc::new(StaticCredentials::new(config.gemini_api_key.clone()));
        Self::from_config_with_credentials(config, credentials)
    }

    /// Build Gemini-backed services reading keys from `credentials`, for shells
    /// that let the user pick a key at runtime.
    pub fn from_config_with_credentials(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Stylist model: {}", config.stylist_model);
        info!("Try-on model: {}", config.try_on_model);
        info!("Video model: {}", config.video_model);

        let text = GeminiStylistClient::new_with_client(
            credentials.clone(),
            config.stylist_model.clone(),
            http_client.clone(),
        )
        .with_thinking_budget(config.stylist_thinking_budget)
        .with_base_url(config.gemini_base_url.clone());

        let composite = GeminiCompositeClient::new_with_client(
            credentials.clone(),
            config.try_on_model.clone(),
            http_client.clone(),
        )
        .with_base_url(config.gemini_base_url.clone());

        let video = GeminiVideoClient::new_with_client(
            credentials.clone(),
            config.video_model.clone(),
            http_client.clone(),
        )
        .with_base_url(config.gemini_base_url.clone());

        let fetcher = HttpResourceFetcher::new(http_client, Duration::from_secs(120))
            .with_credentials(
                config.gemini_base_url.trim_end_matches('/').to_string(),
                credentials.clone(),
            );

        Self::with_services(
            OrchestratorServices {
                text: Box::new(text),
                composite: Box::new(composite),
                video: Box::new(video),
                fetcher: Box::new(fetcher),
                credentials,
            },
            config.poll_policy,
        )
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    async fn ensure_authorized(&self) -> Result<()> {
        if self.credentials.ensure_authorized().await? {
            Ok(())
        } else {
            Err(Error::Credentials(
                "No API key authorized for premium generation".to_string(),
            ))
        }
    }

    /// Ask the stylist persona for advice. Never fails: provider errors and
    /// empty answers resolve to fixed fallback messages.
    pub async fn get_styling_advice(&self, query: &str, context: &str) -> String {
        let prompt = prompts::stylist_prompt(query, context);

        match self.text.generate_text(&prompt).await {
            Ok(advice) if !advice.trim().is_empty() => {
                info!("Stylist answered ({} chars)", advice.len());
                advice
            }
            Ok(_) => {
                warn!("Stylist returned an empty answer, using fallback");
                EMPTY_ADVICE_FALLBACK.to_string()
            }
            Err(e) => {
                error!("Styling error: {}", e);
                ADVICE_ERROR_FALLBACK.to_string()
            }
        }
    }

    /// Render `user_photo` wearing the product.
    ///
    /// `description` only disambiguates material and fit; the product image is
    /// the visual source of truth.
    pub async fn generate_composite(
        &self,
        user_photo: &MediaInput,
        product_image: &ProductImage,
        description: &str,
    ) -> Result<MediaInput> {
        if user_photo.is_empty() {
            return Err(Error::Input("User photo is empty".to_string()));
        }

        self.ensure_authorized().await?;

        let product = self.resolve_product_image(product_image).await?;
        if product.is_empty() {
            return Err(Error::Input("Product image is empty".to_string()));
        }

        let request = GenerationRequest::new(
            prompts::try_on_prompt(description),
            vec![user_photo.clone(), product],
            GenerationOptions {
                aspect_ratio: Some(prompts::TRY_ON_ASPECT_RATIO.to_string()),
                modality: OutputModality::Image,
            },
        );

        info!(
            "Requesting try-on composite (user {}, product {})",
            request.media()[0].mime_type(),
            request.media()[1].mime_type()
        );

        let images = self.composite.generate_composite(&request).await.map_err(|e| {
            error!("Try-on error: {}", e);
            e
        })?;

        let composite = Self::first_image(images)?;
        info!("Try-on composite ready ({})", composite.mime_type());
        Ok(composite)
    }

    async fn resolve_product_image(&self, product_image: &ProductImage) -> Result<MediaInput> {
        match product_image {
            ProductImage::Encoded(media) => Ok(media.clone()),
            ProductImage::Url(url) => {
                info!("Fetching product image {}", url);
                let resource = self.fetcher.fetch_resource(url).await.map_err(|e| {
                    error!("Error converting product image URL: {}", e);
                    Error::Input(format!("Could not fetch product image {}: {}", url, e))
                })?;
                Ok(MediaInput::from_fetched(&resource))
            }
        }
    }

    /// Validate the first returned image part.
    fn first_image(images: Vec<MediaInput>) -> Result<MediaInput> {
        let image = images.into_iter().next().ok_or_else(|| {
            error!("Try-on response contained no image");
            Error::AiProvider("No image generated".to_string())
        })?;

        let bytes = image
            .decode()
            .map_err(|e| Error::AiProvider(format!("Generated image is malformed: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::AiProvider("Generated image is empty".to_string()));
        }

        if image.mime_type().starts_with("image/") {
            Ok(image)
        } else {
            warn!(
                "Generated image declared as {}, detecting format from bytes",
                image.mime_type()
            );
            Ok(MediaInput::from_bytes(&bytes))
        }
    }

    /// Animate `source` into a short clip.
    ///
    /// Starts a provider job, polls it under the configured [`PollPolicy`] and
    /// downloads the finished video. `cancel` is honored at every suspension
    /// point.
    pub async fn generate_animated_clip(
        &self,
        source: &MediaInput,
        aspect: VideoAspect,
        cancel: &CancellationToken,
    ) -> Result<VideoClip> {
        if source.is_empty() {
            return Err(Error::Input("Source image is empty".to_string()));
        }

        self.ensure_authorized().await?;

        let config = VideoConfig::new(aspect);
        info!("Starting video generation...");
        let handle = poll::start_job(self.video.start_video_job(source, &config), cancel)
            .await
            .map_err(|e| {
                error!("Video error: {}", e);
                e
            })?;

        info!("Video operation {} started. Polling...", handle.id);
        let handle = poll::wait_for_job(self.video.as_ref(), handle, &self.poll_policy, cancel)
            .await?;

        let uri = handle.result_uri.ok_or_else(|| {
            error!("Video job {} finished without a video URI", handle.id);
            Error::AiProvider("Video generation failed: No URI returned.".to_string())
        })?;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = self.fetcher.fetch_resource(&uri) => fetched,
        };
        let resource = fetched.map_err(|e| {
            error!("Video download failed: {}", e);
            Error::AiProvider(format!("Could not download generated video: {}", e))
        })?;

        if resource.bytes.is_empty() {
            return Err(Error::AiProvider(
                "Generated video download was empty".to_string(),
            ));
        }

        let mime_type = resource
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| ct.starts_with("video/"))
            .unwrap_or(DEFAULT_VIDEO_MIME)
            .to_string();

        info!("Video ready ({} bytes, {})", resource.bytes.len(), mime_type);
        Ok(VideoClip {
            bytes: resource.bytes,
            mime_type,
            source_uri: uri,
        })
    }
}
