//! Generative provider integration
//!
//! Capability traits for styling text, garment compositing and video jobs,
//! with Gemini REST implementations and in-memory mocks.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiCompositeClient, GeminiStylistClient, GeminiVideoClient};
pub use mock::{MockCompositeClient, MockTextClient, MockVideoJobClient};

use crate::media::MediaInput;
use crate::models::{GenerationRequest, JobHandle, VideoConfig};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait ImageCompositeService: Send + Sync {
    /// Returns every inline image part of the response; may be empty.
    async fn generate_composite(&self, request: &GenerationRequest) -> Result<Vec<MediaInput>>;
}

#[async_trait]
pub trait VideoJobService: Send + Sync {
    async fn start_video_job(&self, image: &MediaInput, config: &VideoConfig) -> Result<JobHandle>;
    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobHandle>;
}
