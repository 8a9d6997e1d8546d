use super::{ImageCompositeService, TextGenerationService, VideoJobService};
use crate::media::MediaInput;
use crate::models::{GenerationRequest, JobHandle, VideoConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// 1x1 PNG returned when no composite response is configured.
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Clone)]
pub struct MockTextClient {
    responses: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    fail: bool,
}

impl MockTextClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail: false,
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockTextClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerationService for MockTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail {
            return Err(Error::AiProvider("Mock provider quota exceeded".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("Pair it with wide-leg cargos and chunky sneakers for a brunch fit.".to_string())
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockCompositeClient {
    responses: Arc<Mutex<Vec<Vec<MediaInput>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    call_count: Arc<Mutex<usize>>,
    fail: bool,
}

impl MockCompositeClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail: false,
        }
    }

    pub fn with_image_response(self, image: MediaInput) -> Self {
        self.responses.lock().unwrap().push(vec![image]);
        self
    }

    /// Respond with a text-only answer that carries no image part.
    pub fn without_image(self) -> Self {
        self.responses.lock().unwrap().push(Vec::new());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockCompositeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageCompositeService for MockCompositeClient {
    async fn generate_composite(&self, request: &GenerationRequest) -> Result<Vec<MediaInput>> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(Error::AiProvider(
                "Mock provider error (status 500)".to_string(),
            ));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(vec![MediaInput::from_bytes(TINY_PNG)])
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockVideoJobClient {
    pending_polls: usize,
    never_completes: bool,
    completes_on_start: bool,
    result_uri: Option<String>,
    job_error: Option<String>,
    fail_start: bool,
    fail_poll: bool,
    start_count: Arc<Mutex<usize>>,
    poll_count: Arc<Mutex<usize>>,
    in_flight: Arc<Mutex<usize>>,
    max_in_flight: Arc<Mutex<usize>>,
    seen_configs: Arc<Mutex<Vec<VideoConfig>>>,
}

impl MockVideoJobClient {
    pub const DEFAULT_RESULT_URI: &'static str = "https://mock-video.example.com/clip.mp4";

    pub fn new() -> Self {
        Self {
            pending_polls: 0,
            never_completes: false,
            completes_on_start: false,
            result_uri: Some(Self::DEFAULT_RESULT_URI.to_string()),
            job_error: None,
            fail_start: false,
            fail_poll: false,
            start_count: Arc::new(Mutex::new(0)),
            poll_count: Arc::new(Mutex::new(0)),
            in_flight: Arc::new(Mutex::new(0)),
            max_in_flight: Arc::new(Mutex::new(0)),
            seen_configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report `done = false` for the first `n` polls.
    pub fn with_pending_polls(mut self, n: usize) -> Self {
        self.pending_polls = n;
        self
    }

    pub fn never_completes(mut self) -> Self {
        self.never_completes = true;
        self
    }

    pub fn completes_on_start(mut self) -> Self {
        self.completes_on_start = true;
        self
    }

    pub fn with_result_uri(mut self, uri: &str) -> Self {
        self.result_uri = Some(uri.to_string());
        self
    }

    /// Finish the job without any video locator.
    pub fn without_result_uri(mut self) -> Self {
        self.result_uri = None;
        self
    }

    pub fn with_job_error(mut self, message: &str) -> Self {
        self.job_error = Some(message.to_string());
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn with_poll_failure(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    pub fn get_start_count(&self) -> usize {
        *self.start_count.lock().unwrap()
    }

    pub fn get_poll_count(&self) -> usize {
        *self.poll_count.lock().unwrap()
    }

    pub fn get_max_concurrent_polls(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }

    pub fn get_seen_configs(&self) -> Vec<VideoConfig> {
        self.seen_configs.lock().unwrap().clone()
    }

    fn terminal(&self, id: &str) -> JobHandle {
        match (&self.job_error, &self.result_uri) {
            (Some(message), _) => JobHandle::failed(id, message.clone()),
            (None, Some(uri)) => JobHandle::completed(id, uri.clone()),
            (None, None) => JobHandle {
                id: id.to_string(),
                done: true,
                result_uri: None,
                error: None,
            },
        }
    }
}

impl Default for MockVideoJobClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoJobService for MockVideoJobClient {
    async fn start_video_job(&self, _image: &MediaInput, config: &VideoConfig) -> Result<JobHandle> {
        let job_number = {
            let mut count = self.start_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.seen_configs.lock().unwrap().push(config.clone());

        if self.fail_start {
            return Err(Error::AiProvider(
                "Mock video start rejected (status 403)".to_string(),
            ));
        }

        let id = format!("operations/mock-{}", job_number);
        if self.completes_on_start {
            Ok(self.terminal(&id))
        } else {
            Ok(JobHandle::pending(id))
        }
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobHandle> {
        let poll_number = {
            let mut count = self.poll_count.lock().unwrap();
            *count += 1;
            *count
        };
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*in_flight);
        }

        tokio::task::yield_now().await;

        *self.in_flight.lock().unwrap() -= 1;

        if self.fail_poll {
            return Err(Error::AiProvider(
                "Mock operation lookup failed (status 503)".to_string(),
            ));
        }

        if self.never_completes || poll_number <= self.pending_polls {
            Ok(JobHandle::pending(handle.id.clone()))
        } else {
            Ok(self.terminal(&handle.id))
        }
    }
}
