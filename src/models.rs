//! Data models and structures
//!
//! Defines the request/response values passed between the orchestrator and
//! the generative provider, plus environment configuration.

use crate::media::MediaInput;
use crate::poll::PollPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputModality {
    Text,
    Image,
}

impl OutputModality {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputModality::Text => "TEXT",
            OutputModality::Image => "IMAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub aspect_ratio: Option<String>,
    pub modality: OutputModality,
}

/// Instruction plus attached media for one provider call. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    instruction: String,
    media: Vec<MediaInput>,
    options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(instruction: String, media: Vec<MediaInput>, options: GenerationOptions) -> Self {
        Self {
            instruction,
            media,
            options,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn media(&self) -> &[MediaInput] {
        &self.media
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }
}

/// Provider-side handle for an asynchronous video job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub done: bool,
    pub result_uri: Option<String>,
    pub error: Option<String>,
}

impl JobHandle {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            done: false,
            result_uri: None,
            error: None,
        }
    }

    pub fn completed(id: impl Into<String>, result_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            done: true,
            result_uri: Some(result_uri.into()),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            done: true,
            result_uri: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoAspect {
    Wide,
    #[default]
    Tall,
}

impl VideoAspect {
    pub fn as_ratio(&self) -> &'static str {
        match self {
            VideoAspect::Wide => "16:9",
            VideoAspect::Tall => "9:16",
        }
    }
}

impl FromStr for VideoAspect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wide" | "16:9" => Ok(VideoAspect::Wide),
            "tall" | "9:16" => Ok(VideoAspect::Tall),
            other => Err(format!(
                "Invalid aspect '{}'. Expected wide (16:9) or tall (9:16)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub resolution: String,
    pub aspect: VideoAspect,
    pub count: u32,
}

impl VideoConfig {
    pub fn new(aspect: VideoAspect) -> Self {
        Self {
            resolution: "720p".to_string(),
            aspect,
            count: 1,
        }
    }
}

/// Downloaded video bytes from a finished job.
#[derive(Debug, Clone)]
pub struct VideoClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub source_uri: String,
}

impl VideoClip {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            _ => "mp4",
        }
    }

    /// Write the clip under `dir` and return the local path.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("clip_{}.{}", Uuid::new_v4(), self.extension()));
        tokio::fs::write(&path, &self.bytes).await?;
        tracing::info!("Saved clip ({} bytes) to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

// Configuration
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upper bound for the configured poll interval and wait budget.
const MAX_POLL_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub stylist_model: String,
    pub try_on_model: String,
    pub video_model: String,
    pub stylist_thinking_budget: u32,
    pub poll_policy: PollPolicy,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn check_dotenv(loaded: dotenvy::Result<PathBuf>) -> Result<()> {
    match loaded {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let defaults = PollPolicy::default();
        let poll_policy = PollPolicy {
            interval: Duration::from_secs(parse_var(
                &lookup,
                "VIDEO_POLL_INTERVAL_SECS",
                defaults.interval.as_secs(),
            )?),
            max_polls: parse_var(&lookup, "VIDEO_MAX_POLLS", defaults.max_polls)?,
            max_wait: Duration::from_secs(parse_var(
                &lookup,
                "VIDEO_MAX_WAIT_SECS",
                defaults.max_wait.as_secs(),
            )?),
        };

        if poll_policy.max_polls == 0 {
            return Err(Error::Config("VIDEO_MAX_POLLS must be at least 1".to_string()));
        }
        for (name, value) in [
            ("VIDEO_POLL_INTERVAL_SECS", poll_policy.interval),
            ("VIDEO_MAX_WAIT_SECS", poll_policy.max_wait),
        ] {
            if value > MAX_POLL_DURATION {
                return Err(Error::Config(format!(
                    "{} must be at most {} seconds",
                    name,
                    MAX_POLL_DURATION.as_secs()
                )));
            }
        }

        Ok(Self {
            gemini_api_key,
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            stylist_model: lookup("STYLIST_MODEL")
                .unwrap_or_else(|| "gemini-3-pro-preview".to_string()),
            try_on_model: lookup("TRY_ON_MODEL")
                .unwrap_or_else(|| "gemini-3-pro-image-preview".to_string()),
            video_model: lookup("VIDEO_MODEL")
                .unwrap_or_else(|| "veo-3.1-fast-generate-preview".to_string()),
            stylist_thinking_budget: parse_var(&lookup, "STYLIST_THINKING_BUDGET", 32768)?,
            poll_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_vars(lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.stylist_model, "gemini-3-pro-preview");
        assert_eq!(config.try_on_model, "gemini-3-pro-image-preview");
        assert_eq!(config.video_model, "veo-3.1-fast-generate-preview");
        assert_eq!(config.stylist_thinking_budget, 32768);
        assert_eq!(config.poll_policy, PollPolicy::default());
    }

    #[test]
    fn test_config_falls_back_to_api_key() {
        let config = Config::from_vars(lookup_from(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.gemini_api_key, "legacy");
    }

    #[test]
    fn test_config_requires_key() {
        let err = Config::from_vars(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_poll_overrides() {
        let config = Config::from_vars(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_POLL_INTERVAL_SECS", "2"),
            ("VIDEO_MAX_POLLS", "10"),
            ("VIDEO_MAX_WAIT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.poll_policy.interval, Duration::from_secs(2));
        assert_eq!(config.poll_policy.max_polls, 10);
        assert_eq!(config.poll_policy.max_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_vars(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_MAX_POLLS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_vars(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_MAX_POLLS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_dotenv_is_ignored_but_malformed_fails() {
        let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(check_dotenv(Err(missing)).is_ok());
        assert!(check_dotenv(Ok(PathBuf::from(".env"))).is_ok());

        let malformed = dotenvy::Error::LineParse("GEMINI_API_KEY='unterminated".to_string(), 15);
        assert!(matches!(check_dotenv(Err(malformed)), Err(Error::EnvVar(_))));
    }

    #[test]
    fn test_config_rejects_oversized_durations() {
        for name in ["VIDEO_MAX_WAIT_SECS", "VIDEO_POLL_INTERVAL_SECS"] {
            let err = Config::from_vars(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                (name, "18446744073709551615"),
            ]))
            .unwrap_err();
            assert!(matches!(err, Error::Config(ref m) if m.contains(name)));
        }

        let config = Config::from_vars(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_MAX_WAIT_SECS", "86400"),
        ]))
        .unwrap();
        assert_eq!(config.poll_policy.max_wait, Duration::from_secs(86_400));
    }

    #[test]
    fn test_video_aspect_parsing() {
        assert_eq!("wide".parse::<VideoAspect>().unwrap(), VideoAspect::Wide);
        assert_eq!("9:16".parse::<VideoAspect>().unwrap(), VideoAspect::Tall);
        assert!("square".parse::<VideoAspect>().is_err());
        assert_eq!(VideoAspect::default().as_ratio(), "9:16");
    }

    #[test]
    fn test_job_handle_constructors() {
        let pending = JobHandle::pending("op-1");
        assert!(!pending.done);

        let done = JobHandle::completed("op-1", "https://files/clip");
        assert!(done.done);
        assert_eq!(done.result_uri.as_deref(), Some("https://files/clip"));

        let failed = JobHandle::failed("op-1", "safety filter");
        assert!(failed.done);
        assert!(failed.result_uri.is_none());
    }

    #[tokio::test]
    async fn test_video_clip_save_to() {
        let dir = tempfile::tempdir().unwrap();
        let clip = VideoClip {
            bytes: vec![0, 0, 0, 0x18, 0x66, 0x74, 0x79, 0x70],
            mime_type: "video/mp4".to_string(),
            source_uri: "https://files/clip".to_string(),
        };

        let path = clip.save_to(dir.path()).await.unwrap();
        assert!(path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), clip.bytes);
    }
}
