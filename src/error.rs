//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed or missing media input, including an unfetchable product image.
    #[error("Input error: {0}")]
    Input(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Video job did not finish after {polls} polls ({elapsed:?})")]
    PollTimeout { polls: u32, elapsed: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether the shell should offer the user another attempt with the same
    /// or adjusted inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Input(_)
                | Error::AiProvider(_)
                | Error::PollTimeout { .. }
                | Error::Fetch(_)
        )
    }

    /// Copy shown next to the retry affordance.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Input(_) => {
                "Sorry bestie, I couldn't read that image. Can you try uploading a clearer photo?"
            }
            Error::Credentials(_) => "Pick an API key to unlock the AI studio, then try again.",
            Error::PollTimeout { .. } => {
                "Your clip is taking longer than usual. Give it another go in a bit?"
            }
            Error::Cancelled => "Generation cancelled.",
            _ => {
                "Sorry bestie, I'm still improving my fashion skills! Can you try uploading a clearer photo? I promise to do better!"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
