//! Shared Gemini payload types used across stylist, composite and video modules.

use crate::models::JobHandle;
use serde::{Deserialize, Serialize};

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Untagged union of text and inline media content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding. `Other` absorbs
/// parts this crate does not consume (thought signatures, function calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    #[serde(skip_serializing)]
    Other(serde_json::Value),
}

/// Base64 inline payload used for image requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate completion item returned by Gemini.
#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate, empty when the candidate was blocked.
    pub fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

/// Long-running operation returned by `predictLongRunning` and operation polls.
#[derive(Debug, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub response: Option<OperationResponse>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedSample {
    pub video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
pub struct VideoFile {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
}

impl From<Operation> for JobHandle {
    fn from(operation: Operation) -> Self {
        let video = operation
            .response
            .and_then(|response| response.generate_video_response);

        let result_uri = video.as_ref().and_then(|v| {
            v.generated_samples
                .iter()
                .find_map(|sample| sample.video.as_ref().and_then(|f| f.uri.clone()))
        });

        let error = match operation.error {
            Some(err) => Some(match err.code {
                Some(code) => format!("{} (code {})", err.message, code),
                None => err.message,
            }),
            None => video
                .filter(|v| result_uri.is_none() && !v.rai_media_filtered_reasons.is_empty())
                .map(|v| v.rai_media_filtered_reasons.join("; ")),
        };

        JobHandle {
            id: operation.name,
            done: operation.done,
            result_uri,
            error,
        }
    }
}
