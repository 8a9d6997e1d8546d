use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::TextGenerationService;
use crate::credentials::CredentialProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ChatGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// Stylist chat backed by a Gemini reasoning model.
pub struct GeminiStylistClient {
    http: GeminiHttpClient,
    thinking_budget: Option<u32>,
}

impl GeminiStylistClient {
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
                Duration::from_secs(120),
                client,
            ),
            thinking_budget: None,
        }
    }

    /// Token budget the model may spend reasoning before it answers.
    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget).filter(|b| *b > 0);
        self
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let texts: Vec<&str> = response
            .first_parts()
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

super::impl_with_gemini_base_url!(GeminiStylistClient);

#[async_trait]
impl TextGenerationService for GeminiStylistClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: ChatGenerationConfig {
                thinking_config: self.thinking_budget.map(|thinking_budget| ThinkingConfig {
                    thinking_budget,
                }),
            },
        };

        tracing::debug!("Sending stylist request to Gemini ({})", self.http.model());
        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        Self::extract_text(&response)
            .ok_or_else(|| Error::AiProvider("No text in Gemini stylist response".to_string()))
    }
}
