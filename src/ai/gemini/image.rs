use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::ImageCompositeService;
use crate::credentials::CredentialProvider;
use crate::media::MediaInput;
use crate::models::GenerationRequest;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

/// Multi-image compositing (virtual try-on) through a Gemini image model.
pub struct GeminiCompositeClient {
    http: GeminiHttpClient,
}

impl GeminiCompositeClient {
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
                Duration::from_secs(180),
                client,
            ),
        }
    }

    fn build_request(request: &GenerationRequest) -> ImageRequest {
        let mut parts = vec![Part::Text {
            text: request.instruction().to_string(),
        }];
        parts.extend(request.media().iter().map(|media| Part::InlineData {
            inline_data: InlineData {
                mime_type: media.mime_type().to_string(),
                data: media.data().to_string(),
            },
        }));

        let options = request.options();
        ImageRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec![options.modality.as_str().to_string()],
                image_config: options.aspect_ratio.as_ref().map(|aspect_ratio| ImageConfig {
                    aspect_ratio: aspect_ratio.clone(),
                }),
            },
        }
    }
}

super::impl_with_gemini_base_url!(GeminiCompositeClient);

#[async_trait]
impl ImageCompositeService for GeminiCompositeClient {
    async fn generate_composite(&self, request: &GenerationRequest) -> Result<Vec<MediaInput>> {
        let body = Self::build_request(request);

        tracing::debug!(
            "Sending composite request to Gemini ({}) with {} images",
            self.http.model(),
            request.media().len()
        );
        let response: GenerateContentResponse = self.http.generate_content(&body).await?;

        let images: Vec<MediaInput> = response
            .first_parts()
            .iter()
            .filter_map(|p| match p {
                Part::InlineData { inline_data } => Some(MediaInput::from_parts(
                    inline_data.mime_type.clone(),
                    inline_data.data.clone(),
                )),
                _ => None,
            })
            .collect();

        tracing::debug!("Gemini returned {} image parts", images.len());
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use crate::credentials::StaticCredentials;
    use crate::models::{GenerationOptions, OutputModality};
    use crate::Error;
    use wiremock::matchers::body_string_contains;
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

    fn make_client(server: &MockServer) -> GeminiCompositeClient {
        GeminiCompositeClient::new(
            Arc::new(StaticCredentials::new("key".to_string())),
            DEFAULT_MODEL.to_string(),
        )
        .with_base_url(server.uri())
    }

    fn try_on_request() -> GenerationRequest {
        GenerationRequest::new(
            "Put the jacket on the person".to_string(),
            vec![
                MediaInput::from_parts("image/jpeg", "dXNlcg=="),
                MediaInput::from_parts("image/webp", "cHJvZHVjdA=="),
            ],
            GenerationOptions {
                aspect_ratio: Some("3:4".to_string()),
                modality: OutputModality::Image,
            },
        )
    }

    #[tokio::test]
    async fn test_generate_composite_parses_inline_data() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here is the fit" },
                            { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let images = make_client(&server)
            .generate_composite(&try_on_request())
            .await
            .unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type(), "image/png");
        assert_eq!(images[0].data(), "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_request_carries_instruction_images_and_aspect_ratio() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("\"aspectRatio\":\"3:4\""))
            .and(body_string_contains("\"responseModalities\":[\"IMAGE\"]"))
            .and(body_string_contains(
                "{\"inlineData\":{\"mimeType\":\"image/jpeg\",\"data\":\"dXNlcg==\"}}",
            ))
            .and(body_string_contains(
                "{\"inlineData\":{\"mimeType\":\"image/webp\",\"data\":\"cHJvZHVjdA==\"}}",
            ))
            .and(body_string_contains("Put the jacket on the person"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "inlineData": { "mimeType": "image/png", "data": "AA==" } }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server)
            .generate_composite(&try_on_request())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_text_only_response_yields_no_images() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I can't edit photos of people" }] }
                }]
            })))
            .mount(&server)
            .await;

        let images = make_client(&server)
            .generate_composite(&try_on_request())
            .await
            .unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_returns_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_composite(&try_on_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_returns_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_composite(&try_on_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
