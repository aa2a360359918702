//! Gemini `generateContent` client.
//!
//! Every request asks for an image-only response with a random seed. Parts
//! are sent as reference images, then the optional mask, then the prompt.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{GeneratedImage, GenerationRequest, ImageService};
use crate::config::StudioConfig;
use crate::error::ServiceError;
use crate::state::data::ImageData;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    temperature: f32,
    seed: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn image(image: &ImageData, mime_type: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: image.to_base64(),
            }),
        }
    }
}

fn build_body(request: &GenerationRequest, seed: u32) -> GenerateContentRequest {
    let mut parts: Vec<Part> = request
        .references
        .iter()
        .map(|image| Part::image(image, &image.mime_type))
        .collect();
    if let Some(mask) = &request.mask {
        parts.push(Part::image(mask, "image/png"));
    }
    parts.push(Part::text(request.instruction.clone()));

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE"],
            temperature: request.temperature,
            seed,
        },
    }
}

/// First inline image of the first candidate
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, ServiceError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .find_map(|part| part.inline_data)
        })
        .ok_or(ServiceError::NoImage)?;

    let bytes = general_purpose::STANDARD
        .decode(inline.data.trim())
        .map_err(|_| ServiceError::BadPayload)?;
    Ok(GeneratedImage::from_image(&ImageData::new(bytes, inline.mime_type)))
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        debug!(model = %model, url = %base_url, "Created Gemini client");
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ServiceError::MissingApiKey)?;
        Ok(Self::new(
            api_key,
            config.model.clone(),
            config.api_base_url.clone(),
        ))
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ImageService for GeminiClient {
    #[instrument(
        skip(self, request),
        fields(
            model = %self.model,
            images = request.references.len(),
            masked = request.mask.is_some()
        )
    )]
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
        let seed = rand::rng().random_range(0..1_000_000);
        let body = build_body(&request, seed);

        debug!(seed, temperature = request.temperature, "Sending request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| error!(error = ?e, "HTTP request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %body, "API error");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .inspect_err(|e| error!(error = ?e, "Failed to parse response"))?;

        extract_image(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn png() -> ImageData {
        ImageData::new(vec![1, 2, 3], "image/png")
    }

    #[test]
    fn test_body_orders_images_mask_then_text() {
        let request = GenerationRequest::text("make it rain", 0.5)
            .with_reference(ImageData::new(vec![9], "image/jpeg"))
            .with_mask(Some(png()));
        let body = serde_json::to_value(build_body(&request, 42)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(parts[2]["text"], "make it rain");
        assert!(parts[2].get("inlineData").is_none());

        let config = &body["generationConfig"];
        assert_eq!(config["responseModalities"], json!(["IMAGE"]));
        assert_eq!(config["temperature"], 0.5);
        assert_eq!(config["seed"], 42);
    }

    #[test]
    fn test_extract_first_inline_image() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                ]}
            }]
        }))
        .unwrap();

        let image = extract_image(response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.image_url, "data:image/png;base64,AQID");
        assert_eq!(image.image_data().unwrap(), png());
    }

    #[test]
    fn test_response_without_image() {
        let text_only: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }]
        }))
        .unwrap();
        assert!(matches!(extract_image(text_only), Err(ServiceError::NoImage)));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(extract_image(empty), Err(ServiceError::NoImage)));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(
            "k".into(),
            DEFAULT_MODEL.into(),
            format!("{DEFAULT_BASE_URL}/"),
        );
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }
}
