//! Generative image service
//!
//! `ImageService` is the seam between the orchestrator and whatever model
//! produces images. `gemini` talks to the Gemini REST API; tests use a
//! scripted implementation.

pub mod gemini;
pub mod prompts;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::state::data::ImageData;

pub use gemini::GeminiClient;

/// One image-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text, sent after all images
    pub instruction: String,
    /// Input images, in the order the prompt refers to them
    pub references: Vec<ImageData>,
    /// Region mask, sent as PNG right after the references
    pub mask: Option<ImageData>,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn text(instruction: impl Into<String>, temperature: f32) -> Self {
        Self {
            instruction: instruction.into(),
            references: Vec::new(),
            mask: None,
            temperature,
        }
    }

    pub fn with_reference(mut self, image: ImageData) -> Self {
        self.references.push(image);
        self
    }

    pub fn with_mask(mut self, mask: Option<ImageData>) -> Self {
        self.mask = mask;
        self
    }
}

/// Result of one generation, as a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image_url: String,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn from_image(image: &ImageData) -> Self {
        Self {
            image_url: image.to_data_url(),
            mime_type: image.mime_type.clone(),
        }
    }

    /// Decoded payload, for feeding the result back into another request
    pub fn image_data(&self) -> Result<ImageData, ServiceError> {
        ImageData::from_data_url(&self.image_url).ok_or(ServiceError::BadPayload)
    }
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError>;
}

#[async_trait]
impl<T: ImageService + ?Sized> ImageService for std::sync::Arc<T> {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
        (**self).generate(request).await
    }
}
