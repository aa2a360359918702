//! Scripted image service for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{GeneratedImage, GenerationRequest, ImageService};
use crate::error::ServiceError;
use crate::state::data::ImageData;

/// Replies from a queue (successes once it runs dry) and records every request.
/// A gated service holds each call until `release` is called.
#[derive(Debug, Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<GeneratedImage, ServiceError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    gate: Option<Semaphore>,
}

pub fn sample_image(tag: u8) -> GeneratedImage {
    GeneratedImage::from_image(&ImageData::new(vec![tag; 4], "image/png"))
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, image: GeneratedImage) {
        self.replies.lock().unwrap().push_back(Ok(image));
    }

    pub fn push_err(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ServiceError::Status {
                status: 500,
                body: "scripted failure".into(),
            }));
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageService for ScriptedService {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_image(call as u8)));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        reply
    }
}
