//! Scene and edit orchestration
//!
//! Drives every generation request through one lifecycle per site:
//! validate locally, mark the site as requesting, call the image service,
//! then record success or failure. Only one request per site may be in
//! flight; a second one fails with `StudioError::Busy`.
//!
//! The orchestrator also owns the current scene result, which masked edits
//! replace on success and leave untouched on failure.

pub mod site;

use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::error::{ServiceError, StudioError, StudioResult};
use crate::service::prompts::{self, BACKGROUND_STYLES, CHARACTER_STYLES};
use crate::service::{GeneratedImage, GenerationRequest, ImageService};
use crate::state::data::{Asset, ImageData, NewAsset};

pub use crate::service::prompts::{AspectRatio, CharacterBrief};
pub use site::{OperationSite, RequestState, SiteGuard, SiteTable};

pub const DEFAULT_VARIATION_COUNT: usize = 3;

/// Successful variations of one character, ready for the user to pick from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationBatch {
    pub source_name: String,
    pub images: Vec<GeneratedImage>,
}

impl VariationBatch {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// New assets for the chosen variations, named "<source> Var. <n>".
    /// Indices are zero-based; out-of-range and repeated ones are skipped.
    pub fn accept(&self, indices: &[usize]) -> Vec<NewAsset> {
        let mut chosen: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.images.len())
            .collect();
        chosen.sort_unstable();
        chosen.dedup();

        chosen
            .into_iter()
            .map(|index| {
                let image = &self.images[index];
                NewAsset {
                    name: format!("{} Var. {}", self.source_name, index + 1),
                    image_url: image.image_url.clone(),
                    mime_type: image.mime_type.clone(),
                }
            })
            .collect()
    }
}

pub struct Orchestrator<S> {
    service: S,
    sites: SiteTable,
    current: Mutex<Option<GeneratedImage>>,
}

impl<S: ImageService> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            sites: SiteTable::default(),
            current: Mutex::new(None),
        }
    }

    pub fn state(&self, site: OperationSite) -> RequestState {
        self.sites.state(site)
    }

    /// The latest composed or edited scene
    pub fn current(&self) -> Option<GeneratedImage> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current scene (e.g. with an image loaded from disk)
    pub fn set_current(&self, image: Option<GeneratedImage>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = image;
    }

    /// Generate a character portrait from a free-text brief
    pub async fn generate_character(
        &self,
        brief: &CharacterBrief,
        style: &str,
    ) -> StudioResult<GeneratedImage> {
        let guard = self.sites.begin(OperationSite::CharacterGeneration)?;
        if brief.appearance.trim().is_empty() {
            return Err(reject(
                guard,
                "Please enter an appearance description for your character.",
            ));
        }

        let style = style_or_default(style, &CHARACTER_STYLES);
        let prompt = prompts::character(&brief.description(), style);
        info!("🎨 Generating character in {} style", style);
        self.run(
            guard,
            GenerationRequest::text(prompt, prompts::GENERATION_TEMPERATURE),
        )
        .await
    }

    pub async fn generate_background(
        &self,
        description: &str,
        style: &str,
        aspect_ratio: AspectRatio,
    ) -> StudioResult<GeneratedImage> {
        let guard = self.sites.begin(OperationSite::BackgroundGeneration)?;
        if description.trim().is_empty() {
            return Err(reject(guard, "Please enter a description for the background."));
        }

        let style = style_or_default(style, &BACKGROUND_STYLES);
        let prompt = prompts::background(description.trim(), style, aspect_ratio);
        info!("🏞️  Generating {} background in {} style", aspect_ratio, style);
        self.run(
            guard,
            GenerationRequest::text(prompt, prompts::GENERATION_TEMPERATURE),
        )
        .await
    }

    /// Redraw an uploaded character image in another art style
    pub async fn restyle(&self, image: &ImageData, style: &str) -> StudioResult<GeneratedImage> {
        let guard = self.sites.begin(OperationSite::Restyle)?;
        let style = style_or_default(style, &CHARACTER_STYLES);
        info!("🖼️  Restyling character as {}", style);

        let request = GenerationRequest::text(
            prompts::restyle(style),
            prompts::GENERATION_TEMPERATURE,
        )
        .with_reference(image.clone());
        self.run(guard, request).await
    }

    /// `count` independent variations of `source`.
    ///
    /// Fails only when every request fails; partial batches are returned
    /// with the failures logged.
    pub async fn generate_variations(
        &self,
        source: &Asset,
        count: usize,
    ) -> StudioResult<VariationBatch> {
        let guard = self.sites.begin(OperationSite::Variations)?;
        if count == 0 {
            return Err(reject(guard, "Variation count must be at least 1."));
        }
        let Some(image) = source.image_data() else {
            return Err(reject(
                guard,
                format!("'{}' has no inline image data", source.name),
            ));
        };

        info!("🎲 Generating {} variations of '{}'", count, source.name);
        let request = GenerationRequest::text(prompts::variation(), prompts::VARIATION_TEMPERATURE)
            .with_reference(image);
        let results = join_all((0..count).map(|_| self.service.generate(request.clone()))).await;

        let mut images = Vec::with_capacity(count);
        let mut last_error = None;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!("⚠️  Variation {} of '{}' failed: {}", index + 1, source.name, e);
                    last_error = Some(e);
                }
            }
        }

        if images.is_empty() {
            let source_error = last_error.unwrap_or(ServiceError::NoImage);
            return Err(self.failed(guard, source_error));
        }

        info!("✅ {} of {} variations succeeded", images.len(), count);
        guard.succeed();
        Ok(VariationBatch {
            source_name: source.name.clone(),
            images,
        })
    }

    /// Place the characters into the background as described.
    /// On success the result becomes the current scene.
    pub async fn compose_scene(
        &self,
        characters: &[&Asset],
        background: Option<&Asset>,
        description: &str,
    ) -> StudioResult<GeneratedImage> {
        let guard = self.sites.begin(OperationSite::SceneComposition)?;
        let background = match background {
            Some(background) if !characters.is_empty() && !description.trim().is_empty() => {
                background
            }
            _ => {
                return Err(reject(
                    guard,
                    "Please select character(s), a background, and describe the scene.",
                ))
            }
        };

        // Background first, then characters in selection order
        let mut request = GenerationRequest::text(
            prompts::scene(description.trim()),
            prompts::GENERATION_TEMPERATURE,
        );
        for asset in std::iter::once(background).chain(characters.iter().copied()) {
            let Some(image) = asset.image_data() else {
                return Err(reject(
                    guard,
                    format!("'{}' has no inline image data", asset.name),
                ));
            };
            request = request.with_reference(image);
        }

        info!(
            "🎬 Composing scene with {} character(s) on '{}'",
            characters.len(),
            background.name
        );
        let result = self.run(guard, request).await?;
        self.set_current(Some(result.clone()));
        Ok(result)
    }

    /// Edit the current scene. With a mask only the painted region changes.
    /// Failure leaves the current scene as it was.
    pub async fn edit_current(
        &self,
        instruction: &str,
        mask: Option<ImageData>,
    ) -> StudioResult<GeneratedImage> {
        let guard = self.sites.begin(OperationSite::MaskedEdit)?;
        let Some(current) = self.current() else {
            return Err(reject(guard, "There is no scene to edit yet."));
        };
        if instruction.trim().is_empty() {
            return Err(reject(guard, "Please describe the edit."));
        }
        let image = match current.image_data() {
            Ok(image) => image,
            Err(e) => return Err(self.failed(guard, e)),
        };

        info!(
            "✏️  Editing scene{}",
            if mask.is_some() { " inside mask" } else { "" }
        );
        let request = GenerationRequest::text(
            prompts::edit(instruction.trim(), mask.is_some()),
            prompts::EDIT_TEMPERATURE,
        )
        .with_reference(image)
        .with_mask(mask);

        let result = self.run(guard, request).await?;
        self.set_current(Some(result.clone()));
        Ok(result)
    }

    async fn run(
        &self,
        guard: SiteGuard<'_>,
        request: GenerationRequest,
    ) -> StudioResult<GeneratedImage> {
        match self.service.generate(request).await {
            Ok(image) => {
                info!("✅ {} finished", guard.site());
                guard.succeed();
                Ok(image)
            }
            Err(e) => Err(self.failed(guard, e)),
        }
    }

    fn failed(&self, guard: SiteGuard<'_>, source: ServiceError) -> StudioError {
        let site = guard.site();
        error!("❌ {} failed: {}", site, source);
        guard.fail(site.failure_message());
        StudioError::Service { site, source }
    }
}

/// Settle the site as failed without calling the service
fn reject(guard: SiteGuard<'_>, message: impl Into<String>) -> StudioError {
    let message = message.into();
    warn!("⚠️  {}: {}", guard.site(), message);
    guard.fail(message.clone());
    StudioError::Validation(message)
}

fn style_or_default<'a>(style: &'a str, styles: &'a [&'static str]) -> &'a str {
    let style = style.trim();
    if style.is_empty() {
        styles[0]
    } else {
        style
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::scripted::{sample_image, ScriptedService};

    fn asset(id: &str, name: &str) -> Asset {
        Asset::from_new(
            id.into(),
            NewAsset::new(name, &ImageData::new(vec![7, 7, 7], "image/png")),
        )
    }

    fn orchestrator() -> (Arc<ScriptedService>, Orchestrator<Arc<ScriptedService>>) {
        let service = Arc::new(ScriptedService::new());
        (service.clone(), Orchestrator::new(service))
    }

    #[tokio::test]
    async fn test_compose_without_characters_never_calls_service() {
        let (service, orchestrator) = orchestrator();
        let background = asset("bg_1", "Forest");

        let err = orchestrator
            .compose_scene(&[], Some(&background), "they dance")
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(service.calls(), 0);
        assert!(orchestrator.current().is_none());
        assert!(orchestrator
            .state(OperationSite::SceneComposition)
            .error()
            .is_some());
    }

    #[tokio::test]
    async fn test_compose_requires_background_and_description() {
        let (service, orchestrator) = orchestrator();
        let hero = asset("char_1", "Hero");
        let background = asset("bg_1", "Forest");

        assert!(orchestrator
            .compose_scene(&[&hero], None, "they dance")
            .await
            .is_err());
        assert!(orchestrator
            .compose_scene(&[&hero], Some(&background), "   ")
            .await
            .is_err());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_compose_sends_background_first_and_sets_current() {
        let (service, orchestrator) = orchestrator();
        let hero = asset("char_1", "Hero");
        let mut sidekick = asset("char_2", "Sidekick");
        sidekick.image_url = ImageData::new(vec![1], "image/jpeg").to_data_url();
        sidekick.mime_type = "image/jpeg".into();
        let background = Asset {
            image_url: ImageData::new(vec![2], "image/webp").to_data_url(),
            mime_type: "image/webp".into(),
            ..asset("bg_1", "Forest")
        };
        service.push_ok(sample_image(42));

        let result = orchestrator
            .compose_scene(&[&hero, &sidekick], Some(&background), " a duel at dawn ")
            .await
            .unwrap();
        assert_eq!(result, sample_image(42));
        assert_eq!(orchestrator.current(), Some(sample_image(42)));
        assert_eq!(
            orchestrator.state(OperationSite::SceneComposition),
            RequestState::Succeeded
        );

        let request = &service.requests()[0];
        let mimes: Vec<_> = request.references.iter().map(|r| r.mime_type.as_str()).collect();
        assert_eq!(mimes, vec!["image/webp", "image/png", "image/jpeg"]);
        assert!(request.instruction.contains("\"a duel at dawn\""));
        assert!(request.mask.is_none());
        assert_eq!(request.temperature, prompts::GENERATION_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_previous_result() {
        let (service, orchestrator) = orchestrator();
        orchestrator.set_current(Some(sample_image(1)));
        service.push_err();

        let mask = ImageData::new(vec![5], "image/png");
        let err = orchestrator
            .edit_current("add a hat", Some(mask))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StudioError::Service {
                site: OperationSite::MaskedEdit,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Image editing failed. Please try again.");
        assert_eq!(orchestrator.current(), Some(sample_image(1)));
    }

    #[tokio::test]
    async fn test_masked_edit_carries_mask_and_replaces_result() {
        let (service, orchestrator) = orchestrator();
        orchestrator.set_current(Some(sample_image(1)));
        service.push_ok(sample_image(2));

        let mask = ImageData::new(vec![5], "image/png");
        orchestrator
            .edit_current("make the sky purple", Some(mask.clone()))
            .await
            .unwrap();
        assert_eq!(orchestrator.current(), Some(sample_image(2)));

        let request = &service.requests()[0];
        assert_eq!(request.mask, Some(mask));
        assert_eq!(request.references, vec![sample_image(1).image_data().unwrap()]);
        assert_eq!(request.temperature, prompts::EDIT_TEMPERATURE);
        assert!(request.instruction.contains("mask"));

        // Unmasked edits apply to the whole image
        orchestrator.edit_current("brighter", None).await.unwrap();
        assert!(service.requests()[1].mask.is_none());
    }

    #[tokio::test]
    async fn test_edit_requires_current_result() {
        let (service, orchestrator) = orchestrator();
        let err = orchestrator.edit_current("add a hat", None).await.unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_variations_partial_success() {
        let (service, orchestrator) = orchestrator();
        service.push_ok(sample_image(1));
        service.push_err();
        service.push_ok(sample_image(3));

        let batch = orchestrator
            .generate_variations(&asset("char_1", "Luna"), 3)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(service.calls(), 3);
        assert!(service
            .requests()
            .iter()
            .all(|r| r.temperature == prompts::VARIATION_TEMPERATURE && r.references.len() == 1));

        let accepted = batch.accept(&[1, 0, 1, 9]);
        let names: Vec<_> = accepted.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Luna Var. 1", "Luna Var. 2"]);
        assert_eq!(accepted[1].image_url, sample_image(3).image_url);
    }

    #[tokio::test]
    async fn test_variations_all_failed() {
        let (service, orchestrator) = orchestrator();
        for _ in 0..3 {
            service.push_err();
        }

        let err = orchestrator
            .generate_variations(&asset("char_1", "Luna"), 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StudioError::Service {
                site: OperationSite::Variations,
                ..
            }
        ));
        assert!(matches!(
            orchestrator.state(OperationSite::Variations),
            RequestState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_second_request_while_in_flight_is_busy() {
        let service = Arc::new(ScriptedService::gated());
        let orchestrator = Orchestrator::new(service.clone());
        let image = ImageData::new(vec![1], "image/png");

        let first = orchestrator.restyle(&image, "Anime");
        futures::pin_mut!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(orchestrator.state(OperationSite::Restyle).is_requesting());

        let err = orchestrator.restyle(&image, "Anime").await.unwrap_err();
        assert!(matches!(err, StudioError::Busy(OperationSite::Restyle)));

        service.release(1);
        first.await.unwrap();
        assert_eq!(service.calls(), 1);
        assert_eq!(orchestrator.state(OperationSite::Restyle), RequestState::Succeeded);
    }

    #[tokio::test]
    async fn test_generate_character_validates_and_builds_prompt() {
        let (service, orchestrator) = orchestrator();
        let err = orchestrator
            .generate_character(&CharacterBrief::new("  "), "Anime")
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(service.calls(), 0);

        let brief = CharacterBrief {
            appearance: "a young wizard".into(),
            clothing: "a blue robe".into(),
            ..CharacterBrief::default()
        };
        orchestrator.generate_character(&brief, "").await.unwrap();
        let prompt = &service.requests()[0].instruction;
        assert!(prompt.contains("3D Pixar style"));
        assert!(prompt.contains("a young wizard. wearing a blue robe"));
    }

    #[tokio::test]
    async fn test_generate_background_requires_description() {
        let (service, orchestrator) = orchestrator();
        assert!(orchestrator
            .generate_background("", "Anime", AspectRatio::Portrait)
            .await
            .is_err());
        assert_eq!(service.calls(), 0);

        orchestrator
            .generate_background("a quiet harbor", "Watercolor", AspectRatio::Portrait)
            .await
            .unwrap();
        assert!(service.requests()[0].instruction.contains("9:16"));
        // Background generation does not touch the current scene
        assert!(orchestrator.current().is_none());
    }
}
