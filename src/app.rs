//! The studio: one explicit container for all application state.
//!
//! Owns both asset repositories, the composition selection, the request
//! orchestrator and the language setting, and wires user-level actions
//! across them.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{LocaleSetting, StudioConfig};
use crate::error::{StudioError, StudioResult};
use crate::mask::MaskCanvas;
use crate::orchestrator::{Orchestrator, VariationBatch};
use crate::service::{GeneratedImage, ImageService};
use crate::state::data::{Asset, AssetKind, AssetUpdate, NewAsset};
use crate::state::store::{AssetStore, SettingsStore};
use crate::state::{AssetRepository, Selection};
use crate::transfer;

pub struct Studio<S, I> {
    pub characters: AssetRepository<S>,
    pub backgrounds: AssetRepository<S>,
    pub selection: Selection,
    pub orchestrator: Orchestrator<I>,
    pub locale: LocaleSetting<S>,
    variation_count: usize,
}

impl<S, I> Studio<S, I>
where
    S: AssetStore + SettingsStore + Clone,
    I: ImageService,
{
    /// Build the studio and load both libraries and the language.
    /// Load failures are logged and leave the affected library empty.
    pub async fn open(store: S, service: I, config: &StudioConfig) -> Self {
        let mut characters = AssetRepository::new(AssetKind::Character, store.clone());
        let mut backgrounds = AssetRepository::new(AssetKind::Background, store.clone());
        let _ = characters.load().await;
        let _ = backgrounds.load().await;

        Self {
            characters,
            backgrounds,
            selection: Selection::new(),
            orchestrator: Orchestrator::new(service),
            locale: LocaleSetting::load(store).await,
            variation_count: config.variation_count.max(1),
        }
    }

    pub fn repository(&self, kind: AssetKind) -> &AssetRepository<S> {
        match kind {
            AssetKind::Character => &self.characters,
            AssetKind::Background => &self.backgrounds,
        }
    }

    pub fn repository_mut(&mut self, kind: AssetKind) -> &mut AssetRepository<S> {
        match kind {
            AssetKind::Character => &mut self.characters,
            AssetKind::Background => &mut self.backgrounds,
        }
    }

    /// Store a generated or uploaded image under `name`
    pub async fn save_generated(
        &mut self,
        kind: AssetKind,
        name: &str,
        image: &GeneratedImage,
    ) -> StudioResult<Asset> {
        if name.trim().is_empty() {
            return Err(StudioError::Validation(
                "Please name the image before saving it.".into(),
            ));
        }
        let new = NewAsset {
            name: name.trim().to_string(),
            image_url: image.image_url.clone(),
            mime_type: image.mime_type.clone(),
        };
        Ok(self.repository_mut(kind).add(new).await?)
    }

    pub async fn rename(
        &mut self,
        kind: AssetKind,
        id: &str,
        name: &str,
    ) -> StudioResult<Option<Asset>> {
        if name.trim().is_empty() {
            return Err(StudioError::Validation("A name cannot be empty.".into()));
        }
        let update = AssetUpdate::rename(name.trim());
        Ok(self.repository_mut(kind).update(id, update).await?)
    }

    /// Delete an asset and drop it from the selection
    pub async fn remove(&mut self, kind: AssetKind, id: &str) -> StudioResult<bool> {
        let removed = self.repository_mut(kind).remove(id).await?;
        self.selection
            .retain_existing(self.characters.assets(), self.backgrounds.assets());
        Ok(removed)
    }

    pub async fn import_file(&mut self, kind: AssetKind, path: &Path) -> StudioResult<usize> {
        let candidates = transfer::read_import_file(path).await?;
        Ok(self.repository_mut(kind).import(candidates).await?)
    }

    pub async fn export_file(&self, kind: AssetKind, dir: &Path) -> StudioResult<Option<PathBuf>> {
        transfer::write_export_file(dir, kind, self.repository(kind).assets()).await
    }

    /// Compose a scene from the current selection
    pub async fn compose_selected(&self, description: &str) -> StudioResult<GeneratedImage> {
        let characters = self.selection.selected_characters(self.characters.assets());
        let background = self.selection.selected_background(self.backgrounds.assets());
        self.orchestrator
            .compose_scene(&characters, background, description)
            .await
    }

    /// Edit the current scene, scoped to the painted mask if there is one
    pub async fn edit_scene(
        &self,
        instruction: &str,
        mask: Option<&MaskCanvas>,
    ) -> StudioResult<GeneratedImage> {
        let mask = match mask {
            Some(canvas) => canvas.serialize()?,
            None => None,
        };
        self.orchestrator.edit_current(instruction, mask).await
    }

    pub async fn generate_variations(&self, character_id: &str) -> StudioResult<VariationBatch> {
        let Some(source) = self.characters.get(character_id) else {
            return Err(StudioError::Validation(format!(
                "No character with id '{character_id}'"
            )));
        };
        self.orchestrator
            .generate_variations(source, self.variation_count)
            .await
    }

    /// Add the chosen variations as new characters, each with a fresh id
    pub async fn accept_variations(
        &mut self,
        batch: &VariationBatch,
        indices: &[usize],
    ) -> StudioResult<Vec<Asset>> {
        let mut saved = Vec::new();
        for new in batch.accept(indices) {
            saved.push(self.characters.add(new).await?);
        }
        info!("💾 Saved {} variations of '{}'", saved.len(), batch.source_name);
        Ok(saved)
    }
}
