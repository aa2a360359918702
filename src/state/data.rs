//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the asset store, the repositories and the orchestrator.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

/// The two asset collections kept by the studio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Character,
    Background,
}

impl AssetKind {
    /// Name of the keyed table holding this collection
    pub fn table(self) -> &'static str {
        match self {
            AssetKind::Character => "characters",
            AssetKind::Background => "backgrounds",
        }
    }

    /// Prefix used when generating ids for new assets
    pub fn id_prefix(self) -> &'static str {
        match self {
            AssetKind::Character => "char",
            AssetKind::Background => "bg",
        }
    }

    /// Deterministic file name offered for exports
    pub fn export_file_name(self) -> &'static str {
        match self {
            AssetKind::Character => "ai-storyboard-characters.json",
            AssetKind::Background => "ai-storyboard-backgrounds.json",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "character" | "characters" => Ok(AssetKind::Character),
            "background" | "backgrounds" => Ok(AssetKind::Background),
            other => Err(format!("unknown asset kind: {other}")),
        }
    }
}

/// A character or background in one of the libraries
///
/// Field names match the JSON export format (`id`, `name`, `imageUrl`, `mimeType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Unique id, immutable after creation
    pub id: String,
    /// Display name, the only mutable field
    pub name: String,
    /// Image reference, usually a base64 `data:` URL
    pub image_url: String,
    /// MIME type of the image (e.g., "image/png")
    pub mime_type: String,
}

impl Asset {
    /// Attach an id to a new asset
    pub fn from_new(id: String, new: NewAsset) -> Self {
        Self {
            id,
            name: new.name,
            image_url: new.image_url,
            mime_type: new.mime_type,
        }
    }

    /// Check that every field carries a non-empty value
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && !self.name.is_empty()
            && !self.image_url.is_empty()
            && !self.mime_type.is_empty()
    }

    /// The image reference as inline image data, if it is a `data:` URL
    pub fn image_data(&self) -> Option<ImageData> {
        ImageData::from_data_url(&self.image_url)
    }
}

/// An asset that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub name: String,
    pub image_url: String,
    pub mime_type: String,
}

impl NewAsset {
    pub fn new(name: impl Into<String>, image: &ImageData) -> Self {
        Self {
            name: name.into(),
            image_url: image.to_data_url(),
            mime_type: image.mime_type.clone(),
        }
    }
}

/// Partial update of an asset; only the name is mutable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUpdate {
    pub name: Option<String>,
}

impl AssetUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// Merge the update into an existing record
    pub fn apply_to(&self, asset: &Asset) -> Asset {
        let mut merged = asset.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        merged
    }
}

/// Decoded image bytes plus their MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        let bytes = general_purpose::STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(bytes, mime_type))
    }

    /// Encode an RGBA buffer as PNG (keeps the alpha channel)
    pub fn png_from_rgba(pixels: &RgbaImage) -> Result<Self, ImageError> {
        let mut bytes = Vec::new();
        pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Self::new(bytes, "image/png"))
    }

    /// Decode the bytes into pixels
    pub fn decode(&self) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(&self.bytes)
    }

    /// The payload without the `data:` header, as sent to the image service
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// File extension derived from the MIME type ("image/png" -> "png")
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("png")
    }
}

// Image payloads are large; keep Debug output readable
impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_json_field_names() {
        let asset = Asset {
            id: "a".into(),
            name: "X".into(),
            image_url: "data:image/png;base64,AAAA".into(),
            mime_type: "image/png".into(),
        };

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["imageUrl"], "data:image/png;base64,AAAA");
        assert_eq!(json["mimeType"], "image/png");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_data_url_parsing() {
        let data = ImageData::new(vec![1, 2, 3, 4], "image/jpeg");
        let url = data.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let parsed = ImageData::from_data_url(&url).unwrap();
        assert_eq!(parsed, data);
        assert_eq!(parsed.extension(), "jpeg");

        assert!(ImageData::from_data_url("https://example.com/a.png").is_none());
        assert!(ImageData::from_data_url("data:image/png,notbase64").is_none());
    }

    #[test]
    fn test_update_only_touches_name() {
        let asset = Asset {
            id: "char_1".into(),
            name: "Old".into(),
            image_url: "u".into(),
            mime_type: "image/png".into(),
        };

        let merged = AssetUpdate::rename("New").apply_to(&asset);
        assert_eq!(merged.id, "char_1");
        assert_eq!(merged.name, "New");
        assert_eq!(merged.image_url, "u");

        let unchanged = AssetUpdate::default().apply_to(&asset);
        assert_eq!(unchanged, asset);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("characters".parse::<AssetKind>(), Ok(AssetKind::Character));
        assert_eq!("Background".parse::<AssetKind>(), Ok(AssetKind::Background));
        assert!("props".parse::<AssetKind>().is_err());
    }
}
