//! JSON import and export of asset collections.
//!
//! Import files are untrusted: the whole file is rejected unless it is an
//! array whose every element carries non-empty string `id`, `name`,
//! `imageUrl` and `mimeType` fields.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ImportError, StudioError};
use crate::state::data::{Asset, AssetKind};

const REQUIRED_FIELDS: [&str; 4] = ["id", "name", "imageUrl", "mimeType"];

/// Pretty-printed JSON array of the collection, ids included.
/// `None` for an empty collection.
pub fn export_json(assets: &[Asset]) -> Result<Option<String>, serde_json::Error> {
    if assets.is_empty() {
        return Ok(None);
    }
    serde_json::to_string_pretty(assets).map(Some)
}

/// Validate and parse an import file's contents
pub fn parse_import(text: &str) -> Result<Vec<Asset>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(elements) = value else {
        return Err(ImportError::NotAnArray);
    };

    for (index, element) in elements.iter().enumerate() {
        let Some(object) = element.as_object() else {
            return Err(ImportError::InvalidElement {
                index,
                field: REQUIRED_FIELDS[0],
            });
        };
        for field in REQUIRED_FIELDS {
            let valid = object
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !valid {
                return Err(ImportError::InvalidElement { index, field });
            }
        }
    }

    // Every element has the four string fields; extra fields are ignored
    Ok(serde_json::from_value(Value::Array(elements))?)
}

pub async fn read_import_file(path: impl AsRef<Path>) -> Result<Vec<Asset>, ImportError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    parse_import(&text).inspect_err(|e| warn!("⚠️  Rejected import file {}: {}", path.display(), e))
}

/// Write the collection to `<dir>/<kind export file name>`.
///
/// Returns the written path, or `None` without touching the disk when the
/// collection is empty.
pub async fn write_export_file(
    dir: impl AsRef<Path>,
    kind: AssetKind,
    assets: &[Asset],
) -> Result<Option<PathBuf>, StudioError> {
    let Some(json) = export_json(assets).map_err(StudioError::Export)? else {
        return Ok(None);
    };

    let path = dir.as_ref().join(kind.export_file_name());
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| StudioError::Write {
            path: path.clone(),
            source,
        })?;

    info!("📤 Exported {} {} to {}", assets.len(), kind, path.display());
    Ok(Some(path))
}
