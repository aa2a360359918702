//! Storage seams for the asset libraries and small settings
//!
//! The studio talks to durable storage only through these traits:
//! - `AssetStore`: one keyed table per asset collection
//! - `SettingsStore`: a tiny key-value table (language preference)
//!
//! `Library` (SQLite) and `MemoryStore` implement both.

use async_trait::async_trait;

use super::data::{Asset, AssetKind};
use crate::error::StoreError;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Every record of a collection, newest first
    async fn get_all(&self, kind: AssetKind) -> Result<Vec<Asset>, StoreError>;

    /// Insert a new record; fails with `StoreError::Duplicate` if the id exists
    async fn add(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError>;

    /// Insert or replace a record by id
    async fn put(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError>;

    /// Delete a record by id; deleting a missing id is not an error
    async fn delete(&self, kind: AssetKind, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// Shared handles (`Arc<Library>`) are stores too
#[async_trait]
impl<T: AssetStore + ?Sized> AssetStore for std::sync::Arc<T> {
    async fn get_all(&self, kind: AssetKind) -> Result<Vec<Asset>, StoreError> {
        (**self).get_all(kind).await
    }

    async fn add(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        (**self).add(kind, asset).await
    }

    async fn put(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        (**self).put(kind, asset).await
    }

    async fn delete(&self, kind: AssetKind, id: &str) -> Result<(), StoreError> {
        (**self).delete(kind, id).await
    }
}

#[async_trait]
impl<T: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<T> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_setting(key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_setting(key, value).await
    }
}
