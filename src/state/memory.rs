//! In-memory implementation of the asset and settings stores.
//!
//! Records live in insertion order behind a `RwLock`; all data is lost when
//! the store is dropped. Used by tests and by `--ephemeral` CLI runs. Reads
//! and writes can be made to fail on demand to exercise storage-error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::data::{Asset, AssetKind};
use super::store::{AssetStore, SettingsStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: RwLock<HashMap<AssetKind, Vec<Asset>>>,
    settings: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Countdown to a single failing write (0 = disabled)
    fail_after: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let `count` more writes succeed, then fail exactly one
    pub fn fail_writes_after(&self, count: usize) {
        self.fail_after.store(count + 1, Ordering::SeqCst);
    }

    /// Number of stored records in one collection
    pub async fn len(&self, kind: AssetKind) -> usize {
        self.assets.read().await.get(&kind).map_or(0, Vec::len)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }
        let remaining = self.fail_after.load(Ordering::SeqCst);
        if remaining == 1 {
            self.fail_after.store(0, Ordering::SeqCst);
            return Err(StoreError::Unavailable("write failure injected".into()));
        }
        if remaining > 1 {
            self.fail_after.store(remaining - 1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn get_all(&self, kind: AssetKind) -> Result<Vec<Asset>, StoreError> {
        self.check_read()?;
        let assets = self.assets.read().await;
        Ok(assets
            .get(&kind)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn add(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        self.check_write()?;
        let mut assets = self.assets.write().await;
        let records = assets.entry(kind).or_default();
        if records.iter().any(|existing| existing.id == asset.id) {
            return Err(StoreError::Duplicate {
                kind,
                id: asset.id.clone(),
            });
        }
        records.push(asset.clone());
        Ok(())
    }

    async fn put(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        self.check_write()?;
        let mut assets = self.assets.write().await;
        let records = assets.entry(kind).or_default();
        match records.iter_mut().find(|existing| existing.id == asset.id) {
            Some(existing) => *existing = asset.clone(),
            None => records.push(asset.clone()),
        }
        Ok(())
    }

    async fn delete(&self, kind: AssetKind, id: &str) -> Result<(), StoreError> {
        self.check_write()?;
        if let Some(records) = self.assets.write().await.get_mut(&kind) {
            records.retain(|existing| existing.id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_read()?;
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.settings
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
