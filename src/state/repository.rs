//! In-memory view of one asset collection, backed by an `AssetStore`
//!
//! Every mutation writes to the store first and only touches the in-memory
//! collection once the write succeeded, so a storage failure is visible as
//! "nothing happened". The collection is ordered newest first.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use super::data::{Asset, AssetKind, AssetUpdate, NewAsset};
use super::defaults;
use super::ids::next_id;
use super::store::AssetStore;
use crate::error::StoreError;

pub struct AssetRepository<S> {
    kind: AssetKind,
    store: S,
    assets: Vec<Asset>,
}

impl<S: AssetStore> AssetRepository<S> {
    /// Create an empty repository; call `load` to populate it
    pub fn new(kind: AssetKind, store: S) -> Self {
        Self {
            kind,
            store,
            assets: Vec::new(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The current collection, newest first
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Read the persisted collection, seeding the built-in defaults first if
    /// the store is empty.
    ///
    /// On failure the error is logged, the in-memory collection is left empty
    /// and the error is returned for callers that want to report it.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        match self.read_or_seed().await {
            Ok(assets) => {
                info!("📚 Loaded {} {}", assets.len(), self.kind);
                self.assets = assets;
                Ok(())
            }
            Err(e) => {
                error!("❌ Failed to load {}: {}", self.kind, e);
                self.assets.clear();
                Err(e)
            }
        }
    }

    async fn read_or_seed(&self) -> Result<Vec<Asset>, StoreError> {
        let stored = self.store.get_all(self.kind).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        let defaults = match defaults::default_assets(self.kind) {
            Ok(defaults) => defaults,
            Err(e) => {
                warn!("⚠️  Could not render default {}: {}", self.kind, e);
                return Ok(stored);
            }
        };
        if defaults.is_empty() {
            return Ok(stored);
        }

        info!("🌱 Seeding {} default {}", defaults.len(), self.kind);

        // Written last-to-first so the first default reads back first
        let prefix = format!("default_{}", self.kind.id_prefix());
        for new in defaults.into_iter().rev() {
            let asset = Asset::from_new(next_id(&prefix), new);
            self.store.add(self.kind, &asset).await?;
        }

        self.store.get_all(self.kind).await
    }

    /// Assign a fresh id, persist the record, then prepend it.
    pub async fn add(&mut self, new: NewAsset) -> Result<Asset, StoreError> {
        let asset = Asset::from_new(next_id(self.kind.id_prefix()), new);

        if let Err(e) = self.store.add(self.kind, &asset).await {
            error!("❌ Failed to save {} '{}': {}", self.kind, asset.name, e);
            return Err(e);
        }

        debug!("➕ Added {} {}", self.kind, asset.id);
        self.assets.insert(0, asset.clone());
        Ok(asset)
    }

    /// Merge `update` into the record with `id` and persist it.
    ///
    /// Returns `Ok(None)` without touching the store when the id is unknown.
    pub async fn update(
        &mut self,
        id: &str,
        update: AssetUpdate,
    ) -> Result<Option<Asset>, StoreError> {
        let Some(index) = self.assets.iter().position(|asset| asset.id == id) else {
            debug!("Ignoring update of unknown {} {}", self.kind, id);
            return Ok(None);
        };

        let merged = update.apply_to(&self.assets[index]);

        if let Err(e) = self.store.put(self.kind, &merged).await {
            error!("❌ Failed to update {} {}: {}", self.kind, id, e);
            return Err(e);
        }

        self.assets[index] = merged.clone();
        Ok(Some(merged))
    }

    /// Delete from the store, then from memory. Unknown ids are fine.
    ///
    /// Returns whether the id was present in memory.
    pub async fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        if let Err(e) = self.store.delete(self.kind, id).await {
            error!("❌ Failed to delete {} {}: {}", self.kind, id, e);
            return Err(e);
        }

        let before = self.assets.len();
        self.assets.retain(|asset| asset.id != id);
        Ok(self.assets.len() != before)
    }

    /// Merge externally supplied records into the collection.
    ///
    /// Malformed candidates are skipped, as are ids already in the collection
    /// (existing entries always win) and repeated ids within the batch (first
    /// occurrence wins). The survivors are prepended in their input order.
    /// If a store write fails, the records already written for this batch are
    /// deleted again and the collection is left unchanged.
    ///
    /// Returns the number of records added.
    pub async fn import(&mut self, candidates: Vec<Asset>) -> Result<usize, StoreError> {
        let offered = candidates.len();
        let mut seen: HashSet<String> = self.assets.iter().map(|a| a.id.clone()).collect();
        let fresh: Vec<Asset> = candidates
            .into_iter()
            .filter(Asset::is_well_formed)
            .filter(|candidate| seen.insert(candidate.id.clone()))
            .collect();

        if fresh.is_empty() {
            info!("📥 Import into {}: nothing new among {} records", self.kind, offered);
            return Ok(0);
        }

        // Written last-to-first so a reload shows the same order as memory
        let mut written: Vec<&Asset> = Vec::with_capacity(fresh.len());
        for asset in fresh.iter().rev() {
            if let Err(e) = self.store.add(self.kind, asset).await {
                error!("❌ Failed to import {} {}: {}", self.kind, asset.id, e);
                for done in written {
                    if let Err(rollback) = self.store.delete(self.kind, &done.id).await {
                        warn!("⚠️  Could not roll back {} {}: {}", self.kind, done.id, rollback);
                    }
                }
                return Err(e);
            }
            written.push(asset);
        }

        let added = fresh.len();
        info!(
            "📥 Imported {} new {}, skipped {}",
            added,
            self.kind,
            offered - added
        );
        let prior = std::mem::replace(&mut self.assets, fresh);
        self.assets.extend(prior);
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::MemoryStore;
    use std::sync::Arc;

    fn asset(id: &str, name: &str) -> Asset {
        Asset {
            id: id.into(),
            name: name.into(),
            image_url: "data:image/png;base64,AAAA".into(),
            mime_type: "image/png".into(),
        }
    }

    fn new_asset(name: &str) -> NewAsset {
        NewAsset {
            name: name.into(),
            image_url: "data:image/png;base64,AAAA".into(),
            mime_type: "image/png".into(),
        }
    }

    fn repo(kind: AssetKind) -> (Arc<MemoryStore>, AssetRepository<Arc<MemoryStore>>) {
        let store = Arc::new(MemoryStore::new());
        let repo = AssetRepository::new(kind, Arc::clone(&store));
        (store, repo)
    }

    fn ids(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_seeds_defaults_when_empty() {
        let (store, mut repo) = repo(AssetKind::Character);

        repo.load().await.unwrap();

        let expected = defaults::default_assets(AssetKind::Character).unwrap();
        let names: Vec<_> = repo.assets().iter().map(|a| a.name.clone()).collect();
        let expected_names: Vec<_> = expected.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, expected_names);
        assert!(repo.assets().iter().all(|a| a.id.starts_with("default_char_")));
        assert_eq!(store.len(AssetKind::Character).await, expected.len());

        // A second load reads the seeded records instead of seeding again
        let mut again = AssetRepository::new(AssetKind::Character, Arc::clone(&store));
        again.load().await.unwrap();
        assert_eq!(again.assets(), repo.assets());
    }

    #[tokio::test]
    async fn test_load_keeps_existing_records() {
        let (store, mut repo) = repo(AssetKind::Background);
        store.add(AssetKind::Background, &asset("bg_1", "Beach")).await.unwrap();

        repo.load().await.unwrap();
        assert_eq!(ids(repo.assets()), vec!["bg_1"]);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_collection_empty() {
        let (store, mut repo) = repo(AssetKind::Character);
        store.fail_reads(true);

        assert!(repo.load().await.is_err());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_add_prepends_with_distinct_ids() {
        let (store, mut repo) = repo(AssetKind::Character);

        let mut created = Vec::new();
        for i in 0..50 {
            created.push(repo.add(new_asset(&format!("Hero {i}"))).await.unwrap());
        }

        let unique: HashSet<_> = created.iter().map(|a| a.id.clone()).collect();
        assert_eq!(unique.len(), 50);
        assert_eq!(repo.assets()[0].name, "Hero 49");
        assert!(repo.assets()[0].id.starts_with("char_"));
        assert_eq!(store.len(AssetKind::Character).await, 50);
    }

    #[tokio::test]
    async fn test_add_failure_leaves_memory_unchanged() {
        let (store, mut repo) = repo(AssetKind::Character);
        repo.add(new_asset("Kept")).await.unwrap();
        store.fail_writes(true);

        assert!(repo.add(new_asset("Lost")).await.is_err());
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.assets()[0].name, "Kept");
    }

    #[tokio::test]
    async fn test_update_renames_and_persists() {
        let (store, mut repo) = repo(AssetKind::Character);
        let created = repo.add(new_asset("Old")).await.unwrap();

        let updated = repo
            .update(&created.id, AssetUpdate::rename("New"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(repo.get(&created.id).unwrap().name, "New");

        let stored = store.get_all(AssetKind::Character).await.unwrap();
        assert_eq!(stored[0].name, "New");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let (store, mut repo) = repo(AssetKind::Character);
        store.fail_writes(true);

        let result = repo.update("missing", AssetUpdate::rename("X")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_failure_leaves_memory_unchanged() {
        let (store, mut repo) = repo(AssetKind::Background);
        let created = repo.add(new_asset("Old")).await.unwrap();
        store.fail_writes(true);

        assert!(repo.update(&created.id, AssetUpdate::rename("New")).await.is_err());
        assert_eq!(repo.get(&created.id).unwrap().name, "Old");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, mut repo) = repo(AssetKind::Character);
        let created = repo.add(new_asset("Gone")).await.unwrap();

        assert!(repo.remove(&created.id).await.unwrap());
        assert!(!repo.remove(&created.id).await.unwrap());
        assert!(!repo.remove("never-existed").await.unwrap());
        assert!(repo.is_empty());
        assert_eq!(store.len(AssetKind::Character).await, 0);
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_record() {
        let (store, mut repo) = repo(AssetKind::Character);
        let created = repo.add(new_asset("Stays")).await.unwrap();
        store.fail_writes(true);

        assert!(repo.remove(&created.id).await.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_import_single_record_is_idempotent() {
        let (_store, mut repo) = repo(AssetKind::Character);
        let batch = vec![asset("a", "X")];

        assert_eq!(repo.import(batch.clone()).await.unwrap(), 1);
        assert_eq!(ids(repo.assets()), vec!["a"]);

        assert_eq!(repo.import(batch).await.unwrap(), 0);
        assert_eq!(ids(repo.assets()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_import_preserves_order_ahead_of_existing() {
        let (store, mut repo) = repo(AssetKind::Character);
        repo.import(vec![asset("p", "P")]).await.unwrap();

        let added = repo
            .import(vec![asset("x", "X"), asset("p", "Imposter"), asset("y", "Y")])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(ids(repo.assets()), vec!["x", "y", "p"]);
        assert_eq!(repo.get("p").unwrap().name, "P");

        // A fresh load shows the same order
        let mut reloaded = AssetRepository::new(AssetKind::Character, Arc::clone(&store));
        reloaded.load().await.unwrap();
        assert_eq!(ids(reloaded.assets()), vec!["x", "y", "p"]);
    }

    #[tokio::test]
    async fn test_import_skips_malformed_and_repeated_ids() {
        let (_store, mut repo) = repo(AssetKind::Background);
        let blank_name = asset("b", "");

        let added = repo
            .import(vec![
                asset("a", "First"),
                blank_name,
                asset("a", "Second"),
                asset("", "No id"),
            ])
            .await
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(repo.get("a").unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_import_failure_rolls_back() {
        let (store, mut repo) = repo(AssetKind::Character);
        repo.import(vec![asset("old", "Old")]).await.unwrap();
        store.fail_writes_after(1);

        let result = repo
            .import(vec![asset("a", "A"), asset("b", "B"), asset("c", "C")])
            .await;
        assert!(result.is_err());
        assert_eq!(ids(repo.assets()), vec!["old"]);

        let stored = store.get_all(AssetKind::Character).await.unwrap();
        assert_eq!(ids(&stored), vec!["old"]);
    }
}
