use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use tokio::task;
use tracing::{debug, info};

use super::data::{Asset, AssetKind};
use super::store::{AssetStore, SettingsStore};
use crate::error::StoreError;

/// The Library manages the SQLite catalog database.
/// It stores one keyed table per asset collection plus a small settings table.
///
/// rusqlite's `Connection` is `Send` but not `Sync`, so it lives behind a mutex
/// and every query runs on tokio's blocking pool.
pub struct Library {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the catalog at `db_path` and initialize the schema.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&db_path)?;

        info!("📁 Database initialized at: {}", db_path.display());

        let library = Library {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        };
        library.init_schema()?;

        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables if they don't exist.
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        // One table per collection, keyed by asset id.
        // Tables keep their implicit rowid, which gives insertion order.
        for kind in [AssetKind::Character, AssetKind::Background] {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id              TEXT PRIMARY KEY,
                        name            TEXT NOT NULL,
                        image_url       TEXT NOT NULL,
                        mime_type       TEXT NOT NULL,
                        created_at      INTEGER NOT NULL
                    )",
                    kind.table()
                ),
                [],
            )?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;

        debug!("✅ Database schema initialized");

        Ok(())
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl AssetStore for Library {
    /// Returns all assets ordered by insertion (newest first)
    async fn get_all(&self, kind: AssetKind) -> Result<Vec<Asset>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, name, image_url, mime_type FROM {} ORDER BY rowid DESC",
                kind.table()
            ))?;

            let asset_iter = stmt.query_map([], |row| {
                Ok(Asset {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    image_url: row.get(2)?,
                    mime_type: row.get(3)?,
                })
            })?;

            let mut assets = Vec::new();
            for asset in asset_iter {
                assets.push(asset?);
            }

            Ok(assets)
        })
        .await
    }

    async fn add(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        let asset = asset.clone();
        self.with_conn(move |conn| {
            let result = conn.execute(
                &format!(
                    "INSERT INTO {} (id, name, image_url, mime_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    kind.table()
                ),
                rusqlite::params![
                    &asset.id,
                    &asset.name,
                    &asset.image_url,
                    &asset.mime_type,
                    Utc::now().timestamp_millis(),
                ],
            );

            match result {
                Ok(_) => Ok(()),
                // A UNIQUE constraint violation means the id is taken
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Duplicate { kind, id: asset.id })
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn put(&self, kind: AssetKind, asset: &Asset) -> Result<(), StoreError> {
        let asset = asset.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, name, image_url, mime_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        image_url = excluded.image_url,
                        mime_type = excluded.mime_type",
                    kind.table()
                ),
                rusqlite::params![
                    &asset.id,
                    &asset.name,
                    &asset.image_url,
                    &asset.mime_type,
                    Utc::now().timestamp_millis(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, kind: AssetKind, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
                rusqlite::params![id],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SettingsStore for Library {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
        .await
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
