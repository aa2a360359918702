//! Studio configuration and the persisted interface language.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, StoreError};
use crate::orchestrator::DEFAULT_VARIATION_COUNT;
use crate::service::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::state::store::SettingsStore;

const APP_DIR: &str = "storyboard-studio";

/// Settings loaded from `config.toml`; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Where the database lives (defaults to the platform data directory)
    pub data_dir: Option<PathBuf>,
    pub database_file: String,
    pub api_base_url: String,
    pub model: String,
    pub variation_count: usize,
    /// Overridden by `GEMINI_API_KEY` or `API_KEY` when set
    pub api_key: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: "storyboard.db".to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            variation_count: DEFAULT_VARIATION_COUNT,
            api_key: None,
        }
    }
}

impl StudioConfig {
    /// `<config dir>/storyboard-studio/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Load from `path`, or from the default location if it exists, then
    /// apply environment overrides. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("⚙️  Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `GEMINI_API_KEY` (preferred) or `API_KEY` from `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = ["GEMINI_API_KEY", "API_KEY"]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
        {
            self.api_key = Some(key);
        }
        self
    }

    pub fn data_dir(&self) -> Result<PathBuf, StoreError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join(APP_DIR))
            .ok_or(StoreError::NoDataDir)
    }

    pub fn database_path(&self) -> Result<PathBuf, StoreError> {
        Ok(self.data_dir()?.join(&self.database_file))
    }
}

/// Settings key of the language preference
pub const LOCALE_KEY: &str = "ai-storyboard-language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Vi => "vi",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "vi" => Ok(Locale::Vi),
            "en" => Ok(Locale::En),
            other => Err(format!("unsupported language '{other}' (use vi or en)")),
        }
    }
}

/// The persisted interface language plus a change channel for observers
pub struct LocaleSetting<S> {
    store: S,
    sender: watch::Sender<Locale>,
}

impl<S: SettingsStore> LocaleSetting<S> {
    /// Read the stored language. Missing, unreadable or unknown values
    /// fall back to Vietnamese.
    pub async fn load(store: S) -> Self {
        let locale = match store.get_setting(LOCALE_KEY).await {
            Ok(Some(value)) => value.parse().unwrap_or_else(|e| {
                warn!("⚠️  Ignoring stored language: {}", e);
                Locale::default()
            }),
            Ok(None) => Locale::default(),
            Err(e) => {
                warn!("⚠️  Could not read language preference: {}", e);
                Locale::default()
            }
        };
        let (sender, _) = watch::channel(locale);
        Self { store, sender }
    }

    pub fn get(&self) -> Locale {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.sender.subscribe()
    }

    /// Switch language and persist it. The new value applies even if
    /// persisting fails; the error is logged and returned.
    pub async fn set(&self, locale: Locale) -> Result<(), StoreError> {
        self.sender.send_replace(locale);
        self.store
            .set_setting(LOCALE_KEY, locale.as_str())
            .await
            .inspect_err(|e| error!("❌ Failed to save language preference: {}", e))
    }
}
