//! Error types for every layer of the studio.
//!
//! Each operation site owns its errors: storage failures leave in-memory
//! collections untouched, import failures reject the whole file, and service
//! failures leave the previous result in place.

use std::path::PathBuf;

use thiserror::Error;

use crate::orchestrator::OperationSite;
use crate::state::data::AssetKind;

/// Failures of the durable asset store or the settings store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("a {kind} record with id '{id}' already exists")]
    Duplicate { kind: AssetKind, id: String },

    #[error("background storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("database connection lock was poisoned")]
    Poisoned,

    #[error("could not determine the application data directory")]
    NoDataDir,

    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Rejection of an import file; the whole file is refused
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read import file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("import file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("import file must contain a JSON array of assets")]
    NotAnArray,

    #[error("element {index} must be an object with a non-empty string `{field}`")]
    InvalidElement { index: usize, field: &'static str },
}

/// Failures reported by the generative image service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to the image service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("image service returned no image data")]
    NoImage,

    #[error("image service returned an undecodable image payload")]
    BadPayload,

    #[error("no API key configured (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,
}

/// Failures while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level error returned by studio operations
#[derive(Debug, Error)]
pub enum StudioError {
    /// Missing selection or empty required field; no external call was made
    #[error("{0}")]
    Validation(String),

    /// A request is already in flight at this site
    #[error("{0} is already in progress")]
    Busy(OperationSite),

    #[error("{}", site.failure_message())]
    Service {
        site: OperationSite,
        #[source]
        source: ServiceError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("export failed: {0}")]
    Export(#[source] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StudioResult<T> = Result<T, StudioError>;
