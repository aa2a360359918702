//! Storyboard studio core.
//!
//! Character and background libraries persisted in SQLite, scene
//! composition and masked editing through a generative image service, and
//! the freehand mask canvas that scopes those edits.

pub mod app;
pub mod config;
pub mod error;
pub mod mask;
pub mod orchestrator;
pub mod service;
pub mod state;
pub mod transfer;

pub use app::Studio;
pub use config::{Locale, LocaleSetting, StudioConfig};
pub use error::{StudioError, StudioResult};
