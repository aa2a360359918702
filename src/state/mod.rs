//! State management module
//!
//! This module handles all application state, including:
//! - Shared data structures (data.rs)
//! - Storage seams and implementations (store.rs, library.rs, memory.rs)
//! - The in-memory asset collections (repository.rs)
//! - Composition selection (selection.rs)

pub mod data;
pub mod defaults;
pub mod ids;
pub mod library;
pub mod memory;
pub mod repository;
pub mod selection;
pub mod store;

pub use data::{Asset, AssetKind, AssetUpdate, ImageData, NewAsset};
pub use library::Library;
pub use memory::MemoryStore;
pub use repository::AssetRepository;
pub use selection::Selection;
pub use store::{AssetStore, SettingsStore};
