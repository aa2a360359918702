//! Mask editing
//!
//! A base image plus a freehand stroke overlay. The overlay, serialized as
//! PNG, scopes a masked edit to the painted region.

pub mod canvas;
pub mod geometry;

pub use canvas::{MaskCanvas, PaintMode};
pub use geometry::{fit_within, Point, Rect};
