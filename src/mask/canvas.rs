use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, Rgba, RgbaImage};
use tracing::debug;

use super::geometry::{distance_to_segment, fit_within, Point, Rect};
use crate::state::data::ImageData;

pub const DEFAULT_BRUSH_SIZE: u32 = 30;
pub const MIN_BRUSH_SIZE: u32 = 5;
pub const MAX_BRUSH_SIZE: u32 = 100;

/// Stroke colour: rgba(236, 72, 153, 0.7)
pub const HIGHLIGHT: Rgba<u8> = Rgba([236, 72, 153, 179]);

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// What a stroke does to the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Draw,
    Erase,
}

/// Pointer state between press and release
#[derive(Debug, Clone, Default)]
struct DragState {
    is_drawing: bool,
    last_position: Option<Point>,
}

/// Dual-surface mask editor.
///
/// The base surface holds the image resized to fit its container. The
/// stroke surface has the same pixel size, starts fully transparent, and
/// collects the user's brush strokes. Only the stroke surface is ever
/// serialized.
pub struct MaskCanvas {
    base: RgbaImage,
    strokes: RgbaImage,
    /// On-screen rectangle of the surface, in client coordinates
    bounds: Rect,
    brush_size: u32,
    mode: PaintMode,
    drag: DragState,
}

impl MaskCanvas {
    pub fn new(image: &DynamicImage, container: Rect) -> Self {
        let (width, height) = fit_within(image.width(), image.height(), container);
        let base = image.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();

        debug!(
            "🖌️  Mask surface {}x{} for {}x{} image",
            width,
            height,
            image.width(),
            image.height()
        );

        Self {
            base,
            strokes: RgbaImage::from_pixel(width, height, TRANSPARENT),
            bounds: container.centered(width as f32, height as f32),
            brush_size: DEFAULT_BRUSH_SIZE,
            mode: PaintMode::Draw,
            drag: DragState::default(),
        }
    }

    /// Decode `image` and build a canvas for it
    pub fn from_image_data(image: &ImageData, container: Rect) -> Result<Self, ImageError> {
        Ok(Self::new(&image.decode()?, container))
    }

    /// Rebuild both surfaces for a new image or container size.
    /// Strokes are discarded; brush settings are kept.
    pub fn reload(&mut self, image: &DynamicImage, container: Rect) {
        let brush_size = self.brush_size;
        let mode = self.mode;
        *self = Self::new(image, container);
        self.brush_size = brush_size;
        self.mode = mode;
    }

    /// The surface moved or was scaled on screen; pixels are untouched
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.strokes.dimensions()
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn strokes(&self) -> &RgbaImage {
        &self.strokes
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
    }

    /// Start a stroke. Presses outside the surface are ignored.
    pub fn pointer_down(&mut self, client: Point) -> bool {
        if !self.bounds.contains(client) {
            return false;
        }
        self.drag.is_drawing = true;
        self.drag.last_position = Some(self.to_surface(client));
        true
    }

    /// Extend the active stroke to `client`. Returns whether anything was painted.
    pub fn pointer_move(&mut self, client: Point) -> bool {
        if !self.drag.is_drawing {
            return false;
        }
        let position = self.to_surface(client);
        let Some(last) = self.drag.last_position.replace(position) else {
            return false;
        };
        self.paint_segment(last, position);
        true
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::default();
    }

    pub fn pointer_leave(&mut self) {
        self.drag = DragState::default();
    }

    /// Paint a whole polyline in client coordinates as one stroke
    pub fn stroke(&mut self, points: &[Point]) -> bool {
        let Some((first, rest)) = points.split_first() else {
            return false;
        };
        if !self.pointer_down(*first) {
            return false;
        }
        let mut painted = false;
        for point in rest {
            painted |= self.pointer_move(*point);
        }
        self.pointer_up();
        painted
    }

    /// Make every stroke pixel fully transparent
    pub fn clear(&mut self) {
        for pixel in self.strokes.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    /// True when no stroke pixel has any alpha
    pub fn is_empty(&self) -> bool {
        self.strokes.pixels().all(|pixel| pixel[3] == 0)
    }

    pub fn painted_pixels(&self) -> usize {
        self.strokes.pixels().filter(|pixel| pixel[3] > 0).count()
    }

    /// PNG of the stroke surface, or `None` when nothing is painted
    pub fn serialize(&self) -> Result<Option<ImageData>, ImageError> {
        if self.is_empty() {
            return Ok(None);
        }
        ImageData::png_from_rgba(&self.strokes).map(Some)
    }

    /// Base image with the stroke overlay blended on top
    pub fn composite_preview(&self) -> RgbaImage {
        let mut preview = self.base.clone();
        imageops::overlay(&mut preview, &self.strokes, 0, 0);
        preview
    }

    fn to_surface(&self, client: Point) -> Point {
        let (width, height) = self.dimensions();
        let scale_x = if self.bounds.width > 0.0 {
            width as f32 / self.bounds.width
        } else {
            1.0
        };
        let scale_y = if self.bounds.height > 0.0 {
            height as f32 / self.bounds.height
        } else {
            1.0
        };
        Point::new(
            (client.x - self.bounds.x) * scale_x,
            (client.y - self.bounds.y) * scale_y,
        )
    }

    /// Round-capped segment with a one-pixel anti-aliased edge
    fn paint_segment(&mut self, from: Point, to: Point) {
        let radius = self.brush_size as f32 / 2.0;
        let (width, height) = self.dimensions();

        let min_x = (from.x.min(to.x) - radius - 2.0).floor().max(0.0) as u32;
        let min_y = (from.y.min(to.y) - radius - 2.0).floor().max(0.0) as u32;
        let max_x = (from.x.max(to.x) + radius + 2.0).ceil().min(width as f32);
        let max_y = (from.y.max(to.y) + radius + 2.0).ceil().min(height as f32);
        if max_x <= 0.0 || max_y <= 0.0 {
            return;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = distance_to_segment(centre, from, to);
                // Erase is fully opaque across the draw brush's soft edge
                let edge = match self.mode {
                    PaintMode::Draw => 0.5,
                    PaintMode::Erase => 1.5,
                };
                let coverage = (radius + edge - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let pixel = self.strokes.get_pixel_mut(x, y);
                *pixel = match self.mode {
                    PaintMode::Draw => source_over(*pixel, HIGHLIGHT, coverage),
                    PaintMode::Erase => destination_out(*pixel, coverage),
                };
            }
        }
    }
}

/// Straight-alpha source-over of `src` scaled by `coverage`
fn source_over(dst: Rgba<u8>, src: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * coverage;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let blend = |s: u8, d: u8| {
        ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Remove `coverage` of the existing alpha; colour is never added
fn destination_out(dst: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let alpha = (dst[3] as f32 * (1.0 - coverage)).round() as u8;
    if alpha == 0 {
        TRANSPARENT
    } else {
        Rgba([dst[0], dst[1], dst[2], alpha])
    }
}
