//! Points, rectangles and the fit-to-container computation.

/// A position in client (viewport) or surface space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle, as returned by a bounding-rect query
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }

    /// A `width` x `height` rectangle centred inside this one
    pub fn centered(&self, width: f32, height: f32) -> Rect {
        Rect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Largest size with the image's aspect ratio that fits inside the container.
///
/// Scales up as well as down. Wider-than-container images take the full
/// container width, everything else takes the full height.
pub fn fit_within(image_width: u32, image_height: u32, container: Rect) -> (u32, u32) {
    if image_width == 0 || image_height == 0 || container.width <= 0.0 || container.height <= 0.0
    {
        return (image_width.max(1), image_height.max(1));
    }

    let image_aspect = image_width as f32 / image_height as f32;
    let container_aspect = container.width / container.height;

    let (width, height) = if image_aspect > container_aspect {
        (container.width, container.width / image_aspect)
    } else {
        (container.height * image_aspect, container.height)
    };

    ((width.round() as u32).max(1), (height.round() as u32).max(1))
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;

    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
