//! Built-in starter content seeded into empty libraries
//!
//! The placeholders are drawn procedurally so the binary ships no image files:
//! characters are simple silhouettes on a neutral backdrop, backgrounds are
//! two-band sky/ground gradients.

use image::{Rgba, RgbaImage};

use super::data::{AssetKind, ImageData, NewAsset};

const CHARACTER_SIZE: (u32, u32) = (256, 384);
const BACKGROUND_SIZE: (u32, u32) = (384, 216);

/// (name, body colour)
const DEFAULT_CHARACTERS: [(&str, [u8; 3]); 3] = [
    ("Luna", [147, 51, 234]),
    ("Kai", [37, 99, 235]),
    ("Mai", [219, 39, 119]),
];

/// (name, sky colour, ground colour)
const DEFAULT_BACKGROUNDS: [(&str, [u8; 3], [u8; 3]); 2] = [
    ("Enchanted Forest", [56, 189, 248], [21, 128, 61]),
    ("Desert Dusk", [251, 146, 60], [202, 138, 4]),
];

/// The default set for one collection, in display order
pub fn default_assets(kind: AssetKind) -> Result<Vec<NewAsset>, image::ImageError> {
    match kind {
        AssetKind::Character => DEFAULT_CHARACTERS
            .iter()
            .map(|(name, color)| {
                let png = ImageData::png_from_rgba(&draw_silhouette(*color))?;
                Ok::<_, image::ImageError>(NewAsset::new(*name, &png))
            })
            .collect(),
        AssetKind::Background => DEFAULT_BACKGROUNDS
            .iter()
            .map(|(name, sky, ground)| {
                let png = ImageData::png_from_rgba(&draw_landscape(*sky, *ground))?;
                Ok::<_, image::ImageError>(NewAsset::new(*name, &png))
            })
            .collect(),
    }
}

fn draw_silhouette(color: [u8; 3]) -> RgbaImage {
    let (width, height) = CHARACTER_SIZE;
    let backdrop = Rgba([229, 231, 235, 255]);
    let fill = Rgba([color[0], color[1], color[2], 255]);

    let head = (width as f32 / 2.0, height as f32 * 0.25, width as f32 * 0.17);
    let body_top = height as f32 * 0.42;
    let body_half_width = width as f32 * 0.28;

    RgbaImage::from_fn(width, height, |x, y| {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let in_head = (px - head.0).powi(2) + (py - head.1).powi(2) <= head.2.powi(2);
        let in_body = py >= body_top
            && py <= height as f32 * 0.95
            && (px - head.0).abs() <= body_half_width;
        if in_head || in_body {
            fill
        } else {
            backdrop
        }
    })
}

fn draw_landscape(sky: [u8; 3], ground: [u8; 3]) -> RgbaImage {
    let (width, height) = BACKGROUND_SIZE;
    let horizon = height as f32 * 0.62;

    RgbaImage::from_fn(width, height, |_, y| {
        let y = y as f32;
        if y < horizon {
            // Sky fades lighter towards the horizon
            let t = y / horizon;
            Rgba(mix(sky, [255, 255, 255], t * 0.5))
        } else {
            let t = (y - horizon) / (height as f32 - horizon);
            Rgba(mix(ground, [0, 0, 0], t * 0.4))
        }
    })
}

fn mix(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 4] {
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255]
}
