//! Prompt wording and sampling temperatures for each kind of request.

use std::fmt;
use std::str::FromStr;

/// Art styles offered when generating or restyling characters
pub const CHARACTER_STYLES: [&str; 12] = [
    "3D Pixar",
    "Anime",
    "Ghibli Style",
    "Realistic",
    "Fantasy Art",
    "Cartoon",
    "Cyberpunk",
    "Watercolor",
    "Pencil Sketch",
    "Pixel Art",
    "Sticker",
    "Superhero",
];

/// Backgrounds share the character styles minus the last two
pub const BACKGROUND_STYLES: [&str; 10] = [
    "3D Pixar",
    "Anime",
    "Ghibli Style",
    "Realistic",
    "Fantasy Art",
    "Cartoon",
    "Cyberpunk",
    "Watercolor",
    "Pencil Sketch",
    "Pixel Art",
];

pub const GENERATION_TEMPERATURE: f32 = 0.9;
pub const VARIATION_TEMPERATURE: f32 = 0.7;
pub const EDIT_TEMPERATURE: f32 = 0.5;

/// Aspect ratio requested for generated backgrounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    Portrait,
    #[default]
    Landscape,
    Square,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "9:16" => Ok(AspectRatio::Portrait),
            "16:9" => Ok(AspectRatio::Landscape),
            "1:1" => Ok(AspectRatio::Square),
            other => Err(format!("unsupported aspect ratio '{other}' (use 9:16, 16:9 or 1:1)")),
        }
    }
}

/// Free-text description of a character to generate.
/// Only `appearance` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterBrief {
    pub appearance: String,
    pub clothing: String,
    pub accessories: String,
    pub mood: String,
}

impl CharacterBrief {
    pub fn new(appearance: impl Into<String>) -> Self {
        Self {
            appearance: appearance.into(),
            ..Self::default()
        }
    }

    /// Appearance followed by whichever optional details are filled in
    pub fn description(&self) -> String {
        let mut parts = vec![self.appearance.trim().to_string()];
        if !self.clothing.trim().is_empty() {
            parts.push(format!("wearing {}", self.clothing.trim()));
        }
        if !self.accessories.trim().is_empty() {
            parts.push(format!("with accessories such as {}", self.accessories.trim()));
        }
        if !self.mood.trim().is_empty() {
            parts.push(format!("The character's expression is {}", self.mood.trim()));
        }
        parts.join(". ")
    }
}

pub fn character(description: &str, style: &str) -> String {
    format!(
        "Create a full-body character portrait in a {style} style, based on this description: \
         \"{description}\". The background should be neutral and simple (e.g., light gray)."
    )
}

pub fn background(description: &str, style: &str, aspect_ratio: AspectRatio) -> String {
    format!(
        "Create a high-quality, detailed background scene in a {style} style, based on this \
         description: \"{description}\". The image should not contain any characters or \
         prominent figures. The final image must have a {aspect_ratio} aspect ratio."
    )
}

pub fn variation() -> String {
    "Generate a character portrait that is a slight variation of the provided image. \
     Maintain the same art style, core facial features, and overall identity. Introduce a \
     subtle change in the character's facial expression or pose. The background must remain \
     simple and neutral, similar to the original. Do not add or change clothing or accessories."
        .to_string()
}

pub fn restyle(style: &str) -> String {
    format!(
        "Recreate the character in the provided image using a '{style}' art style. Faithfully \
         preserve the character's key features, clothing, and pose, but adapt the entire visual \
         presentation to the new style. The background must be simple and neutral."
    )
}

/// The background is the first image, characters follow
pub fn scene(description: &str) -> String {
    format!(
        "Use the first image provided as the main background. Place the following characters \
         (subsequent images) into the background.\nScene description of character actions: \
         \"{description}\".\nIntegrate the characters seamlessly into the background, matching \
         the lighting, shadows, and overall art style. The final image must retain the \
         background's original aspect ratio."
    )
}

pub fn edit(instruction: &str, masked: bool) -> String {
    if masked {
        format!(
            "Using the second image provided as a mask (the colored area is the region to \
             edit), perform the following edit on the first image: \"{instruction}\". Only \
             modify the masked area and blend it seamlessly with the rest of the image."
        )
    } else {
        format!("Edit the provided image based on this instruction: \"{instruction}\".")
    }
}
