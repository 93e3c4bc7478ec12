//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`session`](crate::session) (which decides which
//! transform a call needs) and the [`backend`](super::backend) (which does the
//! pixel work). Swapping the backend for a mock never changes a parameter.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Region`]: Axis-aligned rectangle in pixel units, origin top-left.
//! - [`Color`]: RGBA colour parsed from `#rrggbb` / `#rrggbbaa`.
//! - [`TextParams`]: Annotation text, size, fill/stroke colours, font file.
//! - [`Filter`]: One pure transform `image → image`, with its parameters.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Rectangle in pixel units, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the region to an image of `width` x `height`.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clip_to(self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Region::new(self.x, self.y, w, h))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid colour '{0}': expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(pub String);

/// RGBA colour, 8 bits per channel. Serialized in its `#rrggbb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub fn rgba(self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Text annotation drawn centred along the bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub text: String,
    /// Glyph height in pixels.
    pub size: f32,
    pub fill: Color,
    pub stroke: Color,
    /// TrueType/OpenType font file. Text cannot be drawn without one.
    pub font: Option<PathBuf>,
}

/// A single pure transform. The backend returns a new image and never
/// mutates its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Crop(Region),
    /// Gaussian blur of one region, composited back over the original.
    BlurRegion { region: Region, sigma: f32 },
    /// Exact resize to the given dimensions.
    Resize { width: u32, height: u32 },
    Scale { factor: f64 },
    /// Fit within the box, preserving aspect ratio.
    Thumbnail { width: u32, height: u32 },
    Rotate { degrees: f64 },
    FlipVertical,
    FlipHorizontal,
    Grayscale,
    DrawRectangle {
        region: Region,
        color: Color,
        thickness: u32,
    },
    DrawText(TextParams),
    /// Alpha-over composite with the overlay's top-left at `(x, y)`.
    Composite {
        overlay: DynamicImage,
        x: i64,
        y: i64,
    },
    Quantize { colors: u32 },
    Equalize,
    Threshold { level: u8 },
    Vignette { strength: f32 },
    Sketch { sigma: f32 },
}

impl Filter {
    /// Short operation name used in logs and test recordings.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Crop(_) => "crop",
            Filter::BlurRegion { .. } => "blur",
            Filter::Resize { .. } => "resize",
            Filter::Scale { .. } => "scale",
            Filter::Thumbnail { .. } => "thumbnail",
            Filter::Rotate { .. } => "rotate",
            Filter::FlipVertical => "flip",
            Filter::FlipHorizontal => "flop",
            Filter::Grayscale => "grayscale",
            Filter::DrawRectangle { .. } => "rectangle",
            Filter::DrawText(_) => "add_text",
            Filter::Composite { .. } => "composite",
            Filter::Quantize { .. } => "quantize",
            Filter::Equalize => "equalize",
            Filter::Threshold { .. } => "threshold",
            Filter::Vignette { .. } => "vignette",
            Filter::Sketch { .. } => "sketch",
        }
    }
}
