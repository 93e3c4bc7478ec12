//! Viewport selection: which horizontal band of an image frames the subject.
//!
//! The answer is a vertical offset expressed as a percentage of the image
//! height. Face boxes win when a detector supplied any; otherwise the sharpest
//! tonal transition down the centre column (a horizon, a subject edge) is
//! used.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewportError {
    #[error("image has no rows to scan")]
    EmptyImage,
}

/// Axis-aligned face bounding box in pixels, `y` measured from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// RGB samples down a single image column, top to bottom, 8 bits per channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelColumn(pub Vec<[u8; 3]>);

impl PixelColumn {
    /// Sample the column at `round(width / 2)`, clamped inside the image.
    ///
    /// Deeper bit depths are normalized to 8 bits by the RGB conversion.
    pub fn center_of(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 {
            return Self::default();
        }
        let x = ((width as f64 / 2.0).round() as u32).min(width - 1);
        Self(
            (0..height)
                .map(|y| rgb.get_pixel(x, y).0)
                .collect(),
        )
    }

    pub fn rows(&self) -> usize {
        self.0.len()
    }
}

/// Face whose top edge is highest; ties keep detector order.
pub fn topmost_face(faces: &[FaceBox]) -> Option<&FaceBox> {
    faces.iter().min_by_key(|face| face.y)
}

/// Row with the largest colour change from the row above.
///
/// Each score belongs to the later row of the pair, so row 0 is never scored
/// and any column with two or more rows yields an index of at least 1. Ties
/// keep the lowest index. A single-row column yields 0.
pub fn max_contrast_row(column: &PixelColumn) -> usize {
    let mut best = (0usize, 0u32);
    for (i, pair) in column.0.windows(2).enumerate() {
        let score: u32 = pair[0]
            .iter()
            .zip(pair[1].iter())
            .map(|(a, b)| a.abs_diff(*b) as u32)
            .sum();
        let row = i + 1;
        if best.0 == 0 || score > best.1 {
            best = (row, score);
        }
    }
    best.0
}

/// Choose the viewport offset as a percentage of the image height.
///
/// `percent = round(100 * row / rows)`, always within `[0, 100]`.
pub fn select_viewport_percent(
    column: &PixelColumn,
    faces: &[FaceBox],
) -> Result<u8, ViewportError> {
    let rows = column.rows();
    if rows == 0 {
        return Err(ViewportError::EmptyImage);
    }
    let row = match topmost_face(faces) {
        Some(face) => face.y as usize,
        None => max_contrast_row(column),
    };
    let percent = (100.0 * row as f64 / rows as f64).round().min(100.0);
    Ok(percent as u8)
}

/// Top row of a `band` rows tall window centred on the `percent` offset,
/// kept inside an image `rows` tall.
pub fn band_top(percent: u8, rows: u32, band: u32) -> u32 {
    let band = band.min(rows);
    let center = (rows as f64 * percent as f64 / 100.0).round() as u32;
    center.saturating_sub(band / 2).min(rows - band)
}
