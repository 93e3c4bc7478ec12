//! Shared test utilities: synthetic images and fixture files.

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image filled with one colour.
pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(rgb)))
}

/// Horizontal black/white bands `band` rows tall, starting with black.
pub fn striped_image(width: u32, height: u32, band: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, y| {
        if (y / band) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    }))
}

// =========================================================================
// Encoding
// =========================================================================

/// PNG-encoded bytes of `image`.
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

