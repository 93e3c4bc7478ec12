//! Pixel effects on top of `image` and `imageproc::contrast`.
//!
//! Equalization and thresholding delegate to `imageproc`; quantize, vignette
//! and the sketch blend have no crate counterpart. Each function reads one
//! buffer and builds a new one.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage, imageops};
use imageproc::contrast::{self, ThresholdType, equalize_histogram};
use std::collections::HashMap;

/// Reduce an image to at most `colors` distinct RGB values (alpha untouched).
///
/// Colours are bucketed at 5 bits per channel; the most populated buckets
/// become the palette (bucket mean), and every pixel snaps to its nearest
/// palette entry.
pub fn quantize(img: &RgbaImage, colors: u32) -> RgbaImage {
    let colors = colors.clamp(1, 256) as usize;

    let mut buckets: HashMap<[u8; 3], (u64, [u64; 3])> = HashMap::new();
    for px in img.pixels() {
        let key = [px[0] >> 3, px[1] >> 3, px[2] >> 3];
        let entry = buckets.entry(key).or_insert((0, [0; 3]));
        entry.0 += 1;
        for c in 0..3 {
            entry.1[c] += px[c] as u64;
        }
    }

    let mut ranked: Vec<([u8; 3], (u64, [u64; 3]))> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.0.cmp(&b.0)));
    let palette: Vec<[u8; 3]> = ranked
        .iter()
        .take(colors)
        .map(|(_, (count, sums))| {
            [
                (sums[0] / count) as u8,
                (sums[1] / count) as u8,
                (sums[2] / count) as u8,
            ]
        })
        .collect();

    if palette.is_empty() {
        return img.clone();
    }

    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let px = img.get_pixel(x, y);
        let nearest = palette
            .iter()
            .min_by_key(|p| {
                (0..3)
                    .map(|c| {
                        let d = p[c] as i32 - px[c] as i32;
                        (d * d) as u32
                    })
                    .sum::<u32>()
            })
            .copied()
            .unwrap_or([px[0], px[1], px[2]]);
        Rgba([nearest[0], nearest[1], nearest[2], px[3]])
    })
}

/// Per-channel histogram equalization of the RGB channels (alpha untouched).
pub fn equalize(img: &RgbaImage) -> RgbaImage {
    let channels: Vec<GrayImage> = (0..3)
        .map(|c| {
            let plane = ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
                Luma([img.get_pixel(x, y)[c]])
            });
            equalize_histogram(&plane)
        })
        .collect();

    let mut out = img.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        for (c, plane) in channels.iter().enumerate() {
            px[c] = plane.get_pixel(x, y)[0];
        }
    }
    out
}

/// Black/white by luma: strictly above `level` becomes white.
pub fn threshold(img: &DynamicImage, level: u8) -> GrayImage {
    contrast::threshold(&img.to_luma8(), level, ThresholdType::Binary)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Darken towards the corners. `strength` 0 leaves the image unchanged,
/// 1 takes the corners to black.
pub fn vignette(img: &RgbaImage, strength: f32) -> RgbaImage {
    let strength = strength.clamp(0.0, 1.0);
    let cx = (img.width() as f32 - 1.0) / 2.0;
    let cy = (img.height() as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut out = img.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let dist = (dx * dx + dy * dy).sqrt() / max_dist;
        let factor = 1.0 - strength * smoothstep(0.5, 1.0, dist);
        for c in 0..3 {
            px[c] = (px[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Pencil sketch: grayscale colour-dodged with its own blurred negative.
pub fn sketch(img: &DynamicImage, sigma: f32) -> GrayImage {
    let gray = img.to_luma8();
    let mut negative = gray.clone();
    imageops::invert(&mut negative);
    let blurred = imageops::blur(&negative, sigma.max(0.1));

    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let base = gray.get_pixel(x, y)[0] as u32;
        let blend = blurred.get_pixel(x, y)[0] as u32;
        let dodged = if blend >= 255 {
            255
        } else {
            (base * 255 / (255 - blend)).min(255)
        };
        Luma([dodged as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    fn distinct_colors(img: &RgbaImage) -> usize {
        img.pixels()
            .map(|p| [p[0], p[1], p[2]])
            .collect::<HashSet<_>>()
            .len()
    }

    #[test]
    fn quantize_limits_palette() {
        let img = gradient(40, 30);
        let out = quantize(&img, 8);
        assert!(distinct_colors(&out) <= 8);
        assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn quantize_keeps_alpha() {
        let img = ImageBuffer::from_pixel(4, 4, Rgba([10, 20, 30, 77]));
        let out = quantize(&img, 2);
        assert_eq!(out.get_pixel(0, 0)[3], 77);
    }

    #[test]
    fn equalize_stretches_narrow_range() {
        let img = ImageBuffer::from_fn(4, 1, |x, _| {
            let v = 100 + x as u8 * 10;
            Rgba([v, v, v, 255])
        });
        let out = equalize(&img);
        let spread = out.get_pixel(3, 0)[0] - out.get_pixel(0, 0)[0];
        assert!(spread > 30, "spread {spread}");
        assert_eq!(out.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn equalize_keeps_alpha_and_order() {
        let img = ImageBuffer::from_fn(3, 1, |x, _| Rgba([10 + x as u8, 50, 200 - x as u8, 90]));
        let out = equalize(&img);
        assert!(out.pixels().all(|p| p[3] == 90));
        assert!(out.get_pixel(0, 0)[0] < out.get_pixel(2, 0)[0]);
        assert!(out.get_pixel(0, 0)[2] > out.get_pixel(2, 0)[2]);
    }

    #[test]
    fn threshold_splits_on_level() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_fn(2, 1, |x, _| {
            Luma([if x == 0 { 100 } else { 200 }])
        }));
        let out = threshold(&img, 128);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn threshold_level_itself_is_black() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(2, 2, Luma([128])));
        assert!(threshold(&img, 128).pixels().all(|p| p[0] == 0));
        assert!(threshold(&img, 127).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn vignette_darkens_corners_not_center() {
        let img = ImageBuffer::from_pixel(21, 21, Rgba([200, 200, 200, 255]));
        let out = vignette(&img, 1.0);
        assert_eq!(out.get_pixel(10, 10)[0], 200);
        assert!(out.get_pixel(0, 0)[0] < 20);
    }

    #[test]
    fn vignette_zero_strength_is_identity() {
        let img = gradient(10, 10);
        assert_eq!(vignette(&img, 0.0), img);
    }

    #[test]
    fn sketch_of_flat_image_is_white() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 8, Rgba([128, 128, 128, 255])));
        let out = sketch(&img, 2.0);
        assert!(out.pixels().all(|p| p[0] >= 250));
    }
}
