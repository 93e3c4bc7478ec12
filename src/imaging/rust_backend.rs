//! Pure Rust image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::load_from_memory` |
//! | Encode | `image::DynamicImage::write_to`, `JpegEncoder::new_with_quality` |
//!
//! Before encoding, buffers are converted to a color type the target
//! encoder accepts: GIF takes RGBA8, WebP and TIFF take 8-bit RGB(A), PNG
//! takes any 8 or 16-bit integer layout.
//! | Animation | `image::codecs::gif::GifEncoder` |
//! | Resize / scale | `resize_exact` with `Lanczos3` |
//! | Thumbnail | `DynamicImage::thumbnail` |
//! | Region blur | `imageops::blur` + `imageops::replace` |
//! | Free-angle rotate | `imageproc::geometric_transformations::rotate_about_center` |
//! | Rectangle | `imageproc::drawing::draw_hollow_rect_mut` |
//! | Text | `imageproc::drawing::draw_text_mut` with an `ab_glyph` font |
//! | Composite | `imageops::overlay` |
//! | Equalize, threshold | `imageproc::contrast`, via [`effects`](super::effects) |
//! | Quantize, vignette, sketch | [`effects`](super::effects) |

use super::backend::{BackendError, ImageBackend};
use super::effects;
use super::geometry::{Dimensions, scale_by};
use super::params::{Filter, Quality, Region, TextParams};
use ab_glyph::{FontVec, PxScale};
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::rect::Rect;
use log::debug;
use std::borrow::Cow;
use std::io::Cursor;

/// Formats with an encoder compiled in, keyed by file extension.
const WRITABLE: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

/// Output format for an extension, if it has an encoder.
pub fn writable_format(extension: &str) -> Option<ImageFormat> {
    WRITABLE
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, fmt)| *fmt)
}

/// Whether `format` has an encoder compiled in.
pub fn is_writable(format: ImageFormat) -> bool {
    WRITABLE.iter().any(|(_, fmt)| *fmt == format)
}

/// Margin between annotated text and the bottom edge.
const TEXT_MARGIN: u32 = 8;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn clip(region: Region, image: &DynamicImage) -> Result<Region, BackendError> {
    region.clip_to(image.width(), image.height()).ok_or_else(|| {
        BackendError::ProcessingFailed(format!(
            "region {}x{}+{}+{} lies outside the {}x{} image",
            region.width,
            region.height,
            region.x,
            region.y,
            image.width(),
            image.height()
        ))
    })
}

fn blur_region(image: &DynamicImage, region: Region, sigma: f32) -> Result<DynamicImage, BackendError> {
    let r = clip(region, image)?;
    let patch = image.crop_imm(r.x, r.y, r.width, r.height).to_rgba8();
    let blurred = imageops::blur(&patch, sigma);
    let mut canvas = image.to_rgba8();
    imageops::replace(&mut canvas, &blurred, r.x as i64, r.y as i64);
    Ok(DynamicImage::ImageRgba8(canvas))
}

fn rotate(image: &DynamicImage, degrees: f64) -> DynamicImage {
    let normalized = degrees.rem_euclid(360.0);
    let near = |target: f64| (normalized - target).abs() < 0.01;
    if near(0.0) || near(360.0) {
        image.clone()
    } else if near(90.0) {
        image.rotate90()
    } else if near(180.0) {
        image.rotate180()
    } else if near(270.0) {
        image.rotate270()
    } else {
        let rotated: RgbaImage = rotate_about_center(
            &image.to_rgba8(),
            degrees.to_radians() as f32,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );
        DynamicImage::ImageRgba8(rotated)
    }
}

fn draw_rectangle(image: &DynamicImage, region: Region, color: Rgba<u8>, thickness: u32) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    for inset in 0..thickness.max(1) {
        let (w, h) = (
            region.width.saturating_sub(2 * inset),
            region.height.saturating_sub(2 * inset),
        );
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, color);
    }
    DynamicImage::ImageRgba8(canvas)
}

fn load_font(params: &TextParams) -> Result<FontVec, BackendError> {
    let path = params.font.as_ref().ok_or_else(|| {
        BackendError::ProcessingFailed("no font configured for text annotation".into())
    })?;
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|e| {
        BackendError::ProcessingFailed(format!("invalid font {}: {}", path.display(), e))
    })
}

/// Draw text centred along the bottom edge with a one-pixel stroke.
fn draw_text(image: &DynamicImage, params: &TextParams) -> Result<DynamicImage, BackendError> {
    let font = load_font(params)?;
    let scale = PxScale::from(params.size);
    let mut canvas = image.to_rgba8();
    let (text_w, text_h) = text_size(scale, &font, &params.text);
    let x = (canvas.width().saturating_sub(text_w) / 2) as i32;
    let y = canvas
        .height()
        .saturating_sub(text_h + TEXT_MARGIN) as i32;

    for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
        draw_text_mut(&mut canvas, params.stroke.rgba(), x + dx, y + dy, scale, &font, &params.text);
    }
    draw_text_mut(&mut canvas, params.fill.rgba(), x, y, scale, &font, &params.text);
    Ok(DynamicImage::ImageRgba8(canvas))
}

fn composite(image: &DynamicImage, overlay: &DynamicImage, x: i64, y: i64) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    imageops::overlay(&mut canvas, &overlay.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

/// `image` in a color type the encoder for `format` accepts.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    use image::ColorType::*;
    let accepted = match format {
        ImageFormat::Png => matches!(
            image.color(),
            L8 | La8 | Rgb8 | Rgba8 | L16 | La16 | Rgb16 | Rgba16
        ),
        ImageFormat::Gif => image.color() == Rgba8,
        _ => matches!(image.color(), Rgb8 | Rgba8),
    };
    if accepted {
        Cow::Borrowed(image)
    } else if image.color().has_alpha() || format == ImageFormat::Gif {
        Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
    } else {
        Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(bytes).map_err(|source| BackendError::DecodeFailure { source })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError> {
        if !is_writable(format) {
            return Err(BackendError::UnsupportedConversion(format!("{format:?}")));
        }
        let mut buf = Vec::new();
        let result = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let q = quality.unwrap_or_default().value() as u8;
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q))
            }
            other => encodable(image, other).write_to(&mut Cursor::new(&mut buf), other),
        };
        result.map_err(|source| BackendError::EncodeFailure { format, source })?;
        debug!("encoded {:?} ({} bytes)", format, buf.len());
        Ok(buf)
    }

    fn encode_animation(
        &self,
        frames: &[DynamicImage],
        delay_ms: u32,
    ) -> Result<Vec<u8>, BackendError> {
        let format = ImageFormat::Gif;
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|source| BackendError::EncodeFailure { format, source })?;
            for image in frames {
                let delay = Delay::from_numer_denom_ms(delay_ms, 1);
                let frame = Frame::from_parts(image.to_rgba8(), 0, 0, delay);
                encoder
                    .encode_frame(frame)
                    .map_err(|source| BackendError::EncodeFailure { format, source })?;
            }
        }
        Ok(buf)
    }

    fn apply(&self, image: &DynamicImage, filter: &Filter) -> Result<DynamicImage, BackendError> {
        let out = match filter {
            Filter::Crop(region) => {
                let r = clip(*region, image)?;
                image.crop_imm(r.x, r.y, r.width, r.height)
            }
            Filter::BlurRegion { region, sigma } => blur_region(image, *region, *sigma)?,
            Filter::Resize { width, height } => {
                image.resize_exact((*width).max(1), (*height).max(1), FilterType::Lanczos3)
            }
            Filter::Scale { factor } => {
                if !(factor.is_finite() && *factor > 0.0) {
                    return Err(BackendError::ProcessingFailed(format!(
                        "scale factor must be positive, got {factor}"
                    )));
                }
                let Dimensions { width, height } =
                    scale_by(Dimensions::new(image.width(), image.height()), *factor);
                image.resize_exact(width, height, FilterType::Lanczos3)
            }
            Filter::Thumbnail { width, height } => image.thumbnail((*width).max(1), (*height).max(1)),
            Filter::Rotate { degrees } => rotate(image, *degrees),
            Filter::FlipVertical => image.flipv(),
            Filter::FlipHorizontal => image.fliph(),
            Filter::Grayscale => image.grayscale(),
            Filter::DrawRectangle {
                region,
                color,
                thickness,
            } => draw_rectangle(image, *region, color.rgba(), *thickness),
            Filter::DrawText(params) => draw_text(image, params)?,
            Filter::Composite { overlay, x, y } => composite(image, overlay, *x, *y),
            Filter::Quantize { colors } => {
                DynamicImage::ImageRgba8(effects::quantize(&image.to_rgba8(), *colors))
            }
            Filter::Equalize => DynamicImage::ImageRgba8(effects::equalize(&image.to_rgba8())),
            Filter::Threshold { level } => DynamicImage::ImageLuma8(effects::threshold(image, *level)),
            Filter::Vignette { strength } => {
                DynamicImage::ImageRgba8(effects::vignette(&image.to_rgba8(), *strength))
            }
            Filter::Sketch { sigma } => DynamicImage::ImageLuma8(effects::sketch(image, *sigma)),
        };
        debug!(
            "{}: {}x{} -> {}x{}",
            filter.name(),
            image.width(),
            image.height(),
            out.width(),
            out.height()
        );
        Ok(out)
    }
}
