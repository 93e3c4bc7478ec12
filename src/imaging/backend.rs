//! Image codec/filter backend trait and shared error type.
//!
//! The [`ImageBackend`] trait is the seam between the session and pixel work:
//! decode bytes, encode an image, assemble an animation, and apply one
//! [`Filter`]. Every method takes its input by reference and returns a new
//! value, so each step can be tested in isolation and nothing aliases.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! and `imageproc` crates.

use super::params::{Filter, Quality};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {source}")]
    DecodeFailure {
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {format:?}: {source}")]
    EncodeFailure {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("No codec route to {0}")]
    UnsupportedConversion(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image codec/filter backends.
pub trait ImageBackend {
    /// Decode an encoded image (any compiled-in format).
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Encode to `format`. `quality` only affects lossy formats.
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError>;

    /// Encode frames, in order, as a looping animated GIF.
    fn encode_animation(
        &self,
        frames: &[DynamicImage],
        delay_ms: u32,
    ) -> Result<Vec<u8>, BackendError>;

    /// Apply one filter, returning a new image.
    fn apply(&self, image: &DynamicImage, filter: &Filter) -> Result<DynamicImage, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::Region;
    use image::error::{DecodingError, ImageFormatHint};
    use std::sync::Mutex;

    /// Mock backend that records operations and fakes the pixel work.
    ///
    /// Decoding yields a blank image of the next queued size (64x48 when the
    /// queue is empty); empty input fails to decode. Geometry-changing filters
    /// return an image of the resulting size so callers see realistic
    /// dimensions.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_sizes: Mutex<Vec<(u32, u32)>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Encode {
            format: ImageFormat,
            quality: Option<u32>,
            width: u32,
            height: u32,
        },
        EncodeAnimation {
            frames: usize,
            delay_ms: u32,
        },
        Apply(String),
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue decode sizes; they are handed out in the given order.
        pub fn with_sizes(sizes: Vec<(u32, u32)>) -> Self {
            let mut sizes = sizes;
            sizes.reverse();
            Self {
                decode_sizes: Mutex::new(sizes),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_rgba8(width, height)
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Decode(bytes.len()));
            if bytes.is_empty() {
                return Err(BackendError::DecodeFailure {
                    source: image::ImageError::Decoding(DecodingError::new(
                        ImageFormatHint::Unknown,
                        "empty input",
                    )),
                });
            }
            let (w, h) = self.decode_sizes.lock().unwrap().pop().unwrap_or((64, 48));
            Ok(blank(w, h))
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: ImageFormat,
            quality: Option<Quality>,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::Encode {
                format,
                quality: quality.map(Quality::value),
                width: image.width(),
                height: image.height(),
            });
            Ok(format!("{:?}:{}x{}", format, image.width(), image.height()).into_bytes())
        }

        fn encode_animation(
            &self,
            frames: &[DynamicImage],
            delay_ms: u32,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::EncodeAnimation {
                frames: frames.len(),
                delay_ms,
            });
            Ok(b"GIF89a".to_vec())
        }

        fn apply(
            &self,
            image: &DynamicImage,
            filter: &Filter,
        ) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Apply(filter.name().to_string()));
            let out = match filter {
                Filter::Crop(Region { width, height, .. }) => blank(*width, *height),
                Filter::Resize { width, height } => blank(*width, *height),
                _ => image.clone(),
            };
            Ok(out)
        }
    }

    #[test]
    fn mock_hands_out_sizes_in_order() {
        let backend = MockBackend::with_sizes(vec![(10, 20), (30, 40)]);
        assert_eq!(backend.decode(b"a").unwrap().width(), 10);
        assert_eq!(backend.decode(b"b").unwrap().width(), 30);
        assert_eq!(backend.decode(b"c").unwrap().width(), 64);
    }

    #[test]
    fn mock_empty_input_fails_to_decode() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode(&[]),
            Err(BackendError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn mock_records_apply_and_encode() {
        let backend = MockBackend::new();
        let img = backend.decode(b"x").unwrap();
        let cropped = backend
            .apply(&img, &Filter::Crop(Region::new(0, 0, 5, 6)))
            .unwrap();
        backend
            .encode(&cropped, ImageFormat::Jpeg, Some(Quality::new(80)))
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[1], RecordedOp::Apply("crop".into()));
        assert!(matches!(
            &ops[2],
            RecordedOp::Encode {
                format: ImageFormat::Jpeg,
                quality: Some(80),
                width: 5,
                height: 6,
            }
        ));
    }
}
