//! Read-only facts about an encoded image for `info`.
//!
//! Besides what the decoder reports, two things come straight from the JPEG
//! marker stream:
//!
//! - **Quality**: estimated from the luminance quantization table (DQT),
//!   assuming the standard IJG scaling most encoders use.
//! - **Properties**: the `COM` comment and IPTC title/caption/keywords from
//!   the Photoshop `APP13` block.
//!
//! Everything here is best-effort: a malformed stream yields fewer facts,
//! never an error.

use image::{DynamicImage, ImageFormat};
use std::collections::BTreeMap;

/// IJG standard luminance quantization table (any order; only the sum is used).
const STD_LUMA_QTABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69,
    56, 14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104,
    113, 92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

const DQT: u8 = 0xDB;
const COM: u8 = 0xFE;
const APP13: u8 = 0xED;
const SOS: u8 = 0xDA;

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Marker segments before the scan data, as `(marker, payload)`.
fn jpeg_segments(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    if !data.starts_with(&[0xFF, 0xD8]) {
        return segments;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == SOS {
            break;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > data.len() {
            break;
        }
        segments.push((marker, &data[pos + 4..pos + 2 + len]));
        pos += 2 + len;
    }
    segments
}

/// Values of quantization table 0 from one DQT payload.
fn luma_table(payload: &[u8]) -> Option<Vec<u16>> {
    let mut pos = 0;
    while pos < payload.len() {
        let precision = payload[pos] >> 4;
        let id = payload[pos] & 0x0F;
        let size = if precision == 0 { 64 } else { 128 };
        let body = payload.get(pos + 1..pos + 1 + size)?;
        if id == 0 {
            return Some(if precision == 0 {
                body.iter().map(|&v| v as u16).collect()
            } else {
                body.chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect()
            });
        }
        pos += 1 + size;
    }
    None
}

/// Estimated IJG quality (1-100) of a JPEG, if it has a luminance table.
pub fn jpeg_quality(data: &[u8]) -> Option<u32> {
    let table = jpeg_segments(data)
        .into_iter()
        .filter(|(marker, _)| *marker == DQT)
        .find_map(|(_, payload)| luma_table(payload))?;
    let sum: u32 = table.iter().map(|&v| v as u32).sum();
    if sum <= 64 {
        return Some(100);
    }
    let std_sum: u32 = STD_LUMA_QTABLE.iter().map(|&v| v as u32).sum();
    let scale = sum as f64 * 100.0 / std_sum as f64;
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    Some((quality.round() as u32).clamp(1, 100))
}

/// Raw IPTC-IIM bytes from a Photoshop `APP13` payload.
fn iptc_block(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);
    let mut pos = 0;
    // "8BIM" + id(2) + pascal name (padded even) + len(4) + data (padded even)
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            break;
        }
        let id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
        let name_len = data[pos + 6] as usize;
        pos += 6 + (1 + name_len).next_multiple_of(2);
        let len_bytes = data.get(pos..pos + 4)?;
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        pos += 4;
        let body = data.get(pos..pos + len)?;
        if id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        pos += len.next_multiple_of(2);
    }
    None
}

/// IPTC record 2 fields as `iptc:*` properties.
fn iptc_properties(iim: &[u8], props: &mut BTreeMap<String, String>) {
    let mut keywords = Vec::new();
    let mut pos = 0;
    while pos + 5 <= iim.len() && iim[pos] == 0x1C {
        let (record, dataset) = (iim[pos + 1], iim[pos + 2]);
        let len = u16::from_be_bytes([iim[pos + 3], iim[pos + 4]]) as usize;
        pos += 5;
        let Some(raw) = iim.get(pos..pos + len) else {
            break;
        };
        pos += len;
        let value = String::from_utf8_lossy(raw).trim().to_string();
        if record != 2 || value.is_empty() {
            continue;
        }
        match dataset {
            5 => {
                props.insert("iptc:title".into(), value);
            }
            25 => keywords.push(value),
            120 => {
                props.insert("iptc:caption".into(), value);
            }
            _ => {}
        }
    }
    if !keywords.is_empty() {
        props.insert("iptc:keywords".into(), keywords.join(", "));
    }
}

/// Descriptive properties, keyed `namespace:name`.
pub fn properties(data: &[u8], format: ImageFormat, image: &DynamicImage) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert("image:color_type".into(), format!("{:?}", image.color()));
    props.insert(
        "image:bits_per_pixel".into(),
        image.color().bits_per_pixel().to_string(),
    );
    if format == ImageFormat::Jpeg {
        for (marker, payload) in jpeg_segments(data) {
            match marker {
                COM => {
                    let comment = String::from_utf8_lossy(payload).trim().to_string();
                    if !comment.is_empty() {
                        props.insert("jpeg:comment".into(), comment);
                    }
                }
                APP13 => {
                    if let Some(iim) = iptc_block(payload) {
                        iptc_properties(iim, &mut props);
                    }
                }
                _ => {}
            }
        }
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ImageBuffer, Rgb};

    fn jpeg(quality: u8) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(16, 16, |x, y| {
            Rgb([(x * 16) as u8, (y * 16) as u8, 128])
        }));
        let mut buf = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            .unwrap();
        buf
    }

    /// SOI + the given segments + SOS, enough for the marker walker.
    fn with_segments(segments: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        for (marker, payload) in segments {
            out.extend([0xFF, *marker]);
            out.extend(((payload.len() + 2) as u16).to_be_bytes());
            out.extend(payload);
        }
        out.extend([0xFF, SOS, 0x00, 0x02]);
        out
    }

    fn iptc_dataset(dataset: u8, value: &str) -> Vec<u8> {
        let mut out = vec![0x1C, 0x02, dataset];
        out.extend((value.len() as u16).to_be_bytes());
        out.extend(value.as_bytes());
        out
    }

    fn app13(iim: &[u8]) -> Vec<u8> {
        let mut out = PHOTOSHOP_HEADER.to_vec();
        out.extend(BIM_MARKER);
        out.extend(IPTC_RESOURCE_ID.to_be_bytes());
        out.extend([0, 0]); // empty pascal name, padded
        out.extend((iim.len() as u32).to_be_bytes());
        out.extend(iim);
        out
    }

    #[test]
    fn estimates_encoder_quality() {
        for q in [50u8, 75, 90] {
            let estimate = jpeg_quality(&jpeg(q)).unwrap();
            assert!(
                (estimate as i32 - q as i32).abs() <= 2,
                "quality {q} estimated as {estimate}"
            );
        }
    }

    #[test]
    fn all_ones_table_is_quality_100() {
        let mut dqt = vec![0x00];
        dqt.extend([1u8; 64]);
        assert_eq!(jpeg_quality(&with_segments(&[(DQT, dqt)])), Some(100));
    }

    #[test]
    fn non_jpeg_has_no_quality() {
        assert_eq!(jpeg_quality(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(jpeg_quality(&[]), None);
    }

    #[test]
    fn truncated_segment_is_ignored() {
        let mut data = with_segments(&[(COM, b"hello".to_vec())]);
        data.truncate(6);
        assert!(jpeg_segments(&data).is_empty());
    }

    #[test]
    fn reads_comment_and_iptc() {
        let mut iim = iptc_dataset(5, "Dawn");
        iim.extend(iptc_dataset(25, "sea"));
        iim.extend(iptc_dataset(25, "sky"));
        iim.extend(iptc_dataset(120, "First light"));
        let data = with_segments(&[(COM, b"made here".to_vec()), (APP13, app13(&iim))]);
        let image = DynamicImage::new_rgb8(1, 1);

        let props = properties(&data, ImageFormat::Jpeg, &image);
        assert_eq!(props["jpeg:comment"], "made here");
        assert_eq!(props["iptc:title"], "Dawn");
        assert_eq!(props["iptc:caption"], "First light");
        assert_eq!(props["iptc:keywords"], "sea, sky");
        assert_eq!(props["image:color_type"], "Rgb8");
    }

    #[test]
    fn non_jpeg_properties_describe_pixels_only() {
        let image = DynamicImage::new_rgba8(1, 1);
        let props = properties(b"whatever", ImageFormat::Png, &image);
        assert_eq!(props.len(), 2);
        assert_eq!(props["image:bits_per_pixel"], "32");
    }
}
