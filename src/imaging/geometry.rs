//! Geometry specs and aspect-preserving dimension resolution.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! A geometry spec is `<width>x<height>`. Either side may carry the lock
//! marker `*`, which names the axis that must land exactly on its requested
//! value:
//!
//! ```text
//! 640x480     fit: the larger requested value lands on the larger current side
//! *518x500    width is forced to 518, height follows the aspect ratio
//! 320x*240    height is forced to 240
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marks the axis that drives the scale factor.
pub const LOCK_MARKER: char = '*';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid geometry '{spec}': {reason}")]
    InvalidGeometry { spec: String, reason: &'static str },
}

fn invalid(spec: &str, reason: &'static str) -> GeometryError {
    GeometryError::InvalidGeometry {
        spec: spec.to_string(),
        reason,
    }
}

/// Width and height of an image, both at least 1 once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn get(self, axis: Axis) -> u32 {
        match axis {
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<Dimensions> for GeometrySpec {
    fn from(d: Dimensions) -> Self {
        GeometrySpec {
            dimensions: d,
            lock: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

/// Parsed `<w>x<h>` request with an optional locked axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySpec {
    pub dimensions: Dimensions,
    pub lock: Option<Axis>,
}

impl GeometrySpec {
    pub fn new(width: u32, height: u32) -> Self {
        Dimensions::new(width, height).into()
    }

    pub fn locked(width: u32, height: u32, axis: Axis) -> Self {
        Self {
            dimensions: Dimensions::new(width, height),
            lock: Some(axis),
        }
    }
}

/// Parse one side of a spec, stripping a leading lock marker.
fn parse_component(spec: &str, raw: &str) -> Result<(u32, bool), GeometryError> {
    let (digits, locked) = match raw.strip_prefix(LOCK_MARKER) {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    if digits.contains(LOCK_MARKER) {
        return Err(invalid(spec, "lock marker must prefix a dimension"));
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(spec, "dimension is not a number"));
    }
    let value: u32 = digits
        .parse()
        .map_err(|_| invalid(spec, "dimension is out of range"))?;
    if value == 0 {
        return Err(invalid(spec, "dimension must be positive"));
    }
    Ok((value, locked))
}

impl FromStr for GeometrySpec {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (w, h) = trimmed
            .split_once('x')
            .ok_or_else(|| invalid(s, "missing 'x' separator"))?;
        let (width, w_locked) = parse_component(s, w)?;
        let (height, h_locked) = parse_component(s, h)?;
        let lock = match (w_locked, h_locked) {
            (true, true) => return Err(invalid(s, "only one dimension may be locked")),
            (true, false) => Some(Axis::Width),
            (false, true) => Some(Axis::Height),
            (false, false) => None,
        };
        Ok(GeometrySpec {
            dimensions: Dimensions::new(width, height),
            lock,
        })
    }
}

impl fmt::Display for GeometrySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = |axis| {
            if self.lock == Some(axis) {
                "*"
            } else {
                ""
            }
        };
        write!(
            f,
            "{}{}x{}{}",
            marker(Axis::Width),
            self.dimensions.width,
            marker(Axis::Height),
            self.dimensions.height
        )
    }
}

/// Round half away from zero and clamp to a minimum of 1 pixel.
fn scale_dimension(value: u32, factor: f64) -> u32 {
    let scaled = (value as f64 * factor).round();
    if scaled < 1.0 {
        1
    } else if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Resolve a requested geometry against the image's current dimensions.
///
/// With a locked axis, that axis lands exactly on its requested value. Without
/// one, the request is a bounding size independent of orientation: its larger
/// value lands on the current image's larger side (ties favour width), so a
/// `640x480` request turns a portrait `1449x1932` into `480x640`.
///
/// Any lock on `current` is ignored.
///
/// # Examples
/// ```
/// # use easyimg::imaging::{resolve_geometry, Dimensions, GeometrySpec};
/// let current: GeometrySpec = "1449x1932".parse().unwrap();
/// let requested: GeometrySpec = "640x480".parse().unwrap();
/// assert_eq!(resolve_geometry(current, requested), Dimensions::new(480, 640));
/// ```
pub fn resolve_geometry(current: GeometrySpec, requested: GeometrySpec) -> Dimensions {
    let cur = current.dimensions;
    let req = requested.dimensions;

    let (driving, target) = match requested.lock {
        Some(axis) => (axis, req.get(axis)),
        None => {
            let axis = if cur.width >= cur.height {
                Axis::Width
            } else {
                Axis::Height
            };
            (axis, req.width.max(req.height))
        }
    };

    let factor = target as f64 / cur.get(driving) as f64;
    Dimensions::new(
        scale_dimension(cur.width, factor),
        scale_dimension(cur.height, factor),
    )
}

/// Parse both specs and resolve them.
pub fn resolve(current: &str, requested: &str) -> Result<Dimensions, GeometryError> {
    Ok(resolve_geometry(current.parse()?, requested.parse()?))
}

/// Scale dimensions by a plain factor, clamping each side to at least 1.
pub fn scale_by(dims: Dimensions, factor: f64) -> Dimensions {
    Dimensions::new(
        scale_dimension(dims.width, factor),
        scale_dimension(dims.height, factor),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parse_plain_spec() {
        let spec: GeometrySpec = "640x480".parse().unwrap();
        assert_eq!(spec, GeometrySpec::new(640, 480));
    }

    #[test]
    fn parse_locked_width() {
        let spec: GeometrySpec = "*518x500".parse().unwrap();
        assert_eq!(spec.lock, Some(Axis::Width));
        assert_eq!(spec.dimensions, Dimensions::new(518, 500));
    }

    #[test]
    fn parse_locked_height() {
        let spec: GeometrySpec = "320x*240".parse().unwrap();
        assert_eq!(spec.lock, Some(Axis::Height));
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(matches!(
            "640".parse::<GeometrySpec>(),
            Err(GeometryError::InvalidGeometry { reason, .. }) if reason.contains("separator")
        ));
    }

    #[test]
    fn parse_rejects_two_locks() {
        assert!("*640x*480".parse::<GeometrySpec>().is_err());
    }

    #[test]
    fn parse_rejects_non_numeric() {
        for bad in ["abcx480", "640x", "x480", "64.5x480", "-640x480", "640x4 80"] {
            assert!(bad.parse::<GeometrySpec>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn parse_rejects_zero() {
        assert!("0x480".parse::<GeometrySpec>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["640x480", "*518x500", "320x*240"] {
            assert_eq!(s.parse::<GeometrySpec>().unwrap().to_string(), s);
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn portrait_fits_larger_requested_side() {
        assert_eq!(resolve("1449x1932", "640x480").unwrap(), Dimensions::new(480, 640));
    }

    #[test]
    fn locked_axis_already_matching_is_noop() {
        assert_eq!(resolve("518x1024", "*518x500").unwrap(), Dimensions::new(518, 1024));
    }

    #[test]
    fn locked_height_overrides_larger_width() {
        // 1600x900 landscape, height forced to 450 → factor 0.5
        assert_eq!(resolve("1600x900", "640x*450").unwrap(), Dimensions::new(800, 450));
    }

    #[test]
    fn landscape_fits_width() {
        // 2000x1500, target 800 on the longer side
        assert_eq!(resolve("2000x1500", "800x600").unwrap(), Dimensions::new(800, 600));
    }

    #[test]
    fn square_ties_drive_width() {
        assert_eq!(resolve("500x500", "250x100").unwrap(), Dimensions::new(250, 250));
    }

    #[test]
    fn upscales_when_request_is_larger() {
        assert_eq!(resolve("100x50", "400x400").unwrap(), Dimensions::new(400, 200));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 2x5 scaled by 0.5 → 1 x 2.5 → 1 x 3
        assert_eq!(resolve("2x5", "*1x1").unwrap(), Dimensions::new(1, 3));
        // 6x5 scaled by 0.5 → 3 x 2.5 → 3 x 3
        assert_eq!(resolve("6x5", "*3x1").unwrap(), Dimensions::new(3, 3));
        assert_eq!(resolve("5x3", "*3x1").unwrap(), Dimensions::new(3, 2));
    }

    #[test]
    fn tiny_factor_clamps_to_one() {
        assert_eq!(resolve("4000x10", "40x40").unwrap(), Dimensions::new(40, 1));
    }

    #[test]
    fn malformed_request_propagates() {
        assert!(resolve("640x480", "640by480").is_err());
        assert!(resolve("640x", "640x480").is_err());
    }

    #[test]
    fn resolution_is_a_fixed_point() {
        let cases = [
            ("1449x1932", "640x480"),
            ("1920x1080", "800x600"),
            ("333x777", "100x100"),
            ("518x1024", "*518x500"),
            ("1600x900", "640x*450"),
        ];
        for (current, requested) in cases {
            let first = resolve(current, requested).unwrap();
            let second = resolve_geometry(first.into(), requested.parse().unwrap());
            assert_eq!(first, second, "{current} → {requested}");
        }
    }

    #[test]
    fn unlocked_resolution_preserves_aspect_within_one_pixel() {
        let currents = [(1449, 1932), (1920, 1080), (37, 1001), (640, 640), (7, 3)];
        let requests = [(640, 480), (100, 100), (3000, 2000), (1, 50)];
        for &(cw, ch) in &currents {
            for &(rw, rh) in &requests {
                let out = resolve_geometry(GeometrySpec::new(cw, ch), GeometrySpec::new(rw, rh));
                let target = rw.max(rh) as f64;
                let factor = target / cw.max(ch) as f64;
                let exact_w = (cw as f64 * factor).max(1.0);
                let exact_h = (ch as f64 * factor).max(1.0);
                assert!((out.width as f64 - exact_w).abs() <= 1.0, "{cw}x{ch} → {rw}x{rh}");
                assert!((out.height as f64 - exact_h).abs() <= 1.0, "{cw}x{ch} → {rw}x{rh}");
            }
        }
    }

    #[test]
    fn scale_by_clamps() {
        assert_eq!(scale_by(Dimensions::new(10, 3), 0.1), Dimensions::new(1, 1));
        assert_eq!(scale_by(Dimensions::new(10, 4), 1.5), Dimensions::new(15, 6));
    }
}
