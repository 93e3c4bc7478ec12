//! Face detection through an external program.
//!
//! The configured command receives the image path (via `{input}` in its
//! arguments) and must print a JSON array of boxes on stdout:
//!
//! ```json
//! [{"x": 120, "y": 80, "width": 64, "height": 64}]
//! ```

use super::{ExternalError, fill_template, run_command};
use crate::imaging::FaceBox;
use log::debug;
use std::path::Path;

pub trait FaceDetector {
    /// Faces in the image at `path`, in detector order.
    fn detect_faces(&self, path: &Path) -> Result<Vec<FaceBox>, ExternalError>;

    /// False when detection can never find anything, so callers can skip
    /// staging the image.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no detector is configured: never finds a face.
#[derive(Debug, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect_faces(&self, _path: &Path) -> Result<Vec<FaceBox>, ExternalError> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct CommandFaceDetector {
    program: String,
    args: Vec<String>,
}

impl CommandFaceDetector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Parse the detector's stdout. Blank output means no faces.
pub fn parse_faces(stdout: &[u8]) -> Result<Vec<FaceBox>, ExternalError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(stdout)?)
}

impl FaceDetector for CommandFaceDetector {
    fn detect_faces(&self, path: &Path) -> Result<Vec<FaceBox>, ExternalError> {
        let input = path.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| fill_template(arg, &[("input", input.as_ref())]))
            .collect();
        let faces = parse_faces(&run_command(&self.program, &args)?)?;
        debug!("{} face(s) in {}", faces.len(), path.display());
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_boxes_in_order() {
        let faces = parse_faces(br#"[{"x":1,"y":2,"width":3,"height":4},{"x":5,"y":6,"width":7,"height":8}]"#).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!((faces[0].x, faces[0].y), (1, 2));
        assert_eq!(faces[1].height, 8);
    }

    #[test]
    fn blank_output_is_no_faces() {
        assert!(parse_faces(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_output_is_parse_error() {
        assert!(matches!(parse_faces(b"faces: 3"), Err(ExternalError::Parse(_))));
    }

    #[test]
    fn no_detector_finds_nothing() {
        assert!(NoFaceDetector.detect_faces(Path::new("x.png")).unwrap().is_empty());
        assert!(!NoFaceDetector.is_enabled());
    }

    #[test]
    fn command_detector_passes_input_path() {
        // $0 is the substituted {input}
        let detector = CommandFaceDetector::new(
            "sh",
            vec![
                "-c".into(),
                r#"test "$0" = /tmp/in.png && echo '[{"x":0,"y":9,"width":1,"height":1}]'"#.into(),
                "{input}".into(),
            ],
        );
        let faces = detector.detect_faces(Path::new("/tmp/in.png")).unwrap();
        assert_eq!(faces[0].y, 9);
    }
}
