//! Collaborators outside the process: byte sources, publishing, face
//! detection, screen capture and the image viewer.
//!
//! Each concern is a trait with one production implementation that shells
//! out or talks HTTP, so the session can be tested with in-memory fakes.

pub mod capture;
pub mod faces;
pub mod source;
pub mod viewer;

pub use capture::{CaptureMode, CaptureRequest, CommandCapture, ScreenCapture};
pub use faces::{CommandFaceDetector, FaceDetector, NoFaceDetector};
pub use source::{ByteSource, CommandPublisher, DefaultByteSource, Publisher};
pub use viewer::{CommandViewer, Viewer};

use log::debug;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unsupported scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Failed to parse tool output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Run `program` with `args` to completion, returning its stdout.
///
/// A missing program surfaces as `Io`; a non-zero exit as `CommandFailed`.
pub(crate) fn run_command(program: &str, args: &[String]) -> Result<Vec<u8>, ExternalError> {
    debug!("running {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(ExternalError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Replace each `{key}` in `template` with its value.
pub(crate) fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
