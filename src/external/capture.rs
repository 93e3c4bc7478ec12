//! Screen and window capture.
//!
//! [`CommandCapture`] drives a command-line grabber (`scrot` by default),
//! which writes a PNG to the path given as its last argument. Recording is
//! repeated single captures at a fixed interval until the requested
//! duration has passed; there is always at least one frame.

use super::{ExternalError, run_command};
use crate::config::CaptureConfig;
use crate::frames::{Frame, FramePattern, FrameSet};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Screen,
    /// The focused window.
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    pub mode: CaptureMode,
    pub include_cursor: bool,
    /// Window decorations; ignored for full-screen captures.
    pub include_borders: bool,
}

pub trait ScreenCapture {
    /// Grab one PNG-encoded frame.
    fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, ExternalError>;

    /// Pause between frames when recording.
    fn interval(&self) -> Duration {
        Duration::from_millis(200)
    }

    /// Capture frames 1, 2, … into `pattern` (a local path) for `duration`.
    fn record_sequence(
        &self,
        pattern: &FramePattern,
        duration: Duration,
        request: &CaptureRequest,
    ) -> Result<FrameSet, ExternalError> {
        let first = PathBuf::from(pattern.resolve(1));
        if let Some(parent) = first.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let started = Instant::now();
        let mut frames = Vec::new();
        for index in 1u64.. {
            let path = PathBuf::from(pattern.resolve(index));
            fs::write(&path, self.capture(request)?)?;
            frames.push(Frame { index, path });
            if started.elapsed() >= duration {
                break;
            }
            thread::sleep(self.interval());
        }
        debug!("recorded {} frame(s) to {}", frames.len(), pattern);
        Ok(FrameSet(frames))
    }
}

#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: String,
    cursor_flag: String,
    border_flag: String,
    window_flag: String,
    interval: Duration,
    scratch_dir: PathBuf,
}

impl CommandCapture {
    /// `scratch_dir` holds the grabber's output until it is read back.
    pub fn new(config: &CaptureConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            cursor_flag: config.cursor_flag.clone(),
            border_flag: config.border_flag.clone(),
            window_flag: config.window_flag.clone(),
            interval: Duration::from_millis(config.interval_ms),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn args(&self, request: &CaptureRequest, target: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if request.mode == CaptureMode::Window {
            args.push(self.window_flag.clone());
            if request.include_borders {
                args.push(self.border_flag.clone());
            }
        }
        if request.include_cursor {
            args.push(self.cursor_flag.clone());
        }
        args.push(target.to_string_lossy().into_owned());
        args
    }
}

impl ScreenCapture for CommandCapture {
    fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, ExternalError> {
        let target = self
            .scratch_dir
            .join(format!("easyimg-capture-{}.png", std::process::id()));
        run_command(&self.program, &self.args(request, &target))?;
        let bytes = fs::read(&target)?;
        fs::remove_file(&target)?;
        Ok(bytes)
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn scrot(scratch: &Path) -> CommandCapture {
        CommandCapture::new(&CaptureConfig::default(), scratch)
    }

    // =========================================================================
    // Argument building
    // =========================================================================

    #[test]
    fn screen_capture_has_only_target() {
        let cap = scrot(Path::new("/tmp"));
        let args = cap.args(&CaptureRequest::default(), Path::new("/tmp/x.png"));
        assert_eq!(args, vec!["/tmp/x.png"]);
    }

    #[test]
    fn window_capture_with_borders_and_cursor() {
        let cap = scrot(Path::new("/tmp"));
        let request = CaptureRequest {
            mode: CaptureMode::Window,
            include_cursor: true,
            include_borders: true,
        };
        let args = cap.args(&request, Path::new("/tmp/x.png"));
        assert_eq!(args, vec!["--focused", "--border", "--pointer", "/tmp/x.png"]);
    }

    #[test]
    fn borders_ignored_for_screen() {
        let cap = scrot(Path::new("/tmp"));
        let request = CaptureRequest {
            include_borders: true,
            ..Default::default()
        };
        assert_eq!(cap.args(&request, Path::new("a.png")), vec!["a.png"]);
    }

    #[test]
    fn failing_grabber_is_command_failed() {
        let tmp = TempDir::new().unwrap();
        let config = CaptureConfig {
            program: "false".into(),
            ..Default::default()
        };
        let cap = CommandCapture::new(&config, tmp.path());
        assert!(matches!(
            cap.capture(&CaptureRequest::default()),
            Err(ExternalError::CommandFailed { .. })
        ));
    }

    #[test]
    fn grabber_without_output_is_io() {
        let tmp = TempDir::new().unwrap();
        let config = CaptureConfig {
            program: "true".into(),
            ..Default::default()
        };
        let cap = CommandCapture::new(&config, tmp.path());
        assert!(matches!(
            cap.capture(&CaptureRequest::default()),
            Err(ExternalError::Io(_))
        ));
    }

    // =========================================================================
    // Recording
    // =========================================================================

    struct CountingCapture {
        calls: Cell<u32>,
    }

    impl ScreenCapture for CountingCapture {
        fn capture(&self, _request: &CaptureRequest) -> Result<Vec<u8>, ExternalError> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("frame{}", self.calls.get()).into_bytes())
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(5)
        }
    }

    #[test]
    fn zero_duration_records_one_frame() {
        let tmp = TempDir::new().unwrap();
        let pattern: FramePattern = format!("{}/shot%d.png", tmp.path().display()).parse().unwrap();
        let cap = CountingCapture { calls: Cell::new(0) };
        let set = cap
            .record_sequence(&pattern, Duration::ZERO, &CaptureRequest::default())
            .unwrap();
        assert_eq!(set.indices(), vec![1]);
        assert_eq!(fs::read(tmp.path().join("shot1.png")).unwrap(), b"frame1");
    }

    #[test]
    fn recording_numbers_frames_from_one() {
        let tmp = TempDir::new().unwrap();
        let pattern: FramePattern = format!("{}/shot%02d.png", tmp.path().display()).parse().unwrap();
        let cap = CountingCapture { calls: Cell::new(0) };
        let set = cap
            .record_sequence(&pattern, Duration::from_millis(30), &CaptureRequest::default())
            .unwrap();
        assert!(set.len() >= 2);
        let expected: Vec<u64> = (1..=set.len() as u64).collect();
        assert_eq!(set.indices(), expected);
        assert!(tmp.path().join("shot01.png").exists());
    }
}
