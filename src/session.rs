//! The image session: one input, an optional output, and named operations.
//!
//! Every operation follows the same path:
//!
//! ```text
//! acquire   input → frames (one, or the enumerated frame set)
//! decode    bytes → DynamicImage                    (ImageBackend)
//! transform image → image                           (Filter / geometry / viewport)
//! encode    image → bytes in the output format      (ImageBackend)
//! emit      bytes → file, published copy, or memory (Outcome)
//! ```
//!
//! ## Bindings
//!
//! The input and output are fixed when the session is built. An input
//! containing a frame placeholder (`shot%d.png`) reads every matching frame
//! in index order; an output containing one writes frame `n` to the `n`th
//! name. Without an output, results stay in memory as
//! [`Outcome::Encoded`].
//!
//! ## Output format
//!
//! Taken from the output's extension, else the input's detected format,
//! else PNG. Remote outputs are staged in an `easyimg-staging` directory
//! under the working directory and then handed to the [`Publisher`]. A
//! staging path that resolves to the input file is refused.
//!
//! A failed call leaves the session untouched; the next call starts fresh.

use crate::config::SessionConfig;
use crate::external::{
    ByteSource, CaptureRequest, CommandCapture, CommandFaceDetector, CommandPublisher,
    CommandViewer, DefaultByteSource, ExternalError, FaceDetector, NoFaceDetector, Publisher,
    ScreenCapture, Viewer,
};
use crate::frames::{self, FrameError, FramePattern, enumerate_frames, resolve_frame_output};
use crate::imaging::{
    BackendError, Color, Dimensions, Filter, GeometryError, GeometrySpec, ImageBackend,
    PixelColumn, Quality, Region, RustBackend, TextParams, ViewportError, inspect,
    is_writable, resolve_geometry, select_viewport_percent, viewport::band_top,
    writable_format,
};
use crate::location::Location;
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
    #[error(transparent)]
    Frames(#[from] FrameError),
    #[error(transparent)]
    External(#[from] ExternalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output '{output}' has no frame placeholder but {frames} frames were produced")]
    OutputNotPattern { output: String, frames: usize },
    #[error("{0} needs an output")]
    NoOutput(&'static str),
    #[error("{op} needs a frame pattern output such as shot%d.png, got '{output}'")]
    NeedsFramePattern { op: &'static str, output: String },
    #[error("Staging '{}' would overwrite the input", .0.display())]
    StagingOverwritesInput(PathBuf),
}

/// Subdirectory of the working directory that holds staged remote outputs.
const STAGING_DIR: &str = "easyimg-staging";

/// Where an operation's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Location(Location),
    Frames(FramePattern),
    /// Encoded bytes already in memory.
    Blob(Vec<u8>),
}

impl Input {
    /// A string with a frame placeholder is a frame set, anything else a location.
    pub fn parse(s: &str) -> Result<Input, FrameError> {
        if frames::contains_placeholder(s) {
            Ok(Input::Frames(s.parse()?))
        } else {
            Ok(Input::Location(Location::parse(s)))
        }
    }

    fn file_name(&self) -> Option<String> {
        match self {
            Input::Location(loc) => loc.file_name(),
            Input::Frames(_) | Input::Blob(_) => None,
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Location(loc) => loc.fmt(f),
            Input::Frames(pattern) => pattern.fmt(f),
            Input::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Where an operation's result goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Single(Location),
    Frames(FramePattern),
}

impl Output {
    pub fn parse(s: &str) -> Result<Output, FrameError> {
        if frames::contains_placeholder(s) {
            Ok(Output::Frames(s.parse()?))
        } else {
            Ok(Output::Single(Location::parse(s)))
        }
    }

    fn extension(&self) -> Option<String> {
        match self {
            Output::Single(loc) => loc.extension(),
            Output::Frames(pattern) => Location::parse(&pattern.resolve(0)).extension(),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Single(loc) => loc.fmt(f),
            Output::Frames(pattern) => pattern.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Files written (or published), in frame order.
    Written(Vec<Location>),
    /// No output bound: the encoded results, in frame order.
    Encoded(Vec<EncodedImage>),
    /// Nothing to do for the given arguments.
    Skipped,
}

/// Read-only description of the input image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// `WxH`
    pub geometry: String,
    pub mime_type: String,
    pub format: String,
    /// Estimated JPEG quality.
    pub quality: Option<u32>,
    pub file_size: u64,
    pub file_name: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// One input frame before decoding.
struct SourceFrame {
    index: u64,
    bytes: Vec<u8>,
    /// Set when the bytes already live in a local file.
    path: Option<PathBuf>,
}

/// A bound input/output pair and the collaborators that serve it.
pub struct ImageSession<B: ImageBackend = RustBackend> {
    input: Input,
    output: Option<Output>,
    config: SessionConfig,
    backend: B,
    source: Box<dyn ByteSource>,
    publisher: Box<dyn Publisher>,
    faces: Box<dyn FaceDetector>,
    capture: Box<dyn ScreenCapture>,
    viewer: Box<dyn Viewer>,
}

impl ImageSession<RustBackend> {
    pub fn new(input: Input, output: Option<Output>, config: SessionConfig) -> Self {
        Self::with_backend(RustBackend::new(), input, output, config)
    }
}

impl<B: ImageBackend> ImageSession<B> {
    /// Build a session whose collaborators come from `config`.
    pub fn with_backend(
        backend: B,
        input: Input,
        output: Option<Output>,
        config: SessionConfig,
    ) -> Self {
        let faces: Box<dyn FaceDetector> = match &config.faces.command {
            Some(program) => Box::new(CommandFaceDetector::new(
                program.clone(),
                config.faces.args.clone(),
            )),
            None => Box::new(NoFaceDetector),
        };
        Self {
            source: Box::new(DefaultByteSource),
            publisher: Box::new(CommandPublisher::new(config.publish.commands.clone())),
            faces,
            capture: Box::new(CommandCapture::new(&config.capture, &config.working_dir)),
            viewer: Box::new(CommandViewer::new(config.viewer.program.clone())),
            input,
            output,
            config,
            backend,
        }
    }

    pub fn with_byte_source(mut self, source: impl ByteSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Box::new(publisher);
        self
    }

    pub fn with_face_detector(mut self, faces: impl FaceDetector + 'static) -> Self {
        self.faces = Box::new(faces);
        self
    }

    pub fn with_screen_capture(mut self, capture: impl ScreenCapture + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    pub fn with_viewer(mut self, viewer: impl Viewer + 'static) -> Self {
        self.viewer = Box::new(viewer);
        self
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.config.working_dir
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Describe the input (the first frame of a frame set).
    pub fn info(&self) -> Result<ImageInfo, SessionError> {
        info!("info {}", self.input);
        let frame = self.first_frame()?;
        let format = image::guess_format(&frame.bytes)
            .map_err(|source| BackendError::DecodeFailure { source })?;
        let image = self.backend.decode(&frame.bytes)?;
        let file_name = self.input.file_name().or_else(|| {
            frame
                .path
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        });
        Ok(ImageInfo {
            geometry: Dimensions::new(image.width(), image.height()).to_string(),
            mime_type: format.to_mime_type().to_string(),
            format: format!("{format:?}").to_uppercase(),
            quality: (format == ImageFormat::Jpeg)
                .then(|| inspect::jpeg_quality(&frame.bytes))
                .flatten(),
            file_size: frame.bytes.len() as u64,
            file_name,
            properties: inspect::properties(&frame.bytes, format, &image),
        })
    }

    /// Annotate `text` centred along the bottom edge, styled from `[text]`.
    pub fn add_text(&self, text: &str, quality: Option<u32>) -> Result<Outcome, SessionError> {
        let style = &self.config.text;
        let params = TextParams {
            text: text.to_string(),
            size: style.size,
            fill: style.fill,
            stroke: style.stroke,
            font: style.font.clone(),
        };
        self.filter(Filter::DrawText(params), quality)
    }

    pub fn blur(
        &self,
        region: Region,
        strength: f32,
        quality: Option<u32>,
    ) -> Result<Outcome, SessionError> {
        self.filter(
            Filter::BlurRegion {
                region,
                sigma: strength,
            },
            quality,
        )
    }

    /// Crop to `region`. A region without width leaves the input alone.
    pub fn crop(&self, region: Region, quality: Option<u32>) -> Result<Outcome, SessionError> {
        if region.width == 0 {
            info!("crop: no width given, skipping");
            return Ok(Outcome::Skipped);
        }
        self.filter(Filter::Crop(region), quality)
    }

    /// Resize to `geometry` (`WxH`, `*W` or `*H` locking that side).
    pub fn resize(&self, geometry: &str, quality: Option<u32>) -> Result<Outcome, SessionError> {
        let requested: GeometrySpec = geometry.parse()?;
        self.run("resize", quality, None, |image| {
            let current = Dimensions::new(image.width(), image.height());
            let target = resolve_geometry(current.into(), requested);
            debug!("resize {current} by {requested} -> {target}");
            Ok(self.backend.apply(
                &image,
                &Filter::Resize {
                    width: target.width,
                    height: target.height,
                },
            )?)
        })
    }

    pub fn scale(&self, factor: f64, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Scale { factor }, quality)
    }

    /// Shrink to fit within `geometry`, keeping the aspect ratio.
    pub fn thumbnail(&self, geometry: &str, quality: Option<u32>) -> Result<Outcome, SessionError> {
        let bounds: GeometrySpec = geometry.parse()?;
        self.filter(
            Filter::Thumbnail {
                width: bounds.dimensions.width,
                height: bounds.dimensions.height,
            },
            quality,
        )
    }

    pub fn rotate(&self, degrees: f64, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Rotate { degrees }, quality)
    }

    /// Mirror top to bottom.
    pub fn flip(&self, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::FlipVertical, quality)
    }

    /// Mirror left to right.
    pub fn flop(&self, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::FlipHorizontal, quality)
    }

    pub fn grayscale(&self, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Grayscale, quality)
    }

    pub fn rectangle(
        &self,
        region: Region,
        color: Color,
        thickness: u32,
        quality: Option<u32>,
    ) -> Result<Outcome, SessionError> {
        self.filter(
            Filter::DrawRectangle {
                region,
                color,
                thickness,
            },
            quality,
        )
    }

    /// Draw the image at `overlay` over the input with its top-left at `(x, y)`.
    pub fn composite(
        &self,
        overlay: &Location,
        x: i64,
        y: i64,
        quality: Option<u32>,
    ) -> Result<Outcome, SessionError> {
        let overlay = self.backend.decode(&self.source.fetch(overlay)?)?;
        self.filter(Filter::Composite { overlay, x, y }, quality)
    }

    pub fn quantize(&self, colors: u32, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Quantize { colors }, quality)
    }

    pub fn equalize(&self, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Equalize, quality)
    }

    pub fn threshold(&self, level: u8, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Threshold { level }, quality)
    }

    pub fn vignette(&self, strength: f32, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Vignette { strength }, quality)
    }

    pub fn sketch(&self, sigma: f32, quality: Option<u32>) -> Result<Outcome, SessionError> {
        self.filter(Filter::Sketch { sigma }, quality)
    }

    /// Re-encode as the format named by `extension` (`png`, `jpg`, …).
    ///
    /// A bound output whose extension names another format is refused.
    pub fn convert(&self, extension: &str, quality: Option<u32>) -> Result<Outcome, SessionError> {
        let format = writable_format(extension)
            .ok_or_else(|| BackendError::UnsupportedConversion(extension.to_string()))?;
        if let Some(ext) = self.output.as_ref().and_then(Output::extension)
            && writable_format(&ext) != Some(format)
        {
            return Err(BackendError::UnsupportedConversion(format!(
                "{extension} into a .{ext} output"
            ))
            .into());
        }
        self.run("convert", quality, Some(format), Ok)
    }

    /// Vertical offset, in percent of the height, that best frames the input.
    ///
    /// The topmost detected face wins; without faces, the row with the
    /// sharpest change down the centre column.
    pub fn best_viewport(&self) -> Result<u8, SessionError> {
        info!("best_viewport {}", self.input);
        let frame = self.first_frame()?;
        let image = self.backend.decode(&frame.bytes)?;
        self.viewport_percent(&frame, &image)
    }

    /// Crop a full-width band `height` rows tall around the best viewport.
    pub fn crop_viewport(&self, height: u32, quality: Option<u32>) -> Result<Outcome, SessionError> {
        info!("crop_viewport {} ({height} rows)", self.input);
        let frames = self.load_frames()?;
        let detected = frames.first().and_then(|f| image::guess_format(&f.bytes).ok());
        let mut images = Vec::with_capacity(frames.len());
        for frame in &frames {
            let image = self.backend.decode(&frame.bytes)?;
            let percent = self.viewport_percent(frame, &image)?;
            let band = height.min(image.height());
            let top = band_top(percent, image.height(), band);
            debug!("viewport {percent}% -> rows {top}..{}", top + band);
            let region = Region::new(0, top, image.width(), band);
            images.push((frame.index, self.backend.apply(&image, &Filter::Crop(region))?));
        }
        self.encode_and_emit(images, detected, quality, None)
    }

    /// Grab the screen or a window into the output.
    pub fn capture_screen(&self, request: &CaptureRequest) -> Result<Outcome, SessionError> {
        info!("capture_screen {:?}", request.mode);
        let bytes = self.capture.capture(request)?;
        let image = self.backend.decode(&bytes)?;
        self.encode_and_emit(vec![(0, image)], Some(ImageFormat::Png), None, None)
    }

    /// Record numbered frames into the output pattern for `duration`.
    pub fn screencast(
        &self,
        duration: Duration,
        request: &CaptureRequest,
    ) -> Result<Outcome, SessionError> {
        let pattern = match &self.output {
            Some(Output::Frames(pattern)) => pattern,
            Some(Output::Single(loc)) => {
                return Err(SessionError::NeedsFramePattern {
                    op: "screencast",
                    output: loc.to_string(),
                });
            }
            None => return Err(SessionError::NoOutput("screencast")),
        };
        info!("screencast {pattern} for {duration:?}");
        let remote = matches!(Location::parse(pattern.template()), Location::Remote(_));
        let local = if remote {
            fs::create_dir_all(self.staging_dir())?;
            pattern.relocated(&self.staging_dir())
        } else {
            pattern.clone()
        };

        let recorded = self.capture.record_sequence(&local, duration, request)?;
        let format = self.output_format(Some(ImageFormat::Png))?;
        let mut written = Vec::with_capacity(recorded.len());
        for frame in &recorded {
            if format != ImageFormat::Png {
                let image = self.backend.decode(&fs::read(&frame.path)?)?;
                fs::write(&frame.path, self.backend.encode(&image, format, self.quality(None))?)?;
            }
            let target = resolve_frame_output(pattern, frame.index);
            if let Location::Remote(remote_loc) = &target {
                self.ensure_not_input(&frame.path)?;
                self.publisher.publish(&frame.path, remote_loc)?;
            }
            written.push(target);
        }
        Ok(Outcome::Written(written))
    }

    /// Assemble the input frames, in index order, into one looping GIF.
    pub fn animate(&self, delay_ms: u32) -> Result<Outcome, SessionError> {
        info!("animate {} ({delay_ms} ms/frame)", self.input);
        let frames = self.load_frames()?;
        let images = frames
            .iter()
            .map(|frame| self.backend.decode(&frame.bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let bytes = self.backend.encode_animation(&images, delay_ms)?;
        self.emit(vec![(
            0,
            EncodedImage {
                bytes,
                format: ImageFormat::Gif,
            },
        )])
    }

    /// The viewer command for the output; runs it too when `launch` is set.
    ///
    /// A remote output is shown from its staged copy.
    pub fn view(&self, launch: bool) -> Result<Vec<String>, SessionError> {
        let path = match &self.output {
            Some(Output::Single(Location::Local(path))) => path.clone(),
            Some(Output::Single(Location::Remote(remote))) => self.staging_path(remote.file_name()),
            Some(Output::Frames(_)) | None => return Err(SessionError::NoOutput("view")),
        };
        let command = self.viewer.command_line(&path);
        if launch {
            self.viewer.open(&path)?;
        }
        Ok(command)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn filter(&self, filter: Filter, quality: Option<u32>) -> Result<Outcome, SessionError> {
        let name = filter.name();
        self.run(name, quality, None, |image| Ok(self.backend.apply(&image, &filter)?))
    }

    /// Decode every input frame, transform it, then encode and emit.
    fn run<F>(
        &self,
        op: &str,
        quality: Option<u32>,
        format: Option<ImageFormat>,
        mut transform: F,
    ) -> Result<Outcome, SessionError>
    where
        F: FnMut(DynamicImage) -> Result<DynamicImage, SessionError>,
    {
        match &self.output {
            Some(output) => info!("{op} {} -> {output}", self.input),
            None => info!("{op} {}", self.input),
        }
        let frames = self.load_frames()?;
        let detected = frames.first().and_then(|f| image::guess_format(&f.bytes).ok());
        let mut images = Vec::with_capacity(frames.len());
        for frame in frames {
            let image = self.backend.decode(&frame.bytes)?;
            images.push((frame.index, transform(image)?));
        }
        self.encode_and_emit(images, detected, quality, format)
    }

    fn encode_and_emit(
        &self,
        images: Vec<(u64, DynamicImage)>,
        detected: Option<ImageFormat>,
        quality: Option<u32>,
        format: Option<ImageFormat>,
    ) -> Result<Outcome, SessionError> {
        let format = match format {
            Some(format) => format,
            None => self.output_format(detected)?,
        };
        let quality = self.quality(quality);
        let encoded = images
            .into_iter()
            .map(|(index, image)| {
                let bytes = self.backend.encode(&image, format, quality)?;
                Ok((index, EncodedImage { bytes, format }))
            })
            .collect::<Result<Vec<_>, SessionError>>()?;
        self.emit(encoded)
    }

    fn emit(&self, encoded: Vec<(u64, EncodedImage)>) -> Result<Outcome, SessionError> {
        match &self.output {
            None => Ok(Outcome::Encoded(
                encoded.into_iter().map(|(_, image)| image).collect(),
            )),
            Some(Output::Single(location)) => {
                if encoded.len() > 1 {
                    return Err(SessionError::OutputNotPattern {
                        output: location.to_string(),
                        frames: encoded.len(),
                    });
                }
                for (_, image) in &encoded {
                    self.write_to(location, &image.bytes)?;
                }
                Ok(Outcome::Written(vec![location.clone()]))
            }
            Some(Output::Frames(pattern)) => {
                let mut written = Vec::with_capacity(encoded.len());
                for (index, image) in &encoded {
                    let location = resolve_frame_output(pattern, *index);
                    self.write_to(&location, &image.bytes)?;
                    written.push(location);
                }
                Ok(Outcome::Written(written))
            }
        }
    }

    fn write_to(&self, location: &Location, bytes: &[u8]) -> Result<(), SessionError> {
        match location {
            Location::Local(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, bytes)?;
                debug!("wrote {} ({} bytes)", path.display(), bytes.len());
            }
            Location::Remote(remote) => {
                let staged = self.staging_path(remote.file_name());
                self.ensure_not_input(&staged)?;
                fs::create_dir_all(self.staging_dir())?;
                fs::write(&staged, bytes)?;
                debug!("staged {} for {}", staged.display(), remote.url);
                self.publisher.publish(&staged, remote)?;
            }
        }
        Ok(())
    }

    fn staging_dir(&self) -> PathBuf {
        self.config.working_dir.join(STAGING_DIR)
    }

    fn staging_path(&self, file_name: Option<&str>) -> PathBuf {
        self.staging_dir().join(file_name.unwrap_or("easyimg-output"))
    }

    /// Refuse to stage onto a file the input reads from.
    fn ensure_not_input(&self, staged: &Path) -> Result<(), SessionError> {
        let clobbers = match &self.input {
            Input::Location(Location::Local(path)) => same_file(path, staged),
            Input::Frames(pattern) => enumerate_frames(pattern)
                .map(|set| set.iter().any(|frame| same_file(&frame.path, staged)))
                .unwrap_or(false),
            Input::Location(Location::Remote(_)) | Input::Blob(_) => false,
        };
        if clobbers {
            return Err(SessionError::StagingOverwritesInput(staged.to_path_buf()));
        }
        Ok(())
    }

    fn load_frames(&self) -> Result<Vec<SourceFrame>, SessionError> {
        match &self.input {
            Input::Location(location) => Ok(vec![SourceFrame {
                index: 0,
                bytes: self.source.fetch(location)?,
                path: location.as_local().map(Path::to_path_buf),
            }]),
            Input::Frames(pattern) => enumerate_frames(pattern)?
                .iter()
                .map(|frame| {
                    Ok(SourceFrame {
                        index: frame.index,
                        bytes: self.source.fetch(&Location::Local(frame.path.clone()))?,
                        path: Some(frame.path.clone()),
                    })
                })
                .collect(),
            Input::Blob(bytes) => Ok(vec![SourceFrame {
                index: 0,
                bytes: bytes.clone(),
                path: None,
            }]),
        }
    }

    fn first_frame(&self) -> Result<SourceFrame, SessionError> {
        let mut frames = self.load_frames()?;
        if frames.is_empty() {
            return Err(ViewportError::EmptyImage.into());
        }
        Ok(frames.swap_remove(0))
    }

    fn output_format(&self, detected: Option<ImageFormat>) -> Result<ImageFormat, SessionError> {
        if let Some(ext) = self.output.as_ref().and_then(Output::extension) {
            return writable_format(&ext)
                .ok_or_else(|| BackendError::UnsupportedConversion(ext).into());
        }
        Ok(detected
            .filter(|format| is_writable(*format))
            .unwrap_or(ImageFormat::Png))
    }

    fn quality(&self, requested: Option<u32>) -> Option<Quality> {
        requested.or(self.config.images.quality).map(Quality::new)
    }

    fn viewport_percent(&self, frame: &SourceFrame, image: &DynamicImage) -> Result<u8, SessionError> {
        let faces = if !self.faces.is_enabled() {
            Vec::new()
        } else if let Some(path) = &frame.path {
            self.faces.detect_faces(path)?
        } else {
            fs::create_dir_all(&self.config.working_dir)?;
            let mut staged = tempfile::Builder::new()
                .prefix("easyimg-faces-")
                .tempfile_in(&self.config.working_dir)?;
            staged.write_all(&frame.bytes)?;
            staged.flush()?;
            self.faces.detect_faces(staged.path())?
        };
        let percent = select_viewport_percent(&PixelColumn::center_of(image), &faces)?;
        debug!("viewport {percent}% from {} face(s)", faces.len());
        Ok(percent)
    }
}

/// Whether both paths exist and name the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
