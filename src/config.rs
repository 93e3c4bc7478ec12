//! Session configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to override.
//!
//! ## Config File Location
//!
//! `--config` names either a `config.toml` file or a directory containing
//! one. Without the flag, `config.toml` in the current directory is used if
//! it exists.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! working_dir = "/tmp"      # Staging area for remote outputs and captures
//!
//! [images]
//! # quality = 90            # Default lossy quality (1-100); encoder default when unset
//!
//! [text]
//! # font = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"
//! size = 26.0
//! fill = "#ffffff"
//! stroke = "#000000"
//!
//! [viewer]
//! program = "feh"
//!
//! [capture]
//! program = "scrot"
//! cursor_flag = "--pointer"
//! border_flag = "--border"
//! window_flag = "--focused"
//! interval_ms = 200
//!
//! [faces]
//! # command = "detect-faces"
//! args = ["{input}"]
//!
//! [publish.commands]
//! # sftp = "scp {local} {path}"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Remote outputs are staged in its `easyimg-staging` subdirectory.
    pub working_dir: PathBuf,
    pub images: ImagesConfig,
    pub text: TextConfig,
    pub viewer: ViewerConfig,
    pub capture: CaptureConfig,
    pub faces: FacesConfig,
    pub publish: PublishConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/tmp"),
            images: ImagesConfig::default(),
            text: TextConfig::default(),
            viewer: ViewerConfig::default(),
            capture: CaptureConfig::default(),
            faces: FacesConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality.is_some_and(|q| !(1..=100).contains(&q)) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if !(self.text.size.is_finite() && self.text.size > 0.0) {
            return Err(ConfigError::Validation(
                "text.size must be a positive number".into(),
            ));
        }
        if self.viewer.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "viewer.program must not be empty".into(),
            ));
        }
        if self.capture.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "capture.program must not be empty".into(),
            ));
        }
        if self.faces.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "faces.command must not be empty when set".into(),
            ));
        }
        if let Some((scheme, _)) = self
            .publish
            .commands
            .iter()
            .find(|(_, template)| template.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "publish.commands.{scheme} must not be empty"
            )));
        }
        Ok(())
    }
}

/// Encoding defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Lossy encoding quality used when an operation is given none.
    pub quality: Option<u32>,
}

/// Text annotation style for `add_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// Font file. Text cannot be drawn without one.
    pub font: Option<PathBuf>,
    /// Glyph height in pixels.
    pub size: f32,
    pub fill: Color,
    pub stroke: Color,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font: None,
            size: 26.0,
            fill: Color::WHITE,
            stroke: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub program: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            program: "feh".to_string(),
        }
    }
}

/// Screen grabber invocation. The flags default to `scrot`'s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub program: String,
    pub cursor_flag: String,
    pub border_flag: String,
    pub window_flag: String,
    /// Pause between frames when recording a screencast.
    pub interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "scrot".to_string(),
            cursor_flag: "--pointer".to_string(),
            border_flag: "--border".to_string(),
            window_flag: "--focused".to_string(),
            interval_ms: 200,
        }
    }
}

/// External face detector. Without a command no faces are ever found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacesConfig {
    pub command: Option<String>,
    /// Arguments; `{input}` is replaced with the image path.
    pub args: Vec<String>,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec!["{input}".to_string()],
        }
    }
}

/// Command templates for publishing to non-local schemes, keyed by scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub commands: BTreeMap<String, String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SessionConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// The config file `path` refers to: itself, or `config.toml` inside it.
pub fn config_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join("config.toml")
    } else {
        path.to_path_buf()
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = config_file(path);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SessionConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SessionConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path` (a file, or a directory holding `config.toml`).
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# easyimg Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Staging directory for remote outputs, captures, and face detection input.
working_dir = "/tmp"

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[images]
# Default JPEG quality (1 = worst, 100 = best) when an operation is given none.
# Omit to use the encoder default (90).
# quality = 90

# ---------------------------------------------------------------------------
# Text annotation (add-text)
# ---------------------------------------------------------------------------
[text]
# TrueType/OpenType font file. Required for add-text.
# font = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"
size = 26.0
fill = "#ffffff"
stroke = "#000000"

# ---------------------------------------------------------------------------
# External viewer (view)
# ---------------------------------------------------------------------------
[viewer]
program = "feh"

# ---------------------------------------------------------------------------
# Screen capture (capture-screen, screencast)
# ---------------------------------------------------------------------------
[capture]
# The grabber is called as: program [flags...] <target.png>
program = "scrot"
cursor_flag = "--pointer"
border_flag = "--border"
window_flag = "--focused"
# Pause between screencast frames.
interval_ms = 200

# ---------------------------------------------------------------------------
# Face detection (best-viewport)
# ---------------------------------------------------------------------------
[faces]
# Program printing a JSON array of {"x","y","width","height"} boxes.
# Without it, the viewport falls back to the contrast scan.
# command = "detect-faces"
args = ["{input}"]

# ---------------------------------------------------------------------------
# Publishing to remote outputs
# ---------------------------------------------------------------------------
# One command template per scheme. Variables: {local} {remote} {path} {name}.
# http and https fall back to an HTTP PUT when no template is given.
[publish.commands]
# sftp = "scp {local} {path}"
"##
}
