//! Numbered frame sequences: `frame%d.png` ↔ `frame1.png, frame2.png, …`.
//!
//! A [`FramePattern`] is a filename template with exactly one numeric
//! placeholder, `%d` or a zero-padded `%0Nd`:
//!
//! ```text
//! shots/frame%d.png    → shots/frame7.png        (index 7)
//! shots/frame%03d.png  → shots/frame007.png
//! ```
//!
//! Reading expands the placeholder against the pattern's directory and
//! orders the matches by their numeric index, so `frame10` follows `frame9`.
//! Writing substitutes an index back into the template.

use crate::location::Location;
use log::debug;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(?:0(\d+))?d").expect("placeholder regex is valid"));

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("No frames found for pattern '{pattern}'")]
    NoFramesFound { pattern: String },
    #[error("Invalid frame pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
    #[error("Failed to list frames: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Whether `s` contains a frame placeholder at all.
pub fn contains_placeholder(s: &str) -> bool {
    PLACEHOLDER.is_match(s)
}

/// Filename template with exactly one numeric placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    template: String,
    prefix: String,
    suffix: String,
    /// Zero-padding width from `%0Nd`.
    width: usize,
}

impl FramePattern {
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute `index` into the placeholder.
    pub fn resolve(&self, index: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }

    /// The same pattern with its directory replaced by `dir`.
    ///
    /// Used to stage frames locally before they are published elsewhere.
    pub fn relocated(&self, dir: &Path) -> FramePattern {
        let file_prefix = match self.prefix.rfind('/') {
            Some(sep) => &self.prefix[sep + 1..],
            None => self.prefix.as_str(),
        };
        let prefix = dir.join(file_prefix).to_string_lossy().into_owned();
        let placeholder = &self.template[self.prefix.len()..self.template.len() - self.suffix.len()];
        FramePattern {
            template: format!("{prefix}{placeholder}{}", self.suffix),
            prefix,
            suffix: self.suffix.clone(),
            width: self.width,
        }
    }

    fn invalid(&self, reason: &'static str) -> FrameError {
        FrameError::InvalidPattern {
            pattern: self.template.clone(),
            reason,
        }
    }

    /// Split into the literal directory and a regex over file names in it.
    fn file_matcher(&self) -> Result<(PathBuf, Regex), FrameError> {
        if matches!(Location::parse(&self.prefix), Location::Remote(_)) {
            return Err(self.invalid("remote frame patterns cannot be enumerated"));
        }
        if self.suffix.contains('/') {
            return Err(self.invalid("the placeholder must be in the file name"));
        }
        let (dir, file_prefix) = match self.prefix.rfind('/') {
            Some(sep) => (PathBuf::from(&self.prefix[..=sep]), &self.prefix[sep + 1..]),
            None => (PathBuf::new(), self.prefix.as_str()),
        };
        let matcher = Regex::new(&format!(
            r"^{}(\d+){}$",
            regex::escape(file_prefix),
            regex::escape(&self.suffix)
        ))
        .map_err(|_| self.invalid("cannot build a matcher"))?;
        Ok((dir, matcher))
    }
}

impl FromStr for FramePattern {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| FrameError::InvalidPattern {
            pattern: s.to_string(),
            reason,
        };
        let mut found = PLACEHOLDER.captures_iter(s);
        let Some((caps, whole)) = found.next().and_then(|c| c.get(0).map(|m| (c, m))) else {
            return Err(invalid("no numeric placeholder"));
        };
        if found.next().is_some() {
            return Err(invalid("more than one numeric placeholder"));
        }
        let width = match caps.get(1) {
            Some(w) => w
                .as_str()
                .parse()
                .map_err(|_| invalid("padding width is out of range"))?,
            None => 0,
        };
        Ok(FramePattern {
            template: s.to_string(),
            prefix: s[..whole.start()].to_string(),
            suffix: s[whole.end()..].to_string(),
            width,
        })
    }
}

impl fmt::Display for FramePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// One existing frame file and the index parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub path: PathBuf,
}

/// Frames ordered by ascending numeric index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSet(pub Vec<Frame>);

impl FrameSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.0.iter()
    }

    pub fn indices(&self) -> Vec<u64> {
        self.0.iter().map(|f| f.index).collect()
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Find every existing file matching `pattern`, ordered by index.
///
/// Only the file-name part is expanded; the directory is literal. Ties on
/// index (`frame1.png` and `frame01.png` under `%d`) fall back to path order.
pub fn enumerate_frames(pattern: &FramePattern) -> Result<FrameSet, FrameError> {
    let (dir, matcher) = pattern.file_matcher()?;
    let root = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir.as_path()
    };
    let no_frames = || FrameError::NoFramesFound {
        pattern: pattern.template.clone(),
    };
    if !root.is_dir() {
        return Err(no_frames());
    }

    let mut frames = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let Some(index) = matcher
            .captures(&name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            continue;
        };
        frames.push(Frame {
            index,
            path: dir.join(name.as_ref()),
        });
    }

    if frames.is_empty() {
        return Err(no_frames());
    }
    frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
    debug!("{} frame(s) for {}", frames.len(), pattern);
    Ok(FrameSet(frames))
}

/// Output location for frame `index` of `pattern`.
pub fn resolve_frame_output(pattern: &FramePattern, index: u64) -> Location {
    Location::parse(&pattern.resolve(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    fn pattern_in(dir: &Path, file_template: &str) -> FramePattern {
        format!("{}/{}", dir.display(), file_template).parse().unwrap()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parse_plain_placeholder() {
        let p: FramePattern = "out%d.png".parse().unwrap();
        assert_eq!(p.resolve(7), "out7.png");
    }

    #[test]
    fn parse_padded_placeholder() {
        let p: FramePattern = "shots/frame%03d.png".parse().unwrap();
        assert_eq!(p.resolve(7), "shots/frame007.png");
        assert_eq!(p.resolve(1234), "shots/frame1234.png");
    }

    #[test]
    fn parse_rejects_missing_placeholder() {
        assert!(matches!(
            "out.png".parse::<FramePattern>(),
            Err(FrameError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn parse_rejects_two_placeholders() {
        assert!("a%d-%d.png".parse::<FramePattern>().is_err());
    }

    #[test]
    fn detects_placeholders() {
        assert!(contains_placeholder("x%d.png"));
        assert!(contains_placeholder("x%05d.png"));
        assert!(!contains_placeholder("x.png"));
        assert!(!contains_placeholder("100%.png"));
    }

    #[test]
    fn resolve_output_keeps_remote_scheme() {
        let p: FramePattern = "sftp://host/out%d.png".parse().unwrap();
        assert!(matches!(resolve_frame_output(&p, 3), Location::Remote(r) if r.url == "sftp://host/out3.png"));
    }

    #[test]
    fn relocated_moves_directory_only() {
        let p: FramePattern = "https://host/pics/f%02d.gif".parse().unwrap();
        let local = p.relocated(Path::new("/tmp/work"));
        assert_eq!(local.resolve(4), "/tmp/work/f04.gif");
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    #[test]
    fn enumerates_numerically_not_lexically() {
        let tmp = TempDir::new().unwrap();
        for i in 1..=12 {
            touch(tmp.path(), &format!("frame{i}.png"));
        }
        let set = enumerate_frames(&pattern_in(tmp.path(), "frame%d.png")).unwrap();
        assert_eq!(set.indices(), (1..=12).collect::<Vec<u64>>());
    }

    #[test]
    fn ignores_non_matching_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["frame2.png", "frame.png", "frameX.png", "frame3.jpg", "notes.txt", "xframe4.png"] {
            touch(tmp.path(), name);
        }
        fs::create_dir(tmp.path().join("frame5.png")).unwrap();
        let set = enumerate_frames(&pattern_in(tmp.path(), "frame%d.png")).unwrap();
        assert_eq!(set.indices(), vec![2]);
    }

    #[test]
    fn enumerate_then_resolve_round_trips() {
        let tmp = TempDir::new().unwrap();
        let names: Vec<String> = [3, 1, 20, 9, 100].iter().map(|i| format!("cap{i}.gif")).collect();
        for name in &names {
            touch(tmp.path(), name);
        }
        let pattern = pattern_in(tmp.path(), "cap%d.gif");
        let set = enumerate_frames(&pattern).unwrap();
        for frame in &set {
            assert_eq!(
                resolve_frame_output(&pattern, frame.index),
                Location::Local(frame.path.clone())
            );
        }
        assert_eq!(set.len(), names.len());
    }

    #[test]
    fn padded_pattern_round_trips() {
        let tmp = TempDir::new().unwrap();
        for i in [1, 2, 10] {
            touch(tmp.path(), &format!("f{i:03}.png"));
        }
        let pattern = pattern_in(tmp.path(), "f%03d.png");
        let set = enumerate_frames(&pattern).unwrap();
        assert_eq!(set.indices(), vec![1, 2, 10]);
        for frame in &set {
            assert_eq!(PathBuf::from(pattern.resolve(frame.index)), frame.path);
        }
    }

    #[test]
    fn empty_match_is_no_frames_found() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "other.png");
        assert!(matches!(
            enumerate_frames(&pattern_in(tmp.path(), "frame%d.png")),
            Err(FrameError::NoFramesFound { .. })
        ));
    }

    #[test]
    fn missing_directory_is_no_frames_found() {
        let p: FramePattern = "/definitely/not/here/frame%d.png".parse().unwrap();
        assert!(matches!(enumerate_frames(&p), Err(FrameError::NoFramesFound { .. })));
    }

    #[test]
    fn placeholder_in_directory_is_rejected() {
        let p: FramePattern = "run%d/frame.png".parse().unwrap();
        assert!(matches!(enumerate_frames(&p), Err(FrameError::InvalidPattern { .. })));
    }

    #[test]
    fn remote_pattern_cannot_be_enumerated() {
        let p: FramePattern = "https://host/f%d.png".parse().unwrap();
        assert!(matches!(enumerate_frames(&p), Err(FrameError::InvalidPattern { .. })));
    }
}
