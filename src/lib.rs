//! # easyimg
//!
//! Scriptable image manipulation. A session binds one input (a file, a URL,
//! raw bytes, or a numbered frame sequence) to an optional output and runs a
//! single operation on it: resize, crop, blur, annotate, rotate, convert,
//! assemble an animation, pick the most interesting viewport, and so on.
//!
//! # Architecture
//!
//! ```text
//! Input ──fetch──▶ decode ──▶ ImageBackend op ──▶ encode ──▶ Output
//!   │                                                          │
//!   └─ frame pattern: every frame goes through the same op ────┘
//!                                         remote output: stage + publish
//! ```
//!
//! Pixel work goes through the [`imaging::ImageBackend`] trait so session
//! logic can be tested against a recording mock. Everything that touches
//! the outside world (HTTP, screen grabbers, face detectors, viewers,
//! upload commands) sits behind a trait in [`external`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | `ImageSession`: binds input/output/config and implements every operation |
//! | [`imaging`] | Backend trait, pure-Rust backend, geometry strings, viewport selection, JPEG inspection |
//! | [`frames`] | `%d` frame patterns: parsing, enumeration on disk, per-frame output names |
//! | [`location`] | Local path vs. remote URL classification |
//! | [`external`] | Byte sources, publishers, screen capture, face detection, viewer |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`commands`] | Built-in command help for `list` and `search` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Frame Patterns Instead of Globs
//!
//! A sequence is named with a printf-style placeholder (`frame%d.png`,
//! `frame%03d.png`). Enumeration matches the digits exactly, so `frame10`
//! sorts after `frame9` without relying on zero padding, and the same
//! pattern doubles as the output template for per-frame results.
//!
//! ## No Silent Overwrite of the Input
//!
//! Operations never write back to the input. Without an output, the encoded
//! bytes are returned to the caller (the CLI writes them to stdout). A remote
//! output is staged in `working_dir/easyimg-staging`; a staging path that
//! is the input file fails with `SessionError::StagingOverwritesInput`.

pub mod commands;
pub mod config;
pub mod external;
pub mod frames;
pub mod imaging;
pub mod location;
pub mod output;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
