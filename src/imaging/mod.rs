//! Image processing: geometry, viewport selection, and the codec/filter backend.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Geometry** | pure dimension math ([`resolve_geometry`]) |
//! | **Viewport** | centre-column contrast scan or topmost face ([`select_viewport_percent`]) |
//! | **Decode / encode** | `image` crate |
//! | **Filters** | `image::imageops`, `imageproc`, [`effects`] |
//! | **Inspection** | JPEG quality estimate and marker properties ([`inspect`]) |
//!
//! The module is split into:
//! - **Geometry / viewport**: pure functions (unit testable)
//! - **Parameters**: data describing a transform ([`Filter`])
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Effects**: pixel loops the backend delegates to

pub mod backend;
pub mod effects;
pub mod geometry;
pub mod inspect;
mod params;
pub mod rust_backend;
pub mod viewport;

pub use backend::{BackendError, ImageBackend};
pub use geometry::{Axis, Dimensions, GeometryError, GeometrySpec, resolve_geometry};
pub use params::{Color, Filter, ParseColorError, Quality, Region, TextParams};
pub use rust_backend::{RustBackend, is_writable, writable_format};
pub use viewport::{FaceBox, PixelColumn, ViewportError, select_viewport_percent};
