//! Mockgen composes a mockup image from a declarative scene: a background
//! (solid color or wallpaper), an uploaded photo under a 2D/3D transform, a
//! gradient overlay at adjustable opacity, and an optional busy indicator.
//!
//! The same deterministic pipeline serves the live preview and the exported
//! artifact:
//!
//! - Mutate a [`Scene`] through [`Session`] commands
//! - Render it with [`Renderer`] (preview) or capture it at 2x ([`Session::export`])
//! - Serialize the capture as PNG, JPEG, or SVG
#![forbid(unsafe_code)]

pub mod catalog;
pub mod composite;
pub mod core;
pub mod error;
pub mod export;
pub mod overlay;
pub mod remove_bg;
pub mod render;
pub mod scene;
pub mod session;
pub mod transform;

pub use crate::core::{Canvas, parse_hex_color};
pub use crate::error::{MockgenError, MockgenResult};
pub use crate::export::{Artifact, ExportFormat};
pub use crate::overlay::{GradientSpec, resolve_overlay};
pub use crate::remove_bg::{BackgroundRemover, RemoveBgClient};
pub use crate::render::{FrameRGBA, RenderOpts, Renderer, WallpaperSource};
pub use crate::scene::{
    Background, OverlaySelection, Scene, SceneFile, SceneImage, TransformParams,
};
pub use crate::session::{Command, Session};
pub use crate::transform::{Homography, Placement, compute_placement};
