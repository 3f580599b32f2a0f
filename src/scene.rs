//! The mutable scene: one session-scoped description of the composition.
//!
//! The composed visual is a pure function of this state. Setters clamp
//! rather than reject, and the background is an enum so "exactly one of
//! solid color / wallpaper" holds by construction.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::composite::premultiply_rgba8_in_place;
use crate::core::{Canvas, Vec2};
use crate::error::{MockgenError, MockgenResult};

/// Default background color (the first preset).
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FF5733";

/// Default overlay opacity, percent.
pub const DEFAULT_OVERLAY_OPACITY: f64 = 50.0;

/// The active background. Selecting one kind replaces the other.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    /// Solid fill, hex `#RRGGBB`.
    Solid(String),
    /// Wallpaper image URL, stretched to cover the frame.
    Wallpaper(String),
}

impl Default for Background {
    fn default() -> Self {
        Self::Solid(DEFAULT_BACKGROUND_COLOR.to_string())
    }
}

/// A decoded image held as premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl SceneImage {
    /// Decode any format the `image` crate understands.
    pub fn decode(bytes: &[u8]) -> MockgenResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Encode back to straight-alpha PNG bytes (the removal upload payload).
    pub fn encode_png(&self) -> MockgenResult<Vec<u8>> {
        let mut straight = self.rgba8_premul.as_ref().clone();
        crate::composite::unpremultiply_rgba8_in_place(&mut straight);
        let img = image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| MockgenError::validation("image buffer size mismatch"))?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(out)
    }
}

/// User transform parameters, canvas-center origin, pixels and degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformParams {
    pub position: Vec2,
    /// Uniform scale, `[0.1, 2.0]`.
    pub scale: f64,
    /// 2D rotation, `[-180, 180]` degrees.
    pub rotation_deg: f64,
    /// Perspective rotation about the vertical axis, `[-45, 45]` degrees.
    pub tilt_deg: f64,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: 1.0,
            rotation_deg: 0.0,
            tilt_deg: 0.0,
        }
    }
}

impl TransformParams {
    /// Return a copy with every parameter clamped into its declared range.
    /// NaN inputs snap to the parameter default.
    pub fn clamped(&self) -> Self {
        fn clamp_or(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
            if v.is_nan() { fallback } else { v.clamp(lo, hi) }
        }
        fn finite_or_zero(v: f64) -> f64 {
            if v.is_finite() { v } else { 0.0 }
        }
        Self {
            position: Vec2::new(finite_or_zero(self.position.x), finite_or_zero(self.position.y)),
            scale: clamp_or(self.scale, 0.1, 2.0, 1.0),
            rotation_deg: clamp_or(self.rotation_deg, -180.0, 180.0, 0.0),
            tilt_deg: clamp_or(self.tilt_deg, -45.0, 45.0, 0.0),
        }
    }
}

/// The selected overlay and its opacity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlaySelection {
    pub id: String,
    /// Percent, `[0, 100]`.
    pub opacity_pct: f64,
}

impl Default for OverlaySelection {
    fn default() -> Self {
        Self {
            id: "none".to_string(),
            opacity_pct: DEFAULT_OVERLAY_OPACITY,
        }
    }
}

/// The full mutable composition state. Created once per session with
/// defaults and mutated in place; never persisted.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub background: Background,
    /// The uploaded image, untouched by background removal.
    pub source_image: Option<SceneImage>,
    /// The image actually drawn: the upload until background removal
    /// succeeds, then the matted replacement. `None` iff `source_image` is.
    pub rendered_image: Option<SceneImage>,
    pub transform: TransformParams,
    pub overlay: OverlaySelection,
    /// Busy flag while an async image operation is in flight.
    pub processing: bool,
}

impl Scene {
    pub fn set_background_color(&mut self, hex: impl Into<String>) {
        self.background = Background::Solid(hex.into());
    }

    pub fn set_wallpaper(&mut self, url: impl Into<String>) {
        self.background = Background::Wallpaper(url.into());
    }

    pub fn set_transform(&mut self, t: TransformParams) {
        self.transform = t.clamped();
    }

    pub fn set_overlay(&mut self, id: impl Into<String>) {
        self.overlay.id = id.into();
    }

    pub fn set_overlay_opacity(&mut self, pct: f64) {
        self.overlay.opacity_pct = if pct.is_nan() {
            DEFAULT_OVERLAY_OPACITY
        } else {
            pct.clamp(0.0, 100.0)
        };
    }

    /// Assign a freshly uploaded image to both slots.
    pub fn set_uploaded_image(&mut self, img: SceneImage) {
        self.source_image = Some(img.clone());
        self.rendered_image = Some(img);
    }

    /// Replace only the rendered image (successful background removal).
    pub fn set_rendered_image(&mut self, img: SceneImage) {
        self.rendered_image = Some(img);
    }

    pub fn has_image(&self) -> bool {
        debug_assert_eq!(self.source_image.is_none(), self.rendered_image.is_none());
        self.source_image.is_some()
    }
}

/// Declarative scene document for the CLI boundary. The image is referenced
/// by path; everything else deserializes straight into scene state.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneFile {
    pub background: Background,
    pub image: Option<PathBuf>,
    pub transform: TransformParams,
    pub overlay: OverlaySelection,
    pub canvas: Canvas,
}
