//! The interactive session: one scene, one renderer, one update entrypoint.
//!
//! All mutation flows through [`Session::apply`] on a single thread, so
//! last-write-wins ordering holds trivially and the busy flag cannot race.
//! Recoverable failures are logged and the session keeps serving; only the
//! direct method calls surface errors to the caller.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;

use crate::core::Canvas;
use crate::error::{MockgenError, MockgenResult};
use crate::export::{Artifact, ExportFormat, serialize_frame};
use crate::remove_bg::{API_KEY_ENV, BackgroundRemover, RemoveBgClient};
use crate::render::{FrameRGBA, RenderOpts, Renderer};
use crate::scene::{Scene, SceneFile, SceneImage, TransformParams};

/// One scene update. Commands never fail the session; errors inside
/// [`Session::apply`] are logged and the previous state is kept.
#[derive(Clone, Debug)]
pub enum Command {
    SetBackgroundColor(String),
    SetWallpaper(String),
    SetTransform(TransformParams),
    SetOverlay(String),
    SetOverlayOpacity(f64),
    UploadImage { bytes: Vec<u8>, media_type: String },
    RemoveBackground,
    Export { format: ExportFormat, out_dir: PathBuf },
}

pub struct Session {
    pub scene: Scene,
    pub canvas: Canvas,
    renderer: Renderer,
    remover: Option<Box<dyn BackgroundRemover>>,
    started: Instant,
}

impl Session {
    /// Session with live HTTP services. Background removal is enabled only
    /// when the credential environment variable is present.
    pub fn new() -> Self {
        let remover: Option<Box<dyn BackgroundRemover>> = match RemoveBgClient::from_env() {
            Some(c) => Some(Box::new(c)),
            None => {
                tracing::info!("{API_KEY_ENV} not set; background removal disabled");
                None
            }
        };
        Self::with_parts(Canvas::default(), Renderer::with_http(), remover)
    }

    /// Session from explicit parts (tests inject stub services here).
    pub fn with_parts(
        canvas: Canvas,
        renderer: Renderer,
        remover: Option<Box<dyn BackgroundRemover>>,
    ) -> Self {
        Self {
            scene: Scene::default(),
            canvas,
            renderer,
            remover,
            started: Instant::now(),
        }
    }

    /// Phase of the ~1s scanning animation, derived from the session clock.
    pub fn busy_phase(&self) -> f64 {
        self.started.elapsed().as_secs_f64().fract()
    }

    /// Apply one update. Never fails: recoverable errors are logged and the
    /// scene is left in its previous consistent state.
    pub fn apply(&mut self, cmd: Command) {
        let outcome = match cmd {
            Command::SetBackgroundColor(hex) => {
                self.scene.set_background_color(hex);
                Ok(())
            }
            Command::SetWallpaper(url) => {
                self.scene.set_wallpaper(url);
                Ok(())
            }
            Command::SetTransform(t) => {
                self.scene.set_transform(t);
                Ok(())
            }
            Command::SetOverlay(id) => {
                self.scene.set_overlay(id);
                Ok(())
            }
            Command::SetOverlayOpacity(pct) => {
                self.scene.set_overlay_opacity(pct);
                Ok(())
            }
            Command::UploadImage { bytes, media_type } => {
                self.upload_image(&bytes, &media_type)
            }
            Command::RemoveBackground => self.remove_background(),
            Command::Export { format, out_dir } => {
                self.export(format, &out_dir).map(|path| {
                    tracing::info!("exported {}", path.display());
                })
            }
        };
        if let Err(e) = outcome {
            tracing::error!("scene update failed: {e}");
        }
    }

    /// Accept an uploaded image. Non-image payloads are rejected before any
    /// state changes; a rejected upload leaves the scene exactly as it was.
    #[tracing::instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn upload_image(&mut self, bytes: &[u8], media_type: &str) -> MockgenResult<()> {
        if !media_type.starts_with("image/") {
            return Err(MockgenError::validation(format!(
                "unsupported upload type '{media_type}'"
            )));
        }
        self.scene.processing = true;
        let decoded = SceneImage::decode(bytes);
        self.scene.processing = false;

        self.scene.set_uploaded_image(decoded?);
        Ok(())
    }

    /// Run remote background removal on the original upload.
    ///
    /// Without an image or without a configured remover this is a logged
    /// no-op. On failure the scene keeps the current rendered image; the
    /// original upload is never modified either way.
    #[tracing::instrument(skip(self))]
    pub fn remove_background(&mut self) -> MockgenResult<()> {
        let Some(source) = self.scene.source_image.clone() else {
            tracing::debug!("background removal requested without an image");
            return Ok(());
        };
        let Some(remover) = &self.remover else {
            let reason = MockgenError::missing_credential(format!("{API_KEY_ENV} is not set"));
            tracing::warn!("skipping background removal: {reason}");
            return Ok(());
        };

        self.scene.processing = true;
        let result = source.encode_png().and_then(|png| remover.remove(&png));
        self.scene.processing = false;

        let matted = result?;
        self.scene.set_rendered_image(matted);
        Ok(())
    }

    /// Render the live preview at canvas resolution.
    pub fn preview(&mut self) -> MockgenResult<FrameRGBA> {
        let opts = RenderOpts {
            scale: 1.0,
            busy_phase: self.busy_phase(),
        };
        self.renderer.render(&self.scene, self.canvas, &opts)
    }

    /// Capture and serialize the composition without writing it anywhere.
    pub fn capture(&mut self, format: ExportFormat) -> MockgenResult<Artifact> {
        // The busy veil drives the live preview only; a capture taken while
        // the flag is raised must still show the clean composition.
        let mut scene = self.scene.clone();
        scene.processing = false;
        let opts = RenderOpts {
            scale: format.capture_scale(),
            busy_phase: 0.0,
        };
        let frame = self.renderer.render(&scene, self.canvas, &opts)?;
        serialize_frame(&frame, format)
    }

    /// Export the composition to `out_dir/mockup.<ext>`.
    #[tracing::instrument(skip(self))]
    pub fn export(&mut self, format: ExportFormat, out_dir: &Path) -> MockgenResult<PathBuf> {
        self.scene.processing = true;
        let result = self
            .capture(format)
            .and_then(|artifact| artifact.write_to(out_dir));
        self.scene.processing = false;
        result
    }

    /// Load a declarative scene document, replacing the current scene state.
    /// The swap happens only after every part of the document resolves; a
    /// failed image read or decode leaves the current scene untouched.
    pub fn load_scene_file(&mut self, file: &SceneFile) -> MockgenResult<()> {
        let mut scene = Scene::default();
        scene.background = file.background.clone();
        scene.set_transform(file.transform);
        scene.set_overlay(file.overlay.id.clone());
        scene.set_overlay_opacity(file.overlay.opacity_pct);
        if let Some(path) = &file.image {
            let media_type = media_type_for_path(path);
            if !media_type.starts_with("image/") {
                return Err(MockgenError::validation(format!(
                    "unsupported scene image type '{media_type}' for '{}'",
                    path.display()
                )));
            }
            let bytes = std::fs::read(path)
                .with_context(|| format!("read scene image '{}'", path.display()))?;
            scene.set_uploaded_image(SceneImage::decode(&bytes)?);
        }
        self.canvas = file.canvas;
        self.scene = scene;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Media type from a file extension. Unknown extensions map to a non-image
/// type so the upload validation rejects them.
pub fn media_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
    .to_string()
}
