//! Composition renderer: paints the scene to a pixel surface.
//!
//! Layer order is a correctness invariant: background fill, then the
//! transformed image (or the placeholder glyph), then the overlay gradient,
//! then the busy indicator. Preview and export capture run through the same
//! path so the two can never disagree on output.

use std::collections::HashMap;
use std::sync::Arc;

use crate::composite::sample_bilinear_premul;
use crate::core::{Affine, BezPath, Canvas, Point, parse_hex_color};
use crate::error::{MockgenError, MockgenResult};
use crate::overlay::{GradientSpec, resolve_overlay};
use crate::scene::{Background, DEFAULT_BACKGROUND_COLOR, Scene, SceneImage};
use crate::transform::{Homography, compute_placement};

/// A rendered frame: premultiplied RGBA8, tightly packed, row-major.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Read one pixel. Panics out of bounds; probe convenience for tests.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height);
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Per-render options.
#[derive(Clone, Copy, Debug)]
pub struct RenderOpts {
    /// Uniform output upscale, `>= 1`. Export captures pass 2.
    pub scale: f64,
    /// Position of the scanning highlight in `[0, 1)`. The ~1s period is the
    /// caller's clock concern; taking a phase keeps renders deterministic.
    pub busy_phase: f64,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            scale: 1.0,
            busy_phase: 0.0,
        }
    }
}

/// Resolves a wallpaper URL to decoded pixels.
pub trait WallpaperSource {
    fn fetch(&mut self, url: &str) -> MockgenResult<SceneImage>;
}

/// Live HTTP wallpaper fetcher.
pub struct HttpWallpaperSource {
    http: reqwest::blocking::Client,
}

impl HttpWallpaperSource {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpWallpaperSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WallpaperSource for HttpWallpaperSource {
    #[tracing::instrument(skip(self))]
    fn fetch(&mut self, url: &str) -> MockgenResult<SceneImage> {
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| MockgenError::upload(format!("fetch wallpaper '{url}': {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MockgenError::upload(format!(
                "wallpaper '{url}' returned {status}"
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| MockgenError::upload(format!("read wallpaper '{url}': {e}")))?;
        SceneImage::decode(&bytes)
    }
}

/// Source for renderers that must never touch the network (tests, offline
/// use). Every fetch fails; the renderer falls back to the solid default.
pub struct NoWallpapers;

impl WallpaperSource for NoWallpapers {
    fn fetch(&mut self, url: &str) -> MockgenResult<SceneImage> {
        Err(MockgenError::upload(format!(
            "wallpaper fetching disabled (requested '{url}')"
        )))
    }
}

/// One rasterized gradient. Keyed by overlay id, so the cache holds at most
/// one entry per catalog overlay regardless of how often the opacity moves.
struct CachedGradient {
    opacity_bits: u64,
    w: u32,
    h: u32,
    img: vello_cpu::Image,
}

pub struct Renderer {
    ctx: Option<vello_cpu::RenderContext>,
    wallpapers: Box<dyn WallpaperSource>,
    wallpaper_cache: HashMap<String, SceneImage>,
    gradient_cache: HashMap<String, CachedGradient>,
}

impl Renderer {
    pub fn new(wallpapers: Box<dyn WallpaperSource>) -> Self {
        Self {
            ctx: None,
            wallpapers,
            wallpaper_cache: HashMap::new(),
            gradient_cache: HashMap::new(),
        }
    }

    /// Renderer with live wallpaper fetching.
    pub fn with_http() -> Self {
        Self::new(Box::new(HttpWallpaperSource::new()))
    }

    /// Renderer that never fetches; wallpapers must be preloaded.
    pub fn offline() -> Self {
        Self::new(Box::new(NoWallpapers))
    }

    /// Seed the wallpaper cache (prefetch, tests).
    pub fn preload_wallpaper(&mut self, url: impl Into<String>, img: SceneImage) {
        self.wallpaper_cache.insert(url.into(), img);
    }

    /// Render the scene at `opts.scale` times the canvas resolution.
    #[tracing::instrument(skip(self, scene), fields(w = canvas.width, h = canvas.height))]
    pub fn render(
        &mut self,
        scene: &Scene,
        canvas: Canvas,
        opts: &RenderOpts,
    ) -> MockgenResult<FrameRGBA> {
        if !opts.scale.is_finite() || opts.scale < 1.0 {
            return Err(MockgenError::validation(
                "render scale must be finite and >= 1",
            ));
        }
        let out_w = (f64::from(canvas.width) * opts.scale).round() as u32;
        let out_h = (f64::from(canvas.height) * opts.scale).round() as u32;
        let w16: u16 = out_w
            .try_into()
            .map_err(|_| MockgenError::capture("render width exceeds u16"))?;
        let h16: u16 = out_h
            .try_into()
            .map_err(|_| MockgenError::capture("render height exceeds u16"))?;

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);

        self.with_ctx_mut(w16, h16, |this, ctx| {
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            this.draw_background(scene, out_w, out_h, ctx)?;
            this.draw_image_layer(scene, canvas, opts.scale, out_w, out_h, ctx)?;
            this.draw_overlay(scene, out_w, out_h, ctx)?;
            if scene.processing {
                draw_busy_indicator(out_w, out_h, opts.busy_phase, ctx);
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        Ok(FrameRGBA {
            width: out_w,
            height: out_h,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> MockgenResult<R>,
    ) -> MockgenResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn draw_background(
        &mut self,
        scene: &Scene,
        out_w: u32,
        out_h: u32,
        ctx: &mut vello_cpu::RenderContext,
    ) -> MockgenResult<()> {
        if let Background::Wallpaper(url) = &scene.background
            && let Some(img) = self.wallpaper_image(url)
        {
            // Cover: uniform scale filling the frame, centered, overhang
            // cropped by the surface bounds.
            let iw = f64::from(img.width.max(1));
            let ih = f64::from(img.height.max(1));
            let s = (f64::from(out_w) / iw).max(f64::from(out_h) / ih);
            let tx = (f64::from(out_w) - iw * s) / 2.0;
            let ty = (f64::from(out_h) - ih * s) / 2.0;
            let paint = premul_image_paint(&img)?;
            ctx.set_transform(affine_to_cpu(Affine::translate((tx, ty)) * Affine::scale(s)));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
            return Ok(());
        }

        let rgba = match &scene.background {
            Background::Solid(hex) => parse_hex_color(hex).unwrap_or_else(|e| {
                tracing::warn!("invalid background color, using default: {e}");
                default_background_rgba()
            }),
            // Unresolvable wallpaper falls back to the default solid fill.
            Background::Wallpaper(_) => default_background_rgba(),
        };
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            rgba[0], rgba[1], rgba[2], rgba[3],
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(out_w),
            f64::from(out_h),
        ));
        Ok(())
    }

    fn wallpaper_image(&mut self, url: &str) -> Option<SceneImage> {
        if let Some(img) = self.wallpaper_cache.get(url) {
            return Some(img.clone());
        }
        match self.wallpapers.fetch(url) {
            Ok(img) => {
                self.wallpaper_cache.insert(url.to_string(), img.clone());
                Some(img)
            }
            Err(e) => {
                tracing::warn!("wallpaper unavailable, falling back to solid fill: {e}");
                None
            }
        }
    }

    fn draw_image_layer(
        &mut self,
        scene: &Scene,
        canvas: Canvas,
        scale: f64,
        out_w: u32,
        out_h: u32,
        ctx: &mut vello_cpu::RenderContext,
    ) -> MockgenResult<()> {
        let Some(img) = &scene.rendered_image else {
            draw_placeholder_glyph(out_w, out_h, scale, ctx);
            return Ok(());
        };

        let placement = compute_placement(&scene.transform, canvas, img.width, img.height);
        let h = placement.homography().scaled(scale);
        let warped = warp_premul(img, h, out_w, out_h)?;
        let paint = rgba_premul_to_image(&warped, out_w, out_h)?;

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(out_w),
            f64::from(out_h),
        ));
        Ok(())
    }

    fn draw_overlay(
        &mut self,
        scene: &Scene,
        out_w: u32,
        out_h: u32,
        ctx: &mut vello_cpu::RenderContext,
    ) -> MockgenResult<()> {
        let Some(spec) = resolve_overlay(&scene.overlay.id, scene.overlay.opacity_pct) else {
            return Ok(());
        };
        let paint = self.gradient_image(scene, &spec, out_w, out_h)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(out_w),
            f64::from(out_h),
        ));
        Ok(())
    }

    fn gradient_image(
        &mut self,
        scene: &Scene,
        spec: &GradientSpec,
        w: u32,
        h: u32,
    ) -> MockgenResult<vello_cpu::Image> {
        let opacity_bits = scene.overlay.opacity_pct.clamp(0.0, 100.0).to_bits();
        if let Some(c) = self.gradient_cache.get(&scene.overlay.id)
            && c.opacity_bits == opacity_bits
            && c.w == w
            && c.h == h
        {
            return Ok(c.img.clone());
        }
        let bytes = spec.rasterize(w, h);
        let img = rgba_premul_to_image(&bytes, w, h)?;
        self.gradient_cache.insert(
            scene.overlay.id.clone(),
            CachedGradient {
                opacity_bits,
                w,
                h,
                img: img.clone(),
            },
        );
        Ok(img)
    }
}

fn default_background_rgba() -> [u8; 4] {
    parse_hex_color(DEFAULT_BACKGROUND_COLOR).unwrap_or([255, 87, 51, 255])
}

/// Inverse-map every output pixel through the placement homography and
/// bilinearly sample the source, producing an output-sized premul buffer.
fn warp_premul(img: &SceneImage, h: Homography, out_w: u32, out_h: u32) -> MockgenResult<Vec<u8>> {
    let inv = h
        .invert()
        .ok_or_else(|| MockgenError::capture("degenerate image placement"))?;
    let mut out = vec![0u8; (out_w as usize) * (out_h as usize) * 4];
    let half_w = f64::from(img.width) / 2.0;
    let half_h = f64::from(img.height) / 2.0;
    let data = img.rgba8_premul.as_slice();

    for y in 0..out_h {
        for x in 0..out_w {
            let (lx, ly) = inv.apply(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if !lx.is_finite() || !ly.is_finite() {
                continue;
            }
            let sx = lx + half_w;
            let sy = ly + half_h;
            if sx < -1.0
                || sy < -1.0
                || sx > f64::from(img.width) + 1.0
                || sy > f64::from(img.height) + 1.0
            {
                continue;
            }
            let px = sample_bilinear_premul(data, img.width, img.height, sx, sy);
            let idx = ((y as usize) * (out_w as usize) + (x as usize)) * 4;
            out[idx..idx + 4].copy_from_slice(&px);
        }
    }
    Ok(out)
}

/// The empty-state glyph: a picture frame with a sun and mountains, white at
/// 20% alpha, centered.
fn draw_placeholder_glyph(out_w: u32, out_h: u32, scale: f64, ctx: &mut vello_cpu::RenderContext) {
    let size = 64.0 * scale;
    let cx = f64::from(out_w) / 2.0;
    let cy = f64::from(out_h) / 2.0;
    let x0 = cx - size / 2.0;
    let y0 = cy - size / 2.0;
    let x1 = cx + size / 2.0;
    let y1 = cy + size / 2.0;
    let t = size * 0.06;

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 51));

    // Frame border as four thin rects.
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x0, y0, x1, y0 + t));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x0, y1 - t, x1, y1));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x0, y0, x0 + t, y1));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x1 - t, y0, x1, y1));

    // Sun.
    let sun = kurbo::Circle::new(Point::new(cx - size * 0.18, cy - size * 0.18), size * 0.1);
    let mut sun_path = BezPath::new();
    for el in kurbo::Shape::path_elements(&sun, 0.1) {
        sun_path.push(el);
    }
    ctx.fill_path(&bezpath_to_cpu(&sun_path));

    // Mountains.
    let mut mountains = BezPath::new();
    mountains.move_to((x0 + t, y1 - t));
    mountains.line_to((cx - size * 0.1, cy + size * 0.02));
    mountains.line_to((cx + size * 0.12, cy + size * 0.24));
    mountains.line_to((cx + size * 0.28, cy + size * 0.08));
    mountains.line_to((x1 - t, y1 - t));
    mountains.close_path();
    ctx.fill_path(&bezpath_to_cpu(&mountains));
}

/// The busy state: a dark veil plus a thin scanning highlight whose position
/// comes from the caller's clock phase.
fn draw_busy_indicator(out_w: u32, out_h: u32, phase: f64, ctx: &mut vello_cpu::RenderContext) {
    let wf = f64::from(out_w);
    let hf = f64::from(out_h);
    let phase = if phase.is_finite() {
        phase.rem_euclid(1.0)
    } else {
        0.0
    };

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 51));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, wf, hf));

    // blue-500 at 30%.
    let bar_w = (wf * 0.01).max(2.0);
    let bar_x = phase * (wf - bar_w);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(59, 130, 246, 77));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(bar_x, 0.0, bar_x + bar_w, hf));
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> MockgenResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MockgenError::capture("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MockgenError::capture("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(MockgenError::capture("pixmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
    for px in bytes.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> MockgenResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_image_paint(img: &SceneImage) -> MockgenResult<vello_cpu::Image> {
    rgba_premul_to_image(img.rgba8_premul.as_slice(), img.width, img.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    fn solid_image(w: u32, h: u32, rgba_premul: [u8; 4]) -> SceneImage {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..(w * h) {
            data.extend_from_slice(&rgba_premul);
        }
        SceneImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(data),
        }
    }

    #[test]
    fn warp_identity_centers_the_image() {
        let img = solid_image(4, 4, [255, 0, 0, 255]);
        // Place a 4x4 image centered on a 16x16 output.
        let h = Homography::translate(8.0, 8.0);
        let out = warp_premul(&img, h, 16, 16).unwrap();
        let px = |x: usize, y: usize| {
            let i = (y * 16 + x) * 4;
            [out[i], out[i + 1], out[i + 2], out[i + 3]]
        };
        assert_eq!(px(8, 8), [255, 0, 0, 255]);
        assert_eq!(px(0, 0), [0, 0, 0, 0]);
        assert_eq!(px(15, 15), [0, 0, 0, 0]);
    }

    #[test]
    fn warp_rejects_singular_placements() {
        let img = solid_image(2, 2, [1, 1, 1, 255]);
        let degenerate = Homography([[0.0; 3]; 3]);
        assert!(warp_premul(&img, degenerate, 4, 4).is_err());
    }

    #[test]
    fn render_scale_must_be_at_least_one() {
        let mut r = Renderer::offline();
        let scene = Scene::default();
        let err = r
            .render(
                &scene,
                Canvas::default(),
                &RenderOpts {
                    scale: 0.5,
                    busy_phase: 0.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, MockgenError::Validation(_)));
    }

    #[test]
    fn gradient_cache_stays_bounded_across_opacity_sweeps() {
        let mut r = Renderer::offline();
        let canvas = Canvas::new(16, 16).unwrap();
        let mut scene = Scene::default();
        scene.set_overlay("overlay2");
        // A slider drag emits a distinct opacity per tick; the cache must
        // keep one entry per overlay id, not one per tick.
        for pct in 0..=100 {
            scene.set_overlay_opacity(f64::from(pct));
            r.render(&scene, canvas, &RenderOpts::default()).unwrap();
        }
        assert_eq!(r.gradient_cache.len(), 1);

        scene.set_overlay("overlay4");
        r.render(&scene, canvas, &RenderOpts::default()).unwrap();
        assert_eq!(r.gradient_cache.len(), 2);
    }

    #[test]
    fn wallpaper_cache_is_consulted_before_the_source() {
        let mut r = Renderer::offline();
        r.preload_wallpaper("https://x/w.png", solid_image(2, 2, [0, 255, 0, 255]));
        assert!(r.wallpaper_image("https://x/w.png").is_some());
        // Unknown URL goes to the NoWallpapers source and fails over.
        assert!(r.wallpaper_image("https://x/other.png").is_none());
    }
}
