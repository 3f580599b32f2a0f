//! Overlay resolution: from `(overlay id, opacity)` to a concrete gradient.
//!
//! Resolution is a pure function of its inputs. The user opacity replaces the
//! template alpha of every alpha-bearing stop; `transparent` keyword stops
//! pass through untouched, matching the source catalog's mix of
//! fully-transparent endpoints and solid-color endpoints.

use crate::catalog::{self, GradientKind, RadialCenter, StopColor, TemplateStop};
use crate::composite::PremulRgba8;

/// A resolved gradient ready for rasterization.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GradientSpec {
    pub kind: GradientKind,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct GradientStop {
    pub offset_pct: f64,
    pub color: StopColor,
}

/// Resolve an overlay id and opacity (percent, clamped to `[0, 100]`) into a
/// gradient, or `None` when nothing should render.
///
/// Unknown ids resolve to `None` exactly like `"none"`: the picker falls back
/// to no overlay instead of erroring.
pub fn resolve_overlay(overlay_id: &str, opacity_pct: f64) -> Option<GradientSpec> {
    if overlay_id == "none" {
        return None;
    }
    let def = catalog::overlay_by_id(overlay_id)?;
    let template = def.gradient?;

    let alpha = (opacity_pct.clamp(0.0, 100.0)) / 100.0;
    let stops = template
        .stops
        .iter()
        .map(|s: &TemplateStop| GradientStop {
            offset_pct: s.offset_pct,
            color: match s.color {
                StopColor::Rgba { r, g, b, .. } => StopColor::Rgba { r, g, b, a: alpha },
                StopColor::Transparent => StopColor::Transparent,
            },
        })
        .collect();

    Some(GradientSpec {
        kind: template.kind,
        stops,
    })
}

impl GradientSpec {
    /// Rasterize to a premultiplied RGBA8 buffer of `width * height * 4`
    /// bytes with CSS gradient geometry.
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<u8> {
        let w = width.max(1);
        let h = height.max(1);
        let mut bytes = vec![0u8; (w as usize) * (h as usize) * 4];

        let wf = w as f64;
        let hf = h as f64;
        let (cx, cy) = (wf / 2.0, hf / 2.0);

        match self.kind {
            GradientKind::Linear { angle_deg } => {
                // CSS: angle 0 points up, clockwise positive; with y growing
                // down the unit direction is (sin a, -cos a). The gradient
                // line length is the projection of the box onto it.
                let a = angle_deg.to_radians();
                let (dx, dy) = (a.sin(), -a.cos());
                let len = (wf * dx).abs() + (hf * dy).abs();
                for y in 0..h {
                    for x in 0..w {
                        let px = (x as f64 + 0.5) - cx;
                        let py = (y as f64 + 0.5) - cy;
                        let t = if len <= f64::EPSILON {
                            0.5
                        } else {
                            (px * dx + py * dy) / len + 0.5
                        };
                        let c = self.color_at(t);
                        let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
                        bytes[idx..idx + 4].copy_from_slice(&c);
                    }
                }
            }
            GradientKind::Radial { center } => {
                let (ox, oy) = match center {
                    RadialCenter::Center => (cx, cy),
                    RadialCenter::TopRight => (wf, 0.0),
                };
                // Farthest-corner radius, the CSS default ending shape.
                let radius = [(0.0, 0.0), (wf, 0.0), (0.0, hf), (wf, hf)]
                    .into_iter()
                    .map(|(x, y): (f64, f64)| ((x - ox).powi(2) + (y - oy).powi(2)).sqrt())
                    .fold(0.0f64, f64::max)
                    .max(f64::EPSILON);
                for y in 0..h {
                    for x in 0..w {
                        let px = (x as f64 + 0.5) - ox;
                        let py = (y as f64 + 0.5) - oy;
                        let t = (px * px + py * py).sqrt() / radius;
                        let c = self.color_at(t);
                        let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
                        bytes[idx..idx + 4].copy_from_slice(&c);
                    }
                }
            }
        }

        bytes
    }

    /// Evaluate the stop list at `t in [0, 1]`, interpolating in
    /// premultiplied space (the CSS interpolation model; it keeps fades to
    /// `transparent` free of dark fringes).
    fn color_at(&self, t: f64) -> PremulRgba8 {
        let t = (t * 100.0).clamp(0.0, 100.0);
        let stops = &self.stops;
        debug_assert!(!stops.is_empty());

        if t <= stops[0].offset_pct {
            return stop_premul(stops[0].color);
        }
        if let Some(last) = stops.last()
            && t >= last.offset_pct
        {
            return stop_premul(last.color);
        }

        for pair in stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t < lo.offset_pct || t > hi.offset_pct {
                continue;
            }
            let span = hi.offset_pct - lo.offset_pct;
            let f = if span <= f64::EPSILON {
                1.0
            } else {
                (t - lo.offset_pct) / span
            };
            let a = stop_premul_f64(lo.color);
            let b = stop_premul_f64(hi.color);
            let mut out = [0u8; 4];
            for (i, o) in out.iter_mut().enumerate() {
                *o = (a[i] + (b[i] - a[i]) * f).round().clamp(0.0, 255.0) as u8;
            }
            return out;
        }

        stop_premul(stops[stops.len() - 1].color)
    }
}

fn stop_premul_f64(color: StopColor) -> [f64; 4] {
    match color {
        StopColor::Transparent => [0.0; 4],
        StopColor::Rgba { r, g, b, a } => {
            let a = a.clamp(0.0, 1.0);
            [
                f64::from(r) * a,
                f64::from(g) * a,
                f64::from(b) * a,
                a * 255.0,
            ]
        }
    }
}

fn stop_premul(color: StopColor) -> PremulRgba8 {
    let f = stop_premul_f64(color);
    [
        f[0].round().clamp(0.0, 255.0) as u8,
        f[1].round().clamp(0.0, 255.0) as u8,
        f[2].round().clamp(0.0, 255.0) as u8,
        f[3].round().clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OVERLAYS;

    #[test]
    fn none_and_unknown_resolve_to_nothing() {
        assert!(resolve_overlay("none", 50.0).is_none());
        assert!(resolve_overlay("overlay99", 50.0).is_none());
        assert!(resolve_overlay("", 0.0).is_none());
    }

    #[test]
    fn opacity_replaces_alpha_on_rgba_stops_only() {
        let g = resolve_overlay("overlay6", 25.0).unwrap();
        assert_eq!(g.stops.len(), 3);
        assert_eq!(
            g.stops[0].color,
            StopColor::Rgba {
                r: 0,
                g: 0,
                b: 0,
                a: 0.25
            }
        );
        assert_eq!(g.stops[1].color, StopColor::Transparent);
        assert_eq!(
            g.stops[2].color,
            StopColor::Rgba {
                r: 0,
                g: 0,
                b: 0,
                a: 0.25
            }
        );
    }

    #[test]
    fn full_opacity_matches_template_verbatim() {
        for def in OVERLAYS.iter().filter(|o| o.gradient.is_some()) {
            let g = resolve_overlay(def.id, 100.0).unwrap();
            let template = def.gradient.unwrap();
            assert_eq!(g.kind, template.kind);
            for (resolved, tmpl) in g.stops.iter().zip(template.stops) {
                assert_eq!(resolved.offset_pct, tmpl.offset_pct);
                assert_eq!(resolved.color, tmpl.color);
            }
        }
    }

    #[test]
    fn zero_opacity_silences_every_alpha_bearing_stop() {
        let g = resolve_overlay("overlay1", 0.0).unwrap();
        for s in &g.stops {
            match s.color {
                StopColor::Rgba { a, .. } => assert_eq!(a, 0.0),
                StopColor::Transparent => {}
            }
        }
    }

    #[test]
    fn out_of_range_opacity_is_clamped() {
        let hi = resolve_overlay("overlay2", 250.0).unwrap();
        let full = resolve_overlay("overlay2", 100.0).unwrap();
        assert_eq!(hi, full);

        let lo = resolve_overlay("overlay2", -10.0).unwrap();
        let zero = resolve_overlay("overlay2", 0.0).unwrap();
        assert_eq!(lo, zero);
    }

    #[test]
    fn resolution_is_idempotent() {
        let a = resolve_overlay("overlay4", 37.0).unwrap();
        let b = resolve_overlay("overlay4", 37.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bottom_fade_rasterizes_dark_at_bottom() {
        let g = resolve_overlay("overlay2", 100.0).unwrap();
        let bytes = g.rasterize(8, 8);
        let top = &bytes[0..4];
        let bottom = &bytes[(7 * 8) * 4..(7 * 8) * 4 + 4];
        assert!(top[3] <= 20, "top should be nearly transparent: {top:?}");
        assert!(bottom[3] > 230, "bottom should be nearly opaque: {bottom:?}");
    }

    #[test]
    fn radial_is_transparent_at_center_dark_at_corner() {
        let g = resolve_overlay("overlay4", 100.0).unwrap();
        let bytes = g.rasterize(9, 9);
        let center = &bytes[((4 * 9) + 4) * 4..((4 * 9) + 4) * 4 + 4];
        let corner = &bytes[0..4];
        assert!(center[3] < 32);
        assert!(corner[3] > center[3]);
    }
}
