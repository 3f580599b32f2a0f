//! Transform engine: from user transform parameters to a pixel placement.
//!
//! The composition order is fixed and load-bearing:
//! translate(center + offset) -> scale -> rotate(2D) -> perspective(1000) ->
//! rotateY(tilt). The preview renderer and the export capture both consume
//! the placement produced here, so the two can never disagree on geometry.

use crate::core::Canvas;
use crate::scene::TransformParams;

/// Perspective depth for the tilt projection, in device-independent length
/// units.
pub const PERSPECTIVE_DEPTH: f64 = 1000.0;

/// Fraction of the canvas box the untransformed image may occupy.
pub const FIT_FRACTION: f64 = 0.8;

/// A 3x3 projective transform, row-major.
///
/// Maps homogeneous 2D points; the tilt term makes the third row
/// non-trivial, so this is a homography rather than an affine map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography(pub [[f64; 3]; 3]);

impl Homography {
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]])
    }

    pub fn scale(s: f64) -> Self {
        Self([[s, 0.0, 0.0], [0.0, s, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn rotate_deg(deg: f64) -> Self {
        let r = deg.to_radians();
        let (sin, cos) = r.sin_cos();
        Self([[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Combined `perspective(depth) rotateY(deg)` projected onto the plane:
    /// a point `(x, y, 0)` rotates to depth `z = -x sin`, then projects with
    /// scale `depth / (depth - z)`.
    pub fn perspective_rotate_y(deg: f64, depth: f64) -> Self {
        let r = deg.to_radians();
        let (sin, cos) = r.sin_cos();
        Self([[cos, 0.0, 0.0], [0.0, 1.0, 0.0], [sin / depth, 0.0, 1.0]])
    }

    pub fn then(self, rhs: Self) -> Self {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [[0.0f64; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Self(out)
    }

    /// Apply to a point, performing the homogeneous divide.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        let u = m[0][0] * x + m[0][1] * y + m[0][2];
        let v = m[1][0] * x + m[1][1] * y + m[1][2];
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w.abs() <= f64::EPSILON {
            return (f64::INFINITY, f64::INFINITY);
        }
        (u / w, v / w)
    }

    /// Inverse via the adjugate; `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let m = &self.0;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if !det.is_finite() || det.abs() <= 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let adj = [
            [
                m[1][1] * m[2][2] - m[1][2] * m[2][1],
                m[0][2] * m[2][1] - m[0][1] * m[2][2],
                m[0][1] * m[1][2] - m[0][2] * m[1][1],
            ],
            [
                m[1][2] * m[2][0] - m[1][0] * m[2][2],
                m[0][0] * m[2][2] - m[0][2] * m[2][0],
                m[0][2] * m[1][0] - m[0][0] * m[1][2],
            ],
            [
                m[1][0] * m[2][1] - m[1][1] * m[2][0],
                m[0][1] * m[2][0] - m[0][0] * m[2][1],
                m[0][0] * m[1][1] - m[0][1] * m[1][0],
            ],
        ];
        let mut out = [[0.0f64; 3]; 3];
        for (row, adj_row) in out.iter_mut().zip(adj) {
            for (cell, a) in row.iter_mut().zip(adj_row) {
                *cell = a * inv_det;
            }
        }
        Some(Self(out))
    }

    /// Premultiply a uniform output upscale. Used by the 2x export capture;
    /// it scales everything identically and cannot change relative geometry.
    pub fn scaled(self, k: f64) -> Self {
        Self::scale(k).then(self)
    }
}

/// The derived placement of the image on the canvas.
///
/// Identical `TransformParams` always yield an identical placement; the
/// parameters are recorded after clamping so callers can observe exactly
/// what was applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub params: TransformParams,
    /// Uniform scale fitting the source image into 80% of the canvas box.
    pub fit_scale: f64,
    pub canvas: Canvas,
}

impl Placement {
    /// The homography mapping image-centered source pixel coordinates to
    /// canvas pixel coordinates.
    pub fn homography(&self) -> Homography {
        let t = &self.params;
        let cx = f64::from(self.canvas.width) / 2.0 + t.position.x;
        let cy = f64::from(self.canvas.height) / 2.0 + t.position.y;

        Homography::translate(cx, cy)
            .then(Homography::scale(t.scale))
            .then(Homography::rotate_deg(t.rotation_deg))
            .then(Homography::perspective_rotate_y(
                t.tilt_deg,
                PERSPECTIVE_DEPTH,
            ))
            .then(Homography::scale(self.fit_scale))
    }
}

/// Derive the placement for an `image_w x image_h` source image on `canvas`.
///
/// Out-of-range parameters are clamped here, never rejected; boundary values
/// stay at exactly the boundary.
pub fn compute_placement(
    transform: &TransformParams,
    canvas: Canvas,
    image_w: u32,
    image_h: u32,
) -> Placement {
    let params = transform.clamped();

    let max_w = f64::from(canvas.width) * FIT_FRACTION;
    let max_h = f64::from(canvas.height) * FIT_FRACTION;
    let iw = f64::from(image_w.max(1));
    let ih = f64::from(image_h.max(1));
    let fit_scale = (max_w / iw).min(max_h / ih).min(1.0);

    Placement {
        params,
        fit_scale,
        canvas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec2;

    fn params(x: f64, y: f64, scale: f64, rot: f64, tilt: f64) -> TransformParams {
        TransformParams {
            position: Vec2::new(x, y),
            scale,
            rotation_deg: rot,
            tilt_deg: tilt,
        }
    }

    fn assert_mat_eq(a: Homography, b: Homography) {
        for (ra, rb) in a.0.iter().zip(b.0.iter()) {
            for (va, vb) in ra.iter().zip(rb.iter()) {
                assert!((va - vb).abs() < 1e-12, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_placements() {
        let t = params(13.0, -7.0, 1.3, 42.0, -12.0);
        let c = Canvas::default();
        let a = compute_placement(&t, c, 800, 600);
        let b = compute_placement(&t, c, 800, 600);
        assert_eq!(a, b);
        assert_eq!(a.homography(), b.homography());
    }

    #[test]
    fn default_params_center_the_image() {
        let p = compute_placement(&TransformParams::default(), Canvas::default(), 100, 100);
        let h = p.homography();
        let (x, y) = h.apply(0.0, 0.0);
        assert!((x - 640.0).abs() < 1e-9);
        assert!((y - 360.0).abs() < 1e-9);
    }

    #[test]
    fn fit_scale_caps_at_80_percent_of_canvas() {
        let c = Canvas::default();
        // Wide image limited by width.
        let p = compute_placement(&TransformParams::default(), c, 4096, 1024);
        assert!((p.fit_scale - (1280.0 * 0.8) / 4096.0).abs() < 1e-12);
        // Small image is never upscaled.
        let p = compute_placement(&TransformParams::default(), c, 64, 64);
        assert_eq!(p.fit_scale, 1.0);
    }

    #[test]
    fn composition_order_is_translate_scale_rotate_perspective_tilt() {
        // Scenario: scale=2.0, rotation=180, tilt=45, position=(50, -20).
        let t = params(50.0, -20.0, 2.0, 180.0, 45.0);
        let c = Canvas::default();
        let p = compute_placement(&t, c, 1024, 576);
        assert_eq!(p.params, t);

        let expected = Homography::translate(640.0 + 50.0, 360.0 - 20.0)
            .then(Homography::scale(2.0))
            .then(Homography::rotate_deg(180.0))
            .then(Homography::perspective_rotate_y(45.0, 1000.0))
            .then(Homography::scale(p.fit_scale));
        assert_mat_eq(p.homography(), expected);

        // Reordering (rotate before scale is commutative for uniform scale,
        // but perspective before rotate is not) must differ.
        let reordered = Homography::translate(640.0 + 50.0, 360.0 - 20.0)
            .then(Homography::perspective_rotate_y(45.0, 1000.0))
            .then(Homography::scale(2.0))
            .then(Homography::rotate_deg(180.0))
            .then(Homography::scale(p.fit_scale));
        assert_ne!(p.homography(), reordered);
    }

    #[test]
    fn scale_extremes_stay_finite_and_centered() {
        let c = Canvas::default();
        for s in [0.1, 2.0] {
            let p = compute_placement(&params(0.0, 0.0, s, 0.0, 0.0), c, 200, 200);
            let h = p.homography();
            let (x, y) = h.apply(0.0, 0.0);
            assert!(x.is_finite() && y.is_finite());
            assert!((x - 640.0).abs() < 1e-9 && (y - 360.0).abs() < 1e-9);
            let (ex, _) = h.apply(100.0, 0.0);
            assert!((ex - 640.0 - 100.0 * s).abs() < 1e-9);
        }
    }

    #[test]
    fn boundary_rotation_and_tilt_clamp_to_exact_boundary() {
        let p = compute_placement(
            &params(0.0, 0.0, 5.0, 500.0, -90.0),
            Canvas::default(),
            10,
            10,
        );
        assert_eq!(p.params.scale, 2.0);
        assert_eq!(p.params.rotation_deg, 180.0);
        assert_eq!(p.params.tilt_deg, -45.0);
    }

    #[test]
    fn tilt_foreshortens_one_side_and_magnifies_the_other() {
        let p = compute_placement(&params(0.0, 0.0, 1.0, 0.0, 30.0), Canvas::default(), 100, 100);
        let h = p.homography();
        // rotateY with positive tilt pushes +x away from the viewer.
        let (right, _) = h.apply(50.0, 0.0);
        let (left, _) = h.apply(-50.0, 0.0);
        let right_extent = right - 640.0;
        let left_extent = 640.0 - left;
        assert!(right_extent > 0.0 && left_extent > 0.0);
        assert!(right_extent < left_extent);
    }

    #[test]
    fn inverse_round_trips_points() {
        let p = compute_placement(&params(31.0, 17.0, 1.7, 65.0, 25.0), Canvas::default(), 640, 480);
        let h = p.homography();
        let inv = h.invert().unwrap();
        for (x, y) in [(0.0, 0.0), (120.0, -80.0), (-320.0, 240.0)] {
            let (u, v) = h.apply(x, y);
            let (bx, by) = inv.apply(u, v);
            assert!((bx - x).abs() < 1e-6 && (by - y).abs() < 1e-6);
        }
    }

    #[test]
    fn export_upscale_preserves_relative_geometry() {
        let p = compute_placement(&params(10.0, 5.0, 1.2, 30.0, 15.0), Canvas::default(), 400, 300);
        let h = p.homography();
        let h2 = h.scaled(2.0);
        for (x, y) in [(0.0, 0.0), (200.0, 150.0), (-57.0, 99.0)] {
            let (u, v) = h.apply(x, y);
            let (u2, v2) = h2.apply(x, y);
            assert!((u2 - 2.0 * u).abs() < 1e-9);
            assert!((v2 - 2.0 * v).abs() < 1e-9);
        }
    }
}
