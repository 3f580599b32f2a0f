//! Premultiplied RGBA8 pixel helpers shared by the renderer and exporter.

pub type PremulRgba8 = [u8; 4];

/// Rounded `x * y / 255`, the premultiply primitive.
pub fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255(u16::from(px[0]), a);
        px[1] = mul_div255(u16::from(px[1]), a);
        px[2] = mul_div255(u16::from(px[2]), a);
    }
}

/// Convert premultiplied bytes back to straight alpha (PNG export path).
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = (((px[0] as u32) * 255 + a / 2) / a).min(255) as u8;
        px[1] = (((px[1] as u32) * 255 + a / 2) / a).min(255) as u8;
        px[2] = (((px[2] as u32) * 255 + a / 2) / a).min(255) as u8;
    }
}

/// Bilinear sample of a premultiplied RGBA8 buffer at `(x, y)` in pixel
/// coordinates. Out-of-bounds taps contribute transparent black, so edges
/// fade out instead of clamping.
pub fn sample_bilinear_premul(
    data: &[u8],
    width: u32,
    height: u32,
    x: f64,
    y: f64,
) -> PremulRgba8 {
    let x = x - 0.5;
    let y = y - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let tap = |ix: i64, iy: i64| -> [f64; 4] {
        if ix < 0 || iy < 0 || ix >= i64::from(width) || iy >= i64::from(height) {
            return [0.0; 4];
        }
        let idx = ((iy as usize) * (width as usize) + (ix as usize)) * 4;
        [
            data[idx] as f64,
            data[idx + 1] as f64,
            data[idx + 2] as f64,
            data[idx + 3] as f64,
        ]
    };

    let ix = x0 as i64;
    let iy = y0 as i64;
    let p00 = tap(ix, iy);
    let p10 = tap(ix + 1, iy);
    let p01 = tap(ix, iy + 1);
    let p11 = tap(ix + 1, iy + 1);

    let mut out = [0u8; 4];
    for (i, o) in out.iter_mut().enumerate() {
        let top = p00[i] + (p10[i] - p00[i]) * fx;
        let bot = p01[i] + (p11[i] - p01[i]) * fx;
        *o = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
