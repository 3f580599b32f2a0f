use crate::error::{MockgenError, MockgenResult};

pub use kurbo::{Affine, BezPath, Point, Vec2};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> MockgenResult<Self> {
        if width == 0 || height == 0 {
            return Err(MockgenError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }
}

impl Default for Canvas {
    /// The 16:9 preview frame the source tool composes into.
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (case-insensitive, `#` optional) into
/// straight-alpha RGBA8.
pub fn parse_hex_color(s: &str) -> MockgenResult<[u8; 4]> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    // Byte-index slicing below requires single-byte chars.
    if !s.is_ascii() {
        return Err(MockgenError::validation(format!(
            "hex color contains non-ASCII characters: \"{s}\""
        )));
    }

    fn hex_byte(pair: &str) -> MockgenResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| MockgenError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    match s.len() {
        6 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ]),
        8 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ]),
        _ => Err(MockgenError::validation(
            "hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)",
        )),
    }
}
