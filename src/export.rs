//! Export serialization: a rendered frame to PNG, JPG, or SVG bytes.
//!
//! Raster formats serialize the 2x capture. PNG keeps the alpha channel
//! (straight, per the format); JPG flattens over black, which for
//! premultiplied pixels is just dropping the alpha channel. SVG wraps the 1x
//! capture in a vector document that carries the scanning animation style.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context as _;
use base64::Engine as _;

use crate::composite::unpremultiply_rgba8_in_place;
use crate::error::{MockgenError, MockgenResult};
use crate::render::FrameRGBA;

const JPEG_QUALITY: u8 = 90;

/// Output file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpg,
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Svg => "svg",
        }
    }

    /// The render upscale this format captures at. Raster formats double the
    /// canvas resolution; SVG embeds the 1x raster in a scalable document.
    pub fn capture_scale(self) -> f64 {
        match self {
            Self::Png | Self::Jpg => 2.0,
            Self::Svg => 1.0,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = MockgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "svg" => Ok(Self::Svg),
            other => Err(MockgenError::validation(format!(
                "unknown export format '{other}' (expected png, jpg, or svg)"
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A serialized export: the bytes plus the fixed download file name.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write the artifact into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> MockgenResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create export directory '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("write export '{}'", path.display()))?;
        Ok(path)
    }
}

/// Serialize a captured frame in the requested format. The frame must have
/// been rendered at [`ExportFormat::capture_scale`].
#[tracing::instrument(skip(frame), fields(w = frame.width, h = frame.height))]
pub fn serialize_frame(frame: &FrameRGBA, format: ExportFormat) -> MockgenResult<Artifact> {
    let bytes = match format {
        ExportFormat::Png => png_bytes(frame)?,
        ExportFormat::Jpg => jpeg_bytes(frame)?,
        ExportFormat::Svg => svg_document(frame)?.into_bytes(),
    };
    Ok(Artifact {
        file_name: format!("mockup.{}", format.extension()),
        bytes,
    })
}

/// Encode a frame as straight-alpha PNG bytes. Also serves the CLI preview,
/// which writes a 1x capture to an arbitrary path.
pub fn png_bytes(frame: &FrameRGBA) -> MockgenResult<Vec<u8>> {
    let mut straight = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut straight);
    }
    let img = image::RgbaImage::from_raw(frame.width, frame.height, straight)
        .ok_or_else(|| MockgenError::capture("frame buffer size mismatch"))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

fn jpeg_bytes(frame: &FrameRGBA) -> MockgenResult<Vec<u8>> {
    // Premultiplied color channels already hold the composite over black, so
    // flattening is channel extraction.
    let mut rgb = Vec::with_capacity((frame.width as usize) * (frame.height as usize) * 3);
    for px in frame.data.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    let img = image::RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| MockgenError::capture("frame buffer size mismatch"))?;
    let mut out = Vec::new();
    let mut enc =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    enc.encode_image(&img).context("encode jpeg")?;
    Ok(out)
}

/// Build the SVG document: a fixed-size frame embedding the captured raster
/// as a data URI, plus the `scanning` keyframes in a style block. The busy
/// bar itself is baked into the raster, so nothing in the document references
/// the keyframes; they are carried for viewers that pair the document with
/// live markup.
fn svg_document(frame: &FrameRGBA) -> MockgenResult<String> {
    let png = png_bytes(frame)?;
    let data_uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    );
    let (w, h) = (frame.width, frame.height);
    Ok(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <style>
    @keyframes scanning {{
      0% {{ transform: translateX(-300%); }}
      100% {{ transform: translateX(300%); }}
    }}
  </style>
  <foreignObject x="0" y="0" width="{w}" height="{h}">
    <div xmlns="http://www.w3.org/1999/xhtml" style="width:{w}px;height:{h}px;">
      <img src="{data_uri}" width="{w}" height="{h}" alt=""/>
    </div>
  </foreignObject>
</svg>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: u32, h: u32, premul: [u8; 4]) -> FrameRGBA {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..(w * h) {
            data.extend_from_slice(&premul);
        }
        FrameRGBA {
            width: w,
            height: h,
            data,
            premultiplied: true,
        }
    }

    #[test]
    fn format_parsing_accepts_aliases_and_rejects_junk() {
        assert_eq!("PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert_eq!("svg".parse::<ExportFormat>().unwrap(), ExportFormat::Svg);
        assert!("webp".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn png_round_trips_dimensions_and_alpha() {
        let a = serialize_frame(&frame(4, 2, [64, 0, 0, 128]), ExportFormat::Png).unwrap();
        assert_eq!(a.file_name, "mockup.png");
        let img = image::load_from_memory(&a.bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (4, 2));
        // 64/128 premul unpremultiplies back to ~128.
        let px = img.get_pixel(0, 0);
        assert_eq!(px[3], 128);
        assert!((i16::from(px[0]) - 128).abs() <= 1);
    }

    #[test]
    fn jpeg_flattens_transparency_over_black() {
        // Half-transparent white premul is (128, 128, 128, 128); over black
        // that is mid gray.
        let a = serialize_frame(&frame(2, 2, [128, 128, 128, 128]), ExportFormat::Jpg).unwrap();
        assert_eq!(a.file_name, "mockup.jpg");
        let img = image::load_from_memory(&a.bytes).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 2));
        let px = img.get_pixel(0, 0);
        assert!((i16::from(px[0]) - 128).abs() <= 8, "lossy but close: {px:?}");
    }

    #[test]
    fn svg_embeds_the_capture_and_animation() {
        let a = serialize_frame(&frame(3, 3, [0, 0, 0, 255]), ExportFormat::Svg).unwrap();
        assert_eq!(a.file_name, "mockup.svg");
        let doc = String::from_utf8(a.bytes).unwrap();
        assert!(doc.starts_with("<svg "));
        assert!(doc.contains(r#"width="3" height="3""#));
        assert!(doc.contains("data:image/png;base64,"));
        assert!(doc.contains("@keyframes scanning"));
        assert!(doc.contains("translateX(-300%)") && doc.contains("translateX(300%)"));
    }

    #[test]
    fn artifact_writes_into_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports");
        let a = serialize_frame(&frame(1, 1, [0, 0, 0, 0]), ExportFormat::Png).unwrap();
        let path = a.write_to(&nested).unwrap();
        assert_eq!(path, nested.join("mockup.png"));
        assert!(path.is_file());
    }
}
