//! Decoded texture images.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{AmfError, AmfResult};

/// An RGBA8 image referenced by triangle texture maps.
///
/// Decoding happens outside the engine; the Document only stores pixels
/// and samples them. Deserialized textures go through the same checks as
/// [`Texture::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTexture")]
pub struct Texture {
    pub name: String,
    width: u32,
    height: u32,
    /// Row-major, top row first, 4 bytes per pixel.
    pixels: Vec<u8>,
}

#[derive(Deserialize)]
struct RawTexture {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TryFrom<RawTexture> for Texture {
    type Error = AmfError;

    fn try_from(raw: RawTexture) -> AmfResult<Self> {
        Texture::new(raw.name, raw.width, raw.height, raw.pixels)
    }
}

impl Texture {
    /// Wraps decoded pixels, checking the buffer length.
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> AmfResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(AmfError::malformed(format!(
                "texture {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            pixels,
        })
    }

    /// A 1x1 texture of a single color.
    pub fn solid(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            pixels: color.to_rgba8().to_vec(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-texel lookup. UVs wrap; `v = 0` is the bottom row.
    ///
    /// A texel outside the pixel buffer samples as [`Color::default`].
    pub fn sample(&self, uv: DVec2) -> Color {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        let x = ((u * f64::from(self.width)) as u32).min(self.width.saturating_sub(1));
        let y = (((1.0 - v) * f64::from(self.height)) as u32).min(self.height.saturating_sub(1));
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let Some(px) = self.pixels.get(offset..offset + 4) else {
            return Color::default();
        };
        let c = |b: u8| f64::from(b) / 255.0;
        Color::rgba(c(px[0]), c(px[1]), c(px[2]), c(px[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        assert!(Texture::new("t", 2, 2, vec![0; 15]).is_err());
        assert!(Texture::new("t", 0, 2, vec![]).is_err());
    }

    #[test]
    fn test_sample_rows_bottom_up() {
        // Top row red, bottom row blue.
        let pixels = vec![
            255, 0, 0, 255, //
            0, 0, 255, 255,
        ];
        let tex = Texture::new("t", 1, 2, pixels).unwrap();
        assert_eq!(tex.sample(DVec2::new(0.5, 0.9)).to_u8_components(), [255, 0, 0]);
        assert_eq!(tex.sample(DVec2::new(0.5, 0.1)).to_u8_components(), [0, 0, 255]);
        // Wraps
        assert_eq!(tex.sample(DVec2::new(1.5, 1.1)).to_u8_components(), [0, 0, 255]);
    }

    #[test]
    fn test_deserialize_checks_dimensions() {
        let empty = r#"{"name":"t","width":0,"height":2,"pixels":[]}"#;
        assert!(serde_json::from_str::<Texture>(empty).is_err());
        let short = r#"{"name":"t","width":2,"height":2,"pixels":[0,0,0,255]}"#;
        assert!(serde_json::from_str::<Texture>(short).is_err());

        let tex = Texture::solid("t", Color::rgb(0.0, 1.0, 0.0));
        let json = serde_json::to_string(&tex).unwrap();
        assert_eq!(serde_json::from_str::<Texture>(&json).unwrap(), tex);
    }

    #[test]
    fn test_sample_outside_buffer_is_default() {
        let tex = Texture {
            name: "t".into(),
            width: 0,
            height: 3,
            pixels: vec![255; 4],
        };
        assert_eq!(tex.sample(DVec2::new(0.5, 0.5)), Color::default());
        let short = Texture {
            name: "t".into(),
            width: 2,
            height: 2,
            pixels: vec![255; 4],
        };
        assert_eq!(short.sample(DVec2::new(0.9, 0.1)), Color::default());
    }
}
