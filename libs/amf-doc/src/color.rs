//! RGBA colors with components in `[0, 1]`.

use config::constants::DEFAULT_COLOR;
use serde::{Deserialize, Serialize};

/// An RGBA color. Components are clamped to `[0, 1]` on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for Color {
    fn default() -> Self {
        let [r, g, b, a] = DEFAULT_COLOR;
        Self { r, g, b, a }
    }
}

impl Color {
    /// Fully transparent black; the color of void.
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque color from floating-point components. Out-of-range and NaN
    /// components are truncated into `[0, 1]`.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Color from floating-point components, clamped.
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: unit(r),
            g: unit(g),
            b: unit(b),
            a: unit(a),
        }
    }

    /// Opaque color from 0–255 integer components; values outside the range
    /// are truncated.
    pub fn from_u8_components(r: i32, g: i32, b: i32) -> Self {
        let c = |v: i32| f64::from(v.clamp(0, 255)) / 255.0;
        Self::rgb(c(r), c(g), c(b))
    }

    /// Red, green and blue as 0–255 integers.
    pub fn to_u8_components(self) -> [u8; 3] {
        let [r, g, b, _] = self.to_rgba8();
        [r, g, b]
    }

    /// All four channels as 0–255 bytes.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f64| (unit(v) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Componentwise `self * weight`.
    pub fn scaled(self, weight: f64) -> Self {
        Self {
            r: self.r * weight,
            g: self.g * weight,
            b: self.b * weight,
            a: self.a * weight,
        }
    }

    /// Componentwise sum, without clamping. Used to accumulate weighted blends.
    pub fn add(self, other: Color) -> Self {
        Self {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
            a: self.a + other.a,
        }
    }

    /// Barycentric interpolation of three colors.
    pub fn interpolate(colors: [Color; 3], weights: [f64; 3]) -> Self {
        colors[0]
            .scaled(weights[0])
            .add(colors[1].scaled(weights[1]))
            .add(colors[2].scaled(weights[2]))
            .clamped()
    }

    /// Re-clamps every component into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self::rgba(self.r, self.g, self.b, self.a)
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_are_truncated() {
        let c = Color::rgb(1.5, -0.2, f64::NAN);
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_u8_conversion() {
        let c = Color::from_u8_components(255, 128, 300);
        assert_eq!(c.to_u8_components(), [255, 128, 255]);
        assert_eq!(Color::from_u8_components(-4, 0, 0).r, 0.0);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let black = Color::rgb(0.0, 0.0, 0.0);
        let white = Color::rgb(1.0, 1.0, 1.0);
        let mid = Color::interpolate([black, white, white], [0.5, 0.25, 0.25]);
        assert!((mid.r - 0.5).abs() < 1e-12);
        assert_eq!(mid.a, 1.0);
    }
}
