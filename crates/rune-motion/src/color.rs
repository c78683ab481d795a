//! Theme color value.
//!
//! Colors are stored as straight (non-premultiplied) sRGB components in the
//! `0.0..=1.0` range, which is what theme palettes are authored in. Lightness
//! adjustments go through HSL via `palette` so shading a theme color keeps its
//! hue.

use std::fmt;

use palette::{Darken, FromColor, Hsla, Lighten, Srgba};
use serde::{Deserialize, Serialize};

/// An sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Create a color from float components.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit components.
    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    ///
    /// Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let nibble = |i: usize| u8::from_str_radix(digits.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();

        match digits.len() {
            3 => {
                let (r, g, b) = (nibble(0)?, nibble(1)?, nibble(2)?);
                Some(Self::rgba8(r * 17, g * 17, b * 17, 255))
            }
            6 => Some(Self::rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Convert to 8-bit components, rounding and clamping.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Return this color with a different alpha.
    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    /// Darken by `factor` (0.0 = unchanged, 1.0 = black), preserving hue.
    pub fn darker(&self, factor: f32) -> Self {
        Self::from_hsla(self.to_hsla().darken(factor.clamp(0.0, 1.0)))
    }

    /// Lighten by `factor` (0.0 = unchanged, 1.0 = white), preserving hue.
    pub fn lighter(&self, factor: f32) -> Self {
        Self::from_hsla(self.to_hsla().lighten(factor.clamp(0.0, 1.0)))
    }

    fn to_hsla(self) -> Hsla {
        Hsla::from_color(Srgba::new(self.r, self.g, self.b, self.a))
    }

    fn from_hsla(hsla: Hsla) -> Self {
        let rgba = Srgba::from_color(hsla);
        Self::rgba(rgba.red, rgba.green, rgba.blue, rgba.alpha)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}
