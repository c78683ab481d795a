//! Interpolation system for animatable values.
//!
//! This module provides the `Interpolate` trait and implementations for all
//! animatable value types. Factors outside `0.0..=1.0` extrapolate, which is
//! what overshooting easing curves (spring, elastic) rely on.
//!
//! # Color Space Handling
//!
//! Colors are interpolated per component in sRGB space, matching how theme
//! palettes are authored. Extrapolated color channels are clamped to the valid
//! range.

use crate::color::Color;
use crate::types::{AnimatableValue, Point, Rect, Size};

/// Trait for types that can be interpolated between two values.
pub trait Interpolate: Sized {
    /// Interpolate between self and another value.
    ///
    /// When t = 0.0, returns self.
    /// When t = 1.0, returns to.
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

/// Linear interpolation helper for f64 values.
#[inline]
fn lerp_f64(from: f64, to: f64, t: f32) -> f64 {
    from + (to - from) * t as f64
}

/// Linear interpolation helper for f32 values.
#[inline]
fn lerp_f32(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_f64(*self, *to, t)
    }
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_f32(*self, *to, t)
    }
}

impl Interpolate for Color {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        let channel = |a: f32, b: f32| lerp_f32(a, b, t).clamp(0.0, 1.0);
        Color::rgba(
            channel(self.r, to.r),
            channel(self.g, to.g),
            channel(self.b, to.b),
            channel(self.a, to.a),
        )
    }
}

impl Interpolate for Point {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        Point::new(lerp_f64(self.x, to.x, t), lerp_f64(self.y, to.y, t))
    }
}

impl Interpolate for Size {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        Size::new(
            lerp_f64(self.width, to.width, t),
            lerp_f64(self.height, to.height, t),
        )
    }
}

impl Interpolate for Rect {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        Rect::new(
            lerp_f64(self.x, to.x, t),
            lerp_f64(self.y, to.y, t),
            lerp_f64(self.width, to.width, t),
            lerp_f64(self.height, to.height, t),
        )
    }
}

impl Interpolate for AnimatableValue {
    /// Interpolate between two animatable values.
    ///
    /// Both values must be of the same variant. If they differ, returns self unchanged.
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        match (self, to) {
            (Self::F64 { value: from }, Self::F64 { value: to_val }) => Self::F64 {
                value: from.interpolate(to_val, t),
            },
            (Self::Color { color: from }, Self::Color { color: to_val }) => Self::Color {
                color: from.interpolate(to_val, t),
            },
            (Self::Point { point: from }, Self::Point { point: to_val }) => Self::Point {
                point: from.interpolate(to_val, t),
            },
            (Self::Size { size: from }, Self::Size { size: to_val }) => Self::Size {
                size: from.interpolate(to_val, t),
            },
            (Self::Rect { rect: from }, Self::Rect { rect: to_val }) => Self::Rect {
                rect: from.interpolate(to_val, t),
            },
            _ => *self,
        }
    }
}
