//! Core animation types and data structures.
//!
//! This module defines the fundamental types for the motion engine:
//! - `AnimatableValue`: Enum for all animatable property values
//! - `AnimatableProperty`: Enum for the string-addressed widget properties
//! - `AnimationId`: Unique identifier for animations
//! - `AnimationState`: Current state of an animation
//! - `Point`, `Size`, `Rect`: Geometry value types

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::MotionError;

/// Unique identifier for an animation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

impl AnimationId {
    /// Generate a new unique animation ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AnimationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current state of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    /// Created but not started, or reset for a new run.
    #[default]
    Idle,
    /// Registered with the scheduler and advancing.
    Running,
    /// Reached the end of its last loop.
    Finished,
    /// Stopped before completion (explicitly, by a newer writer, or because
    /// its target went away).
    Cancelled,
}

impl AnimationState {
    /// Finished or Cancelled.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// How many times an animation plays before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    Finite(u32),
    /// Only `stop()` ends the animation.
    Infinite,
}

impl Default for LoopCount {
    fn default() -> Self {
        Self::Finite(1)
    }
}

impl LoopCount {
    /// Returns true if another loop should run after `completed` loops.
    pub fn has_more_after(&self, completed: u32) -> bool {
        match self {
            Self::Finite(n) => completed < (*n).max(1),
            Self::Infinite => true,
        }
    }
}

/// A 2D position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A 2D extent in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// An axis-aligned rectangle (widget geometry).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Move the edges: `dx1`/`dy1` shift the top-left corner, `dx2`/`dy2`
    /// the bottom-right corner.
    pub fn adjusted(&self, dx1: f64, dy1: f64, dx2: f64, dy2: f64) -> Self {
        Self::new(
            self.x + dx1,
            self.y + dy1,
            self.width - dx1 + dx2,
            self.height - dy1 + dy2,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scale the size by `factor` keeping the center fixed.
    pub fn scaled_about_center(&self, factor: f64) -> Self {
        let c = self.center();
        let w = self.width * factor;
        let h = self.height * factor;
        Self::new(c.x - w / 2.0, c.y - h / 2.0, w, h)
    }
}

/// Enum representing all animatable value types.
///
/// This enum wraps the different types of values that can be animated,
/// allowing the animation system to handle them uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimatableValue {
    /// Numeric value (opacity, width, blur radius, etc.)
    F64 { value: f64 },
    /// sRGB color.
    Color { color: Color },
    /// Position.
    Point { point: Point },
    /// Extent.
    Size { size: Size },
    /// Full geometry.
    Rect { rect: Rect },
}

impl AnimatableValue {
    /// The value type tag of this value.
    pub fn value_type(&self) -> AnimatableValueType {
        match self {
            Self::F64 { .. } => AnimatableValueType::F64,
            Self::Color { .. } => AnimatableValueType::Color,
            Self::Point { .. } => AnimatableValueType::Point,
            Self::Size { .. } => AnimatableValueType::Size,
            Self::Rect { .. } => AnimatableValueType::Rect,
        }
    }

    /// Try to extract an f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64 { value } => Some(*value),
            _ => None,
        }
    }

    /// Try to extract a color value.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color { color } => Some(*color),
            _ => None,
        }
    }

    /// Try to extract a point.
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point { point } => Some(*point),
            _ => None,
        }
    }

    /// Try to extract a size.
    pub fn as_size(&self) -> Option<Size> {
        match self {
            Self::Size { size } => Some(*size),
            _ => None,
        }
    }

    /// Try to extract a rectangle.
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect { rect } => Some(*rect),
            _ => None,
        }
    }
}

impl From<f64> for AnimatableValue {
    fn from(v: f64) -> Self {
        Self::F64 { value: v }
    }
}

impl From<Color> for AnimatableValue {
    fn from(c: Color) -> Self {
        Self::Color { color: c }
    }
}

impl From<Point> for AnimatableValue {
    fn from(p: Point) -> Self {
        Self::Point { point: p }
    }
}

impl From<Size> for AnimatableValue {
    fn from(s: Size) -> Self {
        Self::Size { size: s }
    }
}

impl From<Rect> for AnimatableValue {
    fn from(r: Rect) -> Self {
        Self::Rect { rect: r }
    }
}

/// Widget properties the engine knows how to animate.
///
/// Callers address properties by path string at the API boundary
/// (`"opacity"`, `"geometry"`, `"background-color"`); the path is parsed into
/// this enum once when an animation is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatableProperty {
    // Visual
    Opacity,
    BlurRadius,
    CornerRadius,

    // Geometry (grouped)
    Geometry,
    Pos,
    Size,

    // Geometry (individual)
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,

    // Colors
    BackgroundColor,
    TextColor,
    BorderColor,
}

impl AnimatableProperty {
    /// Every property, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Opacity,
        Self::BlurRadius,
        Self::CornerRadius,
        Self::Geometry,
        Self::Pos,
        Self::Size,
        Self::Width,
        Self::Height,
        Self::MinWidth,
        Self::MinHeight,
        Self::MaxWidth,
        Self::MaxHeight,
        Self::BackgroundColor,
        Self::TextColor,
        Self::BorderColor,
    ];

    /// Returns the expected value type for this property.
    pub fn value_type(&self) -> AnimatableValueType {
        match self {
            Self::Opacity | Self::BlurRadius | Self::CornerRadius => AnimatableValueType::F64,

            Self::Geometry => AnimatableValueType::Rect,
            Self::Pos => AnimatableValueType::Point,
            Self::Size => AnimatableValueType::Size,

            Self::Width
            | Self::Height
            | Self::MinWidth
            | Self::MinHeight
            | Self::MaxWidth
            | Self::MaxHeight => AnimatableValueType::F64,

            Self::BackgroundColor | Self::TextColor | Self::BorderColor => {
                AnimatableValueType::Color
            }
        }
    }

    /// Canonical path string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::BlurRadius => "blur-radius",
            Self::CornerRadius => "corner-radius",
            Self::Geometry => "geometry",
            Self::Pos => "pos",
            Self::Size => "size",
            Self::Width => "width",
            Self::Height => "height",
            Self::MinWidth => "min-width",
            Self::MinHeight => "min-height",
            Self::MaxWidth => "max-width",
            Self::MaxHeight => "max-height",
            Self::BackgroundColor => "background-color",
            Self::TextColor => "text-color",
            Self::BorderColor => "border-color",
        }
    }

    /// Returns true if animating this property moves or resizes the widget.
    pub fn affects_layout(&self) -> bool {
        matches!(
            self,
            Self::Geometry
                | Self::Pos
                | Self::Size
                | Self::Width
                | Self::Height
                | Self::MinWidth
                | Self::MinHeight
                | Self::MaxWidth
                | Self::MaxHeight
        )
    }
}

impl FromStr for AnimatableProperty {
    type Err = MotionError;

    /// Parse a property path. Case, `-` and `_` are ignored, so
    /// `"background-color"`, `"backgroundColor"` and `"background_color"`
    /// all resolve to the same property.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let key: String = path
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        let property = match key.as_str() {
            "opacity" | "windowopacity" => Self::Opacity,
            "blurradius" | "blur" => Self::BlurRadius,
            "cornerradius" | "borderradius" => Self::CornerRadius,
            "geometry" | "rect" => Self::Geometry,
            "pos" | "position" => Self::Pos,
            "size" => Self::Size,
            "width" => Self::Width,
            "height" => Self::Height,
            "minwidth" | "minimumwidth" => Self::MinWidth,
            "minheight" | "minimumheight" => Self::MinHeight,
            "maxwidth" | "maximumwidth" => Self::MaxWidth,
            "maxheight" | "maximumheight" => Self::MaxHeight,
            "backgroundcolor" | "background" => Self::BackgroundColor,
            "textcolor" | "color" | "foreground" => Self::TextColor,
            "bordercolor" => Self::BorderColor,
            _ => return Err(MotionError::UnknownProperty(path.to_string())),
        };
        Ok(property)
    }
}

impl fmt::Display for AnimatableProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected value type for an animatable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatableValueType {
    F64,
    Color,
    Point,
    Size,
    Rect,
}

impl fmt::Display for AnimatableValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F64 => "number",
            Self::Color => "color",
            Self::Point => "point",
            Self::Size => "size",
            Self::Rect => "rect",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animation_id_uniqueness() {
        let id1 = AnimationId::new();
        let id2 = AnimationId::new();
        let id3 = AnimationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_animation_state_default() {
        assert_eq!(AnimationState::default(), AnimationState::Idle);
        assert!(AnimationState::Finished.is_settled());
        assert!(AnimationState::Cancelled.is_settled());
        assert!(!AnimationState::Running.is_settled());
    }

    #[test]
    fn test_loop_count() {
        assert!(LoopCount::Finite(1).has_more_after(0));
        assert!(!LoopCount::Finite(1).has_more_after(1));
        assert!(LoopCount::Finite(3).has_more_after(2));
        assert!(LoopCount::Infinite.has_more_after(10_000));
        // Zero loops still plays once.
        assert!(LoopCount::Finite(0).has_more_after(0));
    }

    #[test]
    fn test_property_paths() {
        let parse = |s: &str| s.parse::<AnimatableProperty>().unwrap();
        assert_eq!(parse("opacity"), AnimatableProperty::Opacity);
        assert_eq!(parse("windowOpacity"), AnimatableProperty::Opacity);
        assert_eq!(parse("background-color"), AnimatableProperty::BackgroundColor);
        assert_eq!(parse("backgroundColor"), AnimatableProperty::BackgroundColor);
        assert_eq!(parse("minimumHeight"), AnimatableProperty::MinHeight);
        assert_eq!(parse("pos"), AnimatableProperty::Pos);

        for property in AnimatableProperty::ALL {
            assert_eq!(parse(property.as_str()), property);
        }

        assert!(matches!(
            "wobble".parse::<AnimatableProperty>(),
            Err(MotionError::UnknownProperty(p)) if p == "wobble"
        ));
    }

    #[test]
    fn test_property_value_types() {
        assert_eq!(AnimatableProperty::Height.value_type(), AnimatableValueType::F64);
        assert_eq!(AnimatableProperty::Geometry.value_type(), AnimatableValueType::Rect);
        assert_eq!(AnimatableProperty::Pos.value_type(), AnimatableValueType::Point);
        assert_eq!(
            AnimatableProperty::BackgroundColor.value_type(),
            AnimatableValueType::Color
        );
        assert!(AnimatableProperty::Geometry.affects_layout());
        assert!(!AnimatableProperty::Opacity.affects_layout());
    }

    #[test]
    fn test_value_conversions() {
        let v: AnimatableValue = AnimatableValue::from(42.0);
        assert_eq!(v.as_f64(), Some(42.0));
        assert_eq!(v.as_rect(), None);
        assert_eq!(v.value_type(), AnimatableValueType::F64);

        let r = Rect::new(0.0, 0.0, 10.0, 20.0);
        let v: AnimatableValue = r.into();
        assert_eq!(v.as_rect(), Some(r));
        assert_eq!(v.value_type(), AnimatableValueType::Rect);
    }

    #[test]
    fn test_rect_helpers() {
        let r = Rect::new(10.0, 10.0, 100.0, 40.0);
        assert_eq!(r.center(), Point::new(60.0, 30.0));
        assert_eq!(r.adjusted(-1.0, -1.0, 1.0, 1.0), Rect::new(9.0, 9.0, 102.0, 42.0));
        assert_eq!(r.translated(10.0, 0.0), Rect::new(20.0, 10.0, 100.0, 40.0));

        let shrunk = r.scaled_about_center(0.5);
        assert_eq!(shrunk, Rect::new(35.0, 20.0, 50.0, 20.0));
        assert_eq!(shrunk.center(), r.center());
    }
}
