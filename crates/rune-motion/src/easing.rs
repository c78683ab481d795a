//! Easing functions for animation timing.
//!
//! This module implements the CSS timing functions plus the named curves of
//! the widget animation library:
//! - Linear
//! - Ease, EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CubicBezier (custom bezier curves)
//! - Steps (stepped animations)
//! - Smooth, Crisp, Spring, Elastic, Bounce (library curves)
//! - InCubic, InOutCubic
//!
//! # Overshoot
//!
//! `Spring` and `Elastic` leave the `0.0..=1.0` output range on their way to
//! 1.0. Everything that consumes eased progress (interpolation, property
//! writes) must tolerate those intermediate values.
//!
//! # Usage
//!
//! ```
//! use rune_motion::easing::EasingFunction;
//!
//! let ease = EasingFunction::Smooth;
//! let progress = ease.evaluate(0.5);
//! assert!(progress > 0.5);
//!
//! let spring: EasingFunction = "spring".parse().unwrap();
//! assert!(spring.overshoots());
//! ```

use std::f32::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Position for stepped animations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// Jump at the start of each interval (CSS `jump-start` / `start`).
    Start,
    /// Jump at the end of each interval (CSS `jump-end` / `end`).
    #[default]
    End,
}

/// Easing function for animation timing.
///
/// Easing functions map a linear progress value (0.0 to 1.0) to an eased
/// output value, controlling the rate of change over time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// CSS `ease` - Slow start, fast middle, slow end.
    Ease,

    /// CSS `ease-in` - Slow start, accelerating.
    EaseIn,

    /// CSS `ease-out` - Fast start, decelerating.
    EaseOut,

    /// CSS `ease-in-out` - Slow start and end, fast middle.
    EaseInOut,

    /// Decelerating cubic (out-cubic). The default library curve.
    #[default]
    Smooth,

    /// Sharper deceleration (out-quart), used for quick feedback.
    Crisp,

    /// Overshoots past 1.0 then settles (out-back).
    Spring,

    /// Damped oscillation around 1.0 (out-elastic).
    Elastic,

    /// Bounces against 1.0 like a dropped ball (out-bounce).
    Bounce,

    /// Accelerating cubic (in-cubic).
    InCubic,

    /// Cubic acceleration then deceleration (in-out-cubic).
    InOutCubic,

    /// Custom cubic bezier curve.
    /// Parameters: (x1, y1, x2, y2) - control points.
    /// x values are in [0, 1], y values can be any float.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },

    /// Stepped animation with discrete jumps.
    Steps { count: u32, position: StepPosition },
}

impl EasingFunction {
    /// Evaluate the easing function at the given progress.
    ///
    /// The input is clamped to `0.0..=1.0`. The output is exactly 0.0 at the
    /// start and 1.0 at the end, and may leave that range in between for
    /// overshooting curves.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::Smooth => 1.0 - (1.0 - t).powi(3),
            Self::Crisp => 1.0 - (1.0 - t).powi(4),
            Self::Spring => out_back(t),
            Self::Elastic => out_elastic(t),
            Self::Bounce => out_bounce(t),
            Self::InCubic => t * t * t,
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Steps { count, position } => stepped(*count, *position, t),
        }
    }

    /// Returns true if the curve leaves `0.0..=1.0` between its endpoints.
    pub fn overshoots(&self) -> bool {
        match self {
            Self::Spring | Self::Elastic => true,
            Self::CubicBezier { y1, y2, .. } => !(0.0..=1.0).contains(y1) || !(0.0..=1.0).contains(y2),
            _ => false,
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// The x control values are clamped to `[0, 1]` so the curve stays a
    /// function of time.
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::CubicBezier {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    /// Create a stepped easing function. A count of zero is treated as one.
    pub fn steps(steps: u32, position: StepPosition) -> Self {
        Self::Steps {
            count: steps.max(1),
            position,
        }
    }
}

impl FromStr for EasingFunction {
    type Err = MotionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let easing = match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "linear" => Self::Linear,
            "ease" => Self::Ease,
            "ease-in" => Self::EaseIn,
            "ease-out" => Self::EaseOut,
            "ease-in-out" => Self::EaseInOut,
            "smooth" | "out-cubic" => Self::Smooth,
            "crisp" | "out-quart" => Self::Crisp,
            "spring" | "out-back" => Self::Spring,
            "elastic" | "out-elastic" => Self::Elastic,
            "bounce" | "out-bounce" => Self::Bounce,
            "in-cubic" => Self::InCubic,
            "in-out-cubic" => Self::InOutCubic,
            other => return Err(MotionError::Config(format!("unknown easing curve '{other}'"))),
        };
        Ok(easing)
    }
}

/// Out-back with the conventional overshoot constant (about 10%).
fn out_back(t: f32) -> f32 {
    const S: f32 = 1.70158;
    let u = t - 1.0;
    u * u * ((S + 1.0) * u + S) + 1.0
}

/// Out-elastic with amplitude 1 and period 0.3.
fn out_elastic(t: f32) -> f32 {
    const PERIOD: f32 = 0.3;
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let s = PERIOD / 4.0;
    2.0_f32.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / PERIOD).sin() + 1.0
}

fn out_bounce(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// Evaluate a cubic bezier curve at time t.
///
/// This implementation uses Newton-Raphson iteration to find the t parameter
/// on the bezier curve corresponding to the input progress, then evaluates
/// the y coordinate at that point.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, progress: f32) -> f32 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_y(y1, y2, t)
}

/// Solve for t in the bezier x equation using Newton-Raphson iteration.
fn solve_bezier_x(x1: f32, x2: f32, target_x: f32) -> f32 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_x(x1, x2, t) - target_x;
        if x.abs() < 1e-6 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-6 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// x(t) = 3(1-t)²t·x1 + 3(1-t)t²·x2 + t³
#[inline]
fn bezier_x(x1: f32, x2: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * x1 + 3.0 * mt * t2 * x2 + t3
}

#[inline]
fn bezier_y(y1: f32, y2: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * y1 + 3.0 * mt * t2 * y2 + t3
}

/// dx/dt = 3(1-t)²·x1 + 6(1-t)t·(x2-x1) + 3t²·(1-x2)
#[inline]
fn bezier_x_derivative(x1: f32, x2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}

fn stepped(steps: u32, position: StepPosition, t: f32) -> f32 {
    let steps_f = steps.max(1) as f32;

    match position {
        StepPosition::Start => (t * steps_f).ceil() / steps_f,
        StepPosition::End => (t * steps_f).floor() / steps_f,
    }
}

static_assertions::assert_impl_all!(EasingFunction: Send, Sync);
