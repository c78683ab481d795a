//! Micro-interactions: short feedback effects built from the target's
//! current geometry or opacity.
//!
//! Every factory returns the effect already started. A new effect on the same
//! target and property stops the previous interaction first, so repeated
//! presses or hovers never fight over a property.
//!
//! Rest values are read from the target when the factory is called. Starting
//! `press`, `pulse` or `ripple` again mid-run therefore settles on the
//! geometry the interrupted effect had reached.

use tracing::warn;

use crate::animator::Animator;
use crate::context::MotionContext;
use crate::durations::{FAST, MEDIUM, SHAKE_STEP, ULTRA_FAST};
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::group::{Animation, Sequence};
use crate::target::TargetRef;
use crate::types::{AnimatableProperty, AnimatableValue, Point, Rect};

/// Default shrink factor for [`press`].
pub const PRESS_SCALE: f64 = 0.95;
/// Default growth factor for [`pulse`].
pub const PULSE_SCALE: f64 = 1.05;
/// Default opacity boost for [`hover_glow`].
pub const GLOW_INTENSITY: f64 = 0.2;
/// Default horizontal travel for [`shake`], in pixels.
pub const SHAKE_INTENSITY: f64 = 5.0;
/// How far [`ripple`] grows each edge, in pixels.
pub const RIPPLE_SPREAD: f64 = 5.0;

const SHAKE_CYCLES: usize = 3;

/// Shrink about the center, then spring back.
pub fn press(ctx: &MotionContext, target: &TargetRef, scale: f64) -> Result<Animation> {
    let rest = geometry(target)?;
    let pressed = rest.scaled_about_center(scale);

    let seq = Sequence::new(ctx)
        .add(tween(ctx, target, AnimatableProperty::Geometry, rest, pressed, ULTRA_FAST, EasingFunction::Crisp)?)
        .add(tween(ctx, target, AnimatableProperty::Geometry, pressed, rest, FAST, EasingFunction::Spring)?);
    Ok(claim(ctx, target, AnimatableProperty::Geometry, seq.into()))
}

/// Raise opacity by `intensity`, clamped to fully opaque.
pub fn hover_glow(ctx: &MotionContext, target: &TargetRef, intensity: f64) -> Result<Animation> {
    let current = current_f64(target, AnimatableProperty::Opacity)?;
    let glow = (current + intensity).clamp(0.0, 1.0);

    let animator = tween(
        ctx,
        target,
        AnimatableProperty::Opacity,
        current,
        glow,
        FAST,
        EasingFunction::Smooth,
    )?;
    Ok(claim(ctx, target, AnimatableProperty::Opacity, animator.into()))
}

/// Scale about the center and stay there.
pub fn scale(ctx: &MotionContext, target: &TargetRef, factor: f64) -> Result<Animation> {
    let rest = geometry(target)?;
    let animator = tween(
        ctx,
        target,
        AnimatableProperty::Geometry,
        rest,
        rest.scaled_about_center(factor),
        FAST,
        EasingFunction::Spring,
    )?;
    Ok(claim(ctx, target, AnimatableProperty::Geometry, animator.into()))
}

/// Grow about the center, then contract back.
pub fn pulse(ctx: &MotionContext, target: &TargetRef, scale: f64) -> Result<Animation> {
    let rest = geometry(target)?;
    let expanded = rest.scaled_about_center(scale);

    let seq = Sequence::new(ctx)
        .add(tween(ctx, target, AnimatableProperty::Geometry, rest, expanded, FAST, EasingFunction::Smooth)?)
        .add(tween(ctx, target, AnimatableProperty::Geometry, expanded, rest, FAST, EasingFunction::Spring)?);
    Ok(claim(ctx, target, AnimatableProperty::Geometry, seq.into()))
}

/// Horizontal error shake: right, left, center, three times.
pub fn shake(ctx: &MotionContext, target: &TargetRef, intensity: f64) -> Result<Animation> {
    let origin = match target.get(AnimatableProperty::Pos) {
        Some(AnimatableValue::Point { point }) => point,
        Some(_) | None => return Err(missing(target, AnimatableProperty::Pos)),
    };
    let right = origin.offset(intensity, 0.0);
    let left = origin.offset(-intensity, 0.0);
    let legs: [(Point, Point); 3] = [(origin, right), (right, left), (left, origin)];

    let mut seq = Sequence::new(ctx);
    for _ in 0..SHAKE_CYCLES {
        for (from, to) in legs {
            seq = seq.add(tween(
                ctx,
                target,
                AnimatableProperty::Pos,
                from,
                to,
                SHAKE_STEP,
                EasingFunction::Smooth,
            )?);
        }
    }
    Ok(claim(ctx, target, AnimatableProperty::Pos, seq.into()))
}

/// Elastic outward ripple, then settle back.
pub fn ripple(ctx: &MotionContext, target: &TargetRef) -> Result<Animation> {
    let rest = geometry(target)?;
    let spread = rest.adjusted(-RIPPLE_SPREAD, -RIPPLE_SPREAD, RIPPLE_SPREAD, RIPPLE_SPREAD);

    let seq = Sequence::new(ctx)
        .add(tween(ctx, target, AnimatableProperty::Geometry, rest, spread, MEDIUM, EasingFunction::Elastic)?)
        .add(tween(ctx, target, AnimatableProperty::Geometry, spread, rest, MEDIUM, EasingFunction::Smooth)?);
    Ok(claim(ctx, target, AnimatableProperty::Geometry, seq.into()))
}

/// Build an idle animator with explicit endpoints.
pub(crate) fn tween(
    ctx: &MotionContext,
    target: &TargetRef,
    property: AnimatableProperty,
    from: impl Into<AnimatableValue>,
    to: impl Into<AnimatableValue>,
    duration_ms: u64,
    easing: EasingFunction,
) -> Result<Animator> {
    Animator::for_property(ctx, target, property, duration_ms, easing)?
        .with_start_value(from)?
        .with_end_value(to)
}

/// Stop the previous interaction on this property and start `animation`.
pub(crate) fn claim(
    ctx: &MotionContext,
    target: &TargetRef,
    property: AnimatableProperty,
    animation: Animation,
) -> Animation {
    ctx.claim_interaction(target, property, &animation);
    animation.started()
}

pub(crate) fn geometry(target: &TargetRef) -> Result<Rect> {
    match target.get(AnimatableProperty::Geometry) {
        Some(AnimatableValue::Rect { rect }) => Ok(rect),
        Some(_) | None => Err(missing(target, AnimatableProperty::Geometry)),
    }
}

pub(crate) fn current_f64(target: &TargetRef, property: AnimatableProperty) -> Result<f64> {
    target
        .get(property)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| missing(target, property))
}

pub(crate) fn missing(target: &TargetRef, property: AnimatableProperty) -> MotionError {
    if target.is_alive() {
        warn!(%property, "target does not expose property");
        MotionError::PropertyNotFound { property }
    } else {
        MotionError::TargetDestroyed
    }
}
