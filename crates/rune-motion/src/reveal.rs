//! Entrance effects for newly shown content.
//!
//! Each effect comes in two forms: a `RevealKind` that builds an idle
//! animation (used by [`staggered_reveal`]), and a convenience function that
//! builds and starts it.
//!
//! # Staggering
//!
//! [`staggered_reveal`] gives item `i` a lead-in pause of `i * stagger` inside
//! one parallel group, so each item starts exactly one stagger after the
//! previous item *starts*, regardless of how long the effects run.

use tracing::{debug, warn};

use crate::context::MotionContext;
use crate::durations::{MEDIUM, REVEAL, SCALE_IN};
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::group::{Animation, Parallel, Sequence};
use crate::micro::{claim, current_f64, geometry, missing, tween};
use crate::target::TargetRef;
use crate::types::{AnimatableProperty, AnimatableValue, Point, Rect};

/// Distance slide-in effects travel, in pixels.
pub const SLIDE_OFFSET: f64 = 30.0;

/// Direction content travels while sliding in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideDirection {
    /// Enters moving upward, from below its resting position.
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl SlideDirection {
    /// Offset of the start position relative to the resting position.
    fn start_offset(&self) -> (f64, f64) {
        match self {
            Self::Up => (0.0, SLIDE_OFFSET),
            Self::Down => (0.0, -SLIDE_OFFSET),
            Self::Left => (SLIDE_OFFSET, 0.0),
            Self::Right => (-SLIDE_OFFSET, 0.0),
        }
    }
}

/// Selectable entrance effect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RevealKind {
    /// Opacity 0 → 1.
    FadeIn { duration_ms: u64 },
    /// Position from an offset back to rest.
    SlideIn { duration_ms: u64, direction: SlideDirection },
    /// Geometry from a point at the center out to rest.
    ScaleIn { duration_ms: u64 },
    /// Slide up from 30 px below over the medium duration.
    #[default]
    RevealUp,
    /// Grow from a 2×2 rect at the center over the medium duration.
    RevealScale,
}

impl RevealKind {
    /// The property this effect writes.
    pub fn property(&self) -> AnimatableProperty {
        match self {
            Self::FadeIn { .. } => AnimatableProperty::Opacity,
            Self::SlideIn { .. } | Self::RevealUp => AnimatableProperty::Pos,
            Self::ScaleIn { .. } | Self::RevealScale => AnimatableProperty::Geometry,
        }
    }

    /// Build the idle effect against the target's current resting state.
    pub fn build(&self, ctx: &MotionContext, target: &TargetRef) -> Result<Animation> {
        let (from, to, duration, easing) = self.endpoints(target)?;
        Ok(tween(ctx, target, self.property(), from, to, duration, easing)?.into())
    }

    /// Start value, end value, duration and easing.
    fn endpoints(&self, target: &TargetRef) -> Result<(AnimatableValue, AnimatableValue, u64, EasingFunction)> {
        let endpoints = match *self {
            Self::FadeIn { duration_ms } => (AnimatableValue::from(0.0), AnimatableValue::from(1.0), duration_ms, EasingFunction::Smooth),
            Self::SlideIn { duration_ms, direction } => {
                let rest = position(target)?;
                let (dx, dy) = direction.start_offset();
                (rest.offset(dx, dy).into(), rest.into(), duration_ms, EasingFunction::Spring)
            }
            Self::RevealUp => {
                let rest = position(target)?;
                (rest.offset(0.0, SLIDE_OFFSET).into(), rest.into(), MEDIUM, EasingFunction::Spring)
            }
            Self::ScaleIn { duration_ms } => {
                let rest = geometry(target)?;
                let c = rest.center();
                (Rect::new(c.x, c.y, 0.0, 0.0).into(), rest.into(), duration_ms, EasingFunction::Spring)
            }
            Self::RevealScale => {
                let rest = geometry(target)?;
                let c = rest.center();
                (
                    Rect::new(c.x - 1.0, c.y - 1.0, 2.0, 2.0).into(),
                    rest.into(),
                    MEDIUM,
                    EasingFunction::Spring,
                )
            }
        };
        Ok(endpoints)
    }
}

/// Fade from transparent to opaque.
pub fn fade_in(ctx: &MotionContext, target: &TargetRef, duration_ms: u64) -> Result<Animation> {
    start(ctx, target, RevealKind::FadeIn { duration_ms })
}

/// Fade from the current opacity to transparent.
pub fn fade_out(ctx: &MotionContext, target: &TargetRef, duration_ms: u64) -> Result<Animation> {
    let current = current_f64(target, AnimatableProperty::Opacity)?;
    let animator = tween(
        ctx,
        target,
        AnimatableProperty::Opacity,
        current,
        0.0,
        duration_ms,
        EasingFunction::Smooth,
    )?;
    Ok(claim(ctx, target, AnimatableProperty::Opacity, animator.into()))
}

/// Slide into the resting position from `direction`.
pub fn slide_in(
    ctx: &MotionContext,
    target: &TargetRef,
    duration_ms: u64,
    direction: SlideDirection,
) -> Result<Animation> {
    start(ctx, target, RevealKind::SlideIn { duration_ms, direction })
}

/// Grow out of the center.
pub fn scale_in(ctx: &MotionContext, target: &TargetRef, duration_ms: u64) -> Result<Animation> {
    start(ctx, target, RevealKind::ScaleIn { duration_ms })
}

/// Slide up into place after `delay_ms`.
pub fn reveal_up(ctx: &MotionContext, target: &TargetRef, delay_ms: u64) -> Result<Animation> {
    delayed(ctx, target, RevealKind::RevealUp, delay_ms)
}

/// Grow into place after `delay_ms`.
pub fn reveal_scale(ctx: &MotionContext, target: &TargetRef, delay_ms: u64) -> Result<Animation> {
    delayed(ctx, target, RevealKind::RevealScale, delay_ms)
}

/// Fade between explicit opacities.
pub fn reveal_fade(
    ctx: &MotionContext,
    target: &TargetRef,
    duration_ms: u64,
    from: f64,
    to: f64,
    easing: EasingFunction,
) -> Result<Animation> {
    let animator = tween(ctx, target, AnimatableProperty::Opacity, from, to, duration_ms, easing)?;
    Ok(claim(ctx, target, AnimatableProperty::Opacity, animator.into()))
}

/// Run `kind` on every target, item `i` starting `i * stagger_delay_ms` after
/// the first.
///
/// Targets that are dead or lack the effect's property are skipped, keeping
/// the spacing of the remaining items. Effects already running on an item's
/// property are stopped, and delayed items are moved to their start state
/// right away so they do not show at rest before their turn.
pub fn staggered_reveal(
    ctx: &MotionContext,
    targets: &[TargetRef],
    kind: RevealKind,
    stagger_delay_ms: u64,
) -> Animation {
    let mut group = Parallel::new(ctx);

    let property = kind.property();
    for (i, target) in targets.iter().enumerate() {
        let effect = match kind.build(ctx, target) {
            Ok(effect) => effect,
            Err(MotionError::TargetDestroyed) => {
                debug!(index = i, "skipping destroyed item in staggered reveal");
                continue;
            }
            Err(err) => {
                warn!(index = i, error = %err, "skipping item in staggered reveal");
                continue;
            }
        };

        let lead_in = i as u64 * stagger_delay_ms;
        let item = if lead_in == 0 {
            effect
        } else {
            Sequence::new(ctx).add_pause(lead_in).add(effect).into()
        };

        // The item owns the property from now on, including its lead-in.
        ctx.claim_interaction(target, property, &item);
        if let Some(writer) = ctx.active_writer(target, property) {
            writer.stop();
        }
        if lead_in > 0 {
            if let Ok((from, _, _, _)) = kind.endpoints(target) {
                target.set(property, from);
            }
        }
        group = group.add(item);
    }

    debug!(items = group.len(), stagger_delay_ms, "starting staggered reveal");
    Animation::from(group).started()
}

/// Animate children from their pre-layout geometry to where the layout put
/// them.
///
/// `moves` pairs each child with the geometry it had before the layout
/// changed; children whose geometry did not change are left alone.
pub fn layout_transition(ctx: &MotionContext, moves: &[(TargetRef, Rect)], duration_ms: u64) -> Animation {
    let mut group = Parallel::new(ctx);

    for (target, before) in moves {
        let after = match geometry(target) {
            Ok(after) => after,
            Err(err) => {
                debug!(error = %err, "skipping child in layout transition");
                continue;
            }
        };
        if after == *before {
            continue;
        }

        match tween(
            ctx,
            target,
            AnimatableProperty::Geometry,
            *before,
            after,
            duration_ms,
            EasingFunction::Smooth,
        ) {
            Ok(animator) => group = group.add(animator),
            Err(err) => debug!(error = %err, "skipping child in layout transition"),
        }
    }

    Animation::from(group).started()
}

/// Default durations, matching the standalone functions.
impl RevealKind {
    pub fn fade_in() -> Self {
        Self::FadeIn { duration_ms: REVEAL }
    }

    pub fn slide_in(direction: SlideDirection) -> Self {
        Self::SlideIn {
            duration_ms: REVEAL,
            direction,
        }
    }

    pub fn scale_in() -> Self {
        Self::ScaleIn { duration_ms: SCALE_IN }
    }
}

fn start(ctx: &MotionContext, target: &TargetRef, kind: RevealKind) -> Result<Animation> {
    let effect = kind.build(ctx, target)?;
    Ok(claim(ctx, target, kind.property(), effect))
}

fn delayed(ctx: &MotionContext, target: &TargetRef, kind: RevealKind, delay_ms: u64) -> Result<Animation> {
    let effect = kind.build(ctx, target)?;
    if delay_ms == 0 {
        return Ok(claim(ctx, target, kind.property(), effect));
    }
    let seq = Sequence::new(ctx).add_pause(delay_ms).add(effect);
    Ok(claim(ctx, target, kind.property(), seq.into()))
}

fn position(target: &TargetRef) -> Result<Point> {
    match target.get(AnimatableProperty::Pos) {
        Some(AnimatableValue::Point { point }) => Ok(point),
        Some(_) | None => Err(missing(target, AnimatableProperty::Pos)),
    }
}
