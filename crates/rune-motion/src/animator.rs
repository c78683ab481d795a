//! Single-property animator.
//!
//! An [`Animator`] interpolates one property of one target between a start
//! and an end value. Lifecycle:
//!
//! 1. `create` resolves the property path once and validates it against the
//!    live target. Errors surface here and nowhere else.
//! 2. `start` claims the (target, property) writer slot, cancelling whatever
//!    animator held it, writes the start value and registers a tick callback.
//! 3. Each tick re-checks that the target is alive before writing. A dead
//!    target cancels the animator quietly.
//! 4. On completion or `stop`, the tick callback is removed before anything
//!    else happens, so no write can follow.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use rune_config::MotionConfig;
//! use rune_motion::prelude::*;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
//! let widget = PropertyMap::new().with(AnimatableProperty::Opacity, 1.0).shared();
//!
//! let fade = Animator::create(&ctx, &TargetRef::new(&widget), "opacity", 150, EasingFunction::Smooth)?
//!     .with_end_value(0.0)?;
//! fade.start();
//! scheduler.advance(160);
//! assert_eq!(widget.get_f64(AnimatableProperty::Opacity), Some(0.0));
//! # Ok::<(), rune_motion::MotionError>(())
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::context::{MotionContext, WriterKey};
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::events::{AnimationKind, MotionEvent, SettleListeners};
use crate::interpolate::Interpolate;
use crate::scheduler::TimerHandle;
use crate::target::TargetRef;
use crate::types::{AnimatableProperty, AnimatableValue, AnimationId, AnimationState, LoopCount};

struct Run {
    state: AnimationState,
    // None means "capture the live value when started".
    start_value: Option<AnimatableValue>,
    end_value: AnimatableValue,
    // Start value actually used by the current run.
    from: AnimatableValue,
    elapsed_ms: f64,
    loops: LoopCount,
    completed_loops: u32,
    timer: Option<TimerHandle>,
}

struct AnimatorInner {
    id: AnimationId,
    ctx: MotionContext,
    target: TargetRef,
    property: AnimatableProperty,
    duration_ms: u64,
    easing: EasingFunction,
    run: RefCell<Run>,
    listeners: SettleListeners,
}

/// Handle to a single-property animation.
///
/// Clones refer to the same animator. A running animator stays alive until it
/// settles even if every handle is dropped.
#[derive(Clone)]
pub struct Animator {
    inner: Rc<AnimatorInner>,
}

/// Non-owning animator handle used by the writer registry.
#[derive(Clone)]
pub(crate) struct WeakAnimator {
    id: AnimationId,
    inner: Weak<AnimatorInner>,
}

impl WeakAnimator {
    pub(crate) fn id(&self) -> AnimationId {
        self.id
    }

    pub(crate) fn upgrade(&self) -> Option<Animator> {
        self.inner.upgrade().map(|inner| Animator { inner })
    }
}

impl Animator {
    /// Create an idle animator for the property at `path`.
    ///
    /// The start value is captured from the target when the animator starts
    /// unless set explicitly; the end value defaults to the current value.
    pub fn create(
        ctx: &MotionContext,
        target: &TargetRef,
        path: &str,
        duration_ms: u64,
        easing: EasingFunction,
    ) -> Result<Self> {
        let property = path.parse::<AnimatableProperty>()?;
        Self::for_property(ctx, target, property, duration_ms, easing)
    }

    /// Create an idle animator for an already-resolved property.
    pub fn for_property(
        ctx: &MotionContext,
        target: &TargetRef,
        property: AnimatableProperty,
        duration_ms: u64,
        easing: EasingFunction,
    ) -> Result<Self> {
        let widget = target.upgrade().ok_or(MotionError::TargetDestroyed)?;
        let current = widget
            .property(property)
            .ok_or(MotionError::PropertyNotFound { property })?;
        check_type(property, &current)?;

        Ok(Self {
            inner: Rc::new(AnimatorInner {
                id: AnimationId::new(),
                ctx: ctx.clone(),
                target: target.clone(),
                property,
                duration_ms,
                easing,
                run: RefCell::new(Run {
                    state: AnimationState::Idle,
                    start_value: None,
                    end_value: current,
                    from: current,
                    elapsed_ms: 0.0,
                    loops: LoopCount::default(),
                    completed_loops: 0,
                    timer: None,
                }),
                listeners: SettleListeners::default(),
            }),
        })
    }

    /// Builder form of [`set_start_value`](Self::set_start_value).
    pub fn with_start_value(self, value: impl Into<AnimatableValue>) -> Result<Self> {
        self.set_start_value(value)?;
        Ok(self)
    }

    /// Builder form of [`set_end_value`](Self::set_end_value).
    pub fn with_end_value(self, value: impl Into<AnimatableValue>) -> Result<Self> {
        self.set_end_value(value)?;
        Ok(self)
    }

    pub fn with_loop_count(self, loops: LoopCount) -> Self {
        self.inner.run.borrow_mut().loops = loops;
        self
    }

    /// Set the value written when the animator starts. Takes effect on the
    /// next `start`.
    pub fn set_start_value(&self, value: impl Into<AnimatableValue>) -> Result<()> {
        let value = value.into();
        check_type(self.inner.property, &value)?;
        self.inner.run.borrow_mut().start_value = Some(value);
        Ok(())
    }

    /// Set the end value. On a running animator this retargets the remaining
    /// part of the run without restarting it.
    pub fn set_end_value(&self, value: impl Into<AnimatableValue>) -> Result<()> {
        let value = value.into();
        check_type(self.inner.property, &value)?;
        self.inner.run.borrow_mut().end_value = value;
        Ok(())
    }

    pub fn id(&self) -> AnimationId {
        self.inner.id
    }

    pub fn property(&self) -> AnimatableProperty {
        self.inner.property
    }

    pub fn target(&self) -> &TargetRef {
        &self.inner.target
    }

    pub fn duration_ms(&self) -> u64 {
        self.inner.duration_ms
    }

    pub fn easing(&self) -> EasingFunction {
        self.inner.easing
    }

    pub fn state(&self) -> AnimationState {
        self.inner.run.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Running
    }

    pub fn end_value(&self) -> AnimatableValue {
        self.inner.run.borrow().end_value
    }

    pub fn loop_count(&self) -> LoopCount {
        self.inner.run.borrow().loops
    }

    /// Linear progress of the current loop in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        let run = self.inner.run.borrow();
        match run.state {
            AnimationState::Finished => 1.0,
            _ if self.inner.duration_ms == 0 => 0.0,
            _ => (run.elapsed_ms / self.inner.duration_ms as f64).min(1.0) as f32,
        }
    }

    /// Call `f` every time this animator finishes (not when cancelled).
    pub fn connect_finished(&self, f: impl Fn() + 'static) {
        self.connect_settled(move |state| {
            if state == AnimationState::Finished {
                f();
            }
        });
    }

    /// Call `f` with the terminal state every time this animator settles.
    pub fn connect_settled(&self, f: impl Fn(AnimationState) + 'static) {
        self.inner.listeners.connect(Rc::new(f));
    }

    /// Start animating. Returns immediately.
    ///
    /// Starting a running animator does nothing. A settled animator may be
    /// started again and replays from its start value.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }

        let inner = &self.inner;
        let Some(widget) = inner.target.upgrade() else {
            debug!(animation = %inner.id, property = %inner.property, "target destroyed before start");
            self.settle_dead();
            return;
        };

        inner.ctx.claim_writer(self.writer_key(), self);

        let from = {
            let mut run = inner.run.borrow_mut();
            let from = match run.start_value {
                Some(value) => value,
                None => widget.property(inner.property).unwrap_or(run.end_value),
            };
            run.from = from;
            run.elapsed_ms = 0.0;
            run.completed_loops = 0;
            run.state = AnimationState::Running;
            from
        };

        inner.ctx.push_event(MotionEvent::Started {
            animation_id: inner.id,
            kind: AnimationKind::Animator,
        });

        if inner.duration_ms == 0 || !inner.ctx.animations_enabled() {
            let end = inner.run.borrow().end_value;
            widget.set_property(inner.property, end);
            self.settle(AnimationState::Finished);
            return;
        }

        widget.set_property(inner.property, from);
        drop(widget);

        let ticking = self.clone();
        let handle = inner.ctx.scheduler().schedule_tick(
            Box::new(move |elapsed_ms| ticking.tick(elapsed_ms)),
            inner.ctx.frame_interval_ms(),
        );

        let mut run = inner.run.borrow_mut();
        if run.state == AnimationState::Running {
            run.timer = Some(handle);
        } else {
            // Settled while scheduling (e.g. stopped by a writer callback).
            drop(run);
            inner.ctx.scheduler().cancel(handle);
        }
    }

    /// Stop the animator, leaving the property at its last written value.
    ///
    /// Idempotent and safe to call from inside any engine callback. No write
    /// happens after this returns.
    pub fn stop(&self) {
        if self.is_running() {
            self.settle(AnimationState::Cancelled);
        }
    }

    pub(crate) fn downgrade(&self) -> WeakAnimator {
        WeakAnimator {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn writer_key(&self) -> WriterKey {
        (self.inner.target.key(), self.inner.property)
    }

    fn tick(&self, elapsed_ms: f64) {
        let inner = &self.inner;
        if !self.is_running() {
            return;
        }

        let Some(widget) = inner.target.upgrade() else {
            debug!(animation = %inner.id, property = %inner.property, "target destroyed mid-animation");
            self.settle_dead();
            return;
        };

        let (value, done) = {
            let mut run = inner.run.borrow_mut();
            run.elapsed_ms += elapsed_ms;
            let duration = inner.duration_ms as f64;
            let t = (run.elapsed_ms / duration).min(1.0) as f32;
            let value = if t >= 1.0 {
                run.end_value
            } else {
                run.from.interpolate(&run.end_value, inner.easing.evaluate(t))
            };

            let mut done = false;
            if t >= 1.0 {
                run.completed_loops += 1;
                if run.loops.has_more_after(run.completed_loops) {
                    run.elapsed_ms -= duration;
                } else {
                    done = true;
                }
            }
            (value, done)
        };

        trace!(animation = %inner.id, property = %inner.property, ?value, "tick");
        widget.set_property(inner.property, value);
        drop(widget);

        if done && self.is_running() {
            self.settle(AnimationState::Finished);
        }
    }

    fn settle_dead(&self) {
        self.inner.ctx.push_event(MotionEvent::DeadTarget {
            animation_id: self.inner.id,
            property: self.inner.property,
        });
        self.settle(AnimationState::Cancelled);
    }

    fn settle(&self, state: AnimationState) {
        let inner = &self.inner;
        let timer = {
            let mut run = inner.run.borrow_mut();
            run.state = state;
            run.timer.take()
        };
        if let Some(timer) = timer {
            inner.ctx.scheduler().cancel(timer);
        }
        inner.ctx.release_writer(self.writer_key(), inner.id);

        let event = match state {
            AnimationState::Finished => MotionEvent::Finished {
                animation_id: inner.id,
                kind: AnimationKind::Animator,
            },
            _ => MotionEvent::Cancelled {
                animation_id: inner.id,
                kind: AnimationKind::Animator,
            },
        };
        inner.ctx.push_event(event);
        inner.listeners.emit(state);
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("id", &self.inner.id)
            .field("property", &self.inner.property)
            .field("duration_ms", &self.inner.duration_ms)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) fn check_type(property: AnimatableProperty, value: &AnimatableValue) -> Result<()> {
    let expected = property.value_type();
    let found = value.value_type();
    if expected == found {
        Ok(())
    } else {
        Err(MotionError::ValueTypeMismatch {
            property,
            expected,
            found,
        })
    }
}

/// A property that is repeatedly sent to new values.
///
/// Every [`animate_to`](Self::animate_to) stops the previous run and starts
/// the next one from the live value, so rapid retargeting never jumps.
pub struct AnimatedProperty {
    ctx: MotionContext,
    target: TargetRef,
    property: AnimatableProperty,
    easing: EasingFunction,
    active: RefCell<Option<Animator>>,
}

impl AnimatedProperty {
    /// Resolve `path` against the live target.
    pub fn new(ctx: &MotionContext, target: &TargetRef, path: &str) -> Result<Self> {
        let property = path.parse::<AnimatableProperty>()?;
        let widget = target.upgrade().ok_or(MotionError::TargetDestroyed)?;
        let current = widget
            .property(property)
            .ok_or(MotionError::PropertyNotFound { property })?;
        check_type(property, &current)?;

        Ok(Self {
            ctx: ctx.clone(),
            target: target.clone(),
            property,
            easing: EasingFunction::Smooth,
            active: RefCell::new(None),
        })
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    /// Animate from the current value to `value`, replacing any run in
    /// flight.
    pub fn animate_to(&self, value: impl Into<AnimatableValue>, duration_ms: u64) -> Result<Animator> {
        let animator = Animator::for_property(&self.ctx, &self.target, self.property, duration_ms, self.easing)?
            .with_end_value(value)?;

        let previous = self.active.replace(Some(animator.clone()));
        if let Some(previous) = previous {
            previous.stop();
        }
        animator.start();
        Ok(animator)
    }

    /// Live value on the target.
    pub fn current_value(&self) -> Option<AnimatableValue> {
        self.target.get(self.property)
    }

    pub fn property(&self) -> AnimatableProperty {
        self.property
    }

    pub fn is_animating(&self) -> bool {
        self.active.borrow().as_ref().is_some_and(Animator::is_running)
    }

    /// Stop the run in flight, leaving the value where it is.
    pub fn stop(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(animator) = active {
            animator.stop();
        }
    }
}
