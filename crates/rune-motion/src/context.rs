//! Engine-owned shared state.
//!
//! A [`MotionContext`] is the single handle every animation is created
//! against. It owns:
//! - the host scheduler and the motion configuration
//! - the active-writer registry, one animator per (target, property)
//! - the keep-alive set of running composites
//! - interaction claims used by the effect factories
//! - the lifecycle event queue
//!
//! Cloning a context is cheap and yields a handle to the same state.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use rune_config::MotionConfig;
//! use rune_motion::{MotionContext, scheduler::ManualScheduler};
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
//! assert!(ctx.animations_enabled());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rune_config::{MotionConfig, RuneConfig};
use tracing::{trace, warn};

use crate::animator::{Animator, WeakAnimator};
use crate::events::{EventQueue, MotionEvent};
use crate::group::Animation;
use crate::scheduler::Scheduler;
use crate::target::{TargetKey, TargetRef};
use crate::types::{AnimatableProperty, AnimationId};

/// Registry key for the one-active-writer rule.
pub(crate) type WriterKey = (TargetKey, AnimatableProperty);

// Bound on cascading preemptions when a stopped writer's group immediately
// starts another writer on the same key.
const MAX_PREEMPTIONS: usize = 32;

struct ContextInner {
    scheduler: Rc<dyn Scheduler>,
    config: RefCell<MotionConfig>,
    writers: RefCell<HashMap<WriterKey, WeakAnimator>>,
    running: RefCell<HashMap<AnimationId, Animation>>,
    claims: RefCell<HashMap<WriterKey, AnimationId>>,
    events: RefCell<EventQueue>,
}

/// Cloneable handle to the engine state.
#[derive(Clone)]
pub struct MotionContext {
    inner: Rc<ContextInner>,
}

impl MotionContext {
    /// Create a context driven by `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>, config: MotionConfig) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                scheduler,
                config: RefCell::new(config),
                writers: RefCell::new(HashMap::new()),
                running: RefCell::new(HashMap::new()),
                claims: RefCell::new(HashMap::new()),
                events: RefCell::new(EventQueue::new()),
            }),
        }
    }

    /// Create a context using the `[motion]` section of a loaded config.
    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &RuneConfig) -> Self {
        Self::new(scheduler, config.motion.clone())
    }

    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.inner.scheduler.clone()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> MotionConfig {
        self.inner.config.borrow().clone()
    }

    pub fn animations_enabled(&self) -> bool {
        self.inner.config.borrow().animations_enabled
    }

    /// Toggle the global animation switch. Affects animations started after
    /// the call.
    pub fn set_animations_enabled(&self, enabled: bool) {
        self.inner.config.borrow_mut().animations_enabled = enabled;
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.inner.config.borrow().frame_interval_ms.max(1)
    }

    /// The animator currently writing `property` on `target`, if any.
    pub fn active_writer(&self, target: &TargetRef, property: AnimatableProperty) -> Option<Animator> {
        self.inner
            .writers
            .borrow()
            .get(&(target.key(), property))
            .and_then(WeakAnimator::upgrade)
            .filter(Animator::is_running)
    }

    /// Returns true if any animator is writing `property` on `target`.
    pub fn is_animating(&self, target: &TargetRef, property: AnimatableProperty) -> bool {
        self.active_writer(target, property).is_some()
    }

    /// Number of running animators across all targets.
    pub fn active_writer_count(&self) -> usize {
        self.inner
            .writers
            .borrow()
            .values()
            .filter(|w| w.upgrade().is_some_and(|a| a.is_running()))
            .count()
    }

    /// Number of running composites kept alive by the engine.
    pub fn running_composites(&self) -> usize {
        self.inner.running.borrow().len()
    }

    /// Stop every animator writing to `target`.
    pub fn stop_target(&self, target: &TargetRef) {
        let key = target.key();
        let writers: Vec<Animator> = self
            .inner
            .writers
            .borrow()
            .iter()
            .filter(|((k, _), _)| *k == key)
            .filter_map(|(_, w)| w.upgrade())
            .collect();
        for animator in writers {
            animator.stop();
        }
    }

    /// Take all pending lifecycle events.
    pub fn drain_events(&self) -> Vec<MotionEvent> {
        self.inner.events.borrow_mut().drain().collect()
    }

    pub(crate) fn push_event(&self, event: MotionEvent) {
        trace!(?event, "motion event");
        self.inner.events.borrow_mut().push(event);
    }

    /// Make `animator` the sole writer for `key`, stopping any previous one.
    pub(crate) fn claim_writer(&self, key: WriterKey, animator: &Animator) {
        for _ in 0..MAX_PREEMPTIONS {
            let previous = self
                .inner
                .writers
                .borrow()
                .get(&key)
                .and_then(WeakAnimator::upgrade)
                .filter(|prev| prev.id() != animator.id() && prev.is_running());

            match previous {
                Some(prev) => {
                    trace!(previous = %prev.id(), next = %animator.id(), property = %key.1, "preempting writer");
                    prev.stop();
                }
                None => {
                    self.inner.writers.borrow_mut().insert(key, animator.downgrade());
                    return;
                }
            }
        }

        warn!(property = %key.1, "writer kept being replaced during preemption");
        self.inner.writers.borrow_mut().insert(key, animator.downgrade());
    }

    /// Remove `id` from the writer registry if it still owns `key`.
    pub(crate) fn release_writer(&self, key: WriterKey, id: AnimationId) {
        let mut writers = self.inner.writers.borrow_mut();
        let owned = writers
            .get(&key)
            .is_some_and(|w| w.id() == id || w.upgrade().is_none());
        if owned {
            writers.remove(&key);
        }
    }

    /// Keep a running composite alive until it settles.
    pub(crate) fn retain(&self, animation: Animation) {
        self.inner.running.borrow_mut().insert(animation.id(), animation);
    }

    /// Drop the engine's reference to a settled composite.
    pub(crate) fn release(&self, id: AnimationId) {
        let released = self.inner.running.borrow_mut().remove(&id);
        self.inner.claims.borrow_mut().retain(|_, owner| *owner != id);
        // Dropped outside the borrows above.
        drop(released);
    }

    /// Record `animation` as the current interaction on (target, property),
    /// stopping the composite that previously held the claim.
    ///
    /// Only composites hold claims; a bare animator releases the slot and
    /// relies on the writer registry.
    pub(crate) fn claim_interaction(
        &self,
        target: &TargetRef,
        property: AnimatableProperty,
        animation: &Animation,
    ) {
        let key = (target.key(), property);
        let previous = match animation {
            Animation::Animator(_) => self.inner.claims.borrow_mut().remove(&key),
            _ => self.inner.claims.borrow_mut().insert(key, animation.id()),
        };
        let running = previous
            .filter(|id| *id != animation.id())
            .and_then(|id| self.inner.running.borrow().get(&id).cloned());
        if let Some(previous) = running {
            trace!(previous = %previous.id(), next = %animation.id(), %property, "replacing interaction");
            previous.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingFunction;
    use crate::group::Sequence;
    use crate::scheduler::ManualScheduler;
    use crate::target::PropertyMap;

    fn setup() -> (Rc<ManualScheduler>, MotionContext) {
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
        (scheduler, ctx)
    }

    #[test]
    fn test_context_tracks_writers() {
        let (scheduler, ctx) = setup();
        let widget = PropertyMap::new().with(AnimatableProperty::Opacity, 1.0).shared();
        let target = TargetRef::new(&widget);

        let fade = Animator::create(&ctx, &target, "opacity", 100, EasingFunction::Linear)
            .unwrap()
            .with_end_value(0.0)
            .unwrap();
        fade.start();
        assert_eq!(ctx.active_writer_count(), 1);
        assert!(ctx.is_animating(&target, AnimatableProperty::Opacity));

        scheduler.advance(200);
        assert_eq!(ctx.active_writer_count(), 0);
        assert!(ctx.active_writer(&target, AnimatableProperty::Opacity).is_none());
    }

    #[test]
    fn test_stop_target() {
        let (_scheduler, ctx) = setup();
        let widget = PropertyMap::new()
            .with(AnimatableProperty::Opacity, 1.0)
            .with(AnimatableProperty::Height, 32.0)
            .shared();
        let target = TargetRef::new(&widget);

        let a = Animator::create(&ctx, &target, "opacity", 100, EasingFunction::Linear).unwrap();
        let b = Animator::create(&ctx, &target, "height", 100, EasingFunction::Linear).unwrap();
        a.start();
        b.start();
        assert_eq!(ctx.active_writer_count(), 2);

        ctx.stop_target(&target);
        assert_eq!(ctx.active_writer_count(), 0);
        assert!(!a.is_running() && !b.is_running());
    }

    #[test]
    fn test_composites_released_when_settled() {
        let (scheduler, ctx) = setup();
        let seq = Sequence::new(&ctx).add_pause(50);
        seq.start();
        assert_eq!(ctx.running_composites(), 1);

        scheduler.advance(50);
        assert_eq!(ctx.running_composites(), 0);
    }

    #[test]
    fn test_toggle_animations() {
        let (_scheduler, ctx) = setup();
        ctx.set_animations_enabled(false);
        assert!(!ctx.animations_enabled());
        assert!(!ctx.config().animations_enabled);
    }
}
