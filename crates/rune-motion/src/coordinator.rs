//! Coordinated, staggered theme transitions across many components.
//!
//! Components register as [`ThemeParticipant`]s. When the theme changes the
//! coordinator runs every pre-transition callback, then asks component `i`
//! (in registration order) to play its transition `i * stagger` milliseconds
//! later. Post-transition callbacks run once every component has settled.
//!
//! The registry holds weak handles only: a dropped component simply falls out
//! of the next transition. Each delayed launch re-checks liveness before
//! touching the component.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::context::MotionContext;
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::events::{AnimationKind, MotionEvent};
use crate::group::{Animation, Sequence, panic_message};
use crate::micro::{claim, geometry, tween};
use crate::scheduler::TimerHandle;
use crate::target::TargetRef;
use crate::theme::ThemeStore;
use crate::types::{AnimatableProperty, AnimationId, AnimationState};

/// Pre/post transition hook. Errors are logged and do not stop the
/// transition.
pub type TransitionCallback = Box<dyn FnMut() -> anyhow::Result<()>>;

/// Opacity at the midpoint of a fade transition.
pub const FADE_LOW_OPACITY: f64 = 0.3;
/// Horizontal travel of a slide transition, in pixels.
pub const SLIDE_DISTANCE: f64 = 10.0;
/// Growth of each edge during a morph transition, in pixels.
pub const MORPH_GROWTH: f64 = 5.0;

/// Visual style of a component's theme transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Apply the new theme with no animation.
    Instant,
    #[default]
    Fade,
    Slide,
    Morph,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::Morph => "morph",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionKind {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" | "none" => Ok(Self::Instant),
            "fade" => Ok(Self::Fade),
            "slide" => Ok(Self::Slide),
            "morph" => Ok(Self::Morph),
            other => Err(MotionError::Config(format!("unknown theme transition '{other}'"))),
        }
    }
}

/// A component that takes part in coordinated theme transitions.
pub trait ThemeParticipant {
    /// Start this component's transition and return it, or `None` if the
    /// component applied the theme without animating.
    fn run_theme_transition(&self, ctx: &MotionContext, kind: TransitionKind, duration_ms: u64) -> Option<Animation>;

    /// Components that can be torn down while still referenced report it
    /// here.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Two-phase transition for one target: out to the midpoint and back.
///
/// Fade runs opacity from 1.0 down to [`FADE_LOW_OPACITY`] and back to 1.0,
/// whatever the live opacity is. Slide shifts the geometry right by
/// [`SLIDE_DISTANCE`] and morph grows it by [`MORPH_GROWTH`] on each edge.
/// Each phase takes half of `duration_ms`. Instant returns `Ok(None)`.
pub fn component_transition(
    ctx: &MotionContext,
    target: &TargetRef,
    kind: TransitionKind,
    duration_ms: u64,
) -> Result<Option<Animation>> {
    let phase = duration_ms / 2;
    let (property, seq) = match kind {
        TransitionKind::Instant => return Ok(None),
        TransitionKind::Fade => {
            let seq = Sequence::new(ctx)
                .add(tween(ctx, target, AnimatableProperty::Opacity, 1.0, FADE_LOW_OPACITY, phase, EasingFunction::Smooth)?)
                .add(tween(ctx, target, AnimatableProperty::Opacity, FADE_LOW_OPACITY, 1.0, phase, EasingFunction::Smooth)?);
            (AnimatableProperty::Opacity, seq)
        }
        TransitionKind::Slide | TransitionKind::Morph => {
            let rest = geometry(target)?;
            let shifted = if kind == TransitionKind::Slide {
                rest.translated(SLIDE_DISTANCE, 0.0)
            } else {
                rest.adjusted(-MORPH_GROWTH, -MORPH_GROWTH, MORPH_GROWTH, MORPH_GROWTH)
            };
            let seq = Sequence::new(ctx)
                .add(tween(ctx, target, AnimatableProperty::Geometry, rest, shifted, phase, EasingFunction::Smooth)?)
                .add(tween(ctx, target, AnimatableProperty::Geometry, shifted, rest, phase, EasingFunction::Smooth)?);
            (AnimatableProperty::Geometry, seq)
        }
    };
    Ok(Some(claim(ctx, target, property, seq.into())))
}

/// Participant that plays [`component_transition`] on a single target.
#[derive(Debug, Clone)]
pub struct ThemedTarget {
    target: TargetRef,
}

impl ThemedTarget {
    pub fn new(target: TargetRef) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &TargetRef {
        &self.target
    }
}

impl ThemeParticipant for ThemedTarget {
    fn run_theme_transition(&self, ctx: &MotionContext, kind: TransitionKind, duration_ms: u64) -> Option<Animation> {
        match component_transition(ctx, &self.target, kind, duration_ms) {
            Ok(animation) => animation,
            Err(err) => {
                debug!(error = %err, "skipping theme transition for target");
                None
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.target.is_alive()
    }
}

#[derive(Default)]
struct CoordinatedRun {
    id: Option<AnimationId>,
    state: AnimationState,
    timers: Vec<TimerHandle>,
    animations: Vec<Animation>,
    pending: usize,
}

struct CoordinatorInner {
    ctx: MotionContext,
    components: RefCell<Vec<Weak<dyn ThemeParticipant>>>,
    pre: RefCell<Vec<TransitionCallback>>,
    post: RefCell<Vec<TransitionCallback>>,
    run: RefCell<CoordinatedRun>,
}

/// Registry of theme participants and driver of coordinated transitions.
#[derive(Clone)]
pub struct ThemeTransitionCoordinator {
    inner: Rc<CoordinatorInner>,
}

fn participant_key(component: &Weak<dyn ThemeParticipant>) -> usize {
    component.as_ptr() as *const () as usize
}

impl ThemeTransitionCoordinator {
    pub fn new(ctx: &MotionContext) -> Self {
        Self {
            inner: Rc::new(CoordinatorInner {
                ctx: ctx.clone(),
                components: RefCell::new(Vec::new()),
                pre: RefCell::new(Vec::new()),
                post: RefCell::new(Vec::new()),
                run: RefCell::new(CoordinatedRun::default()),
            }),
        }
    }

    /// Register a component. Registering twice is a no-op; returns false in
    /// that case.
    pub fn add_component<P: ThemeParticipant + 'static>(&self, component: &Rc<P>) -> bool {
        let weak: Weak<P> = Rc::downgrade(component);
        let weak: Weak<dyn ThemeParticipant> = weak;
        self.insert(weak)
    }

    /// Register an already type-erased component.
    pub fn add_dyn_component(&self, component: &Rc<dyn ThemeParticipant>) -> bool {
        self.insert(Rc::downgrade(component))
    }

    /// Unregister a component. Returns false if it was not registered.
    pub fn remove_component<P: ThemeParticipant + 'static>(&self, component: &Rc<P>) -> bool {
        let weak: Weak<P> = Rc::downgrade(component);
        let weak: Weak<dyn ThemeParticipant> = weak;
        let key = participant_key(&weak);
        let mut components = self.inner.components.borrow_mut();
        let before = components.len();
        components.retain(|c| participant_key(c) != key);
        components.len() != before
    }

    /// Number of registered components still alive.
    pub fn component_count(&self) -> usize {
        self.inner
            .components
            .borrow()
            .iter()
            .filter(|c| c.upgrade().is_some_and(|c| c.is_alive()))
            .count()
    }

    pub fn add_pre_transition_callback(&self, f: impl FnMut() -> anyhow::Result<()> + 'static) {
        self.inner.pre.borrow_mut().push(Box::new(f));
    }

    pub fn add_post_transition_callback(&self, f: impl FnMut() -> anyhow::Result<()> + 'static) {
        self.inner.post.borrow_mut().push(Box::new(f));
    }

    /// Returns true while a coordinated transition is in flight.
    pub fn is_transitioning(&self) -> bool {
        self.inner.run.borrow().state == AnimationState::Running
    }

    /// Start a transition on every registered component, staggered by
    /// registration order. Any transition still in flight is stopped first.
    ///
    /// With animations disabled every component is launched immediately.
    pub fn start_coordinated_transition(
        &self,
        kind: TransitionKind,
        duration_ms: u64,
        stagger_delay_ms: u64,
    ) -> AnimationId {
        let ctx = &self.inner.ctx;
        self.stop_transition();
        self.prune();
        self.run_callbacks(&self.inner.pre, "pre-transition");

        let components: Vec<Weak<dyn ThemeParticipant>> = self.inner.components.borrow().clone();
        let id = AnimationId::new();
        *self.inner.run.borrow_mut() = CoordinatedRun {
            id: Some(id),
            state: AnimationState::Running,
            timers: Vec::new(),
            animations: Vec::new(),
            pending: components.len(),
        };
        ctx.push_event(MotionEvent::Started {
            animation_id: id,
            kind: AnimationKind::ThemeTransition,
        });
        debug!(transition = %id, %kind, components = components.len(), duration_ms, stagger_delay_ms, "starting coordinated theme transition");

        if components.is_empty() {
            self.finish(id);
            return id;
        }

        let stagger = if ctx.animations_enabled() { stagger_delay_ms } else { 0 };
        for (i, component) in components.into_iter().enumerate() {
            if !self.is_current(id) {
                break;
            }
            let delay = i as u64 * stagger;
            if delay == 0 {
                self.launch(id, &component, kind, duration_ms);
                continue;
            }

            let weak = Rc::downgrade(&self.inner);
            let handle = ctx.scheduler().schedule_once(
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        ThemeTransitionCoordinator { inner }.launch(id, &component, kind, duration_ms);
                    }
                }),
                delay,
            );
            let mut run = self.inner.run.borrow_mut();
            if run.id == Some(id) && run.state == AnimationState::Running {
                run.timers.push(handle);
            }
        }
        id
    }

    /// Start a transition using the configured kind, duration and stagger.
    pub fn start_default_transition(&self) -> AnimationId {
        let config = self.inner.ctx.config();
        let kind = config.theme_transition.parse().unwrap_or_else(|err: MotionError| {
            warn!(error = %err, "falling back to fade transition");
            TransitionKind::Fade
        });
        self.start_coordinated_transition(kind, config.theme_transition_duration_ms, config.theme_stagger_delay_ms)
    }

    /// Run the configured transition on every change notification from
    /// `store`.
    pub fn attach(&self, store: &dyn ThemeStore) {
        let weak = Rc::downgrade(&self.inner);
        store.subscribe(Box::new(move |change| {
            if let Some(inner) = weak.upgrade() {
                debug!(mode = ?change.mode, "theme changed");
                ThemeTransitionCoordinator { inner }.start_default_transition();
            }
        }));
    }

    /// Stop the in-flight transition: pending launches are cancelled and
    /// running component transitions stopped. Post callbacks do not run.
    pub fn stop_transition(&self) -> bool {
        let (id, timers, animations) = {
            let mut run = self.inner.run.borrow_mut();
            if run.state != AnimationState::Running {
                return false;
            }
            run.state = AnimationState::Cancelled;
            (run.id, std::mem::take(&mut run.timers), std::mem::take(&mut run.animations))
        };

        let scheduler = self.inner.ctx.scheduler();
        for timer in timers {
            scheduler.cancel(timer);
        }
        for animation in animations {
            animation.stop();
        }
        if let Some(id) = id {
            self.inner.ctx.push_event(MotionEvent::Cancelled {
                animation_id: id,
                kind: AnimationKind::ThemeTransition,
            });
        }
        true
    }

    fn insert(&self, component: Weak<dyn ThemeParticipant>) -> bool {
        let key = participant_key(&component);
        let mut components = self.inner.components.borrow_mut();
        components.retain(|c| c.strong_count() > 0);
        if components.iter().any(|c| participant_key(c) == key) {
            return false;
        }
        components.push(component);
        true
    }

    fn prune(&self) {
        self.inner
            .components
            .borrow_mut()
            .retain(|c| c.upgrade().is_some_and(|c| c.is_alive()));
    }

    fn is_current(&self, id: AnimationId) -> bool {
        let run = self.inner.run.borrow();
        run.id == Some(id) && run.state == AnimationState::Running
    }

    fn launch(&self, id: AnimationId, component: &Weak<dyn ThemeParticipant>, kind: TransitionKind, duration_ms: u64) {
        if !self.is_current(id) {
            return;
        }
        let Some(participant) = component.upgrade().filter(|c| c.is_alive()) else {
            debug!(transition = %id, "component dropped before its transition");
            self.component_done(id);
            return;
        };

        let animation = participant.run_theme_transition(&self.inner.ctx, kind, duration_ms);
        drop(participant);

        match animation {
            Some(animation) if animation.is_running() => {
                let weak = Rc::downgrade(&self.inner);
                animation.connect_settled(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        ThemeTransitionCoordinator { inner }.component_done(id);
                    }
                });
                if self.is_current(id) {
                    self.inner.run.borrow_mut().animations.push(animation);
                }
            }
            _ => self.component_done(id),
        }
    }

    fn component_done(&self, id: AnimationId) {
        let all_done = {
            let mut run = self.inner.run.borrow_mut();
            if run.id != Some(id) || run.state != AnimationState::Running {
                return;
            }
            run.pending = run.pending.saturating_sub(1);
            run.pending == 0
        };
        if all_done {
            self.finish(id);
        }
    }

    fn finish(&self, id: AnimationId) {
        {
            let mut run = self.inner.run.borrow_mut();
            run.state = AnimationState::Finished;
            run.timers.clear();
            run.animations.clear();
        }
        debug!(transition = %id, "coordinated theme transition finished");
        self.inner.ctx.push_event(MotionEvent::Finished {
            animation_id: id,
            kind: AnimationKind::ThemeTransition,
        });
        self.run_callbacks(&self.inner.post, "post-transition");
    }

    // Runs with the list taken out so a callback may register more callbacks.
    fn run_callbacks(&self, list: &RefCell<Vec<TransitionCallback>>, phase: &str) {
        let mut callbacks = std::mem::take(&mut *list.borrow_mut());
        for callback in callbacks.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(phase, error = %err, "theme transition callback failed"),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(phase, %message, "theme transition callback panicked");
                }
            }
        }
        let mut slot = list.borrow_mut();
        let added = std::mem::replace(&mut *slot, callbacks);
        slot.extend(added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::target::PropertyMap;
    use crate::theme::{PaletteTheme, ThemeMode};
    use crate::types::Rect;
    use rune_config::MotionConfig;
    use std::cell::{Cell, RefCell};

    struct Recorder {
        scheduler: Rc<ManualScheduler>,
        widget: Rc<PropertyMap>,
        started_at: RefCell<Vec<u64>>,
    }

    impl ThemeParticipant for Recorder {
        fn run_theme_transition(&self, ctx: &MotionContext, kind: TransitionKind, duration_ms: u64) -> Option<Animation> {
            self.started_at.borrow_mut().push(self.scheduler.now_ms());
            component_transition(ctx, &TargetRef::new(&self.widget), kind, duration_ms).ok().flatten()
        }
    }

    fn setup() -> (Rc<ManualScheduler>, MotionContext, ThemeTransitionCoordinator) {
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
        let coordinator = ThemeTransitionCoordinator::new(&ctx);
        (scheduler, ctx, coordinator)
    }

    fn widget() -> Rc<PropertyMap> {
        PropertyMap::new()
            .with(AnimatableProperty::Opacity, 1.0)
            .with(AnimatableProperty::Geometry, Rect::new(0.0, 0.0, 80.0, 30.0))
            .shared()
    }

    fn recorders(scheduler: &Rc<ManualScheduler>, n: usize) -> Vec<Rc<Recorder>> {
        (0..n)
            .map(|_| {
                Rc::new(Recorder {
                    scheduler: scheduler.clone(),
                    widget: widget(),
                    started_at: RefCell::new(Vec::new()),
                })
            })
            .collect()
    }

    #[test]
    fn test_staggered_launch_times() {
        let (scheduler, _ctx, coordinator) = setup();
        let components = recorders(&scheduler, 5);
        for c in &components {
            coordinator.add_component(c);
        }

        coordinator.start_coordinated_transition(TransitionKind::Fade, 200, 50);
        scheduler.advance(199);
        assert!(components[4].started_at.borrow().is_empty());
        scheduler.advance(1);

        let starts: Vec<u64> = components.iter().map(|c| c.started_at.borrow()[0]).collect();
        assert_eq!(starts, vec![0, 50, 100, 150, 200]);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let (scheduler, _ctx, coordinator) = setup();
        let c = recorders(&scheduler, 1).remove(0);
        assert!(coordinator.add_component(&c));
        assert!(!coordinator.add_component(&c));
        assert_eq!(coordinator.component_count(), 1);

        assert!(coordinator.remove_component(&c));
        assert!(!coordinator.remove_component(&c));
        assert_eq!(coordinator.component_count(), 0);
    }

    #[test]
    fn test_callbacks_and_completion() {
        let (scheduler, ctx, coordinator) = setup();
        let components = recorders(&scheduler, 2);
        for c in &components {
            coordinator.add_component(c);
        }

        let pre = Rc::new(Cell::new(0));
        let post = Rc::new(Cell::new(0));
        let p = pre.clone();
        coordinator.add_pre_transition_callback(move || {
            p.set(p.get() + 1);
            Ok(())
        });
        coordinator.add_pre_transition_callback(|| anyhow::bail!("cache already clear"));
        let q = post.clone();
        coordinator.add_post_transition_callback(move || {
            q.set(q.get() + 1);
            Ok(())
        });

        let id = coordinator.start_coordinated_transition(TransitionKind::Fade, 100, 50);
        assert_eq!(pre.get(), 1);
        assert!(coordinator.is_transitioning());

        scheduler.advance(500);
        assert!(!coordinator.is_transitioning());
        assert_eq!(post.get(), 1);
        let events = ctx.drain_events();
        assert!(events
            .iter()
            .any(|e| e.animation_id() == id && e.is_finished() && e.kind() == AnimationKind::ThemeTransition));
        for c in &components {
            assert_eq!(c.widget.get_f64(AnimatableProperty::Opacity), Some(1.0));
        }
    }

    #[test]
    fn test_new_transition_stops_previous() {
        let (scheduler, _ctx, coordinator) = setup();
        let components = recorders(&scheduler, 3);
        for c in &components {
            coordinator.add_component(c);
        }

        coordinator.start_coordinated_transition(TransitionKind::Fade, 200, 50);
        scheduler.advance(60);
        coordinator.start_coordinated_transition(TransitionKind::Slide, 200, 50);
        scheduler.advance(1000);

        // The third component's first launch was cancelled before it ran.
        assert_eq!(components[2].started_at.borrow().len(), 1);
        assert_eq!(components[0].started_at.borrow().len(), 2);
        assert!(!coordinator.is_transitioning());
        assert_eq!(
            components[0].widget.get(AnimatableProperty::Geometry).and_then(|v| v.as_rect()),
            Some(Rect::new(0.0, 0.0, 80.0, 30.0))
        );
    }

    #[test]
    fn test_dropped_component_is_skipped() {
        let (scheduler, _ctx, coordinator) = setup();
        let mut components = recorders(&scheduler, 3);
        for c in &components {
            coordinator.add_component(c);
        }

        coordinator.start_coordinated_transition(TransitionKind::Fade, 100, 50);
        let late = components.remove(2);
        drop(late);
        scheduler.advance(500);
        assert!(!coordinator.is_transitioning());
        assert_eq!(coordinator.component_count(), 2);
    }

    #[test]
    fn test_disabled_animations_skip_stagger() {
        let (scheduler, ctx, coordinator) = setup();
        ctx.set_animations_enabled(false);
        let components = recorders(&scheduler, 3);
        for c in &components {
            coordinator.add_component(c);
        }

        coordinator.start_coordinated_transition(TransitionKind::Morph, 200, 50);
        assert!(!coordinator.is_transitioning());
        for c in &components {
            assert_eq!(*c.started_at.borrow(), vec![0]);
            assert_eq!(
                c.widget.get(AnimatableProperty::Geometry).and_then(|v| v.as_rect()),
                Some(Rect::new(0.0, 0.0, 80.0, 30.0))
            );
        }
    }

    #[test]
    fn test_attach_follows_theme_changes() {
        let (scheduler, _ctx, coordinator) = setup();
        let theme = PaletteTheme::new(ThemeMode::Light);
        coordinator.attach(&theme);
        let components = recorders(&scheduler, 2);
        for c in &components {
            coordinator.add_component(c);
        }

        theme.set_mode(ThemeMode::Dark);
        assert!(coordinator.is_transitioning());
        scheduler.advance(50);
        assert_eq!(*components[1].started_at.borrow(), vec![50]);
    }

    #[test]
    fn test_component_transition_shapes() {
        let (scheduler, ctx, _coordinator) = setup();
        let w = widget();
        let target = TargetRef::new(&w);

        assert!(component_transition(&ctx, &target, TransitionKind::Instant, 200).unwrap().is_none());

        component_transition(&ctx, &target, TransitionKind::Slide, 200).unwrap();
        scheduler.advance(112);
        assert_eq!(
            w.get(AnimatableProperty::Geometry).and_then(|v| v.as_rect()),
            Some(Rect::new(10.0, 0.0, 80.0, 30.0))
        );
        scheduler.advance(200);
        assert_eq!(
            w.get(AnimatableProperty::Geometry).and_then(|v| v.as_rect()),
            Some(Rect::new(0.0, 0.0, 80.0, 30.0))
        );
    }

    #[test]
    fn test_interrupted_fade_recovers_full_opacity() {
        let (scheduler, ctx, _coordinator) = setup();
        let w = widget();
        let target = TargetRef::new(&w);

        component_transition(&ctx, &target, TransitionKind::Fade, 200).unwrap();
        scheduler.advance(64);
        assert!(w.get_f64(AnimatableProperty::Opacity).unwrap() < 1.0);

        component_transition(&ctx, &target, TransitionKind::Fade, 200).unwrap();
        scheduler.advance(2000);
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(1.0));
    }

    #[test]
    fn test_second_theme_switch_mid_dip_ends_opaque() {
        let (scheduler, _ctx, coordinator) = setup();
        let components = recorders(&scheduler, 3);
        for c in &components {
            coordinator.add_component(c);
        }

        coordinator.start_coordinated_transition(TransitionKind::Fade, 200, 50);
        scheduler.advance(80);
        coordinator.start_coordinated_transition(TransitionKind::Fade, 200, 50);
        scheduler.advance(1000);

        assert!(!coordinator.is_transitioning());
        for c in &components {
            assert_eq!(c.widget.get_f64(AnimatableProperty::Opacity), Some(1.0));
        }
    }

    #[test]
    fn test_transition_kind_parsing() {
        assert_eq!("Fade".parse::<TransitionKind>().unwrap(), TransitionKind::Fade);
        assert_eq!("morph".parse::<TransitionKind>().unwrap(), TransitionKind::Morph);
        assert!("wipe".parse::<TransitionKind>().is_err());
    }
}
