//! Named visual states for a single widget.
//!
//! A [`StateTransitionMachine`] holds a set of named property snapshots
//! ("normal", "hovered", "pressed", ...) and animates the widget between them.
//! Only properties whose value actually changes get an animator, and every
//! animator starts from the live value, so interrupting a transition midway
//! continues smoothly from wherever the widget is.

use std::collections::HashMap;

use tracing::debug;

use crate::animator::{Animator, check_type};
use crate::context::MotionContext;
use crate::durations::MEDIUM;
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::group::{Animation, Parallel};
use crate::target::TargetRef;
use crate::types::{AnimatableProperty, AnimatableValue};

/// Name of the state every machine starts in.
pub const INITIAL_STATE: &str = "normal";

/// A named set of property values with the timing used to reach them.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedState {
    pub name: String,
    pub properties: Vec<(AnimatableProperty, AnimatableValue)>,
    pub duration_ms: u64,
    pub easing: EasingFunction,
}

/// Animates one widget between caller-defined states.
pub struct StateTransitionMachine {
    ctx: MotionContext,
    target: TargetRef,
    states: HashMap<String, NamedState>,
    current: String,
    // Last value each property was sent towards.
    applied: HashMap<AnimatableProperty, AnimatableValue>,
    active: Option<Animation>,
}

impl StateTransitionMachine {
    pub fn new(ctx: &MotionContext, target: &TargetRef) -> Self {
        Self {
            ctx: ctx.clone(),
            target: target.clone(),
            states: HashMap::new(),
            current: INITIAL_STATE.to_string(),
            applied: HashMap::new(),
            active: None,
        }
    }

    /// Register (or replace) a state.
    ///
    /// Property paths are resolved and type-checked against the live target
    /// here, so errors surface once at definition time.
    pub fn add_state<'a, I, V>(
        &mut self,
        name: &str,
        properties: I,
        duration_ms: u64,
        easing: EasingFunction,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<AnimatableValue>,
    {
        let widget = self.target.upgrade().ok_or(MotionError::TargetDestroyed)?;

        let mut resolved = Vec::new();
        for (path, value) in properties {
            let property = path.parse::<AnimatableProperty>()?;
            let value = value.into();
            if widget.property(property).is_none() {
                return Err(MotionError::PropertyNotFound { property });
            }
            check_type(property, &value)?;
            resolved.push((property, value));
        }

        self.states.insert(
            name.to_string(),
            NamedState {
                name: name.to_string(),
                properties: resolved,
                duration_ms,
                easing,
            },
        );
        Ok(())
    }

    /// Register a state with the medium duration and smooth easing.
    pub fn add_default_state<'a, I, V>(&mut self, name: &str, properties: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<AnimatableValue>,
    {
        self.add_state(name, properties, MEDIUM, EasingFunction::Smooth)
    }

    /// Animate to `name`.
    ///
    /// Requesting the current state does nothing. The in-flight transition,
    /// if any, is stopped first and the new one starts from the live values.
    /// The current state changes as soon as the transition starts.
    pub fn transition_to(&mut self, name: &str) -> Result<()> {
        if name == self.current {
            debug!(state = name, "already in requested state");
            return Ok(());
        }
        let state = self
            .states
            .get(name)
            .cloned()
            .ok_or_else(|| MotionError::UnknownState(name.to_string()))?;

        if let Some(previous) = self.active.take() {
            previous.stop();
        }

        let mut group = Parallel::new(&self.ctx);
        for (property, value) in &state.properties {
            let last = self
                .applied
                .get(property)
                .copied()
                .or_else(|| self.target.get(*property));
            if last == Some(*value) {
                continue;
            }

            let animator = Animator::for_property(&self.ctx, &self.target, *property, state.duration_ms, state.easing)
                .and_then(|a| a.with_end_value(*value));
            match animator {
                Ok(animator) => group = group.add(animator),
                Err(MotionError::TargetDestroyed) => {
                    debug!(state = name, "target destroyed during transition");
                    break;
                }
                Err(err) => debug!(state = name, %property, error = %err, "skipping property"),
            }
        }

        if !group.is_empty() {
            let animation = Animation::from(group).started();
            if animation.is_running() {
                self.active = Some(animation);
            }
        }

        self.current = state.name.clone();
        for (property, value) in state.properties {
            self.applied.insert(property, value);
        }
        Ok(())
    }

    pub fn current_state(&self) -> &str {
        &self.current
    }

    pub fn state(&self, name: &str) -> Option<&NamedState> {
        self.states.get(name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// The running transition, if one is in flight.
    pub fn active_transition(&self) -> Option<&Animation> {
        self.active.as_ref().filter(|a| a.is_running())
    }

    /// Forget the last applied values so the next transition compares
    /// against the live widget. Call after changing the widget directly.
    pub fn invalidate_cache(&mut self) {
        self.applied.clear();
    }

    pub fn target(&self) -> &TargetRef {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::durations::FAST;
    use crate::scheduler::ManualScheduler;
    use crate::target::PropertyMap;
    use crate::types::AnimationState;
    use rune_config::MotionConfig;
    use std::rc::Rc;

    fn setup() -> (Rc<ManualScheduler>, MotionContext) {
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
        (scheduler, ctx)
    }

    fn chip() -> Rc<PropertyMap> {
        PropertyMap::new()
            .with(AnimatableProperty::Height, 32.0)
            .with(AnimatableProperty::Opacity, 1.0)
            .with(AnimatableProperty::BackgroundColor, Color::WHITE)
            .shared()
    }

    fn machine(ctx: &MotionContext, w: &Rc<PropertyMap>) -> StateTransitionMachine {
        let mut m = StateTransitionMachine::new(ctx, &TargetRef::new(w));
        m.add_state("normal", [("height", 32.0)], FAST, EasingFunction::Smooth).unwrap();
        m.add_state("hovered", [("height", 34.0)], FAST, EasingFunction::Smooth).unwrap();
        m
    }

    #[test]
    fn test_initial_state() {
        let (_s, ctx) = setup();
        let w = chip();
        let m = machine(&ctx, &w);
        assert_eq!(m.current_state(), INITIAL_STATE);
        assert!(m.has_state("hovered"));
    }

    #[test]
    fn test_transition_reaches_state() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let mut m = machine(&ctx, &w);

        m.transition_to("hovered").unwrap();
        assert_eq!(m.current_state(), "hovered");
        assert!(m.active_transition().is_some());

        scheduler.advance(200);
        assert_eq!(w.get_f64(AnimatableProperty::Height), Some(34.0));
        assert!(m.active_transition().is_none());
    }

    #[test]
    fn test_transition_to_current_state_writes_nothing() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let mut m = machine(&ctx, &w);

        m.transition_to("normal").unwrap();
        scheduler.advance(200);
        assert_eq!(w.write_count(), 0);
        assert_eq!(ctx.active_writer_count(), 0);
    }

    #[test]
    fn test_interrupted_transition_settles_on_latest() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let target = TargetRef::new(&w);
        let mut m = machine(&ctx, &w);

        m.transition_to("hovered").unwrap();
        let hover = ctx.active_writer(&target, AnimatableProperty::Height).unwrap();

        m.transition_to("normal").unwrap();
        assert_eq!(hover.state(), AnimationState::Cancelled);
        assert_eq!(ctx.active_writer_count(), 1);
        assert_eq!(m.current_state(), "normal");

        scheduler.advance(300);
        assert_eq!(w.get_f64(AnimatableProperty::Height), Some(32.0));
    }

    #[test]
    fn test_unchanged_properties_are_skipped() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let mut m = StateTransitionMachine::new(&ctx, &TargetRef::new(&w));
        m.add_default_state("dimmed", [("height", 32.0), ("opacity", 0.5)]).unwrap();

        m.transition_to("dimmed").unwrap();
        assert_eq!(ctx.active_writer_count(), 1);
        scheduler.advance(300);
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(0.5));
        assert_eq!(w.get_f64(AnimatableProperty::Height), Some(32.0));
    }

    #[test]
    fn test_invalidate_cache_uses_live_values() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let target = TargetRef::new(&w);
        let mut m = machine(&ctx, &w);
        m.add_state("tall", [("height", 34.0)], FAST, EasingFunction::Smooth).unwrap();

        m.transition_to("hovered").unwrap();
        scheduler.advance(200);

        // Changed behind the machine's back.
        target.set(AnimatableProperty::Height, AnimatableValue::from(20.0));

        // Cached 34 matches, so nothing runs.
        m.transition_to("tall").unwrap();
        assert_eq!(ctx.active_writer_count(), 0);

        m.invalidate_cache();
        m.transition_to("hovered").unwrap();
        assert_eq!(ctx.active_writer_count(), 1);
        scheduler.advance(200);
        assert_eq!(w.get_f64(AnimatableProperty::Height), Some(34.0));
    }

    #[test]
    fn test_add_state_validation() {
        let (_s, ctx) = setup();
        let w = chip();
        let mut m = StateTransitionMachine::new(&ctx, &TargetRef::new(&w));

        assert!(matches!(
            m.add_default_state("bad", [("wobble", 1.0)]),
            Err(MotionError::UnknownProperty(_))
        ));
        assert!(matches!(
            m.add_default_state("bad", [("width", 1.0)]),
            Err(MotionError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            m.add_default_state("bad", [("background-color", 1.0)]),
            Err(MotionError::ValueTypeMismatch { .. })
        ));
        assert!(!m.has_state("bad"));
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let (_s, ctx) = setup();
        let w = chip();
        let mut m = machine(&ctx, &w);
        assert_eq!(
            m.transition_to("pressed"),
            Err(MotionError::UnknownState("pressed".into()))
        );
        assert_eq!(m.current_state(), INITIAL_STATE);
    }

    #[test]
    fn test_destroyed_target_is_silent() {
        let (scheduler, ctx) = setup();
        let w = chip();
        let mut m = machine(&ctx, &w);
        drop(w);

        assert!(m.transition_to("hovered").is_ok());
        scheduler.advance(200);
        assert_eq!(ctx.active_writer_count(), 0);
    }
}
