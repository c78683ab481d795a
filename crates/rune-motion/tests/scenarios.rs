use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;
use rune_config::{MotionConfig, RuneConfig};
use rune_motion::prelude::*;
use rune_motion::{
    AnimationState, MotionEvent, PaletteTheme, Rect, RevealKind, ThemeBindings, ThemeMode, ThemeParticipant,
    ThemeStore, ThemeTransitionCoordinator, ThemedTarget, TransitionKind, reveal,
};

fn engine() -> (Rc<ManualScheduler>, MotionContext) {
    let scheduler = Rc::new(ManualScheduler::new());
    let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
    (scheduler, ctx)
}

fn card() -> Rc<PropertyMap> {
    PropertyMap::new()
        .with(AnimatableProperty::Opacity, 1.0)
        .with(AnimatableProperty::Height, 32.0)
        .with(AnimatableProperty::Geometry, Rect::new(0.0, 0.0, 120.0, 32.0))
        .with(AnimatableProperty::BackgroundColor, Color::WHITE)
        .shared()
}

#[test]
fn second_writer_replaces_first() -> Result<()> {
    let (scheduler, ctx) = engine();
    let widget = card();
    let target = TargetRef::new(&widget);

    let a = Animator::create(&ctx, &target, "opacity", 250, EasingFunction::Linear)?.with_end_value(0.0)?;
    let b = Animator::create(&ctx, &target, "opacity", 150, EasingFunction::Linear)?.with_end_value(0.5)?;
    a.start();
    scheduler.advance(48);
    b.start();

    assert_eq!(a.state(), AnimationState::Cancelled);
    assert_eq!(ctx.active_writer(&target, AnimatableProperty::Opacity).map(|w| w.id()), Some(b.id()));
    assert_eq!(ctx.active_writer_count(), 1);

    scheduler.advance(400);
    assert_eq!(widget.get_f64(AnimatableProperty::Opacity), Some(0.5));
    Ok(())
}

#[test]
fn sequence_finishes_within_a_tick_of_its_last_step() -> Result<()> {
    let (scheduler, ctx) = engine();
    let widget = card();
    let target = TargetRef::new(&widget);

    let finished_at = Rc::new(Cell::new(None));
    let last_step_done = Rc::new(Cell::new(None));

    let grow = Animator::create(&ctx, &target, "height", 100, EasingFunction::Smooth)?.with_end_value(40.0)?;
    let shrink = Animator::create(&ctx, &target, "height", 150, EasingFunction::Smooth)?
        .with_start_value(40.0)?
        .with_end_value(32.0)?;
    {
        let clock = scheduler.clone();
        let done = last_step_done.clone();
        shrink.connect_finished(move || done.set(Some(clock.now_ms())));
    }

    let seq = Sequence::new(&ctx).add(grow).add(shrink);
    {
        let clock = scheduler.clone();
        let at = finished_at.clone();
        seq.connect_finished(move || at.set(Some(clock.now_ms())));
    }
    seq.start();

    scheduler.advance(250);
    assert_eq!(finished_at.get(), None, "finished before the nominal duration");

    scheduler.advance(200);
    let (finished, last) = (finished_at.get().unwrap(), last_step_done.get().unwrap());
    assert!(finished >= 250);
    assert!(finished - last <= ctx.frame_interval_ms());
    assert_eq!(widget.get_f64(AnimatableProperty::Height), Some(32.0));
    Ok(())
}

#[test]
fn staggered_reveal_spaces_item_starts() {
    let (scheduler, ctx) = engine();
    let cards: Vec<_> = (0..5).map(|_| card()).collect();
    let targets: Vec<_> = cards.iter().map(TargetRef::new).collect();
    let delay = ctx.config().reveal_stagger_delay_ms;

    let group = reveal::staggered_reveal(&ctx, &targets, RevealKind::fade_in(), delay);

    let mut starts = vec![None; targets.len()];
    for _ in 0..=600 {
        for (i, target) in targets.iter().enumerate() {
            if starts[i].is_none() && ctx.is_animating(target, AnimatableProperty::Opacity) {
                starts[i] = Some(scheduler.now_ms());
            }
        }
        scheduler.advance(1);
    }

    let first = starts[0].unwrap();
    for (i, start) in starts.iter().enumerate() {
        let start = start.unwrap();
        assert!(start >= first + i as u64 * delay, "item {i} started at {start}");
    }
    assert!(scheduler.run_until_idle(16, 2000));
    assert_eq!(group.state(), AnimationState::Finished);
}

#[test]
fn transition_to_current_state_is_a_no_op() -> Result<()> {
    let (scheduler, ctx) = engine();
    let widget = card();
    let mut machine = StateTransitionMachine::new(&ctx, &TargetRef::new(&widget));
    machine.add_default_state("normal", [("height", 32.0)])?;
    machine.add_default_state("hovered", [("height", 34.0)])?;

    machine.transition_to("normal")?;
    scheduler.advance(500);
    assert_eq!(widget.write_count(), 0);
    assert!(ctx.drain_events().is_empty());

    machine.transition_to("hovered")?;
    scheduler.advance(500);
    let writes = widget.write_count();
    machine.transition_to("hovered")?;
    scheduler.advance(500);
    assert_eq!(widget.write_count(), writes);
    Ok(())
}

#[test]
fn destroying_target_mid_animation_is_safe() -> Result<()> {
    let (scheduler, ctx) = engine();
    let widget = card();
    let target = TargetRef::new(&widget);

    let fade = Animator::create(&ctx, &target, "opacity", 300, EasingFunction::Smooth)?.with_end_value(0.0)?;
    fade.start();
    scheduler.advance(64);
    drop(widget);

    scheduler.advance(64);
    scheduler.advance(500);
    assert_eq!(fade.state(), AnimationState::Cancelled);
    assert_eq!(scheduler.active_timers(), 0);
    assert!(ctx
        .drain_events()
        .iter()
        .any(|e| matches!(e, MotionEvent::DeadTarget { animation_id, .. } if *animation_id == fade.id())));
    Ok(())
}

#[test]
fn hover_then_normal_settles_on_normal_height() -> Result<()> {
    let (scheduler, ctx) = engine();
    let widget = card();
    let target = TargetRef::new(&widget);
    let mut machine = StateTransitionMachine::new(&ctx, &target);
    machine.add_default_state("normal", [("height", 32.0)])?;
    machine.add_default_state("hovered", [("height", 34.0)])?;

    machine.transition_to("hovered")?;
    let hovered = ctx
        .active_writer(&target, AnimatableProperty::Height)
        .expect("hover animator running");

    machine.transition_to("normal")?;
    assert_eq!(hovered.state(), AnimationState::Cancelled);
    assert_eq!(ctx.active_writer_count(), 1);

    scheduler.advance(500);
    assert_eq!(widget.get_f64(AnimatableProperty::Height), Some(32.0));
    assert_eq!(machine.current_state(), "normal");
    Ok(())
}

struct StartRecorder {
    clock: Rc<ManualScheduler>,
    inner: ThemedTarget,
    started_at: RefCell<Option<u64>>,
}

impl ThemeParticipant for StartRecorder {
    fn run_theme_transition(&self, ctx: &MotionContext, kind: TransitionKind, duration_ms: u64) -> Option<Animation> {
        self.started_at.borrow_mut().get_or_insert(self.clock.now_ms());
        self.inner.run_theme_transition(ctx, kind, duration_ms)
    }

    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }
}

#[test]
fn fifth_component_starts_after_four_staggers() {
    let (scheduler, ctx) = engine();
    let coordinator = ThemeTransitionCoordinator::new(&ctx);
    let widgets: Vec<_> = (0..5).map(|_| card()).collect();
    let participants: Vec<_> = widgets
        .iter()
        .map(|w| {
            Rc::new(StartRecorder {
                clock: scheduler.clone(),
                inner: ThemedTarget::new(TargetRef::new(w)),
                started_at: RefCell::new(None),
            })
        })
        .collect();
    for participant in &participants {
        coordinator.add_component(participant);
    }

    coordinator.start_coordinated_transition(TransitionKind::Fade, 200, 50);
    scheduler.advance(199);
    assert_eq!(*participants[4].started_at.borrow(), None);
    scheduler.advance(1);
    assert_eq!(*participants[4].started_at.borrow(), Some(200));

    scheduler.advance(500);
    assert!(!coordinator.is_transitioning());
    for w in &widgets {
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(1.0));
    }
}

#[test]
fn theme_switch_retargets_and_coordinates() -> Result<()> {
    let (scheduler, ctx) = engine();
    let theme = Rc::new(PaletteTheme::new(ThemeMode::Light));
    let bindings = ThemeBindings::attach(&ctx, theme.clone());
    let coordinator = ThemeTransitionCoordinator::new(&ctx);
    coordinator.attach(theme.as_ref());

    let widget = card();
    let target = TargetRef::new(&widget);
    let participant = Rc::new(ThemedTarget::new(target.clone()));
    coordinator.add_component(&participant);

    let background = bindings.create_theme_color_animation(&target, "background-color", "surface", 250)?;
    background.start();
    scheduler.advance(32);

    theme.set_mode(ThemeMode::Dark);
    assert!(coordinator.is_transitioning());

    scheduler.advance(600);
    assert_eq!(
        widget.get(AnimatableProperty::BackgroundColor).and_then(|v| v.as_color()),
        theme.color("surface")
    );
    assert_eq!(widget.get_f64(AnimatableProperty::Opacity), Some(1.0));
    assert_eq!(bindings.binding_count(), 0);
    Ok(())
}

#[test]
fn disabled_animations_from_config_jump_to_end() -> Result<()> {
    let config = RuneConfig::from_toml_str(
        r#"
        [motion]
        animations_enabled = false
        "#,
    )
    .map_err(anyhow::Error::msg)?;

    let scheduler = Rc::new(ManualScheduler::new());
    let ctx = MotionContext::from_config(scheduler.clone(), &config);
    let widget = card();

    let fade = Animator::create(&ctx, &TargetRef::new(&widget), "opacity", 300, EasingFunction::Smooth)?
        .with_end_value(0.2)?;
    fade.start();
    assert_eq!(fade.state(), AnimationState::Finished);
    assert_eq!(widget.get_f64(AnimatableProperty::Opacity), Some(0.2));

    let seq = Sequence::new(&ctx).add_pause(500).add_callback(|| {});
    seq.start();
    assert_eq!(seq.state(), AnimationState::Finished);
    assert_eq!(scheduler.active_timers(), 0);
    Ok(())
}
