//! Composite animations.
//!
//! - [`Sequence`] runs its steps one after another. A step is an animation,
//!   a pause or a callback; step N+1 starts only once step N has settled.
//! - [`Parallel`] starts all children together and settles once the last
//!   child settles.
//! - [`Animation`] is the uniform handle over animators and both composites,
//!   so groups nest freely.
//!
//! Composites are kept alive by the context while running. Child settle
//! listeners are registered once, when the child is added.
//!
//! # Usage
//!
//! ```ignore
//! let press = Sequence::new(&ctx)
//!     .add(shrink)
//!     .add_pause(20)
//!     .add_callback(|| tracing::debug!("pressed"))
//!     .add(restore);
//! press.start();
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::animator::Animator;
use crate::context::MotionContext;
use crate::events::{AnimationKind, MotionEvent, SettleListeners};
use crate::scheduler::TimerHandle;
use crate::types::{AnimationId, AnimationState, LoopCount};

/// Fallible callback step body.
pub type StepCallback = Box<dyn FnMut() -> anyhow::Result<()>>;

/// Any runnable animation.
#[derive(Clone)]
pub enum Animation {
    Animator(Animator),
    Sequence(Sequence),
    Parallel(Parallel),
}

impl Animation {
    pub fn id(&self) -> AnimationId {
        match self {
            Self::Animator(a) => a.id(),
            Self::Sequence(s) => s.id(),
            Self::Parallel(p) => p.id(),
        }
    }

    pub fn state(&self) -> AnimationState {
        match self {
            Self::Animator(a) => a.state(),
            Self::Sequence(s) => s.state(),
            Self::Parallel(p) => p.state(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Running
    }

    pub fn start(&self) {
        match self {
            Self::Animator(a) => a.start(),
            Self::Sequence(s) => s.start(),
            Self::Parallel(p) => p.start(),
        }
    }

    pub fn stop(&self) {
        match self {
            Self::Animator(a) => a.stop(),
            Self::Sequence(s) => s.stop(),
            Self::Parallel(p) => p.stop(),
        }
    }

    /// Call `f` with the terminal state every time this animation settles.
    pub fn connect_settled(&self, f: impl Fn(AnimationState) + 'static) {
        match self {
            Self::Animator(a) => a.connect_settled(f),
            Self::Sequence(s) => s.connect_settled(f),
            Self::Parallel(p) => p.connect_settled(f),
        }
    }

    /// Call `f` every time this animation finishes (not when cancelled).
    pub fn connect_finished(&self, f: impl Fn() + 'static) {
        self.connect_settled(move |state| {
            if state == AnimationState::Finished {
                f();
            }
        });
    }

    pub fn as_animator(&self) -> Option<&Animator> {
        match self {
            Self::Animator(a) => Some(a),
            _ => None,
        }
    }

    /// Start and return self, for factories that hand back running effects.
    pub(crate) fn started(self) -> Self {
        self.start();
        self
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Animator(a) => a.fmt(f),
            Self::Sequence(s) => write!(f, "Sequence({}, {:?})", s.id(), s.state()),
            Self::Parallel(p) => write!(f, "Parallel({}, {:?})", p.id(), p.state()),
        }
    }
}

impl From<Animator> for Animation {
    fn from(a: Animator) -> Self {
        Self::Animator(a)
    }
}

impl From<Sequence> for Animation {
    fn from(s: Sequence) -> Self {
        Self::Sequence(s)
    }
}

impl From<Parallel> for Animation {
    fn from(p: Parallel) -> Self {
        Self::Parallel(p)
    }
}

/// One step of a sequence.
pub enum Step {
    Animate(Animation),
    /// Wait this many milliseconds.
    Pause(u64),
    /// Run a closure exactly once per pass. Errors are logged and the
    /// sequence carries on.
    Callback(StepCallback),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Animate(a) => f.debug_tuple("Animate").field(a).finish(),
            Self::Pause(ms) => f.debug_tuple("Pause").field(ms).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

enum Slot {
    Animate(Animation),
    Pause(u64),
    // None while the callback is running.
    Callback(Option<StepCallback>),
}

struct SequenceRun {
    state: AnimationState,
    // Step currently being waited on.
    awaiting: Option<usize>,
    pause_timer: Option<TimerHandle>,
    loops: LoopCount,
    completed_loops: u32,
}

struct SequenceInner {
    id: AnimationId,
    ctx: MotionContext,
    steps: RefCell<Vec<Slot>>,
    run: RefCell<SequenceRun>,
    listeners: SettleListeners,
}

/// Strictly ordered composite.
#[derive(Clone)]
pub struct Sequence {
    inner: Rc<SequenceInner>,
}

impl Sequence {
    pub fn new(ctx: &MotionContext) -> Self {
        Self {
            inner: Rc::new(SequenceInner {
                id: AnimationId::new(),
                ctx: ctx.clone(),
                steps: RefCell::new(Vec::new()),
                run: RefCell::new(SequenceRun {
                    state: AnimationState::Idle,
                    awaiting: None,
                    pause_timer: None,
                    loops: LoopCount::default(),
                    completed_loops: 0,
                }),
                listeners: SettleListeners::default(),
            }),
        }
    }

    /// Append a step.
    pub fn add_step(self, step: Step) -> Self {
        match step {
            Step::Animate(animation) => self.add(animation),
            Step::Pause(ms) => self.add_pause(ms),
            Step::Callback(callback) => self.push(Slot::Callback(Some(callback))),
        }
    }

    /// Append an animation step.
    pub fn add(self, animation: impl Into<Animation>) -> Self {
        let animation = animation.into();
        let index = self.inner.steps.borrow().len();
        let weak = Rc::downgrade(&self.inner);
        animation.connect_settled(move |_| {
            if let Some(inner) = weak.upgrade() {
                Sequence { inner }.on_step_done(index);
            }
        });
        self.push(Slot::Animate(animation))
    }

    /// Append a pause.
    pub fn add_pause(self, ms: u64) -> Self {
        self.push(Slot::Pause(ms))
    }

    /// Append an infallible callback step.
    pub fn add_callback(self, mut f: impl FnMut() + 'static) -> Self {
        self.push(Slot::Callback(Some(Box::new(move || {
            f();
            Ok(())
        }))))
    }

    /// Append a fallible callback step.
    pub fn add_try_callback(self, f: impl FnMut() -> anyhow::Result<()> + 'static) -> Self {
        self.push(Slot::Callback(Some(Box::new(f))))
    }

    pub fn with_loop_count(self, loops: LoopCount) -> Self {
        self.inner.run.borrow_mut().loops = loops;
        self
    }

    pub fn id(&self) -> AnimationId {
        self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner.steps.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> AnimationState {
        self.inner.run.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Running
    }

    /// Index of the step currently running, if any.
    pub fn current_step(&self) -> Option<usize> {
        self.inner.run.borrow().awaiting
    }

    pub fn connect_settled(&self, f: impl Fn(AnimationState) + 'static) {
        self.inner.listeners.connect(Rc::new(f));
    }

    pub fn connect_finished(&self, f: impl Fn() + 'static) {
        self.connect_settled(move |state| {
            if state == AnimationState::Finished {
                f();
            }
        });
    }

    /// Start at step 0. Starting a running sequence does nothing.
    pub fn start(&self) {
        {
            let mut run = self.inner.run.borrow_mut();
            if run.state == AnimationState::Running {
                return;
            }
            run.state = AnimationState::Running;
            run.awaiting = None;
            run.completed_loops = 0;
        }
        self.inner.ctx.push_event(MotionEvent::Started {
            animation_id: self.inner.id,
            kind: AnimationKind::Sequence,
        });
        self.inner.ctx.retain(self.clone().into());
        self.run_from(0);
    }

    /// Stop the running step; no further steps execute.
    pub fn stop(&self) {
        let (awaiting, timer) = {
            let mut run = self.inner.run.borrow_mut();
            if run.state != AnimationState::Running {
                return;
            }
            run.state = AnimationState::Cancelled;
            (run.awaiting.take(), run.pause_timer.take())
        };

        if let Some(timer) = timer {
            self.inner.ctx.scheduler().cancel(timer);
        }
        if let Some(child) = awaiting.and_then(|i| self.animation_at(i)) {
            child.stop();
        }
        self.settle(AnimationState::Cancelled);
    }

    fn push(self, slot: Slot) -> Self {
        self.inner.steps.borrow_mut().push(slot);
        self
    }

    fn animation_at(&self, index: usize) -> Option<Animation> {
        match self.inner.steps.borrow().get(index) {
            Some(Slot::Animate(animation)) => Some(animation.clone()),
            _ => None,
        }
    }

    fn on_step_done(&self, index: usize) {
        {
            let mut run = self.inner.run.borrow_mut();
            if run.state != AnimationState::Running || run.awaiting != Some(index) {
                return;
            }
            run.awaiting = None;
            run.pause_timer = None;
        }
        self.run_from(index + 1);
    }

    /// Execute steps from `index` until one has to be waited on.
    fn run_from(&self, mut index: usize) {
        loop {
            if !self.is_running() {
                return;
            }

            let step = {
                let mut steps = self.inner.steps.borrow_mut();
                match steps.get_mut(index) {
                    None => None,
                    Some(Slot::Animate(animation)) => Some(Slot::Animate(animation.clone())),
                    Some(Slot::Pause(ms)) => Some(Slot::Pause(*ms)),
                    Some(Slot::Callback(callback)) => Some(Slot::Callback(callback.take())),
                }
            };

            match step {
                None => {
                    self.end_pass();
                    return;
                }
                Some(Slot::Callback(callback)) => {
                    if let Some(callback) = callback {
                        let callback = self.run_callback(index, callback);
                        if let Some(Slot::Callback(slot)) = self.inner.steps.borrow_mut().get_mut(index) {
                            *slot = Some(callback);
                        }
                    }
                    index += 1;
                }
                Some(Slot::Pause(ms)) => {
                    if ms == 0 || !self.inner.ctx.animations_enabled() {
                        index += 1;
                        continue;
                    }
                    self.inner.run.borrow_mut().awaiting = Some(index);
                    let weak = Rc::downgrade(&self.inner);
                    let timer = self.inner.ctx.scheduler().schedule_once(
                        Box::new(move || {
                            if let Some(inner) = weak.upgrade() {
                                Sequence { inner }.on_step_done(index);
                            }
                        }),
                        ms,
                    );
                    let mut run = self.inner.run.borrow_mut();
                    if run.awaiting == Some(index) {
                        run.pause_timer = Some(timer);
                    }
                    return;
                }
                Some(Slot::Animate(animation)) => {
                    self.inner.run.borrow_mut().awaiting = Some(index);
                    if animation.is_running() {
                        // Shared child already in flight; its settle advances us.
                        return;
                    }
                    animation.start();
                    return;
                }
            }
        }
    }

    fn run_callback(&self, index: usize, mut callback: StepCallback) -> StepCallback {
        match catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(sequence = %self.inner.id, step = index, error = %err, "sequence callback failed");
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(sequence = %self.inner.id, step = index, %message, "sequence callback panicked");
            }
        }
        callback
    }

    fn end_pass(&self) {
        let again = {
            let mut run = self.inner.run.borrow_mut();
            run.completed_loops += 1;
            run.loops.has_more_after(run.completed_loops)
        };

        if !again {
            self.settle(AnimationState::Finished);
            return;
        }

        // Next pass starts on the next turn so a sequence with no timed steps
        // cannot spin.
        let weak = Rc::downgrade(&self.inner);
        let pass_marker = self.inner.steps.borrow().len();
        self.inner.run.borrow_mut().awaiting = Some(pass_marker);
        let timer = self.inner.ctx.scheduler().schedule_once(
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let seq = Sequence { inner };
                    let resume = {
                        let mut run = seq.inner.run.borrow_mut();
                        let resume = run.state == AnimationState::Running && run.awaiting == Some(pass_marker);
                        if resume {
                            run.awaiting = None;
                            run.pause_timer = None;
                        }
                        resume
                    };
                    if resume {
                        seq.run_from(0);
                    }
                }
            }),
            0,
        );
        self.inner.run.borrow_mut().pause_timer = Some(timer);
    }

    fn settle(&self, state: AnimationState) {
        {
            let mut run = self.inner.run.borrow_mut();
            run.state = state;
            run.awaiting = None;
            run.pause_timer = None;
        }
        debug!(sequence = %self.inner.id, ?state, "sequence settled");
        let event = match state {
            AnimationState::Finished => MotionEvent::Finished {
                animation_id: self.inner.id,
                kind: AnimationKind::Sequence,
            },
            _ => MotionEvent::Cancelled {
                animation_id: self.inner.id,
                kind: AnimationKind::Sequence,
            },
        };
        self.inner.ctx.push_event(event);
        self.inner.ctx.release(self.inner.id);
        self.inner.listeners.emit(state);
    }
}

struct ParallelRun {
    state: AnimationState,
    // Children of the current run that have not settled yet.
    pending: Vec<bool>,
    outstanding: usize,
    completed: usize,
}

struct ParallelInner {
    id: AnimationId,
    ctx: MotionContext,
    children: RefCell<Vec<Animation>>,
    run: RefCell<ParallelRun>,
    listeners: SettleListeners,
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Logically simultaneous composite.
#[derive(Clone)]
pub struct Parallel {
    inner: Rc<ParallelInner>,
}

impl Parallel {
    pub fn new(ctx: &MotionContext) -> Self {
        Self {
            inner: Rc::new(ParallelInner {
                id: AnimationId::new(),
                ctx: ctx.clone(),
                children: RefCell::new(Vec::new()),
                run: RefCell::new(ParallelRun {
                    state: AnimationState::Idle,
                    pending: Vec::new(),
                    outstanding: 0,
                    completed: 0,
                }),
                listeners: SettleListeners::default(),
            }),
        }
    }

    /// Add a child.
    pub fn add(self, animation: impl Into<Animation>) -> Self {
        let animation = animation.into();
        let index = self.inner.children.borrow().len();
        let weak: Weak<ParallelInner> = Rc::downgrade(&self.inner);
        animation.connect_settled(move |state| {
            if let Some(inner) = weak.upgrade() {
                Parallel { inner }.on_child_settled(index, state);
            }
        });
        self.inner.children.borrow_mut().push(animation);
        self
    }

    pub fn id(&self) -> AnimationId {
        self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> AnimationState {
        self.inner.run.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Running
    }

    /// Children of the last run that reached Finished.
    pub fn completed_children(&self) -> usize {
        self.inner.run.borrow().completed
    }

    /// Children of the current run that have not settled.
    pub fn outstanding_children(&self) -> usize {
        self.inner.run.borrow().outstanding
    }

    pub fn children(&self) -> Vec<Animation> {
        self.inner.children.borrow().clone()
    }

    pub fn connect_settled(&self, f: impl Fn(AnimationState) + 'static) {
        self.inner.listeners.connect(Rc::new(f));
    }

    pub fn connect_finished(&self, f: impl Fn() + 'static) {
        self.connect_settled(move |state| {
            if state == AnimationState::Finished {
                f();
            }
        });
    }

    /// Start every child. An empty group finishes immediately.
    pub fn start(&self) {
        let children = {
            let mut run = self.inner.run.borrow_mut();
            if run.state == AnimationState::Running {
                return;
            }
            let children = self.inner.children.borrow().clone();
            run.state = AnimationState::Running;
            run.pending = vec![true; children.len()];
            run.outstanding = children.len();
            run.completed = 0;
            children
        };

        self.inner.ctx.push_event(MotionEvent::Started {
            animation_id: self.inner.id,
            kind: AnimationKind::Parallel,
        });

        if children.is_empty() {
            self.settle(AnimationState::Finished);
            return;
        }

        self.inner.ctx.retain(self.clone().into());
        for child in children {
            if !self.is_running() {
                break;
            }
            child.start();
        }
    }

    /// Stop every child still running.
    pub fn stop(&self) {
        {
            let mut run = self.inner.run.borrow_mut();
            if run.state != AnimationState::Running {
                return;
            }
            run.state = AnimationState::Cancelled;
            run.pending.iter_mut().for_each(|p| *p = false);
            run.outstanding = 0;
        }
        let children = self.inner.children.borrow().clone();
        for child in children {
            child.stop();
        }
        self.settle(AnimationState::Cancelled);
    }

    fn on_child_settled(&self, index: usize, state: AnimationState) {
        let all_done = {
            let mut run = self.inner.run.borrow_mut();
            if run.state != AnimationState::Running {
                return;
            }
            match run.pending.get_mut(index) {
                Some(pending) if *pending => *pending = false,
                _ => return,
            }
            run.outstanding -= 1;
            if state == AnimationState::Finished {
                run.completed += 1;
            }
            run.outstanding == 0
        };

        if all_done {
            self.settle(AnimationState::Finished);
        }
    }

    fn settle(&self, state: AnimationState) {
        let completed = {
            let mut run = self.inner.run.borrow_mut();
            run.state = state;
            run.completed
        };
        debug!(parallel = %self.inner.id, ?state, completed, "parallel settled");
        let event = match state {
            AnimationState::Finished => MotionEvent::Finished {
                animation_id: self.inner.id,
                kind: AnimationKind::Parallel,
            },
            _ => MotionEvent::Cancelled {
                animation_id: self.inner.id,
                kind: AnimationKind::Parallel,
            },
        };
        self.inner.ctx.push_event(event);
        self.inner.ctx.release(self.inner.id);
        self.inner.listeners.emit(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingFunction;
    use crate::scheduler::ManualScheduler;
    use crate::target::{PropertyMap, TargetRef};
    use crate::types::AnimatableProperty;
    use rune_config::MotionConfig;
    use std::cell::{Cell, RefCell};

    fn setup() -> (Rc<ManualScheduler>, MotionContext) {
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = MotionContext::new(scheduler.clone(), MotionConfig::default());
        (scheduler, ctx)
    }

    fn fade(ctx: &MotionContext, widget: &Rc<PropertyMap>, to: f64, ms: u64) -> Animator {
        Animator::create(ctx, &TargetRef::new(widget), "opacity", ms, EasingFunction::Linear)
            .unwrap()
            .with_end_value(to)
            .unwrap()
    }

    fn widget() -> Rc<PropertyMap> {
        PropertyMap::new()
            .with(AnimatableProperty::Opacity, 1.0)
            .with(AnimatableProperty::Width, 0.0)
            .shared()
    }

    #[test]
    fn test_sequence_runs_in_order() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (l1, l2) = (log.clone(), log.clone());
        let s1 = scheduler.clone();
        let s2 = scheduler.clone();
        let seq = Sequence::new(&ctx)
            .add(fade(&ctx, &w, 0.0, 100))
            .add_callback(move || l1.borrow_mut().push(("after-first", s1.now_ms())))
            .add_pause(50)
            .add_callback(move || l2.borrow_mut().push(("after-pause", s2.now_ms())))
            .add(fade(&ctx, &w, 1.0, 100));

        seq.start();
        scheduler.advance(1000);

        assert_eq!(seq.state(), AnimationState::Finished);
        assert_eq!(*log.borrow(), vec![("after-first", 112), ("after-pause", 162)]);
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(1.0));
    }

    #[test]
    fn test_sequence_finishes_after_total_duration() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let finished_at = Rc::new(Cell::new(None));
        let (f, s) = (finished_at.clone(), scheduler.clone());

        let seq = Sequence::new(&ctx)
            .add(fade(&ctx, &w, 0.0, 100))
            .add(fade(&ctx, &w, 1.0, 100));
        seq.connect_finished(move || f.set(Some(s.now_ms())));
        seq.start();

        scheduler.advance(199);
        assert_eq!(finished_at.get(), None);
        scheduler.advance(100);

        let at = finished_at.get().unwrap();
        assert!(at >= 200 && at <= 200 + 2 * 16, "finished at {at}");
    }

    #[test]
    fn test_callback_errors_do_not_abort() {
        let (scheduler, ctx) = setup();
        let ran = Rc::new(Cell::new(0));
        let (r1, r2) = (ran.clone(), ran.clone());

        let seq = Sequence::new(&ctx)
            .add_try_callback(|| Err(anyhow::anyhow!("boom")))
            .add_callback(|| panic!("kaboom"))
            .add_callback(move || r1.set(r1.get() + 1))
            .add_pause(10)
            .add_callback(move || r2.set(r2.get() + 1));

        seq.start();
        assert_eq!(ran.get(), 1);
        scheduler.advance(10);
        assert_eq!(ran.get(), 2);
        assert_eq!(seq.state(), AnimationState::Finished);
    }

    #[test]
    fn test_callback_runs_once_per_pass() {
        let (scheduler, ctx) = setup();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let seq = Sequence::new(&ctx)
            .add_callback(move || c.set(c.get() + 1))
            .add_pause(10)
            .with_loop_count(LoopCount::Finite(3));

        seq.start();
        scheduler.advance(100);
        assert_eq!(count.get(), 3);
        assert_eq!(seq.state(), AnimationState::Finished);
    }

    #[test]
    fn test_stop_sequence_stops_current_step() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let second_ran = Rc::new(Cell::new(false));
        let flag = second_ran.clone();

        let first = fade(&ctx, &w, 0.0, 100);
        let seq = Sequence::new(&ctx)
            .add(first.clone())
            .add_callback(move || flag.set(true));

        seq.start();
        scheduler.advance(32);
        seq.stop();

        assert_eq!(seq.state(), AnimationState::Cancelled);
        assert_eq!(first.state(), AnimationState::Cancelled);
        scheduler.advance(500);
        assert!(!second_ran.get());
        assert_eq!(ctx.running_composites(), 0);
    }

    #[test]
    fn test_preempted_step_advances_sequence() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let grow = Animator::create(&ctx, &TargetRef::new(&w), "width", 100, EasingFunction::Linear)
            .unwrap()
            .with_end_value(50.0)
            .unwrap();
        let seq = Sequence::new(&ctx).add(fade(&ctx, &w, 0.0, 100)).add(grow);
        seq.start();
        scheduler.advance(16);

        // Another writer takes over opacity; the cancelled step still settles.
        fade(&ctx, &w, 0.5, 50).start();
        assert_eq!(seq.state(), AnimationState::Running);
        assert_eq!(seq.current_step(), Some(1));

        scheduler.advance(200);
        assert_eq!(seq.state(), AnimationState::Finished);
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(0.5));
        assert_eq!(w.get_f64(AnimatableProperty::Width), Some(50.0));
    }

    #[test]
    fn test_parallel_finishes_after_last_child() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let w2 = widget();
        let group = Parallel::new(&ctx)
            .add(fade(&ctx, &w, 0.0, 100))
            .add(fade(&ctx, &w2, 0.0, 200));

        group.start();
        assert_eq!(group.outstanding_children(), 2);
        scheduler.advance(120);
        assert_eq!(group.outstanding_children(), 1);
        assert!(group.is_running());

        scheduler.advance(100);
        assert_eq!(group.state(), AnimationState::Finished);
        assert_eq!(group.completed_children(), 2);
    }

    #[test]
    fn test_parallel_cancelled_child_does_not_block() {
        let (scheduler, ctx) = setup();
        let w = widget();
        let w2 = widget();
        let doomed = fade(&ctx, &w2, 0.0, 100);
        let group = Parallel::new(&ctx).add(fade(&ctx, &w, 0.0, 100)).add(doomed.clone());

        group.start();
        scheduler.advance(16);
        doomed.stop();
        scheduler.advance(200);

        assert_eq!(group.state(), AnimationState::Finished);
        assert_eq!(group.completed_children(), 1);
    }

    #[test]
    fn test_empty_groups_finish_immediately() {
        let (_s, ctx) = setup();
        let group = Parallel::new(&ctx);
        group.start();
        assert_eq!(group.state(), AnimationState::Finished);

        let seq = Sequence::new(&ctx);
        seq.start();
        assert_eq!(seq.state(), AnimationState::Finished);
        assert_eq!(ctx.running_composites(), 0);
    }

    #[test]
    fn test_nested_groups() {
        let (scheduler, ctx) = setup();
        let a = widget();
        let b = widget();
        let inner = Parallel::new(&ctx).add(fade(&ctx, &a, 0.0, 100)).add(fade(&ctx, &b, 0.0, 100));
        let outer = Sequence::new(&ctx).add(inner).add(fade(&ctx, &a, 1.0, 100));

        outer.start();
        scheduler.advance(500);
        assert_eq!(outer.state(), AnimationState::Finished);
        assert_eq!(a.get_f64(AnimatableProperty::Opacity), Some(1.0));
        assert_eq!(b.get_f64(AnimatableProperty::Opacity), Some(0.0));
    }

    #[test]
    fn test_composite_outlives_handle() {
        let (scheduler, ctx) = setup();
        let w = widget();
        Sequence::new(&ctx)
            .add(fade(&ctx, &w, 0.0, 50))
            .add(fade(&ctx, &w, 0.5, 50))
            .start();
        scheduler.advance(300);
        assert_eq!(w.get_f64(AnimatableProperty::Opacity), Some(0.5));
        assert_eq!(ctx.running_composites(), 0);
    }
}
