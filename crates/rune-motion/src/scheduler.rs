//! Host scheduler contract.
//!
//! The engine never owns a clock. Every animation advances through callbacks
//! registered on a [`Scheduler`] supplied by the host (the UI event loop).
//! All calls happen on the UI thread, so callbacks are plain `'static`
//! closures without `Send` bounds.
//!
//! [`ManualScheduler`] is a deterministic virtual clock for headless hosts
//! and tests: time only moves when [`ManualScheduler::advance`] is called.
//!
//! # Usage
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use rune_motion::scheduler::{ManualScheduler, Scheduler};
//!
//! let scheduler = ManualScheduler::new();
//! let fired = Rc::new(Cell::new(0));
//! let counter = fired.clone();
//! scheduler.schedule_once(Box::new(move || counter.set(counter.get() + 1)), 50);
//!
//! scheduler.advance(49);
//! assert_eq!(fired.get(), 0);
//! scheduler.advance(1);
//! assert_eq!(fired.get(), 1);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

/// Repeating callback. Receives the milliseconds elapsed since the previous
/// invocation (or since registration for the first one).
pub type TickCallback = Box<dyn FnMut(f64)>;

/// One-shot callback.
pub type OnceCallback = Box<dyn FnOnce()>;

/// Opaque handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Timer primitive provided by the host event loop.
pub trait Scheduler {
    /// Invoke `callback` every `interval_ms` until cancelled.
    fn schedule_tick(&self, callback: TickCallback, interval_ms: u64) -> TimerHandle;

    /// Invoke `callback` once after `delay_ms`. A zero delay runs on the next
    /// turn of the event loop, never synchronously.
    fn schedule_once(&self, callback: OnceCallback, delay_ms: u64) -> TimerHandle;

    /// Cancel a timer. Unknown or already-fired handles are ignored, and the
    /// call is legal from inside any running callback, including the
    /// cancelled timer's own.
    fn cancel(&self, handle: TimerHandle);
}

enum TimerKind {
    Tick {
        interval_ms: u64,
        last_fired_ms: u64,
        // None while the callback is running.
        callback: Option<TickCallback>,
    },
    Once(OnceCallback),
}

struct Timer {
    due_ms: u64,
    kind: TimerKind,
}

enum Fired {
    Tick(TickCallback, f64),
    Once(OnceCallback),
    Nothing,
}

#[derive(Default)]
struct ClockState {
    now_ms: u64,
    next_handle: u64,
    timers: BTreeMap<u64, Timer>,
}

/// Deterministic virtual-time scheduler.
///
/// Timers fire in order of due time, ties broken by registration order.
/// Callbacks run with no internal borrow held, so they may freely schedule or
/// cancel other timers.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ClockState>,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Number of live timers (repeating and pending one-shots).
    pub fn active_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Advance virtual time by `ms`, firing every timer that comes due,
    /// including timers registered by callbacks along the way.
    ///
    /// `advance(0)` fires timers already due at the current time.
    pub fn advance(&self, ms: u64) {
        let target = self.state.borrow().now_ms.saturating_add(ms);

        while let Some((id, due)) = self.next_due(target) {
            self.state.borrow_mut().now_ms = due;
            self.fire(id);
        }

        self.state.borrow_mut().now_ms = target;
    }

    /// Advance in steps of `step_ms` until no timers remain or `limit_ms`
    /// has elapsed. Returns true if the scheduler went idle.
    pub fn run_until_idle(&self, step_ms: u64, limit_ms: u64) -> bool {
        let step = step_ms.max(1);
        let mut elapsed = 0;
        while self.active_timers() > 0 && elapsed < limit_ms {
            self.advance(step);
            elapsed += step;
        }
        self.active_timers() == 0
    }

    fn next_due(&self, target: u64) -> Option<(u64, u64)> {
        let state = self.state.borrow();
        state
            .timers
            .iter()
            .filter(|(_, timer)| timer.due_ms <= target)
            .filter(|(_, timer)| !matches!(timer.kind, TimerKind::Tick { callback: None, .. }))
            .min_by_key(|(id, timer)| (timer.due_ms, **id))
            .map(|(id, timer)| (*id, timer.due_ms))
    }

    fn fire(&self, id: u64) {
        let fired = {
            let mut state = self.state.borrow_mut();
            let now = state.now_ms;
            let is_once = matches!(
                state.timers.get(&id),
                Some(Timer {
                    kind: TimerKind::Once(_),
                    ..
                })
            );

            if is_once {
                match state.timers.remove(&id) {
                    Some(Timer {
                        kind: TimerKind::Once(cb),
                        ..
                    }) => Fired::Once(cb),
                    _ => Fired::Nothing,
                }
            } else if let Some(Timer {
                due_ms,
                kind:
                    TimerKind::Tick {
                        interval_ms,
                        last_fired_ms,
                        callback,
                    },
            }) = state.timers.get_mut(&id)
            {
                let elapsed = now.saturating_sub(*last_fired_ms) as f64;
                *last_fired_ms = now;
                *due_ms = now + *interval_ms;
                match callback.take() {
                    Some(cb) => Fired::Tick(cb, elapsed),
                    None => Fired::Nothing,
                }
            } else {
                Fired::Nothing
            }
        };

        match fired {
            Fired::Tick(mut tick, elapsed) => {
                tick(elapsed);
                // Put the callback back unless the timer was cancelled while running.
                let mut state = self.state.borrow_mut();
                if let Some(Timer {
                    kind: TimerKind::Tick { callback, .. },
                    ..
                }) = state.timers.get_mut(&id)
                {
                    *callback = Some(tick);
                }
            }
            Fired::Once(once) => once(),
            Fired::Nothing => {}
        }
    }

    fn insert(&self, due_in_ms: u64, kind: TimerKind) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let id = state.next_handle;
        let due_ms = state.now_ms + due_in_ms;
        state.timers.insert(id, Timer { due_ms, kind });
        TimerHandle(id)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_tick(&self, callback: TickCallback, interval_ms: u64) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        let now = self.now_ms();
        self.insert(
            interval_ms,
            TimerKind::Tick {
                interval_ms,
                last_fired_ms: now,
                callback: Some(callback),
            },
        )
    }

    fn schedule_once(&self, callback: OnceCallback, delay_ms: u64) -> TimerHandle {
        self.insert(delay_ms, TimerKind::Once(callback))
    }

    fn cancel(&self, handle: TimerHandle) {
        self.state.borrow_mut().timers.remove(&handle.0);
    }
}
