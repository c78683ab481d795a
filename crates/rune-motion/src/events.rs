//! Animation lifecycle events.
//!
//! Every animator, group and coordinated transition pushes events into the
//! context's [`EventQueue`]. Hosts poll the queue after advancing the
//! scheduler to react to lifecycle changes without registering callbacks.
//!
//! # Usage
//!
//! ```ignore
//! scheduler.advance(16);
//! for event in ctx.drain_events() {
//!     if let MotionEvent::DeadTarget { animation_id, property } = event {
//!         tracing::debug!(%animation_id, %property, "widget went away");
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::types::{AnimatableProperty, AnimationId, AnimationState};

/// What kind of animation an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Animator,
    Sequence,
    Parallel,
    /// A coordinated theme transition across registered components.
    ThemeTransition,
}

/// Event emitted when an animation changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionEvent {
    /// Animation has started running.
    Started {
        animation_id: AnimationId,
        kind: AnimationKind,
    },
    /// Animation ran to completion.
    Finished {
        animation_id: AnimationId,
        kind: AnimationKind,
    },
    /// Animation was stopped before completion.
    Cancelled {
        animation_id: AnimationId,
        kind: AnimationKind,
    },
    /// An animator dropped its writes because its target was destroyed.
    DeadTarget {
        animation_id: AnimationId,
        property: AnimatableProperty,
    },
}

impl MotionEvent {
    /// Get the animation ID for this event.
    pub fn animation_id(&self) -> AnimationId {
        match self {
            Self::Started { animation_id, .. }
            | Self::Finished { animation_id, .. }
            | Self::Cancelled { animation_id, .. }
            | Self::DeadTarget { animation_id, .. } => *animation_id,
        }
    }

    /// Get the animation kind for this event.
    pub fn kind(&self) -> AnimationKind {
        match self {
            Self::Started { kind, .. } | Self::Finished { kind, .. } | Self::Cancelled { kind, .. } => {
                *kind
            }
            Self::DeadTarget { .. } => AnimationKind::Animator,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    /// Cancelled, including drops caused by a dead target.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadTarget { .. })
    }
}

/// Queue for collecting lifecycle events between host polls.
///
/// The queue is bounded; when full, the oldest events are discarded so a host
/// that never drains cannot grow memory without limit.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<MotionEvent>,
    capacity: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl EventQueue {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Push an event, discarding the oldest one if the queue is full.
    pub fn push(&mut self, event: MotionEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Pop the next event from the queue.
    pub fn pop(&mut self) -> Option<MotionEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, returning an iterator.
    pub fn drain(&mut self) -> impl Iterator<Item = MotionEvent> + '_ {
        self.events.drain(..)
    }

    /// Peek at the next event without removing it.
    pub fn peek(&self) -> Option<&MotionEvent> {
        self.events.front()
    }

    /// Clear all pending events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Get events for a specific animation.
    pub fn events_for(&self, animation_id: AnimationId) -> Vec<&MotionEvent> {
        self.events
            .iter()
            .filter(|e| e.animation_id() == animation_id)
            .collect()
    }
}

/// Callback invoked with the terminal state each time an animation settles.
pub type SettleListener = Rc<dyn Fn(AnimationState)>;

/// Persistent listener list shared by animators and groups.
///
/// Listeners are called with no borrow held, so they may connect further
/// listeners or start and stop animations.
#[derive(Default)]
pub(crate) struct SettleListeners {
    listeners: RefCell<Vec<SettleListener>>,
}

impl SettleListeners {
    pub(crate) fn connect(&self, listener: SettleListener) {
        self.listeners.borrow_mut().push(listener);
    }

    pub(crate) fn emit(&self, state: AnimationState) {
        let snapshot: Vec<SettleListener> = self.listeners.borrow().clone();
        for listener in snapshot {
            listener(state);
        }
    }
}

static_assertions::assert_impl_all!(MotionEvent: Send, Sync);
