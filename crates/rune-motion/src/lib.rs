//! rune-motion: property animation, composition and theme transitions for
//! rune widgets.
//!
//! - `animator`: single-property tweens with last-writer-wins ownership
//! - `group`: sequences and parallel groups that nest freely
//! - `micro`, `reveal`: ready-made interaction and entrance effects
//! - `state_machine`: named visual states per widget
//! - `theme_binding`, `coordinator`: theme-aware colors and staggered,
//!   app-wide theme transitions
//!
//! Everything runs on the UI thread. The host supplies a [`Scheduler`]
//! (`ManualScheduler` for headless use) and widgets implement
//! [`Animatable`]; the engine only keeps weak handles to either side's
//! objects.

pub mod animator;
pub mod color;
pub mod context;
pub mod coordinator;
pub mod durations;
pub mod easing;
pub mod error;
pub mod events;
pub mod group;
pub mod interpolate;
pub mod micro;
pub mod reveal;
pub mod scheduler;
pub mod state_machine;
pub mod target;
pub mod theme;
pub mod theme_binding;
pub mod types;

pub use animator::{AnimatedProperty, Animator};
pub use color::Color;
pub use context::MotionContext;
pub use coordinator::{ThemeParticipant, ThemeTransitionCoordinator, ThemedTarget, TransitionKind};
pub use easing::{EasingFunction, StepPosition};
pub use error::{MotionError, Result};
pub use events::{AnimationKind, EventQueue, MotionEvent};
pub use group::{Animation, Parallel, Sequence, Step};
pub use interpolate::Interpolate;
pub use reveal::{RevealKind, SlideDirection};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle};
pub use state_machine::{NamedState, StateTransitionMachine};
pub use target::{Animatable, PropertyMap, TargetRef};
pub use theme::{PaletteTheme, ThemeChange, ThemeMode, ThemeStore};
pub use theme_binding::ThemeBindings;
pub use types::{
    AnimatableProperty, AnimatableValue, AnimatableValueType, AnimationId, AnimationState, LoopCount, Point, Rect,
    Size,
};

static_assertions::assert_impl_all!(AnimatableValue: Send, Sync);
static_assertions::assert_impl_all!(AnimationState: Send, Sync);

/// Common imports for building animations.
pub mod prelude {
    pub use crate::{
        Animatable, AnimatableProperty, AnimatableValue, Animation, Animator, Color, EasingFunction, LoopCount,
        ManualScheduler, MotionContext, Parallel, PropertyMap, Sequence, StateTransitionMachine, TargetRef,
    };
}
