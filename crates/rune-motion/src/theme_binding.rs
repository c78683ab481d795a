//! Color animations that follow the theme.
//!
//! An animator created through [`ThemeBindings`] remembers which theme color
//! it is heading for. When the theme changes while it is still pending or
//! running, its end value is swapped for the new lookup so the animation
//! lands on the new theme instead of the old one. Bindings are dropped as
//! soon as their animator settles or is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::animator::{Animator, WeakAnimator};
use crate::context::MotionContext;
use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::target::TargetRef;
use crate::theme::{ThemeChange, ThemeStore};
use crate::types::{AnimatableProperty, AnimationId};

struct Binding {
    color_name: String,
    animator: WeakAnimator,
}

struct BindingsInner {
    ctx: MotionContext,
    store: Rc<dyn ThemeStore>,
    bindings: RefCell<HashMap<AnimationId, Binding>>,
}

/// Registry of theme-bound color animations.
#[derive(Clone)]
pub struct ThemeBindings {
    inner: Rc<BindingsInner>,
}

impl ThemeBindings {
    /// Create a registry that is not yet listening to `store`.
    ///
    /// Hosts that dispatch theme changes themselves call
    /// [`on_theme_changed`](Self::on_theme_changed) directly.
    pub fn new(ctx: &MotionContext, store: Rc<dyn ThemeStore>) -> Self {
        Self {
            inner: Rc::new(BindingsInner {
                ctx: ctx.clone(),
                store,
                bindings: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Create a registry subscribed to `store`'s change notifications.
    pub fn attach(ctx: &MotionContext, store: Rc<dyn ThemeStore>) -> Self {
        let bindings = Self::new(ctx, store.clone());
        let weak = Rc::downgrade(&bindings.inner);
        store.subscribe(Box::new(move |change| {
            if let Some(inner) = weak.upgrade() {
                ThemeBindings { inner }.on_theme_changed(change);
            }
        }));
        bindings
    }

    /// Create an idle animator from a darkened shade of `color_name` to the
    /// theme's current `color_name`.
    pub fn create_theme_color_animation(
        &self,
        target: &TargetRef,
        path: &str,
        color_name: &str,
        duration_ms: u64,
    ) -> Result<Animator> {
        let property = path.parse::<AnimatableProperty>()?;
        let Some(end) = self.inner.store.color(color_name) else {
            warn!(color = color_name, "unknown theme color");
            return Err(MotionError::UnknownThemeColor(color_name.to_string()));
        };
        let darken = self.inner.ctx.config().theme_start_darken;

        let animator = Animator::for_property(&self.inner.ctx, target, property, duration_ms, EasingFunction::Smooth)?
            .with_start_value(end.darker(darken))?
            .with_end_value(end)?;

        let id = animator.id();
        self.inner.bindings.borrow_mut().insert(
            id,
            Binding {
                color_name: color_name.to_string(),
                animator: animator.downgrade(),
            },
        );

        let weak: Weak<BindingsInner> = Rc::downgrade(&self.inner);
        animator.connect_settled(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.bindings.borrow_mut().remove(&id);
            }
        });

        trace!(animation = %id, color = color_name, property = %property, "bound theme color");
        Ok(animator)
    }

    /// Retarget every live binding at the current theme.
    ///
    /// Settled or dropped animators lose their binding and are never
    /// restarted.
    pub fn on_theme_changed(&self, change: &ThemeChange) {
        debug!(mode = ?change.mode, bindings = self.binding_count(), "rebinding theme colors");

        let snapshot: Vec<(AnimationId, String, WeakAnimator)> = self
            .inner
            .bindings
            .borrow()
            .iter()
            .map(|(id, b)| (*id, b.color_name.clone(), b.animator.clone()))
            .collect();

        for (id, color_name, animator) in snapshot {
            let live = animator.upgrade().filter(|a| !a.state().is_settled());
            let Some(animator) = live else {
                self.inner.bindings.borrow_mut().remove(&id);
                continue;
            };
            match self.inner.store.color(&color_name) {
                Some(color) => {
                    if let Err(err) = animator.set_end_value(color) {
                        warn!(animation = %id, error = %err, "cannot retarget theme color");
                    }
                }
                None => warn!(color = %color_name, "theme color vanished after change"),
            }
        }
    }

    /// Number of bindings still tracked.
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }
}
