//! Widget contract consumed by the engine.
//!
//! Widgets opt in by implementing [`Animatable`]; the engine only ever keeps a
//! [`TargetRef`], a non-owning handle that is re-checked before every
//! property write. Dropping the widget (or reporting it destroyed) is enough
//! to stop every animation aimed at it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::types::{AnimatableProperty, AnimatableValue};

/// Capability interface for anything whose properties can be animated.
///
/// Methods take `&self`: widgets are shared UI objects and use interior
/// mutability for their animated state.
pub trait Animatable {
    /// Read the live value of a property, or `None` if the widget does not
    /// expose it.
    fn property(&self, property: AnimatableProperty) -> Option<AnimatableValue>;

    /// Write a property. Returns false if the widget rejected the write.
    fn set_property(&self, property: AnimatableProperty, value: AnimatableValue) -> bool;

    /// Widgets that outlive their on-screen lifetime (e.g. a closed dialog
    /// still referenced by its owner) report teardown here.
    fn is_destroyed(&self) -> bool {
        false
    }
}

/// Stable identity of a target, valid for as long as any `TargetRef` to it
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(usize);

/// Non-owning handle to an animation target.
#[derive(Clone)]
pub struct TargetRef {
    inner: Weak<dyn Animatable>,
}

impl TargetRef {
    /// Create a handle without taking ownership of the target.
    pub fn new<T: Animatable + 'static>(target: &Rc<T>) -> Self {
        let weak: Weak<T> = Rc::downgrade(target);
        let inner: Weak<dyn Animatable> = weak;
        Self { inner }
    }

    /// Create a handle from an already type-erased target.
    pub fn from_dyn(target: &Rc<dyn Animatable>) -> Self {
        Self {
            inner: Rc::downgrade(target),
        }
    }

    /// Borrow the target if it is still alive and not destroyed.
    pub fn upgrade(&self) -> Option<Rc<dyn Animatable>> {
        self.inner.upgrade().filter(|target| !target.is_destroyed())
    }

    /// Returns true if the target can still be written to.
    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some()
    }

    /// Identity key for registries.
    pub fn key(&self) -> TargetKey {
        TargetKey(self.inner.as_ptr() as *const () as usize)
    }

    /// Read a property from the live target.
    pub fn get(&self, property: AnimatableProperty) -> Option<AnimatableValue> {
        self.upgrade()?.property(property)
    }

    /// Write a property if the target is alive. Returns false when the write
    /// was dropped.
    pub fn set(&self, property: AnimatableProperty, value: AnimatableValue) -> bool {
        match self.upgrade() {
            Some(target) => target.set_property(property, value),
            None => false,
        }
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRef")
            .field("key", &self.key())
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl PartialEq for TargetRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TargetRef {}

/// In-memory widget backed by a property map.
///
/// Suitable for headless hosts, previews and tests. Counts writes so callers
/// can assert an operation did not touch the widget.
#[derive(Debug, Default)]
pub struct PropertyMap {
    values: RefCell<HashMap<AnimatableProperty, AnimatableValue>>,
    writes: Cell<usize>,
    destroyed: Cell<bool>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style initial value. Does not count as a write.
    pub fn with(self, property: AnimatableProperty, value: impl Into<AnimatableValue>) -> Self {
        self.values.borrow_mut().insert(property, value.into());
        self
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn get(&self, property: AnimatableProperty) -> Option<AnimatableValue> {
        self.values.borrow().get(&property).copied()
    }

    pub fn get_f64(&self, property: AnimatableProperty) -> Option<f64> {
        self.get(property).and_then(|v| v.as_f64())
    }

    /// Number of writes performed through [`Animatable::set_property`].
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Mark the widget as torn down. Subsequent writes are rejected.
    pub fn destroy(&self) {
        self.destroyed.set(true);
    }
}

impl Animatable for PropertyMap {
    fn property(&self, property: AnimatableProperty) -> Option<AnimatableValue> {
        self.get(property)
    }

    fn set_property(&self, property: AnimatableProperty, value: AnimatableValue) -> bool {
        if self.destroyed.get() {
            return false;
        }
        let mut values = self.values.borrow_mut();
        match values.get_mut(&property) {
            Some(slot) if slot.value_type() == value.value_type() => {
                *slot = value;
                self.writes.set(self.writes.get() + 1);
                true
            }
            _ => false,
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_ref_does_not_own() {
        let widget = PropertyMap::new().with(AnimatableProperty::Opacity, 1.0).shared();
        let target = TargetRef::new(&widget);
        assert!(target.is_alive());
        assert_eq!(target.get(AnimatableProperty::Opacity), Some(AnimatableValue::from(1.0)));

        drop(widget);
        assert!(!target.is_alive());
        assert!(!target.set(AnimatableProperty::Opacity, AnimatableValue::from(0.5)));
    }

    #[test]
    fn test_destroyed_target_is_not_alive() {
        let widget = PropertyMap::new().with(AnimatableProperty::Opacity, 1.0).shared();
        let target = TargetRef::new(&widget);
        widget.destroy();
        assert!(!target.is_alive());
        assert!(!target.set(AnimatableProperty::Opacity, AnimatableValue::from(0.0)));
        assert_eq!(widget.write_count(), 0);
    }

    #[test]
    fn test_key_identity() {
        let a = PropertyMap::new().shared();
        let b = PropertyMap::new().shared();
        assert_eq!(TargetRef::new(&a).key(), TargetRef::new(&a).key());
        assert_ne!(TargetRef::new(&a).key(), TargetRef::new(&b).key());

        let erased: Rc<dyn Animatable> = a.clone();
        assert_eq!(TargetRef::from_dyn(&erased), TargetRef::new(&a));
    }

    #[test]
    fn test_property_map_rejects_unknown_and_mismatched() {
        let widget = PropertyMap::new().with(AnimatableProperty::Height, 32.0);
        assert!(!widget.set_property(AnimatableProperty::Width, AnimatableValue::from(10.0)));
        assert!(!widget.set_property(
            AnimatableProperty::Height,
            crate::types::Point::new(0.0, 0.0).into()
        ));
        assert!(widget.set_property(AnimatableProperty::Height, AnimatableValue::from(34.0)));
        assert_eq!(widget.get_f64(AnimatableProperty::Height), Some(34.0));
        assert_eq!(widget.write_count(), 1);
    }
}
