//! Error types for the motion engine.
//!
//! Only creation-time problems are reported as errors. Runtime failures such
//! as a target destroyed mid-animation are recovered locally and logged.

use thiserror::Error;

use crate::types::{AnimatableProperty, AnimatableValueType};

/// Result type for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors that can occur while building animations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// The property path does not name any animatable property.
    #[error("unknown property path: {0}")]
    UnknownProperty(String),

    /// The target does not expose this property.
    #[error("property '{property}' not found on target")]
    PropertyNotFound { property: AnimatableProperty },

    /// The target was destroyed before the animation could be created.
    #[error("animation target has been destroyed")]
    TargetDestroyed,

    /// A start or end value does not match the property's value type.
    #[error("property '{property}' expects a {expected} value, got {found}")]
    ValueTypeMismatch {
        property: AnimatableProperty,
        expected: AnimatableValueType,
        found: AnimatableValueType,
    },

    /// The theme store has no color with this name.
    #[error("unknown theme color: {0}")]
    UnknownThemeColor(String),

    /// No state with this name is registered on the state machine.
    #[error("unknown state: {0}")]
    UnknownState(String),

    /// Invalid configuration value.
    #[error("invalid motion configuration: {0}")]
    Config(String),
}
