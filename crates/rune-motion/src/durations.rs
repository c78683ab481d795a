//! Standard animation durations, in milliseconds.

pub const ULTRA_FAST: u64 = 100;
pub const VERY_FAST: u64 = 120;
pub const FAST: u64 = 150;
pub const MEDIUM: u64 = 250;
pub const SLOW: u64 = 350;

/// Default for `fade_in` and `slide_in`.
pub const REVEAL: u64 = 300;
/// Default for `scale_in`.
pub const SCALE_IN: u64 = 200;
/// One leg of a shake.
pub const SHAKE_STEP: u64 = 50;
