//! Rune configuration system
//!
//! This crate provides centralized configuration for the rune motion engine,
//! loading settings from `rune.toml` with environment variable overrides.
//!
//! ```toml
//! [motion]
//! animations_enabled = true
//! frame_interval_ms = 16
//! theme_transition = "fade"
//!
//! [theme]
//! mode = "dark"
//!
//! [theme.custom_colors]
//! primary = "#8764b8"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RuneConfig {
    /// Animation engine settings
    pub motion: MotionConfig,
    /// Theme store settings
    pub theme: ThemeConfig,
}

/// Animation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Global switch. When false, animations jump to their end value.
    pub animations_enabled: bool,
    /// Interval between animation ticks in milliseconds (16 ≈ 60 fps)
    pub frame_interval_ms: u64,
    /// Per-component duration of a coordinated theme transition
    pub theme_transition_duration_ms: u64,
    /// Delay between successive components in a coordinated theme transition
    pub theme_stagger_delay_ms: u64,
    /// Transition style for theme changes: instant, fade, slide or morph
    pub theme_transition: String,
    /// How much darker the start color of a theme color animation is (0..1)
    pub theme_start_darken: f32,
    /// Default per-item delay for staggered reveals
    pub reveal_stagger_delay_ms: u64,
}

/// Theme store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    /// Initial mode: "light" or "dark"
    pub mode: String,
    /// Named color overrides as hex strings (e.g. `primary = "#0078d4"`)
    pub custom_colors: BTreeMap<String, String>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            frame_interval_ms: 16,
            theme_transition_duration_ms: 250,
            theme_stagger_delay_ms: 50,
            theme_transition: "fade".to_string(),
            theme_start_darken: 0.15,
            reveal_stagger_delay_ms: 100,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            mode: "light".to_string(),
            custom_colors: BTreeMap::new(),
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl RuneConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the rune.toml configuration file
    ///
    /// # Returns
    /// * `Ok(RuneConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("rune.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Unparseable numeric values are ignored.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("RUNE_MOTION_ENABLED") {
            self.motion.animations_enabled = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("RUNE_MOTION_FRAME_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.motion.frame_interval_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("RUNE_THEME_TRANSITION_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.motion.theme_transition_duration_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("RUNE_THEME_STAGGER_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.motion.theme_stagger_delay_ms = ms;
            }
        }
        if let Ok(kind) = std::env::var("RUNE_THEME_TRANSITION") {
            self.motion.theme_transition = kind;
        }
        if let Ok(mode) = std::env::var("RUNE_THEME_MODE") {
            self.theme.mode = mode;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// This is the recommended way to load configuration:
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
