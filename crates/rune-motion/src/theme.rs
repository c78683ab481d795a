//! Theme store contract and the built-in palette store.
//!
//! The engine only needs two things from a theme: a color lookup by name and
//! a change notification. Hosts with their own theming implement
//! [`ThemeStore`]; [`PaletteTheme`] is a ready-made store carrying the Fluent
//! light and dark palettes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rune_config::ThemeConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::error::{MotionError, Result};

/// Change notification callback.
pub type ThemeCallback = Box<dyn FnMut(&ThemeChange)>;

/// Payload of a theme change notification.
///
/// Stores may notify without naming a mode (e.g. after a custom color
/// override), in which case `mode` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeChange {
    pub mode: Option<String>,
}

/// Source of theme colors.
pub trait ThemeStore {
    /// Look up a color in the active palette.
    fn color(&self, name: &str) -> Option<Color>;

    /// Register a callback fired after every theme change.
    fn subscribe(&self, callback: ThemeCallback);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(MotionError::Config(format!("unknown theme mode '{other}'"))),
        }
    }
}

const LIGHT_PALETTE: &[(&str, &str)] = &[
    ("primary", "#0078d4"),
    ("secondary", "#106ebe"),
    ("surface", "#ffffff"),
    ("background", "#f3f2f1"),
    ("card", "#ffffff"),
    ("border", "#d1d1d1"),
    ("text_primary", "#323130"),
    ("text_secondary", "#605e5c"),
    ("text_disabled", "#a19f9d"),
    ("accent_light", "#deecf9"),
    ("accent_medium", "#c7e0f4"),
    ("accent_dark", "#004578"),
    ("success", "#107c10"),
    ("warning", "#ff8c00"),
    ("error", "#d13438"),
    ("info", "#0078d4"),
    ("overlay", "#00000050"),
    ("hover", "#f3f2f1"),
    ("pressed", "#edebe9"),
    ("focus", "#005a9e"),
    ("selection", "#0078d428"),
    ("elevation_1", "#ffffff"),
    ("elevation_2", "#fcfcfc"),
    ("elevation_4", "#f8f8f8"),
    ("elevation_8", "#f4f4f4"),
    ("elevation_12", "#f0f0f0"),
];

const DARK_PALETTE: &[(&str, &str)] = &[
    ("primary", "#60cdff"),
    ("secondary", "#0078d4"),
    ("surface", "#2d2d30"),
    ("background", "#1e1e1e"),
    ("card", "#252526"),
    ("border", "#3e3e42"),
    ("text_primary", "#ffffff"),
    ("text_secondary", "#cccccc"),
    ("text_disabled", "#808080"),
    ("accent_light", "#0d2240"),
    ("accent_medium", "#1a3a5c"),
    ("accent_dark", "#60cdff"),
    ("success", "#6bb700"),
    ("warning", "#ffb900"),
    ("error", "#ff5349"),
    ("info", "#60cdff"),
    ("overlay", "#00000078"),
    ("hover", "#323233"),
    ("pressed", "#404041"),
    ("focus", "#0099ff"),
    ("selection", "#60cdff3c"),
    ("elevation_1", "#252526"),
    ("elevation_2", "#2d2d30"),
    ("elevation_4", "#363637"),
    ("elevation_8", "#3e3e42"),
    ("elevation_12", "#464647"),
];

fn palette_color(mode: ThemeMode, name: &str) -> Option<Color> {
    let palette = match mode {
        ThemeMode::Light => LIGHT_PALETTE,
        ThemeMode::Dark => DARK_PALETTE,
    };
    palette
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, hex)| Color::from_hex(hex))
}

#[derive(Debug, Default)]
struct PaletteState {
    mode: ThemeMode,
    custom: BTreeMap<String, Color>,
}

/// In-memory theme store with light/dark palettes and custom overrides.
#[derive(Default)]
pub struct PaletteTheme {
    state: RefCell<PaletteState>,
    subscribers: RefCell<Vec<ThemeCallback>>,
}

impl PaletteTheme {
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            state: RefCell::new(PaletteState {
                mode,
                custom: BTreeMap::new(),
            }),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Build a store from the `[theme]` section of the config.
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let theme = Self::new(config.mode.parse()?);
        {
            let mut state = theme.state.borrow_mut();
            for (name, hex) in &config.custom_colors {
                let color = Color::from_hex(hex)
                    .ok_or_else(|| MotionError::Config(format!("invalid color '{hex}' for '{name}'")))?;
                state.custom.insert(name.clone(), color);
            }
        }
        Ok(theme)
    }

    pub fn mode(&self) -> ThemeMode {
        self.state.borrow().mode
    }

    /// Switch palettes. Notifies subscribers only if the mode changed.
    pub fn set_mode(&self, mode: ThemeMode) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        };
        if changed {
            debug!(%mode, "theme mode changed");
            self.notify(&ThemeChange {
                mode: Some(mode.as_str().to_string()),
            });
        }
    }

    /// Override one color in both palettes and notify subscribers.
    pub fn set_custom_color(&self, name: &str, color: Color) {
        self.state.borrow_mut().custom.insert(name.to_string(), color);
        self.notify(&ThemeChange::default());
    }

    /// Drop a custom override, falling back to the palette color.
    pub fn clear_custom_color(&self, name: &str) {
        let removed = self.state.borrow_mut().custom.remove(name).is_some();
        if removed {
            self.notify(&ThemeChange::default());
        }
    }

    /// Color for an elevation level, capped at the highest defined level.
    pub fn elevation(&self, level: u32) -> Option<Color> {
        self.color(&format!("elevation_{}", level.min(12)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    // Callbacks run with the list taken out, so they may read colors or
    // subscribe again without a borrow conflict.
    fn notify(&self, change: &ThemeChange) {
        let mut callbacks = std::mem::take(&mut *self.subscribers.borrow_mut());
        for callback in callbacks.iter_mut() {
            callback(change);
        }
        let mut subscribers = self.subscribers.borrow_mut();
        let added = std::mem::replace(&mut *subscribers, callbacks);
        subscribers.extend(added);
    }
}

impl ThemeStore for PaletteTheme {
    fn color(&self, name: &str) -> Option<Color> {
        let state = self.state.borrow();
        state
            .custom
            .get(name)
            .copied()
            .or_else(|| palette_color(state.mode, name))
    }

    fn subscribe(&self, callback: ThemeCallback) {
        self.subscribers.borrow_mut().push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_palettes_resolve() {
        let theme = PaletteTheme::new(ThemeMode::Light);
        assert_eq!(theme.color("primary"), Color::from_hex("#0078d4"));
        assert_eq!(theme.color("overlay").map(|c| c.to_rgba8()), Some([0, 0, 0, 80]));
        assert_eq!(theme.color("nope"), None);

        theme.set_mode(ThemeMode::Dark);
        assert_eq!(theme.color("primary"), Color::from_hex("#60cdff"));
        assert_eq!(theme.elevation(20), Color::from_hex("#464647"));
    }

    #[test]
    fn test_custom_color_overrides_palette() {
        let theme = PaletteTheme::new(ThemeMode::Dark);
        theme.set_custom_color("primary", Color::rgba8(255, 0, 0, 255));
        assert_eq!(theme.color("primary"), Some(Color::rgba8(255, 0, 0, 255)));

        theme.clear_custom_color("primary");
        assert_eq!(theme.color("primary"), Color::from_hex("#60cdff"));
    }

    #[test]
    fn test_notifications() {
        let theme = PaletteTheme::new(ThemeMode::Light);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        theme.subscribe(Box::new(move |change| sink.borrow_mut().push(change.clone())));

        theme.set_mode(ThemeMode::Light);
        theme.set_mode(ThemeMode::Dark);
        theme.set_custom_color("accent", Color::WHITE);

        assert_eq!(
            *seen.borrow(),
            vec![
                ThemeChange {
                    mode: Some("dark".into())
                },
                ThemeChange::default(),
            ]
        );
    }

    #[test]
    fn test_subscribe_during_notification() {
        let theme = Rc::new(PaletteTheme::new(ThemeMode::Light));
        let weak = Rc::downgrade(&theme);
        theme.subscribe(Box::new(move |_| {
            if let Some(theme) = weak.upgrade() {
                theme.subscribe(Box::new(|_| {}));
            }
        }));

        theme.set_mode(ThemeMode::Dark);
        assert_eq!(theme.subscriber_count(), 2);
    }

    #[test]
    fn test_from_config() {
        let mut config = ThemeConfig::default();
        config.mode = "dark".into();
        config.custom_colors.insert("brand".into(), "#ff8800".into());

        let theme = PaletteTheme::from_config(&config).unwrap();
        assert_eq!(theme.mode(), ThemeMode::Dark);
        assert_eq!(theme.color("brand"), Color::from_hex("#ff8800"));

        config.mode = "sepia".into();
        assert!(matches!(PaletteTheme::from_config(&config), Err(MotionError::Config(_))));
    }
}
