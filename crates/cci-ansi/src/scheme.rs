// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Named color schemes
//!
//! A scheme is a flat table from semantic key (`"Background Color"`,
//! `"Ansi 3 Color"`, ...) to normalized RGB components, shipped as a TOML
//! resource per scheme. Schemes are resolved through a [`SchemeResolver`]
//! that callers construct once and thread through; there is no process-wide
//! scheme state.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use thiserror::Error;

use crate::badge::{action_badge, build_badge, BadgeColor};
use crate::colorize::Palette;
use cci_api_contract::{ActionStatus, BuildStatus};

/// Errors while resolving or parsing scheme definitions.
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("unknown color scheme '{0}'")]
    Unknown(String),
    #[error("failed to read scheme file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scheme '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },
}

/// A normalized RGBA color. Components are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Color { a, ..self }
    }

    /// HSB-style brightness: the largest RGB component.
    pub fn brightness(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Components {
    #[serde(rename = "Red Component")]
    red: f32,
    #[serde(rename = "Green Component")]
    green: f32,
    #[serde(rename = "Blue Component")]
    blue: f32,
}

/// A resolved color scheme.
#[derive(Debug, Clone)]
pub struct ColorScheme {
    name: String,
    table: BTreeMap<String, Components>,
}

impl ColorScheme {
    pub fn from_toml_str(name: &str, source: &str) -> Result<Self, SchemeError> {
        let table: BTreeMap<String, Components> =
            toml::from_str(source).map_err(|source| SchemeError::Parse {
                name: name.to_string(),
                source,
            })?;
        Ok(ColorScheme {
            name: name.to_string(),
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a semantic color by its key stem, e.g. `"Background"`.
    pub fn color(&self, key: &str) -> Option<Color> {
        let c = self.table.get(&format!("{key} Color"))?;
        Some(Color::rgb(c.red, c.green, c.blue))
    }

    /// One of the 16 indexed ANSI slot colors.
    pub fn ansi_color(&self, slot: u8) -> Option<Color> {
        self.color(&format!("Ansi {slot}"))
    }

    pub fn foreground(&self) -> Option<Color> {
        self.color("Foreground")
    }

    pub fn background(&self) -> Option<Color> {
        self.color("Background")
    }

    pub fn bold(&self) -> Option<Color> {
        self.color("Bold")
    }

    pub fn selection(&self) -> Option<Color> {
        self.color("Selection")
    }

    pub fn selected_text(&self) -> Option<Color> {
        self.color("Selected Text")
    }

    pub fn green(&self) -> Option<Color> {
        self.ansi_color(2)
    }

    pub fn red(&self) -> Option<Color> {
        self.ansi_color(1)
    }

    pub fn blue(&self) -> Option<Color> {
        self.ansi_color(4)
    }

    pub fn yellow(&self) -> Option<Color> {
        self.ansi_color(3)
    }

    /// Dimmed foreground used for neutral badges and secondary text.
    pub fn gray(&self) -> Option<Color> {
        self.foreground().map(|c| c.with_alpha(0.4))
    }

    pub fn placeholder(&self) -> Option<Color> {
        self.foreground().map(|c| c.with_alpha(0.2))
    }

    /// Whether the scheme reads as a light theme (background brightness
    /// above 0.5). Schemes without a background count as dark.
    pub fn is_light(&self) -> bool {
        self.background().map(|c| c.brightness() > 0.5).unwrap_or(false)
    }

    fn resolve_badge(&self, badge: BadgeColor) -> Color {
        let fallback = Color::rgb(0.5, 0.5, 0.5);
        match badge {
            BadgeColor::Green => self.green(),
            BadgeColor::Blue => self.blue(),
            BadgeColor::Red => self.red(),
            BadgeColor::Yellow => self.yellow(),
            BadgeColor::Gray => self.gray(),
        }
        .unwrap_or(fallback)
    }

    /// Concrete badge color for a build status.
    pub fn badge_color(&self, status: Option<BuildStatus>) -> Color {
        self.resolve_badge(build_badge(status))
    }

    /// Concrete badge color for an action status.
    pub fn action_color(&self, status: Option<ActionStatus>) -> Color {
        self.resolve_badge(action_badge(status))
    }

    /// Palette handed to the colorizer: the 16 ANSI slots plus the default
    /// foreground. Slots the scheme does not define fall back to the
    /// foreground color.
    pub fn palette(&self) -> Palette {
        let default_fg = self.foreground().unwrap_or(Color::rgb(0.0, 0.0, 1.0));
        let mut slots = [default_fg; 16];
        for (i, slot) in slots.iter_mut().enumerate() {
            if let Some(color) = self.ansi_color(i as u8) {
                *slot = color;
            }
        }
        Palette { slots, default_fg }
    }
}

/// Scheme resources compiled into the binary.
static BUNDLED: &[(&str, &str)] = &[
    ("Github", include_str!("../schemes/Github.toml")),
    ("Solarized Dark", include_str!("../schemes/Solarized Dark.toml")),
    ("Tomorrow Night", include_str!("../schemes/Tomorrow Night.toml")),
];

/// Resolves schemes by name and caches them for its lifetime. Cached entries
/// are immutable; concurrent resolution of the same name is serialized by
/// the cache lock.
#[derive(Debug, Default)]
pub struct SchemeResolver {
    override_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Arc<ColorScheme>>>,
}

impl SchemeResolver {
    pub fn new() -> Self {
        SchemeResolver::default()
    }

    /// Also look for `<name>.toml` files in `dir`, taking precedence over
    /// the bundled schemes.
    pub fn with_override_dir(dir: PathBuf) -> Self {
        SchemeResolver {
            override_dir: Some(dir),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Names of every scheme this resolver can produce, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUNDLED.iter().map(|(n, _)| n.to_string()).collect();
        if let Some(dir) = &self.override_dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e == "toml") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Resolve a scheme by name. The same name always returns the identical
    /// cached value; an unknown name is an error, never a panic.
    pub fn resolve(&self, name: &str) -> Result<Arc<ColorScheme>, SchemeError> {
        let mut cache = self.cache.lock().expect("scheme cache poisoned");
        if let Some(scheme) = cache.get(name) {
            return Ok(Arc::clone(scheme));
        }

        let scheme = Arc::new(self.load(name)?);
        tracing::debug!(scheme = name, "loaded color scheme");
        cache.insert(name.to_string(), Arc::clone(&scheme));
        Ok(scheme)
    }

    fn load(&self, name: &str) -> Result<ColorScheme, SchemeError> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{name}.toml"));
            if path.exists() {
                let source =
                    std::fs::read_to_string(&path).map_err(|source| SchemeError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                return ColorScheme::from_toml_str(name, &source);
            }
        }

        BUNDLED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, source)| ColorScheme::from_toml_str(n, source))
            .unwrap_or_else(|| Err(SchemeError::Unknown(name.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_twice_returns_the_cached_value() {
        let resolver = SchemeResolver::new();
        let first = resolver.resolve("Github").unwrap();
        let second = resolver.resolve("Github").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_scheme_is_an_error_not_a_panic() {
        let resolver = SchemeResolver::new();
        assert!(matches!(
            resolver.resolve("No Such Scheme"),
            Err(SchemeError::Unknown(_))
        ));
    }

    #[test]
    fn bundled_schemes_all_parse_and_carry_core_colors() {
        let resolver = SchemeResolver::new();
        for name in resolver.names() {
            let scheme = resolver.resolve(&name).unwrap();
            assert!(scheme.foreground().is_some(), "{name} foreground");
            assert!(scheme.background().is_some(), "{name} background");
            for slot in 0..16 {
                assert!(scheme.ansi_color(slot).is_some(), "{name} ansi {slot}");
            }
        }
    }

    #[test]
    fn light_and_dark_detection() {
        let resolver = SchemeResolver::new();
        assert!(resolver.resolve("Github").unwrap().is_light());
        assert!(!resolver.resolve("Solarized Dark").unwrap().is_light());
    }

    #[test]
    fn override_dir_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Github.toml"),
            "[\"Foreground Color\"]\n\"Red Component\" = 1.0\n\"Green Component\" = 0.0\n\"Blue Component\" = 0.0\n",
        )
        .unwrap();

        let resolver = SchemeResolver::with_override_dir(dir.path().to_path_buf());
        let scheme = resolver.resolve("Github").unwrap();
        assert_eq!(scheme.foreground(), Some(Color::rgb(1.0, 0.0, 0.0)));
    }

    #[test]
    fn gray_is_dimmed_foreground() {
        let resolver = SchemeResolver::new();
        let scheme = resolver.resolve("Github").unwrap();
        let fg = scheme.foreground().unwrap();
        let gray = scheme.gray().unwrap();
        assert_eq!((gray.r, gray.g, gray.b), (fg.r, fg.g, fg.b));
        assert_eq!(gray.a, 0.4);
    }
}
