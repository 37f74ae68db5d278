// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Persisted user settings: the API token and the chosen color scheme

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEME: &str = "Github";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_scheme")]
    pub color_scheme: String,
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_token: None,
            color_scheme: default_scheme(),
        }
    }
}

impl Settings {
    /// Default location: `<config dir>/cci/settings.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("no user config directory")?;
        Ok(dir.join("cci").join("settings.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing settings file {}", path.display()))?;
        Ok(())
    }
}

/// CircleCI personal API tokens are 40 lowercase hex characters.
pub fn is_valid_token(token: &str) -> bool {
    token.len() == 40
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
