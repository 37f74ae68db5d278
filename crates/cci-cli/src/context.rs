// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Application context threaded through every command
//!
//! Built once at startup from the persisted settings. Components that need
//! the token or color resolution receive them from here; there is no
//! ambient global state.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::settings::Settings;
use cci_ansi::SchemeResolver;
use cci_local_store::Store;
use cci_rest_client::CircleClient;

pub struct AppContext {
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub client: CircleClient,
    pub store: Store,
    pub schemes: SchemeResolver,
}

impl AppContext {
    /// Load settings, open the cache database and construct the client.
    /// `token_override` wins over the stored token for this invocation.
    pub fn init(token_override: Option<String>) -> Result<Self> {
        let settings_path = Settings::default_path()?;
        let settings = Settings::load(&settings_path)?;

        let token = token_override.or_else(|| settings.api_token.clone());
        let client = CircleClient::new(token);

        let cache_dir = dirs::data_dir()
            .context("no user data directory")?
            .join("cci");
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("creating {}", cache_dir.display()))?;
        let store = Store::open(&cache_dir.join("cache.db"))?;

        Ok(AppContext {
            settings,
            settings_path,
            client,
            store,
            schemes: SchemeResolver::new(),
        })
    }

    /// The palette for the currently selected scheme.
    pub fn current_scheme(&self) -> Result<std::sync::Arc<cci_ansi::ColorScheme>> {
        Ok(self.schemes.resolve(&self.settings.color_scheme)?)
    }
}
