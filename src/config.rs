use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::paths;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted, in order, for the suggestion credential
/// when the config file has none.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

/// Override for where the list store lives. Absent means the built-in
/// default under the state directory.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Office name used in the suggestion prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SuggestConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// The credential from the config file, else from the environment.
    /// Blank values count as absent.
    pub fn api_key(&self) -> Option<String> {
        let present = |key: &String| !key.trim().is_empty();
        self.api_key.clone().filter(present).or_else(|| {
            API_KEY_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(present))
        })
    }
}

impl Config {
    /// Load config from the default location (`~/.docket/config.toml`).
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(store) = &self.store.path {
            if store.trim().is_empty() {
                bail!("failed to parse {}: store.path must not be empty", path.display());
            }
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Where the store lives: the command line (or `DOCKET_DB`) first, then
    /// the config override, then the built-in default.
    pub fn db_path(&self, cli_db: Option<String>) -> Result<String> {
        if let Some(p) = cli_db {
            return Ok(p);
        }
        if let Some(p) = &self.store.path {
            info!("using store override {p}");
            return Ok(p.clone());
        }
        let path = paths::default_db_path();
        Ok(path
            .to_str()
            .context("default DB path is not valid UTF-8")?
            .to_string())
    }

    /// Record a store override in the config file at `path`, keeping the
    /// other settings. Takes effect on the next start.
    pub fn set_store_override(path: &Path, store_path: &str) -> Result<()> {
        if store_path.trim().is_empty() {
            bail!("store path must not be empty");
        }
        let mut config = Self::load_from(path)?;
        config.store.path = Some(store_path.to_string());
        config.save_to(path)
    }

    /// Remove the store override, returning to the built-in default.
    pub fn clear_store_override(path: &Path) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.store.path = None;
        config.save_to(path)
    }
}
