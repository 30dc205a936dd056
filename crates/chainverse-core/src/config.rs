//! Application configuration management.
//!
//! Configuration is stored at `~/.config/chainverse/config.json` and can be
//! overridden from the environment (a `.env` file is honoured by the binary):
//!
//! - `CHAINVERSE_ENV`: `production` or `development`
//! - `II_URL`: identity provider URL
//! - `CANISTER_ID_NFT_CANISTER`: address of the NFT canister
//! - `IC_HOST`: network endpoint the agent talks to
//! - `IC_ROOT_KEY`: hex encoded root key (production only)
//! - `CHAINVERSE_STORAGE`: `file` or `keyring`

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "chainverse";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Local replica identity provider, used when nothing else is configured.
pub const DEFAULT_IDENTITY_PROVIDER_URL: &str =
    "http://localhost:8000/?canisterId=rdmx6-jaaaa-aaaaa-aaadq-cai";

const DEFAULT_DEVELOPMENT_HOST: &str = "http://localhost:8000";
const DEFAULT_PRODUCTION_HOST: &str = "https://icp-api.io";

const ENV_DEPLOYMENT: &str = "CHAINVERSE_ENV";
const ENV_IDENTITY_PROVIDER: &str = "II_URL";
const ENV_CANISTER_ID: &str = "CANISTER_ID_NFT_CANISTER";
const ENV_HOST: &str = "IC_HOST";
const ENV_ROOT_KEY: &str = "IC_ROOT_KEY";
const ENV_STORAGE: &str = "CHAINVERSE_STORAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl DeploymentMode {
    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeploymentMode::Production => "production",
            DeploymentMode::Development => "development",
        }
    }

    /// Anything other than an explicit "production" is treated as development.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            DeploymentMode::Production
        } else {
            DeploymentMode::Development
        }
    }
}

/// Where the delegated identity is kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(StorageBackend::File),
            "keyring" => Some(StorageBackend::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub deployment: DeploymentMode,
    pub identity_provider_url: Option<String>,
    pub canister_id: Option<String>,
    pub host: Option<String>,
    pub root_key: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
}

impl Config {
    /// Load the config file (defaults when missing) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        debug!(deployment = ?config.deployment, canister_id = ?config.canister_id, "Config loaded");
        Ok(config)
    }

    /// Write a default config file on first run so there is something to edit.
    pub fn ensure_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save()?;
            debug!(path = %path.display(), "Wrote default config");
        }
        Ok(path)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(mode) = get(ENV_DEPLOYMENT) {
            self.deployment = DeploymentMode::parse(&mode);
        }
        if let Some(url) = get(ENV_IDENTITY_PROVIDER) {
            self.identity_provider_url = Some(url);
        }
        if let Some(id) = get(ENV_CANISTER_ID) {
            self.canister_id = Some(id);
        }
        if let Some(host) = get(ENV_HOST) {
            self.host = Some(host);
        }
        if let Some(key) = get(ENV_ROOT_KEY) {
            self.root_key = Some(key);
        }
        if let Some(storage) = get(ENV_STORAGE).and_then(|s| StorageBackend::parse(&s)) {
            self.storage = storage;
        }
    }

    pub fn identity_provider_url(&self) -> &str {
        self.identity_provider_url
            .as_deref()
            .unwrap_or(DEFAULT_IDENTITY_PROVIDER_URL)
    }

    pub fn host(&self) -> &str {
        match self.host.as_deref() {
            Some(host) => host,
            None if self.deployment.is_production() => DEFAULT_PRODUCTION_HOST,
            None => DEFAULT_DEVELOPMENT_HOST,
        }
    }

    /// The canister address, required before any actor can be bound.
    pub fn canister_id(&self) -> Result<&str> {
        self.canister_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{} is not set", ENV_CANISTER_ID))
    }

    /// Decode the configured root key, if any.
    pub fn root_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.root_key
            .as_deref()
            .map(|key| hex::decode(key.trim()).context("IC_ROOT_KEY is not valid hex"))
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        self.canister_id()?;
        self.root_key_bytes()?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
