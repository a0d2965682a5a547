//! Global configuration management.
//!
//! modmirror keeps user-wide settings in `~/.modmirror/config.toml`: the
//! registry base URL, the default target repository, and credentials. The
//! file is never part of a project checkout; credentials stay out of version
//! control.
//!
//! The location can be overridden with the `MODMIRROR_CONFIG` environment
//! variable (used by the `--config` global CLI flag and by tests).
//!
//! ```toml
//! [registry]
//! url = "https://registry.example/api/go"
//! repo = "go-local"
//! username = "mirror-bot"
//! token = "..."
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::MirrorError;
use crate::registry::RegistryCredentials;
use crate::utils::atomic_write;

/// Registry connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry's Go repository API.
    pub url: Option<String>,
    /// Default target repository name.
    pub repo: Option<String>,
    /// Basic-auth user name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Access token or password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Global user configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Registry connection settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl GlobalConfig {
    /// Load the configuration from its default location, or return defaults
    /// when the file does not exist yet.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path).await
    }

    /// Load from an explicit path when given, the default location
    /// otherwise.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => Self::load().await,
        }
    }

    /// Load the configuration from `path`, or defaults when absent.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).map_err(|e| MirrorError::ConfigError {
            message: format!("invalid config file {}: {e}", path.display()),
        })?;
        Ok(config)
    }

    /// Save to the default location, creating parent directories as needed.
    pub async fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path).await
    }

    /// Save to `path`.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| MirrorError::ConfigError {
            message: format!("failed to serialize config: {e}"),
        })?;
        atomic_write(path, content.as_bytes())
    }

    /// Default config file location.
    ///
    /// `MODMIRROR_CONFIG` overrides; otherwise `~/.modmirror/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("MODMIRROR_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or_else(|| MirrorError::ConfigError {
            message: "could not determine home directory".to_string(),
        })?;
        Ok(home.join(".modmirror").join("config.toml"))
    }

    /// Registry base URL, or [`MirrorError::RegistryNotConfigured`].
    pub fn registry_url(&self) -> Result<&str> {
        self.registry
            .url
            .as_deref()
            .ok_or_else(|| MirrorError::RegistryNotConfigured.into())
    }

    /// Credentials for registry requests.
    pub fn credentials(&self) -> RegistryCredentials {
        RegistryCredentials {
            username: self.registry.username.clone(),
            token: self.registry.token.clone(),
        }
    }
}
