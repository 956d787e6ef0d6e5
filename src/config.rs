// ABOUTME: Configuration loading for the API endpoint and terminal close/resize policy
// Reads ~/.config/podterm/config.toml; command-line flags override file values

use crate::terminal::{ApiEndpoint, AttachmentOptions, EndpointError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api.scheme must be ws or wss, got {0}")]
    InvalidScheme(String),

    #[error("api.host must not be empty")]
    EmptyHost,

    #[error("api.namespace must not be empty")]
    EmptyNamespace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Stream scheme, `ws` or `wss`
    pub scheme: String,
    /// Host (and port) of the UI server
    pub host: String,
    pub kube_context: Option<String>,
    pub namespace: String,
    /// Sent as a bearer token on resize requests
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub close_on_connection_lost: bool,
    /// 0 disables the delayed close
    pub close_delay_ms: u64,
    pub remote_resize: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            scheme: "ws".to_string(),
            host: "localhost:8090".to_string(),
            kube_context: None,
            namespace: "default".to_string(),
            auth_token: None,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            close_on_connection_lost: true,
            close_delay_ms: 0,
            remote_resize: true,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podterm")
            .join("config.toml")
    }

    /// Load from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.scheme != "ws" && self.api.scheme != "wss" {
            return Err(ConfigError::InvalidScheme(self.api.scheme.clone()));
        }
        if self.api.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.api.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Result<ApiEndpoint, EndpointError> {
        Ok(ApiEndpoint::new(&self.api.scheme, &self.api.host)?
            .with_context(self.api.kube_context.clone()))
    }

    pub fn attachment_options(&self) -> AttachmentOptions {
        AttachmentOptions {
            close_on_connection_lost: self.terminal.close_on_connection_lost,
            close_delay: (self.terminal.close_delay_ms > 0)
                .then(|| Duration::from_millis(self.terminal.close_delay_ms)),
            remote_resize: self.terminal.remote_resize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nnamespace = \"staging\"\n\n[terminal]\nclose_delay_ms = 3000\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.namespace, "staging");
        assert_eq!(config.api.host, "localhost:8090");
        assert_eq!(
            config.attachment_options().close_delay,
            Some(Duration::from_secs(3))
        );
        assert!(config.attachment_options().close_on_connection_lost);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.api.kube_context = Some("minikube".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid_scheme() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nscheme = \"http\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_delay_disables_delayed_close() {
        assert_eq!(Config::default().attachment_options().close_delay, None);
    }

    #[test]
    fn test_endpoint_carries_context() {
        let mut config = Config::default();
        config.api.kube_context = Some("kind".to_string());
        assert_eq!(config.endpoint().unwrap().kube_context(), Some("kind"));
    }
}
