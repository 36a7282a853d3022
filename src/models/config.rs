//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::is_http_url;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Portal origin used for deep-link synthesis
    #[serde(default)]
    pub portal: PortalConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Deferred bootstrap run settings
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.portal.base_url) {
            return Err(AppError::validation(format!(
                "portal.base_url is not a valid http(s) URL: {}",
                self.portal.base_url
            )));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Portal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Origin of the academic portal, without trailing slash
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for outbound requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Deferred bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Delay before the bootstrap evaluation fires, in milliseconds
    #[serde(default = "defaults::bootstrap_delay")]
    pub delay_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            delay_ms: defaults::bootstrap_delay(),
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "https://mentari.unpam.ac.id".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; MentariNotifier/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn bootstrap_delay() -> u64 {
        2000
    }
}
