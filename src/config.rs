use crate::error::{Error, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.ln.ht";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ENV_API_TOKEN: &str = "LINKHUT_API_TOKEN";
pub const ENV_BASE_URL: &str = "LINKHUT_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "LINKHUT_TIMEOUT_SECS";

/// Runtime configuration resolved from environment and optional config file.
/// Immutable once constructed; the client holds it for its lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_token: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Builds a configuration with an explicit token and defaults for the rest.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves configuration from the environment, falling back to
    /// `<config_dir>/linkhut/config.toml`, then to built-in defaults.
    /// Fails when no non-empty API token can be resolved.
    pub fn load() -> Result<Self> {
        let file_path = config_path();
        let file_config = file_path
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|contents| toml::from_str::<ConfigFile>(&contents))
            .transpose()
            .map_err(|err| Error::InvalidConfig(format!("config parse error: {err}")))?;

        let api_token = std::env::var(ENV_API_TOKEN)
            .ok()
            .or_else(|| file_config.as_ref().and_then(|c| c.api_token.clone()))
            .filter(|v| !v.trim().is_empty())
            .ok_or(Error::MissingToken)?;

        let base_url = std::env::var(ENV_BASE_URL)
            .ok()
            .or_else(|| file_config.as_ref().and_then(|c| c.base_url.clone()))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = match std::env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::InvalidConfig(format!("{ENV_TIMEOUT_SECS} must be an integer: {raw}"))
            })?),
            Err(_) => file_config.as_ref().and_then(|c| c.timeout_secs),
        };

        Ok(Self {
            api_token,
            base_url,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    pub fn redacted_token(&self) -> String {
        redact(&self.api_token)
    }
}

fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("linkhut").join("config.toml"))
}

fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("****{suffix}")
}
