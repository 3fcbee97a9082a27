//! Configuration loading
//!
//! One `Config` is built at startup and passed to constructors; handlers
//! never read the environment themselves. Values come from an optional
//! `config.yaml`, then environment variables override the file.

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub baas: BaasConfig,
    /// Externally reachable callback URL. The provider envelope is fixed, so
    /// this never rides on the wire; it is registered with the provider out
    /// of band and printed at startup as the operator's reminder.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaasConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BaasConfig {
    fn default() -> Self {
        BaasConfig {
            base_url: "https://blockapi.co.za/api/v1".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read config file: {}", err),
            ConfigError::Parse(err) => write!(f, "Failed to parse config file: {}", err),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Load configuration from `path` when it exists, else defaults, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)?;
        serde_yaml::from_str::<Config>(&raw)?
    } else {
        Config::default()
    };
    config.apply_env_from(|name| env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Overrides matching the deployment surface: `BLOCKAPI_BASE_URL`,
    /// `BLOCKAPI_API_KEY`, `WEBHOOK_URL`, `HOST`, `PORT`.
    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(base_url) = get("BLOCKAPI_BASE_URL") {
            self.baas.base_url = base_url;
        }
        if let Some(api_key) = get("BLOCKAPI_API_KEY") {
            self.baas.api_key = Some(api_key);
        }
        if let Some(webhook_url) = get("WEBHOOK_URL") {
            self.webhook_url = Some(webhook_url);
        }
        if let Some(host) = get("HOST") {
            self.api.host = host;
        }
        if let Some(port) = get("PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {}", port)))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.baas.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("baas.base_url must not be empty".to_string()));
        }
        if self.baas.timeout_secs == 0 {
            return Err(ConfigError::Invalid("baas.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.api.host, self.api.port)
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("api.host is not an address: {}", self.api.host)))
    }
}
