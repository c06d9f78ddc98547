use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::proxy::{ProxyOptions, RequestOptions};

/// Lowest port accepted for the default proxy target.
pub const PROXY_PORT_MIN: u16 = 5600;

/// Port used for the default proxy target when none is configured.
pub const DEFAULT_PROXY_PORT: u16 = 5665;

const DEFAULT_CONFIG_PATH: &str = "relay.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Local port the default proxy target listens on. Used to build the
    /// default origin base URL when a caller supplies no options.
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl ProxyConfig {
    /// Base URL of the default proxy target.
    pub fn default_base(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Options for acquiring a handler to the default proxy target.
    pub fn default_options(&self) -> ProxyOptions {
        ProxyOptions::new(self.default_base()).with_request(RequestOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

impl Config {
    /// Load configuration from `path`, or from `relay.yaml` in the working
    /// directory if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::read_file(fallback)
                } else {
                    let cfg = Self::default();
                    cfg.validate()?;
                    Ok(cfg)
                }
            }
        }
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("failed to parse YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen_addr.is_empty() {
            anyhow::bail!("server.listen_addr must not be empty");
        }

        if self.proxy.port < PROXY_PORT_MIN {
            anyhow::bail!(
                "proxy.port {} out of range ({}-65535)",
                self.proxy.port,
                PROXY_PORT_MIN
            );
        }

        if self.proxy.connect_timeout_secs == 0 {
            anyhow::bail!("proxy.connect_timeout_secs must be > 0");
        }

        if self.proxy.request_timeout_secs == 0 {
            anyhow::bail!("proxy.request_timeout_secs must be > 0");
        }

        Ok(())
    }
}
