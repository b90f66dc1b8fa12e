//! Configuration for the transaction-signing core

pub mod rpc;

use crate::submission::PollConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub use rpc::RpcConfig;

/// Wallet RPC proxy used for networks routed through the default endpoint
pub const DEFAULT_PROXY_BASE_URL: &str = "https://rpc.zeal.app";

fn default_proxy_base_url() -> String {
    DEFAULT_PROXY_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_hardware_timeout_ms() -> u64 {
    120_000
}

fn default_min_confirmations() -> u64 {
    1
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the wallet RPC proxy
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,
    /// Per-request HTTP timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Confirmation polling interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long to wait for a hardware wallet to answer (milliseconds)
    #[serde(default = "default_hardware_timeout_ms")]
    pub hardware_timeout_ms: u64,
    /// Confirmations before a successful receipt counts as completed
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_base_url: default_proxy_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            hardware_timeout_ms: default_hardware_timeout_ms(),
            min_confirmations: default_min_confirmations(),
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.proxy_url()?;
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.min_confirmations == 0 {
            return Err(Error::Config(
                "min_confirmations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn proxy_url(&self) -> Result<Url> {
        Url::parse(&self.proxy_base_url)
            .map_err(|e| Error::Config(format!("proxy_base_url {}: {e}", self.proxy_base_url)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn hardware_timeout(&self) -> Duration {
        Duration::from_millis(self.hardware_timeout_ms)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            min_confirmations: self.min_confirmations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: Config = serde_json::from_value(serde_json::json!({
            "min_confirmations": 3
        }))
        .expect("parse config");
        assert_eq!(parsed.min_confirmations, 3);
        assert_eq!(parsed.poll_interval_ms, 1_000);
        assert_eq!(parsed.proxy_url().unwrap().as_str(), "https://rpc.zeal.app/");
    }

    #[test]
    fn poll_config_uses_interval_and_confirmations() {
        let config = Config {
            poll_interval_ms: 250,
            min_confirmations: 2,
            ..Config::default()
        };
        assert_eq!(
            config.poll_config(),
            PollConfig {
                interval: Duration::from_millis(250),
                min_confirmations: 2,
            }
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "proxy_base_url": "https://proxy.example/", "request_timeout_ms": 5000 }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.proxy_url().unwrap().as_str(), "https://proxy.example/");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.hardware_timeout_ms, 120_000);
    }

    #[test]
    fn rejects_zero_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "poll_interval_ms": 0 }}"#).unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_unparseable_proxy() {
        let config = Config {
            proxy_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("absent.json")));
    }
}
