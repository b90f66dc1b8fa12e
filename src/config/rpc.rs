//! RPC environment overrides
//!
//! Environment variables win over the config file:
//!
//! ```bash
//! export WALLET_RPC_PROXY_URL="https://proxy.internal.example"
//! export WALLET_RPC_TIMEOUT_MS=10000
//! ```

use super::Config;
use crate::{Error, Result};

/// Environment variable names
mod env_vars {
    pub const PROXY_URL: &str = "WALLET_RPC_PROXY_URL";
    pub const TIMEOUT_MS: &str = "WALLET_RPC_TIMEOUT_MS";
}

/// RPC settings read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcConfig {
    pub proxy_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl RpcConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let proxy_url = read(env_vars::PROXY_URL);
        if proxy_url.is_some() {
            tracing::debug!("Using {} for the RPC proxy", env_vars::PROXY_URL);
        }

        let timeout_ms = read(env_vars::TIMEOUT_MS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("{}={raw}: {e}", env_vars::TIMEOUT_MS))
                })
            })
            .transpose()?;

        Ok(Self {
            proxy_url,
            timeout_ms,
        })
    }

    /// Layer these settings over `config` and re-validate
    pub fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(url) = &self.proxy_url {
            config.proxy_base_url = url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }
}
