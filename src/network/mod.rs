//! Networks and per-network RPC routes
//!
//! A [`Network`] is an immutable snapshot handed in by the storage layer.
//! The [`NetworkRpcRoute`] next to it decides where JSON-RPC traffic goes.

mod chains;

pub use chains::{chain_ids, PredefinedNetworkName, TestNetworkName};

use crate::error::ParseError;
use crate::tokens::CryptoCurrency;
use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

/// EVM chain id, carried as `0x`-prefixed hex on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn from_hex(value: &str) -> Result<Self, ParseError> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| ParseError::field("hexChainId", format!("missing 0x prefix: {value}")))?;
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| ParseError::field("hexChainId", e))
    }

    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Decimal form used in EIP-712 domains
    pub fn to_decimal(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Transaction envelope a network expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrxType {
    Legacy,
    Eip1559,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredefinedNetwork {
    pub name: PredefinedNetworkName,
    pub hex_chain_id: ChainId,
    /// Sentinel address standing in for the gas token in currency lists
    pub gas_token_address: Address,
    pub trx_type: TrxType,
    pub is_zeal_rpc_supported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNetwork {
    pub name: String,
    pub hex_chain_id: ChainId,
    pub default_rpc_url: Url,
    pub rpc_url: Url,
    pub trx_type: TrxType,
    pub native_currency: CryptoCurrency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNetwork {
    pub name: TestNetworkName,
    pub hex_chain_id: ChainId,
    pub native_currency: CryptoCurrency,
    pub trx_type: TrxType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Network {
    Predefined(PredefinedNetwork),
    Custom(CustomNetwork),
    Testnet(TestNetwork),
}

impl Network {
    pub fn chain_id(&self) -> ChainId {
        match self {
            Network::Predefined(n) => n.hex_chain_id,
            Network::Custom(n) => n.hex_chain_id,
            Network::Testnet(n) => n.hex_chain_id,
        }
    }

    pub fn trx_type(&self) -> TrxType {
        match self {
            Network::Predefined(n) => n.trx_type,
            Network::Custom(n) => n.trx_type,
            Network::Testnet(n) => n.trx_type,
        }
    }

    /// Address a currency must carry to be treated as the network's gas token
    pub fn gas_token_address(&self) -> Address {
        match self {
            Network::Predefined(n) => n.gas_token_address,
            Network::Custom(n) => n.native_currency.address,
            Network::Testnet(n) => n.native_currency.address,
        }
    }

    /// Routing parameter for the managed proxy. Custom networks have none.
    pub fn proxy_name(&self) -> Option<&'static str> {
        match self {
            Network::Predefined(n) => Some(n.name.as_str()),
            Network::Testnet(n) => Some(n.name.as_str()),
            Network::Custom(_) => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Network::Predefined(n) => n.name.as_str(),
            Network::Testnet(n) => n.name.as_str(),
            Network::Custom(n) => &n.name,
        }
    }
}

/// Which endpoint the user picked for a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "url")]
pub enum RpcSelection {
    #[default]
    Default,
    Custom(Url),
}

/// Per-network endpoint choice
///
/// Only `current` drives routing; `available` is kept for the settings
/// screen and is not consulted for failover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NetworkRpcRoute {
    pub current: RpcSelection,
    #[serde(default)]
    pub available: Vec<Url>,
}

impl NetworkRpcRoute {
    pub fn custom(url: Url) -> Self {
        Self {
            current: RpcSelection::Custom(url.clone()),
            available: vec![url],
        }
    }
}
