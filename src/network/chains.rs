//! Catalog of networks the wallet ships with

use super::{ChainId, Network, PredefinedNetwork, TestNetwork, TrxType};
use crate::tokens::{addresses, CryptoCurrency};
use serde::{Deserialize, Serialize};

/// Chain ID constants
pub mod chain_ids {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
    pub const POLYGON: u64 = 137;
    pub const BSC: u64 = 56;
    pub const GNOSIS: u64 = 100;
    pub const AVALANCHE: u64 = 43114;

    pub const ETHEREUM_SEPOLIA: u64 = 11155111;
    pub const ARBITRUM_SEPOLIA: u64 = 421614;
    pub const OPTIMISM_SEPOLIA: u64 = 11155420;
    pub const BASE_SEPOLIA: u64 = 84532;
    pub const POLYGON_AMOY: u64 = 80002;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredefinedNetworkName {
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
    Polygon,
    BSC,
    Gnosis,
    Avalanche,
}

impl PredefinedNetworkName {
    pub const ALL: [PredefinedNetworkName; 8] = [
        Self::Ethereum,
        Self::Arbitrum,
        Self::Optimism,
        Self::Base,
        Self::Polygon,
        Self::BSC,
        Self::Gnosis,
        Self::Avalanche,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Arbitrum => "Arbitrum",
            Self::Optimism => "Optimism",
            Self::Base => "Base",
            Self::Polygon => "Polygon",
            Self::BSC => "BSC",
            Self::Gnosis => "Gnosis",
            Self::Avalanche => "Avalanche",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Ethereum => chain_ids::ETHEREUM,
            Self::Arbitrum => chain_ids::ARBITRUM,
            Self::Optimism => chain_ids::OPTIMISM,
            Self::Base => chain_ids::BASE,
            Self::Polygon => chain_ids::POLYGON,
            Self::BSC => chain_ids::BSC,
            Self::Gnosis => chain_ids::GNOSIS,
            Self::Avalanche => chain_ids::AVALANCHE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestNetworkName {
    EthereumSepolia,
    ArbitrumSepolia,
    OptimismSepolia,
    BaseSepolia,
    PolygonAmoy,
}

impl TestNetworkName {
    pub const ALL: [TestNetworkName; 5] = [
        Self::EthereumSepolia,
        Self::ArbitrumSepolia,
        Self::OptimismSepolia,
        Self::BaseSepolia,
        Self::PolygonAmoy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EthereumSepolia => "EthereumSepolia",
            Self::ArbitrumSepolia => "ArbitrumSepolia",
            Self::OptimismSepolia => "OptimismSepolia",
            Self::BaseSepolia => "BaseSepolia",
            Self::PolygonAmoy => "PolygonAmoy",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::EthereumSepolia => chain_ids::ETHEREUM_SEPOLIA,
            Self::ArbitrumSepolia => chain_ids::ARBITRUM_SEPOLIA,
            Self::OptimismSepolia => chain_ids::OPTIMISM_SEPOLIA,
            Self::BaseSepolia => chain_ids::BASE_SEPOLIA,
            Self::PolygonAmoy => chain_ids::POLYGON_AMOY,
        }
    }
}

impl Network {
    pub fn predefined(name: PredefinedNetworkName) -> Self {
        let (gas_token_address, trx_type) = match name {
            PredefinedNetworkName::Polygon => (addresses::POLYGON_NATIVE, TrxType::Eip1559),
            PredefinedNetworkName::BSC => (addresses::NATIVE_SENTINEL, TrxType::Legacy),
            PredefinedNetworkName::Ethereum
            | PredefinedNetworkName::Arbitrum
            | PredefinedNetworkName::Optimism
            | PredefinedNetworkName::Base
            | PredefinedNetworkName::Gnosis
            | PredefinedNetworkName::Avalanche => (addresses::NATIVE_SENTINEL, TrxType::Eip1559),
        };

        Network::Predefined(PredefinedNetwork {
            name,
            hex_chain_id: ChainId(name.chain_id()),
            gas_token_address,
            trx_type,
            is_zeal_rpc_supported: true,
        })
    }

    pub fn testnet(name: TestNetworkName) -> Self {
        let native_currency = match name {
            TestNetworkName::PolygonAmoy => CryptoCurrency::native("POL", 18),
            TestNetworkName::EthereumSepolia
            | TestNetworkName::ArbitrumSepolia
            | TestNetworkName::OptimismSepolia
            | TestNetworkName::BaseSepolia => CryptoCurrency::native("ETH", 18),
        };

        Network::Testnet(TestNetwork {
            name,
            hex_chain_id: ChainId(name.chain_id()),
            native_currency,
            trx_type: TrxType::Eip1559,
        })
    }

    /// Look up a catalog network by name or alias (case-insensitive)
    pub fn from_catalog(name: &str) -> Option<Self> {
        let lowered = name.to_lowercase();
        let alias = match lowered.as_str() {
            "mainnet" => "ethereum",
            "sepolia" => "ethereumsepolia",
            "bnb" => "bsc",
            "matic" => "polygon",
            other => other,
        };

        if let Some(predefined) = PredefinedNetworkName::ALL
            .iter()
            .find(|n| n.as_str().to_lowercase() == alias)
        {
            return Some(Self::predefined(*predefined));
        }

        TestNetworkName::ALL
            .iter()
            .find(|n| n.as_str().to_lowercase() == alias)
            .map(|n| Self::testnet(*n))
    }
}
