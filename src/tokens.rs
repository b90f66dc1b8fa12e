//! Currencies and amounts
//!
//! Centralizes currency metadata (addresses, decimals, symbols) so the
//! request builder and the CLI agree on how an amount is scaled.

use crate::error::ParseError;
use alloy::primitives::utils::parse_units;
use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A currency the wallet can move
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoCurrency {
    pub symbol: String,
    pub decimals: u8,
    /// Token contract, or the network's gas-token sentinel for native currency
    pub address: Address,
}

impl CryptoCurrency {
    pub fn native(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            address: addresses::NATIVE_SENTINEL,
        }
    }

    pub fn token(symbol: &str, decimals: u8, address: Address) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            address,
        }
    }
}

/// An amount of a currency in base units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    pub currency: CryptoCurrency,
    pub amount: U256,
}

impl Money {
    pub fn new(currency: CryptoCurrency, amount: U256) -> Self {
        Self { currency, amount }
    }

    /// Scale a human amount ("100", "0.5") by the currency decimals
    pub fn from_decimal_str(amount: &str, currency: CryptoCurrency) -> Result<Self, ParseError> {
        let parsed =
            parse_units(amount, currency.decimals).map_err(|e| ParseError::field("amount", e))?;
        Ok(Self {
            amount: parsed.get_absolute(),
            currency,
        })
    }

    pub fn formatted(&self) -> String {
        format_units(self.amount, self.currency.decimals as u32)
    }
}

/// Well-known addresses
pub mod addresses {
    use super::*;

    /// Gas-token sentinel used by most EVM networks
    pub const NATIVE_SENTINEL: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
    /// Polygon exposes its gas token at a system address
    pub const POLYGON_NATIVE: Address = address!("0000000000000000000000000000000000001010");

    // === Ethereum Mainnet ===
    pub const USDC_ETH: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const USDT_ETH: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    pub const DAI_ETH: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    pub const WETH_ETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

    // === Arbitrum ===
    pub const USDC_ARB: Address = address!("af88d065e77c8cc2239327c5edb3a432268e5831");
    pub const USDT_ARB: Address = address!("fd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9");

    // === Optimism ===
    pub const USDC_OPT: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");

    // === Base ===
    pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");

    // === Polygon ===
    pub const USDC_POLYGON: Address = address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359");
}

/// Currency metadata lookups keyed by (chain id, address)
pub struct CurrencyRegistry {
    currencies: HashMap<(u64, Address), CryptoCurrency>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        use crate::network::chain_ids;
        use addresses::*;

        let entries = [
            (chain_ids::ETHEREUM, CryptoCurrency::native("ETH", 18)),
            (chain_ids::ETHEREUM, CryptoCurrency::token("USDC", 6, USDC_ETH)),
            (chain_ids::ETHEREUM, CryptoCurrency::token("USDT", 6, USDT_ETH)),
            (chain_ids::ETHEREUM, CryptoCurrency::token("DAI", 18, DAI_ETH)),
            (chain_ids::ETHEREUM, CryptoCurrency::token("WETH", 18, WETH_ETH)),
            (chain_ids::ARBITRUM, CryptoCurrency::native("ETH", 18)),
            (chain_ids::ARBITRUM, CryptoCurrency::token("USDC", 6, USDC_ARB)),
            (chain_ids::ARBITRUM, CryptoCurrency::token("USDT", 6, USDT_ARB)),
            (chain_ids::OPTIMISM, CryptoCurrency::native("ETH", 18)),
            (chain_ids::OPTIMISM, CryptoCurrency::token("USDC", 6, USDC_OPT)),
            (chain_ids::BASE, CryptoCurrency::native("ETH", 18)),
            (chain_ids::BASE, CryptoCurrency::token("USDC", 6, USDC_BASE)),
            (
                chain_ids::POLYGON,
                CryptoCurrency::token("POL", 18, POLYGON_NATIVE),
            ),
            (
                chain_ids::POLYGON,
                CryptoCurrency::token("USDC", 6, USDC_POLYGON),
            ),
            (chain_ids::BSC, CryptoCurrency::native("BNB", 18)),
            (chain_ids::GNOSIS, CryptoCurrency::native("xDAI", 18)),
            (chain_ids::AVALANCHE, CryptoCurrency::native("AVAX", 18)),
        ];

        let currencies = entries
            .into_iter()
            .map(|(chain_id, currency)| ((chain_id, currency.address), currency))
            .collect();

        Self { currencies }
    }

    pub fn get(&self, chain_id: u64, address: &Address) -> Option<&CryptoCurrency> {
        self.currencies.get(&(chain_id, *address))
    }

    /// Case-insensitive symbol lookup on one chain
    pub fn by_symbol(&self, chain_id: u64, symbol: &str) -> Option<&CryptoCurrency> {
        self.currencies
            .iter()
            .find(|((chain, _), c)| *chain == chain_id && c.symbol.eq_ignore_ascii_case(symbol))
            .map(|(_, c)| c)
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global currency registry (lazy initialized)
static REGISTRY: std::sync::OnceLock<CurrencyRegistry> = std::sync::OnceLock::new();

pub fn registry() -> &'static CurrencyRegistry {
    REGISTRY.get_or_init(CurrencyRegistry::new)
}

/// Format a U256 value with decimals, trimming trailing zeros
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::chain_ids;

    #[test]
    fn test_format_units() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_units(one_eth, 18), "1");

        let one_point_five = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(one_point_five, 18), "1.5");

        let thousand_usdc = U256::from(1_000_000_000u64);
        assert_eq!(format_units(thousand_usdc, 6), "1000");

        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_money_from_decimal_str() {
        let usdc = CryptoCurrency::token("USDC", 6, addresses::USDC_ETH);
        let money = Money::from_decimal_str("100", usdc.clone()).unwrap();
        assert_eq!(money.amount, U256::from(100_000_000u64));
        assert_eq!(money.formatted(), "100");

        let half = Money::from_decimal_str("0.5", usdc).unwrap();
        assert_eq!(half.amount, U256::from(500_000u64));
    }

    #[test]
    fn test_money_rejects_garbage() {
        let usdc = CryptoCurrency::token("USDC", 6, addresses::USDC_ETH);
        assert!(Money::from_decimal_str("ten", usdc).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let reg = registry();
        let usdc = reg.get(chain_ids::ETHEREUM, &addresses::USDC_ETH).unwrap();
        assert_eq!(usdc.symbol, "USDC");
        assert_eq!(usdc.decimals, 6);

        let usdc_arb = reg.by_symbol(chain_ids::ARBITRUM, "usdc").unwrap();
        assert_eq!(usdc_arb.address, addresses::USDC_ARB);

        assert!(reg.get(chain_ids::BASE, &addresses::USDC_ETH).is_none());
    }
}
