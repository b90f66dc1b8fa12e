//! Builds [`RawRequest`]s from typed intents
//!
//! Builders only shape requests. They never sign or submit.

use super::{methods, RawRequest, TransactionParams};
use crate::error::ParseError;
use crate::network::Network;
use crate::tokens::Money;
use alloy::hex;
use alloy::primitives::{Address, U128, U256, U64};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
    function approve(address spender, uint256 amount) external returns (bool);
}

/// Fee fields matching the network's transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeParams {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

/// Everything a transaction needs besides the intent itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPreparation {
    pub nonce: u64,
    pub gas_limit: u64,
    pub fee: FeeParams,
}

fn hex_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

fn send_transaction(params: TransactionParams) -> RawRequest {
    // Addresses, hex quantities and strings always serialize to a `Value`
    RawRequest::new(
        methods::ETH_SEND_TRANSACTION,
        vec![serde_json::to_value(params).unwrap_or(Value::Null)],
    )
}

/// Plain value transfer: `{to, value, data: ""}`
pub fn native_transfer(from: Address, to: Address, amount: U256) -> RawRequest {
    RawRequest::new(
        methods::ETH_SEND_TRANSACTION,
        vec![json!({
            "from": from,
            "to": to,
            "value": hex_quantity(amount),
            "data": "",
        })],
    )
}

/// Transfer of any currency on `network`
///
/// A currency whose address is the network's gas-token sentinel moves as a
/// native transfer; anything else is an ERC-20 `transfer` call on the token
/// contract.
pub fn transfer(network: &Network, from: Address, to: Address, money: &Money) -> RawRequest {
    if money.currency.address == network.gas_token_address() {
        return native_transfer(from, to, money.amount);
    }

    let call = transferCall {
        to,
        amount: money.amount,
    };
    send_transaction(TransactionParams {
        from,
        to: Some(money.currency.address),
        data: Some(hex::encode_prefixed(call.abi_encode())),
        ..Default::default()
    })
}

/// ERC-20 `approve(spender, amount)` on the token contract
pub fn approve(from: Address, spender: Address, money: &Money) -> RawRequest {
    let call = approveCall {
        spender,
        amount: money.amount,
    };
    send_transaction(TransactionParams {
        from,
        to: Some(money.currency.address),
        data: Some(hex::encode_prefixed(call.abi_encode())),
        ..Default::default()
    })
}

/// `eth_signTypedData_v4` with the typed data serialized as a JSON string,
/// the way dApps send it
pub fn sign_typed_data(address: Address, typed_data: &Value) -> RawRequest {
    RawRequest::new(
        methods::ETH_SIGN_TYPED_DATA_V4,
        vec![json!(address), Value::String(typed_data.to_string())],
    )
}

pub fn personal_sign(address: Address, message: &str) -> RawRequest {
    RawRequest::new(methods::PERSONAL_SIGN, vec![json!(message), json!(address)])
}

/// Attach nonce, gas and fees to an `eth_sendTransaction` request
///
/// The returned request keeps the original id.
pub fn with_preparation(
    request: &RawRequest,
    preparation: &TransactionPreparation,
) -> Result<RawRequest, ParseError> {
    let mut params = request.transaction_params()?;
    params.nonce = Some(U64::from(preparation.nonce));
    params.gas = Some(U64::from(preparation.gas_limit));

    match preparation.fee {
        FeeParams::Legacy { gas_price } => {
            params.gas_price = Some(U128::from(gas_price));
            params.max_fee_per_gas = None;
            params.max_priority_fee_per_gas = None;
        }
        FeeParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            params.gas_price = None;
            params.max_fee_per_gas = Some(U128::from(max_fee_per_gas));
            params.max_priority_fee_per_gas = Some(U128::from(max_priority_fee_per_gas));
        }
    }

    let mut prepared = request.clone();
    prepared.params = vec![serde_json::to_value(params)
        .map_err(|e| ParseError::field("transaction", e))?];
    Ok(prepared)
}
