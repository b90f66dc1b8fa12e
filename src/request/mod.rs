//! JSON-RPC requests
//!
//! A [`RawRequest`] is built once per user action, consumed by the signer or
//! the transport, and discarded. Its `id` is the only thing a response is
//! matched against.

pub mod builder;
pub mod typed_data;

pub use builder::{FeeParams, TransactionPreparation};
pub use typed_data::TypedDataEnvelope;

use crate::error::ParseError;
use alloy::hex;
use alloy::primitives::{Address, Bytes, U128, U256, U64};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names the core produces or inspects
pub mod methods {
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ETH_SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";
    pub const PERSONAL_SIGN: &str = "personal_sign";
    pub const ETH_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";
    pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    pub const ETH_GET_TRANSACTION_BY_HASH: &str = "eth_getTransactionByHash";
    pub const ETH_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
    pub const ETH_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
    pub const ETH_BLOCK_NUMBER: &str = "eth_blockNumber";
    pub const ETH_CALL: &str = "eth_call";
    pub const ETH_GET_CODE: &str = "eth_getCode";
    pub const ETH_ESTIMATE_GAS: &str = "eth_estimateGas";
    pub const ETH_GAS_PRICE: &str = "eth_gasPrice";
    pub const ETH_MAX_PRIORITY_FEE_PER_GAS: &str = "eth_maxPriorityFeePerGas";
    pub const DEBUG_TRACE_TRANSACTION: &str = "debug_traceTransaction";
}

/// Requests that need a key to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMethod {
    SendTransaction,
    SignTypedDataV4,
    PersonalSign,
}

impl SigningMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningMethod::SendTransaction => methods::ETH_SEND_TRANSACTION,
            SigningMethod::SignTypedDataV4 => methods::ETH_SIGN_TYPED_DATA_V4,
            SigningMethod::PersonalSign => methods::PERSONAL_SIGN,
        }
    }
}

/// Random request id within the JSON-safe integer range.
///
/// Ids are uncoordinated: two requests may collide. Responses are still
/// checked against the id of the request that produced them.
pub fn generate_request_id() -> u64 {
    rand::thread_rng().gen_range(0..(1u64 << 53))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl RawRequest {
    pub fn new(method: &str, params: Vec<Value>) -> Self {
        Self {
            id: generate_request_id(),
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }

    pub fn signing_method(&self) -> Option<SigningMethod> {
        match self.method.as_str() {
            methods::ETH_SEND_TRANSACTION => Some(SigningMethod::SendTransaction),
            methods::ETH_SIGN_TYPED_DATA_V4 => Some(SigningMethod::SignTypedDataV4),
            methods::PERSONAL_SIGN => Some(SigningMethod::PersonalSign),
            _ => None,
        }
    }

    fn param(&self, index: usize) -> Result<&Value, ParseError> {
        self.params
            .get(index)
            .ok_or_else(|| self.params_error(format!("missing param #{index}")))
    }

    fn params_error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::RequestParams {
            method: self.method.clone(),
            reason: reason.into(),
        }
    }

    /// First param of `eth_sendTransaction`
    pub fn transaction_params(&self) -> Result<TransactionParams, ParseError> {
        serde_json::from_value(self.param(0)?.clone()).map_err(|e| self.params_error(e.to_string()))
    }

    /// `personal_sign` carries `[message, address]`; hex messages are raw bytes
    pub fn personal_message(&self) -> Result<(Bytes, Address), ParseError> {
        let message = self
            .param(0)?
            .as_str()
            .ok_or_else(|| self.params_error("message must be a string"))?;
        let address: Address = serde_json::from_value(self.param(1)?.clone())
            .map_err(|e| self.params_error(e.to_string()))?;

        let bytes = match message.strip_prefix("0x") {
            Some(digits) => match hex::decode(digits) {
                Ok(decoded) => Bytes::from(decoded),
                Err(_) => Bytes::copy_from_slice(message.as_bytes()),
            },
            None => Bytes::copy_from_slice(message.as_bytes()),
        };
        Ok((bytes, address))
    }

    /// `eth_signTypedData_v4` carries `[address, typedData]`
    pub fn typed_data_params(&self) -> Result<(Address, TypedDataEnvelope), ParseError> {
        let address: Address = serde_json::from_value(self.param(0)?.clone())
            .map_err(|e| self.params_error(e.to_string()))?;
        let envelope = typed_data::normalize_param(self.param(1)?)?;
        Ok((address, envelope))
    }
}

/// Transaction object of `eth_sendTransaction`
///
/// Quantities are hex on the wire. `nonce`, `gas` and the fee fields are
/// optional here and required at signing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U128>,
}

impl TransactionParams {
    /// Calldata; both `""` and `"0x"` mean none
    pub fn input(&self) -> Result<Bytes, ParseError> {
        match self.data.as_deref() {
            None | Some("") | Some("0x") => Ok(Bytes::new()),
            Some(data) => hex::decode(data.strip_prefix("0x").unwrap_or(data))
                .map(Bytes::from)
                .map_err(|e| ParseError::field("data", e)),
        }
    }
}
