//! Safe (multisig) message wrapping
//!
//! A Safe does not sign a request itself. The hash of the original payload
//! is wrapped in the Safe's `SafeMessage` typed data, bound to the Safe
//! contract and chain, and that is what the owner key signs.

use super::{ensure_address, SigningError};
use crate::keystore::SafeCredential;
use crate::network::Network;
use crate::request::{methods, RawRequest, SigningMethod, TypedDataEnvelope};
use alloy::primitives::{eip191_hash_message, Address, B256};
use serde_json::{json, Value};

pub const SAFE_MESSAGE_TYPE: &str = "SafeMessage";

/// Hash of the payload the dApp asked the Safe to sign
///
/// `personal_sign` messages use the EIP-191 hash; typed data uses its
/// EIP-712 signing hash. The request must be addressed to `safe`.
pub fn original_payload_hash(request: &RawRequest, safe: Address) -> Result<B256, SigningError> {
    match request.signing_method() {
        Some(SigningMethod::PersonalSign) => {
            let (message, address) = request.personal_message()?;
            ensure_address(safe, address)?;
            Ok(eip191_hash_message(&message))
        }
        Some(SigningMethod::SignTypedDataV4) => {
            let (address, typed_data) = request.typed_data_params()?;
            ensure_address(safe, address)?;
            Ok(typed_data.signing_hash()?)
        }
        Some(SigningMethod::SendTransaction) | None => Err(SigningError::UnsupportedRequest {
            keystore: "safe_multisig",
            method: request.method.clone(),
        }),
    }
}

/// `SafeMessage{message: bytes}` over `hash`, for Safe `safe` on `network`
pub fn safe_message_typed_data(network: &Network, safe: Address, hash: B256) -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "SafeMessage": [
                { "name": "message", "type": "bytes" }
            ]
        },
        "primaryType": SAFE_MESSAGE_TYPE,
        "domain": {
            "chainId": network.chain_id().0,
            "verifyingContract": safe
        },
        "message": {
            "message": hash
        }
    })
}

/// The `eth_signTypedData_v4` request the owner key signs instead of
/// `request`. Keeps the original id.
pub fn wrap_for_owner(
    safe: &SafeCredential,
    network: &Network,
    request: &RawRequest,
) -> Result<RawRequest, SigningError> {
    let hash = original_payload_hash(request, safe.address)?;
    let typed_data = safe_message_typed_data(network, safe.address, hash);

    Ok(RawRequest {
        id: request.id,
        jsonrpc: request.jsonrpc.clone(),
        method: methods::ETH_SIGN_TYPED_DATA_V4.to_string(),
        params: vec![
            json!(safe.owner_credential.address),
            Value::String(typed_data.to_string()),
        ],
    })
}

/// Normalized form of a wrapped request, for callers that want the hashes
pub fn wrapped_envelope(wrapped: &RawRequest) -> Result<TypedDataEnvelope, SigningError> {
    Ok(wrapped.typed_data_params()?.1)
}
