//! Unsigned transactions built from `eth_sendTransaction` params

use super::SigningError;
use crate::network::{ChainId, TrxType};
use crate::request::TransactionParams;
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Bytes, TxKind, B256, U256};
use alloy::signers::Signature;

#[derive(Debug, Clone, PartialEq)]
pub enum UnsignedTransaction {
    Legacy(TxLegacy),
    Eip1559(TxEip1559),
}

/// A signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// EIP-2718 encoding
    pub raw: Bytes,
    pub hash: B256,
}

impl UnsignedTransaction {
    /// The network's `trxType` picks the envelope. Fees given in the other
    /// style are mapped across: a lone `gasPrice` fills both EIP-1559 fee
    /// fields, and `maxFeePerGas` stands in for `gasPrice` on legacy networks.
    pub fn from_params(
        params: &TransactionParams,
        chain_id: ChainId,
        trx_type: TrxType,
    ) -> Result<Self, SigningError> {
        let nonce = params
            .nonce
            .ok_or(SigningError::IncompleteTransaction("nonce"))?
            .to::<u64>();
        let gas_limit = params
            .gas
            .ok_or(SigningError::IncompleteTransaction("gas"))?
            .to::<u64>();
        let to = params.to.map(TxKind::Call).unwrap_or(TxKind::Create);
        let value = params.value.unwrap_or(U256::ZERO);
        let input = params.input()?;

        let gas_price = params.gas_price.map(|p| p.to::<u128>());
        let max_fee = params.max_fee_per_gas.map(|p| p.to::<u128>());
        let priority_fee = params.max_priority_fee_per_gas.map(|p| p.to::<u128>());

        Ok(match trx_type {
            TrxType::Legacy => UnsignedTransaction::Legacy(TxLegacy {
                chain_id: Some(chain_id.0),
                nonce,
                gas_price: gas_price
                    .or(max_fee)
                    .ok_or(SigningError::IncompleteTransaction("gasPrice"))?,
                gas_limit,
                to,
                value,
                input,
            }),
            TrxType::Eip1559 => {
                let max_fee_per_gas = max_fee
                    .or(gas_price)
                    .ok_or(SigningError::IncompleteTransaction("maxFeePerGas"))?;
                let max_priority_fee_per_gas = priority_fee
                    .or(gas_price)
                    .ok_or(SigningError::IncompleteTransaction("maxPriorityFeePerGas"))?;
                UnsignedTransaction::Eip1559(TxEip1559 {
                    chain_id: chain_id.0,
                    nonce,
                    gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to,
                    value,
                    input,
                    ..Default::default()
                })
            }
        })
    }

    pub fn signature_hash(&self) -> B256 {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.signature_hash(),
            UnsignedTransaction::Eip1559(tx) => tx.signature_hash(),
        }
    }

    /// RLP payload a hardware device signs
    pub fn encoded_for_signing(&self) -> Bytes {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.encoded_for_signing().into(),
            UnsignedTransaction::Eip1559(tx) => tx.encoded_for_signing().into(),
        }
    }

    pub fn into_signed(self, signature: Signature) -> SignedTransaction {
        let envelope: TxEnvelope = match self {
            UnsignedTransaction::Legacy(tx) => tx.into_signed(signature).into(),
            UnsignedTransaction::Eip1559(tx) => tx.into_signed(signature).into(),
        };
        SignedTransaction {
            raw: envelope.encoded_2718().into(),
            hash: *envelope.tx_hash(),
        }
    }
}
