//! Signer dispatcher
//!
//! One entry point, [`SignerDispatcher::sign`], covers every credential:
//!
//! - private keys and secret phrases are decrypted with the session secret,
//!   used for exactly one signature and wiped on every exit path
//! - Ledger and Trezor go through the [`HardwareTransport`] port
//! - a Safe wraps the request in a `SafeMessage` and has its owner phrase
//!   sign that through the same local path
//! - track-only accounts never sign

pub mod hardware;
pub mod local;
pub mod safe;
pub mod transaction;

pub use hardware::{
    HardwareDevice, HardwareError, HardwarePayload, HardwareTransport,
    UnavailableHardwareTransport,
};
pub use local::LocalSigner;
pub use transaction::{SignedTransaction, UnsignedTransaction};

use crate::error::ParseError;
use crate::keystore::{
    decrypt_secret, Capabilities, Credential, DecryptError, HardwareCredential,
    SecretPhraseCredential,
};
use crate::network::Network;
use crate::request::{RawRequest, SigningMethod};
use alloy::hex;
use alloy::primitives::{eip191_hash_message, Address, Bytes, B256};
use alloy::signers::Signature;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigningError {
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error("{keystore} keystore cannot sign")]
    KeystoreCannotSign { keystore: &'static str },

    #[error("{keystore} keystore does not support {method}")]
    UnsupportedRequest {
        keystore: &'static str,
        method: String,
    },

    #[error("Request rejected on hardware device")]
    DeviceRejected,

    #[error("Hardware device disconnected")]
    DeviceDisconnected,

    #[error("Timed out waiting for hardware confirmation")]
    DeviceTimeout,

    #[error("Signing cancelled")]
    Cancelled,

    #[error("Hardware device error: {0}")]
    Device(String),

    #[error(transparent)]
    InvalidRequest(#[from] ParseError),

    #[error("Request is for {requested} but the credential controls {credential}")]
    AddressMismatch {
        credential: Address,
        requested: Address,
    },

    #[error("Transaction is missing {0}")]
    IncompleteTransaction(&'static str),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Signing failed: {0}")]
    Signature(String),
}

/// Result of a signing call
#[derive(Debug, Clone, PartialEq)]
pub enum SignedPayload {
    Transaction(SignedTransaction),
    Signature(Signature),
    /// Owner signature over the `SafeMessage` that replaced the original
    /// request
    SafeSignature {
        request: RawRequest,
        owner: Address,
        signature: Signature,
    },
}

impl SignedPayload {
    /// 65-byte `r ‖ s ‖ v` hex, for message and typed-data signatures
    pub fn signature_hex(&self) -> Option<String> {
        match self {
            SignedPayload::Transaction(_) => None,
            SignedPayload::Signature(signature)
            | SignedPayload::SafeSignature { signature, .. } => {
                Some(hex::encode_prefixed(signature.as_bytes()))
            }
        }
    }
}

fn supports(capabilities: Capabilities, method: SigningMethod) -> bool {
    match method {
        SigningMethod::SendTransaction => capabilities.can_sign_transaction,
        SigningMethod::SignTypedDataV4 => capabilities.can_sign_typed_data,
        SigningMethod::PersonalSign => capabilities.can_sign_message,
    }
}

fn ensure_address(credential: Address, requested: Address) -> Result<(), SigningError> {
    if credential == requested {
        Ok(())
    } else {
        Err(SigningError::AddressMismatch {
            credential,
            requested,
        })
    }
}

pub struct SignerDispatcher<H> {
    hardware: H,
    hardware_timeout: Duration,
}

impl<H: HardwareTransport> SignerDispatcher<H> {
    pub fn new(hardware: H, hardware_timeout: Duration) -> Self {
        Self {
            hardware,
            hardware_timeout,
        }
    }

    pub async fn sign(
        &self,
        credential: &Credential,
        network: &Network,
        request: &RawRequest,
        session_secret: &SecretString,
        signal: &crate::transport::AbortSignal,
    ) -> Result<SignedPayload, SigningError> {
        let keystore = credential.kind();
        let unsupported = || SigningError::UnsupportedRequest {
            keystore,
            method: request.method.clone(),
        };

        if !credential.capabilities().can_sign_anything() {
            return Err(SigningError::KeystoreCannotSign { keystore });
        }
        let method = request.signing_method().ok_or_else(unsupported)?;
        if !supports(credential.capabilities(), method) {
            return Err(unsupported());
        }
        if signal.is_aborted() {
            return Err(SigningError::Cancelled);
        }

        tracing::debug!(
            keystore,
            method = %request.method,
            address = %credential.address(),
            network = %network.display_name(),
            "Signing request"
        );

        match credential {
            Credential::PrivateKey(c) => {
                let key = decrypt_secret(&c.encrypted_key, session_secret)?;
                let signer = LocalSigner::from_hex(&key)?;
                drop(key);
                ensure_address(c.address, signer.address())?;
                sign_locally(&signer, network, request, method)
            }
            Credential::SecretPhrase(c) => {
                sign_with_phrase(c, network, request, method, session_secret)
            }
            Credential::Ledger(c) => {
                self.sign_with_device(HardwareDevice::Ledger, c, network, request, method, signal)
                    .await
            }
            Credential::Trezor(c) => {
                self.sign_with_device(HardwareDevice::Trezor, c, network, request, method, signal)
                    .await
            }
            Credential::SafeMultisig(c) => {
                let wrapped = safe::wrap_for_owner(c, network, request)?;
                let owner = &c.owner_credential;
                let signed = sign_with_phrase(
                    owner,
                    network,
                    &wrapped,
                    SigningMethod::SignTypedDataV4,
                    session_secret,
                )?;
                match signed {
                    SignedPayload::Signature(signature) => {
                        tracing::info!(
                            safe = %c.address,
                            owner = %owner.address,
                            threshold = c.threshold,
                            "Signed SafeMessage with owner key"
                        );
                        Ok(SignedPayload::SafeSignature {
                            request: wrapped,
                            owner: owner.address,
                            signature,
                        })
                    }
                    SignedPayload::Transaction(_) | SignedPayload::SafeSignature { .. } => {
                        Err(SigningError::Signature(
                            "owner produced a non-signature payload".to_string(),
                        ))
                    }
                }
            }
            Credential::TrackOnly(_) => Err(SigningError::KeystoreCannotSign { keystore }),
        }
    }

    async fn sign_with_device(
        &self,
        device: HardwareDevice,
        credential: &HardwareCredential,
        network: &Network,
        request: &RawRequest,
        method: SigningMethod,
        signal: &crate::transport::AbortSignal,
    ) -> Result<SignedPayload, SigningError> {
        let (payload, hash, unsigned) = match method {
            SigningMethod::SendTransaction => {
                let params = request.transaction_params()?;
                ensure_address(credential.address, params.from)?;
                let tx =
                    UnsignedTransaction::from_params(&params, network.chain_id(), network.trx_type())?;
                let payload = HardwarePayload::Transaction {
                    chain_id: network.chain_id().0,
                    unsigned: tx.encoded_for_signing(),
                };
                (payload, tx.signature_hash(), Some(tx))
            }
            SigningMethod::SignTypedDataV4 => {
                let (address, typed_data) = request.typed_data_params()?;
                ensure_address(credential.address, address)?;
                let payload = HardwarePayload::TypedData {
                    domain_separator: typed_data.domain_separator()?,
                    struct_hash: typed_data.struct_hash()?,
                    typed_data: typed_data.to_value(),
                };
                (payload, typed_data.signing_hash()?, None)
            }
            SigningMethod::PersonalSign => {
                let (message, address) = request.personal_message()?;
                ensure_address(credential.address, address)?;
                let hash = eip191_hash_message(&message);
                (HardwarePayload::Message { message }, hash, None)
            }
        };

        let signature = hardware::await_device_signature(
            &self.hardware,
            device,
            &credential.hd_path,
            &payload,
            self.hardware_timeout,
            signal,
        )
        .await?;

        // A device on the wrong account or path signs with another key
        let recovered = signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| SigningError::Signature(e.to_string()))?;
        ensure_address(credential.address, recovered)?;

        Ok(match unsigned {
            Some(tx) => SignedPayload::Transaction(tx.into_signed(signature)),
            None => SignedPayload::Signature(signature),
        })
    }
}

fn sign_with_phrase(
    credential: &SecretPhraseCredential,
    network: &Network,
    request: &RawRequest,
    method: SigningMethod,
    session_secret: &SecretString,
) -> Result<SignedPayload, SigningError> {
    let phrase = decrypt_secret(&credential.encrypted_phrase, session_secret)?;
    let signer = LocalSigner::from_phrase(&phrase, &credential.bip44_path)?;
    drop(phrase);
    ensure_address(credential.address, signer.address())?;
    sign_locally(&signer, network, request, method)
}

fn sign_locally(
    signer: &LocalSigner,
    network: &Network,
    request: &RawRequest,
    method: SigningMethod,
) -> Result<SignedPayload, SigningError> {
    match method {
        SigningMethod::SendTransaction => {
            let params = request.transaction_params()?;
            ensure_address(signer.address(), params.from)?;
            let tx = UnsignedTransaction::from_params(&params, network.chain_id(), network.trx_type())?;
            let signature = signer.sign_hash(&tx.signature_hash())?;
            let signed = tx.into_signed(signature);
            tracing::info!(tx_hash = %signed.hash, "Signed transaction");
            Ok(SignedPayload::Transaction(signed))
        }
        SigningMethod::SignTypedDataV4 => {
            let (address, typed_data) = request.typed_data_params()?;
            ensure_address(signer.address(), address)?;
            let hash: B256 = typed_data.signing_hash()?;
            Ok(SignedPayload::Signature(signer.sign_hash(&hash)?))
        }
        SigningMethod::PersonalSign => {
            let (message, address): (Bytes, Address) = request.personal_message()?;
            ensure_address(signer.address(), address)?;
            let hash = eip191_hash_message(&message);
            Ok(SignedPayload::Signature(signer.sign_hash(&hash)?))
        }
    }
}
