//! Credential model
//!
//! Every way a private key can be controlled is a variant of [`Credential`].
//! The storage layer hands these in as read-only snapshots; key material
//! inside them stays sealed until a signing call opens it.

mod encryption;

pub use encryption::{decrypt_secret, encrypt_secret, DecryptError, EncryptedSecret};

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Default Ethereum BIP44 path for the first account
pub const DEFAULT_BIP44_PATH: &str = "m/44'/60'/0'/0/0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyCredential {
    pub address: Address,
    pub encrypted_key: EncryptedSecret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPhraseCredential {
    pub address: Address,
    pub bip44_path: String,
    pub encrypted_phrase: EncryptedSecret,
    pub confirmed: bool,
    /// Where the user backed the phrase up, if anywhere
    #[serde(default)]
    pub backup_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareCredential {
    pub address: Address,
    pub hd_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeCredential {
    /// The Safe contract address
    pub address: Address,
    pub threshold: u32,
    pub salt_nonce: U256,
    pub owner_credential: SecretPhraseCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOnlyCredential {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    PrivateKey(PrivateKeyCredential),
    SecretPhrase(SecretPhraseCredential),
    Ledger(HardwareCredential),
    Trezor(HardwareCredential),
    SafeMultisig(SafeCredential),
    TrackOnly(TrackOnlyCredential),
}

/// What a credential is able to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_sign_transaction: bool,
    pub can_sign_typed_data: bool,
    pub can_sign_message: bool,
}

impl Capabilities {
    const ALL: Self = Self {
        can_sign_transaction: true,
        can_sign_typed_data: true,
        can_sign_message: true,
    };

    const NONE: Self = Self {
        can_sign_transaction: false,
        can_sign_typed_data: false,
        can_sign_message: false,
    };

    pub fn can_sign_anything(&self) -> bool {
        self.can_sign_transaction || self.can_sign_typed_data || self.can_sign_message
    }
}

impl Credential {
    pub fn address(&self) -> Address {
        match self {
            Credential::PrivateKey(c) => c.address,
            Credential::SecretPhrase(c) => c.address,
            Credential::Ledger(c) => c.address,
            Credential::Trezor(c) => c.address,
            Credential::SafeMultisig(c) => c.address,
            Credential::TrackOnly(c) => c.address,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::PrivateKey(_) => "private_key",
            Credential::SecretPhrase(_) => "secret_phrase",
            Credential::Ledger(_) => "ledger",
            Credential::Trezor(_) => "trezor",
            Credential::SafeMultisig(_) => "safe_multisig",
            Credential::TrackOnly(_) => "track_only",
        }
    }

    /// A Safe executes transactions through its own contract call, so it
    /// only signs messages and typed data here.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Credential::PrivateKey(_)
            | Credential::SecretPhrase(_)
            | Credential::Ledger(_)
            | Credential::Trezor(_) => Capabilities::ALL,
            Credential::SafeMultisig(_) => Capabilities {
                can_sign_transaction: false,
                can_sign_typed_data: true,
                can_sign_message: true,
            },
            Credential::TrackOnly(_) => Capabilities::NONE,
        }
    }
}
