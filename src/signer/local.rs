//! In-process signing key
//!
//! Built from decrypted key material for the length of one signing call.
//! The key lives inside alloy's `PrivateKeySigner`, which wipes it on drop;
//! it is never serialized or logged.

use super::SigningError;
use alloy::primitives::{Address, B256};
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use alloy::signers::{Signature, SignerSync};

pub struct LocalSigner {
    signer: PrivateKeySigner,
}

impl LocalSigner {
    /// From a hex private key, with or without `0x`
    pub fn from_hex(key_hex: &str) -> Result<Self, SigningError> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| SigningError::KeyDerivation(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    /// From a BIP39 phrase at a BIP44 path
    pub fn from_phrase(phrase: &str, path: &str) -> Result<Self, SigningError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .derivation_path(path)
            .map_err(|e| SigningError::KeyDerivation(format!("invalid path {path}: {e}")))?
            .build()
            .map_err(|e| SigningError::KeyDerivation(e.to_string()))?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, SigningError> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| SigningError::Signature(e.to_string()))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address())
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
