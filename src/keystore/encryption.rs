//! Sealed secrets: key material encrypted under the session secret
//!
//! A sealed secret is a JSON envelope `{"version":1,"salt":..,"iv":..,"data":..}`
//! (hex fields). The key-encryption key is derived from the session secret
//! with Argon2id and the payload is sealed with AES-256-GCM.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use alloy::hex;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

const ENVELOPE_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

// m=19456 KiB, t=2, p=1
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The envelope is well-formed but the secret does not open it
    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Malformed encrypted blob: {0}")]
    MalformedBlob(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Opaque encrypted key material as stored by the persistence layer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptedSecret([REDACTED])")
    }
}

#[derive(Serialize, Deserialize)]
struct SealedEnvelope {
    version: u8,
    salt: String,
    iv: String,
    data: String,
}

fn derive_key(
    secret: &SecretString,
    salt: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, DecryptError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LEN),
    )
    .map_err(|e| DecryptError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(secret.expose_secret().as_bytes(), salt, &mut key[..])
        .map_err(|e| DecryptError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Seal `plaintext` under `secret`
pub fn encrypt_secret(
    plaintext: &str,
    secret: &SecretString,
) -> Result<EncryptedSecret, DecryptError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(secret, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| DecryptError::KeyDerivation(format!("encryption failed: {e}")))?;

    let envelope = SealedEnvelope {
        version: ENVELOPE_VERSION,
        salt: hex::encode(salt),
        iv: hex::encode(iv),
        data: hex::encode(data),
    };
    let raw = serde_json::to_string(&envelope)
        .map_err(|e| DecryptError::MalformedBlob(e.to_string()))?;
    Ok(EncryptedSecret(raw))
}

/// Open a sealed secret. The returned string wipes itself on drop.
pub fn decrypt_secret(
    sealed: &EncryptedSecret,
    secret: &SecretString,
) -> Result<Zeroizing<String>, DecryptError> {
    let envelope: SealedEnvelope = serde_json::from_str(&sealed.0)
        .map_err(|e| DecryptError::MalformedBlob(format!("envelope: {e}")))?;

    if envelope.version != ENVELOPE_VERSION {
        return Err(DecryptError::MalformedBlob(format!(
            "unsupported version {}",
            envelope.version
        )));
    }

    let salt = decode_field("salt", &envelope.salt)?;
    let iv = decode_field("iv", &envelope.iv)?;
    let data = decode_field("data", &envelope.data)?;

    if salt.len() != SALT_LEN {
        return Err(DecryptError::MalformedBlob(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }
    if iv.len() != NONCE_LEN {
        return Err(DecryptError::MalformedBlob(format!(
            "iv must be {NONCE_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let key = derive_key(secret, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

    // GCM tag failure is the only signal of a wrong secret
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&iv), data.as_ref())
            .map_err(|_| DecryptError::IncorrectPassword)?,
    );

    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| DecryptError::MalformedBlob("plaintext is not UTF-8".to_string()))?;
    Ok(Zeroizing::new(text.to_owned()))
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, DecryptError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| DecryptError::MalformedBlob(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn seal_and_open() {
        let sealed = encrypt_secret("correct horse battery staple", &secret("hunter2")).unwrap();
        let opened = decrypt_secret(&sealed, &secret("hunter2")).unwrap();
        assert_eq!(opened.as_str(), "correct horse battery staple");
    }

    #[test]
    fn sealing_twice_gives_different_blobs() {
        let a = encrypt_secret("same", &secret("pw")).unwrap();
        let b = encrypt_secret("same", &secret("pw")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_is_incorrect_password() {
        let sealed = encrypt_secret("key", &secret("right")).unwrap();
        let err = decrypt_secret(&sealed, &secret("wrong")).unwrap_err();
        assert_eq!(err, DecryptError::IncorrectPassword);
    }

    #[test]
    fn garbage_is_malformed_not_incorrect_password() {
        let err = decrypt_secret(&EncryptedSecret::new("not json"), &secret("pw")).unwrap_err();
        assert!(matches!(err, DecryptError::MalformedBlob(_)));

        let bad_hex = EncryptedSecret::new(
            r#"{"version":1,"salt":"zz","iv":"00","data":"00"}"#,
        );
        let err = decrypt_secret(&bad_hex, &secret("pw")).unwrap_err();
        assert!(matches!(err, DecryptError::MalformedBlob(_)));
    }

    #[test]
    fn short_iv_is_malformed() {
        let blob = EncryptedSecret::new(format!(
            r#"{{"version":1,"salt":"{}","iv":"0011","data":"00"}}"#,
            "00".repeat(SALT_LEN)
        ));
        let err = decrypt_secret(&blob, &secret("pw")).unwrap_err();
        assert!(matches!(err, DecryptError::MalformedBlob(_)));
    }

    #[test]
    fn debug_redacts_blob() {
        let sealed = encrypt_secret("key", &secret("pw")).unwrap();
        let debug_str = format!("{:?}", sealed);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("salt"));
    }
}
