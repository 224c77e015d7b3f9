//! Encryption of Actions secret values.
//!
//! GitHub only accepts secret values sealed with the libsodium sealed-box construction against
//! the repository's public key. [`SodiumSealer`] provides it when the crate is built with the
//! `sealed-box` feature. Without it, or when the fetched key cannot be used, values can only be
//! uploaded as a marked placeholder, and only when the caller allows it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::errors::Error;

#[cfg(test)]
#[path = "encryption_tests.rs"]
mod tests;

/// Prefix of every value uploaded without encryption.
pub const PLACEHOLDER_PREFIX: &str = "UNENCRYPTED_PLACEHOLDER:";

/// Number of plaintext bytes carried by a placeholder.
const PLACEHOLDER_PLAINTEXT_BYTES: usize = 16;

/// Length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Seals a plaintext against a repository public key.
pub trait SecretSealer: Send + Sync {
    /// Returns the base64 encoded sealed box of `plaintext`.
    ///
    /// # Errors
    /// Returns `Error::EncryptionUnavailable` if the key cannot be used or no sealed-box
    /// implementation is available.
    fn seal(&self, public_key_base64: &str, plaintext: &[u8]) -> Result<String, Error>;
}

/// libsodium compatible sealed box (X25519, XSalsa20-Poly1305).
#[cfg(feature = "sealed-box")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SodiumSealer;

#[cfg(feature = "sealed-box")]
impl SecretSealer for SodiumSealer {
    fn seal(&self, public_key_base64: &str, plaintext: &[u8]) -> Result<String, Error> {
        use crypto_box::{aead::OsRng, PublicKey};

        let key_bytes = decode_public_key(public_key_base64)?;
        let public_key = PublicKey::from(key_bytes);
        let sealed = public_key
            .seal(&mut OsRng, plaintext)
            .map_err(|e| Error::EncryptionUnavailable(format!("sealing failed: {}", e)))?;

        Ok(STANDARD.encode(sealed))
    }
}

/// A sealer that never encrypts. Used when the crate is built without `sealed-box`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSealer;

impl SecretSealer for UnavailableSealer {
    fn seal(&self, _public_key_base64: &str, _plaintext: &[u8]) -> Result<String, Error> {
        Err(Error::EncryptionUnavailable(
            "built without sealed-box support".to_string(),
        ))
    }
}

/// The best sealer this build provides.
pub fn default_sealer() -> Arc<dyn SecretSealer> {
    #[cfg(feature = "sealed-box")]
    {
        Arc::new(SodiumSealer)
    }
    #[cfg(not(feature = "sealed-box"))]
    {
        Arc::new(UnavailableSealer)
    }
}

/// Decodes a base64 repository key and checks its length.
pub fn decode_public_key(public_key_base64: &str) -> Result<[u8; PUBLIC_KEY_LEN], Error> {
    let bytes = STANDARD.decode(public_key_base64.trim()).map_err(|e| {
        Error::EncryptionUnavailable(format!("public key is not valid base64: {}", e))
    })?;

    <[u8; PUBLIC_KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        Error::EncryptionUnavailable(format!(
            "public key is {} bytes, expected {}",
            bytes.len(),
            PUBLIC_KEY_LEN
        ))
    })
}

/// The marked, unencrypted stand-in uploaded when encryption is unavailable.
pub fn placeholder_value(plaintext: &[u8]) -> String {
    let head = &plaintext[..plaintext.len().min(PLACEHOLDER_PLAINTEXT_BYTES)];
    format!("{}{}", PLACEHOLDER_PREFIX, STANDARD.encode(head))
}

/// A value ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealedValue {
    /// Base64 sealed box
    Encrypted(String),
    /// Marked placeholder. Holds the reason encryption was unavailable.
    Placeholder { value: String, reason: String },
}

impl SealedValue {
    /// The string sent as `encrypted_value`.
    pub fn as_str(&self) -> &str {
        match self {
            SealedValue::Encrypted(value) => value,
            SealedValue::Placeholder { value, .. } => value,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, SealedValue::Placeholder { .. })
    }
}

/// Seals `plaintext`, falling back to a placeholder when allowed.
///
/// # Errors
/// Returns `Error::EncryptionUnavailable` if sealing fails and `allow_placeholder` is false.
pub fn encrypt_or_placeholder(
    sealer: &dyn SecretSealer,
    public_key_base64: &str,
    plaintext: &[u8],
    allow_placeholder: bool,
) -> Result<SealedValue, Error> {
    match sealer.seal(public_key_base64, plaintext) {
        Ok(value) => Ok(SealedValue::Encrypted(value)),
        Err(Error::EncryptionUnavailable(reason)) if allow_placeholder => {
            Ok(SealedValue::Placeholder {
                value: placeholder_value(plaintext),
                reason,
            })
        }
        Err(e) => Err(e),
    }
}
