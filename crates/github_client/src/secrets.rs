//! GitHub Actions secret types.
//!
//! See: https://docs.github.com/en/rest/actions/secrets

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;

/// The public key GitHub uses to accept encrypted Actions secrets for a repository.
///
/// Both fields are optional on the wire so that a response missing either of them can be
/// detected by the caller instead of failing deserialization.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActionsPublicKey {
    /// Identifier of the key, sent back with every secret encrypted with it
    #[serde(default)]
    pub key_id: Option<String>,
    /// Base64 encoded X25519 public key
    #[serde(default)]
    pub key: Option<String>,
}

/// Request body for `PUT /repos/{owner}/{repo}/actions/secrets/{secret_name}`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActionsSecretPayload {
    /// Base64 encoded sealed-box ciphertext of the secret value
    pub encrypted_value: String,
    /// The `key_id` of the public key used for encryption
    pub key_id: String,
}

/// How GitHub applied a secret write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretWrite {
    /// The secret did not exist and was created (HTTP 201)
    Created,
    /// An existing secret with the same name was replaced (HTTP 204)
    Updated,
}

impl SecretWrite {
    /// Maps a success status code of the secret endpoint onto the write kind.
    pub fn from_status(status: u16) -> Self {
        if status == 201 {
            SecretWrite::Created
        } else {
            SecretWrite::Updated
        }
    }
}

impl std::fmt::Display for SecretWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretWrite::Created => write!(f, "created"),
            SecretWrite::Updated => write!(f, "updated"),
        }
    }
}
