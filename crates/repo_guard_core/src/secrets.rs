//! Actions secret provisioning.
//!
//! The repository public key is fetched exactly once, before any secret is written. Every
//! secret is then sealed against that key and created or replaced by name. If the key cannot
//! be obtained the phase ends without writing anything.
//!
//! ```text
//! Uninitialized -> KeyFetched -> Upserting -> Done
//!       |
//!       +-> Aborted (key fetch failed)
//! ```

use futures::stream::{self, StreamExt};
use github_client::{ActionsPublicKey, ActionsSecretPayload, ProvisioningClient};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::encryption::{encrypt_or_placeholder, SealedValue, SecretSealer};
use crate::errors::{Error, ProvisionResult};
use crate::outcome::{OperationKind, OperationResult, SecretsPhase};
use crate::plan::SecretSpec;
use crate::repository::RepositoryRef;

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;

/// The repository key secrets are sealed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    /// Identifier sent back with every secret
    pub key_id: String,
    /// Base64 encoded X25519 public key
    pub public_key: String,
}

impl EncryptionKey {
    /// Checks that the remote returned both fields.
    ///
    /// # Errors
    /// Returns `Error::KeyFetchFailed` if `key_id` or `key` is missing or empty.
    pub fn from_remote(remote: ActionsPublicKey) -> ProvisionResult<Self> {
        let key_id = remote
            .key_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::KeyFetchFailed("response is missing key_id".to_string()))?;
        let public_key = remote
            .key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::KeyFetchFailed("response is missing key".to_string()))?;

        Ok(Self { key_id, public_key })
    }
}

/// Where the secrets phase currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsState {
    Uninitialized,
    KeyFetched,
    Upserting,
    Done,
    Aborted,
}

/// Creates or replaces the Actions secrets of one repository.
pub struct SecretProvisioner {
    client: Arc<dyn ProvisioningClient>,
    sealer: Arc<dyn SecretSealer>,
    allow_placeholder: bool,
    state: SecretsState,
    key: Option<EncryptionKey>,
}

impl SecretProvisioner {
    pub fn new(
        client: Arc<dyn ProvisioningClient>,
        sealer: Arc<dyn SecretSealer>,
        allow_placeholder: bool,
    ) -> Self {
        Self {
            client,
            sealer,
            allow_placeholder,
            state: SecretsState::Uninitialized,
            key: None,
        }
    }

    pub fn state(&self) -> SecretsState {
        self.state
    }

    /// Fetches the repository public key.
    ///
    /// # Errors
    /// Returns `Error::KeyFetchFailed` if the request fails or the response is incomplete. The
    /// provisioner is then `Aborted`.
    pub async fn fetch_key(&mut self, repo: &RepositoryRef) -> ProvisionResult<EncryptionKey> {
        let fetched = self
            .client
            .get_actions_public_key(repo.owner(), repo.name())
            .await
            .map_err(|e| Error::KeyFetchFailed(e.to_string()))
            .and_then(EncryptionKey::from_remote);

        match fetched {
            Ok(key) => {
                info!(key_id = key.key_id.as_str(), "Fetched Actions secrets public key");
                self.key = Some(key.clone());
                self.state = SecretsState::KeyFetched;
                Ok(key)
            }
            Err(e) => {
                error!(repository = %repo, error = %e, "Cannot provision secrets");
                self.state = SecretsState::Aborted;
                Err(e)
            }
        }
    }

    /// Runs the whole phase: one key fetch, then one upsert per secret.
    ///
    /// Up to `max_concurrency` upserts are in flight at once. Results are returned in the
    /// order of `secrets` regardless of completion order. When the key fetch fails no result
    /// is produced and the phase is `Aborted`.
    pub async fn provision(
        &mut self,
        repo: &RepositoryRef,
        secrets: &[SecretSpec],
        max_concurrency: usize,
    ) -> (Vec<OperationResult>, SecretsPhase) {
        info!(repository = %repo, secret_count = secrets.len(), "Provisioning Actions secrets");

        let key = match self.fetch_key(repo).await {
            Ok(key) => key,
            Err(e) => return (Vec::new(), SecretsPhase::Aborted(e.to_string())),
        };

        self.state = SecretsState::Upserting;
        let results: Vec<OperationResult> = stream::iter(secrets)
            .map(|secret| self.upsert_secret(repo, &key, secret))
            .buffered(max_concurrency.max(1))
            .collect()
            .await;
        self.state = SecretsState::Done;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            succeeded = succeeded,
            failed = results.len() - succeeded,
            "Secret provisioning complete"
        );

        (results, SecretsPhase::Completed)
    }

    /// Seals and writes a single secret.
    pub async fn upsert_secret(
        &self,
        repo: &RepositoryRef,
        key: &EncryptionKey,
        secret: &SecretSpec,
    ) -> OperationResult {
        let name = secret.name.as_str();

        let sealed = match encrypt_or_placeholder(
            self.sealer.as_ref(),
            &key.public_key,
            secret.value.expose_secret().as_bytes(),
            self.allow_placeholder,
        ) {
            Ok(sealed) => sealed,
            Err(e) => {
                warn!(secret = name, error = %e, "Not uploading secret");
                return OperationResult::failed(OperationKind::SecretUpsert, name, e.to_string());
            }
        };

        if let SealedValue::Placeholder { reason, .. } = &sealed {
            warn!(secret = name, reason = reason.as_str(), "Uploading unencrypted placeholder");
        }

        let payload = ActionsSecretPayload {
            encrypted_value: sealed.as_str().to_string(),
            key_id: key.key_id.clone(),
        };

        match self
            .client
            .put_actions_secret(repo.owner(), repo.name(), name, &payload)
            .await
        {
            Ok(write) => {
                info!(secret = name, write = %write, "Secret written");
                let detail = match &sealed {
                    SealedValue::Encrypted(_) => format!("Secret {}", write),
                    SealedValue::Placeholder { reason, .. } => format!(
                        "Secret {} with an unencrypted placeholder ({}), replace it manually",
                        write, reason
                    ),
                };
                OperationResult::succeeded(OperationKind::SecretUpsert, name, detail)
            }
            Err(e) => {
                let rejected = Error::from(e);
                warn!(secret = name, error = %rejected, "Failed to write secret");
                OperationResult::failed(OperationKind::SecretUpsert, name, rejected.to_string())
            }
        }
    }
}
