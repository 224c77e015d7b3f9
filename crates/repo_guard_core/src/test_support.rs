//! In-memory GitHub remote used by the unit tests of this crate.

use async_trait::async_trait;
use github_client::{
    ActionsPublicKey, ActionsSecretPayload, Branch, BranchProtectionRequest, Error,
    ProvisioningClient, Repository, RepositorySettingsUpdate, SecretWrite,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A fake GitHub remote holding branches, protection rules and secrets.
///
/// Failures are injected per target as HTTP statuses. Every call is recorded in order.
#[derive(Default)]
pub struct MockProvisioningClient {
    branches: HashSet<String>,
    branch_delays: HashMap<String, Duration>,
    repository_status: Option<u16>,
    branch_lookup_status: HashMap<String, u16>,
    protection_status: HashMap<String, u16>,
    settings_status: Option<u16>,
    public_key: Option<ActionsPublicKey>,
    public_key_status: Option<u16>,
    secret_status: HashMap<String, u16>,
    first_secret_delay: Option<Duration>,
    secret_puts: AtomicUsize,

    pub protections: Mutex<HashMap<String, BranchProtectionRequest>>,
    pub settings_updates: Mutex<Vec<RepositorySettingsUpdate>>,
    pub secrets: Mutex<HashMap<String, ActionsSecretPayload>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockProvisioningClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branches(mut self, branches: &[&str]) -> Self {
        self.branches.extend(branches.iter().map(|b| b.to_string()));
        self
    }

    /// Delays both the lookup and the protection of `branch`.
    pub fn with_branch_delay(mut self, branch: &str, delay: Duration) -> Self {
        self.branch_delays.insert(branch.to_string(), delay);
        self
    }

    pub fn with_repository_status(mut self, status: u16) -> Self {
        self.repository_status = Some(status);
        self
    }

    pub fn with_branch_lookup_status(mut self, branch: &str, status: u16) -> Self {
        self.branch_lookup_status.insert(branch.to_string(), status);
        self
    }

    pub fn with_protection_status(mut self, branch: &str, status: u16) -> Self {
        self.protection_status.insert(branch.to_string(), status);
        self
    }

    pub fn with_settings_status(mut self, status: u16) -> Self {
        self.settings_status = Some(status);
        self
    }

    pub fn with_public_key(mut self, key_id: &str, key: &str) -> Self {
        self.public_key = Some(ActionsPublicKey {
            key_id: Some(key_id.to_string()),
            key: Some(key.to_string()),
        });
        self
    }

    pub fn with_raw_public_key(mut self, public_key: ActionsPublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }

    pub fn with_public_key_status(mut self, status: u16) -> Self {
        self.public_key_status = Some(status);
        self
    }

    pub fn with_secret_status(mut self, name: &str, status: u16) -> Self {
        self.secret_status.insert(name.to_string(), status);
        self
    }

    /// Delays the first secret write, so later writes can overtake it.
    pub fn with_first_secret_delay(mut self, delay: Duration) -> Self {
        self.first_secret_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn delay_for(&self, branch: &str) {
        if let Some(delay) = self.branch_delays.get(branch) {
            tokio::time::sleep(*delay).await;
        }
    }
}

fn status_error(status: u16) -> Error {
    match status {
        404 => Error::NotFound,
        status => Error::RemoteStatus {
            status,
            message: format!("injected failure {}", status),
        },
    }
}

#[async_trait]
impl ProvisioningClient for MockProvisioningClient {
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        self.record(format!("GET repo {}/{}", owner, repo));
        match self.repository_status {
            Some(status) => Err(status_error(status)),
            None => Ok(Repository::new(
                repo.to_string(),
                format!("{}/{}", owner, repo),
            )),
        }
    }

    async fn get_branch(&self, _owner: &str, _repo: &str, branch: &str) -> Result<Branch, Error> {
        self.delay_for(branch).await;
        self.record(format!("GET branch {}", branch));
        if let Some(status) = self.branch_lookup_status.get(branch) {
            return Err(status_error(*status));
        }
        if self.branches.contains(branch) {
            Ok(Branch {
                name: branch.to_string(),
                protected: self.protections.lock().unwrap().contains_key(branch),
            })
        } else {
            Err(Error::NotFound)
        }
    }

    async fn update_branch_protection(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<(), Error> {
        self.delay_for(branch).await;
        self.record(format!("PUT protection {}", branch));
        if let Some(status) = self.protection_status.get(branch) {
            return Err(status_error(*status));
        }
        if !self.branches.contains(branch) {
            return Err(Error::NotFound);
        }
        self.protections
            .lock()
            .unwrap()
            .insert(branch.to_string(), protection.clone());
        Ok(())
    }

    async fn update_repository_settings(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<Repository, Error> {
        self.record("PATCH settings".to_string());
        if let Some(status) = self.settings_status {
            return Err(status_error(status));
        }
        self.settings_updates.lock().unwrap().push(settings.clone());
        Ok(Repository::new(
            repo.to_string(),
            format!("{}/{}", owner, repo),
        ))
    }

    async fn get_actions_public_key(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<ActionsPublicKey, Error> {
        self.record("GET public-key".to_string());
        if let Some(status) = self.public_key_status {
            return Err(status_error(status));
        }
        self.public_key.clone().ok_or(Error::NotFound)
    }

    async fn put_actions_secret(
        &self,
        _owner: &str,
        _repo: &str,
        name: &str,
        payload: &ActionsSecretPayload,
    ) -> Result<SecretWrite, Error> {
        self.record(format!("PUT secret {}", name));
        if self.secret_puts.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(delay) = self.first_secret_delay {
                tokio::time::sleep(delay).await;
            }
        }
        if let Some(status) = self.secret_status.get(name) {
            return Err(status_error(*status));
        }
        // GitHub stores secret names uppercased
        let previous = self
            .secrets
            .lock()
            .unwrap()
            .insert(name.to_ascii_uppercase(), payload.clone());
        Ok(match previous {
            Some(_) => SecretWrite::Updated,
            None => SecretWrite::Created,
        })
    }
}
