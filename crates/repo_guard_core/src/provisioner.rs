//! The provisioning workflow.
//!
//! A run checks that the repository is reachable, then applies the plan in phases:
//!
//! 1. branch protection, one operation per declared branch
//! 2. repository merge settings, at most once
//! 3. Actions secrets, after a single public key fetch
//!
//! Results are appended in declaration order and never rolled back. Only a failed access
//! check stops a run; every later failure is recorded and the run carries on.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use github_client::ProvisioningClient;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::branch_protection::BranchProtectionManager;
use crate::encryption::{default_sealer, SecretSealer};
use crate::errors::{Error, ProvisionResult, ValidationError};
use crate::outcome::{OperationResult, RunReport, SecretsPhase};
use crate::plan::{ProvisionOptions, ProvisioningPlan};
use crate::repository::RepositoryRef;
use crate::secrets::SecretProvisioner;
use crate::settings_manager::SettingsManager;

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;

/// Applies a [`ProvisioningPlan`] to a repository.
///
/// # Examples
///
/// ```rust,no_run
/// use github_client::{create_token_client, GitHubClient};
/// use repo_guard_core::{ProvisionOptions, Provisioner, ProvisioningPlan, RepositoryRef};
/// use secrecy::SecretString;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = SecretString::from("ghp_example".to_string());
/// let client = GitHubClient::new(create_token_client(&token, None)?);
///
/// let provisioner = Provisioner::new(
///     Arc::new(client),
///     ProvisioningPlan::default(),
///     ProvisionOptions::default(),
/// )?;
///
/// let report = provisioner.run(&RepositoryRef::parse("my-org/my-repo")?).await?;
/// std::process::exit(if report.is_success() { 0 } else { 1 });
/// # }
/// ```
pub struct Provisioner {
    client: Arc<dyn ProvisioningClient>,
    plan: ProvisioningPlan,
    options: ProvisionOptions,
    sealer: Arc<dyn SecretSealer>,
}

impl Provisioner {
    /// Creates a provisioner using the best sealer this build provides.
    ///
    /// Secrets sharing a name are collapsed so each remote secret is written once.
    ///
    /// # Errors
    /// Returns `Error::Validation` if the plan or the options are invalid.
    pub fn new(
        client: Arc<dyn ProvisioningClient>,
        mut plan: ProvisioningPlan,
        options: ProvisionOptions,
    ) -> ProvisionResult<Self> {
        plan.validate()?;
        plan.dedup_secrets();

        if options.max_concurrency == 0 {
            return Err(ValidationError::new("max_concurrency", "must be at least 1").into());
        }

        Ok(Self {
            client,
            plan,
            options,
            sealer: default_sealer(),
        })
    }

    /// Replaces the sealer used for secret values.
    pub fn with_sealer(mut self, sealer: Arc<dyn SecretSealer>) -> Self {
        self.sealer = sealer;
        self
    }

    pub fn plan(&self) -> &ProvisioningPlan {
        &self.plan
    }

    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Applies the plan to `repo`.
    ///
    /// # Errors
    /// Returns `Error::AccessDenied` if the repository cannot be read with the configured
    /// credential. No phase runs in that case. Every other failure is recorded in the report.
    #[instrument(skip(self), fields(repository = %repo))]
    pub async fn run(&self, repo: &RepositoryRef) -> ProvisionResult<RunReport> {
        let started_at = Utc::now();
        info!(
            branches = self.plan.branches.len(),
            secrets = self.plan.secrets.len(),
            "Starting provisioning run"
        );

        self.check_access(repo).await?;

        let mut results = self.protect_branches(repo).await;

        match (&self.plan.settings, self.options.apply_settings) {
            (Some(settings), true) => results.push(
                SettingsManager::new(self.client.clone())
                    .apply_settings(repo, settings)
                    .await,
            ),
            (Some(_), false) => info!("Repository settings disabled for this run"),
            (None, _) => {}
        }

        let secrets_phase = if self.options.provision_secrets {
            let mut provisioner = SecretProvisioner::new(
                self.client.clone(),
                self.sealer.clone(),
                self.options.allow_placeholder_secrets,
            );
            let (secret_results, phase) = provisioner
                .provision(repo, &self.plan.secrets, self.options.max_concurrency)
                .await;
            results.extend(secret_results);
            phase
        } else {
            SecretsPhase::NotRequested
        };

        let report = RunReport {
            repository: repo.clone(),
            started_at,
            finished_at: Utc::now(),
            results,
            secrets_phase,
        };

        let summary = report.summary();
        if report.is_success() {
            info!(
                succeeded = summary.succeeded,
                skipped = summary.skipped,
                failed = summary.failed,
                "Provisioning run complete"
            );
        } else {
            warn!(
                succeeded = summary.succeeded,
                skipped = summary.skipped,
                failed = summary.failed,
                "Provisioning run complete, no branch was protected"
            );
        }

        Ok(report)
    }

    async fn check_access(&self, repo: &RepositoryRef) -> ProvisionResult<()> {
        match self.client.get_repository(repo.owner(), repo.name()).await {
            Ok(remote) => {
                info!(full_name = remote.full_name(), "Repository is accessible");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Repository is not accessible, aborting run");
                Err(Error::AccessDenied {
                    repository: repo.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn protect_branches(&self, repo: &RepositoryRef) -> Vec<OperationResult> {
        info!(count = self.plan.branches.len(), "Applying branch protection");

        let manager = BranchProtectionManager::new(self.client.clone());
        stream::iter(&self.plan.branches)
            .map(|policy| manager.apply_protection(repo, policy))
            .buffered(self.options.max_concurrency)
            .collect()
            .await
    }
}
