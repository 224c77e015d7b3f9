//! Branch protection operations.
//!
//! This module provides the [`BranchProtectionManager`], which checks that a branch exists
//! and then replaces its protection rule with the one described by a [`BranchPolicy`].

use github_client::ProvisioningClient;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::outcome::{OperationKind, OperationResult};
use crate::plan::BranchPolicy;
use crate::repository::RepositoryRef;

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// Applies branch protection policies to a repository.
///
/// Protection is a full replace: whatever rule the branch had before is overwritten, so
/// applying the same policy again leaves the remote unchanged.
///
/// # Examples
///
/// ```rust,no_run
/// use github_client::GitHubClient;
/// use repo_guard_core::{BranchPolicy, BranchProtectionManager, RepositoryRef};
/// use std::sync::Arc;
///
/// # async fn example(client: GitHubClient) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = BranchProtectionManager::new(Arc::new(client));
/// let repo = RepositoryRef::parse("my-org/my-repo")?;
///
/// let result = manager.apply_protection(&repo, &BranchPolicy::new("main")).await;
/// println!("{}: {}", result.target, result.outcome);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BranchProtectionManager {
    client: Arc<dyn ProvisioningClient>,
}

impl BranchProtectionManager {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }

    /// Returns true if the branch exists on the remote.
    ///
    /// Any failure of the lookup (missing branch, denied access, network error or timeout)
    /// yields `false`. An absent branch and one whose existence could not be confirmed are
    /// treated alike.
    pub async fn branch_exists(&self, repo: &RepositoryRef, branch: &str) -> bool {
        match self.client.get_branch(repo.owner(), repo.name(), branch).await {
            Ok(_) => true,
            Err(github_client::Error::NotFound) => {
                debug!(branch = branch, "Branch not found");
                false
            }
            Err(e) => {
                warn!(branch = branch, error = ?e, "Could not verify that branch exists");
                false
            }
        }
    }

    /// Applies `policy` to its branch.
    ///
    /// # Returns
    ///
    /// - `Skipped` if the branch does not exist. Nothing is sent.
    /// - `Succeeded` if GitHub accepted the new rule.
    /// - `Failed` with the remote status in `detail` otherwise.
    ///
    /// Never returns an error: a failure here does not stop the run.
    pub async fn apply_protection(
        &self,
        repo: &RepositoryRef,
        policy: &BranchPolicy,
    ) -> OperationResult {
        let branch = policy.branch_name.as_str();

        if !self.branch_exists(repo, branch).await {
            let reason = Error::PreconditionUnmet {
                branch: branch.to_string(),
            };
            info!(branch = branch, "Skipping protection, branch does not exist");
            return OperationResult::skipped(
                OperationKind::BranchProtection,
                branch,
                reason.to_string(),
            );
        }

        info!(
            branch = branch,
            required_approvals = policy.required_approvals,
            "Applying branch protection"
        );

        match self
            .client
            .update_branch_protection(repo.owner(), repo.name(), branch, &policy.to_request())
            .await
        {
            Ok(()) => {
                info!(branch = branch, "Branch protection applied");
                OperationResult::succeeded(
                    OperationKind::BranchProtection,
                    branch,
                    format!(
                        "Protected with {} required approval(s)",
                        policy.required_approvals
                    ),
                )
            }
            Err(e) => {
                let rejected = Error::from(e);
                warn!(branch = branch, error = %rejected, "Failed to apply branch protection");
                OperationResult::failed(
                    OperationKind::BranchProtection,
                    branch,
                    rejected.to_string(),
                )
            }
        }
    }
}
